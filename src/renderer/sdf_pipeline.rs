//! SDF-based WebGPU render pipeline
//!
//! Draws the whole arena in the fragment shader: one full-screen triangle,
//! every body a circle distance field read from a storage buffer.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::settings::Settings;
use crate::sim::{BodyKind, Viewport, World};

/// Bodies beyond this are not drawn
pub const MAX_BODIES: usize = 32;

// ============================================================================
// GPU LAYOUT (mirrors the structs in sdf_shader.wgsl)
// ============================================================================

#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
struct Globals {
    resolution: [f32; 2], // offset 0
    time: f32,            // offset 8
    scale: f32,           // offset 12 - pixels per arena unit
    origin: [f32; 2],     // offset 16 - pixel position of arena (0, 0)
    body_count: u32,      // offset 24
    pulse: f32,           // offset 28 - gravity well animation (0 = off)
    dim: f32,             // offset 32 - overlay darkening while not running
    _pad: [u32; 3],       // pad to 48 bytes
}

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub(crate) struct BodyData {
    pos: [f32; 2],
    radius: f32,
    kind: u32,
    grabbed: u32,
    speed: f32,
    _pad: [u32; 2], // 32 bytes
}

fn kind_code(kind: BodyKind) -> u32 {
    match kind {
        BodyKind::Player => 0,
        BodyKind::Goal => 1,
        BodyKind::Obstacle => 2,
        BodyKind::Bouncer => 3,
        BodyKind::GravityWell => 4,
    }
}

/// Pack bodies for the storage buffer, padded to `MAX_BODIES`
pub(crate) fn body_data(world: Option<&World>) -> (Vec<BodyData>, u32) {
    let mut data = vec![BodyData::zeroed(); MAX_BODIES];
    let Some(world) = world else {
        return (data, 0);
    };

    let count = world.bodies.len().min(MAX_BODIES);
    for (slot, body) in data.iter_mut().zip(&world.bodies) {
        *slot = BodyData {
            pos: [body.pos.x, body.pos.y],
            radius: body.radius,
            kind: kind_code(body.kind),
            grabbed: body.grabbed as u32,
            speed: body.vel.length(),
            _pad: [0; 2],
        };
    }
    (data, count as u32)
}

// ============================================================================
// ARENA RENDERER
// ============================================================================

/// Read-only buffer visible to the fragment stage
fn fragment_buffer(binding: u32, ty: wgpu::BufferBindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Full-screen triangle pipeline; all shading happens in `fs_main`
fn create_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some("arena_shader"),
        source: wgpu::ShaderSource::Wgsl(include_str!("sdf_shader.wgsl").into()),
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some("arena_layout"),
        bind_group_layouts: &[layout],
        immediate_size: 0,
    });

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("arena_pipeline"),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs_main"),
            targets: &[Some(format.into())],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview_mask: None,
        cache: None,
    })
}

pub struct SdfRenderState {
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub pipeline: wgpu::RenderPipeline,

    globals_buffer: wgpu::Buffer,
    bodies_buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,

    /// Backing store size in physical pixels
    pub size: (u32, u32),
}

impl SdfRenderState {
    pub async fn new(
        surface: wgpu::Surface<'static>,
        adapter: &wgpu::Adapter,
        width: u32,
        height: u32,
    ) -> Result<Self, wgpu::RequestDeviceError> {
        // Two buffers in one fragment stage fit well inside the downlevel limits
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("arena_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::downlevel_defaults(),
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await?;

        let caps = surface.get_capabilities(adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(wgpu::TextureFormat::is_srgb)
            .or_else(|| caps.formats.first().copied())
            .unwrap_or(wgpu::TextureFormat::Bgra8UnormSrgb);
        log::info!("Surface format {:?} (of {:?})", format, caps.formats);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: width.max(1),
            height: height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let globals_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("arena_globals"),
            contents: bytemuck::bytes_of(&Globals::zeroed()),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let (empty_bodies, _) = body_data(None);
        let bodies_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("arena_bodies"),
            contents: bytemuck::cast_slice(&empty_bodies),
            usage: wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        });

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("arena_bindings"),
            entries: &[
                fragment_buffer(0, wgpu::BufferBindingType::Uniform),
                fragment_buffer(1, wgpu::BufferBindingType::Storage { read_only: true }),
            ],
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("arena_bind_group"),
            layout: &layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: globals_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: bodies_buffer.as_entire_binding(),
                },
            ],
        });

        let pipeline = create_pipeline(&device, &layout, config.format);

        Ok(Self {
            surface,
            device,
            queue,
            size: (config.width, config.height),
            config,
            pipeline,
            globals_buffer,
            bodies_buffer,
            bind_group,
        })
    }

    /// Reconfigure the surface; zero-sized requests are ignored
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.size = (width, height);
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
    }

    /// Upload the world and draw a frame.
    ///
    /// `world` is `None` on the level select screen; only the empty arena is
    /// drawn then. `running` controls the dim overlay.
    pub fn render(
        &mut self,
        world: Option<&World>,
        running: bool,
        settings: &Settings,
        time_ms: f64,
    ) -> Result<(), wgpu::SurfaceError> {
        let (width, height) = (self.size.0 as f32, self.size.1 as f32);
        let viewport = Viewport::fit(width, height);
        let (bodies, body_count) = body_data(world);

        let globals = Globals {
            resolution: [width, height],
            time: (time_ms / 1000.0) as f32,
            scale: viewport.scale,
            origin: viewport.origin.to_array(),
            body_count,
            pulse: settings.pulse_amount(),
            dim: if running || world.is_none() { 0.0 } else { 0.35 },
            _pad: [0; 3],
        };
        self.queue
            .write_buffer(&self.globals_buffer, 0, bytemuck::bytes_of(&globals));
        self.queue
            .write_buffer(&self.bodies_buffer, 0, bytemuck::cast_slice(&bodies));

        self.draw()
    }

    fn draw(&self) -> Result<(), wgpu::SurfaceError> {
        let frame = self.surface.get_current_texture()?;
        let target = frame.texture.create_view(&Default::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("arena_frame"),
            });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("arena_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target,
                    resolve_target: None,
                    ops: wgpu::Operations::default(),
                    depth_slice: None,
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });
            pass.set_pipeline(&self.pipeline);
            pass.set_bind_group(0, &self.bind_group, &[]);
            pass.draw(0..3, 0..1);
        }

        self.queue.submit([encoder.finish()]);
        frame.present();
        Ok(())
    }
}
