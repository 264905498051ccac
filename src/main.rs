//! Gravity Puzzle entry point
//!
//! Handles platform-specific initialization and runs the game loop.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;

    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use web_sys::{Document, HtmlCanvasElement, KeyboardEvent, PointerEvent};

    use gravity_puzzle::audio::{AudioManager, play_events, play_profile_update};
    use gravity_puzzle::consts::TIMER_INTERVAL_MS;
    use gravity_puzzle::persistence::{Storage, platform_storage};
    use gravity_puzzle::renderer::SdfRenderState;
    use gravity_puzzle::sim::{Action, LevelCatalog, Phase, Session, SimEvent, Viewport};
    use gravity_puzzle::{Profile, PuzzleProgress, Settings, Tuning};

    /// Countdown interval, re-armed for every start or resume
    #[derive(Default)]
    struct Countdown {
        handle: Option<i32>,
        // Kept alive for as long as the interval may fire
        callback: Option<Closure<dyn FnMut()>>,
    }

    impl Countdown {
        fn clear(&mut self) {
            if let Some(handle) = self.handle.take() {
                if let Some(window) = web_sys::window() {
                    window.clear_interval_with_handle(handle);
                }
            }
        }
    }

    /// Game instance holding all state
    struct Game {
        session: Session,
        catalog: LevelCatalog,
        progress: PuzzleProgress,
        profile: Profile,
        settings: Settings,
        storage: Box<dyn Storage>,
        audio: AudioManager,
        render_state: Option<SdfRenderState>,
        /// CSS-pixel mapping for pointer input
        viewport: Viewport,
        countdown: Countdown,
        /// "How to Play" panel over the level list
        show_help: bool,
        // FPS tracking
        frame_times: [f64; 60],
        frame_index: usize,
        fps: u32,
    }

    impl Game {
        fn new() -> Self {
            let storage = platform_storage();
            let settings = Settings::load(storage.as_ref());
            let mut audio = AudioManager::new();
            audio.apply_settings(&settings);

            Self {
                session: Session::new(Tuning::default()),
                catalog: LevelCatalog::builtin(),
                progress: PuzzleProgress::load(storage.as_ref()),
                profile: Profile::load(storage.as_ref()),
                settings,
                storage,
                audio,
                render_state: None,
                viewport: Viewport::default(),
                countdown: Countdown::default(),
                show_help: false,
                frame_times: [0.0; 60],
                frame_index: 0,
                fps: 0,
            }
        }

        /// Feed an action to the session and handle whatever it produced
        fn dispatch(&mut self, action: Action) {
            if matches!(action, Action::Resume { .. }) {
                self.audio.resume();
            }
            self.session.dispatch(action);
            self.handle_events();
            if !self.session.is_running() {
                self.countdown.clear();
            }
        }

        fn handle_events(&mut self) {
            let events = self.session.drain_events();
            if events.is_empty() {
                return;
            }
            play_events(&events, &mut self.audio);

            let completed = events
                .iter()
                .any(|e| matches!(e, SimEvent::LevelCompleted { .. }));
            if let (true, Some(completion)) = (completed, self.session.completion()) {
                self.progress.record(completion.level_id, completion.stars);
                self.progress.save(self.storage.as_mut());

                let all_done = self
                    .catalog
                    .levels
                    .iter()
                    .all(|level| self.progress.is_completed(level.id));
                let update = self.profile.apply_completion(&completion, all_done);
                self.profile.save(self.storage.as_mut());
                play_profile_update(&update, &mut self.audio);
            }
        }

        fn enter_level(&mut self, level_id: u32) {
            match self.catalog.get(level_id) {
                Some(level) => {
                    let level = level.clone();
                    self.audio.resume();
                    self.dispatch(Action::Enter { level });
                }
                None => log::warn!("No level with id {}", level_id),
            }
        }

        /// Next catalog level after the current one, if any
        fn next_level_id(&self) -> Option<u32> {
            let current = self.session.level.as_ref()?.id;
            let index = self.catalog.levels.iter().position(|l| l.id == current)?;
            self.catalog.levels.get(index + 1).map(|l| l.id)
        }

        fn pointer_to_world(&self, event: &PointerEvent) -> Vec2 {
            self.viewport
                .screen_to_world(Vec2::new(event.offset_x() as f32, event.offset_y() as f32))
        }

        fn toggle_mute(&mut self) {
            self.settings.muted = !self.settings.muted;
            self.audio.apply_settings(&self.settings);
            self.settings.save(self.storage.as_mut());
            log::info!("Muted: {}", self.settings.muted);
        }

        /// Auto-pause when the page is hidden or loses focus
        fn auto_pause(&mut self, reason: &str) {
            if self.settings.mute_on_blur && self.session.is_running() {
                self.dispatch(Action::Pause);
                self.audio.suspend();
                log::info!("Auto-paused ({})", reason);
            }
        }

        fn track_fps(&mut self, time: f64) {
            self.frame_times[self.frame_index] = time;
            self.frame_index = (self.frame_index + 1) % 60;

            let oldest_time = self.frame_times[self.frame_index];
            if oldest_time > 0.0 {
                let elapsed = time - oldest_time;
                if elapsed > 0.0 {
                    self.fps = (60000.0 / elapsed).round() as u32;
                }
            }
        }

        fn render(&mut self, time: f64) {
            let running = self.session.is_running();
            if let Some(ref mut render_state) = self.render_state {
                match render_state.render(self.session.world.as_ref(), running, &self.settings, time) {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => {
                        render_state.resize(render_state.size.0, render_state.size.1);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => {
                        log::error!("Out of memory!");
                    }
                    Err(e) => log::warn!("Render error: {:?}", e),
                }
            }
        }

        /// Update HUD elements and overlays in the DOM
        fn update_hud(&self, document: &Document) {
            let set_text = |selector: &str, text: &str| {
                if let Some(el) = document.query_selector(selector).ok().flatten() {
                    if el.text_content().as_deref() != Some(text) {
                        el.set_text_content(Some(text));
                    }
                }
            };
            // Toggle the `hidden` class, keeping any others
            let show = |id: &str, visible: bool| {
                if let Some(el) = document.get_element_by_id(id) {
                    let class = el.class_name();
                    let mut tokens: Vec<&str> =
                        class.split_whitespace().filter(|t| *t != "hidden").collect();
                    if !visible {
                        tokens.push("hidden");
                    }
                    let updated = tokens.join(" ");
                    if updated != class {
                        el.set_class_name(&updated);
                    }
                }
            };

            let phase = self.session.phase;
            let level_name = self
                .session
                .level
                .as_ref()
                .map(|l| l.name.as_str())
                .unwrap_or("");

            set_text("#hud-level .hud-value", level_name);
            set_text("#hud-time .hud-value", &format!("{}s", self.session.time_remaining));
            set_text("#hud-fps .hud-value", &self.fps.to_string());
            set_text("#hud-stars .hud-value", &self.progress.total_stars().to_string());
            set_text("#hud-rank .hud-value", &self.profile.level.to_string());
            set_text("#hud-score .hud-value", &self.profile.score.to_string());
            set_text("#level-summary", &self.progress.summary(self.catalog.len()));

            for level in &self.catalog.levels {
                let stars = self.progress.stars(level.id);
                set_text(&format!("#level-{} .level-stars", level.id), &star_string(stars));
            }

            show("hud", phase != Phase::LevelSelect);
            show("hud-fps", self.settings.show_fps);
            show("level-select", phase == Phase::LevelSelect && !self.show_help);
            show("help-panel", phase == Phase::LevelSelect && self.show_help);
            show("ready-prompt", phase == Phase::Ready);
            show("pause-menu", phase == Phase::Paused);
            show("timeout-panel", phase == Phase::TimedOut);

            if let Phase::Completed(completion) = phase {
                set_text("#complete-stars", &star_string(completion.stars));
                set_text("#complete-time", &format!("{}s", completion.elapsed_secs));
                set_text("#complete-points", &format!("+{}", completion.points));
                show("next-btn", self.next_level_id().is_some());
                show("complete-panel", true);
            } else {
                show("complete-panel", false);
            }
        }
    }

    fn star_string(stars: u8) -> String {
        (0..3).map(|i| if i < stars { '★' } else { '☆' }).collect()
    }

    /// Dispatch a command that may start or resume the countdown
    fn dispatch(game: &Rc<RefCell<Game>>, action: Action) {
        let arm = matches!(action, Action::Start { .. } | Action::Resume { .. });
        game.borrow_mut().dispatch(action);
        if arm && game.borrow().session.is_running() {
            arm_countdown(game);
        }
    }

    /// (Re)start the one-second countdown for the current attempt
    fn arm_countdown(game: &Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let attempt = game.borrow().session.attempt;

        let callback = {
            let game = game.clone();
            Closure::<dyn FnMut()>::new(move || {
                game.borrow_mut().dispatch(Action::TimerTick { attempt });
            })
        };

        let mut g = game.borrow_mut();
        g.countdown.clear();
        match window.set_interval_with_callback_and_timeout_and_arguments_0(
            callback.as_ref().unchecked_ref(),
            TIMER_INTERVAL_MS,
        ) {
            Ok(handle) => g.countdown.handle = Some(handle),
            Err(e) => log::error!("Failed to start countdown: {:?}", e),
        }
        g.countdown.callback = Some(callback);
    }

    fn now_ms() -> f64 {
        web_sys::window()
            .and_then(|w| w.performance())
            .map(|p| p.now())
            .unwrap_or_else(js_sys::Date::now)
    }

    pub async fn run() {
        console_error_panic_hook::set_once();
        if console_log::init_with_level(log::Level::Info).is_err() {
            web_sys::console::warn_1(&"Logger already initialized".into());
        }

        log::info!("Gravity Puzzle starting...");

        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };

        if let Some(loading) = document.get_element_by_id("loading") {
            let _ = loading.set_attribute("class", "hidden");
        }

        let Some(canvas) = document
            .get_element_by_id("canvas")
            .and_then(|el| el.dyn_into::<HtmlCanvasElement>().ok())
        else {
            log::error!("No #canvas element");
            return;
        };

        let (width, height) = fit_canvas(&window, &canvas);

        let game = Rc::new(RefCell::new(Game::new()));
        game.borrow_mut().viewport =
            Viewport::fit(canvas.client_width() as f32, canvas.client_height() as f32);

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::BROWSER_WEBGPU,
            ..Default::default()
        });

        match instance.create_surface(wgpu::SurfaceTarget::Canvas(canvas.clone())) {
            Ok(surface) => {
                let adapter = instance
                    .request_adapter(&wgpu::RequestAdapterOptions {
                        power_preference: wgpu::PowerPreference::HighPerformance,
                        compatible_surface: Some(&surface),
                        force_fallback_adapter: false,
                    })
                    .await;
                match adapter {
                    Ok(adapter) => {
                        log::info!("Using adapter: {:?}", adapter.get_info().name);
                        match SdfRenderState::new(surface, &adapter, width, height).await {
                            Ok(render_state) => game.borrow_mut().render_state = Some(render_state),
                            Err(e) => log::error!("Failed to create device: {}", e),
                        }
                    }
                    Err(e) => log::error!("Failed to get adapter: {}", e),
                }
            }
            Err(e) => log::error!("Failed to create surface: {}", e),
        }

        build_level_list(&document, game.clone());
        setup_pointer_handlers(&canvas, game.clone());
        setup_keyboard(game.clone());
        setup_buttons(&document, game.clone());
        setup_resize(canvas, game.clone());
        setup_auto_pause(game.clone());

        request_animation_frame(game);

        log::info!("Gravity Puzzle running!");
    }

    /// Size the canvas backing store to its CSS size times the device pixel ratio
    fn fit_canvas(window: &web_sys::Window, canvas: &HtmlCanvasElement) -> (u32, u32) {
        let dpr = window.device_pixel_ratio();
        let width = ((canvas.client_width() as f64 * dpr) as u32).max(1);
        let height = ((canvas.client_height() as f64 * dpr) as u32).max(1);
        canvas.set_width(width);
        canvas.set_height(height);
        (width, height)
    }

    fn build_level_list(document: &Document, game: Rc<RefCell<Game>>) {
        let Some(list) = document.get_element_by_id("level-list") else {
            return;
        };
        list.set_inner_html("");

        let levels: Vec<_> = game
            .borrow()
            .catalog
            .levels
            .iter()
            .map(|l| (l.id, l.name.clone(), l.description.clone(), l.time_limit_secs))
            .collect();

        for (id, name, description, time_limit) in levels {
            let Ok(button) = document.create_element("button") else {
                continue;
            };
            button.set_id(&format!("level-{}", id));
            let _ = button.set_attribute("class", "level-btn");
            button.set_inner_html(&format!(
                "<span class=\"level-name\">{}</span>\
                 <span class=\"level-desc\">{}</span>\
                 <span class=\"level-meta\">{}s</span>\
                 <span class=\"level-stars\"></span>",
                name, description, time_limit
            ));

            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
                game.borrow_mut().enter_level(id);
            });
            let _ = button.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
            closure.forget();

            let _ = list.append_child(&button);
        }
    }

    fn setup_pointer_handlers(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        // Press - pick up whatever is under the pointer
        {
            let game = game.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                let mut g = game.borrow_mut();
                let point = g.pointer_to_world(&event);
                let Some(body_id) = g.session.world.as_ref().and_then(|w| w.body_at(point)) else {
                    return;
                };
                event.prevent_default();
                let _ = canvas_clone.set_pointer_capture(event.pointer_id());
                g.audio.resume();
                g.dispatch(Action::Grab { body_id });
            });
            let _ = canvas
                .add_event_listener_with_callback("pointerdown", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Move - drag the held body
        {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: PointerEvent| {
                let mut g = game.borrow_mut();
                let held = g.session.world.as_ref().and_then(|w| w.grabbed_id());
                if held.is_some() {
                    let point = g.pointer_to_world(&event);
                    g.dispatch(Action::DragTo { point });
                }
            });
            let _ = canvas
                .add_event_listener_with_callback("pointermove", closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Up / cancel / leave - drop it
        for name in ["pointerup", "pointercancel", "pointerleave"] {
            let game = game.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: PointerEvent| {
                let mut g = game.borrow_mut();
                if let Some(body_id) = g.session.world.as_ref().and_then(|w| w.grabbed_id()) {
                    g.dispatch(Action::Release { body_id });
                }
            });
            let _ = canvas.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn setup_keyboard(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::<dyn FnMut(_)>::new(move |event: KeyboardEvent| {
            let phase = game.borrow().session.phase;
            match (event.key().as_str(), phase) {
                (" " | "Enter", Phase::Ready) => {
                    game.borrow().audio.resume();
                    dispatch(&game, Action::Start { now_ms: now_ms() });
                }
                (" " | "Enter", Phase::Paused) => dispatch(&game, Action::Resume { now_ms: now_ms() }),
                (" " | "Enter", Phase::Completed(_)) => {
                    let next = game.borrow().next_level_id();
                    match next {
                        Some(id) => game.borrow_mut().enter_level(id),
                        None => dispatch(&game, Action::ExitToSelect),
                    }
                }
                ("Escape", Phase::Running) => dispatch(&game, Action::Pause),
                ("Escape", Phase::LevelSelect) => game.borrow_mut().show_help = false,
                ("Escape", _) => dispatch(&game, Action::ExitToSelect),
                ("r" | "R", phase) if phase != Phase::LevelSelect => dispatch(&game, Action::Restart),
                ("m" | "M", _) => game.borrow_mut().toggle_mute(),
                ("f" | "F", _) => {
                    let mut g = game.borrow_mut();
                    g.settings.show_fps = !g.settings.show_fps;
                    let settings = g.settings.clone();
                    settings.save(g.storage.as_mut());
                }
                (key, Phase::LevelSelect) => {
                    if let Ok(id) = key.parse::<u32>() {
                        game.borrow_mut().enter_level(id);
                    }
                }
                _ => {}
            }
        });
        let _ = window.add_event_listener_with_callback("keydown", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn bind_click(document: &Document, game: &Rc<RefCell<Game>>, id: &str, handler: fn(&Rc<RefCell<Game>>)) {
        let Some(btn) = document.get_element_by_id(id) else {
            return;
        };
        let game = game.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::MouseEvent| {
            handler(&game);
        });
        let _ = btn.add_event_listener_with_callback("click", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_buttons(document: &Document, game: Rc<RefCell<Game>>) {
        bind_click(document, &game, "start-btn", |game| {
            game.borrow().audio.resume();
            dispatch(game, Action::Start { now_ms: now_ms() });
        });
        bind_click(document, &game, "resume-btn", |game| {
            dispatch(game, Action::Resume { now_ms: now_ms() })
        });
        for id in ["restart-btn", "retry-btn", "pause-restart-btn"] {
            bind_click(document, &game, id, |game| dispatch(game, Action::Restart));
        }
        for id in ["menu-btn", "pause-menu-btn", "complete-menu-btn", "timeout-menu-btn"] {
            bind_click(document, &game, id, |game| dispatch(game, Action::ExitToSelect));
        }
        bind_click(document, &game, "next-btn", |game| {
            let next = game.borrow().next_level_id();
            if let Some(id) = next {
                game.borrow_mut().enter_level(id);
            }
        });
        bind_click(document, &game, "mute-btn", |game| game.borrow_mut().toggle_mute());
        bind_click(document, &game, "help-btn", |game| game.borrow_mut().show_help = true);
        bind_click(document, &game, "help-close-btn", |game| game.borrow_mut().show_help = false);
    }

    fn setup_resize(canvas: HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let window_clone = window.clone();
        let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
            let (width, height) = fit_canvas(&window_clone, &canvas);
            let mut g = game.borrow_mut();
            g.viewport = Viewport::fit(canvas.client_width() as f32, canvas.client_height() as f32);
            if let Some(render_state) = g.render_state.as_mut() {
                render_state.resize(width, height);
            }
        });
        let _ = window.add_event_listener_with_callback("resize", closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn setup_auto_pause(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let Some(document) = window.document() else {
            return;
        };

        // Visibility change (tab switch, minimize)
        {
            let game = game.clone();
            let document_clone = document.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::Event| {
                if document_clone.visibility_state() == web_sys::VisibilityState::Hidden {
                    game.borrow_mut().auto_pause("tab hidden");
                }
            });
            let _ = document.add_event_listener_with_callback(
                "visibilitychange",
                closure.as_ref().unchecked_ref(),
            );
            closure.forget();
        }

        // Window blur (click outside)
        {
            let closure = Closure::<dyn FnMut(_)>::new(move |_event: web_sys::FocusEvent| {
                game.borrow_mut().auto_pause("window blur");
            });
            let _ = window.add_event_listener_with_callback("blur", closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let closure = Closure::once(move |time: f64| {
            game_loop(game, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, time: f64) {
        {
            let mut g = game.borrow_mut();
            g.track_fps(time);
            if g.session.is_running() {
                g.dispatch(Action::Frame { now_ms: time });
            }
            g.render(time);
            if let Some(document) = web_sys::window().and_then(|w| w.document()) {
                g.update_hud(&document);
            }
        }

        request_animation_frame(game);
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub async fn wasm_main() {
    wasm_game::run().await;
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Gravity Puzzle (native) starting...");
    log::info!("Rendering requires a browser - run with `trunk serve` for the web version");

    let catalog = match std::env::args().nth(1) {
        Some(path) => match std::fs::read_to_string(&path) {
            Ok(json) => match gravity_puzzle::sim::LevelCatalog::from_json(&json) {
                Ok(catalog) => catalog,
                Err(e) => {
                    log::error!("Invalid level file {}: {}", path, e);
                    std::process::exit(1);
                }
            },
            Err(e) => {
                log::error!("Could not read {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => gravity_puzzle::sim::LevelCatalog::builtin(),
    };

    let tuning = match std::env::args().nth(2) {
        Some(path) => match std::fs::read_to_string(&path)
            .map_err(|e| e.to_string())
            .and_then(|json| gravity_puzzle::Tuning::from_json(&json).map_err(|e| e.to_string()))
        {
            Ok(tuning) => tuning,
            Err(e) => {
                log::error!("Invalid tuning file {}: {}", path, e);
                std::process::exit(1);
            }
        },
        None => gravity_puzzle::Tuning::default(),
    };

    headless::run_catalog(&catalog, &tuning);
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Play every level untouched at 60 frames per second and report the result
#[cfg(not(target_arch = "wasm32"))]
mod headless {
    use gravity_puzzle::audio::{NullAudio, play_events};
    use gravity_puzzle::sim::{Action, LevelCatalog, Phase, Session};
    use gravity_puzzle::Tuning;

    const FRAME_MS: f64 = 1000.0 / 60.0;

    pub fn run_catalog(catalog: &LevelCatalog, tuning: &Tuning) {
        let mut audio = NullAudio;
        for level in &catalog.levels {
            let mut session = Session::new(tuning.clone());
            session.dispatch(Action::Enter {
                level: level.clone(),
            });
            session.dispatch(Action::Start { now_ms: 0.0 });

            let mut now = 0.0;
            let mut frame = 0u64;
            while session.is_running() {
                frame += 1;
                now += FRAME_MS;
                session.dispatch(Action::Frame { now_ms: now });
                if frame % 60 == 0 {
                    let attempt = session.attempt;
                    session.dispatch(Action::TimerTick { attempt });
                }
                play_events(&session.drain_events(), &mut audio);
            }

            match session.phase {
                Phase::Completed(c) => println!(
                    "{:>2} {:<16} completed in {}s, {} stars",
                    level.id, level.name, c.elapsed_secs, c.stars
                ),
                _ => println!(
                    "{:>2} {:<16} not solved without help ({}s limit)",
                    level.id, level.name, level.time_limit_secs
                ),
            }
        }
    }
}
