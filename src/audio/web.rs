//! Web Audio backend
//!
//! Procedurally generated cues, no sample files to fetch.

use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

use super::{AudioSink, SoundCue};
use crate::settings::Settings;

/// Oscillator-based sound player
pub struct AudioManager {
    ctx: Option<AudioContext>,
    master_volume: f32,
    sfx_volume: f32,
    muted: bool,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioManager {
    pub fn new() -> Self {
        // May fail outside a secure context
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        Self {
            ctx,
            master_volume: 0.8,
            sfx_volume: 1.0,
            muted: false,
        }
    }

    /// Resume audio context (required after user gesture)
    pub fn resume(&self) {
        if let Some(ctx) = &self.ctx {
            let _ = ctx.resume();
        }
    }

    /// Pick up volume and mute from the player's settings
    pub fn apply_settings(&mut self, settings: &Settings) {
        self.master_volume = settings.master_volume.clamp(0.0, 1.0);
        self.sfx_volume = settings.sfx_volume.clamp(0.0, 1.0);
        self.muted = settings.muted;
    }

    /// Silence everything in flight until the next `resume`
    pub fn suspend(&self) {
        if let Some(ctx) = &self.ctx {
            let _ = ctx.suspend();
        }
    }

    fn effective_volume(&self) -> f32 {
        if self.muted {
            0.0
        } else {
            self.master_volume * self.sfx_volume
        }
    }

    /// Create an oscillator with gain envelope
    fn create_osc(
        &self,
        ctx: &AudioContext,
        freq: f32,
        osc_type: OscillatorType,
    ) -> Option<(OscillatorNode, GainNode)> {
        let osc = ctx.create_oscillator().ok()?;
        let gain = ctx.create_gain().ok()?;

        osc.set_type(osc_type);
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        Some((osc, gain))
    }

    /// Single note with exponential decay, optionally delayed
    fn note(&self, ctx: &AudioContext, freq: f32, wave: OscillatorType, vol: f32, delay: f64, length: f64) {
        let Some((osc, gain)) = self.create_osc(ctx, freq, wave) else {
            return;
        };
        let t = ctx.current_time() + delay;
        gain.gain().set_value_at_time(vol, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.001, t + length)
            .ok();
        osc.start_with_when(t).ok();
        osc.stop_with_when(t + length + 0.05).ok();
    }

    /// Pop - short falling blip
    fn play_pop(&self, ctx: &AudioContext, vol: f32) {
        let Some((osc, gain)) = self.create_osc(ctx, 520.0, OscillatorType::Sine) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(vol, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.001, t + 0.08)
            .ok();
        osc.frequency().set_value_at_time(520.0, t).ok();
        osc.frequency()
            .exponential_ramp_to_value_at_time(180.0, t + 0.08)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.1).ok();
    }

    /// Unlock - rising two-note chirp
    fn play_unlock(&self, ctx: &AudioContext, vol: f32) {
        self.note(ctx, 440.0, OscillatorType::Triangle, vol, 0.0, 0.12);
        self.note(ctx, 660.0, OscillatorType::Triangle, vol, 0.08, 0.15);
    }

    /// Complete - major arpeggio
    fn play_complete(&self, ctx: &AudioContext, vol: f32) {
        for (i, freq) in [523.0, 659.0, 784.0, 1047.0].iter().enumerate() {
            self.note(ctx, *freq, OscillatorType::Triangle, vol, i as f64 * 0.1, 0.35);
        }
    }

    /// Achievement - sparkly chime
    fn play_achievement(&self, ctx: &AudioContext, vol: f32) {
        for (i, freq) in [1200.0, 1800.0, 2400.0].iter().enumerate() {
            self.note(ctx, *freq, OscillatorType::Sine, vol * 0.7, i as f64 * 0.03, 0.3);
        }
    }

    /// Level up - fast climbing run
    fn play_level_up(&self, ctx: &AudioContext, vol: f32) {
        for (i, freq) in [500.0, 600.0, 700.0, 800.0, 1000.0].iter().enumerate() {
            self.note(ctx, *freq, OscillatorType::Triangle, vol, i as f64 * 0.08, 0.25);
        }
    }

    /// Time up - sad descending
    fn play_time_up(&self, ctx: &AudioContext, vol: f32) {
        for (i, freq) in [400.0, 350.0, 300.0, 200.0].iter().enumerate() {
            self.note(ctx, *freq, OscillatorType::Sine, vol, i as f64 * 0.2, 0.3);
        }
    }
}

impl AudioSink for AudioManager {
    fn play(&mut self, cue: SoundCue, volume: f32) {
        let vol = volume.clamp(0.0, 1.0) * self.effective_volume();
        if vol <= 0.0 {
            return;
        }

        let Some(ctx) = &self.ctx else { return };

        // Browsers keep the context suspended until a user gesture
        if ctx.state() == web_sys::AudioContextState::Suspended {
            let _ = ctx.resume();
        }

        match cue {
            SoundCue::Pop => self.play_pop(ctx, vol),
            SoundCue::Unlock => self.play_unlock(ctx, vol),
            SoundCue::Complete => self.play_complete(ctx, vol),
            SoundCue::Achievement => self.play_achievement(ctx, vol),
            SoundCue::LevelUp => self.play_level_up(ctx, vol),
            SoundCue::TimeUp => self.play_time_up(ctx, vol),
        }
    }
}
