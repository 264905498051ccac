//! Sound cues
//!
//! The simulation never plays audio itself. It queues `SimEvent`s, and the
//! host feeds them through `play_events` into whatever `AudioSink` it has.

use crate::profile::ProfileUpdate;
use crate::sim::SimEvent;

#[cfg(target_arch = "wasm32")]
mod web;
#[cfg(target_arch = "wasm32")]
pub use web::AudioManager;

/// Named sound effects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundCue {
    /// Two bodies knocked together
    Pop,
    /// Level started
    Unlock,
    /// Goal reached
    Complete,
    Achievement,
    LevelUp,
    /// Countdown ran out
    TimeUp,
}

impl SoundCue {
    /// Volume used when the caller has no better idea
    pub fn default_volume(self) -> f32 {
        match self {
            SoundCue::Pop | SoundCue::Unlock => 0.2,
            SoundCue::Complete | SoundCue::Achievement | SoundCue::LevelUp | SoundCue::TimeUp => {
                0.3
            }
        }
    }
}

/// Anything that can play a cue. Implementations must not fail loudly.
pub trait AudioSink {
    fn play(&mut self, cue: SoundCue, volume: f32);
}

/// Discards every cue (native builds, audio unavailable)
#[derive(Debug, Clone, Copy, Default)]
pub struct NullAudio;

impl AudioSink for NullAudio {
    fn play(&mut self, _cue: SoundCue, _volume: f32) {}
}

/// The cue and volume for a simulation event, if it makes a sound
pub fn cue_for(event: &SimEvent) -> Option<(SoundCue, f32)> {
    match *event {
        SimEvent::Impact { volume, .. } => Some((SoundCue::Pop, volume)),
        SimEvent::LevelStarted { .. } => Some((SoundCue::Unlock, 0.3)),
        SimEvent::LevelCompleted { .. } => Some((SoundCue::Complete, 0.3)),
        SimEvent::TimeUp { .. } => Some((SoundCue::TimeUp, SoundCue::TimeUp.default_volume())),
    }
}

/// Play every event that has a cue, in order
pub fn play_events(events: &[SimEvent], sink: &mut dyn AudioSink) {
    for event in events {
        if let Some((cue, volume)) = cue_for(event) {
            sink.play(cue, volume);
        }
    }
}

/// Level-up and achievement fanfare after a completion is credited
pub fn play_profile_update(update: &ProfileUpdate, sink: &mut dyn AudioSink) {
    for _ in &update.unlocked {
        sink.play(SoundCue::Achievement, SoundCue::Achievement.default_volume());
    }
    if update.levels_gained > 0 {
        sink.play(SoundCue::LevelUp, SoundCue::LevelUp.default_volume());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<(SoundCue, f32)>);

    impl AudioSink for Recorder {
        fn play(&mut self, cue: SoundCue, volume: f32) {
            self.0.push((cue, volume));
        }
    }

    #[test]
    fn test_events_map_to_cues() {
        let events = [
            SimEvent::LevelStarted { level_id: 1 },
            SimEvent::Impact {
                a: 1,
                b: 3,
                volume: 0.25,
            },
            SimEvent::LevelCompleted {
                level_id: 1,
                stars: 2,
                elapsed_secs: 12,
            },
        ];
        let mut sink = Recorder::default();
        play_events(&events, &mut sink);
        assert_eq!(
            sink.0,
            vec![
                (SoundCue::Unlock, 0.3),
                (SoundCue::Pop, 0.25),
                (SoundCue::Complete, 0.3),
            ]
        );
    }

    #[test]
    fn test_profile_fanfare() {
        let update = ProfileUpdate {
            points: 30,
            levels_gained: 1,
            unlocked: vec!["physics_master"],
        };
        let mut sink = Recorder::default();
        play_profile_update(&update, &mut sink);
        let cues: Vec<_> = sink.0.iter().map(|(c, _)| *c).collect();
        assert_eq!(cues, vec![SoundCue::Achievement, SoundCue::LevelUp]);

        play_profile_update(&ProfileUpdate::default(), &mut NullAudio);
    }
}
