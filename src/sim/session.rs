//! Puzzle session state machine
//!
//! Everything that happens to a level attempt goes through `reduce`, a pure
//! `(Session, Action) -> Session` transition. The browser host turns DOM
//! events, animation frames and the countdown interval into actions.

use glam::Vec2;

use super::input;
use super::level::Level;
use super::state::{SimEvent, StepOutcome, World};
use super::tick::tick;
use crate::consts::{POINTS_PER_STAR, STEP_INTERVAL_MS};
use crate::tuning::Tuning;

/// Outcome of a finished attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    pub level_id: u32,
    /// Whole seconds used: time limit minus what was left on the countdown
    pub elapsed_secs: u32,
    pub stars: u8,
    pub points: u64,
}

/// Where the session is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Choosing a level, no world exists
    LevelSelect,
    /// World built, waiting for the start command (bodies may be dragged)
    Ready,
    Running,
    Paused,
    Completed(Completion),
    /// Countdown hit zero before the goal was reached
    TimedOut,
}

/// Input to the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Build a fresh attempt from a catalog template
    Enter { level: Level },
    Start { now_ms: f64 },
    /// Animation frame callback
    Frame { now_ms: f64 },
    /// One second of the countdown, stamped with the attempt that armed it
    TimerTick { attempt: u32 },
    Grab { body_id: u32 },
    Release { body_id: u32 },
    DragTo { point: Vec2 },
    Pause,
    Resume { now_ms: f64 },
    Restart,
    ExitToSelect,
}

/// State of the puzzle widget
#[derive(Debug, Clone)]
pub struct Session {
    pub phase: Phase,
    /// Template of the current (or last played) level
    pub level: Option<Level>,
    /// Live bodies; only present while an attempt is in progress
    pub world: Option<World>,
    pub tuning: Tuning,
    pub time_remaining: u32,
    /// Bumped every time an attempt is built or torn down
    pub attempt: u32,
    last_step_ms: f64,
    /// Pending events, drained by the host
    pub events: Vec<SimEvent>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(Tuning::default())
    }
}

impl Session {
    pub fn new(tuning: Tuning) -> Self {
        Self {
            phase: Phase::LevelSelect,
            level: None,
            world: None,
            tuning,
            time_remaining: 0,
            attempt: 0,
            last_step_ms: 0.0,
            events: Vec::new(),
        }
    }

    /// Apply an action in place
    pub fn dispatch(&mut self, action: Action) {
        let current = std::mem::take(self);
        *self = reduce(current, action);
    }

    /// True while the physics clock and countdown should be running
    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn completion(&self) -> Option<Completion> {
        match self.phase {
            Phase::Completed(c) => Some(c),
            _ => None,
        }
    }

    /// Take all pending events
    pub fn drain_events(&mut self) -> Vec<SimEvent> {
        std::mem::take(&mut self.events)
    }

    fn build_attempt(&mut self, level: Level) {
        self.world = Some(level.instantiate(&self.tuning));
        self.time_remaining = level.time_limit_secs;
        self.attempt = self.attempt.wrapping_add(1);
        self.phase = Phase::Ready;
        self.level = Some(level);
    }

    fn teardown(&mut self) {
        self.world = None;
        self.attempt = self.attempt.wrapping_add(1);
    }

    fn step(&mut self, now_ms: f64) {
        if now_ms - self.last_step_ms <= STEP_INTERVAL_MS {
            return;
        }
        self.last_step_ms = now_ms;

        let Some(world) = self.world.as_mut() else {
            return;
        };
        let outcome = tick(world);
        self.events.append(&mut world.events);

        if outcome == StepOutcome::GoalReached {
            self.complete();
        }
    }

    fn complete(&mut self) {
        let Some(level) = self.level.as_ref() else {
            return;
        };
        let elapsed_secs = level.time_limit_secs.saturating_sub(self.time_remaining);
        let stars = level.star_rating(elapsed_secs);
        let completion = Completion {
            level_id: level.id,
            elapsed_secs,
            stars,
            points: stars as u64 * POINTS_PER_STAR,
        };

        log::info!(
            "Level {} complete in {}s ({} stars)",
            level.id,
            elapsed_secs,
            stars
        );
        self.events.push(SimEvent::LevelCompleted {
            level_id: level.id,
            stars,
            elapsed_secs,
        });
        self.phase = Phase::Completed(completion);
        self.teardown();
    }
}

/// Advance the session by one action
pub fn reduce(mut session: Session, action: Action) -> Session {
    match action {
        Action::Enter { level } => {
            log::info!("Entering level {} ({})", level.id, level.name);
            session.build_attempt(level);
        }

        Action::Restart => {
            if let Some(level) = session.level.take() {
                log::info!("Restarting level {}", level.id);
                session.build_attempt(level);
            }
        }

        Action::ExitToSelect => {
            session.teardown();
            session.phase = Phase::LevelSelect;
        }

        Action::Start { now_ms } => {
            if session.phase == Phase::Ready {
                session.phase = Phase::Running;
                session.last_step_ms = now_ms;
                if let Some(level) = &session.level {
                    session.events.push(SimEvent::LevelStarted { level_id: level.id });
                }
            }
        }

        Action::Pause => {
            if session.phase == Phase::Running {
                session.phase = Phase::Paused;
            }
        }

        Action::Resume { now_ms } => {
            if session.phase == Phase::Paused {
                session.phase = Phase::Running;
                session.last_step_ms = now_ms;
            }
        }

        Action::Frame { now_ms } => {
            if session.phase == Phase::Running {
                session.step(now_ms);
            }
        }

        Action::TimerTick { attempt } => {
            if attempt != session.attempt {
                log::debug!("Ignoring countdown tick from attempt {}", attempt);
            } else if session.phase == Phase::Running {
                session.time_remaining = session.time_remaining.saturating_sub(1);
                if session.time_remaining == 0 {
                    let level_id = session.level.as_ref().map(|l| l.id).unwrap_or_default();
                    log::info!("Level {} timed out", level_id);
                    session.events.push(SimEvent::TimeUp { level_id });
                    session.phase = Phase::TimedOut;
                    session.teardown();
                }
            }
        }

        Action::Grab { body_id } => {
            if matches!(session.phase, Phase::Ready | Phase::Running) {
                if let Some(world) = session.world.as_mut() {
                    input::grab(world, body_id);
                }
            }
        }

        Action::Release { body_id } => {
            if let Some(world) = session.world.as_mut() {
                input::release(world, body_id);
            }
        }

        Action::DragTo { point } => {
            if matches!(session.phase, Phase::Ready | Phase::Running) {
                if let Some(world) = session.world.as_mut() {
                    input::drag_to(world, point);
                }
            }
        }
    }

    session
}
