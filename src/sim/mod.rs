//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - One fixed step per call, no wall-clock reads
//! - Stable iteration order (by body ID)
//! - No rendering, audio or platform dependencies

pub mod collision;
pub mod input;
pub mod level;
pub mod session;
pub mod state;
pub mod tick;

pub use collision::{Contact, PairResponse, circle_contact, resolve_boundary, resolve_pair};
pub use input::{Viewport, drag_to, grab, release};
pub use level::{Level, LevelCatalog, LevelError};
pub use session::{Action, Completion, Phase, Session, reduce};
pub use state::{Body, BodyKind, SimEvent, StepOutcome, World};
pub use tick::{tick, well_acceleration};
