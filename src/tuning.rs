//! Data-driven physics balance
//!
//! Defaults mirror `consts`; a level pack may ship its own tuning as JSON.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// How fixed bodies enter the impulse denominator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FixedMass {
    /// Fixed bodies contribute no inverse mass (true infinite mass)
    #[default]
    Infinite,
    /// Fixed bodies contribute `1 / mass` like any other body; only the
    /// velocity write is skipped. Moving bodies rebound softer off light anchors.
    Finite,
}

/// Physics constants for one world
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    pub friction: f32,
    pub max_speed: f32,
    pub well_strength: f32,
    pub correction_percent: f32,
    pub impact_sound_threshold: f32,
    pub fixed_mass: FixedMass,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            friction: FRICTION,
            max_speed: MAX_SPEED,
            well_strength: WELL_STRENGTH,
            correction_percent: CORRECTION_PERCENT,
            impact_sound_threshold: IMPACT_SOUND_THRESHOLD,
            fixed_mass: FixedMass::Infinite,
        }
    }
}

impl Tuning {
    /// Parse tuning overrides; missing fields keep their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
