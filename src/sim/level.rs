//! Level catalog
//!
//! Levels are immutable templates. Every attempt gets its own deep copy via
//! `Level::instantiate`, so nothing leaks from one attempt into the next.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::state::{Body, BodyKind, World};
use crate::consts::*;
use crate::tuning::Tuning;

/// A single puzzle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub id: u32,
    pub name: String,
    pub description: String,
    pub bodies: Vec<Body>,
    pub gravity: Vec2,
    pub time_limit_secs: u32,
    /// Elapsed-second thresholds for 3, 2 and 1 stars
    pub star_times: [u32; 3],
}

/// Why a level template was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum LevelError {
    /// Level must have exactly one player and one goal
    BodyCount { level_id: u32, kind: BodyKind, count: usize },
    DuplicateBodyId { level_id: u32, body_id: u32 },
    /// Radius or mass not strictly positive
    BadDimensions { level_id: u32, body_id: u32 },
    /// Star thresholds must be strictly increasing
    BadStarTimes { level_id: u32 },
    Parse(String),
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelError::BodyCount { level_id, kind, count } => {
                write!(f, "level {level_id}: expected exactly one {kind:?}, found {count}")
            }
            LevelError::DuplicateBodyId { level_id, body_id } => {
                write!(f, "level {level_id}: body id {body_id} used twice")
            }
            LevelError::BadDimensions { level_id, body_id } => {
                write!(f, "level {level_id}: body {body_id} needs positive radius and mass")
            }
            LevelError::BadStarTimes { level_id } => {
                write!(f, "level {level_id}: star thresholds must increase")
            }
            LevelError::Parse(msg) => write!(f, "invalid level data: {msg}"),
        }
    }
}

impl std::error::Error for LevelError {}

impl Level {
    /// Check the template against the body invariants
    pub fn validate(&self) -> Result<(), LevelError> {
        for kind in [BodyKind::Player, BodyKind::Goal] {
            let count = self.bodies.iter().filter(|b| b.kind == kind).count();
            if count != 1 {
                return Err(LevelError::BodyCount {
                    level_id: self.id,
                    kind,
                    count,
                });
            }
        }

        let mut seen = Vec::with_capacity(self.bodies.len());
        for body in &self.bodies {
            if seen.contains(&body.id) {
                return Err(LevelError::DuplicateBodyId {
                    level_id: self.id,
                    body_id: body.id,
                });
            }
            seen.push(body.id);

            if !(body.radius > 0.0 && body.mass > 0.0) {
                return Err(LevelError::BadDimensions {
                    level_id: self.id,
                    body_id: body.id,
                });
            }
        }

        if !self.star_times.windows(2).all(|w| w[0] < w[1]) {
            return Err(LevelError::BadStarTimes { level_id: self.id });
        }

        Ok(())
    }

    /// Fresh world for a new attempt
    pub fn instantiate(&self, tuning: &Tuning) -> World {
        let mut bodies = self.bodies.clone();
        for body in &mut bodies {
            body.grabbed = false;
        }
        World::new(bodies, self.gravity, tuning.clone())
    }

    /// Stars earned for finishing after `elapsed_secs`
    pub fn star_rating(&self, elapsed_secs: u32) -> u8 {
        if elapsed_secs <= self.star_times[0] {
            3
        } else if elapsed_secs <= self.star_times[1] {
            2
        } else {
            1
        }
    }
}

/// Ordered list of levels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelCatalog {
    pub levels: Vec<Level>,
}

impl LevelCatalog {
    /// The three stock puzzles
    pub fn builtin() -> Self {
        Self {
            levels: vec![simple_roll(), bounce_around(), gravity_wells()],
        }
    }

    /// Load and validate a catalog from JSON
    pub fn from_json(json: &str) -> Result<Self, LevelError> {
        let catalog: LevelCatalog =
            serde_json::from_str(json).map_err(|e| LevelError::Parse(e.to_string()))?;
        for level in &catalog.levels {
            level.validate()?;
        }
        Ok(catalog)
    }

    pub fn get(&self, level_id: u32) -> Option<&Level> {
        self.levels.iter().find(|l| l.id == level_id)
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }
}

fn player() -> Body {
    Body::new(1, BodyKind::Player, Vec2::new(20.0, 20.0), PLAYER_RADIUS)
        .with_mass(1.0)
        .with_restitution(0.7)
}

fn goal() -> Body {
    Body::new(2, BodyKind::Goal, Vec2::new(80.0, 80.0), GOAL_RADIUS)
        .with_mass(1.0)
        .with_restitution(0.2)
        .fixed()
}

fn obstacle(id: u32, x: f32, y: f32, radius: f32) -> Body {
    Body::new(id, BodyKind::Obstacle, Vec2::new(x, y), radius)
        .with_mass(5.0)
        .with_restitution(0.2)
        .fixed()
}

fn bouncer(id: u32, x: f32, y: f32) -> Body {
    Body::new(id, BodyKind::Bouncer, Vec2::new(x, y), 15.0)
        .with_mass(2.0)
        .with_restitution(1.5)
        .fixed()
}

fn simple_roll() -> Level {
    Level {
        id: 1,
        name: "Simple Roll".into(),
        description: "Roll the blue ball to the green goal".into(),
        bodies: vec![player(), goal(), obstacle(3, 50.0, 50.0, 15.0)],
        gravity: Vec2::new(0.0, 0.2),
        time_limit_secs: 30,
        star_times: [10, 15, 20],
    }
}

fn bounce_around() -> Level {
    Level {
        id: 2,
        name: "Bounce Around".into(),
        description: "Use the yellow bouncers to reach the goal".into(),
        bodies: vec![
            player(),
            goal(),
            bouncer(3, 50.0, 30.0),
            bouncer(4, 30.0, 70.0),
            obstacle(5, 70.0, 40.0, 20.0),
        ],
        gravity: Vec2::new(0.0, 0.2),
        time_limit_secs: 45,
        star_times: [15, 25, 35],
    }
}

fn gravity_wells() -> Level {
    Level {
        id: 3,
        name: "Gravity Wells".into(),
        description: "Navigate through gravity fields to reach the goal".into(),
        bodies: vec![
            player(),
            goal(),
            Body::new(3, BodyKind::GravityWell, Vec2::new(50.0, 50.0), 25.0)
                .with_mass(10.0)
                .with_restitution(0.2)
                .fixed(),
            obstacle(4, 30.0, 70.0, 15.0),
            obstacle(5, 70.0, 30.0, 15.0),
        ],
        gravity: Vec2::new(0.0, 0.1),
        time_limit_secs: 60,
        star_times: [20, 35, 50],
    }
}
