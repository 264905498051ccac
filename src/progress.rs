//! Best star rating per level
//!
//! Persisted to LocalStorage as a `{ "level_id": stars }` object. Only the
//! best result is kept; a worse run never overwrites it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::persistence::{Storage, load_json, save_json};

/// Most stars a single level can award
pub const MAX_STARS: u8 = 3;

/// Completed levels and their best star rating
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PuzzleProgress {
    pub best: BTreeMap<u32, u8>,
}

impl PuzzleProgress {
    const STORAGE_KEY: &'static str = "physics_puzzle_completed";

    pub fn new() -> Self {
        Self::default()
    }

    /// Record a finished level. Returns true if this improved the best rating.
    pub fn record(&mut self, level_id: u32, stars: u8) -> bool {
        let stars = stars.min(MAX_STARS);
        let best = self.best.entry(level_id).or_insert(0);
        if stars > *best {
            *best = stars;
            true
        } else {
            false
        }
    }

    /// Best stars for a level (0 if never completed)
    pub fn stars(&self, level_id: u32) -> u8 {
        self.best.get(&level_id).copied().unwrap_or(0)
    }

    pub fn is_completed(&self, level_id: u32) -> bool {
        self.stars(level_id) > 0
    }

    pub fn completed_count(&self) -> usize {
        self.best.values().filter(|&&s| s > 0).count()
    }

    pub fn total_stars(&self) -> u32 {
        self.best.values().map(|&s| s as u32).sum()
    }

    /// Level select summary line for a catalog of `level_count` levels
    pub fn summary(&self, level_count: usize) -> String {
        format!(
            "{} / {} completed, {} / {} stars",
            self.completed_count(),
            level_count,
            self.total_stars(),
            level_count * MAX_STARS as usize
        )
    }

    pub fn load(storage: &dyn Storage) -> Self {
        match load_json::<PuzzleProgress>(storage, Self::STORAGE_KEY) {
            Some(progress) => {
                log::info!("Loaded progress for {} levels", progress.best.len());
                progress
            }
            None => Self::new(),
        }
    }

    pub fn save(&self, storage: &mut dyn Storage) {
        if self.best.is_empty() {
            return;
        }
        save_json(storage, Self::STORAGE_KEY, self);
        log::info!("Progress saved ({} stars)", self.total_stars());
    }
}
