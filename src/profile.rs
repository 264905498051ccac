//! Player profile shared across the portfolio's mini-games
//!
//! Score, experience level and achievements. Each field lives under its own
//! LocalStorage key so other games on the site can read and bump them.

use serde::{Deserialize, Serialize};

use crate::consts::XP_PER_POINT;
use crate::persistence::{Storage, load_json, load_u64, save_json, save_u64};
use crate::sim::Completion;

/// Experience granted the first time an achievement unlocks
pub const ACHIEVEMENT_XP: u64 = 50;
/// Experience needed per level: `level * XP_PER_LEVEL`
pub const XP_PER_LEVEL: u64 = 100;

pub const PHYSICS_MASTER: &str = "physics_master";
pub const PUZZLE_SOLVER: &str = "puzzle_solver";

const SCORE_KEY: &str = "game_score";
const LEVEL_KEY: &str = "game_level";
const EXP_KEY: &str = "game_exp";
const ACHIEVEMENTS_KEY: &str = "game_achievements";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub score: u64,
    /// Starts at 1
    pub level: u64,
    /// Progress towards the next level
    pub experience: u64,
    pub achievements: Vec<String>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            score: 0,
            level: 1,
            experience: 0,
            achievements: Vec::new(),
        }
    }
}

/// What changed after a completion, so the host can play the right cues
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub points: u64,
    pub levels_gained: u64,
    pub unlocked: Vec<&'static str>,
}

impl Profile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_points(&mut self, points: u64) {
        self.score = self.score.saturating_add(points);
    }

    /// Add experience, levelling up as often as the total allows.
    ///
    /// Returns the number of levels gained.
    pub fn add_experience(&mut self, amount: u64) -> u64 {
        self.experience = self.experience.saturating_add(amount);
        let mut gained = 0;
        loop {
            let needed = self.level.max(1) * XP_PER_LEVEL;
            if self.experience < needed {
                break;
            }
            self.experience -= needed;
            self.level += 1;
            gained += 1;
        }
        if gained > 0 {
            log::info!("Profile level up: now level {}", self.level);
        }
        gained
    }

    pub fn has_achievement(&self, id: &str) -> bool {
        self.achievements.iter().any(|a| a == id)
    }

    /// Unlock an achievement. Returns false if it was already unlocked.
    pub fn unlock_achievement(&mut self, id: &str) -> bool {
        if self.has_achievement(id) {
            return false;
        }
        log::info!("Achievement unlocked: {}", id);
        self.achievements.push(id.to_string());
        self.add_experience(ACHIEVEMENT_XP);
        true
    }

    /// Credit a finished level.
    ///
    /// `all_levels_done` is whether every catalog level now has at least one
    /// star.
    pub fn apply_completion(&mut self, completion: &Completion, all_levels_done: bool) -> ProfileUpdate {
        let start_level = self.level;
        let mut update = ProfileUpdate {
            points: completion.points,
            ..Default::default()
        };

        self.add_points(completion.points);
        self.add_experience(completion.points * XP_PER_POINT);

        if completion.stars >= 3 && self.unlock_achievement(PHYSICS_MASTER) {
            update.unlocked.push(PHYSICS_MASTER);
        }
        if all_levels_done && self.unlock_achievement(PUZZLE_SOLVER) {
            update.unlocked.push(PUZZLE_SOLVER);
        }

        update.levels_gained = self.level - start_level;
        update
    }

    pub fn load(storage: &dyn Storage) -> Self {
        let defaults = Self::default();
        Self {
            score: load_u64(storage, SCORE_KEY).unwrap_or(defaults.score),
            level: load_u64(storage, LEVEL_KEY)
                .filter(|&l| l > 0)
                .unwrap_or(defaults.level),
            experience: load_u64(storage, EXP_KEY).unwrap_or(defaults.experience),
            achievements: load_json(storage, ACHIEVEMENTS_KEY).unwrap_or(defaults.achievements),
        }
    }

    pub fn save(&self, storage: &mut dyn Storage) {
        save_u64(storage, SCORE_KEY, self.score);
        save_u64(storage, LEVEL_KEY, self.level);
        save_u64(storage, EXP_KEY, self.experience);
        save_json(storage, ACHIEVEMENTS_KEY, &self.achievements);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStorage;

    fn completion(stars: u8) -> Completion {
        Completion {
            level_id: 1,
            elapsed_secs: 8,
            stars,
            points: stars as u64 * 10,
        }
    }

    #[test]
    fn test_level_up_carries_remainder() {
        let mut profile = Profile::new();
        assert_eq!(profile.add_experience(90), 0);
        assert_eq!(profile.add_experience(30), 1);
        assert_eq!(profile.level, 2);
        assert_eq!(profile.experience, 20);
    }

    #[test]
    fn test_large_grant_levels_repeatedly() {
        let mut profile = Profile::new();
        // 100 for level 1, 200 for level 2
        assert_eq!(profile.add_experience(350), 2);
        assert_eq!(profile.level, 3);
        assert_eq!(profile.experience, 50);
    }

    #[test]
    fn test_achievement_unlocks_once() {
        let mut profile = Profile::new();
        assert!(profile.unlock_achievement("first"));
        assert_eq!(profile.experience, ACHIEVEMENT_XP);
        assert!(!profile.unlock_achievement("first"));
        assert_eq!(profile.experience, ACHIEVEMENT_XP);
        assert_eq!(profile.achievements, vec!["first".to_string()]);
    }

    #[test]
    fn test_three_star_completion() {
        let mut profile = Profile::new();
        let update = profile.apply_completion(&completion(3), false);

        // 30 points, 60 XP, then +50 for physics_master
        assert_eq!(update.points, 30);
        assert_eq!(update.unlocked, vec![PHYSICS_MASTER]);
        assert_eq!(update.levels_gained, 1);
        assert_eq!(profile.score, 30);
        assert_eq!(profile.level, 2);
        assert_eq!(profile.experience, 10);

        let again = profile.apply_completion(&completion(3), false);
        assert!(again.unlocked.is_empty());
    }

    #[test]
    fn test_finishing_every_level_unlocks_solver() {
        let mut profile = Profile::new();
        let update = profile.apply_completion(&completion(1), true);
        assert_eq!(update.unlocked, vec![PUZZLE_SOLVER]);
        assert!(profile.has_achievement(PUZZLE_SOLVER));
        assert!(!profile.has_achievement(PHYSICS_MASTER));
    }

    #[test]
    fn test_storage_round_trip_and_defaults() {
        let mut storage = MemoryStorage::new();
        assert_eq!(Profile::load(&storage), Profile::new());

        let mut profile = Profile::new();
        profile.apply_completion(&completion(3), true);
        profile.save(&mut storage);
        assert_eq!(storage.get("game_score").as_deref(), Some("30"));
        assert_eq!(Profile::load(&storage), profile);

        storage.set("game_level", "0");
        storage.set("game_achievements", "{oops");
        let loaded = Profile::load(&storage);
        assert_eq!(loaded.level, 1);
        assert!(loaded.achievements.is_empty());
        assert_eq!(loaded.score, 30);
    }
}
