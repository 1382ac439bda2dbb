//! External collaborators injected into the engine.
//!
//! The engine never owns a score display, a speaker or a save file. It talks
//! to them through these traits; the binary plugs in real ones, tests plug in
//! recorders. All calls are fire-and-forget.

use log::info;

use crate::domain::piece::Tier;
use crate::domain::rules;

// ── Scoring ──

pub trait Scoring {
    fn add_score(&mut self, points: u32);
    fn score(&self) -> u32;
    /// Called whenever the selection size changes (0 when it is dropped).
    fn update_multiplier(&mut self, selection_size: usize);
    fn reset(&mut self);

    /// Multiplier currently applied to the next `add_score`.
    fn multiplier(&self) -> u32 {
        1
    }
}

/// Default score keeper: applies the live multiplier to each add, then
/// drops back to ×1.
#[derive(Debug, Clone)]
pub struct ScoreBoard {
    score: u32,
    multiplier: u32,
}

impl ScoreBoard {
    pub fn new() -> Self {
        ScoreBoard { score: 0, multiplier: 1 }
    }
}

impl Default for ScoreBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl Scoring for ScoreBoard {
    fn add_score(&mut self, points: u32) {
        self.score = self.score.saturating_add(points.saturating_mul(self.multiplier));
        self.multiplier = 1;
    }

    fn score(&self) -> u32 {
        self.score
    }

    fn update_multiplier(&mut self, selection_size: usize) {
        self.multiplier = rules::multiplier_for(selection_size);
    }

    fn reset(&mut self) {
        self.score = 0;
        self.multiplier = 1;
    }

    fn multiplier(&self) -> u32 {
        self.multiplier
    }
}

// ── Feedback (audio / haptics) ──

/// Every hook defaults to a no-op.
pub trait Feedback {
    fn spawned(&mut self, _tier: Tier) {}
    fn merged(&mut self, _tier: Tier) {}
    fn reshuffled(&mut self) {}
    fn error(&mut self) {}
    fn vibrate(&mut self) {}
    fn level_complete(&mut self) {}
    fn game_over(&mut self) {}
}

pub struct NullFeedback;

impl Feedback for NullFeedback {}

// ── Level complete ──

pub trait LevelCompleteSink {
    fn show_level_complete(&mut self, raw_score: u32, optimal_moves: u32, actual_moves: u32);
}

/// Writes the report to the log only.
pub struct LogCompletion;

impl LevelCompleteSink for LogCompletion {
    fn show_level_complete(&mut self, raw_score: u32, optimal_moves: u32, actual_moves: u32) {
        info!("level complete: score {raw_score}, {actual_moves} moves (par {optimal_moves})");
    }
}

// ── Persistence ──

pub trait KeyValueStore {
    fn load_int(&self, key: &str, default: i64) -> i64;
    fn save_int(&mut self, key: &str, value: i64);
}

// ── Bundle ──

pub struct Collaborators {
    pub scoring: Box<dyn Scoring>,
    pub feedback: Box<dyn Feedback>,
    pub completion: Box<dyn LevelCompleteSink>,
    pub store: Box<dyn KeyValueStore>,
}

impl Collaborators {
    /// Score board, silent feedback, logged completion, in-memory store.
    pub fn headless() -> Self {
        Collaborators {
            scoring: Box::new(ScoreBoard::new()),
            feedback: Box::new(NullFeedback),
            completion: Box::new(LogCompletion),
            store: Box::new(crate::sim::store::MemoryStore::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_board_applies_and_resets_multiplier() {
        let mut sb = ScoreBoard::new();
        sb.update_multiplier(7);
        assert_eq!(sb.multiplier(), 2);
        sb.add_score(10);
        assert_eq!(sb.score(), 20);
        assert_eq!(sb.multiplier(), 1);
        sb.add_score(10);
        assert_eq!(sb.score(), 30);
    }

    #[test]
    fn dropped_selection_means_single_multiplier() {
        let mut sb = ScoreBoard::new();
        sb.update_multiplier(16);
        assert_eq!(sb.multiplier(), 4);
        sb.update_multiplier(0);
        assert_eq!(sb.multiplier(), 1);
    }

    #[test]
    fn reset_clears_everything() {
        let mut sb = ScoreBoard::new();
        sb.update_multiplier(12);
        sb.add_score(5);
        sb.reset();
        assert_eq!(sb.score(), 0);
        assert_eq!(sb.multiplier(), 1);
    }
}
