//! Events emitted by the engine.
//! The presentation layer consumes these for animation/sound, at its own pace.

use crate::domain::piece::{PieceId, Pos, Tier};

/// Figures handed to the level-complete screen.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LevelReport {
    pub raw_score: u32,
    pub optimal_moves: u32,
    pub actual_moves: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub enum MergeEvent {
    LevelStarted { index: usize, width: usize, height: usize },
    Spawned { id: PieceId, pos: Pos, tier: Tier },
    Removed { id: PieceId, pos: Pos, tier: Tier },
    Relocated { id: PieceId, from: Pos, to: Pos },
    SelectionChanged { len: usize, multiplier: u32 },
    /// Chain collapsed into a successor piece at `pos`.
    Merged { pos: Pos, from_tier: Tier, chain_len: usize },
    /// Chain cleared with no successor (tier at or above the ceiling).
    Cleared { from_tier: Tier, chain_len: usize },
    ScoreAdded { points: u32 },
    GoalProgress { tier: Tier, count: u32 },
    Reshuffled { attempts: u32 },
    SpawnFailed { pos: Pos, tier: Tier },
    LevelComplete(LevelReport),
    GameOver,
}
