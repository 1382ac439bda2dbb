//! Scoring and upgrade rules.
//!
//! Pure functions, no side effects. These encode "what a commit is worth"
//! and "what it turns into" without touching the grid.
//!
//! ## Multiplier bands (chain length → multiplier)
//! ┌──────────────┬────────────┐
//! │ Chain length │ Multiplier │
//! ├──────────────┼────────────┤
//! │ 2 ..= 5      │ ×1         │
//! │ 6 ..= 9      │ ×2         │
//! │ 10 ..= 15    │ ×3         │
//! │ 16 ..        │ ×4         │
//! │ otherwise    │ ×1         │
//! └──────────────┴────────────┘
//!
//! ## Successor
//! A chain of tier `t` upgrades into one `t + 1` piece when `t + 1` is
//! within the level ceiling, the catalog, and `MAX_TIER`. Otherwise the
//! whole chain is cleared without a successor.

use super::piece::{Tier, MAX_TIER};

/// Multiplier derived purely from the selection size.
pub fn multiplier_for(chain_len: usize) -> u32 {
    match chain_len {
        2..=5 => 1,
        6..=9 => 2,
        10..=15 => 3,
        16.. => 4,
        _ => 1,
    }
}

/// Points for a single piece of `tier`. Tiers past the table reuse the
/// last entry. An empty table or tier 0 is worth nothing.
pub fn points_for(points_per_tier: &[u32], tier: Tier) -> u32 {
    if tier == 0 {
        return 0;
    }
    let idx = (tier as usize - 1).min(points_per_tier.len().saturating_sub(1));
    points_per_tier.get(idx).copied().unwrap_or(0)
}

/// Base points for committing `chain_len` pieces of `tier`.
pub fn base_points(points_per_tier: &[u32], tier: Tier, chain_len: usize) -> u32 {
    points_for(points_per_tier, tier).saturating_mul(chain_len as u32)
}

/// Tier produced by merging a chain of `tier`, if any.
pub fn successor_tier(tier: Tier, ceiling: Tier, catalog_len: usize) -> Option<Tier> {
    let next = tier.checked_add(1)?;
    let fits = next <= ceiling && (next as usize) <= catalog_len && next <= MAX_TIER;
    fits.then_some(next)
}

/// Par for the level-complete report: half the first target count.
pub fn optimal_moves(target_count: u32) -> u32 {
    target_count / 2
}

/// Stretch a points table to `len` entries by repeating its last value.
pub fn extend_points_table(points: &[u32], len: usize) -> Vec<u32> {
    let last = points.last().copied().unwrap_or(0);
    (0..len.max(points.len()))
        .map(|i| points.get(i).copied().unwrap_or(last))
        .collect()
}
