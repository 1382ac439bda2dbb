//! Tier draws for newly spawned pieces.
//!
//! Two modes, both pure over an injected RNG:
//!   - weighted: proportional to per-tier spawn weights, truncated at the
//!     highest tier with a positive weight
//!   - progressive: uniform over a tier band that shifts upward with the
//!     move count
//!
//! Every malformed input degrades to tier 1; nothing here panics.

use log::debug;
use rand::Rng;

use super::piece::{Tier, MAX_TIER};

/// Inclusive tier band for progressive spawning.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TierBand {
    pub min: Tier,
    pub max: Tier,
}

/// Highest tier with a positive weight, or `None` when the weight table
/// does not line up with the catalog.
pub fn highest_weighted_tier(weights: &[f32], catalog_len: usize) -> Option<Tier> {
    if weights.is_empty() || weights.len() != catalog_len {
        return None;
    }
    weights
        .iter()
        .rposition(|&w| w > 0.0)
        .map(|i| (i + 1).min(MAX_TIER as usize) as Tier)
}

/// Draw a tier proportionally to `weights[tier - 1]` among `1..=K`.
/// Invalid tables (wrong length, no positive prefix) yield tier 1.
pub fn weighted_tier<R: Rng + ?Sized>(rng: &mut R, weights: &[f32], catalog_len: usize) -> Tier {
    let Some(top) = highest_weighted_tier(weights, catalog_len) else {
        // reported once per level at load time; see `level::check_weights`
        debug!(
            "spawn weights invalid ({} entries for a catalog of {}); falling back to tier 1",
            weights.len(),
            catalog_len
        );
        return 1;
    };
    let prefix = &weights[..top as usize];
    let total: f32 = prefix.iter().map(|w| w.max(0.0)).sum();
    if !(total > 0.0) || !total.is_finite() {
        debug!("spawn weights sum to {total}; falling back to tier 1");
        return 1;
    }

    let mut roll = rng.random_range(0.0..total);
    for (i, &w) in prefix.iter().enumerate() {
        let w = w.max(0.0);
        if roll < w {
            return (i + 1) as Tier;
        }
        roll -= w;
    }
    // float drift past the last bucket
    top
}

/// Tier band after `move_count` moves, stepping every `moves_per_step`.
pub fn progressive_band(move_count: u32, moves_per_step: u32, max_initial: Tier, catalog_len: usize) -> TierBand {
    let cap = catalog_len.clamp(1, MAX_TIER as usize) as Tier;
    let step = move_count.checked_div(moves_per_step).unwrap_or(0);
    let (min, max) = match step {
        0 => (1, max_initial.max(1)),
        1 => (2, 5),
        2 => (3, 6),
        3 => (5, 7),
        4 => (6, 8),
        _ => (7, 9),
    };
    let max = max.min(cap);
    TierBand { min: min.min(max), max }
}

/// Uniform draw inside a band.
pub fn uniform_tier<R: Rng + ?Sized>(rng: &mut R, band: TierBand) -> Tier {
    let lo = band.min.max(1);
    let hi = band.max.max(lo);
    rng.random_range(lo..=hi)
}
