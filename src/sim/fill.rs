//! Spawning: pick a tier for an empty cell and place a piece there.

use log::{error, warn};

use crate::domain::draw;
use crate::domain::piece::{is_valid_tier, Piece, Pos, Tier};
use super::event::MergeEvent;
use super::world::MergeWorld;

/// Tier for the next spawn under the current level's rules.
pub fn choose_tier(world: &mut MergeWorld) -> Tier {
    let level = &world.levels[world.level_index];
    let catalog_len = world.catalog.len();

    let tier = if level.fill_all_tiers {
        draw::weighted_tier(&mut world.rng, &level.spawn_weights, catalog_len)
    } else {
        let band = draw::progressive_band(
            world.move_count,
            world.config.moves_to_increase_tier,
            world.config.max_initial_tier,
            catalog_len,
        );
        draw::uniform_tier(&mut world.rng, band)
    };

    if !is_valid_tier(tier) || tier as usize > catalog_len {
        warn!("drew tier {tier} outside the catalog ({catalog_len}); using tier 1");
        return 1;
    }
    tier
}

/// Place a new `tier` piece at `pos`. Fails (cell left empty) when the
/// catalog has no entry for the tier.
pub fn place(world: &mut MergeWorld, pos: Pos, tier: Tier, events: &mut Vec<MergeEvent>) -> bool {
    if !world.catalog.contains(tier) {
        error!("no catalog entry for tier {tier}; spawn at {pos:?} aborted");
        world.collab.feedback.error();
        events.push(MergeEvent::SpawnFailed { pos, tier });
        return false;
    }
    let id = world.alloc_id();
    world.grid.set(pos, Some(Piece::new(id, tier, pos)));
    world.collab.feedback.spawned(tier);
    events.push(MergeEvent::Spawned { id, pos, tier });
    true
}

/// Fill every empty cell. Returns how many pieces were placed.
pub fn fill_empty(world: &mut MergeWorld, events: &mut Vec<MergeEvent>) -> usize {
    let mut placed = 0;
    for pos in world.grid.empty_cells() {
        let tier = choose_tier(world);
        if place(world, pos, tier, events) {
            placed += 1;
        }
    }
    placed
}
