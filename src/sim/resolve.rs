/// Commit resolution and the per-tick update.
///
/// Commit processing order:
///   1. Count the move
///   2. Price the chain (base points)
///   3. Remove every chain cell but the last
///   4. Upgrade or clear the last cell
///   5. Report score (once)
///   6. Credit goals (upgrades only)
///   7. Gravity
///   8. Refill
///   9. Win check (halts the commit)
///  10. Deadlock reshuffle
///  11. Merge feedback, enter cascade
///
/// Game over is never raised here; `tick` picks up move exhaustion on the
/// following update.

use log::{debug, error, info, warn};

use crate::domain::piece::{is_valid_tier, Pos, Tier};
use crate::domain::rules;
use super::event::{LevelReport, MergeEvent};
use super::fill;
use super::world::{MergeWorld, Phase};

/// Regenerations tried before giving up on a deadlocked board.
pub const MAX_RESHUFFLES: u32 = 16;

// ══════════════════════════════════════════════════════════════
// Commit
// ══════════════════════════════════════════════════════════════

pub fn commit(world: &mut MergeWorld, chain: &[Pos], events: &mut Vec<MergeEvent>) {
    if chain.len() < 2 || !world.grid.is_initialized() {
        return;
    }
    let last = chain[chain.len() - 1];
    let Some(tier) = world.grid.tier_at(last) else {
        debug!("commit: last cell {last:?} is empty, ignored");
        return;
    };
    if !is_valid_tier(tier) {
        error!("commit: chain tier {tier} is out of range");
    }

    world.move_count += 1;
    let base = rules::base_points(&world.points_per_tier, tier, chain.len());

    remove_chain(world, &chain[..chain.len() - 1], events);
    let upgraded = upgrade_last(world, last, tier, chain.len(), events);

    world.collab.scoring.add_score(base);
    world.collab.scoring.update_multiplier(0);
    events.push(MergeEvent::ScoreAdded { points: base });

    if upgraded {
        if let Some(count) = world.goals.record_merge(tier, chain.len()) {
            events.push(MergeEvent::GoalProgress { tier, count });
        }
    }

    resolve_gravity(world, events);
    fill::fill_empty(world, events);

    if resolve_win(world, events) {
        return;
    }

    reshuffle_if_deadlocked(world, events);

    world.collab.feedback.merged(tier);
    world.collab.feedback.vibrate();
    debug!(
        "commit: {} x tier {tier} for {base} (move {}), upgraded={upgraded}",
        chain.len(),
        world.move_count
    );

    world.phase = match world.config.cascade_ticks {
        0 => Phase::Idle,
        n => Phase::Cascading { remaining: n },
    };
}

fn remove_chain(world: &mut MergeWorld, cells: &[Pos], events: &mut Vec<MergeEvent>) {
    for &pos in cells {
        if let Some(p) = world.grid.take(pos) {
            events.push(MergeEvent::Removed { id: p.id, pos, tier: p.tier });
        }
    }
}

/// Swap the last chain cell for its successor, or clear it when the tier
/// is at the level ceiling. Returns whether a successor was placed.
fn upgrade_last(world: &mut MergeWorld, last: Pos, tier: Tier, chain_len: usize, events: &mut Vec<MergeEvent>) -> bool {
    remove_chain(world, &[last], events);

    let catalog_len = world.catalog.len();
    let ceiling = world.level().tier_ceiling(catalog_len);
    let placed = match rules::successor_tier(tier, ceiling, catalog_len) {
        Some(next) => fill::place(world, last, next, events),
        None => false,
    };

    if placed {
        events.push(MergeEvent::Merged { pos: last, from_tier: tier, chain_len });
    } else {
        events.push(MergeEvent::Cleared { from_tier: tier, chain_len });
    }
    placed
}

// ══════════════════════════════════════════════════════════════
// Board passes
// ══════════════════════════════════════════════════════════════

fn resolve_gravity(world: &mut MergeWorld, events: &mut Vec<MergeEvent>) {
    for r in world.grid.apply_gravity() {
        events.push(MergeEvent::Relocated { id: r.id, from: r.from, to: r.to });
    }
}

/// Regenerate the whole board while no 4-adjacent pair exists.
/// Move count and goal progress are untouched.
pub fn reshuffle_if_deadlocked(world: &mut MergeWorld, events: &mut Vec<MergeEvent>) {
    if !world.grid.is_deadlocked() {
        return;
    }
    let mut attempts = 0;
    while attempts < MAX_RESHUFFLES {
        attempts += 1;
        for p in world.grid.drain() {
            events.push(MergeEvent::Removed { id: p.id, pos: p.pos, tier: p.tier });
        }
        fill::fill_empty(world, events);
        if !world.grid.is_deadlocked() {
            break;
        }
    }
    if world.grid.is_deadlocked() {
        warn!("board still deadlocked after {attempts} reshuffles");
    } else {
        info!("board deadlocked; reshuffled ({attempts} attempt(s))");
    }
    world.collab.feedback.reshuffled();
    events.push(MergeEvent::Reshuffled { attempts });
}

fn resolve_win(world: &mut MergeWorld, events: &mut Vec<MergeEvent>) -> bool {
    if !world.goals.is_complete() {
        return false;
    }
    let report = LevelReport {
        raw_score: world.collab.scoring.score(),
        optimal_moves: world.optimal_moves(),
        actual_moves: world.move_count,
    };
    info!(
        "level {} complete: score {}, {} moves (par {})",
        world.level_index + 1,
        report.raw_score,
        report.actual_moves,
        report.optimal_moves
    );
    world
        .collab
        .completion
        .show_level_complete(report.raw_score, report.optimal_moves, report.actual_moves);
    world.collab.feedback.level_complete();
    world.phase = Phase::LevelComplete(report);
    events.push(MergeEvent::LevelComplete(report));
    true
}

// ══════════════════════════════════════════════════════════════
// Tick
// ══════════════════════════════════════════════════════════════

/// Advance one update. Paused or stopped sessions do nothing.
pub fn tick(world: &mut MergeWorld, events: &mut Vec<MergeEvent>) {
    if world.paused {
        return;
    }
    if let Phase::Cascading { remaining } = world.phase {
        world.phase = match remaining.saturating_sub(1) {
            0 => Phase::Idle,
            n => Phase::Cascading { remaining: n },
        };
    }
    if world.phase == Phase::Idle && world.moves_exhausted() {
        info!("move limit reached after {} moves; game over", world.move_count);
        world.phase = Phase::GameOver;
        world.collab.feedback.game_over();
        events.push(MergeEvent::GameOver);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::domain::catalog::Catalog;
    use crate::domain::grid::Grid;
    use crate::domain::piece::MAX_TIER;
    use crate::sim::collab::Collaborators;
    use crate::sim::level::{Goal, LevelDef};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Weighted level that only ever spawns `spawn` and caps merges at `ceiling`.
    fn level(spawn: Tier, ceiling: Tier, goals: Vec<Goal>) -> LevelDef {
        let mut w = vec![0.0; MAX_TIER as usize];
        w[spawn as usize - 1] = 1.0;
        // raises the ceiling; vanishes in the f32 total so it is never drawn
        if ceiling > spawn {
            w[ceiling as usize - 1] = f32::MIN_POSITIVE;
        }
        LevelDef { name: String::new(), goals, fill_all_tiers: true, move_limit: 0, spawn_weights: w }
    }

    fn world(lv: LevelDef, grid: Grid) -> MergeWorld {
        let mut config = EngineConfig::default();
        config.cascade_ticks = 2;
        let mut w = MergeWorld::new(config, vec![lv], Catalog::builtin(), Collaborators::headless(), StdRng::seed_from_u64(3));
        w.next_id = grid.max_id() + 1;
        w.grid = grid;
        w.phase = Phase::Idle;
        w
    }

    fn p(x: usize, y: usize) -> Pos {
        Pos::new(x, y)
    }

    #[test]
    fn upgrade_places_successor_at_last_cell() {
        let grid = Grid::from_rows(&[&[2, 2, 5, 6], &[7, 8, 10, 10]]);
        let mut w = world(level(1, 11, vec![]), grid);
        let mut events = vec![];
        commit(&mut w, &[p(0, 0), p(1, 0)], &mut events);

        assert_eq!(w.grid.tier_at(p(1, 0)), Some(3));
        assert_eq!(w.move_count, 1);
        assert_eq!(w.collab.scoring.score(), 8);
        assert!(events.contains(&MergeEvent::Merged { pos: p(1, 0), from_tier: 2, chain_len: 2 }));
        assert_eq!(w.phase, Phase::Cascading { remaining: 2 });
    }

    /// Bottom row `1 1 1 4`; nothing above it pairs up.
    fn basic_board() -> Grid {
        Grid::from_rows(&[&[1, 1, 1, 4], &[3, 4, 5, 6], &[5, 6, 7, 8], &[7, 8, 9, 10]])
    }

    #[test]
    fn three_chain_on_four_by_four() {
        let mut w = world(level(1, 11, vec![]), basic_board());
        let mut events = vec![];
        commit(&mut w, &[p(0, 0), p(1, 0), p(2, 0)], &mut events);

        // 3 pieces at 2 points, x1
        assert_eq!(w.collab.scoring.score(), 6);
        assert_eq!(w.move_count, 1);
        assert_eq!(w.grid.tier_at(p(2, 0)), Some(2));
        // columns 0 and 1 dropped one row and were topped up with tier 1
        assert_eq!(w.grid.tier_at(p(0, 0)), Some(3));
        assert_eq!(w.grid.tier_at(p(1, 0)), Some(4));
        assert_eq!(w.grid.tier_at(p(0, 3)), Some(1));
        assert_eq!(w.grid.tier_at(p(1, 3)), Some(1));
        assert_eq!(w.grid.occupied_count(), 16);
        assert!(!events.iter().any(|e| matches!(e, MergeEvent::Reshuffled { .. })));
    }

    #[test]
    fn upgrade_trades_n_pieces_for_one() {
        // refills are tier 9, so tier 1 and 2 counts move only by the merge
        let mut w = world(level(9, 11, vec![]), basic_board());
        let (ones, twos) = (w.grid.count_tier(1), w.grid.count_tier(2));
        let mut events = vec![];
        commit(&mut w, &[p(0, 0), p(1, 0), p(2, 0)], &mut events);

        assert_eq!(w.grid.count_tier(1), ones - 3);
        assert_eq!(w.grid.count_tier(2), twos + 1);
        assert_eq!(w.grid.count_tier(9), 3);
    }

    /// First orthogonal same-tier pair on the board.
    fn find_pair(grid: &Grid) -> Option<(Pos, Pos)> {
        for y in 0..grid.height() {
            for x in 0..grid.width() {
                let here = grid.tier_at(p(x, y));
                if x + 1 < grid.width() && here == grid.tier_at(p(x + 1, y)) {
                    return Some((p(x, y), p(x + 1, y)));
                }
                if y + 1 < grid.height() && here == grid.tier_at(p(x, y + 1)) {
                    return Some((p(x, y), p(x, y + 1)));
                }
            }
        }
        None
    }

    #[test]
    fn board_stays_consistent_over_a_session() {
        let mut lv = level(1, 3, vec![]);
        lv.spawn_weights[1] = 1.0;
        let mut w = world(lv, Grid::new(5, 6));
        let mut events = vec![];
        fill::fill_empty(&mut w, &mut events);
        reshuffle_if_deadlocked(&mut w, &mut events);

        for _ in 0..60 {
            let Some((a, b)) = find_pair(&w.grid) else { break };
            commit(&mut w, &[a, b], &mut events);
            w.phase = Phase::Idle;

            assert_eq!(w.grid.occupied_count(), 30);
            for y in 0..6 {
                for x in 0..5 {
                    let piece = w.grid.get(p(x, y)).expect("every cell is filled");
                    assert_eq!(piece.pos, p(x, y));
                    assert!((1..=3).contains(&piece.tier) && piece.tier <= MAX_TIER);
                }
            }
        }
        assert!(w.move_count > 0);
    }

    #[test]
    fn gravity_and_refill_follow_removal() {
        // column 0: 3 over 3; chain drops the bottom one, successor sits on top then falls
        let grid = Grid::from_rows(&[&[3, 4], &[3, 5]]);
        let mut w = world(level(1, 11, vec![]), grid);
        let mut events = vec![];
        commit(&mut w, &[p(0, 0), p(0, 1)], &mut events);

        assert_eq!(w.grid.tier_at(p(0, 0)), Some(4));
        assert_eq!(w.grid.occupied_count(), 4);
        assert!(events.iter().any(|e| matches!(e, MergeEvent::Relocated { from, to, .. } if *from == p(0, 1) && *to == p(0, 0))));
    }

    #[test]
    fn ceiling_clears_the_whole_chain() {
        let grid = Grid::from_rows(&[&[2, 2, 1, 1]]);
        let mut w = world(level(1, 2, vec![Goal::merges(2, 1)]), grid);
        let mut events = vec![];
        commit(&mut w, &[p(0, 0), p(1, 0)], &mut events);

        assert!(events.contains(&MergeEvent::Cleared { from_tier: 2, chain_len: 2 }));
        assert_eq!(w.goals.count_for(2), 0);
        // score still reported
        assert_eq!(w.collab.scoring.score(), 8);
        assert_eq!(w.grid.occupied_count(), 4);
    }

    #[test]
    fn short_chain_or_empty_grid_is_a_no_op() {
        let grid = Grid::from_rows(&[&[1, 1]]);
        let mut w = world(level(1, 11, vec![]), grid.clone());
        let mut events = vec![];
        commit(&mut w, &[p(0, 0)], &mut events);
        assert!(events.is_empty());
        assert_eq!(w.grid, grid);
        assert_eq!(w.move_count, 0);

        w.grid = Grid::empty();
        commit(&mut w, &[p(0, 0), p(1, 0)], &mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn goal_completion_halts_commit() {
        let grid = Grid::from_rows(&[&[1, 1, 3, 4]]);
        let mut w = world(level(1, 11, vec![Goal::merges(1, 2)]), grid);
        let mut events = vec![];
        commit(&mut w, &[p(0, 0), p(1, 0)], &mut events);

        let report = LevelReport { raw_score: 4, optimal_moves: 1, actual_moves: 1 };
        assert_eq!(w.phase, Phase::LevelComplete(report));
        assert_eq!(events.last(), Some(&MergeEvent::LevelComplete(report)));
        assert!(!events.iter().any(|e| matches!(e, MergeEvent::Reshuffled { .. })));
    }

    #[test]
    fn reshuffle_regenerates_every_cell() {
        let grid = Grid::from_rows(&[&[1, 2], &[3, 4]]);
        let mut w = world(level(1, 11, vec![]), grid);
        let mut events = vec![];
        reshuffle_if_deadlocked(&mut w, &mut events);

        assert_eq!(w.grid.count_tier(1), 4);
        assert_eq!(events.last(), Some(&MergeEvent::Reshuffled { attempts: 1 }));
        assert_eq!(events.iter().filter(|e| matches!(e, MergeEvent::Removed { .. })).count(), 4);
    }

    #[test]
    fn single_cell_board_gives_up_after_limit() {
        let grid = Grid::from_rows(&[&[1]]);
        let mut w = world(level(1, 11, vec![]), grid);
        let mut events = vec![];
        reshuffle_if_deadlocked(&mut w, &mut events);
        assert_eq!(events.last(), Some(&MergeEvent::Reshuffled { attempts: MAX_RESHUFFLES }));
        assert_eq!(w.grid.occupied_count(), 1);
    }

    #[test]
    fn tick_counts_down_cascade_then_ends_exhausted_game() {
        let grid = Grid::from_rows(&[&[1, 1], &[1, 1]]);
        let mut lv = level(1, 11, vec![Goal::merges(3, 50)]);
        lv.move_limit = 1;
        let mut w = world(lv, grid);
        w.move_count = 1;
        w.phase = Phase::Cascading { remaining: 2 };

        let mut events = vec![];
        tick(&mut w, &mut events);
        assert_eq!(w.phase, Phase::Cascading { remaining: 1 });
        assert!(events.is_empty());
        tick(&mut w, &mut events);
        assert_eq!(w.phase, Phase::GameOver);
        assert_eq!(events, vec![MergeEvent::GameOver]);

        // paused sessions never tick
        w.phase = Phase::Cascading { remaining: 2 };
        w.paused = true;
        tick(&mut w, &mut events);
        assert_eq!(w.phase, Phase::Cascading { remaining: 2 });
    }
}
