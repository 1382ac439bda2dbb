//! Public engine surface.
//!
//! Every action returns the events it produced, in order. Invalid actions
//! (wrong phase, paused, out-of-bounds pointer) return an empty list and
//! leave state untouched.

use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::Rng;

use crate::config::EngineConfig;
use crate::domain::catalog::Catalog;
use crate::domain::grid::Grid;
use crate::domain::piece::{Pos, Tier};
use crate::domain::rules;
use super::collab::Collaborators;
use super::event::MergeEvent;
use super::fill;
use super::goals::{GoalRow, GoalTracker};
use super::level::LevelDef;
use super::resolve;
use super::selection::ChainChange;
use super::world::{MergeWorld, Phase};

/// Store key for the current level index.
pub const LEVEL_KEY: &str = "merge_mode_level";

pub struct MergeEngine {
    world: MergeWorld,
}

// ══════════════════════════════════════════════════════════════
// Lifecycle
// ══════════════════════════════════════════════════════════════

impl MergeEngine {
    pub fn new(
        config: EngineConfig,
        levels: Vec<LevelDef>,
        catalog: Catalog,
        collab: Collaborators,
        rng: StdRng,
    ) -> Self {
        MergeEngine { world: MergeWorld::new(config, levels, catalog, collab, rng) }
    }

    /// Resume from the saved level index and build its grid.
    pub fn start(&mut self) -> Vec<MergeEvent> {
        let w = &mut self.world;
        let saved = w.collab.store.load_int(LEVEL_KEY, 0);
        w.level_index = match usize::try_from(saved) {
            Ok(i) if i < w.levels.len() => i,
            _ => {
                warn!("saved level {saved} out of range; starting at level 1");
                w.collab.store.save_int(LEVEL_KEY, 0);
                0
            }
        };
        let mut events = Vec::new();
        begin_level(w, &mut events);
        events
    }

    /// Advance to the next level (wrapping) after a win.
    pub fn proceed(&mut self) -> Vec<MergeEvent> {
        let w = &mut self.world;
        if !matches!(w.phase, Phase::LevelComplete(_)) {
            return vec![];
        }
        w.level_index = (w.level_index + 1) % w.levels.len();
        w.collab.store.save_int(LEVEL_KEY, w.level_index as i64);
        let mut events = Vec::new();
        begin_level(w, &mut events);
        events
    }

    /// Tear down and regenerate the current level.
    pub fn restart_level(&mut self) -> Vec<MergeEvent> {
        let w = &mut self.world;
        if w.phase == Phase::Stopped {
            return vec![];
        }
        let mut events = Vec::new();
        begin_level(w, &mut events);
        events
    }

    /// Same as `restart_level`; offered from the level-complete and
    /// game-over screens.
    pub fn retry(&mut self) -> Vec<MergeEvent> {
        self.restart_level()
    }

    /// Drop the grid and every piece of session state.
    pub fn end_game(&mut self) -> Vec<MergeEvent> {
        let w = &mut self.world;
        let mut events = Vec::new();
        teardown(w, &mut events);
        w.collab.scoring.reset();
        w.phase = Phase::Stopped;
        info!("session ended");
        events
    }

    /// Zero the move count and goal progress without touching the grid.
    pub fn reset_level_counts(&mut self) {
        let w = &mut self.world;
        w.move_count = 0;
        w.goals.reset();
        debug!("level counts reset for level {}", w.level_index + 1);
    }

    /// Replace the board with a prepared one (puzzles, tests).
    /// Selection is dropped; ids continue past the highest one on the board.
    pub fn set_grid(&mut self, grid: Grid) {
        let w = &mut self.world;
        w.selection.clear();
        w.next_id = w.next_id.max(grid.max_id() + 1);
        w.grid = grid;
        if w.phase == Phase::Stopped && w.grid.is_initialized() {
            w.phase = Phase::Idle;
        }
    }
}

/// Tear down whatever is on the board and build the current level fresh.
fn begin_level(w: &mut MergeWorld, events: &mut Vec<MergeEvent>) {
    teardown(w, events);
    w.collab.scoring.reset();

    let (width, height) = grid_size(w);
    w.grid = Grid::new(width, height);
    w.goals = GoalTracker::new(&w.level().goals);
    info!(
        "level {} ({}) started on a {width}x{height} grid",
        w.level_index + 1,
        w.level().name
    );
    events.push(MergeEvent::LevelStarted { index: w.level_index, width, height });

    fill::fill_empty(w, events);
    resolve::reshuffle_if_deadlocked(w, events);
    w.phase = Phase::Idle;
}

/// Remove every piece and reset per-level state. The grid becomes
/// uninitialised.
fn teardown(w: &mut MergeWorld, events: &mut Vec<MergeEvent>) {
    for p in w.grid.drain() {
        events.push(MergeEvent::Removed { id: p.id, pos: p.pos, tier: p.tier });
    }
    w.grid = Grid::empty();
    w.selection.clear();
    w.collab.scoring.update_multiplier(0);
    w.move_count = 0;
    w.goals.reset();
    w.paused = false;
}

fn grid_size(w: &mut MergeWorld) -> (usize, usize) {
    let c = &w.config;
    let (min_w, max_w) = (c.min_width.max(1), c.max_width.max(1));
    let (min_h, max_h) = (c.min_height.max(1), c.max_height.max(1));
    let width = w.rng.random_range(min_w.min(max_w)..=max_w);
    let height = w.rng.random_range(min_h.min(max_h)..=max_h);
    (width, height)
}

// ══════════════════════════════════════════════════════════════
// Update + input
// ══════════════════════════════════════════════════════════════

impl MergeEngine {
    pub fn tick(&mut self) -> Vec<MergeEvent> {
        let mut events = Vec::new();
        resolve::tick(&mut self.world, &mut events);
        events
    }

    pub fn pointer_down(&mut self, pos: Pos) -> Vec<MergeEvent> {
        let w = &mut self.world;
        if !w.accepts_input() {
            return vec![];
        }
        let Some(tier) = w.grid.tier_at(pos) else { return vec![] };
        w.selection.begin(pos, tier);
        w.phase = Phase::Selecting;
        w.collab.scoring.update_multiplier(1);
        vec![selection_changed(w)]
    }

    pub fn pointer_move(&mut self, pos: Pos) -> Vec<MergeEvent> {
        let w = &mut self.world;
        if w.phase != Phase::Selecting || w.paused || !w.grid.contains(pos) {
            return vec![];
        }
        let tier_at = w.grid.tier_at(pos);
        match w.selection.enter(pos, tier_at) {
            ChainChange::Unchanged => vec![],
            ChainChange::Extended | ChainChange::Retracted => {
                w.collab.scoring.update_multiplier(w.selection.len());
                vec![selection_changed(w)]
            }
        }
    }

    pub fn pointer_up(&mut self) -> Vec<MergeEvent> {
        let w = &mut self.world;
        if w.phase != Phase::Selecting {
            return vec![];
        }
        let (chain, _) = w.selection.take();
        w.phase = Phase::Idle;
        let mut events = Vec::new();
        if chain.len() >= 2 {
            resolve::commit(w, &chain, &mut events);
        } else {
            w.collab.scoring.update_multiplier(0);
            events.push(MergeEvent::SelectionChanged { len: 0, multiplier: 1 });
        }
        events
    }

    /// Freeze input and ticking. Any swipe in progress is dropped.
    pub fn pause(&mut self) -> Vec<MergeEvent> {
        let w = &mut self.world;
        if w.paused || w.phase == Phase::Stopped {
            return vec![];
        }
        w.paused = true;
        let had_selection = w.selection.is_active();
        w.selection.clear();
        w.collab.scoring.update_multiplier(0);
        if w.phase == Phase::Selecting {
            w.phase = Phase::Idle;
        }
        if had_selection {
            vec![MergeEvent::SelectionChanged { len: 0, multiplier: 1 }]
        } else {
            vec![]
        }
    }

    pub fn resume(&mut self) {
        self.world.paused = false;
    }
}

fn selection_changed(w: &MergeWorld) -> MergeEvent {
    let len = w.selection.len();
    MergeEvent::SelectionChanged { len, multiplier: rules::multiplier_for(len) }
}

// ══════════════════════════════════════════════════════════════
// Queries
// ══════════════════════════════════════════════════════════════

impl MergeEngine {
    pub fn grid(&self) -> &Grid {
        &self.world.grid
    }

    pub fn phase(&self) -> Phase {
        self.world.phase
    }

    pub fn is_merging(&self) -> bool {
        self.world.is_merging()
    }

    pub fn is_paused(&self) -> bool {
        self.world.paused
    }

    pub fn move_count(&self) -> u32 {
        self.world.move_count
    }

    pub fn move_limit(&self) -> Option<u32> {
        self.world.move_limit()
    }

    pub fn moves_remaining(&self) -> Option<u32> {
        self.world.move_limit().map(|l| l.saturating_sub(self.world.move_count))
    }

    pub fn level_index(&self) -> usize {
        self.world.level_index
    }

    pub fn level_count(&self) -> usize {
        self.world.levels.len()
    }

    pub fn level(&self) -> &LevelDef {
        self.world.level()
    }

    pub fn goal_progress(&self) -> Vec<GoalRow> {
        self.world.goals.rows(self.world.move_count, self.world.level().move_limit)
    }

    pub fn is_level_complete(&self) -> bool {
        self.world.goals.is_complete()
    }

    pub fn selection(&self) -> &[Pos] {
        self.world.selection.cells()
    }

    pub fn selection_tier(&self) -> Option<Tier> {
        self.world.selection.tier()
    }

    pub fn multiplier(&self) -> u32 {
        rules::multiplier_for(self.world.selection.len())
    }

    pub fn score(&self) -> u32 {
        self.world.collab.scoring.score()
    }

    pub fn optimal_moves(&self) -> u32 {
        self.world.optimal_moves()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.world.catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::level::Goal;
    use crate::sim::store::MemoryStore;
    use rand::SeedableRng;

    fn engine_with(levels: Vec<LevelDef>, collab: Collaborators) -> MergeEngine {
        let config = EngineConfig { cascade_ticks: 1, ..EngineConfig::default() };
        MergeEngine::new(config, levels, Catalog::builtin(), collab, StdRng::seed_from_u64(21))
    }

    fn progressive(goals: Vec<Goal>, move_limit: u32) -> LevelDef {
        LevelDef { name: "p".into(), goals, fill_all_tiers: false, move_limit, spawn_weights: vec![] }
    }

    #[test]
    fn start_builds_grid_within_bounds() {
        let mut e = engine_with(vec![progressive(vec![Goal::merges(1, 5)], 0)], Collaborators::headless());
        let events = e.start();
        let g = e.grid();
        assert!((4..=6).contains(&g.width()));
        assert!((4..=10).contains(&g.height()));
        assert_eq!(g.occupied_count(), g.width() * g.height());
        assert!(!g.is_deadlocked());
        assert!(matches!(events[0], MergeEvent::LevelStarted { index: 0, .. }));
        assert_eq!(e.phase(), Phase::Idle);
    }

    #[test]
    fn out_of_range_saved_level_resets_to_zero() {
        let mut collab = Collaborators::headless();
        collab.store = Box::new(MemoryStore::with(LEVEL_KEY, 99));
        let mut e = engine_with(vec![progressive(vec![], 0)], collab);
        e.start();
        assert_eq!(e.level_index(), 0);
    }

    #[test]
    fn saved_level_is_resumed() {
        let mut collab = Collaborators::headless();
        collab.store = Box::new(MemoryStore::with(LEVEL_KEY, 1));
        let levels = vec![progressive(vec![], 0), progressive(vec![], 7)];
        let mut e = engine_with(levels, collab);
        e.start();
        assert_eq!(e.level_index(), 1);
        assert_eq!(e.moves_remaining(), Some(7));
    }

    #[test]
    fn swipe_builds_and_retracts_chain() {
        let mut e = engine_with(vec![progressive(vec![], 0)], Collaborators::headless());
        e.start();
        e.set_grid(Grid::from_rows(&[&[1, 1, 1], &[2, 3, 4]]));

        assert_eq!(e.pointer_down(Pos::new(0, 0)), vec![MergeEvent::SelectionChanged { len: 1, multiplier: 1 }]);
        assert_eq!(e.pointer_move(Pos::new(1, 0)).len(), 1);
        assert_eq!(e.pointer_move(Pos::new(1, 1)), vec![]);
        assert_eq!(e.pointer_move(Pos::new(2, 0)).len(), 1);
        assert_eq!(e.selection(), &[Pos::new(0, 0), Pos::new(1, 0), Pos::new(2, 0)]);
        e.pointer_move(Pos::new(1, 0));
        assert_eq!(e.selection().len(), 2);
        // off-grid moves are ignored
        assert!(e.pointer_move(Pos::new(9, 9)).is_empty());
    }

    #[test]
    fn singleton_release_is_discarded() {
        let mut e = engine_with(vec![progressive(vec![], 0)], Collaborators::headless());
        e.start();
        let before = e.grid().clone();
        e.pointer_down(Pos::new(0, 0));
        e.pointer_up();
        assert_eq!(e.grid(), &before);
        assert_eq!(e.move_count(), 0);
        assert_eq!(e.phase(), Phase::Idle);
    }

    #[test]
    fn input_rejected_while_merging_and_paused() {
        let mut e = engine_with(vec![progressive(vec![], 0)], Collaborators::headless());
        e.start();
        e.set_grid(Grid::from_rows(&[&[1, 1, 2], &[3, 3, 4]]));
        e.pointer_down(Pos::new(0, 0));
        e.pointer_move(Pos::new(1, 0));
        e.pointer_up();
        assert!(e.is_merging());
        assert!(e.pointer_down(Pos::new(0, 1)).is_empty());
        e.tick();
        assert!(!e.is_merging());

        e.pause();
        assert!(e.pointer_down(Pos::new(0, 1)).is_empty());
        e.resume();
        assert!(!e.pointer_down(Pos::new(0, 1)).is_empty());
    }

    #[test]
    fn pause_drops_selection() {
        let mut e = engine_with(vec![progressive(vec![], 0)], Collaborators::headless());
        e.start();
        e.set_grid(Grid::from_rows(&[&[1, 1, 2], &[3, 3, 4]]));
        e.pointer_down(Pos::new(0, 0));
        e.pointer_move(Pos::new(1, 0));
        assert_eq!(e.pause(), vec![MergeEvent::SelectionChanged { len: 0, multiplier: 1 }]);
        assert!(e.selection().is_empty());
        assert!(e.pointer_up().is_empty());
        assert_eq!(e.move_count(), 0);
    }

    #[test]
    fn proceed_only_after_win_and_wraps() {
        let levels = vec![progressive(vec![Goal::merges(1, 1)], 0), progressive(vec![Goal::merges(1, 1)], 0)];
        let mut e = engine_with(levels, Collaborators::headless());
        e.start();
        assert!(e.proceed().is_empty());

        for expected in [1, 0] {
            e.set_grid(Grid::from_rows(&[&[1, 1, 2], &[3, 4, 5]]));
            e.pointer_down(Pos::new(0, 0));
            e.pointer_move(Pos::new(1, 0));
            e.pointer_up();
            assert!(matches!(e.phase(), Phase::LevelComplete(_)));
            e.proceed();
            assert_eq!(e.level_index(), expected);
            assert_eq!(e.phase(), Phase::Idle);
            assert_eq!(e.move_count(), 0);
            assert_eq!(e.score(), 0);
        }
    }

    #[test]
    fn end_game_clears_everything() {
        let mut e = engine_with(vec![progressive(vec![], 0)], Collaborators::headless());
        e.start();
        let pieces = e.grid().occupied_count();
        let events = e.end_game();
        assert_eq!(events.len(), pieces);
        assert!(!e.grid().is_initialized());
        assert_eq!(e.phase(), Phase::Stopped);
        assert!(e.pointer_down(Pos::new(0, 0)).is_empty());
        assert!(e.tick().is_empty());
        assert!(e.restart_level().is_empty());
    }

    #[test]
    fn reset_level_counts_keeps_grid() {
        let mut e = engine_with(vec![progressive(vec![Goal::merges(1, 50)], 0)], Collaborators::headless());
        e.start();
        e.set_grid(Grid::from_rows(&[&[1, 1, 2], &[3, 4, 5]]));
        e.pointer_down(Pos::new(0, 0));
        e.pointer_move(Pos::new(1, 0));
        e.pointer_up();
        assert_eq!(e.move_count(), 1);
        let grid = e.grid().clone();
        e.reset_level_counts();
        assert_eq!(e.move_count(), 0);
        assert_eq!(e.goal_progress()[0].current, 0);
        assert_eq!(e.grid(), &grid);
    }
}
