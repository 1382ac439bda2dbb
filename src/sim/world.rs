/// MergeWorld: the complete state of a running merge session.
///
/// ## Ownership
///
///   - `grid` owns every piece. Only the resolve/fill passes and the level
///     lifecycle in `engine` write to it.
///   - `goals` is the sole owner of per-tier merge counts.
///   - `selection` is input state only; it never touches the grid.
///
/// ## Phases
///
/// ```text
///   Stopped ──start──▶ Idle ◀──▶ Selecting ──commit──▶ Cascading ──ticks──▶ Idle
///                       │                                   │
///                       └──moves exhausted──▶ GameOver      └──goals met──▶ LevelComplete
/// ```
///
/// `paused` is orthogonal to the phase: it freezes input and ticking
/// without touching the grid.

use log::warn;
use rand::rngs::StdRng;

use crate::config::EngineConfig;
use crate::domain::catalog::Catalog;
use crate::domain::grid::Grid;
use crate::domain::piece::PieceId;
use crate::domain::rules;
use crate::sim::collab::Collaborators;
use crate::sim::event::LevelReport;
use crate::sim::goals::GoalTracker;
use crate::sim::level::{self, LevelDef};
use crate::sim::selection::Selection;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    /// No grid. Before `start()` and after `end_game()`.
    Stopped,
    Idle,
    Selecting,
    /// Presentation is catching up on a commit; input is rejected.
    Cascading { remaining: u32 },
    /// Grid frozen until `proceed()` or `retry()`.
    LevelComplete(LevelReport),
    GameOver,
}

pub struct MergeWorld {
    // ── Board ──
    pub grid: Grid,
    pub next_id: PieceId,

    // ── Level ──
    /// Never empty.
    pub levels: Vec<LevelDef>,
    pub level_index: usize,
    pub goals: GoalTracker,
    pub move_count: u32,

    // ── Input ──
    pub selection: Selection,

    // ── Flow ──
    pub phase: Phase,
    pub paused: bool,

    // ── Setup ──
    pub config: EngineConfig,
    /// `config.points_per_tier` stretched to the catalog length.
    pub points_per_tier: Vec<u32>,
    pub catalog: Catalog,
    pub rng: StdRng,
    pub collab: Collaborators,
}

// ── Construction ──

impl MergeWorld {
    pub fn new(
        config: EngineConfig,
        mut levels: Vec<LevelDef>,
        catalog: Catalog,
        collab: Collaborators,
        rng: StdRng,
    ) -> Self {
        if levels.is_empty() {
            warn!("no level definitions supplied; using built-in levels");
            levels = level::embedded_levels();
        }
        let points_per_tier = rules::extend_points_table(&config.points_per_tier, catalog.len());
        let goals = GoalTracker::new(&levels[0].goals);
        MergeWorld {
            grid: Grid::empty(),
            next_id: 1,
            levels,
            level_index: 0,
            goals,
            move_count: 0,
            selection: Selection::new(),
            phase: Phase::Stopped,
            paused: false,
            config,
            points_per_tier,
            catalog,
            rng,
            collab,
        }
    }
}

// ── Queries ──

impl MergeWorld {
    pub fn level(&self) -> &LevelDef {
        &self.levels[self.level_index]
    }

    pub fn move_limit(&self) -> Option<u32> {
        self.level().move_limit()
    }

    pub fn moves_exhausted(&self) -> bool {
        self.move_limit().is_some_and(|limit| self.move_count >= limit)
    }

    pub fn is_merging(&self) -> bool {
        matches!(self.phase, Phase::Cascading { .. })
    }

    /// Can a new swipe begin right now?
    pub fn accepts_input(&self) -> bool {
        !self.paused
            && matches!(self.phase, Phase::Idle | Phase::Selecting)
            && self.grid.is_initialized()
            && !self.moves_exhausted()
    }

    pub fn optimal_moves(&self) -> u32 {
        rules::optimal_moves(self.level().headline_target())
    }

    pub fn alloc_id(&mut self) -> PieceId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::level::Goal;
    use rand::SeedableRng;

    fn world(levels: Vec<LevelDef>) -> MergeWorld {
        MergeWorld::new(
            EngineConfig::default(),
            levels,
            Catalog::builtin(),
            Collaborators::headless(),
            StdRng::seed_from_u64(0),
        )
    }

    #[test]
    fn empty_level_list_falls_back_to_builtin() {
        let w = world(vec![]);
        assert_eq!(w.levels, level::embedded_levels());
        assert_eq!(w.phase, Phase::Stopped);
        assert!(!w.accepts_input());
    }

    #[test]
    fn points_table_covers_catalog() {
        let w = world(vec![]);
        assert_eq!(w.points_per_tier.len(), w.catalog.len());
        assert_eq!(w.points_per_tier[10], 10);
    }

    #[test]
    fn exhaustion_only_with_a_limit() {
        let mut lv = level::embedded_levels()[0].clone();
        lv.move_limit = 0;
        let mut w = world(vec![lv.clone()]);
        w.move_count = 1000;
        assert!(!w.moves_exhausted());

        lv.move_limit = 3;
        lv.goals = vec![Goal::merges(1, 10)];
        let mut w = world(vec![lv]);
        w.move_count = 3;
        assert!(w.moves_exhausted());
        assert_eq!(w.optimal_moves(), 5);
    }

    #[test]
    fn ids_are_unique_and_increasing() {
        let mut w = world(vec![]);
        let a = w.alloc_id();
        let b = w.alloc_id();
        assert!(b > a);
    }
}
