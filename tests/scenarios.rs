//! End-to-end sessions driven through the public engine surface.

use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use mergemode::sim::engine::LEVEL_KEY;
use mergemode::sim::store::FileStore;
use mergemode::{
    Catalog, Collaborators, EngineConfig, Goal, Grid, KeyValueStore, LevelCompleteSink, LevelDef,
    MergeEngine, MergeEvent, Phase, Pos,
};

/// Weighted level spawning tiers 1..=3; merges stop at tier 3.
fn level(goals: Vec<Goal>, move_limit: u32) -> LevelDef {
    let mut spawn_weights = vec![0.0; Catalog::builtin().len()];
    spawn_weights[..3].fill(1.0);
    LevelDef {
        name: "scenario".into(),
        goals,
        fill_all_tiers: true,
        move_limit,
        spawn_weights,
    }
}

fn engine(levels: Vec<LevelDef>, collab: Collaborators) -> MergeEngine {
    let config = EngineConfig { cascade_ticks: 1, ..EngineConfig::default() };
    MergeEngine::new(config, levels, Catalog::builtin(), collab, StdRng::seed_from_u64(99))
}

fn swipe(e: &mut MergeEngine, cells: &[Pos]) -> Vec<MergeEvent> {
    let mut events = e.pointer_down(cells[0]);
    for &c in &cells[1..] {
        events.extend(e.pointer_move(c));
    }
    events.extend(e.pointer_up());
    events
}

fn row(y: usize, xs: std::ops::Range<usize>) -> Vec<Pos> {
    xs.map(|x| Pos::new(x, y)).collect()
}

#[derive(Clone, Default)]
struct Reports(Rc<RefCell<Vec<(u32, u32, u32)>>>);

impl LevelCompleteSink for Reports {
    fn show_level_complete(&mut self, raw_score: u32, optimal_moves: u32, actual_moves: u32) {
        self.0.borrow_mut().push((raw_score, optimal_moves, actual_moves));
    }
}

#[test]
fn six_chain_doubles_score_and_keeps_board_full() {
    let mut e = engine(vec![level(vec![Goal::merges(3, 99)], 0)], Collaborators::headless());
    e.start();
    e.set_grid(Grid::from_rows(&[&[1, 1, 1, 1, 1, 1], &[2, 3, 2, 3, 2, 3]]));

    let events = swipe(&mut e, &row(0, 0..6));

    // 6 pieces at 2 points, x2 for the chain length
    assert_eq!(e.score(), 24);
    assert!(events.contains(&MergeEvent::ScoreAdded { points: 12 }));
    assert!(events.contains(&MergeEvent::Merged { pos: Pos::new(5, 0), from_tier: 1, chain_len: 6 }));
    assert_eq!(e.move_count(), 1);
    assert_eq!(e.grid().occupied_count(), 12);
    assert!(e.is_merging());
}

#[test]
fn reaching_the_goal_reports_once_and_halts_input() {
    let reports = Reports::default();
    let mut collab = Collaborators::headless();
    collab.completion = Box::new(reports.clone());

    let mut e = engine(vec![level(vec![Goal::merges(1, 1)], 0)], collab);
    e.start();
    e.set_grid(Grid::from_rows(&[&[1, 1, 2], &[3, 2, 3]]));

    let events = swipe(&mut e, &row(0, 0..2));
    assert!(events.iter().any(|ev| matches!(ev, MergeEvent::LevelComplete(_))));
    assert_eq!(reports.0.borrow().as_slice(), &[(4, 0, 1)]);
    assert!(matches!(e.phase(), Phase::LevelComplete(r) if r.actual_moves == 1));
    assert!(e.is_level_complete());

    assert!(e.pointer_down(Pos::new(0, 0)).is_empty());
    assert!(e.tick().is_empty());
    assert_eq!(reports.0.borrow().len(), 1);
}

#[test]
fn move_limit_ends_the_game_after_cascade() {
    let mut e = engine(vec![level(vec![Goal::merges(1, 50)], 1)], Collaborators::headless());
    e.start();
    e.set_grid(Grid::from_rows(&[&[1, 1, 2], &[3, 2, 3]]));

    swipe(&mut e, &row(0, 0..2));
    assert_eq!(e.moves_remaining(), Some(0));
    assert_eq!(e.tick(), vec![MergeEvent::GameOver]);
    assert_eq!(e.phase(), Phase::GameOver);
    assert!(e.pointer_down(Pos::new(0, 0)).is_empty());

    e.retry();
    assert_eq!(e.phase(), Phase::Idle);
    assert_eq!(e.moves_remaining(), Some(1));
    assert_eq!(e.score(), 0);
}

#[test]
fn ceiling_chain_clears_without_successor() {
    // ceiling is tier 3, so a tier-3 chain just vanishes
    let lv = level(vec![Goal::merges(1, 50)], 0);
    assert_eq!(lv.tier_ceiling(Catalog::builtin().len()), 3);
    let mut e = engine(vec![lv], Collaborators::headless());
    e.start();
    e.set_grid(Grid::from_rows(&[&[3, 3, 3], &[1, 2, 1]]));

    let events = swipe(&mut e, &row(0, 0..3));
    assert!(events.contains(&MergeEvent::Cleared { from_tier: 3, chain_len: 3 }));
    assert!(!events.iter().any(|ev| matches!(ev, MergeEvent::Merged { .. })));
    assert_eq!(e.goal_progress()[0].current, 0);
    assert_eq!(e.grid().occupied_count(), 6);
}

#[test]
fn level_progress_survives_restart() {
    let path = std::env::temp_dir().join(format!("mergemode_scenario_{}.sav", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let levels = || vec![level(vec![Goal::merges(1, 1)], 0), level(vec![Goal::merges(2, 1)], 0)];

    {
        let mut collab = Collaborators::headless();
        collab.store = Box::new(FileStore::open(&path).expect("fresh store"));
        let mut e = engine(levels(), collab);
        e.start();
        assert_eq!(e.level_index(), 0);
        e.set_grid(Grid::from_rows(&[&[1, 1, 2], &[3, 2, 3]]));
        swipe(&mut e, &row(0, 0..2));
        e.proceed();
        assert_eq!(e.level_index(), 1);
    }

    let store = FileStore::open(&path).expect("store reopens");
    assert_eq!(store.load_int(LEVEL_KEY, -1), 1);

    let mut collab = Collaborators::headless();
    collab.store = Box::new(store);
    let mut e = engine(levels(), collab);
    e.start();
    assert_eq!(e.level_index(), 1);

    let _ = std::fs::remove_file(&path);
}
