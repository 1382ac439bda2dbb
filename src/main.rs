/// Entry point and game loop.

mod ui;

use std::fs::File;
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

use mergemode::config::GameConfig;
use mergemode::sim::collab::{Collaborators, Feedback, KeyValueStore, LogCompletion, NullFeedback, ScoreBoard};
use mergemode::sim::engine::MergeEngine;
use mergemode::sim::event::MergeEvent;
use mergemode::sim::level;
use mergemode::sim::store::{self, FileStore, MemoryStore};
use mergemode::sim::world::Phase;
use ui::input::{InputState, Pointer};
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(5);
/// Ticks a status message stays on screen.
const MESSAGE_TICKS: u32 = 40;

fn main() {
    let config = GameConfig::load();
    init_logging(&config);

    let levels = level::load_levels(&config);
    let collab = Collaborators {
        scoring: Box::new(ScoreBoard::new()),
        feedback: open_feedback(),
        completion: Box::new(LogCompletion),
        store: open_store(&config),
    };
    let rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let mut engine = MergeEngine::new(config.engine.clone(), levels, config.catalog.clone(), collab, rng);

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        return;
    }

    let result = game_loop(&mut engine, &mut renderer, &config);

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    if let Err(e) = result {
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Merge Mode!");
    println!("Reached level {} with {} points.", engine.level_index() + 1, engine.score());
}

/// The terminal belongs to the renderer, so log records go to a file.
fn init_logging(config: &GameConfig) {
    let path = store::resolve_save_path(&config.log_file);
    match File::create(&path) {
        Ok(file) => {
            env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
                .target(env_logger::Target::Pipe(Box::new(file)))
                .init();
            info!("mergemode {} starting", env!("CARGO_PKG_VERSION"));
        }
        Err(e) => eprintln!("Warning: could not open log file {}: {e}", path.display()),
    }
}

fn open_store(config: &GameConfig) -> Box<dyn KeyValueStore> {
    let path = store::resolve_save_path(&config.save_file);
    match FileStore::open(&path) {
        Ok(s) => Box::new(s),
        Err(e) => {
            warn!("{e}; progress will not be saved");
            Box::new(MemoryStore::new())
        }
    }
}

fn open_feedback() -> Box<dyn Feedback> {
    match SoundEngine::new() {
        Some(sound) => Box::new(sound),
        None => Box::new(NullFeedback),
    }
}

// ── Key Constants ──

const KEYS_QUIT: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('q'), KeyCode::Char('Q')];
const KEYS_PAUSE: &[KeyCode] = &[KeyCode::F(1), KeyCode::Char('p'), KeyCode::Char('P')];
const KEYS_RETRY: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];

/// Transient status line under the board.
struct StatusLine {
    text: String,
    ticks: u32,
}

impl StatusLine {
    fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.ticks = MESSAGE_TICKS;
    }

    fn tick(&mut self) {
        if self.ticks > 0 {
            self.ticks -= 1;
            if self.ticks == 0 {
                self.text.clear();
            }
        }
    }
}

fn game_loop(
    engine: &mut MergeEngine,
    renderer: &mut Renderer,
    config: &GameConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut status = StatusLine { text: String::new(), ticks: 0 };
    let tick_rate = Duration::from_millis(config.tick_rate_ms);
    let mut last_tick = Instant::now();

    let events = engine.start();
    describe(engine, &events, &mut status);

    loop {
        kb.drain_events();

        if kb.ctrl_c_pressed() || kb.any_pressed(KEYS_QUIT) {
            break;
        }
        handle_keys(engine, &kb, &mut status);

        let layout = renderer.layout();
        for p in &kb.pointer {
            let events = match *p {
                Pointer::Down { col, row } => match layout.cell_at(col, row) {
                    Some(pos) => engine.pointer_down(pos),
                    None => vec![],
                },
                Pointer::Drag { col, row } => match layout.cell_at(col, row) {
                    Some(pos) => engine.pointer_move(pos),
                    None => vec![],
                },
                Pointer::Up => engine.pointer_up(),
            };
            describe(engine, &events, &mut status);
        }

        if last_tick.elapsed() >= tick_rate {
            let events = engine.tick();
            describe(engine, &events, &mut status);
            if !engine.is_paused() {
                status.tick();
            }
            last_tick = Instant::now();
        }

        renderer.render(engine, &status.text)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    engine.end_game();
    Ok(())
}

fn handle_keys(engine: &mut MergeEngine, kb: &InputState, status: &mut StatusLine) {
    if kb.any_pressed(KEYS_PAUSE) {
        if engine.is_paused() {
            engine.resume();
        } else {
            engine.pause();
        }
        return;
    }
    if engine.is_paused() {
        return;
    }

    if kb.any_pressed(KEYS_RETRY) {
        let events = engine.retry();
        status.set("Level restarted");
        describe(engine, &events, status);
    } else if kb.any_pressed(KEYS_CONFIRM) && matches!(engine.phase(), Phase::LevelComplete(_)) {
        let events = engine.proceed();
        describe(engine, &events, status);
    }
}

/// Turn noteworthy events into a status message.
fn describe(engine: &MergeEngine, events: &[MergeEvent], status: &mut StatusLine) {
    for event in events {
        match event {
            MergeEvent::LevelStarted { index, width, height } => {
                status.set(format!("Level {}  ({width}x{height})", index + 1));
            }
            MergeEvent::Merged { from_tier, chain_len, .. } if *chain_len >= 6 => {
                let name = engine
                    .catalog()
                    .get(from_tier + 1)
                    .map(|e| e.name.as_str())
                    .unwrap_or("?");
                status.set(format!("{chain_len} linked! {name}"));
            }
            MergeEvent::Reshuffled { .. } => status.set("No merges left. Board reshuffled"),
            MergeEvent::SpawnFailed { tier, .. } => status.set(format!("Tier {tier} has no catalog entry")),
            _ => {}
        }
    }
}
