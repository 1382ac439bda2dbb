/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::catalog::{Catalog, CatalogEntry};
use crate::domain::piece::Tier;

// ── Public Config Structs ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub engine: EngineConfig,
    pub tick_rate_ms: u64,
    pub catalog: Catalog,
    pub levels_file: PathBuf,
    pub save_file: PathBuf,
    pub log_file: PathBuf,
    /// Fixed RNG seed; `None` seeds from the OS.
    pub seed: Option<u64>,
}

/// Everything the engine reads at runtime.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    pub min_width: usize,
    pub min_height: usize,
    pub max_width: usize,
    pub max_height: usize,
    pub max_initial_tier: Tier,
    pub moves_to_increase_tier: u32,
    pub points_per_tier: Vec<u32>,
    /// Ticks the engine stays "merging" after a commit.
    pub cascade_ticks: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            min_width: default_min_width(),
            min_height: default_min_height(),
            max_width: default_max_width(),
            max_height: default_max_height(),
            max_initial_tier: default_max_initial_tier(),
            moves_to_increase_tier: default_moves_to_increase(),
            points_per_tier: default_points_per_tier(),
            cascade_ticks: default_cascade_ticks(),
        }
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    grid: TomlGrid,
    #[serde(default)]
    spawn: TomlSpawn,
    #[serde(default)]
    scoring: TomlScoring,
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    general: TomlGeneral,
    #[serde(default)]
    catalog: Vec<TomlCatalogEntry>,
}

#[derive(Deserialize, Debug)]
struct TomlGrid {
    #[serde(default = "default_min_width")]
    min_width: usize,
    #[serde(default = "default_min_height")]
    min_height: usize,
    #[serde(default = "default_max_width")]
    max_width: usize,
    #[serde(default = "default_max_height")]
    max_height: usize,
}

#[derive(Deserialize, Debug)]
struct TomlSpawn {
    #[serde(default = "default_max_initial_tier")]
    max_initial_tier: Tier,
    #[serde(default = "default_moves_to_increase")]
    moves_to_increase_tier: u32,
}

#[derive(Deserialize, Debug)]
struct TomlScoring {
    #[serde(default = "default_points_per_tier")]
    points_per_tier: Vec<u32>,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_cascade_ticks")]
    cascade_ticks: u32,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_levels_file")]
    levels_file: String,
    #[serde(default = "default_save_file")]
    save_file: String,
    #[serde(default = "default_log_file")]
    log_file: String,
    #[serde(default)]
    seed: Option<u64>,
}

#[derive(Deserialize, Debug)]
struct TomlCatalogEntry {
    tier: Tier,
    #[serde(flatten)]
    entry: CatalogEntry,
}

// ── Defaults ──

fn default_min_width() -> usize { 4 }
fn default_min_height() -> usize { 4 }
fn default_max_width() -> usize { 6 }
fn default_max_height() -> usize { 10 }
fn default_max_initial_tier() -> Tier { 4 }
fn default_moves_to_increase() -> u32 { 10 }
fn default_points_per_tier() -> Vec<u32> { vec![2, 4, 6, 8, 10] }
fn default_tick_rate() -> u64 { 50 }
fn default_cascade_ticks() -> u32 { 6 }   // ~300ms at 50ms tick
fn default_levels_file() -> String { "levels.toml".into() }
fn default_save_file() -> String { "mergemode.sav".into() }
fn default_log_file() -> String { "mergemode.log".into() }

impl Default for TomlGrid {
    fn default() -> Self {
        TomlGrid {
            min_width: default_min_width(),
            min_height: default_min_height(),
            max_width: default_max_width(),
            max_height: default_max_height(),
        }
    }
}

impl Default for TomlSpawn {
    fn default() -> Self {
        TomlSpawn {
            max_initial_tier: default_max_initial_tier(),
            moves_to_increase_tier: default_moves_to_increase(),
        }
    }
}

impl Default for TomlScoring {
    fn default() -> Self {
        TomlScoring { points_per_tier: default_points_per_tier() }
    }
}

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            tick_rate_ms: default_tick_rate(),
            cascade_ticks: default_cascade_ticks(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            levels_file: default_levels_file(),
            save_file: default_save_file(),
            log_file: default_log_file(),
            seed: None,
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: exe directory, CWD, then the XDG and system data dirs.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        GameConfig::from_toml(load_toml(&candidate_dirs()))
    }

    /// Parse config text directly. Parse errors yield the defaults.
    pub fn from_toml_str(text: &str) -> Self {
        match toml::from_str::<TomlConfig>(text) {
            Ok(cfg) => GameConfig::from_toml(cfg),
            Err(e) => {
                eprintln!("Warning: config parse error: {e}");
                GameConfig::from_toml(TomlConfig::default())
            }
        }
    }

    fn from_toml(cfg: TomlConfig) -> Self {
        let grid = sanitize_grid(cfg.grid);

        let catalog = if cfg.catalog.is_empty() {
            Catalog::builtin()
        } else {
            Catalog::from_entries(cfg.catalog.into_iter().map(|c| (c.tier, c.entry)))
        };

        GameConfig {
            engine: EngineConfig {
                min_width: grid.min_width,
                min_height: grid.min_height,
                max_width: grid.max_width,
                max_height: grid.max_height,
                max_initial_tier: cfg.spawn.max_initial_tier.max(1),
                moves_to_increase_tier: cfg.spawn.moves_to_increase_tier,
                points_per_tier: cfg.scoring.points_per_tier,
                cascade_ticks: cfg.timing.cascade_ticks,
            },
            tick_rate_ms: cfg.timing.tick_rate_ms.max(1),
            catalog,
            levels_file: PathBuf::from(cfg.general.levels_file),
            save_file: PathBuf::from(cfg.general.save_file),
            log_file: PathBuf::from(cfg.general.log_file),
            seed: cfg.general.seed,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default())
    }
}

/// Zero dimensions become 1; an inverted min/max pair collapses to the max.
fn sanitize_grid(mut g: TomlGrid) -> TomlGrid {
    g.max_width = g.max_width.max(1);
    g.max_height = g.max_height.max(1);
    g.min_width = g.min_width.clamp(1, g.max_width);
    g.min_height = g.min_height.clamp(1, g.max_height);
    g
}

/// Candidate directories to search: exe dir + CWD + data paths (deduplicated).
pub fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/mergemode)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/mergemode");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory
    let sys = PathBuf::from("/usr/share/mergemode");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if !path.exists() {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    eprintln!("Warning: {} parse error: {e}", path.display());
                    eprintln!("Using default settings.");
                    return TomlConfig::default();
                }
            },
            Err(e) => {
                eprintln!("Warning: could not read {}: {e}", path.display());
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_gives_defaults() {
        let cfg = GameConfig::from_toml_str("");
        assert_eq!(cfg.engine, EngineConfig::default());
        assert_eq!(cfg.tick_rate_ms, 50);
        assert_eq!(cfg.catalog, Catalog::builtin());
        assert_eq!(cfg.levels_file, PathBuf::from("levels.toml"));
        assert_eq!(cfg.seed, None);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let cfg = GameConfig::from_toml_str(
            r#"
            [grid]
            max_width = 8

            [timing]
            cascade_ticks = 0

            [general]
            seed = 42
            "#,
        );
        assert_eq!(cfg.engine.max_width, 8);
        assert_eq!(cfg.engine.min_width, 4);
        assert_eq!(cfg.engine.cascade_ticks, 0);
        assert_eq!(cfg.tick_rate_ms, 50);
        assert_eq!(cfg.seed, Some(42));
    }

    #[test]
    fn catalog_section_replaces_builtin() {
        let cfg = GameConfig::from_toml_str(
            r#"
            [[catalog]]
            tier = 1
            name = "Pebble"
            glyph = "pb"

            [[catalog]]
            tier = 2
            name = "Rock"
            glyph = "rk"
            "#,
        );
        assert_eq!(cfg.catalog.len(), 2);
        assert_eq!(cfg.catalog.get(2).map(|e| e.glyph.as_str()), Some("rk"));
    }

    #[test]
    fn inverted_grid_bounds_are_repaired() {
        let cfg = GameConfig::from_toml_str("[grid]\nmin_width = 9\nmax_width = 5\nmax_height = 0\n");
        assert_eq!(cfg.engine.min_width, 5);
        assert_eq!(cfg.engine.max_width, 5);
        assert_eq!(cfg.engine.max_height, 1);
        assert_eq!(cfg.engine.min_height, 1);
    }

    #[test]
    fn broken_toml_falls_back() {
        let cfg = GameConfig::from_toml_str("[grid\nmax_width = ");
        assert_eq!(cfg.engine, EngineConfig::default());
    }
}
