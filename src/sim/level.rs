//! Level definitions and level-pack loading.
//!
//! ## Sources (priority order):
//!   1. `levels.toml` (path from `config.toml`, searched like the config)
//!   2. Built-in embedded levels
//!
//! ## Pack format (`levels.toml`):
//!   ```toml
//!   [[level]]
//!   name = "Warm-up"
//!   fill_all_tiers = true
//!   move_limit = 20
//!   spawn_weights = [4.0, 3.0, 2.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
//!   goals = [{ target_tier = 2, target_count = 12 }]
//!   ```
//!
//! `spawn_weights[i]` is the weight of tier `i + 1` and must have one entry
//! per catalog tier. `move_limit = 0` means no limit. Definitions are
//! immutable once a level starts.

use std::path::{Path, PathBuf};

use log::{info, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::config::{self, GameConfig};
use crate::domain::draw;
use crate::domain::piece::{Tier, MAX_TIER};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct Goal {
    pub target_tier: Tier,
    pub target_count: u32,
    #[serde(default)]
    pub is_move_limit: bool,
}

impl Goal {
    pub fn merges(target_tier: Tier, target_count: u32) -> Self {
        Goal { target_tier, target_count, is_move_limit: false }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct LevelDef {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub goals: Vec<Goal>,
    #[serde(default)]
    pub fill_all_tiers: bool,
    #[serde(default)]
    pub move_limit: u32,
    #[serde(default)]
    pub spawn_weights: Vec<f32>,
}

impl LevelDef {
    /// Highest tier a merge may produce on this level.
    /// Weighted levels stop at the last tier with a positive weight (tier 1
    /// when the table is invalid); progressive levels use the whole catalog.
    pub fn tier_ceiling(&self, catalog_len: usize) -> Tier {
        if self.fill_all_tiers {
            draw::highest_weighted_tier(&self.spawn_weights, catalog_len).unwrap_or(1)
        } else {
            catalog_len.min(MAX_TIER as usize) as Tier
        }
    }

    pub fn move_limit(&self) -> Option<u32> {
        (self.move_limit > 0).then_some(self.move_limit)
    }

    /// Goals that count merges (move-limit rows excluded).
    pub fn merge_goals(&self) -> impl Iterator<Item = &Goal> {
        self.goals.iter().filter(|g| !g.is_move_limit)
    }

    /// First positive merge target, or 20 when the level has none.
    pub fn headline_target(&self) -> u32 {
        self.merge_goals()
            .map(|g| g.target_count)
            .find(|&c| c > 0)
            .unwrap_or(20)
    }
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("could not read level pack {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("level pack is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("level pack contains no levels")]
    Empty,
}

#[derive(Deserialize)]
struct TomlPack {
    #[serde(default)]
    level: Vec<LevelDef>,
}

// ══════════════════════════════════════════════════════════════
// Public API
// ══════════════════════════════════════════════════════════════

/// Parse a pack from TOML text.
pub fn parse_pack(text: &str) -> Result<Vec<LevelDef>, LevelError> {
    let pack: TomlPack = toml::from_str(text)?;
    if pack.level.is_empty() {
        return Err(LevelError::Empty);
    }
    Ok(pack.level)
}

/// Read and parse a pack file.
pub fn load_pack(path: &Path) -> Result<Vec<LevelDef>, LevelError> {
    let text = std::fs::read_to_string(path).map_err(|source| LevelError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_pack(&text)
}

/// Resolve the configured pack, falling back to the embedded levels.
pub fn load_levels(config: &GameConfig) -> Vec<LevelDef> {
    let levels = match locate(&config.levels_file) {
        None => {
            info!("no level pack at {}; using built-in levels", config.levels_file.display());
            embedded_levels()
        }
        Some(path) => match load_pack(&path) {
            Ok(levels) => {
                info!("loaded {} levels from {}", levels.len(), path.display());
                levels
            }
            Err(e) => {
                warn!("{e}; using built-in levels");
                embedded_levels()
            }
        },
    };
    check_weights(&levels, config.catalog.len());
    levels
}

/// Warn once for each weighted level whose table does not fit a catalog of
/// `catalog_len` tiers. Such a level spawns only tier 1 and never upgrades.
/// Returns how many levels were flagged.
pub fn check_weights(levels: &[LevelDef], catalog_len: usize) -> usize {
    let mut flagged = 0;
    for lv in levels.iter().filter(|l| l.fill_all_tiers) {
        if draw::highest_weighted_tier(&lv.spawn_weights, catalog_len).is_none() {
            warn!(
                "level '{}': {} spawn weights for a catalog of {catalog_len}; only tier 1 will spawn",
                lv.name,
                lv.spawn_weights.len()
            );
            flagged += 1;
        }
    }
    flagged
}

fn locate(file: &Path) -> Option<PathBuf> {
    if file.is_absolute() {
        return file.exists().then(|| file.to_path_buf());
    }
    config::candidate_dirs()
        .into_iter()
        .map(|d| d.join(file))
        .find(|p| p.is_file())
}

// ══════════════════════════════════════════════════════════════
// Embedded fallback levels
// ══════════════════════════════════════════════════════════════

pub fn embedded_levels() -> Vec<LevelDef> {
    vec![
        weighted("First Steps", &[4.0, 3.0, 1.0], 0, &[Goal::merges(1, 12)]),
        weighted("Climbing", &[4.0, 3.0, 2.0, 1.0], 25, &[Goal::merges(2, 10), Goal::merges(3, 6)]),
        LevelDef {
            name: "Open Field".to_string(),
            goals: vec![Goal::merges(4, 8)],
            fill_all_tiers: false,
            move_limit: 30,
            spawn_weights: vec![],
        },
        weighted("Tight Squeeze", &[3.0, 3.0, 2.0, 2.0, 1.0], 18, &[Goal::merges(3, 9), Goal::merges(4, 4)]),
        weighted("Long Haul", &[2.0, 2.0, 2.0, 2.0, 1.0, 1.0], 40, &[Goal::merges(5, 6)]),
    ]
}

/// Weighted level over the built-in catalog; `head` lists the leading tier weights.
fn weighted(name: &str, head: &[f32], move_limit: u32, goals: &[Goal]) -> LevelDef {
    let mut spawn_weights = vec![0.0; MAX_TIER as usize];
    for (slot, &w) in spawn_weights.iter_mut().zip(head) {
        *slot = w;
    }
    LevelDef {
        name: name.to_string(),
        goals: goals.to_vec(),
        fill_all_tiers: true,
        move_limit,
        spawn_weights,
    }
}
