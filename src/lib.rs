//! Merge Mode: a swipe-to-merge grid puzzle engine.
//!
//! `domain` holds pure data and rules, `sim` the session state machine and
//! its collaborators, `config` the TOML loader. The terminal front-end lives
//! in the binary.

pub mod config;
pub mod domain;
pub mod sim;

pub use config::{EngineConfig, GameConfig};
pub use domain::catalog::{Catalog, CatalogEntry};
pub use domain::grid::Grid;
pub use domain::piece::{Piece, PieceId, Pos, Tier, MAX_TIER};
pub use sim::collab::{Collaborators, Feedback, KeyValueStore, LevelCompleteSink, ScoreBoard, Scoring};
pub use sim::engine::MergeEngine;
pub use sim::event::{LevelReport, MergeEvent};
pub use sim::level::{Goal, LevelDef};
pub use sim::world::Phase;
