/// Integer key-value persistence for level continuity.
///
/// ## File format:
///   One `key=value` pair per line. Blank lines and `#` comments are skipped,
///   malformed lines are ignored on load. The whole file is rewritten on
///   every save.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use thiserror::Error;

use crate::sim::collab::KeyValueStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ══════════════════════════════════════════════════════════════
// Paths
// ══════════════════════════════════════════════════════════════

/// Directory for the save file: a writable exe dir, else the XDG data home,
/// else CWD.
pub fn save_dir() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            // system installs won't be writable
            let probe = parent.join(".write_test_mergemode");
            if std::fs::write(&probe, "").is_ok() {
                let _ = std::fs::remove_file(&probe);
                return parent.to_path_buf();
            }
        }
    }

    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/mergemode");
        if std::fs::create_dir_all(&xdg).is_ok() {
            return xdg;
        }
    }

    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Resolve a configured save file name against `save_dir()`.
pub fn resolve_save_path(file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        save_dir().join(file)
    }
}

// ══════════════════════════════════════════════════════════════
// File-backed store
// ══════════════════════════════════════════════════════════════

pub struct FileStore {
    path: PathBuf,
    values: BTreeMap<String, i64>,
}

impl FileStore {
    /// Open `path`, loading whatever it already holds. A missing file is an
    /// empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => parse(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(StoreError::Read { path, source }),
        };
        debug!("store: {} keys loaded from {}", values.len(), path.display());
        Ok(FileStore { path, values })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        std::fs::write(&self.path, serialize(&self.values)).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }
}

impl KeyValueStore for FileStore {
    fn load_int(&self, key: &str, default: i64) -> i64 {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn save_int(&mut self, key: &str, value: i64) {
        self.values.insert(key.to_string(), value);
        if let Err(e) = self.flush() {
            warn!("{e}");
        }
    }
}

// ══════════════════════════════════════════════════════════════
// In-memory store
// ══════════════════════════════════════════════════════════════

#[derive(Default, Debug, Clone)]
pub struct MemoryStore {
    values: BTreeMap<String, i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(key: &str, value: i64) -> Self {
        let mut s = Self::new();
        s.values.insert(key.to_string(), value);
        s
    }
}

impl KeyValueStore for MemoryStore {
    fn load_int(&self, key: &str, default: i64) -> i64 {
        self.values.get(key).copied().unwrap_or(default)
    }

    fn save_int(&mut self, key: &str, value: i64) {
        self.values.insert(key.to_string(), value);
    }
}

// ══════════════════════════════════════════════════════════════
// Format
// ══════════════════════════════════════════════════════════════

fn parse(text: &str) -> BTreeMap<String, i64> {
    let mut values = BTreeMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, val)) = line.split_once('=') else { continue };
        if let Ok(v) = val.trim().parse() {
            values.insert(key.trim().to_string(), v);
        }
    }
    values
}

fn serialize(values: &BTreeMap<String, i64>) -> String {
    let mut out = String::from("# mergemode save\n");
    for (k, v) in values {
        out.push_str(&format!("{k}={v}\n"));
    }
    out
}
