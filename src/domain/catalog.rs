//! Piece catalog: the ordered tier → presentation binding list.
//!
//! The core only asks two things of it: how many tiers exist (`len`) and
//! whether a given tier has a binding (`contains`). Names and glyphs are
//! carried for the front-end.

use log::warn;
use serde::Deserialize;

use super::piece::{Tier, MAX_TIER};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CatalogEntry {
    pub name: String,
    pub glyph: String,
}

impl CatalogEntry {
    pub fn new(name: &str, glyph: &str) -> Self {
        CatalogEntry { name: name.to_string(), glyph: glyph.to_string() }
    }
}

/// `entries[tier - 1]`. A `None` slot is a tier with no binding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Catalog {
    entries: Vec<Option<CatalogEntry>>,
}

impl Catalog {
    /// Build from `(tier, entry)` pairs. Length is the highest tier given;
    /// tiers never listed stay unbound. Tiers outside `1..=MAX_TIER` are
    /// dropped with a warning.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Tier, CatalogEntry)>,
    {
        let mut slots: Vec<Option<CatalogEntry>> = Vec::new();
        for (tier, entry) in entries {
            if tier == 0 || tier > MAX_TIER {
                warn!("catalog: tier {tier} outside 1..={MAX_TIER}, entry '{}' dropped", entry.name);
                continue;
            }
            let idx = tier as usize - 1;
            if slots.len() <= idx {
                slots.resize(idx + 1, None);
            }
            slots[idx] = Some(entry);
        }
        Catalog { entries: slots }
    }

    /// The eleven built-in tiers.
    pub fn builtin() -> Self {
        const CATS: [(&str, &str); MAX_TIER as usize] = [
            ("Kitten", "ki"),
            ("Tabby", "ta"),
            ("Ginger", "gi"),
            ("Siamese", "si"),
            ("Calico", "ca"),
            ("Persian", "pe"),
            ("Sphynx", "sp"),
            ("Maine Coon", "mc"),
            ("Bengal", "be"),
            ("Electric", "el"),
            ("Cosmic", "co"),
        ];
        Catalog::from_entries(
            CATS.iter()
                .enumerate()
                .map(|(i, (name, glyph))| ((i + 1) as Tier, CatalogEntry::new(name, glyph))),
        )
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, tier: Tier) -> bool {
        self.get(tier).is_some()
    }

    pub fn get(&self, tier: Tier) -> Option<&CatalogEntry> {
        let idx = (tier as usize).checked_sub(1)?;
        self.entries.get(idx).and_then(Option::as_ref)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Catalog::builtin()
    }
}
