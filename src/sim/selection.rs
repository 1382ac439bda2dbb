//! Swipe chain state machine.
//!
//! ```text
//!   Idle ──down on piece──▶ Building ──move: extend / retract──▶ Building
//!     ▲                        │
//!     └────────── up ──────────┘
//! ```
//!
//! Invariants held by every transition: all cells share the filter tier,
//! no cell appears twice, consecutive cells touch (8-directional).

use crate::domain::piece::{Pos, Tier};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ChainChange {
    Unchanged,
    Extended,
    Retracted,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    chain: Vec<Pos>,
    filter: Option<Tier>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a fresh chain at `pos`.
    pub fn begin(&mut self, pos: Pos, tier: Tier) {
        self.chain.clear();
        self.chain.push(pos);
        self.filter = Some(tier);
    }

    /// Pointer entered `pos`, whose occupant has tier `tier_at`.
    pub fn enter(&mut self, pos: Pos, tier_at: Option<Tier>) -> ChainChange {
        let Some(&last) = self.chain.last() else { return ChainChange::Unchanged };
        if pos == last {
            return ChainChange::Unchanged;
        }

        let len = self.chain.len();
        if len >= 2 && self.chain[len - 2] == pos {
            // the seed has no predecessor, so a retract never empties the chain
            self.chain.pop();
            return ChainChange::Retracted;
        }

        let matches = tier_at.is_some() && tier_at == self.filter;
        if matches && !self.chain.contains(&pos) && last.touches(pos) {
            self.chain.push(pos);
            return ChainChange::Extended;
        }
        ChainChange::Unchanged
    }

    /// Take the chain out, leaving the selection idle.
    pub fn take(&mut self) -> (Vec<Pos>, Option<Tier>) {
        let tier = self.filter.take();
        (std::mem::take(&mut self.chain), tier)
    }

    pub fn clear(&mut self) {
        self.chain.clear();
        self.filter = None;
    }

    pub fn is_active(&self) -> bool {
        !self.chain.is_empty()
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn cells(&self) -> &[Pos] {
        &self.chain
    }

    pub fn tier(&self) -> Option<Tier> {
        self.filter
    }

    pub fn contains(&self, pos: Pos) -> bool {
        self.chain.contains(&pos)
    }
}
