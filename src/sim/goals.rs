//! Per-level goal tracking.
//!
//! Counts are keyed by goal target tier and grow by the chain length of each
//! upgrading merge whose source tier matches. Move-limit goals never count
//! toward completion; their remaining value is derived from the move count.

use std::collections::BTreeMap;

use crate::domain::piece::Tier;
use crate::sim::level::Goal;

/// One line of the goal panel.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct GoalRow {
    pub tier: Tier,
    pub current: u32,
    pub target: u32,
    pub remaining: u32,
    pub is_move_limit: bool,
}

#[derive(Clone, Debug, Default)]
pub struct GoalTracker {
    goals: Vec<Goal>,
    counts: BTreeMap<Tier, u32>,
}

impl GoalTracker {
    pub fn new(goals: &[Goal]) -> Self {
        let mut t = GoalTracker { goals: goals.to_vec(), counts: BTreeMap::new() };
        t.reset();
        t
    }

    /// Zero every merge counter.
    pub fn reset(&mut self) {
        self.counts.clear();
        for g in self.goals.iter().filter(|g| !g.is_move_limit) {
            self.counts.insert(g.target_tier, 0);
        }
    }

    /// Credit an upgrading merge of `chain_len` pieces of `source_tier`.
    /// Returns the tier's new count when a goal matched.
    pub fn record_merge(&mut self, source_tier: Tier, chain_len: usize) -> Option<u32> {
        let goal = self
            .goals
            .iter()
            .find(|g| !g.is_move_limit && g.target_tier == source_tier)?;
        let count = self.counts.entry(goal.target_tier).or_insert(0);
        *count = count.saturating_add(chain_len as u32);
        Some(*count)
    }

    pub fn count_for(&self, tier: Tier) -> u32 {
        self.counts.get(&tier).copied().unwrap_or(0)
    }

    /// Every merge goal met. A level with no merge goals never completes.
    pub fn is_complete(&self) -> bool {
        let mut merge_goals = self.goals.iter().filter(|g| !g.is_move_limit).peekable();
        merge_goals.peek().is_some()
            && merge_goals.all(|g| self.count_for(g.target_tier) >= g.target_count)
    }

    pub fn remaining(&self, goal: &Goal, move_count: u32) -> u32 {
        if goal.is_move_limit {
            goal.target_count.saturating_sub(move_count)
        } else {
            goal.target_count.saturating_sub(self.count_for(goal.target_tier))
        }
    }

    /// Goal panel rows in definition order, followed by a synthetic
    /// move-limit row when `move_limit > 0`.
    pub fn rows(&self, move_count: u32, move_limit: u32) -> Vec<GoalRow> {
        let mut rows: Vec<GoalRow> = self
            .goals
            .iter()
            .map(|g| GoalRow {
                tier: g.target_tier,
                current: if g.is_move_limit { move_count } else { self.count_for(g.target_tier) },
                target: g.target_count,
                remaining: self.remaining(g, move_count),
                is_move_limit: g.is_move_limit,
            })
            .collect();
        if move_limit > 0 {
            rows.push(GoalRow {
                tier: 0,
                current: move_count,
                target: move_limit,
                remaining: move_limit.saturating_sub(move_count),
                is_move_limit: true,
            });
        }
        rows
    }
}
