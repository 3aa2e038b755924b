//! Helpers for collecting statistics.

use std::collections::*;

use bitvec::prelude::*;
use itertools::*;
use serde::Serialize;

use crate::branch::*;

/// Container for recording simple statistics while evaluating a predictor.
#[derive(Clone, Debug, Default)]
pub struct BranchStats {
    /// Per-branch statistics (indexed by program counter value).
    pub data: BTreeMap<u32, BranchData>,

    /// Number of correct predictions
    pub global_hits: usize,

    /// Number of times any conditional branch was executed
    pub global_brns: usize,

    /// Number of instructions of any kind
    pub instructions: usize,
}
impl BranchStats {
    pub fn new() -> Self { Self::default() }

    /// Return the global hit rate.
    pub fn hit_rate(&self) -> f64 {
        if self.global_brns == 0 {
            return 0.0;
        }
        self.global_hits as f64 / self.global_brns as f64
    }

    /// Return the global hit count.
    pub fn global_hits(&self) -> usize { self.global_hits }

    /// Return the global miss count.
    pub fn global_miss(&self) -> usize { self.global_brns - self.global_hits }

    /// Return the total conditional branch count.
    pub fn global_brns(&self) -> usize { self.global_brns }

    /// Mispredictions per thousand instructions.
    pub fn mpki(&self) -> f64 {
        if self.instructions == 0 {
            return 0.0;
        }
        self.global_miss() as f64 * 1000.0 / self.instructions as f64
    }

    /// Count an instruction which was not predicted.
    pub fn update_other(&mut self) {
        self.instructions += 1;
    }

    /// Record the prediction made for a conditional branch.
    pub fn update(&mut self, record: &BranchRecord, predicted: Outcome) {
        let hit = predicted == record.outcome;
        self.instructions += 1;
        self.global_brns += 1;
        if hit { self.global_hits += 1; }

        let data = self.get_mut(record.pc);
        data.occ += 1;
        data.pat.push(record.outcome.into());
        if hit { data.hits += 1; }
    }

    /// Returns a reference to data collected for a particular branch.
    pub fn get(&self, pc: u32) -> Option<&BranchData> {
        self.data.get(&pc)
    }

    /// Returns a mutable reference to data collected for a particular branch.
    /// Creates a new entry if one doesn't already exist.
    pub fn get_mut(&mut self, pc: u32) -> &mut BranchData {
        self.data.entry(pc).or_default()
    }

    /// Returns the number of unique observed branch instructions.
    pub fn num_unique_branches(&self) -> usize {
        self.data.len()
    }

    /// Returns the number of branches that are always taken
    pub fn num_always_taken(&self) -> usize {
        self.data.values().filter(|d| d.is_always_taken()).count()
    }

    /// Returns the number of branches that are never taken
    pub fn num_never_taken(&self) -> usize {
        self.data.values().filter(|d| d.is_never_taken()).count()
    }

    /// The 'n' most frequently executed branches.
    pub fn get_common_branches(&self, n: usize) -> Vec<(u32, &BranchData)> {
        self.data.iter()
            .sorted_by(|x, y| y.1.occ.cmp(&x.1.occ).then(x.0.cmp(y.0)))
            .take(n)
            .map(|(pc, s)| (*pc, s))
            .collect()
    }

    /// The 'n' branches responsible for the most mispredictions.
    pub fn worst_branches(&self, n: usize) -> Vec<(u32, &BranchData)> {
        self.data.iter()
            .filter(|(_, s)| s.misses() > 0)
            .sorted_by(|x, y| {
                y.1.misses().cmp(&x.1.misses()).then(x.0.cmp(y.0))
            })
            .take(n)
            .map(|(pc, s)| (*pc, s))
            .collect()
    }

    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            instructions: self.instructions,
            branches: self.global_brns,
            mispredictions: self.global_miss(),
            unique_branches: self.num_unique_branches(),
            accuracy: self.hit_rate(),
            mpki: self.mpki(),
        }
    }
}

/// Global results, in a form suitable for serializing.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct StatsSummary {
    pub instructions: usize,
    pub branches: usize,
    pub mispredictions: usize,
    pub unique_branches: usize,
    pub accuracy: f64,
    pub mpki: f64,
}

/// Container for per-branch statistics.
#[derive(Clone, Debug, Default)]
pub struct BranchData {
    /// Number of times this branch was encountered.
    pub occ: usize,

    /// Number of correct predictions for this branch.
    pub hits: usize,

    /// Record of all observed outcomes for this branch.
    pub pat: BitVec,
}
impl BranchData {
    /// Return the hit rate for this branch.
    pub fn hit_rate(&self) -> f64 {
        if self.occ == 0 {
            return 0.0;
        }
        self.hits as f64 / self.occ as f64
    }

    pub fn misses(&self) -> usize { self.occ - self.hits }

    pub fn is_always_taken(&self) -> bool {
        self.pat.count_ones() == self.pat.len()
    }

    pub fn is_never_taken(&self) -> bool {
        self.pat.count_zeros() == self.pat.len()
    }

    pub fn times_taken(&self) -> usize {
        self.pat.count_ones()
    }
}
