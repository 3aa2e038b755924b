//! A loop predictor for branches with a fixed trip count.
//!
//! Each entry remembers how many times a loop branch was taken during the
//! previous pass through the loop, and counts the iterations of the current
//! pass. Once the same trip count has been observed often enough (and the
//! tagged tables kept getting the exit wrong), the entry overrides every
//! other component.

use tracing::trace;

use crate::Outcome;
use crate::config::*;
use crate::counter::SaturatingCounter;
use crate::predictor::{PredictorTable, TaggedPredictorTable};

pub type LoopConfidence = SaturatingCounter<LOOP_CONF_MAX>;
pub type LoopAge = SaturatingCounter<LOOP_AGE_MAX>;

/// An entry in the [`LoopPredictor`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopEntry {
    /// Tag for the loop branch
    pub tag: u16,

    /// Saturates when the entry may override other predictions
    pub confidence: LoopConfidence,

    /// Protects an entry from being replaced
    pub age: LoopAge,

    /// Iterations observed during the previous pass
    pub past_iter: u16,

    /// Iterations observed so far during this pass
    pub current_iter: u16,
}

/// Output from [`LoopPredictor::predict`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopLookup {
    pub idx: usize,
    pub tag: u16,

    /// Predicted direction; not-taken when the tag missed
    pub outcome: Outcome,

    /// The entry is trusted to override other predictions
    pub confident: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoopPredictor {
    data: Vec<LoopEntry>,
}
impl LoopPredictor {
    pub fn new() -> Self {
        Self {
            data: vec![LoopEntry::default(); LOOP_TABLE_ENTRIES],
        }
    }

    pub fn predict(&self, pc: u32) -> LoopLookup {
        let idx = self.get_index(pc);
        let tag = self.get_tag(pc);
        let entry = &self.data[idx];

        if entry.tag != tag {
            return LoopLookup { idx, tag, outcome: Outcome::N, confident: false };
        }

        // Keep predicting 'taken' until we reach the trip count from the
        // previous pass
        LoopLookup {
            idx,
            tag,
            outcome: Outcome::from(entry.past_iter > entry.current_iter),
            confident: entry.confidence.is_max(),
        }
    }

    /// Clear an entry.
    pub fn reset_entry(&mut self, idx: usize) {
        self.data[idx] = LoopEntry::default();
    }

    /// Given an earlier lookup, the resolved outcome, and the outcome
    /// predicted by the tagged tables, update the state of the entry.
    pub fn update(&mut self, lookup: &LoopLookup, outcome: Outcome, tage_outcome: Outcome) {
        let idx = lookup.idx;
        let entry = &mut self.data[idx];

        // The slot belongs to some other branch
        if entry.tag != lookup.tag {
            if entry.age.is_min() {
                trace!(idx, tag = lookup.tag, "allocating loop entry");
                *entry = LoopEntry {
                    tag: lookup.tag,
                    confidence: LoopConfidence::new(0),
                    age: LoopAge::new(LOOP_AGE_MAX),
                    past_iter: LOOP_COUNT_MAX,
                    current_iter: 0,
                };
            } else {
                entry.age.decrement();
            }
            return;
        }

        entry.current_iter = (entry.current_iter + 1) & LOOP_COUNT_MAX;

        if lookup.outcome != outcome {
            // A fresh entry is still learning the trip count
            if entry.age.is_max() && entry.confidence.get() <= 1 {
                entry.past_iter = entry.current_iter;
                entry.current_iter = 0;
            } else {
                trace!(idx, tag = lookup.tag, "invalidating loop entry");
                self.reset_entry(idx);
            }
            return;
        }

        // Correctly predicted the loop exit
        if outcome == Outcome::N {
            entry.current_iter = 0;
            if tage_outcome != outcome {
                entry.confidence.increment();
                entry.age.increment();
            }
        }
    }
}
impl Default for LoopPredictor {
    fn default() -> Self { Self::new() }
}

impl PredictorTable for LoopPredictor {
    type Input<'a> = u32;
    type Entry = LoopEntry;

    fn size(&self) -> usize { LOOP_TABLE_ENTRIES }

    fn get_index(&self, pc: u32) -> usize {
        pc as usize & self.index_mask()
    }

    fn get_entry(&self, idx: usize) -> &LoopEntry {
        let index = idx & self.index_mask();
        &self.data[index]
    }
    fn get_entry_mut(&mut self, idx: usize) -> &mut LoopEntry {
        let index = idx & self.index_mask();
        &mut self.data[index]
    }
}

impl TaggedPredictorTable for LoopPredictor {
    /// The program counter bits directly above the index.
    fn get_tag(&self, pc: u32) -> u16 {
        ((pc >> LOOP_INDEX_BITS) & ((1 << LOOP_TAG_BITS) - 1)) as u16
    }
}
