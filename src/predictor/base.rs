//! The base component: a table of 2-bit counters indexed by program counter.

use crate::Outcome;
use crate::config::*;
use crate::counter::SaturatingCounter;
use crate::predictor::PredictorTable;

pub type BaseCounter = SaturatingCounter<BASE_CTR_MAX>;

/// Output from [`BasePredictor::predict`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BaseLookup {
    /// Index of the entry used to make this prediction
    pub idx: usize,

    /// Predicted direction
    pub outcome: Outcome,

    /// The counter is pinned at either end
    pub high_conf: bool,
}

/// Fallback predictor used when no tagged table matches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BasePredictor {
    data: Vec<BaseCounter>,
}
impl BasePredictor {
    pub fn new() -> Self {
        Self {
            data: vec![BaseCounter::new(BASE_CTR_INIT); BASE_TABLE_ENTRIES],
        }
    }

    pub fn predict(&self, pc: u32) -> BaseLookup {
        let idx = self.get_index(pc);
        let ctr = self.get_entry(idx);
        BaseLookup {
            idx,
            outcome: ctr.predict(),
            high_conf: ctr.is_saturated(),
        }
    }

    /// Train the entry used by some earlier prediction.
    pub fn update(&mut self, lookup: &BaseLookup, outcome: Outcome) {
        self.get_entry_mut(lookup.idx).update(outcome);
    }
}
impl Default for BasePredictor {
    fn default() -> Self { Self::new() }
}

impl PredictorTable for BasePredictor {
    type Input<'a> = u32;
    type Entry = BaseCounter;

    fn size(&self) -> usize { BASE_TABLE_ENTRIES }

    fn get_index(&self, pc: u32) -> usize {
        pc as usize % BASE_TABLE_ENTRIES
    }

    fn get_entry(&self, idx: usize) -> &BaseCounter {
        let index = idx & self.index_mask();
        &self.data[index]
    }
    fn get_entry_mut(&mut self, idx: usize) -> &mut BaseCounter {
        let index = idx & self.index_mask();
        &mut self.data[index]
    }
}
