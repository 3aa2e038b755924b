//! A tagged component of the "TAgged GEometric history length" predictor.
//!
//! See "A case for (partially) TAgged GEometric history length branch
//! prediction" (Seznec, 2006).

use crate::Outcome;
use crate::config::*;
use crate::counter::SaturatingCounter;
use crate::history::GlobalHistoryRegister;
use crate::predictor::{PredictorTable, TaggedPredictorTable};

pub type TageCounter = SaturatingCounter<TAGE_CTR_MAX>;
pub type UsefulCounter = SaturatingCounter<TAGE_U_MAX>;

/// Container for inputs passed to a [`TageTable`].
#[derive(Clone, Copy)]
pub struct TageInputs<'a> {
    /// Program counter associated with a predicted branch
    pub pc: u32,

    /// Global history at the time of prediction
    pub ghr: &'a GlobalHistoryRegister,
}

/// An entry in some [`TageTable`].
///
/// Entries are never invalidated, only overwritten: a zeroed tag is an
/// ordinary tag value and may be matched by some program counter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TageEntry {
    /// Tag associated with this entry
    pub tag: u16,

    /// Prediction counter
    pub ctr: TageCounter,

    /// The 'useful' counter, used to determine when the entry is
    /// eligible to be replaced
    pub useful: UsefulCounter,
}

/// The index and tag computed for one branch, and whether the tag matched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TageLookup {
    pub idx: usize,
    pub tag: u16,
    pub hit: bool,
}

/// A tagged table folding some prefix of global history into its index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TageTable {
    /// Number of global history bits folded into the index
    history_len: usize,

    /// Table of entries
    data: Vec<TageEntry>,
}
impl TageTable {
    pub fn new(history_len: usize) -> Self {
        assert!(history_len > 0 && history_len <= GHR_BITS);
        let entry = TageEntry {
            ctr: TageCounter::new(TAGE_CTR_INIT),
            ..Default::default()
        };
        Self {
            history_len,
            data: vec![entry; TAGE_TABLE_ENTRIES],
        }
    }

    pub fn history_len(&self) -> usize { self.history_len }

    /// Compute the index and tag for a branch and check for a match.
    pub fn lookup(&self, pc: u32, ghr: &GlobalHistoryRegister) -> TageLookup {
        let input = TageInputs { pc, ghr };
        let idx = self.get_index(input);
        let tag = self.get_tag(input);
        TageLookup { idx, tag, hit: self.data[idx].tag == tag }
    }

    /// Predicted direction for the entry selected by some lookup.
    pub fn predict(&self, lookup: &TageLookup) -> Outcome {
        self.data[lookup.idx].ctr.predict()
    }

    /// The counter is near either end of its range.
    pub fn high_conf(&self, lookup: &TageLookup) -> bool {
        let ctr = self.data[lookup.idx].ctr.get();
        ctr <= TAGE_CTR_WEAK || ctr >= TAGE_CTR_STRONG
    }

    pub fn useful(&self, lookup: &TageLookup) -> u8 {
        self.data[lookup.idx].useful.get()
    }

    /// Train the prediction counter of an entry that provided a prediction.
    pub fn update_hit(&mut self, lookup: &TageLookup, outcome: Outcome) {
        self.data[lookup.idx].ctr.update(outcome);
    }

    /// Age an entry that could not be replaced.
    pub fn update_miss(&mut self, lookup: &TageLookup) {
        self.data[lookup.idx].useful.decrement();
    }

    /// Claim an entry for the branch described by some lookup, seeding the
    /// counter in the weakest state agreeing with the resolved outcome.
    pub fn allocate(&mut self, lookup: &TageLookup, outcome: Outcome) {
        let entry = &mut self.data[lookup.idx];
        entry.tag = lookup.tag;
        entry.useful.set(0);
        entry.ctr.set(match outcome {
            Outcome::T => TAGE_WEAK_CORRECT,
            Outcome::N => TAGE_WEAK_CORRECT - 1,
        });
    }

    /// Reward or penalize an entry whose prediction differed from the
    /// alternate prediction.
    pub fn update_useful(&mut self, lookup: &TageLookup,
        outcome: Outcome, predicted: Outcome)
    {
        let useful = &mut self.data[lookup.idx].useful;
        if outcome == predicted {
            useful.increment();
        } else {
            useful.decrement();
        }
    }

    /// Clear bits in the 'useful' counter of every entry.
    pub fn reset_useful(&mut self, mask: u8) {
        for entry in self.data.iter_mut() {
            entry.useful.mask(mask);
        }
    }

    pub fn entries(&self) -> &[TageEntry] { &self.data }

    pub fn num_useful_entries(&self) -> usize {
        self.data.iter().filter(|e| !e.useful.is_min()).count()
    }
}

impl PredictorTable for TageTable {
    type Input<'a> = TageInputs<'a>;
    type Entry = TageEntry;

    fn size(&self) -> usize { TAGE_TABLE_ENTRIES }

    /// Low bits of the program counter, XOR'ed with the folded history.
    fn get_index(&self, input: TageInputs<'_>) -> usize {
        let pc_bits = input.pc as usize & self.index_mask();
        let ghist_bits = input.ghr.fold(0..=(self.history_len - 1), TAGE_INDEX_BITS);
        (pc_bits ^ ghist_bits) & self.index_mask()
    }

    fn get_entry(&self, idx: usize) -> &TageEntry {
        let index = idx & self.index_mask();
        &self.data[index]
    }
    fn get_entry_mut(&mut self, idx: usize) -> &mut TageEntry {
        let index = idx & self.index_mask();
        &mut self.data[index]
    }
}

impl TaggedPredictorTable for TageTable {
    /// Low history bits added to a multiplicative hash of the program counter.
    fn get_tag(&self, input: TageInputs<'_>) -> u16 {
        let tag_mask = (1 << TAGE_TAG_BITS) - 1;
        let ghist_bits = (input.ghr.low_bits(TAGE_TAG_BITS) as u32) & tag_mask;
        let pc_bits = input.pc.wrapping_mul(LARGE_PRIME);
        (ghist_bits.wrapping_add(pc_bits) & tag_mask) as u16
    }
}
