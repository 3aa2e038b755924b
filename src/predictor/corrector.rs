//! A statistical corrector for low-confidence predictions.
//!
//! The corrector is a small tagged table of wide counters. It is only ever
//! consulted (or trained) when the component providing the main prediction
//! reports low confidence; while that component is confident, the corrector
//! state is frozen.

use crate::Outcome;
use crate::config::*;
use crate::counter::SaturatingCounter;
use crate::predictor::{PredictorTable, TaggedPredictorTable};

pub type CorrectorCounter = SaturatingCounter<CF_CTR_MAX>;

/// Container for inputs passed to the [`CorrectorFilter`].
#[derive(Clone, Copy, Debug)]
pub struct CorrectorInputs {
    pub pc: u32,

    /// The prediction being corrected. Taken and not-taken predictions for
    /// the same branch land in different slots.
    pub tage: Outcome,
}

/// An entry in the [`CorrectorFilter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CorrectorEntry {
    pub tag: u16,
    pub ctr: CorrectorCounter,
}
impl Default for CorrectorEntry {
    fn default() -> Self {
        Self { tag: 0, ctr: CorrectorCounter::new(CF_CTR_MID) }
    }
}
impl CorrectorEntry {
    /// Direction currently favored by the counter.
    pub fn majority(&self) -> Outcome {
        Outcome::from(self.ctr.get() >= CF_CTR_MID)
    }

    /// The counter has drifted far enough from the midpoint to be trusted.
    pub fn is_decided(&self) -> bool {
        let c = self.ctr.get();
        c >= CF_CTR_STRONG || c <= CF_CTR_WEAK
    }

    /// The counter is close enough to the midpoint that the slot may be
    /// handed to another branch.
    pub fn is_undecided(&self) -> bool {
        let lo = CF_CTR_MID - CF_CTR_UNDECIDED;
        let hi = CF_CTR_MID + CF_CTR_UNDECIDED;
        (lo..=hi).contains(&self.ctr.get())
    }
}

/// The slot selected for a branch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CorrectorSlot {
    pub idx: usize,
    pub tag: u16,
}

/// Output from [`CorrectorFilter::predict`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CorrectorLookup {
    /// The slot that was read, or [None] when the corrector was bypassed
    pub slot: Option<CorrectorSlot>,

    /// The corrected prediction
    pub outcome: Outcome,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CorrectorFilter {
    data: Vec<CorrectorEntry>,
}
impl CorrectorFilter {
    pub fn new() -> Self {
        Self {
            data: vec![CorrectorEntry::default(); CF_TABLE_ENTRIES],
        }
    }

    /// Given the prediction of the tagged tables and its confidence,
    /// return a (possibly) corrected prediction.
    pub fn predict(&self, pc: u32, tage: Outcome, high_conf: bool) -> CorrectorLookup {
        if high_conf {
            return CorrectorLookup { slot: None, outcome: tage };
        }

        let input = CorrectorInputs { pc, tage };
        let slot = CorrectorSlot {
            idx: self.get_index(input),
            tag: self.get_tag(input),
        };
        let entry = &self.data[slot.idx];

        let outcome = if entry.tag == slot.tag && entry.is_decided() {
            entry.majority()
        } else {
            tage
        };
        CorrectorLookup { slot: Some(slot), outcome }
    }

    /// Train the corrector with the resolved outcome.
    pub fn update(&mut self, lookup: &CorrectorLookup,
        tage: Outcome, outcome: Outcome, high_conf: bool)
    {
        if high_conf {
            return;
        }
        let Some(slot) = lookup.slot else { return };
        let entry = &mut self.data[slot.idx];
        let hit = entry.tag == slot.tag;

        // Nothing to correct
        if !hit && tage == outcome {
            return;
        }

        if hit {
            entry.ctr.update(outcome);
            return;
        }

        // Claim the slot from a weak owner, or from an owner which would
        // not have corrected this prediction anyway. Otherwise, push the
        // owner's counter toward this outcome so that it loses its hold
        // on the slot over time.
        if entry.is_undecided() || entry.majority() == tage {
            entry.tag = slot.tag;
            entry.ctr.set(match outcome {
                Outcome::T => CF_CTR_MID,
                Outcome::N => CF_CTR_MID - 1,
            });
        } else {
            entry.ctr.update(outcome);
        }
    }

    pub fn entries(&self) -> &[CorrectorEntry] { &self.data }
}
impl Default for CorrectorFilter {
    fn default() -> Self { Self::new() }
}

impl PredictorTable for CorrectorFilter {
    type Input<'a> = CorrectorInputs;
    type Entry = CorrectorEntry;

    fn size(&self) -> usize { CF_TABLE_ENTRIES }

    fn get_index(&self, input: CorrectorInputs) -> usize {
        let hash = input.pc
            .wrapping_mul(MAGIC_NUMBER)
            .wrapping_add(input.tage as u32);
        hash as usize % CF_TABLE_ENTRIES
    }

    // The table is not a power of two in size
    fn get_entry(&self, idx: usize) -> &CorrectorEntry {
        &self.data[idx % CF_TABLE_ENTRIES]
    }
    fn get_entry_mut(&mut self, idx: usize) -> &mut CorrectorEntry {
        &mut self.data[idx % CF_TABLE_ENTRIES]
    }
}

impl TaggedPredictorTable for CorrectorFilter {
    fn get_tag(&self, input: CorrectorInputs) -> u16 {
        ((input.pc >> 6) & ((1 << CF_TAG_BITS) - 1)) as u16
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PC: u32 = 0x4000_1040;

    fn slot_for(cf: &CorrectorFilter, tage: Outcome) -> CorrectorSlot {
        let input = CorrectorInputs { pc: PC, tage };
        CorrectorSlot { idx: cf.get_index(input), tag: cf.get_tag(input) }
    }

    #[test]
    fn fresh_entries_sit_at_midpoint() {
        let cf = CorrectorFilter::new();
        assert!(cf.entries().iter().all(|e| e.ctr.get() == 32 && e.tag == 0));
        assert_eq!(cf.size(), 252);
    }

    #[test]
    fn taken_and_not_taken_use_different_slots() {
        let cf = CorrectorFilter::new();
        let t = slot_for(&cf, Outcome::T);
        let n = slot_for(&cf, Outcome::N);
        assert_ne!(t.idx, n.idx);
        assert_eq!(t.tag, n.tag);
        assert_eq!(t.tag, 0x41);
    }

    #[test]
    fn high_confidence_bypasses_the_table() {
        let mut cf = CorrectorFilter::new();
        let s = slot_for(&cf, Outcome::T);
        *cf.get_entry_mut(s.idx) = CorrectorEntry {
            tag: s.tag, ctr: CorrectorCounter::new(0)
        };

        let l = cf.predict(PC, Outcome::T, true);
        assert_eq!(l, CorrectorLookup { slot: None, outcome: Outcome::T });

        let before = cf.clone();
        cf.update(&l, Outcome::T, Outcome::N, true);
        assert_eq!(cf, before);
    }

    #[test]
    fn tag_miss_keeps_tage_prediction() {
        let cf = CorrectorFilter::new();
        let l = cf.predict(PC, Outcome::N, false);
        assert_eq!(l.outcome, Outcome::N);
        assert_eq!(l.slot, Some(slot_for(&cf, Outcome::N)));
    }

    #[test]
    fn decided_entry_overrides() {
        let mut cf = CorrectorFilter::new();
        let s = slot_for(&cf, Outcome::T);

        for (ctr, expected) in [(0, Outcome::N), (22, Outcome::N),
            (23, Outcome::T), (39, Outcome::T), (40, Outcome::T), (63, Outcome::T)]
        {
            *cf.get_entry_mut(s.idx) = CorrectorEntry {
                tag: s.tag, ctr: CorrectorCounter::new(ctr)
            };
            assert_eq!(cf.predict(PC, Outcome::T, false).outcome, expected,
                "counter value {}", ctr);
        }
    }

    #[test]
    fn correct_miss_leaves_table_alone() {
        let mut cf = CorrectorFilter::new();
        let l = cf.predict(PC, Outcome::T, false);
        cf.update(&l, Outcome::T, Outcome::T, false);
        assert_eq!(cf, CorrectorFilter::new());
    }

    #[test]
    fn wrong_miss_claims_undecided_slot() {
        let mut cf = CorrectorFilter::new();
        let s = slot_for(&cf, Outcome::T);
        let l = cf.predict(PC, Outcome::T, false);
        cf.update(&l, Outcome::T, Outcome::N, false);
        assert_eq!(*cf.get_entry(s.idx), CorrectorEntry {
            tag: s.tag, ctr: CorrectorCounter::new(31)
        });

        let s = slot_for(&cf, Outcome::N);
        let l = cf.predict(PC, Outcome::N, false);
        cf.update(&l, Outcome::N, Outcome::T, false);
        assert_eq!(*cf.get_entry(s.idx), CorrectorEntry {
            tag: s.tag, ctr: CorrectorCounter::new(32)
        });
    }

    #[test]
    fn wrong_miss_claims_slot_agreeing_with_tage() {
        let mut cf = CorrectorFilter::new();
        let s = slot_for(&cf, Outcome::T);
        *cf.get_entry_mut(s.idx) = CorrectorEntry {
            tag: 0x7f, ctr: CorrectorCounter::new(50)
        };
        let l = cf.predict(PC, Outcome::T, false);
        cf.update(&l, Outcome::T, Outcome::N, false);
        assert_eq!(cf.get_entry(s.idx).tag, s.tag);
        assert_eq!(cf.get_entry(s.idx).ctr.get(), 31);
    }

    #[test]
    fn wrong_miss_nudges_opposing_owner() {
        let mut cf = CorrectorFilter::new();
        let s = slot_for(&cf, Outcome::T);
        *cf.get_entry_mut(s.idx) = CorrectorEntry {
            tag: 0x7f, ctr: CorrectorCounter::new(10)
        };
        let l = cf.predict(PC, Outcome::T, false);
        cf.update(&l, Outcome::T, Outcome::N, false);
        assert_eq!(*cf.get_entry(s.idx), CorrectorEntry {
            tag: 0x7f, ctr: CorrectorCounter::new(9)
        });
    }

    #[test]
    fn hit_trains_counter() {
        let mut cf = CorrectorFilter::new();
        let s = slot_for(&cf, Outcome::T);
        cf.get_entry_mut(s.idx).tag = s.tag;
        for _ in 0..10 {
            let l = cf.predict(PC, Outcome::T, false);
            cf.update(&l, Outcome::T, Outcome::N, false);
        }
        assert_eq!(cf.get_entry(s.idx).ctr.get(), 22);
        assert_eq!(cf.predict(PC, Outcome::T, false).outcome, Outcome::N);
    }
}
