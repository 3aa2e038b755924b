//! Trace builders shared by the integration tests.

#![allow(dead_code)]

use tagescl::{BranchRecord, OpType, Outcome};

/// A conditional branch record.
pub fn cond(pc: u32, outcome: Outcome) -> BranchRecord {
    BranchRecord { pc, kind: OpType::JmpDirectCond, outcome, tgt: pc.wrapping_sub(0x100) }
}

/// Some non-branch instruction.
pub fn op(pc: u32) -> BranchRecord {
    BranchRecord { pc, kind: OpType::Op, outcome: Outcome::N, tgt: 0 }
}

/// A loop branch taken 'trips' times and then falling through, repeated
/// for some number of rounds.
pub fn loop_trace(pc: u32, trips: usize, rounds: usize) -> Vec<BranchRecord> {
    let mut res = Vec::new();
    for _ in 0..rounds {
        for i in 0..=trips {
            res.push(cond(pc, Outcome::from(i < trips)));
        }
    }
    res
}

/// A branch following a repeating pattern.
pub fn pattern_trace(pc: u32, pattern: &[Outcome], len: usize) -> Vec<BranchRecord> {
    (0..len).map(|i| cond(pc, pattern[i % pattern.len()])).collect()
}
