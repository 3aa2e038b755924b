//! Implementation of a saturating counter.

use crate::Outcome;

/// An unsigned saturating counter over the range `0..=MAX`.
///
/// Every table in the predictor is built from these: the width of a counter
/// is part of the storage budget, so `MAX` is always `2^n - 1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SaturatingCounter<const MAX: u8>(u8);

impl<const MAX: u8> SaturatingCounter<MAX> {
    /// The largest value this counter can hold.
    pub const MAX: u8 = MAX;

    /// Create a counter with some initial value (clamped to `MAX`).
    pub const fn new(val: u8) -> Self {
        if val > MAX { Self(MAX) } else { Self(val) }
    }

    /// Number of storage bits needed for this counter.
    pub const fn storage_bits() -> usize {
        (u8::BITS - MAX.leading_zeros()) as usize
    }

    pub fn get(&self) -> u8 { self.0 }

    /// Set the value of the counter (clamped to `MAX`).
    pub fn set(&mut self, val: u8) {
        *self = Self::new(val);
    }

    pub fn increment(&mut self) {
        if self.0 < MAX { self.0 += 1; }
    }

    pub fn decrement(&mut self) {
        self.0 = self.0.saturating_sub(1);
    }

    /// Move the counter toward the provided outcome.
    pub fn update(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::T => self.increment(),
            Outcome::N => self.decrement(),
        }
    }

    /// Return the direction currently held by the counter.
    pub fn predict(&self) -> Outcome {
        Outcome::from(self.0 > MAX / 2)
    }

    pub fn is_max(&self) -> bool { self.0 == MAX }
    pub fn is_min(&self) -> bool { self.0 == 0 }

    /// Returns true when the counter is pinned at either end.
    pub fn is_saturated(&self) -> bool {
        self.is_min() || self.is_max()
    }

    /// Clear bits in the counter with a bitwise AND.
    pub fn mask(&mut self, mask: u8) {
        self.0 &= mask;
    }
}
