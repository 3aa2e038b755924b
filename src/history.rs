//! The global history register.

use bitvec::prelude::*;
use std::ops::RangeInclusive;

use crate::Outcome;

/// A shift register holding the most recent branch outcomes.
///
/// Bit 0 is always the most recent outcome. Every tagged table reads a
/// prefix of this register matching its configured history length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalHistoryRegister {
    pub data: BitVec<usize, Lsb0>,
    len: usize,
}

// NOTE: This *reverses* the all of the bits and presents them in a format
// where the leftmost bit is the most-significant (index n) and the rightmost
// bit is the least-significant (index 0).
impl std::fmt::Display for GlobalHistoryRegister {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let x: String = self.data.as_bitslice().iter().by_vals()
            .map(|b| if b { '1' } else { '0' })
            .rev()
            .collect();
        write!(f, "{}", x)
    }
}

impl GlobalHistoryRegister {
    /// Create a register with the specified length in bits.
    /// All bits in the register are initialized to zero.
    pub fn new(len: usize) -> Self {
        Self {
            data: bitvec![usize, Lsb0; 0; len],
            len,
        }
    }

    pub fn len(&self) -> usize { self.len }
    pub fn is_empty(&self) -> bool { self.len == 0 }
    pub fn data(&self) -> &BitVec { &self.data }
}

impl GlobalHistoryRegister {
    /// Shift a resolved outcome into the bottom of the register.
    /// The oldest bit is discarded.
    pub fn push(&mut self, outcome: Outcome) {
        self.data.shift_right(1);
        self.data.set(0, outcome.into());
    }

    /// Return the low 'n' bits of the register as an integer.
    pub fn low_bits(&self, n: usize) -> usize {
        assert!(n <= self.len && n <= usize::BITS as usize);
        if n == 0 {
            return 0;
        }
        self.data[0..n].load::<usize>()
    }

    /// Fold [with XOR] some slice of bits.
    ///
    /// The slice is cut into 'output_bits'-wide chunks starting from the
    /// bottom of the range; the last chunk may be shorter.
    pub fn fold(&self, range: RangeInclusive<usize>, output_bits: usize)
        -> usize
    {
        assert!(*range.end() < self.len,
            "fold range {:?} exceeds a {}-bit history register", range, self.len
        );
        let output_mask = (1 << output_bits) - 1;
        let slice = &self.data[range];
        let chunks = slice.chunks(output_bits);
        let res = chunks.fold(0, |res, x| res ^ x.load::<usize>());
        res & output_mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_pattern(len: usize, pattern: &[Outcome]) -> GlobalHistoryRegister {
        let mut ghr = GlobalHistoryRegister::new(len);
        for o in pattern {
            ghr.push(*o);
        }
        ghr
    }

    #[test]
    fn push_shifts_into_bit_zero() {
        let ghr = from_pattern(8, &[Outcome::T, Outcome::N, Outcome::T]);
        assert_eq!(ghr.to_string(), "00000101");
        assert_eq!(ghr.low_bits(3), 0b101);
    }

    #[test]
    fn oldest_bit_falls_off_the_top() {
        let mut ghr = GlobalHistoryRegister::new(4);
        for _ in 0..4 {
            ghr.push(Outcome::T);
        }
        ghr.push(Outcome::N);
        assert_eq!(ghr.to_string(), "1110");
    }

    #[test]
    fn fold_matches_chunked_xor() {
        let mut ghr = GlobalHistoryRegister::new(128);
        let mut x: u128 = 0;
        for i in 0..100u32 {
            let bit = (i * 7 + 3) % 5 < 2;
            ghr.push(Outcome::from(bit));
            x = (x << 1) | bit as u128;
        }

        // Fold 37 bits into 12-bit chunks (12 + 12 + 12 + 1)
        let hist = x & ((1u128 << 37) - 1);
        let mut expected = 0u128;
        let mut rem = hist;
        let mut width = 37;
        while width > 0 {
            let w = width.min(12);
            expected ^= rem & ((1u128 << w) - 1);
            rem >>= w;
            width -= w;
        }
        assert_eq!(ghr.fold(0..=36, 12), expected as usize);
    }

    #[test]
    fn empty_history_folds_to_zero() {
        let ghr = GlobalHistoryRegister::new(128);
        assert_eq!(ghr.fold(0..=90, 12), 0);
        assert_eq!(ghr.low_bits(9), 0);
    }

    #[test]
    #[should_panic]
    fn fold_never_reads_beyond_register() {
        let ghr = GlobalHistoryRegister::new(64);
        let _ = ghr.fold(0..=90, 12);
    }
}
