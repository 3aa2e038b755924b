//! Predictor configuration and storage budget.
//!
//! Table sizes and field widths are fixed constants: they model a real
//! hardware storage budget and changing any of them changes the accuracy of
//! the model. Only the knobs that do not affect storage are part of
//! [`PredictorConfig`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::counter::SaturatingCounter;
use crate::error::ConfigError;
use crate::predictor::Predictor;

/// Width of the global history register [in bits].
pub const GHR_BITS: usize = 128;

/// Multiplier used by the corrector index hash; also the default RNG seed.
pub const MAGIC_NUMBER: u32 = 19_260_817;

/// Multiplier used by the tagged table tag hash.
pub const LARGE_PRIME: u32 = 1_000_000_007;

pub const BASE_TABLE_ENTRIES: usize = 1 << 13;
pub const BASE_CTR_INIT: u8 = 2;
pub const BASE_CTR_MAX: u8 = 3;

pub const TAGE_TABLE_NUM: usize = 4;
pub const TAGE_TAG_BITS: usize = 9;
pub const TAGE_INDEX_BITS: usize = 12;
pub const TAGE_TABLE_ENTRIES: usize = 1 << TAGE_INDEX_BITS;
pub const TAGE_CTR_INIT: u8 = 0;
pub const TAGE_CTR_MAX: u8 = 7;
pub const TAGE_CTR_STRONG: u8 = 5;
pub const TAGE_CTR_WEAK: u8 = 2;
pub const TAGE_U_MAX: u8 = 3;
/// Counter value seeded into a freshly allocated entry for a taken branch.
/// A not-taken branch is seeded one below.
pub const TAGE_WEAK_CORRECT: u8 = 4;
pub const TAGE_HISTORY_LENGTHS: [usize; TAGE_TABLE_NUM] = [5, 16, 37, 91];

pub const LOOP_TABLE_ENTRIES: usize = 1 << LOOP_INDEX_BITS;
pub const LOOP_INDEX_BITS: usize = 9;
pub const LOOP_TAG_BITS: usize = 14;
pub const LOOP_CONF_MAX: u8 = 3;
pub const LOOP_AGE_MAX: u8 = 255;
pub const LOOP_COUNT_BITS: usize = 14;
pub const LOOP_COUNT_MAX: u16 = (1 << LOOP_COUNT_BITS) - 1;

pub const CF_TABLE_ENTRIES: usize = 252;
pub const CF_TAG_BITS: usize = 7;
pub const CF_CTR_MAX: u8 = 63;
/// Decision point of a corrector counter. The strong/weak thresholds below
/// were chosen around a midpoint of 31 and are left unshifted.
pub const CF_CTR_MID: u8 = 32;
pub const CF_CTR_STRONG: u8 = 40;
pub const CF_CTR_WEAK: u8 = 22;
/// Distance from the midpoint where a corrector counter still counts as
/// undecided when competing for a slot.
pub const CF_CTR_UNDECIDED: u8 = 2;

pub const USE_CF_INIT: u8 = 8;
pub const USE_CF_THRESHOLD: u8 = 7;
pub const USE_CF_MAX: u8 = 15;

pub const USEFUL_RESET_LOW_PERIOD: u32 = 1 << 18;
pub const USEFUL_RESET_HIGH_PERIOD: u32 = 1 << 19;

/// Periods for the two-phase decay of the 'useful' counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UsefulResetConfig {
    /// Number of updates before the low 'useful' bit is cleared
    pub low_period: u32,

    /// Number of updates before the high 'useful' bit is cleared and the
    /// clock wraps back to zero
    pub high_period: u32,
}
impl Default for UsefulResetConfig {
    fn default() -> Self {
        Self {
            low_period: USEFUL_RESET_LOW_PERIOD,
            high_period: USEFUL_RESET_HIGH_PERIOD,
        }
    }
}

/// Configuration for a [`Predictor`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    /// Enable the loop predictor
    pub loop_enabled: bool,

    /// Enable the corrector filter and its meta-selector
    pub corrector_enabled: bool,

    /// Seed for the generator used to pick allocation targets
    pub seed: u64,

    /// History length for each tagged table, shortest first
    pub history_lengths: [usize; TAGE_TABLE_NUM],

    /// Periodic decay of the 'useful' counters
    pub useful_reset: UsefulResetConfig,
}
impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            loop_enabled: true,
            corrector_enabled: true,
            seed: MAGIC_NUMBER as u64,
            history_lengths: TAGE_HISTORY_LENGTHS,
            useful_reset: UsefulResetConfig::default(),
        }
    }
}
impl PredictorConfig {
    /// Parse and validate a configuration from JSON. Missing fields take
    /// their default values.
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|source| {
            ConfigError::Io { path: path.to_path_buf(), source }
        })?;
        Self::from_json(&s)
    }

    /// Check that every tagged table folds only bits that actually exist in
    /// the global history register, and that the decay periods make sense.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut prev: Option<usize> = None;
        for (table, &len) in self.history_lengths.iter().enumerate() {
            if len == 0 {
                return Err(ConfigError::EmptyHistory { table });
            }
            if len > GHR_BITS {
                return Err(ConfigError::HistoryTooLong {
                    table, len, max: GHR_BITS
                });
            }
            if let Some(prev) = prev {
                if prev >= len {
                    return Err(ConfigError::HistoryNotIncreasing {
                        table, prev, len
                    });
                }
            }
            prev = Some(len);
        }

        let UsefulResetConfig { low_period, high_period } = self.useful_reset;
        if low_period == 0 || high_period == 0 {
            return Err(ConfigError::ZeroResetPeriod);
        }
        if low_period >= high_period {
            return Err(ConfigError::ResetPeriodOrder {
                low: low_period, high: high_period
            });
        }
        Ok(())
    }

    /// Use this configuration to create a new [`Predictor`].
    pub fn build(self) -> Result<Predictor, ConfigError> {
        Predictor::new(self)
    }
}

/// Breakdown of the storage budget [in bits] for every component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StorageReport {
    pub base: usize,
    pub tagged: usize,
    pub loops: usize,
    pub corrector: usize,
    pub ghr: usize,
    pub meta: usize,
    pub clock: usize,
}
impl StorageReport {
    pub fn new() -> Self {
        let base_entry = SaturatingCounter::<BASE_CTR_MAX>::storage_bits();
        let tage_entry = TAGE_TAG_BITS
            + SaturatingCounter::<TAGE_CTR_MAX>::storage_bits()
            + SaturatingCounter::<TAGE_U_MAX>::storage_bits();
        let loop_entry = LOOP_TAG_BITS
            + SaturatingCounter::<LOOP_CONF_MAX>::storage_bits()
            + SaturatingCounter::<LOOP_AGE_MAX>::storage_bits()
            + 2 * LOOP_COUNT_BITS;
        let cf_entry = CF_TAG_BITS
            + SaturatingCounter::<CF_CTR_MAX>::storage_bits();
        Self {
            base: base_entry * BASE_TABLE_ENTRIES,
            tagged: tage_entry * TAGE_TABLE_ENTRIES * TAGE_TABLE_NUM,
            loops: loop_entry * LOOP_TABLE_ENTRIES,
            corrector: cf_entry * CF_TABLE_ENTRIES,
            ghr: GHR_BITS,
            meta: SaturatingCounter::<USE_CF_MAX>::storage_bits(),
            clock: USEFUL_RESET_HIGH_PERIOD.ilog2() as usize,
        }
    }

    /// Total number of storage bits.
    pub fn total_bits(&self) -> usize {
        self.base + self.tagged + self.loops + self.corrector
            + self.ghr + self.meta + self.clock
    }

    /// Total storage in KiB.
    pub fn total_kib(&self) -> f64 {
        self.total_bits() as f64 / 1024.0 / 8.0
    }
}
impl Default for StorageReport {
    fn default() -> Self { Self::new() }
}
