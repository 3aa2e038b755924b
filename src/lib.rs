//! A model of the TAGE-SC-L conditional branch direction predictor.
//!
//! The predictor combines a table of bimodal counters, four tagged tables
//! indexed with geometrically-increasing lengths of global history, a loop
//! predictor and a small statistical corrector. See [`Predictor`].
//!
//! The [`sim`] module drives a predictor over a trace of [`BranchRecord`]s
//! and collects [`stats::BranchStats`].

pub mod branch;
pub mod config;
pub mod counter;
pub mod error;
pub mod history;
pub mod predictor;
pub mod sim;
pub mod stats;
pub mod trace;

pub use branch::*;
pub use config::{PredictorConfig, StorageReport, UsefulResetConfig};
pub use error::*;
pub use history::*;
pub use predictor::*;
pub use trace::*;
