//! Driving a predictor over a trace.

use rand::RngCore;
use rand::rngs::StdRng;
use tracing::warn;

use crate::branch::*;
use crate::config::PredictorConfig;
use crate::error::ConfigError;
use crate::predictor::{Prediction, Predictor};
use crate::stats::BranchStats;

/// Run a predictor over some records and collect statistics.
pub fn run<R: RngCore>(predictor: &mut Predictor<R>, records: &[BranchRecord])
    -> BranchStats
{
    run_with_warmup(predictor, records, 0)
}

/// Like [`run`], but the first 'warmup' records only train the predictor
/// and are left out of the statistics.
pub fn run_with_warmup<R: RngCore>(predictor: &mut Predictor<R>,
    records: &[BranchRecord],
    warmup: usize,
) -> BranchStats
{
    let mut stats = BranchStats::new();
    for (i, record) in records.iter().enumerate() {
        let measured = i >= warmup;
        if record.kind.is_conditional() {
            let p = predictor.predict(record.pc);
            if measured {
                stats.update(record, p.outcome);
            }
            predictor.update(&p, record.outcome, p.outcome, record.tgt);
        } else {
            predictor.track_other_inst(record.pc, record.kind, record.tgt);
            if measured {
                stats.update_other();
            }
        }
    }
    stats
}

/// A [`Predictor`] behind the call sequence used by trace-driven
/// simulators: `get_prediction` for a branch, followed by
/// `update_predictor` for the same branch.
///
/// The handle from the last prediction is held until the matching update.
#[derive(Clone, Debug)]
pub struct Cbp<R = StdRng> {
    predictor: Predictor<R>,
    pending: Option<Prediction>,
}

impl Cbp<StdRng> {
    pub fn new(cfg: PredictorConfig) -> Result<Self, ConfigError> {
        Ok(Self::from_predictor(Predictor::new(cfg)?))
    }
}

impl<R: RngCore> Cbp<R> {
    pub fn from_predictor(predictor: Predictor<R>) -> Self {
        Self { predictor, pending: None }
    }

    pub fn predictor(&self) -> &Predictor<R> { &self.predictor }
    pub fn into_inner(self) -> Predictor<R> { self.predictor }

    /// Predict the direction of the conditional branch at 'pc'.
    pub fn get_prediction(&mut self, pc: u32) -> bool {
        let p = self.predictor.predict(pc);
        self.pending = Some(p);
        p.outcome.into()
    }

    /// Train the predictor with the resolved direction of the branch at
    /// 'pc', which must be the last branch passed to `get_prediction`.
    pub fn update_predictor(&mut self,
        pc: u32,
        resolved: bool,
        predicted: bool,
        target: u32,
    )
    {
        let p = match self.pending.take() {
            Some(p) if p.pc == pc => p,
            pending => {
                warn!(pc, pending = ?pending.map(|p| p.pc),
                    "update without a matching prediction, recomputing");
                self.predictor.predict(pc)
            },
        };
        self.predictor.update(&p,
            Outcome::from(resolved),
            Outcome::from(predicted),
            target
        );
    }

    pub fn track_other_inst(&mut self, pc: u32, op: OpType, target: u32) {
        self.predictor.track_other_inst(pc, op, target);
    }
}
