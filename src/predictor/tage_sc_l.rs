//! The TAGE-SC-L predictor: tagged tables, a loop predictor and a
//! statistical corrector combined under a fixed storage budget.
//!
//! ```text
//!        ___________________
//! --PC--|                   |--prediction, confidence--.
//!       |  base + 4 x TAGE  |                          v
//! -GHR--|___________________|                    [ corrector ]
//!                                                      |
//!        ___________________                           v
//! --PC--|  loop predictor   |-----(if confident)--> prediction
//!       |___________________|
//! ```
//!
//! [`Predictor::predict`] is a pure read: it returns a [`Prediction`] handle
//! holding every index, tag and intermediate opinion computed along the way.
//! The same handle must be passed to [`Predictor::update`] once the branch
//! is resolved.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, info, trace};

use crate::Outcome;
use crate::branch::OpType;
use crate::config::*;
use crate::counter::SaturatingCounter;
use crate::error::ConfigError;
use crate::history::GlobalHistoryRegister;
use crate::predictor::*;

pub type MetaCounter = SaturatingCounter<USE_CF_MAX>;

/// Identifies the component providing a prediction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    /// The base component
    Base,

    /// A tagged table
    Tagged(usize),
}

/// Container for output from [`Predictor::predict`], including the
/// predicted outcome and everything needed to update the predictor later.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Prediction {
    /// Program counter associated with the branch
    pub pc: u32,

    /// The final predicted direction
    pub outcome: Outcome,

    /// The component providing the main (base/TAGE) prediction
    pub provider: Provider,

    /// Predicted direction from the provider
    pub provider_outcome: Outcome,

    /// The next-longest matching component
    pub alt_provider: Provider,

    /// Predicted direction from the alternate component
    pub alt_outcome: Outcome,

    /// The provider reported high confidence
    pub high_conf: bool,

    /// Entry used in the base component
    pub base: BaseLookup,

    /// Index and tag computed for every tagged table
    pub tagged: [TageLookup; TAGE_TABLE_NUM],

    /// Loop predictor opinion, [None] when the loop predictor is disabled
    pub looped: Option<LoopLookup>,

    /// Corrector opinion, [None] when the corrector is disabled
    pub corrector: Option<CorrectorLookup>,
}
impl Prediction {
    /// The loop predictor overrode every other component.
    pub fn loop_override(&self) -> bool {
        self.looped.map_or(false, |l| l.confident)
    }
}

/// Container for [`Predictor`] runtime stats.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PredictorStats {
    /// Successful allocations
    pub alcs: usize,

    /// Failed allocations
    pub failed_alcs: usize,

    /// Allocations made in each tagged table
    pub comp_alcs: [usize; TAGE_TABLE_NUM],

    /// Misses in the base component
    pub base_miss: usize,

    /// Misses in the tagged components
    pub comp_miss: [usize; TAGE_TABLE_NUM],

    /// Predictions overridden by the loop predictor
    pub loop_overrides: usize,

    /// Predictions taken from the corrector
    pub corrector_overrides: usize,

    /// Number of 'useful' counter resets
    pub resets: usize,

    /// Number of updates
    pub clk: usize,
}

/// The TAGE-SC-L predictor.
///
/// The generator used to pick allocation targets is a type parameter so
/// that tests can drive it with a fixed sequence.
#[derive(Clone, Debug)]
pub struct Predictor<R = StdRng> {
    /// The configuration used to create this object
    cfg: PredictorConfig,

    ghr: GlobalHistoryRegister,

    /// Base component
    base: BasePredictor,

    /// Tagged components, shortest history first
    comp: [TageTable; TAGE_TABLE_NUM],

    looped: LoopPredictor,

    corrector: CorrectorFilter,

    /// Meta-selector choosing between the corrector and the tagged tables
    use_corrector: MetaCounter,

    /// Counter used to periodically decay all 'useful' counters
    clock: u32,

    rng: R,

    stat: PredictorStats,
}

impl Predictor<StdRng> {
    /// Build a predictor seeded from the configuration.
    pub fn new(cfg: PredictorConfig) -> Result<Self, ConfigError> {
        let rng = StdRng::seed_from_u64(cfg.seed);
        Self::with_rng(cfg, rng)
    }
}

impl Default for Predictor<StdRng> {
    fn default() -> Self {
        let cfg = PredictorConfig::default();
        Self::with_parts(cfg.clone(), StdRng::seed_from_u64(cfg.seed))
    }
}

impl<R: RngCore> Predictor<R> {
    /// Build a predictor drawing allocation decisions from some generator.
    pub fn with_rng(cfg: PredictorConfig, rng: R) -> Result<Self, ConfigError> {
        cfg.validate()?;
        Ok(Self::with_parts(cfg, rng))
    }

    fn with_parts(cfg: PredictorConfig, rng: R) -> Self {
        let comp = std::array::from_fn(|i| TageTable::new(cfg.history_lengths[i]));
        Self {
            ghr: GlobalHistoryRegister::new(GHR_BITS),
            base: BasePredictor::new(),
            comp,
            looped: LoopPredictor::new(),
            corrector: CorrectorFilter::new(),
            use_corrector: MetaCounter::new(USE_CF_INIT),
            clock: 0,
            rng,
            stat: PredictorStats::default(),
            cfg,
        }
    }

    /// Make a prediction for the branch at some program counter.
    ///
    /// This never changes the state of the predictor.
    pub fn predict(&self, pc: u32) -> Prediction {
        // The base component provides the default predicted outcome
        // for cases where we miss in all tagged components
        let base = self.base.predict(pc);
        let tagged: [TageLookup; TAGE_TABLE_NUM] =
            std::array::from_fn(|i| self.comp[i].lookup(pc, &self.ghr));

        let mut provider = Provider::Base;
        let mut provider_outcome = base.outcome;
        let mut alt_provider = Provider::Base;
        let mut alt_outcome = base.outcome;

        // Find the longest-history tagged table with a match; the previous
        // match becomes the alternate
        for (idx, lookup) in tagged.iter().enumerate() {
            if lookup.hit {
                alt_provider = provider;
                alt_outcome = provider_outcome;
                provider = Provider::Tagged(idx);
                provider_outcome = self.comp[idx].predict(lookup);
            }
        }

        let high_conf = match provider {
            Provider::Base => base.high_conf,
            Provider::Tagged(idx) => self.comp[idx].high_conf(&tagged[idx]),
        };

        let corrector = self.cfg.corrector_enabled.then(|| {
            self.corrector.predict(pc, provider_outcome, high_conf)
        });
        let looped = self.cfg.loop_enabled.then(|| self.looped.predict(pc));

        let outcome = match (looped, corrector) {
            (Some(l), _) if l.confident => l.outcome,
            (_, Some(c)) if self.use_corrector.get() > USE_CF_THRESHOLD => c.outcome,
            _ => provider_outcome,
        };

        Prediction {
            pc,
            outcome,
            provider,
            provider_outcome,
            alt_provider,
            alt_outcome,
            high_conf,
            base,
            tagged,
            looped,
            corrector,
        }
    }

    /// Given the handle returned by [`Predictor::predict`] and the resolved
    /// outcome, update the state of the predictor.
    ///
    /// The branch target is accepted for interface compatibility and is not
    /// used by any component.
    pub fn update(&mut self,
        prediction: &Prediction,
        outcome: Outcome,
        predicted: Outcome,
        _target: u32,
    )
    {
        let p = prediction;

        if let Some(l) = p.looped {
            self.looped.update(&l, outcome, p.provider_outcome);
            if l.confident {
                self.stat.loop_overrides += 1;
            }
        }

        // Update the entry in the component that provided the prediction
        match p.provider {
            Provider::Base => {
                self.base.update(&p.base, outcome);
                if p.provider_outcome != outcome {
                    self.stat.base_miss += 1;
                }
            },
            Provider::Tagged(idx) => {
                self.comp[idx].update_hit(&p.tagged[idx], outcome);
                if p.provider_outcome != outcome {
                    self.stat.comp_miss[idx] += 1;
                }
            },
        }

        // Try to allocate a new entry in some table with longer history
        let longest = Provider::Tagged(TAGE_TABLE_NUM - 1);
        if p.provider_outcome != outcome && p.provider != longest {
            self.allocate(p, outcome);
        }

        // The provider only earns (or loses) usefulness when it disagreed
        // with the alternate prediction
        if let Provider::Tagged(idx) = p.provider {
            if p.alt_outcome != p.provider_outcome {
                self.comp[idx].update_useful(&p.tagged[idx], outcome, p.provider_outcome);
            }
        }

        self.tick();

        if let Some(c) = p.corrector {
            self.corrector.update(&c, p.provider_outcome, outcome, p.high_conf);
            if c.outcome != p.provider_outcome {
                if c.outcome == outcome {
                    self.use_corrector.increment();
                } else {
                    self.use_corrector.decrement();
                }
                trace!(pc = p.pc, use_corrector = self.use_corrector.get(),
                    "meta-selector updated");
            }
            if c.outcome == predicted && c.outcome != p.provider_outcome {
                self.stat.corrector_overrides += 1;
            }
        }

        self.ghr.push(outcome);
        self.stat.clk += 1;
    }

    /// Hook for instructions other than conditional branches.
    pub fn track_other_inst(&mut self, _pc: u32, _op: OpType, _target: u32) {}

    /// Allocate an entry in one of the tables with longer history than the
    /// provider of a misprediction.
    fn allocate(&mut self, p: &Prediction, outcome: Outcome) {
        let first = match p.provider {
            Provider::Base => 0,
            Provider::Tagged(idx) => idx + 1,
        };

        // A table is only eligible when the entry associated with this
        // branch has its 'useful' bits set to zero
        let candidates: Vec<usize> = (first..TAGE_TABLE_NUM)
            .filter(|&idx| self.comp[idx].useful(&p.tagged[idx]) == 0)
            .collect();

        if candidates.is_empty() {
            debug!(pc = p.pc, first, "allocation failed, aging entries");
            for idx in first..TAGE_TABLE_NUM {
                self.comp[idx].update_miss(&p.tagged[idx]);
            }
            self.stat.failed_alcs += 1;
            return;
        }

        let idx = choose_candidate(&candidates, &mut self.rng);
        debug!(pc = p.pc, table = idx, ?candidates, "allocating entry");
        self.comp[idx].allocate(&p.tagged[idx], outcome);
        self.stat.alcs += 1;
        self.stat.comp_alcs[idx] += 1;
    }

    /// Advance the clock, periodically decaying all 'useful' counters in
    /// two phases.
    fn tick(&mut self) {
        self.clock += 1;
        if self.clock == self.cfg.useful_reset.low_period {
            info!(clk = self.stat.clk, "clearing low 'useful' bits");
            for comp in self.comp.iter_mut() {
                comp.reset_useful(0b10);
            }
            self.stat.resets += 1;
        }
        if self.clock == self.cfg.useful_reset.high_period {
            info!(clk = self.stat.clk, "clearing high 'useful' bits");
            for comp in self.comp.iter_mut() {
                comp.reset_useful(0b01);
            }
            self.clock = 0;
            self.stat.resets += 1;
        }
    }
}

/// Accessors for inspecting the state of a [`Predictor`].
impl<R> Predictor<R> {
    pub fn config(&self) -> &PredictorConfig { &self.cfg }
    pub fn ghr(&self) -> &GlobalHistoryRegister { &self.ghr }
    pub fn base(&self) -> &BasePredictor { &self.base }
    pub fn tables(&self) -> &[TageTable; TAGE_TABLE_NUM] { &self.comp }
    pub fn loop_predictor(&self) -> &LoopPredictor { &self.looped }
    pub fn corrector(&self) -> &CorrectorFilter { &self.corrector }
    pub fn use_corrector(&self) -> u8 { self.use_corrector.get() }
    pub fn clock(&self) -> u32 { self.clock }
    pub fn stats(&self) -> &PredictorStats { &self.stat }
}

/// Pick one of the allocation candidates (ordered from shortest to longest
/// history).
///
/// With 'n' candidates, a draw is taken modulo `2^n - 1`. The shortest
/// candidate owns half of the range (rounded up), and each longer candidate
/// owns half as much as the one before it.
pub fn choose_candidate(candidates: &[usize], rng: &mut impl RngCore) -> usize {
    assert!(!candidates.is_empty() && candidates.len() < 32);
    let n = candidates.len();
    let total = (1u32 << n) - 1;
    let draw = rng.next_u32() % total;

    // 'draw' lies in [2^i - 1, 2^(i+1) - 1) for exactly one 'i'
    let i = (draw + 1).ilog2() as usize;
    candidates[n - 1 - i]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::mock::StepRng;

    fn predictor() -> Predictor {
        Predictor::new(PredictorConfig::default()).unwrap()
    }

    /// Make an entry in some table match the branch at 'pc' under the
    /// current history, with the given counter value.
    fn plant<R: RngCore>(p: &mut Predictor<R>, table: usize, pc: u32, ctr: u8) {
        let l = p.comp[table].lookup(pc, &p.ghr);
        let entry = p.comp[table].get_entry_mut(l.idx);
        entry.tag = l.tag;
        entry.ctr.set(ctr);
    }

    #[test]
    fn fresh_predictor_falls_back_to_base() {
        let p = predictor();
        let pred = p.predict(100);
        assert_eq!(pred.provider, Provider::Base);
        assert_eq!(pred.alt_provider, Provider::Base);
        assert!(pred.tagged.iter().all(|l| !l.hit));
        assert_eq!(pred.provider_outcome, Outcome::T);
        assert!(!pred.high_conf);
        assert_eq!(pred.outcome, Outcome::T);
    }

    #[test]
    fn first_update_trains_base_and_history() {
        let mut p = predictor();
        let pred = p.predict(100);
        p.update(&pred, Outcome::N, pred.outcome, 0);

        assert_eq!(p.base().get_entry(100).get(), 1);
        assert!(p.ghr().low_bits(1) == 0);
        assert_eq!(p.stats().base_miss, 1);

        // The misprediction allocated exactly one entry
        assert_eq!(p.stats().alcs, 1);
        let allocated: usize = p.tables().iter().zip(pred.tagged.iter())
            .filter(|(t, l)| t.get_entry(l.idx).tag == l.tag)
            .count();
        assert_eq!(allocated, 1);
    }

    #[test]
    fn longest_history_match_provides() {
        let mut p = predictor();
        plant(&mut p, 1, 100, 0);
        plant(&mut p, 3, 100, 7);

        let pred = p.predict(100);
        assert_eq!(pred.provider, Provider::Tagged(3));
        assert_eq!(pred.provider_outcome, Outcome::T);
        assert_eq!(pred.alt_provider, Provider::Tagged(1));
        assert_eq!(pred.alt_outcome, Outcome::N);
        assert!(pred.high_conf);
    }

    #[test]
    fn predict_is_pure() {
        let mut p = predictor();
        for i in 0..200u32 {
            let pred = p.predict(i % 7);
            p.update(&pred, Outcome::from(i % 3 == 0), pred.outcome, 0);
        }
        let before = p.clone();
        let a = p.predict(3);
        let b = p.predict(3);
        assert_eq!(a, b);
        assert_eq!(p.comp, before.comp);
        assert_eq!(p.base, before.base);
        assert_eq!(p.looped, before.looped);
        assert_eq!(p.corrector, before.corrector);
        assert_eq!(p.ghr, before.ghr);
    }

    #[test]
    fn confident_loop_overrides_everything() {
        let mut p = predictor();
        plant(&mut p, 3, 100, 7);

        // A trusted loop entry at its trip count predicts the exit
        let idx = p.looped.get_index(100);
        let e = p.looped.get_entry_mut(idx);
        e.tag = 0;
        e.confidence.set(LOOP_CONF_MAX);
        e.past_iter = 4;
        e.current_iter = 4;

        let pred = p.predict(100);
        assert_eq!(pred.provider_outcome, Outcome::T);
        assert!(pred.loop_override());
        assert_eq!(pred.outcome, Outcome::N);
    }

    #[test]
    fn loop_override_counted_regardless_of_reported_prediction() {
        let mut p = predictor();
        let idx = p.looped.get_index(100);
        let e = p.looped.get_entry_mut(idx);
        e.tag = 0;
        e.confidence.set(LOOP_CONF_MAX);
        e.past_iter = 4;
        e.current_iter = 4;

        let pred = p.predict(100);
        assert!(pred.loop_override());
        // The harness reports some other predicted direction
        p.update(&pred, Outcome::N, !pred.outcome, 0);
        assert_eq!(p.stats().loop_overrides, 1);
    }

    #[test]
    fn meta_selector_picks_corrector_or_tage() {
        let mut p = predictor();
        // Make the corrector disagree with the base prediction
        let c = p.corrector.predict(100, Outcome::T, false);
        let slot = c.slot.unwrap();
        let entry = p.corrector.get_entry_mut(slot.idx);
        entry.tag = slot.tag;
        entry.ctr.set(0);

        p.use_corrector.set(USE_CF_THRESHOLD + 1);
        assert_eq!(p.predict(100).outcome, Outcome::N);
        p.use_corrector.set(USE_CF_THRESHOLD);
        assert_eq!(p.predict(100).outcome, Outcome::T);
    }

    #[rstest::rstest]
    #[case(Outcome::N, USE_CF_INIT + 1)]
    #[case(Outcome::T, USE_CF_INIT - 1)]
    fn meta_selector_tracks_corrector_accuracy(
        #[case] resolved: Outcome,
        #[case] expected: u8,
    ) {
        let mut p = predictor();
        let c = p.corrector.predict(100, Outcome::T, false);
        let slot = c.slot.unwrap();
        let entry = p.corrector.get_entry_mut(slot.idx);
        entry.tag = slot.tag;
        entry.ctr.set(0);

        let pred = p.predict(100);
        assert_eq!(pred.provider_outcome, Outcome::T);
        assert_eq!(pred.corrector.unwrap().outcome, Outcome::N);
        p.update(&pred, resolved, pred.outcome, 0);
        assert_eq!(p.use_corrector(), expected);
    }

    #[test]
    fn meta_selector_ignores_agreement() {
        let mut p = predictor();
        let pred = p.predict(100);
        assert_eq!(pred.corrector.unwrap().outcome, pred.provider_outcome);
        p.update(&pred, Outcome::N, pred.outcome, 0);
        assert_eq!(p.use_corrector(), USE_CF_INIT);
    }

    #[test]
    fn no_allocation_on_correct_prediction() {
        let mut p = predictor();
        let before = p.comp.clone();
        let pred = p.predict(100);
        p.update(&pred, Outcome::T, pred.outcome, 0);
        assert_eq!(p.comp, before);
        assert_eq!(p.stats().alcs + p.stats().failed_alcs, 0);
    }

    #[test]
    fn no_allocation_from_longest_table() {
        let mut p = predictor();
        plant(&mut p, 3, 100, 7);
        let pred = p.predict(100);
        assert_eq!(pred.provider, Provider::Tagged(3));

        let mut before = p.comp.clone();
        p.update(&pred, Outcome::N, pred.outcome, 0);
        assert_eq!(p.stats().alcs + p.stats().failed_alcs, 0);

        // Only the provider counter moved
        let l = pred.tagged[3];
        before[3].get_entry_mut(l.idx).ctr.set(6);
        assert_eq!(p.comp, before);
    }

    #[test]
    fn failed_allocation_ages_longer_tables() {
        let mut p = predictor();
        plant(&mut p, 1, 100, 0);
        let pred = p.predict(100);
        assert_eq!(pred.provider, Provider::Tagged(1));
        for idx in 2..TAGE_TABLE_NUM {
            let l = pred.tagged[idx];
            p.comp[idx].get_entry_mut(l.idx).useful.set(2);
        }

        p.update(&pred, Outcome::T, pred.outcome, 0);
        assert_eq!(p.stats().failed_alcs, 1);
        for idx in 2..TAGE_TABLE_NUM {
            assert_eq!(p.comp[idx].useful(&pred.tagged[idx]), 1);
        }
        // Tables with shorter history are left alone
        assert_eq!(p.comp[0].useful(&pred.tagged[0]), 0);
    }

    #[test]
    fn allocation_skips_useful_entries() {
        let mut p = Predictor::with_rng(PredictorConfig::default(), StepRng::new(0, 1))
            .unwrap();
        let pred = p.predict(100);
        for idx in 0..3 {
            let l = pred.tagged[idx];
            p.comp[idx].get_entry_mut(l.idx).useful.set(1);
        }
        p.update(&pred, Outcome::N, pred.outcome, 0);
        assert_eq!(p.stats().comp_alcs, [0, 0, 0, 1]);
        let l = pred.tagged[3];
        let entry = p.comp[3].get_entry(l.idx);
        assert_eq!(entry.tag, l.tag);
        assert_eq!(entry.ctr.get(), TAGE_WEAK_CORRECT - 1);
    }

    #[test]
    fn useful_updated_only_on_disagreement() {
        let mut p = predictor();
        // Table 2 predicts not-taken, the alternate (base) predicts taken
        plant(&mut p, 2, 100, 0);
        let pred = p.predict(100);
        assert_eq!(pred.alt_outcome, Outcome::T);
        p.update(&pred, Outcome::N, pred.outcome, 0);
        assert_eq!(p.comp[2].useful(&pred.tagged[2]), 1);

        // Table 2 agrees with the alternate
        let mut p = predictor();
        plant(&mut p, 2, 100, 7);
        let pred = p.predict(100);
        assert_eq!(pred.alt_outcome, pred.provider_outcome);
        p.update(&pred, Outcome::T, pred.outcome, 0);
        assert_eq!(p.comp[2].useful(&pred.tagged[2]), 0);
    }

    #[test]
    fn choose_candidate_weighting() {
        let mut rng = StepRng::new(0, 1);
        let candidates = [1, 2, 3];
        let mut counts = [0usize; TAGE_TABLE_NUM];
        for _ in 0..7000 {
            counts[choose_candidate(&candidates, &mut rng)] += 1;
        }
        assert_eq!(counts, [0, 4000, 2000, 1000]);
    }

    #[test]
    fn choose_single_candidate() {
        let mut rng = StepRng::new(12345, 7);
        for _ in 0..10 {
            assert_eq!(choose_candidate(&[2], &mut rng), 2);
        }
    }

    #[test]
    fn periodic_decay() {
        let cfg = PredictorConfig {
            useful_reset: UsefulResetConfig { low_period: 4, high_period: 8 },
            ..Default::default()
        };
        let mut p = Predictor::new(cfg).unwrap();
        for comp in p.comp.iter_mut() {
            for idx in 0..comp.size() {
                comp.get_entry_mut(idx).useful.set(3);
            }
        }

        let run = |p: &mut Predictor, n: usize| {
            for _ in 0..n {
                let pred = p.predict(100);
                p.update(&pred, Outcome::T, pred.outcome, 0);
            }
        };

        run(&mut p, 3);
        assert!(p.comp.iter().all(|c| c.entries().iter().all(|e| e.useful.get() == 3)));
        run(&mut p, 1);
        assert_eq!(p.clock(), 4);
        assert!(p.comp.iter().all(|c| c.entries().iter().all(|e| e.useful.get() == 2)));
        run(&mut p, 4);
        assert_eq!(p.clock(), 0);
        assert!(p.comp.iter().all(|c| c.num_useful_entries() == 0));
        assert_eq!(p.stats().resets, 2);
    }

    #[test]
    fn disabled_components_are_skipped() {
        let cfg = PredictorConfig {
            loop_enabled: false,
            corrector_enabled: false,
            ..Default::default()
        };
        let mut p = Predictor::new(cfg).unwrap();
        let pred = p.predict(100);
        assert_eq!(pred.looped, None);
        assert_eq!(pred.corrector, None);
        assert_eq!(pred.outcome, pred.provider_outcome);

        p.update(&pred, Outcome::N, pred.outcome, 0);
        assert_eq!(p.looped, LoopPredictor::new());
        assert_eq!(p.corrector, CorrectorFilter::new());
        assert_eq!(p.use_corrector(), USE_CF_INIT);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = PredictorConfig {
            history_lengths: [5, 16, 37, 200],
            ..Default::default()
        };
        assert!(Predictor::new(cfg).is_err());
    }
}
