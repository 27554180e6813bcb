//! The capability interface the optimizer searches over, and the EMA/RSI
//! momentum strategy that implements it.

use std::fmt;

use rand::Rng;
use serde::Serialize;

use crate::bars::BarSeries;
use crate::error::{Result, StrategyError};
use crate::evaluator::{self, Evaluation};
use crate::indicators;
use crate::params::{ParamSpec, ParameterSet, param_specs};
use crate::signals::{self, SignalSeries};

const MAX_SAMPLE_ATTEMPTS: usize = 1000;

pub trait Strategy {
    type Params: Clone + fmt::Debug + Serialize;

    fn parameter_ranges(&self) -> Vec<ParamSpec>;

    /// Draws one valid parameter set from `parameter_ranges`.
    fn sample_params<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Self::Params>;

    fn generate_signals(&self, params: &Self::Params) -> Result<SignalSeries>;

    fn evaluate(&self, params: &Self::Params) -> Result<Evaluation>;
}

#[derive(Clone, Debug)]
pub struct MomentumStrategy {
    bars: BarSeries,
    specs: Vec<ParamSpec>,
}

impl MomentumStrategy {
    pub fn new(bars: BarSeries) -> Self {
        Self::with_param_specs(bars, param_specs())
    }

    /// Searches a narrower space. Draws outside the canonical ranges still
    /// fail validation.
    pub fn with_param_specs(bars: BarSeries, specs: Vec<ParamSpec>) -> Self {
        Self { bars, specs }
    }

    pub fn bars(&self) -> &BarSeries {
        &self.bars
    }
}

impl Strategy for MomentumStrategy {
    type Params = ParameterSet;

    fn parameter_ranges(&self) -> Vec<ParamSpec> {
        self.specs.clone()
    }

    fn sample_params<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<ParameterSet> {
        let specs = self.parameter_ranges();
        for _ in 0..MAX_SAMPLE_ATTEMPTS {
            let p = ParameterSet::draw(&specs, rng)?;
            if p.short_ema_window < p.long_ema_window {
                p.validate()?;
                return Ok(p);
            }
        }
        Err(StrategyError::InvalidParameters(format!(
            "no draw with short_ema_window < long_ema_window in {MAX_SAMPLE_ATTEMPTS} attempts"
        )))
    }

    fn generate_signals(&self, params: &ParameterSet) -> Result<SignalSeries> {
        let ind = indicators::compute(&self.bars, params)?;
        signals::generate(&ind, params)
    }

    fn evaluate(&self, params: &ParameterSet) -> Result<Evaluation> {
        let ind = indicators::compute(&self.bars, params)?;
        let sig = signals::generate(&ind, params)?;
        evaluator::evaluate(&self.bars, &ind, &sig)
    }
}
