//! Seeded random search over a strategy's parameter space.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{Result, StrategyError};
use crate::evaluator::{MetricKind, Metrics};
use crate::strategy::Strategy;

/// Signed weight per metric. Metrics without a weight contribute nothing.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightVector(BTreeMap<MetricKind, f64>);

impl WeightVector {
    pub fn new(weights: BTreeMap<MetricKind, f64>) -> Self {
        Self(weights)
    }

    /// Everything on total return.
    pub fn total_return_only() -> Self {
        Self::new(BTreeMap::from([
            (MetricKind::TotalReturn, 1.0),
            (MetricKind::WinRate, 0.0),
            (MetricKind::MaxDrawdown, 0.0),
        ]))
    }

    /// Parses `name=value` pairs such as `total_return=1`.
    pub fn parse_pairs<S: AsRef<str>>(pairs: &[S]) -> Result<Self> {
        let mut out = BTreeMap::new();
        for pair in pairs {
            let pair = pair.as_ref();
            let (name, value) = pair.split_once('=').ok_or_else(|| {
                StrategyError::InvalidWeights(format!("expected NAME=VALUE, got {pair}"))
            })?;
            let kind: MetricKind = name.parse()?;
            let w = value.trim().parse::<f64>().map_err(|_| {
                StrategyError::InvalidWeights(format!("bad weight for {name}: {value}"))
            })?;
            out.insert(kind, w);
        }
        Ok(Self(out))
    }

    pub fn get(&self, kind: MetricKind) -> Option<f64> {
        self.0.get(&kind).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MetricKind, f64)> + '_ {
        self.0.iter().map(|(k, w)| (*k, *w))
    }

    pub fn validate(&self) -> Result<()> {
        if self.0.is_empty() {
            return Err(StrategyError::InvalidWeights(
                "weight vector is empty".to_string(),
            ));
        }
        if let Some((k, w)) = self.iter().find(|(_, w)| !w.is_finite()) {
            return Err(StrategyError::InvalidWeights(format!(
                "weight for {k} is not finite: {w}"
            )));
        }
        Ok(())
    }

    pub fn score(&self, metrics: &Metrics) -> f64 {
        self.iter().map(|(k, w)| metrics.value(k) * w).sum()
    }
}

#[derive(Clone, Debug)]
pub struct OptimizeOptions {
    pub iterations: usize,
    pub seed: u64,
    /// Checked between trials; the first trial always runs.
    pub time_budget: Option<Duration>,
}

impl OptimizeOptions {
    pub fn new(iterations: usize, seed: u64) -> Self {
        Self {
            iterations,
            seed,
            time_budget: None,
        }
    }

    pub fn with_time_budget(mut self, budget: Duration) -> Self {
        self.time_budget = Some(budget);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OptimizationResult<P> {
    pub params: P,
    pub metrics: Metrics,
    pub score: f64,
    pub trials_run: usize,
    pub stopped_early: bool,
}

/// Samples `options.iterations` parameter sets from one seeded generator and
/// keeps the highest weighted score. Ties keep the earlier trial.
pub fn optimize<S: Strategy>(
    strategy: &S,
    weights: &WeightVector,
    options: &OptimizeOptions,
) -> Result<OptimizationResult<S::Params>> {
    weights.validate()?;
    if options.iterations < 1 {
        return Err(StrategyError::InvalidIterations(options.iterations));
    }

    let mut rng = StdRng::seed_from_u64(options.seed);
    let started = Instant::now();
    let mut best: Option<OptimizationResult<S::Params>> = None;
    let mut trials_run = 0_usize;
    let mut stopped_early = false;

    for trial in 1..=options.iterations {
        if trial > 1 && options.time_budget.is_some_and(|b| started.elapsed() >= b) {
            warn!(
                trials_run,
                iterations = options.iterations,
                "time budget exhausted, stopping early"
            );
            stopped_early = true;
            break;
        }

        let params = strategy.sample_params(&mut rng)?;
        let metrics = strategy.evaluate(&params)?.metrics;
        let score = weights.score(&metrics);
        trials_run += 1;

        debug!(
            trial,
            score,
            total_return = metrics.total_return,
            win_rate = metrics.win_rate,
            max_drawdown = metrics.max_drawdown,
            params = ?params,
            "trial evaluated"
        );

        if best.as_ref().map(|b| score > b.score).unwrap_or(true) {
            info!(trial, score, params = ?params, "new best");
            best = Some(OptimizationResult {
                params,
                metrics,
                score,
                trials_run,
                stopped_early: false,
            });
        }
    }

    let mut best = best.ok_or(StrategyError::InvalidIterations(0))?;
    best.trials_run = trials_run;
    best.stopped_early = stopped_early;

    info!(
        trials_run,
        score = best.score,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "optimization finished"
    );
    Ok(best)
}
