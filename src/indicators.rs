//! EMA and RSI over closing prices.

use crate::bars::BarSeries;
use crate::error::{Result, StrategyError};
use crate::params::ParameterSet;

pub const MIN_BARS: usize = 2;

/// Per-bar indicator values. `rsi[i]` is `None` where no price change exists yet.
#[derive(Clone, Debug, PartialEq)]
pub struct IndicatorSeries {
    pub short_ema: Vec<f64>,
    pub long_ema: Vec<f64>,
    pub rsi: Vec<Option<f64>>,
}

impl IndicatorSeries {
    pub fn len(&self) -> usize {
        self.short_ema.len()
    }

    pub fn is_empty(&self) -> bool {
        self.short_ema.is_empty()
    }

    /// All three columns must have `expected` values.
    pub fn check_len(&self, expected: usize) -> Result<()> {
        let columns = [
            ("short_ema", self.short_ema.len()),
            ("long_ema", self.long_ema.len()),
            ("rsi", self.rsi.len()),
        ];
        for (what, got) in columns {
            if got != expected {
                return Err(StrategyError::LengthMismatch {
                    what,
                    expected,
                    got,
                });
            }
        }
        Ok(())
    }
}

pub fn compute(bars: &BarSeries, params: &ParameterSet) -> Result<IndicatorSeries> {
    params.validate()?;
    if bars.len() < MIN_BARS {
        return Err(StrategyError::InsufficientData {
            required: MIN_BARS,
            got: bars.len(),
        });
    }

    let closes = bars.closes();
    Ok(IndicatorSeries {
        short_ema: ema(&closes, span_alpha(params.short_ema_window)),
        long_ema: ema(&closes, span_alpha(params.long_ema_window)),
        rsi: rsi(&closes, params.rsi_window),
    })
}

/// Smoothing factor for a span: 2 / (span + 1).
pub fn span_alpha(span: i64) -> f64 {
    2.0 / (span as f64 + 1.0)
}

/// Recursive EMA seeded with the first value, no warm-up gap.
pub fn ema(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &v in values {
        let next = match prev {
            Some(p) => alpha * v + (1.0 - alpha) * p,
            None => v,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}

/// RSI with gains and losses smoothed at alpha = 1 / window.
///
/// RSI = 100 - 100 / (1 + avg_gain / avg_loss), and exactly 100 whenever
/// avg_loss is zero.
pub fn rsi(closes: &[f64], window: i64) -> Vec<Option<f64>> {
    let alpha = 1.0 / window as f64;
    let mut out = Vec::with_capacity(closes.len());
    if closes.is_empty() {
        return out;
    }
    out.push(None);

    let mut avg_gain: Option<f64> = None;
    let mut avg_loss = 0.0;
    for pair in closes.windows(2) {
        let delta = pair[1] - pair[0];
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);
        let (g, l) = match avg_gain {
            Some(g) => (
                alpha * gain + (1.0 - alpha) * g,
                alpha * loss + (1.0 - alpha) * avg_loss,
            ),
            None => (gain, loss),
        };
        avg_gain = Some(g);
        avg_loss = l;
        out.push(Some(rsi_from_averages(g, l)));
    }
    out
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        return 100.0;
    }
    let rs = avg_gain / avg_loss;
    (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
}
