//! Turns a signal series into strategy returns and summary metrics.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::bars::BarSeries;
use crate::error::{Result, StrategyError};
use crate::indicators::IndicatorSeries;
use crate::signals::{Position, SignalSeries};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    TotalReturn,
    WinRate,
    MaxDrawdown,
}

impl MetricKind {
    pub const ALL: [MetricKind; 3] = [
        MetricKind::TotalReturn,
        MetricKind::WinRate,
        MetricKind::MaxDrawdown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetricKind::TotalReturn => "total_return",
            MetricKind::WinRate => "win_rate",
            MetricKind::MaxDrawdown => "max_drawdown",
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricKind {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self> {
        MetricKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s.trim())
            .ok_or_else(|| StrategyError::InvalidWeights(format!("unknown metric: {s}")))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Additive sum of per-bar strategy returns.
    pub total_return: f64,
    /// Share of bars with a strictly positive strategy return.
    pub win_rate: f64,
    /// Most negative drawdown of the cumulative return curve, 0 when none.
    pub max_drawdown: f64,
}

impl Metrics {
    pub fn value(&self, kind: MetricKind) -> f64 {
        match kind {
            MetricKind::TotalReturn => self.total_return,
            MetricKind::WinRate => self.win_rate,
            MetricKind::MaxDrawdown => self.max_drawdown,
        }
    }

    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        MetricKind::ALL
            .into_iter()
            .map(|k| (k.as_str(), self.value(k)))
            .collect()
    }
}

/// One row of the annotated series handed to charting.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TraceRow {
    pub ts: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub short_ema: f64,
    pub long_ema: f64,
    pub rsi: Option<f64>,
    pub signal: i8,
    pub position: Position,
    pub strategy_return: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    pub metrics: Metrics,
    pub trace: Vec<TraceRow>,
}

/// Per-bar strategy returns. Bar 0 has no defined return and is reported as
/// 0.0; the position held through bar `i` is the one set at bar `i - 1`.
pub fn strategy_returns(bars: &BarSeries, signals: &SignalSeries) -> Result<Vec<f64>> {
    let n = bars.len();
    if n < 2 {
        return Err(StrategyError::EmptySeries { got: n });
    }
    if signals.len() != n {
        return Err(StrategyError::LengthMismatch {
            what: "signals",
            expected: n,
            got: signals.len(),
        });
    }

    let b = bars.bars();
    let mut out = Vec::with_capacity(n);
    out.push(0.0);
    for i in 1..n {
        let held = signals.points[i - 1].position == Position::Long;
        out.push(if held {
            (b[i].close - b[i - 1].close) / b[i - 1].close
        } else {
            0.0
        });
    }
    Ok(out)
}

pub fn compute_metrics(returns: &[f64]) -> Metrics {
    let defined = returns.get(1..).unwrap_or(&[]);
    let total_return: f64 = defined.iter().sum();
    let win_rate = if defined.is_empty() {
        0.0
    } else {
        defined.iter().filter(|r| **r > 0.0).count() as f64 / defined.len() as f64
    };

    Metrics {
        total_return,
        win_rate,
        max_drawdown: calc_max_drawdown(returns),
    }
}

/// Drawdown of `1 + cumsum(returns)` against its running peak, as a
/// non-positive fraction.
pub fn calc_max_drawdown(returns: &[f64]) -> f64 {
    if returns.len() <= 1 {
        return 0.0;
    }
    let mut equity = 1.0;
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &r in returns {
        equity += r;
        if equity > peak {
            peak = equity;
        }
        if peak != 0.0 {
            max_dd = max_dd.min((equity - peak) / peak);
        }
    }
    max_dd
}

pub fn evaluate(
    bars: &BarSeries,
    indicators: &IndicatorSeries,
    signals: &SignalSeries,
) -> Result<Evaluation> {
    let returns = strategy_returns(bars, signals)?;
    indicators.check_len(bars.len())?;
    let metrics = compute_metrics(&returns);

    let trace = bars
        .bars()
        .iter()
        .enumerate()
        .map(|(i, b)| TraceRow {
            ts: b.ts,
            open: b.open,
            high: b.high,
            low: b.low,
            close: b.close,
            short_ema: indicators.short_ema[i],
            long_ema: indicators.long_ema[i],
            rsi: indicators.rsi[i],
            signal: signals.points[i].signal.as_i8(),
            position: signals.points[i].position,
            strategy_return: returns[i],
        })
        .collect();

    Ok(Evaluation { metrics, trace })
}
