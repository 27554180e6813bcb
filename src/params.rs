//! Strategy parameters and the declared search space.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StrategyError};

/// Integer range, inclusive low and exclusive high.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamRange {
    pub low: i64,
    pub high: i64,
}

impl ParamRange {
    pub const fn new(low: i64, high: i64) -> Self {
        Self { low, high }
    }

    pub fn contains(&self, v: i64) -> bool {
        v >= self.low && v < self.high
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> i64 {
        rng.random_range(self.low..self.high)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ParamSpec {
    pub name: &'static str,
    pub range: ParamRange,
}

pub const SHORT_EMA_WINDOW: ParamRange = ParamRange::new(5, 51);
pub const LONG_EMA_WINDOW: ParamRange = ParamRange::new(30, 101);
pub const RSI_WINDOW: ParamRange = ParamRange::new(14, 31);
pub const RSI_BUY_THRESHOLD: ParamRange = ParamRange::new(30, 51);
pub const RSI_SELL_THRESHOLD: ParamRange = ParamRange::new(50, 71);

/// Canonical search space in sampling order.
pub fn param_specs() -> Vec<ParamSpec> {
    vec![
        ParamSpec {
            name: "short_ema_window",
            range: SHORT_EMA_WINDOW,
        },
        ParamSpec {
            name: "long_ema_window",
            range: LONG_EMA_WINDOW,
        },
        ParamSpec {
            name: "rsi_window",
            range: RSI_WINDOW,
        },
        ParamSpec {
            name: "rsi_buy_threshold",
            range: RSI_BUY_THRESHOLD,
        },
        ParamSpec {
            name: "rsi_sell_threshold",
            range: RSI_SELL_THRESHOLD,
        },
    ]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterSet {
    pub short_ema_window: i64,
    pub long_ema_window: i64,
    pub rsi_window: i64,
    pub rsi_buy_threshold: i64,
    pub rsi_sell_threshold: i64,
}

impl Default for ParameterSet {
    fn default() -> Self {
        Self {
            short_ema_window: 12,
            long_ema_window: 50,
            rsi_window: 14,
            rsi_buy_threshold: 40,
            rsi_sell_threshold: 60,
        }
    }
}

impl ParameterSet {
    pub fn get(&self, name: &str) -> Option<i64> {
        match name {
            "short_ema_window" => Some(self.short_ema_window),
            "long_ema_window" => Some(self.long_ema_window),
            "rsi_window" => Some(self.rsi_window),
            "rsi_buy_threshold" => Some(self.rsi_buy_threshold),
            "rsi_sell_threshold" => Some(self.rsi_sell_threshold),
            _ => None,
        }
    }

    pub fn set(&mut self, name: &str, value: i64) -> Result<()> {
        let slot = match name {
            "short_ema_window" => &mut self.short_ema_window,
            "long_ema_window" => &mut self.long_ema_window,
            "rsi_window" => &mut self.rsi_window,
            "rsi_buy_threshold" => &mut self.rsi_buy_threshold,
            "rsi_sell_threshold" => &mut self.rsi_sell_threshold,
            _ => {
                return Err(StrategyError::InvalidParameters(format!(
                    "unknown parameter: {name}"
                )));
            }
        };
        *slot = value;
        Ok(())
    }

    /// Checks every parameter against its canonical range, then that the
    /// short window is below the long window.
    pub fn validate(&self) -> Result<()> {
        for spec in param_specs() {
            let v = self.get(spec.name).unwrap_or_default();
            if !spec.range.contains(v) {
                return Err(StrategyError::InvalidParameters(format!(
                    "{} must be within [{}, {}), got {v}",
                    spec.name, spec.range.low, spec.range.high
                )));
            }
        }
        if self.short_ema_window >= self.long_ema_window {
            return Err(StrategyError::InvalidParameters(format!(
                "short_ema_window ({}) must be < long_ema_window ({})",
                self.short_ema_window, self.long_ema_window
            )));
        }
        Ok(())
    }

    /// One uniform draw per spec, in the order given. Parameters without a
    /// spec keep their default. The result may still be inconsistent
    /// (short window >= long window).
    pub fn draw<R: Rng + ?Sized>(specs: &[ParamSpec], rng: &mut R) -> Result<Self> {
        let mut p = Self::default();
        for spec in specs {
            if spec.range.low >= spec.range.high {
                return Err(StrategyError::InvalidParameters(format!(
                    "empty range for {}: [{}, {})",
                    spec.name, spec.range.low, spec.range.high
                )));
            }
            p.set(spec.name, spec.range.sample(rng))?;
        }
        Ok(p)
    }

    pub fn in_canonical_ranges(&self) -> bool {
        param_specs()
            .iter()
            .all(|spec| self.get(spec.name).is_some_and(|v| spec.range.contains(v)))
    }
}
