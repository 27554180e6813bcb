//! Flat/long state machine over indicator values.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::indicators::IndicatorSeries;
use crate::params::ParameterSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    pub fn as_i8(self) -> i8 {
        match self {
            Signal::Buy => 1,
            Signal::Sell => -1,
            Signal::Hold => 0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    #[default]
    Flat,
    Long,
}

/// Signal emitted at a bar and the position after applying it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SignalPoint {
    pub signal: Signal,
    pub position: Position,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SignalSeries {
    pub points: Vec<SignalPoint>,
}

impl SignalSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn count(&self, signal: Signal) -> usize {
        self.points.iter().filter(|p| p.signal == signal).count()
    }
}

/// Entry needs short EMA above long EMA and RSI above the buy threshold.
/// Exit needs short EMA below long EMA and RSI below the sell threshold.
/// An undefined RSI satisfies neither.
pub fn generate(indicators: &IndicatorSeries, params: &ParameterSet) -> Result<SignalSeries> {
    indicators.check_len(indicators.short_ema.len())?;

    let buy = params.rsi_buy_threshold as f64;
    let sell = params.rsi_sell_threshold as f64;

    let mut position = Position::Flat;
    let mut points = Vec::with_capacity(indicators.len());
    for i in 0..indicators.len() {
        let short = indicators.short_ema[i];
        let long = indicators.long_ema[i];
        let rsi = indicators.rsi[i];

        let signal = match position {
            Position::Flat if short > long && rsi.is_some_and(|r| r > buy) => {
                position = Position::Long;
                Signal::Buy
            }
            Position::Long if short < long && rsi.is_some_and(|r| r < sell) => {
                position = Position::Flat;
                Signal::Sell
            }
            _ => Signal::Hold,
        };
        points.push(SignalPoint { signal, position });
    }

    Ok(SignalSeries { points })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StrategyError;

    fn series(short: &[f64], long: &[f64], rsi: &[Option<f64>]) -> IndicatorSeries {
        IndicatorSeries {
            short_ema: short.to_vec(),
            long_ema: long.to_vec(),
            rsi: rsi.to_vec(),
        }
    }

    fn params(buy: i64, sell: i64) -> ParameterSet {
        ParameterSet {
            rsi_buy_threshold: buy,
            rsi_sell_threshold: sell,
            ..ParameterSet::default()
        }
    }

    #[test]
    fn test_entry_requires_trend_and_momentum() {
        let ind = series(
            &[2.0, 2.0, 2.0, 2.0],
            &[1.0, 1.0, 3.0, 1.0],
            &[None, Some(20.0), Some(80.0), Some(80.0)],
        );
        let out = generate(&ind, &params(30, 70)).unwrap();
        let signals: Vec<i8> = out.points.iter().map(|p| p.signal.as_i8()).collect();
        assert_eq!(signals, vec![0, 0, 0, 1]);
        assert_eq!(out.points[3].position, Position::Long);
    }

    #[test]
    fn test_exit_requires_both_conditions() {
        let ind = series(
            &[2.0, 1.0, 1.0, 1.0],
            &[1.0, 2.0, 2.0, 2.0],
            &[Some(60.0), Some(80.0), Some(40.0), Some(40.0)],
        );
        let out = generate(&ind, &params(50, 70)).unwrap();
        let signals: Vec<i8> = out.points.iter().map(|p| p.signal.as_i8()).collect();
        // bar 1: trend broke but RSI still high, no exit
        assert_eq!(signals, vec![1, 0, -1, 0]);
        assert_eq!(out.points[1].position, Position::Long);
        assert_eq!(out.points[3].position, Position::Flat);
    }

    #[test]
    fn test_persistent_conditions_do_not_repeat_buy() {
        let ind = series(&[2.0; 5], &[1.0; 5], &[Some(90.0); 5]);
        let out = generate(&ind, &params(30, 70)).unwrap();
        assert_eq!(out.count(Signal::Buy), 1);
        assert!(out.points.iter().all(|p| p.position == Position::Long));
    }

    #[test]
    fn test_ragged_indicators_rejected() {
        let ind = series(&[2.0, 2.0, 2.0], &[1.0, 1.0], &[None, Some(80.0), Some(80.0)]);
        assert_eq!(
            generate(&ind, &params(30, 70)),
            Err(StrategyError::LengthMismatch {
                what: "long_ema",
                expected: 3,
                got: 2
            })
        );
    }

    #[test]
    fn test_positions_alternate() {
        let n = 200;
        let short: Vec<f64> = (0..n).map(|i| (i as f64 / 3.0).sin()).collect();
        let long: Vec<f64> = (0..n).map(|i| (i as f64 / 11.0).sin()).collect();
        let rsi: Vec<Option<f64>> = (0..n)
            .map(|i| Some(50.0 + 45.0 * (i as f64 / 4.0).cos()))
            .collect();
        let out = generate(&series(&short, &long, &rsi), &params(40, 60)).unwrap();

        let mut prev = Position::Flat;
        for p in &out.points {
            match p.signal {
                Signal::Buy => {
                    assert_eq!(prev, Position::Flat);
                    assert_eq!(p.position, Position::Long);
                }
                Signal::Sell => {
                    assert_eq!(prev, Position::Long);
                    assert_eq!(p.position, Position::Flat);
                }
                Signal::Hold => assert_eq!(p.position, prev),
            }
            prev = p.position;
        }
    }
}
