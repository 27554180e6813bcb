//! Backtesting and random-search tuning of an EMA crossover strategy with
//! RSI confirmation.
//!
//! Pipeline: [`indicators`] → [`signals`] → [`evaluator`], driven repeatedly by
//! [`optimizer::optimize`] over any [`strategy::Strategy`].

pub mod bars;
pub mod error;
pub mod evaluator;
pub mod indicators;
pub mod logging;
pub mod optimizer;
pub mod params;
pub mod presets;
pub mod report;
pub mod signals;
pub mod strategy;

pub use bars::{Bar, BarSeries, BarSource, CsvBarSource, MemoizedBarSource, load_bars_from_csv};
pub use error::{Result, StrategyError};
pub use evaluator::{Evaluation, MetricKind, Metrics, TraceRow};
pub use indicators::IndicatorSeries;
pub use optimizer::{OptimizationResult, OptimizeOptions, WeightVector, optimize};
pub use params::{ParamRange, ParamSpec, ParameterSet};
pub use presets::{Lookback, Preset, builtin_presets};
pub use signals::{Position, Signal, SignalSeries};
pub use strategy::{MomentumStrategy, Strategy};
