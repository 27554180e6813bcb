//! JSON run report and CSV trace export.

use std::fs;
use std::path::Path;

use anyhow::Context;
use chrono::Utc;
use serde_json::{Value, json};

use crate::evaluator::{Metrics, TraceRow};
use crate::optimizer::{OptimizationResult, WeightVector};
use crate::params::ParameterSet;

pub struct ReportInput<'a> {
    pub symbol: &'a str,
    pub data_source: &'a str,
    pub preset: Option<&'a str>,
    pub bars: usize,
    pub iterations: usize,
    pub seed: u64,
    pub weights: &'a WeightVector,
    pub best: &'a OptimizationResult<ParameterSet>,
    /// Metrics from re-running the chosen parameters over the full series.
    pub final_metrics: &'a Metrics,
}

pub fn build_report(input: &ReportInput<'_>) -> Value {
    json!({
        "objective": format!("maximize weighted metrics on {}", input.symbol),
        "symbol": input.symbol,
        "preset": input.preset,
        "generated_at_utc": Utc::now().to_rfc3339(),
        "data_source": input.data_source,
        "bars": input.bars,
        "iterations": input.iterations,
        "trials_run": input.best.trials_run,
        "stopped_early": input.best.stopped_early,
        "seed": input.seed,
        "algorithm": "seeded uniform random search",
        "weights": input.weights,
        "best": {
            "score": input.best.score,
            "params": input.best.params,
            "metrics": input.best.metrics.to_map(),
        },
        "final_metrics": input.final_metrics.to_map(),
    })
}

pub fn write_report(path: &Path, report: &Value) -> anyhow::Result<()> {
    fs::write(path, serde_json::to_string_pretty(report)?)
        .with_context(|| format!("failed to write {}", path.display()))
}

pub fn write_trace_csv(path: &Path, trace: &[TraceRow]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    for row in trace {
        wtr.serialize(row)?;
    }
    wtr.flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signals::Position;

    fn row(ts: i64, rsi: Option<f64>, position: Position) -> TraceRow {
        TraceRow {
            ts,
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            short_ema: 1.0,
            long_ema: 1.0,
            rsi,
            signal: 0,
            position,
            strategy_return: 0.0,
        }
    }

    #[test]
    fn test_trace_csv_has_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("trace.csv");
        write_trace_csv(&path, &[row(1, None, Position::Flat), row(2, Some(55.5), Position::Long)])
            .unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("ts,open,high,low,close,short_ema,long_ema,rsi,signal"));
        assert!(lines[1].contains(",,0,flat,"));
        assert!(lines[2].contains("55.5"));
        assert!(lines[2].contains("long"));
    }

    #[test]
    fn test_report_fields() {
        let metrics = Metrics {
            total_return: 0.2,
            win_rate: 0.6,
            max_drawdown: -0.05,
        };
        let best = OptimizationResult {
            params: ParameterSet::default(),
            metrics,
            score: 0.2,
            trials_run: 10,
            stopped_early: false,
        };
        let weights = WeightVector::total_return_only();
        let report = build_report(&ReportInput {
            symbol: "XBTUSD",
            data_source: "bars.csv",
            preset: Some("intraday_15m"),
            bars: 500,
            iterations: 10,
            seed: 7,
            weights: &weights,
            best: &best,
            final_metrics: &metrics,
        });
        assert_eq!(report["best"]["params"]["short_ema_window"], 12);
        assert_eq!(report["weights"]["total_return"], 1.0);
        assert_eq!(report["final_metrics"]["win_rate"], 0.6);
        assert_eq!(report["trials_run"], 10);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_report(&path, &report).unwrap();
        let back: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back["symbol"], "XBTUSD");
    }
}
