use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Parser;
use tracing::info;

use momentum_optimizer::bars::{BarSource, CsvBarSource, load_bars_from_csv};
use momentum_optimizer::logging::init_logging;
use momentum_optimizer::presets::{builtin_presets, load_presets};
use momentum_optimizer::report::{ReportInput, build_report, write_report, write_trace_csv};
use momentum_optimizer::{MomentumStrategy, OptimizeOptions, Strategy, WeightVector, optimize};

#[derive(Parser, Debug)]
#[command(author, version, about = "Tune an EMA/RSI momentum strategy by seeded random search")]
struct Args {
    #[arg(long, default_value = "XBTUSD")]
    symbol: String,
    /// Single CSV file of bars (time,open,high,low,close).
    #[arg(long, conflicts_with = "data_dir")]
    data_file: Option<PathBuf>,
    /// Directory holding <SYMBOL>_<interval>.csv files; needs --preset.
    #[arg(long, requires = "preset")]
    data_dir: Option<PathBuf>,
    /// Timeframe preset selecting interval, lookback and weights.
    #[arg(long)]
    preset: Option<String>,
    /// JSON file replacing the built-in preset catalog.
    #[arg(long)]
    presets_file: Option<PathBuf>,
    #[arg(long, default_value_t = 100)]
    trials: usize,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    /// Metric weight as NAME=VALUE; repeat for several metrics.
    #[arg(long = "weight")]
    weights: Vec<String>,
    #[arg(long)]
    time_budget_secs: Option<u64>,
    #[arg(long, default_value = "momentum_optimizer_result.json")]
    out: PathBuf,
    #[arg(long)]
    trace_out: Option<PathBuf>,
    #[arg(long)]
    log_json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_json);

    if args.trials == 0 {
        bail!("--trials must be >= 1");
    }

    let catalog = match &args.presets_file {
        Some(p) => load_presets(p)?,
        None => builtin_presets(),
    };
    let preset = match &args.preset {
        Some(name) => Some(catalog.get(name).with_context(|| {
            format!(
                "unknown preset {name}; available: {}",
                catalog.keys().cloned().collect::<Vec<_>>().join(", ")
            )
        })?),
        None => None,
    };
    let since = preset.map(|p| p.lookback.since_timestamp(Utc::now()));

    let (data_source, bars) = match (&args.data_file, &args.data_dir, preset) {
        (Some(file), _, _) => {
            let all = load_bars_from_csv(file)?;
            let bars = match since {
                Some(s) => all.since(s),
                None => all,
            };
            (file.display().to_string(), bars)
        }
        (None, Some(dir), Some(p)) => {
            let source = CsvBarSource::new(dir);
            let bars = source.fetch(&args.symbol, p.interval, since.unwrap_or(0))?;
            (
                source.path_for(&args.symbol, p.interval).display().to_string(),
                bars,
            )
        }
        _ => bail!("either --data-file or --data-dir with --preset is required"),
    };
    if bars.len() < 2 {
        bail!("need at least 2 bars, got {} from {}", bars.len(), data_source);
    }

    let weights = if !args.weights.is_empty() {
        WeightVector::parse_pairs(&args.weights)?
    } else if let Some(p) = preset {
        p.weights.clone()
    } else {
        WeightVector::total_return_only()
    };

    info!(
        symbol = %args.symbol,
        data = %data_source,
        bars = bars.len(),
        trials = args.trials,
        seed = args.seed,
        "starting optimization"
    );

    let mut options = OptimizeOptions::new(args.trials, args.seed);
    if let Some(secs) = args.time_budget_secs {
        options = options.with_time_budget(Duration::from_secs(secs));
    }

    let bar_count = bars.len();
    let strategy = MomentumStrategy::new(bars);
    let best = optimize(&strategy, &weights, &options)?;
    let evaluation = strategy.evaluate(&best.params)?;

    let report = build_report(&ReportInput {
        symbol: &args.symbol,
        data_source: &data_source,
        preset: args.preset.as_deref(),
        bars: bar_count,
        iterations: args.trials,
        seed: args.seed,
        weights: &weights,
        best: &best,
        final_metrics: &evaluation.metrics,
    });
    write_report(&args.out, &report)?;
    println!("Saved result: {}", args.out.display());

    if let Some(trace_out) = &args.trace_out {
        write_trace_csv(trace_out, &evaluation.trace)?;
        println!("Saved trace: {}", trace_out.display());
    }

    println!("Best parameters: {:?}", best.params);
    println!(
        "score={:.4} total_return={:.4} win_rate={:.2}% max_drawdown={:.2}% trials={}/{}",
        best.score,
        evaluation.metrics.total_return,
        evaluation.metrics.win_rate * 100.0,
        evaluation.metrics.max_drawdown * 100.0,
        best.trials_run,
        args.trials,
    );
    if best.stopped_early {
        println!("WARNING: time budget reached before all trials ran.");
    }

    Ok(())
}
