//! End-to-end checks of indicators → signals → evaluation → search.

use momentum_optimizer::{
    BarSeries, MomentumStrategy, OptimizeOptions, ParameterSet, Position, Signal, Strategy,
    WeightVector, optimize,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn series(closes: &[f64]) -> BarSeries {
    BarSeries::from_closes(closes, 1_700_000_000, 900).expect("valid closes")
}

fn choppy(n: usize) -> BarSeries {
    let closes: Vec<f64> = (0..n)
        .map(|i| {
            let t = i as f64;
            100.0 + 12.0 * (t / 17.0).sin() + 4.0 * (t / 5.0).cos() + 0.04 * t
        })
        .collect();
    series(&closes)
}

fn fixed_params() -> ParameterSet {
    ParameterSet {
        short_ema_window: 5,
        long_ema_window: 30,
        rsi_window: 14,
        rsi_buy_threshold: 30,
        rsi_sell_threshold: 70,
    }
}

#[test]
fn rising_series_buys_once_and_holds() {
    let closes: Vec<f64> = (0..50).map(|i| 100.0 + i as f64).collect();
    let strategy = MomentumStrategy::new(series(&closes));
    let params = fixed_params();

    let signals = strategy.generate_signals(&params).unwrap();
    assert_eq!(signals.points[0].signal, Signal::Hold);
    assert_eq!(signals.points[1].signal, Signal::Buy);
    assert_eq!(signals.count(Signal::Buy), 1);
    assert_eq!(signals.count(Signal::Sell), 0);
    assert!(signals.points[1..].iter().all(|p| p.position == Position::Long));

    let eval = strategy.evaluate(&params).unwrap();
    let expected: f64 = (2..50)
        .map(|i| (closes[i] - closes[i - 1]) / closes[i - 1])
        .sum();
    assert!((eval.metrics.total_return - expected).abs() < 1e-12);
    assert!((eval.metrics.win_rate - 48.0 / 49.0).abs() < 1e-12);
    assert_eq!(eval.metrics.max_drawdown, 0.0);
    assert_eq!(eval.trace.len(), 50);
    assert_eq!(eval.trace[1].strategy_return, 0.0);
}

#[test]
fn flat_series_has_no_activity() {
    let strategy = MomentumStrategy::new(series(&[100.0; 50]));
    let eval = strategy.evaluate(&fixed_params()).unwrap();
    assert_eq!(eval.metrics.total_return, 0.0);
    assert_eq!(eval.metrics.win_rate, 0.0);
    assert_eq!(eval.metrics.max_drawdown, 0.0);
    assert!(eval.trace.iter().all(|r| r.signal == 0));
}

#[test]
fn search_picks_highest_total_return_among_samples() {
    let strategy = MomentumStrategy::new(choppy(600));
    let seed = 2024;
    let result = optimize(
        &strategy,
        &WeightVector::total_return_only(),
        &OptimizeOptions::new(10, seed),
    )
    .unwrap();

    let mut rng = StdRng::seed_from_u64(seed);
    let mut best: Option<(ParameterSet, f64)> = None;
    for _ in 0..10 {
        let p = strategy.sample_params(&mut rng).unwrap();
        let r = strategy.evaluate(&p).unwrap().metrics.total_return;
        if best.map(|(_, b)| r > b).unwrap_or(true) {
            best = Some((p, r));
        }
    }
    let (expected_params, expected_return) = best.unwrap();

    assert_eq!(result.params, expected_params);
    assert_eq!(result.metrics.total_return, expected_return);
    assert_eq!(result.score, expected_return);
    assert_eq!(result.trials_run, 10);
}

#[test]
fn fixed_seed_is_reproducible() {
    let strategy = MomentumStrategy::new(choppy(400));
    let weights =
        WeightVector::parse_pairs(&["total_return=1", "win_rate=0.5", "max_drawdown=0.3"]).unwrap();
    let options = OptimizeOptions::new(40, 99);

    let a = optimize(&strategy, &weights, &options).unwrap();
    let b = optimize(&strategy, &weights, &options).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.score.to_bits(), b.score.to_bits());
}

#[test]
fn single_trial_returns_the_only_sample() {
    let strategy = MomentumStrategy::new(choppy(300));
    let seed = 5;
    let result = optimize(
        &strategy,
        &WeightVector::total_return_only(),
        &OptimizeOptions::new(1, seed),
    )
    .unwrap();

    let mut rng = StdRng::seed_from_u64(seed);
    let p = strategy.sample_params(&mut rng).unwrap();
    let metrics = strategy.evaluate(&p).unwrap().metrics;
    assert_eq!(result.params, p);
    assert_eq!(result.metrics, metrics);
}

#[test]
fn metrics_stay_in_bounds_across_samples() {
    let strategy = MomentumStrategy::new(choppy(500));
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..50 {
        let p = strategy.sample_params(&mut rng).unwrap();
        let eval = strategy.evaluate(&p).unwrap();
        assert!(eval.metrics.max_drawdown <= 0.0);
        assert!((0.0..=1.0).contains(&eval.metrics.win_rate));
        assert_eq!(eval.trace.len(), 500);
        for row in &eval.trace {
            if let Some(rsi) = row.rsi {
                assert!((0.0..=100.0).contains(&rsi));
            }
        }
    }
}

#[test]
fn descending_input_is_reordered() {
    let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 / 4.0).sin()).collect();
    let ascending = series(&closes);
    let mut reversed = ascending.bars().to_vec();
    reversed.reverse();
    let reordered = BarSeries::new(reversed).unwrap();
    assert_eq!(reordered, ascending);

    let params = ParameterSet::default();
    let a = MomentumStrategy::new(ascending).evaluate(&params).unwrap();
    let b = MomentumStrategy::new(reordered).evaluate(&params).unwrap();
    assert_eq!(a.metrics, b.metrics);
}
