//! Integration tests for the comparison pipeline.
//!
//! Tests cover:
//! - Universe loading through a mock price port (missing and failing codes skipped)
//! - Full pipeline from closes to ranked comparison
//! - Weight-vector invariants for every strategy (proptest)
//! - Determinism under a fixed seed
//! - Degenerate markets: flat prices, too few instruments, infeasible caps
//! - Goal projection monotonicity

mod common;

use approx::assert_relative_eq;
use common::*;
use proptest::prelude::*;
use stratfolio::domain::comparison::{compare_prices, ComparisonRun, RankingMetric};
use stratfolio::domain::engine_config::EngineConfig;
use stratfolio::domain::error::EngineError;
use stratfolio::domain::goal::{project_rate, GoalSpec};
use stratfolio::domain::metrics::{evaluate, max_drawdown};
use stratfolio::domain::returns::{build_return_matrix, ReturnMatrix};
use stratfolio::domain::risk::estimate_risk;
use stratfolio::domain::strategy::{compute_weights, MarketContext, StrategyKind};
use stratfolio::domain::universe::{load_universe, SkipReason};
use stratfolio::domain::weights::{Constraints, WeightVector};

fn fast_config() -> EngineConfig {
    EngineConfig {
        sharpe_iterations: 300,
        ..EngineConfig::default()
    }
}

mod universe_loading {
    use super::*;

    #[test]
    fn missing_and_failing_codes_are_skipped() {
        let port = sample_port().with_error("WIPRO", "connection reset");
        let codes = vec![
            "RELIANCE".to_string(),
            "WIPRO".to_string(),
            "TCS".to_string(),
            "NOPE".to_string(),
        ];

        let universe = load_universe(&port, &codes, None, None).unwrap();

        assert_eq!(universe.count(), 2);
        let skipped: Vec<&str> = universe.skipped.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(skipped, vec!["WIPRO", "NOPE"]);
        assert!(universe
            .skipped
            .iter()
            .all(|s| s.reason == SkipReason::NoData));
    }

    #[test]
    fn date_bounds_are_passed_through() {
        let port = sample_port();
        let codes = vec!["TCS".to_string()];
        let universe =
            load_universe(&port, &codes, Some(date(2023, 2, 1)), Some(date(2023, 2, 28))).unwrap();
        assert_eq!(universe.prices["TCS"].len(), 28);
    }

    #[test]
    fn no_codes_with_data_is_an_error() {
        let port = MockPriceDataPort::new();
        let err = load_universe(&port, &["A".to_string()], None, None).unwrap_err();
        assert!(matches!(err, EngineError::NoData { .. }));
    }
}

mod full_pipeline {
    use super::*;

    fn run(config: &EngineConfig, constraints: &Constraints) -> ComparisonRun {
        let universe = load_universe(&sample_port(), &sample_codes(), None, None).unwrap();
        compare_prices(&universe.prices, constraints, &GoalSpec::default(), config).unwrap()
    }

    #[test]
    fn every_strategy_is_compared() {
        let run = run(&fast_config(), &Constraints::default());
        let cmp = &run.comparison;

        assert_eq!(run.codes.len(), 4);
        assert_eq!(run.observations, 200);
        assert_eq!(cmp.rows.len() + cmp.omitted.len(), 6);
        for kind in StrategyKind::ALL {
            assert!(cmp.row(kind).is_some(), "{} missing", kind);
        }
    }

    #[test]
    fn rows_are_ranked_by_annualized_return() {
        let run = run(&fast_config(), &Constraints::default());
        for pair in run.comparison.rows.windows(2) {
            assert!(pair[0].metrics.annualized_return >= pair[1].metrics.annualized_return);
        }
        assert_eq!(run.comparison.ranking, RankingMetric::AnnualizedReturn);
    }

    #[test]
    fn equal_weight_row_matches_direct_evaluation() {
        let universe = load_universe(&sample_port(), &sample_codes(), None, None).unwrap();
        let build = build_return_matrix(&universe.prices, 60).unwrap();
        let run = compare_prices(
            &universe.prices,
            &Constraints::default(),
            &GoalSpec::default(),
            &fast_config(),
        )
        .unwrap();

        let ew = run.comparison.row(StrategyKind::EqualWeight).unwrap();
        let direct = evaluate(
            &WeightVector::equal(build.matrix.codes()),
            &build.matrix,
            fast_config().risk_free_rate,
        );
        assert_eq!(ew.metrics, direct);
    }

    #[test]
    fn fixed_seed_reproduces_comparison() {
        let a = run(&fast_config(), &Constraints::default());
        let b = run(&fast_config(), &Constraints::default());
        assert_eq!(a.comparison, b.comparison);
    }

    #[test]
    fn seed_changes_maximum_sharpe_only() {
        let a = run(&fast_config(), &Constraints::default());
        let b = run(
            &EngineConfig {
                seed: 7,
                ..fast_config()
            },
            &Constraints::default(),
        );
        for kind in [
            StrategyKind::EqualWeight,
            StrategyKind::RiskParity,
            StrategyKind::MinimumVariance,
            StrategyKind::MomentumWeighted,
            StrategyKind::KellyCriterion,
        ] {
            assert_eq!(
                a.comparison.row(kind).unwrap().weights,
                b.comparison.row(kind).unwrap().weights
            );
        }
        assert_ne!(
            a.comparison.row(StrategyKind::MaximumSharpe).unwrap().weights,
            b.comparison.row(StrategyKind::MaximumSharpe).unwrap().weights
        );
    }

    #[test]
    fn cap_is_respected_across_strategies() {
        let constraints = Constraints {
            max_weight: Some(0.3),
            fully_invested: true,
        };
        let run = run(&fast_config(), &constraints);
        for row in &run.comparison.rows {
            assert!(
                row.weights.iter().all(|(_, w)| w <= 0.3 + 1e-9),
                "{}: {:?}",
                row.strategy,
                row.weights
            );
        }
    }

    #[test]
    fn minimum_variance_beats_equal_weight_variance() {
        let universe = load_universe(&sample_port(), &sample_codes(), None, None).unwrap();
        let build = build_return_matrix(&universe.prices, 60).unwrap();
        let risk = estimate_risk(&build.matrix);
        let market = MarketContext::new(&build.matrix, &risk).unwrap();

        let mv = compute_weights(
            StrategyKind::MinimumVariance,
            &market,
            &Constraints::default(),
            &fast_config(),
        )
        .unwrap();
        let n = build.matrix.instrument_count();
        let eq = vec![1.0 / n as f64; n];
        assert!(
            risk.covariance.portfolio_variance(mv.weights.as_slice())
                <= risk.covariance.portfolio_variance(&eq) + 1e-12
        );
    }

    #[test]
    fn drawdown_helper_is_public() {
        assert_relative_eq!(max_drawdown(&[100.0, 120.0, 90.0, 110.0]), -0.25);
    }
}

mod degenerate_markets {
    use super::*;

    #[test]
    fn flat_prices_never_fault() {
        let flat = vec![0.0; 120];
        let port = MockPriceDataPort::new()
            .with_prices("AAA", price_series("2024-01-01", 100.0, &flat))
            .with_prices("BBB", price_series("2024-01-01", 50.0, &flat))
            .with_prices("CCC", price_series("2024-01-01", 20.0, &flat));
        let codes = vec!["AAA".to_string(), "BBB".to_string(), "CCC".to_string()];
        let universe = load_universe(&port, &codes, None, None).unwrap();

        let run = compare_prices(
            &universe.prices,
            &Constraints::default(),
            &GoalSpec::default(),
            &fast_config(),
        )
        .unwrap();

        for row in &run.comparison.rows {
            assert_eq!(row.metrics.annualized_volatility, 0.0);
            assert_eq!(row.metrics.sharpe_ratio, 0.0);
            assert_eq!(row.projection.years_to_target, None);
            assert!(row.weights.iter().all(|(_, w)| w.is_finite()));
        }
        let rp = run.comparison.row(StrategyKind::RiskParity).unwrap();
        assert_eq!(rp.fallback.as_ref().unwrap().to, StrategyKind::EqualWeight);
    }

    #[test]
    fn single_instrument_is_insufficient_data() {
        let port = sample_port();
        let universe = load_universe(&port, &["TCS".to_string()], None, None).unwrap();
        let err = compare_prices(
            &universe.prices,
            &Constraints::default(),
            &GoalSpec::default(),
            &fast_config(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientData { instruments: 1, .. }));
    }

    #[test]
    fn short_history_is_insufficient_data() {
        let port = MockPriceDataPort::new()
            .with_prices("AAA", generate_prices("2024-01-01", 30, 100.0, 0.001, 0.02, 0))
            .with_prices("BBB", generate_prices("2024-01-01", 30, 100.0, 0.001, 0.02, 4));
        let universe =
            load_universe(&port, &["AAA".to_string(), "BBB".to_string()], None, None).unwrap();
        let err = compare_prices(
            &universe.prices,
            &Constraints::default(),
            &GoalSpec::default(),
            &fast_config(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientData { .. }));
    }

    #[test]
    fn infeasible_cap_is_rejected() {
        let universe = load_universe(&sample_port(), &sample_codes(), None, None).unwrap();
        let constraints = Constraints {
            max_weight: Some(0.2),
            fully_invested: true,
        };
        let err = compare_prices(
            &universe.prices,
            &constraints,
            &GoalSpec::default(),
            &fast_config(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EngineError::InfeasibleConstraints { instruments: 4, .. }
        ));
    }
}

fn market_strategy() -> impl Strategy<Value = Vec<Vec<f64>>> {
    (2usize..=5, 20usize..=60).prop_flat_map(|(n, len)| {
        prop::collection::vec(prop::collection::vec(-0.05f64..0.05, len), n)
    })
}

fn matrix_from(columns: Vec<Vec<f64>>) -> ReturnMatrix {
    let rows = columns[0].len();
    let dates = (0..rows)
        .map(|i| date(2024, 1, 1) + chrono::Duration::days(i as i64))
        .collect();
    let codes = (0..columns.len()).map(|i| format!("C{}", i)).collect();
    ReturnMatrix::new(codes, dates, columns).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn weights_stay_within_bounds(columns in market_strategy(), cap_frac in 0.05f64..1.0) {
        let m = matrix_from(columns);
        let n = m.instrument_count();
        let floor = 1.0 / n as f64;
        let cap = floor + (1.0 - floor) * cap_frac;
        let constraints = Constraints { max_weight: Some(cap), fully_invested: true };
        let risk = estimate_risk(&m);
        let market = MarketContext::new(&m, &risk).unwrap();
        let config = EngineConfig { sharpe_iterations: 50, ..EngineConfig::default() };

        for kind in StrategyKind::ALL {
            let alloc = compute_weights(kind, &market, &constraints, &config).unwrap();
            let sum = alloc.weights.sum();
            for (_, w) in alloc.weights.iter() {
                prop_assert!(w >= -1e-12 && w <= cap + 1e-9, "{} weight {} cap {}", kind, w, cap);
            }
            if kind == StrategyKind::KellyCriterion {
                prop_assert!(sum <= 1.0 + 1e-9);
            } else {
                prop_assert!((sum - 1.0).abs() < 1e-6, "{} sums to {}", kind, sum);
            }
        }
    }

    #[test]
    fn metrics_are_always_finite(columns in market_strategy()) {
        let m = matrix_from(columns);
        let w = WeightVector::equal(m.codes());
        let metrics = evaluate(&w, &m, 0.06);
        prop_assert!(metrics.is_finite());
        prop_assert!(metrics.max_drawdown <= 0.0);
    }

    #[test]
    fn faster_growth_reaches_target_sooner(r in 0.01f64..0.5, bump in 0.001f64..0.2) {
        let goal = GoalSpec::default();
        let slow = project_rate(r, &goal).unwrap().years_to_target.unwrap();
        let fast = project_rate(r + bump, &goal).unwrap().years_to_target.unwrap();
        prop_assert!(fast < slow);
    }
}
