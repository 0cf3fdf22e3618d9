//! Side-by-side comparison of every allocation strategy over one market.

use crate::domain::engine_config::EngineConfig;
use crate::domain::error::EngineError;
use crate::domain::goal::{project, GoalProjection, GoalSpec};
use crate::domain::metrics::{evaluate, PerformanceMetrics};
use crate::domain::price::PricePoint;
use crate::domain::returns::build_return_matrix;
use crate::domain::risk::estimate_risk;
use crate::domain::strategy::{compute_weights, MarketContext, StrategyKind};
use crate::domain::universe::SkippedCode;
use crate::domain::weights::{Constraints, Fallback, WeightVector};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankingMetric {
    #[default]
    AnnualizedReturn,
    SharpeRatio,
    SortinoRatio,
    MaxDrawdown,
    YearsToTarget,
}

impl RankingMetric {
    pub const ALL: [RankingMetric; 5] = [
        RankingMetric::AnnualizedReturn,
        RankingMetric::SharpeRatio,
        RankingMetric::SortinoRatio,
        RankingMetric::MaxDrawdown,
        RankingMetric::YearsToTarget,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            RankingMetric::AnnualizedReturn => "annualized_return",
            RankingMetric::SharpeRatio => "sharpe_ratio",
            RankingMetric::SortinoRatio => "sortino_ratio",
            RankingMetric::MaxDrawdown => "max_drawdown",
            RankingMetric::YearsToTarget => "years_to_target",
        }
    }

    /// Orders `a` before `b` when `a` ranks better on this metric alone.
    fn order(&self, a: &ComparisonRow, b: &ComparisonRow) -> Ordering {
        let (x, y) = (&a.metrics, &b.metrics);
        match self {
            RankingMetric::AnnualizedReturn => y.annualized_return.total_cmp(&x.annualized_return),
            RankingMetric::SharpeRatio => y.sharpe_ratio.total_cmp(&x.sharpe_ratio),
            RankingMetric::SortinoRatio => y.sortino_ratio.total_cmp(&x.sortino_ratio),
            // Drawdowns are ≤ 0; closer to zero is better.
            RankingMetric::MaxDrawdown => y.max_drawdown.total_cmp(&x.max_drawdown),
            RankingMetric::YearsToTarget => {
                match (a.projection.years_to_target, b.projection.years_to_target) {
                    (Some(p), Some(q)) => p.total_cmp(&q),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            }
        }
    }
}

impl fmt::Display for RankingMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown ranking metric: {0}")]
pub struct UnknownRankingMetric(pub String);

impl FromStr for RankingMetric {
    type Err = UnknownRankingMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace([' ', '-'], "_");
        RankingMetric::ALL
            .into_iter()
            .find(|m| m.id() == key)
            .ok_or_else(|| UnknownRankingMetric(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub strategy: StrategyKind,
    pub weights: WeightVector,
    pub metrics: PerformanceMetrics,
    pub projection: GoalProjection,
    pub fallback: Option<Fallback>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OmittedStrategy {
    pub strategy: StrategyKind,
    pub reason: String,
}

/// One point of the realized risk/return scatter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FrontierPoint {
    pub strategy: StrategyKind,
    pub annualized_volatility: f64,
    pub annualized_return: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub ranking: RankingMetric,
    /// Sorted best first by `ranking`.
    pub rows: Vec<ComparisonRow>,
    pub omitted: Vec<OmittedStrategy>,
    pub frontier: Vec<FrontierPoint>,
}

impl Comparison {
    pub fn row(&self, kind: StrategyKind) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.strategy == kind)
    }

    /// Row with the highest Sharpe ratio.
    pub fn best_risk_adjusted(&self) -> Option<&ComparisonRow> {
        self.rows
            .iter()
            .min_by(|a, b| RankingMetric::SharpeRatio.order(a, b).then(tie_break(a, b)))
    }

    pub fn highest_return(&self) -> Option<&ComparisonRow> {
        self.rows
            .iter()
            .min_by(|a, b| RankingMetric::AnnualizedReturn.order(a, b).then(tie_break(a, b)))
    }
}

fn tie_break(a: &ComparisonRow, b: &ComparisonRow) -> Ordering {
    a.metrics
        .annualized_volatility
        .total_cmp(&b.metrics.annualized_volatility)
        .then(a.strategy.cmp(&b.strategy))
}

/// Runs every strategy over `market`, evaluates and projects each result,
/// and ranks the rows. A strategy that fails is omitted, not fatal.
pub fn compare_all(
    market: &MarketContext<'_>,
    constraints: &Constraints,
    goal: &GoalSpec,
    config: &EngineConfig,
) -> Result<Comparison, EngineError> {
    goal.validate()?;
    constraints.check(market.instrument_count())?;

    let mut rows = Vec::with_capacity(StrategyKind::ALL.len());
    let mut omitted = Vec::new();

    for kind in StrategyKind::ALL {
        let allocation = match compute_weights(kind, market, constraints, config) {
            Ok(a) => a,
            Err(EngineError::Strategy(e)) => {
                tracing::warn!(strategy = %kind, error = %e, "omitting strategy");
                omitted.push(OmittedStrategy {
                    strategy: kind,
                    reason: e.to_string(),
                });
                continue;
            }
            Err(e) => return Err(e),
        };

        let metrics = evaluate(&allocation.weights, market.returns, config.risk_free_rate);
        if !metrics.is_finite() {
            tracing::warn!(strategy = %kind, "omitting strategy: metrics are not finite");
            omitted.push(OmittedStrategy {
                strategy: kind,
                reason: "metrics are not finite".to_string(),
            });
            continue;
        }

        let projection = project(&metrics, goal)?;
        rows.push(ComparisonRow {
            strategy: kind,
            weights: allocation.weights,
            metrics,
            projection,
            fallback: allocation.fallback,
        });
    }

    let ranking = config.ranking;
    rows.sort_by(|a, b| ranking.order(a, b).then(tie_break(a, b)));

    let frontier = rows
        .iter()
        .map(|r| FrontierPoint {
            strategy: r.strategy,
            annualized_volatility: r.metrics.annualized_volatility,
            annualized_return: r.metrics.annualized_return,
        })
        .collect();

    tracing::info!(
        strategies = rows.len(),
        omitted = omitted.len(),
        ranking = %ranking,
        "comparison complete"
    );

    Ok(Comparison {
        ranking,
        rows,
        omitted,
        frontier,
    })
}

/// A comparison together with what was left out of the universe.
#[derive(Debug, Clone)]
pub struct ComparisonRun {
    pub comparison: Comparison,
    pub skipped: Vec<SkippedCode>,
    pub codes: Vec<String>,
    pub observations: usize,
}

/// Full pipeline from closing prices: align returns, estimate risk and
/// compare every strategy.
pub fn compare_prices(
    prices: &BTreeMap<String, Vec<PricePoint>>,
    constraints: &Constraints,
    goal: &GoalSpec,
    config: &EngineConfig,
) -> Result<ComparisonRun, EngineError> {
    let build = build_return_matrix(prices, config.min_history)?;
    let risk = estimate_risk(&build.matrix);
    tracing::info!(
        instruments = build.matrix.instrument_count(),
        observations = build.matrix.len(),
        skipped = build.skipped.len(),
        "estimated risk"
    );

    let market = MarketContext::new(&build.matrix, &risk)?;
    let comparison = compare_all(&market, constraints, goal, config)?;

    Ok(ComparisonRun {
        comparison,
        codes: build.matrix.codes().to_vec(),
        observations: build.matrix.len(),
        skipped: build.skipped,
    })
}
