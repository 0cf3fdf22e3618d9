//! Allocation strategies.
//!
//! Every strategy implements [`AllocationStrategy`]: given a read-only
//! [`MarketContext`] and [`Constraints`] it produces an [`Allocation`].
//! [`StrategyKind`] names the six strategies and builds them from an
//! [`EngineConfig`]:
//! - `EqualWeight`: 1/N per instrument
//! - `RiskParity`: inverse volatility
//! - `MinimumVariance`: projected gradient descent on wᵀΣw
//! - `MaximumSharpe`: seeded random search over the capped simplex
//! - `MomentumWeighted`: positive trailing return
//! - `KellyCriterion`: clipped per-instrument Kelly fractions

pub mod equal_weight;
pub mod kelly;
pub mod max_sharpe;
pub mod min_variance;
pub mod momentum;
pub mod risk_parity;

use crate::domain::engine_config::EngineConfig;
use crate::domain::error::{EngineError, StrategyError};
use crate::domain::returns::ReturnMatrix;
use crate::domain::risk::RiskEstimate;
use crate::domain::weights::{Allocation, Constraints};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub use equal_weight::EqualWeight;
pub use kelly::KellyCriterion;
pub use max_sharpe::MaximumSharpe;
pub use min_variance::MinimumVariance;
pub use momentum::MomentumWeighted;
pub use risk_parity::RiskParity;

/// Market data for one comparison run, passed explicitly to every strategy.
#[derive(Debug, Clone, Copy)]
pub struct MarketContext<'a> {
    pub returns: &'a ReturnMatrix,
    pub risk: &'a RiskEstimate,
}

impl<'a> MarketContext<'a> {
    /// Pairs a return matrix with its risk estimate. Both must describe the
    /// same instruments in the same order.
    pub fn new(returns: &'a ReturnMatrix, risk: &'a RiskEstimate) -> Result<Self, EngineError> {
        let codes = returns.codes();
        if risk.covariance.codes() != codes || risk.volatilities.len() != codes.len() {
            return Err(EngineError::Data {
                reason: format!(
                    "risk estimate covers {} instruments with {} volatilities, returns cover {}",
                    risk.covariance.size(),
                    risk.volatilities.len(),
                    codes.len()
                ),
            });
        }
        Ok(Self { returns, risk })
    }

    pub fn codes(&self) -> &'a [String] {
        self.returns.codes()
    }

    pub fn instrument_count(&self) -> usize {
        self.returns.instrument_count()
    }
}

pub trait AllocationStrategy {
    fn kind(&self) -> StrategyKind;

    fn allocate(
        &self,
        market: &MarketContext<'_>,
        constraints: &Constraints,
    ) -> Result<Allocation, StrategyError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum StrategyKind {
    EqualWeight,
    RiskParity,
    MinimumVariance,
    MaximumSharpe,
    MomentumWeighted,
    KellyCriterion,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 6] = [
        StrategyKind::EqualWeight,
        StrategyKind::RiskParity,
        StrategyKind::MinimumVariance,
        StrategyKind::MaximumSharpe,
        StrategyKind::MomentumWeighted,
        StrategyKind::KellyCriterion,
    ];

    /// Identifier used in configuration files and on the command line.
    pub fn id(&self) -> &'static str {
        match self {
            StrategyKind::EqualWeight => "equal_weight",
            StrategyKind::RiskParity => "risk_parity",
            StrategyKind::MinimumVariance => "minimum_variance",
            StrategyKind::MaximumSharpe => "maximum_sharpe",
            StrategyKind::MomentumWeighted => "momentum_weighted",
            StrategyKind::KellyCriterion => "kelly_criterion",
        }
    }

    pub fn build(self, config: &EngineConfig) -> Box<dyn AllocationStrategy> {
        match self {
            StrategyKind::EqualWeight => Box::new(EqualWeight),
            StrategyKind::RiskParity => Box::new(RiskParity {
                volatility_floor: config.volatility_floor,
            }),
            StrategyKind::MinimumVariance => Box::new(MinimumVariance {
                max_iterations: config.min_variance_max_iterations,
                volatility_floor: config.volatility_floor,
            }),
            StrategyKind::MaximumSharpe => Box::new(MaximumSharpe {
                iterations: config.sharpe_iterations,
                seed: config.seed,
                risk_free_rate: config.risk_free_rate,
            }),
            StrategyKind::MomentumWeighted => Box::new(MomentumWeighted {
                lookback: config.momentum_lookback,
            }),
            StrategyKind::KellyCriterion => Box::new(KellyCriterion {
                max_fraction: config.kelly_max_fraction,
            }),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StrategyKind::EqualWeight => "Equal Weight",
            StrategyKind::RiskParity => "Risk Parity",
            StrategyKind::MinimumVariance => "Minimum Variance",
            StrategyKind::MaximumSharpe => "Maximum Sharpe",
            StrategyKind::MomentumWeighted => "Momentum Weighted",
            StrategyKind::KellyCriterion => "Kelly Criterion",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unknown strategy: {0}")]
pub struct UnknownStrategy(pub String);

impl FromStr for StrategyKind {
    type Err = UnknownStrategy;

    /// Accepts the identifier (`risk_parity`) or the display name
    /// (`Risk Parity`), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace([' ', '-'], "_");
        StrategyKind::ALL
            .into_iter()
            .find(|k| k.id() == key)
            .ok_or_else(|| UnknownStrategy(s.to_string()))
    }
}

/// Allocates with `to` on behalf of `kind`, recording why. A chained
/// fallback (e.g. Risk Parity itself falling back) reports the strategy
/// that finally produced the weights.
pub(crate) fn fall_back(
    kind: StrategyKind,
    to: &dyn AllocationStrategy,
    market: &MarketContext<'_>,
    constraints: &Constraints,
    reason: impl Into<String>,
) -> Result<Allocation, StrategyError> {
    let alt = to.allocate(market, constraints)?;
    let mut reason = reason.into();
    let target = match alt.fallback {
        Some(inner) => {
            reason = format!("{}; {}", reason, inner.reason);
            inner.to
        }
        None => to.kind(),
    };
    Ok(Allocation::new(kind, alt.weights).with_fallback(target, reason))
}

/// Runs one strategy after checking that the constraints are satisfiable
/// for the universe.
pub fn compute_weights(
    kind: StrategyKind,
    market: &MarketContext<'_>,
    constraints: &Constraints,
    config: &EngineConfig,
) -> Result<Allocation, EngineError> {
    constraints.check(market.instrument_count())?;
    let strategy = kind.build(config);
    let allocation = strategy.allocate(market, constraints)?;
    tracing::debug!(
        strategy = %kind,
        invested = allocation.weights.sum(),
        fallback = allocation.fallback.is_some(),
        "computed weights"
    );
    Ok(allocation)
}
