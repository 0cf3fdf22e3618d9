//! Momentum Weighted: weight proportional to positive trailing return.
//!
//! Instruments with a non-positive trailing return get weight 0. When the
//! positive names cannot hold a fully invested portfolio under the cap, the
//! allocation falls back to Equal Weight.

use super::{fall_back, AllocationStrategy, EqualWeight, MarketContext, StrategyKind};
use crate::domain::error::StrategyError;
use crate::domain::weights::{
    apply_cap, cap_is_feasible, normalize, Allocation, Constraints, WeightVector,
};

#[derive(Debug, Clone, Copy)]
pub struct MomentumWeighted {
    /// Trading days in the trailing window.
    pub lookback: usize,
}

/// Compounded return over a slice of daily returns.
pub fn trailing_return(returns: &[f64]) -> f64 {
    returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0
}

impl AllocationStrategy for MomentumWeighted {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MomentumWeighted
    }

    fn allocate(
        &self,
        market: &MarketContext<'_>,
        constraints: &Constraints,
    ) -> Result<Allocation, StrategyError> {
        let codes = market.codes();
        if codes.is_empty() {
            return Err(StrategyError::EmptyUniverse {
                strategy: self.kind(),
            });
        }

        let scores: Vec<f64> = (0..codes.len())
            .map(|i| trailing_return(market.returns.tail(i, self.lookback)))
            .map(|tr| if tr.is_finite() { tr.max(0.0) } else { 0.0 })
            .collect();

        match normalize(&scores) {
            Some(weights) if cap_is_feasible(&weights, constraints) => Ok(Allocation::new(
                self.kind(),
                WeightVector::new(codes.to_vec(), apply_cap(&weights, constraints)),
            )),
            Some(_) => fall_back(
                self.kind(),
                &EqualWeight,
                market,
                constraints,
                "too few instruments with positive trailing return to stay fully invested under the cap",
            ),
            None => fall_back(
                self.kind(),
                &EqualWeight,
                market,
                constraints,
                "no instrument has positive trailing return",
            ),
        }
    }
}
