//! Risk Parity: weight proportional to inverse annualized volatility.
//!
//! Instruments whose volatility is below the floor take no part in the
//! inverse weighting and get weight 0. If every instrument is below the
//! floor, or the remaining ones cannot stay fully invested under the cap,
//! the allocation falls back to Equal Weight.

use super::{fall_back, AllocationStrategy, EqualWeight, MarketContext, StrategyKind};
use crate::domain::error::StrategyError;
use crate::domain::weights::{
    apply_cap, cap_is_feasible, normalize, Allocation, Constraints, WeightVector,
};

#[derive(Debug, Clone, Copy)]
pub struct RiskParity {
    pub volatility_floor: f64,
}

impl RiskParity {
    /// Inverse-volatility scores; 0 for instruments below the floor.
    pub fn inverse_volatility(&self, volatilities: &[f64]) -> Vec<f64> {
        volatilities
            .iter()
            .map(|&v| {
                if v.is_finite() && v >= self.volatility_floor && v > 0.0 {
                    1.0 / v
                } else {
                    0.0
                }
            })
            .collect()
    }
}

impl AllocationStrategy for RiskParity {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RiskParity
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

        let raw = self.inverse_volatility(&market.risk.volatilities);
        match normalize(&raw) {
            Some(weights) if !cap_is_feasible(&weights, constraints) => fall_back(
                self.kind(),
                &EqualWeight,
                market,
                constraints,
                "too few instruments above the volatility floor to stay fully invested under the cap",
            ),
            Some(weights) => {
                let weights = apply_cap(&weights, constraints);
                Ok(Allocation::new(
                    self.kind(),
                    WeightVector::new(codes.to_vec(), weights),
                ))
            }
            None => fall_back(
                self.kind(),
                &EqualWeight,
                market,
                constraints,
                "every instrument has volatility below the floor",
            ),
        }
    }
}
