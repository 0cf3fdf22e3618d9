//! Minimum Variance: minimize wᵀΣw subject to Σw = 1 and 0 ≤ w ≤ cap.
//!
//! Projected gradient descent starting from the equal-weight point. The
//! step is 1/L with L = 2λmax(Σ), the Lipschitz constant of the gradient,
//! taken from the symmetric eigen decomposition (Gershgorin row bound when
//! that does not converge). Projection onto the capped simplex is by
//! bisection.
//!
//! A non-finite covariance or result falls back to Risk Parity.

use super::{fall_back, AllocationStrategy, MarketContext, RiskParity, StrategyKind};
use crate::domain::error::StrategyError;
use crate::domain::weights::{
    project_capped_simplex, Allocation, Constraints, WeightVector, WEIGHT_EPSILON,
};
use nalgebra::DVector;

const CONVERGENCE_TOLERANCE: f64 = 1e-12;

#[derive(Debug, Clone, Copy)]
pub struct MinimumVariance {
    pub max_iterations: usize,
    /// Passed through to Risk Parity on fallback.
    pub volatility_floor: f64,
}

/// Result of the descent before it is checked for degeneracy.
#[derive(Debug, Clone)]
pub struct DescentOutcome {
    pub weights: Vec<f64>,
    pub iterations: usize,
    pub converged: bool,
}

impl MinimumVariance {
    fn fallback(
        &self,
        market: &MarketContext<'_>,
        constraints: &Constraints,
        reason: &str,
    ) -> Result<Allocation, StrategyError> {
        let rp = RiskParity {
            volatility_floor: self.volatility_floor,
        };
        fall_back(self.kind(), &rp, market, constraints, reason)
    }

    pub fn descend(&self, market: &MarketContext<'_>, cap: f64) -> DescentOutcome {
        let cov = &market.risk.covariance;
        let n = cov.size();
        let project = |v: &DVector<f64>| {
            DVector::from_vec(project_capped_simplex(v.as_slice(), 1.0, cap))
        };
        let mut w = project(&DVector::from_element(n, 1.0 / n as f64));

        let lipschitz = 2.0 * cov.spectral_radius().unwrap_or_else(|| cov.gershgorin_bound());
        if !(lipschitz > 0.0) {
            // Σ = 0: every feasible point is optimal.
            return DescentOutcome {
                weights: w.as_slice().to_vec(),
                iterations: 0,
                converged: lipschitz == 0.0,
            };
        }
        let step = 1.0 / lipschitz;

        for iteration in 1..=self.max_iterations {
            let grad = cov.matrix() * &w * 2.0;
            let next = project(&(&w - grad * step));
            let delta = (&next - &w).amax();
            w = next;

            if !(delta > CONVERGENCE_TOLERANCE) {
                return DescentOutcome {
                    weights: w.as_slice().to_vec(),
                    iterations: iteration,
                    converged: delta.is_finite(),
                };
            }
        }

        DescentOutcome {
            weights: w.as_slice().to_vec(),
            iterations: self.max_iterations,
            converged: false,
        }
    }
}

impl AllocationStrategy for MinimumVariance {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MinimumVariance
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

        let cov = &market.risk.covariance;
        if !cov.is_finite() {
            return self.fallback(market, constraints, "covariance matrix is not finite");
        }

        let cap = constraints.cap();
        if cap * (codes.len() as f64) < 1.0 - WEIGHT_EPSILON {
            return self.fallback(
                market,
                constraints,
                "no fully invested weights satisfy the cap",
            );
        }

        let outcome = self.descend(market, cap);
        if outcome.weights.iter().any(|w| !w.is_finite()) {
            return self.fallback(market, constraints, "optimizer produced non-finite weights");
        }

        let start = vec![1.0 / codes.len() as f64; codes.len()];
        let start = project_capped_simplex(&start, 1.0, cap);
        let start_var = cov.portfolio_variance(&start);
        let end_var = cov.portfolio_variance(&outcome.weights);
        if end_var > start_var + 1e-12 * start_var.abs().max(1.0) {
            return self.fallback(market, constraints, "optimizer diverged");
        }

        if !outcome.converged {
            tracing::debug!(
                iterations = outcome.iterations,
                "minimum variance stopped at iteration cap"
            );
        }

        Ok(Allocation::new(
            self.kind(),
            WeightVector::new(codes.to_vec(), outcome.weights),
        ))
    }
}
