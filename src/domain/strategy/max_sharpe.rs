//! Maximum Sharpe: seeded random search over the capped simplex.
//!
//! Draws uniform Dirichlet weights (normalized Exp(1) samples), applies the
//! cap and keeps the draw with the highest (wᵀμ - rf) / sqrt(wᵀΣw), where μ
//! is the annualized mean daily return. This is an approximation; with a
//! fixed seed and iteration count the result is reproducible.

use super::{fall_back, AllocationStrategy, EqualWeight, MarketContext, StrategyKind};
use crate::domain::error::StrategyError;
use crate::domain::weights::{apply_cap, Allocation, Constraints, WeightVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::Exp1;

#[derive(Debug, Clone, Copy)]
pub struct MaximumSharpe {
    pub iterations: usize,
    pub seed: u64,
    pub risk_free_rate: f64,
}

/// One uniform draw from the simplex.
fn dirichlet_sample<R: Rng>(rng: &mut R, n: usize) -> Vec<f64> {
    let draws: Vec<f64> = (0..n).map(|_| rng.sample::<f64, _>(Exp1)).collect();
    let total: f64 = draws.iter().sum();
    if total > 0.0 {
        draws.iter().map(|d| d / total).collect()
    } else {
        vec![1.0 / n as f64; n]
    }
}

impl MaximumSharpe {
    /// Ex-ante Sharpe of a weight vector; `None` when volatility is zero or
    /// the score is not finite.
    pub fn score(&self, market: &MarketContext<'_>, mu: &[f64], weights: &[f64]) -> Option<f64> {
        let ret: f64 = weights.iter().zip(mu).map(|(w, m)| w * m).sum();
        let var = market.risk.covariance.portfolio_variance(weights);
        if !(var > 0.0) {
            return None;
        }
        let sharpe = (ret - self.risk_free_rate) / var.sqrt();
        sharpe.is_finite().then_some(sharpe)
    }
}

impl AllocationStrategy for MaximumSharpe {
    fn kind(&self) -> StrategyKind {
        StrategyKind::MaximumSharpe
    }

    fn allocate(
        &self,
        market: &MarketContext<'_>,
        constraints: &Constraints,
    ) -> Result<Allocation, StrategyError> {
        let codes = market.codes();
        let n = codes.len();
        if n == 0 {
            return Err(StrategyError::EmptyUniverse {
                strategy: self.kind(),
            });
        }

        let mu: Vec<f64> = (0..n).map(|i| market.returns.annualized_mean(i)).collect();
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut best: Option<(f64, Vec<f64>)> = None;

        for _ in 0..self.iterations {
            let sample = apply_cap(&dirichlet_sample(&mut rng, n), constraints);
            let Some(score) = self.score(market, &mu, &sample) else {
                continue;
            };
            if best.as_ref().is_none_or(|(s, _)| score > *s) {
                best = Some((score, sample));
            }
        }

        match best {
            Some((score, weights)) => {
                tracing::debug!(sharpe = score, iterations = self.iterations, "best sampled portfolio");
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
                "no sampled portfolio had a finite Sharpe ratio",
            ),
        }
    }
}
