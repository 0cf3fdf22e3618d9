//! Kelly Criterion: per-instrument Kelly fraction `f = p - (1 - p) / b`.
//!
//! `p` is the share of positive daily returns and `b` the mean win over the
//! mean absolute loss. Fractions are clipped to `[0, cap]` where the cap is
//! the smaller of `max_weight` and `max_fraction`. When the clipped sum
//! exceeds 1 it is scaled back to 1; otherwise the residual stays in cash.

use super::{AllocationStrategy, MarketContext, StrategyKind};
use crate::domain::error::StrategyError;
use crate::domain::weights::{Allocation, Constraints, WeightVector};

#[derive(Debug, Clone, Copy)]
pub struct KellyCriterion {
    pub max_fraction: f64,
}

/// Unclipped Kelly fraction for one return series. `Some(0.0)` when there
/// are no winning periods, including a flat series; `None` when the series
/// wins without ever losing.
pub fn kelly_fraction(returns: &[f64]) -> Option<f64> {
    let (mut wins, mut win_sum) = (0usize, 0.0);
    let (mut losses, mut loss_sum) = (0usize, 0.0);
    for &r in returns {
        if r > 0.0 {
            wins += 1;
            win_sum += r;
        } else if r < 0.0 {
            losses += 1;
            loss_sum += -r;
        }
    }

    if wins == 0 {
        return Some(0.0);
    }
    if losses == 0 {
        return None;
    }

    let p = wins as f64 / returns.len() as f64;
    let b = (win_sum / wins as f64) / (loss_sum / losses as f64);
    Some(p - (1.0 - p) / b)
}

impl KellyCriterion {
    pub fn cap(&self, constraints: &Constraints) -> f64 {
        constraints.cap().min(self.max_fraction)
    }
}

impl AllocationStrategy for KellyCriterion {
    fn kind(&self) -> StrategyKind {
        StrategyKind::KellyCriterion
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

        let cap = self.cap(constraints);
        let mut weights: Vec<f64> = market
            .returns
            .columns()
            .map(|(_, col)| match kelly_fraction(col) {
                None => cap,
                Some(f) if f.is_finite() => f.clamp(0.0, cap),
                Some(_) => 0.0,
            })
            .collect();

        let total: f64 = weights.iter().sum();
        if total > 1.0 {
            weights.iter_mut().for_each(|w| *w /= total);
        }
        if total <= 0.0 {
            tracing::info!("no instrument has a positive Kelly fraction; holding cash");
        }

        Ok(Allocation::new(
            self.kind(),
            WeightVector::new(codes.to_vec(), weights),
        ))
    }
}
