//! Equal Weight: 1/N per instrument.

use super::{AllocationStrategy, MarketContext, StrategyKind};
use crate::domain::error::StrategyError;
use crate::domain::weights::{apply_cap, Allocation, Constraints, WeightVector};

#[derive(Debug, Clone, Copy, Default)]
pub struct EqualWeight;

impl AllocationStrategy for EqualWeight {
    fn kind(&self) -> StrategyKind {
        StrategyKind::EqualWeight
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
        let equal = WeightVector::equal(codes);
        let weights = apply_cap(equal.as_slice(), constraints);
        Ok(Allocation::new(
            self.kind(),
            WeightVector::new(codes.to_vec(), weights),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    #[test]
    fn one_over_n_regardless_of_returns() {
        let (m, r) = with_risk(vec![
            vec![0.05, -0.02, 0.01],
            vec![-0.10, 0.20, 0.0],
            vec![0.0, 0.0, 0.0],
            vec![0.3, 0.3, -0.3],
            vec![0.01, 0.01, 0.01],
        ]);
        let alloc = EqualWeight
            .allocate(&MarketContext::new(&m, &r).unwrap(), &Constraints::default())
            .unwrap();

        assert_eq!(alloc.strategy, StrategyKind::EqualWeight);
        assert!(alloc.fallback.is_none());
        for (_, w) in alloc.weights.iter() {
            assert!((w - 0.2).abs() < 1e-15);
        }
    }

    #[test]
    fn cap_above_one_over_n_is_inactive() {
        let (m, r) = with_risk(vec![vec![0.01, 0.02]; 4]);
        let constraints = Constraints {
            max_weight: Some(0.3),
            fully_invested: true,
        };
        let alloc = EqualWeight
            .allocate(&MarketContext::new(&m, &r).unwrap(), &constraints)
            .unwrap();
        assert!(alloc.weights.iter().all(|(_, w)| (w - 0.25).abs() < 1e-15));
    }
}
