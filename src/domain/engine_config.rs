//! Engine parameters for a comparison run.

use crate::domain::comparison::RankingMetric;
use crate::domain::returns::DEFAULT_MIN_HISTORY;
use crate::domain::risk::DEFAULT_VOLATILITY_FLOOR;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Annual risk-free rate used by Sharpe and Sortino.
    pub risk_free_rate: f64,
    /// Seed for the Maximum Sharpe sampler.
    pub seed: u64,
    pub sharpe_iterations: usize,
    /// Trading days of trailing return used by Momentum Weighted.
    pub momentum_lookback: usize,
    pub volatility_floor: f64,
    pub min_variance_max_iterations: usize,
    /// Upper bound on any single Kelly fraction.
    pub kelly_max_fraction: f64,
    pub ranking: RankingMetric,
    /// Aligned returns required before an instrument is used.
    pub min_history: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: 0.06,
            seed: 42,
            sharpe_iterations: 1000,
            momentum_lookback: 90,
            volatility_floor: DEFAULT_VOLATILITY_FLOOR,
            min_variance_max_iterations: 5000,
            kelly_max_fraction: 0.25,
            ranking: RankingMetric::AnnualizedReturn,
            min_history: DEFAULT_MIN_HISTORY,
        }
    }
}
