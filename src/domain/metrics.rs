//! Performance metrics for a weight vector held over the return history.

use crate::domain::returns::{sample_stddev, ReturnMatrix, TRADING_DAYS_PER_YEAR};
use crate::domain::weights::WeightVector;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    /// Most negative peak-to-trough change of the wealth curve, ≤ 0.
    pub max_drawdown: f64,
    /// Longest run of rows spent below a prior peak.
    pub max_drawdown_duration: usize,
}

impl PerformanceMetrics {
    pub fn return_to_volatility(&self) -> f64 {
        if self.annualized_volatility > 0.0 {
            self.annualized_return / self.annualized_volatility
        } else {
            0.0
        }
    }

    pub fn is_finite(&self) -> bool {
        [
            self.total_return,
            self.annualized_return,
            self.annualized_volatility,
            self.sharpe_ratio,
            self.sortino_ratio,
            self.max_drawdown,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Evaluates `weights` held constant over every row of `returns`.
pub fn evaluate(
    weights: &WeightVector,
    returns: &ReturnMatrix,
    risk_free_rate: f64,
) -> PerformanceMetrics {
    let daily = returns.portfolio_returns(weights.as_slice());
    let wealth = wealth_curve(&daily);

    let total_return = wealth.last().copied().unwrap_or(1.0) - 1.0;
    let annualized_return = annualize(total_return, daily.len());
    let annualized_volatility = sample_stddev(&daily) * TRADING_DAYS_PER_YEAR.sqrt();

    let sharpe_ratio = if annualized_volatility > 0.0 {
        (annualized_return - risk_free_rate) / annualized_volatility
    } else {
        0.0
    };

    let downside: Vec<f64> = daily.iter().copied().filter(|r| *r < 0.0).collect();
    let downside_volatility = sample_stddev(&downside) * TRADING_DAYS_PER_YEAR.sqrt();
    let sortino_ratio = if downside.len() >= 2 && downside_volatility > 0.0 {
        (annualized_return - risk_free_rate) / downside_volatility
    } else {
        0.0
    };

    PerformanceMetrics {
        total_return,
        annualized_return,
        annualized_volatility,
        sharpe_ratio,
        sortino_ratio,
        max_drawdown: max_drawdown(&wealth),
        max_drawdown_duration: max_drawdown_duration(&wealth),
    }
}

/// Wealth path starting at 1 and compounding each daily return.
pub fn wealth_curve(daily: &[f64]) -> Vec<f64> {
    let mut wealth = Vec::with_capacity(daily.len() + 1);
    wealth.push(1.0);
    let mut w = 1.0;
    for r in daily {
        w *= 1.0 + r;
        wealth.push(w);
    }
    wealth
}

fn annualize(total_return: f64, periods: usize) -> f64 {
    if periods == 0 {
        return 0.0;
    }
    let growth = 1.0 + total_return;
    if growth <= 0.0 {
        return -1.0;
    }
    growth.powf(TRADING_DAYS_PER_YEAR / periods as f64) - 1.0
}

/// Most negative `(value - peak) / peak` along a wealth path.
pub fn max_drawdown(wealth: &[f64]) -> f64 {
    let Some(&first) = wealth.first() else {
        return 0.0;
    };
    let mut peak = first;
    let mut worst = 0.0_f64;
    for &value in wealth {
        if value > peak {
            peak = value;
        } else if peak > 0.0 {
            worst = worst.min((value - peak) / peak);
        }
    }
    worst
}

pub fn max_drawdown_duration(wealth: &[f64]) -> usize {
    let Some(&first) = wealth.first() else {
        return 0;
    };
    let mut peak = first;
    let mut current = 0usize;
    let mut longest = 0usize;
    for &value in wealth {
        if value >= peak {
            peak = value;
            current = 0;
        } else {
            current += 1;
            longest = longest.max(current);
        }
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::strategy::test_support::matrix;
    use approx::assert_relative_eq;

    fn single(column: Vec<f64>) -> (WeightVector, ReturnMatrix) {
        let m = matrix(vec![column]);
        (WeightVector::equal(m.codes()), m)
    }

    #[test]
    fn drawdown_of_price_path() {
        assert_relative_eq!(max_drawdown(&[100.0, 120.0, 90.0, 110.0]), -0.25);
        assert_eq!(max_drawdown(&[1.0, 2.0, 3.0]), 0.0);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn drawdown_duration_counts_rows_below_peak() {
        assert_eq!(
            max_drawdown_duration(&[100.0, 110.0, 100.0, 90.0, 85.0, 95.0]),
            4
        );
        assert_eq!(max_drawdown_duration(&[1.0, 0.9, 1.0, 0.95]), 1);
    }

    #[test]
    fn zero_returns_give_zero_metrics() {
        let (w, m) = single(vec![0.0; 30]);
        let metrics = evaluate(&w, &m, 0.06);
        assert_eq!(metrics.total_return, 0.0);
        assert_eq!(metrics.annualized_return, 0.0);
        assert_eq!(metrics.annualized_volatility, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.sortino_ratio, 0.0);
        assert_eq!(metrics.max_drawdown, 0.0);
        assert_eq!(metrics.return_to_volatility(), 0.0);
        assert!(metrics.is_finite());
    }

    #[test]
    fn total_and_annualized_return() {
        let (w, m) = single(vec![0.001; 252]);
        let metrics = evaluate(&w, &m, 0.0);
        let expected = 1.001_f64.powi(252) - 1.0;
        assert_relative_eq!(metrics.total_return, expected, epsilon = 1e-12);
        // One full year: annualized equals total.
        assert_relative_eq!(metrics.annualized_return, expected, epsilon = 1e-12);
    }

    #[test]
    fn cash_contributes_nothing() {
        let m = matrix(vec![vec![0.01, -0.02, 0.03]]);
        let half = WeightVector::new(m.codes().to_vec(), vec![0.5]);
        let metrics = evaluate(&half, &m, 0.0);
        let expected = 1.005 * 0.99 * 1.015 - 1.0;
        assert_relative_eq!(metrics.total_return, expected, epsilon = 1e-12);
    }

    #[test]
    fn wiped_out_wealth_annualizes_to_minus_one() {
        let (w, m) = single(vec![0.1, -1.0, 0.05]);
        let metrics = evaluate(&w, &m, 0.0);
        assert_relative_eq!(metrics.total_return, -1.0);
        assert_eq!(metrics.annualized_return, -1.0);
        assert_relative_eq!(metrics.max_drawdown, -1.0);
    }

    #[test]
    fn sharpe_and_sortino_use_sample_deviation() {
        let col = vec![0.01, -0.005, 0.002, -0.01, 0.004, 0.006];
        let (w, m) = single(col.clone());
        let rf = 0.02;
        let metrics = evaluate(&w, &m, rf);

        let vol = sample_stddev(&col) * 252.0_f64.sqrt();
        assert_relative_eq!(metrics.annualized_volatility, vol, epsilon = 1e-12);
        assert_relative_eq!(
            metrics.sharpe_ratio,
            (metrics.annualized_return - rf) / vol,
            epsilon = 1e-12
        );

        let down = sample_stddev(&[-0.005, -0.01]) * 252.0_f64.sqrt();
        assert_relative_eq!(
            metrics.sortino_ratio,
            (metrics.annualized_return - rf) / down,
            epsilon = 1e-12
        );
    }

    #[test]
    fn sortino_needs_two_negative_days() {
        let (w, m) = single(vec![0.01, 0.02, -0.01, 0.01]);
        assert_eq!(evaluate(&w, &m, 0.0).sortino_ratio, 0.0);
    }

    #[test]
    fn return_to_volatility_ratio() {
        let metrics = PerformanceMetrics {
            total_return: 0.0,
            annualized_return: 0.12,
            annualized_volatility: 0.2,
            sharpe_ratio: 0.0,
            sortino_ratio: 0.0,
            max_drawdown: 0.0,
            max_drawdown_duration: 0,
        };
        assert_relative_eq!(metrics.return_to_volatility(), 0.6);
    }
}
