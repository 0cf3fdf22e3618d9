//! Annualized volatility and covariance estimates.

use crate::domain::returns::{mean, ReturnMatrix, TRADING_DAYS_PER_YEAR};
use nalgebra::{DMatrix, DVector};

pub const DEFAULT_VOLATILITY_FLOOR: f64 = 1e-6;

const EIGEN_MAX_ITERATIONS: usize = 10_000;

/// Square, symmetric covariance over the matrix's instruments, annualized.
#[derive(Debug, Clone, PartialEq)]
pub struct CovarianceMatrix {
    codes: Vec<String>,
    values: DMatrix<f64>,
}

impl CovarianceMatrix {
    /// Sample covariance (n - 1 denominator) of daily returns, times 252.
    pub fn from_returns(returns: &ReturnMatrix) -> Self {
        let n = returns.instrument_count();
        let rows = returns.len();
        let codes = returns.codes().to_vec();
        if rows < 2 {
            return Self {
                codes,
                values: DMatrix::zeros(n, n),
            };
        }

        let means: Vec<f64> = (0..n).map(|i| mean(returns.column(i))).collect();
        let centered = DMatrix::from_fn(rows, n, |r, c| returns.column(c)[r] - means[c]);
        let cov = centered.tr_mul(&centered) * (TRADING_DAYS_PER_YEAR / (rows - 1) as f64);
        // Rounding in the product can leave the two triangles a few ulps apart.
        let values = (&cov + cov.transpose()) * 0.5;

        Self { codes, values }
    }

    /// Builds from already-annualized values. Rows must be square.
    pub fn from_values(codes: Vec<String>, values: Vec<Vec<f64>>) -> Option<Self> {
        let n = codes.len();
        if values.len() != n || values.iter().any(|row| row.len() != n) {
            return None;
        }
        let values = DMatrix::from_fn(n, n, |i, j| values[i][j]);
        Some(Self { codes, values })
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn size(&self) -> usize {
        self.codes.len()
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.values
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[(i, j)]
    }

    pub fn variance(&self, i: usize) -> f64 {
        self.values[(i, i)]
    }

    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    /// wᵀΣw
    pub fn quadratic_form(&self, weights: &DVector<f64>) -> f64 {
        weights.dot(&(&self.values * weights))
    }

    pub fn portfolio_variance(&self, weights: &[f64]) -> f64 {
        self.quadratic_form(&DVector::from_column_slice(weights))
    }

    /// Largest absolute eigenvalue, or `None` when the symmetric eigen
    /// decomposition does not converge.
    pub fn spectral_radius(&self) -> Option<f64> {
        if !self.is_finite() {
            return None;
        }
        self.values
            .clone()
            .try_symmetric_eigen(f64::EPSILON, EIGEN_MAX_ITERATIONS)
            .map(|eigen| eigen.eigenvalues.amax())
    }

    /// Largest absolute row sum; an upper bound on the spectral radius.
    pub fn gershgorin_bound(&self) -> f64 {
        self.values
            .row_iter()
            .map(|row| row.iter().map(|v| v.abs()).sum::<f64>())
            .fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RiskEstimate {
    /// Annualized volatility per instrument, aligned with the matrix codes.
    pub volatilities: Vec<f64>,
    pub covariance: CovarianceMatrix,
}

pub fn estimate_risk(returns: &ReturnMatrix) -> RiskEstimate {
    let covariance = CovarianceMatrix::from_returns(returns);
    let volatilities = (0..covariance.size())
        .map(|i| covariance.variance(i).max(0.0).sqrt())
        .collect();
    RiskEstimate {
        volatilities,
        covariance,
    }
}
