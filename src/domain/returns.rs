//! Aligned daily return matrix built from closing-price series.
//!
//! Series are inner-joined on their common dates before returns are taken,
//! so every column of a [`ReturnMatrix`] shares one date index.

use crate::domain::error::EngineError;
use crate::domain::price::PricePoint;
use crate::domain::universe::{SkipReason, SkippedCode};
use chrono::NaiveDate;
use std::collections::BTreeMap;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const DEFAULT_MIN_HISTORY: usize = 60;

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnMatrix {
    codes: Vec<String>,
    dates: Vec<NaiveDate>,
    columns: Vec<Vec<f64>>,
}

impl ReturnMatrix {
    /// Builds a matrix from pre-aligned columns, one per code.
    pub fn new(
        codes: Vec<String>,
        dates: Vec<NaiveDate>,
        columns: Vec<Vec<f64>>,
    ) -> Result<Self, EngineError> {
        if codes.len() != columns.len() {
            return Err(EngineError::Data {
                reason: format!("{} codes for {} columns", codes.len(), columns.len()),
            });
        }
        if let Some((code, col)) = codes
            .iter()
            .zip(&columns)
            .find(|(_, col)| col.len() != dates.len())
        {
            return Err(EngineError::Data {
                reason: format!(
                    "column {} has {} rows, expected {}",
                    code,
                    col.len(),
                    dates.len()
                ),
            });
        }
        Ok(Self {
            codes,
            dates,
            columns,
        })
    }

    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn instrument_count(&self) -> usize {
        self.codes.len()
    }

    /// Number of aligned return rows.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, index: usize) -> &[f64] {
        &self.columns[index]
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.codes
            .iter()
            .map(String::as_str)
            .zip(self.columns.iter().map(Vec::as_slice))
    }

    /// Last `n` rows of a column (the whole column when shorter).
    pub fn tail(&self, index: usize, n: usize) -> &[f64] {
        let col = &self.columns[index];
        &col[col.len().saturating_sub(n)..]
    }

    /// Arithmetic mean of a column, annualized.
    pub fn annualized_mean(&self, index: usize) -> f64 {
        mean(&self.columns[index]) * TRADING_DAYS_PER_YEAR
    }

    /// Weighted sum of instrument returns per row. Weights align with `codes()`;
    /// the uninvested residual contributes nothing.
    pub fn portfolio_returns(&self, weights: &[f64]) -> Vec<f64> {
        (0..self.len())
            .map(|t| {
                self.columns
                    .iter()
                    .zip(weights)
                    .map(|(col, w)| w * col[t])
                    .sum()
            })
            .collect()
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator); 0 for fewer than 2 values.
pub(crate) fn sample_stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

#[derive(Debug, Clone)]
pub struct ReturnBuild {
    pub matrix: ReturnMatrix,
    pub skipped: Vec<SkippedCode>,
}

pub fn build_return_matrix(
    prices: &BTreeMap<String, Vec<PricePoint>>,
    min_history: usize,
) -> Result<ReturnBuild, EngineError> {
    let mut skipped = Vec::new();
    let mut series: BTreeMap<&str, BTreeMap<NaiveDate, f64>> = BTreeMap::new();

    for (code, points) in prices {
        if let Some(bad) = points.iter().find(|p| !p.is_valid()) {
            tracing::warn!(code = %code, date = %bad.date, close = bad.close, "skipping instrument: invalid close");
            skipped.push(SkippedCode {
                code: code.clone(),
                reason: SkipReason::InvalidPrice { date: bad.date },
            });
            continue;
        }

        // Later duplicates overwrite earlier ones.
        let by_date: BTreeMap<NaiveDate, f64> =
            points.iter().map(|p| (p.date, p.close)).collect();
        let returns = by_date.len().saturating_sub(1);

        if by_date.len() < 2 || returns < min_history {
            tracing::warn!(
                code = %code,
                returns,
                min_history,
                "skipping instrument: insufficient history"
            );
            skipped.push(SkippedCode {
                code: code.clone(),
                reason: SkipReason::InsufficientHistory { returns },
            });
            continue;
        }

        series.insert(code.as_str(), by_date);
    }

    let common_dates: Vec<NaiveDate> = match series.values().next() {
        Some(first) => first
            .keys()
            .filter(|d| series.values().all(|s| s.contains_key(d)))
            .copied()
            .collect(),
        None => Vec::new(),
    };
    let observations = common_dates.len().saturating_sub(1);

    if series.len() < 2 || observations < min_history.max(1) {
        return Err(EngineError::InsufficientData {
            instruments: series.len(),
            observations,
            min_history,
        });
    }

    let mut codes = Vec::with_capacity(series.len());
    let mut columns = Vec::with_capacity(series.len());

    for (code, by_date) in &series {
        let closes: Vec<f64> = common_dates.iter().map(|d| by_date[d]).collect();
        let returns: Vec<f64> = closes.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect();
        codes.push(code.to_string());
        columns.push(returns);
    }

    let dates = common_dates[1..].to_vec();
    tracing::info!(
        instruments = codes.len(),
        rows = dates.len(),
        skipped = skipped.len(),
        "built return matrix"
    );

    Ok(ReturnBuild {
        matrix: ReturnMatrix::new(codes, dates, columns)?,
        skipped,
    })
}
