//! Instrument universe: code lists from configuration and price loading.
//!
//! Codes that fail to load are skipped with a reason rather than aborting
//! the run; only an entirely empty universe is an error.

use crate::domain::error::EngineError;
use crate::domain::price::PricePoint;
use crate::ports::data_port::PriceDataPort;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};
use std::fmt;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedCode {
    pub code: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    InsufficientHistory { returns: usize },
    InvalidPrice { date: NaiveDate },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoData => write!(f, "no data"),
            SkipReason::InsufficientHistory { returns } => {
                write!(f, "only {} returns of history", returns)
            }
            SkipReason::InvalidPrice { date } => write!(f, "invalid close on {}", date),
        }
    }
}

/// Price series keyed by code, plus the codes that could not be loaded.
#[derive(Debug, Clone)]
pub struct PriceUniverse {
    pub prices: BTreeMap<String, Vec<PricePoint>>,
    pub skipped: Vec<SkippedCode>,
}

impl PriceUniverse {
    pub fn count(&self) -> usize {
        self.prices.len()
    }
}

pub fn load_universe(
    data_port: &dyn PriceDataPort,
    codes: &[String],
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> Result<PriceUniverse, EngineError> {
    let mut prices = BTreeMap::new();
    let mut skipped = Vec::new();

    for code in codes {
        match data_port.fetch_closes(code, start_date, end_date) {
            Ok(points) if points.is_empty() => {
                tracing::warn!(code = %code, "skipping instrument: no data found");
                skipped.push(SkippedCode {
                    code: code.clone(),
                    reason: SkipReason::NoData,
                });
            }
            Ok(points) => {
                tracing::debug!(code = %code, observations = points.len(), "loaded prices");
                prices.insert(code.clone(), points);
            }
            Err(e) => {
                tracing::warn!(code = %code, error = %e, "skipping instrument");
                skipped.push(SkippedCode {
                    code: code.clone(),
                    reason: SkipReason::NoData,
                });
            }
        }
    }

    if prices.is_empty() {
        return Err(EngineError::NoData {
            code: codes.join(","),
        });
    }

    Ok(PriceUniverse { prices, skipped })
}
