#![allow(dead_code)]

use chrono::NaiveDate;
use stratfolio::domain::comparison::Comparison;
use stratfolio::domain::error::EngineError;
use stratfolio::domain::goal::GoalSpec;
pub use stratfolio::domain::price::PricePoint;
use stratfolio::ports::data_port::PriceDataPort;
use stratfolio::ports::report_port::ReportPort;
use std::cell::RefCell;
use std::collections::HashMap;

pub struct MockPriceDataPort {
    pub data: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, String>,
}

impl MockPriceDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_prices(mut self, code: &str, prices: Vec<PricePoint>) -> Self {
        self.data.insert(code.to_string(), prices);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl PriceDataPort for MockPriceDataPort {
    fn fetch_closes(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PricePoint>, EngineError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(EngineError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(code)
            .map(|points| {
                points
                    .iter()
                    .copied()
                    .filter(|p| start_date.is_none_or(|s| p.date >= s))
                    .filter(|p| end_date.is_none_or(|e| p.date <= e))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, EngineError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, EngineError> {
        match self.data.get(code) {
            Some(points) if !points.is_empty() => {
                let min = points.iter().map(|p| p.date).min().unwrap();
                let max = points.iter().map(|p| p.date).max().unwrap();
                Ok(Some((min, max, points.len())))
            }
            _ => Ok(None),
        }
    }
}

/// Records every comparison handed to it.
pub struct MockReportPort {
    pub calls: RefCell<Vec<(Comparison, GoalSpec, String)>>,
}

impl MockReportPort {
    pub fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl ReportPort for MockReportPort {
    fn write(
        &self,
        comparison: &Comparison,
        goal: &GoalSpec,
        output_path: &str,
    ) -> Result<(), EngineError> {
        self.calls
            .borrow_mut()
            .push((comparison.clone(), *goal, output_path.to_string()));
        Ok(())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Deterministic daily returns with the given drift and swing.
pub fn daily_returns(count: usize, drift: f64, swing: f64, phase: usize) -> Vec<f64> {
    (0..count)
        .map(|i| {
            let x = ((i * 11 + phase * 5) % 23) as f64 / 22.0 - 0.5;
            drift + swing * x
        })
        .collect()
}

/// Consecutive daily closes compounding `returns` from `start_price`.
pub fn price_series(start_date: &str, start_price: f64, returns: &[f64]) -> Vec<PricePoint> {
    let start = NaiveDate::parse_from_str(start_date, "%Y-%m-%d").unwrap();
    let mut close = start_price;
    let mut points = vec![PricePoint::new(start, close)];
    for (i, r) in returns.iter().enumerate() {
        close *= 1.0 + r;
        points.push(PricePoint::new(
            start + chrono::Duration::days(i as i64 + 1),
            close,
        ));
    }
    points
}

pub fn generate_prices(
    start_date: &str,
    count: usize,
    start_price: f64,
    drift: f64,
    swing: f64,
    phase: usize,
) -> Vec<PricePoint> {
    price_series(
        start_date,
        start_price,
        &daily_returns(count.saturating_sub(1), drift, swing, phase),
    )
}

/// A four-name market with distinct drift and volatility.
pub fn sample_port() -> MockPriceDataPort {
    MockPriceDataPort::new()
        .with_prices("RELIANCE", generate_prices("2023-01-02", 201, 2500.0, 0.0010, 0.03, 0))
        .with_prices("TCS", generate_prices("2023-01-02", 201, 3400.0, 0.0006, 0.015, 3))
        .with_prices("INFY", generate_prices("2023-01-02", 201, 1450.0, -0.0002, 0.025, 7))
        .with_prices("HDFCBANK", generate_prices("2023-01-02", 201, 1600.0, 0.0004, 0.02, 11))
}

pub fn sample_codes() -> Vec<String> {
    ["RELIANCE", "TCS", "INFY", "HDFCBANK"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
