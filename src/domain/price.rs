//! Closing-price observations.

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }

    /// Fractional change from `prev` to this close: (p[t] - p[t-1]) / p[t-1]
    pub fn return_from(&self, prev: &PricePoint) -> f64 {
        (self.close - prev.close) / prev.close
    }

    pub fn is_valid(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}
