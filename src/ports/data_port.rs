//! Price data access port trait.

use crate::domain::error::EngineError;
use crate::domain::price::PricePoint;
use chrono::NaiveDate;

pub trait PriceDataPort {
    /// Daily closes for `code`, sorted by date. Bounds are inclusive; `None`
    /// leaves that side open.
    fn fetch_closes(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PricePoint>, EngineError>;

    fn list_symbols(&self) -> Result<Vec<String>, EngineError>;

    /// First date, last date and row count, or `None` when the code has no rows.
    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, EngineError>;
}
