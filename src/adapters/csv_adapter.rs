//! CSV file price adapter.
//!
//! Reads `<CODE>.csv` from a directory. The header must name a `date`
//! column (`YYYY-MM-DD`) and a `close` column; other columns are ignored.

use crate::domain::error::EngineError;
use crate::domain::price::PricePoint;
use crate::ports::data_port::PriceDataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }

    fn read_all(&self, code: &str) -> Result<Vec<PricePoint>, EngineError> {
        let path = self.csv_path(code);
        if !path.exists() {
            return Err(EngineError::NoData {
                code: code.to_string(),
            });
        }
        let content = fs::read_to_string(&path).map_err(|e| EngineError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers = rdr.headers().cloned().map_err(|e| EngineError::Data {
            reason: format!("{}: CSV header error: {}", path.display(), e),
        })?;
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| EngineError::Data {
                    reason: format!("{}: missing {} column", path.display(), name),
                })
        };
        let date_col = column("date")?;
        let close_col = column("close")?;

        let mut points = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| EngineError::Data {
                reason: format!("{}: CSV parse error: {}", path.display(), e),
            })?;

            let date_str = record.get(date_col).unwrap_or("").trim();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                EngineError::Data {
                    reason: format!("{}: invalid date {:?}: {}", path.display(), date_str, e),
                }
            })?;

            let close_str = record.get(close_col).unwrap_or("").trim();
            let close: f64 = close_str.parse().map_err(|e| EngineError::Data {
                reason: format!(
                    "{}: invalid close {:?} on {}: {}",
                    path.display(),
                    close_str,
                    date,
                    e
                ),
            })?;

            points.push(PricePoint::new(date, close));
        }

        points.sort_by_key(|p| p.date);
        Ok(points)
    }
}

impl PriceDataPort for CsvAdapter {
    fn fetch_closes(
        &self,
        code: &str,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<PricePoint>, EngineError> {
        let points = self
            .read_all(code)?
            .into_iter()
            .filter(|p| start_date.is_none_or(|s| p.date >= s))
            .filter(|p| end_date.is_none_or(|e| p.date <= e))
            .collect();
        Ok(points)
    }

    fn list_symbols(&self) -> Result<Vec<String>, EngineError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| EngineError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| EngineError::Data {
                reason: format!("directory entry error: {}", e),
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                if let Some(stem) = path.file_stem() {
                    symbols.push(stem.to_string_lossy().into_owned());
                }
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, EngineError> {
        let points = self.read_all(code)?;
        Ok(match (points.first(), points.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, points.len())),
            _ => None,
        })
    }
}
