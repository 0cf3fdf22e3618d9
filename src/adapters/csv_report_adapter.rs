//! CSV comparison report implementing ReportPort.
//!
//! One record per strategy in ranked order, followed by one record per
//! omitted strategy with empty metric fields.

use std::fs;
use std::path::Path;

use crate::domain::comparison::{Comparison, ComparisonRow, OmittedStrategy};
use crate::domain::error::EngineError;
use crate::domain::goal::GoalSpec;
use crate::ports::report_port::ReportPort;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ReportRecord {
    rank: Option<usize>,
    strategy: String,
    total_return: Option<f64>,
    annualized_return: Option<f64>,
    annualized_volatility: Option<f64>,
    sharpe_ratio: Option<f64>,
    sortino_ratio: Option<f64>,
    max_drawdown: Option<f64>,
    max_drawdown_days: Option<usize>,
    return_to_volatility: Option<f64>,
    required_cagr: Option<f64>,
    years_to_target: String,
    reaches_target: Option<bool>,
    final_value: Option<f64>,
    cash: Option<f64>,
    weights: String,
    note: String,
}

fn format_weights(row: &ComparisonRow) -> String {
    row.weights
        .iter()
        .map(|(code, w)| format!("{}:{:.4}", code, w))
        .collect::<Vec<_>>()
        .join(";")
}

impl ReportRecord {
    fn ranked(rank: usize, row: &ComparisonRow, goal: &GoalSpec) -> Self {
        let m = &row.metrics;
        let p = &row.projection;
        Self {
            rank: Some(rank),
            strategy: row.strategy.to_string(),
            total_return: Some(m.total_return),
            annualized_return: Some(m.annualized_return),
            annualized_volatility: Some(m.annualized_volatility),
            sharpe_ratio: Some(m.sharpe_ratio),
            sortino_ratio: Some(m.sortino_ratio),
            max_drawdown: Some(m.max_drawdown),
            max_drawdown_days: Some(m.max_drawdown_duration),
            return_to_volatility: Some(m.return_to_volatility()),
            required_cagr: Some(p.required_cagr),
            years_to_target: match p.years_to_target {
                Some(y) => format!("{:.2}", y),
                None => "never".to_string(),
            },
            reaches_target: Some(p.reaches_target_within(goal.horizon_years)),
            final_value: Some(p.final_value),
            cash: Some(row.weights.cash()),
            weights: format_weights(row),
            note: row
                .fallback
                .as_ref()
                .map(|f| format!("fell back to {}: {}", f.to, f.reason))
                .unwrap_or_default(),
        }
    }

    fn omitted(o: &OmittedStrategy) -> Self {
        Self {
            rank: None,
            strategy: o.strategy.to_string(),
            total_return: None,
            annualized_return: None,
            annualized_volatility: None,
            sharpe_ratio: None,
            sortino_ratio: None,
            max_drawdown: None,
            max_drawdown_days: None,
            return_to_volatility: None,
            required_cagr: None,
            years_to_target: String::new(),
            reaches_target: None,
            final_value: None,
            cash: None,
            weights: String::new(),
            note: format!("omitted: {}", o.reason),
        }
    }
}

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(
        &self,
        comparison: &Comparison,
        goal: &GoalSpec,
        output_path: &str,
    ) -> Result<(), EngineError> {
        let path = Path::new(output_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let report_err = |e: csv::Error| EngineError::Report {
            reason: format!("{}: {}", output_path, e),
        };
        let mut wtr = csv::Writer::from_path(path).map_err(report_err)?;

        for (i, row) in comparison.rows.iter().enumerate() {
            wtr.serialize(ReportRecord::ranked(i + 1, row, goal))
                .map_err(report_err)?;
        }
        for o in &comparison.omitted {
            wtr.serialize(ReportRecord::omitted(o)).map_err(report_err)?;
        }
        wtr.flush()?;

        tracing::info!(path = %output_path, rows = comparison.rows.len(), "wrote comparison report");
        Ok(())
    }
}
