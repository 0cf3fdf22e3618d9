//! Report generation port trait.

use crate::domain::comparison::Comparison;
use crate::domain::error::EngineError;
use crate::domain::goal::GoalSpec;

/// Port for writing comparison reports.
pub trait ReportPort {
    fn write(
        &self,
        comparison: &Comparison,
        goal: &GoalSpec,
        output_path: &str,
    ) -> Result<(), EngineError>;
}
