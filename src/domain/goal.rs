//! Projection of a strategy's annualized return toward a capital target.

use crate::domain::error::EngineError;
use crate::domain::metrics::PerformanceMetrics;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalSpec {
    pub initial_capital: f64,
    pub target_capital: f64,
    pub horizon_years: u32,
}

impl Default for GoalSpec {
    fn default() -> Self {
        Self {
            initial_capital: 2_000_000.0,
            target_capital: 10_000_000.0,
            horizon_years: 10,
        }
    }
}

impl GoalSpec {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(self.initial_capital > 0.0 && self.initial_capital.is_finite()) {
            return Err(invalid("initial capital must be positive"));
        }
        if !(self.target_capital > self.initial_capital && self.target_capital.is_finite()) {
            return Err(invalid("target capital must exceed initial capital"));
        }
        if self.horizon_years < 1 {
            return Err(invalid("horizon must be at least one year"));
        }
        Ok(())
    }

    /// Constant annual growth rate that reaches the target at the horizon.
    pub fn required_cagr(&self) -> f64 {
        (self.target_capital / self.initial_capital).powf(1.0 / self.horizon_years as f64) - 1.0
    }
}

fn invalid(reason: &str) -> EngineError {
    EngineError::InvalidGoal {
        reason: reason.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectionPoint {
    pub year: u32,
    pub projected_value: f64,
    pub required_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GoalProjection {
    /// `None` when the annualized return is not positive: the target is
    /// never reached.
    pub years_to_target: Option<f64>,
    pub required_cagr: f64,
    pub projected_cagr: f64,
    pub final_value: f64,
    pub path: Vec<ProjectionPoint>,
}

impl GoalProjection {
    pub fn reaches_target_within(&self, horizon_years: u32) -> bool {
        self.years_to_target
            .is_some_and(|y| y <= horizon_years as f64)
    }
}

/// Projects the metrics' annualized return, compounded from the goal's
/// initial capital over its horizon.
pub fn project(
    metrics: &PerformanceMetrics,
    goal: &GoalSpec,
) -> Result<GoalProjection, EngineError> {
    project_rate(metrics.annualized_return, goal)
}

pub fn project_rate(annualized_return: f64, goal: &GoalSpec) -> Result<GoalProjection, EngineError> {
    goal.validate()?;

    let required_cagr = goal.required_cagr();
    let ratio = goal.target_capital / goal.initial_capital;
    let years_to_target = if annualized_return > 0.0 && annualized_return.is_finite() {
        Some(ratio.ln() / annualized_return.ln_1p())
    } else {
        None
    };

    let growth = (1.0 + annualized_return).max(0.0);
    let path: Vec<ProjectionPoint> = (0..=goal.horizon_years)
        .map(|year| ProjectionPoint {
            year,
            projected_value: goal.initial_capital * growth.powi(year as i32),
            required_value: goal.initial_capital * (1.0 + required_cagr).powi(year as i32),
        })
        .collect();
    let final_value = path
        .last()
        .map(|p| p.projected_value)
        .unwrap_or(goal.initial_capital);

    Ok(GoalProjection {
        years_to_target,
        required_cagr,
        projected_cagr: annualized_return,
        final_value,
        path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn five_times_at_seventeen_and_a_half_percent() {
        let metrics = PerformanceMetrics {
            total_return: 0.0,
            annualized_return: 0.175,
            annualized_volatility: 0.2,
            sharpe_ratio: 0.0,
            sortino_ratio: 0.0,
            max_drawdown: 0.0,
            max_drawdown_duration: 0,
        };
        let p = project(&metrics, &GoalSpec::default()).unwrap();
        let years = p.years_to_target.unwrap();
        assert!((years - 10.0).abs() < 0.05, "years = {}", years);
    }

    #[test]
    fn required_cagr_for_default_goal() {
        let p = project_rate(0.1, &GoalSpec::default()).unwrap();
        assert_relative_eq!(p.required_cagr, 5.0_f64.powf(0.1) - 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.required_cagr, 0.1746, epsilon = 1e-4);
    }

    #[test]
    fn path_spans_horizon() {
        let goal = GoalSpec {
            initial_capital: 100.0,
            target_capital: 200.0,
            horizon_years: 3,
        };
        let p = project_rate(0.1, &goal).unwrap();
        assert_eq!(p.path.len(), 4);
        assert_eq!(p.path[0].projected_value, 100.0);
        assert_relative_eq!(p.final_value, 133.1, epsilon = 1e-9);
        assert_relative_eq!(p.path[3].required_value, 200.0, epsilon = 1e-9);
    }

    #[test]
    fn non_positive_return_never_reaches_target() {
        for r in [0.0, -0.05, -1.0] {
            let p = project_rate(r, &GoalSpec::default()).unwrap();
            assert_eq!(p.years_to_target, None);
            assert!(!p.reaches_target_within(100));
        }
    }

    #[test]
    fn rejects_invalid_goals() {
        let bad = [
            GoalSpec {
                initial_capital: 0.0,
                ..GoalSpec::default()
            },
            GoalSpec {
                target_capital: 1_000_000.0,
                ..GoalSpec::default()
            },
            GoalSpec {
                horizon_years: 0,
                ..GoalSpec::default()
            },
        ];
        for goal in bad {
            assert!(matches!(
                project_rate(0.1, &goal),
                Err(EngineError::InvalidGoal { .. })
            ));
        }
    }
}
