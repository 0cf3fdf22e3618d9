//! Domain error types.

use crate::domain::strategy::StrategyKind;

/// Top-level error type for stratfolio.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("no price data for {code}")]
    NoData { code: String },

    #[error("price data error: {reason}")]
    Data { reason: String },

    #[error(
        "insufficient data: {instruments} instruments with {observations} aligned returns, need at least 2 instruments and {min_history} returns"
    )]
    InsufficientData {
        instruments: usize,
        observations: usize,
        min_history: usize,
    },

    #[error("max weight {max_weight} cannot fully invest {instruments} instruments")]
    InfeasibleConstraints { max_weight: f64, instruments: usize },

    #[error("invalid goal: {reason}")]
    InvalidGoal { reason: String },

    #[error(transparent)]
    Strategy(#[from] StrategyError),

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&EngineError> for std::process::ExitCode {
    fn from(err: &EngineError) -> Self {
        let code: u8 = match err {
            EngineError::Io(_) | EngineError::Report { .. } => 1,
            EngineError::ConfigParse { .. }
            | EngineError::ConfigMissing { .. }
            | EngineError::ConfigInvalid { .. } => 2,
            EngineError::NoData { .. } | EngineError::Data { .. } => 3,
            EngineError::InsufficientData { .. } => 5,
            EngineError::InfeasibleConstraints { .. }
            | EngineError::InvalidGoal { .. }
            | EngineError::Strategy(_) => 6,
        };
        std::process::ExitCode::from(code)
    }
}

/// A single strategy could not produce an allocation.
///
/// Never fatal to a comparison run: the strategy is omitted and the reason
/// recorded.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StrategyError {
    #[error("{strategy}: empty universe")]
    EmptyUniverse { strategy: StrategyKind },

    #[error("{strategy}: {reason}")]
    Degenerate {
        strategy: StrategyKind,
        reason: String,
    },
}
