use thiserror::Error;

#[derive(Debug, Error)]
pub enum PvEconError {
    #[error("Invalid parameter: {field} — {reason}")]
    InvalidParameter { field: String, reason: String },

    #[error("Missing dependency: stage '{stage}' requires '{requires}' to be computed first")]
    MissingDependency { stage: String, requires: String },

    #[error("Division by zero in {context}")]
    DivideByZero { context: String },

    #[error("Computation unconverged: {function} — {reason}")]
    ComputationUnconverged { function: String, reason: String },

    #[error("Insufficient sample size: {available} log entries, at least {required} required")]
    InsufficientSampleSize { required: usize, available: usize },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PvEconError {
    /// Errors that degrade to an "unavailable" result field rather than
    /// aborting the stage.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PvEconError::ComputationUnconverged { .. }
                | PvEconError::InsufficientSampleSize { .. }
                | PvEconError::DivideByZero { .. }
        )
    }

    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        PvEconError::InvalidParameter {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for PvEconError {
    fn from(e: serde_json::Error) -> Self {
        PvEconError::Serialization(e.to_string())
    }
}
