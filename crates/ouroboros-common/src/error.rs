//! Error types for the Ouroboros learning core
//!
//! Provides a unified error type and domain-specific error variants.
//! Every failure crossing a component boundary is one of these values;
//! only a mismatched [`crate::LearningUpdate`] merge panics.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using LearningError
pub type Result<T> = std::result::Result<T, LearningError>;

/// Unified error type for learning operations
#[derive(Debug, Error)]
pub enum LearningError {
    // Bad input, nothing mutated
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // Operation invoked before the component is ready
    #[error("Precondition failed: {0}")]
    Precondition(#[from] PreconditionError),

    // Configuration rejected by validate()
    #[error("Invalid configuration: {}", join_config_errors(.0))]
    Config(Vec<ConfigError>),

    // Every item of a batch was rejected
    #[error("Batch failed: all {count} items rejected ({messages})")]
    BatchFailed { count: usize, messages: String },

    // Generic internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Input validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Required field is empty: {0}")]
    EmptyField(&'static str),

    #[error("{field} out of range: {value} not in [{min}, {max}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("{0} is not a finite number")]
    NotFinite(&'static str),

    #[error("Duplicate experience id: {0}")]
    DuplicateExperience(Uuid),

    #[error("Strategy {0} has fields outside their domain")]
    InvalidStrategy(Uuid),
}

/// Operate-before-ready errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PreconditionError {
    #[error("Not enough interactions: {have} of {required} required")]
    InsufficientInteractions { have: u64, required: u64 },

    #[error("Adaptation not found: {0}")]
    AdaptationNotFound(Uuid),

    #[error("Nothing to roll back: strategy stack is empty")]
    EmptyRollbackStack,

    #[error("No candidate strategies supplied")]
    NoCandidates,
}

/// A single out-of-range configuration field
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{field}: {message}")]
pub struct ConfigError {
    pub field: &'static str,
    pub message: String,
}

impl ConfigError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn join_config_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<Vec<ConfigError>> for LearningError {
    fn from(errors: Vec<ConfigError>) -> Self {
        LearningError::Config(errors)
    }
}

impl From<anyhow::Error> for LearningError {
    fn from(err: anyhow::Error) -> Self {
        LearningError::Internal(err.to_string())
    }
}

impl LearningError {
    /// True for errors caused by caller input rather than component state
    pub fn is_validation(&self) -> bool {
        matches!(self, LearningError::Validation(_) | LearningError::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LearningError::Validation(ValidationError::EmptyField("source_id"));
        assert!(err.to_string().contains("source_id"));
        assert!(err.is_validation());
    }

    #[test]
    fn test_precondition_error() {
        let err = PreconditionError::InsufficientInteractions {
            have: 2,
            required: 5,
        };
        assert!(err.to_string().contains("2 of 5"));
    }

    #[test]
    fn test_config_errors_are_listed() {
        let err = LearningError::from(vec![
            ConfigError::new("learning_rate", "must be in (0, 1]"),
            ConfigError::new("momentum", "must be in [0, 1)"),
        ]);
        let text = err.to_string();
        assert!(text.contains("learning_rate"));
        assert!(text.contains("momentum"));
    }
}
