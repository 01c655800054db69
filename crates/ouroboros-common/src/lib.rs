//! # Ouroboros Common
//!
//! Shared value types, bounded histories, and errors for the Ouroboros
//! adaptive learning core.
//!
//! ## Core Types
//!
//! - [`Experience`]: state/action/reward/next-state tuple kept for replay
//! - [`Feedback`]: a single quality or preference signal fed to a learner
//! - [`LearningUpdate`]: a proposed parameter delta with its confidence
//! - [`LearningMetrics`] / [`OnlineLearningMetrics`]: incremental running statistics
//! - [`LearningStrategy`]: a bundle of learning hyperparameters
//! - [`AgentPerformance`] / [`AdaptationEvent`]: agent telemetry and audit records
//!
//! ## Collections
//!
//! - [`BoundedHistory`]: fixed-capacity deque with explicit oldest-first eviction

pub mod bounded;
pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use bounded::BoundedHistory;
pub use error::{ConfigError, LearningError, PreconditionError, Result, ValidationError};
pub use types::{
    agent::{AdaptationEvent, AdaptationEventType, AgentPerformance},
    experience::Experience,
    feedback::{Feedback, FeedbackType},
    metrics::{LearningMetrics, OnlineLearningMetrics},
    strategy::{LearningStrategy, StrategyPerformance},
    update::LearningUpdate,
};

/// Ouroboros version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Half-life of feedback confidence, in hours
pub const FEEDBACK_HALF_LIFE_HOURS: f64 = 1.0;

/// Smallest learning rate a strategy may hold (the domain is open at zero)
pub const MIN_LEARNING_RATE: f64 = 1e-6;

/// Smoothing factor for the convergence and efficiency EMAs in [`LearningMetrics`]
pub const METRICS_EMA_BETA: f64 = 0.1;
