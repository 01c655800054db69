//! Online gradient learning
//!
//! Turns a stream of [`Feedback`] into bounded, confidence-gated parameter
//! deltas.

pub mod config;
pub mod learner;

pub use config::GradientLearnerConfig;
pub use learner::GradientOnlineLearner;

use ouroboros_common::{Feedback, LearningUpdate, Result};

/// Trait for learners that consume feedback online
pub trait OnlineLearner: Send + Sync {
    /// Compute and enqueue one update per tracked parameter
    fn process_feedback(&self, feedback: &Feedback) -> Result<Vec<LearningUpdate>>;

    /// Process many items; fails only if every item fails
    fn process_batch(&self, items: &[Feedback]) -> Result<Vec<LearningUpdate>>;

    /// Drain the pending queue into the parameter table; returns parameters updated
    fn apply_updates(&self) -> usize;

    /// Number of updates waiting for the next apply step
    fn pending_count(&self) -> usize;

    fn get_parameter(&self, name: &str) -> Option<f64>;

    /// Override a parameter directly, bypassing the gradient path
    fn set_parameter(&self, name: &str, value: f64) -> Result<()>;

    /// Clear learning dynamics while keeping learned parameter values
    fn reset_state(&self);
}
