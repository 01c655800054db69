//! Meta-learning: strategy adaptation
//!
//! Classifies the learning regime from accumulated [`LearningMetrics`] and
//! proposes revised [`LearningStrategy`] values.
//!
//! [`LearningMetrics`]: ouroboros_common::LearningMetrics
//! [`LearningStrategy`]: ouroboros_common::LearningStrategy

pub mod learner;
pub mod state;

pub use learner::MetaLearner;
pub use state::LearningState;

use ouroboros_common::ConfigError;
use serde::{Deserialize, Serialize};

/// Meta-learner settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaLearnerConfig {
    /// Weight of the UCB exploration bonus in strategy evaluation
    pub exploration_weight: f64,
    /// Performance records kept per strategy id
    pub history_limit: usize,
    /// Softmax temperature for strategy selection
    pub selection_temperature: f64,
    /// Std of the multiplicative learning-rate jitter
    pub learning_rate_jitter: f64,
    /// Std of the multiplicative exploration-rate jitter
    pub exploration_jitter: f64,
    /// Std of the multiplicative discount-factor jitter
    pub discount_jitter: f64,
}

impl Default for MetaLearnerConfig {
    fn default() -> Self {
        Self {
            exploration_weight: 0.2,
            history_limit: 100,
            selection_temperature: 0.5,
            learning_rate_jitter: 0.10,
            exploration_jitter: 0.05,
            discount_jitter: 0.02,
        }
    }
}

impl MetaLearnerConfig {
    /// Every out-of-range field as a separate error
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        if !(self.exploration_weight >= 0.0 && self.exploration_weight.is_finite()) {
            errors.push(ConfigError::new(
                "meta.exploration_weight",
                format!("must be non-negative, got {}", self.exploration_weight),
            ));
        }
        if self.history_limit == 0 {
            errors.push(ConfigError::new("meta.history_limit", "must be greater than 0"));
        }
        if !(self.selection_temperature > 0.0 && self.selection_temperature.is_finite()) {
            errors.push(ConfigError::new(
                "meta.selection_temperature",
                format!("must be positive, got {}", self.selection_temperature),
            ));
        }
        for (field, value) in [
            ("meta.learning_rate_jitter", self.learning_rate_jitter),
            ("meta.exploration_jitter", self.exploration_jitter),
            ("meta.discount_jitter", self.discount_jitter),
        ] {
            if !(0.0..=1.0).contains(&value) {
                errors.push(ConfigError::new(field, format!("must be in [0, 1], got {}", value)));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
