//! Gradient learner configuration

use ouroboros_common::ConfigError;
use serde::{Deserialize, Serialize};

/// Settings for [`super::GradientOnlineLearner`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientLearnerConfig {
    /// Base step size, in (0, 1]
    pub learning_rate: f64,
    /// Momentum coefficient, in [0, 1)
    pub momentum: f64,
    /// Rescale the step per parameter with an RMSProp-style running average
    pub adaptive_learning_rate: bool,
    /// Absolute bound on the momentum-blended gradient
    pub gradient_clip_threshold: f64,
    /// Merged updates below this confidence are dropped, in [0, 1]
    pub min_confidence_threshold: f64,
    /// Pending queue length that triggers an immediate apply step
    pub batch_accumulation_size: usize,
}

impl Default for GradientLearnerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.01,
            momentum: 0.9,
            adaptive_learning_rate: true,
            gradient_clip_threshold: 1.0,
            min_confidence_threshold: 0.1,
            batch_accumulation_size: 10,
        }
    }
}

impl GradientLearnerConfig {
    /// Small steps, heavy smoothing, strict gating
    pub fn conservative() -> Self {
        Self {
            learning_rate: 0.001,
            momentum: 0.95,
            adaptive_learning_rate: false,
            gradient_clip_threshold: 0.5,
            min_confidence_threshold: 0.5,
            batch_accumulation_size: 20,
        }
    }

    /// Large steps, light smoothing, permissive gating
    pub fn aggressive() -> Self {
        Self {
            learning_rate: 0.1,
            momentum: 0.8,
            adaptive_learning_rate: true,
            gradient_clip_threshold: 5.0,
            min_confidence_threshold: 0.05,
            batch_accumulation_size: 5,
        }
    }

    /// Every out-of-range field as a separate error
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            errors.push(ConfigError::new(
                "gradient.learning_rate",
                format!("must be in (0, 1], got {}", self.learning_rate),
            ));
        }
        if !(0.0..1.0).contains(&self.momentum) {
            errors.push(ConfigError::new(
                "gradient.momentum",
                format!("must be in [0, 1), got {}", self.momentum),
            ));
        }
        if !(self.gradient_clip_threshold > 0.0 && self.gradient_clip_threshold.is_finite()) {
            errors.push(ConfigError::new(
                "gradient.gradient_clip_threshold",
                format!("must be positive, got {}", self.gradient_clip_threshold),
            ));
        }
        if !(0.0..=1.0).contains(&self.min_confidence_threshold) {
            errors.push(ConfigError::new(
                "gradient.min_confidence_threshold",
                format!("must be in [0, 1], got {}", self.min_confidence_threshold),
            ));
        }
        if self.batch_accumulation_size == 0 {
            errors.push(ConfigError::new(
                "gradient.batch_accumulation_size",
                "must be greater than 0",
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
