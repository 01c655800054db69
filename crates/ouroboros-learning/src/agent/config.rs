//! Agent configuration

use ouroboros_common::ConfigError;
use serde::{Deserialize, Serialize};

/// Settings for [`super::ContinuouslyLearningAgent`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveAgentConfig {
    /// Quality drop below baseline that triggers adaptation
    pub adaptation_threshold: f64,
    /// Quality drop after an adaptation that warrants undoing it
    pub rollback_threshold: f64,
    /// Interactions required before any adaptation
    pub min_interactions_before_adaptation: u64,
    /// EMA smoothing factor for quality and success rate
    pub ema_alpha: f64,
    /// Recent qualities used for stagnation and trend detection
    pub stagnation_window_size: usize,
    /// Adaptation events kept, oldest dropped first
    pub max_adaptation_history: usize,
    /// Window variance below which the agent counts as stagnant
    pub stagnation_variance_threshold: f64,
    /// Points kept on the learning curve
    pub max_learning_curve_length: usize,
    /// Interactions between learning-curve samples
    pub learning_curve_interval: u64,
    /// Quality at or above which an interaction counts as a success
    pub success_threshold: f64,
    /// Capacity of the agent's experience buffer
    pub replay_capacity: usize,
}

impl Default for AdaptiveAgentConfig {
    fn default() -> Self {
        Self {
            adaptation_threshold: 0.1,
            rollback_threshold: 0.15,
            min_interactions_before_adaptation: 50,
            ema_alpha: 0.1,
            stagnation_window_size: 10,
            max_adaptation_history: 100,
            stagnation_variance_threshold: 0.001,
            max_learning_curve_length: 1_000,
            learning_curve_interval: 10,
            success_threshold: 0.5,
            replay_capacity: 1_000,
        }
    }
}

impl AdaptiveAgentConfig {
    /// Slow to adapt, quick to roll back
    pub fn conservative() -> Self {
        Self {
            adaptation_threshold: 0.2,
            rollback_threshold: 0.1,
            min_interactions_before_adaptation: 100,
            ema_alpha: 0.05,
            stagnation_window_size: 20,
            max_adaptation_history: 50,
            ..Default::default()
        }
    }

    /// Adapts early and tolerates temporary regressions
    pub fn aggressive() -> Self {
        Self {
            adaptation_threshold: 0.05,
            rollback_threshold: 0.25,
            min_interactions_before_adaptation: 20,
            ema_alpha: 0.2,
            stagnation_window_size: 5,
            max_adaptation_history: 200,
            ..Default::default()
        }
    }

    /// Every out-of-range field as a separate error
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("agent.adaptation_threshold", self.adaptation_threshold),
            ("agent.rollback_threshold", self.rollback_threshold),
        ] {
            if !(value > 0.0 && value <= 2.0) {
                errors.push(ConfigError::new(field, format!("must be in (0, 2], got {}", value)));
            }
        }
        if !(self.ema_alpha > 0.0 && self.ema_alpha <= 1.0) {
            errors.push(ConfigError::new(
                "agent.ema_alpha",
                format!("must be in (0, 1], got {}", self.ema_alpha),
            ));
        }
        if self.stagnation_window_size < 2 {
            errors.push(ConfigError::new(
                "agent.stagnation_window_size",
                format!("must be at least 2, got {}", self.stagnation_window_size),
            ));
        }
        if self.max_adaptation_history == 0 {
            errors.push(ConfigError::new(
                "agent.max_adaptation_history",
                "must be greater than 0",
            ));
        }
        if !(self.stagnation_variance_threshold >= 0.0 && self.stagnation_variance_threshold.is_finite()) {
            errors.push(ConfigError::new(
                "agent.stagnation_variance_threshold",
                format!("must be non-negative, got {}", self.stagnation_variance_threshold),
            ));
        }
        if self.max_learning_curve_length == 0 {
            errors.push(ConfigError::new(
                "agent.max_learning_curve_length",
                "must be greater than 0",
            ));
        }
        if self.learning_curve_interval == 0 {
            errors.push(ConfigError::new(
                "agent.learning_curve_interval",
                "must be greater than 0",
            ));
        }
        if !(-1.0..=1.0).contains(&self.success_threshold) {
            errors.push(ConfigError::new(
                "agent.success_threshold",
                format!("must be in [-1, 1], got {}", self.success_threshold),
            ));
        }
        if self.replay_capacity == 0 {
            errors.push(ConfigError::new("agent.replay_capacity", "must be greater than 0"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(AdaptiveAgentConfig::default().validate().is_ok());
        assert!(AdaptiveAgentConfig::conservative().validate().is_ok());
        assert!(AdaptiveAgentConfig::aggressive().validate().is_ok());
    }

    #[test]
    fn test_every_bad_field_reported() {
        let config = AdaptiveAgentConfig {
            adaptation_threshold: 0.0,
            rollback_threshold: f64::NAN,
            ema_alpha: 1.5,
            stagnation_window_size: 1,
            max_adaptation_history: 0,
            ..Default::default()
        };
        let errors = config.validate().unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![
                "agent.adaptation_threshold",
                "agent.rollback_threshold",
                "agent.ema_alpha",
                "agent.stagnation_window_size",
                "agent.max_adaptation_history",
            ]
        );
    }
}
