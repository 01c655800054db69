//! Experience replay
//!
//! Bounded in-memory record of interaction tuples for replay-based learning.

pub mod buffer;

pub use buffer::ReplayBuffer;

use ouroboros_common::{ConfigError, Experience, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trait for experience storage backends
pub trait ExperienceStore: Send + Sync {
    /// Append an experience, evicting the oldest entry when full
    fn add(&self, experience: Experience) -> Result<()>;

    /// Get an experience by ID
    fn get(&self, id: &Uuid) -> Option<Experience>;

    /// Up to `n` distinct experiences drawn uniformly without replacement
    fn sample(&self, n: usize) -> Vec<Experience>;

    /// Up to `n` distinct experiences drawn with probability ∝ priority^alpha
    fn sample_prioritized(&self, n: usize, alpha: f64) -> Vec<Experience>;

    /// Replace an experience's priority; false if the id is unknown
    fn update_priority(&self, id: &Uuid, priority: f64) -> bool;

    /// Drop all experiences
    fn clear(&self);

    /// Number of stored experiences
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of stored experiences
    fn capacity(&self) -> usize;
}

/// Replay buffer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayConfig {
    /// Maximum experiences held before FIFO eviction
    pub capacity: usize,
    /// Default priority exponent for prioritized sampling
    pub priority_alpha: f64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            capacity: crate::DEFAULT_REPLAY_CAPACITY,
            priority_alpha: 0.6,
        }
    }
}

impl ReplayConfig {
    /// Every out-of-range field as a separate error
    pub fn validate(&self) -> std::result::Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();
        if self.capacity == 0 {
            errors.push(ConfigError::new("replay.capacity", "must be greater than 0"));
        }
        if !self.priority_alpha.is_finite() || self.priority_alpha < 0.0 {
            errors.push(ConfigError::new(
                "replay.priority_alpha",
                format!("must be a non-negative number, got {}", self.priority_alpha),
            ));
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
    fn test_replay_config_validation() {
        assert!(ReplayConfig::default().validate().is_ok());

        let bad = ReplayConfig {
            capacity: 0,
            priority_alpha: -1.0,
        };
        let errors = bad.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
    }
}
