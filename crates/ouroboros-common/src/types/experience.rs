//! Experience - a replayable interaction tuple
//!
//! Experiences are owned by the store that holds them. Everything except
//! `priority` is fixed at construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Default replay priority for new experiences
pub const DEFAULT_PRIORITY: f64 = 1.0;

/// State/action/reward/next-state tuple used for replay-based learning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experience {
    /// Unique experience identifier
    pub id: Uuid,
    /// State observed before acting
    pub state: String,
    /// Action taken
    pub action: String,
    /// Reward received
    pub reward: f64,
    /// State observed after acting
    pub next_state: String,
    /// When the interaction happened
    pub timestamp: DateTime<Utc>,
    /// Free-form annotations
    pub metadata: HashMap<String, serde_json::Value>,
    /// Replay priority (non-negative)
    pub priority: f64,
}

impl Experience {
    /// Create a new experience with default priority
    pub fn new(
        state: impl Into<String>,
        action: impl Into<String>,
        reward: f64,
        next_state: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: state.into(),
            action: action.into(),
            reward,
            next_state: next_state.into(),
            timestamp: Utc::now(),
            metadata: HashMap::new(),
            priority: DEFAULT_PRIORITY,
        }
    }

    /// Set the replay priority; negative and non-finite values become zero
    pub fn with_priority(mut self, priority: f64) -> Self {
        self.priority = sanitize_priority(priority);
        self
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Update the priority in place
    pub fn set_priority(&mut self, priority: f64) {
        self.priority = sanitize_priority(priority);
    }
}

fn sanitize_priority(priority: f64) -> f64 {
    if priority.is_finite() {
        priority.max(0.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_experience() {
        let exp = Experience::new("s0", "a0", 0.5, "s1");
        assert_eq!(exp.state, "s0");
        assert_eq!(exp.priority, DEFAULT_PRIORITY);
        assert!(exp.metadata.is_empty());
    }

    #[test]
    fn test_priority_is_sanitized() {
        let exp = Experience::new("s", "a", 0.0, "s").with_priority(-3.0);
        assert_eq!(exp.priority, 0.0);

        let mut exp = exp.with_priority(f64::NAN);
        assert_eq!(exp.priority, 0.0);
        exp.set_priority(2.5);
        assert_eq!(exp.priority, 2.5);
    }

    #[test]
    fn test_metadata() {
        let exp = Experience::new("s", "a", 1.0, "s2")
            .with_metadata("agent", serde_json::json!("alpha"));
        assert_eq!(exp.metadata["agent"], serde_json::json!("alpha"));
    }
}
