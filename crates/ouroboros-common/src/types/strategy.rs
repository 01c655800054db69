//! LearningStrategy - a bundle of learning hyperparameters
//!
//! Strategies are immutable. Every `with_*` transition clamps its field into
//! the valid domain and returns a new value:
//!
//! - learning_rate ∈ (0, 1]
//! - exploration_rate ∈ [0, 1]
//! - discount_factor ∈ [0, 1]
//! - batch_size ≥ 1
//!
//! `id` identifies a lineage. Adapting a strategy keeps the id and bumps
//! `generation`; [`LearningStrategy::as_new_candidate`] starts a new lineage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::MIN_LEARNING_RATE;

/// Hyperparameter configuration for a learner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningStrategy {
    id: Uuid,
    name: String,
    generation: u32,
    learning_rate: f64,
    exploration_rate: f64,
    discount_factor: f64,
    batch_size: usize,
    parameters: HashMap<String, f64>,
}

impl Default for LearningStrategy {
    fn default() -> Self {
        Self::balanced()
    }
}

impl LearningStrategy {
    /// Create a strategy; every field is clamped into its domain
    pub fn new(
        name: impl Into<String>,
        learning_rate: f64,
        exploration_rate: f64,
        discount_factor: f64,
        batch_size: usize,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            generation: 0,
            learning_rate: 0.01,
            exploration_rate: 0.1,
            discount_factor: 0.95,
            batch_size: 32,
            parameters: HashMap::new(),
        }
        .with_learning_rate(learning_rate)
        .with_exploration_rate(exploration_rate)
        .with_discount_factor(discount_factor)
        .with_batch_size(batch_size)
    }

    pub fn balanced() -> Self {
        Self::new("balanced", 0.01, 0.1, 0.95, 32)
    }

    pub fn conservative() -> Self {
        Self::new("conservative", 0.001, 0.05, 0.99, 64)
    }

    pub fn aggressive() -> Self {
        Self::new("aggressive", 0.05, 0.3, 0.9, 16)
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        if learning_rate.is_finite() {
            self.learning_rate = learning_rate.clamp(MIN_LEARNING_RATE, 1.0);
        }
        self
    }

    pub fn with_exploration_rate(mut self, exploration_rate: f64) -> Self {
        if exploration_rate.is_finite() {
            self.exploration_rate = exploration_rate.clamp(0.0, 1.0);
        }
        self
    }

    pub fn with_discount_factor(mut self, discount_factor: f64) -> Self {
        if discount_factor.is_finite() {
            self.discount_factor = discount_factor.clamp(0.0, 1.0);
        }
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Attach a free-form numeric parameter (non-finite values are ignored)
    pub fn with_parameter(mut self, key: impl Into<String>, value: f64) -> Self {
        if value.is_finite() {
            self.parameters.insert(key.into(), value);
        }
        self
    }

    /// Same lineage, next generation
    pub fn next_generation(mut self) -> Self {
        self.generation = self.generation.saturating_add(1);
        self
    }

    /// Copy under a fresh id, starting a new lineage
    pub fn as_new_candidate(mut self) -> Self {
        self.id = Uuid::new_v4();
        self.generation = 0;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn exploration_rate(&self) -> f64 {
        self.exploration_rate
    }

    pub fn discount_factor(&self) -> f64 {
        self.discount_factor
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn parameters(&self) -> &HashMap<String, f64> {
        &self.parameters
    }

    /// True when every field lies in its domain.
    ///
    /// Always true for strategies built through the constructors; a
    /// deserialized strategy may fail it.
    pub fn is_valid(&self) -> bool {
        self.learning_rate > 0.0
            && self.learning_rate <= 1.0
            && (0.0..=1.0).contains(&self.exploration_rate)
            && (0.0..=1.0).contains(&self.discount_factor)
            && self.batch_size > 0
    }

    /// Flat view of all hyperparameters for performance records
    pub fn hyperparameters(&self) -> HashMap<String, f64> {
        let mut map = self.parameters.clone();
        map.insert("learning_rate".to_string(), self.learning_rate);
        map.insert("exploration_rate".to_string(), self.exploration_rate);
        map.insert("discount_factor".to_string(), self.discount_factor);
        map.insert("batch_size".to_string(), self.batch_size as f64);
        map
    }
}

impl std::fmt::Display for LearningStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}#{} (lr={:.4}, explore={:.3}, gamma={:.3}, batch={})",
            self.name,
            self.generation,
            self.learning_rate,
            self.exploration_rate,
            self.discount_factor,
            self.batch_size
        )
    }
}

/// One scored observation of a strategy, kept for exploration bonuses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyPerformance {
    pub strategy_id: Uuid,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
    pub hyperparameters: HashMap<String, f64>,
}

impl StrategyPerformance {
    pub fn record(strategy: &LearningStrategy, score: f64) -> Self {
        Self {
            strategy_id: strategy.id(),
            score,
            timestamp: Utc::now(),
            hyperparameters: strategy.hyperparameters(),
        }
    }
}
