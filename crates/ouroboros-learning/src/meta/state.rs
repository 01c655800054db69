//! Learning-regime classification and per-regime strategy rules

use ouroboros_common::{LearningMetrics, LearningStrategy};
use serde::{Deserialize, Serialize};

/// Episodes needed before any regime other than Exploring is considered
const MIN_EPISODES: u64 = 10;
/// Episodes before a flat learner may be called Stagnant
const STAGNANT_MIN_EPISODES: u64 = 50;

/// Regime the learner is currently in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LearningState {
    Exploring,
    Converging,
    Converged,
    Diverging,
    Stagnant,
}

impl LearningState {
    /// Classify metrics; conditions are checked in order, first match wins
    pub fn classify(metrics: &LearningMetrics) -> Self {
        if metrics.total_episodes < MIN_EPISODES {
            Self::Exploring
        } else if metrics.convergence_rate < 0.05 && metrics.reward_variance < 0.1 {
            Self::Converged
        } else if metrics.reward_variance > 1.0 && metrics.learning_efficiency < 0.0 {
            Self::Diverging
        } else if metrics.learning_efficiency.abs() < 0.001
            && metrics.total_episodes > STAGNANT_MIN_EPISODES
        {
            Self::Stagnant
        } else if metrics.convergence_rate < 0.2 && metrics.learning_efficiency > 0.0 {
            Self::Converging
        } else {
            Self::Exploring
        }
    }

    /// Deterministic adjustment for this regime, before any jitter
    pub fn adjust(&self, strategy: &LearningStrategy) -> LearningStrategy {
        let lr = strategy.learning_rate();
        let explore = strategy.exploration_rate();

        let (lr, explore) = match self {
            Self::Exploring => ((lr * 1.5).min(0.1), (explore * 1.2).min(0.5)),
            Self::Converging => (lr * 0.9, explore * 0.95),
            Self::Converged => (lr * 0.5, (explore * 0.5).max(0.01)),
            Self::Diverging => (lr * 0.3, (explore + 0.2).min(0.8)),
            Self::Stagnant => ((lr * 3.0).min(0.05), (explore + 0.3).min(0.7)),
        };

        strategy
            .clone()
            .with_learning_rate(lr)
            .with_exploration_rate(explore)
    }
}

impl std::fmt::Display for LearningState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exploring => write!(f, "exploring"),
            Self::Converging => write!(f, "converging"),
            Self::Converged => write!(f, "converged"),
            Self::Diverging => write!(f, "diverging"),
            Self::Stagnant => write!(f, "stagnant"),
        }
    }
}
