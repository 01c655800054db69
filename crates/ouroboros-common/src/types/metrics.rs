//! Running learning statistics
//!
//! Both metric types are updated incrementally through `with_new_*`
//! transitions that return a new value. Mean and variance use Welford's
//! algorithm; variance is the population variance (`M2 / n`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::METRICS_EMA_BETA;

/// Reward statistics consumed by the meta-learner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningMetrics {
    /// Number of observed episodes (rewards)
    pub total_episodes: u64,
    /// Running mean reward
    pub average_reward: f64,
    /// Population variance of rewards
    pub reward_variance: f64,
    /// EMA of |Δmean|; small values mean the mean has settled
    pub convergence_rate: f64,
    /// EMA of the signed relative improvement of the mean
    pub learning_efficiency: f64,
    /// When the metrics last changed
    pub last_updated: DateTime<Utc>,
    m2: f64,
}

impl Default for LearningMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl LearningMetrics {
    /// Empty metrics. Convergence starts at 1.0 (unknown, far from settled).
    pub fn new() -> Self {
        Self {
            total_episodes: 0,
            average_reward: 0.0,
            reward_variance: 0.0,
            convergence_rate: 1.0,
            learning_efficiency: 0.0,
            last_updated: Utc::now(),
            m2: 0.0,
        }
    }

    /// Metrics with explicit summary values, e.g. restored from a snapshot
    pub fn snapshot(
        total_episodes: u64,
        average_reward: f64,
        reward_variance: f64,
        convergence_rate: f64,
        learning_efficiency: f64,
    ) -> Self {
        Self {
            total_episodes,
            average_reward,
            reward_variance,
            convergence_rate,
            learning_efficiency,
            last_updated: Utc::now(),
            m2: reward_variance * total_episodes as f64,
        }
    }

    /// Batch constructor over a full reward sequence.
    ///
    /// Mean and variance are computed in two passes; the convergence and
    /// efficiency EMAs are replayed in order.
    pub fn from_rewards(rewards: &[f64]) -> Self {
        if rewards.is_empty() {
            return Self::new();
        }

        let replayed = rewards
            .iter()
            .fold(Self::new(), |metrics, &reward| metrics.with_new_reward(reward));

        let n = rewards.len() as f64;
        let mean = rewards.iter().sum::<f64>() / n;
        let m2: f64 = rewards.iter().map(|r| (r - mean).powi(2)).sum();

        Self {
            average_reward: mean,
            reward_variance: m2 / n,
            m2,
            ..replayed
        }
    }

    /// Fold one more reward into the statistics
    pub fn with_new_reward(&self, reward: f64) -> Self {
        let total_episodes = self.total_episodes + 1;
        let delta = reward - self.average_reward;
        let average_reward = self.average_reward + delta / total_episodes as f64;
        let m2 = self.m2 + delta * (reward - average_reward);

        let (convergence_rate, learning_efficiency) = if self.total_episodes == 0 {
            (self.convergence_rate, self.learning_efficiency)
        } else {
            let shift = average_reward - self.average_reward;
            let improvement = shift / (self.average_reward.abs() + 1.0);
            (
                (1.0 - METRICS_EMA_BETA) * self.convergence_rate + METRICS_EMA_BETA * shift.abs(),
                (1.0 - METRICS_EMA_BETA) * self.learning_efficiency + METRICS_EMA_BETA * improvement,
            )
        };

        Self {
            total_episodes,
            average_reward,
            reward_variance: m2 / total_episodes as f64,
            convergence_rate,
            learning_efficiency,
            last_updated: Utc::now(),
            m2,
        }
    }

    /// Standard deviation of rewards
    pub fn reward_std(&self) -> f64 {
        self.reward_variance.max(0.0).sqrt()
    }
}

/// Running statistics kept by the gradient learner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnlineLearningMetrics {
    /// Feedback items accepted
    pub feedback_count: u64,
    /// Running mean feedback score
    pub average_score: f64,
    /// Population variance of feedback scores
    pub score_variance: f64,
    /// EMA of mean gradient magnitude (convergence proxy)
    pub gradient_magnitude_ema: f64,
    /// Merged updates applied to parameters
    pub updates_applied: u64,
    /// Merged updates dropped by the confidence gate
    pub updates_gated: u64,
    /// When the metrics last changed
    pub last_updated: DateTime<Utc>,
    m2: f64,
}

impl Default for OnlineLearningMetrics {
    fn default() -> Self {
        Self {
            feedback_count: 0,
            average_score: 0.0,
            score_variance: 0.0,
            gradient_magnitude_ema: 0.0,
            updates_applied: 0,
            updates_gated: 0,
            last_updated: Utc::now(),
            m2: 0.0,
        }
    }
}

impl OnlineLearningMetrics {
    /// Fold one accepted feedback score and its mean gradient magnitude
    pub fn with_new_feedback(&self, score: f64, gradient_magnitude: f64) -> Self {
        let feedback_count = self.feedback_count + 1;
        let delta = score - self.average_score;
        let average_score = self.average_score + delta / feedback_count as f64;
        let m2 = self.m2 + delta * (score - average_score);

        let gradient_magnitude_ema = if self.feedback_count == 0 {
            gradient_magnitude
        } else {
            (1.0 - METRICS_EMA_BETA) * self.gradient_magnitude_ema
                + METRICS_EMA_BETA * gradient_magnitude
        };

        Self {
            feedback_count,
            average_score,
            score_variance: m2 / feedback_count as f64,
            gradient_magnitude_ema,
            last_updated: Utc::now(),
            m2,
            ..self.clone()
        }
    }

    /// Record the outcome of one apply step
    pub fn with_new_application(&self, applied: u64, gated: u64) -> Self {
        Self {
            updates_applied: self.updates_applied + applied,
            updates_gated: self.updates_gated + gated,
            last_updated: Utc::now(),
            ..self.clone()
        }
    }
}
