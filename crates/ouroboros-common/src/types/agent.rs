//! Agent performance snapshots and adaptation audit records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bounded::BoundedHistory;

/// Aggregate performance of one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPerformance {
    pub agent_id: Uuid,
    pub total_interactions: u64,
    /// EMA of the success indicator
    pub success_rate: f64,
    /// EMA of interaction quality
    pub average_response_quality: f64,
    /// Quality EMA sampled every N interactions, oldest dropped first
    pub learning_curve: BoundedHistory<f64>,
    pub last_updated: DateTime<Utc>,
}

impl AgentPerformance {
    pub fn new(agent_id: Uuid, max_curve_length: usize) -> Self {
        Self {
            agent_id,
            total_interactions: 0,
            success_rate: 0.0,
            average_response_quality: 0.0,
            learning_curve: BoundedHistory::new(max_curve_length),
            last_updated: Utc::now(),
        }
    }
}

/// What an adaptation changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdaptationEventType {
    /// Stagnating with little exploration: explore more, learn faster
    ExplorationBoost,
    /// Performance declining: learning rate halved
    ParameterTuning,
    /// Performing well: exploration reduced
    ExploitationShift,
    /// Stagnating despite exploration: learning rate raised
    PlateauEscape,
    /// No specific signal: small learning-rate decay
    Nudge,
    /// An externally proposed strategy was installed
    StrategyAdoption,
    /// A previous strategy was restored
    Rollback,
}

impl std::fmt::Display for AdaptationEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExplorationBoost => write!(f, "exploration_boost"),
            Self::ParameterTuning => write!(f, "parameter_tuning"),
            Self::ExploitationShift => write!(f, "exploitation_shift"),
            Self::PlateauEscape => write!(f, "plateau_escape"),
            Self::Nudge => write!(f, "nudge"),
            Self::StrategyAdoption => write!(f, "strategy_adoption"),
            Self::Rollback => write!(f, "rollback"),
        }
    }
}

/// Audit record of one adaptation.
///
/// Created with `after_metrics = None`; completed later through
/// [`AdaptationEvent::with_after_metrics`] once the effect has been measured
/// or the adaptation was rolled back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptationEvent {
    pub id: Uuid,
    pub agent_id: Uuid,
    pub event_type: AdaptationEventType,
    pub description: String,
    pub before_metrics: AgentPerformance,
    pub after_metrics: Option<AgentPerformance>,
    pub timestamp: DateTime<Utc>,
}

impl AdaptationEvent {
    pub fn new(
        agent_id: Uuid,
        event_type: AdaptationEventType,
        description: impl Into<String>,
        before_metrics: AgentPerformance,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            agent_id,
            event_type,
            description: description.into(),
            before_metrics,
            after_metrics: None,
            timestamp: Utc::now(),
        }
    }

    /// Copy with the post-adaptation measurement filled in
    pub fn with_after_metrics(&self, after: AgentPerformance) -> Self {
        Self {
            after_metrics: Some(after),
            ..self.clone()
        }
    }

    pub fn is_completed(&self) -> bool {
        self.after_metrics.is_some()
    }

    /// Change in average response quality, once measured
    pub fn performance_delta(&self) -> Option<f64> {
        self.after_metrics
            .as_ref()
            .map(|after| after.average_response_quality - self.before_metrics.average_response_quality)
    }

    /// Whether quality improved, once measured
    pub fn was_beneficial(&self) -> Option<bool> {
        self.performance_delta().map(|delta| delta > 0.0)
    }
}
