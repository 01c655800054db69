//! Prometheus metrics for the learning components
//!
//! Components take an optional `Arc<LearningTelemetry>`; nothing is recorded
//! unless one is attached.

use prometheus::{Gauge, IntCounter, IntGauge, Registry};

/// Counters and gauges shared by the learner, agent, and replay buffer
pub struct LearningTelemetry {
    pub feedback_processed: IntCounter,
    pub feedback_rejected: IntCounter,
    pub updates_applied: IntCounter,
    pub updates_gated: IntCounter,
    pub adaptations_total: IntCounter,
    pub rollbacks_total: IntCounter,
    pub ema_quality: Gauge,
    pub replay_size: IntGauge,
}

impl LearningTelemetry {
    pub fn new() -> prometheus::Result<Self> {
        Ok(Self {
            feedback_processed: IntCounter::new(
                "ouroboros_feedback_processed_total",
                "Feedback items accepted by the gradient learner",
            )?,
            feedback_rejected: IntCounter::new(
                "ouroboros_feedback_rejected_total",
                "Feedback items rejected by validation",
            )?,
            updates_applied: IntCounter::new(
                "ouroboros_updates_applied_total",
                "Merged parameter updates applied",
            )?,
            updates_gated: IntCounter::new(
                "ouroboros_updates_gated_total",
                "Merged parameter updates dropped below the confidence threshold",
            )?,
            adaptations_total: IntCounter::new(
                "ouroboros_adaptations_total",
                "Strategy adaptations performed by agents",
            )?,
            rollbacks_total: IntCounter::new(
                "ouroboros_rollbacks_total",
                "Strategy rollbacks performed by agents",
            )?,
            ema_quality: Gauge::new(
                "ouroboros_agent_ema_quality",
                "Exponential moving average of interaction quality",
            )?,
            replay_size: IntGauge::new(
                "ouroboros_replay_buffer_size",
                "Experiences currently held in the replay buffer",
            )?,
        })
    }

    pub fn register(&self, registry: &Registry) -> prometheus::Result<()> {
        registry.register(Box::new(self.feedback_processed.clone()))?;
        registry.register(Box::new(self.feedback_rejected.clone()))?;
        registry.register(Box::new(self.updates_applied.clone()))?;
        registry.register(Box::new(self.updates_gated.clone()))?;
        registry.register(Box::new(self.adaptations_total.clone()))?;
        registry.register(Box::new(self.rollbacks_total.clone()))?;
        registry.register(Box::new(self.ema_quality.clone()))?;
        registry.register(Box::new(self.replay_size.clone()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_gather() {
        let registry = Registry::new();
        let telemetry = LearningTelemetry::new().unwrap();
        telemetry.register(&registry).unwrap();

        telemetry.feedback_processed.inc();
        telemetry.replay_size.set(12);

        let families = registry.gather();
        assert_eq!(families.len(), 8);
        assert!(families
            .iter()
            .any(|f| f.get_name() == "ouroboros_replay_buffer_size"));
    }

    #[test]
    fn test_double_registration_fails() {
        let registry = Registry::new();
        let telemetry = LearningTelemetry::new().unwrap();
        telemetry.register(&registry).unwrap();
        assert!(telemetry.register(&registry).is_err());
    }
}
