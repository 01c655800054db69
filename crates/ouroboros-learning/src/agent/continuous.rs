//! Agent with EMA performance tracking and reversible strategy changes
//!
//! The agent moves through four behaviourally distinct phases:
//!
//! - accumulating: fewer than `min_interactions_before_adaptation`
//!   interactions, adaptation is refused
//! - stable: no trigger condition holds
//! - adapting: [`ContinuouslyLearningAgent::should_adapt`] is true
//! - rolled back: a previous strategy was restored from the stack
//!
//! Adaptation triggers, any of which suffices once past the gate:
//!
//! ```text
//! baseline - ema_quality           > adaptation_threshold
//! variance(window)                 < stagnation_variance_threshold   (full window only)
//! regression_slope(window)         < -adaptation_threshold / 10      (full window only)
//! ```

use chrono::Utc;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use ouroboros_common::{
    AdaptationEvent, AdaptationEventType, AgentPerformance, BoundedHistory, Experience,
    LearningMetrics, LearningStrategy, PreconditionError, Result, ValidationError,
};

use super::{AdaptiveAgentConfig, HIGH_QUALITY_THRESHOLD, LOW_EXPLORATION_RATE};
use crate::replay::{ExperienceStore, ReplayBuffer};
use crate::telemetry::LearningTelemetry;

/// Extra replay priority so zero-quality interactions stay sampleable
const PRIORITY_FLOOR: f64 = 0.1;

/// Trigger conditions evaluated over the current state
#[derive(Debug, Clone, Copy)]
struct Signals {
    baseline_drop: bool,
    stagnant: bool,
    negative_trend: bool,
}

impl Signals {
    fn any(&self) -> bool {
        self.baseline_drop || self.stagnant || self.negative_trend
    }

    fn declining(&self) -> bool {
        self.baseline_drop || self.negative_trend
    }
}

struct AgentState {
    performance: AgentPerformance,
    window: BoundedHistory<f64>,
    baseline_performance: f64,
    metrics: LearningMetrics,
    strategy: LearningStrategy,
    /// Previous strategies, tagged with the event that replaced them
    rollback_stack: BoundedHistory<(Uuid, LearningStrategy)>,
    history: BoundedHistory<AdaptationEvent>,
}

impl AgentState {
    fn signals(&self, config: &AdaptiveAgentConfig) -> Signals {
        let ema = self.performance.average_response_quality;
        let full = self.window.is_full();

        Signals {
            baseline_drop: self.baseline_performance - ema > config.adaptation_threshold,
            stagnant: full && window_variance(&self.window) < config.stagnation_variance_threshold,
            negative_trend: full
                && window_slope(&self.window) < -config.adaptation_threshold / 10.0,
        }
    }

    /// Install `strategy`, remembering the current one under a new event
    fn install(
        &mut self,
        strategy: LearningStrategy,
        event_type: AdaptationEventType,
        description: String,
    ) -> AdaptationEvent {
        let event = AdaptationEvent::new(
            self.performance.agent_id,
            event_type,
            description,
            self.performance.clone(),
        );

        let previous = std::mem::replace(&mut self.strategy, strategy);
        self.rollback_stack.push((event.id, previous));
        self.baseline_performance = self.performance.average_response_quality;
        self.record_event(event.clone());
        event
    }

    /// Append to the history; a stack entry whose event is evicted goes with it
    fn record_event(&mut self, event: AdaptationEvent) {
        if let Some(evicted) = self.history.push(event) {
            self.rollback_stack.retain(|(pushed_by, _)| *pushed_by != evicted.id);
        }
    }
}

/// Self-adapting agent composed over an experience store.
///
/// All mutable state sits behind one lock. The experience store has its own
/// lock and is never called while the agent's lock is held.
pub struct ContinuouslyLearningAgent {
    id: Uuid,
    config: AdaptiveAgentConfig,
    experiences: Arc<dyn ExperienceStore>,
    state: Mutex<AgentState>,
    telemetry: Option<Arc<LearningTelemetry>>,
}

impl ContinuouslyLearningAgent {
    /// Create an agent with the balanced strategy; the configuration is validated first
    pub fn new(config: AdaptiveAgentConfig) -> Result<Self> {
        Self::with_strategy(config, LearningStrategy::balanced())
    }

    pub fn with_strategy(config: AdaptiveAgentConfig, strategy: LearningStrategy) -> Result<Self> {
        config.validate()?;
        if !strategy.is_valid() {
            return Err(ValidationError::InvalidStrategy(strategy.id()).into());
        }

        let id = Uuid::new_v4();
        let experiences: Arc<dyn ExperienceStore> =
            Arc::new(ReplayBuffer::new(config.replay_capacity));

        Ok(Self {
            id,
            experiences,
            state: Mutex::new(AgentState {
                performance: AgentPerformance::new(id, config.max_learning_curve_length),
                window: BoundedHistory::new(config.stagnation_window_size),
                baseline_performance: 0.0,
                metrics: LearningMetrics::new(),
                strategy,
                rollback_stack: BoundedHistory::new(config.max_adaptation_history),
                history: BoundedHistory::new(config.max_adaptation_history),
            }),
            config,
            telemetry: None,
        })
    }

    /// Record experiences into `store` instead of a private buffer
    pub fn with_experience_store(mut self, store: Arc<dyn ExperienceStore>) -> Self {
        self.experiences = store;
        self
    }

    pub fn with_telemetry(mut self, telemetry: Arc<LearningTelemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &AdaptiveAgentConfig {
        &self.config
    }

    /// Record one completed interaction.
    ///
    /// Quality is clamped to [-1, 1]. The first observation initializes both
    /// EMAs and the baseline instead of blending with zero.
    #[instrument(skip(self, input, output), fields(agent_id = %self.id))]
    pub fn record_interaction(&self, input: &str, output: &str, quality: f64) -> Result<()> {
        if input.trim().is_empty() {
            return Err(ValidationError::EmptyField("input").into());
        }
        if output.trim().is_empty() {
            return Err(ValidationError::EmptyField("output").into());
        }
        if !quality.is_finite() {
            return Err(ValidationError::NotFinite("quality").into());
        }

        let quality = quality.clamp(-1.0, 1.0);
        let experience = Experience::new(input, output, quality, output)
            .with_priority(quality.abs() + PRIORITY_FLOOR)
            .with_metadata("agent_id", serde_json::json!(self.id.to_string()));
        self.experiences.add(experience)?;

        let ema = {
            let mut guard = self.state.lock();
            let state = &mut *guard;
            let alpha = self.config.ema_alpha;
            let success = if quality >= self.config.success_threshold {
                1.0
            } else {
                0.0
            };

            let perf = &mut state.performance;
            if perf.total_interactions == 0 {
                perf.average_response_quality = quality;
                perf.success_rate = success;
            } else {
                perf.average_response_quality =
                    alpha * quality + (1.0 - alpha) * perf.average_response_quality;
                perf.success_rate = alpha * success + (1.0 - alpha) * perf.success_rate;
            }
            perf.total_interactions += 1;
            perf.last_updated = Utc::now();

            let ema = perf.average_response_quality;
            if perf.total_interactions % self.config.learning_curve_interval == 0 {
                perf.learning_curve.push(ema);
            }
            if perf.total_interactions == 1 {
                state.baseline_performance = ema;
            }

            state.window.push(quality);
            state.metrics = state.metrics.with_new_reward(quality);
            ema
        };

        if let Some(telemetry) = &self.telemetry {
            telemetry.ema_quality.set(ema);
        }
        debug!(quality, ema, "Recorded interaction");
        Ok(())
    }

    /// Whether any adaptation trigger holds past the interaction gate
    pub fn should_adapt(&self) -> bool {
        let state = self.state.lock();
        if state.performance.total_interactions < self.config.min_interactions_before_adaptation {
            return false;
        }
        state.signals(&self.config).any()
    }

    /// Change the strategy by the first matching rule.
    ///
    /// Rules in priority order:
    ///
    /// 1. stagnant with exploration under 0.05: exploration +0.1, learning rate ×1.5
    /// 2. declining baseline or negative trend: learning rate ×0.5
    /// 3. EMA quality over 0.8 with exploration over 0.05: exploration ×0.5
    /// 4. stagnant: learning rate ×1.2
    /// 5. otherwise: learning rate ×0.95
    ///
    /// The adapted strategy keeps its id and advances its generation. The
    /// previous strategy goes on the rollback stack and the baseline moves to
    /// the current EMA quality.
    #[instrument(skip(self), fields(agent_id = %self.id))]
    pub fn adapt(&self) -> Result<AdaptationEvent> {
        let event = {
            let mut state = self.state.lock();
            self.check_gate(&state)?;

            let signals = state.signals(&self.config);
            let ema = state.performance.average_response_quality;
            let current = state.strategy.clone();
            let lr = current.learning_rate();
            let explore = current.exploration_rate();

            let (event_type, adapted) = if signals.stagnant && explore < LOW_EXPLORATION_RATE {
                (
                    AdaptationEventType::ExplorationBoost,
                    current
                        .clone()
                        .with_exploration_rate(explore + 0.1)
                        .with_learning_rate(lr * 1.5),
                )
            } else if signals.declining() {
                (
                    AdaptationEventType::ParameterTuning,
                    current.clone().with_learning_rate(lr * 0.5),
                )
            } else if ema > HIGH_QUALITY_THRESHOLD && explore > LOW_EXPLORATION_RATE {
                (
                    AdaptationEventType::ExploitationShift,
                    current.clone().with_exploration_rate(explore * 0.5),
                )
            } else if signals.stagnant {
                (
                    AdaptationEventType::PlateauEscape,
                    current.clone().with_learning_rate(lr * 1.2),
                )
            } else {
                (
                    AdaptationEventType::Nudge,
                    current.clone().with_learning_rate(lr * 0.95),
                )
            };
            let adapted = adapted.next_generation();

            let description = format!("{}: {} -> {}", event_type, current, adapted);
            state.install(adapted, event_type, description)
        };

        if let Some(telemetry) = &self.telemetry {
            telemetry.adaptations_total.inc();
        }
        info!(event_id = %event.id, kind = %event.event_type, "Adapted strategy");
        Ok(event)
    }

    /// Install an externally chosen strategy, e.g. one selected by the meta-learner.
    ///
    /// Goes through the same rollback stack and history as [`Self::adapt`].
    #[instrument(skip(self, strategy, reason), fields(agent_id = %self.id, strategy = %strategy))]
    pub fn adopt_strategy(
        &self,
        strategy: LearningStrategy,
        reason: impl Into<String>,
    ) -> Result<AdaptationEvent> {
        if !strategy.is_valid() {
            return Err(ValidationError::InvalidStrategy(strategy.id()).into());
        }

        let event = self.state.lock().install(
            strategy,
            AdaptationEventType::StrategyAdoption,
            reason.into(),
        );

        if let Some(telemetry) = &self.telemetry {
            telemetry.adaptations_total.inc();
        }
        info!(event_id = %event.id, "Adopted strategy");
        Ok(event)
    }

    /// Restore the most recently replaced strategy.
    ///
    /// Restoration is LIFO: the top of the rollback stack is restored whatever
    /// `adaptation_id` names. When later adaptations happened after the named
    /// one, the restored strategy is the predecessor of the newest adaptation,
    /// not of `adaptation_id`, and a warning is logged. The named event is
    /// completed with the current performance, the baseline returns to that
    /// event's pre-adaptation quality, and a `Rollback` event is recorded.
    /// `Rollback` events themselves are not valid targets.
    #[instrument(skip(self), fields(agent_id = %self.id))]
    pub fn rollback(&self, adaptation_id: Uuid) -> Result<AdaptationEvent> {
        let event = {
            let mut state = self.state.lock();
            let state = &mut *state;

            let before_quality = state
                .history
                .iter()
                .find(|event| {
                    event.id == adaptation_id && event.event_type != AdaptationEventType::Rollback
                })
                .map(|event| event.before_metrics.average_response_quality)
                .ok_or(PreconditionError::AdaptationNotFound(adaptation_id))?;

            let (pushed_by, previous) = state
                .rollback_stack
                .pop_newest()
                .ok_or(PreconditionError::EmptyRollbackStack)?;
            if pushed_by != adaptation_id {
                warn!(
                    requested = %adaptation_id,
                    restored_from = %pushed_by,
                    "Rollback target is not the latest adaptation; restoring top of stack"
                );
            }

            let replaced = std::mem::replace(&mut state.strategy, previous);
            state.baseline_performance = before_quality;

            let current = state.performance.clone();
            if let Some(target) = state.history.find_mut(|event| event.id == adaptation_id) {
                *target = target.with_after_metrics(current.clone());
            }

            let event = AdaptationEvent::new(
                self.id,
                AdaptationEventType::Rollback,
                format!(
                    "rolled back {} to {} (requested {})",
                    replaced, state.strategy, adaptation_id
                ),
                current,
            );
            state.record_event(event.clone());
            event
        };

        if let Some(telemetry) = &self.telemetry {
            telemetry.rollbacks_total.inc();
        }
        info!(event_id = %event.id, "Rolled back strategy");
        Ok(event)
    }

    /// Adaptation that [`Self::should_rollback`] would undo, if any
    pub fn rollback_candidate(&self) -> Option<Uuid> {
        let state = self.state.lock();
        let (event_id, _) = state.rollback_stack.newest()?;
        let event = state
            .history
            .iter()
            .find(|event| event.id == *event_id && !event.is_completed())?;

        let regression = event.before_metrics.average_response_quality
            - state.performance.average_response_quality;
        (regression > self.config.rollback_threshold).then_some(event.id)
    }

    /// Whether quality fell by more than `rollback_threshold` since the
    /// latest still-open adaptation
    pub fn should_rollback(&self) -> bool {
        self.rollback_candidate().is_some()
    }

    /// Complete the newest open adaptation event with the current performance
    pub fn measure_last_adaptation(&self) -> Option<AdaptationEvent> {
        let mut state = self.state.lock();
        let current = state.performance.clone();
        let event = state.history.rfind_mut(|event| {
            event.event_type != AdaptationEventType::Rollback && !event.is_completed()
        })?;
        *event = event.with_after_metrics(current);
        debug!(event_id = %event.id, delta = ?event.performance_delta(), "Measured adaptation");
        Some(event.clone())
    }

    pub fn performance(&self) -> AgentPerformance {
        self.state.lock().performance.clone()
    }

    /// Reward statistics over every recorded quality
    pub fn learning_metrics(&self) -> LearningMetrics {
        self.state.lock().metrics.clone()
    }

    pub fn current_strategy(&self) -> LearningStrategy {
        self.state.lock().strategy.clone()
    }

    pub fn baseline_performance(&self) -> f64 {
        self.state.lock().baseline_performance
    }

    /// Adaptation events, oldest first
    pub fn adaptation_history(&self) -> Vec<AdaptationEvent> {
        self.state.lock().history.to_vec()
    }

    /// Number of strategies that can still be restored
    pub fn rollback_depth(&self) -> usize {
        self.state.lock().rollback_stack.len()
    }

    pub fn experiences(&self) -> Arc<dyn ExperienceStore> {
        Arc::clone(&self.experiences)
    }

    fn check_gate(&self, state: &AgentState) -> Result<()> {
        let have = state.performance.total_interactions;
        let required = self.config.min_interactions_before_adaptation;
        if have < required {
            return Err(PreconditionError::InsufficientInteractions { have, required }.into());
        }
        Ok(())
    }
}

/// Population variance
fn window_variance(window: &BoundedHistory<f64>) -> f64 {
    let n = window.len() as f64;
    if n == 0.0 {
        return 0.0;
    }
    let mean = window.iter().sum::<f64>() / n;
    window.iter().map(|q| (q - mean).powi(2)).sum::<f64>() / n
}

/// Least-squares slope against the sample index
fn window_slope(window: &BoundedHistory<f64>) -> f64 {
    let n = window.len() as f64;
    if n < 2.0 {
        return 0.0;
    }
    let x_mean = (n - 1.0) / 2.0;
    let y_mean = window.iter().sum::<f64>() / n;

    let (cov, var) = window
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(cov, var), (i, y)| {
            let dx = i as f64 - x_mean;
            (cov + dx * (y - y_mean), var + dx * dx)
        });
    cov / var
}

#[cfg(test)]
mod tests {
    use super::*;
    use ouroboros_common::LearningError;

    fn config(min_interactions: u64) -> AdaptiveAgentConfig {
        AdaptiveAgentConfig {
            min_interactions_before_adaptation: min_interactions,
            ..Default::default()
        }
    }

    fn feed(agent: &ContinuouslyLearningAgent, qualities: &[f64]) {
        for q in qualities {
            agent.record_interaction("prompt", "reply", *q).unwrap();
        }
    }

    fn alternating(a: f64, b: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| if i % 2 == 0 { a } else { b }).collect()
    }

    #[test]
    fn test_invalid_interactions_mutate_nothing() {
        let agent = ContinuouslyLearningAgent::new(config(5)).unwrap();

        assert!(agent.record_interaction("", "reply", 0.5).unwrap_err().is_validation());
        assert!(agent.record_interaction("prompt", "  ", 0.5).unwrap_err().is_validation());
        assert!(agent
            .record_interaction("prompt", "reply", f64::NAN)
            .unwrap_err()
            .is_validation());

        assert_eq!(agent.performance().total_interactions, 0);
        assert!(agent.experiences().is_empty());
    }

    #[test]
    fn test_quality_clamped_into_experience() {
        let agent = ContinuouslyLearningAgent::new(config(5)).unwrap();
        agent.record_interaction("prompt", "reply", 5.0).unwrap();

        let stored = agent.experiences().sample(1);
        assert_eq!(stored[0].reward, 1.0);
        assert!((stored[0].priority - 1.1).abs() < 1e-12);
        assert_eq!(agent.performance().average_response_quality, 1.0);
    }

    #[test]
    fn test_first_observation_initializes_emas() {
        let agent = ContinuouslyLearningAgent::new(config(5)).unwrap();

        agent.record_interaction("prompt", "reply", 0.6).unwrap();
        let perf = agent.performance();
        assert_eq!(perf.average_response_quality, 0.6);
        assert_eq!(perf.success_rate, 1.0);
        assert_eq!(agent.baseline_performance(), 0.6);

        agent.record_interaction("prompt", "reply", 0.0).unwrap();
        let perf = agent.performance();
        assert!((perf.average_response_quality - 0.54).abs() < 1e-12);
        assert!((perf.success_rate - 0.9).abs() < 1e-12);
        assert_eq!(agent.baseline_performance(), 0.6);
    }

    #[test]
    fn test_learning_curve_is_downsampled() {
        let agent = ContinuouslyLearningAgent::new(config(5)).unwrap();
        feed(&agent, &[0.5; 25]);

        let perf = agent.performance();
        assert_eq!(perf.total_interactions, 25);
        assert_eq!(perf.learning_curve.len(), 2);
        assert_eq!(agent.learning_metrics().total_episodes, 25);
    }

    #[test]
    fn test_learning_curve_is_capped() {
        let agent = ContinuouslyLearningAgent::new(AdaptiveAgentConfig {
            max_learning_curve_length: 3,
            learning_curve_interval: 2,
            ..config(5)
        })
        .unwrap();
        let qualities: Vec<f64> = (0..10).map(|i| i as f64 / 10.0).collect();
        feed(&agent, &qualities);

        let perf = agent.performance();
        assert_eq!(perf.learning_curve.len(), 3);
        assert_eq!(perf.learning_curve.newest(), Some(&perf.average_response_quality));
        let curve = perf.learning_curve.to_vec();
        assert!(curve.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_adapt_refused_before_gate() {
        let agent = ContinuouslyLearningAgent::new(config(5)).unwrap();
        feed(&agent, &[0.5; 4]);

        assert!(!agent.should_adapt());
        match agent.adapt().unwrap_err() {
            LearningError::Precondition(PreconditionError::InsufficientInteractions {
                have,
                required,
            }) => {
                assert_eq!(have, 4);
                assert_eq!(required, 5);
            }
            other => panic!("unexpected error: {}", other),
        }
        assert!(agent.adaptation_history().is_empty());
    }

    #[test]
    fn test_stagnation_needs_full_window() {
        let agent = ContinuouslyLearningAgent::new(config(5)).unwrap();
        feed(&agent, &[0.5; 9]);
        assert!(!agent.should_adapt());

        feed(&agent, &[0.5]);
        assert!(agent.should_adapt());
    }

    #[test]
    fn test_negative_trend_triggers() {
        let agent = ContinuouslyLearningAgent::new(config(5)).unwrap();
        let qualities: Vec<f64> = (0..10).map(|i| 0.6 - 0.02 * i as f64).collect();
        feed(&agent, &qualities);
        assert!(agent.should_adapt());
    }

    #[test]
    fn test_exploration_boost_rule() {
        let strategy = LearningStrategy::balanced().with_exploration_rate(0.01);
        let agent = ContinuouslyLearningAgent::with_strategy(config(5), strategy.clone()).unwrap();
        feed(&agent, &[0.5; 10]);

        let event = agent.adapt().unwrap();
        let adapted = agent.current_strategy();
        assert_eq!(event.event_type, AdaptationEventType::ExplorationBoost);
        assert!((adapted.exploration_rate() - 0.11).abs() < 1e-12);
        assert!((adapted.learning_rate() - 0.015).abs() < 1e-12);
    }

    #[test]
    fn test_exploitation_shift_rule() {
        let agent = ContinuouslyLearningAgent::new(config(5)).unwrap();
        feed(&agent, &alternating(0.85, 0.95, 10));

        let event = agent.adapt().unwrap();
        assert_eq!(event.event_type, AdaptationEventType::ExploitationShift);
        assert!((agent.current_strategy().exploration_rate() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_plateau_escape_rule() {
        let agent = ContinuouslyLearningAgent::new(config(5)).unwrap();
        feed(&agent, &[0.5; 10]);

        let event = agent.adapt().unwrap();
        assert_eq!(event.event_type, AdaptationEventType::PlateauEscape);
        assert!((agent.current_strategy().learning_rate() - 0.012).abs() < 1e-12);
    }

    #[test]
    fn test_nudge_rule() {
        let agent = ContinuouslyLearningAgent::new(config(5)).unwrap();
        feed(&agent, &alternating(0.3, 0.5, 10));

        let event = agent.adapt().unwrap();
        assert_eq!(event.event_type, AdaptationEventType::Nudge);
        assert!((agent.current_strategy().learning_rate() - 0.0095).abs() < 1e-12);
    }

    #[test]
    fn test_adapt_keeps_lineage_and_moves_baseline() {
        let agent = ContinuouslyLearningAgent::new(config(5)).unwrap();
        let original = agent.current_strategy();
        feed(&agent, &[0.9; 5]);
        feed(&agent, &[0.1; 5]);

        agent.adapt().unwrap();

        let adapted = agent.current_strategy();
        assert_eq!(adapted.id(), original.id());
        assert_eq!(adapted.generation(), original.generation() + 1);
        assert_eq!(
            agent.baseline_performance(),
            agent.performance().average_response_quality
        );
        assert_eq!(agent.rollback_depth(), 1);
    }

    #[test]
    fn test_rollback_restores_and_completes_event() {
        let agent = ContinuouslyLearningAgent::new(config(5)).unwrap();
        let original = agent.current_strategy();
        feed(&agent, &[0.5; 10]);
        let event = agent.adapt().unwrap();
        feed(&agent, &[0.2; 3]);

        let rollback = agent.rollback(event.id).unwrap();

        assert_eq!(rollback.event_type, AdaptationEventType::Rollback);
        assert_eq!(agent.current_strategy(), original);
        assert_eq!(agent.baseline_performance(), 0.5);
        assert_eq!(agent.rollback_depth(), 0);

        let history = agent.adaptation_history();
        assert_eq!(history.len(), 2);
        assert!(history[0].is_completed());
        assert_eq!(history[0].was_beneficial(), Some(false));
    }

    #[test]
    fn test_rollback_errors() {
        let agent = ContinuouslyLearningAgent::new(config(5)).unwrap();
        feed(&agent, &[0.5; 10]);

        let unknown = agent.rollback(Uuid::new_v4()).unwrap_err();
        assert!(matches!(
            unknown,
            LearningError::Precondition(PreconditionError::AdaptationNotFound(_))
        ));

        let event = agent.adapt().unwrap();
        agent.rollback(event.id).unwrap();
        let empty = agent.rollback(event.id).unwrap_err();
        assert!(matches!(
            empty,
            LearningError::Precondition(PreconditionError::EmptyRollbackStack)
        ));
    }

    #[test]
    fn test_rollback_is_lifo() {
        let agent = ContinuouslyLearningAgent::new(config(5)).unwrap();
        feed(&agent, &[0.5; 10]);

        let s0 = agent.current_strategy();
        let first = agent.adapt().unwrap();
        let s1 = agent.current_strategy();
        agent.adapt().unwrap();
        agent.adapt().unwrap();

        // Top of stack is the strategy replaced by the third adaptation
        agent.rollback(first.id).unwrap();
        let restored = agent.current_strategy();
        assert_ne!(restored, s0);
        assert_ne!(restored, s1);
        assert_eq!(restored.generation(), 2);
    }

    #[test]
    fn test_stack_follows_history_eviction() {
        let config = AdaptiveAgentConfig {
            min_interactions_before_adaptation: 5,
            max_adaptation_history: 3,
            ..Default::default()
        };
        let agent = ContinuouslyLearningAgent::new(config).unwrap();
        feed(&agent, &[0.5; 10]);

        let a1 = agent.adapt().unwrap();
        let s1 = agent.current_strategy();
        let a2 = agent.adapt().unwrap();
        let a3 = agent.adapt().unwrap();

        agent.rollback(a3.id).unwrap();
        assert_eq!(agent.rollback_depth(), 1);
        assert!(agent.adaptation_history().iter().any(|e| e.id == a2.id));

        agent.rollback(a2.id).unwrap();
        assert_eq!(agent.current_strategy(), s1);
        assert_eq!(agent.rollback_depth(), 0);

        let err = agent.rollback(a1.id).unwrap_err();
        assert!(matches!(
            err,
            LearningError::Precondition(PreconditionError::AdaptationNotFound(_))
        ));
    }

    #[test]
    fn test_rollback_event_is_not_a_target() {
        let agent = ContinuouslyLearningAgent::new(config(5)).unwrap();
        feed(&agent, &[0.5; 10]);

        let first = agent.adapt().unwrap();
        let undo = agent.rollback(first.id).unwrap();
        agent.adapt().unwrap();
        let strategy = agent.current_strategy();

        let err = agent.rollback(undo.id).unwrap_err();
        assert!(matches!(
            err,
            LearningError::Precondition(PreconditionError::AdaptationNotFound(id)) if id == undo.id
        ));
        assert_eq!(agent.rollback_depth(), 1);
        assert_eq!(agent.current_strategy(), strategy);
        assert!(!agent
            .adaptation_history()
            .iter()
            .any(|e| e.id == undo.id && e.is_completed()));
    }

    #[test]
    fn test_should_rollback_after_regression() {
        let agent = ContinuouslyLearningAgent::new(config(5)).unwrap();
        feed(&agent, &[0.5; 10]);
        let event = agent.adapt().unwrap();
        assert!(!agent.should_rollback());

        feed(&agent, &[0.0]);
        assert!(!agent.should_rollback());

        feed(&agent, &[0.0; 3]);
        assert_eq!(agent.rollback_candidate(), Some(event.id));
    }

    #[test]
    fn test_measure_closes_event() {
        let agent = ContinuouslyLearningAgent::new(config(5)).unwrap();
        feed(&agent, &[0.5; 10]);
        agent.adapt().unwrap();
        feed(&agent, &[0.0; 5]);

        let measured = agent.measure_last_adaptation().unwrap();
        assert!(measured.performance_delta().unwrap() < 0.0);
        assert!(!agent.should_rollback());
        assert!(agent.measure_last_adaptation().is_none());
    }

    #[test]
    fn test_adopt_strategy() {
        let agent = ContinuouslyLearningAgent::new(config(5)).unwrap();
        let original = agent.current_strategy();
        let proposed = LearningStrategy::conservative();

        let event = agent.adopt_strategy(proposed.clone(), "meta-learner pick").unwrap();

        assert_eq!(event.event_type, AdaptationEventType::StrategyAdoption);
        assert_eq!(agent.current_strategy(), proposed);
        agent.rollback(event.id).unwrap();
        assert_eq!(agent.current_strategy(), original);
    }

    #[test]
    fn test_adopt_rejects_invalid_strategy() {
        let agent = ContinuouslyLearningAgent::new(config(5)).unwrap();
        let mut value = serde_json::to_value(LearningStrategy::balanced()).unwrap();
        value["exploration_rate"] = serde_json::json!(3.0);
        let invalid: LearningStrategy = serde_json::from_value(value).unwrap();

        assert!(agent.adopt_strategy(invalid, "bad").unwrap_err().is_validation());
        assert_eq!(agent.rollback_depth(), 0);
    }

    #[test]
    fn test_history_is_bounded() {
        let config = AdaptiveAgentConfig {
            min_interactions_before_adaptation: 5,
            max_adaptation_history: 3,
            ..Default::default()
        };
        let agent = ContinuouslyLearningAgent::new(config).unwrap();
        feed(&agent, &[0.5; 10]);

        let first = agent.adapt().unwrap();
        for _ in 0..4 {
            agent.adapt().unwrap();
        }

        let history = agent.adaptation_history();
        assert_eq!(history.len(), 3);
        assert!(history.iter().all(|e| e.id != first.id));
        assert_eq!(agent.rollback_depth(), 3);
    }

    #[test]
    fn test_telemetry_counts() {
        let telemetry = Arc::new(LearningTelemetry::new().unwrap());
        let agent = ContinuouslyLearningAgent::new(config(5))
            .unwrap()
            .with_telemetry(Arc::clone(&telemetry));
        feed(&agent, &[0.5; 10]);

        let event = agent.adapt().unwrap();
        agent.rollback(event.id).unwrap();

        assert_eq!(telemetry.adaptations_total.get(), 1);
        assert_eq!(telemetry.rollbacks_total.get(), 1);
        assert!((telemetry.ema_quality.get() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_concurrent_interactions() {
        let agent = Arc::new(ContinuouslyLearningAgent::new(config(5)).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let agent = Arc::clone(&agent);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let input = format!("prompt-{}-{}", t, i);
                        agent.record_interaction(&input, "reply", 0.5).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(agent.performance().total_interactions, 400);
        assert_eq!(agent.experiences().len(), 400);
        assert_eq!(agent.learning_metrics().total_episodes, 400);
    }

    #[test]
    fn test_window_statistics() {
        let mut window = BoundedHistory::new(4);
        for q in [1.0, 2.0, 3.0, 4.0] {
            window.push(q);
        }
        assert!((window_variance(&window) - 1.25).abs() < 1e-12);
        assert!((window_slope(&window) - 1.0).abs() < 1e-12);
    }
}
