//! Background learning runtime
//!
//! Wires the gradient learner, meta-learner, and agent together and drives
//! them from two tokio tasks:
//!
//! - the apply loop drains the learner's pending updates
//! - the meta loop rolls back regressions and, when the agent asks for
//!   adaptation, adopts a strategy chosen by the meta-learner

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use ouroboros_common::{AdaptationEvent, Result};

use crate::agent::ContinuouslyLearningAgent;
use crate::config::LearningServiceConfig;
use crate::gradient::GradientOnlineLearner;
use crate::meta::MetaLearner;
use crate::replay::{ExperienceStore, ReplayBuffer};
use crate::telemetry::LearningTelemetry;

/// Result of one meta-evaluation step
#[derive(Debug, Clone)]
pub enum MetaOutcome {
    /// Nothing to do
    Idle,
    /// A meta-learner pick was installed
    Adopted(AdaptationEvent),
    /// A regressed adaptation was undone
    RolledBack(AdaptationEvent),
}

/// Owns the learning components and their background tasks
pub struct LearningRuntime {
    learner: Arc<GradientOnlineLearner>,
    meta: Arc<MetaLearner>,
    agent: Arc<ContinuouslyLearningAgent>,
    experiences: Arc<ReplayBuffer>,
    apply_interval: Duration,
    meta_interval: Duration,
    candidate_count: usize,
}

impl LearningRuntime {
    /// Build every component from `config`, optionally reporting to `telemetry`
    pub fn from_config(
        config: &LearningServiceConfig,
        telemetry: Option<Arc<LearningTelemetry>>,
    ) -> Result<Self> {
        config.validate()?;

        let mut experiences = ReplayBuffer::from_config(&config.replay);
        let mut learner = GradientOnlineLearner::new(config.gradient.clone())?;
        let mut agent =
            ContinuouslyLearningAgent::with_strategy(config.agent.clone(), config.preset.strategy())?;

        if let Some(telemetry) = telemetry {
            experiences = experiences.with_telemetry(Arc::clone(&telemetry));
            learner = learner.with_telemetry(Arc::clone(&telemetry));
            agent = agent.with_telemetry(telemetry);
        }

        let experiences = Arc::new(experiences);
        let agent = agent.with_experience_store(Arc::clone(&experiences) as Arc<dyn ExperienceStore>);

        Ok(Self {
            learner: Arc::new(learner),
            meta: Arc::new(MetaLearner::new(config.meta.clone())?),
            agent: Arc::new(agent),
            experiences,
            apply_interval: Duration::from_millis(config.apply_interval_ms),
            meta_interval: Duration::from_millis(config.meta_interval_ms),
            candidate_count: config.candidate_count,
        })
    }

    pub fn learner(&self) -> &Arc<GradientOnlineLearner> {
        &self.learner
    }

    pub fn meta(&self) -> &Arc<MetaLearner> {
        &self.meta
    }

    pub fn agent(&self) -> &Arc<ContinuouslyLearningAgent> {
        &self.agent
    }

    pub fn experiences(&self) -> &Arc<ReplayBuffer> {
        &self.experiences
    }

    /// One meta-evaluation step.
    ///
    /// A pending rollback takes priority. Otherwise, if the agent wants to
    /// adapt, the previous adaptation is measured, the meta-learner adapts the
    /// current strategy, proposes variants around it, and the selected
    /// candidate is adopted.
    #[instrument(skip(self))]
    pub fn evaluate_once(&self) -> Result<MetaOutcome> {
        if let Some(adaptation_id) = self.agent.rollback_candidate() {
            let event = self.agent.rollback(adaptation_id)?;
            return Ok(MetaOutcome::RolledBack(event));
        }

        if !self.agent.should_adapt() {
            return Ok(MetaOutcome::Idle);
        }

        if let Some(measured) = self.agent.measure_last_adaptation() {
            debug!(event_id = %measured.id, delta = ?measured.performance_delta(), "Closed previous adaptation");
        }

        let metrics = self.agent.learning_metrics();
        let current = self.agent.current_strategy();
        let adapted = self.meta.adapt_strategy(&current, &metrics);
        let candidates = self.meta.propose_candidates(&adapted, self.candidate_count);
        let chosen = self.meta.select_best_strategy(&candidates, &metrics)?;

        let reason = format!(
            "meta-learner selected {} ({})",
            chosen,
            self.meta.classify_state(&metrics)
        );
        let event = self.agent.adopt_strategy(chosen, reason)?;
        Ok(MetaOutcome::Adopted(event))
    }

    /// Spawn the apply and meta loops
    pub fn spawn(self: Arc<Self>) -> RuntimeHandle {
        let (shutdown, receiver) = watch::channel(false);

        let apply = Arc::clone(&self.learner).start_apply_loop(self.apply_interval, receiver.clone());
        let meta = Arc::clone(&self).start_meta_loop(receiver);

        info!(
            apply_interval_ms = self.apply_interval.as_millis() as u64,
            meta_interval_ms = self.meta_interval.as_millis() as u64,
            "Learning runtime started"
        );

        RuntimeHandle {
            shutdown,
            tasks: vec![apply, meta],
        }
    }

    fn start_meta_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.meta_interval);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match self.evaluate_once() {
                            Ok(MetaOutcome::Idle) => {}
                            Ok(MetaOutcome::Adopted(event)) => {
                                info!(event_id = %event.id, "Adopted meta-learner strategy");
                            }
                            Ok(MetaOutcome::RolledBack(event)) => {
                                info!(event_id = %event.id, "Rolled back regressed strategy");
                            }
                            Err(e) => warn!(error = %e, "Meta evaluation failed"),
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Meta loop stopped");
        })
    }
}

/// Handle to the spawned loops
pub struct RuntimeHandle {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl RuntimeHandle {
    /// Signal both loops to stop and wait for them
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Runtime task ended abnormally");
            }
        }
        info!("Learning runtime stopped");
    }
}
