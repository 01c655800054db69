//! Gradient-based online learner
//!
//! Each feedback item produces one [`LearningUpdate`] per tracked parameter:
//!
//! ```text
//! gradient   = -score × type_weight
//! confidence = base_confidence(type) × 2^(-age_hours / half_life)
//! new_value  = old_value - learning_rate × gradient
//! ```
//!
//! Updates queue until `batch_accumulation_size` is reached (or the caller
//! applies them). Applying merges updates per parameter, drops those under
//! the confidence threshold, then steps each parameter with momentum,
//! optional RMSProp scaling, and gradient clipping.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use ouroboros_common::{
    Feedback, LearningError, LearningUpdate, OnlineLearningMetrics, Result, ValidationError,
    FEEDBACK_HALF_LIFE_HOURS,
};

use super::{GradientLearnerConfig, OnlineLearner};
use crate::telemetry::LearningTelemetry;

/// Parameter created when feedback arrives before any parameter exists
pub const DEFAULT_PARAMETER: &str = "bias";

/// Decay of the squared-gradient running average
const RMS_DECAY: f64 = 0.99;

/// Keeps the adaptive step finite when the running average is zero
const RMS_EPSILON: f64 = 1e-8;

struct LearnerState {
    pending: VecDeque<LearningUpdate>,
    metrics: OnlineLearningMetrics,
}

/// Online learner with momentum, adaptive step size, and confidence gating
pub struct GradientOnlineLearner {
    config: GradientLearnerConfig,
    parameters: DashMap<String, f64>,
    momentum: DashMap<String, f64>,
    squared_gradients: DashMap<String, f64>,
    state: Mutex<LearnerState>,
    telemetry: Option<Arc<LearningTelemetry>>,
}

impl GradientOnlineLearner {
    /// Create a learner; the configuration is validated first
    pub fn new(config: GradientLearnerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            parameters: DashMap::new(),
            momentum: DashMap::new(),
            squared_gradients: DashMap::new(),
            state: Mutex::new(LearnerState {
                pending: VecDeque::new(),
                metrics: OnlineLearningMetrics::default(),
            }),
            telemetry: None,
        })
    }

    pub fn with_telemetry(mut self, telemetry: Arc<LearningTelemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    pub fn config(&self) -> &GradientLearnerConfig {
        &self.config
    }

    /// Snapshot of all parameters, sorted by name
    pub fn parameters(&self) -> BTreeMap<String, f64> {
        self.parameters
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    /// Snapshot of the running metrics
    pub fn metrics(&self) -> OnlineLearningMetrics {
        self.state.lock().metrics.clone()
    }

    /// Queue externally computed updates for the next apply step
    pub fn submit_updates(&self, updates: impl IntoIterator<Item = LearningUpdate>) {
        let should_apply = {
            let mut state = self.state.lock();
            state.pending.extend(updates);
            state.pending.len() >= self.config.batch_accumulation_size
        };
        if should_apply {
            self.apply_updates();
        }
    }

    /// Start the background task draining the pending queue every `period`.
    ///
    /// The task exits once `shutdown` observes `true` or its sender is dropped.
    pub fn start_apply_loop(
        self: Arc<Self>,
        period: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let applied = self.apply_updates();
                        if applied > 0 {
                            debug!(applied, "Applied pending updates");
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            let applied = self.apply_updates();
            info!(applied, "Apply loop stopped");
        })
    }

    /// Confidence of a feedback item at `now`, halving every half-life
    pub fn confidence_for(&self, feedback: &Feedback, now: DateTime<Utc>) -> f64 {
        let age = feedback.age_hours(now) / FEEDBACK_HALF_LIFE_HOURS;
        feedback.feedback_type().base_confidence() * (-age * std::f64::consts::LN_2).exp()
    }

    /// Step one parameter with momentum, optional RMS scaling, and clipping
    fn apply_single(&self, update: &LearningUpdate) -> Result<()> {
        let name = update.parameter_name();
        let gradient = update.gradient();
        if !gradient.is_finite() {
            return Err(LearningError::Internal(format!(
                "non-finite gradient for parameter {}",
                name
            )));
        }

        let momentum = self.config.momentum;
        let blended = *self
            .momentum
            .entry(name.to_string())
            .and_modify(|m| *m = momentum * *m + (1.0 - momentum) * gradient)
            .or_insert(gradient);

        let effective_lr = if self.config.adaptive_learning_rate {
            let mean_square = *self
                .squared_gradients
                .entry(name.to_string())
                .and_modify(|s| *s = RMS_DECAY * *s + (1.0 - RMS_DECAY) * gradient * gradient)
                .or_insert(gradient * gradient);
            self.config.learning_rate / (mean_square.sqrt() + RMS_EPSILON)
        } else {
            self.config.learning_rate
        };

        let clip = self.config.gradient_clip_threshold;
        let step = effective_lr * blended.clamp(-clip, clip);

        self.parameters
            .entry(name.to_string())
            .and_modify(|value| *value -= step)
            .or_insert(update.old_value() - step);

        Ok(())
    }
}

impl OnlineLearner for GradientOnlineLearner {
    #[instrument(skip(self, feedback), fields(feedback_id = %feedback.id(), kind = %feedback.feedback_type()))]
    fn process_feedback(&self, feedback: &Feedback) -> Result<Vec<LearningUpdate>> {
        if let Err(err) = feedback.validate() {
            if let Some(telemetry) = &self.telemetry {
                telemetry.feedback_rejected.inc();
            }
            return Err(err.into());
        }

        if self.parameters.is_empty() {
            self.parameters
                .entry(DEFAULT_PARAMETER.to_string())
                .or_insert(0.0);
        }

        let gradient = -feedback.score() * feedback.feedback_type().gradient_weight();
        let confidence = self.confidence_for(feedback, Utc::now());
        let learning_rate = self.config.learning_rate;

        let mut updates: Vec<LearningUpdate> = self
            .parameters
            .iter()
            .map(|entry| {
                let old_value = *entry.value();
                LearningUpdate::new(
                    entry.key().clone(),
                    old_value,
                    old_value - learning_rate * gradient,
                    gradient,
                    confidence,
                )
            })
            .collect();
        updates.sort_by(|a, b| a.parameter_name().cmp(b.parameter_name()));

        if let Some(bad) = updates.iter().find(|u| !u.new_value().is_finite()) {
            return Err(LearningError::Internal(format!(
                "non-finite update for parameter {}",
                bad.parameter_name()
            )));
        }

        let should_apply = {
            let mut state = self.state.lock();
            state.pending.extend(updates.iter().cloned());
            state.metrics = state.metrics.with_new_feedback(feedback.score(), gradient.abs());
            state.pending.len() >= self.config.batch_accumulation_size
        };

        if let Some(telemetry) = &self.telemetry {
            telemetry.feedback_processed.inc();
        }
        debug!(updates = updates.len(), confidence, "Processed feedback");

        if should_apply {
            self.apply_updates();
        }

        Ok(updates)
    }

    #[instrument(skip(self, items), fields(items = items.len()))]
    fn process_batch(&self, items: &[Feedback]) -> Result<Vec<LearningUpdate>> {
        let mut accepted = Vec::new();
        let mut errors = Vec::new();

        for (index, feedback) in items.iter().enumerate() {
            match self.process_feedback(feedback) {
                Ok(updates) => accepted.extend(updates),
                Err(err) => {
                    warn!(index, feedback_id = %feedback.id(), error = %err, "Batch item rejected");
                    errors.push(err.to_string());
                }
            }
        }

        if !items.is_empty() && errors.len() == items.len() {
            return Err(LearningError::BatchFailed {
                count: errors.len(),
                messages: errors.join("; "),
            });
        }

        Ok(LearningUpdate::merge_by_parameter(accepted))
    }

    #[instrument(skip(self))]
    fn apply_updates(&self) -> usize {
        let drained: Vec<LearningUpdate> = {
            let mut state = self.state.lock();
            state.pending.drain(..).collect()
        };
        if drained.is_empty() {
            return 0;
        }

        let mut applied = 0u64;
        let mut gated = 0u64;

        for update in LearningUpdate::merge_by_parameter(drained) {
            if update.confidence() < self.config.min_confidence_threshold {
                debug!(
                    parameter = update.parameter_name(),
                    confidence = update.confidence(),
                    "Dropped low-confidence update"
                );
                gated += 1;
                continue;
            }

            match self.apply_single(&update) {
                Ok(()) => applied += 1,
                Err(err) => warn!(parameter = update.parameter_name(), error = %err, "Update not applied"),
            }
        }

        {
            let mut state = self.state.lock();
            state.metrics = state.metrics.with_new_application(applied, gated);
        }

        if let Some(telemetry) = &self.telemetry {
            telemetry.updates_applied.inc_by(applied);
            telemetry.updates_gated.inc_by(gated);
        }
        debug!(applied, gated, "Applied pending updates");

        applied as usize
    }

    fn pending_count(&self) -> usize {
        self.state.lock().pending.len()
    }

    fn get_parameter(&self, name: &str) -> Option<f64> {
        self.parameters.get(name).map(|value| *value)
    }

    fn set_parameter(&self, name: &str, value: f64) -> Result<()> {
        if name.trim().is_empty() {
            return Err(ValidationError::EmptyField("parameter_name").into());
        }
        if !value.is_finite() {
            return Err(ValidationError::NotFinite("parameter value").into());
        }
        self.parameters.insert(name.to_string(), value);
        Ok(())
    }

    fn reset_state(&self) {
        {
            let mut state = self.state.lock();
            state.pending.clear();
            state.metrics = OnlineLearningMetrics::default();
        }
        self.momentum.clear();
        self.squared_gradients.clear();
        debug!("Reset learner dynamics");
    }
}
