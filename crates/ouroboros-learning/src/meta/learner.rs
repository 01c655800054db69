//! Meta-learner: strategy evaluation, selection, and adaptation
//!
//! Strategy evaluation combines four terms:
//!
//! ```text
//! score = performance(metrics)
//!       + exploration_weight × ucb_bonus(strategy)
//!       - 0.5 if the strategy is invalid
//!       + 0.1 × heuristic(strategy, metrics)
//!
//! ucb_bonus = sqrt(ln(total_visits + 1) / (visits + 1)), 1.0 if never seen
//! ```
//!
//! Selection samples from a temperature-scaled softmax over scores instead
//! of taking the argmax. Adaptation applies the regime rule from
//! [`LearningState::adjust`] and then multiplicative Gaussian jitter.

use ordered_float::OrderedFloat;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use ouroboros_common::{
    BoundedHistory, LearningMetrics, LearningStrategy, PreconditionError, Result,
    StrategyPerformance,
};

use super::{LearningState, MetaLearnerConfig};

/// Penalty applied to strategies with out-of-domain fields
const INVALID_STRATEGY_PENALTY: f64 = -0.5;
/// Weight of the domain heuristic in evaluation
const HEURISTIC_WEIGHT: f64 = 0.1;

struct MetaInner {
    history: HashMap<Uuid, BoundedHistory<StrategyPerformance>>,
    visits: HashMap<Uuid, u64>,
    total_visits: u64,
    rng: StdRng,
}

/// Adapts learning strategies from observed metrics
pub struct MetaLearner {
    config: MetaLearnerConfig,
    inner: Mutex<MetaInner>,
}

impl MetaLearner {
    pub fn new(config: MetaLearnerConfig) -> Result<Self> {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create a meta-learner with a deterministic random sequence
    pub fn with_seed(config: MetaLearnerConfig, seed: u64) -> Result<Self> {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: MetaLearnerConfig, rng: StdRng) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            inner: Mutex::new(MetaInner {
                history: HashMap::new(),
                visits: HashMap::new(),
                total_visits: 0,
                rng,
            }),
        })
    }

    pub fn config(&self) -> &MetaLearnerConfig {
        &self.config
    }

    pub fn classify_state(&self, metrics: &LearningMetrics) -> LearningState {
        LearningState::classify(metrics)
    }

    /// Scalar quality of a metrics snapshot: mean reward, penalized by spread,
    /// plus the improvement trend
    pub fn performance_score(metrics: &LearningMetrics) -> f64 {
        if metrics.total_episodes == 0 {
            return 0.0;
        }
        metrics.average_reward - 0.1 * metrics.reward_std()
            + metrics.learning_efficiency.clamp(-1.0, 1.0)
    }

    /// Score a raw reward sequence, e.g. from an offline evaluation run
    pub fn score_rewards(&self, rewards: &[f64]) -> f64 {
        Self::performance_score(&LearningMetrics::from_rewards(rewards))
    }

    /// Exploration bonus for a strategy lineage; 1.0 if never recorded
    pub fn ucb_bonus(&self, strategy_id: &Uuid) -> f64 {
        let inner = self.inner.lock();
        match inner.visits.get(strategy_id) {
            Some(&visits) => {
                (((inner.total_visits + 1) as f64).ln() / (visits + 1) as f64).sqrt()
            }
            None => 1.0,
        }
    }

    /// Rewards strategy/metric pairings that match domain intuition
    pub fn heuristic_score(strategy: &LearningStrategy, metrics: &LearningMetrics) -> f64 {
        let mut score = 0.0;

        // Fine steps once the mean has settled
        if metrics.convergence_rate < 0.05 && strategy.learning_rate() <= 0.01 {
            score += 1.0;
        }
        // Wide batches when rewards are noisy
        if metrics.reward_variance > 1.0 && strategy.batch_size() >= 64 {
            score += 1.0;
        }
        // Early on, exploration pays
        if metrics.total_episodes < 10 && strategy.exploration_rate() >= 0.2 {
            score += 0.5;
        }
        // Large steps while getting worse
        if metrics.learning_efficiency < 0.0 && strategy.learning_rate() > 0.05 {
            score -= 0.5;
        }

        score
    }

    pub fn evaluate_strategy(&self, strategy: &LearningStrategy, metrics: &LearningMetrics) -> f64 {
        let validity = if strategy.is_valid() {
            0.0
        } else {
            INVALID_STRATEGY_PENALTY
        };

        Self::performance_score(metrics)
            + self.config.exploration_weight * self.ucb_bonus(&strategy.id())
            + validity
            + HEURISTIC_WEIGHT * Self::heuristic_score(strategy, metrics)
    }

    /// Pick a candidate by softmax sampling over evaluation scores
    #[instrument(skip(self, candidates, metrics), fields(candidates = candidates.len()))]
    pub fn select_best_strategy(
        &self,
        candidates: &[LearningStrategy],
        metrics: &LearningMetrics,
    ) -> Result<LearningStrategy> {
        if candidates.is_empty() {
            return Err(PreconditionError::NoCandidates.into());
        }

        let mut ranked: Vec<(usize, f64)> = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| (i, self.evaluate_strategy(c, metrics)))
            .collect();
        ranked.sort_by_key(|(_, score)| std::cmp::Reverse(OrderedFloat(*score)));

        let top = ranked[0].1;
        let temperature = self.config.selection_temperature;
        let weights: Vec<f64> = ranked
            .iter()
            .map(|(_, score)| ((score - top) / temperature).exp())
            .collect();
        let total: f64 = weights.iter().sum();

        let target = self.inner.lock().rng.gen::<f64>() * total;
        let mut cumulative = 0.0;
        let slot = weights
            .iter()
            .position(|w| {
                cumulative += w;
                target < cumulative
            })
            .unwrap_or(weights.len() - 1);

        let (index, score) = ranked[slot];
        debug!(rank = slot, score, "Selected strategy");
        Ok(candidates[index].clone())
    }

    /// Record one scored observation of `strategy` under `metrics`
    pub fn record_performance(&self, strategy: &LearningStrategy, metrics: &LearningMetrics) {
        let record = StrategyPerformance::record(strategy, Self::performance_score(metrics));
        let limit = self.config.history_limit;

        let mut inner = self.inner.lock();
        inner
            .history
            .entry(strategy.id())
            .or_insert_with(|| BoundedHistory::new(limit))
            .push(record);
        *inner.visits.entry(strategy.id()).or_insert(0) += 1;
        inner.total_visits += 1;
    }

    /// Propose the next strategy for `current`.
    ///
    /// Records a performance snapshot of `current`, applies the regime rule,
    /// jitters every field, and re-clamps. The result keeps the lineage id
    /// and advances the generation.
    #[instrument(skip(self, current, metrics), fields(strategy = %current))]
    pub fn adapt_strategy(
        &self,
        current: &LearningStrategy,
        metrics: &LearningMetrics,
    ) -> LearningStrategy {
        self.record_performance(current, metrics);

        let state = self.classify_state(metrics);
        let adjusted = state.adjust(current);
        let adapted = self.jitter(adjusted).next_generation();

        info!(%state, adapted = %adapted, "Adapted strategy");
        adapted
    }

    /// The incumbent followed by `count - 1` jittered variants under fresh ids
    pub fn propose_candidates(&self, base: &LearningStrategy, count: usize) -> Vec<LearningStrategy> {
        let mut candidates = Vec::with_capacity(count);
        if count == 0 {
            return candidates;
        }
        candidates.push(base.clone());
        for _ in 1..count {
            candidates.push(self.jitter(base.clone()).as_new_candidate());
        }
        candidates
    }

    pub fn strategy_history(&self, strategy_id: &Uuid) -> Vec<StrategyPerformance> {
        self.inner
            .lock()
            .history
            .get(strategy_id)
            .map(|h| h.to_vec())
            .unwrap_or_default()
    }

    pub fn visit_count(&self, strategy_id: &Uuid) -> u64 {
        self.inner
            .lock()
            .visits
            .get(strategy_id)
            .copied()
            .unwrap_or(0)
    }

    fn jitter(&self, strategy: LearningStrategy) -> LearningStrategy {
        let mut inner = self.inner.lock();
        let lr_factor = gaussian(&mut inner.rng, 1.0, self.config.learning_rate_jitter);
        let explore_factor = gaussian(&mut inner.rng, 1.0, self.config.exploration_jitter);
        let discount_factor = gaussian(&mut inner.rng, 1.0, self.config.discount_jitter);
        drop(inner);

        let lr = strategy.learning_rate() * lr_factor;
        let explore = strategy.exploration_rate() * explore_factor;
        let discount = strategy.discount_factor() * discount_factor;

        strategy
            .with_learning_rate(lr)
            .with_exploration_rate(explore)
            .with_discount_factor(discount)
    }
}

/// Box-Muller normal sample
fn gaussian(rng: &mut StdRng, mean: f64, std_dev: f64) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mean + std_dev * z
}
