//! Fixed-capacity replay buffer
//!
//! Ring of experiences with O(1) FIFO eviction and O(1) lookup by id.
//! Each experience is assigned a monotonically increasing sequence number;
//! its position in the ring is `seq - head_seq`, so eviction never has to
//! rewrite the index.

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, instrument};
use uuid::Uuid;

use ouroboros_common::{Experience, Result, ValidationError};

use super::{ExperienceStore, ReplayConfig};
use crate::telemetry::LearningTelemetry;

struct ReplayInner {
    entries: VecDeque<Experience>,
    /// Experience id -> sequence number
    index: HashMap<Uuid, u64>,
    /// Sequence number of `entries[0]`
    head_seq: u64,
    rng: StdRng,
}

impl ReplayInner {
    fn position(&self, id: &Uuid) -> Option<usize> {
        self.index
            .get(id)
            .map(|seq| (seq - self.head_seq) as usize)
    }

    fn evict_oldest(&mut self) -> Option<Experience> {
        let evicted = self.entries.pop_front()?;
        self.index.remove(&evicted.id);
        self.head_seq += 1;
        Some(evicted)
    }
}

/// In-memory replay buffer guarded by a single store-wide lock
pub struct ReplayBuffer {
    inner: Mutex<ReplayInner>,
    capacity: usize,
    priority_alpha: f64,
    telemetry: Option<Arc<LearningTelemetry>>,
}

impl ReplayBuffer {
    /// Create a buffer holding at most `capacity` experiences (minimum 1)
    pub fn new(capacity: usize) -> Self {
        Self::with_rng(capacity, StdRng::from_entropy())
    }

    /// Create a buffer with a deterministic sampling sequence
    pub fn with_seed(capacity: usize, seed: u64) -> Self {
        Self::with_rng(capacity, StdRng::seed_from_u64(seed))
    }

    pub fn from_config(config: &ReplayConfig) -> Self {
        Self {
            priority_alpha: config.priority_alpha,
            ..Self::new(config.capacity)
        }
    }

    fn with_rng(capacity: usize, rng: StdRng) -> Self {
        let capacity = capacity.max(1);
        Self {
            inner: Mutex::new(ReplayInner {
                entries: VecDeque::with_capacity(capacity),
                index: HashMap::with_capacity(capacity),
                head_seq: 0,
                rng,
            }),
            capacity,
            priority_alpha: ReplayConfig::default().priority_alpha,
            telemetry: None,
        }
    }

    /// Report buffer size through the given telemetry
    pub fn with_telemetry(mut self, telemetry: Arc<LearningTelemetry>) -> Self {
        self.telemetry = Some(telemetry);
        self
    }

    /// Prioritized sample using the configured exponent
    pub fn sample_batch(&self, n: usize) -> Vec<Experience> {
        self.sample_prioritized(n, self.priority_alpha)
    }

    /// Copy of all experiences, oldest first
    pub fn snapshot(&self) -> Vec<Experience> {
        self.inner.lock().entries.iter().cloned().collect()
    }

    fn report_size(&self, size: usize) {
        if let Some(telemetry) = &self.telemetry {
            telemetry.replay_size.set(size as i64);
        }
    }
}

impl ExperienceStore for ReplayBuffer {
    #[instrument(skip(self, experience), fields(id = %experience.id))]
    fn add(&self, mut experience: Experience) -> Result<()> {
        // Priorities assigned to the field directly skip the builder
        experience.set_priority(experience.priority);
        let size = {
            let mut inner = self.inner.lock();

            if inner.index.contains_key(&experience.id) {
                return Err(ValidationError::DuplicateExperience(experience.id).into());
            }

            if inner.entries.len() >= self.capacity {
                if let Some(evicted) = inner.evict_oldest() {
                    debug!(evicted = %evicted.id, "Evicted oldest experience");
                }
            }

            let seq = inner.head_seq + inner.entries.len() as u64;
            inner.index.insert(experience.id, seq);
            inner.entries.push_back(experience);
            inner.entries.len()
        };

        self.report_size(size);
        Ok(())
    }

    fn get(&self, id: &Uuid) -> Option<Experience> {
        let inner = self.inner.lock();
        inner
            .position(id)
            .and_then(|pos| inner.entries.get(pos).cloned())
    }

    fn sample(&self, n: usize) -> Vec<Experience> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let amount = n.min(inner.entries.len());
        if amount == 0 {
            return Vec::new();
        }

        rand::seq::index::sample(&mut inner.rng, inner.entries.len(), amount)
            .into_iter()
            .map(|i| inner.entries[i].clone())
            .collect()
    }

    fn sample_prioritized(&self, n: usize, alpha: f64) -> Vec<Experience> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let amount = n.min(inner.entries.len());
        if amount == 0 {
            return Vec::new();
        }

        let alpha = if alpha.is_finite() { alpha.max(0.0) } else { 0.0 };
        let mut candidates: Vec<usize> = (0..inner.entries.len()).collect();
        let mut weights: Vec<f64> = inner
            .entries
            .iter()
            .map(|e| e.priority.powf(alpha))
            .collect();

        let mut chosen = Vec::with_capacity(amount);
        for _ in 0..amount {
            let total: f64 = weights.iter().sum();
            let pick = if total > 0.0 && total.is_finite() {
                // Inverse CDF; rounding at the upper edge falls back to the last slot
                let target = inner.rng.gen::<f64>() * total;
                let mut cumulative = 0.0;
                weights
                    .iter()
                    .position(|w| {
                        cumulative += w;
                        target < cumulative
                    })
                    .unwrap_or(weights.len() - 1)
            } else {
                inner.rng.gen_range(0..candidates.len())
            };

            let index = candidates.swap_remove(pick);
            weights.swap_remove(pick);
            chosen.push(inner.entries[index].clone());
        }

        chosen
    }

    fn update_priority(&self, id: &Uuid, priority: f64) -> bool {
        let mut inner = self.inner.lock();
        match inner.position(id) {
            Some(pos) => match inner.entries.get_mut(pos) {
                Some(experience) => {
                    experience.set_priority(priority);
                    true
                }
                None => false,
            },
            None => false,
        }
    }

    fn clear(&self) {
        {
            let mut inner = self.inner.lock();
            let next_seq = inner.head_seq + inner.entries.len() as u64;
            inner.entries.clear();
            inner.index.clear();
            inner.head_seq = next_seq;
        }
        self.report_size(0);
    }

    fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}
