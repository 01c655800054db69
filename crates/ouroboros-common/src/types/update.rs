//! LearningUpdate - a proposed change to one learned parameter
//!
//! Updates live between a learner's "process" and "apply" steps. Several
//! updates for the same parameter are merged by confidence-weighted
//! averaging before they are applied.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A proposed delta for a single parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningUpdate {
    parameter_name: String,
    old_value: f64,
    new_value: f64,
    gradient: f64,
    confidence: f64,
}

impl LearningUpdate {
    /// Create an update; `confidence` is clamped into [0, 1] (NaN becomes 0)
    pub fn new(
        parameter_name: impl Into<String>,
        old_value: f64,
        new_value: f64,
        gradient: f64,
        confidence: f64,
    ) -> Self {
        let confidence = if confidence.is_nan() {
            0.0
        } else {
            confidence.clamp(0.0, 1.0)
        };
        Self {
            parameter_name: parameter_name.into(),
            old_value,
            new_value,
            gradient,
            confidence,
        }
    }

    pub fn parameter_name(&self) -> &str {
        &self.parameter_name
    }

    pub fn old_value(&self) -> f64 {
        self.old_value
    }

    pub fn new_value(&self) -> f64 {
        self.new_value
    }

    pub fn gradient(&self) -> f64 {
        self.gradient
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Absolute size of the proposed change
    pub fn magnitude(&self) -> f64 {
        (self.new_value - self.old_value).abs()
    }

    /// Merge two updates for the same parameter.
    ///
    /// `new_value` and `gradient` are averaged weighted by relative confidence;
    /// the merged confidence is the larger of the two. The earlier update's
    /// `old_value` is kept.
    ///
    /// # Panics
    ///
    /// Panics if the updates target different parameters.
    pub fn merge(&self, other: &LearningUpdate) -> LearningUpdate {
        assert_eq!(
            self.parameter_name, other.parameter_name,
            "cannot merge updates for different parameters"
        );

        let total = self.confidence + other.confidence;
        let (w_self, w_other) = if total > 0.0 {
            (self.confidence / total, other.confidence / total)
        } else {
            (0.5, 0.5)
        };

        LearningUpdate {
            parameter_name: self.parameter_name.clone(),
            old_value: self.old_value,
            new_value: self.new_value * w_self + other.new_value * w_other,
            gradient: self.gradient * w_self + other.gradient * w_other,
            confidence: self.confidence.max(other.confidence),
        }
    }

    /// Group updates by parameter and merge each group, keeping first-seen order.
    ///
    /// Each group is averaged in one pass weighted by confidence, so the
    /// result does not depend on arrival order. Groups whose confidences
    /// sum to zero fall back to a plain mean.
    pub fn merge_by_parameter(updates: impl IntoIterator<Item = LearningUpdate>) -> Vec<LearningUpdate> {
        let mut groups: Vec<MergeGroup> = Vec::new();
        let mut slots: HashMap<String, usize> = HashMap::new();

        for update in updates {
            match slots.get(&update.parameter_name) {
                Some(&slot) => groups[slot].absorb(&update),
                None => {
                    slots.insert(update.parameter_name.clone(), groups.len());
                    groups.push(MergeGroup::start(update));
                }
            }
        }

        groups.into_iter().map(MergeGroup::finish).collect()
    }
}

/// Running sums for one parameter during `merge_by_parameter`
struct MergeGroup {
    first: LearningUpdate,
    count: usize,
    weight: f64,
    weighted_value: f64,
    weighted_gradient: f64,
    value_sum: f64,
    gradient_sum: f64,
    max_confidence: f64,
}

impl MergeGroup {
    fn start(update: LearningUpdate) -> Self {
        let mut group = Self {
            count: 0,
            weight: 0.0,
            weighted_value: 0.0,
            weighted_gradient: 0.0,
            value_sum: 0.0,
            gradient_sum: 0.0,
            max_confidence: 0.0,
            first: update.clone(),
        };
        group.absorb(&update);
        group
    }

    fn absorb(&mut self, update: &LearningUpdate) {
        self.count += 1;
        self.weight += update.confidence;
        self.weighted_value += update.confidence * update.new_value;
        self.weighted_gradient += update.confidence * update.gradient;
        self.value_sum += update.new_value;
        self.gradient_sum += update.gradient;
        self.max_confidence = self.max_confidence.max(update.confidence);
    }

    fn finish(self) -> LearningUpdate {
        if self.count == 1 {
            return self.first;
        }
        let (new_value, gradient) = if self.weight > 0.0 {
            (
                self.weighted_value / self.weight,
                self.weighted_gradient / self.weight,
            )
        } else {
            let n = self.count as f64;
            (self.value_sum / n, self.gradient_sum / n)
        };

        LearningUpdate {
            parameter_name: self.first.parameter_name,
            old_value: self.first.old_value,
            new_value,
            gradient,
            confidence: self.max_confidence,
        }
    }
}
