//! Feedback - a single quality or preference signal
//!
//! Feedback is produced by pipeline steps or embodiment actions and consumed
//! once by a learner. It is immutable: constructors clamp the score into
//! [-1, 1] and the only transition is copying with additional tags.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Kind of feedback signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FeedbackType {
    /// Direct rating from a user or evaluator
    Explicit,
    /// Inferred from behaviour (dwell time, retries, abandonment)
    Implicit,
    /// The output was replaced by a preferred value
    Corrective,
    /// The output was preferred over an alternative
    Comparative,
}

impl FeedbackType {
    /// Gradient weight applied by the gradient learner
    pub fn gradient_weight(&self) -> f64 {
        match self {
            Self::Explicit => 1.0,
            Self::Corrective => 1.5,
            Self::Comparative => 0.8,
            Self::Implicit => 0.5,
        }
    }

    /// Confidence assigned to fresh feedback of this kind
    pub fn base_confidence(&self) -> f64 {
        match self {
            Self::Explicit => 1.0,
            Self::Corrective => 0.95,
            Self::Comparative => 0.8,
            Self::Implicit => 0.6,
        }
    }
}

impl std::fmt::Display for FeedbackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit => write!(f, "explicit"),
            Self::Implicit => write!(f, "implicit"),
            Self::Corrective => write!(f, "corrective"),
            Self::Comparative => write!(f, "comparative"),
        }
    }
}

/// A quality or preference signal about one produced output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    id: Uuid,
    source_id: String,
    input_context: String,
    output: String,
    score: f64,
    feedback_type: FeedbackType,
    timestamp: DateTime<Utc>,
    tags: Vec<String>,
}

impl Feedback {
    fn build(
        source_id: impl Into<String>,
        input_context: impl Into<String>,
        output: impl Into<String>,
        score: f64,
        feedback_type: FeedbackType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            source_id: source_id.into(),
            input_context: input_context.into(),
            output: output.into(),
            score: score.clamp(-1.0, 1.0),
            feedback_type,
            timestamp: Utc::now(),
            tags: Vec::new(),
        }
    }

    /// Direct rating; `score` is clamped into [-1, 1]
    pub fn explicit(
        source_id: impl Into<String>,
        input_context: impl Into<String>,
        output: impl Into<String>,
        score: f64,
    ) -> Self {
        Self::build(source_id, input_context, output, score, FeedbackType::Explicit)
    }

    /// Behavioural signal; `signal` is clamped into [-1, 1]
    pub fn implicit(
        source_id: impl Into<String>,
        input_context: impl Into<String>,
        output: impl Into<String>,
        signal: f64,
    ) -> Self {
        Self::build(source_id, input_context, output, signal, FeedbackType::Implicit)
    }

    /// The output was rejected in favour of `preferred`.
    ///
    /// Scores -1 and carries a `preferred:<value>` tag.
    pub fn corrective(
        source_id: impl Into<String>,
        input_context: impl Into<String>,
        output: impl Into<String>,
        preferred: &str,
    ) -> Self {
        Self::build(source_id, input_context, output, -1.0, FeedbackType::Corrective)
            .with_tag(format!("preferred:{}", preferred))
    }

    /// The output was chosen over `rejected` with the given strength.
    ///
    /// Carries a `rejected:<value>` tag; `strength` is clamped into [-1, 1].
    pub fn comparative(
        source_id: impl Into<String>,
        input_context: impl Into<String>,
        output: impl Into<String>,
        rejected: &str,
        strength: f64,
    ) -> Self {
        Self::build(source_id, input_context, output, strength, FeedbackType::Comparative)
            .with_tag(format!("rejected:{}", rejected))
    }

    /// Copy with an extra tag appended
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    /// Copy with a different timestamp (used when replaying recorded feedback)
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn input_context(&self) -> &str {
        &self.input_context
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn feedback_type(&self) -> FeedbackType {
        self.feedback_type
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Age in hours relative to `now`; feedback from the future counts as fresh
    pub fn age_hours(&self, now: DateTime<Utc>) -> f64 {
        let millis = (now - self.timestamp).num_milliseconds().max(0);
        millis as f64 / 3_600_000.0
    }

    /// Check the fields a learner relies on
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.source_id.trim().is_empty() {
            return Err(ValidationError::EmptyField("source_id"));
        }
        if self.input_context.trim().is_empty() {
            return Err(ValidationError::EmptyField("input_context"));
        }
        if !self.score.is_finite() {
            return Err(ValidationError::NotFinite("score"));
        }
        if !(-1.0..=1.0).contains(&self.score) {
            return Err(ValidationError::OutOfRange {
                field: "score",
                value: self.score,
                min: -1.0,
                max: 1.0,
            });
        }
        Ok(())
    }
}
