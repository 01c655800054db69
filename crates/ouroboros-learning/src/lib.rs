//! # Ouroboros Learning
//!
//! Adaptive learning core: components that let an AI agent improve its own
//! behaviour at runtime from interaction feedback.
//!
//! ## Components
//!
//! - **Experience replay** ([`replay`]): bounded FIFO store with uniform and
//!   priority-weighted sampling
//! - **Gradient learner** ([`gradient`]): confidence-gated online parameter
//!   updates with momentum, RMSProp scaling, and clipping
//! - **Meta-learner** ([`meta`]): regime classification, UCB-weighted
//!   strategy evaluation, and softmax selection
//! - **Agent** ([`agent`]): EMA performance tracking, adaptation triggers,
//!   and a LIFO rollback stack
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                    LearningRuntime                       │
//! │   apply loop ───────────┐         ┌──────── meta loop    │
//! │                         ▼         ▼                      │
//! │  ┌──────────────────┐  ┌──────────────┐  ┌────────────┐  │
//! │  │ GradientOnline   │  │ MetaLearner  │─▶│ Continuous │  │
//! │  │ Learner          │  │ (UCB+softmax)│  │ Agent      │  │
//! │  └──────────────────┘  └──────────────┘  └─────┬──────┘  │
//! │                                                │         │
//! │                                     ┌──────────┴──────┐  │
//! │                                     │  ReplayBuffer   │  │
//! │                                     └─────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod agent;
pub mod config;
pub mod gradient;
pub mod meta;
pub mod replay;
pub mod runtime;
pub mod telemetry;

// Re-export core types
pub use agent::{AdaptiveAgentConfig, ContinuouslyLearningAgent};
pub use config::{LearningServiceConfig, Preset};
pub use gradient::{GradientLearnerConfig, GradientOnlineLearner, OnlineLearner};
pub use meta::{LearningState, MetaLearner, MetaLearnerConfig};
pub use replay::{ExperienceStore, ReplayBuffer, ReplayConfig};
pub use runtime::{LearningRuntime, MetaOutcome, RuntimeHandle};
pub use telemetry::LearningTelemetry;

/// Service version
pub const LEARNING_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default replay buffer capacity
pub const DEFAULT_REPLAY_CAPACITY: usize = 10_000;

/// Default period of the background apply loop
pub const DEFAULT_APPLY_INTERVAL_MS: u64 = 1_000;

/// Default period of the meta-evaluation loop
pub const DEFAULT_META_INTERVAL_MS: u64 = 30_000;
