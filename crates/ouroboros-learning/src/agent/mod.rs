//! Continuously-learning agent
//!
//! Tracks interaction quality with EMAs, decides when its learning strategy
//! needs to change, and keeps every change reversible through a rollback
//! stack.

pub mod config;
pub mod continuous;

pub use config::AdaptiveAgentConfig;
pub use continuous::ContinuouslyLearningAgent;

/// Exploration rate under which a stagnating agent is pushed to explore
pub const LOW_EXPLORATION_RATE: f64 = 0.05;

/// EMA quality above which the agent starts exploiting
pub const HIGH_QUALITY_THRESHOLD: f64 = 0.8;
