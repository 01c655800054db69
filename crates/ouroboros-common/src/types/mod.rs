//! Core value types for the learning core

pub mod agent;
pub mod experience;
pub mod feedback;
pub mod metrics;
pub mod strategy;
pub mod update;
