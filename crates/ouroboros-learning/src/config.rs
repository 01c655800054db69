//! Service configuration
//!
//! Starts from a named preset and applies `OUROBOROS_*` environment
//! overrides on top.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

use ouroboros_common::{ConfigError, LearningError, LearningStrategy, Result};

use crate::agent::AdaptiveAgentConfig;
use crate::gradient::GradientLearnerConfig;
use crate::meta::MetaLearnerConfig;
use crate::replay::ReplayConfig;

/// Named bundle of component settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preset {
    #[default]
    Default,
    Conservative,
    Aggressive,
}

impl Preset {
    /// Initial strategy for agents started under this preset
    pub fn strategy(&self) -> LearningStrategy {
        match self {
            Self::Default => LearningStrategy::balanced(),
            Self::Conservative => LearningStrategy::conservative(),
            Self::Aggressive => LearningStrategy::aggressive(),
        }
    }
}

impl FromStr for Preset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" | "balanced" => Ok(Self::Default),
            "conservative" => Ok(Self::Conservative),
            "aggressive" => Ok(Self::Aggressive),
            other => Err(format!("unknown preset '{}'", other)),
        }
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "default"),
            Self::Conservative => write!(f, "conservative"),
            Self::Aggressive => write!(f, "aggressive"),
        }
    }
}

/// Learning service configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningServiceConfig {
    /// Preset the component settings started from
    pub preset: Preset,
    /// Shared experience buffer
    pub replay: ReplayConfig,
    /// Gradient learner
    pub gradient: GradientLearnerConfig,
    /// Meta-learner
    pub meta: MetaLearnerConfig,
    /// Agent
    pub agent: AdaptiveAgentConfig,
    /// Period of the background apply loop
    pub apply_interval_ms: u64,
    /// Period of the meta-evaluation loop
    pub meta_interval_ms: u64,
    /// Strategies proposed per meta-evaluation, incumbent included
    pub candidate_count: usize,
}

impl Default for LearningServiceConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Default)
    }
}

impl LearningServiceConfig {
    pub fn from_preset(preset: Preset) -> Self {
        let (gradient, agent) = match preset {
            Preset::Default => (GradientLearnerConfig::default(), AdaptiveAgentConfig::default()),
            Preset::Conservative => (
                GradientLearnerConfig::conservative(),
                AdaptiveAgentConfig::conservative(),
            ),
            Preset::Aggressive => (
                GradientLearnerConfig::aggressive(),
                AdaptiveAgentConfig::aggressive(),
            ),
        };

        Self {
            preset,
            replay: ReplayConfig::default(),
            gradient,
            meta: MetaLearnerConfig::default(),
            agent,
            apply_interval_ms: crate::DEFAULT_APPLY_INTERVAL_MS,
            meta_interval_ms: crate::DEFAULT_META_INTERVAL_MS,
            candidate_count: 4,
        }
    }

    /// Load configuration from `.env` and the process environment
    pub fn load() -> Result<Self> {
        // Try to load .env file
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source and validate it
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut errors = Vec::new();

        let preset = match lookup("OUROBOROS_PRESET") {
            Some(raw) => raw.parse().unwrap_or_else(|message| {
                errors.push(ConfigError::new("preset", message));
                Preset::Default
            }),
            None => Preset::Default,
        };
        let mut cfg = Self::from_preset(preset);

        let mut overrides = Overrides {
            lookup: &lookup,
            errors: &mut errors,
        };

        // Replay settings
        overrides.apply("OUROBOROS_REPLAY_CAPACITY", "replay.capacity", &mut cfg.replay.capacity);
        overrides.apply(
            "OUROBOROS_REPLAY_PRIORITY_ALPHA",
            "replay.priority_alpha",
            &mut cfg.replay.priority_alpha,
        );

        // Gradient settings
        overrides.apply(
            "OUROBOROS_LEARNING_RATE",
            "gradient.learning_rate",
            &mut cfg.gradient.learning_rate,
        );
        overrides.apply("OUROBOROS_MOMENTUM", "gradient.momentum", &mut cfg.gradient.momentum);
        overrides.apply(
            "OUROBOROS_MIN_CONFIDENCE",
            "gradient.min_confidence_threshold",
            &mut cfg.gradient.min_confidence_threshold,
        );
        overrides.apply(
            "OUROBOROS_BATCH_SIZE",
            "gradient.batch_accumulation_size",
            &mut cfg.gradient.batch_accumulation_size,
        );

        // Meta settings
        overrides.apply(
            "OUROBOROS_EXPLORATION_WEIGHT",
            "meta.exploration_weight",
            &mut cfg.meta.exploration_weight,
        );

        // Agent settings
        overrides.apply(
            "OUROBOROS_ADAPTATION_THRESHOLD",
            "agent.adaptation_threshold",
            &mut cfg.agent.adaptation_threshold,
        );
        overrides.apply(
            "OUROBOROS_ROLLBACK_THRESHOLD",
            "agent.rollback_threshold",
            &mut cfg.agent.rollback_threshold,
        );
        overrides.apply(
            "OUROBOROS_MIN_INTERACTIONS",
            "agent.min_interactions_before_adaptation",
            &mut cfg.agent.min_interactions_before_adaptation,
        );

        // Runtime settings
        overrides.apply("OUROBOROS_APPLY_INTERVAL_MS", "apply_interval_ms", &mut cfg.apply_interval_ms);
        overrides.apply("OUROBOROS_META_INTERVAL_MS", "meta_interval_ms", &mut cfg.meta_interval_ms);
        overrides.apply("OUROBOROS_CANDIDATE_COUNT", "candidate_count", &mut cfg.candidate_count);

        if let Err(invalid) = cfg.validate() {
            errors.extend(invalid);
        }
        if !errors.is_empty() {
            return Err(LearningError::Config(errors));
        }

        debug!(preset = %cfg.preset, "Loaded configuration");
        Ok(cfg)
    }

    /// Every out-of-range field across all components
    pub fn validate(&self) -> std::result::Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        for result in [
            self.replay.validate(),
            self.gradient.validate(),
            self.meta.validate(),
            self.agent.validate(),
        ] {
            if let Err(invalid) = result {
                errors.extend(invalid);
            }
        }
        if self.apply_interval_ms == 0 {
            errors.push(ConfigError::new("apply_interval_ms", "must be greater than 0"));
        }
        if self.meta_interval_ms == 0 {
            errors.push(ConfigError::new("meta_interval_ms", "must be greater than 0"));
        }
        if self.candidate_count == 0 {
            errors.push(ConfigError::new("candidate_count", "must be greater than 0"));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Applies parsed environment values, collecting parse failures
struct Overrides<'a, F> {
    lookup: &'a F,
    errors: &'a mut Vec<ConfigError>,
}

impl<F: Fn(&str) -> Option<String>> Overrides<'_, F> {
    fn apply<T>(&mut self, key: &str, field: &'static str, target: &mut T)
    where
        T: FromStr,
    {
        let Some(raw) = (self.lookup)(key) else {
            return;
        };
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => self
                .errors
                .push(ConfigError::new(field, format!("cannot parse {}='{}'", key, raw))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let cfg = LearningServiceConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(cfg, LearningServiceConfig::default());
    }

    #[test]
    fn test_preset_then_overrides() {
        let cfg = LearningServiceConfig::from_lookup(lookup_from(&[
            ("OUROBOROS_PRESET", "Aggressive"),
            ("OUROBOROS_LEARNING_RATE", "0.02"),
            ("OUROBOROS_REPLAY_CAPACITY", "256"),
            ("OUROBOROS_META_INTERVAL_MS", "250"),
        ]))
        .unwrap();

        assert_eq!(cfg.preset, Preset::Aggressive);
        assert_eq!(cfg.gradient.learning_rate, 0.02);
        assert_eq!(
            cfg.gradient.momentum,
            GradientLearnerConfig::aggressive().momentum
        );
        assert_eq!(cfg.agent, AdaptiveAgentConfig::aggressive());
        assert_eq!(cfg.replay.capacity, 256);
        assert_eq!(cfg.meta_interval_ms, 250);
        assert_eq!(cfg.preset.strategy().name(), "aggressive");
    }

    #[test]
    fn test_every_problem_reported() {
        let err = LearningServiceConfig::from_lookup(lookup_from(&[
            ("OUROBOROS_PRESET", "reckless"),
            ("OUROBOROS_REPLAY_CAPACITY", "lots"),
            ("OUROBOROS_LEARNING_RATE", "5.0"),
            ("OUROBOROS_APPLY_INTERVAL_MS", "0"),
        ]))
        .unwrap_err();

        match err {
            LearningError::Config(errors) => {
                let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
                assert!(fields.contains(&"preset"));
                assert!(fields.contains(&"replay.capacity"));
                assert!(fields.contains(&"gradient.learning_rate"));
                assert!(fields.contains(&"apply_interval_ms"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!("balanced".parse::<Preset>().unwrap(), Preset::Default);
        assert_eq!(" CONSERVATIVE ".parse::<Preset>().unwrap(), Preset::Conservative);
        assert!("unknown".parse::<Preset>().is_err());
    }
}
