mod analyzers;
mod decision;
mod engine;
mod experiments;
mod features;
mod security;
mod store;

pub use analyzers::*;
pub use decision::*;
pub use engine::*;
pub use experiments::*;
pub use features::*;
pub use security::*;
pub use store::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub analyzers: AnalyzersConfig,
    #[serde(default)]
    pub decision: DecisionConfig,
    #[serde(default)]
    pub experiments: ExperimentsConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub features: FeatureFlags,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Staging,
    Production,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        if self.store.base_url.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "store.base_url".into(),
                message: "base_url must not be empty".into(),
            });
        } else if !self.store.base_url.starts_with("http://")
            && !self.store.base_url.starts_with("https://")
        {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "store.base_url".into(),
                message: format!(
                    "base_url must start with http:// or https:// (got \"{}\")",
                    self.store.base_url
                ),
            });
        }

        if self.environment == Environment::Production && self.security.jwt_secret.is_none() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "security.jwt_secret".into(),
                message: "jwt_secret is required in production".into(),
            });
        }

        if self.engine.max_conversation_duration_minutes == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "engine.max_conversation_duration_minutes".into(),
                message: "must be greater than 0".into(),
            });
        }

        if self.engine.cooldown_hours == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "engine.cooldown_hours".into(),
                message: "cooldown disabled — every start will be accepted".into(),
            });
        }

        if self.analyzers.deadline_ms == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "analyzers.deadline_ms".into(),
                message: "analyzer deadline must be greater than 0".into(),
            });
        }

        let weight_sum = self.decision.need_satisfaction_weight
            + self.decision.objection_handling_weight
            + self.decision.conversion_progress_weight;
        if weight_sum <= 0.0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "decision.*_weight".into(),
                message: "objective weights must sum to a positive value".into(),
            });
        }

        if self.experiments.exploration_factor <= 0.0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "experiments.exploration_factor".into(),
                message: "UCB exploration factor must be positive".into(),
            });
        }

        if !(0.0..=1.0).contains(&self.engine.experiment_sample_rate) {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "engine.experiment_sample_rate".into(),
                message: "sample rate must be within [0, 1]".into(),
            });
        }

        errors
    }
}
