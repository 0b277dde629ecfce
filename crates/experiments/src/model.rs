//! Experiment and variant model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cs_domain::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentType {
    PromptVariant,
    StrategyTest,
    TierPricing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperimentStatus {
    Planning,
    Running,
    Paused,
    Completed,
}

/// Metric the experiment optimizes for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMetric {
    ConversionRate,
    EngagementScore,
    SatisfactionScore,
    TimeToClose,
}

/// One arm of an experiment. Immutable within the experiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: Uuid,
    pub name: String,
    /// Nominal weight; the set is normalized to sum to 1 at creation.
    pub weight: f64,
    /// What to apply when the variant is selected (prompt text, strategy
    /// knobs, pricing table — interpreted by the deployer).
    pub content: serde_json::Value,
}

/// Caller-facing description of a variant at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantSpec {
    pub name: String,
    #[serde(default)]
    pub weight: Option<f64>,
    pub content: serde_json::Value,
}

/// Caller-facing description of an experiment at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentSpec {
    pub name: String,
    pub experiment_type: ExperimentType,
    pub hypothesis: String,
    pub variants: Vec<VariantSpec>,
    pub target_metric: TargetMetric,
    pub minimum_sample: u64,
    pub confidence_level: f64,
    #[serde(default)]
    pub auto_deploy_winner: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub id: Uuid,
    pub name: String,
    pub experiment_type: ExperimentType,
    pub hypothesis: String,
    pub variants: Vec<Variant>,
    pub target_metric: TargetMetric,
    pub minimum_sample: u64,
    pub confidence_level: f64,
    pub status: ExperimentStatus,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub auto_deploy_winner: bool,
    #[serde(default)]
    pub winning_variant: Option<Uuid>,
    #[serde(default)]
    pub confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Experiment {
    /// Build a `planning` experiment, normalizing variant weights so they
    /// sum to 1.
    pub fn from_spec(spec: ExperimentSpec) -> Result<Self> {
        if spec.variants.len() < 2 {
            return Err(Error::Experiment(format!(
                "experiment {:?} needs at least two variants",
                spec.name
            )));
        }
        if !(0.0..=1.0).contains(&spec.confidence_level) {
            return Err(Error::Experiment(format!(
                "confidence_level must be in [0, 1] (got {})",
                spec.confidence_level
            )));
        }

        let fallback = 1.0 / spec.variants.len() as f64;
        let mut variants: Vec<Variant> = spec
            .variants
            .into_iter()
            .map(|v| Variant {
                id: Uuid::new_v4(),
                name: v.name,
                weight: v.weight.unwrap_or(fallback),
                content: v.content,
            })
            .collect();

        let total: f64 = variants.iter().map(|v| v.weight).sum();
        if total <= 0.0 {
            return Err(Error::Experiment(
                "variant weights must sum to a positive value".into(),
            ));
        }
        for variant in &mut variants {
            variant.weight /= total;
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: spec.name,
            experiment_type: spec.experiment_type,
            hypothesis: spec.hypothesis,
            variants,
            target_metric: spec.target_metric,
            minimum_sample: spec.minimum_sample,
            confidence_level: spec.confidence_level,
            status: ExperimentStatus::Planning,
            started_at: None,
            ended_at: None,
            auto_deploy_winner: spec.auto_deploy_winner,
            winning_variant: None,
            confidence: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn variant(&self, id: Uuid) -> Option<&Variant> {
        self.variants.iter().find(|v| v.id == id)
    }

    pub fn weight_sum(&self) -> f64 {
        self.variants.iter().map(|v| v.weight).sum()
    }
}
