//! Winner deployment hook.

use crate::model::{Experiment, ExperimentType, Variant};

/// Applies a winning variant to the live system.
///
/// Interpretation is per experiment type: prompt variants land in the
/// prompt library, strategy variants in decision tunables, tier-pricing
/// variants in the pricing table. Wired at construction; the default
/// implementation only records the decision.
pub trait WinnerDeployer: Send + Sync {
    fn deploy(&self, experiment: &Experiment, winner: &Variant);
}

/// Default deployer: logs the winner and leaves application to operators.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDeployer;

impl WinnerDeployer for LogDeployer {
    fn deploy(&self, experiment: &Experiment, winner: &Variant) {
        let target = match experiment.experiment_type {
            ExperimentType::PromptVariant => "prompt library",
            ExperimentType::StrategyTest => "strategy tunables",
            ExperimentType::TierPricing => "tier pricing",
        };
        tracing::info!(
            experiment = %experiment.name,
            variant = %winner.name,
            target,
            "deploying winning variant"
        );
    }
}
