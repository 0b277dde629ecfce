//! A/B experiment framework.
//!
//! Per-experiment UCB1 bandits assign variants to conversations; outcome
//! records feed rewards back, stop rules complete experiments once a
//! statistically confident winner emerges, and winners can auto-deploy
//! through the [`deploy::WinnerDeployer`] hook.

pub mod bandit;
pub mod deploy;
pub mod framework;
pub mod model;
pub mod reward;
pub mod stats;

pub use bandit::Ucb1;
pub use deploy::{LogDeployer, WinnerDeployer};
pub use framework::{Assignment, ExperimentFramework};
pub use model::{
    Experiment, ExperimentSpec, ExperimentStatus, ExperimentType, TargetMetric, Variant,
    VariantSpec,
};
