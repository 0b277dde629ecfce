//! The experiment framework: registry, assignment, rewards, stop rules.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use uuid::Uuid;

use cs_domain::config::ExperimentsConfig;
use cs_domain::error::{Error, Result};
use cs_domain::outcome::OutcomeRecord;
use cs_domain::trace::TraceEvent;

use crate::bandit::{ArmStats, Ucb1};
use crate::deploy::WinnerDeployer;
use crate::model::{Experiment, ExperimentSpec, ExperimentStatus};
use crate::reward::reward_for;
use crate::stats::two_proportion_confidence;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Assignment record
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A variant handed to one conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub experiment_id: Uuid,
    pub variant_id: Uuid,
    pub assigned_at: DateTime<Utc>,
}

/// One registered experiment: the model plus its bandit, each behind its
/// own lock. The bandit mutex is the per-experiment mutual-exclusion
/// discipline for reward updates; assignment reads a snapshot.
struct ExperimentEntry {
    experiment: RwLock<Experiment>,
    bandit: Mutex<Ucb1>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Framework
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct ExperimentFramework {
    config: ExperimentsConfig,
    entries: RwLock<HashMap<Uuid, Arc<ExperimentEntry>>>,
    assignments: RwLock<HashMap<Uuid, Vec<Assignment>>>,
    /// Experiments completed since the last drain (the engine persists
    /// these; the framework itself stays store-free).
    completed: Mutex<Vec<Experiment>>,
    deployer: Arc<dyn WinnerDeployer>,
}

impl ExperimentFramework {
    pub fn new(config: ExperimentsConfig, deployer: Arc<dyn WinnerDeployer>) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
            assignments: RwLock::new(HashMap::new()),
            completed: Mutex::new(Vec::new()),
            deployer,
        }
    }

    // ── lifecycle ────────────────────────────────────────────────────

    /// Register a new experiment in `planning`.
    pub fn create_experiment(&self, spec: ExperimentSpec) -> Result<Experiment> {
        let experiment = Experiment::from_spec(spec)?;
        let entry = Arc::new(ExperimentEntry {
            bandit: Mutex::new(Ucb1::new(
                experiment.variants.iter().map(|v| v.id),
                self.config.exploration_factor,
            )),
            experiment: RwLock::new(experiment.clone()),
        });
        self.entries.write().insert(experiment.id, entry);
        Ok(experiment)
    }

    /// Move an experiment from `planning` to `running`.
    pub fn start_experiment(&self, id: Uuid) -> Result<()> {
        let running = self.running_ids().len();
        if running >= self.config.max_concurrent_experiments {
            return Err(Error::Experiment(format!(
                "concurrent experiment limit reached ({running})"
            )));
        }
        let entry = self.entry(id)?;
        let mut experiment = entry.experiment.write();
        if experiment.status != ExperimentStatus::Planning
            && experiment.status != ExperimentStatus::Paused
        {
            return Err(Error::Experiment(format!(
                "experiment {} cannot start from {:?}",
                experiment.name, experiment.status
            )));
        }
        experiment.status = ExperimentStatus::Running;
        if experiment.started_at.is_none() {
            experiment.started_at = Some(Utc::now());
        }
        experiment.updated_at = Utc::now();
        Ok(())
    }

    pub fn pause_experiment(&self, id: Uuid) -> Result<()> {
        let entry = self.entry(id)?;
        let mut experiment = entry.experiment.write();
        if experiment.status != ExperimentStatus::Running {
            return Err(Error::Experiment(format!(
                "experiment {} is not running",
                experiment.name
            )));
        }
        experiment.status = ExperimentStatus::Paused;
        experiment.updated_at = Utc::now();
        Ok(())
    }

    pub fn resume_experiment(&self, id: Uuid) -> Result<()> {
        let entry = self.entry(id)?;
        let mut experiment = entry.experiment.write();
        if experiment.status != ExperimentStatus::Paused {
            return Err(Error::Experiment(format!(
                "experiment {} is not paused",
                experiment.name
            )));
        }
        experiment.status = ExperimentStatus::Running;
        experiment.updated_at = Utc::now();
        Ok(())
    }

    // ── assignment ───────────────────────────────────────────────────

    /// Assign a variant for one experiment via UCB1.
    ///
    /// Returns `None` (never an error) when the experiment is unknown or
    /// not running — a failed assignment must not fail the turn.
    pub fn assign_variant(
        &self,
        experiment_id: Uuid,
        conversation_id: Uuid,
    ) -> Option<crate::model::Variant> {
        let entry = self.entries.read().get(&experiment_id).cloned()?;
        {
            let experiment = entry.experiment.read();
            if experiment.status != ExperimentStatus::Running {
                return None;
            }
        }

        let variant_id = entry.bandit.lock().select()?;
        let variant = entry.experiment.read().variant(variant_id)?.clone();

        self.assignments
            .write()
            .entry(conversation_id)
            .or_default()
            .push(Assignment {
                experiment_id,
                variant_id,
                assigned_at: Utc::now(),
            });

        TraceEvent::VariantAssigned {
            experiment_id: experiment_id.to_string(),
            variant_id: variant_id.to_string(),
            conversation_id: conversation_id.to_string(),
        }
        .emit();

        Some(variant)
    }

    /// Assign a variant from every running experiment.
    pub fn assign_active(&self, conversation_id: Uuid) -> Vec<(Experiment, crate::model::Variant)> {
        let ids = self.running_ids();
        let mut out = Vec::new();
        for id in ids {
            if let Some(variant) = self.assign_variant(id, conversation_id) {
                if let Some(experiment) = self.experiment(id) {
                    out.push((experiment, variant));
                }
            }
        }
        out
    }

    pub fn assignments_for(&self, conversation_id: Uuid) -> Vec<Assignment> {
        self.assignments
            .read()
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    // ── rewards & completion ─────────────────────────────────────────

    /// Join an outcome record against this conversation's assignments,
    /// update the bandits, and run the stop rule.
    pub fn record_outcome(&self, record: &OutcomeRecord) {
        let assignments = {
            let mut map = self.assignments.write();
            map.remove(&record.conversation_id).unwrap_or_default()
        };

        for assignment in assignments {
            let Some(entry) = self.entries.read().get(&assignment.experiment_id).cloned() else {
                continue;
            };

            let metric = entry.experiment.read().target_metric;
            let reward = reward_for(record, metric, self.config.optimal_close_secs);

            entry.bandit.lock().update(assignment.variant_id, reward);

            TraceEvent::RewardRecorded {
                experiment_id: assignment.experiment_id.to_string(),
                variant_id: assignment.variant_id.to_string(),
                reward,
            }
            .emit();

            self.maybe_complete(assignment.experiment_id, &entry);
        }
    }

    /// Stop rule: minimum sample AND minimum duration AND a winner whose
    /// margin and z-confidence clear the experiment's bar.
    fn maybe_complete(&self, experiment_id: Uuid, entry: &Arc<ExperimentEntry>) {
        let (minimum_sample, confidence_level, started_at, status) = {
            let experiment = entry.experiment.read();
            (
                experiment.minimum_sample,
                experiment.confidence_level,
                experiment.started_at,
                experiment.status,
            )
        };
        if status != ExperimentStatus::Running {
            return;
        }

        let (total, best, runner_up) = {
            let bandit = entry.bandit.lock();
            (bandit.total_count(), bandit.best_arm(), bandit.runner_up())
        };

        if total < minimum_sample {
            return;
        }
        if let Some(started_at) = started_at {
            let elapsed_hours = Utc::now().signed_duration_since(started_at).num_hours();
            if elapsed_hours < self.config.minimum_experiment_duration_hours as i64 {
                return;
            }
        }

        let Some((winner_id, winner_stats)) = best else {
            return;
        };
        let confidence = match runner_up {
            Some((_, runner_stats)) => {
                if winner_stats.mean_reward() - runner_stats.mean_reward()
                    < self.config.winner_margin
                {
                    return;
                }
                two_proportion_confidence(
                    winner_stats.mean_reward(),
                    winner_stats.count,
                    runner_stats.mean_reward(),
                    runner_stats.count,
                )
            }
            // Every reward landed on one arm; nothing to compare against.
            None => return,
        };
        if confidence < confidence_level {
            return;
        }

        self.complete(experiment_id, entry, winner_id, confidence);
    }

    fn complete(
        &self,
        experiment_id: Uuid,
        entry: &Arc<ExperimentEntry>,
        winner_id: Uuid,
        confidence: f64,
    ) {
        let completed = {
            let mut experiment = entry.experiment.write();
            experiment.status = ExperimentStatus::Completed;
            experiment.ended_at = Some(Utc::now());
            experiment.winning_variant = Some(winner_id);
            experiment.confidence = Some(confidence);
            experiment.updated_at = Utc::now();
            experiment.clone()
        };

        TraceEvent::ExperimentCompleted {
            experiment_id: experiment_id.to_string(),
            winner: Some(winner_id.to_string()),
            confidence,
        }
        .emit();

        if completed.auto_deploy_winner && confidence >= self.config.auto_deploy_threshold {
            if let Some(winner) = completed.variant(winner_id) {
                self.deployer.deploy(&completed, winner);
            }
        }

        // Remove from the active set; the engine persists via drain.
        self.entries.write().remove(&experiment_id);
        self.completed.lock().push(completed);
    }

    /// Take all experiments completed since the last call.
    pub fn drain_completed(&self) -> Vec<Experiment> {
        std::mem::take(&mut *self.completed.lock())
    }

    // ── introspection ────────────────────────────────────────────────

    pub fn experiment(&self, id: Uuid) -> Option<Experiment> {
        self.entries
            .read()
            .get(&id)
            .map(|e| e.experiment.read().clone())
    }

    pub fn running_ids(&self) -> Vec<Uuid> {
        self.entries
            .read()
            .iter()
            .filter(|(_, e)| e.experiment.read().status == ExperimentStatus::Running)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn bandit_snapshot(&self, id: Uuid) -> Option<Vec<(Uuid, ArmStats)>> {
        self.entries
            .read()
            .get(&id)
            .map(|e| e.bandit.lock().snapshot())
    }

    fn entry(&self, id: Uuid) -> Result<Arc<ExperimentEntry>> {
        self.entries
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("experiment {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deploy::LogDeployer;
    use crate::model::{ExperimentType, TargetMetric, VariantSpec};
    use cs_domain::outcome::{ConversationMetrics, ConversationOutcome};
    use parking_lot::Mutex as PlMutex;
    use serde_json::json;

    fn framework() -> ExperimentFramework {
        ExperimentFramework::new(ExperimentsConfig::default(), Arc::new(LogDeployer))
    }

    fn spec(min_sample: u64) -> ExperimentSpec {
        ExperimentSpec {
            name: "greeting-style".into(),
            experiment_type: ExperimentType::PromptVariant,
            hypothesis: "warm greeting converts".into(),
            variants: vec![
                VariantSpec {
                    name: "A".into(),
                    weight: Some(0.5),
                    content: json!({"style": "warm"}),
                },
                VariantSpec {
                    name: "B".into(),
                    weight: Some(0.5),
                    content: json!({"style": "direct"}),
                },
            ],
            target_metric: TargetMetric::ConversionRate,
            minimum_sample: min_sample,
            confidence_level: 0.8,
            auto_deploy_winner: true,
        }
    }

    fn outcome(conversation_id: Uuid, outcome: ConversationOutcome) -> OutcomeRecord {
        OutcomeRecord {
            conversation_id,
            outcome,
            tier_recommended: None,
            tier_accepted: None,
            satisfaction: None,
            metrics: ConversationMetrics::default(),
            experiment_assignments: Vec::new(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn cold_start_assigns_each_variant_once_then_follows_reward() {
        let fw = framework();
        let exp = fw.create_experiment(spec(100)).unwrap();
        fw.start_experiment(exp.id).unwrap();

        let c1 = Uuid::new_v4();
        let c2 = Uuid::new_v4();
        let v1 = fw.assign_variant(exp.id, c1).unwrap();
        let v2 = fw.assign_variant(exp.id, c2).unwrap();
        assert_ne!(v1.id, v2.id, "cold arms explored first");

        fw.record_outcome(&outcome(c1, ConversationOutcome::Converted));
        fw.record_outcome(&outcome(c2, ConversationOutcome::Lost));

        let snapshot = fw.bandit_snapshot(exp.id).unwrap();
        let stats1 = snapshot.iter().find(|(id, _)| *id == v1.id).unwrap().1;
        let stats2 = snapshot.iter().find(|(id, _)| *id == v2.id).unwrap().1;
        assert_eq!(stats1.mean_reward(), 1.0);
        assert_eq!(stats2.mean_reward(), 0.0);

        // Third assignment exploits the converted arm.
        let v3 = fw.assign_variant(exp.id, Uuid::new_v4()).unwrap();
        assert_eq!(v3.id, v1.id);
    }

    #[test]
    fn assignment_to_non_running_experiment_is_absent() {
        let fw = framework();
        let exp = fw.create_experiment(spec(100)).unwrap();
        // Still planning.
        assert!(fw.assign_variant(exp.id, Uuid::new_v4()).is_none());
        // Unknown experiment.
        assert!(fw.assign_variant(Uuid::new_v4(), Uuid::new_v4()).is_none());
    }

    #[test]
    fn pause_and_resume_gate_assignment() {
        let fw = framework();
        let exp = fw.create_experiment(spec(100)).unwrap();
        fw.start_experiment(exp.id).unwrap();
        fw.pause_experiment(exp.id).unwrap();
        assert!(fw.assign_variant(exp.id, Uuid::new_v4()).is_none());
        fw.resume_experiment(exp.id).unwrap();
        assert!(fw.assign_variant(exp.id, Uuid::new_v4()).is_some());
    }

    #[test]
    fn concurrent_running_limit_is_enforced() {
        let config = ExperimentsConfig {
            max_concurrent_experiments: 1,
            ..Default::default()
        };
        let fw = ExperimentFramework::new(config, Arc::new(LogDeployer));
        let first = fw.create_experiment(spec(100)).unwrap();
        let second = fw.create_experiment(spec(100)).unwrap();
        fw.start_experiment(first.id).unwrap();
        assert!(fw.start_experiment(second.id).is_err());
    }

    struct RecordingDeployer(PlMutex<Vec<String>>);

    impl WinnerDeployer for RecordingDeployer {
        fn deploy(&self, _experiment: &Experiment, winner: &crate::model::Variant) {
            self.0.lock().push(winner.name.clone());
        }
    }

    #[test]
    fn decisive_experiment_completes_and_deploys() {
        let config = ExperimentsConfig {
            minimum_experiment_duration_hours: 0,
            ..Default::default()
        };
        let deployer = Arc::new(RecordingDeployer(PlMutex::new(Vec::new())));
        let fw = ExperimentFramework::new(config, deployer.clone());
        let exp = fw.create_experiment(spec(20)).unwrap();
        fw.start_experiment(exp.id).unwrap();

        // Alternate assignments: one arm always converts, the other never.
        let winner_name;
        {
            let c = Uuid::new_v4();
            let v = fw.assign_variant(exp.id, c).unwrap();
            winner_name = v.name.clone();
            fw.record_outcome(&outcome(c, ConversationOutcome::Converted));
        }
        for _ in 0..40 {
            let c = Uuid::new_v4();
            let v = fw.assign_variant(exp.id, c).unwrap();
            let result = if v.name == winner_name {
                ConversationOutcome::Converted
            } else {
                ConversationOutcome::Lost
            };
            fw.record_outcome(&outcome(c, result));
            if fw.experiment(exp.id).is_none() {
                break;
            }
        }

        let completed = fw.drain_completed();
        assert_eq!(completed.len(), 1, "experiment should have completed");
        let done = &completed[0];
        assert_eq!(done.status, ExperimentStatus::Completed);
        let winner = done.variant(done.winning_variant.unwrap()).unwrap();
        assert_eq!(winner.name, winner_name);
        assert!(done.confidence.unwrap() >= done.confidence_level);
        // Auto-deploy fired.
        assert_eq!(deployer.0.lock().as_slice(), &[winner_name]);
        // Removed from the active set.
        assert!(fw.experiment(exp.id).is_none());
    }
}
