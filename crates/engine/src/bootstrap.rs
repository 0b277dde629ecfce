//! Engine construction: validate config, wire every subsystem, spawn
//! background tasks.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use cs_agent::{AgentFactory, CompletionProvider, NullVoice, PromptLibrary, VoiceSynthesizer};
use cs_analyzers::lexicon::LexiconSentiment;
use cs_analyzers::AnalyzerSet;
use cs_decision::DecisionEngine;
use cs_domain::config::{Config, ConfigSeverity};
use cs_experiments::{ExperimentFramework, LogDeployer};
use cs_store::{HttpRowStore, Reconciler, ResilientStore, RowStore};

use crate::learning::AdaptiveLearning;
use crate::locks::ConversationLockMap;
use crate::orchestrator::Orchestrator;
use crate::outcome::OutcomeTracker;
use crate::scheduler::{FollowUpQueue, Scheduler};
use crate::state::{ActiveAgents, EngineState};

/// A fully wired engine: the orchestrator plus its background tasks.
pub struct Engine {
    orchestrator: Orchestrator,
}

impl Engine {
    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub fn state(&self) -> &EngineState {
        self.orchestrator.engine_state()
    }

    /// Spawn the scheduler and the store reconciler. The returned handles
    /// run until aborted (typically for the process lifetime).
    pub fn spawn_background(&self) -> Vec<tokio::task::JoinHandle<()>> {
        let state = self.state();
        let reconciler = Reconciler::new(
            state.store.remote(),
            state.store.staged_queue(),
            Duration::from_secs(state.config.store.reconcile_interval_secs.max(1)),
        );
        vec![
            Scheduler::new(self.orchestrator.clone()).spawn(),
            reconciler.spawn(),
        ]
    }
}

/// Validate the configuration and wire the full engine.
///
/// `remote` overrides the row-store transport (tests and local
/// development pass [`cs_store::MemoryRowStore`]); `None` builds the
/// HTTP client from `config.store`. The LLM provider and voice
/// synthesizer are external collaborators supplied by the embedder;
/// pass [`NullVoice`] when voice is unused.
pub fn build_engine(
    config: Config,
    provider: Arc<dyn CompletionProvider>,
    voice: Option<Arc<dyn VoiceSynthesizer>>,
    remote: Option<Arc<dyn RowStore>>,
) -> anyhow::Result<Engine> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }
    let config = Arc::new(config);

    // ── Store ────────────────────────────────────────────────────────
    let remote: Arc<dyn RowStore> = match remote {
        Some(remote) => remote,
        None => Arc::new(HttpRowStore::new(&config.store)?),
    };
    let store = Arc::new(ResilientStore::new(remote));
    tracing::info!(url = %config.store.base_url, "row store ready");

    // ── Analyzers & decision engine ──────────────────────────────────
    let sentiment = Arc::new(LexiconSentiment);
    let analyzers = Arc::new(AnalyzerSet::standard(
        &config.analyzers,
        config.decision.conversion_thresholds,
        sentiment,
    ));
    let decision = Arc::new(DecisionEngine::new(config.decision.clone()));

    // ── Experiments & learning ───────────────────────────────────────
    let experiments = Arc::new(ExperimentFramework::new(
        config.experiments.clone(),
        Arc::new(LogDeployer),
    ));
    let learning = Arc::new(AdaptiveLearning::new(experiments.clone()));

    // ── Agent factory ────────────────────────────────────────────────
    let agent_factory = Arc::new(AgentFactory::new(
        provider,
        Arc::new(PromptLibrary::default()),
        &config.engine,
    ));

    let state = EngineState {
        config,
        store,
        analyzers,
        decision,
        experiments,
        agent_factory,
        voice: voice.unwrap_or_else(|| Arc::new(NullVoice)),
        outcomes: Arc::new(OutcomeTracker::new()),
        learning,
        locks: Arc::new(ConversationLockMap::new()),
        agents: Arc::new(ActiveAgents::default()),
        follow_ups: Arc::new(FollowUpQueue::new()),
        active: Arc::new(RwLock::new(HashSet::new())),
    };

    Ok(Engine {
        orchestrator: Orchestrator::new(state),
    })
}
