use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use cs_agent::{AgentFactory, DialogAgent, VoiceSynthesizer};
use cs_analyzers::AnalyzerSet;
use cs_decision::DecisionEngine;
use cs_domain::config::Config;
use cs_experiments::ExperimentFramework;
use cs_store::ResilientStore;

use crate::learning::AdaptiveLearning;
use crate::locks::ConversationLockMap;
use crate::outcome::OutcomeTracker;
use crate::scheduler::FollowUpQueue;

/// Live dialog agents, one per active conversation.
#[derive(Default)]
pub struct ActiveAgents {
    agents: RwLock<HashMap<Uuid, Arc<DialogAgent>>>,
}

impl ActiveAgents {
    pub fn get(&self, conversation_id: Uuid) -> Option<Arc<DialogAgent>> {
        self.agents.read().get(&conversation_id).cloned()
    }

    pub fn insert(&self, conversation_id: Uuid, agent: Arc<DialogAgent>) {
        self.agents.write().insert(conversation_id, agent);
    }

    pub fn remove(&self, conversation_id: Uuid) {
        self.agents.write().remove(&conversation_id);
    }

    pub fn len(&self) -> usize {
        self.agents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.read().is_empty()
    }
}

/// Shared engine state handed to the orchestrator and scheduler.
///
/// Everything is constructed once at process start and injected by
/// reference; there are no hidden globals.
#[derive(Clone)]
pub struct EngineState {
    pub config: Arc<Config>,
    pub store: Arc<ResilientStore>,
    pub analyzers: Arc<AnalyzerSet>,
    pub decision: Arc<DecisionEngine>,
    pub experiments: Arc<ExperimentFramework>,
    pub agent_factory: Arc<AgentFactory>,
    pub voice: Arc<dyn VoiceSynthesizer>,
    pub outcomes: Arc<OutcomeTracker>,
    pub learning: Arc<AdaptiveLearning>,
    pub locks: Arc<ConversationLockMap>,
    pub agents: Arc<ActiveAgents>,
    pub follow_ups: Arc<FollowUpQueue>,
    /// Conversations currently in flight (the scheduler sweeps these).
    pub active: Arc<RwLock<HashSet<Uuid>>>,
}

impl EngineState {
    pub fn mark_active(&self, conversation_id: Uuid) {
        self.active.write().insert(conversation_id);
    }

    pub fn mark_inactive(&self, conversation_id: Uuid) {
        self.active.write().remove(&conversation_id);
        self.agents.remove(conversation_id);
        self.locks.remove(conversation_id);
    }

    pub fn active_conversations(&self) -> Vec<Uuid> {
        self.active.read().iter().copied().collect()
    }
}
