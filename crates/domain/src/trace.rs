use serde::Serialize;

/// Structured trace events emitted across all CoreSell crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    ConversationStarted {
        conversation_id: String,
        customer_id: String,
        program: String,
        source: String,
    },
    ProgramDetected {
        customer_id: String,
        program: String,
        confidence: f64,
    },
    ProgramSwitched {
        conversation_id: String,
        from: String,
        to: String,
        confidence: f64,
    },
    PhaseChanged {
        conversation_id: String,
        from: String,
        to: String,
    },
    AnalyzerFallback {
        conversation_id: String,
        analyzer: String,
        reason: String,
    },
    ForcedProfileAnalysis {
        conversation_id: String,
        elapsed_secs: u64,
        previous_confidence: f64,
        recommended_program: String,
    },
    HumanTransfer {
        conversation_id: String,
        reason: String,
    },
    TurnCompleted {
        conversation_id: String,
        duration_ms: u64,
        actions: usize,
        decision_confidence: f64,
    },
    ConversationEnded {
        conversation_id: String,
        reason: String,
    },
    VariantAssigned {
        experiment_id: String,
        variant_id: String,
        conversation_id: String,
    },
    RewardRecorded {
        experiment_id: String,
        variant_id: String,
        reward: f64,
    },
    ExperimentCompleted {
        experiment_id: String,
        winner: Option<String>,
        confidence: f64,
    },
    StoreCall {
        table: String,
        op: String,
        status: u16,
        duration_ms: u64,
        attempt: u32,
    },
    WriteStaged {
        table: String,
        op: String,
    },
    StagedFlushed {
        flushed: usize,
        remaining: usize,
    },
    OutcomeRecorded {
        conversation_id: String,
        outcome: String,
    },
    FollowUpScheduled {
        conversation_id: String,
        kind: String,
        due_at: String,
    },
    FollowUpDue {
        conversation_id: String,
        kind: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "cs_event");
    }
}
