//! The conversation orchestrator: session lifecycle and operations.

pub mod lifecycle;
pub mod turn;

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use cs_agent::DialogAgent;
use cs_analyzers::router::ProgramRouterAnalyzer;
use cs_domain::conversation::{ConversationState, EndReason, Phase, ProgramType, Role};
use cs_domain::customer::CustomerData;
use cs_domain::error::{Error, Result};
use cs_domain::outcome::ConversationOutcome;
use cs_domain::platform::{PlatformContext, SourceType};
use cs_domain::prediction::{Prediction, PredictionKind};
use cs_domain::tier::TierLevel;
use cs_domain::trace::TraceEvent;
use cs_store::provider::eq;
use cs_store::{rows, RowStore};

use crate::scheduler::FollowUpKind;
use crate::state::EngineState;

const PLATFORM_INSIGHT_KEY: &str = "platform";
const VARIANTS_INSIGHT_KEY: &str = "experiment_variants";

/// The central state machine. Owns every mutation of
/// [`ConversationState`]; all other components see snapshots.
#[derive(Clone)]
pub struct Orchestrator {
    pub(crate) state: EngineState,
}

impl Orchestrator {
    pub fn new(state: EngineState) -> Self {
        Self { state }
    }

    pub fn engine_state(&self) -> &EngineState {
        &self.state
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // start_conversation
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Start a new conversation for a customer.
    ///
    /// Enforces the per-customer cooldown, auto-detects the program when
    /// none is supplied (HYBRID resolves by age), produces the greeting,
    /// registers experiment assignments, and persists the initial state.
    pub async fn start_conversation(
        &self,
        customer: CustomerData,
        platform: PlatformContext,
        program: Option<ProgramType>,
    ) -> Result<ConversationState> {
        customer.validate()?;
        platform.validate()?;

        self.check_cooldown(&customer.id).await?;

        let program = match program {
            Some(p) => p,
            None => self.detect_program(&customer),
        };

        let config = &self.state.config.engine;
        let max_duration_secs = platform
            .max_duration_secs
            .min(config.max_conversation_duration_minutes * 60);

        let mut state = ConversationState::new(
            customer.clone(),
            program,
            max_duration_secs,
            config.intent_timeout_secs,
        );
        state.set_insight(PLATFORM_INSIGHT_KEY, serde_json::to_value(&platform)?);

        // Build the dialog agent and produce the greeting.
        let agent = Arc::new(
            self.state
                .agent_factory
                .create_agent(&platform, &customer, program),
        );
        let greeting = agent.greeting().await?;
        state.push_message(Role::Assistant, greeting)?;
        self.state.agents.insert(state.id, agent);

        // Outcome tracking starts with the session.
        self.state.outcomes.start_tracking(state.id);
        self.state
            .outcomes
            .record_assistant_message(state.id, Utc::now());

        // Experiment enrollment (sampled).
        if self.state.config.features.ab_testing && self.sampled(state.id) {
            let assignments = self.state.experiments.assign_active(state.id);
            if !assignments.is_empty() {
                let variants: Vec<serde_json::Value> = assignments
                    .iter()
                    .map(|(_, variant)| {
                        serde_json::json!({
                            "name": variant.name,
                            "content": variant.content,
                        })
                    })
                    .collect();
                for (experiment, _) in &assignments {
                    state.register_assignment(experiment.id);
                }
                state.set_insight(VARIANTS_INSIGHT_KEY, serde_json::Value::Array(variants));
            }
        }

        self.persist_state(&state).await?;
        self.state.mark_active(state.id);

        TraceEvent::ConversationStarted {
            conversation_id: state.id.to_string(),
            customer_id: customer.id.clone(),
            program: program.to_string(),
            source: platform.source.to_string(),
        }
        .emit();

        Ok(state)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // end_conversation
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// End a conversation. Idempotent: ending an already-terminal
    /// conversation returns its current state unchanged.
    pub async fn end_conversation(
        &self,
        conversation_id: Uuid,
        reason: EndReason,
    ) -> Result<ConversationState> {
        let _permit = self.state.locks.acquire(conversation_id).await;

        let mut state = self.load_state(conversation_id).await?;
        if state.is_terminal() {
            return Ok(state);
        }

        // Only say goodbye when the agent hasn't already.
        let needs_farewell = state
            .last_assistant_message()
            .map(|m| !lifecycle::is_farewell(&m.content))
            .unwrap_or(true);
        if needs_farewell {
            state.push_message(Role::Assistant, lifecycle::closing_message(reason))?;
            self.state
                .outcomes
                .record_assistant_message(state.id, Utc::now());
        }

        state.end_reason = Some(reason);
        state.transition(Phase::Ended)?;

        let outcome = lifecycle::outcome_for_reason(reason);
        self.record_terminal(&mut state, outcome, None).await;
        self.persist_state(&state).await?;

        TraceEvent::ConversationEnded {
            conversation_id: state.id.to_string(),
            reason: reason.to_string(),
        }
        .emit();

        Ok(state)
    }

    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
    // Shared helpers
    // ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Enforce the per-customer cooldown via a store lookup.
    async fn check_cooldown(&self, customer_id: &str) -> Result<()> {
        let cooldown_secs = self.state.config.engine.cooldown_hours * 3600;
        if cooldown_secs == 0 {
            return Ok(());
        }

        let rows = self
            .state
            .store
            .select(rows::CONVERSATIONS, &eq("customer_id", customer_id), None)
            .await?;

        let latest_start = rows
            .iter()
            .filter_map(|row| row.get("session_start"))
            .filter_map(|v| v.as_str())
            .filter_map(|s| s.parse::<chrono::DateTime<Utc>>().ok())
            .max();

        if let Some(latest) = latest_start {
            let elapsed = Utc::now()
                .signed_duration_since(latest)
                .num_seconds()
                .max(0) as u64;
            if elapsed < cooldown_secs {
                return Err(Error::CooldownActive {
                    seconds_remaining: cooldown_secs - elapsed,
                    elapsed_seconds: elapsed,
                });
            }
        }
        Ok(())
    }

    /// Auto-detect the program from the customer profile; HYBRID resolves
    /// to PRIME under 50, LONGEVITY at 50 and over.
    fn detect_program(&self, customer: &CustomerData) -> ProgramType {
        let route = ProgramRouterAnalyzer::route("", customer.age, &customer.interests);
        let resolved = match route.recommended_program {
            ProgramType::Hybrid => {
                if customer.age >= 50 {
                    ProgramType::Longevity
                } else {
                    ProgramType::Prime
                }
            }
            program => program,
        };
        TraceEvent::ProgramDetected {
            customer_id: customer.id.clone(),
            program: resolved.to_string(),
            confidence: route.confidence,
        }
        .emit();
        resolved
    }

    /// Deterministic experiment sampling by conversation id.
    fn sampled(&self, conversation_id: Uuid) -> bool {
        let rate = self.state.config.engine.experiment_sample_rate;
        let bucket = (conversation_id.as_u128() % 10_000) as f64 / 10_000.0;
        bucket < rate
    }

    pub(crate) async fn load_state(&self, conversation_id: Uuid) -> Result<ConversationState> {
        let rows = self
            .state
            .store
            .select(
                rows::CONVERSATIONS,
                &eq("conversation_id", conversation_id.to_string()),
                Some(1),
            )
            .await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound(format!("conversation {conversation_id}")))?;
        rows::row_to_conversation(row)
    }

    pub(crate) async fn persist_state(&self, state: &ConversationState) -> Result<()> {
        let row = rows::conversation_to_row(state)?;
        self.state.store.upsert(rows::CONVERSATIONS, row).await?;
        Ok(())
    }

    /// The platform context attached at session start.
    pub(crate) fn platform_of(&self, state: &ConversationState) -> PlatformContext {
        state
            .insights
            .get(PLATFORM_INSIGHT_KEY)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_else(|| PlatformContext::for_source(SourceType::Api))
    }

    /// Variant payloads assigned to this conversation at start.
    pub(crate) fn variants_of(
        &self,
        state: &ConversationState,
    ) -> Vec<(String, serde_json::Value)> {
        state
            .insights
            .get(VARIANTS_INSIGHT_KEY)
            .and_then(|v| v.as_array())
            .map(|variants| {
                variants
                    .iter()
                    .filter_map(|v| {
                        Some((
                            v.get("name")?.as_str()?.to_owned(),
                            v.get("content").cloned().unwrap_or(serde_json::Value::Null),
                        ))
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The live agent for a conversation, rebuilt from persisted state
    /// after a restart.
    pub(crate) fn ensure_agent(&self, state: &ConversationState) -> Arc<DialogAgent> {
        if let Some(agent) = self.state.agents.get(state.id) {
            return agent;
        }
        let platform = self.platform_of(state);
        let agent = Arc::new(self.state.agent_factory.create_agent(
            &platform,
            &state.customer,
            state.program_type,
        ));
        self.state.agents.insert(state.id, agent.clone());
        agent
    }

    /// Terminal bookkeeping shared by every close path: write the outcome
    /// record, feed experiments and learning, persist completed
    /// experiments, schedule follow-ups, release the session.
    pub(crate) async fn record_terminal(
        &self,
        state: &mut ConversationState,
        outcome: ConversationOutcome,
        tier_accepted: Option<TierLevel>,
    ) {
        let record = self.state.outcomes.record_outcome(
            state,
            outcome,
            state.current_tier(),
            tier_accepted,
            None,
        );

        if let Some(record) = record {
            match serde_json::to_value(&record) {
                Ok(row) => {
                    if let Err(e) = self.state.store.upsert(rows::OUTCOMES, row).await {
                        tracing::warn!(error = %e, "failed to persist outcome record");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "failed to serialize outcome record"),
            }

            self.state.experiments.record_outcome(&record);
            self.state.learning.consume(&record);

            // Persist any experiments the reward pushed to completion.
            for experiment in self.state.experiments.drain_completed() {
                match serde_json::to_value(&experiment) {
                    Ok(mut row) => {
                        if let Some(obj) = row.as_object_mut() {
                            obj.insert("experiment_id".into(), serde_json::json!(experiment.id));
                        }
                        if let Err(e) = self.state.store.upsert(rows::EXPERIMENTS, row).await {
                            tracing::warn!(error = %e, "failed to persist completed experiment");
                        }
                    }
                    Err(e) => tracing::warn!(error = %e, "failed to serialize experiment"),
                }
            }

            self.resolve_predictions(state.id, outcome).await;
            self.schedule_follow_ups(state, outcome);
        }

        self.state.mark_inactive(state.id);
    }

    /// Backfill `actual_outcome` / `was_correct` on this conversation's
    /// predictions now that the outcome is known.
    async fn resolve_predictions(&self, conversation_id: Uuid, outcome: ConversationOutcome) {
        let found = match self
            .state
            .store
            .select(
                rows::PREDICTIONS,
                &eq("conversation_id", conversation_id.to_string()),
                None,
            )
            .await
        {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(error = %e, "could not load predictions for resolution");
                return;
            }
        };

        let converted = outcome == ConversationOutcome::Converted;
        for row in found {
            let Ok(mut prediction) = serde_json::from_value::<Prediction>(row) else {
                continue;
            };
            if prediction.was_correct.is_some() {
                continue;
            }
            let correct = match prediction.kind {
                PredictionKind::Conversion => {
                    let predicted_hot = prediction
                        .data
                        .get("probability")
                        .and_then(|p| p.as_f64())
                        .unwrap_or(0.0)
                        >= 0.5;
                    predicted_hot == converted
                }
                _ => converted,
            };
            prediction.resolve(outcome.to_string(), correct);
            match serde_json::to_value(&prediction) {
                Ok(row) => {
                    if let Err(e) = self.state.store.upsert(rows::PREDICTIONS, row).await {
                        tracing::warn!(error = %e, "failed to persist resolved prediction");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "failed to serialize resolved prediction"),
            }
        }
    }

    fn schedule_follow_ups(&self, state: &ConversationState, outcome: ConversationOutcome) {
        let queue = &self.state.follow_ups;
        match outcome {
            ConversationOutcome::Converted => {
                queue.schedule(state.id, FollowUpKind::HighIntent, 1);
            }
            ConversationOutcome::Transferred => {
                queue.schedule(state.id, FollowUpKind::TransferFollowUp, 1);
            }
            ConversationOutcome::Lost => {}
            _ if !state.objections_raised.is_empty() => {
                queue.schedule(state.id, FollowUpKind::ObjectionHandling, 2);
            }
            _ => {}
        }
    }
}
