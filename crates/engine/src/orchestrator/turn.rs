//! Turn execution — the inner pipeline behind `process_message`.
//!
//! One turn is: load state → append the user message → analyzer fan-out →
//! program-switch / forced-analysis / transfer checks → decision engine →
//! agent reply → continuation rules → voice → persist. The whole sequence
//! runs under the per-conversation run lock.

use std::time::{Duration, Instant};

use chrono::Utc;
use uuid::Uuid;

use cs_agent::AgentTurnContext;
use cs_analyzers::results::{ConversionBand, TurnAnalysis};
use cs_analyzers::router::ProgramRouterAnalyzer;
use cs_analyzers::ConversationSnapshot;
use cs_decision::{ActionCategory, Decision};
use cs_domain::conversation::{
    ConversationState, EndReason, Phase, ProgramSwitch, ProgramType, Role,
};
use cs_domain::error::{Error, Result};
use cs_domain::prediction::{Prediction, PredictionKind};
use cs_domain::tier::TierLevel;
use cs_domain::trace::TraceEvent;
use cs_store::{rows, RowStore};

use super::lifecycle;
use super::Orchestrator;

impl Orchestrator {
    /// Process one user message and produce the assistant reply.
    ///
    /// Returns the updated state plus the synthesized reply audio (empty
    /// when voice is disabled). `check_intent = false` skips transfer and
    /// continuation checks (used by inspection endpoints).
    pub async fn process_message(
        &self,
        conversation_id: Uuid,
        user_text: &str,
        check_intent: bool,
    ) -> Result<(ConversationState, Vec<u8>)> {
        let _permit = self.state.locks.acquire(conversation_id).await;
        let turn_started = Instant::now();

        let mut state = self.load_state(conversation_id).await?;
        if state.is_terminal() {
            return Err(Error::ClosedConversation(conversation_id));
        }

        let platform = self.platform_of(&state);
        let agent = self.ensure_agent(&state);

        state.push_message(Role::User, user_text)?;
        self.state
            .outcomes
            .record_user_message(state.id, user_text, Utc::now());

        // ── Analyzer fan-out ─────────────────────────────────────────
        let now = Utc::now();
        let remaining_secs = state.max_duration_secs.saturating_sub(state.elapsed_secs(now));
        let analyzer_deadline = self
            .state
            .analyzers
            .default_deadline()
            .min(Duration::from_secs(remaining_secs.max(1)));

        let snapshot = ConversationSnapshot::capture(
            &state,
            user_text,
            self.state.config.decision.context_window,
        );
        let analysis = self
            .state
            .analyzers
            .run_with_deadline(&snapshot, analyzer_deadline)
            .await;

        // ── Program switch ───────────────────────────────────────────
        self.check_program_switch(&mut state, &analysis, user_text)?;

        // ── Forced profile analysis ──────────────────────────────────
        if agent.should_force_profile_analysis() {
            self.run_forced_profile_analysis(&mut state, agent.as_ref());
        }

        // ── Human transfer ───────────────────────────────────────────
        if check_intent && platform.enable_transfer {
            if let Some(reason) = lifecycle::transfer_reason(user_text, &analysis) {
                return self.transfer_to_human(state, reason, &platform).await;
            }
        }

        // ── Phase progression ────────────────────────────────────────
        if let Some(next) = lifecycle::next_phase(state.phase, &analysis, state.messages.len()) {
            let from = state.phase;
            state.transition(next)?;
            TraceEvent::PhaseChanged {
                conversation_id: state.id.to_string(),
                from: from.to_string(),
                to: next.to_string(),
            }
            .emit();
        }

        // ── Session memory: objections & tier progression ───────────
        self.absorb_analysis(&mut state, &analysis);

        // ── Decision engine ──────────────────────────────────────────
        let decision = self.state.decision.evaluate(&analysis, None);
        if analysis.conversion.category == ConversionBand::VeryHigh
            && decision.actions.iter().any(|a| {
                a.category == ActionCategory::ConversionProgression
                    && a.priority == cs_analyzers::results::ActionPriority::High
            })
        {
            state.next_steps_agreed = true;
        }
        self.store_predictions(&state, &analysis, &decision).await;

        // ── Agent reply ──────────────────────────────────────────────
        let reply = match self
            .agent_reply(&state, agent.as_ref(), user_text, &analysis, &decision, remaining_secs)
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                // The turn fails, but the appended user message is still
                // persisted so a retry is idempotent.
                if let Err(persist_err) = self.persist_state(&state).await {
                    tracing::warn!(
                        error = %persist_err,
                        "failed to persist partial state after reply failure"
                    );
                }
                return Err(e);
            }
        };

        state.push_message(Role::Assistant, reply.clone())?;
        self.state
            .outcomes
            .record_assistant_message(state.id, Utc::now());

        // ── Continuation rules ───────────────────────────────────────
        if check_intent {
            if let Some((reason, outcome)) =
                lifecycle::terminal_condition(&state, &analysis, Utc::now(), &self.state.config.engine)
            {
                state.push_message(Role::Assistant, lifecycle::closing_message(reason))?;
                self.state
                    .outcomes
                    .record_assistant_message(state.id, Utc::now());
                state.end_reason = Some(reason);
                state.transition(Phase::Ended)?;
                self.record_terminal(&mut state, outcome, None).await;
                self.persist_state(&state).await?;

                TraceEvent::ConversationEnded {
                    conversation_id: state.id.to_string(),
                    reason: reason.to_string(),
                }
                .emit();

                let audio = self.synthesize(&platform, &state).await;
                return Ok((state, audio));
            }
        }

        self.persist_state(&state).await?;

        TraceEvent::TurnCompleted {
            conversation_id: state.id.to_string(),
            duration_ms: turn_started.elapsed().as_millis() as u64,
            actions: decision.actions.len(),
            decision_confidence: decision.confidence,
        }
        .emit();

        let audio = self.synthesize(&platform, &state).await;
        Ok((state, audio))
    }

    // ── helpers ──────────────────────────────────────────────────────

    /// Switch program mid-conversation when the router is confident the
    /// current assignment is wrong.
    fn check_program_switch(
        &self,
        state: &mut ConversationState,
        analysis: &TurnAnalysis,
        user_text: &str,
    ) -> Result<()> {
        let config = &self.state.config.engine;
        // Too early — avoid premature switches on thin context.
        if state.messages.len() < config.switch_min_messages {
            return Ok(());
        }
        let route = &analysis.route;
        if route.confidence < config.switch_confidence_threshold
            || route.recommended_program == state.program_type
            || route.recommended_program == ProgramType::Hybrid
        {
            return Ok(());
        }

        let from = state.program_type;
        let to = route.recommended_program;
        state.record_switch(ProgramSwitch {
            at: Utc::now(),
            from,
            to,
            confidence: route.confidence,
            reasoning: route.reasoning.clone(),
            trigger_excerpt: user_text.chars().take(100).collect(),
        });
        state.push_message(Role::Assistant, lifecycle::switch_message(to))?;
        self.state
            .outcomes
            .record_assistant_message(state.id, Utc::now());

        if let Some(agent) = self.state.agents.get(state.id) {
            agent.update_detection(to, route.confidence);
        }

        TraceEvent::ProgramSwitched {
            conversation_id: state.id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            confidence: route.confidence,
        }
        .emit();
        Ok(())
    }

    /// Early-window profile analysis over the combined recent user
    /// utterances, fed back to the agent.
    fn run_forced_profile_analysis(
        &self,
        state: &mut ConversationState,
        agent: &cs_agent::DialogAgent,
    ) {
        let context = agent.profile_analysis_context();
        let combined = state.recent_user_texts(6).join(" ");
        let route =
            ProgramRouterAnalyzer::route(&combined, state.customer.age, &state.customer.interests);

        TraceEvent::ForcedProfileAnalysis {
            conversation_id: state.id.to_string(),
            elapsed_secs: context.elapsed_secs,
            previous_confidence: context.current_confidence,
            recommended_program: route.recommended_program.to_string(),
        }
        .emit();

        agent.process_forced_analysis_result(&route);
        state.set_insight(
            "forced_analysis",
            serde_json::json!({
                "elapsed_secs": context.elapsed_secs,
                "previous_confidence": context.current_confidence,
                "recommended_program": route.recommended_program.to_string(),
                "confidence": route.confidence,
            }),
        );
    }

    /// Hand off to a human: transfer message, terminal-for-this-service
    /// phase, outcome record.
    async fn transfer_to_human(
        &self,
        mut state: ConversationState,
        reason: String,
        platform: &cs_domain::platform::PlatformContext,
    ) -> Result<(ConversationState, Vec<u8>)> {
        state.push_message(Role::Assistant, lifecycle::transfer_message(&reason))?;
        self.state
            .outcomes
            .record_assistant_message(state.id, Utc::now());
        state.end_reason = Some(EndReason::Transferred);
        state.transition(Phase::HumanTransfer)?;
        state.set_insight("human_transfer", serde_json::json!({ "reason": reason }));

        TraceEvent::HumanTransfer {
            conversation_id: state.id.to_string(),
            reason: reason.clone(),
        }
        .emit();

        self.record_terminal(&mut state, cs_domain::outcome::ConversationOutcome::Transferred, None)
            .await;
        self.persist_state(&state).await?;

        let audio = self.synthesize(platform, &state).await;
        Ok((state, audio))
    }

    /// One completion call under the remaining-session deadline.
    async fn agent_reply(
        &self,
        state: &ConversationState,
        agent: &cs_agent::DialogAgent,
        user_text: &str,
        analysis: &TurnAnalysis,
        decision: &Decision,
        remaining_secs: u64,
    ) -> Result<String> {
        let history_window = self.state.config.engine.history_window;
        let history: Vec<(Role, String)> = state
            .recent_messages(history_window)
            .iter()
            .map(|m| (m.role, m.content.clone()))
            .collect();

        let mut context = AgentTurnContext::from_analysis(history, analysis)
            .with_variants(self.variants_of(state));

        // Fold the ranked next actions into the turn guidance.
        if !decision.actions.is_empty() {
            let actions: Vec<String> = decision
                .actions
                .iter()
                .map(|a| format!("{} ({:.2})", a.description, a.score))
                .collect();
            let summary = context.analyzer_summary.take().unwrap_or_default();
            context.analyzer_summary = Some(format!(
                "{summary} · Próximas acciones: {}",
                actions.join("; ")
            ));
        }

        let deadline = Duration::from_secs(remaining_secs.max(1));
        match tokio::time::timeout(deadline, agent.process_message(user_text, &context)).await {
            Ok(result) => result,
            Err(_) => Err(Error::UpstreamTimeout(format!(
                "agent reply exceeded the session remainder ({remaining_secs}s)"
            ))),
        }
    }

    /// Write this turn's scored predictions. Failures are logged and
    /// never fail the turn.
    async fn store_predictions(
        &self,
        state: &ConversationState,
        analysis: &TurnAnalysis,
        decision: &Decision,
    ) {
        let predictions = [
            Prediction::new(
                "conversion_prediction_model",
                state.id,
                PredictionKind::Conversion,
                serde_json::json!({
                    "probability": analysis.conversion.probability,
                    "category": analysis.conversion.category.to_string(),
                }),
                analysis.conversion.confidence,
            ),
            Prediction::new(
                "decision_engine_model",
                state.id,
                PredictionKind::Decision,
                serde_json::json!({
                    "actions": decision
                        .actions
                        .iter()
                        .map(|a| a.description.clone())
                        .collect::<Vec<_>>(),
                    "objectives": decision.objectives_used,
                }),
                decision.confidence,
            ),
        ];

        for prediction in predictions {
            match serde_json::to_value(&prediction) {
                Ok(row) => {
                    if let Err(e) = self.state.store.insert(rows::PREDICTIONS, row).await {
                        tracing::warn!(error = %e, "failed to store prediction");
                    }
                }
                Err(e) => tracing::warn!(error = %e, "failed to serialize prediction"),
            }
        }
    }

    /// Remember confident objections and tier movements on the state.
    fn absorb_analysis(&self, state: &mut ConversationState, analysis: &TurnAnalysis) {
        let config = &self.state.config.analyzers;

        for objection in &analysis.objections.objections {
            if objection.confidence >= config.objection_memory_threshold {
                state.add_objection(objection.kind.to_string());
            }
        }

        let tier = &analysis.tier;
        if tier.confidence >= config.tier_confidence_floor
            && state.current_tier() != Some(tier.tier)
        {
            state.record_tier(cs_domain::conversation::TierEvent {
                tier: tier.tier,
                confidence: tier.confidence,
                at: Utc::now(),
            });
        }
    }

    /// Voice synthesis for the last assistant message, when enabled.
    async fn synthesize(
        &self,
        platform: &cs_domain::platform::PlatformContext,
        state: &ConversationState,
    ) -> Vec<u8> {
        if !platform.enable_voice || !self.state.config.features.voice_synthesis {
            return Vec::new();
        }
        let Some(message) = state.last_assistant_message() else {
            return Vec::new();
        };
        match self.state.voice.synthesize(&message.content).await {
            Ok(audio) => audio,
            Err(e) => {
                tracing::warn!(error = %e, "voice synthesis failed; returning empty audio");
                Vec::new()
            }
        }
    }

    /// Record an accepted tier and close with a converted outcome
    /// (called by the API layer when the customer commits).
    pub async fn accept_tier(
        &self,
        conversation_id: Uuid,
        tier: TierLevel,
    ) -> Result<ConversationState> {
        let _permit = self.state.locks.acquire(conversation_id).await;
        let mut state = self.load_state(conversation_id).await?;
        if state.is_terminal() {
            return Ok(state);
        }
        state.end_reason = Some(EndReason::IntentAchieved);
        state.transition(Phase::Ended)?;
        self.record_terminal(
            &mut state,
            cs_domain::outcome::ConversationOutcome::Converted,
            Some(tier),
        )
        .await;
        self.persist_state(&state).await?;
        Ok(state)
    }
}
