//! End-to-end scenarios against the full engine wired over the
//! in-memory row store and a scripted completion provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use cs_agent::{CompletionProvider, CompletionRequest};
use cs_domain::config::Config;
use cs_domain::conversation::{EndReason, Phase, ProgramType, Role};
use cs_domain::customer::CustomerData;
use cs_domain::envelope::ApiEnvelope;
use cs_domain::error::{Error, ErrorCode};
use cs_domain::platform::{PlatformContext, SourceType};
use cs_engine::{build_engine, Engine};
use cs_experiments::{ExperimentSpec, ExperimentType, TargetMetric, VariantSpec};
use cs_store::provider::eq;
use cs_store::{rows, MemoryRowStore, Reconciler, RowStore};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Harness
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Provider that answers instantly with a fixed consultive reply.
struct ScriptedProvider;

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn complete(&self, _req: CompletionRequest) -> cs_domain::error::Result<String> {
        Ok("¡Hola! Encantado de acompañarte. Cuéntame, ¿qué te gustaría lograr?".into())
    }
}

fn engine_with(config: Config) -> (Engine, Arc<MemoryRowStore>) {
    let remote = Arc::new(MemoryRowStore::new());
    let engine = build_engine(
        config,
        Arc::new(ScriptedProvider),
        None,
        Some(remote.clone() as Arc<dyn RowStore>),
    )
    .expect("engine builds");
    (engine, remote)
}

fn default_engine() -> (Engine, Arc<MemoryRowStore>) {
    engine_with(Config::default())
}

fn customer(id: &str, age: u32) -> CustomerData {
    CustomerData::new(id, "Carlos Méndez", "carlos@example.com", age).unwrap()
}

fn web_platform() -> PlatformContext {
    PlatformContext::for_source(SourceType::Web)
}

/// Rewind the persisted session start so elapsed-time rules fire without
/// sleeping in tests.
async fn rewind_session_start(remote: &MemoryRowStore, conversation_id: Uuid, secs: i64) {
    let filters = eq("conversation_id", conversation_id.to_string());
    let mut row = remote
        .select(rows::CONVERSATIONS, &filters, None)
        .await
        .unwrap()
        .pop()
        .unwrap();
    let rewound = Utc::now() - chrono::Duration::seconds(secs);
    row["session_start"] = serde_json::json!(rewound);
    remote.upsert(rows::CONVERSATIONS, row).await.unwrap();
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// S1 — cooldown enforcement
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn s1_second_start_within_cooldown_is_rejected() {
    let (engine, remote) = default_engine();
    let orchestrator = engine.orchestrator();

    let state = orchestrator
        .start_conversation(customer("C1", 34), web_platform(), Some(ProgramType::Prime))
        .await
        .unwrap();

    // An hour passes.
    rewind_session_start(&remote, state.id, 3600).await;

    let err = orchestrator
        .start_conversation(customer("C1", 34), web_platform(), Some(ProgramType::Prime))
        .await
        .unwrap_err();

    match &err {
        Error::CooldownActive {
            elapsed_seconds,
            seconds_remaining,
        } => {
            assert!(
                (3595..=3605).contains(elapsed_seconds),
                "elapsed = {elapsed_seconds}"
            );
            assert!(*seconds_remaining <= 48 * 3600 - 3595);
        }
        other => panic!("expected CooldownActive, got {other:?}"),
    }

    // The API envelope carries the elapsed detail.
    let envelope = ApiEnvelope::<()>::err(&err);
    let body = envelope.error.unwrap();
    assert_eq!(body.code, ErrorCode::CooldownActive);
    let elapsed = body.details.unwrap()["elapsed_seconds"].as_u64().unwrap();
    assert!((3595..=3605).contains(&elapsed));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// S2 / S3 — automatic program detection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn s2_productivity_interest_detects_prime() {
    let (engine, _remote) = default_engine();
    let profile = customer("C2", 34).with_interests(vec!["productivity".into()]);

    let state = engine
        .orchestrator()
        .start_conversation(profile, web_platform(), None)
        .await
        .unwrap();

    assert_eq!(state.program_type, ProgramType::Prime);
    assert_eq!(state.phase, Phase::Greeting);
    let greeting = state.last_assistant_message().unwrap();
    assert!(!greeting.content.is_empty());
}

#[tokio::test]
async fn s3_hybrid_detection_resolves_by_age() {
    let (engine, _remote) = default_engine();

    // 58 with no distinctive signals: router says HYBRID, age rule says
    // LONGEVITY.
    let older = engine
        .orchestrator()
        .start_conversation(customer("C3a", 58), web_platform(), None)
        .await
        .unwrap();
    assert_eq!(older.program_type, ProgramType::Longevity);

    let younger = engine
        .orchestrator()
        .start_conversation(customer("C3b", 42), web_platform(), None)
        .await
        .unwrap();
    assert_eq!(younger.program_type, ProgramType::Prime);
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// S4 — program switch mid-conversation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn s4_vitality_talk_switches_prime_to_longevity() {
    let (engine, _remote) = default_engine();
    let orchestrator = engine.orchestrator();

    let state = orchestrator
        .start_conversation(customer("C4", 45), web_platform(), Some(ProgramType::Prime))
        .await
        .unwrap();
    let id = state.id;

    // Warm-up turns with no routing signal.
    orchestrator
        .process_message(id, "hola, cuéntame más", true)
        .await
        .unwrap();
    orchestrator
        .process_message(id, "ok, entiendo, suena bien", true)
        .await
        .unwrap();

    let (state, _audio) = orchestrator
        .process_message(
            id,
            "mi preocupación es mantener mi vitalidad cuando me retire",
            true,
        )
        .await
        .unwrap();

    assert_eq!(state.program_type, ProgramType::Longevity);
    assert_eq!(state.program_switches.len(), 1);
    let switch = &state.program_switches[0];
    assert_eq!(switch.from, ProgramType::Prime);
    assert_eq!(switch.to, ProgramType::Longevity);
    assert!((switch.confidence - 0.82).abs() < 1e-9);
    assert!(switch.trigger_excerpt.starts_with("mi preocupación"));

    // The acknowledging assistant message was appended.
    assert!(state
        .messages
        .iter()
        .any(|m| m.role == Role::Assistant && m.content.contains("LONGEVITY")));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// S5 — natural timeout close
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn s5_timeout_ends_the_conversation_with_one_outcome_record() {
    let (engine, remote) = default_engine();
    let orchestrator = engine.orchestrator();

    let platform = web_platform().with_max_duration(300);
    let state = orchestrator
        .start_conversation(customer("C5", 40), platform, Some(ProgramType::Prime))
        .await
        .unwrap();
    let id = state.id;

    rewind_session_start(&remote, id, 301).await;

    let (state, _audio) = orchestrator.process_message(id, "hola", true).await.unwrap();
    assert_eq!(state.phase, Phase::Ended);
    assert_eq!(state.end_reason, Some(EndReason::Timeout));

    let outcomes = remote
        .select(rows::OUTCOMES, &eq("conversation_id", id.to_string()), None)
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0]["outcome"], "timed_out");

    // Ending again is idempotent: same state, still one record.
    let again = orchestrator
        .end_conversation(id, EndReason::Timeout)
        .await
        .unwrap();
    assert_eq!(again.phase, Phase::Ended);
    assert_eq!(remote.row_count(rows::OUTCOMES), 1);

    // A closed conversation rejects further messages.
    let err = orchestrator
        .process_message(id, "¿sigues ahí?", true)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ClosedConversation(_)));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// S6 — bandit assignment and reward
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn s6_bandit_explores_both_variants_then_exploits_the_winner() {
    let mut config = Config::default();
    config.engine.experiment_sample_rate = 1.0;
    let (engine, _remote) = engine_with(config);
    let orchestrator = engine.orchestrator();
    let experiments = &engine.state().experiments;

    let experiment = experiments
        .create_experiment(ExperimentSpec {
            name: "greeting-style".into(),
            experiment_type: ExperimentType::PromptVariant,
            hypothesis: "warm greeting converts better".into(),
            variants: vec![
                VariantSpec {
                    name: "A".into(),
                    weight: Some(0.5),
                    content: serde_json::json!({"style": "warm"}),
                },
                VariantSpec {
                    name: "B".into(),
                    weight: Some(0.5),
                    content: serde_json::json!({"style": "direct"}),
                },
            ],
            target_metric: TargetMetric::ConversionRate,
            minimum_sample: 1000,
            confidence_level: 0.8,
            auto_deploy_winner: false,
        })
        .unwrap();
    experiments.start_experiment(experiment.id).unwrap();

    let variant_name = |state: &cs_domain::conversation::ConversationState| -> String {
        state.insights["experiment_variants"][0]["name"]
            .as_str()
            .unwrap()
            .to_owned()
    };

    // First two conversations explore A and B (cold arms first).
    let first = orchestrator
        .start_conversation(customer("C6a", 35), web_platform(), Some(ProgramType::Prime))
        .await
        .unwrap();
    let second = orchestrator
        .start_conversation(customer("C6b", 35), web_platform(), Some(ProgramType::Prime))
        .await
        .unwrap();
    assert_eq!(first.experiment_assignments, vec![experiment.id]);
    assert_ne!(variant_name(&first), variant_name(&second));

    // First converts, second is lost.
    orchestrator
        .end_conversation(first.id, EndReason::IntentAchieved)
        .await
        .unwrap();
    orchestrator
        .end_conversation(second.id, EndReason::RejectionDetected)
        .await
        .unwrap();

    let snapshot = experiments.bandit_snapshot(experiment.id).unwrap();
    let mean_of = |name: &str| -> f64 {
        let variant = experiment.variants.iter().find(|v| v.name == name).unwrap();
        snapshot
            .iter()
            .find(|(id, _)| *id == variant.id)
            .unwrap()
            .1
            .mean_reward()
    };
    assert_eq!(mean_of(&variant_name(&first)), 1.0);
    assert_eq!(mean_of(&variant_name(&second)), 0.0);

    // The third assignment exploits the converting variant.
    let third = orchestrator
        .start_conversation(customer("C6c", 35), web_platform(), Some(ProgramType::Prime))
        .await
        .unwrap();
    assert_eq!(variant_name(&third), variant_name(&first));
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// S7 — store fallback and reconciliation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn s7_offline_store_stages_writes_and_reconciles_on_reconnect() {
    let (engine, remote) = default_engine();
    let orchestrator = engine.orchestrator();
    let store = &engine.state().store;

    let state = orchestrator
        .start_conversation(customer("C7", 40), web_platform(), Some(ProgramType::Prime))
        .await
        .unwrap();
    let id = state.id;

    // The remote goes dark mid-conversation.
    remote.set_offline(true);
    let (state, _audio) = orchestrator
        .process_message(id, "cuéntame cómo funciona", true)
        .await
        .unwrap();
    assert!(state.messages.len() >= 3);
    assert!(store.staged_len() >= 1, "write should be staged");

    // Reads are served from the write-through cache while offline.
    let (state, _audio) = orchestrator
        .process_message(id, "¿y qué incluye?", true)
        .await
        .unwrap();
    assert!(state.messages.len() >= 5);

    // Connectivity returns; the reconciler flushes the backlog.
    remote.set_offline(false);
    let reconciler = Reconciler::new(
        store.remote(),
        store.staged_queue(),
        Duration::from_secs(3600),
    );
    let flushed = reconciler.flush().await;
    assert!(flushed >= 1);
    assert_eq!(store.staged_len(), 0);

    let persisted = remote
        .select(rows::CONVERSATIONS, &eq("conversation_id", id.to_string()), None)
        .await
        .unwrap();
    assert_eq!(persisted.len(), 1);
    let restored = rows::row_to_conversation(persisted[0].clone()).unwrap();
    assert_eq!(restored.messages.len(), state.messages.len());
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Additional lifecycle coverage
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn unknown_conversation_is_not_found() {
    let (engine, _remote) = default_engine();
    let err = engine
        .orchestrator()
        .process_message(Uuid::new_v4(), "hola", true)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
}

#[tokio::test]
async fn human_transfer_request_parks_the_conversation() {
    let (engine, remote) = default_engine();
    let orchestrator = engine.orchestrator();

    let state = orchestrator
        .start_conversation(customer("C8", 40), web_platform(), Some(ProgramType::Prime))
        .await
        .unwrap();
    let id = state.id;

    let (state, _audio) = orchestrator
        .process_message(id, "prefiero hablar con una persona real", true)
        .await
        .unwrap();

    assert_eq!(state.phase, Phase::HumanTransfer);
    assert_eq!(state.end_reason, Some(EndReason::Transferred));
    // The handoff message is the last thing the customer hears from us.
    assert_eq!(state.messages.last().unwrap().role, Role::Assistant);

    let outcomes = remote
        .select(rows::OUTCOMES, &eq("conversation_id", id.to_string()), None)
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0]["outcome"], "transferred");

    // A transfer follow-up was scheduled.
    assert_eq!(orchestrator.follow_up_backlog(), 1);
}

#[tokio::test]
async fn rejection_closes_with_a_farewell() {
    let (engine, remote) = default_engine();
    let orchestrator = engine.orchestrator();

    let state = orchestrator
        .start_conversation(customer("C9", 40), web_platform(), Some(ProgramType::Prime))
        .await
        .unwrap();
    let id = state.id;

    let (state, _audio) = orchestrator
        .process_message(id, "la verdad no me interesa, no gracias", true)
        .await
        .unwrap();

    assert_eq!(state.phase, Phase::Ended);
    assert_eq!(state.end_reason, Some(EndReason::RejectionDetected));

    let outcomes = remote
        .select(rows::OUTCOMES, &eq("conversation_id", id.to_string()), None)
        .await
        .unwrap();
    assert_eq!(outcomes[0]["outcome"], "lost");
}

#[tokio::test]
async fn timestamps_are_monotonic_and_state_roundtrips() {
    let (engine, remote) = default_engine();
    let orchestrator = engine.orchestrator();

    let state = orchestrator
        .start_conversation(customer("C10", 40), web_platform(), Some(ProgramType::Prime))
        .await
        .unwrap();
    let id = state.id;

    for text in ["hola", "¿cómo funciona?", "suena interesante"] {
        orchestrator.process_message(id, text, true).await.unwrap();
    }

    let row = remote
        .select(rows::CONVERSATIONS, &eq("conversation_id", id.to_string()), None)
        .await
        .unwrap()
        .pop()
        .unwrap();
    let restored = rows::row_to_conversation(row).unwrap();

    // Message timestamps never go backwards.
    for pair in restored.messages.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
    assert!(restored.updated_at >= restored.created_at);
    assert_eq!(restored.id, id);

    // Persist → load → persist is stable.
    let row_again = rows::conversation_to_row(&restored).unwrap();
    let restored_again = rows::row_to_conversation(row_again).unwrap();
    assert_eq!(restored_again, restored);
}

#[tokio::test]
async fn predictions_are_written_per_turn_and_resolved_at_outcome() {
    let (engine, remote) = default_engine();
    let orchestrator = engine.orchestrator();

    let state = orchestrator
        .start_conversation(customer("C12", 40), web_platform(), Some(ProgramType::Prime))
        .await
        .unwrap();
    let id = state.id;

    orchestrator
        .process_message(id, "¿cómo funciona el programa?", true)
        .await
        .unwrap();

    let pending = remote
        .select(rows::PREDICTIONS, &eq("conversation_id", id.to_string()), None)
        .await
        .unwrap();
    assert!(pending.len() >= 2, "one conversion + one decision prediction per turn");
    assert!(pending.iter().all(|p| p["was_correct"].is_null()));

    orchestrator
        .end_conversation(id, EndReason::RejectionDetected)
        .await
        .unwrap();

    let resolved = remote
        .select(rows::PREDICTIONS, &eq("conversation_id", id.to_string()), None)
        .await
        .unwrap();
    assert!(resolved
        .iter()
        .all(|p| p["actual_outcome"] == "lost" && p["was_correct"].is_boolean()));
}

#[tokio::test]
async fn scheduler_sweep_closes_overdue_conversations() {
    let (engine, remote) = default_engine();
    let orchestrator = engine.orchestrator();

    let platform = web_platform().with_max_duration(120);
    let state = orchestrator
        .start_conversation(customer("C11", 40), platform, Some(ProgramType::Prime))
        .await
        .unwrap();
    rewind_session_start(&remote, state.id, 200).await;

    let scheduler = cs_engine::Scheduler::new(orchestrator.clone());
    let closed = scheduler.sweep_timeouts().await;
    assert_eq!(closed, 1);

    let after = orchestrator
        .end_conversation(state.id, EndReason::Timeout)
        .await
        .unwrap();
    assert_eq!(after.phase, Phase::Ended);
    assert_eq!(remote.row_count(rows::OUTCOMES), 1);
}
