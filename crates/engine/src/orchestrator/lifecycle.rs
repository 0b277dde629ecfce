//! Pure lifecycle rules: continuation checks, transfer detection, phase
//! progression, and the canned transition messages.

use chrono::{DateTime, Utc};

use cs_analyzers::results::{ConversionBand, Emotion, TurnAnalysis};
use cs_domain::config::EngineConfig;
use cs_domain::conversation::{ConversationState, EndReason, Phase, ProgramType};
use cs_domain::outcome::ConversationOutcome;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Canned messages
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const FAREWELL_MARKERS: &[&str] = &[
    "hasta luego",
    "gracias por",
    "ha sido un placer",
    "nos vemos pronto",
    "hasta pronto",
];

pub const FAREWELL_MESSAGE: &str = "Ha sido un placer hablar contigo hoy. Si \
tienes alguna pregunta adicional, no dudes en contactarnos. ¡Hasta pronto!";

/// Whether an assistant message already reads as a farewell.
pub fn is_farewell(text: &str) -> bool {
    let lower = text.to_lowercase();
    FAREWELL_MARKERS.iter().any(|m| lower.contains(m))
}

pub fn closing_message(reason: EndReason) -> String {
    match reason {
        EndReason::Timeout => "Hemos llegado al límite de tiempo de esta sesión. \
            Gracias por tu interés; quedamos a tu disposición para retomar cuando \
            quieras. ¡Hasta pronto!"
            .into(),
        EndReason::RejectionDetected => "Entiendo perfectamente, gracias por tu \
            tiempo y tu sinceridad. Si en algún momento cambias de opinión, aquí \
            estaremos. ¡Que te vaya muy bien!"
            .into(),
        EndReason::IntentAchieved => "¡Excelente decisión! Te esperamos en la \
            sesión estratégica inicial. Gracias por tu confianza, ¡hasta muy \
            pronto!"
            .into(),
        _ => FAREWELL_MESSAGE.into(),
    }
}

pub fn switch_message(to: ProgramType) -> String {
    format!(
        "Entiendo mejor tus necesidades ahora. Basándome en lo que me has \
         contado, creo que el programa {to} sería perfecto para ti. Permíteme \
         contarte más sobre este programa específico."
    )
}

pub fn transfer_message(reason: &str) -> String {
    let _ = reason;
    "Por supuesto, te comunico ahora mismo con uno de nuestros especialistas \
     humanos. Un momento por favor, en seguida te atienden."
        .into()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Human transfer detection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

const TRANSFER_MARKERS: &[&str] = &[
    "hablar con una persona",
    "hablar con un humano",
    "agente humano",
    "una persona real",
    "con un representante",
    "con un asesor humano",
    "supervisor",
    "talk to a human",
    "real person",
];

/// Transfer is warranted when the customer asks for a human, or when the
/// emotional read flags sustained frustration.
pub fn transfer_reason(user_text: &str, analysis: &TurnAnalysis) -> Option<String> {
    let lower = user_text.to_lowercase();
    if TRANSFER_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some("customer requested a human agent".into());
    }
    if analysis.emotion.primary == Emotion::Frustrated
        && analysis.emotion.confidence >= 0.7
        && analysis.emotion.stability >= 0.5
    {
        return Some("sustained frustration detected".into());
    }
    None
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Continuation rules
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Evaluate the terminal conditions for this turn, most specific first.
pub fn terminal_condition(
    state: &ConversationState,
    analysis: &TurnAnalysis,
    now: DateTime<Utc>,
    config: &EngineConfig,
) -> Option<(EndReason, ConversationOutcome)> {
    // Intent achieved: purchase intent plus an agreed next step.
    if analysis.intent.has_purchase_intent() && state.next_steps_agreed {
        return Some((EndReason::IntentAchieved, ConversationOutcome::Converted));
    }

    // Hard rejection.
    if analysis.intent.has_rejection()
        && analysis.intent.confidence >= config.rejection_confidence_threshold
    {
        return Some((EndReason::RejectionDetected, ConversationOutcome::Lost));
    }

    // Timeout without detected intent.
    if state.elapsed_secs(now) > state.max_duration_secs && !analysis.intent.has_purchase_intent()
    {
        return Some((EndReason::Timeout, ConversationOutcome::TimedOut));
    }

    // Message-count ceiling.
    if state.messages.len() >= config.max_messages_per_conversation {
        return Some((EndReason::EndedNaturally, ConversationOutcome::EndedNaturally));
    }

    None
}

pub fn outcome_for_reason(reason: EndReason) -> ConversationOutcome {
    match reason {
        EndReason::Timeout => ConversationOutcome::TimedOut,
        EndReason::RejectionDetected => ConversationOutcome::Lost,
        EndReason::IntentAchieved => ConversationOutcome::Converted,
        EndReason::Transferred => ConversationOutcome::Transferred,
        EndReason::Completed | EndReason::EndedNaturally => ConversationOutcome::EndedNaturally,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Phase progression
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where the conversation should move next, if anywhere, based on this
/// turn's analysis. Returns only edges of the lifecycle DAG.
pub fn next_phase(current: Phase, analysis: &TurnAnalysis, message_count: usize) -> Option<Phase> {
    let hot_conversion = matches!(
        analysis.conversion.category,
        ConversionBand::High | ConversionBand::VeryHigh
    );
    let strong_objection = analysis
        .objections
        .top()
        .map(|o| o.confidence >= 0.7)
        .unwrap_or(false);

    match current {
        // The first customer turn moves us out of greeting.
        Phase::Greeting => Some(Phase::Exploration),
        Phase::Exploration
            if analysis.conversion.category != ConversionBand::Low || message_count >= 8 =>
        {
            Some(Phase::Presentation)
        }
        Phase::Presentation if hot_conversion && analysis.intent.has_purchase_intent() => {
            Some(Phase::Closing)
        }
        Phase::Presentation if strong_objection => Some(Phase::ObjectionHandling),
        Phase::ObjectionHandling if hot_conversion && analysis.intent.has_purchase_intent() => {
            Some(Phase::Closing)
        }
        Phase::ObjectionHandling if !strong_objection => Some(Phase::Presentation),
        _ => None,
    }
}
