//! The stateful dialog agent bound to one conversation.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use cs_analyzers::results::RouteResult;
use cs_domain::conversation::{ProgramType, Role};
use cs_domain::customer::CustomerData;
use cs_domain::error::{Error, Result};

use crate::context::AgentTurnContext;
use crate::prompts::PromptLibrary;
use crate::traits::{CompletionProvider, CompletionRequest};

/// Inputs for a forced profile analysis run.
#[derive(Debug, Clone, Copy)]
pub struct ProfileAnalysisContext {
    pub elapsed_secs: u64,
    pub current_confidence: f64,
}

/// Mutable detection state the agent tracks across its turns.
struct DetectionState {
    program: ProgramType,
    confidence: f64,
    forced_analysis_done: bool,
}

/// One conversation's dialog agent.
///
/// Created by the [`crate::AgentFactory`] at session start and kept for
/// the life of the conversation. The orchestrator is the only caller.
pub struct DialogAgent {
    provider: Arc<dyn CompletionProvider>,
    prompts: Arc<PromptLibrary>,
    customer: CustomerData,
    started: Instant,
    detection: RwLock<DetectionState>,
    forced_analysis_max_elapsed_secs: u64,
    forced_analysis_confidence_floor: f64,
}

impl DialogAgent {
    pub(crate) fn new(
        provider: Arc<dyn CompletionProvider>,
        prompts: Arc<PromptLibrary>,
        customer: CustomerData,
        program: ProgramType,
        forced_analysis_max_elapsed_secs: u64,
        forced_analysis_confidence_floor: f64,
    ) -> Self {
        Self {
            provider,
            prompts,
            customer,
            started: Instant::now(),
            detection: RwLock::new(DetectionState {
                program,
                // A caller-specified program starts confident; HYBRID means
                // detection is still open.
                confidence: if program == ProgramType::Hybrid { 0.3 } else { 0.8 },
                forced_analysis_done: false,
            }),
            forced_analysis_max_elapsed_secs,
            forced_analysis_confidence_floor,
        }
    }

    pub fn program(&self) -> ProgramType {
        self.detection.read().program
    }

    pub fn set_program(&self, program: ProgramType) {
        self.detection.write().program = program;
    }

    pub fn detection_confidence(&self) -> f64 {
        self.detection.read().confidence
    }

    /// Update the program detection read (router output, switches).
    pub fn update_detection(&self, program: ProgramType, confidence: f64) {
        let mut detection = self.detection.write();
        detection.program = program;
        detection.confidence = confidence;
    }

    // ── completion calls ─────────────────────────────────────────────

    /// Produce the opening assistant message.
    pub async fn greeting(&self) -> Result<String> {
        let detection = self.detection.read();
        let system = self.prompts.render(detection.program, &self.customer);
        let program = detection.program;
        drop(detection);

        let request = CompletionRequest {
            system,
            messages: vec![(
                Role::User,
                format!(
                    "Genera un saludo breve y cálido para {} interesado en {}",
                    self.customer.given_name(),
                    program
                ),
            )],
            temperature: Some(0.7),
            max_tokens: Some(300),
        };
        self.complete(request).await
    }

    /// One assistant reply for a user message under the fused context.
    pub async fn process_message(
        &self,
        user_text: &str,
        context: &AgentTurnContext,
    ) -> Result<String> {
        let mut system = self
            .prompts
            .render(self.detection.read().program, &self.customer);
        let sections = context.render_sections();
        if !sections.is_empty() {
            system.push_str("\n\n");
            system.push_str(&sections);
        }

        let mut messages = context.history.clone();
        messages.push((Role::User, user_text.to_owned()));

        let request = CompletionRequest {
            system,
            messages,
            temperature: Some(0.7),
            max_tokens: Some(800),
        };
        self.complete(request).await
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        match self.provider.complete(request).await {
            Ok(text) => Ok(text),
            Err(e @ Error::UpstreamTimeout(_)) => Err(e),
            Err(Error::Http(message)) | Err(Error::Upstream { message, .. }) => {
                Err(Error::Upstream {
                    service: "llm".into(),
                    message,
                })
            }
            Err(other) => Err(other),
        }
    }

    // ── forced profile analysis ──────────────────────────────────────

    /// Whether the early profile analysis should be forced this turn:
    /// still inside the early window, detection not yet confident, and
    /// not already done.
    pub fn should_force_profile_analysis(&self) -> bool {
        let detection = self.detection.read();
        !detection.forced_analysis_done
            && self.elapsed_secs() < self.forced_analysis_max_elapsed_secs
            && detection.confidence < self.forced_analysis_confidence_floor
    }

    pub fn profile_analysis_context(&self) -> ProfileAnalysisContext {
        ProfileAnalysisContext {
            elapsed_secs: self.elapsed_secs(),
            current_confidence: self.detection.read().confidence,
        }
    }

    /// Feed the forced analysis result back into detection state.
    pub fn process_forced_analysis_result(&self, route: &RouteResult) {
        let mut detection = self.detection.write();
        detection.forced_analysis_done = true;
        if route.confidence > detection.confidence {
            detection.program = route.recommended_program;
            detection.confidence = route.confidence;
        }
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    pub fn customer(&self) -> &CustomerData {
        &self.customer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    /// Provider that echoes the last user message (tests only).
    struct EchoProvider;

    #[async_trait]
    impl CompletionProvider for EchoProvider {
        async fn complete(&self, req: CompletionRequest) -> Result<String> {
            Ok(req
                .messages
                .last()
                .map(|(_, text)| format!("echo: {text}"))
                .unwrap_or_default())
        }
    }

    fn agent(program: ProgramType) -> DialogAgent {
        let customer = CustomerData::new("c", "Ana", "a@b.com", 34).unwrap();
        DialogAgent::new(
            Arc::new(EchoProvider),
            Arc::new(PromptLibrary::default()),
            customer,
            program,
            60,
            0.6,
        )
    }

    #[tokio::test]
    async fn greeting_goes_through_the_provider() {
        let greeting = agent(ProgramType::Prime).greeting().await.unwrap();
        assert!(greeting.contains("Ana"));
    }

    #[test]
    fn forced_analysis_fires_only_while_unconfident_and_early() {
        let agent = agent(ProgramType::Hybrid);
        assert!(agent.should_force_profile_analysis());

        // Confident detection switches it off.
        agent.update_detection(ProgramType::Prime, 0.9);
        assert!(!agent.should_force_profile_analysis());
    }

    #[test]
    fn forced_analysis_runs_at_most_once() {
        let agent = agent(ProgramType::Hybrid);
        let route = RouteResult {
            recommended_program: ProgramType::Longevity,
            confidence: 0.4,
            reasoning: "weak".into(),
        };
        agent.process_forced_analysis_result(&route);
        assert!(!agent.should_force_profile_analysis());
    }

    #[test]
    fn forced_result_only_upgrades_confidence() {
        let agent = agent(ProgramType::Prime); // starts at 0.8
        let weak = RouteResult {
            recommended_program: ProgramType::Longevity,
            confidence: 0.4,
            reasoning: "weak".into(),
        };
        agent.process_forced_analysis_result(&weak);
        assert_eq!(agent.program(), ProgramType::Prime);

        let strong = RouteResult {
            recommended_program: ProgramType::Longevity,
            confidence: 0.9,
            reasoning: "strong".into(),
        };
        // A fresh agent (forced analysis not yet done) accepts upgrades.
        let agent = self::agent(ProgramType::Hybrid);
        agent.process_forced_analysis_result(&strong);
        assert_eq!(agent.program(), ProgramType::Longevity);
        assert!((agent.detection_confidence() - 0.9).abs() < 1e-9);
    }
}
