//! Agent construction boundary.

use std::sync::Arc;

use cs_domain::config::EngineConfig;
use cs_domain::conversation::ProgramType;
use cs_domain::customer::CustomerData;
use cs_domain::platform::PlatformContext;

use crate::agent::DialogAgent;
use crate::prompts::PromptLibrary;
use crate::traits::CompletionProvider;

/// Builds one [`DialogAgent`] per conversation, binding the prompt
/// template for the program and the configured forced-analysis trigger.
pub struct AgentFactory {
    provider: Arc<dyn CompletionProvider>,
    prompts: Arc<PromptLibrary>,
    forced_analysis_max_elapsed_secs: u64,
    forced_analysis_confidence_floor: f64,
}

impl AgentFactory {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        prompts: Arc<PromptLibrary>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            provider,
            prompts,
            forced_analysis_max_elapsed_secs: config.forced_analysis_max_elapsed_secs,
            forced_analysis_confidence_floor: config.forced_analysis_confidence_floor,
        }
    }

    /// Construct an agent for a session.
    ///
    /// The platform context is logged for observability; conversation
    /// limits derived from it are enforced by the orchestrator, not here.
    pub fn create_agent(
        &self,
        platform: &PlatformContext,
        customer: &CustomerData,
        program: ProgramType,
    ) -> DialogAgent {
        tracing::debug!(
            source = %platform.source,
            program = %program,
            customer_id = %customer.id,
            "creating dialog agent"
        );
        DialogAgent::new(
            self.provider.clone(),
            self.prompts.clone(),
            customer.clone(),
            program,
            self.forced_analysis_max_elapsed_secs,
            self.forced_analysis_confidence_floor,
        )
    }
}
