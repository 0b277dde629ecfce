//! External collaborator contracts: LLM completion and voice synthesis.

use async_trait::async_trait;

use cs_domain::conversation::Role;
use cs_domain::error::Result;

/// A provider-agnostic completion request.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    /// System instructions (prompt template + fused turn context).
    pub system: String,
    /// Conversation messages, oldest first.
    pub messages: Vec<(Role, String)>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// The LLM completion boundary. Implemented outside this workspace.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, req: CompletionRequest) -> Result<String>;
}

/// The voice synthesis boundary. Implemented outside this workspace.
#[async_trait]
pub trait VoiceSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// Voice synthesizer used when voice is disabled: always empty audio.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullVoice;

#[async_trait]
impl VoiceSynthesizer for NullVoice {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
        Ok(Vec::new())
    }
}
