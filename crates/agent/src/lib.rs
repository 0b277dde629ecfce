//! Stateful dialog agent and its construction boundary.
//!
//! The agent owns the prompt template for its program, tracks detection
//! confidence for the forced-profile-analysis heuristic, and turns a
//! fused turn context into one completion call. The LLM itself and voice
//! synthesis are external collaborators behind the traits in
//! [`traits`].

pub mod agent;
pub mod context;
pub mod factory;
pub mod prompts;
pub mod traits;

pub use agent::{DialogAgent, ProfileAnalysisContext};
pub use context::AgentTurnContext;
pub use factory::AgentFactory;
pub use prompts::PromptLibrary;
pub use traits::{CompletionProvider, CompletionRequest, NullVoice, VoiceSynthesizer};
