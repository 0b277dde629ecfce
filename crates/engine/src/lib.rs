//! Conversation Orchestration Core.
//!
//! The orchestrator owns per-conversation state and drives each turn:
//! load → analyze (fan-out) → decide → reply → track → persist. Around it
//! sit the per-conversation run locks, the outcome tracker, the adaptive
//! learning consumer, and the scheduler that enforces timeouts and
//! follow-ups.

pub mod bootstrap;
pub mod learning;
pub mod locks;
pub mod orchestrator;
pub mod outcome;
pub mod scheduler;
pub mod state;
pub mod telemetry;

pub use bootstrap::{build_engine, Engine};
pub use learning::AdaptiveLearning;
pub use locks::ConversationLockMap;
pub use orchestrator::Orchestrator;
pub use outcome::OutcomeTracker;
pub use scheduler::{FollowUpKind, FollowUpQueue, Scheduler};
pub use state::EngineState;
