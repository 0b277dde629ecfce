//! Per-turn analyzers.
//!
//! Each analyzer is a pure, stateless extractor from a read-only
//! [`ConversationSnapshot`] to a typed result with a confidence score.
//! The [`AnalyzerSet`] runs all eight concurrently under a shared
//! deadline; any failure or timeout is replaced with the analyzer's
//! neutral default, so the orchestrator never loses a turn to an
//! analyzer.

pub mod conversion;
pub mod emotion;
pub mod intent;
pub mod lexicon;
pub mod needs;
pub mod objection;
pub mod personality;
pub mod registry;
pub mod results;
pub mod router;
pub mod snapshot;
pub mod tier;
pub mod traits;

pub use registry::AnalyzerSet;
pub use results::{AnalyzerKind, AnalyzerResult, TurnAnalysis};
pub use snapshot::ConversationSnapshot;
pub use traits::Analyzer;
