use async_trait::async_trait;

use cs_domain::error::Result;

use crate::results::{AnalyzerKind, AnalyzerResult};
use crate::snapshot::ConversationSnapshot;

/// One per-turn extractor.
///
/// Implementations are stateless: everything they need arrives in the
/// snapshot. `analyze` is async because some analyzers consult external
/// NLP providers; the registry bounds every call with a deadline.
#[async_trait]
pub trait Analyzer: Send + Sync {
    fn kind(&self) -> AnalyzerKind;

    async fn analyze(&self, snapshot: &ConversationSnapshot) -> Result<AnalyzerResult>;

    /// The result substituted when this analyzer fails or misses its
    /// deadline. Must be cheap and never fail.
    fn neutral(&self) -> AnalyzerResult;
}
