//! Fixed analyzer registry and the deadline-bounded fan-out.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;

use cs_domain::config::AnalyzersConfig;
use cs_domain::trace::TraceEvent;

use crate::conversion::{ConversionPredictorAnalyzer, ConversionThresholds};
use crate::emotion::EmotionAnalyzer;
use crate::intent::IntentAnalyzer;
use crate::lexicon::SentimentProvider;
use crate::needs::NeedsPredictorAnalyzer;
use crate::objection::ObjectionPredictorAnalyzer;
use crate::personality::PersonalityAnalyzer;
use crate::results::TurnAnalysis;
use crate::router::ProgramRouterAnalyzer;
use crate::snapshot::ConversationSnapshot;
use crate::tier::TierDetectorAnalyzer;
use crate::traits::Analyzer;

/// The fixed set of per-turn analyzers.
///
/// All eight run concurrently per turn; each gets the same deadline and
/// falls back to its neutral default on error or timeout, so a failing
/// analyzer never fails the turn.
pub struct AnalyzerSet {
    analyzers: Vec<Arc<dyn Analyzer>>,
    default_deadline: Duration,
}

impl AnalyzerSet {
    /// Build the standard registry.
    pub fn standard(
        config: &AnalyzersConfig,
        conversion_thresholds: [f64; 3],
        sentiment: Arc<dyn SentimentProvider>,
    ) -> Self {
        let analyzers: Vec<Arc<dyn Analyzer>> = vec![
            Arc::new(IntentAnalyzer),
            Arc::new(EmotionAnalyzer::new(sentiment.clone())),
            Arc::new(PersonalityAnalyzer),
            Arc::new(ProgramRouterAnalyzer),
            Arc::new(TierDetectorAnalyzer),
            Arc::new(ObjectionPredictorAnalyzer::new(sentiment.clone())),
            Arc::new(NeedsPredictorAnalyzer),
            Arc::new(ConversionPredictorAnalyzer::new(
                sentiment,
                ConversionThresholds(conversion_thresholds),
            )),
        ];
        Self {
            analyzers,
            default_deadline: Duration::from_millis(config.deadline_ms),
        }
    }

    /// Build a registry from explicit analyzers (tests use this to inject
    /// slow or failing implementations).
    pub fn from_analyzers(analyzers: Vec<Arc<dyn Analyzer>>, default_deadline: Duration) -> Self {
        Self {
            analyzers,
            default_deadline,
        }
    }

    pub fn default_deadline(&self) -> Duration {
        self.default_deadline
    }

    /// Run the fan-out with the default deadline.
    pub async fn run(&self, snapshot: &ConversationSnapshot) -> TurnAnalysis {
        self.run_with_deadline(snapshot, self.default_deadline).await
    }

    /// Run every analyzer concurrently, bounding each call by `deadline`.
    pub async fn run_with_deadline(
        &self,
        snapshot: &ConversationSnapshot,
        deadline: Duration,
    ) -> TurnAnalysis {
        let futures = self.analyzers.iter().map(|analyzer| {
            let analyzer = analyzer.clone();
            async move {
                match tokio::time::timeout(deadline, analyzer.analyze(snapshot)).await {
                    Ok(Ok(result)) => result,
                    Ok(Err(e)) => {
                        TraceEvent::AnalyzerFallback {
                            conversation_id: snapshot.conversation_id.to_string(),
                            analyzer: analyzer.kind().to_string(),
                            reason: e.to_string(),
                        }
                        .emit();
                        analyzer.neutral()
                    }
                    Err(_) => {
                        TraceEvent::AnalyzerFallback {
                            conversation_id: snapshot.conversation_id.to_string(),
                            analyzer: analyzer.kind().to_string(),
                            reason: format!("deadline exceeded ({deadline:?})"),
                        }
                        .emit();
                        analyzer.neutral()
                    }
                }
            }
        });

        let mut analysis = TurnAnalysis::neutral();
        for result in join_all(futures).await {
            analysis.apply(result);
        }
        analysis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::LexiconSentiment;
    use crate::results::{AnalyzerKind, AnalyzerResult, IntentKind, IntentResult};
    use async_trait::async_trait;
    use cs_domain::conversation::{ConversationState, ProgramType, Role};
    use cs_domain::customer::CustomerData;
    use cs_domain::error::Error;

    fn snapshot(text: &str) -> ConversationSnapshot {
        let customer = CustomerData::new("c", "Ana", "a@b.com", 35).unwrap();
        let mut state = ConversationState::new(customer, ProgramType::Prime, 1800, 180);
        state.push_message(Role::User, text).unwrap();
        ConversationSnapshot::capture(&state, text, 10)
    }

    /// Analyzer that sleeps past any reasonable deadline.
    struct StallingIntent;

    #[async_trait]
    impl Analyzer for StallingIntent {
        fn kind(&self) -> AnalyzerKind {
            AnalyzerKind::Intent
        }

        async fn analyze(
            &self,
            _snapshot: &ConversationSnapshot,
        ) -> cs_domain::error::Result<AnalyzerResult> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(AnalyzerResult::Intent(IntentResult {
                intent: IntentKind::Purchase,
                confidence: 1.0,
                indicators: vec![],
            }))
        }

        fn neutral(&self) -> AnalyzerResult {
            AnalyzerResult::Intent(IntentResult::neutral())
        }
    }

    /// Analyzer that always errors.
    struct BrokenIntent;

    #[async_trait]
    impl Analyzer for BrokenIntent {
        fn kind(&self) -> AnalyzerKind {
            AnalyzerKind::Intent
        }

        async fn analyze(
            &self,
            _snapshot: &ConversationSnapshot,
        ) -> cs_domain::error::Result<AnalyzerResult> {
            Err(Error::Upstream {
                service: "nlp".into(),
                message: "boom".into(),
            })
        }

        fn neutral(&self) -> AnalyzerResult {
            AnalyzerResult::Intent(IntentResult::neutral())
        }
    }

    #[tokio::test]
    async fn standard_set_fills_every_slot() {
        let set = AnalyzerSet::standard(
            &Default::default(),
            [0.3, 0.6, 0.8],
            Arc::new(LexiconSentiment),
        );
        let analysis = set
            .run(&snapshot("me interesa, ¿cómo funciona y cuánto cuesta?"))
            .await;
        assert!(analysis.intent.has_purchase_intent());
        assert!(!analysis.needs.needs.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_analyzer_is_replaced_by_neutral() {
        let set = AnalyzerSet::from_analyzers(
            vec![Arc::new(StallingIntent)],
            Duration::from_millis(50),
        );
        let analysis = set.run(&snapshot("hola")).await;
        assert_eq!(analysis.intent.intent, IntentKind::NoIntent);
        assert_eq!(analysis.intent.confidence, 0.0);
    }

    #[tokio::test]
    async fn failing_analyzer_is_replaced_by_neutral() {
        let set = AnalyzerSet::from_analyzers(
            vec![Arc::new(BrokenIntent)],
            Duration::from_millis(500),
        );
        let analysis = set.run(&snapshot("hola")).await;
        assert_eq!(analysis.intent.intent, IntentKind::NoIntent);
    }
}
