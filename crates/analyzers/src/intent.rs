//! Purchase-intent analyzer.

use async_trait::async_trait;

use cs_domain::error::Result;

use crate::lexicon::{matched, saturating_score};
use crate::results::{AnalyzerKind, AnalyzerResult, IntentKind, IntentResult};
use crate::snapshot::ConversationSnapshot;
use crate::traits::Analyzer;

const PURCHASE_MARKERS: &[&str] = &[
    "quiero comprar",
    "me interesa",
    "quiero adquirir",
    "cómo puedo pagar",
    "formas de pago",
    "precio final",
    "cuándo podemos empezar",
    "cuándo podríamos empezar",
    "siguiente paso",
    "inscrib",
    "quiero empezar",
    "agendar",
    "demo",
    "sign me up",
    "how do i pay",
    "i want to buy",
];

const REJECTION_MARKERS: &[&str] = &[
    "no me interesa",
    "no estoy interesado",
    "no estoy interesada",
    "no quiero continuar",
    "no gracias",
    "déjame en paz",
    "no me llames",
    "no insistas",
    "quiero cancelar",
    "not interested",
    "stop contacting",
];

pub struct IntentAnalyzer;

#[async_trait]
impl Analyzer for IntentAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Intent
    }

    async fn analyze(&self, snapshot: &ConversationSnapshot) -> Result<AnalyzerResult> {
        let text = snapshot.combined_user_text();

        let purchase_hits = matched(&text, PURCHASE_MARKERS);
        let rejection_hits = matched(&text, REJECTION_MARKERS);

        // Rejection phrases dominate: a customer saying "no me interesa"
        // after asking about price has still rejected.
        let result = if !rejection_hits.is_empty() {
            IntentResult {
                intent: IntentKind::Rejection,
                confidence: 0.5 + saturating_score(rejection_hits.len(), 2) * 0.45,
                indicators: rejection_hits.iter().map(|s| s.to_string()).collect(),
            }
        } else if !purchase_hits.is_empty() {
            IntentResult {
                intent: IntentKind::Purchase,
                confidence: 0.4 + saturating_score(purchase_hits.len(), 3) * 0.55,
                indicators: purchase_hits.iter().map(|s| s.to_string()).collect(),
            }
        } else {
            IntentResult {
                intent: IntentKind::NoIntent,
                confidence: 0.5,
                indicators: Vec::new(),
            }
        };

        Ok(AnalyzerResult::Intent(result))
    }

    fn neutral(&self) -> AnalyzerResult {
        AnalyzerResult::Intent(IntentResult::neutral())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_domain::conversation::{ConversationState, ProgramType, Role};
    use cs_domain::customer::CustomerData;

    fn snapshot(user_text: &str) -> ConversationSnapshot {
        let customer = CustomerData::new("c", "Ana", "a@b.com", 35).unwrap();
        let mut state = ConversationState::new(customer, ProgramType::Prime, 1800, 180);
        state.push_message(Role::User, user_text).unwrap();
        ConversationSnapshot::capture(&state, user_text, 10)
    }

    #[tokio::test]
    async fn purchase_phrases_detect_purchase_intent() {
        let result = IntentAnalyzer
            .analyze(&snapshot("me interesa, ¿cuándo podemos empezar?"))
            .await
            .unwrap();
        let AnalyzerResult::Intent(intent) = result else {
            panic!("wrong variant");
        };
        assert!(intent.has_purchase_intent());
        assert!(intent.confidence >= 0.6);
        assert!(!intent.indicators.is_empty());
    }

    #[tokio::test]
    async fn rejection_wins_over_purchase_phrases() {
        let result = IntentAnalyzer
            .analyze(&snapshot("me interesa el tema pero no gracias, no quiero continuar"))
            .await
            .unwrap();
        let AnalyzerResult::Intent(intent) = result else {
            panic!("wrong variant");
        };
        assert!(intent.has_rejection());
        assert!(intent.confidence >= 0.6);
    }

    #[tokio::test]
    async fn plain_conversation_is_no_intent() {
        let result = IntentAnalyzer
            .analyze(&snapshot("cuéntame un poco más sobre el enfoque"))
            .await
            .unwrap();
        let AnalyzerResult::Intent(intent) = result else {
            panic!("wrong variant");
        };
        assert_eq!(intent.intent, IntentKind::NoIntent);
    }
}
