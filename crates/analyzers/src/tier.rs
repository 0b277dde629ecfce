//! Tier detector — maps customer signals to a pricing tier.

use async_trait::async_trait;

use cs_domain::conversation::ProgramType;
use cs_domain::error::Result;
use cs_domain::tier::{PriceSensitivity, TierLevel};

use crate::lexicon::{count_matches, matched};
use crate::results::{AnalyzerKind, AnalyzerResult, TierResult};
use crate::snapshot::ConversationSnapshot;
use crate::traits::Analyzer;

const BUDGET_MARKERS: &[&str] = &[
    "caro",
    "barato",
    "descuento",
    "presupuesto",
    "no puedo pagar",
    "más económico",
    "cuánto cuesta",
    "expensive",
    "cheap",
    "discount",
    "budget",
];

const PREMIUM_MARKERS: &[&str] = &[
    "lo mejor",
    "premium",
    "no importa el precio",
    "invertir en mí",
    "vale la pena",
    "exclusivo",
    "personalizado al máximo",
    "the best",
    "top tier",
    "whatever it costs",
];

const SOPHISTICATION_MARKERS: &[&str] = &[
    "biomarcadores",
    "protocolo",
    "metodología",
    "optimización",
    "hrv",
    "vo2",
    "metabolismo",
    "coaching",
    "biomarkers",
    "protocol",
];

pub struct TierDetectorAnalyzer;

impl TierDetectorAnalyzer {
    fn premium_tier_for(program: ProgramType) -> TierLevel {
        match program {
            ProgramType::Longevity => TierLevel::LongevityPremium,
            // HYBRID conversations present the PRIME premium ladder until
            // routing settles.
            ProgramType::Prime | ProgramType::Hybrid => TierLevel::PrimePremium,
        }
    }
}

#[async_trait]
impl Analyzer for TierDetectorAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::TierDetector
    }

    async fn analyze(&self, snapshot: &ConversationSnapshot) -> Result<AnalyzerResult> {
        let text = snapshot.combined_user_text();

        let budget_hits = matched(&text, BUDGET_MARKERS);
        let premium_hits = matched(&text, PREMIUM_MARKERS);
        let sophistication = count_matches(&text, SOPHISTICATION_MARKERS);

        let price_sensitivity = if budget_hits.len() >= 2 {
            PriceSensitivity::High
        } else if !premium_hits.is_empty() {
            PriceSensitivity::Low
        } else if budget_hits.len() == 1 {
            PriceSensitivity::Medium
        } else {
            PriceSensitivity::Medium
        };

        // Engagement proxy: how much the customer writes per message.
        let user_texts = snapshot.user_texts();
        let avg_len = if user_texts.is_empty() {
            0.0
        } else {
            user_texts.iter().map(|t| t.len()).sum::<usize>() as f64 / user_texts.len() as f64
        };

        let (tier, reasoning) = if !premium_hits.is_empty() && sophistication >= 1 {
            (
                Self::premium_tier_for(snapshot.program_type),
                format!("premium language {:?} with sophistication signals", premium_hits),
            )
        } else if !premium_hits.is_empty() {
            (TierLevel::Elite, format!("premium language {premium_hits:?}"))
        } else if budget_hits.len() >= 2 {
            (TierLevel::Essential, format!("budget language {budget_hits:?}"))
        } else if sophistication >= 2 || avg_len > 150.0 {
            (TierLevel::Elite, "high sophistication / engagement".into())
        } else if budget_hits.len() == 1 {
            (TierLevel::Pro, format!("single budget signal {budget_hits:?}"))
        } else {
            (TierLevel::Pro, "default mid tier".into())
        };

        let signal_count = budget_hits.len() + premium_hits.len() + sophistication;
        let confidence = (0.4 + signal_count as f64 * 0.12).min(0.9);

        Ok(AnalyzerResult::TierDetector(TierResult {
            tier,
            confidence,
            reasoning,
            price_sensitivity,
        }))
    }

    fn neutral(&self) -> AnalyzerResult {
        AnalyzerResult::TierDetector(TierResult::neutral())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_domain::conversation::{ConversationState, Role};
    use cs_domain::customer::CustomerData;

    async fn analyze(program: ProgramType, text: &str) -> TierResult {
        let customer = CustomerData::new("c", "Ana", "a@b.com", 45).unwrap();
        let mut state = ConversationState::new(customer, program, 1800, 180);
        state.push_message(Role::User, text).unwrap();
        let snapshot = ConversationSnapshot::capture(&state, text, 10);
        match TierDetectorAnalyzer.analyze(&snapshot).await.unwrap() {
            AnalyzerResult::TierDetector(t) => t,
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn budget_language_maps_to_essential_and_high_sensitivity() {
        let t = analyze(
            ProgramType::Prime,
            "me parece caro, ¿hay descuento o algo más económico?",
        )
        .await;
        assert_eq!(t.tier, TierLevel::Essential);
        assert_eq!(t.price_sensitivity, PriceSensitivity::High);
    }

    #[tokio::test]
    async fn premium_plus_sophistication_maps_to_program_premium() {
        let prime = analyze(
            ProgramType::Prime,
            "quiero lo mejor, un protocolo personalizado; el precio no es problema, busco optimización",
        )
        .await;
        assert_eq!(prime.tier, TierLevel::PrimePremium);

        let longevity = analyze(
            ProgramType::Longevity,
            "quiero lo mejor, un protocolo con biomarcadores",
        )
        .await;
        assert_eq!(longevity.tier, TierLevel::LongevityPremium);
        assert_eq!(longevity.price_sensitivity, PriceSensitivity::Low);
    }

    #[tokio::test]
    async fn no_signals_default_to_pro() {
        let t = analyze(ProgramType::Prime, "hola, quiero saber más").await;
        assert_eq!(t.tier, TierLevel::Pro);
        assert!(t.confidence < 0.6);
    }
}
