//! Program router — decides which offering fits the customer.
//!
//! Also used outside the fan-out: conversation start (auto-detection when
//! no program is supplied) and the forced-profile-analysis fallback both
//! call [`ProgramRouterAnalyzer::route`] directly.

use async_trait::async_trait;

use cs_domain::conversation::ProgramType;
use cs_domain::error::Result;

use crate::lexicon::matched;
use crate::results::{AnalyzerKind, AnalyzerResult, RouteResult};
use crate::snapshot::ConversationSnapshot;
use crate::traits::Analyzer;

const PRIME_MARKERS: &[&str] = &[
    "productividad",
    "productivity",
    "rendimiento",
    "performance",
    "energía para trabajar",
    "enfoque",
    "focus",
    "carrera",
    "career",
    "ejecutivo",
    "empresa",
    "competitivo",
    "agenda",
];

const LONGEVITY_MARKERS: &[&str] = &[
    "vitalidad",
    "vitality",
    "longevidad",
    "longevity",
    "envejec",
    "aging",
    "retir",
    "retire",
    "jubil",
    "prevención",
    "prevention",
    "salud a largo plazo",
    "healthspan",
    "mantenerme sano",
];

pub struct ProgramRouterAnalyzer;

impl ProgramRouterAnalyzer {
    /// Route from free text plus customer attributes.
    ///
    /// Confidence grows with the number of distinctive markers; a tie (or
    /// no markers at all) is reported as HYBRID for the caller to resolve
    /// (the orchestrator applies the age rule).
    pub fn route(text: &str, age: u32, interests: &[String]) -> RouteResult {
        let mut haystack = text.to_lowercase();
        for interest in interests {
            haystack.push(' ');
            haystack.push_str(&interest.to_lowercase());
        }

        let prime_hits = matched(&haystack, PRIME_MARKERS);
        let longevity_hits = matched(&haystack, LONGEVITY_MARKERS);

        let (program, hits) = if prime_hits.len() > longevity_hits.len() {
            (ProgramType::Prime, prime_hits)
        } else if longevity_hits.len() > prime_hits.len() {
            (ProgramType::Longevity, longevity_hits)
        } else if !prime_hits.is_empty() {
            // Equal non-zero signal for both programs.
            return RouteResult {
                recommended_program: ProgramType::Hybrid,
                confidence: 0.5,
                reasoning: format!(
                    "mixed signals: prime {:?} vs longevity {:?}",
                    prime_hits, longevity_hits
                ),
            };
        } else {
            // No text signal — lean on age without committing.
            let reasoning = format!("no program markers; customer age {age}");
            return RouteResult {
                recommended_program: ProgramType::Hybrid,
                confidence: 0.5,
                reasoning,
            };
        };

        RouteResult {
            recommended_program: program,
            confidence: (0.5 + 0.16 * hits.len() as f64).min(0.95),
            reasoning: format!("matched {:?}", hits),
        }
    }
}

#[async_trait]
impl Analyzer for ProgramRouterAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::ProgramRouter
    }

    async fn analyze(&self, snapshot: &ConversationSnapshot) -> Result<AnalyzerResult> {
        let combined = snapshot.combined_user_text();
        Ok(AnalyzerResult::ProgramRouter(Self::route(
            &combined,
            snapshot.customer_age,
            &snapshot.customer_interests,
        )))
    }

    fn neutral(&self) -> AnalyzerResult {
        AnalyzerResult::ProgramRouter(RouteResult::neutral())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn productivity_interest_routes_to_prime() {
        let route = ProgramRouterAnalyzer::route("", 34, &["productivity".into()]);
        assert_eq!(route.recommended_program, ProgramType::Prime);
        assert!(route.confidence >= 0.6);
    }

    #[test]
    fn retirement_vitality_routes_to_longevity_with_high_confidence() {
        let route = ProgramRouterAnalyzer::route(
            "mi preocupación es mantener mi vitalidad cuando me retire",
            58,
            &[],
        );
        assert_eq!(route.recommended_program, ProgramType::Longevity);
        assert!((route.confidence - 0.82).abs() < 1e-9);
    }

    #[test]
    fn no_signal_is_hybrid() {
        let route = ProgramRouterAnalyzer::route("hola, ¿qué tal?", 58, &[]);
        assert_eq!(route.recommended_program, ProgramType::Hybrid);
    }

    #[test]
    fn balanced_signal_is_hybrid() {
        let route = ProgramRouterAnalyzer::route(
            "me importa mi carrera pero también la longevidad",
            45,
            &[],
        );
        assert_eq!(route.recommended_program, ProgramType::Hybrid);
    }

    #[test]
    fn confidence_caps_below_one() {
        let text = "productividad rendimiento enfoque carrera ejecutivo empresa agenda";
        let route = ProgramRouterAnalyzer::route(text, 30, &[]);
        assert!(route.confidence <= 0.95);
    }
}
