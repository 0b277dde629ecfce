//! Needs predictor — what the customer requires before moving forward.

use async_trait::async_trait;

use cs_domain::error::Result;

use crate::lexicon::{count_matches, saturating_score};
use crate::results::{
    ActionPriority, AnalyzerKind, AnalyzerResult, NeedCategory, NeedsPrediction, PredictedNeed,
    SuggestedAction,
};
use crate::snapshot::ConversationSnapshot;
use crate::traits::Analyzer;

struct NeedRule {
    category: NeedCategory,
    markers: &'static [&'static str],
    actions: &'static [(&'static str, ActionPriority)],
}

const RULES: &[NeedRule] = &[
    NeedRule {
        category: NeedCategory::Information,
        markers: &[
            "cómo funciona",
            "qué incluye",
            "cuánto dura",
            "detalles",
            "explícame",
            "más información",
            "how does it work",
        ],
        actions: &[
            ("Explicar la estructura del programa paso a paso", ActionPriority::High),
            ("Enviar el desglose de componentes por semana", ActionPriority::Medium),
        ],
    },
    NeedRule {
        category: NeedCategory::Reassurance,
        markers: &[
            "me preocupa",
            "miedo",
            "y si no funciona",
            "garantía",
            "riesgo",
            "no estoy seguro",
            "no estoy segura",
        ],
        actions: &[
            ("Validar la preocupación y explicar las garantías", ActionPriority::High),
            ("Describir el acompañamiento durante las primeras semanas", ActionPriority::Medium),
        ],
    },
    NeedRule {
        category: NeedCategory::Guidance,
        markers: &[
            "qué me recomiendas",
            "cuál me conviene",
            "no sé por dónde",
            "ayúdame a decidir",
            "which one",
        ],
        actions: &[
            ("Recomendar un tier concreto con justificación", ActionPriority::High),
            ("Proponer una ruta de inicio de dos pasos", ActionPriority::Medium),
        ],
    },
    NeedRule {
        category: NeedCategory::Personalization,
        markers: &[
            "mi caso",
            "en mi situación",
            "yo trabajo",
            "mi horario",
            "se adapta a mí",
            "personalizado",
        ],
        actions: &[
            ("Mapear el programa al contexto específico del cliente", ActionPriority::High),
            ("Preguntar por restricciones de agenda y estilo de vida", ActionPriority::Medium),
        ],
    },
    NeedRule {
        category: NeedCategory::Proof,
        markers: &[
            "resultados",
            "testimonios",
            "casos",
            "evidencia",
            "estudios",
            "quién lo ha hecho",
            "results",
        ],
        actions: &[
            ("Compartir resultados medidos de clientes comparables", ActionPriority::High),
            ("Referenciar la base científica del enfoque", ActionPriority::Low),
        ],
    },
];

pub struct NeedsPredictorAnalyzer;

#[async_trait]
impl Analyzer for NeedsPredictorAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::NeedsPredictor
    }

    async fn analyze(&self, snapshot: &ConversationSnapshot) -> Result<AnalyzerResult> {
        let text = snapshot.combined_user_text();

        let mut needs: Vec<PredictedNeed> = RULES
            .iter()
            .filter_map(|rule| {
                let hits = count_matches(&text, rule.markers);
                if hits == 0 {
                    return None;
                }
                Some(PredictedNeed {
                    category: rule.category,
                    confidence: 0.4 + saturating_score(hits, 2) * 0.5,
                    suggested_actions: rule
                        .actions
                        .iter()
                        .map(|(description, priority)| SuggestedAction {
                            description: description.to_string(),
                            priority: *priority,
                        })
                        .collect(),
                })
            })
            .collect();

        needs.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Ok(AnalyzerResult::NeedsPredictor(NeedsPrediction { needs }))
    }

    fn neutral(&self) -> AnalyzerResult {
        AnalyzerResult::NeedsPredictor(NeedsPrediction::neutral())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cs_domain::conversation::{ConversationState, ProgramType, Role};
    use cs_domain::customer::CustomerData;

    async fn analyze(text: &str) -> NeedsPrediction {
        let customer = CustomerData::new("c", "Ana", "a@b.com", 40).unwrap();
        let mut state = ConversationState::new(customer, ProgramType::Prime, 1800, 180);
        state.push_message(Role::User, text).unwrap();
        let snapshot = ConversationSnapshot::capture(&state, text, 10);
        match NeedsPredictorAnalyzer.analyze(&snapshot).await.unwrap() {
            AnalyzerResult::NeedsPredictor(p) => p,
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn questions_predict_information_need() {
        let p = analyze("¿cómo funciona el programa y qué incluye exactamente?").await;
        assert_eq!(p.needs[0].category, NeedCategory::Information);
        assert!(p.needs[0].confidence > 0.6);
        assert!(p.needs[0]
            .suggested_actions
            .iter()
            .any(|a| a.priority == ActionPriority::High));
    }

    #[tokio::test]
    async fn proof_seeking_is_detected() {
        let p = analyze("¿tienen testimonios o resultados de otros clientes?").await;
        assert!(p.needs.iter().any(|n| n.category == NeedCategory::Proof));
    }

    #[tokio::test]
    async fn multiple_needs_rank_by_confidence() {
        let p = analyze(
            "me preocupa el riesgo, no estoy seguro... ¿qué me recomiendas en mi caso?",
        )
        .await;
        assert!(p.needs.len() >= 2);
        for pair in p.needs.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }
}
