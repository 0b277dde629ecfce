//! Objection predictor — anticipates what the customer will push back on.

use std::sync::Arc;

use async_trait::async_trait;

use cs_domain::error::Result;

use crate::lexicon::{saturating_score, count_matches, SentimentProvider};
use crate::results::{
    AnalyzerKind, AnalyzerResult, ObjectionKind, ObjectionPrediction, PredictedObjection,
};
use crate::snapshot::ConversationSnapshot;
use crate::traits::Analyzer;

const HESITATION_MARKERS: &[&str] = &[
    "quizás",
    "tal vez",
    "no estoy seguro",
    "no estoy segura",
    "tengo dudas",
    "necesito pensar",
    "no sé si",
    "me preocupa",
];

const COMPARISON_MARKERS: &[&str] = &[
    "mejor que",
    "comparado con",
    "a diferencia de",
    "más barato",
    "más caro",
    "competidor",
    "alternativa",
];

const PRICE_MARKERS: &[&str] = &[
    "precio",
    "costo",
    "caro",
    "barato",
    "presupuesto",
    "inversión",
    "gasto",
    "pagar",
    "euros",
    "dólares",
    "pesos",
];

const UNCERTAINTY_MARKERS: &[&str] = &[
    "no estoy convencido",
    "tendría que consultar",
    "no es lo que esperaba",
    "no cumple",
    "me falta",
    "necesito más información",
];

/// Mapping from detected signals to the objection kinds they feed.
fn kinds_for_signal(signal: Signal) -> &'static [ObjectionKind] {
    match signal {
        Signal::NegativeSentiment => &[
            ObjectionKind::Price,
            ObjectionKind::Value,
            ObjectionKind::Trust,
            ObjectionKind::Features,
        ],
        Signal::Hesitation => &[
            ObjectionKind::Need,
            ObjectionKind::Urgency,
        ],
        Signal::Comparison => &[
            ObjectionKind::Competition,
            ObjectionKind::Features,
            ObjectionKind::Value,
        ],
        Signal::PriceMentions => &[ObjectionKind::Price, ObjectionKind::Value],
        Signal::Uncertainty => &[
            ObjectionKind::Trust,
            ObjectionKind::Need,
            ObjectionKind::Implementation,
        ],
    }
}

#[derive(Clone, Copy)]
enum Signal {
    NegativeSentiment,
    Hesitation,
    Comparison,
    PriceMentions,
    Uncertainty,
}

fn suggested_responses(kind: ObjectionKind) -> Vec<String> {
    let responses: &[&str] = match kind {
        ObjectionKind::Price => &[
            "Reencuadrar el costo como inversión mensual comparada con el valor diario",
            "Presentar el tier más accesible manteniendo la puerta abierta al upgrade",
            "Mostrar el retorno esperado en energía y rendimiento",
        ],
        ObjectionKind::Value => &[
            "Conectar cada componente del programa con un objetivo que el cliente mencionó",
            "Compartir un caso comparable con resultados medibles",
        ],
        ObjectionKind::Trust => &[
            "Explicar la metodología y el acompañamiento humano detrás del programa",
            "Ofrecer referencias y resultados verificables",
        ],
        ObjectionKind::Need => &[
            "Volver a las motivaciones que el cliente expresó y unirlas al programa",
            "Explorar el costo de no actuar sobre el problema",
        ],
        ObjectionKind::Urgency => &[
            "Anclar la decisión a un evento concreto del cliente",
            "Explicar qué pierde cada mes de espera",
        ],
        ObjectionKind::Competition => &[
            "Diferenciar sin atacar: enfocarse en la personalización del enfoque",
            "Preguntar qué le gustó y qué le faltó de la alternativa",
        ],
        ObjectionKind::Features => &[
            "Profundizar en el componente específico que genera la duda",
            "Mapear la funcionalidad al caso de uso del cliente",
        ],
        ObjectionKind::Implementation => &[
            "Describir el onboarding paso a paso y el tiempo real requerido",
            "Ofrecer empezar con el alcance mínimo viable",
        ],
    };
    responses.iter().map(|s| s.to_string()).collect()
}

pub struct ObjectionPredictorAnalyzer {
    sentiment: Arc<dyn SentimentProvider>,
}

impl ObjectionPredictorAnalyzer {
    pub fn new(sentiment: Arc<dyn SentimentProvider>) -> Self {
        Self { sentiment }
    }
}

#[async_trait]
impl Analyzer for ObjectionPredictorAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::ObjectionPredictor
    }

    async fn analyze(&self, snapshot: &ConversationSnapshot) -> Result<AnalyzerResult> {
        let text = snapshot.combined_user_text();

        let mut signals: Vec<(Signal, f64)> = Vec::new();

        let worst_sentiment = snapshot
            .user_texts()
            .iter()
            .map(|t| self.sentiment.score(t))
            .fold(0.0_f64, f64::min);
        if worst_sentiment < -0.2 {
            signals.push((Signal::NegativeSentiment, -worst_sentiment));
        }

        let hesitation = count_matches(&text, HESITATION_MARKERS);
        if hesitation > 0 {
            signals.push((Signal::Hesitation, saturating_score(hesitation, 3)));
        }
        let comparison = count_matches(&text, COMPARISON_MARKERS);
        if comparison > 0 {
            signals.push((Signal::Comparison, saturating_score(comparison, 2)));
        }
        let price = count_matches(&text, PRICE_MARKERS);
        if price > 0 {
            signals.push((Signal::PriceMentions, saturating_score(price, 2)));
        }
        let uncertainty = count_matches(&text, UNCERTAINTY_MARKERS);
        if uncertainty > 0 {
            signals.push((Signal::Uncertainty, saturating_score(uncertainty, 2)));
        }

        if signals.is_empty() {
            return Ok(AnalyzerResult::ObjectionPredictor(
                ObjectionPrediction::neutral(),
            ));
        }

        // Accumulate per-kind scores in a fixed kind order (stable result
        // under ties), then normalize against the max so the strongest
        // objection lands at its raw signal strength.
        const ALL_KINDS: &[ObjectionKind] = &[
            ObjectionKind::Price,
            ObjectionKind::Value,
            ObjectionKind::Trust,
            ObjectionKind::Need,
            ObjectionKind::Urgency,
            ObjectionKind::Competition,
            ObjectionKind::Features,
            ObjectionKind::Implementation,
        ];
        let scores: Vec<(ObjectionKind, f64)> = ALL_KINDS
            .iter()
            .map(|kind| {
                let score: f64 = signals
                    .iter()
                    .filter(|(signal, _)| kinds_for_signal(*signal).contains(kind))
                    .map(|(_, value)| value)
                    .sum();
                (*kind, score)
            })
            .filter(|(_, score)| *score > 0.0)
            .collect();

        let max = scores
            .iter()
            .map(|(_, s)| *s)
            .fold(f64::EPSILON, f64::max);
        let strongest = signals
            .iter()
            .map(|(_, v)| *v)
            .fold(0.0_f64, f64::max)
            .clamp(0.0, 1.0);

        let mut objections: Vec<PredictedObjection> = scores
            .into_iter()
            .map(|(kind, score)| PredictedObjection {
                kind,
                confidence: (score / max * strongest).clamp(0.0, 1.0),
                suggested_responses: suggested_responses(kind),
            })
            .collect();
        objections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        objections.truncate(3);

        Ok(AnalyzerResult::ObjectionPredictor(ObjectionPrediction {
            objections,
        }))
    }

    fn neutral(&self) -> AnalyzerResult {
        AnalyzerResult::ObjectionPredictor(ObjectionPrediction::neutral())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::LexiconSentiment;
    use cs_domain::conversation::{ConversationState, ProgramType, Role};
    use cs_domain::customer::CustomerData;

    async fn analyze(text: &str) -> ObjectionPrediction {
        let customer = CustomerData::new("c", "Ana", "a@b.com", 40).unwrap();
        let mut state = ConversationState::new(customer, ProgramType::Prime, 1800, 180);
        state.push_message(Role::User, text).unwrap();
        let snapshot = ConversationSnapshot::capture(&state, text, 10);
        let analyzer = ObjectionPredictorAnalyzer::new(Arc::new(LexiconSentiment));
        match analyzer.analyze(&snapshot).await.unwrap() {
            AnalyzerResult::ObjectionPredictor(p) => p,
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn price_talk_predicts_price_objection_first() {
        let p = analyze("el precio me parece alto para mi presupuesto, es caro").await;
        let top = p.top().unwrap();
        assert_eq!(top.kind, ObjectionKind::Price);
        assert!(top.confidence >= 0.7);
        assert!(!top.suggested_responses.is_empty());
    }

    #[tokio::test]
    async fn ranked_descending_and_capped_at_three() {
        let p = analyze(
            "no estoy convencido, es caro comparado con la alternativa y tengo dudas del precio",
        )
        .await;
        assert!(p.objections.len() <= 3);
        for pair in p.objections.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }

    #[tokio::test]
    async fn clean_text_predicts_nothing() {
        let p = analyze("cuéntame cómo funciona el acompañamiento semanal").await;
        assert!(p.objections.is_empty());
    }
}
