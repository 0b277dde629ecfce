//! Conversion predictor — likelihood the conversation ends in a sale.

use std::sync::Arc;

use async_trait::async_trait;

use cs_domain::error::Result;

use crate::lexicon::{count_matches, saturating_score, SentimentProvider};
use crate::results::{
    ActionPriority, AnalyzerKind, AnalyzerResult, ConversionBand, ConversionPrediction,
    SuggestedAction,
};
use crate::snapshot::ConversationSnapshot;
use crate::traits::Analyzer;

const BUYING_MARKERS: &[&str] = &[
    "cuándo podría",
    "cómo puedo comprar",
    "me interesa",
    "quiero adquirir",
    "precio final",
    "descuento",
    "disponibilidad",
    "formas de pago",
    "plazos",
    "contrato",
    "cuándo podríamos empezar",
    "siguiente paso",
    "demo",
    "prueba",
];

const SPECIFIC_INQUIRY_MARKERS: &[&str] = &[
    "especificaciones",
    "características",
    "funcionalidades",
    "detalles técnicos",
    "implementación",
    "requisitos",
    "garantía",
    "soporte",
    "capacitación",
    "personalización",
    "configuración",
];

const QUESTION_MARKERS: &[&str] = &["?", "cómo", "qué", "cuándo", "dónde", "por qué", "cuánto", "cuál"];

/// Conversion-category thresholds `[low, medium, high]`.
#[derive(Debug, Clone, Copy)]
pub struct ConversionThresholds(pub [f64; 3]);

impl Default for ConversionThresholds {
    fn default() -> Self {
        Self([0.3, 0.6, 0.8])
    }
}

pub struct ConversionPredictorAnalyzer {
    sentiment: Arc<dyn SentimentProvider>,
    thresholds: ConversionThresholds,
}

impl ConversionPredictorAnalyzer {
    pub fn new(sentiment: Arc<dyn SentimentProvider>, thresholds: ConversionThresholds) -> Self {
        Self {
            sentiment,
            thresholds,
        }
    }

    fn recommendations(category: ConversionBand) -> Vec<SuggestedAction> {
        let actions: &[(&str, ActionPriority)] = match category {
            ConversionBand::Low => &[
                ("Volver a exploración: preguntar por objetivos concretos", ActionPriority::High),
                ("Aportar valor sin presionar el cierre", ActionPriority::Medium),
            ],
            ConversionBand::Medium => &[
                ("Presentar el tier recomendado con beneficios específicos", ActionPriority::High),
                ("Resolver la principal duda abierta antes de avanzar", ActionPriority::Medium),
            ],
            ConversionBand::High => &[
                ("Proponer el siguiente paso concreto con fecha", ActionPriority::High),
                ("Confirmar el tier y resolver logística de pago", ActionPriority::Medium),
            ],
            ConversionBand::VeryHigh => &[
                ("Cerrar: agendar la sesión inicial ahora", ActionPriority::High),
                ("Reducir fricción: resumir acuerdos y confirmar inicio", ActionPriority::High),
            ],
        };
        actions
            .iter()
            .map(|(description, priority)| SuggestedAction {
                description: description.to_string(),
                priority: *priority,
            })
            .collect()
    }
}

#[async_trait]
impl Analyzer for ConversionPredictorAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::ConversionPredictor
    }

    async fn analyze(&self, snapshot: &ConversationSnapshot) -> Result<AnalyzerResult> {
        let combined = snapshot.combined_user_text();
        let user_texts = snapshot.user_texts();
        let total_messages = snapshot.message_count().max(1);

        // Each signal lands in [0, 1]; weights mirror their predictive value.
        let mut signals: Vec<(&str, f64, f64)> = Vec::new(); // (name, value, weight)

        let buying = count_matches(&combined, BUYING_MARKERS);
        if buying > 0 {
            signals.push(("buying_signals", saturating_score(buying, 3), 0.35));
        }

        if !user_texts.is_empty() {
            let ratio = user_texts.len() as f64 / total_messages as f64;
            let avg_len =
                user_texts.iter().map(|t| t.len()).sum::<usize>() as f64 / user_texts.len() as f64;
            let engagement = (ratio + (avg_len / 100.0).min(1.0)) / 2.0;
            if engagement > 0.3 {
                signals.push(("engagement_level", engagement, 0.2));
            }

            let questions = user_texts
                .iter()
                .filter(|t| {
                    let lower = t.to_lowercase();
                    QUESTION_MARKERS.iter().any(|m| lower.contains(m))
                })
                .count();
            if questions > 0 {
                signals.push((
                    "question_frequency",
                    (questions as f64 / user_texts.len() as f64).min(1.0),
                    0.15,
                ));
            }
        }

        let positive: Vec<f64> = user_texts
            .iter()
            .map(|t| self.sentiment.score(t))
            .filter(|s| *s > 0.0)
            .collect();
        if !positive.is_empty() {
            let avg = positive.iter().sum::<f64>() / positive.len() as f64;
            signals.push(("positive_sentiment", avg, 0.15));
        }

        let inquiries = count_matches(&combined, SPECIFIC_INQUIRY_MARKERS);
        if inquiries > 0 {
            signals.push(("specific_inquiries", saturating_score(inquiries, 3), 0.1));
        }

        // Time investment: longer conversations mean a more invested customer.
        let invested = (total_messages as f64 / 20.0).min(1.0);
        if invested > 0.2 {
            signals.push(("time_investment", invested, 0.05));
        }

        let (probability, confidence) = if signals.is_empty() {
            (0.1, 0.5)
        } else {
            let weighted: f64 = signals.iter().map(|(_, v, w)| v * w).sum();
            let probability = (weighted / 0.6).min(1.0);
            // More distinct signal families — more confident read.
            let diversity = signals.len() as f64 / 6.0;
            (probability, 0.5 + diversity * 0.5)
        };

        let category = ConversionBand::for_probability(probability, &self.thresholds.0);

        Ok(AnalyzerResult::ConversionPredictor(ConversionPrediction {
            probability,
            confidence,
            category,
            recommendations: Self::recommendations(category),
        }))
    }

    fn neutral(&self) -> AnalyzerResult {
        AnalyzerResult::ConversionPredictor(ConversionPrediction::neutral())
    }
}
