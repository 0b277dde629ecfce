//! Emotional-state analyzer.

use std::sync::Arc;

use async_trait::async_trait;

use cs_domain::error::Result;

use crate::lexicon::{matched, SentimentProvider};
use crate::results::{AnalyzerKind, AnalyzerResult, Emotion, EmotionResult};
use crate::snapshot::ConversationSnapshot;
use crate::traits::Analyzer;

const EXCITED_MARKERS: &[&str] = &[
    "excelente",
    "genial",
    "me encanta",
    "increíble",
    "fantástico",
    "perfecto",
    "wow",
];
const INTERESTED_MARKERS: &[&str] = &[
    "me interesa",
    "cuéntame más",
    "quiero saber",
    "suena bien",
    "interesante",
    "¿cómo funciona",
];
const CONCERNED_MARKERS: &[&str] = &[
    "me preocupa",
    "tengo dudas",
    "no estoy seguro",
    "no estoy segura",
    "no sé si",
    "necesito pensar",
];
const SKEPTICAL_MARKERS: &[&str] = &[
    "no creo",
    "suena demasiado bien",
    "¿de verdad",
    "demuéstrame",
    "no me convence",
];
const FRUSTRATED_MARKERS: &[&str] = &[
    "molesto",
    "molesta",
    "frustrado",
    "frustrada",
    "cansado de",
    "cansada de",
    "ya lo intenté",
    "siempre lo mismo",
];

pub struct EmotionAnalyzer {
    sentiment: Arc<dyn SentimentProvider>,
}

impl EmotionAnalyzer {
    pub fn new(sentiment: Arc<dyn SentimentProvider>) -> Self {
        Self { sentiment }
    }

    fn scores(text: &str) -> Vec<(Emotion, f64, Vec<&str>)> {
        [
            (Emotion::Excited, EXCITED_MARKERS),
            (Emotion::Interested, INTERESTED_MARKERS),
            (Emotion::Concerned, CONCERNED_MARKERS),
            (Emotion::Skeptical, SKEPTICAL_MARKERS),
            (Emotion::Frustrated, FRUSTRATED_MARKERS),
        ]
        .into_iter()
        .map(|(emotion, markers)| {
            let hits = matched(text, markers);
            let score = (hits.len() as f64 / 2.0).min(1.0);
            (emotion, score, hits)
        })
        .filter(|(_, score, _)| *score > 0.0)
        .collect()
    }
}

#[async_trait]
impl Analyzer for EmotionAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Emotion
    }

    async fn analyze(&self, snapshot: &ConversationSnapshot) -> Result<AnalyzerResult> {
        let latest = snapshot.latest_user_text.to_lowercase();
        let mut scored = Self::scores(&latest);

        // No lexical hits — fall back to the sentiment provider for a
        // coarse positive/negative read of the latest message.
        if scored.is_empty() {
            let sentiment = self.sentiment.score(&snapshot.latest_user_text);
            let result = if sentiment > 0.3 {
                EmotionResult {
                    primary: Emotion::Interested,
                    confidence: sentiment.min(0.7),
                    secondary: Vec::new(),
                    triggers: Vec::new(),
                    stability: 1.0,
                }
            } else if sentiment < -0.3 {
                EmotionResult {
                    primary: Emotion::Concerned,
                    confidence: (-sentiment).min(0.7),
                    secondary: Vec::new(),
                    triggers: Vec::new(),
                    stability: 1.0,
                }
            } else {
                EmotionResult::neutral()
            };
            return Ok(AnalyzerResult::Emotion(result));
        }

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        let (primary, primary_score, triggers) = scored.remove(0);

        // Stability: how often the primary emotion's markers appear across
        // the whole user window, relative to the number of user messages.
        let window = snapshot.combined_user_text();
        let window_hits = Self::scores(&window)
            .iter()
            .find(|(e, _, _)| *e == primary)
            .map(|(_, s, _)| *s)
            .unwrap_or(0.0);
        let stability = if snapshot.user_message_count() <= 1 {
            1.0
        } else {
            (window_hits / primary_score.max(f64::EPSILON)).clamp(0.0, 1.0)
        };

        let result = EmotionResult {
            primary,
            confidence: 0.4 + primary_score * 0.5,
            secondary: scored.into_iter().map(|(e, s, _)| (e, s)).collect(),
            triggers: triggers.iter().map(|s| s.to_string()).collect(),
            stability,
        };
        Ok(AnalyzerResult::Emotion(result))
    }

    fn neutral(&self) -> AnalyzerResult {
        AnalyzerResult::Emotion(EmotionResult::neutral())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::LexiconSentiment;
    use cs_domain::conversation::{ConversationState, ProgramType, Role};
    use cs_domain::customer::CustomerData;

    async fn analyze_text(text: &str) -> EmotionResult {
        let customer = CustomerData::new("c", "Ana", "a@b.com", 35).unwrap();
        let mut state = ConversationState::new(customer, ProgramType::Prime, 1800, 180);
        state.push_message(Role::User, text).unwrap();
        let snapshot = ConversationSnapshot::capture(&state, text, 10);
        let analyzer = EmotionAnalyzer::new(Arc::new(LexiconSentiment));
        match analyzer.analyze(&snapshot).await.unwrap() {
            AnalyzerResult::Emotion(e) => e,
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn concern_markers_detect_concern() {
        let result = analyze_text("me preocupa el precio y no estoy seguro").await;
        assert_eq!(result.primary, Emotion::Concerned);
        assert!(result.confidence > 0.5);
        assert!(!result.triggers.is_empty());
    }

    #[tokio::test]
    async fn excitement_beats_secondary_interest() {
        let result = analyze_text("¡me encanta! es genial, y me interesa saber más").await;
        assert_eq!(result.primary, Emotion::Excited);
        assert!(result.secondary.iter().any(|(e, _)| *e == Emotion::Interested));
    }

    #[tokio::test]
    async fn bland_text_is_neutral() {
        let result = analyze_text("tengo 40 años y trabajo en logística").await;
        assert_eq!(result.primary, Emotion::Neutral);
    }
}
