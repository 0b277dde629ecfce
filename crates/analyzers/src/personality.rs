//! Personality / communication-style analyzer.

use async_trait::async_trait;

use cs_domain::error::Result;

use crate::lexicon::count_matches;
use crate::results::{
    AnalyzerKind, AnalyzerResult, CommunicationStyle, PersonalityResult, Preference,
};
use crate::snapshot::ConversationSnapshot;
use crate::traits::Analyzer;

const ANALYTICAL_MARKERS: &[&str] = &[
    "datos",
    "estudios",
    "evidencia",
    "cómo exactamente",
    "detalles",
    "específicamente",
    "comparar",
    "metodología",
];
const DRIVER_MARKERS: &[&str] = &[
    "al grano",
    "resumen",
    "rápido",
    "directo",
    "cuánto cuesta",
    "resultados",
    "cuándo empiezo",
];
const EXPRESSIVE_MARKERS: &[&str] = &["!", "me encanta", "increíble", "genial", "wow", "jaja"];
const AMIABLE_MARKERS: &[&str] = &[
    "gracias",
    "por favor",
    "aprecio",
    "entiendo",
    "me gustaría",
    "tal vez",
];
const FORMAL_MARKERS: &[&str] = &["usted", "podría", "quisiera", "le agradezco", "estimado"];

pub struct PersonalityAnalyzer;

impl PersonalityAnalyzer {
    fn style_for(text: &str) -> (CommunicationStyle, usize) {
        let candidates = [
            (CommunicationStyle::Analytical, count_matches(text, ANALYTICAL_MARKERS)),
            (CommunicationStyle::Driver, count_matches(text, DRIVER_MARKERS)),
            (CommunicationStyle::Expressive, count_matches(text, EXPRESSIVE_MARKERS)),
            (CommunicationStyle::Amiable, count_matches(text, AMIABLE_MARKERS)),
        ];
        candidates
            .into_iter()
            .max_by_key(|(_, hits)| *hits)
            .unwrap_or((CommunicationStyle::Amiable, 0))
    }
}

#[async_trait]
impl Analyzer for PersonalityAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Personality
    }

    async fn analyze(&self, snapshot: &ConversationSnapshot) -> Result<AnalyzerResult> {
        let text = snapshot.combined_user_text();
        let user_texts = snapshot.user_texts();

        let (style, style_hits) = Self::style_for(&text);

        let formality = match count_matches(&text, FORMAL_MARKERS) {
            0 => Preference::Low,
            1 => Preference::Medium,
            _ => Preference::High,
        };

        // Long, question-dense messages signal appetite for detail.
        let avg_len = if user_texts.is_empty() {
            0.0
        } else {
            user_texts.iter().map(|t| t.len()).sum::<usize>() as f64 / user_texts.len() as f64
        };
        let question_count = user_texts.iter().filter(|t| t.contains('?')).count();
        let detail = if avg_len > 160.0 || question_count >= 3 {
            Preference::High
        } else if avg_len > 60.0 || question_count >= 1 {
            Preference::Medium
        } else {
            Preference::Low
        };

        // Short clipped messages signal a fast pace preference.
        let pace = if avg_len < 40.0 {
            Preference::High
        } else if avg_len < 120.0 {
            Preference::Medium
        } else {
            Preference::Low
        };

        let confidence = if style_hits == 0 {
            0.3
        } else {
            (0.4 + style_hits as f64 * 0.15).min(0.9)
        };

        Ok(AnalyzerResult::Personality(PersonalityResult {
            communication_style: style,
            formality_preference: formality,
            detail_preference: detail,
            pace_preference: pace,
            confidence,
        }))
    }

    fn neutral(&self) -> AnalyzerResult {
        AnalyzerResult::Personality(PersonalityResult::neutral())
    }
}
