//! The fused context handed to the agent each turn.

use cs_analyzers::results::TurnAnalysis;
use cs_domain::conversation::Role;

/// Everything the agent sees beyond the raw user message: a history
/// window, profile reads, guidance, the tier recommendation and any
/// experiment variants in play.
#[derive(Debug, Clone, Default)]
pub struct AgentTurnContext {
    /// Trailing conversation window, oldest first.
    pub history: Vec<(Role, String)>,
    pub emotional_summary: Option<String>,
    pub personality_summary: Option<String>,
    pub empathic_guidance: Option<String>,
    pub analyzer_summary: Option<String>,
    pub tier_recommendation: Option<String>,
    /// `(variant name, variant content)` for each active assignment.
    pub experiment_variants: Vec<(String, serde_json::Value)>,
}

impl AgentTurnContext {
    /// Build the standard context from one turn's analysis.
    pub fn from_analysis(history: Vec<(Role, String)>, analysis: &TurnAnalysis) -> Self {
        let emotional_summary = Some(format!(
            "Estado emocional: {} (confianza {:.2}, estabilidad {:.2})",
            analysis.emotion.primary, analysis.emotion.confidence, analysis.emotion.stability
        ));
        let personality_summary = Some(format!(
            "Estilo de comunicación: {:?}; formalidad {:?}, detalle {:?}, ritmo {:?}",
            analysis.personality.communication_style,
            analysis.personality.formality_preference,
            analysis.personality.detail_preference,
            analysis.personality.pace_preference,
        ));
        let empathic_guidance = Some(empathic_guidance_for(analysis));

        let mut summary_parts = vec![format!(
            "Conversión: {} (p={:.2})",
            analysis.conversion.category, analysis.conversion.probability
        )];
        if let Some(objection) = analysis.objections.top() {
            summary_parts.push(format!(
                "Posible objeción: {} ({:.2})",
                objection.kind, objection.confidence
            ));
        }
        if let Some(need) = analysis.needs.needs.first() {
            summary_parts.push(format!(
                "Necesidad principal: {} ({:.2})",
                need.category, need.confidence
            ));
        }

        Self {
            history,
            emotional_summary,
            personality_summary,
            empathic_guidance,
            analyzer_summary: Some(summary_parts.join(" · ")),
            tier_recommendation: Some(format!(
                "Tier recomendado: {} ({:.2})",
                analysis.tier.tier, analysis.tier.confidence
            )),
            experiment_variants: Vec::new(),
        }
    }

    pub fn with_variants(mut self, variants: Vec<(String, serde_json::Value)>) -> Self {
        self.experiment_variants = variants;
        self
    }

    /// Render the non-history sections as system-prompt appendix.
    pub fn render_sections(&self) -> String {
        let mut sections = Vec::new();
        if let Some(s) = &self.emotional_summary {
            sections.push(s.clone());
        }
        if let Some(s) = &self.personality_summary {
            sections.push(s.clone());
        }
        if let Some(s) = &self.empathic_guidance {
            sections.push(format!("Guía empática: {s}"));
        }
        if let Some(s) = &self.analyzer_summary {
            sections.push(format!("Lectura del turno: {s}"));
        }
        if let Some(s) = &self.tier_recommendation {
            sections.push(s.clone());
        }
        for (name, content) in &self.experiment_variants {
            sections.push(format!("Variante activa {name}: {content}"));
        }
        sections.join("\n")
    }
}

/// Short, directive guidance derived from the emotional read.
fn empathic_guidance_for(analysis: &TurnAnalysis) -> String {
    use cs_analyzers::results::Emotion;
    match analysis.emotion.primary {
        Emotion::Excited => "acompaña el entusiasmo y canalízalo hacia el siguiente paso".into(),
        Emotion::Interested => "profundiza en lo que despertó el interés".into(),
        Emotion::Neutral => "aporta valor concreto para generar tracción".into(),
        Emotion::Concerned => "valida la preocupación antes de avanzar".into(),
        Emotion::Skeptical => "responde con evidencia, sin presionar".into(),
        Emotion::Frustrated => "reconoce la frustración y simplifica el camino".into(),
    }
}
