//! Typed analyzer results.
//!
//! One tagged sum ties the eight analyzer families together; each payload
//! carries its own confidence in `[0, 1]` and knows its neutral default
//! (what the orchestrator substitutes when an analyzer fails or times
//! out).

use serde::{Deserialize, Serialize};

use cs_domain::conversation::ProgramType;
use cs_domain::tier::{PriceSensitivity, TierLevel};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Kinds
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerKind {
    Intent,
    Emotion,
    Personality,
    ProgramRouter,
    TierDetector,
    ObjectionPredictor,
    NeedsPredictor,
    ConversionPredictor,
}

impl std::fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AnalyzerKind::Intent => "intent",
            AnalyzerKind::Emotion => "emotion",
            AnalyzerKind::Personality => "personality",
            AnalyzerKind::ProgramRouter => "program_router",
            AnalyzerKind::TierDetector => "tier_detector",
            AnalyzerKind::ObjectionPredictor => "objection_predictor",
            AnalyzerKind::NeedsPredictor => "needs_predictor",
            AnalyzerKind::ConversionPredictor => "conversion_predictor",
        };
        write!(f, "{s}")
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Intent
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Purchase,
    NoIntent,
    Rejection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    pub intent: IntentKind,
    pub confidence: f64,
    pub indicators: Vec<String>,
}

impl IntentResult {
    pub fn neutral() -> Self {
        Self {
            intent: IntentKind::NoIntent,
            confidence: 0.0,
            indicators: Vec::new(),
        }
    }

    pub fn has_purchase_intent(&self) -> bool {
        self.intent == IntentKind::Purchase
    }

    pub fn has_rejection(&self) -> bool {
        self.intent == IntentKind::Rejection
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Emotion & personality
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    Excited,
    Interested,
    Neutral,
    Concerned,
    Skeptical,
    Frustrated,
}

impl std::fmt::Display for Emotion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Emotion::Excited => "excited",
            Emotion::Interested => "interested",
            Emotion::Neutral => "neutral",
            Emotion::Concerned => "concerned",
            Emotion::Skeptical => "skeptical",
            Emotion::Frustrated => "frustrated",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionResult {
    pub primary: Emotion,
    pub confidence: f64,
    /// Secondary emotions with their relative strengths.
    pub secondary: Vec<(Emotion, f64)>,
    /// Phrases that triggered the detection.
    pub triggers: Vec<String>,
    /// How stable the emotional read has been across the window, `[0, 1]`.
    pub stability: f64,
}

impl EmotionResult {
    pub fn neutral() -> Self {
        Self {
            primary: Emotion::Neutral,
            confidence: 0.0,
            secondary: Vec::new(),
            triggers: Vec::new(),
            stability: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommunicationStyle {
    Analytical,
    Driver,
    Expressive,
    Amiable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preference {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalityResult {
    pub communication_style: CommunicationStyle,
    pub formality_preference: Preference,
    pub detail_preference: Preference,
    pub pace_preference: Preference,
    pub confidence: f64,
}

impl PersonalityResult {
    pub fn neutral() -> Self {
        Self {
            communication_style: CommunicationStyle::Amiable,
            formality_preference: Preference::Medium,
            detail_preference: Preference::Medium,
            pace_preference: Preference::Medium,
            confidence: 0.0,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Program routing & tier detection
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub recommended_program: ProgramType,
    pub confidence: f64,
    pub reasoning: String,
}

impl RouteResult {
    pub fn neutral() -> Self {
        Self {
            recommended_program: ProgramType::Hybrid,
            confidence: 0.0,
            reasoning: "no routing signals".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierResult {
    pub tier: TierLevel,
    pub confidence: f64,
    pub reasoning: String,
    pub price_sensitivity: PriceSensitivity,
}

impl TierResult {
    pub fn neutral() -> Self {
        Self {
            tier: TierLevel::Essential,
            confidence: 0.0,
            reasoning: "no tier signals".into(),
            price_sensitivity: PriceSensitivity::Medium,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Predictions
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectionKind {
    Price,
    Value,
    Trust,
    Need,
    Urgency,
    Competition,
    Features,
    Implementation,
}

impl std::fmt::Display for ObjectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ObjectionKind::Price => "price",
            ObjectionKind::Value => "value",
            ObjectionKind::Trust => "trust",
            ObjectionKind::Need => "need",
            ObjectionKind::Urgency => "urgency",
            ObjectionKind::Competition => "competition",
            ObjectionKind::Features => "features",
            ObjectionKind::Implementation => "implementation",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedObjection {
    pub kind: ObjectionKind,
    pub confidence: f64,
    pub suggested_responses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ObjectionPrediction {
    /// Ranked by confidence, highest first.
    pub objections: Vec<PredictedObjection>,
}

impl ObjectionPrediction {
    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn top(&self) -> Option<&PredictedObjection> {
        self.objections.first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeedCategory {
    Information,
    Reassurance,
    Guidance,
    Personalization,
    Proof,
}

impl std::fmt::Display for NeedCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NeedCategory::Information => "information",
            NeedCategory::Reassurance => "reassurance",
            NeedCategory::Guidance => "guidance",
            NeedCategory::Personalization => "personalization",
            NeedCategory::Proof => "proof",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionPriority {
    Low,
    Medium,
    High,
}

impl ActionPriority {
    /// Scoring weight used by the decision engine.
    pub fn weight(&self) -> f64 {
        match self {
            ActionPriority::Low => 0.6,
            ActionPriority::Medium => 0.8,
            ActionPriority::High => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestedAction {
    pub description: String,
    pub priority: ActionPriority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictedNeed {
    pub category: NeedCategory,
    pub confidence: f64,
    pub suggested_actions: Vec<SuggestedAction>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct NeedsPrediction {
    /// Ranked by confidence, highest first.
    pub needs: Vec<PredictedNeed>,
}

impl NeedsPrediction {
    pub fn neutral() -> Self {
        Self::default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionBand {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ConversionBand {
    /// Multiplier applied by the decision engine's conversion branch.
    pub fn multiplier(&self) -> f64 {
        match self {
            ConversionBand::Low => 0.6,
            ConversionBand::Medium => 0.8,
            ConversionBand::High => 1.0,
            ConversionBand::VeryHigh => 1.2,
        }
    }

    /// Band for a probability under the `[low, medium, high]` thresholds.
    pub fn for_probability(probability: f64, thresholds: &[f64; 3]) -> Self {
        if probability < thresholds[0] {
            ConversionBand::Low
        } else if probability < thresholds[1] {
            ConversionBand::Medium
        } else if probability < thresholds[2] {
            ConversionBand::High
        } else {
            ConversionBand::VeryHigh
        }
    }
}

impl std::fmt::Display for ConversionBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ConversionBand::Low => "low",
            ConversionBand::Medium => "medium",
            ConversionBand::High => "high",
            ConversionBand::VeryHigh => "very_high",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionPrediction {
    pub probability: f64,
    pub confidence: f64,
    pub category: ConversionBand,
    pub recommendations: Vec<SuggestedAction>,
}

impl ConversionPrediction {
    pub fn neutral() -> Self {
        Self {
            probability: 0.1,
            confidence: 0.0,
            category: ConversionBand::Low,
            recommendations: Vec::new(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tagged sum & fused turn analysis
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One analyzer's output for a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalyzerResult {
    Intent(IntentResult),
    Emotion(EmotionResult),
    Personality(PersonalityResult),
    ProgramRouter(RouteResult),
    TierDetector(TierResult),
    ObjectionPredictor(ObjectionPrediction),
    NeedsPredictor(NeedsPrediction),
    ConversionPredictor(ConversionPrediction),
}

impl AnalyzerResult {
    pub fn kind(&self) -> AnalyzerKind {
        match self {
            AnalyzerResult::Intent(_) => AnalyzerKind::Intent,
            AnalyzerResult::Emotion(_) => AnalyzerKind::Emotion,
            AnalyzerResult::Personality(_) => AnalyzerKind::Personality,
            AnalyzerResult::ProgramRouter(_) => AnalyzerKind::ProgramRouter,
            AnalyzerResult::TierDetector(_) => AnalyzerKind::TierDetector,
            AnalyzerResult::ObjectionPredictor(_) => AnalyzerKind::ObjectionPredictor,
            AnalyzerResult::NeedsPredictor(_) => AnalyzerKind::NeedsPredictor,
            AnalyzerResult::ConversionPredictor(_) => AnalyzerKind::ConversionPredictor,
        }
    }
}

/// The fused output of one analyzer fan-out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnAnalysis {
    pub intent: IntentResult,
    pub emotion: EmotionResult,
    pub personality: PersonalityResult,
    pub route: RouteResult,
    pub tier: TierResult,
    pub objections: ObjectionPrediction,
    pub needs: NeedsPrediction,
    pub conversion: ConversionPrediction,
}

impl TurnAnalysis {
    /// All-neutral analysis (every analyzer substituted).
    pub fn neutral() -> Self {
        Self {
            intent: IntentResult::neutral(),
            emotion: EmotionResult::neutral(),
            personality: PersonalityResult::neutral(),
            route: RouteResult::neutral(),
            tier: TierResult::neutral(),
            objections: ObjectionPrediction::neutral(),
            needs: NeedsPrediction::neutral(),
            conversion: ConversionPrediction::neutral(),
        }
    }

    /// Place one analyzer result into its slot.
    pub fn apply(&mut self, result: AnalyzerResult) {
        match result {
            AnalyzerResult::Intent(r) => self.intent = r,
            AnalyzerResult::Emotion(r) => self.emotion = r,
            AnalyzerResult::Personality(r) => self.personality = r,
            AnalyzerResult::ProgramRouter(r) => self.route = r,
            AnalyzerResult::TierDetector(r) => self.tier = r,
            AnalyzerResult::ObjectionPredictor(r) => self.objections = r,
            AnalyzerResult::NeedsPredictor(r) => self.needs = r,
            AnalyzerResult::ConversionPredictor(r) => self.conversion = r,
        }
    }
}
