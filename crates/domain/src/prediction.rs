//! Per-turn model predictions, resolved against the final outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which family of model produced the prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionKind {
    Decision,
    Objection,
    Needs,
    Conversion,
}

/// One scored-turn prediction.
///
/// `was_correct` is only ever set after `actual_outcome` is recorded at
/// the end of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub id: Uuid,
    pub model_name: String,
    pub conversation_id: Uuid,
    pub kind: PredictionKind,
    pub data: serde_json::Value,
    pub confidence: f64,
    #[serde(default)]
    pub actual_outcome: Option<String>,
    #[serde(default)]
    pub was_correct: Option<bool>,
    pub created_at: DateTime<Utc>,
}

impl Prediction {
    pub fn new(
        model_name: impl Into<String>,
        conversation_id: Uuid,
        kind: PredictionKind,
        data: serde_json::Value,
        confidence: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            model_name: model_name.into(),
            conversation_id,
            kind,
            data,
            confidence: confidence.clamp(0.0, 1.0),
            actual_outcome: None,
            was_correct: None,
            created_at: Utc::now(),
        }
    }

    /// Record the realized outcome and whether the prediction held.
    pub fn resolve(&mut self, actual_outcome: impl Into<String>, was_correct: bool) {
        self.actual_outcome = Some(actual_outcome.into());
        self.was_correct = Some(was_correct);
    }
}
