//! Decision tree nodes and flattened actions.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use cs_analyzers::results::ActionPriority;

/// Node kind inside the per-turn decision tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Root,
    Objection,
    Need,
    Conversion,
    Exploration,
    Action,
}

/// Category of a flattened next action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionCategory {
    ObjectionResponse,
    NeedSatisfaction,
    ConversionProgression,
    Exploration,
}

/// One node of the decision tree. Rebuilt every turn; not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionNode {
    pub id: Uuid,
    pub node_type: NodeType,
    pub description: String,
    pub confidence: f64,
    pub score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ActionCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<ActionPriority>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DecisionNode>,
}

impl DecisionNode {
    pub fn branch(node_type: NodeType, description: impl Into<String>, confidence: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            node_type,
            description: description.into(),
            confidence,
            score: 0.0,
            category: None,
            priority: None,
            children: Vec::new(),
        }
    }

    pub fn action(
        category: ActionCategory,
        description: impl Into<String>,
        score: f64,
        priority: ActionPriority,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            node_type: NodeType::Action,
            description: description.into(),
            confidence: score,
            score: score.clamp(0.0, 1.0),
            category: Some(category),
            priority: Some(priority),
            children: Vec::new(),
        }
    }

    /// Depth-first collection of all action leaves.
    pub fn action_nodes(&self) -> Vec<&DecisionNode> {
        let mut out = Vec::new();
        self.collect_actions(&mut out);
        out
    }

    fn collect_actions<'a>(&'a self, out: &mut Vec<&'a DecisionNode>) {
        if self.node_type == NodeType::Action {
            out.push(self);
        }
        for child in &self.children {
            child.collect_actions(out);
        }
    }

    /// Depth of the tree rooted at `self`.
    pub fn depth(&self) -> usize {
        1 + self
            .children
            .iter()
            .map(|c| c.depth())
            .max()
            .unwrap_or(0)
    }
}

/// One ranked next action, flattened out of the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub id: Uuid,
    pub category: ActionCategory,
    pub description: String,
    pub score: f64,
    pub priority: ActionPriority,
}

impl Action {
    pub fn from_node(node: &DecisionNode) -> Option<Self> {
        Some(Self {
            id: node.id,
            category: node.category?,
            description: node.description.clone(),
            score: node.score,
            priority: node.priority.unwrap_or(ActionPriority::Medium),
        })
    }
}
