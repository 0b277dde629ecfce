//! Decision engine core: tree building, scoring, action ranking.

use serde::{Deserialize, Serialize};

use cs_analyzers::results::{ActionPriority, TurnAnalysis};
use cs_domain::config::DecisionConfig;

use crate::tree::{Action, ActionCategory, DecisionNode, NodeType};
use crate::weights::ObjectiveWeights;

/// Exploration moves used to open new conversation directions when
/// nothing scored well enough.
pub const EXPLORATION_MOVES: &[&str] = &[
    "Preguntar sobre objetivos a largo plazo",
    "Indagar sobre experiencias previas con soluciones similares",
    "Explorar nuevos casos de uso potenciales",
    "Preguntar sobre otros involucrados en la decisión",
];

/// Exploration branch weight is capped regardless of objectives.
const EXPLORATION_BASE: f64 = 0.3;

/// How many child actions each branch carries.
const BRANCH_FANOUT: usize = 3;

/// Mix between a branch's own base score and its best children.
const BASE_SHARE: f64 = 0.7;
const CHILD_SHARE: f64 = 0.3;

/// Maximum number of actions returned per turn.
const MAX_ACTIONS: usize = 3;

/// Confidence gate for opening an objection-handling branch.
const OBJECTION_BRANCH_GATE: f64 = 0.7;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Output
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The engine's per-turn output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Ranked next actions, scores non-increasing, at most three.
    pub actions: Vec<Action>,
    /// The full tree, kept for observability.
    pub tree: DecisionNode,
    pub objectives_used: ObjectiveWeights,
    pub confidence: f64,
    #[serde(default)]
    pub adapted: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Engine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct DecisionEngine {
    config: DecisionConfig,
}

impl DecisionEngine {
    pub fn new(config: DecisionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    /// Evaluate one turn: build the tree, score it, rank the actions.
    ///
    /// `override_weights` replaces the configured objective weights for
    /// this call only (the adaptation path uses this).
    pub fn evaluate(
        &self,
        analysis: &TurnAnalysis,
        override_weights: Option<ObjectiveWeights>,
    ) -> Decision {
        let weights = override_weights
            .map(ObjectiveWeights::normalized)
            .unwrap_or_else(|| ObjectiveWeights::from_config(&self.config));

        let tree = self.build_tree(analysis, &weights);
        let (actions, confidence) = self.rank_actions(&tree);

        Decision {
            actions,
            tree,
            objectives_used: weights,
            confidence,
            adapted: false,
        }
    }

    // ── tree construction ────────────────────────────────────────────

    fn build_tree(&self, analysis: &TurnAnalysis, weights: &ObjectiveWeights) -> DecisionNode {
        let mut root = DecisionNode::branch(NodeType::Root, "decision root", 1.0);

        // 1. Objection branch — only when the top predicted objection is
        //    confident enough to act on.
        if let Some(top) = analysis.objections.top() {
            if top.confidence >= OBJECTION_BRANCH_GATE {
                let mut branch = DecisionNode::branch(
                    NodeType::Objection,
                    format!("handle objection: {}", top.kind),
                    top.confidence,
                );
                for (rank, response) in
                    top.suggested_responses.iter().take(BRANCH_FANOUT).enumerate()
                {
                    // Response rank decay: first suggestion scores highest.
                    let score = top.confidence * (0.9 - rank as f64 * 0.1);
                    branch.children.push(DecisionNode::action(
                        ActionCategory::ObjectionResponse,
                        response.clone(),
                        score,
                        ActionPriority::High,
                    ));
                }
                branch.score = branch_score(
                    weights.objection_handling * branch.confidence,
                    &branch.children,
                );
                root.children.push(branch);
            }
        }

        // 2. Need branches — the top two predicted needs.
        for need in analysis.needs.needs.iter().take(2) {
            let mut branch = DecisionNode::branch(
                NodeType::Need,
                format!("satisfy need: {}", need.category),
                need.confidence,
            );
            for action in need.suggested_actions.iter().take(BRANCH_FANOUT) {
                let score = need.confidence * action.priority.weight();
                branch.children.push(DecisionNode::action(
                    ActionCategory::NeedSatisfaction,
                    action.description.clone(),
                    score,
                    action.priority,
                ));
            }
            branch.score = branch_score(
                weights.need_satisfaction * branch.confidence,
                &branch.children,
            );
            root.children.push(branch);
        }

        // 3. Conversion branch — always present.
        let conversion = &analysis.conversion;
        let multiplier = conversion.category.multiplier();
        let mut branch = DecisionNode::branch(
            NodeType::Conversion,
            format!("conversion progression: {}", conversion.category),
            conversion.confidence,
        );
        for recommendation in conversion.recommendations.iter().take(BRANCH_FANOUT) {
            let score = recommendation.priority.weight() * multiplier;
            branch.children.push(DecisionNode::action(
                ActionCategory::ConversionProgression,
                recommendation.description.clone(),
                score,
                recommendation.priority,
            ));
        }
        branch.score = branch_score(
            weights.conversion_progress * branch.confidence * multiplier,
            &branch.children,
        );
        root.children.push(branch);

        // 4. Exploration branch — always present, weight-capped.
        let mut exploration =
            DecisionNode::branch(NodeType::Exploration, "explore new directions", 0.6);
        for (rank, action) in EXPLORATION_MOVES.iter().enumerate() {
            exploration.children.push(DecisionNode::action(
                ActionCategory::Exploration,
                *action,
                0.7 - rank as f64 * 0.1,
                ActionPriority::Medium,
            ));
        }
        exploration.score = branch_score(EXPLORATION_BASE, &exploration.children);
        root.children.push(exploration);

        // Root score: mean of the two best branches.
        let mut branch_scores: Vec<f64> = root.children.iter().map(|c| c.score).collect();
        branch_scores.sort_by(|a, b| b.total_cmp(a));
        root.score = mean(&branch_scores[..branch_scores.len().min(2)]);
        root
    }

    // ── action ranking ───────────────────────────────────────────────

    fn rank_actions(&self, tree: &DecisionNode) -> (Vec<Action>, f64) {
        let mut actions: Vec<Action> = tree
            .action_nodes()
            .into_iter()
            .filter_map(Action::from_node)
            .collect();
        actions.sort_by(|a, b| b.score.total_cmp(&a.score));
        actions.truncate(MAX_ACTIONS);

        let confidence = if actions.is_empty() {
            0.0
        } else {
            actions.iter().map(|a| a.score).sum::<f64>() / actions.len() as f64
        };

        // Low overall confidence without an exploration path: inject one
        // so the agent has a safe direction to open up.
        if confidence < self.config.min_confidence
            && !actions
                .iter()
                .any(|a| a.category == ActionCategory::Exploration)
        {
            let taken: Vec<&str> = actions.iter().map(|a| a.description.as_str()).collect();
            let description = EXPLORATION_MOVES
                .iter()
                .find(|m| !taken.contains(*m))
                .unwrap_or(&EXPLORATION_MOVES[0]);
            let node = DecisionNode::action(
                ActionCategory::Exploration,
                *description,
                0.5,
                ActionPriority::Medium,
            );
            if actions.len() == MAX_ACTIONS {
                actions.pop();
            }
            if let Some(action) = Action::from_node(&node) {
                actions.push(action);
            }
        }

        (actions, confidence)
    }
}

/// `0.7 × base + 0.3 × mean(top-2 children)`.
fn branch_score(base: f64, children: &[DecisionNode]) -> f64 {
    let mut child_scores: Vec<f64> = children.iter().map(|c| c.score).collect();
    child_scores.sort_by(|a, b| b.total_cmp(a));
    let top = &child_scores[..child_scores.len().min(2)];
    (BASE_SHARE * base + CHILD_SHARE * mean(top)).clamp(0.0, 1.0)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
