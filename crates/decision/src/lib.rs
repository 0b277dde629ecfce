//! Decision engine.
//!
//! Consumes one turn's fused analyzer output, builds a scored decision
//! tree and returns a ranked list of next actions. Pure and synchronous:
//! no HTTP, no store, just deterministic scoring over the inputs.

pub mod adapt;
pub mod engine;
pub mod tree;
pub mod weights;

pub use adapt::{FeedbackKind, StrategyFeedback};
pub use engine::{Decision, DecisionEngine};
pub use tree::{Action, ActionCategory, DecisionNode, NodeType};
pub use weights::{Objective, ObjectiveWeights};
