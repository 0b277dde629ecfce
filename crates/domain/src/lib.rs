//! Shared domain types for the CoreSell conversation engine.
//!
//! Every other crate in the workspace depends on this one and nothing else
//! inside the workspace, which keeps the dependency graph acyclic: services
//! talk to each other through the types and traits defined here.

pub mod config;
pub mod conversation;
pub mod customer;
pub mod envelope;
pub mod error;
pub mod outcome;
pub mod platform;
pub mod prediction;
pub mod tier;
pub mod trace;

pub use error::{Error, ErrorCode, Result};
