//! Resilient persistence facade over a remote row store.
//!
//! Split into the two concerns the rest of the engine composes:
//! a remote client with classified retry ([`rest::HttpRowStore`]) and a
//! local write-through cache with a staged-write reconciler
//! ([`resilient::ResilientStore`]). Callers only ever see the
//! [`provider::RowStore`] trait.

pub mod cache;
pub mod memory;
pub mod provider;
pub mod resilient;
pub mod rest;
pub mod retry;
pub mod rows;
pub mod staged;

pub use memory::MemoryRowStore;
pub use provider::{Filters, Row, RowStore};
pub use resilient::ResilientStore;
pub use rest::HttpRowStore;
pub use staged::{Reconciler, StagedQueue};
