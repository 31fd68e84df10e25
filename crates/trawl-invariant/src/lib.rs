//! Invariant seam and persistence interface for Trawl.
//!
//! This crate provides:
//!
//! - [`Invariant`] — a named predicate over an entity plus its repair
//!   routine. Individual rules (history integrity, mutable-state
//!   integrity, staleness) live outside the core; the reconciliation
//!   workflows treat them as opaque.
//! - [`InvariantManager`] — evaluates an **ordered** invariant list;
//!   the first non-healthy verdict classifies the entity. Ordering
//!   gives each entity a stable "reason" across runs, which lets
//!   operators diff reports.
//! - [`EntityStore`] — the persistence layer's interface: a paginated
//!   per-shard cursor for scans, versioned (CAS) updates for fixes.
//! - [`MemoryEntityStore`] — in-memory backend with fault injection,
//!   for tests and local runs.

mod entity;
mod error;
mod invariant;
mod manager;
mod store;

pub use entity::{EntityPage, EntityRecord};
pub use error::PersistenceError;
pub use invariant::{
    CheckResult, CheckVerdict, FixOutcome, FixResult, Invariant, COLLECTION_HISTORY,
    COLLECTION_MUTABLE_STATE, COLLECTION_STALE,
};
pub use manager::{InvariantManager, ManagerCheckResult};
pub use store::{EntityStore, MemoryEntityStore};
