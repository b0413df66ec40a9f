//! Entity store contracts, SQLite persistence and transaction coordination.
//!
//! # Responsibility
//! - Define the store handle used inside transactions (`EntityStore`).
//! - Isolate SQLite query details from the relationship/sub-resource logic.
//! - Bracket every unit of work in one commit-or-rollback transaction.
//!
//! # Invariants
//! - Entity writes only happen through a handle bound to an open transaction.
//! - Concurrent writes to one document surface as retryable conflicts.

pub mod entity_store;
pub mod transaction;
