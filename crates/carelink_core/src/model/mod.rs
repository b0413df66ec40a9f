//! Domain model for users, typed profiles and patient-owned sub-resources.
//!
//! # Responsibility
//! - Define canonical entities persisted by the entity store.
//! - Define per-operation request shapes validated at the core boundary.
//!
//! # Invariants
//! - Every entity is addressed by the `user_id` of its owning `User`.
//! - A patient's therapist pointer and the therapist's roster mirror each
//!   other after every committed transaction.

pub mod entries;
pub mod patient;
pub mod request;
pub mod therapist;
pub mod user;
