//! Core use-case services.
//!
//! # Responsibility
//! - Compose entity store calls into request-level operations, one
//!   transaction per call.
//! - Keep the request boundary decoupled from storage details.
//!
//! # Invariants
//! - Services hold no mutable state; all state lives behind the injected
//!   coordinator.

pub mod error;
pub mod registration_service;
pub mod relationship_service;
pub mod subresource_service;

use crate::model::patient::Patient;
use crate::repo::entity_store::EntityStore;
use error::{CareError, CareResult, NotFoundKind};

/// Loads a patient or fails with `NotFound`.
pub(crate) fn load_patient(store: &dyn EntityStore, patient_id: &str) -> CareResult<Patient> {
    store
        .get_patient(patient_id)?
        .ok_or_else(|| CareError::NotFound(NotFoundKind::Patient(patient_id.to_string())))
}
