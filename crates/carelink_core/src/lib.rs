//! Relationship-consistency core for the anxiety-support care backend.
//! This crate is the single source of truth for the patient/therapist
//! invariants and patient-owned sub-resources.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::StoreConfig;
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig};
pub use model::entries::{BreathingSession, EntryId, GuidedNote, Note, Notification, Recording};
pub use model::patient::{
    DataSharing, Gender, MusicTherapy, Patient, PersonalInfo, SmartJewelry, TherapistInfo,
    ToolsPreferences,
};
pub use model::request::{
    NewBreathingSession, NewGuidedNote, NewNote, NewNotification, NewRecording, NotePatch,
    PreferencesUpdate, RegisterUserRequest, RegistrationProfile, ValidationError,
};
pub use model::therapist::{ProfessionalInfo, Roster, RosterEntry, Therapist};
pub use model::user::{User, UserType};
pub use repo::entity_store::{
    EntityKind, EntityStore, RepoError, RepoResult, SqliteEntityStore,
};
pub use repo::transaction::{SqliteCoordinator, TransactionCoordinator};
pub use service::error::{CareError, CareResult, ConflictKind, NotFoundKind};
pub use service::registration_service::{Profile, RegistrationService, UserProfile};
pub use service::relationship_service::{ConsistencyViolation, RelationshipService};
pub use service::subresource_service::SubresourceService;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
