//! Error taxonomy shared by the core services.

use crate::model::entries::EntryId;
use crate::model::request::ValidationError;
use crate::repo::entity_store::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CareResult<T> = Result<T, CareError>;

/// Which entity or sub-item was absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFoundKind {
    Patient(String),
    Therapist(String),
    Note { user_id: String, note_id: EntryId },
    Notification {
        user_id: String,
        expo_notification_id: String,
    },
}

/// Why a write could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    /// Registration hit an existing `user_id`.
    UserExists(String),
    /// A concurrent transaction changed the same document first. Retryable.
    WriteConflict(String),
}

/// Service-level failure returned to the request boundary.
#[derive(Debug)]
pub enum CareError {
    NotFound(NotFoundKind),
    Conflict(ConflictKind),
    Validation(ValidationError),
    /// Storage failure with no domain meaning.
    Repo(RepoError),
}

impl CareError {
    /// True only for write conflicts; callers may rerun the whole operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(ConflictKind::WriteConflict(_)))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl Display for CareError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(NotFoundKind::Patient(id)) => write!(f, "patient not found: {id}"),
            Self::NotFound(NotFoundKind::Therapist(id)) => {
                write!(f, "therapist not found: {id}")
            }
            Self::NotFound(NotFoundKind::Note { user_id, note_id }) => {
                write!(f, "note not found: {note_id} (patient {user_id})")
            }
            Self::NotFound(NotFoundKind::Notification {
                user_id,
                expo_notification_id,
            }) => write!(
                f,
                "notification with ID {expo_notification_id} not found (patient {user_id})"
            ),
            Self::Conflict(ConflictKind::UserExists(id)) => {
                write!(f, "user already exists: {id}")
            }
            Self::Conflict(ConflictKind::WriteConflict(details)) => {
                write!(f, "concurrent update conflict: {details}")
            }
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CareError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for CareError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for CareError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::DuplicateKey { user_id, .. } => {
                Self::Conflict(ConflictKind::UserExists(user_id))
            }
            err @ (RepoError::StaleRevision { .. } | RepoError::WriteConflict(_)) => {
                Self::Conflict(ConflictKind::WriteConflict(err.to_string()))
            }
            other => Self::Repo(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CareError, ConflictKind};
    use crate::repo::entity_store::{EntityKind, RepoError};

    #[test]
    fn stale_revision_maps_to_retryable_conflict() {
        let err = CareError::from(RepoError::StaleRevision {
            entity: EntityKind::Patient,
            user_id: "p1".to_string(),
            expected: 3,
        });
        assert!(err.is_retryable());
    }

    #[test]
    fn duplicate_key_maps_to_non_retryable_conflict() {
        let err = CareError::from(RepoError::DuplicateKey {
            entity: EntityKind::User,
            user_id: "p1".to_string(),
        });
        assert!(matches!(
            err,
            CareError::Conflict(ConflictKind::UserExists(ref id)) if id == "p1"
        ));
        assert!(!err.is_retryable());
    }

    #[test]
    fn missing_document_on_save_is_a_storage_fault() {
        let err = CareError::from(RepoError::Missing {
            entity: EntityKind::User,
            user_id: "u1".to_string(),
        });
        assert!(matches!(err, CareError::Repo(RepoError::Missing { .. })));
        assert!(!err.is_not_found());
        assert!(!err.is_retryable());
    }
}
