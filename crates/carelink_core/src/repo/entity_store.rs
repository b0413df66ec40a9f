//! Entity store contract and SQLite implementation.
//!
//! # Responsibility
//! - Load and persist `User`, `Patient` and `Therapist` records by `user_id`.
//! - Enforce optimistic revisions on profile documents.
//!
//! # Invariants
//! - `save_*` succeeds only when the stored revision equals the loaded one,
//!   and bumps it by one.
//! - Busy/locked SQLite failures become `RepoError::WriteConflict`.
//! - Read paths reject malformed persisted documents instead of masking them.

use crate::db::DbError;
use crate::model::patient::Patient;
use crate::model::therapist::Therapist;
use crate::model::user::{User, UserType};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Stored entity kind, used for error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    User,
    Patient,
    Therapist,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Patient => "patient",
            Self::Therapist => "therapist",
        }
    }

    fn table(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Patient => "patients",
            Self::Therapist => "therapists",
        }
    }
}

/// Entity store failure.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Insert hit an existing key.
    DuplicateKey { entity: EntityKind, user_id: String },
    /// Save lost an optimistic revision race.
    StaleRevision {
        entity: EntityKind,
        user_id: String,
        expected: u64,
    },
    /// Another transaction holds or already changed the data we need.
    WriteConflict(String),
    /// Save targeted a document that does not exist.
    Missing { entity: EntityKind, user_id: String },
    InvalidData(String),
}

impl RepoError {
    /// Whether retrying the whole transaction may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::StaleRevision { .. } | Self::WriteConflict(_))
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::DuplicateKey { entity, user_id } => {
                write!(f, "{} already exists: {user_id}", entity.as_str())
            }
            Self::StaleRevision {
                entity,
                user_id,
                expected,
            } => write!(
                f,
                "{} {user_id} changed concurrently (expected revision {expected})",
                entity.as_str()
            ),
            Self::WriteConflict(details) => write!(f, "write conflict: {details}"),
            Self::Missing { entity, user_id } => {
                write!(f, "{} not found on save: {user_id}", entity.as_str())
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => Self::from(err),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match value.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                Self::WriteConflict(value.to_string())
            }
            _ => Self::Db(DbError::Sqlite(value)),
        }
    }
}

/// Store handle bound to one open transaction.
///
/// Implementations must route every read and write through that transaction.
pub trait EntityStore {
    fn get_user(&self, user_id: &str) -> RepoResult<Option<User>>;
    fn insert_user(&self, user: &User) -> RepoResult<()>;

    fn get_patient(&self, user_id: &str) -> RepoResult<Option<Patient>>;
    /// Inserts a new patient document and sets its revision to 1.
    fn insert_patient(&self, patient: &mut Patient) -> RepoResult<()>;
    /// Persists a loaded patient; fails on revision mismatch.
    fn save_patient(&self, patient: &mut Patient) -> RepoResult<()>;
    /// All patients ordered by `user_id`.
    fn list_patients(&self) -> RepoResult<Vec<Patient>>;

    fn get_therapist(&self, user_id: &str) -> RepoResult<Option<Therapist>>;
    fn insert_therapist(&self, therapist: &mut Therapist) -> RepoResult<()>;
    fn save_therapist(&self, therapist: &mut Therapist) -> RepoResult<()>;
    /// All therapists ordered by `user_id`.
    fn list_therapists(&self) -> RepoResult<Vec<Therapist>>;
}

/// SQLite-backed entity store over a borrowed connection or transaction.
pub struct SqliteEntityStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEntityStore<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn get_document<T: DeserializeOwned>(
        &self,
        entity: EntityKind,
        user_id: &str,
    ) -> RepoResult<Option<(T, u64)>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "SELECT document, revision FROM {} WHERE user_id = ?1;",
                    entity.table()
                ),
                [user_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()?;

        row.map(|(document, revision)| parse_document(entity, user_id, &document, revision))
            .transpose()
    }

    fn list_documents<T: DeserializeOwned>(&self, entity: EntityKind) -> RepoResult<Vec<(T, u64)>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT user_id, document, revision FROM {} ORDER BY user_id ASC;",
            entity.table()
        ))?;
        let mut rows = stmt.query([])?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            let user_id: String = row.get(0)?;
            let document: String = row.get(1)?;
            let revision: i64 = row.get(2)?;
            documents.push(parse_document(entity, &user_id, &document, revision)?);
        }
        Ok(documents)
    }

    fn insert_document<T: Serialize>(
        &self,
        entity: EntityKind,
        user_id: &str,
        document: &T,
    ) -> RepoResult<u64> {
        let body = encode_document(entity, document)?;
        let inserted = self.conn.execute(
            &format!(
                "INSERT INTO {} (user_id, revision, document) VALUES (?1, 1, ?2);",
                entity.table()
            ),
            params![user_id, body],
        );
        match inserted {
            Ok(_) => Ok(1),
            Err(err) if is_primary_key_violation(&err) => Err(RepoError::DuplicateKey {
                entity,
                user_id: user_id.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn save_document<T: Serialize>(
        &self,
        entity: EntityKind,
        user_id: &str,
        expected: u64,
        document: &T,
    ) -> RepoResult<u64> {
        let body = encode_document(entity, document)?;
        let expected_sql = i64::try_from(expected)
            .map_err(|_| RepoError::InvalidData(format!("revision {expected} out of range")))?;
        let changed = self.conn.execute(
            &format!(
                "UPDATE {}
                 SET
                    document = ?3,
                    revision = revision + 1,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE user_id = ?1
                   AND revision = ?2;",
                entity.table()
            ),
            params![user_id, expected_sql, body],
        )?;

        if changed == 1 {
            return Ok(expected + 1);
        }

        let exists: i64 = self.conn.query_row(
            &format!(
                "SELECT EXISTS(SELECT 1 FROM {} WHERE user_id = ?1);",
                entity.table()
            ),
            [user_id],
            |row| row.get(0),
        )?;
        if exists == 1 {
            Err(RepoError::StaleRevision {
                entity,
                user_id: user_id.to_string(),
                expected,
            })
        } else {
            Err(RepoError::Missing {
                entity,
                user_id: user_id.to_string(),
            })
        }
    }
}

impl EntityStore for SqliteEntityStore<'_> {
    fn get_user(&self, user_id: &str) -> RepoResult<Option<User>> {
        let row = self
            .conn
            .query_row(
                "SELECT user_id, user_type FROM users WHERE user_id = ?1;",
                [user_id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        row.map(|(id, type_text)| {
            let user_type = UserType::parse(&type_text).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "invalid user type `{type_text}` in users.user_type"
                ))
            })?;
            Ok(User::new(id, user_type))
        })
        .transpose()
    }

    fn insert_user(&self, user: &User) -> RepoResult<()> {
        let inserted = self.conn.execute(
            "INSERT INTO users (user_id, user_type) VALUES (?1, ?2);",
            params![user.user_id.as_str(), user.user_type.as_str()],
        );
        match inserted {
            Ok(_) => Ok(()),
            Err(err) if is_primary_key_violation(&err) => Err(RepoError::DuplicateKey {
                entity: EntityKind::User,
                user_id: user.user_id.clone(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn get_patient(&self, user_id: &str) -> RepoResult<Option<Patient>> {
        Ok(self
            .get_document::<Patient>(EntityKind::Patient, user_id)?
            .map(|(mut patient, revision)| {
                patient.revision = revision;
                patient
            }))
    }

    fn insert_patient(&self, patient: &mut Patient) -> RepoResult<()> {
        patient.revision = self.insert_document(EntityKind::Patient, &patient.user_id, &*patient)?;
        Ok(())
    }

    fn save_patient(&self, patient: &mut Patient) -> RepoResult<()> {
        patient.revision = self.save_document(
            EntityKind::Patient,
            &patient.user_id,
            patient.revision,
            &*patient,
        )?;
        Ok(())
    }

    fn list_patients(&self) -> RepoResult<Vec<Patient>> {
        Ok(self
            .list_documents::<Patient>(EntityKind::Patient)?
            .into_iter()
            .map(|(mut patient, revision)| {
                patient.revision = revision;
                patient
            })
            .collect())
    }

    fn get_therapist(&self, user_id: &str) -> RepoResult<Option<Therapist>> {
        Ok(self
            .get_document::<Therapist>(EntityKind::Therapist, user_id)?
            .map(|(mut therapist, revision)| {
                therapist.revision = revision;
                therapist
            }))
    }

    fn insert_therapist(&self, therapist: &mut Therapist) -> RepoResult<()> {
        therapist.revision =
            self.insert_document(EntityKind::Therapist, &therapist.user_id, &*therapist)?;
        Ok(())
    }

    fn save_therapist(&self, therapist: &mut Therapist) -> RepoResult<()> {
        therapist.revision = self.save_document(
            EntityKind::Therapist,
            &therapist.user_id,
            therapist.revision,
            &*therapist,
        )?;
        Ok(())
    }

    fn list_therapists(&self) -> RepoResult<Vec<Therapist>> {
        Ok(self
            .list_documents::<Therapist>(EntityKind::Therapist)?
            .into_iter()
            .map(|(mut therapist, revision)| {
                therapist.revision = revision;
                therapist
            })
            .collect())
    }
}

fn encode_document<T: Serialize>(entity: EntityKind, document: &T) -> RepoResult<String> {
    serde_json::to_string(document).map_err(|err| {
        RepoError::InvalidData(format!("cannot encode {} document: {err}", entity.as_str()))
    })
}

fn parse_document<T: DeserializeOwned>(
    entity: EntityKind,
    user_id: &str,
    document: &str,
    revision: i64,
) -> RepoResult<(T, u64)> {
    let parsed = serde_json::from_str(document).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid {} document for `{user_id}`: {err}",
            entity.as_str()
        ))
    })?;
    let revision = u64::try_from(revision).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid revision `{revision}` in {}.revision",
            entity.table()
        ))
    })?;
    Ok((parsed, revision))
}

fn is_primary_key_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}
