//! Therapist profile document and patient roster.
//!
//! # Responsibility
//! - Hold therapist personal/professional data and the roster of assigned
//!   patients.
//! - Express roster edits as set-union / set-difference keyed by patient id.
//!
//! # Invariants
//! - Roster entries are unique by `user_id` after any roster edit.
//! - `full_name` is a snapshot taken at assignment time, not a live link.

use crate::model::patient::PersonalInfo;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfessionalInfo {
    pub education_level: String,
    pub experience_level: String,
    pub workplace: String,
    pub specialization: String,
    pub license_number: String,
}

/// One assigned patient as seen from the therapist side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub user_id: String,
    pub full_name: String,
}

impl RosterEntry {
    pub fn new(user_id: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            full_name: full_name.into(),
        }
    }
}

/// Outcome of a roster union.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterChange {
    Added,
    /// Entry existed; its name snapshot was refreshed.
    Renamed,
    Unchanged,
}

/// Ordered set of roster entries keyed by patient id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster(Vec<RosterEntry>);

impl Roster {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, patient_id: &str) -> bool {
        self.0.iter().any(|entry| entry.user_id == patient_id)
    }

    /// Set-union by `user_id`.
    ///
    /// An existing entry keeps its position and takes the new name snapshot;
    /// duplicates left behind by earlier drift collapse into it.
    pub fn union(&mut self, entry: RosterEntry) -> RosterChange {
        let Some(index) = self.0.iter().position(|item| item.user_id == entry.user_id) else {
            self.0.push(entry);
            return RosterChange::Added;
        };

        let mut seen = false;
        self.0.retain(|item| {
            if item.user_id != entry.user_id {
                return true;
            }
            let keep = !seen;
            seen = true;
            keep
        });

        let existing = &mut self.0[index];
        if existing.full_name == entry.full_name {
            RosterChange::Unchanged
        } else {
            existing.full_name = entry.full_name;
            RosterChange::Renamed
        }
    }

    /// Set-difference by `user_id`. Returns how many entries were removed.
    pub fn difference(&mut self, patient_id: &str) -> usize {
        let before = self.0.len();
        self.0.retain(|entry| entry.user_id != patient_id);
        before - self.0.len()
    }
}

impl From<Vec<RosterEntry>> for Roster {
    fn from(value: Vec<RosterEntry>) -> Self {
        Self(value)
    }
}

/// Therapist profile with the roster of assigned patients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Therapist {
    pub user_id: String,
    pub personal_info: PersonalInfo,
    #[serde(default)]
    pub professional_info: ProfessionalInfo,
    #[serde(default)]
    pub patients: Roster,
    /// Store-managed optimistic concurrency token. Zero until first insert.
    #[serde(skip)]
    pub revision: u64,
}

impl Therapist {
    /// Creates an unsaved therapist with an empty roster.
    pub fn new(
        user_id: impl Into<String>,
        personal_info: PersonalInfo,
        professional_info: ProfessionalInfo,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            personal_info,
            professional_info,
            patients: Roster::new(),
            revision: 0,
        }
    }
}
