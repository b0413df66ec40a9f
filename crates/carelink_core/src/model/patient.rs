//! Patient profile document.
//!
//! # Responsibility
//! - Hold personal data, therapist pointer, tool preferences and every
//!   patient-owned sub-collection as one document.
//! - Provide in-memory collection edits applied inside a transaction.
//!
//! # Invariants
//! - Sub-collections keep insertion order; removal never reorders survivors.
//! - `revision` is owned by the store and reflects the last committed save.

use crate::model::entries::{
    BreathingSession, EntryId, GuidedNote, Note, Notification, Recording,
};
use serde::{Deserialize, Serialize};

/// Self-reported gender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

/// Personal details shared by patient and therapist profiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub gender: Option<Gender>,
}

impl PersonalInfo {
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: None,
            gender: None,
        }
    }

    /// Display name as copied into therapist rosters.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// What the patient agreed to share with the assigned therapist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSharing {
    pub anxiety_tracking: bool,
    pub personal_documentation: bool,
}

/// Therapist assignment state owned by the patient.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TherapistInfo {
    #[serde(default)]
    pub selected_therapist_id: Option<String>,
    #[serde(default)]
    pub data_sharing: DataSharing,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartJewelry {
    pub enabled: bool,
    pub vibration_alerts: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MusicTherapy {
    pub enabled: bool,
    #[serde(default)]
    pub selected_track_id: Option<String>,
}

/// Coping tool preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsPreferences {
    #[serde(default)]
    pub smart_jewelry: SmartJewelry,
    #[serde(default)]
    pub music_therapy: MusicTherapy,
}

/// Patient profile and its owned sub-collections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub user_id: String,
    pub personal_info: PersonalInfo,
    #[serde(default)]
    pub therapist_info: TherapistInfo,
    #[serde(default)]
    pub tools_preferences: ToolsPreferences,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub guided_notes: Vec<GuidedNote>,
    #[serde(default)]
    pub recordings: Vec<Recording>,
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub breathing_sessions: Vec<BreathingSession>,
    /// Store-managed optimistic concurrency token. Zero until first insert.
    #[serde(skip)]
    pub revision: u64,
}

impl Patient {
    /// Creates an unsaved patient with empty sub-collections.
    pub fn new(
        user_id: impl Into<String>,
        personal_info: PersonalInfo,
        therapist_info: TherapistInfo,
        tools_preferences: ToolsPreferences,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            personal_info,
            therapist_info,
            tools_preferences,
            notes: Vec::new(),
            guided_notes: Vec::new(),
            recordings: Vec::new(),
            notifications: Vec::new(),
            breathing_sessions: Vec::new(),
            revision: 0,
        }
    }

    /// Currently assigned therapist, if any.
    pub fn therapist_id(&self) -> Option<&str> {
        self.therapist_info.selected_therapist_id.as_deref()
    }

    pub fn full_name(&self) -> String {
        self.personal_info.full_name()
    }

    pub fn note_mut(&mut self, note_id: EntryId) -> Option<&mut Note> {
        self.notes.iter_mut().find(|note| note.id == note_id)
    }

    /// Removes one note, keeping the relative order of the rest.
    pub fn remove_note(&mut self, note_id: EntryId) -> Option<Note> {
        let index = self.notes.iter().position(|note| note.id == note_id)?;
        Some(self.notes.remove(index))
    }

    /// First notification with the given provider id.
    pub fn notification_by_expo_id_mut(
        &mut self,
        expo_notification_id: &str,
    ) -> Option<&mut Notification> {
        self.notifications
            .iter_mut()
            .find(|item| item.expo_notification_id == expo_notification_id)
    }
}

#[cfg(test)]
mod tests {
    use super::{Patient, PersonalInfo, TherapistInfo, ToolsPreferences};
    use crate::model::entries::Note;
    use uuid::Uuid;

    fn note(content: &str) -> Note {
        Note {
            id: Uuid::new_v4(),
            content: content.to_string(),
            timestamp: 1,
        }
    }

    #[test]
    fn remove_note_preserves_order_of_remaining_notes() {
        let mut patient = Patient::new(
            "p1",
            PersonalInfo::new("Ada", "Lovelace"),
            TherapistInfo::default(),
            ToolsPreferences::default(),
        );
        patient.notes = vec![note("a"), note("b"), note("c"), note("d")];
        let target = patient.notes[1].id;

        let removed = patient.remove_note(target).unwrap();
        assert_eq!(removed.content, "b");
        let remaining: Vec<_> = patient.notes.iter().map(|n| n.content.as_str()).collect();
        assert_eq!(remaining, vec!["a", "c", "d"]);
        assert!(patient.remove_note(target).is_none());
    }

    #[test]
    fn full_name_joins_first_and_last_with_space() {
        assert_eq!(PersonalInfo::new("Ada", "Lovelace").full_name(), "Ada Lovelace");
    }

    #[test]
    fn document_uses_camel_case_and_skips_revision() {
        let mut patient = Patient::new(
            "p1",
            PersonalInfo::new("Ada", "Lovelace"),
            TherapistInfo {
                selected_therapist_id: Some("t1".to_string()),
                ..TherapistInfo::default()
            },
            ToolsPreferences::default(),
        );
        patient.revision = 7;

        let value = serde_json::to_value(&patient).unwrap();
        assert_eq!(value["therapistInfo"]["selectedTherapistId"], "t1");
        assert!(value.get("revision").is_none());

        let minimal = serde_json::json!({
            "userId": "p2",
            "personalInfo": { "firstName": "Grace", "lastName": "Hopper" }
        });
        let parsed: Patient = serde_json::from_value(minimal).unwrap();
        assert!(parsed.notes.is_empty());
        assert_eq!(parsed.therapist_id(), None);
        assert_eq!(parsed.revision, 0);
    }
}
