//! Per-operation request shapes and boundary validation.
//!
//! # Responsibility
//! - Describe exactly what each core operation accepts.
//! - Reject missing or malformed required fields before a transaction opens.
//!
//! # Invariants
//! - Therapist references `"none"` and blank strings mean "no therapist".
//! - `validate()` never touches storage.

use crate::model::entries::{
    now_epoch_ms, BreathingSession, GuidedNote, Note, Notification, Recording,
};
use crate::model::patient::{PersonalInfo, TherapistInfo, ToolsPreferences};
use crate::model::therapist::ProfessionalInfo;
use crate::model::user::UserType;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Legacy sentinel some clients send instead of `null`.
pub const NO_THERAPIST_SENTINEL: &str = "none";

static USER_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.:@-]{1,128}$").expect("valid user id regex"));

/// Caller-supplied data failed boundary validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required text field is empty after trim.
    BlankField(&'static str),
    /// Identifier does not match the accepted user id shape.
    InvalidUserId { field: &'static str, value: String },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "required field `{field}` is blank"),
            Self::InvalidUserId { field, value } => {
                write!(f, "field `{field}` is not a valid user id: `{value}`")
            }
        }
    }
}

impl Error for ValidationError {}

/// Validates a user identifier.
pub fn validate_user_id(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if USER_ID_RE.is_match(value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidUserId {
            field,
            value: value.to_string(),
        })
    }
}

/// Maps the sentinel and blank references to `None`.
pub fn normalize_therapist_ref(value: Option<&str>) -> Option<String> {
    let trimmed = value?.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NO_THERAPIST_SENTINEL) {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::BlankField(field))
    } else {
        Ok(())
    }
}

fn validate_personal_info(info: &PersonalInfo) -> Result<(), ValidationError> {
    require_text("personalInfo.firstName", &info.first_name)?;
    require_text("personalInfo.lastName", &info.last_name)
}

fn validate_therapist_ref(info: &TherapistInfo) -> Result<(), ValidationError> {
    match normalize_therapist_ref(info.selected_therapist_id.as_deref()) {
        Some(id) => validate_user_id("therapistInfo.selectedTherapistId", &id),
        None => Ok(()),
    }
}

/// Type-specific part of a registration, tagged by `userType`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "userType", rename_all = "snake_case")]
pub enum RegistrationProfile {
    #[serde(rename_all = "camelCase")]
    Patient {
        #[serde(default)]
        therapist_info: TherapistInfo,
        #[serde(default)]
        tools_preferences: ToolsPreferences,
    },
    #[serde(rename_all = "camelCase")]
    Therapist { professional_info: ProfessionalInfo },
    Admin,
}

/// `registerUser` input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    pub user_id: String,
    pub personal_info: PersonalInfo,
    #[serde(flatten)]
    pub profile: RegistrationProfile,
}

impl RegisterUserRequest {
    pub fn user_type(&self) -> UserType {
        match self.profile {
            RegistrationProfile::Patient { .. } => UserType::Patient,
            RegistrationProfile::Therapist { .. } => UserType::Therapist,
            RegistrationProfile::Admin => UserType::Admin,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_user_id("userId", &self.user_id)?;
        match &self.profile {
            RegistrationProfile::Patient { therapist_info, .. } => {
                validate_personal_info(&self.personal_info)?;
                validate_therapist_ref(therapist_info)
            }
            RegistrationProfile::Therapist { professional_info } => {
                validate_personal_info(&self.personal_info)?;
                require_text(
                    "professionalInfo.educationLevel",
                    &professional_info.education_level,
                )?;
                require_text(
                    "professionalInfo.experienceLevel",
                    &professional_info.experience_level,
                )?;
                require_text("professionalInfo.workplace", &professional_info.workplace)?;
                require_text(
                    "professionalInfo.specialization",
                    &professional_info.specialization,
                )?;
                require_text(
                    "professionalInfo.licenseNumber",
                    &professional_info.license_number,
                )
            }
            RegistrationProfile::Admin => Ok(()),
        }
    }
}

/// `updatePatientPreferences` input.
///
/// `therapist_info`, when present, replaces the stored object wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesUpdate {
    #[serde(default)]
    pub therapist_info: Option<TherapistInfo>,
    #[serde(default)]
    pub tools_preferences: Option<ToolsPreferences>,
}

impl PreferencesUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.therapist_info {
            Some(info) => validate_therapist_ref(info),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl NewNote {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("content", &self.content)
    }

    pub fn into_note(self) -> Note {
        Note {
            id: Uuid::new_v4(),
            content: self.content,
            timestamp: self.timestamp.unwrap_or_else(now_epoch_ms),
        }
    }
}

/// Partial note update. Omitted fields keep their stored values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotePatch {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl NotePatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.content.as_deref() {
            Some(content) => require_text("content", content),
            None => Ok(()),
        }
    }

    pub fn apply_to(self, note: &mut Note) {
        if let Some(content) = self.content {
            note.content = content;
        }
        if let Some(timestamp) = self.timestamp {
            note.timestamp = timestamp;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewGuidedNote {
    pub content: String,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl NewGuidedNote {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("content", &self.content)
    }

    pub fn into_guided_note(self) -> GuidedNote {
        GuidedNote {
            id: Uuid::new_v4(),
            content: self.content,
            timestamp: self.timestamp.unwrap_or_else(now_epoch_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRecording {
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl NewRecording {
    pub fn into_recording(self) -> Recording {
        Recording {
            id: Uuid::new_v4(),
            metadata: self.metadata,
            timestamp: self.timestamp.unwrap_or_else(now_epoch_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub expo_notification_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub sent_at: Option<i64>,
}

impl NewNotification {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("expoNotificationId", &self.expo_notification_id)
    }

    pub fn into_notification(self) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            expo_notification_id: self.expo_notification_id,
            title: self.title,
            body: self.body,
            sent_at: self.sent_at.unwrap_or_else(now_epoch_ms),
            tapped: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBreathingSession {
    #[serde(default)]
    pub timestamp: Option<i64>,
    pub duration_sec: u32,
    pub pattern_type: String,
    #[serde(default)]
    pub completed: bool,
}

impl NewBreathingSession {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("patternType", &self.pattern_type)
    }

    pub fn into_session(self) -> BreathingSession {
        BreathingSession {
            id: Uuid::new_v4(),
            timestamp: self.timestamp.unwrap_or_else(now_epoch_ms),
            duration_sec: self.duration_sec,
            pattern_type: self.pattern_type,
            completed: self.completed,
        }
    }
}
