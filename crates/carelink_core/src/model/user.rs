//! Identity anchor shared by every typed profile.

use serde::{Deserialize, Serialize};

/// Role fixed at registration time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserType {
    Patient,
    Therapist,
    Admin,
}

impl UserType {
    /// Storage and wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Patient => "patient",
            Self::Therapist => "therapist",
            Self::Admin => "admin",
        }
    }

    /// Parses the storage representation.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "patient" => Some(Self::Patient),
            "therapist" => Some(Self::Therapist),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Registered identity. `user_type` never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub user_type: UserType,
}

impl User {
    pub fn new(user_id: impl Into<String>, user_type: UserType) -> Self {
        Self {
            user_id: user_id.into(),
            user_type,
        }
    }
}
