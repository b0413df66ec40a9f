//! Patient-owned sub-resources.
//!
//! # Responsibility
//! - Define items stored inside a patient document (notes, guided notes,
//!   recordings, notifications, breathing sessions).
//!
//! # Invariants
//! - `id` is generated once on append and never reused.
//! - Notifications are additionally addressed by `expo_notification_id`,
//!   assigned by the push provider.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Generated identifier for every patient sub-resource.
pub type EntryId = Uuid;

/// Free-form journal note. Mutable and deletable by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: EntryId,
    pub content: String,
    /// Unix epoch milliseconds.
    pub timestamp: i64,
}

/// Note written in response to a guided prompt flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuidedNote {
    pub id: EntryId,
    pub content: String,
    pub timestamp: i64,
}

/// Append-only audio recording reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recording {
    pub id: EntryId,
    /// Opaque client metadata (uri, duration, codec, ...).
    pub metadata: serde_json::Value,
    pub timestamp: i64,
}

/// Push notification delivered to the patient device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: EntryId,
    /// Provider-side id; the lookup key for tap updates.
    pub expo_notification_id: String,
    pub title: String,
    pub body: String,
    pub sent_at: i64,
    #[serde(default)]
    pub tapped: bool,
}

/// Completed or abandoned breathing exercise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreathingSession {
    pub id: EntryId,
    pub timestamp: i64,
    pub duration_sec: u32,
    pub pattern_type: String,
    pub completed: bool,
}

/// Current wall-clock time in Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
