//! Patient sub-resource service.
//!
//! # Responsibility
//! - Append, list, update and delete items in a patient's owned
//!   collections, one transaction per call.
//!
//! # Invariants
//! - Collections keep insertion order.
//! - A missing patient is `NotFound(Patient)`; an existing patient with an
//!   empty collection lists as empty.
//! - A failed lookup inside the patient leaves the document untouched.
//! - Log lines carry ids only, never note or notification text.

use crate::model::entries::{
    BreathingSession, EntryId, GuidedNote, Note, Notification, Recording,
};
use crate::model::patient::Patient;
use crate::model::request::{
    NewBreathingSession, NewGuidedNote, NewNote, NewNotification, NewRecording, NotePatch,
};
use crate::repo::transaction::TransactionCoordinator;
use crate::service::error::{CareError, CareResult, NotFoundKind};
use crate::service::load_patient;
use log::info;

/// Stateless sub-resource service over an injected coordinator.
pub struct SubresourceService<C: TransactionCoordinator> {
    coordinator: C,
}

impl<C: TransactionCoordinator> SubresourceService<C> {
    pub fn new(coordinator: C) -> Self {
        Self { coordinator }
    }

    /// Load, edit, save. `edit` failing aborts without writing.
    fn modify_patient<T>(
        &self,
        label: &'static str,
        user_id: &str,
        edit: impl FnOnce(&mut Patient) -> CareResult<T>,
    ) -> CareResult<T> {
        self.coordinator.run_transaction(label, |store| {
            let mut patient = load_patient(store, user_id)?;
            let value = edit(&mut patient)?;
            store.save_patient(&mut patient)?;
            Ok(value)
        })
    }

    fn read_patient<T>(
        &self,
        label: &'static str,
        user_id: &str,
        view: impl FnOnce(Patient) -> T,
    ) -> CareResult<T> {
        self.coordinator.run_transaction(label, |store| {
            let patient = load_patient(store, user_id)?;
            Ok(view(patient))
        })
    }

    pub fn append_note(&self, user_id: &str, new_note: NewNote) -> CareResult<Note> {
        new_note.validate()?;
        let note = new_note.into_note();
        let stored = self.modify_patient("append_note", user_id, |patient| {
            patient.notes.push(note.clone());
            Ok(note)
        })?;
        info!(
            "event=append_note module=subresource status=ok user_id={} note_id={}",
            user_id, stored.id
        );
        Ok(stored)
    }

    pub fn list_notes(&self, user_id: &str) -> CareResult<Vec<Note>> {
        self.read_patient("list_notes", user_id, |patient| patient.notes)
    }

    /// Applies `patch` to one note; omitted fields keep stored values.
    ///
    /// # Errors
    /// - `NotFound(Patient)` or `NotFound(Note)`.
    pub fn update_note(
        &self,
        user_id: &str,
        note_id: EntryId,
        patch: NotePatch,
    ) -> CareResult<Note> {
        patch.validate()?;
        let updated = self.modify_patient("update_note", user_id, |patient| {
            let note = patient
                .note_mut(note_id)
                .ok_or_else(|| note_not_found(user_id, note_id))?;
            patch.apply_to(note);
            Ok(note.clone())
        })?;
        info!(
            "event=update_note module=subresource status=ok user_id={} note_id={}",
            user_id, note_id
        );
        Ok(updated)
    }

    /// Removes one note and returns it.
    pub fn delete_note(&self, user_id: &str, note_id: EntryId) -> CareResult<Note> {
        let removed = self.modify_patient("delete_note", user_id, |patient| {
            patient
                .remove_note(note_id)
                .ok_or_else(|| note_not_found(user_id, note_id))
        })?;
        info!(
            "event=delete_note module=subresource status=ok user_id={} note_id={}",
            user_id, note_id
        );
        Ok(removed)
    }

    pub fn append_guided_note(
        &self,
        user_id: &str,
        new_note: NewGuidedNote,
    ) -> CareResult<GuidedNote> {
        new_note.validate()?;
        let note = new_note.into_guided_note();
        self.modify_patient("append_guided_note", user_id, |patient| {
            patient.guided_notes.push(note.clone());
            Ok(note)
        })
    }

    pub fn list_guided_notes(&self, user_id: &str) -> CareResult<Vec<GuidedNote>> {
        self.read_patient("list_guided_notes", user_id, |patient| {
            patient.guided_notes
        })
    }

    pub fn append_recording(
        &self,
        user_id: &str,
        new_recording: NewRecording,
    ) -> CareResult<Recording> {
        let recording = new_recording.into_recording();
        self.modify_patient("append_recording", user_id, |patient| {
            patient.recordings.push(recording.clone());
            Ok(recording)
        })
    }

    pub fn list_recordings(&self, user_id: &str) -> CareResult<Vec<Recording>> {
        self.read_patient("list_recordings", user_id, |patient| patient.recordings)
    }

    pub fn append_notification(
        &self,
        user_id: &str,
        new_notification: NewNotification,
    ) -> CareResult<Notification> {
        new_notification.validate()?;
        let notification = new_notification.into_notification();
        self.modify_patient("append_notification", user_id, |patient| {
            patient.notifications.push(notification.clone());
            Ok(notification)
        })
    }

    pub fn list_notifications(&self, user_id: &str) -> CareResult<Vec<Notification>> {
        self.read_patient("list_notifications", user_id, |patient| {
            patient.notifications
        })
    }

    /// Sets `tapped` on the notification with the given provider id.
    ///
    /// # Errors
    /// - `NotFound(Patient)`, or `NotFound(Notification)` naming the
    ///   provider id.
    pub fn set_notification_tapped(
        &self,
        user_id: &str,
        expo_notification_id: &str,
        tapped: bool,
    ) -> CareResult<()> {
        self.modify_patient("set_notification_tapped", user_id, |patient| {
            let notification = patient
                .notification_by_expo_id_mut(expo_notification_id)
                .ok_or_else(|| {
                    CareError::NotFound(NotFoundKind::Notification {
                        user_id: user_id.to_string(),
                        expo_notification_id: expo_notification_id.to_string(),
                    })
                })?;
            notification.tapped = tapped;
            Ok(())
        })?;
        info!(
            "event=notification_tapped module=subresource status=ok user_id={} expo_notification_id={} tapped={}",
            user_id, expo_notification_id, tapped
        );
        Ok(())
    }

    pub fn append_breathing_session(
        &self,
        user_id: &str,
        new_session: NewBreathingSession,
    ) -> CareResult<BreathingSession> {
        new_session.validate()?;
        let session = new_session.into_session();
        self.modify_patient("append_breathing_session", user_id, |patient| {
            patient.breathing_sessions.push(session.clone());
            Ok(session)
        })
    }

    pub fn list_breathing_sessions(&self, user_id: &str) -> CareResult<Vec<BreathingSession>> {
        self.read_patient("list_breathing_sessions", user_id, |patient| {
            patient.breathing_sessions
        })
    }
}

fn note_not_found(user_id: &str, note_id: EntryId) -> CareError {
    CareError::NotFound(NotFoundKind::Note {
        user_id: user_id.to_string(),
        note_id,
    })
}
