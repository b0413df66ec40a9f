use carelink_core::{
    CareError, NewBreathingSession, NewGuidedNote, NewNote, NewNotification, NewRecording,
    NotFoundKind, NotePatch, PersonalInfo, ProfessionalInfo, RegisterUserRequest,
    RegistrationProfile, RegistrationService, SqliteCoordinator, SubresourceService,
    TherapistInfo, ToolsPreferences, ValidationError,
};
use serde_json::json;
use uuid::Uuid;

fn coordinator_with_patient(user_id: &str) -> SqliteCoordinator {
    let coordinator = SqliteCoordinator::open_in_memory().unwrap();
    RegistrationService::new(&coordinator)
        .register_user(RegisterUserRequest {
            user_id: user_id.to_string(),
            personal_info: PersonalInfo::new("Ada", "Lovelace"),
            profile: RegistrationProfile::Patient {
                therapist_info: TherapistInfo::default(),
                tools_preferences: ToolsPreferences::default(),
            },
        })
        .unwrap();
    coordinator
}

fn new_note(content: &str, timestamp: i64) -> NewNote {
    NewNote {
        content: content.to_string(),
        timestamp: Some(timestamp),
    }
}

fn new_notification(expo_id: &str) -> NewNotification {
    NewNotification {
        expo_notification_id: expo_id.to_string(),
        title: "Check in".to_string(),
        body: "How are you feeling?".to_string(),
        sent_at: Some(1_700_000_000_000),
    }
}

#[test]
fn notes_are_listed_in_insertion_order() {
    let coordinator = coordinator_with_patient("p1");
    let service = SubresourceService::new(&coordinator);

    let first = service.append_note("p1", new_note("first", 30)).unwrap();
    let second = service.append_note("p1", new_note("second", 10)).unwrap();
    let third = service.append_note("p1", new_note("third", 20)).unwrap();

    let notes = service.list_notes("p1").unwrap();
    assert_eq!(notes, vec![first, second, third]);
}

#[test]
fn deleting_one_note_keeps_the_rest_in_order() {
    let coordinator = coordinator_with_patient("p1");
    let service = SubresourceService::new(&coordinator);
    let notes: Vec<_> = (0..4)
        .map(|index| {
            service
                .append_note("p1", new_note(&format!("note {index}"), index))
                .unwrap()
        })
        .collect();

    let removed = service.delete_note("p1", notes[1].id).unwrap();

    assert_eq!(removed, notes[1]);
    let remaining = service.list_notes("p1").unwrap();
    assert_eq!(remaining, vec![notes[0].clone(), notes[2].clone(), notes[3].clone()]);
}

#[test]
fn note_ids_are_unique() {
    let coordinator = coordinator_with_patient("p1");
    let service = SubresourceService::new(&coordinator);

    let a = service.append_note("p1", new_note("same", 1)).unwrap();
    let b = service.append_note("p1", new_note("same", 1)).unwrap();

    assert_ne!(a.id, b.id);
}

#[test]
fn note_without_timestamp_gets_current_time() {
    let coordinator = coordinator_with_patient("p1");
    let service = SubresourceService::new(&coordinator);

    let note = service
        .append_note(
            "p1",
            NewNote {
                content: "now".to_string(),
                timestamp: None,
            },
        )
        .unwrap();

    assert!(note.timestamp > 1_600_000_000_000);
}

#[test]
fn patch_with_content_only_keeps_timestamp() {
    let coordinator = coordinator_with_patient("p1");
    let service = SubresourceService::new(&coordinator);
    let note = service.append_note("p1", new_note("draft", 42)).unwrap();

    let updated = service
        .update_note(
            "p1",
            note.id,
            NotePatch {
                content: Some("final".to_string()),
                timestamp: None,
            },
        )
        .unwrap();

    assert_eq!(updated.id, note.id);
    assert_eq!(updated.content, "final");
    assert_eq!(updated.timestamp, 42);
    assert_eq!(service.list_notes("p1").unwrap(), vec![updated]);
}

#[test]
fn missing_note_is_reported_with_its_id() {
    let coordinator = coordinator_with_patient("p1");
    let service = SubresourceService::new(&coordinator);
    service.append_note("p1", new_note("kept", 1)).unwrap();
    let unknown = Uuid::new_v4();

    let err = service
        .update_note("p1", unknown, NotePatch::default())
        .unwrap_err();
    assert!(matches!(
        err,
        CareError::NotFound(NotFoundKind::Note { ref user_id, note_id })
            if user_id == "p1" && note_id == unknown
    ));

    let err = service.delete_note("p1", unknown).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(service.list_notes("p1").unwrap().len(), 1);
}

#[test]
fn blank_note_content_is_rejected() {
    let coordinator = coordinator_with_patient("p1");
    let service = SubresourceService::new(&coordinator);

    let err = service.append_note("p1", new_note("   ", 1)).unwrap_err();
    assert!(matches!(
        err,
        CareError::Validation(ValidationError::BlankField("content"))
    ));
    assert!(service.list_notes("p1").unwrap().is_empty());
}

#[test]
fn unknown_patient_differs_from_empty_collection() {
    let coordinator = coordinator_with_patient("p1");
    let service = SubresourceService::new(&coordinator);

    assert!(service.list_notes("p1").unwrap().is_empty());
    assert!(service.list_notifications("p1").unwrap().is_empty());

    let err = service.list_notes("ghost").unwrap_err();
    assert!(matches!(
        err,
        CareError::NotFound(NotFoundKind::Patient(ref id)) if id == "ghost"
    ));
    let err = service.append_note("ghost", new_note("x", 1)).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn therapist_id_is_not_a_patient() {
    let coordinator = coordinator_with_patient("p1");
    RegistrationService::new(&coordinator)
        .register_user(RegisterUserRequest {
            user_id: "t1".to_string(),
            personal_info: PersonalInfo::new("Grace", "Hopper"),
            profile: RegistrationProfile::Therapist {
                professional_info: ProfessionalInfo {
                    education_level: "PhD".to_string(),
                    experience_level: "Senior".to_string(),
                    workplace: "Clinic".to_string(),
                    specialization: "CBT".to_string(),
                    license_number: "L-1".to_string(),
                },
            },
        })
        .unwrap();
    let service = SubresourceService::new(&coordinator);

    let err = service.list_notes("t1").unwrap_err();
    assert!(matches!(err, CareError::NotFound(NotFoundKind::Patient(_))));
}

#[test]
fn notification_tap_flag_is_set_by_provider_id() {
    let coordinator = coordinator_with_patient("p1");
    let service = SubresourceService::new(&coordinator);
    let stored = service
        .append_notification("p1", new_notification("expo-1"))
        .unwrap();
    service
        .append_notification("p1", new_notification("expo-2"))
        .unwrap();
    assert!(!stored.tapped);

    service.set_notification_tapped("p1", "expo-1", true).unwrap();

    let notifications = service.list_notifications("p1").unwrap();
    assert!(notifications[0].tapped);
    assert!(!notifications[1].tapped);
    assert_eq!(notifications[0].title, "Check in");

    service.set_notification_tapped("p1", "expo-1", false).unwrap();
    assert!(!service.list_notifications("p1").unwrap()[0].tapped);
}

#[test]
fn unknown_notification_leaves_document_unchanged() {
    let coordinator = coordinator_with_patient("p1");
    let service = SubresourceService::new(&coordinator);
    let registration = RegistrationService::new(&coordinator);
    service
        .append_notification("p1", new_notification("expo-1"))
        .unwrap();
    let before = registration.get_user_profile("p1").unwrap();

    let err = service
        .set_notification_tapped("p1", "expo-404", true)
        .unwrap_err();

    assert!(matches!(
        err,
        CareError::NotFound(NotFoundKind::Notification { ref expo_notification_id, .. })
            if expo_notification_id == "expo-404"
    ));
    assert_eq!(registration.get_user_profile("p1").unwrap(), before);
}

#[test]
fn guided_notes_recordings_and_sessions_append_and_list() {
    let coordinator = coordinator_with_patient("p1");
    let service = SubresourceService::new(&coordinator);

    let guided = service
        .append_guided_note(
            "p1",
            NewGuidedNote {
                content: "Grounding exercise".to_string(),
                timestamp: Some(5),
            },
        )
        .unwrap();
    let recording = service
        .append_recording(
            "p1",
            NewRecording {
                metadata: json!({ "durationMs": 12000, "uri": "file://a.m4a" }),
                timestamp: Some(6),
            },
        )
        .unwrap();
    let session = service
        .append_breathing_session(
            "p1",
            NewBreathingSession {
                timestamp: Some(7),
                duration_sec: 240,
                pattern_type: "box".to_string(),
                completed: true,
            },
        )
        .unwrap();

    assert_eq!(service.list_guided_notes("p1").unwrap(), vec![guided]);
    assert_eq!(service.list_recordings("p1").unwrap(), vec![recording]);
    assert_eq!(service.list_breathing_sessions("p1").unwrap(), vec![session]);
    assert!(service.list_notes("p1").unwrap().is_empty());
}

#[test]
fn breathing_session_requires_pattern_type() {
    let coordinator = coordinator_with_patient("p1");
    let service = SubresourceService::new(&coordinator);

    let err = service
        .append_breathing_session(
            "p1",
            NewBreathingSession {
                timestamp: None,
                duration_sec: 60,
                pattern_type: String::new(),
                completed: false,
            },
        )
        .unwrap_err();
    assert!(matches!(
        err,
        CareError::Validation(ValidationError::BlankField("patternType"))
    ));
}
