//! Patient/therapist relationship service.
//!
//! # Responsibility
//! - Assign, reassign and clear a patient's therapist.
//! - Keep the patient pointer and therapist roster in step inside one
//!   transaction.
//! - Report drift between the two sides.
//!
//! # Invariants
//! - After commit, `patient.selectedTherapistId == t` iff `t.patients`
//!   holds the patient.
//! - A missing *previous* therapist is logged and skipped; a missing *new*
//!   therapist aborts the transaction.
//! - Roster names are snapshots taken at assignment time.

use crate::model::patient::Patient;
use crate::model::request::{normalize_therapist_ref, validate_user_id, PreferencesUpdate};
use crate::model::therapist::{RosterChange, RosterEntry, Therapist};
use crate::repo::entity_store::EntityStore;
use crate::repo::transaction::TransactionCoordinator;
use crate::service::error::{CareError, CareResult, NotFoundKind};
use crate::service::load_patient;
use log::{info, warn};
use std::collections::BTreeMap;

/// One breach of the bidirectional patient/therapist invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsistencyViolation {
    /// Patient points at a therapist that does not exist.
    DanglingPointer {
        patient_id: String,
        therapist_id: String,
    },
    /// Patient points at a therapist whose roster lacks the patient.
    MissingRosterEntry {
        patient_id: String,
        therapist_id: String,
    },
    /// Roster lists a patient that points elsewhere (or nowhere).
    OrphanRosterEntry {
        therapist_id: String,
        patient_id: String,
    },
    /// Roster lists a patient id with no patient record.
    UnknownPatient {
        therapist_id: String,
        patient_id: String,
    },
    /// Roster lists the same patient more than once.
    DuplicateRosterEntry {
        therapist_id: String,
        patient_id: String,
    },
}

/// Stateless relationship service over an injected coordinator.
pub struct RelationshipService<C: TransactionCoordinator> {
    coordinator: C,
}

impl<C: TransactionCoordinator> RelationshipService<C> {
    pub fn new(coordinator: C) -> Self {
        Self { coordinator }
    }

    /// Points `patient_id` at `therapist_id` (or at nobody) and reconciles
    /// both rosters atomically.
    ///
    /// Assigning the current therapist again is a successful no-op.
    ///
    /// # Errors
    /// - `Validation` for a malformed therapist reference.
    /// - `NotFound(Patient)` when the patient does not exist.
    /// - `NotFound(Therapist)` when the new therapist does not exist.
    /// - `Conflict(WriteConflict)` when a concurrent write wins the race.
    pub fn assign_therapist(
        &self,
        patient_id: &str,
        therapist_id: Option<&str>,
    ) -> CareResult<Patient> {
        let new_id = normalize_therapist_ref(therapist_id);
        if let Some(id) = new_id.as_deref() {
            validate_user_id("therapistId", id)?;
        }
        self.coordinator
            .run_transaction("assign_therapist", |store| {
                let mut patient = load_patient(store, patient_id)?;
                let old_id = normalize_therapist_ref(patient.therapist_id());
                if old_id == new_id {
                    info!(
                        "event=assign_therapist module=relationship status=noop patient_id={}",
                        patient_id
                    );
                    return Ok(patient);
                }

                reconcile_roster(store, &patient, old_id.as_deref(), new_id.as_deref())?;
                patient.therapist_info.selected_therapist_id = new_id.clone();
                store.save_patient(&mut patient)?;
                info!(
                    "event=assign_therapist module=relationship status=ok patient_id={} from={} to={}",
                    patient_id,
                    old_id.as_deref().unwrap_or("-"),
                    new_id.as_deref().unwrap_or("-")
                );
                Ok(patient)
            })
    }

    /// Replaces therapist info and/or tool preferences.
    ///
    /// A supplied `therapist_info` overwrites the stored object wholesale;
    /// when its therapist differs from the current one, rosters are
    /// reconciled first.
    ///
    /// # Errors
    /// - `Validation` for a malformed therapist reference.
    /// - `NotFound(Patient)` / `NotFound(Therapist)` as for
    ///   [`Self::assign_therapist`].
    pub fn update_patient_preferences(
        &self,
        patient_id: &str,
        update: PreferencesUpdate,
    ) -> CareResult<Patient> {
        update.validate()?;
        self.coordinator
            .run_transaction("update_patient_preferences", move |store| {
                let mut patient = load_patient(store, patient_id)?;

                if let Some(mut therapist_info) = update.therapist_info {
                    let old_id = normalize_therapist_ref(patient.therapist_id());
                    let new_id =
                        normalize_therapist_ref(therapist_info.selected_therapist_id.as_deref());
                    if old_id != new_id {
                        reconcile_roster(store, &patient, old_id.as_deref(), new_id.as_deref())?;
                    }
                    therapist_info.selected_therapist_id = new_id;
                    patient.therapist_info = therapist_info;
                }
                if let Some(tools_preferences) = update.tools_preferences {
                    patient.tools_preferences = tools_preferences;
                }

                store.save_patient(&mut patient)?;
                info!(
                    "event=update_preferences module=relationship status=ok patient_id={}",
                    patient_id
                );
                Ok(patient)
            })
    }

    /// Patients currently listed on a therapist's roster.
    pub fn therapist_roster(&self, therapist_id: &str) -> CareResult<Vec<RosterEntry>> {
        self.coordinator
            .run_transaction("therapist_roster", |store| {
                store
                    .get_therapist(therapist_id)?
                    .map(|therapist| therapist.patients.entries().to_vec())
                    .ok_or_else(|| {
                        CareError::NotFound(NotFoundKind::Therapist(therapist_id.to_string()))
                    })
            })
    }

    /// Scans every patient and therapist and reports invariant breaches.
    pub fn audit_relationships(&self) -> CareResult<Vec<ConsistencyViolation>> {
        let violations: Vec<ConsistencyViolation> = self
            .coordinator
            .run_transaction("audit_relationships", |store| {
                let patients = store.list_patients()?;
                let therapists = store.list_therapists()?;
                Ok::<_, CareError>(find_violations(&patients, &therapists))
            })?;
        if violations.is_empty() {
            info!("event=audit_relationships module=relationship status=ok violations=0");
        } else {
            warn!(
                "event=audit_relationships module=relationship status=drift violations={}",
                violations.len()
            );
        }
        Ok(violations)
    }
}

/// Moves `patient` from the `old` roster to the `new` one.
fn reconcile_roster(
    store: &dyn EntityStore,
    patient: &Patient,
    old: Option<&str>,
    new: Option<&str>,
) -> CareResult<()> {
    if let Some(old_id) = old {
        detach_from_roster(store, old_id, &patient.user_id)?;
    }
    if let Some(new_id) = new {
        attach_to_roster(
            store,
            new_id,
            RosterEntry::new(patient.user_id.clone(), patient.full_name()),
        )?;
    }
    Ok(())
}

/// Unions `entry` into a therapist's roster.
///
/// # Errors
/// - `NotFound(Therapist)` when the therapist does not exist.
pub(crate) fn attach_to_roster(
    store: &dyn EntityStore,
    therapist_id: &str,
    entry: RosterEntry,
) -> CareResult<()> {
    let mut therapist = store
        .get_therapist(therapist_id)?
        .ok_or_else(|| CareError::NotFound(NotFoundKind::Therapist(therapist_id.to_string())))?;
    if therapist.patients.union(entry) != RosterChange::Unchanged {
        store.save_therapist(&mut therapist)?;
    }
    Ok(())
}

fn detach_from_roster(
    store: &dyn EntityStore,
    therapist_id: &str,
    patient_id: &str,
) -> CareResult<()> {
    let Some(mut therapist) = store.get_therapist(therapist_id)? else {
        warn!(
            "event=roster_detach module=relationship status=skipped reason=therapist_not_found therapist_id={} patient_id={}",
            therapist_id, patient_id
        );
        return Ok(());
    };
    if therapist.patients.difference(patient_id) > 0 {
        store.save_therapist(&mut therapist)?;
    }
    Ok(())
}

fn find_violations(
    patients: &[Patient],
    therapists: &[Therapist],
) -> Vec<ConsistencyViolation> {
    let patients_by_id: BTreeMap<&str, &Patient> = patients
        .iter()
        .map(|patient| (patient.user_id.as_str(), patient))
        .collect();
    let therapists_by_id: BTreeMap<&str, &Therapist> = therapists
        .iter()
        .map(|therapist| (therapist.user_id.as_str(), therapist))
        .collect();
    let mut violations = Vec::new();

    for patient in patients {
        let Some(therapist_id) = normalize_therapist_ref(patient.therapist_id()) else {
            continue;
        };
        match therapists_by_id.get(therapist_id.as_str()) {
            None => violations.push(ConsistencyViolation::DanglingPointer {
                patient_id: patient.user_id.clone(),
                therapist_id,
            }),
            Some(therapist) if !therapist.patients.contains(&patient.user_id) => {
                violations.push(ConsistencyViolation::MissingRosterEntry {
                    patient_id: patient.user_id.clone(),
                    therapist_id,
                });
            }
            Some(_) => {}
        }
    }

    for therapist in therapists {
        let mut seen = BTreeMap::new();
        for entry in therapist.patients.entries() {
            let count = seen.entry(entry.user_id.as_str()).or_insert(0_usize);
            *count += 1;
            if *count == 2 {
                violations.push(ConsistencyViolation::DuplicateRosterEntry {
                    therapist_id: therapist.user_id.clone(),
                    patient_id: entry.user_id.clone(),
                });
            }
            if *count > 1 {
                continue;
            }

            match patients_by_id.get(entry.user_id.as_str()) {
                None => violations.push(ConsistencyViolation::UnknownPatient {
                    therapist_id: therapist.user_id.clone(),
                    patient_id: entry.user_id.clone(),
                }),
                Some(patient)
                    if normalize_therapist_ref(patient.therapist_id()).as_deref()
                        != Some(therapist.user_id.as_str()) =>
                {
                    violations.push(ConsistencyViolation::OrphanRosterEntry {
                        therapist_id: therapist.user_id.clone(),
                        patient_id: entry.user_id.clone(),
                    });
                }
                Some(_) => {}
            }
        }
    }

    violations
}

#[cfg(test)]
mod tests {
    use super::{find_violations, ConsistencyViolation};
    use crate::model::patient::{Patient, PersonalInfo, TherapistInfo, ToolsPreferences};
    use crate::model::therapist::{ProfessionalInfo, Roster, RosterEntry, Therapist};

    fn patient(id: &str, therapist: Option<&str>) -> Patient {
        Patient::new(
            id,
            PersonalInfo::new("First", "Last"),
            TherapistInfo {
                selected_therapist_id: therapist.map(str::to_string),
                ..TherapistInfo::default()
            },
            ToolsPreferences::default(),
        )
    }

    fn therapist(id: &str, roster: &[&str]) -> Therapist {
        let mut therapist = Therapist::new(
            id,
            PersonalInfo::new("Doc", "Tor"),
            ProfessionalInfo::default(),
        );
        therapist.patients = Roster::from(
            roster
                .iter()
                .map(|patient_id| RosterEntry::new(*patient_id, "First Last"))
                .collect::<Vec<_>>(),
        );
        therapist
    }

    #[test]
    fn consistent_pairs_report_nothing() {
        let patients = vec![patient("p1", Some("t1")), patient("p2", None)];
        let therapists = vec![therapist("t1", &["p1"])];
        assert!(find_violations(&patients, &therapists).is_empty());
    }

    #[test]
    fn each_kind_of_drift_is_reported() {
        let patients = vec![
            patient("p1", Some("t-missing")),
            patient("p2", Some("t1")),
            patient("p3", None),
        ];
        let therapists = vec![therapist("t1", &["p3", "p9", "p3"])];

        let violations = find_violations(&patients, &therapists);
        assert_eq!(
            violations,
            vec![
                ConsistencyViolation::DanglingPointer {
                    patient_id: "p1".to_string(),
                    therapist_id: "t-missing".to_string(),
                },
                ConsistencyViolation::MissingRosterEntry {
                    patient_id: "p2".to_string(),
                    therapist_id: "t1".to_string(),
                },
                ConsistencyViolation::OrphanRosterEntry {
                    therapist_id: "t1".to_string(),
                    patient_id: "p3".to_string(),
                },
                ConsistencyViolation::UnknownPatient {
                    therapist_id: "t1".to_string(),
                    patient_id: "p9".to_string(),
                },
                ConsistencyViolation::DuplicateRosterEntry {
                    therapist_id: "t1".to_string(),
                    patient_id: "p3".to_string(),
                },
            ]
        );
    }
}
