//! Registration and profile lookup service.
//!
//! # Responsibility
//! - Create a user and its typed profile as one atomic unit.
//! - Seed the chosen therapist's roster when a patient registers with one.
//! - Resolve a user id to its identity and profile.
//!
//! # Invariants
//! - `user_id` is unique across all user types.
//! - Registration never removes anyone from a roster; there is no prior
//!   assignment to undo.

use crate::model::patient::Patient;
use crate::model::request::{normalize_therapist_ref, RegisterUserRequest, RegistrationProfile};
use crate::model::therapist::{RosterEntry, Therapist};
use crate::model::user::{User, UserType};
use crate::repo::transaction::TransactionCoordinator;
use crate::service::error::{CareError, CareResult, ConflictKind};
use crate::service::relationship_service::attach_to_roster;
use log::info;
use serde::Serialize;

/// Typed profile attached to a user.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Profile {
    Patient(Patient),
    Therapist(Therapist),
}

/// `getUserProfile` result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub user: User,
    /// `None` for admins, or when the profile row is missing.
    pub profile: Option<Profile>,
}

/// Stateless registration service over an injected coordinator.
pub struct RegistrationService<C: TransactionCoordinator> {
    coordinator: C,
}

impl<C: TransactionCoordinator> RegistrationService<C> {
    pub fn new(coordinator: C) -> Self {
        Self { coordinator }
    }

    /// Creates the user, its profile and (for patients with a therapist)
    /// the roster entry in one transaction.
    ///
    /// # Errors
    /// - `Validation` when required fields are missing or malformed.
    /// - `Conflict(UserExists)` when `user_id` is already registered.
    /// - `NotFound(Therapist)` when the selected therapist does not exist.
    pub fn register_user(&self, request: RegisterUserRequest) -> CareResult<User> {
        request.validate()?;
        let user = User::new(request.user_id.clone(), request.user_type());

        self.coordinator
            .run_transaction("register_user", move |store| {
                if store.get_user(&user.user_id)?.is_some() {
                    return Err(CareError::Conflict(ConflictKind::UserExists(
                        user.user_id.clone(),
                    )));
                }
                store.insert_user(&user)?;

                match request.profile {
                    RegistrationProfile::Patient {
                        mut therapist_info,
                        tools_preferences,
                    } => {
                        let therapist_id = normalize_therapist_ref(
                            therapist_info.selected_therapist_id.as_deref(),
                        );
                        therapist_info.selected_therapist_id = therapist_id.clone();
                        let mut patient = Patient::new(
                            user.user_id.clone(),
                            request.personal_info,
                            therapist_info,
                            tools_preferences,
                        );
                        store.insert_patient(&mut patient)?;

                        if let Some(therapist_id) = therapist_id {
                            attach_to_roster(
                                store,
                                &therapist_id,
                                RosterEntry::new(patient.user_id.clone(), patient.full_name()),
                            )?;
                        }
                    }
                    RegistrationProfile::Therapist { professional_info } => {
                        let mut therapist = Therapist::new(
                            user.user_id.clone(),
                            request.personal_info,
                            professional_info,
                        );
                        store.insert_therapist(&mut therapist)?;
                    }
                    RegistrationProfile::Admin => {}
                }

                info!(
                    "event=register_user module=registration status=ok user_id={} user_type={}",
                    user.user_id,
                    user.user_type.as_str()
                );
                Ok(user)
            })
    }

    /// Returns the user and its typed profile, or `None` for unknown ids.
    pub fn get_user_profile(&self, user_id: &str) -> CareResult<Option<UserProfile>> {
        self.coordinator
            .run_transaction("get_user_profile", |store| {
                let Some(user) = store.get_user(user_id)? else {
                    return Ok(None);
                };
                let profile = match user.user_type {
                    UserType::Patient => store.get_patient(user_id)?.map(Profile::Patient),
                    UserType::Therapist => store.get_therapist(user_id)?.map(Profile::Therapist),
                    UserType::Admin => None,
                };
                Ok(Some(UserProfile { user, profile }))
            })
    }

    /// Every patient record, ordered by `user_id`.
    pub fn list_patients(&self) -> CareResult<Vec<Patient>> {
        self.coordinator
            .run_transaction("list_patients", |store| Ok(store.list_patients()?))
    }
}
