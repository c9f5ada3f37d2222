use std::collections::HashSet;

use super::common::*;
use crate::compliance::catalog::requirements_for_services;
use crate::domain::{RequirementStatus, Role};
use crate::integrations::jobs::{Job, WorkerRegistrationJob};
use crate::marketplace::{
    LoginRequest, MarketplaceError, MarketplaceRepository, ParticipantDetails, ProgressUpdate,
    WorkerProfileUpdate,
};

#[test]
fn worker_registration_creates_one_pending_row_per_catalog_entry() {
    let harness = harness();
    let registered = harness
        .service
        .register_worker(worker_registration("Mei@Example.test ", &["nursing"]))
        .expect("worker registers");

    assert_eq!(registered.user.email, "mei@example.test");
    assert_eq!(registered.user.role, Role::Worker);
    assert!(!registered.profile.is_published);

    let rows = harness
        .repository
        .requirements(registered.profile.id)
        .expect("requirements");
    let expected = requirements_for_services(&["nursing".to_string()]);
    assert_eq!(rows.len(), 14);
    assert_eq!(rows.len(), expected.len());
    assert_eq!(registered.requirements.len(), rows.len());
    assert!(rows.iter().all(|row| row.status == RequirementStatus::Pending));

    let types: HashSet<&str> = rows.iter().map(|row| row.requirement_type.as_str()).collect();
    assert_eq!(types.len(), rows.len());
    assert!(types.contains("nursing:ahpra-registration"));
    assert!(types.contains("medication-awareness"));
    assert!(!types.contains("manual-handling"));
}

#[test]
fn worker_registration_queues_post_processing() {
    let harness = harness();
    let registered = harness
        .service
        .register_worker(worker_registration("mei@example.test", &["transport"]))
        .expect("worker registers");

    assert_eq!(
        harness.jobs.jobs(),
        vec![Job::WorkerRegistration(WorkerRegistrationJob {
            worker_id: registered.profile.id,
            user_id: registered.user.id,
        })]
    );
}

#[test]
fn a_declined_job_does_not_fail_registration() {
    let harness = harness_with_queue(RecordingQueue::declining());
    let registered = harness
        .service
        .register_worker(worker_registration("mei@example.test", &["transport"]));
    assert!(registered.is_ok());
    assert!(harness.jobs.jobs().is_empty());
}

#[test]
fn duplicate_emails_are_rejected_case_insensitively() {
    let harness = harness();
    nursing_worker(&harness);

    let err = harness
        .service
        .register_client(client_registration("MEI@example.test"))
        .expect_err("email is taken");
    assert!(matches!(err, MarketplaceError::EmailTaken));
    assert_eq!(err.status_code().as_u16(), 409);
}

#[test]
fn invalid_registrations_report_every_field() {
    let harness = harness();
    let mut registration = worker_registration("not-an-email", &["underwater-basket-weaving"]);
    registration.password = "short".to_string();
    registration.first_name = "  ".to_string();

    match harness.service.register_worker(registration) {
        Err(MarketplaceError::Validation(errors)) => {
            assert!(errors.get("email").is_some());
            assert!(errors.get("password").is_some());
            assert!(errors.get("firstName").is_some());
            assert!(errors.get("services").is_some());
            assert!(errors.get("lastName").is_none());
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
    assert!(harness.jobs.jobs().is_empty());
}

#[test]
fn client_participant_defaults_to_the_client() {
    let harness = harness();
    let registered = harness
        .service
        .register_client(client_registration("sam@example.test"))
        .expect("client registers");

    assert_eq!(registered.profile.relationship, "self");
    assert_eq!(registered.participants.len(), 1);
    assert_eq!(registered.participants[0].first_name, "Sam");

    let overview = harness
        .service
        .client_profile(&registered.session)
        .expect("client profile");
    assert_eq!(overview.participants, registered.participants);
}

#[test]
fn client_can_register_on_behalf_of_a_participant() {
    let harness = harness();
    let mut registration = client_registration("sam@example.test");
    registration.relationship = Some("parent".to_string());
    registration.participant = Some(ParticipantDetails {
        first_name: " Noa ".to_string(),
        last_name: "Okafor".to_string(),
        date_of_birth: None,
        support_needs: vec!["community access".to_string()],
    });

    let registered = harness.service.register_client(registration).expect("client registers");
    assert_eq!(registered.profile.relationship, "parent");
    assert_eq!(registered.participants[0].first_name, "Noa");
    assert_eq!(registered.participants[0].support_needs, vec!["community access".to_string()]);
}

#[test]
fn login_and_logout_manage_sessions() {
    let harness = harness();
    nursing_worker(&harness);

    let wrong = harness.service.login(LoginRequest {
        email: "mei@example.test".to_string(),
        password: "not the password".to_string(),
    });
    assert!(matches!(wrong, Err(MarketplaceError::InvalidCredentials)));

    let unknown = harness.service.login(LoginRequest {
        email: "nobody@example.test".to_string(),
        password: WORKER_PASSWORD.to_string(),
    });
    assert!(matches!(unknown, Err(MarketplaceError::InvalidCredentials)));

    let signed_in = harness
        .service
        .login(LoginRequest {
            email: " MEI@example.test".to_string(),
            password: WORKER_PASSWORD.to_string(),
        })
        .expect("worker signs in");
    let token = signed_in.session.token.clone();
    assert!(harness.service.authenticate(Some(&token)).is_ok());

    assert!(harness.service.logout(&token));
    assert!(matches!(
        harness.service.authenticate(Some(&token)),
        Err(MarketplaceError::Unauthenticated)
    ));
}

#[test]
fn authorization_distinguishes_missing_sessions_from_wrong_roles() {
    let harness = harness();
    let worker = nursing_worker(&harness);

    assert!(matches!(
        harness.service.authorize(None, Role::Worker),
        Err(MarketplaceError::Unauthenticated)
    ));
    assert!(matches!(
        harness.service.authorize(Some("made-up"), Role::Worker),
        Err(MarketplaceError::Unauthenticated)
    ));
    let forbidden = harness
        .service
        .authorize(Some(&worker.token), Role::Admin)
        .expect_err("workers are not admins");
    assert!(matches!(forbidden, MarketplaceError::Forbidden(Role::Admin)));
    assert_eq!(forbidden.status_code().as_u16(), 403);
    assert!(harness.service.authorize(Some(&worker.token), Role::Worker).is_ok());
}

#[test]
fn admin_bootstrap_runs_once() {
    let harness = harness();
    let created = harness
        .service
        .bootstrap_admin(ADMIN_EMAIL, ADMIN_PASSWORD)
        .expect("bootstrap");
    assert_eq!(created.map(|user| user.role), Some(Role::Admin));

    let again = harness
        .service
        .bootstrap_admin(ADMIN_EMAIL, "another password")
        .expect("bootstrap");
    assert!(again.is_none());
    assert!(harness
        .service
        .login(LoginRequest {
            email: ADMIN_EMAIL.to_string(),
            password: ADMIN_PASSWORD.to_string(),
        })
        .is_ok());
}

#[test]
fn adding_services_adds_their_requirements() {
    let harness = harness();
    let worker = nursing_worker(&harness);
    let before = harness.rows(&worker);

    let profile = harness
        .service
        .update_worker_profile(
            &worker,
            WorkerProfileUpdate {
                bio: Some("Registered nurse, 12 years".to_string()),
                services: Some(vec!["nursing".to_string(), "Transport".to_string()]),
                ..WorkerProfileUpdate::default()
            },
        )
        .expect("profile updates");
    assert_eq!(profile.services, vec!["nursing".to_string(), "transport".to_string()]);
    assert_eq!(profile.bio.as_deref(), Some("Registered nurse, 12 years"));

    let after = harness.rows(&worker);
    assert_eq!(after.len(), before.len() + 2);
    let added: Vec<&str> = after
        .iter()
        .filter(|row| !before.iter().any(|old| old.id == row.id))
        .map(|row| row.requirement_type.as_str())
        .collect();
    assert_eq!(added, vec!["comprehensive-vehicle", "vehicle-registration"]);
}

#[test]
fn profile_updates_validate_services() {
    let harness = harness();
    let worker = nursing_worker(&harness);
    let result = harness.service.update_worker_profile(
        &worker,
        WorkerProfileUpdate {
            services: Some(Vec::new()),
            ..WorkerProfileUpdate::default()
        },
    );
    assert!(matches!(result, Err(MarketplaceError::Validation(_))));
}

#[test]
fn setup_progress_marks_known_steps() {
    let harness = harness();
    let worker = nursing_worker(&harness);

    let steps = harness.service.setup_steps(&worker).expect("steps");
    assert_eq!(steps.first().map(|step| step.slug.as_str()), Some("personal-details"));
    assert!(steps.iter().all(|step| !step.completed));

    let steps = harness
        .service
        .update_setup_progress(
            &worker,
            ProgressUpdate {
                slug: "personal-details".to_string(),
                completed: true,
            },
        )
        .expect("progress saved");
    let personal = steps
        .iter()
        .find(|step| step.slug == "personal-details")
        .expect("personal details step");
    assert!(personal.completed);

    let unknown = harness.service.update_setup_progress(
        &worker,
        ProgressUpdate {
            slug: "skydiving-licence".to_string(),
            completed: true,
        },
    );
    assert!(matches!(unknown, Err(MarketplaceError::UnknownStep(_))));
}
