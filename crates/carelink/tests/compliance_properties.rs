//! Property checks for the pure compliance rules: bucket assignment, wizard generation, and
//! the review state machine.

use std::collections::HashSet;

use chrono::Utc;
use proptest::prelude::*;

use carelink::compliance::catalog::{self, requirements_for_services};
use carelink::compliance::classifier::{
    classify, ComplianceBucket, CONTRACT_TYPES, ESSENTIAL_CHECKS, INSURANCE_TYPES,
    TRAINING_MODULES,
};
use carelink::compliance::steps::generate_steps;
use carelink::compliance::transitions::{self, next_status, ReviewAction};
use carelink::domain::{DocumentCategory, RequirementStatus, RequirementType, WorkerId};

fn category() -> impl Strategy<Value = Option<DocumentCategory>> {
    prop_oneof![
        Just(None),
        Just(Some(DocumentCategory::Primary)),
        Just(Some(DocumentCategory::Secondary)),
        Just(Some(DocumentCategory::WorkingRights)),
        Just(Some(DocumentCategory::ServiceQualification)),
    ]
}

fn known_type() -> impl Strategy<Value = String> {
    let known: Vec<&'static str> = ESSENTIAL_CHECKS
        .iter()
        .chain(TRAINING_MODULES)
        .chain(INSURANCE_TYPES)
        .chain(CONTRACT_TYPES)
        .copied()
        .collect();
    prop_oneof![
        prop::sample::select(known.clone()).prop_map(str::to_string),
        (prop::sample::select(known), "[a-z-]{1,12}")
            .prop_map(|(suffix, service)| format!("{service}:{suffix}")),
        "[a-z:-]{0,24}",
    ]
}

fn status() -> impl Strategy<Value = RequirementStatus> {
    prop_oneof![
        Just(RequirementStatus::Pending),
        Just(RequirementStatus::Submitted),
        Just(RequirementStatus::Approved),
        Just(RequirementStatus::Rejected),
        Just(RequirementStatus::Expired),
    ]
}

fn action() -> impl Strategy<Value = ReviewAction> {
    prop_oneof![
        Just(ReviewAction::Submit),
        Just(ReviewAction::Approve),
        Just(ReviewAction::Reject),
        Just(ReviewAction::Reset),
        Just(ReviewAction::Expire),
    ]
}

fn service_selection() -> impl Strategy<Value = Vec<String>> {
    let codes: Vec<String> = catalog::services()
        .iter()
        .map(|service| service.code.to_string())
        .collect();
    let len = codes.len();
    prop::sample::subsequence(codes, 0..=len)
}

proptest! {
    #[test]
    fn classification_is_total_and_deterministic(kind in known_type(), category in category()) {
        let bucket = classify(&kind, category);
        prop_assert!(ComplianceBucket::ordered().contains(&bucket));
        prop_assert_eq!(bucket, classify(&kind, category));
    }

    #[test]
    fn identity_categories_always_land_in_identity(kind in known_type()) {
        prop_assert_eq!(classify(&kind, Some(DocumentCategory::Primary)), ComplianceBucket::Identity);
        prop_assert_eq!(classify(&kind, Some(DocumentCategory::Secondary)), ComplianceBucket::Identity);
    }

    #[test]
    fn generated_steps_have_unique_slugs(services in service_selection()) {
        let steps = generate_steps(&requirements_for_services(&services));
        let slugs: HashSet<&str> = steps.iter().map(|step| step.slug.as_str()).collect();
        prop_assert_eq!(slugs.len(), steps.len());
        prop_assert_eq!(steps.first().map(|step| step.slug.as_str()), Some("personal-details"));
    }

    #[test]
    fn catalog_never_repeats_a_requirement(services in service_selection()) {
        let requirements = requirements_for_services(&services);
        let types: HashSet<&str> = requirements
            .iter()
            .map(|document| document.requirement_type.as_str())
            .collect();
        prop_assert_eq!(types.len(), requirements.len());
    }

    #[test]
    fn refused_transitions_leave_the_row_untouched(from in status(), action in action()) {
        let document = catalog::describe(&RequirementType::new("police-check")).expect("catalog entry");
        let mut row = document.to_pending(WorkerId::new(), Utc::now());
        row.status = from;
        let before = row.clone();

        match transitions::apply(&mut row, action, Utc::now(), Some("reason".to_string())) {
            Ok(previous) => {
                prop_assert_eq!(previous, from);
                prop_assert_eq!(Some(row.status), next_status(from, action).ok());
            }
            Err(_) => {
                prop_assert!(next_status(from, action).is_err());
                prop_assert_eq!(row, before);
            }
        }
    }
}
