use serde::{Deserialize, Serialize};

use crate::domain::DocumentCategory;

/// Background and eligibility checks every worker clears before going live.
pub const ESSENTIAL_CHECKS: &[&str] = &[
    "police-check",
    "ndis-worker-screening",
    "working-with-children-check",
    "right-to-work",
];

pub const TRAINING_MODULES: &[&str] = &[
    "ndis-worker-orientation",
    "infection-prevention-control",
    "manual-handling",
    "medication-awareness",
];

pub const INSURANCE_TYPES: &[&str] = &[
    "public-liability",
    "professional-indemnity",
    "personal-accident",
    "comprehensive-vehicle",
];

pub const CONTRACT_TYPES: &[&str] = &[
    "independent-contractor-agreement",
    "code-of-conduct",
    "privacy-agreement",
];

/// Admin dashboard buckets for a worker's verification documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ComplianceBucket {
    EssentialChecks,
    Modules,
    Certifications,
    Identity,
    Insurances,
    Contracts,
}

impl ComplianceBucket {
    pub const fn ordered() -> [ComplianceBucket; 6] {
        [
            ComplianceBucket::EssentialChecks,
            ComplianceBucket::Modules,
            ComplianceBucket::Certifications,
            ComplianceBucket::Identity,
            ComplianceBucket::Insurances,
            ComplianceBucket::Contracts,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            ComplianceBucket::EssentialChecks => "Essential checks",
            ComplianceBucket::Modules => "Training modules",
            ComplianceBucket::Certifications => "Certifications",
            ComplianceBucket::Identity => "Identity",
            ComplianceBucket::Insurances => "Insurances",
            ComplianceBucket::Contracts => "Contracts",
        }
    }
}

/// Assigns a requirement to exactly one bucket. First matching rule wins; anything
/// unrecognised lands in certifications.
pub fn classify(requirement_type: &str, category: Option<DocumentCategory>) -> ComplianceBucket {
    if matches!(
        category,
        Some(DocumentCategory::Primary | DocumentCategory::Secondary)
    ) {
        return ComplianceBucket::Identity;
    }

    if let Some((_, suffix)) = requirement_type.split_once(':') {
        return if INSURANCE_TYPES.contains(&suffix) {
            ComplianceBucket::Insurances
        } else {
            ComplianceBucket::Certifications
        };
    }

    if ESSENTIAL_CHECKS.contains(&requirement_type) {
        ComplianceBucket::EssentialChecks
    } else if TRAINING_MODULES.contains(&requirement_type) {
        ComplianceBucket::Modules
    } else if INSURANCE_TYPES.contains(&requirement_type) {
        ComplianceBucket::Insurances
    } else if CONTRACT_TYPES.contains(&requirement_type) {
        ComplianceBucket::Contracts
    } else {
        // SERVICE_QUALIFICATION and the fallthrough share a bucket.
        ComplianceBucket::Certifications
    }
}
