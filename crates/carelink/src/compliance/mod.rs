//! Compliance rules: the requirement catalog, the admin classifier, the onboarding step
//! generator, and the review state machine. Everything here is pure.

pub mod catalog;
pub mod classifier;
pub mod steps;
pub mod summary;
pub mod transitions;

pub use catalog::{
    describe, requirements_for_services, RequiredDocument, RequirementGroup, RequirementSet,
};
pub use classifier::{classify, ComplianceBucket};
pub use steps::{apply_progress, fallback_steps, generate_steps, SetupStep, StepComponent};
pub use summary::{categorize, CategorizedDocuments, CategoryDocuments, CategoryTotals};
pub use transitions::{next_status, ReviewAction, TransitionError};
