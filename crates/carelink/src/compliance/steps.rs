use std::collections::HashSet;

use serde::Serialize;

use super::catalog::{RequiredDocument, RequirementSet};
use super::classifier::{classify, ComplianceBucket};
use crate::domain::{RequirementType, SetupProgress};

pub const DOCUMENTS_ENDPOINT: &str = "/api/worker/documents";
pub const PROFILE_ENDPOINT: &str = "/api/worker/profile";
pub const PROGRESS_ENDPOINT: &str = "/api/worker/setup/progress";

/// UI component a wizard page renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepComponent {
    PersonalDetailsForm,
    ServiceSelection,
    IdentityVerification,
    DocumentUpload,
    ContractAcknowledgement,
    TrainingChecklist,
    QualificationUpload,
    InsuranceUpload,
    TransportDetails,
    ReviewAndSubmit,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepMetadata {
    /// Set when the step collects a single requirement.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirement: Option<RequirementType>,
    /// Requirements gathered on one grouped page (trainings, insurance, transport).
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub covers: Vec<RequirementType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetupStep {
    pub slug: String,
    pub title: String,
    pub component: StepComponent,
    pub metadata: StepMetadata,
    pub completed: bool,
}

const STATIC_STEPS: &[(&str, &str, StepComponent)] = &[
    ("personal-details", "Personal details", StepComponent::PersonalDetailsForm),
    ("services", "Services you offer", StepComponent::ServiceSelection),
    ("identity", "Identity documents", StepComponent::IdentityVerification),
    ("police-check", "National police check", StepComponent::DocumentUpload),
    ("ndis-worker-screening", "NDIS worker screening", StepComponent::DocumentUpload),
    ("training-modules", "Training modules", StepComponent::TrainingChecklist),
    ("qualifications", "Qualifications", StepComponent::QualificationUpload),
    ("insurance", "Insurance", StepComponent::InsuranceUpload),
    ("review-and-submit", "Review and submit", StepComponent::ReviewAndSubmit),
];

/// Predefined wizard used when no requirement data is available.
pub fn fallback_steps() -> Vec<SetupStep> {
    STATIC_STEPS
        .iter()
        .map(|(slug, title, component)| SetupStep {
            slug: (*slug).to_string(),
            title: (*title).to_string(),
            component: *component,
            metadata: StepMetadata {
                endpoint: default_endpoint(*component),
                ..StepMetadata::default()
            },
            completed: false,
        })
        .collect()
}

fn default_endpoint(component: StepComponent) -> Option<&'static str> {
    match component {
        StepComponent::PersonalDetailsForm | StepComponent::ServiceSelection => {
            Some(PROFILE_ENDPOINT)
        }
        StepComponent::ReviewAndSubmit => Some(PROGRESS_ENDPOINT),
        _ => Some(DOCUMENTS_ENDPOINT),
    }
}

/// Derives the onboarding wizard from a worker's requirements. Steps follow the group order
/// (base compliance, trainings, qualifications, insurance, transport) framed by the profile
/// and review pages; colliding slugs get a numeric suffix.
pub fn generate_steps(requirements: &RequirementSet) -> Vec<SetupStep> {
    if requirements.is_empty() {
        return fallback_steps();
    }

    let mut builder = StepBuilder::default();
    builder.fixed("personal-details", "Personal details", StepComponent::PersonalDetailsForm);
    builder.fixed("services", "Services you offer", StepComponent::ServiceSelection);

    for document in &requirements.base_compliance {
        let component = match classify(document.requirement_type.as_str(), document.category) {
            ComplianceBucket::Identity => StepComponent::IdentityVerification,
            ComplianceBucket::Contracts => StepComponent::ContractAcknowledgement,
            _ => StepComponent::DocumentUpload,
        };
        builder.single(document, document.name.clone(), component);
    }

    builder.grouped(
        "training-modules",
        "Training modules",
        StepComponent::TrainingChecklist,
        &requirements.trainings,
    );

    for document in &requirements.qualifications {
        let title = match &document.service_title {
            Some(service) => format!("{} ({service})", document.name),
            None => document.name.clone(),
        };
        builder.single(document, title, StepComponent::QualificationUpload);
    }

    builder.grouped(
        "insurance",
        "Insurance",
        StepComponent::InsuranceUpload,
        &requirements.insurance,
    );
    builder.grouped(
        "transport",
        "Transport",
        StepComponent::TransportDetails,
        &requirements.transport,
    );

    builder.fixed("review-and-submit", "Review and submit", StepComponent::ReviewAndSubmit);
    builder.steps
}

/// Marks steps complete according to the worker's stored progress.
pub fn apply_progress(steps: &mut [SetupStep], progress: &SetupProgress) {
    for step in steps {
        step.completed = progress.get(&step.slug).copied().unwrap_or(false);
    }
}

#[derive(Default)]
struct StepBuilder {
    steps: Vec<SetupStep>,
    used: HashSet<String>,
}

impl StepBuilder {
    fn unique_slug(&mut self, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut suffix = 2;
        while self.used.contains(&candidate) {
            candidate = format!("{base}-{suffix}");
            suffix += 1;
        }
        self.used.insert(candidate.clone());
        candidate
    }

    fn fixed(&mut self, slug: &str, title: &str, component: StepComponent) {
        let slug = self.unique_slug(slug);
        self.steps.push(SetupStep {
            slug,
            title: title.to_string(),
            component,
            metadata: StepMetadata {
                endpoint: default_endpoint(component),
                ..StepMetadata::default()
            },
            completed: false,
        });
    }

    fn single(&mut self, document: &RequiredDocument, title: String, component: StepComponent) {
        let slug = self.unique_slug(&slugify(document.requirement_type.doc_type()));
        self.steps.push(SetupStep {
            slug,
            title,
            component,
            metadata: StepMetadata {
                requirement: Some(document.requirement_type.clone()),
                covers: Vec::new(),
                endpoint: Some(DOCUMENTS_ENDPOINT),
            },
            completed: false,
        });
    }

    fn grouped(
        &mut self,
        slug: &str,
        title: &str,
        component: StepComponent,
        documents: &[RequiredDocument],
    ) {
        if documents.is_empty() {
            return;
        }
        let slug = self.unique_slug(slug);
        self.steps.push(SetupStep {
            slug,
            title: title.to_string(),
            component,
            metadata: StepMetadata {
                requirement: None,
                covers: documents
                    .iter()
                    .map(|document| document.requirement_type.clone())
                    .collect(),
                endpoint: Some(DOCUMENTS_ENDPOINT),
            },
            completed: false,
        });
    }
}

/// Lowercase, ASCII alphanumerics separated by single dashes.
pub fn slugify(raw: &str) -> String {
    let mut slug = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "step".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance::catalog::requirements_for_services;

    fn services(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    fn slugs(steps: &[SetupStep]) -> Vec<&str> {
        steps.iter().map(|step| step.slug.as_str()).collect()
    }

    #[test]
    fn fallback_steps_have_unique_slugs() {
        let steps = fallback_steps();
        let unique: HashSet<&str> = steps.iter().map(|step| step.slug.as_str()).collect();
        assert_eq!(unique.len(), steps.len());
        assert_eq!(steps.first().map(|step| step.slug.as_str()), Some("personal-details"));
    }

    #[test]
    fn empty_requirements_use_the_static_wizard() {
        let steps = generate_steps(&RequirementSet::default());
        assert_eq!(steps, fallback_steps());
    }

    #[test]
    fn generated_steps_follow_group_order() {
        let steps = generate_steps(&requirements_for_services(&services(&["transport"])));
        let slugs = slugs(&steps);
        assert_eq!(slugs.first(), Some(&"personal-details"));
        assert_eq!(slugs.last(), Some(&"review-and-submit"));

        let position = |slug: &str| slugs.iter().position(|s| *s == slug).expect(slug);
        assert!(position("passport") < position("training-modules"));
        assert!(position("training-modules") < position("insurance"));
        assert!(position("insurance") < position("transport"));

        let transport = &steps[position("transport")];
        assert_eq!(transport.component, StepComponent::TransportDetails);
        assert_eq!(transport.metadata.covers.len(), 2);
    }

    #[test]
    fn base_compliance_components_follow_the_classifier() {
        let steps = generate_steps(&requirements_for_services(&services(&["domestic-assistance"])));
        let component = |slug: &str| {
            steps
                .iter()
                .find(|step| step.slug == slug)
                .map(|step| step.component)
                .expect(slug)
        };
        assert_eq!(component("passport"), StepComponent::IdentityVerification);
        assert_eq!(component("code-of-conduct"), StepComponent::ContractAcknowledgement);
        assert_eq!(component("police-check"), StepComponent::DocumentUpload);
    }

    #[test]
    fn shared_qualifications_get_distinct_slugs() {
        let steps = generate_steps(&requirements_for_services(&services(&["nursing", "therapy"])));
        let slugs = slugs(&steps);
        assert!(slugs.contains(&"ahpra-registration"));
        assert!(slugs.contains(&"ahpra-registration-2"));
        let unique: HashSet<&str> = slugs.iter().copied().collect();
        assert_eq!(unique.len(), slugs.len());

        let second = steps
            .iter()
            .find(|step| step.slug == "ahpra-registration-2")
            .expect("second registration step");
        assert_eq!(second.title, "AHPRA registration (Therapy Supports)");
        assert_eq!(
            second.metadata.requirement.as_ref().map(RequirementType::as_str),
            Some("therapy:ahpra-registration")
        );
    }

    #[test]
    fn progress_marks_completed_steps() {
        let mut steps = fallback_steps();
        let mut progress = SetupProgress::new();
        progress.insert("services".to_string(), true);
        progress.insert("identity".to_string(), false);
        apply_progress(&mut steps, &progress);
        let completed: Vec<&str> = steps
            .iter()
            .filter(|step| step.completed)
            .map(|step| step.slug.as_str())
            .collect();
        assert_eq!(completed, vec!["services"]);
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Cert III: Individual  Support!"), "cert-iii-individual-support");
        assert_eq!(slugify("--"), "step");
    }
}
