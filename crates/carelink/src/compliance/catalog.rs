//! Static catalog of services and the verification documents each one requires.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    DocumentCategory, RequirementId, RequirementMetadata, RequirementStatus, RequirementType,
    VerificationRequirement, WorkerId,
};

/// Wizard grouping of a requirement; independent of the admin buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RequirementGroup {
    BaseCompliance,
    Training,
    Qualification,
    Insurance,
    Transport,
}

/// When a catalog document applies to a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applicability {
    Always,
    AnyService(&'static [&'static str]),
}

impl Applicability {
    fn matches(self, services: &[String]) -> bool {
        match self {
            Applicability::Always => true,
            Applicability::AnyService(codes) => services
                .iter()
                .any(|selected| codes.contains(&selected.as_str())),
        }
    }
}

/// Master catalog row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentDefinition {
    pub id: &'static str,
    pub name: &'static str,
    pub category: Option<DocumentCategory>,
    pub group: RequirementGroup,
    pub applies: Applicability,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualificationDefinition {
    pub doc_type: &'static str,
    pub name: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceDefinition {
    pub code: &'static str,
    pub title: &'static str,
    pub qualifications: &'static [QualificationDefinition],
}

const DOCUMENTS: &[DocumentDefinition] = &[
    DocumentDefinition {
        id: "passport",
        name: "Passport or birth certificate",
        category: Some(DocumentCategory::Primary),
        group: RequirementGroup::BaseCompliance,
        applies: Applicability::Always,
    },
    DocumentDefinition {
        id: "drivers-licence",
        name: "Driver licence or Medicare card",
        category: Some(DocumentCategory::Secondary),
        group: RequirementGroup::BaseCompliance,
        applies: Applicability::Always,
    },
    DocumentDefinition {
        id: "right-to-work",
        name: "Right to work in Australia",
        category: Some(DocumentCategory::WorkingRights),
        group: RequirementGroup::BaseCompliance,
        applies: Applicability::Always,
    },
    DocumentDefinition {
        id: "police-check",
        name: "National police check",
        category: None,
        group: RequirementGroup::BaseCompliance,
        applies: Applicability::Always,
    },
    DocumentDefinition {
        id: "ndis-worker-screening",
        name: "NDIS worker screening check",
        category: None,
        group: RequirementGroup::BaseCompliance,
        applies: Applicability::Always,
    },
    DocumentDefinition {
        id: "working-with-children-check",
        name: "Working with children check",
        category: None,
        group: RequirementGroup::BaseCompliance,
        applies: Applicability::AnyService(&["community-access", "therapy"]),
    },
    DocumentDefinition {
        id: "independent-contractor-agreement",
        name: "Independent contractor agreement",
        category: None,
        group: RequirementGroup::BaseCompliance,
        applies: Applicability::Always,
    },
    DocumentDefinition {
        id: "code-of-conduct",
        name: "NDIS code of conduct acknowledgement",
        category: None,
        group: RequirementGroup::BaseCompliance,
        applies: Applicability::Always,
    },
    DocumentDefinition {
        id: "ndis-worker-orientation",
        name: "NDIS worker orientation module",
        category: None,
        group: RequirementGroup::Training,
        applies: Applicability::Always,
    },
    DocumentDefinition {
        id: "infection-prevention-control",
        name: "Infection prevention and control",
        category: None,
        group: RequirementGroup::Training,
        applies: Applicability::Always,
    },
    DocumentDefinition {
        id: "manual-handling",
        name: "Manual handling",
        category: None,
        group: RequirementGroup::Training,
        applies: Applicability::AnyService(&[
            "personal-care",
            "domestic-assistance",
            "community-access",
        ]),
    },
    DocumentDefinition {
        id: "medication-awareness",
        name: "Medication awareness",
        category: None,
        group: RequirementGroup::Training,
        applies: Applicability::AnyService(&["personal-care", "nursing"]),
    },
    DocumentDefinition {
        id: "public-liability",
        name: "Public liability insurance",
        category: None,
        group: RequirementGroup::Insurance,
        applies: Applicability::Always,
    },
    DocumentDefinition {
        id: "personal-accident",
        name: "Personal accident insurance",
        category: None,
        group: RequirementGroup::Insurance,
        applies: Applicability::Always,
    },
    DocumentDefinition {
        id: "comprehensive-vehicle",
        name: "Comprehensive vehicle insurance",
        category: None,
        group: RequirementGroup::Transport,
        applies: Applicability::AnyService(&["community-access", "transport"]),
    },
    DocumentDefinition {
        id: "vehicle-registration",
        name: "Vehicle registration",
        category: None,
        group: RequirementGroup::Transport,
        applies: Applicability::AnyService(&["community-access", "transport"]),
    },
];

const FIRST_AID: QualificationDefinition = QualificationDefinition {
    doc_type: "first-aid",
    name: "First aid and CPR certificate",
};

const AHPRA: QualificationDefinition = QualificationDefinition {
    doc_type: "ahpra-registration",
    name: "AHPRA registration",
};

const SERVICES: &[ServiceDefinition] = &[
    ServiceDefinition {
        code: "personal-care",
        title: "Personal Care",
        qualifications: &[
            QualificationDefinition {
                doc_type: "cert-iii-individual-support",
                name: "Certificate III in Individual Support",
            },
            FIRST_AID,
        ],
    },
    ServiceDefinition {
        code: "community-access",
        title: "Community Access",
        qualifications: &[FIRST_AID],
    },
    ServiceDefinition {
        code: "domestic-assistance",
        title: "Domestic Assistance",
        qualifications: &[],
    },
    ServiceDefinition {
        code: "nursing",
        title: "Nursing Care",
        qualifications: &[
            AHPRA,
            QualificationDefinition {
                doc_type: "professional-indemnity",
                name: "Professional indemnity insurance",
            },
        ],
    },
    ServiceDefinition {
        code: "therapy",
        title: "Therapy Supports",
        qualifications: &[
            AHPRA,
            QualificationDefinition {
                doc_type: "allied-health-degree",
                name: "Allied health qualification",
            },
        ],
    },
    ServiceDefinition {
        code: "transport",
        title: "Transport",
        qualifications: &[],
    },
];

pub fn documents() -> &'static [DocumentDefinition] {
    DOCUMENTS
}

pub fn services() -> &'static [ServiceDefinition] {
    SERVICES
}

pub fn service(code: &str) -> Option<&'static ServiceDefinition> {
    SERVICES.iter().find(|service| service.code == code)
}

pub fn document(id: &str) -> Option<&'static DocumentDefinition> {
    DOCUMENTS.iter().find(|document| document.id == id)
}

/// A requirement as presented to the worker; status fields are filled when derived from
/// stored rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredDocument {
    pub requirement_type: RequirementType,
    pub name: String,
    pub category: Option<DocumentCategory>,
    pub group: RequirementGroup,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirement_id: Option<RequirementId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RequirementStatus>,
}

impl RequiredDocument {
    fn from_definition(definition: &DocumentDefinition) -> Self {
        Self {
            requirement_type: RequirementType::new(definition.id),
            name: definition.name.to_string(),
            category: definition.category,
            group: definition.group,
            service_title: None,
            requirement_id: None,
            status: None,
        }
    }

    fn from_qualification(
        service: &ServiceDefinition,
        qualification: &QualificationDefinition,
    ) -> Self {
        Self {
            requirement_type: RequirementType::namespaced(service.code, qualification.doc_type),
            name: qualification.name.to_string(),
            category: Some(DocumentCategory::ServiceQualification),
            group: RequirementGroup::Qualification,
            service_title: Some(service.title.to_string()),
            requirement_id: None,
            status: None,
        }
    }

    /// A fresh PENDING row for `worker_id`.
    pub fn to_pending(&self, worker_id: WorkerId, now: DateTime<Utc>) -> VerificationRequirement {
        let mut metadata = RequirementMetadata::new();
        if let Some(title) = &self.service_title {
            metadata.insert("serviceTitle".to_string(), title.clone().into());
        }
        VerificationRequirement {
            id: RequirementId::new(),
            worker_id,
            requirement_type: self.requirement_type.clone(),
            requirement_name: self.name.clone(),
            document_category: self.category,
            status: RequirementStatus::Pending,
            document_url: None,
            document_key: None,
            uploaded_at: None,
            submitted_at: None,
            reviewed_at: None,
            approved_at: None,
            rejected_at: None,
            expires_at: None,
            rejection_reason: None,
            notes: None,
            metadata,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Requirements grouped the way the onboarding wizard consumes them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequirementSet {
    pub base_compliance: Vec<RequiredDocument>,
    pub trainings: Vec<RequiredDocument>,
    pub qualifications: Vec<RequiredDocument>,
    pub insurance: Vec<RequiredDocument>,
    pub transport: Vec<RequiredDocument>,
}

impl RequirementSet {
    pub fn push(&mut self, document: RequiredDocument) {
        let bucket = match document.group {
            RequirementGroup::BaseCompliance => &mut self.base_compliance,
            RequirementGroup::Training => &mut self.trainings,
            RequirementGroup::Qualification => &mut self.qualifications,
            RequirementGroup::Insurance => &mut self.insurance,
            RequirementGroup::Transport => &mut self.transport,
        };
        bucket.push(document);
    }

    pub fn iter(&self) -> impl Iterator<Item = &RequiredDocument> {
        self.base_compliance
            .iter()
            .chain(&self.trainings)
            .chain(&self.qualifications)
            .chain(&self.insurance)
            .chain(&self.transport)
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Regroups a worker's stored rows, carrying their ids and statuses.
    pub fn from_requirements(rows: &[VerificationRequirement]) -> Self {
        let mut set = Self::default();
        for row in rows {
            let mut document = describe(&row.requirement_type).unwrap_or_else(|| RequiredDocument {
                requirement_type: row.requirement_type.clone(),
                name: row.requirement_name.clone(),
                category: row.document_category,
                group: if row.requirement_type.service().is_some() {
                    RequirementGroup::Qualification
                } else {
                    RequirementGroup::BaseCompliance
                },
                service_title: row.service_title().map(str::to_string),
                requirement_id: None,
                status: None,
            });
            document.requirement_id = Some(row.id);
            document.status = Some(row.status);
            set.push(document);
        }
        set
    }
}

/// Everything a worker offering `services` must provide. Unknown service codes are ignored
/// and every requirement type appears at most once.
pub fn requirements_for_services(services: &[String]) -> RequirementSet {
    let mut set = RequirementSet::default();

    for definition in DOCUMENTS.iter().filter(|doc| doc.applies.matches(services)) {
        set.push(RequiredDocument::from_definition(definition));
    }

    let mut seen = Vec::new();
    for code in services {
        let Some(service) = service(code) else {
            continue;
        };
        if seen.contains(&service.code) {
            continue;
        }
        seen.push(service.code);
        for qualification in service.qualifications {
            set.push(RequiredDocument::from_qualification(service, qualification));
        }
    }

    set
}

/// Catalog entry for a requirement type, if the catalog knows it.
pub fn describe(kind: &RequirementType) -> Option<RequiredDocument> {
    match kind.split() {
        Some((code, doc_type)) => {
            let service = service(code)?;
            let qualification = service
                .qualifications
                .iter()
                .find(|qualification| qualification.doc_type == doc_type)?;
            Some(RequiredDocument::from_qualification(service, qualification))
        }
        None => document(kind.as_str()).map(RequiredDocument::from_definition),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codes(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn domestic_assistance_gets_only_the_baseline() {
        let set = requirements_for_services(&codes(&["domestic-assistance"]));
        let kinds: Vec<&str> = set
            .base_compliance
            .iter()
            .map(|doc| doc.requirement_type.as_str())
            .collect();
        assert!(kinds.contains(&"police-check"));
        assert!(!kinds.contains(&"working-with-children-check"));
        assert_eq!(set.trainings.len(), 3);
        assert!(set.qualifications.is_empty());
        assert!(set.transport.is_empty());
        assert_eq!(set.insurance.len(), 2);
    }

    #[test]
    fn community_access_adds_transport_and_namespaced_qualifications() {
        let set = requirements_for_services(&codes(&["community-access", "nursing"]));
        assert_eq!(set.transport.len(), 2);
        let qualification_types: Vec<&str> = set
            .qualifications
            .iter()
            .map(|doc| doc.requirement_type.as_str())
            .collect();
        assert_eq!(
            qualification_types,
            vec![
                "community-access:first-aid",
                "nursing:ahpra-registration",
                "nursing:professional-indemnity"
            ]
        );
        assert_eq!(
            set.qualifications[0].service_title.as_deref(),
            Some("Community Access")
        );
    }

    #[test]
    fn repeated_and_unknown_services_do_not_duplicate_rows() {
        let once = requirements_for_services(&codes(&["nursing"]));
        let twice = requirements_for_services(&codes(&["nursing", "nursing", "juggling"]));
        assert_eq!(once, twice);
    }

    #[test]
    fn describe_resolves_plain_and_namespaced_types() {
        let plain = describe(&RequirementType::new("manual-handling")).expect("known type");
        assert_eq!(plain.group, RequirementGroup::Training);

        let namespaced =
            describe(&RequirementType::new("therapy:ahpra-registration")).expect("known type");
        assert_eq!(namespaced.category, Some(DocumentCategory::ServiceQualification));
        assert_eq!(namespaced.service_title.as_deref(), Some("Therapy Supports"));

        assert!(describe(&RequirementType::new("therapy:unknown")).is_none());
        assert!(describe(&RequirementType::new("unknown")).is_none());
    }

    #[test]
    fn pending_rows_carry_the_service_title() {
        let worker = WorkerId::new();
        let document =
            describe(&RequirementType::new("nursing:ahpra-registration")).expect("known type");
        let row = document.to_pending(worker, Utc::now());
        assert_eq!(row.status, RequirementStatus::Pending);
        assert_eq!(row.worker_id, worker);
        assert_eq!(row.service_title(), Some("Nursing Care"));

        let regrouped = RequirementSet::from_requirements(&[row.clone()]);
        assert_eq!(regrouped.qualifications.len(), 1);
        assert_eq!(regrouped.qualifications[0].requirement_id, Some(row.id));
        assert_eq!(
            regrouped.qualifications[0].status,
            Some(RequirementStatus::Pending)
        );
    }
}
