use std::collections::BTreeMap;

use serde::Serialize;

use super::classifier::{classify, ComplianceBucket};
use crate::domain::{RequirementStatus, VerificationRequirement, WorkerId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryTotals {
    pub total: usize,
    pub approved: usize,
    pub submitted: usize,
    pub rejected: usize,
}

impl CategoryTotals {
    fn record(&mut self, status: RequirementStatus) {
        self.total += 1;
        match status {
            RequirementStatus::Approved => self.approved += 1,
            RequirementStatus::Submitted => self.submitted += 1,
            RequirementStatus::Rejected => self.rejected += 1,
            RequirementStatus::Pending | RequirementStatus::Expired => {}
        }
    }

    /// Approved share of the total, rounded down; 0 for an empty category.
    pub fn completion_percent(&self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        ((self.approved * 100) / self.total) as u8
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryDocuments {
    pub documents: Vec<VerificationRequirement>,
    pub totals: CategoryTotals,
}

/// Admin view of a worker's documents, bucketed by the classifier.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizedDocuments {
    pub worker_id: WorkerId,
    pub categories: BTreeMap<ComplianceBucket, CategoryDocuments>,
    pub totals: CategoryTotals,
    pub completion_percent: u8,
}

impl CategorizedDocuments {
    pub fn category(&self, bucket: ComplianceBucket) -> &CategoryDocuments {
        // Every bucket is seeded in `categorize`.
        &self.categories[&bucket]
    }
}

/// Buckets every requirement and tallies per-category and overall totals. All six buckets
/// are present even when empty.
pub fn categorize(worker_id: WorkerId, requirements: Vec<VerificationRequirement>) -> CategorizedDocuments {
    let mut categories: BTreeMap<ComplianceBucket, CategoryDocuments> = ComplianceBucket::ordered()
        .into_iter()
        .map(|bucket| (bucket, CategoryDocuments::default()))
        .collect();
    let mut totals = CategoryTotals::default();

    for requirement in requirements {
        let bucket = classify(
            requirement.requirement_type.as_str(),
            requirement.document_category,
        );
        totals.record(requirement.status);
        let entry = categories.entry(bucket).or_default();
        entry.totals.record(requirement.status);
        entry.documents.push(requirement);
    }

    CategorizedDocuments {
        worker_id,
        categories,
        completion_percent: totals.completion_percent(),
        totals,
    }
}
