use crate::outcome::{Outcome, ResourceRef, Stage};
use serde::{Deserialize, Serialize};

/// One line of the resolution report handed to downstream tools.
///
/// Successful records carry `kind`, `id` and `local_file`; failed records
/// carry `stage` and `error`, plus the file details when the index named a
/// file. The `extracted_*` fields are only present once
/// extraction has run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub url: String,
    pub kind: Option<String>,
    pub id: Option<String>,
    pub local_file: Option<String>,
    pub stage: Option<Stage>,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
}

impl ResourceRecord {
    /// Report line for an outcome. Skipped URLs are left out of reports.
    pub fn from_outcome(outcome: &Outcome) -> Option<Self> {
        match outcome {
            Outcome::Resolved(resource) => Some(Self::located(resource)),
            Outcome::Skipped => None,
            Outcome::Failed(failure) => Some(Self {
                url: failure.url.clone(),
                stage: Some(failure.stage),
                error: Some(failure.reason.clone()),
                ..failure.resource.as_ref().map(Self::located).unwrap_or_default()
            }),
        }
    }

    fn located(resource: &ResourceRef) -> Self {
        Self {
            url: resource.url.clone(),
            kind: Some(resource.kind.to_string()),
            id: Some(resource.id.clone()),
            local_file: Some(resource.path.display().to_string()),
            ..Self::default()
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.error.is_none() && self.kind.is_some() && self.id.is_some()
    }
}
