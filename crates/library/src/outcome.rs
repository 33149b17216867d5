use derive_more::Display;
use linkstash_cache::Kind;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A URL that resolved to a complete local file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub url: String,
    pub kind: Kind,
    pub id: String,
    /// Where downstream tools can open the file.
    pub path: PathBuf,
}

/// The step of resolution a URL failed at.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Not an absolute `http`/`https` URL with a host.
    #[display("invalid-url")]
    InvalidUrl,
    /// The request failed, returned a non-success status, or the body was
    /// empty or could not be read.
    #[display("network")]
    Network,
    /// The declared content type is neither PDF nor HTML.
    #[display("unsupported-type")]
    UnsupportedType,
    /// The index names a file that is no longer there.
    #[display("missing-cache-file")]
    MissingCacheFile,
    /// The downloaded bytes could not be stored.
    #[display("storage")]
    Storage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub url: String,
    pub stage: Stage,
    pub reason: String,
    /// The cached file the failure is about, when the index names one.
    pub resource: Option<ResourceRef>,
}

/// Result of resolving one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Resolved(ResourceRef),
    /// The URL belongs to an excluded host and was left alone.
    Skipped,
    Failed(Failure),
}
impl Outcome {
    pub(crate) fn failed(url: &str, stage: Stage, reason: impl Into<String>) -> Self {
        Self::Failed(Failure {
            url: url.to_string(),
            stage,
            reason: reason.into(),
            resource: None,
        })
    }

    pub(crate) fn failed_at(resource: ResourceRef, stage: Stage, reason: impl Into<String>) -> Self {
        Self::Failed(Failure {
            url: resource.url.clone(),
            stage,
            reason: reason.into(),
            resource: Some(resource),
        })
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    pub fn resource(&self) -> Option<&ResourceRef> {
        match self {
            Self::Resolved(resource) => Some(resource),
            _ => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Tally of a batch of outcomes, for end-of-run reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub resolved: usize,
    pub skipped: usize,
    pub failed: usize,
}
impl<'a> FromIterator<&'a Outcome> for Summary {
    fn from_iter<I: IntoIterator<Item = &'a Outcome>>(outcomes: I) -> Self {
        outcomes.into_iter().fold(Self::default(), |mut summary, outcome| {
            match outcome {
                Outcome::Resolved(_) => summary.resolved += 1,
                Outcome::Skipped => summary.skipped += 1,
                Outcome::Failed(_) => summary.failed += 1,
            }
            summary
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Stage::InvalidUrl, "invalid-url")]
    #[case(Stage::Network, "network")]
    #[case(Stage::UnsupportedType, "unsupported-type")]
    #[case(Stage::MissingCacheFile, "missing-cache-file")]
    #[case(Stage::Storage, "storage")]
    fn test_stage_names(#[case] stage: Stage, #[case] expected: &str) {
        assert_eq!(stage.to_string(), expected);
        assert_eq!(serde_json::to_value(stage).unwrap(), expected);
    }

    #[test]
    fn test_summary() {
        let outcomes = [
            Outcome::Skipped,
            Outcome::failed("https://a.example/", Stage::Network, "request failed"),
            Outcome::Resolved(ResourceRef {
                url: "https://b.example/".to_string(),
                kind: Kind::Html,
                id: "1.html".to_string(),
                path: PathBuf::from("downloaded_html/1.html"),
            }),
            Outcome::Skipped,
        ];
        let summary: Summary = outcomes.iter().collect();
        assert_eq!(summary, Summary { resolved: 1, skipped: 2, failed: 1 });
    }
}
