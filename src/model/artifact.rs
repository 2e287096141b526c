//! Artifact record and additions
//!
//! The [`Artifact`] is owned by the ingestion pipeline: the caller creates it
//! with repository and digest set, a processor populates the extracted fields,
//! and the catalog persists it afterwards. Processors never create or delete
//! artifacts themselves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::descriptor::Platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Artifact {
    /// Repository the artifact lives in, set by the caller.
    pub repository_name: String,
    /// Manifest digest, set by the caller.
    pub digest: String,
    /// Config media type, the dispatch key (manifest media type for indexes).
    pub media_type: String,
    /// Media type of the manifest payload itself.
    pub manifest_media_type: String,
    /// Canonical type label, e.g. "NUBIX_APP".
    pub artifact_type: String,
    /// Manifest payload plus config and layer sizes.
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Labels declared in the config blob.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    /// Structured fields lifted from the config blob.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra_attrs: HashMap<String, serde_json::Value>,
    /// Manifest annotations.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub annotations: HashMap<String, String>,
    /// Resolved children of an index, in descriptor order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<Reference>,
    /// Children that failed to resolve, with the cause preserved.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failed_references: Vec<FailedReference>,
}

impl Artifact {
    pub fn new(repository_name: impl Into<String>, digest: impl Into<String>) -> Self {
        Self {
            repository_name: repository_name.into(),
            digest: digest.into(),
            ..Default::default()
        }
    }

    /// Merge a label, last write wins. Collisions with a different existing
    /// value are logged so lossy config blobs are visible in diagnostics.
    pub fn merge_label(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        if let Some(existing) = self.labels.get(&key) {
            if *existing != value {
                tracing::warn!(
                    label = %key,
                    digest = %self.digest,
                    "label collision during metadata abstraction, keeping latest value"
                );
            }
        }
        self.labels.insert(key, value);
    }
}

/// Link from an index artifact to one resolved child.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reference {
    pub artifact: Artifact,
    /// Platform carried by the child descriptor, enabling later
    /// platform-specific selection.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
}

/// Record of an index child that could not be resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedReference {
    pub digest: String,
    pub media_type: String,
    pub error: String,
}

/// A named, lazily materialized side-artifact of a parent artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Addition {
    pub content: Vec<u8>,
    pub content_type: String,
}

impl Addition {
    pub fn new(content: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            content,
            content_type: content_type.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_label_last_write_wins() {
        let mut artifact = Artifact::new("library/demo", "sha256:aa");
        artifact.merge_label("app", "demo");
        artifact.merge_label("app", "other");
        assert_eq!(artifact.labels["app"], "other");
        assert_eq!(artifact.labels.len(), 1);
    }

    #[test]
    fn test_new_leaves_extracted_fields_empty() {
        let artifact = Artifact::new("library/demo", "sha256:aa");
        assert_eq!(artifact.repository_name, "library/demo");
        assert_eq!(artifact.digest, "sha256:aa");
        assert!(artifact.labels.is_empty());
        assert!(artifact.references.is_empty());
        assert!(artifact.created.is_none());
    }
}
