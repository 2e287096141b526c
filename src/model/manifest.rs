//! Manifest parsing and the immutable manifest value
//!
//! A [`Manifest`] is the canonical in-memory form of a pulled manifest:
//! declared media type, optional config descriptor, the ordered layer or child
//! descriptors, and the raw payload bytes. It never changes after parsing.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{ProcessorError, Result};
use crate::model::descriptor::Descriptor;

pub const MEDIA_TYPE_NUBIX_APP_CONFIG: &str = "application/vnd.nubix.app.config.v1+json";
pub const MEDIA_TYPE_NUBIX_IMAGE_CONFIG: &str = "application/vnd.nubix.image.config.v1+json";
pub const MEDIA_TYPE_OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
pub const MEDIA_TYPE_OCI_INDEX: &str = "application/vnd.oci.image.index.v1+json";
pub const MEDIA_TYPE_DOCKER_MANIFEST: &str =
    "application/vnd.docker.distribution.manifest.v2+json";
pub const MEDIA_TYPE_DOCKER_MANIFEST_LIST: &str =
    "application/vnd.docker.distribution.manifest.list.v2+json";

/// Annotation carrying the artifact icon digest, copied onto the artifact
/// record when present.
pub const ANNOTATION_ICON: &str = "io.nubix.artifact.icon";

/// Wire form of a single (leaf) manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    pub config: Descriptor,
    #[serde(default)]
    pub layers: Vec<Descriptor>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub annotations: HashMap<String, String>,
}

/// Wire form of an index (manifest list).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageIndex {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    pub manifests: Vec<Descriptor>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub annotations: HashMap<String, String>,
}

/// Immutable, parsed manifest value.
#[derive(Debug, Clone)]
pub struct Manifest {
    media_type: String,
    config: Option<Descriptor>,
    descriptors: Vec<Descriptor>,
    annotations: HashMap<String, String>,
    payload: Vec<u8>,
    index: bool,
}

impl Manifest {
    /// Parse payload bytes into a manifest value.
    ///
    /// The body is classified by shape: a `manifests` array makes it an index,
    /// a `config` descriptor makes it a leaf manifest, anything else is
    /// malformed. When both the caller and the body declare a media type they
    /// must match exactly, since the declared media type is the dispatch key.
    pub fn parse(declared_media_type: &str, payload: &[u8]) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(payload)
            .map_err(|e| ProcessorError::malformed(declared_media_type, e.to_string()))?;

        let (media_type, config, descriptors, annotations, index) =
            if value.get("manifests").is_some() {
                let index: ImageIndex = serde_json::from_value(value)
                    .map_err(|e| ProcessorError::malformed(declared_media_type, e.to_string()))?;
                (
                    index.media_type,
                    None,
                    index.manifests,
                    index.annotations,
                    true,
                )
            } else if value.get("config").is_some() {
                let manifest: ImageManifest = serde_json::from_value(value)
                    .map_err(|e| ProcessorError::malformed(declared_media_type, e.to_string()))?;
                (
                    manifest.media_type,
                    Some(manifest.config),
                    manifest.layers,
                    manifest.annotations,
                    false,
                )
            } else {
                return Err(ProcessorError::malformed(
                    declared_media_type,
                    "body is neither a manifest nor an index",
                ));
            };

        let media_type = match (declared_media_type, media_type) {
            ("", Some(body)) => body,
            ("", None) => String::new(),
            (declared, Some(body)) if body != declared => {
                return Err(ProcessorError::malformed(
                    declared,
                    format!("body declares conflicting media type {}", body),
                ));
            }
            (declared, _) => declared.to_string(),
        };

        Ok(Self {
            media_type,
            config,
            descriptors,
            annotations,
            payload: payload.to_vec(),
            index,
        })
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Config descriptor; `None` for indexes.
    pub fn config(&self) -> Option<&Descriptor> {
        self.config.as_ref()
    }

    /// Layer descriptors of a leaf manifest, or child manifest descriptors of
    /// an index, in payload order.
    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    pub fn annotations(&self) -> &HashMap<String, String> {
        &self.annotations
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn is_index(&self) -> bool {
        self.index
    }
}

/// Cheap shape probe used to route a raw payload to the manifest or index
/// path without constructing a full [`Manifest`].
pub fn is_index_payload(payload: &[u8]) -> bool {
    serde_json::from_slice::<serde_json::Value>(payload)
        .map(|v| v.get("manifests").is_some())
        .unwrap_or(false)
}
