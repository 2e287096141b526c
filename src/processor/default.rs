//! Fallback processor for unregistered media types
//!
//! Artifact ingestion must not stall on an unknown artifact type: the default
//! processor abstracts whatever generic metadata the manifest shape allows and
//! derives a best-effort type label from the media type string itself.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::ProcessorConfig;
use crate::error::{ProcessorError, Result};
use crate::model::manifest::is_index_payload;
use crate::model::{Addition, Artifact, Manifest};
use crate::processor::base::ManifestProcessor;
use crate::processor::{ProcessContext, Processor};
use crate::store::ContentStore;

pub const ARTIFACT_TYPE_UNKNOWN: &str = "UNKNOWN";

pub struct DefaultProcessor {
    manifest_processor: ManifestProcessor,
    max_manifest_size: u64,
}

impl DefaultProcessor {
    pub fn new(store: Arc<dyn ContentStore>, config: ProcessorConfig) -> Self {
        Self {
            max_manifest_size: config.max_manifest_size,
            manifest_processor: ManifestProcessor::new(store, config),
        }
    }
}

#[async_trait]
impl Processor for DefaultProcessor {
    async fn abstract_metadata(
        &self,
        ctx: &ProcessContext,
        artifact: &mut Artifact,
        manifest: &[u8],
    ) -> Result<()> {
        if manifest.len() as u64 > self.max_manifest_size {
            return Err(ProcessorError::PayloadTooLarge {
                size: manifest.len() as u64,
                limit: self.max_manifest_size,
            });
        }
        if is_index_payload(manifest) {
            // No registry handle here, so children are left unresolved; the
            // generic fields are still recorded.
            let parsed = Manifest::parse(&artifact.manifest_media_type, manifest)?;
            artifact.manifest_media_type = parsed.media_type().to_string();
            artifact.media_type = parsed.media_type().to_string();
            artifact.size = manifest.len() as u64;
            for (key, value) in parsed.annotations() {
                artifact.annotations.insert(key.clone(), value.clone());
            }
            return Ok(());
        }
        self.manifest_processor
            .abstract_metadata(ctx, artifact, manifest)
            .await
    }

    async fn abstract_addition(
        &self,
        _ctx: &ProcessContext,
        _artifact: &Artifact,
        addition: &str,
    ) -> Result<Addition> {
        Err(ProcessorError::UnknownAddition(addition.to_string()))
    }

    fn artifact_type(&self, artifact: &Artifact) -> String {
        artifact_type_from_media_type(&artifact.media_type)
    }

    fn list_addition_types(&self, _artifact: &Artifact) -> Vec<String> {
        Vec::new()
    }
}

/// Derive a type label from a vendor media type:
/// `application/vnd.nubix.app.config.v1+json` becomes `NUBIX_APP`.
pub fn artifact_type_from_media_type(media_type: &str) -> String {
    let Some(rest) = media_type.strip_prefix("application/vnd.") else {
        return ARTIFACT_TYPE_UNKNOWN.to_string();
    };
    let rest = rest.split('+').next().unwrap_or(rest);

    let mut parts: Vec<&str> = rest.split('.').filter(|p| !p.is_empty()).collect();
    while let Some(last) = parts.last() {
        if *last == "config" || *last == "manifest" || is_schema_version(last) {
            parts.pop();
        } else {
            break;
        }
    }
    if parts.is_empty() {
        return ARTIFACT_TYPE_UNKNOWN.to_string();
    }
    parts.join("_").replace('-', "_").to_uppercase()
}

fn is_schema_version(part: &str) -> bool {
    part.len() > 1
        && part.starts_with('v')
        && part[1..].chars().all(|c| c.is_ascii_digit())
}
