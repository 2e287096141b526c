//! Metadata abstraction for single-manifest artifact types
//!
//! Parses the payload as one manifest, accounts sizes, and pulls the config
//! blob to lift declared labels, creation time and selected properties onto
//! the artifact record.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::ProcessorConfig;
use crate::digest::DigestUtils;
use crate::error::{ProcessorError, Result};
use crate::model::manifest::ANNOTATION_ICON;
use crate::model::{Artifact, Manifest};
use crate::processor::ProcessContext;
use crate::store::ContentStore;

/// Docker-style image configs nest labels under `config.Labels`.
const DOCKER_CONFIG_KEY: &str = "config";
const DOCKER_LABELS_KEY: &str = "Labels";

pub struct ManifestProcessor {
    store: Arc<dyn ContentStore>,
    config: ProcessorConfig,
    /// Top-level config blob fields copied into the artifact's extra
    /// attributes, e.g. `architecture` or `history`.
    properties: Vec<String>,
}

impl ManifestProcessor {
    pub fn new(store: Arc<dyn ContentStore>, config: ProcessorConfig) -> Self {
        Self {
            store,
            config,
            properties: Vec::new(),
        }
    }

    pub fn with_properties<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.properties = properties.into_iter().map(Into::into).collect();
        self
    }

    pub async fn abstract_metadata(
        &self,
        ctx: &ProcessContext,
        artifact: &mut Artifact,
        payload: &[u8],
    ) -> Result<()> {
        if payload.len() as u64 > self.config.max_manifest_size {
            return Err(ProcessorError::PayloadTooLarge {
                size: payload.len() as u64,
                limit: self.config.max_manifest_size,
            });
        }

        let manifest = Manifest::parse(&artifact.manifest_media_type, payload)?;
        if manifest.is_index() {
            return Err(ProcessorError::malformed(
                manifest.media_type(),
                "expected a single manifest, got an index",
            ));
        }

        artifact.manifest_media_type = manifest.media_type().to_string();
        for (key, value) in manifest.annotations() {
            artifact.annotations.insert(key.clone(), value.clone());
        }
        if let Some(icon) = manifest.annotations().get(ANNOTATION_ICON) {
            artifact.icon = Some(icon.clone());
        }

        let layer_size: u64 = manifest.descriptors().iter().map(|d| d.size).sum();
        artifact.size = payload.len() as u64 + layer_size;

        let Some(config_desc) = manifest.config().cloned() else {
            return Ok(());
        };
        artifact.media_type = config_desc.media_type.clone();
        artifact.size += config_desc.size;

        if config_desc.size > self.config.max_config_blob_size {
            return Err(ProcessorError::PayloadTooLarge {
                size: config_desc.size,
                limit: self.config.max_config_blob_size,
            });
        }

        let blob = ctx
            .run(self.store.pull_blob(&artifact.repository_name, &config_desc.digest))
            .await
            .map_err(|err| match err {
                ProcessorError::NotFound(_) => ProcessorError::MissingConfigBlob {
                    digest: config_desc.digest.clone(),
                },
                other => other,
            })?;

        if !DigestUtils::verify(&blob, &config_desc.digest) {
            return Err(ProcessorError::Store(format!(
                "config blob {} failed digest verification",
                config_desc.digest
            )));
        }

        self.abstract_config(artifact, &config_desc.media_type, &blob)
    }

    /// Lift structured fields out of the config blob.
    fn abstract_config(
        &self,
        artifact: &mut Artifact,
        config_media_type: &str,
        blob: &[u8],
    ) -> Result<()> {
        let value: serde_json::Value = serde_json::from_slice(blob)
            .map_err(|e| ProcessorError::malformed(config_media_type, e.to_string()))?;

        if let Some(created) = value.get("created").and_then(|v| v.as_str()) {
            match DateTime::parse_from_rfc3339(created) {
                Ok(parsed) => artifact.created = Some(parsed.with_timezone(&Utc)),
                Err(err) => tracing::warn!(
                    digest = %artifact.digest,
                    %err,
                    "config blob carries unparseable created time, skipping"
                ),
            }
        }

        merge_label_object(artifact, value.get("labels"));
        merge_label_object(
            artifact,
            value.get(DOCKER_CONFIG_KEY).and_then(|c| c.get(DOCKER_LABELS_KEY)),
        );

        for property in &self.properties {
            if let Some(v) = value.get(property) {
                artifact.extra_attrs.insert(property.clone(), v.clone());
            }
        }

        Ok(())
    }
}

fn merge_label_object(artifact: &mut Artifact, labels: Option<&serde_json::Value>) {
    let Some(map) = labels.and_then(|l| l.as_object()) else {
        return;
    };
    for (key, value) in map {
        if let Some(value) = value.as_str() {
            artifact.merge_label(key.clone(), value.to_string());
        }
    }
}
