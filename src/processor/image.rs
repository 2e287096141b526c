//! Processor for Nubix container images
//!
//! On top of the base manifest behavior, image configs carry a build history
//! that is exposed as the `build_history` addition. The history itself is
//! materialized on demand by re-pulling the manifest and config blob rather
//! than persisted with the artifact record.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::ProcessorConfig;
use crate::error::{ProcessorError, Result};
use crate::model::manifest::is_index_payload;
use crate::model::{Addition, Artifact};
use crate::processor::base::{IndexProcessor, ManifestProcessor};
use crate::processor::registry::ProcessorRegistry;
use crate::processor::{ProcessContext, Processor};
use crate::store::ContentStore;

pub const ARTIFACT_TYPE_NUBIX_IMAGE: &str = "NUBIX_IMAGE";
pub const ADDITION_BUILD_HISTORY: &str = "build_history";

/// Config blob fields lifted into the artifact's extra attributes. `history`
/// doubles as the availability marker for the build-history addition.
const CONFIG_PROPERTIES: [&str; 5] = ["created", "author", "architecture", "os", "history"];

pub struct ImageProcessor {
    store: Arc<dyn ContentStore>,
    manifest_processor: ManifestProcessor,
    index_processor: IndexProcessor,
}

impl ImageProcessor {
    pub fn new(
        store: Arc<dyn ContentStore>,
        registry: &Arc<ProcessorRegistry>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            manifest_processor: ManifestProcessor::new(store.clone(), config.clone())
                .with_properties(CONFIG_PROPERTIES),
            index_processor: IndexProcessor::new(store.clone(), Arc::downgrade(registry), config),
            store,
        }
    }

    fn has_history(artifact: &Artifact) -> bool {
        artifact
            .extra_attrs
            .get("history")
            .and_then(|h| h.as_array())
            .is_some_and(|h| !h.is_empty())
    }
}

#[async_trait]
impl Processor for ImageProcessor {
    async fn abstract_metadata(
        &self,
        ctx: &ProcessContext,
        artifact: &mut Artifact,
        manifest: &[u8],
    ) -> Result<()> {
        if is_index_payload(manifest) {
            self.index_processor
                .abstract_metadata(ctx, artifact, manifest)
                .await
        } else {
            self.manifest_processor
                .abstract_metadata(ctx, artifact, manifest)
                .await
        }
    }

    async fn abstract_addition(
        &self,
        ctx: &ProcessContext,
        artifact: &Artifact,
        addition: &str,
    ) -> Result<Addition> {
        if !self
            .list_addition_types(artifact)
            .iter()
            .any(|name| name == addition)
        {
            return Err(ProcessorError::UnknownAddition(addition.to_string()));
        }

        let manifest = ctx
            .run(self.store.pull_manifest(&artifact.repository_name, &artifact.digest))
            .await
            .map_err(|err| unavailable_on_not_found(err, addition))?;

        let config_desc = manifest.config().ok_or_else(|| {
            ProcessorError::AdditionUnavailable {
                name: addition.to_string(),
                reason: "manifest carries no config descriptor".to_string(),
            }
        })?;

        let blob = ctx
            .run(self.store.pull_blob(&artifact.repository_name, &config_desc.digest))
            .await
            .map_err(|err| unavailable_on_not_found(err, addition))?;

        let config: serde_json::Value = serde_json::from_slice(&blob).map_err(|e| {
            ProcessorError::AdditionUnavailable {
                name: addition.to_string(),
                reason: format!("config blob does not parse: {}", e),
            }
        })?;

        let history = config
            .get("history")
            .ok_or_else(|| ProcessorError::AdditionUnavailable {
                name: addition.to_string(),
                reason: "config blob carries no history".to_string(),
            })?;

        let content = serde_json::to_vec(history).map_err(|e| {
            ProcessorError::AdditionUnavailable {
                name: addition.to_string(),
                reason: e.to_string(),
            }
        })?;
        Ok(Addition::new(content, "application/json"))
    }

    fn artifact_type(&self, _artifact: &Artifact) -> String {
        ARTIFACT_TYPE_NUBIX_IMAGE.to_string()
    }

    fn list_addition_types(&self, artifact: &Artifact) -> Vec<String> {
        if Self::has_history(artifact) {
            vec![ADDITION_BUILD_HISTORY.to_string()]
        } else {
            Vec::new()
        }
    }
}

/// Missing store content degrades an advertised addition to unavailable;
/// cancellation and transport failures pass through untouched.
fn unavailable_on_not_found(err: ProcessorError, addition: &str) -> ProcessorError {
    match err {
        ProcessorError::NotFound(what) => ProcessorError::AdditionUnavailable {
            name: addition.to_string(),
            reason: format!("not found: {}", what),
        },
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::manifest::{MEDIA_TYPE_NUBIX_IMAGE_CONFIG, MEDIA_TYPE_OCI_MANIFEST};
    use crate::store::testing::MemoryStore;

    const REPO: &str = "images/demo";

    fn store_image(
        store: &MemoryStore,
        config_json: &serde_json::Value,
    ) -> (String, String, Vec<u8>) {
        let config_blob = serde_json::to_vec(config_json).unwrap();
        let config_digest = store.put_blob(REPO, &config_blob);
        let payload = serde_json::to_vec(&serde_json::json!({
            "schemaVersion": 2,
            "mediaType": MEDIA_TYPE_OCI_MANIFEST,
            "config": {
                "mediaType": MEDIA_TYPE_NUBIX_IMAGE_CONFIG,
                "digest": config_digest,
                "size": config_blob.len()
            },
            "layers": []
        }))
        .unwrap();
        let manifest_digest = store.put_manifest(REPO, MEDIA_TYPE_OCI_MANIFEST, &payload);
        (manifest_digest, config_digest, payload)
    }

    fn processor_with_store() -> (ImageProcessor, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let registry = Arc::new(ProcessorRegistry::new(
            store.clone(),
            ProcessorConfig::default(),
        ));
        let processor = ImageProcessor::new(store.clone(), &registry, ProcessorConfig::default());
        (processor, store)
    }

    fn config_with_history() -> serde_json::Value {
        serde_json::json!({
            "created": "2024-01-01T00:00:00Z",
            "architecture": "amd64",
            "os": "linux",
            "history": [
                {"created_by": "ADD rootfs.tar /"},
                {"created_by": "CMD [\"/bin/sh\"]", "empty_layer": true}
            ]
        })
    }

    #[tokio::test]
    async fn test_build_history_listed_and_materialized() {
        let (processor, store) = processor_with_store();
        let (manifest_digest, _, payload) = store_image(&store, &config_with_history());

        let mut artifact = Artifact::new(REPO, &manifest_digest);
        let ctx = ProcessContext::background();
        processor
            .abstract_metadata(&ctx, &mut artifact, &payload)
            .await
            .unwrap();

        assert_eq!(processor.artifact_type(&artifact), "NUBIX_IMAGE");
        assert_eq!(
            processor.list_addition_types(&artifact),
            vec![ADDITION_BUILD_HISTORY.to_string()]
        );

        let addition = processor
            .abstract_addition(&ctx, &artifact, ADDITION_BUILD_HISTORY)
            .await
            .unwrap();
        assert_eq!(addition.content_type, "application/json");
        let history: serde_json::Value = serde_json::from_slice(&addition.content).unwrap();
        assert_eq!(history.as_array().unwrap().len(), 2);
        assert_eq!(history[0]["created_by"], "ADD rootfs.tar /");
    }

    #[tokio::test]
    async fn test_no_history_means_no_additions() {
        let (processor, store) = processor_with_store();
        let (manifest_digest, _, payload) =
            store_image(&store, &serde_json::json!({"os": "linux"}));

        let mut artifact = Artifact::new(REPO, &manifest_digest);
        let ctx = ProcessContext::background();
        processor
            .abstract_metadata(&ctx, &mut artifact, &payload)
            .await
            .unwrap();

        assert!(processor.list_addition_types(&artifact).is_empty());
        let err = processor
            .abstract_addition(&ctx, &artifact, ADDITION_BUILD_HISTORY)
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessorError::UnknownAddition(_)));
    }

    #[tokio::test]
    async fn test_unadvertised_name_is_unknown() {
        let (processor, store) = processor_with_store();
        let (manifest_digest, _, payload) = store_image(&store, &config_with_history());

        let mut artifact = Artifact::new(REPO, &manifest_digest);
        let ctx = ProcessContext::background();
        processor
            .abstract_metadata(&ctx, &mut artifact, &payload)
            .await
            .unwrap();

        let err = processor
            .abstract_addition(&ctx, &artifact, "sbom")
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessorError::UnknownAddition(name) if name == "sbom"));
    }

    #[tokio::test]
    async fn test_missing_blob_makes_addition_unavailable() {
        let (processor, store) = processor_with_store();
        let (manifest_digest, config_digest, payload) = store_image(&store, &config_with_history());

        let mut artifact = Artifact::new(REPO, &manifest_digest);
        let ctx = ProcessContext::background();
        processor
            .abstract_metadata(&ctx, &mut artifact, &payload)
            .await
            .unwrap();

        // Blob garbage-collected between abstraction and the addition query
        store.remove_blob(REPO, &config_digest);
        let err = processor
            .abstract_addition(&ctx, &artifact, ADDITION_BUILD_HISTORY)
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessorError::AdditionUnavailable { .. }));
    }
}
