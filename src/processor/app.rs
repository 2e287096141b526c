//! Processor for Nubix application bundles

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

pub const ARTIFACT_TYPE_NUBIX_APP: &str = "NUBIX_APP";

/// Application-bundle processor: base manifest/index behavior plus the
/// constant type label. App bundles declare no additions.
pub struct AppProcessor {
    manifest_processor: ManifestProcessor,
    index_processor: IndexProcessor,
}

impl AppProcessor {
    pub fn new(
        store: Arc<dyn ContentStore>,
        registry: &Arc<ProcessorRegistry>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            manifest_processor: ManifestProcessor::new(store.clone(), config.clone()),
            index_processor: IndexProcessor::new(store, Arc::downgrade(registry), config),
        }
    }
}

#[async_trait]
impl Processor for AppProcessor {
    async fn abstract_metadata(
        &self,
        ctx: &ProcessContext,
        artifact: &mut Artifact,
        manifest: &[u8],
    ) -> Result<()> {
        // Multi-platform app bundles arrive as indexes
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
        _ctx: &ProcessContext,
        _artifact: &Artifact,
        addition: &str,
    ) -> Result<Addition> {
        Err(ProcessorError::UnknownAddition(addition.to_string()))
    }

    fn artifact_type(&self, _artifact: &Artifact) -> String {
        ARTIFACT_TYPE_NUBIX_APP.to_string()
    }

    fn list_addition_types(&self, _artifact: &Artifact) -> Vec<String> {
        Vec::new()
    }
}
