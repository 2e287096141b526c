//! Child resolution for index (manifest list) artifact types
//!
//! Pulls each child manifest, dispatches it through the registry (default
//! processor when the child's type is unregistered) and links the resolved
//! child onto the parent artifact. Children fail independently: a failed child
//! becomes a recorded failure entry, and the call only fails outright when no
//! child resolves at all or the caller's deadline expires.

use futures::StreamExt;
use std::sync::{Arc, Weak};

use crate::config::ProcessorConfig;
use crate::error::{ProcessorError, Result};
use crate::model::{Artifact, Descriptor, FailedReference, Manifest, Reference};
use crate::processor::default::DefaultProcessor;
use crate::processor::registry::ProcessorRegistry;
use crate::processor::{ProcessContext, Processor};
use crate::store::ContentStore;

pub struct IndexProcessor {
    store: Arc<dyn ContentStore>,
    /// Weak so a registry holding this processor does not form a cycle.
    registry: Weak<ProcessorRegistry>,
    fallback: Arc<dyn Processor>,
    config: ProcessorConfig,
}

impl IndexProcessor {
    pub fn new(
        store: Arc<dyn ContentStore>,
        registry: Weak<ProcessorRegistry>,
        config: ProcessorConfig,
    ) -> Self {
        let fallback: Arc<dyn Processor> =
            Arc::new(DefaultProcessor::new(store.clone(), config.clone()));
        Self {
            store,
            registry,
            fallback,
            config,
        }
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
        if !manifest.is_index() {
            return Err(ProcessorError::malformed(
                manifest.media_type(),
                "expected an index, got a single manifest",
            ));
        }

        artifact.manifest_media_type = manifest.media_type().to_string();
        artifact.media_type = manifest.media_type().to_string();
        artifact.size = payload.len() as u64;
        for (key, value) in manifest.annotations() {
            artifact.annotations.insert(key.clone(), value.clone());
        }

        let repository = artifact.repository_name.clone();
        let outcomes: Vec<(Descriptor, Result<Artifact>)> =
            futures::stream::iter(manifest.descriptors().iter().cloned().map(|descriptor| {
                let repository = repository.clone();
                let ctx = ctx.clone();
                async move {
                    let resolved = self.resolve_child(&ctx, &repository, &descriptor).await;
                    (descriptor, resolved)
                }
            }))
            .buffered(self.config.child_concurrency.max(1))
            .collect()
            .await;

        let total = outcomes.len();
        for (descriptor, outcome) in outcomes {
            match outcome {
                Ok(child) => artifact.references.push(Reference {
                    artifact: child,
                    platform: descriptor.platform.clone(),
                }),
                // A deadline expiry is the caller giving up, not a degraded
                // child; nothing written so far may be trusted.
                Err(ProcessorError::Cancelled) => return Err(ProcessorError::Cancelled),
                Err(err) => {
                    tracing::warn!(
                        index = %artifact.digest,
                        child = %descriptor.digest,
                        %err,
                        "failed to resolve index child, continuing"
                    );
                    artifact.failed_references.push(FailedReference {
                        digest: descriptor.digest,
                        media_type: descriptor.media_type,
                        error: err.to_string(),
                    });
                }
            }
        }

        if artifact.references.is_empty() && total > 0 {
            return Err(ProcessorError::IndexUnresolved {
                digest: artifact.digest.clone(),
                failed: artifact.failed_references.len(),
            });
        }
        Ok(())
    }

    async fn resolve_child(
        &self,
        ctx: &ProcessContext,
        repository: &str,
        descriptor: &Descriptor,
    ) -> Result<Artifact> {
        let child_manifest = ctx
            .run(self.store.pull_manifest(repository, &descriptor.digest))
            .await?;

        let media_type = child_manifest
            .config()
            .map(|c| c.media_type.clone())
            .unwrap_or_else(|| child_manifest.media_type().to_string());

        let processor = match self.registry.upgrade() {
            Some(registry) => registry.resolve(&media_type),
            None => self.fallback.clone(),
        };

        let mut child = Artifact::new(repository, &descriptor.digest);
        child.manifest_media_type = child_manifest.media_type().to_string();
        child.media_type = media_type;
        processor
            .abstract_metadata(ctx, &mut child, child_manifest.payload())
            .await?;
        child.artifact_type = processor.artifact_type(&child);
        Ok(child)
    }
}
