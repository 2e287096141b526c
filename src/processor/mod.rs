//! Artifact processor dispatch core
//!
//! Every artifact type plugs into the same contract: the [`Processor`] trait.
//! At startup the concrete processors register against their media types in a
//! [`ProcessorRegistry`]; at ingestion time the pipeline looks up the
//! processor for a manifest's declared media type and invokes it to abstract
//! metadata and, lazily, additions.

pub mod app;
pub mod base;
pub mod context;
pub mod default;
pub mod image;
pub mod registry;

pub use app::{AppProcessor, ARTIFACT_TYPE_NUBIX_APP};
pub use context::ProcessContext;
pub use default::{DefaultProcessor, ARTIFACT_TYPE_UNKNOWN};
pub use image::{ImageProcessor, ADDITION_BUILD_HISTORY, ARTIFACT_TYPE_NUBIX_IMAGE};
pub use registry::ProcessorRegistry;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::ProcessorConfig;
use crate::error::Result;
use crate::model::manifest::{MEDIA_TYPE_NUBIX_APP_CONFIG, MEDIA_TYPE_NUBIX_IMAGE_CONFIG};
use crate::model::{Addition, Artifact};
use crate::store::ContentStore;

/// Capability contract implemented by every artifact-type plugin.
///
/// For a given artifact, `abstract_metadata` must have completed before
/// additions are queried: addition availability may depend on fields the
/// abstraction wrote.
#[async_trait]
pub trait Processor: Send + Sync {
    /// Parse manifest bytes and write the extracted fields onto the artifact.
    async fn abstract_metadata(
        &self,
        ctx: &ProcessContext,
        artifact: &mut Artifact,
        manifest: &[u8],
    ) -> Result<()>;

    /// Materialize one named addition on demand, re-pulling content as needed.
    async fn abstract_addition(
        &self,
        ctx: &ProcessContext,
        artifact: &Artifact,
        addition: &str,
    ) -> Result<Addition>;

    /// Canonical type label for this media type family, e.g. `NUBIX_APP`.
    fn artifact_type(&self, artifact: &Artifact) -> String;

    /// Addition names currently available for this artifact. Exactly the set
    /// of names `abstract_addition` accepts; empty when none exist.
    fn list_addition_types(&self, artifact: &Artifact) -> Vec<String>;
}

/// Register the built-in processors against their media types.
///
/// Called once per process lifetime before lookup traffic begins. A duplicate
/// registration leaves the winning processor in place and is logged rather
/// than treated as fatal, so a misconfigured plugin set degrades instead of
/// taking the service down.
pub fn register_builtin(
    registry: &Arc<ProcessorRegistry>,
    store: Arc<dyn ContentStore>,
    config: &ProcessorConfig,
) {
    let bindings: [(Arc<dyn Processor>, &str); 2] = [
        (
            Arc::new(AppProcessor::new(store.clone(), registry, config.clone())),
            MEDIA_TYPE_NUBIX_APP_CONFIG,
        ),
        (
            Arc::new(ImageProcessor::new(store, registry, config.clone())),
            MEDIA_TYPE_NUBIX_IMAGE_CONFIG,
        ),
    ];

    for (processor, media_type) in bindings {
        if let Err(err) = registry.register(processor, media_type) {
            tracing::error!(media_type, %err, "failed to register processor");
        }
    }
}
