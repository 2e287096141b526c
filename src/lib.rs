//! Nubix artifact processor core
//!
//! Dispatch-and-extraction core for the Nubix registry: maps a manifest's
//! declared media type to a processor that parses the manifest, abstracts
//! structured metadata onto a canonical artifact record, resolves
//! multi-platform indexes into child artifacts, and exposes named additions
//! (build history and the like) on demand.
//!
//! The registry is an explicit, process-scoped object:
//!
//! ```no_run
//! use std::sync::Arc;
//! use nubix_artifact_processor::{
//!     register_builtin, Artifact, ProcessContext, Processor, ProcessorConfig, ProcessorRegistry,
//! };
//! use nubix_artifact_processor::store::HttpContentStore;
//!
//! # async fn example(manifest_bytes: &[u8], media_type: &str) -> nubix_artifact_processor::Result<()> {
//! let store = Arc::new(HttpContentStore::builder("https://registry.example.com").build()?);
//! let config = ProcessorConfig::default();
//! let registry = Arc::new(ProcessorRegistry::new(store.clone(), config.clone()));
//! register_builtin(&registry, store, &config);
//!
//! let mut artifact = Artifact::new("library/demo", "sha256:abcd");
//! artifact.manifest_media_type = media_type.to_string();
//! let processor = registry.resolve(media_type);
//! processor
//!     .abstract_metadata(&ProcessContext::background(), &mut artifact, manifest_bytes)
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod digest;
pub mod error;
pub mod model;
pub mod processor;
pub mod store;

pub use config::ProcessorConfig;
pub use error::{ProcessorError, Result};
pub use model::{Addition, Artifact, Manifest};
pub use processor::{
    register_builtin, ProcessContext, Processor, ProcessorRegistry,
};
pub use store::ContentStore;
