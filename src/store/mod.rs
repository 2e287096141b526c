//! Content store access
//!
//! The processor core never talks to the registry backend directly; it pulls
//! manifests and blobs through the narrow [`ContentStore`] interface. The
//! default implementation is the HTTP client in [`client`], tests use an
//! in-memory double.

pub mod client;

pub use client::{HttpContentStore, HttpContentStoreBuilder};

use async_trait::async_trait;

use crate::error::Result;
use crate::model::Manifest;

/// Blocking-I/O boundary to the content-addressable store.
///
/// Implementations must surface a [`ProcessorError::NotFound`] for missing
/// digests so callers can distinguish absence from transport failure.
///
/// [`ProcessorError::NotFound`]: crate::error::ProcessorError::NotFound
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Pull and parse a manifest by tag or digest.
    async fn pull_manifest(&self, repository: &str, reference: &str) -> Result<Manifest>;

    /// Pull a blob by digest.
    async fn pull_blob(&self, repository: &str, digest: &str) -> Result<Vec<u8>>;
}
