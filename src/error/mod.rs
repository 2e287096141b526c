//! Error types for the artifact processor core

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcessorError>;

/// Errors surfaced by processor dispatch, metadata abstraction and addition
/// extraction.
///
/// Registration duplicates and per-child index failures are recoverable at the
/// call site; everything else fails the ingestion request for the artifact
/// involved. Errors carry the media type, digest or addition name they refer
/// to so callers never see a bare generic failure.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// A processor is already bound to the media type; the first registration
    /// is retained.
    #[error("a processor is already registered for media type {0}")]
    DuplicateMediaType(String),

    /// Payload bytes do not parse per the declared manifest schema.
    #[error("malformed manifest ({media_type}): {reason}")]
    MalformedManifest { media_type: String, reason: String },

    /// The manifest references a config blob the content store does not have.
    #[error("config blob {digest} is missing from the content store")]
    MissingConfigBlob { digest: String },

    /// A manifest or config blob exceeds the configured size ceiling.
    #[error("payload of {size} bytes exceeds the {limit} byte ceiling")]
    PayloadTooLarge { size: u64, limit: u64 },

    /// The addition name is not one the processor advertises for the artifact.
    #[error("unknown addition: {0}")]
    UnknownAddition(String),

    /// The addition is advertised but its content cannot be retrieved.
    #[error("addition {name} is unavailable: {reason}")]
    AdditionUnavailable { name: String, reason: String },

    /// The caller's deadline expired before the operation completed. Fields
    /// already written to the artifact must not be treated as complete.
    #[error("operation cancelled by caller deadline")]
    Cancelled,

    /// Propagated from the content store for missing digests.
    #[error("not found: {0}")]
    NotFound(String),

    /// No child of an index manifest could be resolved.
    #[error("index {digest}: none of the {failed} referenced manifests could be resolved")]
    IndexUnresolved { digest: String, failed: usize },

    /// Content store transport failure that is not a missing digest.
    #[error("content store error: {0}")]
    Store(String),
}

impl ProcessorError {
    pub fn malformed(media_type: impl Into<String>, reason: impl Into<String>) -> Self {
        ProcessorError::MalformedManifest {
            media_type: media_type.into(),
            reason: reason.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ProcessorError::NotFound(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProcessorError::Cancelled)
    }
}

impl From<reqwest::Error> for ProcessorError {
    fn from(err: reqwest::Error) -> Self {
        ProcessorError::Store(err.to_string())
    }
}

impl From<url::ParseError> for ProcessorError {
    fn from(err: url::ParseError) -> Self {
        ProcessorError::Store(format!("invalid registry address: {}", err))
    }
}
