//! Artifact and manifest model
//!
//! In-memory representations of pulled manifests and the artifact records the
//! processors populate. [`Manifest`] values are immutable once parsed and are
//! safely shared across tasks; [`Artifact`] records are owned by the ingestion
//! pipeline and only written to by processors.

pub mod artifact;
pub mod descriptor;
pub mod manifest;

pub use artifact::{Addition, Artifact, FailedReference, Reference};
pub use descriptor::{Descriptor, Platform};
pub use manifest::{ImageIndex, ImageManifest, Manifest};
