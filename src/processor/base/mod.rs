//! Shared processor building blocks
//!
//! Concrete processors compose these by delegation: [`ManifestProcessor`] for
//! single-manifest artifact types, [`IndexProcessor`] for multi-manifest
//! (index / manifest-list) types.

pub mod index;
pub mod manifest;

pub use index::IndexProcessor;
pub use manifest::ManifestProcessor;
