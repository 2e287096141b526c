//! Processor configuration
//!
//! Size ceilings protect the process from hostile or broken registry entries;
//! a manifest or config blob above the ceiling is rejected instead of loaded.

/// 4MB default ceiling for manifest payloads.
pub const DEFAULT_MAX_MANIFEST_SIZE: u64 = 4 * 1024 * 1024;

/// 1MB default ceiling for config blobs pulled during metadata abstraction.
pub const DEFAULT_MAX_CONFIG_BLOB_SIZE: u64 = 1024 * 1024;

/// Default number of index children pulled concurrently.
pub const DEFAULT_CHILD_CONCURRENCY: usize = 4;

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Largest manifest payload accepted for abstraction.
    pub max_manifest_size: u64,
    /// Largest config blob pulled from the content store.
    pub max_config_blob_size: u64,
    /// Bound on concurrent child manifest pulls when resolving an index.
    pub child_concurrency: usize,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_manifest_size: DEFAULT_MAX_MANIFEST_SIZE,
            max_config_blob_size: DEFAULT_MAX_CONFIG_BLOB_SIZE,
            child_concurrency: DEFAULT_CHILD_CONCURRENCY,
        }
    }
}

impl ProcessorConfig {
    pub fn with_max_manifest_size(mut self, limit: u64) -> Self {
        self.max_manifest_size = limit;
        self
    }

    pub fn with_max_config_blob_size(mut self, limit: u64) -> Self {
        self.max_config_blob_size = limit;
        self
    }

    pub fn with_child_concurrency(mut self, concurrency: usize) -> Self {
        self.child_concurrency = concurrency.max(1);
        self
    }
}
