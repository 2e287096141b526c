//! Processor registry: the dispatch core
//!
//! A process-scoped directory from media type to processor. Constructed once
//! at startup and passed by handle, never an ambient singleton, so tests get a
//! fresh registry each. Registration happens during startup; lookups are the
//! hot path and proceed concurrently under the read lock. The lock only ever
//! guards the map itself, never manifest parsing or blob I/O.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::config::ProcessorConfig;
use crate::processor::default::DefaultProcessor;
use crate::processor::Processor;
use crate::store::ContentStore;

pub struct ProcessorRegistry {
    entries: RwLock<HashMap<String, Arc<dyn Processor>>>,
    fallback: Arc<dyn Processor>,
}

impl ProcessorRegistry {
    /// Build a registry whose fallback is a [`DefaultProcessor`] over the
    /// given store.
    pub fn new(store: Arc<dyn ContentStore>, config: ProcessorConfig) -> Self {
        Self::with_fallback(Arc::new(DefaultProcessor::new(store, config)))
    }

    pub fn with_fallback(fallback: Arc<dyn Processor>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            fallback,
        }
    }

    /// Bind a processor to a media type. The first successful registration
    /// wins; later attempts fail with `DuplicateMediaType` and leave the
    /// existing binding untouched.
    pub fn register(
        &self,
        processor: Arc<dyn Processor>,
        media_type: &str,
    ) -> crate::error::Result<()> {
        let mut entries = self
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if entries.contains_key(media_type) {
            return Err(crate::error::ProcessorError::DuplicateMediaType(
                media_type.to_string(),
            ));
        }
        entries.insert(media_type.to_string(), processor);
        Ok(())
    }

    /// Exact-match lookup. `None` means unregistered; the ingestion pipeline
    /// applies its own fallback policy.
    pub fn get(&self, media_type: &str) -> Option<Arc<dyn Processor>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(media_type)
            .cloned()
    }

    /// Lookup with the default-processor fallback, used when resolving index
    /// children of unregistered types.
    pub fn resolve(&self, media_type: &str) -> Arc<dyn Processor> {
        self.get(media_type)
            .unwrap_or_else(|| self.fallback.clone())
    }

    pub fn default_processor(&self) -> Arc<dyn Processor> {
        self.fallback.clone()
    }

    /// Registered media types, sorted, for diagnostics.
    pub fn media_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        types.sort();
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProcessorError;
    use crate::model::{Addition, Artifact};
    use crate::processor::ProcessContext;
    use crate::store::testing::MemoryStore;
    use async_trait::async_trait;

    struct LabelOnly(&'static str);

    #[async_trait]
    impl Processor for LabelOnly {
        async fn abstract_metadata(
            &self,
            _ctx: &ProcessContext,
            _artifact: &mut Artifact,
            _manifest: &[u8],
        ) -> crate::error::Result<()> {
            Ok(())
        }

        async fn abstract_addition(
            &self,
            _ctx: &ProcessContext,
            _artifact: &Artifact,
            addition: &str,
        ) -> crate::error::Result<Addition> {
            Err(ProcessorError::UnknownAddition(addition.to_string()))
        }

        fn artifact_type(&self, _artifact: &Artifact) -> String {
            self.0.to_string()
        }

        fn list_addition_types(&self, _artifact: &Artifact) -> Vec<String> {
            Vec::new()
        }
    }

    fn registry() -> ProcessorRegistry {
        ProcessorRegistry::new(Arc::new(MemoryStore::new()), ProcessorConfig::default())
    }

    #[test]
    fn test_distinct_media_types_resolve_distinct_processors() {
        let registry = registry();
        let a: Arc<dyn Processor> = Arc::new(LabelOnly("A"));
        let b: Arc<dyn Processor> = Arc::new(LabelOnly("B"));
        registry.register(a.clone(), "application/vnd.a+json").unwrap();
        registry.register(b.clone(), "application/vnd.b+json").unwrap();

        let got_a = registry.get("application/vnd.a+json").unwrap();
        let got_b = registry.get("application/vnd.b+json").unwrap();
        assert!(Arc::ptr_eq(&got_a, &a));
        assert!(Arc::ptr_eq(&got_b, &b));
        assert!(!Arc::ptr_eq(&got_a, &got_b));
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let registry = registry();
        let first: Arc<dyn Processor> = Arc::new(LabelOnly("FIRST"));
        let second: Arc<dyn Processor> = Arc::new(LabelOnly("SECOND"));

        registry.register(first.clone(), "application/vnd.x+json").unwrap();
        let err = registry
            .register(second, "application/vnd.x+json")
            .unwrap_err();
        assert!(matches!(err, ProcessorError::DuplicateMediaType(mt) if mt == "application/vnd.x+json"));

        let retained = registry.get("application/vnd.x+json").unwrap();
        assert!(Arc::ptr_eq(&retained, &first));
    }

    #[test]
    fn test_lookup_is_case_sensitive_and_misses_return_none() {
        let registry = registry();
        registry
            .register(Arc::new(LabelOnly("A")), "application/vnd.a+json")
            .unwrap();
        assert!(registry.get("application/vnd.A+json").is_none());
        assert!(registry.get("application/vnd.other+json").is_none());
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let registry = registry();
        let resolved = registry.resolve("application/vnd.never.registered+json");
        assert!(Arc::ptr_eq(&resolved, &registry.default_processor()));
    }

    #[test]
    fn test_media_types_sorted() {
        let registry = registry();
        registry.register(Arc::new(LabelOnly("B")), "b/type").unwrap();
        registry.register(Arc::new(LabelOnly("A")), "a/type").unwrap();
        assert_eq!(registry.media_types(), vec!["a/type".to_string(), "b/type".to_string()]);
    }

    #[test]
    fn test_concurrent_registration_single_winner() {
        let registry = Arc::new(registry());
        let mut handles = Vec::new();
        for i in 0..8 {
            let registry = registry.clone();
            handles.push(std::thread::spawn(move || {
                let label: &'static str = if i % 2 == 0 { "EVEN" } else { "ODD" };
                registry
                    .register(Arc::new(LabelOnly(label)), "application/vnd.race+json")
                    .is_ok()
            }));
        }
        let wins: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();
        assert_eq!(wins, 1);
        assert!(registry.get("application/vnd.race+json").is_some());
    }
}
