//! Search facade
//!
//! The externally visible entry point the query and indexing layers call.
//! Thin by design: all lifecycle logic lives in the tracker set, this type
//! just pins the configuration and exposes the contract surface.

use std::sync::Arc;

use crate::config::IndexConfig;
use crate::error::Result;
use crate::metrics::TrackerMetrics;
use crate::models::{DocumentBatch, LanguageCode};
use crate::snapshot::Snapshot;
use crate::tracker::registry::LanguageTrackerSet;

pub struct SearchManager {
    set: Arc<LanguageTrackerSet>,
}

impl SearchManager {
    /// Open a manager, reloading persisted state when the configuration
    /// names a data directory
    pub fn new(config: IndexConfig) -> Result<Self> {
        Ok(Self {
            set: LanguageTrackerSet::open(config)?,
        })
    }

    /// Purely in-memory manager with default configuration
    pub fn in_memory() -> Self {
        Self::new(IndexConfig::default()).expect("in-memory manager cannot fail to open")
    }

    /// Acquire a composite snapshot over the given languages, or over all
    /// registered languages when unfiltered. The caller must release it.
    pub fn acquire_snapshot(&self, filter: Option<&[LanguageCode]>) -> Result<Snapshot> {
        self.set.acquire_snapshot(filter)
    }

    /// Release a snapshot. A second release of the same snapshot fails with
    /// `DoubleRelease`.
    pub fn release(&self, snapshot: &Snapshot) -> Result<()> {
        self.set.release(snapshot)
    }

    /// Commit a document batch to one language, preceded by the paired
    /// taxonomy commit. The language tracker is created lazily on its first
    /// batch.
    pub fn commit(&self, language: &LanguageCode, batch: &DocumentBatch) -> Result<u64> {
        self.set.commit(language, batch)
    }

    pub fn register_language(&self, code: &LanguageCode) -> Result<()> {
        self.set.register(code)
    }

    /// Retire a language; deferred until the last snapshot referencing it
    /// is released
    pub fn retire_language(&self, code: &LanguageCode) -> Result<()> {
        self.set.retire(code)
    }

    /// Languages currently visible to acquisitions
    pub fn languages(&self) -> Vec<LanguageCode> {
        self.set.languages()
    }

    // Telemetry passthroughs, used by operators and lifecycle tests.

    pub fn current_generation(&self, code: &LanguageCode) -> Option<u64> {
        self.set.tracker(code).and_then(|t| t.current_seq())
    }

    pub fn current_ref_count(&self, code: &LanguageCode) -> Option<u32> {
        self.set.tracker(code).and_then(|t| t.current_ref_count())
    }

    pub fn open_generations(&self) -> usize {
        self.set.open_generation_count()
    }

    pub fn retired_generations(&self) -> usize {
        self.set.retired_generation_count()
    }

    pub fn taxonomy_generation(&self) -> Option<u64> {
        self.set.taxonomy().current_seq()
    }

    pub fn metrics(&self) -> &TrackerMetrics {
        self.set.metrics()
    }
}

impl Default for SearchManager {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;

    #[test]
    fn test_facade_roundtrip() {
        let manager = SearchManager::in_memory();
        let en = LanguageCode::new("en").unwrap();

        manager
            .commit(&en, &DocumentBatch::new().add(Document::new(1, "quartz")))
            .unwrap();

        let snapshot = manager.acquire_snapshot(None).unwrap();
        assert_eq!(snapshot.term_hits("quartz").unwrap(), 1);
        manager.release(&snapshot).unwrap();

        assert_eq!(manager.languages(), vec![en.clone()]);
        assert_eq!(manager.current_generation(&en), Some(1));
        assert_eq!(manager.retired_generations(), 0);
    }

    #[test]
    fn test_register_then_acquire_empty_language() {
        let manager = SearchManager::in_memory();
        let fi = LanguageCode::new("fi").unwrap();
        manager.register_language(&fi).unwrap();

        let snapshot = manager.acquire_snapshot(Some(std::slice::from_ref(&fi))).unwrap();
        assert_eq!(snapshot.doc_count().unwrap(), 0);
        manager.release(&snapshot).unwrap();
    }
}
