//! Composite snapshot handed to query callers
//!
//! A snapshot bundles one generation reference per acquired language plus
//! one taxonomy generation, created atomically by the coordinator and
//! immutable afterwards. Reads present a merged view over the per-language
//! readers (a logical union, not a copy).
//!
//! Release is exactly-once: an explicit second release is rejected with
//! `DoubleRelease`, and a snapshot dropped without being released gives its
//! references back on drop so an error path in the calling query can never
//! pin retired generations forever.

use roaring::RoaringTreemap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;

use crate::error::{CuttleError, Result};
use crate::index::{FacetReader, IndexReader};
use crate::models::{DocumentId, FacetLabel, LanguageCode};
use crate::tracker::registry::{LanguageTrackerSet, TrackerEntry};
use crate::tracker::Generation;

pub(crate) struct SnapshotPart {
    pub(crate) code: LanguageCode,
    pub(crate) gen: Arc<Generation<IndexReader>>,
    pub(crate) entry: Arc<TrackerEntry>,
}

pub struct Snapshot {
    owner: Arc<LanguageTrackerSet>,
    parts: Vec<SnapshotPart>,
    taxonomy: Arc<Generation<FacetReader>>,
    released: AtomicBool,
}

impl std::fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Snapshot")
            .field("languages", &self.parts.iter().map(|p| &p.code).collect::<Vec<_>>())
            .field("released", &self.released.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Snapshot {
    pub(crate) fn new(
        owner: Arc<LanguageTrackerSet>,
        parts: Vec<SnapshotPart>,
        taxonomy: Arc<Generation<FacetReader>>,
    ) -> Self {
        Self {
            owner,
            parts,
            taxonomy,
            released: AtomicBool::new(false),
        }
    }

    pub(crate) fn parts(&self) -> &[SnapshotPart] {
        &self.parts
    }

    pub(crate) fn taxonomy_gen(&self) -> &Arc<Generation<FacetReader>> {
        &self.taxonomy
    }

    /// Flip the released flag; false when it was already set
    pub(crate) fn try_mark_released(&self) -> bool {
        !self.released.swap(true, Ordering::SeqCst)
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    fn guard(&self) -> Result<()> {
        if self.is_released() {
            Err(CuttleError::UseAfterRelease)
        } else {
            Ok(())
        }
    }

    /// Languages covered by this snapshot, in acquisition order
    pub fn languages(&self) -> Vec<LanguageCode> {
        self.parts.iter().map(|p| p.code.clone()).collect()
    }

    /// Total live documents across all covered languages
    pub fn doc_count(&self) -> Result<u64> {
        self.guard()?;
        let mut total = 0;
        for part in &self.parts {
            total += part.gen.reader().doc_count()?;
        }
        Ok(total)
    }

    /// Live documents in one covered language, `None` if not covered
    pub fn language_doc_count(&self, code: &LanguageCode) -> Result<Option<u64>> {
        self.guard()?;
        match self.parts.iter().find(|p| &p.code == code) {
            Some(part) => Ok(Some(part.gen.reader().doc_count()?)),
            None => Ok(None),
        }
    }

    /// Number of documents containing the analyzed term, across languages
    pub fn term_hits(&self, term: &str) -> Result<u64> {
        self.guard()?;
        let mut total = 0;
        for part in &self.parts {
            total += part.gen.reader().term_hits(term)?;
        }
        Ok(total)
    }

    /// Merged document IDs containing the analyzed term, ascending
    pub fn search(&self, term: &str) -> Result<Vec<DocumentId>> {
        self.guard()?;
        let mut merged = RoaringTreemap::new();
        for part in &self.parts {
            merged |= part.gen.reader().search(term)?;
        }
        Ok(merged.iter().collect())
    }

    /// Labels known to the taxonomy generation paired with this snapshot
    pub fn facet_count(&self) -> Result<u64> {
        self.guard()?;
        self.taxonomy.reader().label_count()
    }

    pub fn has_facet(&self, label: &FacetLabel) -> Result<bool> {
        self.guard()?;
        self.taxonomy.reader().contains(label)
    }

    /// Sequence number of the generation acquired for a language
    pub fn generation(&self, code: &LanguageCode) -> Option<u64> {
        self.parts
            .iter()
            .find(|p| &p.code == code)
            .map(|p| p.gen.seq())
    }

    pub fn taxonomy_generation(&self) -> u64 {
        self.taxonomy.seq()
    }
}

impl Drop for Snapshot {
    fn drop(&mut self) {
        if !self.is_released() {
            warn!("snapshot dropped without explicit release");
            let _ = self.owner.release(self);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IndexConfig;
    use crate::models::{Document, DocumentBatch};

    fn en() -> LanguageCode {
        LanguageCode::new("en").unwrap()
    }

    fn populated_set() -> Arc<LanguageTrackerSet> {
        let set = LanguageTrackerSet::open(IndexConfig::default()).unwrap();
        set.commit(
            &en(),
            &DocumentBatch::new()
                .add(Document::new(1, "quartz vein").with_facet("keyword", "geology"))
                .add(Document::new(2, "basalt flow")),
        )
        .unwrap();
        set
    }

    #[test]
    fn test_merged_view() {
        let set = populated_set();
        let snapshot = set.acquire_snapshot(None).unwrap();

        assert_eq!(snapshot.doc_count().unwrap(), 2);
        assert_eq!(snapshot.term_hits("quartz").unwrap(), 1);
        assert_eq!(snapshot.search("quartz").unwrap(), vec![1]);
        assert_eq!(snapshot.language_doc_count(&en()).unwrap(), Some(2));
        assert!(snapshot
            .has_facet(&FacetLabel::new("keyword", "geology"))
            .unwrap());
        assert_eq!(snapshot.facet_count().unwrap(), 1);

        set.release(&snapshot).unwrap();
    }

    #[test]
    fn test_reads_rejected_after_release() {
        let set = populated_set();
        let snapshot = set.acquire_snapshot(None).unwrap();
        set.release(&snapshot).unwrap();

        assert!(snapshot.is_released());
        assert!(matches!(
            snapshot.doc_count(),
            Err(CuttleError::UseAfterRelease)
        ));
        assert!(matches!(
            snapshot.search("quartz"),
            Err(CuttleError::UseAfterRelease)
        ));
    }

    #[test]
    fn test_double_release_rejected() {
        let set = populated_set();
        let snapshot = set.acquire_snapshot(None).unwrap();
        set.release(&snapshot).unwrap();

        assert!(matches!(
            set.release(&snapshot),
            Err(CuttleError::DoubleRelease)
        ));
    }

    #[test]
    fn test_drop_releases_references() {
        let set = populated_set();
        let gen = {
            let snapshot = set.acquire_snapshot(None).unwrap();
            snapshot.parts()[0].gen.clone()
        };
        // Dropped without an explicit release; the reference must be gone
        let tracker = set.tracker(&en()).unwrap();
        assert_eq!(tracker.current_ref_count(), Some(1));
        assert_eq!(gen.ref_count(), 1);
    }

    #[test]
    fn test_generation_accessors() {
        let set = populated_set();
        let snapshot = set.acquire_snapshot(None).unwrap();
        assert_eq!(snapshot.generation(&en()), Some(1));
        assert_eq!(snapshot.taxonomy_generation(), 1);
        assert_eq!(snapshot.generation(&LanguageCode::new("xx").unwrap()), None);
        set.release(&snapshot).unwrap();
    }
}
