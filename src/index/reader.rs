//! Immutable reader over one flushed index generation
//!
//! A reader is built once by a flush and never mutated afterwards; readers
//! acquired by callers see a frozen view regardless of later commits.
//! Closing a reader drops its postings and is observable via `is_closed`.

use parking_lot::RwLock;
use roaring::RoaringTreemap;
use std::collections::HashMap;

use crate::error::{CuttleError, Result};
use crate::models::DocumentId;
use crate::tracker::ReaderResource;

struct ReaderInner {
    /// Term -> set of document IDs containing it
    postings: HashMap<String, RoaringTreemap>,
    /// All live document IDs in this generation
    live: RoaringTreemap,
}

/// Immutable inverted index over one language's committed documents
pub struct IndexReader {
    inner: RwLock<Option<ReaderInner>>,
}

impl IndexReader {
    /// Create an empty reader (generation 0, before the first commit)
    pub fn empty() -> Self {
        Self::from_parts(HashMap::new(), RoaringTreemap::new())
    }

    pub(crate) fn from_parts(
        postings: HashMap<String, RoaringTreemap>,
        live: RoaringTreemap,
    ) -> Self {
        Self {
            inner: RwLock::new(Some(ReaderInner { postings, live })),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&ReaderInner) -> T) -> Result<T> {
        let guard = self.inner.read();
        match guard.as_ref() {
            Some(inner) => Ok(f(inner)),
            None => Err(CuttleError::UseAfterRelease),
        }
    }

    /// Number of live documents visible to this reader
    pub fn doc_count(&self) -> Result<u64> {
        self.read(|inner| inner.live.len())
    }

    /// Number of documents containing the given analyzed term
    pub fn term_hits(&self, term: &str) -> Result<u64> {
        self.read(|inner| inner.postings.get(term).map_or(0, |p| p.len()))
    }

    /// Document IDs containing the given analyzed term
    pub fn search(&self, term: &str) -> Result<RoaringTreemap> {
        self.read(|inner| inner.postings.get(term).cloned().unwrap_or_default())
    }

    /// Check whether a document is visible to this reader
    pub fn contains(&self, doc_id: DocumentId) -> Result<bool> {
        self.read(|inner| inner.live.contains(doc_id))
    }

    /// Number of distinct terms in this generation
    pub fn term_count(&self) -> Result<usize> {
        self.read(|inner| inner.postings.len())
    }
}

impl ReaderResource for IndexReader {
    fn close(&self) {
        let mut guard = self.inner.write();
        *guard = None;
    }

    fn is_closed(&self) -> bool {
        self.inner.read().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_reader() -> IndexReader {
        let mut postings = HashMap::new();
        let mut quartz = RoaringTreemap::new();
        quartz.insert(1);
        quartz.insert(2);
        postings.insert("quartz".to_string(), quartz);

        let mut live = RoaringTreemap::new();
        live.insert(1);
        live.insert(2);
        live.insert(3);

        IndexReader::from_parts(postings, live)
    }

    #[test]
    fn test_reader_queries() {
        let reader = sample_reader();
        assert_eq!(reader.doc_count().unwrap(), 3);
        assert_eq!(reader.term_hits("quartz").unwrap(), 2);
        assert_eq!(reader.term_hits("basalt").unwrap(), 0);
        assert!(reader.contains(3).unwrap());
        assert!(!reader.contains(4).unwrap());
        assert_eq!(reader.search("quartz").unwrap().len(), 2);
    }

    #[test]
    fn test_close_is_observable() {
        let reader = sample_reader();
        assert!(!reader.is_closed());

        reader.close();
        assert!(reader.is_closed());
        assert!(matches!(
            reader.doc_count(),
            Err(CuttleError::UseAfterRelease)
        ));
        assert!(matches!(
            reader.term_hits("quartz"),
            Err(CuttleError::UseAfterRelease)
        ));
    }

    #[test]
    fn test_empty_reader() {
        let reader = IndexReader::empty();
        assert_eq!(reader.doc_count().unwrap(), 0);
        assert_eq!(reader.term_count().unwrap(), 0);
    }
}
