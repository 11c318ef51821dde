//! Per-language index writer
//!
//! The writer owns the committed document state for one language. A commit
//! applies its batch to a staged copy first; the committed state is only
//! promoted after the flushed generation has been durably written, so a
//! failed commit leaves both the writer and in-flight readers untouched.

use roaring::RoaringTreemap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::reader::IndexReader;
use crate::config::TokenizerConfig;
use crate::models::{BatchOp, DocumentBatch, DocumentId, FacetLabel, LanguageCode};
use crate::tokenizer::Tokenizer;

/// Analyzed form of a committed document
#[derive(Clone, Debug, Serialize, Deserialize)]
pub(crate) struct StoredDoc {
    pub terms: Vec<String>,
    pub facets: Vec<FacetLabel>,
}

/// Committed document state keyed by document ID
pub(crate) type CommittedDocs = BTreeMap<DocumentId, StoredDoc>;

pub struct IndexWriter {
    tokenizer: Tokenizer,
    committed: CommittedDocs,
}

impl IndexWriter {
    pub fn new(code: &LanguageCode, config: &TokenizerConfig) -> Self {
        Self {
            tokenizer: Tokenizer::for_language(config, code),
            committed: CommittedDocs::new(),
        }
    }

    /// Apply a batch to a staged copy of the committed state.
    /// The committed state itself is not modified.
    pub(crate) fn apply(&self, batch: &DocumentBatch) -> CommittedDocs {
        let mut staged = self.committed.clone();
        for op in batch.iter() {
            match op {
                BatchOp::Add(doc) => {
                    staged.insert(doc.id, self.analyze(doc.content.as_str(), &doc.facets));
                }
                BatchOp::Update(id, doc) => {
                    staged.insert(*id, self.analyze(doc.content.as_str(), &doc.facets));
                }
                BatchOp::Delete(id) => {
                    staged.remove(id);
                }
            }
        }
        staged
    }

    fn analyze(&self, content: &str, facets: &[FacetLabel]) -> StoredDoc {
        StoredDoc {
            terms: self.tokenizer.tokenize(content),
            facets: facets.to_vec(),
        }
    }

    /// Build an immutable reader over a document state
    pub(crate) fn build_reader(docs: &CommittedDocs) -> IndexReader {
        let mut postings: HashMap<String, RoaringTreemap> = HashMap::new();
        let mut live = RoaringTreemap::new();

        for (doc_id, doc) in docs {
            live.insert(*doc_id);
            for term in &doc.terms {
                postings.entry(term.clone()).or_default().insert(*doc_id);
            }
        }

        IndexReader::from_parts(postings, live)
    }

    /// Promote a staged state after its generation was durably flushed
    pub(crate) fn promote(&mut self, staged: CommittedDocs) {
        self.committed = staged;
    }

    /// Restore committed state loaded from the store
    pub(crate) fn restore(&mut self, docs: CommittedDocs) {
        self.committed = docs;
    }

    pub(crate) fn committed(&self) -> &CommittedDocs {
        &self.committed
    }

    pub fn doc_count(&self) -> u64 {
        self.committed.len() as u64
    }
}
