use serde::{Deserialize, Serialize};

use super::document::{Document, DocumentId, FacetLabel};

/// A single pending change in a commit batch
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum BatchOp {
    /// Add a document (replaces an existing document with the same ID)
    Add(Document),
    /// Update a document in place
    Update(DocumentId, Document),
    /// Remove a document (unknown IDs are ignored)
    Delete(DocumentId),
}

/// An ordered batch of document changes applied by one commit
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DocumentBatch {
    ops: Vec<BatchOp>,
}

impl DocumentBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, doc: Document) -> Self {
        self.ops.push(BatchOp::Add(doc));
        self
    }

    pub fn update(mut self, id: DocumentId, doc: Document) -> Self {
        self.ops.push(BatchOp::Update(id, doc));
        self
    }

    pub fn delete(mut self, id: DocumentId) -> Self {
        self.ops.push(BatchOp::Delete(id));
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BatchOp> {
        self.ops.iter()
    }

    /// Collect the facet labels introduced by this batch, in order of
    /// appearance. These must be committed to the taxonomy tracker before
    /// the language commit so newly visible documents never reference labels
    /// that do not yet exist.
    pub fn facet_labels(&self) -> Vec<FacetLabel> {
        let mut labels = Vec::new();
        for op in &self.ops {
            let doc = match op {
                BatchOp::Add(doc) => doc,
                BatchOp::Update(_, doc) => doc,
                BatchOp::Delete(_) => continue,
            };
            for label in &doc.facets {
                if !labels.contains(label) {
                    labels.push(label.clone());
                }
            }
        }
        labels
    }
}
