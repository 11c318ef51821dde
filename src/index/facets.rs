//! Shared taxonomy (facet) writer and reader
//!
//! The taxonomy is a single label registry shared by all languages: each
//! distinct `FacetLabel` is assigned a stable ordinal on first sight.
//! Ordinals are never reused, so documents committed against an older
//! taxonomy generation remain valid against every newer one.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CuttleError, Result};
use crate::models::FacetLabel;
use crate::tracker::ReaderResource;

/// Serializable taxonomy state: label ordinals plus the next free ordinal
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub(crate) struct TaxonomyState {
    pub ordinals: BTreeMap<FacetLabel, u32>,
    pub next_ordinal: u32,
}

pub struct FacetWriter {
    committed: TaxonomyState,
}

impl FacetWriter {
    pub fn new() -> Self {
        Self {
            committed: TaxonomyState::default(),
        }
    }

    /// Apply new labels to a staged copy of the committed state.
    /// Already-known labels keep their ordinal.
    pub(crate) fn apply(&self, labels: &[FacetLabel]) -> TaxonomyState {
        let mut staged = self.committed.clone();
        for label in labels {
            if !staged.ordinals.contains_key(label) {
                let ordinal = staged.next_ordinal;
                staged.ordinals.insert(label.clone(), ordinal);
                staged.next_ordinal += 1;
            }
        }
        staged
    }

    pub(crate) fn build_reader(state: &TaxonomyState) -> FacetReader {
        FacetReader {
            inner: RwLock::new(Some(state.clone())),
        }
    }

    pub(crate) fn promote(&mut self, staged: TaxonomyState) {
        self.committed = staged;
    }

    pub(crate) fn restore(&mut self, state: TaxonomyState) {
        self.committed = state;
    }

    pub(crate) fn committed(&self) -> &TaxonomyState {
        &self.committed
    }

    pub fn label_count(&self) -> u64 {
        self.committed.ordinals.len() as u64
    }
}

impl Default for FacetWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable view of the taxonomy at one generation
pub struct FacetReader {
    inner: RwLock<Option<TaxonomyState>>,
}

impl FacetReader {
    pub fn empty() -> Self {
        Self {
            inner: RwLock::new(Some(TaxonomyState::default())),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&TaxonomyState) -> T) -> Result<T> {
        let guard = self.inner.read();
        match guard.as_ref() {
            Some(state) => Ok(f(state)),
            None => Err(CuttleError::UseAfterRelease),
        }
    }

    /// Number of labels known to this taxonomy generation
    pub fn label_count(&self) -> Result<u64> {
        self.read(|s| s.ordinals.len() as u64)
    }

    /// Ordinal assigned to a label, if known
    pub fn ordinal(&self, label: &FacetLabel) -> Result<Option<u32>> {
        self.read(|s| s.ordinals.get(label).copied())
    }

    pub fn contains(&self, label: &FacetLabel) -> Result<bool> {
        self.read(|s| s.ordinals.contains_key(label))
    }
}

impl ReaderResource for FacetReader {
    fn close(&self) {
        let mut guard = self.inner.write();
        *guard = None;
    }

    fn is_closed(&self) -> bool {
        self.inner.read().is_none()
    }
}
