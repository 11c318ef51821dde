//! Auxiliary (facet) index tracker
//!
//! Same state machine as the per-language trackers, but a single instance
//! system-wide: facet labels are shared across all document languages. The
//! facade commits it before the language commit of the same logical update,
//! so a snapshot never pairs documents with a taxonomy that lacks their
//! labels.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use super::core::TrackerCore;
use super::generation::Generation;
use crate::error::{CuttleError, Result};
use crate::index::{FacetReader, FacetWriter, IndexStore};
use crate::models::FacetLabel;

pub struct TaxonomyIndexTracker {
    writer: Mutex<FacetWriter>,
    core: TrackerCore<FacetReader>,
    store: Option<Arc<IndexStore>>,
}

impl TaxonomyIndexTracker {
    pub fn new(store: Option<Arc<IndexStore>>) -> Result<Self> {
        let mut writer = FacetWriter::new();

        let core = match &store {
            Some(store) => match store.load_taxonomy()? {
                Some((seq, state)) => {
                    writer.restore(state);
                    let reader = FacetWriter::build_reader(writer.committed());
                    debug!(seq, "reloaded persisted taxonomy generation");
                    TrackerCore::with_seq(reader, seq)
                }
                None => TrackerCore::new(FacetReader::empty()),
            },
            None => TrackerCore::new(FacetReader::empty()),
        };

        Ok(Self {
            writer: Mutex::new(writer),
            core,
            store,
        })
    }

    pub fn acquire_current(&self) -> Result<Arc<Generation<FacetReader>>> {
        self.core.acquire()
    }

    pub fn release(&self, gen: &Arc<Generation<FacetReader>>) -> Result<()> {
        self.core.release(gen)
    }

    /// Register any new labels and install a new taxonomy generation.
    /// Runs once per logical update, before the language commit it pairs with.
    pub fn commit(&self, labels: &[FacetLabel]) -> Result<u64> {
        let mut writer = self.writer.lock();

        let staged = writer.apply(labels);
        let reader = FacetWriter::build_reader(&staged);

        if let Some(store) = &self.store {
            let seq = self.core.next_seq();
            store
                .persist_taxonomy(seq, &staged)
                .map_err(CuttleError::TaxonomyCommitFailed)?;
        }

        let seq = self.core.install(reader)?;
        writer.promote(staged);

        if let Some(store) = &self.store {
            let _ = store.prune_taxonomy(seq);
        }

        debug!(seq, labels = labels.len(), "installed taxonomy generation");
        Ok(seq)
    }

    pub fn current_seq(&self) -> Option<u64> {
        self.core.current_seq()
    }

    pub fn current_ref_count(&self) -> Option<u32> {
        self.core.current_ref_count()
    }

    pub fn retired_count(&self) -> usize {
        self.core.retired_count()
    }

    pub fn open_generations(&self) -> usize {
        self.core.open_generations()
    }

    pub fn label_count(&self) -> u64 {
        self.writer.lock().label_count()
    }
}
