//! Per-language index tracker
//!
//! Owns one language's writer and its generation lifecycle. Commits are
//! serialized by the writer lock and flush outside the core lock, so a slow
//! flush never blocks acquisitions, and outstanding readers never stall a
//! commit.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use super::core::TrackerCore;
use super::generation::Generation;
use crate::config::TokenizerConfig;
use crate::error::{CuttleError, Result};
use crate::index::{IndexReader, IndexStore, IndexWriter};
use crate::models::{DocumentBatch, LanguageCode};

pub struct LanguageIndexTracker {
    code: LanguageCode,
    writer: Mutex<IndexWriter>,
    core: TrackerCore<IndexReader>,
    store: Option<Arc<IndexStore>>,
}

impl LanguageIndexTracker {
    /// Create a tracker, reloading the latest persisted generation when a
    /// store is configured. Starts at an empty generation 0 otherwise.
    pub fn new(
        code: LanguageCode,
        tokenizer: &TokenizerConfig,
        store: Option<Arc<IndexStore>>,
    ) -> Result<Self> {
        let mut writer = IndexWriter::new(&code, tokenizer);

        let core = match &store {
            Some(store) => match store.load_language(&code)? {
                Some((seq, docs)) => {
                    writer.restore(docs);
                    let reader = IndexWriter::build_reader(writer.committed());
                    debug!(language = %code, seq, "reloaded persisted index generation");
                    TrackerCore::with_seq(reader, seq)
                }
                None => TrackerCore::new(IndexReader::empty()),
            },
            None => TrackerCore::new(IndexReader::empty()),
        };

        Ok(Self {
            code,
            writer: Mutex::new(writer),
            core,
            store,
        })
    }

    pub fn code(&self) -> &LanguageCode {
        &self.code
    }

    /// Take a reference on the current generation
    pub fn acquire_current(&self) -> Result<Arc<Generation<IndexReader>>> {
        self.core.acquire()
    }

    /// Drop a reference previously taken with `acquire_current`
    pub fn release(&self, gen: &Arc<Generation<IndexReader>>) -> Result<()> {
        self.core.release(gen)
    }

    /// Apply a batch, flush it to a new reader generation, and install it.
    ///
    /// A failed flush leaves the pre-commit state fully intact: the writer
    /// keeps its committed documents and in-flight readers are unaffected.
    /// Returns the installed sequence number.
    pub fn commit(&self, batch: &DocumentBatch) -> Result<u64> {
        let mut writer = self.writer.lock();

        let staged = writer.apply(batch);
        let reader = IndexWriter::build_reader(&staged);

        if let Some(store) = &self.store {
            let seq = self.core.next_seq();
            store
                .persist_language(&self.code, seq, &staged)
                .map_err(|source| CuttleError::CommitFailed {
                    language: self.code.clone(),
                    source,
                })?;
        }

        // The tracker can be decommissioned between the registry lookup and
        // this install; the refused commit surfaces as a missing language
        // rather than silently dropping the batch.
        let seq = match self.core.install(reader) {
            Ok(seq) => seq,
            Err(_) => {
                if let Some(store) = &self.store {
                    // Drop what the flush wrote, or a reopen would register
                    // the retired language again
                    let _ = store.remove_language(&self.code);
                }
                return Err(CuttleError::NoSuchLanguage(self.code.clone()));
            }
        };
        writer.promote(staged);

        if let Some(store) = &self.store {
            // Leftover files from older generations are garbage, not faults
            let _ = store.prune_language(&self.code, seq);
        }

        debug!(language = %self.code, seq, ops = batch.len(), "installed index generation");
        Ok(seq)
    }

    /// Retire the current generation with no successor (deferred language
    /// decommission). Outstanding snapshots keep their generations open.
    pub fn shutdown(&self) {
        self.core.shutdown();
        debug!(language = %self.code, "language tracker shut down");
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

    pub fn doc_count(&self) -> u64 {
        self.writer.lock().doc_count()
    }
}
