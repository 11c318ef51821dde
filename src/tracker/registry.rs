//! Multi-language coordinator
//!
//! Fans acquisitions out across the registered language trackers plus the
//! shared taxonomy tracker, all-or-nothing: a failure while acquiring rolls
//! back every reference already taken, so the caller never receives (or
//! leaks) a half-populated snapshot.
//!
//! The tracker map itself follows the same refcount-until-zero discipline as
//! generations: a retiring language stays registered, invisible to new
//! acquisitions, until the last snapshot referencing it is released.

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::language::LanguageIndexTracker;
use super::taxonomy::TaxonomyIndexTracker;
use crate::config::IndexConfig;
use crate::error::{CuttleError, Result};
use crate::index::IndexStore;
use crate::metrics::TrackerMetrics;
use crate::models::{DocumentBatch, LanguageCode};
use crate::snapshot::{Snapshot, SnapshotPart};

pub(crate) struct TrackerEntry {
    pub(crate) tracker: Arc<LanguageIndexTracker>,
    /// Live snapshots currently referencing this tracker
    snapshots_out: AtomicU32,
    retiring: AtomicBool,
}

impl TrackerEntry {
    fn new(tracker: LanguageIndexTracker) -> Self {
        Self {
            tracker: Arc::new(tracker),
            snapshots_out: AtomicU32::new(0),
            retiring: AtomicBool::new(false),
        }
    }

    fn is_retiring(&self) -> bool {
        self.retiring.load(Ordering::SeqCst)
    }
}

type TrackerMap = BTreeMap<LanguageCode, Arc<TrackerEntry>>;

/// The set of per-language trackers plus the shared taxonomy tracker
pub struct LanguageTrackerSet {
    entries: ArcSwap<TrackerMap>,
    /// Serializes map mutations; lookups go through the ArcSwap lock-free
    reg_lock: Mutex<()>,
    taxonomy: Arc<TaxonomyIndexTracker>,
    config: IndexConfig,
    store: Option<Arc<IndexStore>>,
    metrics: TrackerMetrics,
}

impl LanguageTrackerSet {
    /// Open the tracker set, reloading any persisted languages and taxonomy
    pub fn open(config: IndexConfig) -> Result<Arc<Self>> {
        let store = match &config.data_dir {
            Some(dir) => Some(Arc::new(IndexStore::open(dir.clone())?)),
            None => None,
        };

        let taxonomy = Arc::new(TaxonomyIndexTracker::new(store.clone())?);
        let metrics =
            TrackerMetrics::new().map_err(|e| CuttleError::Internal(e.to_string()))?;

        let mut map = TrackerMap::new();
        if let Some(store) = &store {
            for code in store.list_languages()? {
                let tracker = LanguageIndexTracker::new(
                    code.clone(),
                    &config.tokenizer,
                    Some(store.clone()),
                )?;
                map.insert(code, Arc::new(TrackerEntry::new(tracker)));
            }
        }

        Ok(Arc::new(Self {
            entries: ArcSwap::from_pointee(map),
            reg_lock: Mutex::new(()),
            taxonomy,
            config,
            store,
            metrics,
        }))
    }

    /// Acquire a composite snapshot over the matching language trackers and
    /// the taxonomy. All acquisitions in one call are logically simultaneous:
    /// any failure releases everything already taken before surfacing.
    pub fn acquire_snapshot(
        self: &Arc<Self>,
        filter: Option<&[LanguageCode]>,
    ) -> Result<Snapshot> {
        let entries = self.entries.load_full();
        let selected: Vec<Arc<TrackerEntry>> = match filter {
            Some(codes) => {
                let mut selected = Vec::with_capacity(codes.len());
                for code in codes {
                    let entry = entries
                        .get(code)
                        .filter(|e| !e.is_retiring())
                        .ok_or_else(|| CuttleError::NoSuchLanguage(code.clone()))?;
                    selected.push(entry.clone());
                }
                selected
            }
            None => entries
                .values()
                .filter(|e| !e.is_retiring())
                .cloned()
                .collect(),
        };

        let mut parts: Vec<SnapshotPart> = Vec::with_capacity(selected.len());
        for entry in selected {
            entry.snapshots_out.fetch_add(1, Ordering::SeqCst);
            match entry.tracker.acquire_current() {
                Ok(gen) => parts.push(SnapshotPart {
                    code: entry.tracker.code().clone(),
                    gen,
                    entry,
                }),
                Err(_) => {
                    // Decommissioned between the map load and the acquisition.
                    // Fatal for an explicit filter, skipped otherwise: an
                    // unfiltered caller never asked for this language.
                    let code = entry.tracker.code().clone();
                    self.release_entry_hold(&entry);
                    if filter.is_some() {
                        self.rollback(parts);
                        return Err(CuttleError::NoSuchLanguage(code));
                    }
                }
            }
        }

        let taxonomy_gen = match self.taxonomy.acquire_current() {
            Ok(gen) => gen,
            Err(e) => {
                self.rollback(parts);
                return Err(e);
            }
        };

        self.metrics.snapshots_acquired.inc();
        self.metrics.active_snapshots.inc();
        Ok(Snapshot::new(self.clone(), parts, taxonomy_gen))
    }

    fn rollback(&self, parts: Vec<SnapshotPart>) {
        for part in &parts {
            let _ = part.entry.tracker.release(&part.gen);
            self.release_entry_hold(&part.entry);
        }
    }

    /// Release a snapshot: language generations first, then taxonomy.
    /// Rejects a second release of the same snapshot.
    pub fn release(&self, snapshot: &Snapshot) -> Result<()> {
        if !snapshot.try_mark_released() {
            self.metrics.double_releases.inc();
            warn!("double release of snapshot detected");
            return Err(CuttleError::DoubleRelease);
        }

        // Keep releasing the remaining references even if one fails; report
        // the first failure afterwards.
        let mut first_err = None;
        for part in snapshot.parts() {
            if let Err(e) = part.entry.tracker.release(&part.gen) {
                first_err.get_or_insert(e);
            }
            self.release_entry_hold(&part.entry);
        }
        if let Err(e) = self.taxonomy.release(snapshot.taxonomy_gen()) {
            first_err.get_or_insert(e);
        }

        self.metrics.snapshots_released.inc();
        self.metrics.active_snapshots.dec();
        self.refresh_generation_gauges();

        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn release_entry_hold(&self, entry: &Arc<TrackerEntry>) {
        let previous = entry.snapshots_out.fetch_sub(1, Ordering::SeqCst);
        if previous == 1 && entry.is_retiring() {
            self.finalize_retirement(entry.tracker.code());
        }
    }

    /// Commit the batch's facet labels to the taxonomy, then the batch to
    /// its language. Registers the language lazily on its first document.
    pub fn commit(&self, code: &LanguageCode, batch: &DocumentBatch) -> Result<u64> {
        let entry = self.get_or_register(code)?;
        let start = Instant::now();

        // Labels first: no snapshot may pair documents with a taxonomy that
        // lacks the labels they reference. A failed language commit then
        // strands only unused labels, which is harmless.
        if let Err(e) = self.taxonomy.commit(&batch.facet_labels()) {
            self.metrics.commit_failures.inc();
            return Err(e);
        }

        let seq = match entry.tracker.commit(batch) {
            Ok(seq) => seq,
            Err(e) => {
                self.metrics.commit_failures.inc();
                return Err(e);
            }
        };

        self.metrics
            .record_commit(code.as_str(), start.elapsed().as_secs_f64());
        self.refresh_generation_gauges();
        Ok(seq)
    }

    /// Register a language tracker eagerly
    pub fn register(&self, code: &LanguageCode) -> Result<()> {
        self.get_or_register(code).map(|_| ())
    }

    fn get_or_register(&self, code: &LanguageCode) -> Result<Arc<TrackerEntry>> {
        if let Some(entry) = self.entries.load().get(code) {
            if entry.is_retiring() {
                return Err(CuttleError::NoSuchLanguage(code.clone()));
            }
            return Ok(entry.clone());
        }

        let _guard = self.reg_lock.lock();
        let entries = self.entries.load_full();
        if let Some(entry) = entries.get(code) {
            if entry.is_retiring() {
                return Err(CuttleError::NoSuchLanguage(code.clone()));
            }
            return Ok(entry.clone());
        }

        let tracker =
            LanguageIndexTracker::new(code.clone(), &self.config.tokenizer, self.store.clone())?;
        let entry = Arc::new(TrackerEntry::new(tracker));
        let mut map = (*entries).clone();
        map.insert(code.clone(), entry.clone());
        self.entries.store(Arc::new(map));
        debug!(language = %code, "registered language tracker");
        Ok(entry)
    }

    /// Retire a language. Torn down immediately when unreferenced, otherwise
    /// deferred until the last snapshot referencing it is released.
    pub fn retire(&self, code: &LanguageCode) -> Result<()> {
        {
            let _guard = self.reg_lock.lock();
            let entries = self.entries.load_full();
            let entry = entries
                .get(code)
                .ok_or_else(|| CuttleError::NoSuchLanguage(code.clone()))?;
            entry.retiring.store(true, Ordering::SeqCst);
        }
        self.finalize_retirement(code);
        Ok(())
    }

    fn finalize_retirement(&self, code: &LanguageCode) {
        {
            let _guard = self.reg_lock.lock();
            let entries = self.entries.load_full();
            let Some(entry) = entries.get(code) else {
                return;
            };
            if !entry.is_retiring() || entry.snapshots_out.load(Ordering::SeqCst) != 0 {
                return;
            }

            let mut map = (*entries).clone();
            map.remove(code);
            self.entries.store(Arc::new(map));
            entry.tracker.shutdown();
            debug!(language = %code, "language tracker decommissioned");
        }

        // Persisted state goes with the tracker, or a reopen would register
        // the language again. Outside the registration lock; this can block
        // on I/O.
        if let Some(store) = &self.store {
            if let Err(e) = store.remove_language(code) {
                warn!(language = %code, error = %e, "failed to remove retired language state");
            }
        }
    }

    /// Languages currently visible to acquisitions
    pub fn languages(&self) -> Vec<LanguageCode> {
        self.entries
            .load()
            .iter()
            .filter(|(_, e)| !e.is_retiring())
            .map(|(code, _)| code.clone())
            .collect()
    }

    pub fn tracker(&self, code: &LanguageCode) -> Option<Arc<LanguageIndexTracker>> {
        self.entries.load().get(code).map(|e| e.tracker.clone())
    }

    pub fn taxonomy(&self) -> &Arc<TaxonomyIndexTracker> {
        &self.taxonomy
    }

    /// Generations whose readers are still open, across all trackers
    pub fn open_generation_count(&self) -> usize {
        let entries = self.entries.load();
        entries
            .values()
            .map(|e| e.tracker.open_generations())
            .sum::<usize>()
            + self.taxonomy.open_generations()
    }

    /// Retired generations still pinned by outstanding references
    pub fn retired_generation_count(&self) -> usize {
        let entries = self.entries.load();
        entries
            .values()
            .map(|e| e.tracker.retired_count())
            .sum::<usize>()
            + self.taxonomy.retired_count()
    }

    pub fn metrics(&self) -> &TrackerMetrics {
        &self.metrics
    }

    fn refresh_generation_gauges(&self) {
        self.metrics
            .open_generations
            .set(self.open_generation_count() as f64);
        self.metrics
            .retired_generations
            .set(self.retired_generation_count() as f64);
    }
}
