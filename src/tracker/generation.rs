//! Reference-counted generation wrapper
//!
//! A generation is an immutable snapshot of one index at a point in time.
//! The reference count starts at 1: that reference is owned by the tracker's
//! "current" slot and dropped when the generation is retired by a newer
//! commit. Callers only ever hold borrowed references handed out by
//! `TrackerCore::acquire`.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::error::{CuttleError, Result};

/// A closeable reader resource owned by a generation
pub trait ReaderResource: Send + Sync + 'static {
    /// Physically release the underlying reader. Called exactly once, when
    /// the generation is retired and its reference count has reached zero.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// One immutable, versioned snapshot of an index's readable state
pub struct Generation<R> {
    seq: u64,
    reader: R,
    refs: AtomicU32,
    retired: AtomicBool,
}

impl<R: ReaderResource> Generation<R> {
    /// Create a generation with the tracker-owned reference already counted
    pub(crate) fn new(seq: u64, reader: R) -> Self {
        Self {
            seq,
            reader,
            refs: AtomicU32::new(1),
            retired: AtomicBool::new(false),
        }
    }

    /// Monotonically increasing sequence number within one tracker
    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    /// Current reference count (telemetry; racy outside the tracker lock)
    pub fn ref_count(&self) -> u32 {
        self.refs.load(Ordering::SeqCst)
    }

    /// Whether a newer commit has superseded this generation
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::SeqCst)
    }

    /// Whether the underlying reader has been physically released
    pub fn is_closed(&self) -> bool {
        self.reader.is_closed()
    }

    /// Take an additional reference. Only called under the tracker lock,
    /// and only while this generation is current.
    pub(crate) fn retain(&self) {
        self.refs.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn mark_retired(&self) {
        self.retired.store(true, Ordering::SeqCst);
    }

    /// Drop one reference and return the remaining count. Only called under
    /// the tracker lock. An underflow means the caller released a reference
    /// it no longer holds.
    pub(crate) fn drop_ref(&self) -> Result<u32> {
        let current = self.refs.load(Ordering::SeqCst);
        if current == 0 {
            return Err(CuttleError::UseAfterRelease);
        }
        self.refs.store(current - 1, Ordering::SeqCst);
        Ok(current - 1)
    }
}
