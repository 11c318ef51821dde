//! Shared swap-on-commit state machine
//!
//! `TrackerCore` guards exactly the {current generation, retired set} pair
//! under one tracker-local lock. `acquire` and `release` never perform I/O
//! inside the critical section; commits flush outside it and only take the
//! lock to install the already-built reader. No cross-tracker lock exists,
//! so concurrent commits on different trackers cannot deadlock.

use parking_lot::Mutex;
use std::sync::Arc;

use super::generation::{Generation, ReaderResource};
use crate::error::{CuttleError, Result};

struct CoreState<R> {
    /// The generation handed to new acquisitions; `None` once shut down
    current: Option<Arc<Generation<R>>>,
    /// Retired generations still pinned by outstanding references
    retired: Vec<Arc<Generation<R>>>,
    next_seq: u64,
}

pub struct TrackerCore<R> {
    state: Mutex<CoreState<R>>,
}

impl<R: ReaderResource> TrackerCore<R> {
    pub fn new(reader: R) -> Self {
        Self::with_seq(reader, 0)
    }

    /// Start from a reloaded generation with the given sequence number
    pub fn with_seq(reader: R, seq: u64) -> Self {
        Self {
            state: Mutex::new(CoreState {
                current: Some(Arc::new(Generation::new(seq, reader))),
                retired: Vec::new(),
                next_seq: seq + 1,
            }),
        }
    }

    /// Take a reference on the current generation.
    ///
    /// Atomic with respect to a concurrent `install`: the returned generation
    /// was current at some instant during this call and its refcount was
    /// incremented before any retirement could observe it at zero.
    pub fn acquire(&self) -> Result<Arc<Generation<R>>> {
        let state = self.state.lock();
        match &state.current {
            Some(gen) => {
                gen.retain();
                Ok(gen.clone())
            }
            None => Err(CuttleError::TrackerRetired),
        }
    }

    /// Atomically install a freshly flushed reader as the current generation,
    /// retiring its predecessor. Returns the new sequence number.
    ///
    /// Refused once the tracker has shut down: a commit racing with the
    /// tracker's retirement must not resurrect a current generation on a
    /// decommissioned tracker. The fresh reader is closed in that case.
    pub fn install(&self, reader: R) -> Result<u64> {
        let mut state = self.state.lock();
        if state.current.is_none() {
            reader.close();
            return Err(CuttleError::TrackerRetired);
        }
        let seq = state.next_seq;
        state.next_seq += 1;

        let fresh = Arc::new(Generation::new(seq, reader));
        let previous = state.current.replace(fresh);
        if let Some(prev) = previous {
            Self::retire_locked(&mut state, prev);
        }
        Ok(seq)
    }

    /// Drop one caller reference. Closes the generation when it was the last
    /// reference on a retired generation; a still-current generation is left
    /// open regardless.
    pub fn release(&self, gen: &Arc<Generation<R>>) -> Result<()> {
        let mut state = self.state.lock();
        let remaining = gen.drop_ref()?;
        if remaining == 0 && gen.is_retired() {
            if let Some(pos) = state.retired.iter().position(|g| Arc::ptr_eq(g, gen)) {
                let parked = state.retired.remove(pos);
                parked.reader().close();
            }
        }
        Ok(())
    }

    /// Retire the current generation with no successor. Used when a language
    /// is decommissioned; outstanding references keep their generations open
    /// until released. Idempotent.
    pub fn shutdown(&self) {
        let mut state = self.state.lock();
        if let Some(prev) = state.current.take() {
            Self::retire_locked(&mut state, prev);
        }
    }

    fn retire_locked(state: &mut CoreState<R>, gen: Arc<Generation<R>>) {
        gen.mark_retired();
        // Drop the tracker-owned reference; the current slot always holds
        // one, so this cannot underflow.
        match gen.drop_ref() {
            Ok(0) => gen.reader().close(),
            Ok(_) => state.retired.push(gen),
            Err(_) => unreachable!("current generation held no tracker reference"),
        }
    }

    /// Sequence number the next installed generation will get
    pub fn next_seq(&self) -> u64 {
        self.state.lock().next_seq
    }

    /// Sequence number of the current generation, if any
    pub fn current_seq(&self) -> Option<u64> {
        self.state.lock().current.as_ref().map(|g| g.seq())
    }

    /// Reference count of the current generation (telemetry)
    pub fn current_ref_count(&self) -> Option<u32> {
        self.state.lock().current.as_ref().map(|g| g.ref_count())
    }

    /// Number of retired generations still awaiting final release
    pub fn retired_count(&self) -> usize {
        self.state.lock().retired.len()
    }

    /// Number of generations whose readers are still open
    pub fn open_generations(&self) -> usize {
        let state = self.state.lock();
        state.retired.len() + usize::from(state.current.is_some())
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.lock().current.is_none()
    }
}
