//! Background indexer worker
//!
//! The catalog pipeline produces document batches asynchronously; this
//! worker drains them onto the search manager so record updates never block
//! on flush I/O. The worker exits when every sender has been dropped.

use std::sync::Arc;
use std::thread;

use crossbeam::channel::{Receiver, Sender};
use tracing::error;

use crate::models::{DocumentBatch, LanguageCode};
use crate::search::SearchManager;

#[derive(Clone, Debug)]
pub enum IndexRequest {
    Commit {
        language: LanguageCode,
        batch: DocumentBatch,
    },
}

pub struct IndexerHandles {
    pub tx: Sender<IndexRequest>,
    pub join: thread::JoinHandle<()>,
}

pub fn spawn_indexer(
    tx: Sender<IndexRequest>,
    rx: Receiver<IndexRequest>,
    manager: Arc<SearchManager>,
) -> IndexerHandles {
    let handle = thread::spawn(move || {
        while let Ok(request) = rx.recv() {
            match request {
                IndexRequest::Commit { language, batch } => {
                    if let Err(e) = manager.commit(&language, &batch) {
                        // Surfaced to the pipeline via metrics; the batch is
                        // the pipeline's to retry.
                        error!(language = %language, error = %e, "background commit failed");
                    }
                }
            }
        }
    });

    IndexerHandles { tx, join: handle }
}
