//! # Cuttle
//!
//! Search index snapshot and lifecycle manager for a multilingual metadata
//! catalog: many concurrent readers query full-text and faceted indexes
//! while background writers continuously commit new documents, without a
//! reader ever being closed out from under a caller and without leaking
//! reader resources once all holders are done.
//!
//! ## Core pieces
//!
//! - [`SearchManager`]: facade for `acquire_snapshot` / `release` / `commit`
//! - [`Snapshot`]: composite, reference-counted view over every language
//!   index plus the shared taxonomy, isolated from concurrent commits
//! - Per-language trackers with atomic swap-on-commit generations; retired
//!   generations are closed exactly once, when both superseded and
//!   unreferenced
//!
//! ```
//! use cuttle::{Document, DocumentBatch, LanguageCode, SearchManager};
//!
//! let manager = SearchManager::in_memory();
//! let en = LanguageCode::new("en").unwrap();
//!
//! manager
//!     .commit(&en, &DocumentBatch::new().add(Document::new(1, "bathymetric survey")))
//!     .unwrap();
//!
//! let snapshot = manager.acquire_snapshot(None).unwrap();
//! assert_eq!(snapshot.doc_count().unwrap(), 1);
//! manager.release(&snapshot).unwrap();
//! ```

pub mod config;
pub mod error;
pub mod index;
pub mod indexing;
pub mod metrics;
pub mod models;
pub mod search;
pub mod snapshot;
pub mod tokenizer;
pub mod tracker;

pub use config::{IndexConfig, TokenizerConfig};
pub use error::{CuttleError, Result};
pub use models::*;
pub use search::SearchManager;
pub use snapshot::Snapshot;
pub use tokenizer::Tokenizer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
