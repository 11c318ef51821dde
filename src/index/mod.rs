//! Underlying index engine: per-language inverted index and shared taxonomy
//!
//! The on-disk format is an implementation detail of this module; the
//! trackers treat readers as opaque resources with a close() capability.
//!
//! # Architecture
//!
//! - `IndexWriter`: committed per-language state, staged batch application
//! - `IndexReader`: immutable inverted index over one flushed generation
//! - `FacetWriter` / `FacetReader`: shared taxonomy label registry
//! - `IndexStore`: atomic persistence of flushed generations

mod facets;
mod reader;
mod store;
mod writer;

pub use facets::*;
pub use reader::*;
pub use store::*;
pub use writer::*;
