//! Reader lifecycle tracking
//!
//! Each tracker owns one index: its writer, its current reader generation,
//! and the retired-but-still-referenced generations awaiting final release.
//! A generation is physically closed exactly once, when it is both retired
//! and unreferenced, in whichever order those conditions clear.
//!
//! # Architecture
//!
//! - `Generation`: refcounted, retirable wrapper around one open reader
//! - `TrackerCore`: the shared swap-on-commit state machine
//! - `LanguageIndexTracker`: one per language, owns writer + generations
//! - `TaxonomyIndexTracker`: singleton tracker for the shared facet index
//! - `LanguageTrackerSet`: fans acquisitions across trackers atomically

mod core;
mod generation;
mod language;
pub(crate) mod registry;
mod taxonomy;

pub use self::core::*;
pub use self::generation::*;
pub use self::language::*;
pub use self::registry::*;
pub use self::taxonomy::*;
