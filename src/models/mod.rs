//! Domain model types shared across the crate

mod batch;
mod document;

pub use batch::*;
pub use document::*;
