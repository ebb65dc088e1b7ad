//! Core data models for windowed stat reports.

mod snapshot;
mod taxonomy;
mod tree;
mod value;

pub use snapshot::*;
pub use taxonomy::*;
pub use tree::*;
pub use value::*;
