//! Read-only structural queries over a loaded program.
mod graph;
mod types;

pub use graph::*;
pub use types::*;
