//! This crate models programs in static single-assignment (SSA) form for consumption by the
//! stepping interpreter.
//!
//! A [Program] is a set of functions, each an ordered list of basic blocks, each an ordered list
//! of instructions. Programs are immutable once built. They are loaded from a textual listing in
//! the style of the `go/ssa` function dump:
//!
//! ```text
//! package main
//!
//! func max2(x int, y int) int {
//! 0: entry
//!     t0 = x > y
//!     if t0 goto 1 else 2
//! 1: if.then
//!     return x
//! 2: if.else
//!     return y
//! }
//! ```
//!
//! Every type encountered while loading is interned in the program's [TypeUniverse], which
//! answers structural questions such as method sets and interface implementation. A [CallGraph]
//! can be computed from a loaded program using class hierarchy analysis.

mod builder;
mod callgraph;
mod display;
mod instruction;
mod lexer;
mod loader;
mod program;
mod types;

pub use builder::*;
pub use callgraph::*;
pub use display::*;
pub use instruction::*;
pub use loader::*;
pub use program::*;
pub use types::*;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The program listing could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    /// The program listing is malformed.
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    /// The listing does not contain a package clause.
    #[error("no packages were loaded")]
    NoPackage,

    /// The loaded package is not a main package.
    #[error("no main package: found package {0}")]
    NoMainPackage(String),

    /// The program is well formed syntactically but violates an SSA invariant.
    #[error("invalid program: {0}")]
    Build(String),

    /// An internal error occurred. This is a fatal error that cannot be safely handled.
    #[error("internal error: {0}")]
    InternalError(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests;
