//! A single-step interpreter for programs in SSA form, built to be driven by an external symbolic
//! execution engine.
//!
//! The host never lets the interpreter run ahead. It either executes the innermost frame one
//! instruction at a time with [Interpreter::frame_step], or asks for a description of a single
//! instruction through the [api::Api] callbacks with [Interpreter::step]. In the second mode a
//! conditional branch reports both targets instead of choosing one, which lets the host explore
//! each path itself. Structural queries over the program are answered by [query].
//!
//! A [Bridge] bundles a loaded program, its call graph and an interpreter behind opaque
//! [registry::Handle]s.

pub mod api;
mod bridge;
mod config;
mod error;
pub mod frame;
mod interpreter;
pub mod query;
pub mod registry;
pub mod value;
pub mod visitor;

pub use bridge::*;
pub use config::*;
pub use error::*;
pub use interpreter::*;

#[cfg(test)]
mod tests;
