//! Pipeline driver and source emitter.
//!
//! This crate strings the front end, the converter and the LR
//! generator together and turns the result into the two generated
//! source files: a header with the token enum, token descriptors,
//! keyword table, value pool and parser facade, and an implementation
//! file with the state tables and action functions.

pub mod config;
pub mod emit;
pub mod pipeline;

pub use config::{GeneratorConfig, IncludeFile};
pub use pipeline::{run_generator, GenError};
