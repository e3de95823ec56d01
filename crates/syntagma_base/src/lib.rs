//! Structural atoms shared by every syntagma crate.
//!
//! This crate holds the pieces that the rest of the generator is built
//! from: bump-allocated arenas for AST nodes, string interning for O(1)
//! identifier comparison, source positions for diagnostics, and the
//! positioned error type every pass reports through.
//!
//! Nothing in here knows anything about grammars.

mod arena;
mod error;
mod intern;
mod pos;

pub use arena::Arena;
pub use error::{Result, SynError};
pub use intern::{Interner, Symbol};
pub use pos::{FilePos, SourceString};
