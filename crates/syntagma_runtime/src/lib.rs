//! GLR parsing core.
//!
//! This crate executes LR tables on a token stream. It is used twice:
//! by the generated parsers at run time, and at build time by the
//! generator itself, whose grammar-file loader parses grammar files
//! with exactly this machinery over a bootstrap table.
//!
//! The parser keeps a set of stack tops over a shared graph of
//! reference-counted nodes. Each token is handled in three steps:
//! reduce every top to a fixpoint, shift the token on every top that
//! allows it, then check for termination. Conflicts in the tables are
//! not an error; they simply fork the stack set.

mod error;
mod parser;
mod pool;
mod stack;
mod tables;

pub use error::ParseError;
pub use parser::{parse, Scanner};
pub use pool::Pool;
pub use stack::{NodeRef, NodeVariant, StackNode};
pub use tables::{InternalTk, ParseTables, Reduce, ReduceAction, StateRow};
