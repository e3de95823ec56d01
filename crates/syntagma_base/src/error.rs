//! Positioned errors.
//!
//! All generator errors are fatal to the current run: the first one
//! aborts the pipeline before any output file is written. Each error
//! carries the [`FilePos`] of the construct that caused it.

use crate::intern::Interner;
use crate::pos::{FilePos, SourceString};
use std::fmt;

/// An error with a source location.
///
/// The message is already fully formatted; rendering through
/// [`SynError::display`] prefixes it with `file:line:column`.
#[derive(Debug, Clone)]
pub struct SynError {
    pub message: String,
    pub pos: FilePos,
}

impl SynError {
    pub fn new(message: impl Into<String>, pos: FilePos) -> Self {
        Self {
            message: message.into(),
            pos,
        }
    }

    /// Convenience constructor blaming a named token.
    pub fn at(message: impl Into<String>, cause: SourceString) -> Self {
        Self::new(message, cause.pos)
    }

    /// Renders `file:line:column: message`.
    pub fn display<'a>(&'a self, interner: &'a Interner) -> ErrorDisplay<'a> {
        ErrorDisplay {
            error: self,
            interner,
        }
    }
}

impl fmt::Display for SynError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}:{}", self.message, self.pos.line, self.pos.column)
    }
}

impl std::error::Error for SynError {}

/// Display adapter resolving the file name through an interner.
pub struct ErrorDisplay<'a> {
    error: &'a SynError,
    interner: &'a Interner,
}

impl fmt::Display for ErrorDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}",
            self.error.pos.display(self.interner),
            self.error.message
        )
    }
}

/// Alias used as the return type of every fallible pass.
pub type Result<T> = std::result::Result<T, SynError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::Interner;

    #[test]
    fn display_includes_position_and_message() {
        let mut interner = Interner::new();
        let file = interner.intern("expr.syn");
        let err = SynError::new("Duplicate name 'Term'", FilePos::new(file, 3, 1));
        let text = err.display(&interner).to_string();
        assert_eq!(text, "expr.syn:3:1: Duplicate name 'Term'");
    }

    #[test]
    fn at_uses_the_cause_position() {
        let mut interner = Interner::new();
        let file = interner.intern("g.syn");
        let name = SourceString::new(interner.intern("x"), FilePos::new(file, 8, 20));
        let err = SynError::at("Unknown name", name);
        assert_eq!(err.pos.line, 8);
        assert_eq!(err.pos.column, 20);
    }
}
