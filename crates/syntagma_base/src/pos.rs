//! Source positions for diagnostics.
//!
//! Every user-visible token carries a `(file, line, column)` triple so
//! that every error message the generator can produce points at the
//! exact spot in the grammar file. Positions travel together with
//! interned identifiers as [`SourceString`]s.

use crate::intern::{Interner, Symbol};
use std::fmt;

/// A `(file, line, column)` location in a grammar file.
///
/// Lines and columns are 1-based; a default position renders as
/// `<unknown>:0:0` and is only used for synthesized nodes that have no
/// surface syntax (for example the empty alternative of `?`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilePos {
    /// Interned file name.
    pub file: Symbol,
    pub line: u32,
    pub column: u32,
}

impl FilePos {
    pub fn new(file: Symbol, line: u32, column: u32) -> Self {
        Self { file, line, column }
    }

    /// Renders `file:line:column` using the interner that owns `file`.
    pub fn display<'a>(&self, interner: &'a Interner) -> PosDisplay<'a> {
        PosDisplay {
            file: if self.file == Symbol::EMPTY {
                "<unknown>"
            } else {
                interner.resolve(self.file)
            },
            line: self.line,
            column: self.column,
        }
    }
}

/// Borrowed display adapter returned by [`FilePos::display`].
pub struct PosDisplay<'a> {
    file: &'a str,
    line: u32,
    column: u32,
}

impl fmt::Display for PosDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// An interned identifier or literal together with where it was written.
///
/// This is the currency of the whole front end: names in declarations,
/// attribute names, string literals and type references are all
/// `SourceString`s, so any of them can be blamed in an error message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceString {
    pub sym: Symbol,
    pub pos: FilePos,
}

impl SourceString {
    pub fn new(sym: Symbol, pos: FilePos) -> Self {
        Self { sym, pos }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_formats_file_line_column() {
        let mut interner = Interner::new();
        let file = interner.intern("calc.syn");
        let pos = FilePos::new(file, 12, 7);
        assert_eq!(pos.display(&interner).to_string(), "calc.syn:12:7");
    }

    #[test]
    fn default_position_is_unknown() {
        let interner = Interner::new();
        let pos = FilePos::default();
        assert_eq!(pos.display(&interner).to_string(), "<unknown>:0:0");
    }

    #[test]
    fn source_strings_compare_by_symbol_and_position() {
        let mut interner = Interner::new();
        let file = interner.intern("g.syn");
        let name = interner.intern("Expr");
        let a = SourceString::new(name, FilePos::new(file, 1, 1));
        let b = SourceString::new(name, FilePos::new(file, 1, 1));
        assert_eq!(a, b);
    }
}
