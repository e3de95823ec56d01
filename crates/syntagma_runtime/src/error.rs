//! Runtime parse errors.

use std::fmt;
use syntagma_base::FilePos;

/// The two ways a parse attempt can fail. At most one is reported per
/// attempt; the parser releases its stacks before returning it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// No stack top could shift the current token.
    Syntax { pos: FilePos },
    /// The scanner could not form a token.
    Lexical { pos: FilePos },
}

impl ParseError {
    pub fn pos(&self) -> FilePos {
        match *self {
            ParseError::Syntax { pos } | ParseError::Lexical { pos } => pos,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Syntax { pos } => {
                write!(f, "syntax error at {}:{}", pos.line, pos.column)
            }
            ParseError::Lexical { pos } => {
                write!(f, "lexical error at {}:{}", pos.line, pos.column)
            }
        }
    }
}

impl std::error::Error for ParseError {}
