//! Shared helpers for the integration tests.
//!
//! [`build`] runs the whole generator front end over a grammar text
//! and returns self-contained tables; [`accepts`] drives the GLR core
//! over a sequence of token names against the generated automaton.

use syntagma_base::FilePos;
use syntagma_codegen::pipeline::build_tables;
use syntagma_codegen::GeneratorConfig;
use syntagma_grammar::convert::descriptor::TrDescriptor;
use syntagma_grammar::convert::ConversionResult;
use syntagma_lr::{runtime_tables, LrTables};
use syntagma_runtime::{parse, InternalTk, ParseError, ParseTables, Scanner};

/// Internal token number of end-of-input in test tables.
pub const EOF: InternalTk = 0;

/// A fully built grammar: the converted BNF, the LR automaton, and
/// runtime tables keyed by `terminal index + 1` (0 is EOF).
#[derive(Debug)]
pub struct Build {
    pub conversion: ConversionResult,
    pub lr: LrTables,
    pub runtime: ParseTables,
    /// Start states in declaration order.
    pub start_states: Vec<u32>,
}

/// Runs lexer, loader, analysis, conversion and LR generation.
pub fn build(source: &str) -> Result<Build, String> {
    let config = GeneratorConfig::new("test.syn");
    let (conversion, lr) = build_tables(&config, source, "test.syn")
        .map_err(|error| error.to_string())?;
    let (runtime, starts) = runtime_tables(
        &conversion.bnf,
        &lr,
        |idx, _| idx.0 + 1,
        |idx, _| idx.0,
    );
    Ok(Build {
        conversion,
        lr,
        runtime,
        start_states: starts.into_iter().map(|(_, state)| state).collect(),
    })
}

impl Build {
    /// Internal token number of a terminal, looked up by declared name
    /// or literal text.
    pub fn token(&self, name: &str) -> InternalTk {
        for tr in self.conversion.bnf.terminals() {
            let matches = match &tr.payload {
                TrDescriptor::Name { name: tr_name, .. } => tr_name == name,
                TrDescriptor::Str { text, .. } => text == name,
            };
            if matches {
                return tr.index.0 + 1;
            }
        }
        panic!("no terminal named {name:?}");
    }

    /// Parses a token-name sequence with the first start nonterminal.
    pub fn parse_names(&self, names: &[&str]) -> Result<(), ParseError> {
        let tokens: Vec<InternalTk> = names.iter().map(|name| self.token(name)).collect();
        let mut scanner = TokenSliceScanner { tokens, next: 0 };
        parse(&self.runtime, self.start_states[0], &mut scanner, EOF).map(|_| ())
    }

    /// True when the token-name sequence is accepted.
    pub fn accepts(&self, names: &[&str]) -> bool {
        self.parse_names(names).is_ok()
    }
}

/// Valueless scanner over a fixed token sequence.
pub struct TokenSliceScanner {
    tokens: Vec<InternalTk>,
    next: usize,
}

impl<'v> Scanner<'v> for TokenSliceScanner {
    type Value = ();

    fn scan(&mut self) -> Result<(InternalTk, Option<&'v ()>), ParseError> {
        let token = self.tokens.get(self.next).copied().unwrap_or(EOF);
        self.next += 1;
        Ok((token, None))
    }

    fn pos(&self) -> FilePos {
        FilePos::default()
    }
}
