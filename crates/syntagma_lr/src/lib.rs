//! BNF grammars and LR(0) automaton construction.
//!
//! The grammar representation is payload-generic: the EBNF converter
//! attaches descriptor ids to symbols and productions, while the
//! self-hosted meta-grammar loader attaches raw token kinds and rule
//! tags. The LR(0) generator works on either.

mod bnf;
mod bridge;
mod generator;

pub use bridge::runtime_tables;

pub use bnf::{
    BnfGrammar, BnfGrammarBuilder, BnfNonterminal, BnfProduction, BnfTerminal, NtIdx, PrIdx,
    SymId, SymRef, TrIdx,
};
pub use generator::{generate_lr_tables, LrState, LrTables, StateId};
