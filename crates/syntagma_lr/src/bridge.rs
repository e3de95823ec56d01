//! Flattening generator tables into runtime tables.
//!
//! The LR generator's output still speaks in grammar objects; the GLR
//! core wants plain integers. This bridge renumbers states 1:1 and
//! lets the caller decide how terminals map to internal token numbers
//! and productions to action numbers (the grammar loader maps rules to
//! its rule enum; tests map productions to their indices).

use crate::bnf::{BnfGrammar, NtIdx};
use crate::generator::LrTables;
use syntagma_runtime::{InternalTk, ParseTables, Reduce, ReduceAction, StateRow};

/// Converts `tables` for the runtime.
///
/// Returns the runtime tables plus the start states as
/// `(nonterminal, state index)` pairs in generator order.
pub fn runtime_tables<N, T, P>(
    grammar: &BnfGrammar<N, T, P>,
    tables: &LrTables,
    token_of: impl Fn(crate::bnf::TrIdx, &T) -> InternalTk,
    action_of: impl Fn(crate::bnf::PrIdx, &P) -> u32,
) -> (ParseTables, Vec<(NtIdx, u32)>) {
    let states = tables
        .states
        .iter()
        .map(|state| StateRow {
            shifts: state
                .shifts
                .iter()
                .map(|&(tr, target)| (token_of(tr, &grammar.tr(tr).payload), target.0))
                .collect(),
            gotos: state
                .gotos
                .iter()
                .map(|&(nt, target)| (nt.0, target.0))
                .collect(),
            reduces: state
                .reduces
                .iter()
                .map(|reduce| match reduce {
                    Some(pr_idx) => {
                        let pr = grammar.pr(*pr_idx);
                        Reduce {
                            length: pr.elements.len() as u32,
                            nt: pr.nt.0,
                            action: ReduceAction::Rule(action_of(*pr_idx, &pr.payload)),
                        }
                    }
                    None => Reduce {
                        length: 0,
                        nt: 0,
                        action: ReduceAction::Accept,
                    },
                })
                .collect(),
        })
        .collect();

    let starts = tables
        .start_states
        .iter()
        .map(|&(nt, state)| (nt, state.0))
        .collect();

    (ParseTables { states }, starts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bnf::BnfGrammarBuilder;
    use crate::generator::generate_lr_tables;

    #[test]
    fn bridge_preserves_state_count_and_accept() {
        let mut builder: BnfGrammarBuilder<(), u32, u32> = BnfGrammarBuilder::new();
        let a = builder.create_terminal("A", 5);
        let s = builder.create_nonterminal("S", ());
        builder.add_production(s, 42, vec![builder.tr_sym(a)]);
        let grammar = builder.build();

        let lr = generate_lr_tables(&grammar, &[s]);
        let (tables, starts) =
            runtime_tables(&grammar, &lr, |_, &token| token, |_, &action| action);

        assert_eq!(tables.states.len(), lr.states.len());
        assert_eq!(starts.len(), 1);

        let start_row = tables.state(starts[0].1);
        assert_eq!(start_row.shifts, vec![(5, 1)]);

        let accept_row = tables.state(start_row.goto(0).unwrap());
        assert!(accept_row
            .reduces
            .iter()
            .any(|r| r.action == ReduceAction::Accept));
    }
}
