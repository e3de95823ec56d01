//! The per-token GLR cycle.

use crate::error::ParseError;
use crate::stack::NodeRef;
use crate::tables::{InternalTk, ParseTables, ReduceAction};
use syntagma_base::FilePos;

/// Token source driving a parse.
///
/// The `'v` lifetime is the lifetime of the value storage (typically a
/// [`Pool`](crate::Pool) owned next to the scanner), so values outlive
/// any single `scan` call and can be held by stack nodes.
pub trait Scanner<'v> {
    type Value;

    /// Produces the next token and, for valued terminals, a pointer to
    /// its value. The end-of-input token signals the end of the
    /// stream; lexical problems surface as [`ParseError::Lexical`].
    fn scan(&mut self) -> Result<(InternalTk, Option<&'v Self::Value>), ParseError>;

    /// Position of the most recently scanned token, used to locate
    /// syntax errors.
    fn pos(&self) -> FilePos;
}

/// Runs the tables over the scanner's token stream.
///
/// Returns the nonterminal node of the accepting reduce. The node
/// keeps the whole parse graph below it alive, so the caller can walk
/// [`sub_elements`](crate::StackNode::sub_elements) to rebuild user
/// data.
pub fn parse<'v, S: Scanner<'v>>(
    tables: &ParseTables,
    start_state: u32,
    scanner: &mut S,
    eof: InternalTk,
) -> Result<NodeRef<'v, S::Value>, ParseError> {
    let mut tops: Vec<NodeRef<'v, S::Value>> = vec![NodeRef::start(start_state)];

    loop {
        // 1. Reduce to fixpoint. Every top is examined exactly once;
        // reduces append new tops which get examined in turn.
        let mut accepted: Option<NodeRef<'v, S::Value>> = None;
        let mut examined = 0;
        while examined < tops.len() {
            let top = tops[examined].clone();
            examined += 1;

            let row = tables.state(top.state());
            for &reduce in &row.reduces {
                match reduce.action {
                    ReduceAction::Accept => {
                        accepted = Some(top.clone());
                    }
                    ReduceAction::Rule(_) => {
                        let mut origin = &top;
                        for _ in 0..reduce.length {
                            origin = origin
                                .prev_handle()
                                .expect("reduce span longer than its stack");
                        }
                        if let Some(target) = tables.state(origin.state()).goto(reduce.nt) {
                            tops.push(NodeRef::nonterminal(
                                target,
                                origin.clone(),
                                reduce,
                                top.clone(),
                            ));
                        }
                    }
                }
            }
        }

        // 2. Scan one token.
        let (token, value) = scanner.scan()?;

        // 3. Shift it on every top that allows it.
        let mut next_tops: Vec<NodeRef<'v, S::Value>> = Vec::new();
        for top in &tops {
            for &(shift_token, target) in &tables.state(top.state()).shifts {
                if shift_token == token {
                    next_tops.push(match value {
                        Some(value) => NodeRef::value(target, top.clone(), value),
                        None => NodeRef::plain(target, top.clone()),
                    });
                }
            }
        }
        tops = next_tops;

        // 4. Check. No state shifts the EOF token, so reaching the end
        // of input always lands here with an empty tops list.
        if tops.is_empty() {
            return if token == eof {
                accepted.ok_or(ParseError::Syntax { pos: scanner.pos() })
            } else {
                Err(ParseError::Syntax { pos: scanner.pos() })
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::{Reduce, StateRow};

    const TK_A: InternalTk = 0;
    const TK_EOF: InternalTk = 1;

    struct SliceScanner<'a> {
        tokens: &'a [InternalTk],
        next: usize,
    }

    impl<'v> Scanner<'v> for SliceScanner<'_> {
        type Value = u32;

        fn scan(&mut self) -> Result<(InternalTk, Option<&'v u32>), ParseError> {
            let token = self.tokens.get(self.next).copied().unwrap_or(TK_EOF);
            self.next += 1;
            Ok((token, None))
        }

        fn pos(&self) -> FilePos {
            FilePos::default()
        }
    }

    fn reduce(length: u32, nt: u32, rule: u32) -> Reduce {
        Reduce {
            length,
            nt,
            action: ReduceAction::Rule(rule),
        }
    }

    fn accept(length: u32) -> Reduce {
        Reduce {
            length,
            nt: 0,
            action: ReduceAction::Accept,
        }
    }

    /// Hand-built LR(0) tables for `S : 'a' S | 'a' ;` which has a
    /// shift/reduce conflict after every 'a'; the GLR core explores
    /// both branches.
    ///
    /// State 0: . shift a -> 1, goto S -> 2
    /// State 1 (after a): shift a -> 1, goto S -> 3, reduce S : a
    /// State 2 (after S): accept
    /// State 3 (after a S): reduce S : a S
    fn right_recursive_tables() -> ParseTables {
        ParseTables {
            states: vec![
                StateRow {
                    shifts: vec![(TK_A, 1)],
                    gotos: vec![(0, 2)],
                    reduces: vec![],
                },
                StateRow {
                    shifts: vec![(TK_A, 1)],
                    gotos: vec![(0, 3)],
                    reduces: vec![reduce(1, 0, 0)],
                },
                StateRow {
                    shifts: vec![],
                    gotos: vec![],
                    reduces: vec![accept(1)],
                },
                StateRow {
                    shifts: vec![],
                    gotos: vec![],
                    reduces: vec![reduce(2, 0, 1)],
                },
            ],
        }
    }

    /// Depth of the right-recursive spine below `node`.
    fn spine_depth(node: &crate::stack::StackNode<'_, u32>) -> usize {
        let elements = node.sub_elements();
        let last = *elements.last().expect("nonempty production");
        match last.variant() {
            crate::stack::NodeVariant::Nt { .. } => 1 + spine_depth(last),
            _ => 1,
        }
    }

    fn run(tokens: &[InternalTk]) -> Result<usize, ParseError> {
        let tables = right_recursive_tables();
        let mut scanner = SliceScanner { tokens, next: 0 };
        let root = parse(&tables, 0, &mut scanner, TK_EOF)?;
        Ok(spine_depth(&root))
    }

    #[test]
    fn single_token_accepts() {
        assert_eq!(run(&[TK_A]).unwrap(), 1);
    }

    #[test]
    fn conflicted_grammar_accepts_longer_inputs() {
        assert_eq!(run(&[TK_A, TK_A, TK_A]).unwrap(), 3);
    }

    #[test]
    fn empty_input_is_a_syntax_error() {
        assert!(matches!(run(&[]), Err(ParseError::Syntax { .. })));
    }

    #[test]
    fn error_reported_once_with_position() {
        let tables = right_recursive_tables();
        let tokens = [TK_A, 99, TK_A];
        let mut scanner = SliceScanner { tokens: &tokens, next: 0 };
        let result = parse(&tables, 0, &mut scanner, TK_EOF);
        assert!(matches!(result, Err(ParseError::Syntax { .. })));
    }
}
