//! Runtime parse tables.
//!
//! A flattened form of the LR automaton, decoupled from the generator:
//! states index each other by plain integers, terminals are internal
//! token numbers, and reduce entries carry the production length, the
//! nonterminal index for the goto lookup, and an opaque action number
//! the table owner interprets (the grammar loader maps it to a meta
//! rule; generated parsers map it to an action function).

/// Internal token number. Token numbering is an agreement between the
/// table producer and the scanner; the end-of-input token takes part
/// in it like any other.
pub type InternalTk = u32;

/// What firing a reduce means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceAction {
    /// The augmented-start reduce: the parse is complete.
    Accept,
    /// A regular production with the given action number.
    Rule(u32),
}

/// One reduce entry of a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reduce {
    /// Number of stack nodes the production spans.
    pub length: u32,
    /// Nonterminal index used for the goto after popping.
    pub nt: u32,
    pub action: ReduceAction,
}

/// One state: shift, goto and reduce lists in table order.
#[derive(Debug, Clone, Default)]
pub struct StateRow {
    pub shifts: Vec<(InternalTk, u32)>,
    pub gotos: Vec<(u32, u32)>,
    pub reduces: Vec<Reduce>,
}

impl StateRow {
    /// Goto target for a nonterminal, if any.
    pub fn goto(&self, nt: u32) -> Option<u32> {
        self.gotos.iter().find(|&&(n, _)| n == nt).map(|&(_, s)| s)
    }
}

/// The complete automaton. States are dense; start states are picked
/// by the caller (one per start nonterminal).
#[derive(Debug, Clone)]
pub struct ParseTables {
    pub states: Vec<StateRow>,
}

impl ParseTables {
    pub fn state(&self, index: u32) -> &StateRow {
        &self.states[index as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn goto_finds_the_matching_nonterminal() {
        let row = StateRow {
            shifts: vec![],
            gotos: vec![(0, 4), (2, 7)],
            reduces: vec![],
        };
        assert_eq!(row.goto(2), Some(7));
        assert_eq!(row.goto(1), None);
    }
}
