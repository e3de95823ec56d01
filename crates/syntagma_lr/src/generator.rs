//! Canonical LR(0) item-set construction.
//!
//! The generator augments the grammar with one `X' -> X` nonterminal
//! per start symbol, pre-computes every LR item as a linked chain per
//! production, and grows the state collection with a worklist. Because
//! the runtime is GLR, shift/reduce and reduce/reduce conflicts are
//! kept in the tables as-is.
//!
//! Ordering is fully deterministic: items are numbered after a stable
//! sort by current symbol (end items first), item sets are canonicalized
//! by their index sequences, and states are numbered in discovery
//! order starting from the augmented-start closures.

use crate::bnf::{BnfGrammar, BnfGrammarBuilder, NtIdx, PrIdx, SymId, SymRef, TrIdx};
use rustc_hash::FxHashMap;

/// Dense LR state index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateId(pub u32);

impl StateId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// One state of the LR(0) automaton.
///
/// `entry_sym` is the symbol of the *source* grammar whose transition
/// led into this state; it is `None` for augmented-start states.
/// A `None` reduce entry is the accept reduce of an augmented start.
#[derive(Debug)]
pub struct LrState {
    pub index: StateId,
    pub entry_sym: Option<SymId>,
    pub shifts: Vec<(TrIdx, StateId)>,
    pub gotos: Vec<(NtIdx, StateId)>,
    pub reduces: Vec<Option<PrIdx>>,
}

/// The generated automaton.
#[derive(Debug)]
pub struct LrTables {
    pub states: Vec<LrState>,
    pub start_states: Vec<(NtIdx, StateId)>,
}

/// Internal grammar used during generation: terminals point back at
/// source terminals, nonterminals at source nonterminals (`None` for
/// augmented starts), productions at source productions (`None` for
/// the augmented `X' -> X`).
type ExtGrammar = BnfGrammar<Option<NtIdx>, TrIdx, Option<PrIdx>>;

/// One LR item: a production with a dot position. Items of the same
/// production are chained through `next`; `sym` is the symbol after
/// the dot (`None` at the end position). `order` is assigned after the
/// global symbol sort so that item sets can be compared by index
/// sequences instead of contents.
struct Item {
    pos: usize,
    next: Option<usize>,
    sym: Option<SymId>,
    pr: PrIdx,
    order: u32,
}

struct StateBuild {
    entry_sym: Option<SymId>,
    shifts: Vec<(TrIdx, StateId)>,
    gotos: Vec<(NtIdx, StateId)>,
    reduces: Vec<Option<PrIdx>>,
}

struct Generator<'g, N, T, P> {
    base: &'g BnfGrammar<N, T, P>,
    ext: ExtGrammar,
    items: Vec<Item>,
    /// Ext symbol index -> first item (dot at 0) of every production of
    /// that nonterminal.
    sym_first: Vec<Vec<usize>>,
    /// Reusable ordered set of ext nonterminals for closure.
    nt_marks: Vec<bool>,
    nt_list: Vec<NtIdx>,
    /// Canonical item-set map keyed by sorted item orders.
    set_map: FxHashMap<Vec<u32>, usize>,
    set_items: Vec<Vec<usize>>,
    states: Vec<StateBuild>,
    start_states: Vec<(NtIdx, StateId)>,
}

fn build_ext_grammar<N, T, P>(
    base: &BnfGrammar<N, T, P>,
    start_nts: &[NtIdx],
) -> (ExtGrammar, Vec<SymId>) {
    let mut builder: BnfGrammarBuilder<Option<NtIdx>, TrIdx, Option<PrIdx>> =
        BnfGrammarBuilder::new();

    // Base symbol id -> ext symbol id.
    let mut ext_syms = vec![SymId(0); base.symbol_count()];

    for tr in base.terminals() {
        let ext_tr = builder.create_terminal(tr.name.clone(), tr.index);
        ext_syms[tr.sym.index()] = builder.tr_sym(ext_tr);
    }
    for nt in base.nonterminals() {
        let ext_nt = builder.create_nonterminal(nt.name.clone(), Some(nt.index));
        ext_syms[nt.sym.index()] = builder.nt_sym(ext_nt);
    }

    for nt in base.nonterminals() {
        // Ext nonterminal indices coincide with base ones by creation
        // order.
        let ext_nt = NtIdx(nt.index.0);
        for &pr_idx in &nt.productions {
            let pr = base.pr(pr_idx);
            let elements = pr.elements.iter().map(|&sym| ext_syms[sym.index()]).collect();
            builder.add_production(ext_nt, Some(pr.index), elements);
        }
    }

    for &start in start_nts {
        let name = format!("{}'", base.nt(start).name);
        let ext_nt = builder.create_nonterminal(name, None);
        let start_sym = ext_syms[base.nt(start).sym.index()];
        builder.add_production(ext_nt, None, vec![start_sym]);
    }

    (builder.build(), ext_syms)
}

impl<'g, N, T, P> Generator<'g, N, T, P> {
    fn new(base: &'g BnfGrammar<N, T, P>, start_nts: &[NtIdx]) -> Self {
        let (ext, _ext_syms) = build_ext_grammar(base, start_nts);
        let nt_count = ext.nonterminals().len();
        let sym_count = ext.symbol_count();
        Self {
            base,
            ext,
            items: Vec::new(),
            sym_first: vec![Vec::new(); sym_count],
            nt_marks: vec![false; nt_count],
            nt_list: Vec::new(),
            set_map: FxHashMap::default(),
            set_items: Vec::new(),
            states: Vec::new(),
            start_states: Vec::new(),
        }
    }

    /// Creates the item chains for every production, then assigns
    /// global orders so that items sharing a current symbol are
    /// contiguous (end items first).
    fn create_items(&mut self) {
        for nt in self.ext.nonterminals() {
            for &pr_idx in &nt.productions {
                let pr = self.ext.pr(pr_idx);
                let len = pr.elements.len();
                let mut next = None;
                for pos in (0..=len).rev() {
                    let sym = if pos == len { None } else { Some(pr.elements[pos]) };
                    self.items.push(Item {
                        pos,
                        next,
                        sym,
                        pr: pr_idx,
                        order: 0,
                    });
                    next = Some(self.items.len() - 1);
                }
                self.sym_first[nt.sym.index()].push(next.expect("empty item chain"));
            }
        }

        let mut ranked: Vec<usize> = (0..self.items.len()).collect();
        ranked.sort_by_key(|&i| match self.items[i].sym {
            None => 0,
            Some(sym) => sym.index() + 1,
        });
        for (rank, &i) in ranked.iter().enumerate() {
            self.items[i].order = rank as u32;
        }
    }

    /// Extends `list` to its closure: every nonterminal appearing after
    /// a dot contributes the first items of all its productions. The
    /// nonterminal set is reused between calls.
    fn closure(&mut self, list: &mut Vec<usize>) {
        for &item in list.iter() {
            if self.items[item].pos == 0 {
                let nt = self.ext.pr(self.items[item].pr).nt;
                self.nt_set_add(nt);
            }
        }

        let mut nt_pos = self.nt_list.len();
        let mut item_pos = 0;
        while item_pos < list.len() {
            while item_pos < list.len() {
                if let Some(sym) = self.items[list[item_pos]].sym {
                    if let SymRef::Nt(nt) = self.ext.sym(sym) {
                        self.nt_set_add(nt);
                    }
                }
                item_pos += 1;
            }
            // Items of newly discovered nonterminals are new to the
            // list as well, so no per-item membership check is needed.
            while nt_pos < self.nt_list.len() {
                let nt = self.nt_list[nt_pos];
                let sym = self.ext.nt(nt).sym;
                list.extend_from_slice(&self.sym_first[sym.index()]);
                nt_pos += 1;
            }
        }

        for &nt in &self.nt_list {
            self.nt_marks[nt.index()] = false;
        }
        self.nt_list.clear();
    }

    fn nt_set_add(&mut self, nt: NtIdx) {
        if !self.nt_marks[nt.index()] {
            self.nt_marks[nt.index()] = true;
            self.nt_list.push(nt);
        }
    }

    /// Closes `list`, sorts it into canonical order and returns the
    /// state for it, reusing an existing state when the same item set
    /// was seen before.
    fn closure_and_add(&mut self, list: &mut Vec<usize>, entry_sym: Option<SymId>) -> StateId {
        self.closure(list);
        list.sort_by_key(|&i| self.items[i].order);

        let key: Vec<u32> = list.iter().map(|&i| self.items[i].order).collect();
        if let Some(&existing) = self.set_map.get(&key) {
            return StateId(existing as u32);
        }

        let index = self.states.len();
        self.states.push(StateBuild {
            entry_sym,
            shifts: Vec::new(),
            gotos: Vec::new(),
            reduces: Vec::new(),
        });
        self.set_items.push(list.clone());
        self.set_map.insert(key, index);
        StateId(index as u32)
    }

    /// Maps an ext symbol back to the source-grammar symbol id.
    fn base_sym(&self, ext_sym: SymId) -> SymId {
        match self.ext.sym(ext_sym) {
            SymRef::Tr(tr) => self.base.tr(self.ext.tr(tr).payload).sym,
            SymRef::Nt(nt) => {
                let base_nt = self.ext.nt(nt).payload.expect("transition through augmented start");
                self.base.nt(base_nt).sym
            }
        }
    }

    /// Computes the transitions of one state. Its item list is already
    /// sorted, so items sharing a current symbol form contiguous runs.
    fn create_derived_sets(&mut self, state: usize) {
        let item_list = self.set_items[state].clone();

        let mut shifts = Vec::new();
        let mut gotos = Vec::new();
        let mut reduces = Vec::new();
        let mut derived: Vec<usize> = Vec::new();

        let mut pos = 0;
        while pos < item_list.len() {
            let item = &self.items[item_list[pos]];
            match item.sym {
                None => {
                    // End position: reduce (None marks the accept
                    // reduce of an augmented start).
                    reduces.push(self.ext.pr(item.pr).payload);
                    pos += 1;
                }
                Some(sym) => {
                    while pos < item_list.len() && self.items[item_list[pos]].sym == Some(sym) {
                        if let Some(next) = self.items[item_list[pos]].next {
                            derived.push(next);
                        }
                        pos += 1;
                    }

                    let entry = self.base_sym(sym);
                    let dest = self.closure_and_add(&mut derived, Some(entry));
                    match self.ext.sym(sym) {
                        SymRef::Tr(tr) => shifts.push((self.ext.tr(tr).payload, dest)),
                        SymRef::Nt(nt) => {
                            let base_nt =
                                self.ext.nt(nt).payload.expect("goto through augmented start");
                            gotos.push((base_nt, dest));
                        }
                    }
                    derived.clear();
                }
            }
        }

        let build = &mut self.states[state];
        build.shifts = shifts;
        build.gotos = gotos;
        build.reduces = reduces;
    }

    fn run(mut self) -> LrTables {
        self.create_items();

        // Initial states: closures of { X' -> . X } in start order.
        let augmented: Vec<(SymId, usize)> = self
            .ext
            .nonterminals()
            .iter()
            .filter(|nt| nt.payload.is_none())
            .map(|nt| (nt.sym, self.sym_first[nt.sym.index()][0]))
            .collect();
        for (_, first_item) in augmented {
            let start_sym = self.items[first_item].sym.expect("augmented production is empty");
            let start_nt = match self.ext.sym(start_sym) {
                SymRef::Nt(nt) => self.ext.nt(nt).payload.expect("augmented start of augmented start"),
                SymRef::Tr(_) => unreachable!("augmented production derives a terminal"),
            };
            let mut list = vec![first_item];
            let state = self.closure_and_add(&mut list, None);
            self.start_states.push((start_nt, state));
        }

        let mut current = 0;
        while current < self.states.len() {
            self.create_derived_sets(current);
            current += 1;
        }

        let states = self
            .states
            .into_iter()
            .enumerate()
            .map(|(i, build)| LrState {
                index: StateId(i as u32),
                entry_sym: build.entry_sym,
                shifts: build.shifts,
                gotos: build.gotos,
                reduces: build.reduces,
            })
            .collect();

        LrTables {
            states,
            start_states: self.start_states,
        }
    }
}

/// Builds the LR(0) tables for `grammar` with the given start
/// nonterminals.
pub fn generate_lr_tables<N, T, P>(
    grammar: &BnfGrammar<N, T, P>,
    start_nts: &[NtIdx],
) -> LrTables {
    assert!(!start_nts.is_empty(), "LR generation without start nonterminals");
    Generator::new(grammar, start_nts).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bnf::BnfGrammarBuilder;

    /// E : E '+' T | T ;  T : NUM ;
    fn arithmetic() -> (BnfGrammar<(), (), u32>, NtIdx) {
        let mut builder: BnfGrammarBuilder<(), (), u32> = BnfGrammarBuilder::new();
        let num = builder.create_terminal("NUM", ());
        let plus = builder.create_terminal("'+'", ());
        let e = builder.create_nonterminal("E", ());
        let t = builder.create_nonterminal("T", ());
        let (num_s, plus_s) = (builder.tr_sym(num), builder.tr_sym(plus));
        let (e_s, t_s) = (builder.nt_sym(e), builder.nt_sym(t));
        builder.add_production(e, 0, vec![e_s, plus_s, t_s]);
        builder.add_production(e, 1, vec![t_s]);
        builder.add_production(t, 2, vec![num_s]);
        (builder.build(), e)
    }

    #[test]
    fn arithmetic_grammar_has_expected_states() {
        let (grammar, start) = arithmetic();
        let tables = generate_lr_tables(&grammar, &[start]);

        assert_eq!(tables.start_states.len(), 1);
        assert_eq!(tables.start_states[0].0, start);
        // I0, and states for E, T, NUM, '+', and E '+' T.
        assert_eq!(tables.states.len(), 6);
    }

    #[test]
    fn start_state_shifts_on_num_only() {
        let (grammar, start) = arithmetic();
        let tables = generate_lr_tables(&grammar, &[start]);
        let state0 = &tables.states[tables.start_states[0].1.index()];

        assert_eq!(state0.shifts.len(), 1);
        assert_eq!(grammar.tr(state0.shifts[0].0).name, "NUM");
        assert_eq!(state0.gotos.len(), 2);
        assert!(state0.reduces.is_empty());
    }

    #[test]
    fn accept_reduce_appears_after_goto_on_start() {
        let (grammar, start) = arithmetic();
        let tables = generate_lr_tables(&grammar, &[start]);
        let state0 = &tables.states[tables.start_states[0].1.index()];
        let after_e = state0
            .gotos
            .iter()
            .find(|(nt, _)| *nt == start)
            .map(|&(_, state)| state)
            .expect("goto on E");
        let accept_state = &tables.states[after_e.index()];

        assert!(accept_state.reduces.contains(&None));
        // The dot can also advance over '+'.
        assert_eq!(accept_state.shifts.len(), 1);
    }

    #[test]
    fn generation_is_deterministic() {
        let (grammar, start) = arithmetic();
        let a = generate_lr_tables(&grammar, &[start]);
        let b = generate_lr_tables(&grammar, &[start]);

        assert_eq!(a.states.len(), b.states.len());
        for (left, right) in a.states.iter().zip(&b.states) {
            assert_eq!(left.shifts, right.shifts);
            assert_eq!(left.gotos, right.gotos);
            assert_eq!(left.reduces, right.reduces);
        }
    }

    #[test]
    fn conflicts_are_preserved() {
        // S : A | B ;  A : 'x' ;  B : 'x' ;  gives a reduce/reduce
        // conflict after shifting 'x'.
        let mut builder: BnfGrammarBuilder<(), (), u32> = BnfGrammarBuilder::new();
        let x = builder.create_terminal("'x'", ());
        let s = builder.create_nonterminal("S", ());
        let a = builder.create_nonterminal("A", ());
        let b = builder.create_nonterminal("B", ());
        let x_s = builder.tr_sym(x);
        let (a_s, b_s) = (builder.nt_sym(a), builder.nt_sym(b));
        builder.add_production(s, 0, vec![a_s]);
        builder.add_production(s, 1, vec![b_s]);
        builder.add_production(a, 2, vec![x_s]);
        builder.add_production(b, 3, vec![x_s]);
        let grammar = builder.build();

        let tables = generate_lr_tables(&grammar, &[s]);
        let conflicted = tables
            .states
            .iter()
            .find(|state| state.reduces.len() == 2)
            .expect("reduce/reduce state");
        assert_eq!(conflicted.reduces.iter().filter(|r| r.is_some()).count(), 2);
    }
}
