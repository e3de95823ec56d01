//! Plain BNF grammar representation.
//!
//! A grammar is a set of terminals, nonterminals and productions with
//! dense indices assigned in creation order. Indices double as array
//! keys in every later pass, so [`BnfGrammar::new`] re-checks their
//! density before handing the grammar out.
//!
//! The three payload parameters carry caller data: the converter uses
//! descriptor ids, the meta-grammar loader uses token kinds and rule
//! tags, and the LR generator builds an internal grammar whose payloads
//! point back at the grammar it was derived from.

/// Dense index into the unified symbol table (terminals and
/// nonterminals share one numbering).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymId(pub u32);

/// Dense terminal index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrIdx(pub u32);

/// Dense nonterminal index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NtIdx(pub u32);

/// Dense production index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrIdx(pub u32);

impl SymId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl TrIdx {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl NtIdx {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl PrIdx {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a symbol table slot refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymRef {
    Tr(TrIdx),
    Nt(NtIdx),
}

/// Terminal symbol.
#[derive(Debug)]
pub struct BnfTerminal<T> {
    pub sym: SymId,
    pub index: TrIdx,
    pub name: String,
    pub payload: T,
}

/// Nonterminal symbol with its productions in creation order.
#[derive(Debug)]
pub struct BnfNonterminal<N> {
    pub sym: SymId,
    pub index: NtIdx,
    pub name: String,
    pub payload: N,
    pub productions: Vec<PrIdx>,
}

/// Production: producing nonterminal, ordered elements, payload.
#[derive(Debug)]
pub struct BnfProduction<P> {
    pub index: PrIdx,
    pub nt: NtIdx,
    pub payload: P,
    pub elements: Vec<SymId>,
}

/// An immutable BNF grammar. Built through [`BnfGrammarBuilder`].
#[derive(Debug)]
pub struct BnfGrammar<N, T, P> {
    symbols: Vec<SymRef>,
    terminals: Vec<BnfTerminal<T>>,
    nonterminals: Vec<BnfNonterminal<N>>,
    productions: Vec<BnfProduction<P>>,
}

impl<N, T, P> BnfGrammar<N, T, P> {
    fn new(
        symbols: Vec<SymRef>,
        terminals: Vec<BnfTerminal<T>>,
        nonterminals: Vec<BnfNonterminal<N>>,
        productions: Vec<BnfProduction<P>>,
    ) -> Self {
        for (i, tr) in terminals.iter().enumerate() {
            assert_eq!(tr.index.index(), i, "terminal index mismatch");
        }
        for (i, nt) in nonterminals.iter().enumerate() {
            assert_eq!(nt.index.index(), i, "nonterminal index mismatch");
        }
        for (i, pr) in productions.iter().enumerate() {
            assert_eq!(pr.index.index(), i, "production index mismatch");
        }
        Self {
            symbols,
            terminals,
            nonterminals,
            productions,
        }
    }

    pub fn symbol_count(&self) -> usize {
        self.symbols.len()
    }

    pub fn sym(&self, sym: SymId) -> SymRef {
        self.symbols[sym.index()]
    }

    pub fn terminals(&self) -> &[BnfTerminal<T>] {
        &self.terminals
    }

    pub fn nonterminals(&self) -> &[BnfNonterminal<N>] {
        &self.nonterminals
    }

    pub fn productions(&self) -> &[BnfProduction<P>] {
        &self.productions
    }

    pub fn tr(&self, index: TrIdx) -> &BnfTerminal<T> {
        &self.terminals[index.index()]
    }

    pub fn nt(&self, index: NtIdx) -> &BnfNonterminal<N> {
        &self.nonterminals[index.index()]
    }

    pub fn pr(&self, index: PrIdx) -> &BnfProduction<P> {
        &self.productions[index.index()]
    }

    /// Name of an arbitrary symbol.
    pub fn sym_name(&self, sym: SymId) -> &str {
        match self.sym(sym) {
            SymRef::Tr(tr) => &self.tr(tr).name,
            SymRef::Nt(nt) => &self.nt(nt).name,
        }
    }
}

/// Mutable construction side of [`BnfGrammar`].
pub struct BnfGrammarBuilder<N, T, P> {
    symbols: Vec<SymRef>,
    terminals: Vec<BnfTerminal<T>>,
    nonterminals: Vec<BnfNonterminal<N>>,
    productions: Vec<BnfProduction<P>>,
}

impl<N, T, P> BnfGrammarBuilder<N, T, P> {
    pub fn new() -> Self {
        Self {
            symbols: Vec::new(),
            terminals: Vec::new(),
            nonterminals: Vec::new(),
            productions: Vec::new(),
        }
    }

    pub fn create_terminal(&mut self, name: impl Into<String>, payload: T) -> TrIdx {
        let sym = SymId(self.symbols.len() as u32);
        let index = TrIdx(self.terminals.len() as u32);
        self.symbols.push(SymRef::Tr(index));
        self.terminals.push(BnfTerminal {
            sym,
            index,
            name: name.into(),
            payload,
        });
        index
    }

    pub fn create_nonterminal(&mut self, name: impl Into<String>, payload: N) -> NtIdx {
        let sym = SymId(self.symbols.len() as u32);
        let index = NtIdx(self.nonterminals.len() as u32);
        self.symbols.push(SymRef::Nt(index));
        self.nonterminals.push(BnfNonterminal {
            sym,
            index,
            name: name.into(),
            payload,
            productions: Vec::new(),
        });
        index
    }

    /// Adds a production for `nt`. Elements must be symbols of this
    /// builder.
    pub fn add_production(&mut self, nt: NtIdx, payload: P, elements: Vec<SymId>) -> PrIdx {
        for &sym in &elements {
            assert!(sym.index() < self.symbols.len(), "foreign symbol in production");
        }
        let index = PrIdx(self.productions.len() as u32);
        self.productions.push(BnfProduction {
            index,
            nt,
            payload,
            elements,
        });
        self.nonterminals[nt.index()].productions.push(index);
        index
    }

    pub fn tr_sym(&self, index: TrIdx) -> SymId {
        self.terminals[index.index()].sym
    }

    pub fn nt_sym(&self, index: NtIdx) -> SymId {
        self.nonterminals[index.index()].sym
    }

    pub fn tr_payload(&self, index: TrIdx) -> &T {
        &self.terminals[index.index()].payload
    }

    pub fn nt_payload(&self, index: NtIdx) -> &N {
        &self.nonterminals[index.index()].payload
    }

    pub fn sym_ref(&self, sym: SymId) -> SymRef {
        self.symbols[sym.index()]
    }

    /// Freezes the grammar.
    ///
    /// # Panics
    ///
    /// Panics if some nonterminal ended up without productions; the
    /// converter guarantees at least one production per nonterminal it
    /// creates, so an empty one is a generator bug.
    pub fn build(self) -> BnfGrammar<N, T, P> {
        for nt in &self.nonterminals {
            assert!(
                !nt.productions.is_empty(),
                "nonterminal '{}' has no productions",
                nt.name
            );
        }
        BnfGrammar::new(
            self.symbols,
            self.terminals,
            self.nonterminals,
            self.productions,
        )
    }
}

impl<N, T, P> Default for BnfGrammarBuilder<N, T, P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_are_dense_and_ordered() {
        let mut builder: BnfGrammarBuilder<(), (), ()> = BnfGrammarBuilder::new();
        let a = builder.create_terminal("a", ());
        let x = builder.create_nonterminal("X", ());
        let b = builder.create_terminal("b", ());
        builder.add_production(x, (), vec![builder.tr_sym(a), builder.tr_sym(b)]);
        let grammar = builder.build();

        assert_eq!(grammar.symbol_count(), 3);
        assert_eq!(grammar.terminals().len(), 2);
        assert_eq!(grammar.nonterminals().len(), 1);
        assert_eq!(grammar.tr(TrIdx(1)).name, "b");
        assert_eq!(grammar.sym_name(SymId(1)), "X");
    }

    #[test]
    fn productions_attach_to_their_nonterminal() {
        let mut builder: BnfGrammarBuilder<(), (), ()> = BnfGrammarBuilder::new();
        let a = builder.create_terminal("a", ());
        let x = builder.create_nonterminal("X", ());
        let p0 = builder.add_production(x, (), vec![builder.tr_sym(a)]);
        let p1 = builder.add_production(x, (), vec![]);
        let grammar = builder.build();

        assert_eq!(grammar.nt(x).productions, vec![p0, p1]);
        assert_eq!(grammar.pr(p0).elements.len(), 1);
        assert!(grammar.pr(p1).elements.is_empty());
    }

    #[test]
    #[should_panic(expected = "no productions")]
    fn empty_nonterminal_is_rejected() {
        let mut builder: BnfGrammarBuilder<(), (), ()> = BnfGrammarBuilder::new();
        builder.create_nonterminal("X", ());
        builder.build();
    }
}
