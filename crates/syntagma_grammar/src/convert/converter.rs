//! The EBNF-to-BNF converter.
//!
//! Interprets the conversion assigned to every expression, producing a
//! BNF grammar in which every production carries an action. One BNF
//! nonterminal is created per user nonterminal (`N_` prefix);
//! alternations, optionals, loops and casts that need their own rules
//! get auto nonterminals (`A_<n>`), with a single shared `A_Empty` for
//! the empty production. String literals become terminals deduplicated
//! by content.
//!
//! Whenever a production's action result type differs from its owning
//! nonterminal's type, the production is moved to a fresh temporary
//! nonterminal of the result type and the owner receives a cast
//! production instead, keeping every nonterminal single-typed.

use crate::analysis::{GrammarBuilder, SymDeclRef};
use crate::ast::{render_const, ConstExpr, ExprId, NtId, SyntaxExpr, SyntaxExprKind, TerminalDecl};
use crate::convert::action::{Action, ActionFactory, ActionFields, ConstPayload};
use crate::convert::conversion::{AndFields, ComplexKind, Conversion, PartClassTag};
use crate::convert::descriptor::{NtDescriptor, PrDescriptor, RunType, RunTypeId, TrDescriptor, TypeTable};
use crate::types::{TypeId, TypeKind};
use rustc_hash::FxHashMap;
use syntagma_base::{Result, SourceString, Symbol, SynError};
use syntagma_lr::{BnfGrammar, BnfGrammarBuilder, NtIdx, SymId, SymRef, TrIdx};

/// The concrete BNF grammar: descriptors on symbols, actions on
/// productions.
pub type ConcreteBnf = BnfGrammar<NtDescriptor, TrDescriptor, PrDescriptor>;

/// Everything later stages need: the grammar, the type table, the
/// start nonterminals, and the token/type enumerations for the
/// emitter.
#[derive(Debug)]
pub struct ConversionResult {
    pub bnf: ConcreteBnf,
    pub types: TypeTable,
    pub start_nts: Vec<NtIdx>,
    /// Type of string-literal tokens, `None` when they carry no value.
    pub string_literal_type: Option<RunTypeId>,
    /// Primitive types in registration order.
    pub primitive_types: Vec<RunTypeId>,
}

/// Converts a fully analyzed grammar.
pub fn convert_grammar(builder: &GrammarBuilder<'_, '_>) -> Result<ConversionResult> {
    let grammar = builder.grammar;
    let mut converter = Converter {
        builder,
        bnf: BnfGrammarBuilder::new(),
        types: TypeTable::new(),
        auto_nt_index: 0,
        empty_nt: None,
        system_primitives: FxHashMap::default(),
        user_primitives: FxHashMap::default(),
        class_types: FxHashMap::default(),
        str_terminals: FxHashMap::default(),
        tr_map: vec![None; grammar.terminals.len()],
        nt_map: vec![None; grammar.nonterminals.len()],
        sym_cache: vec![None; grammar.exprs.len()],
        primitive_runtypes: Vec::new(),
        start_nts: Vec::new(),
    };

    // Every primitive type is converted, referenced or not.
    for &ty in &builder.primitive_types {
        converter.convert_primitive_init(ty);
    }
    // Likewise every terminal declaration.
    for tr in &grammar.terminals {
        converter.convert_terminal_init(tr);
    }
    for nt in &grammar.nonterminals {
        converter.convert_nonterminal(nt.index)?;
    }

    let string_literal_type = {
        let ty = builder.registry.string_literal_type;
        if builder.types.is_void(ty) {
            None
        } else {
            Some(converter.convert_type(ty))
        }
    };

    let Converter {
        bnf,
        types,
        start_nts,
        primitive_runtypes,
        ..
    } = converter;

    Ok(ConversionResult {
        bnf: bnf.build(),
        types,
        start_nts,
        string_literal_type,
        primitive_types: primitive_runtypes,
    })
}

/// Accumulates the elements and the action of one production.
struct PrBuilder {
    elements: Vec<SymId>,
    factory: Option<ActionFactory>,
}

impl PrBuilder {
    fn new() -> Self {
        PrBuilder {
            elements: Vec::new(),
            factory: None,
        }
    }

    fn add_element(&mut self, sym: SymId) {
        assert!(self.factory.is_none(), "illegal state: element after the action");
        self.elements.push(sym);
    }

    fn set_factory(&mut self, factory: ActionFactory) {
        assert!(self.factory.is_none(), "illegal state: action set twice");
        self.factory = Some(factory);
    }
}

struct Converter<'b, 'a, 'i> {
    builder: &'b GrammarBuilder<'a, 'i>,
    bnf: BnfGrammarBuilder<NtDescriptor, TrDescriptor, PrDescriptor>,
    types: TypeTable,
    auto_nt_index: u32,
    empty_nt: Option<NtIdx>,
    system_primitives: FxHashMap<Symbol, RunTypeId>,
    user_primitives: FxHashMap<Symbol, RunTypeId>,
    /// Class types by class name, with dense class indices.
    class_types: FxHashMap<Symbol, RunTypeId>,
    /// String-literal terminals by content.
    str_terminals: FxHashMap<Symbol, TrIdx>,
    tr_map: Vec<Option<TrIdx>>,
    nt_map: Vec<Option<NtIdx>>,
    /// Memoized symbol per expression, so the two readers of a loop
    /// element share one auto nonterminal.
    sym_cache: Vec<Option<SymId>>,
    primitive_runtypes: Vec<RunTypeId>,
    start_nts: Vec<NtIdx>,
}

impl<'a> Converter<'_, 'a, '_> {
    // ----- types ---------------------------------------------------

    fn convert_primitive_init(&mut self, ty: TypeId) {
        let (name, system) = match self.builder.types.kind(ty) {
            TypeKind::Primitive { name, system } => (name, system),
            _ => panic!("illegal state: primitive conversion of a non-primitive"),
        };
        let map = if system {
            &mut self.system_primitives
        } else {
            &mut self.user_primitives
        };
        assert!(!map.contains_key(&name), "illegal state: primitive converted twice");
        let run_ty = self.types.add(RunType::Primitive {
            name: self.builder.interner.resolve(name).to_string(),
            system,
        });
        map.insert(name, run_ty);
        self.primitive_runtypes.push(run_ty);
    }

    fn convert_type(&mut self, ty: TypeId) -> RunTypeId {
        match self.builder.types.kind(ty) {
            TypeKind::Void => self.types.void_type(),
            TypeKind::Primitive { name, system } => {
                let map = if system {
                    &self.system_primitives
                } else {
                    &self.user_primitives
                };
                *map.get(&name).expect("illegal state: unregistered primitive")
            }
            TypeKind::NtClass(_) | TypeKind::NameClass(_) => self.convert_class_type(ty),
            TypeKind::Array(element) => {
                let element = self.convert_type(element);
                self.types.add(RunType::List { element })
            }
        }
    }

    fn convert_class_type(&mut self, ty: TypeId) -> RunTypeId {
        let name = self.builder.types.class_name(ty, self.builder.grammar);
        if let Some(&existing) = self.class_types.get(&name) {
            return existing;
        }
        let index = self.class_types.len();
        let run_ty = self.types.add(RunType::Class {
            index,
            name: self.builder.interner.resolve(name).to_string(),
        });
        self.class_types.insert(name, run_ty);
        run_ty
    }

    fn convert_part_class_type(&mut self, main: ExprId, tag: PartClassTag) -> RunTypeId {
        let class = self.expr_class_type(main);
        self.types.add(RunType::PartClass { class, tag: tag.0 })
    }

    /// Concrete analysis type of an expression; defined by now.
    fn expr_type_id(&self, expr: ExprId) -> TypeId {
        self.builder
            .expr_slot(expr)
            .concrete_type
            .expect("illegal state: expression without a concrete type")
    }

    fn expr_type(&mut self, expr: ExprId) -> RunTypeId {
        let ty = self.expr_type_id(expr);
        self.convert_type(ty)
    }

    fn expr_class_type(&mut self, expr: ExprId) -> RunTypeId {
        let ty = self.expr_type_id(expr);
        assert!(self.builder.types.is_class(ty), "illegal state: class type expected");
        self.convert_class_type(ty)
    }

    // ----- symbols -------------------------------------------------

    fn sym_type(&self, sym: SymId) -> RunTypeId {
        match self.bnf.sym_ref(sym) {
            SymRef::Tr(tr) => self.bnf.tr_payload(tr).ty(),
            SymRef::Nt(nt) => self.bnf.nt_payload(nt).ty(),
        }
    }

    fn generate_auto_nt_name(&mut self) -> String {
        let name = format!("A_{}", self.auto_nt_index);
        self.auto_nt_index += 1;
        name
    }

    fn create_auto_nonterminal(&mut self, ty: RunTypeId) -> NtIdx {
        let name = self.generate_auto_nt_name();
        self.bnf.create_nonterminal(name, NtDescriptor::Auto { ty })
    }

    /// The shared `A_Empty : ;` nonterminal.
    fn empty_nonterminal(&mut self) -> NtIdx {
        if let Some(existing) = self.empty_nt {
            return existing;
        }
        let void = self.types.void_type();
        let nt = self
            .bnf
            .create_nonterminal("A_Empty", NtDescriptor::Auto { ty: void });
        self.bnf
            .add_production(nt, PrDescriptor { action: Action::Void }, Vec::new());
        self.empty_nt = Some(nt);
        nt
    }

    fn convert_terminal_init(&mut self, tr: &TerminalDecl) {
        let ty = match self.builder.tr_types[tr.index.index()] {
            Some(ty) => self.convert_type(ty),
            None => self.types.void_type(),
        };
        let original = self.builder.interner.resolve(tr.name.sym).to_string();
        let bnf_name = format!("T_{original}");
        let idx = self
            .bnf
            .create_terminal(bnf_name, TrDescriptor::Name { ty, name: original });
        self.tr_map[tr.index.index()] = Some(idx);
    }

    fn convert_nonterminal(&mut self, nt: NtId) -> Result<NtIdx> {
        if let Some(existing) = self.nt_map[nt.index()] {
            return Ok(existing);
        }

        let decl = self.builder.grammar.nt(nt);
        let concrete = self
            .builder
            .nt_slot(nt)
            .concrete_type
            .expect("illegal state: nonterminal without a concrete type");
        let ty = self.convert_type(concrete);

        let original = self.builder.interner.resolve(decl.name.sym).to_string();
        let bnf_name = format!("N_{original}");
        let idx = self.bnf.create_nonterminal(
            bnf_name,
            NtDescriptor::User { ty, name: original },
        );

        // Map before converting the body, or recursion would re-enter.
        self.nt_map[nt.index()] = Some(idx);

        self.convert_nt(decl.expr, idx)?;

        if decl.start {
            self.start_nts.push(idx);
        }
        Ok(idx)
    }

    fn convert_string_to_symbol(&mut self, text: SourceString) -> Result<SymId> {
        if let Some(&existing) = self.str_terminals.get(&text.sym) {
            return Ok(self.bnf.tr_sym(existing));
        }

        let content = self.builder.interner.resolve(text.sym);
        if content.is_empty() {
            return Err(SynError::at(
                "Empty string literal cannot be used as a grammar symbol",
                text,
            ));
        }
        let is_keyword_like = is_identifier_start(content.as_bytes()[0]);
        for &byte in content.as_bytes().iter().skip(1) {
            if is_keyword_like != is_identifier_part(byte) {
                return Err(SynError::at(
                    "Mixing identifier and non-identifier characters in a string literal",
                    text,
                ));
            }
        }

        let id = self.str_terminals.len() as u32;
        let name = format!("S_{id}");
        let string_ty = self.builder.registry.string_literal_type;
        let ty = self.convert_type(string_ty);
        let idx = self.bnf.create_terminal(
            name,
            TrDescriptor::Str {
                ty,
                text: content.to_string(),
                id,
                is_keyword_like,
            },
        );
        self.str_terminals.insert(text.sym, idx);
        Ok(self.bnf.tr_sym(idx))
    }

    // ----- productions ---------------------------------------------

    fn create_production(&mut self, nt: NtIdx, pr: PrBuilder) {
        let factory = pr
            .factory
            .expect("illegal state: production without an action");
        let element_types: Vec<RunTypeId> =
            pr.elements.iter().map(|&sym| self.sym_type(sym)).collect();
        let action = factory.create(&self.types, &element_types);
        self.create_production_with_action(nt, pr.elements, action);
    }

    fn create_production_with_action(&mut self, nt: NtIdx, elements: Vec<SymId>, action: Action) {
        let pr_type = action.result_type(&self.types);
        let nt_type = self.bnf.nt_payload(nt).ty();

        if !self.types.is_void(pr_type) && !self.types.equal(nt_type, pr_type) {
            // The action's result does not match the nonterminal. Park
            // the production on a temporary nonterminal of the result
            // type and give the owner a cast production.
            assert!(
                self.types.as_class(nt_type).is_some() && self.types.as_class(pr_type).is_some(),
                "illegal state: implicit cast between non-class types"
            );
            let temp = self.create_auto_nonterminal(pr_type);
            self.bnf
                .add_production(temp, PrDescriptor { action }, elements);
            let cast = Action::Cast {
                to: nt_type,
                from: pr_type,
            };
            let temp_sym = self.bnf.nt_sym(temp);
            self.bnf
                .add_production(nt, PrDescriptor { action: cast }, vec![temp_sym]);
        } else {
            self.bnf
                .add_production(nt, PrDescriptor { action }, elements);
        }
    }

    fn convert_expression_to_production(
        &mut self,
        nt: NtIdx,
        expr: &'a SyntaxExpr<'a>,
    ) -> Result<()> {
        let mut pr = PrBuilder::new();
        self.convert_pr(expr, &mut pr)?;
        self.create_production(nt, pr);
        Ok(())
    }

    // ----- conversion dispatch -------------------------------------

    fn conversion(&self, expr: &SyntaxExpr<'_>) -> Conversion {
        self.builder
            .expr_slot(expr.id)
            .conversion
            .clone()
            .expect("illegal state: expression without a conversion")
    }

    fn inner_expr(expr: &'a SyntaxExpr<'a>) -> &'a SyntaxExpr<'a> {
        match &expr.kind {
            SyntaxExprKind::Attribute { expr: inner, .. }
            | SyntaxExprKind::This { expr: inner, .. }
            | SyntaxExprKind::Cast { expr: inner, .. }
            | SyntaxExprKind::ZeroOne { expr: inner } => inner,
            _ => panic!("illegal state: expression without a sub-expression"),
        }
    }

    fn and_elements(expr: &'a SyntaxExpr<'a>) -> &'a [&'a SyntaxExpr<'a>] {
        match &expr.kind {
            SyntaxExprKind::And { elements, .. } => elements,
            _ => panic!("illegal state: AND conversion of a non-AND"),
        }
    }

    /// Lowers `expr` into productions of `nt`.
    fn convert_nt(&mut self, expr: &'a SyntaxExpr<'a>, nt: NtIdx) -> Result<()> {
        match self.conversion(expr) {
            Conversion::This => {
                let inner = Self::inner_expr(expr);
                self.convert_nt(inner, nt)
            }
            Conversion::Or(_) => {
                let alternatives = match &expr.kind {
                    SyntaxExprKind::Or { alternatives } => *alternatives,
                    _ => panic!("illegal state: OR conversion of a non-OR"),
                };
                for alternative in alternatives {
                    self.convert_expression_to_production(nt, alternative)?;
                }
                Ok(())
            }
            Conversion::ZeroOne(_) => {
                // The value production and the empty one.
                self.convert_expression_to_production(nt, Self::inner_expr(expr))?;
                let mut void_pr = PrBuilder::new();
                void_pr.set_factory(ActionFactory::Void);
                self.create_production(nt, void_pr);
                Ok(())
            }
            Conversion::ZeroMany { dead } => self.convert_nt_zero_many(nt, dead, expr),
            Conversion::OneMany { dead } => self.convert_nt_one_many(nt, dead, expr),
            _ => self.convert_expression_to_production(nt, expr),
        }
    }

    /// Lowers `expr` as part of a production under construction.
    fn convert_pr(&mut self, expr: &'a SyntaxExpr<'a>, pr: &mut PrBuilder) -> Result<()> {
        match self.conversion(expr) {
            Conversion::Empty => {
                pr.set_factory(ActionFactory::Void);
                Ok(())
            }
            Conversion::Const => {
                let const_expr = match &expr.kind {
                    SyntaxExprKind::Const { expr } => *expr,
                    _ => panic!("illegal state: const conversion of a non-const"),
                };
                let ty = self.expr_type(expr.id);
                pr.set_factory(ActionFactory::Const {
                    ty,
                    value: self.const_payload(const_expr),
                });
                Ok(())
            }
            Conversion::Cast => {
                let inner = Self::inner_expr(expr);
                let actual = self.expr_type_id(inner.id);
                let cast = self
                    .builder
                    .expr_slot(expr.id)
                    .cast_type
                    .expect("illegal state: unresolved cast type");
                if self.builder.types.equal(cast, actual) {
                    // Same type on both sides; no action needed.
                    self.convert_pr(inner, pr)
                } else {
                    let sym = self.convert_sym(inner)?;
                    pr.add_element(sym);
                    let to = self.convert_class_type(cast);
                    pr.set_factory(ActionFactory::Cast { to });
                    Ok(())
                }
            }
            Conversion::This => self.convert_pr(Self::inner_expr(expr), pr),
            Conversion::Name { dead } | Conversion::Str { dead } => {
                self.delegate_pr_to_sym(expr, pr, dead)
            }
            Conversion::ZeroMany { dead } | Conversion::OneMany { dead } => {
                self.delegate_pr_to_sym(expr, pr, dead)
            }
            Conversion::Or(kind) | Conversion::ZeroOne(kind) => {
                self.delegate_pr_to_sym(expr, pr, kind.is_dead())
            }
            Conversion::TopAttribute => {
                let inner = Self::inner_expr(expr);
                let sym = self.convert_sym(inner)?;
                pr.add_element(sym);
                let class = self.expr_class_type(expr.id);
                pr.set_factory(ActionFactory::Class {
                    class,
                    fields: self.single_attribute_fields(expr),
                });
                Ok(())
            }
            Conversion::AttrAttribute => {
                let inner = Self::inner_expr(expr);
                let sym = self.convert_sym(inner)?;
                pr.add_element(sym);
                pr.set_factory(ActionFactory::Copy);
                Ok(())
            }
            Conversion::PartClassAttribute { main, tag } => {
                let inner = Self::inner_expr(expr);
                let sym = self.convert_sym(inner)?;
                pr.add_element(sym);
                let part = self.convert_part_class_type(main, tag);
                pr.set_factory(ActionFactory::PartClass {
                    part,
                    fields: self.single_attribute_fields(expr),
                });
                Ok(())
            }
            Conversion::ClassAttribute { main } => {
                let inner = Self::inner_expr(expr);
                let sym = self.convert_sym(inner)?;
                pr.add_element(sym);
                let class = self.expr_class_type(main);
                pr.set_factory(ActionFactory::Class {
                    class,
                    fields: self.single_attribute_fields(expr),
                });
                Ok(())
            }
            Conversion::VoidAnd => {
                self.add_and_elements(expr, pr)?;
                pr.set_factory(ActionFactory::Void);
                Ok(())
            }
            Conversion::ThisAnd { result_index, .. }
            | Conversion::AttributeAnd { result_index, .. } => {
                self.add_and_elements(expr, pr)?;
                pr.set_factory(ActionFactory::ResultAnd { index: result_index });
                Ok(())
            }
            Conversion::ClassAnd { main, fields } => {
                self.add_and_elements(expr, pr)?;
                let class = self.expr_class_type(main);
                let fields = self.convert_fields(main, &fields);
                pr.set_factory(ActionFactory::Class { class, fields });
                Ok(())
            }
            Conversion::PartClassAnd { main, tag, fields } => {
                self.add_and_elements(expr, pr)?;
                let part = self.convert_part_class_type(main, tag);
                let fields = self.convert_fields(main, &fields);
                pr.set_factory(ActionFactory::PartClass { part, fields });
                Ok(())
            }
        }
    }

    /// Lowers `expr` into a single grammar symbol, memoized per
    /// expression.
    fn convert_sym(&mut self, expr: &'a SyntaxExpr<'a>) -> Result<SymId> {
        if let Some(existing) = self.sym_cache[expr.id.index()] {
            return Ok(existing);
        }
        let sym = self.convert_sym_uncached(expr)?;
        self.sym_cache[expr.id.index()] = Some(sym);
        Ok(sym)
    }

    fn convert_sym_uncached(&mut self, expr: &'a SyntaxExpr<'a>) -> Result<SymId> {
        match self.conversion(expr) {
            Conversion::Empty => {
                let nt = self.empty_nonterminal();
                Ok(self.bnf.nt_sym(nt))
            }
            Conversion::Const => {
                let ty = self.expr_type(expr.id);
                self.delegate_sym_to_nt(expr, ty)
            }
            Conversion::Cast => {
                let inner = Self::inner_expr(expr);
                let actual = self.expr_type_id(inner.id);
                let cast = self
                    .builder
                    .expr_slot(expr.id)
                    .cast_type
                    .expect("illegal state: unresolved cast type");
                if self.builder.types.equal(cast, actual) {
                    self.convert_sym(inner)
                } else {
                    let ty = self.convert_class_type(cast);
                    self.delegate_sym_to_nt(expr, ty)
                }
            }
            Conversion::This => self.convert_sym(Self::inner_expr(expr)),
            Conversion::Name { .. } => {
                let resolved = self
                    .builder
                    .expr_slot(expr.id)
                    .resolved
                    .expect("illegal state: unresolved name");
                match resolved {
                    SymDeclRef::Terminal(tr) => {
                        let idx = self.tr_map[tr.index()].expect("illegal state: unconverted terminal");
                        Ok(self.bnf.tr_sym(idx))
                    }
                    SymDeclRef::Nonterminal(nt) => {
                        let idx = self.convert_nonterminal(nt)?;
                        Ok(self.bnf.nt_sym(idx))
                    }
                }
            }
            Conversion::Str { .. } => {
                let text = match &expr.kind {
                    SyntaxExprKind::StrLiteral { text } => *text,
                    _ => panic!("illegal state: string conversion of a non-literal"),
                };
                self.convert_string_to_symbol(text)
            }
            Conversion::ZeroMany { dead } | Conversion::OneMany { dead } => {
                let ty = if self.is_loop_void(dead, expr) {
                    self.types.void_type()
                } else {
                    self.loop_list_type(expr)?
                };
                self.delegate_sym_to_nt(expr, ty)
            }
            Conversion::Or(kind) | Conversion::ZeroOne(kind) => {
                let ty = self.complex_result_type(kind, expr)?;
                self.delegate_sym_to_nt(expr, ty)
            }
            Conversion::TopAttribute => {
                let ty = self.expr_class_type(expr.id);
                self.delegate_sym_to_nt(expr, ty)
            }
            Conversion::AttrAttribute => self.convert_sym(Self::inner_expr(expr)),
            Conversion::PartClassAttribute { main, tag } => {
                let ty = self.convert_part_class_type(main, tag);
                self.delegate_sym_to_nt(expr, ty)
            }
            Conversion::ClassAttribute { main } => {
                let ty = self.expr_class_type(main);
                self.delegate_sym_to_nt(expr, ty)
            }
            Conversion::VoidAnd => {
                let void = self.types.void_type();
                self.delegate_sym_to_nt(expr, void)
            }
            Conversion::ThisAnd { main, .. } => {
                let ty = self.expr_type(main);
                assert!(!self.types.is_void(ty), "illegal state: void this-AND");
                self.delegate_sym_to_nt(expr, ty)
            }
            Conversion::AttributeAnd { attr, .. } => {
                let inner = Self::inner_expr(self.builder.grammar.expr(attr));
                let ty = self.expr_type(inner.id);
                assert!(!self.types.is_void(ty), "illegal state: void attribute value");
                self.delegate_sym_to_nt(expr, ty)
            }
            Conversion::ClassAnd { main, .. } => {
                let ty = self.expr_class_type(main);
                self.delegate_sym_to_nt(expr, ty)
            }
            Conversion::PartClassAnd { main, tag, .. } => {
                let ty = self.convert_part_class_type(main, tag);
                self.delegate_sym_to_nt(expr, ty)
            }
        }
    }

    // ----- delegate helpers ----------------------------------------

    fn delegate_pr_to_sym(
        &mut self,
        expr: &'a SyntaxExpr<'a>,
        pr: &mut PrBuilder,
        dead: bool,
    ) -> Result<()> {
        let sym = self.convert_sym(expr)?;
        pr.add_element(sym);
        let ty = self.sym_type(sym);
        pr.set_factory(if dead || self.types.is_void(ty) {
            ActionFactory::Void
        } else {
            ActionFactory::Copy
        });
        Ok(())
    }

    fn delegate_sym_to_nt(&mut self, expr: &'a SyntaxExpr<'a>, ty: RunTypeId) -> Result<SymId> {
        let nt = self.create_auto_nonterminal(ty);
        self.convert_nt(expr, nt)?;
        Ok(self.bnf.nt_sym(nt))
    }

    fn add_and_elements(&mut self, expr: &'a SyntaxExpr<'a>, pr: &mut PrBuilder) -> Result<()> {
        for element in Self::and_elements(expr) {
            let sym = self.convert_sym(element)?;
            pr.add_element(sym);
        }
        Ok(())
    }

    // ----- loops ---------------------------------------------------

    fn is_loop_void(&self, dead: bool, expr: &SyntaxExpr<'_>) -> bool {
        if dead {
            return true;
        }
        let ty = self.expr_type_id(expr.id);
        self.builder.types.is_void(ty)
    }

    fn loop_list_type(&mut self, expr: &'a SyntaxExpr<'a>) -> Result<RunTypeId> {
        let body = expr.loop_body().expect("illegal state: loop without a body");
        let element_sym = self.convert_sym(body.expr)?;
        let element = self.sym_type(element_sym);
        assert!(!self.types.is_void(element), "illegal state: void list element");
        Ok(self.types.add(RunType::List { element }))
    }

    fn convert_nt_one_many(
        &mut self,
        nt: NtIdx,
        dead: bool,
        expr: &'a SyntaxExpr<'a>,
    ) -> Result<()> {
        if self.is_loop_void(dead, expr) {
            self.convert_nt_one_many_with(nt, expr, ActionFactory::Void, ActionFactory::Void)
        } else {
            let list = self.loop_list_type(expr)?;
            let has_separator = expr
                .loop_body()
                .expect("illegal state: loop without a body")
                .separator
                .is_some();
            self.convert_nt_one_many_with(
                nt,
                expr,
                ActionFactory::NextList { list, has_separator },
                ActionFactory::FirstList { list },
            )
        }
    }

    fn convert_nt_one_many_with(
        &mut self,
        nt: NtIdx,
        expr: &'a SyntaxExpr<'a>,
        many_factory: ActionFactory,
        one_factory: ActionFactory,
    ) -> Result<()> {
        let body = expr.loop_body().expect("illegal state: loop without a body");

        // The recursive production: list [separator] element.
        let mut many = PrBuilder::new();
        many.add_element(self.bnf.nt_sym(nt));
        if let Some(separator) = body.separator {
            let separator_sym = self.convert_sym(separator)?;
            many.add_element(separator_sym);
        }
        let element_sym = self.convert_sym(body.expr)?;
        many.add_element(element_sym);
        many.set_factory(many_factory);
        self.create_production(nt, many);

        // The terminal production: element.
        let mut one = PrBuilder::new();
        one.add_element(element_sym);
        one.set_factory(one_factory);
        self.create_production(nt, one);
        Ok(())
    }

    fn convert_nt_zero_many(
        &mut self,
        nt: NtIdx,
        dead: bool,
        expr: &'a SyntaxExpr<'a>,
    ) -> Result<()> {
        let (list_ty, head_factory) = if self.is_loop_void(dead, expr) {
            (self.types.void_type(), ActionFactory::Void)
        } else {
            (self.loop_list_type(expr)?, ActionFactory::Copy)
        };

        // The nested one-many list.
        let one_many_nt = self.create_auto_nonterminal(list_ty);
        self.convert_nt_one_many(one_many_nt, dead, expr)?;

        let mut head = PrBuilder::new();
        head.add_element(self.bnf.nt_sym(one_many_nt));
        head.set_factory(head_factory);
        self.create_production(nt, head);

        // The empty-list production.
        let mut empty = PrBuilder::new();
        empty.set_factory(ActionFactory::Void);
        self.create_production(nt, empty);
        Ok(())
    }

    // ----- misc ----------------------------------------------------

    /// Result type of an `Or`/`ZeroOne` in its context.
    fn complex_result_type(&mut self, kind: ComplexKind, expr: &SyntaxExpr<'_>) -> Result<RunTypeId> {
        Ok(match kind {
            ComplexKind::Top => self.expr_type(expr.id),
            ComplexKind::Dead => self.types.void_type(),
            ComplexKind::ThisAnd { main } => {
                let ty = self.expr_type(main);
                assert!(!self.types.is_void(ty), "illegal state: void this-AND");
                ty
            }
            ComplexKind::AttrAnd { attr } => {
                let inner = Self::inner_expr(self.builder.grammar.expr(attr));
                let ty = self.expr_type(inner.id);
                assert!(!self.types.is_void(ty), "illegal state: void attribute value");
                ty
            }
            ComplexKind::PartClassAnd { main, tag } => self.convert_part_class_type(main, tag),
            ComplexKind::ClassAnd { main } => self.expr_class_type(main),
        })
    }

    /// Field list of an attribute element lowered on its own: one
    /// attribute at offset 0.
    fn single_attribute_fields(&self, expr: &SyntaxExpr<'_>) -> ActionFields {
        let name = match &expr.kind {
            SyntaxExprKind::Attribute { name, .. } => name.sym,
            _ => panic!("illegal state: attribute fields of a non-attribute"),
        };
        ActionFields {
            attributes: vec![(0, self.builder.interner.resolve(name).to_string())],
            part_classes: Vec::new(),
            nested_class: None,
        }
    }

    fn convert_fields(&mut self, main: ExprId, fields: &AndFields) -> ActionFields {
        ActionFields {
            attributes: fields
                .attributes
                .iter()
                .map(|&(index, name)| (index, self.builder.interner.resolve(name).to_string()))
                .collect(),
            part_classes: fields
                .part_classes
                .iter()
                .map(|&(index, tag)| (index, self.convert_part_class_type(main, tag)))
                .collect(),
            nested_class: fields.nested_class,
        }
    }

    fn const_payload(&self, expr: &ConstExpr<'_>) -> ConstPayload {
        match expr {
            ConstExpr::Integer(value) => ConstPayload::Integer(*value),
            ConstExpr::Str(text) => {
                ConstPayload::Str(self.builder.interner.resolve(text.sym).to_string())
            }
            ConstExpr::Bool(value) => ConstPayload::Bool(*value),
            ConstExpr::Native(_) => {
                ConstPayload::Native(render_const(expr, self.builder.interner))
            }
        }
    }
}

fn is_identifier_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

fn is_identifier_part(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}
