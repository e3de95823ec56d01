//! Generic two-phase property calculation.
//!
//! A property (is-void, general type, concrete type) is a value
//! attached to every nonterminal and every expression, where the value
//! of a nonterminal depends on its body and bodies reference other
//! nonterminals, possibly cyclically.
//!
//! Phase one (root) computes the property of every nonterminal in
//! declaration order. Re-entering a nonterminal that is currently
//! being computed invokes the calculator's recursion hook, which
//! decides the placeholder value. Inner visits do not store values;
//! each nonterminal is committed only by its own top-level
//! calculation.
//!
//! Phase two (deep) walks every expression subtree again; nonterminal
//! references now read the committed values, and every visited
//! expression gets its property stored.

use crate::analysis::{AndMeaning, GrammarBuilder, SymDeclRef};
use crate::ast::{ExprId, NtId, SyntaxExpr, SyntaxExprKind};
use crate::types::{TypeId, TypeKind};
use syntagma_base::{FilePos, Result, SourceString};

/// Reads and writes one property on nonterminals and expressions.
pub(crate) trait PropertyAccessor<T> {
    fn get_nt(&self, builder: &GrammarBuilder<'_, '_>, nt: NtId) -> Option<T>;
    fn set_nt(&self, builder: &mut GrammarBuilder<'_, '_>, nt: NtId, value: T);
    fn set_expr(&self, builder: &mut GrammarBuilder<'_, '_>, expr: ExprId, value: T);
}

/// Computes one property, one hook per AST shape.
pub(crate) trait PropertyCalculator<T: Clone> {
    /// Value of a nonterminal re-entered during its own computation.
    fn recursion(&mut self, builder: &mut GrammarBuilder<'_, '_>) -> T;
    fn void_type(&mut self, builder: &mut GrammarBuilder<'_, '_>) -> T;
    fn primitive_type(&mut self, builder: &mut GrammarBuilder<'_, '_>, ty: TypeId) -> T;
    fn name_class_type(&mut self, builder: &mut GrammarBuilder<'_, '_>, ty: TypeId) -> T;
    fn nt_class_type(
        &mut self,
        builder: &mut GrammarBuilder<'_, '_>,
        ty: TypeId,
        nt: NtId,
        pos: FilePos,
        sub: T,
    ) -> Result<T>;
    /// Merges two alternative values. `expr` is the alternative that
    /// produced `second`, when there is one.
    fn or_merge(
        &mut self,
        builder: &mut GrammarBuilder<'_, '_>,
        expr: Option<&SyntaxExpr<'_>>,
        pos: FilePos,
        first: T,
        second: T,
    ) -> Result<T>;
    fn attribute(
        &mut self,
        builder: &mut GrammarBuilder<'_, '_>,
        expr: &SyntaxExpr<'_>,
        name: SourceString,
        sub: T,
    ) -> Result<T>;
    fn loop_expr(
        &mut self,
        builder: &mut GrammarBuilder<'_, '_>,
        expr: &SyntaxExpr<'_>,
        pos: FilePos,
        sub: T,
    ) -> Result<T>;
    fn const_expr(
        &mut self,
        builder: &mut GrammarBuilder<'_, '_>,
        expr: &SyntaxExpr<'_>,
        pos: FilePos,
    ) -> Result<T>;
    /// AND with class meaning and no explicit type.
    fn and_class(
        &mut self,
        builder: &mut GrammarBuilder<'_, '_>,
        expr: &SyntaxExpr<'_>,
        pos: FilePos,
    ) -> Result<T>;
    /// AND with class meaning and an explicit type annotation.
    fn and_with_type(
        &mut self,
        builder: &mut GrammarBuilder<'_, '_>,
        expr: &SyntaxExpr<'_>,
        pos: FilePos,
        type_value: T,
    ) -> Result<T>;
    fn cast(
        &mut self,
        builder: &mut GrammarBuilder<'_, '_>,
        pos: FilePos,
        cast_type: TypeId,
        cast_value: T,
        actual: T,
    ) -> Result<T>;
}

/// Runs both phases over every nonterminal, in declaration order.
pub(crate) fn calculate_property<'a, T, A, C>(
    builder: &mut GrammarBuilder<'a, '_>,
    accessor: &A,
    calc: &mut C,
) -> Result<()>
where
    T: Clone,
    A: PropertyAccessor<T>,
    C: PropertyCalculator<T>,
{
    let nt_count = builder.grammar.nonterminals.len();

    let mut engine = Engine {
        builder,
        accessor,
        calc,
        deep: false,
        _value: std::marker::PhantomData,
    };
    for index in 0..nt_count {
        engine.root_calculate(NtId(index as u32))?;
    }

    engine.deep = true;
    for index in 0..nt_count {
        engine.deep_calculate(NtId(index as u32))?;
    }
    Ok(())
}

struct Engine<'e, 'a, 'i, T, A, C> {
    builder: &'e mut GrammarBuilder<'a, 'i>,
    accessor: &'e A,
    calc: &'e mut C,
    deep: bool,
    _value: std::marker::PhantomData<T>,
}

impl<'a, T, A, C> Engine<'_, 'a, '_, T, A, C>
where
    T: Clone,
    A: PropertyAccessor<T>,
    C: PropertyCalculator<T>,
{
    fn root_calculate(&mut self, nt: NtId) -> Result<()> {
        if self.accessor.get_nt(self.builder, nt).is_some() {
            return Ok(());
        }
        let pos = self.builder.grammar.nt(nt).name.pos;
        let value = self.visit_nt_ref(nt, pos)?;
        self.accessor.set_nt(self.builder, nt, value);
        Ok(())
    }

    fn deep_calculate(&mut self, nt: NtId) -> Result<()> {
        let decl = self.builder.grammar.nt(nt);
        let pos = decl.name.pos;
        if let Some(ty) = self.builder.nt_slot(nt).explicit_type {
            self.process_cast(ty, decl.expr, pos)?;
        } else {
            self.visit_expr(decl.expr, pos)?;
        }
        Ok(())
    }

    /// A nonterminal seen through a reference. In the root phase this
    /// may recurse into the body; in the deep phase it only reads the
    /// committed value.
    fn visit_nt_ref(&mut self, nt: NtId, pos: FilePos) -> Result<T> {
        if self.deep {
            return Ok(self
                .accessor
                .get_nt(self.builder, nt)
                .expect("illegal state: property read before the root phase"));
        }

        if let Some(value) = self.accessor.get_nt(self.builder, nt) {
            return Ok(value);
        }
        if self.builder.nt_slot(nt).visiting {
            return Ok(self.calc.recursion(self.builder));
        }

        self.builder.nt_slots[nt.index()].visiting = true;
        let result = self.compute_nt_body(nt, pos);
        self.builder.nt_slots[nt.index()].visiting = false;
        result
    }

    fn compute_nt_body(&mut self, nt: NtId, _pos: FilePos) -> Result<T> {
        let decl = self.builder.grammar.nt(nt);
        let pos = decl.name.pos;
        if let Some(ty) = self.builder.nt_slot(nt).explicit_type {
            // An explicit type behaves like a cast of the body.
            self.process_cast(ty, decl.expr, pos)
        } else {
            self.visit_expr(decl.expr, pos)
        }
    }

    fn process_cast(&mut self, ty: TypeId, sub: &'a SyntaxExpr<'a>, pos: FilePos) -> Result<T> {
        let type_value = self.visit_type(ty, pos)?;
        let sub_value = self.visit_expr(sub, pos)?;
        self.calc.cast(self.builder, pos, ty, type_value, sub_value)
    }

    fn visit_type(&mut self, ty: TypeId, pos: FilePos) -> Result<T> {
        match self.builder.types.kind(ty) {
            TypeKind::Void => Ok(self.calc.void_type(self.builder)),
            TypeKind::Primitive { .. } => Ok(self.calc.primitive_type(self.builder, ty)),
            TypeKind::NameClass(_) => Ok(self.calc.name_class_type(self.builder, ty)),
            TypeKind::NtClass(nt) => {
                let sub = self.visit_nt_ref(nt, pos)?;
                self.calc.nt_class_type(self.builder, ty, nt, pos, sub)
            }
            TypeKind::Array(_) => panic!("illegal state: array used as a declared type"),
        }
    }

    fn visit_expr(&mut self, expr: &'a SyntaxExpr<'a>, pos: FilePos) -> Result<T> {
        let value = self.compute_expr(expr, pos)?;
        if self.deep {
            self.accessor.set_expr(self.builder, expr.id, value.clone());
        }
        Ok(value)
    }

    fn merge_alternatives(
        &mut self,
        exprs: &[&'a SyntaxExpr<'a>],
        pos: FilePos,
    ) -> Result<T> {
        let mut result = self.calc.void_type(self.builder);
        for expr in exprs {
            let value = self.visit_expr(expr, pos)?;
            result = self
                .calc
                .or_merge(self.builder, Some(expr), pos, result, value)?;
        }
        Ok(result)
    }

    fn compute_expr(&mut self, expr: &'a SyntaxExpr<'a>, pos: FilePos) -> Result<T> {
        match &expr.kind {
            SyntaxExprKind::Empty => Ok(self.calc.void_type(self.builder)),
            SyntaxExprKind::Or { alternatives } => self.merge_alternatives(alternatives, pos),
            SyntaxExprKind::And { and_id, .. } => {
                let meaning = self.builder.and_meaning(*and_id).clone();
                if self.deep {
                    for id in meaning.non_result() {
                        let sub = self.builder.grammar.expr(*id);
                        self.visit_expr(sub, pos)?;
                    }
                }
                match meaning {
                    AndMeaning::Void { .. } => Ok(self.calc.void_type(self.builder)),
                    AndMeaning::This { result_elements, .. } => {
                        let exprs: Vec<&SyntaxExpr<'_>> = result_elements
                            .iter()
                            .map(|id| self.builder.grammar.expr(*id))
                            .collect();
                        self.merge_alternatives(&exprs, pos)
                    }
                    AndMeaning::Class { .. } => {
                        match self.builder.expr_slot(expr.id).and_type {
                            Some(ty) => {
                                let type_value = self.visit_type(ty, pos)?;
                                self.calc.and_with_type(self.builder, expr, pos, type_value)
                            }
                            None => self.calc.and_class(self.builder, expr, pos),
                        }
                    }
                }
            }
            SyntaxExprKind::Attribute { name, expr: inner } => {
                let sub = self.visit_expr(inner, name.pos)?;
                self.calc.attribute(self.builder, expr, *name, sub)
            }
            SyntaxExprKind::This { pos: this_pos, expr: inner } => {
                self.visit_expr(inner, *this_pos)
            }
            SyntaxExprKind::NameRef { name } => {
                let resolved = self
                    .builder
                    .expr_slot(expr.id)
                    .resolved
                    .expect("illegal state: unresolved name in a property pass");
                match resolved {
                    SymDeclRef::Terminal(tr) => match self.builder.tr_types[tr.index()] {
                        Some(ty) => self.visit_type(ty, name.pos),
                        None => Ok(self.calc.void_type(self.builder)),
                    },
                    SymDeclRef::Nonterminal(nt) => self.visit_nt_ref(nt, name.pos),
                }
            }
            SyntaxExprKind::StrLiteral { text } => {
                let ty = self.builder.registry.string_literal_type;
                self.visit_type(ty, text.pos)
            }
            SyntaxExprKind::Cast { raw_type, expr: inner } => {
                let ty = self
                    .builder
                    .expr_slot(expr.id)
                    .cast_type
                    .expect("illegal state: unresolved cast type");
                self.process_cast(ty, inner, raw_type.pos)
            }
            SyntaxExprKind::ZeroOne { expr: inner } => self.visit_expr(inner, pos),
            SyntaxExprKind::ZeroMany { body } | SyntaxExprKind::OneMany { body } => {
                if self.deep {
                    if let Some(separator) = body.separator {
                        self.visit_expr(separator, body.separator_pos)?;
                    }
                }
                let sub = self.visit_expr(body.expr, pos)?;
                self.calc.loop_expr(self.builder, expr, pos, sub)
            }
            SyntaxExprKind::Const { .. } => self.calc.const_expr(self.builder, expr, pos),
        }
    }
}
