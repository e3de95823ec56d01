//! Void detection.
//!
//! An expression is void when it produces no value at run time. Void
//! propagates upward; an attribute binding requires a non-void
//! sub-expression, and casts may touch no void type on either side.

use crate::analysis::property::{calculate_property, PropertyAccessor, PropertyCalculator};
use crate::analysis::GrammarBuilder;
use crate::ast::{ExprId, NtId, SyntaxExpr};
use crate::types::TypeId;
use syntagma_base::{FilePos, Result, SourceString, SynError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IsVoid {
    /// Placeholder for a nonterminal re-entered during its own
    /// computation.
    Recursion,
    False,
    True,
}

impl IsVoid {
    /// Merging alternatives: a void branch yields the other branch,
    /// and so does a recursion placeholder.
    fn merge(self, other: IsVoid) -> IsVoid {
        match (self, other) {
            (IsVoid::True, _) => other,
            (_, IsVoid::True) => self,
            (IsVoid::Recursion, _) => other,
            (_, IsVoid::Recursion) => self,
            (IsVoid::False, IsVoid::False) => IsVoid::False,
        }
    }
}

struct IsVoidAccessor;

impl PropertyAccessor<IsVoid> for IsVoidAccessor {
    fn get_nt(&self, builder: &GrammarBuilder<'_, '_>, nt: NtId) -> Option<IsVoid> {
        builder.nt_slot(nt).is_void.map(|is_void| {
            if is_void {
                IsVoid::True
            } else {
                IsVoid::False
            }
        })
    }

    fn set_nt(&self, builder: &mut GrammarBuilder<'_, '_>, nt: NtId, value: IsVoid) {
        // A nonterminal that only reaches itself produces nothing.
        let is_void = matches!(value, IsVoid::True | IsVoid::Recursion);
        builder.nt_slots[nt.index()].is_void = Some(is_void);
    }

    fn set_expr(&self, builder: &mut GrammarBuilder<'_, '_>, expr: ExprId, value: IsVoid) {
        assert!(
            value != IsVoid::Recursion,
            "illegal state: recursion placeholder in the deep phase"
        );
        builder.expr_slots[expr.index()].is_void = Some(value == IsVoid::True);
    }
}

struct IsVoidCalculator;

impl PropertyCalculator<IsVoid> for IsVoidCalculator {
    fn recursion(&mut self, _builder: &mut GrammarBuilder<'_, '_>) -> IsVoid {
        IsVoid::Recursion
    }

    fn void_type(&mut self, _builder: &mut GrammarBuilder<'_, '_>) -> IsVoid {
        IsVoid::True
    }

    fn primitive_type(&mut self, _builder: &mut GrammarBuilder<'_, '_>, _ty: TypeId) -> IsVoid {
        IsVoid::False
    }

    fn name_class_type(&mut self, _builder: &mut GrammarBuilder<'_, '_>, _ty: TypeId) -> IsVoid {
        IsVoid::False
    }

    fn nt_class_type(
        &mut self,
        _builder: &mut GrammarBuilder<'_, '_>,
        _ty: TypeId,
        _nt: NtId,
        pos: FilePos,
        sub: IsVoid,
    ) -> Result<IsVoid> {
        if sub == IsVoid::True {
            return Err(SynError::new(
                "Cannot use a void nonterminal as an explicit type",
                pos,
            ));
        }
        Ok(sub)
    }

    fn or_merge(
        &mut self,
        _builder: &mut GrammarBuilder<'_, '_>,
        _expr: Option<&SyntaxExpr<'_>>,
        _pos: FilePos,
        first: IsVoid,
        second: IsVoid,
    ) -> Result<IsVoid> {
        Ok(first.merge(second))
    }

    fn attribute(
        &mut self,
        builder: &mut GrammarBuilder<'_, '_>,
        _expr: &SyntaxExpr<'_>,
        name: SourceString,
        sub: IsVoid,
    ) -> Result<IsVoid> {
        if sub == IsVoid::True {
            return Err(SynError::at(
                format!(
                    "Cannot assign a void expression to attribute '{}'",
                    builder.name_str(name.sym)
                ),
                name,
            ));
        }
        Ok(IsVoid::False)
    }

    fn loop_expr(
        &mut self,
        _builder: &mut GrammarBuilder<'_, '_>,
        _expr: &SyntaxExpr<'_>,
        _pos: FilePos,
        sub: IsVoid,
    ) -> Result<IsVoid> {
        // A loop of void elements is itself void.
        Ok(sub)
    }

    fn const_expr(
        &mut self,
        _builder: &mut GrammarBuilder<'_, '_>,
        _expr: &SyntaxExpr<'_>,
        _pos: FilePos,
    ) -> Result<IsVoid> {
        Ok(IsVoid::False)
    }

    fn and_class(
        &mut self,
        _builder: &mut GrammarBuilder<'_, '_>,
        _expr: &SyntaxExpr<'_>,
        _pos: FilePos,
    ) -> Result<IsVoid> {
        Ok(IsVoid::False)
    }

    fn and_with_type(
        &mut self,
        _builder: &mut GrammarBuilder<'_, '_>,
        _expr: &SyntaxExpr<'_>,
        pos: FilePos,
        type_value: IsVoid,
    ) -> Result<IsVoid> {
        if type_value == IsVoid::True {
            return Err(SynError::new("Cannot use a void type", pos));
        }
        Ok(IsVoid::False)
    }

    fn cast(
        &mut self,
        _builder: &mut GrammarBuilder<'_, '_>,
        pos: FilePos,
        _cast_type: TypeId,
        cast_value: IsVoid,
        actual: IsVoid,
    ) -> Result<IsVoid> {
        if cast_value == IsVoid::True {
            return Err(SynError::new("Cannot cast to a void type", pos));
        }
        if actual == IsVoid::True {
            return Err(SynError::new("Cannot cast a void expression", pos));
        }
        // Recursion on both sides stays recursion; anything else is a
        // value.
        Ok(cast_value.merge(actual))
    }
}

impl GrammarBuilder<'_, '_> {
    pub(crate) fn calculate_is_void(&mut self) -> Result<()> {
        self.begin_calculate_is_void();
        calculate_property(self, &IsVoidAccessor, &mut IsVoidCalculator)?;
        self.end_calculate_is_void();
        Ok(())
    }
}
