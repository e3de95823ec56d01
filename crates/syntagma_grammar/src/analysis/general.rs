//! General type calculation.
//!
//! The coarse categories (void, primitive, array, class) are computed
//! before concrete types so that incompatible alternatives and casts
//! across categories are rejected early, while recursion placeholders
//! are still in play.

use crate::analysis::property::{calculate_property, PropertyAccessor, PropertyCalculator};
use crate::analysis::GrammarBuilder;
use crate::ast::{ExprId, NtId, SyntaxExpr};
use crate::types::{GeneralType, TypeId};
use syntagma_base::{FilePos, Result, SourceString, SynError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GtValue {
    Recursion,
    Concrete(GeneralType),
}

impl GtValue {
    fn describe(self) -> &'static str {
        match self {
            GtValue::Recursion => "recursion",
            GtValue::Concrete(general) => general.describe(),
        }
    }

    /// Void and recursion both yield to the other operand; recursion
    /// is the more privileged of the two because it may still take any
    /// category in a cast.
    fn merge(self, other: GtValue, pos: FilePos) -> Result<GtValue> {
        match (self, other) {
            (GtValue::Concrete(GeneralType::Void), _) => Ok(other),
            (_, GtValue::Concrete(GeneralType::Void)) => Ok(self),
            (GtValue::Recursion, _) => Ok(other),
            (_, GtValue::Recursion) => Ok(self),
            _ if self == other => Ok(self),
            _ => Err(SynError::new(
                format!(
                    "Incompatible types of alternative rules: {} and {}",
                    self.describe(),
                    other.describe()
                ),
                pos,
            )),
        }
    }
}

struct GeneralTypeAccessor;

impl PropertyAccessor<GtValue> for GeneralTypeAccessor {
    fn get_nt(&self, builder: &GrammarBuilder<'_, '_>, nt: NtId) -> Option<GtValue> {
        builder.nt_slot(nt).general_type.map(GtValue::Concrete)
    }

    fn set_nt(&self, builder: &mut GrammarBuilder<'_, '_>, nt: NtId, value: GtValue) {
        let general = match value {
            GtValue::Recursion => GeneralType::Void,
            GtValue::Concrete(general) => general,
        };
        builder.nt_slots[nt.index()].general_type = Some(general);
    }

    fn set_expr(&self, builder: &mut GrammarBuilder<'_, '_>, expr: ExprId, value: GtValue) {
        let general = match value {
            GtValue::Recursion => {
                panic!("illegal state: recursion placeholder in the deep phase")
            }
            GtValue::Concrete(general) => general,
        };
        builder.expr_slots[expr.index()].general_type = Some(general);
    }
}

struct GeneralTypeCalculator;

impl PropertyCalculator<GtValue> for GeneralTypeCalculator {
    fn recursion(&mut self, _builder: &mut GrammarBuilder<'_, '_>) -> GtValue {
        GtValue::Recursion
    }

    fn void_type(&mut self, _builder: &mut GrammarBuilder<'_, '_>) -> GtValue {
        GtValue::Concrete(GeneralType::Void)
    }

    fn primitive_type(&mut self, _builder: &mut GrammarBuilder<'_, '_>, _ty: TypeId) -> GtValue {
        GtValue::Concrete(GeneralType::Primitive)
    }

    fn name_class_type(&mut self, _builder: &mut GrammarBuilder<'_, '_>, _ty: TypeId) -> GtValue {
        GtValue::Concrete(GeneralType::Class)
    }

    fn nt_class_type(
        &mut self,
        builder: &mut GrammarBuilder<'_, '_>,
        _ty: TypeId,
        nt: NtId,
        pos: FilePos,
        sub: GtValue,
    ) -> Result<GtValue> {
        if !matches!(sub, GtValue::Concrete(GeneralType::Class) | GtValue::Recursion) {
            let name = builder.grammar.nt(nt).name;
            return Err(SynError::new(
                format!(
                    "Cannot use a non-class nonterminal '{}' as an explicit type",
                    builder.name_str(name.sym)
                ),
                pos,
            ));
        }
        Ok(sub)
    }

    fn or_merge(
        &mut self,
        _builder: &mut GrammarBuilder<'_, '_>,
        _expr: Option<&SyntaxExpr<'_>>,
        pos: FilePos,
        first: GtValue,
        second: GtValue,
    ) -> Result<GtValue> {
        first.merge(second, pos)
    }

    fn attribute(
        &mut self,
        _builder: &mut GrammarBuilder<'_, '_>,
        _expr: &SyntaxExpr<'_>,
        _name: SourceString,
        sub: GtValue,
    ) -> Result<GtValue> {
        // Voidness was already rejected by the previous pass.
        assert!(
            sub != GtValue::Concrete(GeneralType::Void),
            "illegal state: void attribute after the void pass"
        );
        Ok(GtValue::Concrete(GeneralType::Class))
    }

    fn loop_expr(
        &mut self,
        builder: &mut GrammarBuilder<'_, '_>,
        expr: &SyntaxExpr<'_>,
        _pos: FilePos,
        _sub: GtValue,
    ) -> Result<GtValue> {
        let is_void = builder
            .expr_slot(expr.id)
            .is_void
            .expect("illegal state: loop voidness not computed");
        Ok(GtValue::Concrete(if is_void {
            GeneralType::Void
        } else {
            GeneralType::Array
        }))
    }

    fn const_expr(
        &mut self,
        _builder: &mut GrammarBuilder<'_, '_>,
        _expr: &SyntaxExpr<'_>,
        _pos: FilePos,
    ) -> Result<GtValue> {
        Ok(GtValue::Concrete(GeneralType::Primitive))
    }

    fn and_class(
        &mut self,
        _builder: &mut GrammarBuilder<'_, '_>,
        _expr: &SyntaxExpr<'_>,
        _pos: FilePos,
    ) -> Result<GtValue> {
        Ok(GtValue::Concrete(GeneralType::Class))
    }

    fn and_with_type(
        &mut self,
        _builder: &mut GrammarBuilder<'_, '_>,
        _expr: &SyntaxExpr<'_>,
        pos: FilePos,
        type_value: GtValue,
    ) -> Result<GtValue> {
        assert!(
            type_value != GtValue::Concrete(GeneralType::Void),
            "illegal state: void AND type after the void pass"
        );
        if !matches!(
            type_value,
            GtValue::Recursion | GtValue::Concrete(GeneralType::Class)
        ) {
            return Err(SynError::new(
                "Cannot use a non-class type as an AND expression type",
                pos,
            ));
        }
        Ok(GtValue::Concrete(GeneralType::Class))
    }

    fn cast(
        &mut self,
        _builder: &mut GrammarBuilder<'_, '_>,
        pos: FilePos,
        _cast_type: TypeId,
        cast_value: GtValue,
        actual: GtValue,
    ) -> Result<GtValue> {
        assert!(
            cast_value != GtValue::Concrete(GeneralType::Void)
                && actual != GtValue::Concrete(GeneralType::Void),
            "illegal state: void cast after the void pass"
        );
        assert!(
            cast_value != GtValue::Concrete(GeneralType::Array),
            "illegal state: array type used as a cast target"
        );

        if cast_value != GtValue::Recursion && actual != GtValue::Recursion && cast_value != actual
        {
            return Err(SynError::new(
                format!(
                    "Cannot cast incompatible types: {} to {}",
                    actual.describe(),
                    cast_value.describe()
                ),
                pos,
            ));
        }
        // The void/recursion rules of alternative merging resolve the
        // remaining combinations.
        cast_value.merge(actual, pos)
    }
}

impl GrammarBuilder<'_, '_> {
    pub(crate) fn calculate_general_types(&mut self) -> Result<()> {
        self.begin_calculate_general_types();
        calculate_property(self, &GeneralTypeAccessor, &mut GeneralTypeCalculator)?;
        self.end_calculate_general_types();
        Ok(())
    }
}
