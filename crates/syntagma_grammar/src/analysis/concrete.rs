//! Concrete type calculation.
//!
//! Class nonterminals are seeded with their explicit or implicit class
//! types first; expected types are then pushed down from nonterminals
//! into attribute and cast contexts, so that an alternation of two
//! unrelated class subtypes can resolve to the common parent the
//! context asks for. The property engine fills in everything else.

use crate::analysis::property::{calculate_property, PropertyAccessor, PropertyCalculator};
use crate::analysis::{AndMeaning, GrammarBuilder};
use crate::ast::{ConstExpr, ExprId, NtId, SyntaxExpr, SyntaxExprKind};
use crate::types::{GeneralType, TypeId, TypeKind};
use syntagma_base::{FilePos, Result, SourceString, SynError};

/// A concrete type, a recursion placeholder, or "undefined" (no type
/// could be inferred; only an error if something ends up needing it).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TypeValue {
    recursion: bool,
    ty: Option<TypeId>,
}

impl TypeValue {
    fn of(ty: TypeId) -> TypeValue {
        TypeValue {
            recursion: false,
            ty: Some(ty),
        }
    }

    fn undefined() -> TypeValue {
        TypeValue {
            recursion: false,
            ty: None,
        }
    }

    fn recursion() -> TypeValue {
        TypeValue {
            recursion: true,
            ty: None,
        }
    }
}

struct ConcreteTypeAccessor;

impl PropertyAccessor<TypeValue> for ConcreteTypeAccessor {
    fn get_nt(&self, builder: &GrammarBuilder<'_, '_>, nt: NtId) -> Option<TypeValue> {
        builder.nt_slot(nt).concrete_type.map(TypeValue::of)
    }

    fn set_nt(&self, builder: &mut GrammarBuilder<'_, '_>, nt: NtId, value: TypeValue) {
        let ty = if value.recursion {
            builder.types.void_type()
        } else {
            value.ty.expect("illegal state: nonterminal with an undefined type")
        };
        builder.nt_slots[nt.index()].concrete_type = Some(ty);
    }

    fn set_expr(&self, builder: &mut GrammarBuilder<'_, '_>, expr: ExprId, value: TypeValue) {
        assert!(
            !value.recursion,
            "illegal state: recursion placeholder in the deep phase"
        );
        // The type may legitimately stay undefined here.
        builder.expr_slots[expr.index()].concrete_type = value.ty;
    }
}

struct ConcreteTypeCalculator;

impl PropertyCalculator<TypeValue> for ConcreteTypeCalculator {
    fn recursion(&mut self, _builder: &mut GrammarBuilder<'_, '_>) -> TypeValue {
        TypeValue::recursion()
    }

    fn void_type(&mut self, builder: &mut GrammarBuilder<'_, '_>) -> TypeValue {
        TypeValue::of(builder.types.void_type())
    }

    fn primitive_type(&mut self, _builder: &mut GrammarBuilder<'_, '_>, ty: TypeId) -> TypeValue {
        TypeValue::of(ty)
    }

    fn name_class_type(&mut self, _builder: &mut GrammarBuilder<'_, '_>, ty: TypeId) -> TypeValue {
        TypeValue::of(ty)
    }

    fn nt_class_type(
        &mut self,
        builder: &mut GrammarBuilder<'_, '_>,
        _ty: TypeId,
        _nt: NtId,
        _pos: FilePos,
        sub: TypeValue,
    ) -> Result<TypeValue> {
        // Class nonterminals were seeded before the engine ran, so no
        // placeholder can appear, and the value is a class.
        assert!(!sub.recursion, "illegal state: unseeded class nonterminal");
        if let Some(ty) = sub.ty {
            assert!(builder.types.is_class(ty), "illegal state: non-class nonterminal type");
        }
        Ok(sub)
    }

    fn or_merge(
        &mut self,
        builder: &mut GrammarBuilder<'_, '_>,
        expr: Option<&SyntaxExpr<'_>>,
        pos: FilePos,
        first: TypeValue,
        second: TypeValue,
    ) -> Result<TypeValue> {
        if (!first.recursion && first.ty.is_none()) || (!second.recursion && second.ty.is_none()) {
            return Err(SynError::new("Type of expression is undefined", pos));
        }

        if let (false, Some(ty)) = (first.recursion, first.ty) {
            if builder.types.is_void(ty) {
                return Ok(second);
            }
        }
        if let (false, Some(ty)) = (second.recursion, second.ty) {
            if builder.types.is_void(ty) {
                return Ok(first);
            }
        }
        if first.recursion {
            return Ok(second);
        }
        if second.recursion {
            return Ok(first);
        }

        let first_ty = first.ty.expect("checked above");
        let second_ty = second.ty.expect("checked above");
        if builder.types.equal(first_ty, second_ty) {
            return Ok(first);
        }
        if builder.types.is_class(first_ty) && builder.types.is_class(second_ty) {
            // Two different class subtypes; the context decides the
            // common parent, when it names one.
            let expected = expr.and_then(|e| builder.expr_slot(e.id).expected_type);
            return Ok(TypeValue {
                recursion: false,
                ty: expected,
            });
        }

        Err(SynError::new(
            "Types of alternative expressions are incompatible",
            pos,
        ))
    }

    fn attribute(
        &mut self,
        builder: &mut GrammarBuilder<'_, '_>,
        expr: &SyntaxExpr<'_>,
        name: SourceString,
        sub: TypeValue,
    ) -> Result<TypeValue> {
        if !sub.recursion {
            let ty = sub.ty.ok_or_else(|| {
                SynError::at("Type of attribute expression is undefined", name)
            })?;
            assert!(!builder.types.is_void(ty), "illegal state: void attribute value");
        }

        // The attribute's own value is the class the surrounding AND
        // builds, which only the context knows.
        let expected = builder.expr_slot(expr.id).expected_type;
        if let Some(ty) = expected {
            assert!(builder.types.is_class(ty), "illegal state: non-class expected type");
        }
        Ok(TypeValue {
            recursion: false,
            ty: expected,
        })
    }

    fn loop_expr(
        &mut self,
        builder: &mut GrammarBuilder<'_, '_>,
        _expr: &SyntaxExpr<'_>,
        pos: FilePos,
        sub: TypeValue,
    ) -> Result<TypeValue> {
        assert!(!sub.recursion, "illegal state: recursion through a verified loop");
        let element = sub
            .ty
            .ok_or_else(|| SynError::new("Type of loop body is undefined", pos))?;
        Ok(if builder.types.is_void(element) {
            TypeValue::of(builder.types.void_type())
        } else {
            TypeValue::of(builder.types.add(TypeKind::Array(element)))
        })
    }

    fn const_expr(
        &mut self,
        builder: &mut GrammarBuilder<'_, '_>,
        expr: &SyntaxExpr<'_>,
        _pos: FilePos,
    ) -> Result<TypeValue> {
        let const_expr = match &expr.kind {
            SyntaxExprKind::Const { expr } => *expr,
            _ => panic!("illegal state: const calculation of a non-const"),
        };
        let ty = match const_expr {
            ConstExpr::Integer(_) => builder.types.const_int_type(),
            ConstExpr::Str(_) => builder.types.const_str_type(),
            ConstExpr::Bool(_) => builder.types.const_bool_type(),
            ConstExpr::Native(native) => {
                return match builder.expr_slot(expr.id).expected_type {
                    Some(expected) => Ok(TypeValue::of(expected)),
                    None => Err(SynError::at(
                        "Type of native constant expression is undefined",
                        native.name.name(),
                    )),
                };
            }
        };
        Ok(TypeValue::of(ty))
    }

    fn and_class(
        &mut self,
        builder: &mut GrammarBuilder<'_, '_>,
        expr: &SyntaxExpr<'_>,
        _pos: FilePos,
    ) -> Result<TypeValue> {
        let expected = builder.expr_slot(expr.id).expected_type;
        if let Some(ty) = expected {
            assert!(builder.types.is_class(ty), "illegal state: non-class expected type");
        }
        Ok(TypeValue {
            recursion: false,
            ty: expected,
        })
    }

    fn and_with_type(
        &mut self,
        builder: &mut GrammarBuilder<'_, '_>,
        expr: &SyntaxExpr<'_>,
        _pos: FilePos,
        type_value: TypeValue,
    ) -> Result<TypeValue> {
        assert!(!type_value.recursion, "illegal state: class type is a placeholder");
        // Return the annotated type itself, not the type of the
        // nonterminal behind it: `AddExpr{Expr} : ... {AddExpr}` must
        // produce AddExpr, not Expr.
        let ty = builder
            .expr_slot(expr.id)
            .and_type
            .expect("illegal state: unresolved AND type");
        Ok(TypeValue::of(ty))
    }

    fn cast(
        &mut self,
        builder: &mut GrammarBuilder<'_, '_>,
        pos: FilePos,
        cast_type: TypeId,
        cast_value: TypeValue,
        actual: TypeValue,
    ) -> Result<TypeValue> {
        assert!(
            !cast_value.recursion && !actual.recursion,
            "illegal state: recursion placeholder in a cast"
        );
        let actual_ty = actual
            .ty
            .expect("illegal state: cast operand without a type");
        assert!(
            !builder.types.is_void(cast_type) && !builder.types.is_void(actual_ty),
            "illegal state: void cast after the void pass"
        );

        if builder.types.is_class(cast_type) && builder.types.is_class(actual_ty) {
            return Ok(cast_value);
        }
        if !builder.types.equal(cast_type, actual_ty) {
            return Err(SynError::new("Cannot cast incompatible types", pos));
        }
        Ok(cast_value)
    }
}

impl<'a> GrammarBuilder<'a, '_> {
    pub(crate) fn calculate_types(&mut self) -> Result<()> {
        self.begin_calculate_types();

        // Seed nonterminals that already have a definite type: an
        // explicit annotation, an implicit class, or void.
        for index in 0..self.grammar.nonterminals.len() {
            let nt = self.grammar.nonterminals[index].index;
            let explicit = self.nt_slots[index].explicit_type;
            let general = self.nt_slots[index].general_type;
            let ty = match explicit {
                Some(ty) => Some(ty),
                None => match general {
                    Some(GeneralType::Class) => Some(self.create_nt_class_type(nt)),
                    Some(GeneralType::Void) => Some(self.types.void_type()),
                    _ => None,
                },
            };
            if let Some(ty) = ty {
                self.nt_slots[index].concrete_type = Some(ty);
            }
        }

        // Distribute expected types down every body.
        for nt in &self.grammar.nonterminals {
            let expected = self.nt_slot(nt.index).concrete_type;
            self.define_expected_type(nt.expr, expected);
        }

        calculate_property(self, &ConcreteTypeAccessor, &mut ConcreteTypeCalculator)?;

        self.end_calculate_types();
        Ok(())
    }

    /// Stores `expected` on `expr` and pushes it into the positions
    /// that inherit it. Attribute values and loop bodies start fresh;
    /// casts impose their own target.
    fn define_expected_type(&mut self, expr: &'a SyntaxExpr<'a>, expected: Option<TypeId>) {
        self.expr_slots[expr.id.index()].expected_type = expected;

        match &expr.kind {
            SyntaxExprKind::Or { alternatives } => {
                for alternative in *alternatives {
                    self.define_expected_type(alternative, expected);
                }
            }
            SyntaxExprKind::And { and_id, .. } => {
                let meaning = self.and_meaning(*and_id).clone();
                for id in meaning.non_result() {
                    self.define_expected_type(self.grammar.expr(*id), None);
                }
                if let AndMeaning::This { result_elements, .. } = &meaning {
                    for id in result_elements {
                        self.define_expected_type(self.grammar.expr(*id), expected);
                    }
                }
            }
            SyntaxExprKind::Attribute { expr: inner, .. } => {
                self.define_expected_type(inner, None);
            }
            SyntaxExprKind::This { expr: inner, .. } => {
                self.define_expected_type(inner, expected);
            }
            SyntaxExprKind::Cast { expr: inner, .. } => {
                let cast_type = self.expr_slot(expr.id).cast_type;
                self.define_expected_type(inner, cast_type);
            }
            SyntaxExprKind::ZeroOne { expr: inner } => {
                self.define_expected_type(inner, expected);
            }
            SyntaxExprKind::ZeroMany { body } | SyntaxExprKind::OneMany { body } => {
                self.define_expected_type(body.expr, None);
                if let Some(separator) = body.separator {
                    self.define_expected_type(separator, None);
                }
            }
            SyntaxExprKind::Empty
            | SyntaxExprKind::NameRef { .. }
            | SyntaxExprKind::StrLiteral { .. }
            | SyntaxExprKind::Const { .. } => {}
        }
    }
}
