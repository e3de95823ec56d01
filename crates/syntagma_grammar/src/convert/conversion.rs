//! Conversion strategies.
//!
//! A conversion is the program that tells the converter how to lower
//! one expression: as productions of a given nonterminal
//! (`convert_nt`), as a row of elements inside a production being
//! built (`convert_pr`), or as a single grammar symbol (`convert_sym`).
//! The attribute pass picks the variant; the converter (see
//! [`super::converter`]) interprets it.

use crate::ast::ExprId;
use syntagma_base::Symbol;

/// Tag distinguishing one synthesized part-class from another. Handed
/// out from a global counter during attribute verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartClassTag(pub u32);

/// Context of an `Or`/`ZeroOne` conversion: what the surrounding
/// construct expects the expression to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplexKind {
    /// Top-level expression of a nonterminal.
    Top,
    /// Value is unused.
    Dead,
    /// Element of an AND with a `this=` result.
    ThisAnd { main: ExprId },
    /// Element of an AND whose single attribute is the result.
    AttrAnd { attr: ExprId },
    /// Element of an AND producing a part-class.
    PartClassAnd { main: ExprId, tag: PartClassTag },
    /// Element of an AND producing a class object.
    ClassAnd { main: ExprId },
}

impl ComplexKind {
    pub fn is_dead(self) -> bool {
        matches!(self, ComplexKind::Dead)
    }
}

/// Field layout collected for a class- or part-class-producing AND:
/// element offsets paired with attribute names or part-class tags,
/// plus at most one nested class element.
#[derive(Debug, Clone, Default)]
pub struct AndFields {
    pub attributes: Vec<(usize, Symbol)>,
    pub part_classes: Vec<(usize, PartClassTag)>,
    pub nested_class: Option<usize>,
}

/// How to lower one expression.
#[derive(Debug, Clone)]
pub enum Conversion {
    /// Empty expression: one production with a void action.
    Empty,
    /// Constant expression.
    Const,
    /// Explicit cast.
    Cast,
    /// `this=` element: delegates to its sub-expression.
    This,
    /// Name reference; `dead` when the value is unused.
    Name { dead: bool },
    /// String literal.
    Str { dead: bool },
    /// `*` loop.
    ZeroMany { dead: bool },
    /// `+` loop.
    OneMany { dead: bool },
    /// Alternation, parameterized by its context.
    Or(ComplexKind),
    /// Optional, parameterized by its context.
    ZeroOne(ComplexKind),
    /// Attribute at top level: a one-field class.
    TopAttribute,
    /// Attribute that is the single attribute of its AND.
    AttrAttribute,
    /// Attribute contributing to a part-class.
    PartClassAttribute { main: ExprId, tag: PartClassTag },
    /// Attribute contributing to the AND's class.
    ClassAttribute { main: ExprId },
    /// AND producing nothing.
    VoidAnd,
    /// AND producing its `this=` element.
    ThisAnd { result_index: usize, main: ExprId },
    /// AND producing its single attribute's value.
    AttributeAnd { result_index: usize, attr: ExprId },
    /// AND producing a class object.
    ClassAnd { main: ExprId, fields: AndFields },
    /// Nested AND producing a part-class.
    PartClassAnd {
        main: ExprId,
        tag: PartClassTag,
        fields: AndFields,
    },
}
