//! The EBNF grammar AST.
//!
//! Nodes are allocated in arenas and reference each other with plain
//! `&'a` references; cross-cutting links (resolved symbols, inferred
//! types, conversions) never live on the nodes themselves. Instead
//! every expression, nonterminal and AND expression carries a dense id
//! assigned by the loader, and the analysis passes keep their results
//! in parallel vectors keyed by those ids.

use syntagma_base::{Arena, FilePos, Interner, SourceString};

/// Dense nonterminal-declaration id, assigned in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NtId(pub u32);

/// Dense terminal-declaration id, assigned in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrId(pub u32);

/// Dense syntax-expression id, assigned during loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub u32);

/// Dense id of an AND expression, assigned during loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AndId(pub u32);

impl NtId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl TrId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl ExprId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl AndId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Top-level declaration.
#[derive(Debug)]
pub enum Declaration<'a> {
    /// `type NAME ;`
    Type(TypeDecl),
    /// `token NAME [{T}] ;`
    Terminal(TerminalDecl),
    /// `[@]NAME [{T}] : expr ;`
    Nonterminal(NonterminalDecl<'a>),
    /// `token "" {T} ;` - type of string-literal tokens.
    CustomTokenType(CustomTokenTypeDecl),
}

#[derive(Debug)]
pub struct TypeDecl {
    pub name: SourceString,
}

#[derive(Debug)]
pub struct TerminalDecl {
    pub name: SourceString,
    pub raw_type: Option<SourceString>,
    pub index: TrId,
}

#[derive(Debug)]
pub struct NonterminalDecl<'a> {
    pub start: bool,
    pub name: SourceString,
    pub explicit_raw_type: Option<SourceString>,
    pub expr: &'a SyntaxExpr<'a>,
    pub index: NtId,
}

#[derive(Debug)]
pub struct CustomTokenTypeDecl {
    pub raw_type: SourceString,
}

/// A syntax expression node.
#[derive(Debug)]
pub struct SyntaxExpr<'a> {
    pub id: ExprId,
    pub kind: SyntaxExprKind<'a>,
}

#[derive(Debug)]
pub enum SyntaxExprKind<'a> {
    /// The empty sequence.
    Empty,
    /// `a | b | ...`
    Or { alternatives: &'a [&'a SyntaxExpr<'a>] },
    /// `a b ... [{T}]`
    And {
        and_id: AndId,
        elements: &'a [&'a SyntaxExpr<'a>],
        raw_type: Option<SourceString>,
    },
    /// `name=term`
    Attribute {
        name: SourceString,
        expr: &'a SyntaxExpr<'a>,
    },
    /// `this=term`
    This {
        pos: FilePos,
        expr: &'a SyntaxExpr<'a>,
    },
    /// Reference to a terminal or nonterminal by name.
    NameRef { name: SourceString },
    /// `"literal"` or `'c'`.
    StrLiteral { text: SourceString },
    /// `{T}(expr)`
    Cast {
        raw_type: SourceString,
        expr: &'a SyntaxExpr<'a>,
    },
    /// `term?`
    ZeroOne { expr: &'a SyntaxExpr<'a> },
    /// `body*`
    ZeroMany { body: LoopBody<'a> },
    /// `body+`
    OneMany { body: LoopBody<'a> },
    /// `<const>`
    Const { expr: &'a ConstExpr<'a> },
}

impl<'a> SyntaxExpr<'a> {
    /// The loop body of a `*` or `+` expression.
    pub fn loop_body(&self) -> Option<&LoopBody<'a>> {
        match &self.kind {
            SyntaxExprKind::ZeroMany { body } | SyntaxExprKind::OneMany { body } => Some(body),
            _ => None,
        }
    }
}

/// Body of a loop: the repeated expression and an optional separator.
#[derive(Debug)]
pub struct LoopBody<'a> {
    pub expr: &'a SyntaxExpr<'a>,
    pub separator: Option<&'a SyntaxExpr<'a>>,
    pub separator_pos: FilePos,
}

/// Constant expression embedded with `<...>`.
#[derive(Debug)]
pub enum ConstExpr<'a> {
    Integer(i64),
    Str(SourceString),
    Bool(bool),
    Native(NativeExpr<'a>),
}

/// Target-language expression passed through to the emitter:
/// `Qual::...::name(args).field->ptr_field`.
#[derive(Debug)]
pub struct NativeExpr<'a> {
    pub qualifiers: &'a [SourceString],
    pub name: NativeName<'a>,
    pub references: &'a [NativeRef<'a>],
}

#[derive(Debug)]
pub enum NativeName<'a> {
    Variable(SourceString),
    Function {
        name: SourceString,
        args: &'a [&'a ConstExpr<'a>],
    },
}

impl NativeName<'_> {
    pub fn name(&self) -> SourceString {
        match self {
            NativeName::Variable(name) => *name,
            NativeName::Function { name, .. } => *name,
        }
    }
}

/// One `.name` or `->name` step of a native reference chain.
#[derive(Debug)]
pub struct NativeRef<'a> {
    pub kind: NativeRefKind,
    pub name: NativeName<'a>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeRefKind {
    /// `.name`
    Field,
    /// `->name`
    Pointer,
}

/// The arenas every AST node is allocated into. Plain `Copy` bundle of
/// references, passed around by value during loading.
#[derive(Clone, Copy)]
pub struct AstArenas<'a> {
    pub decls: &'a Arena<Declaration<'a>>,
    pub exprs: &'a Arena<SyntaxExpr<'a>>,
    pub expr_refs: &'a Arena<&'a SyntaxExpr<'a>>,
    pub consts: &'a Arena<ConstExpr<'a>>,
    pub const_refs: &'a Arena<&'a ConstExpr<'a>>,
    pub names: &'a Arena<SourceString>,
    pub native_refs: &'a Arena<NativeRef<'a>>,
}

/// A parsed grammar: the declarations plus enumeration tables for
/// terminals, nonterminals and expressions.
#[derive(Debug)]
pub struct Grammar<'a> {
    pub declarations: Vec<&'a Declaration<'a>>,
    pub terminals: Vec<&'a TerminalDecl>,
    pub nonterminals: Vec<&'a NonterminalDecl<'a>>,
    /// Expression nodes by [`ExprId`].
    pub exprs: Vec<&'a SyntaxExpr<'a>>,
    pub and_count: usize,
}

impl<'a> Grammar<'a> {
    pub fn expr(&self, id: ExprId) -> &'a SyntaxExpr<'a> {
        self.exprs[id.index()]
    }

    pub fn nt(&self, id: NtId) -> &'a NonterminalDecl<'a> {
        self.nonterminals[id.index()]
    }

    pub fn tr(&self, id: TrId) -> &'a TerminalDecl {
        self.terminals[id.index()]
    }
}

/// Renders a constant expression the way it was written, for embedding
/// into generated source.
pub fn render_const(expr: &ConstExpr<'_>, interner: &Interner) -> String {
    let mut out = String::new();
    write_const(&mut out, expr, interner);
    out
}

fn write_const(out: &mut String, expr: &ConstExpr<'_>, interner: &Interner) {
    match expr {
        ConstExpr::Integer(value) => out.push_str(&value.to_string()),
        ConstExpr::Str(text) => {
            out.push('"');
            for ch in interner.resolve(text.sym).chars() {
                match ch {
                    '"' | '\'' | '\\' => {
                        out.push('\\');
                        out.push(ch);
                    }
                    '\r' => out.push_str("\\r"),
                    '\n' => out.push_str("\\n"),
                    '\t' => out.push_str("\\t"),
                    _ => out.push(ch),
                }
            }
            out.push('"');
        }
        ConstExpr::Bool(value) => out.push_str(if *value { "true" } else { "false" }),
        ConstExpr::Native(native) => {
            for qualifier in native.qualifiers {
                out.push_str(interner.resolve(qualifier.sym));
                out.push_str("::");
            }
            write_native_name(out, &native.name, interner);
            for reference in native.references {
                out.push_str(match reference.kind {
                    NativeRefKind::Field => ".",
                    NativeRefKind::Pointer => "->",
                });
                write_native_name(out, &reference.name, interner);
            }
        }
    }
}

fn write_native_name(out: &mut String, name: &NativeName<'_>, interner: &Interner) {
    match name {
        NativeName::Variable(name) => out.push_str(interner.resolve(name.sym)),
        NativeName::Function { name, args } => {
            out.push_str(interner.resolve(name.sym));
            out.push('(');
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_const(out, arg, interner);
            }
            out.push(')');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syntagma_base::Symbol;

    fn name(interner: &mut Interner, text: &str) -> SourceString {
        SourceString::new(interner.intern(text), FilePos::default())
    }

    #[test]
    fn render_integer_and_bool_consts() {
        let interner = Interner::new();
        assert_eq!(render_const(&ConstExpr::Integer(42), &interner), "42");
        assert_eq!(render_const(&ConstExpr::Bool(false), &interner), "false");
    }

    #[test]
    fn render_string_const_escapes() {
        let mut interner = Interner::new();
        let text = name(&mut interner, "a\"b\n");
        assert_eq!(render_const(&ConstExpr::Str(text), &interner), "\"a\\\"b\\n\"");
    }

    #[test]
    fn render_native_call_with_qualifiers() {
        let mut interner = Interner::new();
        let qualifiers = [name(&mut interner, "my"), name(&mut interner, "lib")];
        let arg = ConstExpr::Integer(1);
        let args: [&ConstExpr<'_>; 1] = [&arg];
        let inner = NativeExpr {
            qualifiers: &qualifiers,
            name: NativeName::Function {
                name: name(&mut interner, "make"),
                args: &args,
            },
            references: &[NativeRef {
                kind: NativeRefKind::Pointer,
                name: NativeName::Variable(name(&mut interner, "field")),
            }],
        };
        assert_eq!(
            render_const(&ConstExpr::Native(inner), &interner),
            "my::lib::make(1)->field"
        );
    }

    #[test]
    fn loop_body_is_exposed_for_loops_only() {
        let expr = SyntaxExpr {
            id: ExprId(0),
            kind: SyntaxExprKind::NameRef {
                name: SourceString::new(Symbol::EMPTY, FilePos::default()),
            },
        };
        assert!(expr.loop_body().is_none());
    }
}
