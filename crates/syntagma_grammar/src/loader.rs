//! The self-hosted grammar loader.
//!
//! Grammar files are parsed by the same GLR core the generated parsers
//! use: the meta-grammar is compiled to tables at startup, the lexer
//! feeds tokens through a value pool, and once the parse accepts, the
//! AST is built by walking the stack graph and dispatching on each
//! node's reduce rule.

use crate::ast::{
    AndId, AstArenas, ConstExpr, CustomTokenTypeDecl, Declaration, ExprId, Grammar, LoopBody,
    NativeExpr, NativeName, NativeRef, NativeRefKind, NonterminalDecl, NtId, SyntaxExpr,
    SyntaxExprKind, TerminalDecl, TrId, TypeDecl,
};
use crate::bootstrap::{bootstrap_tables, MetaRule};
use crate::lexer::Lexer;
use crate::token::{TokenKind, TokenValue};
use syntagma_base::{FilePos, Interner, Result, SourceString, Symbol, SynError};
use syntagma_runtime::{
    parse, InternalTk, ParseError, Pool, ReduceAction, Scanner, StackNode,
};

/// Pooled value attached to every scanned token: identifiers and
/// literals carry their text and position, numbers their value, and
/// everything else just its position.
#[derive(Debug, Clone, Copy)]
enum NodeValue {
    Pos(FilePos),
    Text(SourceString),
    Number(i64),
}

type Node<'v> = StackNode<'v, NodeValue>;

struct MetaScanner<'src, 'i, 'p> {
    lexer: Lexer<'src, 'i>,
    pool: &'p Pool<NodeValue>,
    last_pos: FilePos,
    lex_error: Option<SynError>,
}

impl<'p> Scanner<'p> for MetaScanner<'_, '_, 'p> {
    type Value = NodeValue;

    fn scan(&mut self) -> std::result::Result<(InternalTk, Option<&'p NodeValue>), ParseError> {
        match self.lexer.scan_token() {
            Ok(token) => {
                self.last_pos = token.pos;
                let value = match token.value {
                    TokenValue::Text(sym) => NodeValue::Text(SourceString::new(sym, token.pos)),
                    TokenValue::Number(number) => NodeValue::Number(number),
                    TokenValue::None => NodeValue::Pos(token.pos),
                };
                Ok((token.kind.internal(), Some(self.pool.allocate(value))))
            }
            Err(error) => {
                let pos = error.pos;
                self.lex_error = Some(error);
                Err(ParseError::Lexical { pos })
            }
        }
    }

    fn pos(&self) -> FilePos {
        self.last_pos
    }
}

/// Parses a grammar file into an AST allocated in `arenas`.
pub fn parse_grammar<'a>(
    arenas: AstArenas<'a>,
    interner: &mut Interner,
    source: &str,
    file_name: &str,
) -> Result<Grammar<'a>> {
    let bootstrap = bootstrap_tables();
    let pool: Pool<NodeValue> = Pool::new();

    let root = {
        let lexer = Lexer::new(source, file_name, interner);
        let mut scanner = MetaScanner {
            lexer,
            pool: &pool,
            last_pos: FilePos::default(),
            lex_error: None,
        };
        match parse(
            &bootstrap.tables,
            bootstrap.start_state,
            &mut scanner,
            TokenKind::Eof.internal(),
        ) {
            Ok(root) => root,
            Err(ParseError::Lexical { .. }) => {
                return Err(scanner
                    .lex_error
                    .take()
                    .expect("lexical failure without a stored error"));
            }
            Err(ParseError::Syntax { pos }) => {
                return Err(SynError::new("Syntax error", pos));
            }
        }
    };

    let mut builder = AstBuilder {
        arenas,
        rules: &bootstrap.rules,
        exprs: Vec::new(),
        next_and: 0,
        next_tr: 0,
        next_nt: 0,
    };
    builder.build_grammar(&root)
}

/// Rebuilds the AST from the accepted stack node.
struct AstBuilder<'a, 'b> {
    arenas: AstArenas<'a>,
    rules: &'b [MetaRule],
    exprs: Vec<&'a SyntaxExpr<'a>>,
    next_and: u32,
    next_tr: u32,
    next_nt: u32,
}

impl<'a> AstBuilder<'a, '_> {
    fn rule(&self, node: &Node<'_>) -> MetaRule {
        match node.reduce().action {
            ReduceAction::Rule(action) => self.rules[action as usize],
            ReduceAction::Accept => panic!("illegal state: rule of an accept node"),
        }
    }

    /// Children of `node`, checked against the expected rule and arity.
    fn expect<'n, 'v>(&self, node: &'n Node<'v>, rule: MetaRule, len: usize) -> Vec<&'n Node<'v>> {
        assert_eq!(self.rule(node), rule, "illegal state: unexpected meta rule");
        let children = node.sub_elements();
        assert_eq!(children.len(), len, "illegal state: meta rule arity");
        children
    }

    fn text(node: &Node<'_>) -> SourceString {
        match node.value() {
            NodeValue::Text(text) => *text,
            _ => panic!("illegal state: token without text"),
        }
    }

    fn token_pos(node: &Node<'_>) -> FilePos {
        match node.value() {
            NodeValue::Pos(pos) => *pos,
            NodeValue::Text(text) => text.pos,
            NodeValue::Number(_) => panic!("illegal state: position of a number token"),
        }
    }

    fn number(node: &Node<'_>) -> i64 {
        match node.value() {
            NodeValue::Number(number) => *number,
            _ => panic!("illegal state: token without a number"),
        }
    }

    fn alloc_expr(&mut self, kind: SyntaxExprKind<'a>) -> &'a SyntaxExpr<'a> {
        let id = ExprId(self.exprs.len() as u32);
        let expr = self.arenas.exprs.alloc(SyntaxExpr { id, kind });
        self.exprs.push(expr);
        expr
    }

    fn expr_slice(&self, exprs: Vec<&'a SyntaxExpr<'a>>) -> &'a [&'a SyntaxExpr<'a>] {
        self.arenas.expr_refs.alloc_slice(exprs)
    }

    fn build_grammar(&mut self, root: &Node<'_>) -> Result<Grammar<'a>> {
        let children = self.expect(root, MetaRule::GrammarRule, 1);

        let mut declarations = Vec::new();
        self.declaration_list(children[0], &mut declarations)?;

        let mut terminals = Vec::new();
        let mut nonterminals = Vec::new();
        for &decl in &declarations {
            match decl {
                Declaration::Terminal(tr) => terminals.push(tr),
                Declaration::Nonterminal(nt) => nonterminals.push(nt),
                _ => {}
            }
        }

        Ok(Grammar {
            declarations,
            terminals,
            nonterminals,
            exprs: std::mem::take(&mut self.exprs),
            and_count: self.next_and as usize,
        })
    }

    fn declaration_list(
        &mut self,
        node: &Node<'_>,
        out: &mut Vec<&'a Declaration<'a>>,
    ) -> Result<()> {
        match self.rule(node) {
            MetaRule::DeclListFirst => {
                let children = node.sub_elements();
                out.push(self.declaration(children[0])?);
            }
            MetaRule::DeclListNext => {
                let children = node.sub_elements();
                self.declaration_list(children[0], out)?;
                out.push(self.declaration(children[1])?);
            }
            _ => panic!("illegal state: unexpected meta rule"),
        }
        Ok(())
    }

    fn declaration(&mut self, node: &Node<'_>) -> Result<&'a Declaration<'a>> {
        let children = node.sub_elements();
        assert_eq!(children.len(), 1, "illegal state: meta rule arity");
        match self.rule(node) {
            MetaRule::DeclType => self.type_declaration(children[0]),
            MetaRule::DeclTerminal => self.terminal_declaration(children[0]),
            MetaRule::DeclNonterminal => self.nonterminal_declaration(children[0]),
            MetaRule::DeclCustomTokenType => self.custom_token_type_declaration(children[0]),
            _ => panic!("illegal state: unexpected meta rule"),
        }
    }

    fn type_declaration(&mut self, node: &Node<'_>) -> Result<&'a Declaration<'a>> {
        let children = self.expect(node, MetaRule::TypeDeclRule, 3);
        let name = Self::text(children[1]);
        Ok(self.arenas.decls.alloc(Declaration::Type(TypeDecl { name })))
    }

    fn terminal_declaration(&mut self, node: &Node<'_>) -> Result<&'a Declaration<'a>> {
        let children = self.expect(node, MetaRule::TerminalDeclRule, 4);
        let name = Self::text(children[1]);
        let raw_type = self.type_opt(children[2])?;
        let index = TrId(self.next_tr);
        self.next_tr += 1;
        Ok(self
            .arenas
            .decls
            .alloc(Declaration::Terminal(TerminalDecl { name, raw_type, index })))
    }

    fn nonterminal_declaration(&mut self, node: &Node<'_>) -> Result<&'a Declaration<'a>> {
        let children = self.expect(node, MetaRule::NonterminalDeclRule, 6);
        let start = self.at_opt(children[0]);
        let name = Self::text(children[1]);
        let explicit_raw_type = self.type_opt(children[2])?;
        let expr = self.or_expression(children[4])?;
        let index = NtId(self.next_nt);
        self.next_nt += 1;
        Ok(self.arenas.decls.alloc(Declaration::Nonterminal(NonterminalDecl {
            start,
            name,
            explicit_raw_type,
            expr,
            index,
        })))
    }

    fn custom_token_type_declaration(&mut self, node: &Node<'_>) -> Result<&'a Declaration<'a>> {
        let children = self.expect(node, MetaRule::CustomTokenTypeDeclRule, 4);
        let literal = Self::text(children[1]);
        if literal.sym != Symbol::EMPTY {
            return Err(SynError::new("Empty string literal is expected", literal.pos));
        }
        let raw_type = self.type_rule(children[2])?;
        Ok(self
            .arenas
            .decls
            .alloc(Declaration::CustomTokenType(CustomTokenTypeDecl { raw_type })))
    }

    fn at_opt(&self, node: &Node<'_>) -> bool {
        match self.rule(node) {
            MetaRule::AtPresent => true,
            MetaRule::AtAbsent => false,
            _ => panic!("illegal state: unexpected meta rule"),
        }
    }

    fn type_opt(&self, node: &Node<'_>) -> Result<Option<SourceString>> {
        match self.rule(node) {
            MetaRule::TypeOptSome => Ok(Some(self.type_rule(node.sub_elements()[0])?)),
            MetaRule::TypeOptNone => Ok(None),
            _ => panic!("illegal state: unexpected meta rule"),
        }
    }

    fn type_rule(&self, node: &Node<'_>) -> Result<SourceString> {
        let children = self.expect(node, MetaRule::TypeRule, 3);
        Ok(Self::text(children[1]))
    }

    fn or_expression(&mut self, node: &Node<'_>) -> Result<&'a SyntaxExpr<'a>> {
        let children = self.expect(node, MetaRule::OrExprRule, 1);
        let mut alternatives = Vec::new();
        self.and_list(children[0], &mut alternatives)?;

        Ok(match alternatives.len() {
            0 => self.alloc_expr(SyntaxExprKind::Empty),
            1 => alternatives[0],
            _ => {
                let slice = self.expr_slice(alternatives);
                self.alloc_expr(SyntaxExprKind::Or { alternatives: slice })
            }
        })
    }

    fn and_list(&mut self, node: &Node<'_>, out: &mut Vec<&'a SyntaxExpr<'a>>) -> Result<()> {
        match self.rule(node) {
            MetaRule::AndListFirst => {
                let children = node.sub_elements();
                out.push(self.and_expression(children[0])?);
            }
            MetaRule::AndListNext => {
                let children = node.sub_elements();
                self.and_list(children[0], out)?;
                out.push(self.and_expression(children[2])?);
            }
            _ => panic!("illegal state: unexpected meta rule"),
        }
        Ok(())
    }

    fn and_expression(&mut self, node: &Node<'_>) -> Result<&'a SyntaxExpr<'a>> {
        let children = self.expect(node, MetaRule::AndExprRule, 2);
        let mut elements = Vec::new();
        self.element_list_opt(children[0], &mut elements)?;
        let raw_type = self.type_opt(children[1])?;

        Ok(if elements.is_empty() && raw_type.is_none() {
            self.alloc_expr(SyntaxExprKind::Empty)
        } else if elements.len() == 1 && raw_type.is_none() {
            elements[0]
        } else {
            let and_id = AndId(self.next_and);
            self.next_and += 1;
            let slice = self.expr_slice(elements);
            self.alloc_expr(SyntaxExprKind::And {
                and_id,
                elements: slice,
                raw_type,
            })
        })
    }

    fn element_list_opt(
        &mut self,
        node: &Node<'_>,
        out: &mut Vec<&'a SyntaxExpr<'a>>,
    ) -> Result<()> {
        match self.rule(node) {
            MetaRule::ElemListOptSome => self.element_list(node.sub_elements()[0], out),
            MetaRule::ElemListOptNone => Ok(()),
            _ => panic!("illegal state: unexpected meta rule"),
        }
    }

    fn element_list(&mut self, node: &Node<'_>, out: &mut Vec<&'a SyntaxExpr<'a>>) -> Result<()> {
        match self.rule(node) {
            MetaRule::ElemListFirst => {
                let children = node.sub_elements();
                out.push(self.element(children[0])?);
            }
            MetaRule::ElemListNext => {
                let children = node.sub_elements();
                self.element_list(children[0], out)?;
                out.push(self.element(children[1])?);
            }
            _ => panic!("illegal state: unexpected meta rule"),
        }
        Ok(())
    }

    fn element(&mut self, node: &Node<'_>) -> Result<&'a SyntaxExpr<'a>> {
        let children = node.sub_elements();
        assert_eq!(children.len(), 1, "illegal state: meta rule arity");
        match self.rule(node) {
            MetaRule::ElemName => self.name_element(children[0]),
            MetaRule::ElemThis => self.this_element(children[0]),
            _ => panic!("illegal state: unexpected meta rule"),
        }
    }

    fn name_element(&mut self, node: &Node<'_>) -> Result<&'a SyntaxExpr<'a>> {
        match self.rule(node) {
            MetaRule::AttrElem => {
                let children = node.sub_elements();
                let name = Self::text(children[0]);
                let expr = self.term(children[2])?;
                Ok(self.alloc_expr(SyntaxExprKind::Attribute { name, expr }))
            }
            MetaRule::PlainElem => self.term(node.sub_elements()[0]),
            _ => panic!("illegal state: unexpected meta rule"),
        }
    }

    fn this_element(&mut self, node: &Node<'_>) -> Result<&'a SyntaxExpr<'a>> {
        let children = self.expect(node, MetaRule::ThisElemRule, 3);
        let pos = Self::token_pos(children[0]);
        let expr = self.term(children[2])?;
        Ok(self.alloc_expr(SyntaxExprKind::This { pos, expr }))
    }

    fn term(&mut self, node: &Node<'_>) -> Result<&'a SyntaxExpr<'a>> {
        let children = node.sub_elements();
        assert_eq!(children.len(), 1, "illegal state: meta rule arity");
        match self.rule(node) {
            MetaRule::TermPrimary => self.primary_term(children[0]),
            MetaRule::TermAdvanced => self.advanced_term(children[0]),
            _ => panic!("illegal state: unexpected meta rule"),
        }
    }

    fn primary_term(&mut self, node: &Node<'_>) -> Result<&'a SyntaxExpr<'a>> {
        let children = node.sub_elements();
        assert_eq!(children.len(), 1, "illegal state: meta rule arity");
        match self.rule(node) {
            MetaRule::PrimaryName => {
                let name_children = self.expect(children[0], MetaRule::NameTermRule, 1);
                let name = Self::text(name_children[0]);
                Ok(self.alloc_expr(SyntaxExprKind::NameRef { name }))
            }
            MetaRule::PrimaryString => {
                let str_children = self.expect(children[0], MetaRule::StringTermRule, 1);
                let text = Self::text(str_children[0]);
                Ok(self.alloc_expr(SyntaxExprKind::StrLiteral { text }))
            }
            MetaRule::PrimaryNested => self.nested_term(children[0]),
            _ => panic!("illegal state: unexpected meta rule"),
        }
    }

    fn nested_term(&mut self, node: &Node<'_>) -> Result<&'a SyntaxExpr<'a>> {
        let children = self.expect(node, MetaRule::NestedTermRule, 4);
        let raw_type = self.type_opt(children[0])?;
        let expr = self.or_expression(children[2])?;
        Ok(match raw_type {
            Some(raw_type) => self.alloc_expr(SyntaxExprKind::Cast { raw_type, expr }),
            None => expr,
        })
    }

    fn advanced_term(&mut self, node: &Node<'_>) -> Result<&'a SyntaxExpr<'a>> {
        let children = node.sub_elements();
        assert_eq!(children.len(), 1, "illegal state: meta rule arity");
        match self.rule(node) {
            MetaRule::AdvZeroOne => {
                let sub = self.expect(children[0], MetaRule::ZeroOneRule, 2);
                let expr = self.primary_term(sub[0])?;
                Ok(self.alloc_expr(SyntaxExprKind::ZeroOne { expr }))
            }
            MetaRule::AdvZeroMany => {
                let sub = self.expect(children[0], MetaRule::ZeroManyRule, 2);
                let body = self.loop_body(sub[0])?;
                Ok(self.alloc_expr(SyntaxExprKind::ZeroMany { body }))
            }
            MetaRule::AdvOneMany => {
                let sub = self.expect(children[0], MetaRule::OneManyRule, 2);
                let body = self.loop_body(sub[0])?;
                Ok(self.alloc_expr(SyntaxExprKind::OneMany { body }))
            }
            MetaRule::AdvConst => {
                let sub = self.expect(children[0], MetaRule::ConstTermRule, 3);
                let expr = self.const_expression(sub[1])?;
                Ok(self.alloc_expr(SyntaxExprKind::Const { expr }))
            }
            _ => panic!("illegal state: unexpected meta rule"),
        }
    }

    fn loop_body(&mut self, node: &Node<'_>) -> Result<LoopBody<'a>> {
        let children = node.sub_elements();
        assert_eq!(children.len(), 1, "illegal state: meta rule arity");
        match self.rule(node) {
            MetaRule::LoopSimple => {
                let sub = self.expect(children[0], MetaRule::SimpleLoopBodyRule, 1);
                Ok(LoopBody {
                    expr: self.primary_term(sub[0])?,
                    separator: None,
                    separator_pos: FilePos::default(),
                })
            }
            MetaRule::LoopAdvanced => match self.rule(children[0]) {
                MetaRule::SeparatedLoopBody => {
                    let sub = children[0].sub_elements();
                    assert_eq!(sub.len(), 5, "illegal state: meta rule arity");
                    let expr = self.or_expression(sub[1])?;
                    let separator_pos = Self::token_pos(sub[2]);
                    let separator = self.or_expression(sub[3])?;
                    Ok(LoopBody {
                        expr,
                        separator: Some(separator),
                        separator_pos,
                    })
                }
                MetaRule::PlainLoopBody => {
                    let sub = children[0].sub_elements();
                    assert_eq!(sub.len(), 3, "illegal state: meta rule arity");
                    Ok(LoopBody {
                        expr: self.or_expression(sub[1])?,
                        separator: None,
                        separator_pos: FilePos::default(),
                    })
                }
                _ => panic!("illegal state: unexpected meta rule"),
            },
            _ => panic!("illegal state: unexpected meta rule"),
        }
    }

    fn const_expression(&mut self, node: &Node<'_>) -> Result<&'a ConstExpr<'a>> {
        let children = node.sub_elements();
        assert_eq!(children.len(), 1, "illegal state: meta rule arity");
        match self.rule(node) {
            MetaRule::ConstInt => {
                let sub = self.expect(children[0], MetaRule::IntLiteral, 1);
                Ok(self.arenas.consts.alloc(ConstExpr::Integer(Self::number(sub[0]))))
            }
            MetaRule::ConstStr => {
                let sub = self.expect(children[0], MetaRule::StrLiteral, 1);
                Ok(self.arenas.consts.alloc(ConstExpr::Str(Self::text(sub[0]))))
            }
            MetaRule::ConstBool => {
                let value = match self.rule(children[0]) {
                    MetaRule::TrueLiteral => true,
                    MetaRule::FalseLiteral => false,
                    _ => panic!("illegal state: unexpected meta rule"),
                };
                Ok(self.arenas.consts.alloc(ConstExpr::Bool(value)))
            }
            MetaRule::ConstNative => self.native_const(children[0]),
            _ => panic!("illegal state: unexpected meta rule"),
        }
    }

    fn native_const(&mut self, node: &Node<'_>) -> Result<&'a ConstExpr<'a>> {
        let children = self.expect(node, MetaRule::NativeExprRule, 3);

        let mut qualifiers = Vec::new();
        match self.rule(children[0]) {
            MetaRule::QualOptSome => {
                self.qualification(children[0].sub_elements()[0], &mut qualifiers)
            }
            MetaRule::QualOptNone => {}
            _ => panic!("illegal state: unexpected meta rule"),
        }

        let name = self.native_name(children[1])?;

        let mut references = Vec::new();
        match self.rule(children[2]) {
            MetaRule::RefsOptSome => {
                self.references(children[2].sub_elements()[0], &mut references)?
            }
            MetaRule::RefsOptNone => {}
            _ => panic!("illegal state: unexpected meta rule"),
        }

        let native = NativeExpr {
            qualifiers: self.arenas.names.alloc_slice(qualifiers),
            name,
            references: self.arenas.native_refs.alloc_slice(references),
        };
        Ok(self.arenas.consts.alloc(ConstExpr::Native(native)))
    }

    fn qualification(&mut self, node: &Node<'_>, out: &mut Vec<SourceString>) {
        match self.rule(node) {
            MetaRule::QualFirst => {
                let children = node.sub_elements();
                out.push(Self::text(children[0]));
            }
            MetaRule::QualNext => {
                let children = node.sub_elements();
                self.qualification(children[0], out);
                out.push(Self::text(children[1]));
            }
            _ => panic!("illegal state: unexpected meta rule"),
        }
    }

    fn references(&mut self, node: &Node<'_>, out: &mut Vec<NativeRef<'a>>) -> Result<()> {
        match self.rule(node) {
            MetaRule::RefsFirst => {
                let children = node.sub_elements();
                out.push(self.reference(children[0])?);
            }
            MetaRule::RefsNext => {
                let children = node.sub_elements();
                self.references(children[0], out)?;
                out.push(self.reference(children[1])?);
            }
            _ => panic!("illegal state: unexpected meta rule"),
        }
        Ok(())
    }

    fn reference(&mut self, node: &Node<'_>) -> Result<NativeRef<'a>> {
        let children = node.sub_elements();
        assert_eq!(children.len(), 2, "illegal state: meta rule arity");
        let kind = match self.rule(node) {
            MetaRule::RefField => NativeRefKind::Field,
            MetaRule::RefPointer => NativeRefKind::Pointer,
            _ => panic!("illegal state: unexpected meta rule"),
        };
        Ok(NativeRef {
            kind,
            name: self.native_name(children[1])?,
        })
    }

    fn native_name(&mut self, node: &Node<'_>) -> Result<NativeName<'a>> {
        let children = node.sub_elements();
        assert_eq!(children.len(), 1, "illegal state: meta rule arity");
        match self.rule(node) {
            MetaRule::NativeNameVar => {
                let sub = self.expect(children[0], MetaRule::NativeVarRule, 1);
                Ok(NativeName::Variable(Self::text(sub[0])))
            }
            MetaRule::NativeNameFn => {
                let sub = self.expect(children[0], MetaRule::NativeFnRule, 4);
                let name = Self::text(sub[0]);
                let mut args = Vec::new();
                match self.rule(sub[2]) {
                    MetaRule::ArgsOptSome => {
                        self.argument_list(sub[2].sub_elements()[0], &mut args)?
                    }
                    MetaRule::ArgsOptNone => {}
                    _ => panic!("illegal state: unexpected meta rule"),
                }
                Ok(NativeName::Function {
                    name,
                    args: self.arenas.const_refs.alloc_slice(args),
                })
            }
            _ => panic!("illegal state: unexpected meta rule"),
        }
    }

    fn argument_list(&mut self, node: &Node<'_>, out: &mut Vec<&'a ConstExpr<'a>>) -> Result<()> {
        match self.rule(node) {
            MetaRule::ArgsFirst => {
                let children = node.sub_elements();
                out.push(self.const_expression(children[0])?);
            }
            MetaRule::ArgsNext => {
                let children = node.sub_elements();
                self.argument_list(children[0], out)?;
                out.push(self.const_expression(children[2])?);
            }
            _ => panic!("illegal state: unexpected meta rule"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SyntaxExprKind;
    use syntagma_base::Arena;

    macro_rules! with_arenas {
        ($arenas:ident, $body:block) => {{
            let decls = Arena::new();
            let exprs = Arena::new();
            let expr_refs = Arena::new();
            let consts = Arena::new();
            let const_refs = Arena::new();
            let names = Arena::new();
            let native_refs = Arena::new();
            let $arenas = AstArenas {
                decls: &decls,
                exprs: &exprs,
                expr_refs: &expr_refs,
                consts: &consts,
                const_refs: &const_refs,
                names: &names,
                native_refs: &native_refs,
            };
            $body
        }};
    }

    #[test]
    fn parses_a_small_arithmetic_grammar() {
        with_arenas!(arenas, {
            let mut interner = Interner::new();
            let grammar = parse_grammar(
                arenas,
                &mut interner,
                "token NUMBER {int};\n@Expr : Expr '+' Term | Term ;\nTerm : NUMBER ;\n",
                "calc.syn",
            )
            .expect("parses");

            assert_eq!(grammar.terminals.len(), 1);
            assert_eq!(grammar.nonterminals.len(), 2);
            assert!(grammar.nonterminals[0].start);
            assert!(!grammar.nonterminals[1].start);
            assert_eq!(interner.resolve(grammar.nonterminals[0].name.sym), "Expr");

            match &grammar.nonterminals[0].expr.kind {
                SyntaxExprKind::Or { alternatives } => assert_eq!(alternatives.len(), 2),
                other => panic!("expected Or, got {other:?}"),
            }
        });
    }

    #[test]
    fn single_element_sequences_collapse() {
        with_arenas!(arenas, {
            let mut interner = Interner::new();
            let grammar =
                parse_grammar(arenas, &mut interner, "A : B ;\nB : 'x' ;", "g.syn").unwrap();
            assert!(matches!(
                grammar.nonterminals[0].expr.kind,
                SyntaxExprKind::NameRef { .. }
            ));
        });
    }

    #[test]
    fn parses_loops_with_separators() {
        with_arenas!(arenas, {
            let mut interner = Interner::new();
            let grammar = parse_grammar(
                arenas,
                &mut interner,
                "token ID {str};\n@Names : (ID : ',')* ;",
                "g.syn",
            )
            .unwrap();
            let body = match &grammar.nonterminals[0].expr.kind {
                SyntaxExprKind::ZeroMany { body } => body,
                other => panic!("expected ZeroMany, got {other:?}"),
            };
            assert!(body.separator.is_some());
            assert_eq!(body.separator_pos.line, 2);
        });
    }

    #[test]
    fn parses_attributes_and_this() {
        with_arenas!(arenas, {
            let mut interner = Interner::new();
            let grammar = parse_grammar(
                arenas,
                &mut interner,
                "token ID {str};\n@Expr : '(' this=Expr ')' | ID ;",
                "g.syn",
            )
            .unwrap();
            let alternatives = match &grammar.nonterminals[0].expr.kind {
                SyntaxExprKind::Or { alternatives } => alternatives,
                other => panic!("expected Or, got {other:?}"),
            };
            let elements = match &alternatives[0].kind {
                SyntaxExprKind::And { elements, .. } => elements,
                other => panic!("expected And, got {other:?}"),
            };
            assert!(matches!(elements[1].kind, SyntaxExprKind::This { .. }));
        });
    }

    #[test]
    fn parses_casts_and_consts() {
        with_arenas!(arenas, {
            let mut interner = Interner::new();
            let grammar = parse_grammar(
                arenas,
                &mut interner,
                "type N;\n@D : {N}(E) | <42> ;\nE : 'e' ;",
                "g.syn",
            )
            .unwrap();
            let alternatives = match &grammar.nonterminals[0].expr.kind {
                SyntaxExprKind::Or { alternatives } => alternatives,
                other => panic!("expected Or, got {other:?}"),
            };
            assert!(matches!(alternatives[0].kind, SyntaxExprKind::Cast { .. }));
            match alternatives[1].kind {
                SyntaxExprKind::Const { expr } => {
                    assert!(matches!(expr, ConstExpr::Integer(42)))
                }
                ref other => panic!("expected Const, got {other:?}"),
            }
        });
    }

    #[test]
    fn parses_native_const_expressions() {
        with_arenas!(arenas, {
            let mut interner = Interner::new();
            let grammar = parse_grammar(
                arenas,
                &mut interner,
                "@V {val} : <rt::mk(1, true).tag> ;",
                "g.syn",
            )
            .unwrap();
            let const_expr = match grammar.nonterminals[0].expr.kind {
                SyntaxExprKind::Const { expr } => expr,
                ref other => panic!("expected Const, got {other:?}"),
            };
            let rendered = crate::ast::render_const(const_expr, &interner);
            assert_eq!(rendered, "rt::mk(1, true).tag");
        });
    }

    #[test]
    fn syntax_error_carries_the_position() {
        with_arenas!(arenas, {
            let mut interner = Interner::new();
            let err =
                parse_grammar(arenas, &mut interner, "token ; X", "bad.syn").unwrap_err();
            assert_eq!(err.message, "Syntax error");
            assert_eq!(err.pos.line, 1);
        });
    }

    #[test]
    fn lexical_error_is_reported_with_its_message() {
        with_arenas!(arenas, {
            let mut interner = Interner::new();
            let err = parse_grammar(arenas, &mut interner, "A : \"x ;", "bad.syn").unwrap_err();
            assert!(err.message.contains("Unterminated string literal"));
        });
    }

    #[test]
    fn duplicate_string_literals_share_interned_text() {
        with_arenas!(arenas, {
            let mut interner = Interner::new();
            let grammar = parse_grammar(
                arenas,
                &mut interner,
                "A : '+' ;\nB : '+' ;",
                "g.syn",
            )
            .unwrap();
            let first = match grammar.nonterminals[0].expr.kind {
                SyntaxExprKind::StrLiteral { text } => text.sym,
                ref other => panic!("expected literal, got {other:?}"),
            };
            let second = match grammar.nonterminals[1].expr.kind {
                SyntaxExprKind::StrLiteral { text } => text.sym,
                ref other => panic!("expected literal, got {other:?}"),
            };
            assert_eq!(first, second);
        });
    }
}
