//! The meta-grammar, described as raw BNF.
//!
//! The loader parses grammar files with the same GLR core the
//! generated parsers use, over tables generated from this rule set at
//! startup. Reduce action numbers are production indices; the
//! [`BootstrapTables::rules`] vector maps them back to [`MetaRule`]s.

use crate::token::TokenKind;
use syntagma_lr::{generate_lr_tables, runtime_tables, BnfGrammarBuilder};
use syntagma_runtime::ParseTables;

/// Semantic tag of one meta-grammar production.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MetaRule {
    GrammarRule,
    DeclListFirst,
    DeclListNext,
    DeclType,
    DeclTerminal,
    DeclNonterminal,
    DeclCustomTokenType,
    TypeDeclRule,
    TerminalDeclRule,
    NonterminalDeclRule,
    CustomTokenTypeDeclRule,
    AtPresent,
    AtAbsent,
    TypeOptSome,
    TypeOptNone,
    TypeRule,
    OrExprRule,
    AndListFirst,
    AndListNext,
    AndExprRule,
    ElemListOptSome,
    ElemListOptNone,
    ElemListFirst,
    ElemListNext,
    ElemName,
    ElemThis,
    AttrElem,
    PlainElem,
    ThisElemRule,
    TermPrimary,
    TermAdvanced,
    PrimaryName,
    PrimaryString,
    PrimaryNested,
    NameTermRule,
    StringTermRule,
    NestedTermRule,
    AdvZeroOne,
    AdvZeroMany,
    AdvOneMany,
    AdvConst,
    ZeroOneRule,
    ZeroManyRule,
    OneManyRule,
    LoopSimple,
    LoopAdvanced,
    SimpleLoopBodyRule,
    SeparatedLoopBody,
    PlainLoopBody,
    ConstTermRule,
    ConstInt,
    ConstStr,
    ConstBool,
    ConstNative,
    IntLiteral,
    StrLiteral,
    FalseLiteral,
    TrueLiteral,
    NativeExprRule,
    QualOptSome,
    QualOptNone,
    QualFirst,
    QualNext,
    RefsOptSome,
    RefsOptNone,
    RefsFirst,
    RefsNext,
    NativeNameVar,
    NativeNameFn,
    NativeVarRule,
    NativeFnRule,
    ArgsOptSome,
    ArgsOptNone,
    ArgsFirst,
    ArgsNext,
    RefField,
    RefPointer,
}

const META_TOKENS: &[(&str, TokenKind)] = &[
    ("NAME", TokenKind::Name),
    ("NUMBER", TokenKind::Number),
    ("STRING", TokenKind::Str),
    ("KW_TYPE", TokenKind::KwType),
    ("KW_TOKEN", TokenKind::KwToken),
    ("KW_THIS", TokenKind::KwThis),
    ("KW_TRUE", TokenKind::KwTrue),
    ("KW_FALSE", TokenKind::KwFalse),
    ("CH_SEMICOLON", TokenKind::Semicolon),
    ("CH_AT", TokenKind::At),
    ("CH_COLON", TokenKind::Colon),
    ("CH_OBRACE", TokenKind::OpenBrace),
    ("CH_CBRACE", TokenKind::CloseBrace),
    ("CH_OR", TokenKind::Pipe),
    ("CH_EQ", TokenKind::Assign),
    ("CH_OPAREN", TokenKind::OpenParen),
    ("CH_CPAREN", TokenKind::CloseParen),
    ("CH_QUESTION", TokenKind::Question),
    ("CH_ASTERISK", TokenKind::Asterisk),
    ("CH_PLUS", TokenKind::Plus),
    ("CH_LT", TokenKind::Lt),
    ("CH_GT", TokenKind::Gt),
    ("CH_COLON_COLON", TokenKind::ColonColon),
    ("CH_COMMA", TokenKind::Comma),
    ("CH_DOT", TokenKind::Dot),
    ("CH_MINUS_GT", TokenKind::Arrow),
];

/// `(nonterminal, right-hand side, rule tag)`. Nonterminals come into
/// existence at their first appearance on the left; the first one is
/// the start symbol.
const META_RULES: &[(&str, &str, MetaRule)] = &[
    ("Grammar", "DeclarationList", MetaRule::GrammarRule),
    ("DeclarationList", "Declaration", MetaRule::DeclListFirst),
    ("DeclarationList", "DeclarationList Declaration", MetaRule::DeclListNext),
    ("Declaration", "TypeDeclaration", MetaRule::DeclType),
    ("Declaration", "TerminalDeclaration", MetaRule::DeclTerminal),
    ("Declaration", "NonterminalDeclaration", MetaRule::DeclNonterminal),
    ("Declaration", "CustomTokenTypeDeclaration", MetaRule::DeclCustomTokenType),
    ("TypeDeclaration", "KW_TYPE NAME CH_SEMICOLON", MetaRule::TypeDeclRule),
    ("TerminalDeclaration", "KW_TOKEN NAME TypeOpt CH_SEMICOLON", MetaRule::TerminalDeclRule),
    (
        "NonterminalDeclaration",
        "AtOpt NAME TypeOpt CH_COLON OrExpression CH_SEMICOLON",
        MetaRule::NonterminalDeclRule,
    ),
    (
        "CustomTokenTypeDeclaration",
        "KW_TOKEN STRING Type CH_SEMICOLON",
        MetaRule::CustomTokenTypeDeclRule,
    ),
    ("AtOpt", "CH_AT", MetaRule::AtPresent),
    ("AtOpt", "", MetaRule::AtAbsent),
    ("TypeOpt", "Type", MetaRule::TypeOptSome),
    ("TypeOpt", "", MetaRule::TypeOptNone),
    ("Type", "CH_OBRACE NAME CH_CBRACE", MetaRule::TypeRule),
    ("OrExpression", "AndExpressionList", MetaRule::OrExprRule),
    ("AndExpressionList", "AndExpression", MetaRule::AndListFirst),
    ("AndExpressionList", "AndExpressionList CH_OR AndExpression", MetaRule::AndListNext),
    ("AndExpression", "ElementListOpt TypeOpt", MetaRule::AndExprRule),
    ("ElementListOpt", "ElementList", MetaRule::ElemListOptSome),
    ("ElementListOpt", "", MetaRule::ElemListOptNone),
    ("ElementList", "Element", MetaRule::ElemListFirst),
    ("ElementList", "ElementList Element", MetaRule::ElemListNext),
    ("Element", "NameElement", MetaRule::ElemName),
    ("Element", "ThisElement", MetaRule::ElemThis),
    ("NameElement", "NAME CH_EQ Term", MetaRule::AttrElem),
    ("NameElement", "Term", MetaRule::PlainElem),
    ("ThisElement", "KW_THIS CH_EQ Term", MetaRule::ThisElemRule),
    ("Term", "PrimaryTerm", MetaRule::TermPrimary),
    ("Term", "AdvancedTerm", MetaRule::TermAdvanced),
    ("PrimaryTerm", "NameTerm", MetaRule::PrimaryName),
    ("PrimaryTerm", "StringTerm", MetaRule::PrimaryString),
    ("PrimaryTerm", "NestedTerm", MetaRule::PrimaryNested),
    ("NameTerm", "NAME", MetaRule::NameTermRule),
    ("StringTerm", "STRING", MetaRule::StringTermRule),
    ("NestedTerm", "TypeOpt CH_OPAREN OrExpression CH_CPAREN", MetaRule::NestedTermRule),
    ("AdvancedTerm", "ZeroOneTerm", MetaRule::AdvZeroOne),
    ("AdvancedTerm", "ZeroManyTerm", MetaRule::AdvZeroMany),
    ("AdvancedTerm", "OneManyTerm", MetaRule::AdvOneMany),
    ("AdvancedTerm", "ConstTerm", MetaRule::AdvConst),
    ("ZeroOneTerm", "PrimaryTerm CH_QUESTION", MetaRule::ZeroOneRule),
    ("ZeroManyTerm", "LoopBody CH_ASTERISK", MetaRule::ZeroManyRule),
    ("OneManyTerm", "LoopBody CH_PLUS", MetaRule::OneManyRule),
    ("LoopBody", "SimpleLoopBody", MetaRule::LoopSimple),
    ("LoopBody", "AdvancedLoopBody", MetaRule::LoopAdvanced),
    ("SimpleLoopBody", "PrimaryTerm", MetaRule::SimpleLoopBodyRule),
    (
        "AdvancedLoopBody",
        "CH_OPAREN OrExpression CH_COLON OrExpression CH_CPAREN",
        MetaRule::SeparatedLoopBody,
    ),
    ("AdvancedLoopBody", "CH_OPAREN OrExpression CH_CPAREN", MetaRule::PlainLoopBody),
    ("ConstTerm", "CH_LT ConstExpression CH_GT", MetaRule::ConstTermRule),
    ("ConstExpression", "IntegerConst", MetaRule::ConstInt),
    ("ConstExpression", "StringConst", MetaRule::ConstStr),
    ("ConstExpression", "BooleanConst", MetaRule::ConstBool),
    ("ConstExpression", "NativeConst", MetaRule::ConstNative),
    ("IntegerConst", "NUMBER", MetaRule::IntLiteral),
    ("StringConst", "STRING", MetaRule::StrLiteral),
    ("BooleanConst", "KW_FALSE", MetaRule::FalseLiteral),
    ("BooleanConst", "KW_TRUE", MetaRule::TrueLiteral),
    (
        "NativeConst",
        "QualificationOpt NativeName ReferencesOpt",
        MetaRule::NativeExprRule,
    ),
    ("QualificationOpt", "Qualification", MetaRule::QualOptSome),
    ("QualificationOpt", "", MetaRule::QualOptNone),
    ("Qualification", "NAME CH_COLON_COLON", MetaRule::QualFirst),
    ("Qualification", "Qualification NAME CH_COLON_COLON", MetaRule::QualNext),
    ("ReferencesOpt", "References", MetaRule::RefsOptSome),
    ("ReferencesOpt", "", MetaRule::RefsOptNone),
    ("References", "Reference", MetaRule::RefsFirst),
    ("References", "References Reference", MetaRule::RefsNext),
    ("NativeName", "NativeVariableName", MetaRule::NativeNameVar),
    ("NativeName", "NativeFunctionName", MetaRule::NativeNameFn),
    ("NativeVariableName", "NAME", MetaRule::NativeVarRule),
    ("NativeFunctionName", "NAME CH_OPAREN ArgumentsOpt CH_CPAREN", MetaRule::NativeFnRule),
    ("ArgumentsOpt", "ArgumentList", MetaRule::ArgsOptSome),
    ("ArgumentsOpt", "", MetaRule::ArgsOptNone),
    ("ArgumentList", "ConstExpression", MetaRule::ArgsFirst),
    ("ArgumentList", "ArgumentList CH_COMMA ConstExpression", MetaRule::ArgsNext),
    ("Reference", "CH_DOT NativeName", MetaRule::RefField),
    ("Reference", "CH_MINUS_GT NativeName", MetaRule::RefPointer),
];

pub(crate) struct BootstrapTables {
    pub tables: ParseTables,
    pub start_state: u32,
    /// Reduce action number (production index) -> rule tag.
    pub rules: Vec<MetaRule>,
}

/// Compiles the meta-grammar into runtime tables.
pub(crate) fn bootstrap_tables() -> BootstrapTables {
    let mut builder: BnfGrammarBuilder<(), TokenKind, u32> = BnfGrammarBuilder::new();
    let mut rules = Vec::with_capacity(META_RULES.len());

    // Terminals first, then every nonterminal in first-appearance
    // order, then the productions.
    let mut terminal_syms = Vec::new();
    for &(name, kind) in META_TOKENS {
        let tr = builder.create_terminal(name, kind);
        terminal_syms.push((name, builder.tr_sym(tr)));
    }

    let mut nt_syms: Vec<(&str, syntagma_lr::NtIdx)> = Vec::new();
    for &(lhs, _, _) in META_RULES {
        if !nt_syms.iter().any(|&(name, _)| name == lhs) {
            let nt = builder.create_nonterminal(lhs, ());
            nt_syms.push((lhs, nt));
        }
    }

    for &(lhs, rhs, rule) in META_RULES {
        let nt = nt_syms
            .iter()
            .find(|&&(name, _)| name == lhs)
            .map(|&(_, nt)| nt)
            .expect("left-hand side registered above");
        let elements = rhs
            .split_whitespace()
            .map(|name| {
                terminal_syms
                    .iter()
                    .find(|&&(tr_name, _)| tr_name == name)
                    .map(|&(_, sym)| sym)
                    .or_else(|| {
                        nt_syms
                            .iter()
                            .find(|&&(nt_name, _)| nt_name == name)
                            .map(|&(_, nt)| builder.nt_sym(nt))
                    })
                    .unwrap_or_else(|| panic!("unknown meta symbol '{name}'"))
            })
            .collect();
        let action = rules.len() as u32;
        rules.push(rule);
        builder.add_production(nt, action, elements);
    }

    let start_nt = nt_syms[0].1;
    let grammar = builder.build();
    let lr = generate_lr_tables(&grammar, &[start_nt]);
    let (tables, starts) =
        runtime_tables(&grammar, &lr, |_, &kind| kind.internal(), |_, &action| action);

    BootstrapTables {
        tables,
        start_state: starts[0].1,
        rules,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_grammar_compiles() {
        let bootstrap = bootstrap_tables();
        assert_eq!(bootstrap.rules.len(), META_RULES.len());
        assert!(bootstrap.tables.states.len() > 50);
    }

    #[test]
    fn bootstrap_is_deterministic() {
        let a = bootstrap_tables();
        let b = bootstrap_tables();
        assert_eq!(a.start_state, b.start_state);
        assert_eq!(a.tables.states.len(), b.tables.states.len());
        for (left, right) in a.tables.states.iter().zip(&b.tables.states) {
            assert_eq!(left.shifts, right.shifts);
            assert_eq!(left.gotos, right.gotos);
        }
    }
}
