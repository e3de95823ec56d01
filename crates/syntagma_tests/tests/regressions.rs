//! Regression tests for corners the implementation decides
//! deliberately.

use syntagma_grammar::convert::action::Action;
use syntagma_grammar::convert::descriptor::{RunType, TrDescriptor};
use syntagma_tests::build;

/// A recursion placeholder meeting a real class value in an
/// alternation resolves to the value; it is compatible with anything
/// only there and in casts. This pins the decision down so any future
/// change shows up loudly.
#[test]
fn recursion_placeholder_merges_with_class_values() {
    let built = build(
        "token ID {str};\n\
         @Expr : wrap=Expr | name=ID ;\n",
    )
    .expect("builds");

    // Expr is a class nonterminal despite the self-reference.
    let expr_nt = &built.conversion.bnf.nonterminals()[0];
    assert!(matches!(
        built.conversion.types.get(expr_nt.payload.ty()),
        RunType::Class { .. }
    ));
}

#[test]
fn recursion_placeholder_in_cast_context() {
    let built = build(
        "token NUMBER {int};\n\
         @Expr {Node} : {Node}(inner=Expr) | this=Term ;\n\
         Term {Node} : value=NUMBER ;\n",
    )
    .expect("builds");

    assert_eq!(built.conversion.types.class_count(), 1);
}

/// Identical literal content maps to one terminal id regardless of
/// where in the grammar the literal is written.
#[test]
fn literal_identity_ignores_positions() {
    let built = build(
        "token ID {str};\n\
         @A : 'end' ID ;\n\
         B : ID 'end' ;\n\
         @C : B 'end' ;\n",
    )
    .expect("builds");

    let ends: Vec<u32> = built
        .conversion
        .bnf
        .terminals()
        .iter()
        .filter_map(|tr| match &tr.payload {
            TrDescriptor::Str { text, id, .. } if text == "end" => Some(*id),
            _ => None,
        })
        .collect();
    assert_eq!(ends.len(), 1);
}

/// The empty alternative of every `?` shares the single `A_Empty`
/// nonterminal when lowered as a standalone symbol.
#[test]
fn empty_expressions_share_one_nonterminal() {
    let built = build(
        "token X;\n\
         @S : X () X () ;\n",
    )
    .expect("builds");

    let empties = built
        .conversion
        .bnf
        .nonterminals()
        .iter()
        .filter(|nt| nt.name == "A_Empty")
        .count();
    assert_eq!(empties, 1);

    assert!(built.accepts(&["X", "X"]));
}

/// Loop elements are lowered once even though the converter asks for
/// the element symbol both for typing and for the productions.
#[test]
fn loop_elements_share_their_auto_nonterminal() {
    let built = build(
        "token N {int};\n\
         type P;\n\
         @S : ((a=N b=N {P}))* ;\n",
    )
    .expect("builds");

    // Every auto nonterminal must be reachable: exactly one carries
    // the element class production, not a duplicated orphan.
    let class_production_owners: Vec<&str> = built
        .conversion
        .bnf
        .productions()
        .iter()
        .filter(|pr| matches!(pr.payload.action, Action::Class { .. }))
        .map(|pr| built.conversion.bnf.nt(pr.nt).name.as_str())
        .collect();
    assert_eq!(class_production_owners.len(), 1);
}

/// A dead AND inside a loop separator still round-trips the pipeline.
#[test]
fn dead_and_as_separator() {
    let built = build(
        "token N {int};\n\
         token C;\n\
         @S : (N : C C)* ;\n",
    )
    .expect("builds");

    assert!(built.accepts(&[]));
    assert!(built.accepts(&["N"]));
    assert!(built.accepts(&["N", "C", "C", "N"]));
    assert!(!built.accepts(&["N", "C", "N"]));
}

/// `?` inside an AND keeps attribute scope and conversion context.
#[test]
fn optional_attribute_inside_and() {
    let built = build(
        "token N {int};\n\
         token K;\n\
         @S : (sign=N)? K ;\n",
    )
    .expect("builds");

    assert!(built.accepts(&["K"]));
    assert!(built.accepts(&["N", "K"]));
    assert!(!built.accepts(&["N"]));
}

/// Plain recursion through alternatives stays legal (only loops are
/// restricted).
#[test]
fn plain_recursion_is_permitted() {
    build(
        "token ID {str};\n\
         @Expr : '(' this=Expr ')' | ID ;\n",
    )
    .expect("builds");
}
