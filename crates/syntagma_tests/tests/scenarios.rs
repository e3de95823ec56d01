//! End-to-end scenarios over the whole generator.

use syntagma_grammar::convert::action::Action;
use syntagma_grammar::convert::descriptor::{NtDescriptor, RunType};
use syntagma_tests::build;

#[test]
fn s1_simple_arithmetic() {
    let built = build(
        "token NUMBER {int};\n\
         @Expr : Expr '+' Term | Term ;\n\
         Term  : NUMBER ;\n",
    )
    .expect("builds");

    assert_eq!(built.conversion.bnf.nonterminals().len(), 2);
    assert_eq!(built.conversion.bnf.terminals().len(), 2);
    assert_eq!(built.conversion.bnf.productions().len(), 3);
    assert!(built.lr.states.len() >= 5);
    assert_eq!(built.start_states.len(), 1);

    assert!(built.accepts(&["NUMBER", "+", "NUMBER", "+", "NUMBER"]));
    assert!(built.accepts(&["NUMBER"]));
    assert!(!built.accepts(&["NUMBER", "NUMBER"]));
    assert!(!built.accepts(&["+", "NUMBER"]));
    assert!(!built.accepts(&[]));
}

#[test]
fn s2_list_with_separator() {
    let built = build(
        "token ID {str};\n\
         @Names : (ID : ',')* ;\n",
    )
    .expect("builds");

    // The loop synthesizes the zero-many head on the user nonterminal
    // and a one-many list nonterminal beside it.
    let autos = built
        .conversion
        .bnf
        .nonterminals()
        .iter()
        .filter(|nt| matches!(nt.payload, NtDescriptor::Auto { .. }))
        .count();
    assert_eq!(autos, 1);

    let actions: Vec<&Action> = built
        .conversion
        .bnf
        .productions()
        .iter()
        .map(|pr| &pr.payload.action)
        .collect();
    assert!(actions.iter().any(|a| matches!(a, Action::FirstList { .. })));
    assert!(actions
        .iter()
        .any(|a| matches!(a, Action::NextList { has_separator: true, .. })));
    assert!(actions.iter().any(|a| matches!(a, Action::Void)));
    assert!(actions.iter().any(|a| matches!(a, Action::Copy { .. })));

    // The empty string is a valid (empty) list.
    assert!(built.accepts(&[]));
    assert!(built.accepts(&["ID"]));
    assert!(built.accepts(&["ID", ",", "ID", ",", "ID"]));
    assert!(!built.accepts(&["ID", ","]));
    assert!(!built.accepts(&[",", "ID"]));
}

#[test]
fn s3_class_attributes() {
    let built = build(
        "token ID {str};\n\
         type Name;\n\
         @Decl : kind=ID name=ID {Name} ;\n",
    )
    .expect("builds");

    let decl_nt = &built.conversion.bnf.nonterminals()[0];
    match built.conversion.types.get(decl_nt.payload.ty()) {
        RunType::Class { name, .. } => assert_eq!(name, "Name"),
        other => panic!("expected the implicit class Name, got {other:?}"),
    }

    let production = built.conversion.bnf.pr(decl_nt.productions[0]);
    match &production.payload.action {
        Action::Class { fields, .. } => {
            assert_eq!(
                fields.attributes,
                vec![(0, "kind".to_string()), (1, "name".to_string())]
            );
            assert!(fields.part_classes.is_empty());
            assert!(fields.nested_class.is_none());
        }
        other => panic!("expected a class action, got {other:?}"),
    }

    assert!(built.accepts(&["ID", "ID"]));
    assert!(!built.accepts(&["ID"]));
}

#[test]
fn s4_this_rebinding() {
    let built = build(
        "token ID {str};\n\
         @Expr : '(' this=Expr ')' | ID ;\n",
    )
    .expect("builds");

    // No class is synthesized for the this-AND.
    assert_eq!(built.conversion.types.class_count(), 0);

    let expr_nt = &built.conversion.bnf.nonterminals()[0];
    let result_indices: Vec<usize> = expr_nt
        .productions
        .iter()
        .filter_map(
            |&pr| match built.conversion.bnf.pr(pr).payload.action {
                Action::ResultAnd { index, .. } => Some(index),
                _ => None,
            },
        )
        .collect();
    assert_eq!(result_indices, vec![1]);

    assert!(built.accepts(&["ID"]));
    assert!(built.accepts(&["(", "(", "ID", ")", ")"]));
    assert!(!built.accepts(&["(", "ID"]));
}

#[test]
fn s5_recursion_through_loop_is_rejected() {
    let error = build(
        "token X ;\n\
         @A : B* ;\n\
         B  : A ;\n",
    )
    .unwrap_err();

    assert!(error.contains("Recursion through loop"), "got: {error}");
    assert!(error.contains("A B A"), "got: {error}");
}

#[test]
fn s6_attribute_and_this_conflict() {
    let error = build(
        "token X;\n\
         token Y;\n\
         @R : a=X this=Y ;\n",
    )
    .unwrap_err();

    assert!(error.contains("Attribute and 'this' conflict"), "got: {error}");
    // Position of the `this` element.
    assert!(error.starts_with("test.syn:3:10"), "got: {error}");
}
