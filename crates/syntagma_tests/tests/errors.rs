//! Error taxonomy coverage: every front-end error class, with its
//! position.

use syntagma_tests::build;

fn error_of(source: &str) -> String {
    build(source).expect_err("expected the build to fail")
}

#[test]
fn duplicate_symbol_names() {
    let error = error_of("token X;\ntoken X;\n@S : X ;");
    assert!(error.contains("Duplicate name 'X'"), "got: {error}");
    assert!(error.contains("a terminal with the same name exists"));

    let error = error_of("token X;\n@S : X ;\nS : X ;");
    assert!(error.contains("a nonterminal with the same name exists"));
}

#[test]
fn symbol_and_type_namespaces_are_disjoint() {
    let error = error_of("type T;\ntoken T;\n@S : T ;");
    assert!(error.contains("a type with the same name exists"), "got: {error}");

    let error = error_of("type T;\ntype T;\n@S : 'x' ;");
    assert!(error.contains("a type with the same name exists"), "got: {error}");
}

#[test]
fn unknown_name() {
    let error = error_of("@S : Missing ;");
    assert!(error.contains("Name 'Missing' is undefined"), "got: {error}");
}

#[test]
fn type_used_as_symbol() {
    let error = error_of("type T;\n@S : T ;");
    assert!(
        error.contains("denotes a type, not a grammar symbol"),
        "got: {error}"
    );
}

#[test]
fn token_used_as_type() {
    let error = error_of("token X;\ntoken Y;\n@S {X} : Y ;");
    assert!(
        error.contains("denotes a token and cannot be used as a type"),
        "got: {error}"
    );
}

#[test]
fn grammar_symbol_used_as_token_type() {
    let error = error_of("token X;\ntoken Y {X};\n@S : Y ;");
    assert!(
        error.contains("denotes a grammar symbol and cannot be used as a token type"),
        "got: {error}"
    );
}

#[test]
fn duplicate_custom_token_type() {
    let error = error_of("token \"\" {str};\ntoken \"\" {str};\n@S : 'x' ;");
    assert!(
        error.contains("Custom token type has already been specified"),
        "got: {error}"
    );
}

#[test]
fn void_assigned_to_attribute() {
    let error = error_of("token X;\n@S : a=X ;");
    assert!(
        error.contains("Cannot assign a void expression"),
        "got: {error}"
    );
}

#[test]
fn duplicate_attribute_in_scope_chain() {
    let error = error_of("token N {int};\n@S : a=N (a=N 'x') ;");
    assert!(error.contains("Attribute name conflict: 'a'"), "got: {error}");
}

#[test]
fn parallel_or_branches_may_reuse_attribute_names() {
    build("token N {int};\n@S : (a=N 'x' | a=N 'y') b=N ;").expect("builds");
}

#[test]
fn duplicate_this_element() {
    let error = error_of("token N {int};\n@S : this=N this=N ;");
    assert!(error.contains("Result element conflict"), "got: {error}");
}

#[test]
fn this_with_explicit_type() {
    let error = error_of("token N {int};\ntype C;\n@S : (this=N 'x') {C} ;");
    assert!(
        error.contains("both 'this' and the class type"),
        "got: {error}"
    );
}

#[test]
fn nested_and_with_explicit_type() {
    let error = error_of("token N {int};\ntype C;\ntype D;\n@S : (a=N (b=N c=N {D})) {C} ;");
    assert!(
        error.contains("Nested AND expression cannot have an explicit type"),
        "got: {error}"
    );
}

#[test]
fn dead_expression_restrictions() {
    let error = error_of("token N {int};\n@S : a=N ('x' b=N)* ;");
    assert!(error.contains("used in a dead expression"), "got: {error}");

    let error = error_of("token N {int};\n@S : (N : this=N)+ ;");
    assert!(error.contains("'this' is used in a dead expression"), "got: {error}");

    let error = error_of("token N {int};\ntype C;\n@S : a=N ({C}(b=N))* ;");
    assert!(error.contains("used in a dead expression"), "got: {error}");
}

#[test]
fn cast_to_void_nonterminal_type() {
    let error = error_of("token X;\nV : X ;\n@S {V} : 'x' ;");
    assert!(
        error.contains("Cannot use a void nonterminal as an explicit type"),
        "got: {error}"
    );
}

#[test]
fn incompatible_alternative_categories() {
    let error = error_of("token N {int};\ntoken S {str};\n@R : many=(N)+ | this=S ;");
    assert!(
        error.contains("Incompatible types of alternative rules"),
        "got: {error}"
    );
}

#[test]
fn incompatible_primitive_alternatives() {
    let error = error_of("token N {int};\ntoken S {str};\n@R : N | S ;");
    assert!(
        error.contains("Types of alternative expressions are incompatible"),
        "got: {error}"
    );
}

#[test]
fn cast_across_categories() {
    let error = error_of("token N {int};\ntype C;\n@R : {C}(this=N) ;");
    assert!(error.contains("Cannot cast incompatible types"), "got: {error}");
}

#[test]
fn native_const_without_a_type() {
    let error = error_of("@R : <make_node()> ;");
    assert!(
        error.contains("Type of native constant expression is undefined"),
        "got: {error}"
    );
}

#[test]
fn empty_grammar_is_a_syntax_error() {
    let error = error_of("");
    assert!(error.contains("Syntax error"), "got: {error}");
}

#[test]
fn grammar_without_a_start_nonterminal() {
    let error = error_of("token X;\nS : X ;");
    assert!(error.contains("no start nonterminal"), "got: {error}");
}
