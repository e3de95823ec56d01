//! GLR behavior over generated tables.

use syntagma_tests::build;

#[test]
fn conflict_free_grammar_behaves_like_plain_lr() {
    // A textbook LR(0)-friendly grammar: balanced wrapping.
    let built = build(
        "token ID {str};\n\
         @S : '[' S ']' | ID ;\n",
    )
    .expect("builds");

    assert!(built.accepts(&["ID"]));
    assert!(built.accepts(&["[", "ID", "]"]));
    assert!(built.accepts(&["[", "[", "ID", "]", "]"]));
    assert!(!built.accepts(&["[", "ID"]));
    assert!(!built.accepts(&["ID", "]"]));
    assert!(!built.accepts(&["[", "]"]));
}

#[test]
fn shift_reduce_conflicts_fork_the_stack_set() {
    // Right recursion without a fixed tail gives every state after
    // 'x' both a shift and a reduce; the runtime explores both.
    let built = build(
        "token X;\n\
         @S : X S | X ;\n",
    )
    .expect("builds");

    let conflicted = built
        .runtime
        .states
        .iter()
        .any(|state| !state.shifts.is_empty() && !state.reduces.is_empty());
    assert!(conflicted, "expected a shift/reduce conflict in the tables");

    for n in 1..6 {
        let tokens: Vec<&str> = std::iter::repeat("X").take(n).collect();
        assert!(built.accepts(&tokens), "rejected X^{n}");
    }
    assert!(!built.accepts(&[]));
}

#[test]
fn reduce_reduce_conflicts_are_resolved_by_exploration() {
    // 'x' reduces to both A and B; only one branch survives the
    // following token.
    let built = build(
        "token X;\n\
         token P;\n\
         token Q;\n\
         @S : A P | B Q ;\n\
         A : X ;\n\
         B : X ;\n",
    )
    .expect("builds");

    assert!(built.accepts(&["X", "P"]));
    assert!(built.accepts(&["X", "Q"]));
    assert!(!built.accepts(&["X"]));
    assert!(!built.accepts(&["X", "P", "Q"]));
}

#[test]
fn multiple_start_nonterminals_get_their_own_states() {
    let built = build(
        "token A;\n\
         token B;\n\
         @First : A ;\n\
         @Second : B ;\n",
    )
    .expect("builds");

    assert_eq!(built.start_states.len(), 2);
    assert_ne!(built.start_states[0], built.start_states[1]);
    assert!(built.accepts(&["A"]));
}

#[test]
fn empty_productions_reduce_before_any_token() {
    let built = build(
        "token X;\n\
         @S : Opt X ;\n\
         Opt : X? ;\n",
    )
    .expect("builds");

    assert!(built.accepts(&["X"]));
    assert!(built.accepts(&["X", "X"]));
    assert!(!built.accepts(&["X", "X", "X"]));
}
