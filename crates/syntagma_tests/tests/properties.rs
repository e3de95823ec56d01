//! Cross-cutting invariants of the generator.

use syntagma_grammar::convert::action::Action;
use syntagma_grammar::convert::descriptor::TrDescriptor;
use syntagma_tests::build;

const CALC: &str = "token NUMBER {int};\n\
                    @Expr : Expr '+' Term | Term ;\n\
                    Term  : NUMBER | '(' this=Expr ')' ;\n";

#[test]
fn generation_is_deterministic() {
    let first = build(CALC).expect("builds");
    let second = build(CALC).expect("builds");

    assert_eq!(first.lr.states.len(), second.lr.states.len());
    for (a, b) in first.lr.states.iter().zip(&second.lr.states) {
        assert_eq!(a.shifts, b.shifts);
        assert_eq!(a.gotos, b.gotos);
        assert_eq!(a.reduces, b.reduces);
    }

    assert_eq!(
        first.conversion.bnf.productions().len(),
        second.conversion.bnf.productions().len()
    );
    for (a, b) in first
        .conversion
        .bnf
        .nonterminals()
        .iter()
        .zip(second.conversion.bnf.nonterminals())
    {
        assert_eq!(a.name, b.name);
        assert_eq!(a.productions, b.productions);
    }
}

#[test]
fn indices_are_dense() {
    let built = build(CALC).expect("builds");
    let bnf = &built.conversion.bnf;

    for (i, tr) in bnf.terminals().iter().enumerate() {
        assert_eq!(tr.index.index(), i);
    }
    for (i, nt) in bnf.nonterminals().iter().enumerate() {
        assert_eq!(nt.index.index(), i);
    }
    for (i, pr) in bnf.productions().iter().enumerate() {
        assert_eq!(pr.index.index(), i);
    }
    for (i, state) in built.lr.states.iter().enumerate() {
        assert_eq!(state.index.index(), i);
    }

    // Every production is owned by exactly one nonterminal.
    let mut owned = vec![false; bnf.productions().len()];
    for nt in bnf.nonterminals() {
        for &pr in &nt.productions {
            assert!(!owned[pr.index()], "production owned twice");
            owned[pr.index()] = true;
        }
    }
    assert!(owned.into_iter().all(|seen| seen));
}

#[test]
fn actions_are_well_typed() {
    let built = build(CALC).expect("builds");
    let types = &built.conversion.types;

    for nt in built.conversion.bnf.nonterminals() {
        let nt_ty = nt.payload.ty();
        for &pr_idx in &nt.productions {
            let action = &built.conversion.bnf.pr(pr_idx).payload.action;
            let result = action.result_type(types);
            // Either void, or exactly the nonterminal's type; casts
            // were inserted wherever they differed.
            assert!(
                types.is_void(result) || types.equal(result, nt_ty),
                "action result does not match its nonterminal"
            );
        }
    }
}

#[test]
fn string_literals_deduplicate_by_content() {
    let built = build(
        "token NUMBER {int};\n\
         @A : NUMBER '+' NUMBER | B ;\n\
         B : NUMBER '+' ;\n",
    )
    .expect("builds");

    let plus_terminals = built
        .conversion
        .bnf
        .terminals()
        .iter()
        .filter(|tr| matches!(&tr.payload, TrDescriptor::Str { text, .. } if text == "+"))
        .count();
    assert_eq!(plus_terminals, 1);
}

#[test]
fn keyword_like_literals_are_flagged() {
    let built = build(
        "token ID {str};\n\
         @Stmt : 'if' ID | '+' ID ;\n",
    )
    .expect("builds");

    let mut keyword_like = None;
    let mut operator_like = None;
    for tr in built.conversion.bnf.terminals() {
        if let TrDescriptor::Str {
            text,
            is_keyword_like,
            ..
        } = &tr.payload
        {
            match text.as_str() {
                "if" => keyword_like = Some(*is_keyword_like),
                "+" => operator_like = Some(*is_keyword_like),
                _ => {}
            }
        }
    }
    assert_eq!(keyword_like, Some(true));
    assert_eq!(operator_like, Some(false));
}

#[test]
fn mixed_literals_are_rejected() {
    let error = build(
        "token ID {str};\n\
         @Stmt : 'if+' ID ;\n",
    )
    .unwrap_err();
    assert!(
        error.contains("Mixing identifier and non-identifier"),
        "got: {error}"
    );
}

#[test]
fn string_terminal_ids_are_dense() {
    let built = build(
        "token ID {str};\n\
         @S : 'a' 'b' 'c' 'b' ;\n",
    )
    .expect("builds");

    let ids: Vec<u32> = built
        .conversion
        .bnf
        .terminals()
        .iter()
        .filter_map(|tr| match &tr.payload {
            TrDescriptor::Str { id, .. } => Some(*id),
            _ => None,
        })
        .collect();
    assert_eq!(ids, vec![0, 1, 2]);
}

#[test]
fn casts_are_inserted_for_subtype_alternatives() {
    // Expr's alternatives produce two different classes; the cast to
    // the declared parent class keeps every nonterminal single-typed.
    let built = build(
        "token NUMBER {int};\n\
         @Expr {Node} : {Add}(l=Expr '+' r=Term) | this=Term ;\n\
         Term {Num} : value=NUMBER ;\n",
    )
    .expect("builds");

    let cast_count = built
        .conversion
        .bnf
        .productions()
        .iter()
        .filter(|pr| matches!(pr.payload.action, Action::Cast { .. }))
        .count();
    assert!(cast_count >= 1, "expected at least one inserted cast");
}
