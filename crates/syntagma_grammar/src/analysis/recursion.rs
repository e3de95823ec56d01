//! Loop recursion detection.
//!
//! Walks the value-transparent structure of every nonterminal (the
//! paths a value can flow along: alternatives, `this=` elements, name
//! references, optionals and loop bodies) and rejects cycles that
//! cross a loop boundary. Such a cycle would make the loop's element
//! list feed on itself.
//!
//! Entering a loop body marks every nonterminal currently on the path
//! as being behind the loop; finding one of those again is the error.
//! Plain recursion (`Expr` referencing `Expr` through alternatives)
//! stays legal.

use crate::analysis::{AndMeaning, GrammarBuilder};
use crate::ast::{NtId, SyntaxExpr, SyntaxExprKind};
use crate::analysis::SymDeclRef;
use syntagma_base::{Result, SynError};

struct RecursionWalk {
    on_path: Vec<bool>,
    path: Vec<NtId>,
    /// Path length at the innermost loop entry; nonterminals below
    /// this index are behind a loop boundary.
    loop_boundary: usize,
}

impl GrammarBuilder<'_, '_> {
    pub(crate) fn verify_recursion(&mut self) -> Result<()> {
        self.begin_verify_recursion();

        let mut walk = RecursionWalk {
            on_path: vec![false; self.grammar.nonterminals.len()],
            path: Vec::new(),
            loop_boundary: 0,
        };
        for nt in &self.grammar.nonterminals {
            self.recursion_visit_nt(&mut walk, nt.index)?;
        }

        self.end_verify_recursion();
        Ok(())
    }

    fn recursion_visit_nt(&self, walk: &mut RecursionWalk, nt: NtId) -> Result<()> {
        if !walk.on_path[nt.index()] {
            walk.on_path[nt.index()] = true;
            walk.path.push(nt);
            self.recursion_visit_expr(walk, self.grammar.nt(nt).expr)?;
            walk.path.pop();
            walk.on_path[nt.index()] = false;
            return Ok(());
        }

        let position = walk
            .path
            .iter()
            .position(|&p| p == nt)
            .expect("illegal state: marked nonterminal missing from the path");
        if position < walk.loop_boundary {
            let mut message = String::from("Recursion through loop:");
            for step in &walk.path {
                message.push(' ');
                message.push_str(self.name_str(self.grammar.nt(*step).name.sym));
            }
            message.push(' ');
            message.push_str(self.name_str(self.grammar.nt(nt).name.sym));
            return Err(SynError::at(message, self.grammar.nt(nt).name));
        }
        Ok(())
    }

    fn recursion_visit_expr(&self, walk: &mut RecursionWalk, expr: &SyntaxExpr<'_>) -> Result<()> {
        match &expr.kind {
            SyntaxExprKind::Or { alternatives } => {
                for alternative in *alternatives {
                    self.recursion_visit_expr(walk, alternative)?;
                }
            }
            SyntaxExprKind::And { and_id, .. } => {
                // Only a `this=` result forwards a value out of an AND.
                if let AndMeaning::This { result_elements, .. } = self.and_meaning(*and_id) {
                    for id in result_elements {
                        self.recursion_visit_expr(walk, self.grammar.expr(*id))?;
                    }
                }
            }
            SyntaxExprKind::This { expr: inner, .. } => {
                self.recursion_visit_expr(walk, inner)?;
            }
            SyntaxExprKind::NameRef { .. } => {
                if let Some(SymDeclRef::Nonterminal(nt)) = self.expr_slot(expr.id).resolved {
                    self.recursion_visit_nt(walk, nt)?;
                }
            }
            SyntaxExprKind::ZeroOne { expr: inner } => {
                self.recursion_visit_expr(walk, inner)?;
            }
            SyntaxExprKind::ZeroMany { body } | SyntaxExprKind::OneMany { body } => {
                let outer_boundary = walk.loop_boundary;
                walk.loop_boundary = walk.path.len();
                self.recursion_visit_expr(walk, body.expr)?;
                walk.loop_boundary = outer_boundary;
            }
            SyntaxExprKind::Empty
            | SyntaxExprKind::Attribute { .. }
            | SyntaxExprKind::StrLiteral { .. }
            | SyntaxExprKind::Cast { .. }
            | SyntaxExprKind::Const { .. } => {}
        }
        Ok(())
    }
}
