//! Name registration and reference resolution.

use crate::analysis::GrammarBuilder;
use crate::ast::{Declaration, SyntaxExpr, SyntaxExprKind};
use syntagma_base::{Result, SynError};

impl GrammarBuilder<'_, '_> {
    /// Registers every declaration with the registry, in declaration
    /// order.
    pub(crate) fn register_names(&mut self) -> Result<()> {
        self.begin_register_names();

        for decl in &self.grammar.declarations {
            match decl {
                Declaration::Type(decl) => self.register_type_declaration(decl)?,
                Declaration::Terminal(tr) => self.register_tr_declaration(tr)?,
                Declaration::Nonterminal(nt) => self.register_nt_declaration(nt)?,
                Declaration::CustomTokenType(decl) => {
                    self.register_custom_token_type_declaration(decl)?
                }
            }
        }

        self.end_register_names();
        Ok(())
    }

    /// Resolves every name reference, cast type and explicit type in
    /// every nonterminal body.
    pub(crate) fn resolve_name_references(&mut self) -> Result<()> {
        self.begin_resolve_name_references();

        for nt in &self.grammar.nonterminals {
            if let Some(raw_type) = nt.explicit_raw_type {
                let ty = self.resolve_type_name(raw_type)?;
                self.nt_slots[nt.index.index()].explicit_type = Some(ty);
            }
            self.resolve_expr_references(nt.expr)?;
        }

        self.end_resolve_name_references();
        Ok(())
    }

    fn resolve_expr_references(&mut self, expr: &SyntaxExpr<'_>) -> Result<()> {
        match &expr.kind {
            SyntaxExprKind::NameRef { name } => {
                let resolved = self.resolve_symbol_name(*name)?;
                self.expr_slots[expr.id.index()].resolved = Some(resolved);
            }
            SyntaxExprKind::Cast { raw_type, expr: sub } => {
                let ty = self.resolve_type_name(*raw_type)?;
                self.expr_slots[expr.id.index()].cast_type = Some(ty);
                self.resolve_expr_references(sub)?;
            }
            SyntaxExprKind::And {
                elements, raw_type, ..
            } => {
                if let Some(raw_type) = raw_type {
                    let ty = self.resolve_type_name(*raw_type)?;
                    if !self.types.is_class(ty) {
                        return Err(SynError::at(
                            format!(
                                "'{}' is not a class type, it cannot be used as a production type",
                                self.name_str(raw_type.sym)
                            ),
                            *raw_type,
                        ));
                    }
                    self.expr_slots[expr.id.index()].and_type = Some(ty);
                }
                for element in *elements {
                    self.resolve_expr_references(element)?;
                }
            }
            SyntaxExprKind::Or { alternatives } => {
                for alternative in *alternatives {
                    self.resolve_expr_references(alternative)?;
                }
            }
            SyntaxExprKind::Attribute { expr: sub, .. }
            | SyntaxExprKind::This { expr: sub, .. }
            | SyntaxExprKind::ZeroOne { expr: sub } => self.resolve_expr_references(sub)?,
            SyntaxExprKind::ZeroMany { body } | SyntaxExprKind::OneMany { body } => {
                self.resolve_expr_references(body.expr)?;
                if let Some(separator) = body.separator {
                    self.resolve_expr_references(separator)?;
                }
            }
            SyntaxExprKind::Empty
            | SyntaxExprKind::StrLiteral { .. }
            | SyntaxExprKind::Const { .. } => {}
        }
        Ok(())
    }
}
