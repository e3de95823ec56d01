//! Attribute verification and conversion assignment.
//!
//! For every AND expression this pass decides its meaning (void, a
//! `this=` result, or a synthesized class) and installs a conversion
//! on every expression it walks. Attribute scopes form a chain so that
//! a name bound anywhere in an enclosing AND conflicts with the same
//! name bound below, while parallel OR branches may reuse names.
//!
//! Part-class tags are allocated here: a nested AND carrying more than
//! one attribute becomes a distinct part-class contributing its fields
//! to the main AND's class.

use crate::analysis::{AndMeaning, GrammarBuilder};
use crate::ast::{ExprId, Grammar, SyntaxExpr, SyntaxExprKind};
use crate::convert::conversion::{AndFields, ComplexKind, Conversion, PartClassTag};
use syntagma_base::{FilePos, Result, SourceString, SynError};

/// Role an expression plays inside its enclosing AND: what kind of
/// value its lowering must produce.
#[derive(Debug, Clone)]
enum AndRole {
    Void,
    This,
    /// Single attribute element; the role carries it.
    Attribute(ExprId),
    PartClass(PartClassTag),
    Class,
}

impl AndRole {
    fn complex_kind(&self, main: ExprId) -> ComplexKind {
        match self {
            AndRole::This => ComplexKind::ThisAnd { main },
            AndRole::Attribute(attr) => ComplexKind::AttrAnd { attr: *attr },
            AndRole::PartClass(tag) => ComplexKind::PartClassAnd { main, tag: *tag },
            AndRole::Class => ComplexKind::ClassAnd { main },
            AndRole::Void => panic!("illegal state: complex conversion in a void role"),
        }
    }

    fn attribute_conversion(&self, main: ExprId) -> Conversion {
        match self {
            AndRole::Attribute(_) => Conversion::AttrAttribute,
            AndRole::PartClass(tag) => Conversion::PartClassAttribute { main, tag: *tag },
            AndRole::Class => Conversion::ClassAttribute { main },
            AndRole::Void | AndRole::This => {
                panic!("illegal state: attribute conversion in a void or this role")
            }
        }
    }

    fn builder(&self, main: ExprId) -> AndConvBuilder {
        match self {
            AndRole::Void => AndConvBuilder::Void,
            AndRole::This => AndConvBuilder::This {
                main,
                result_index: None,
            },
            AndRole::Attribute(attr) => AndConvBuilder::Attribute {
                attr: *attr,
                result_index: None,
            },
            AndRole::Class => AndConvBuilder::Class {
                main,
                fields: AndFields::default(),
            },
            AndRole::PartClass(tag) => AndConvBuilder::PartClass {
                main,
                tag: *tag,
                fields: AndFields::default(),
            },
        }
    }
}

/// Collects element roles into the conversion of one AND expression.
enum AndConvBuilder {
    Void,
    This {
        main: ExprId,
        result_index: Option<usize>,
    },
    Attribute {
        attr: ExprId,
        result_index: Option<usize>,
    },
    Class {
        main: ExprId,
        fields: AndFields,
    },
    PartClass {
        main: ExprId,
        tag: PartClassTag,
        fields: AndFields,
    },
}

impl AndConvBuilder {
    fn add(&mut self, grammar: &Grammar<'_>, sub_role: &AndRole, index: usize) {
        match sub_role {
            AndRole::Void => {}
            AndRole::This => match self {
                AndConvBuilder::This { result_index, .. } => {
                    assert!(result_index.is_none(), "illegal state: two result elements");
                    *result_index = Some(index);
                }
                _ => panic!("illegal state: result element outside a this-AND"),
            },
            AndRole::Attribute(attr) => match self {
                AndConvBuilder::Attribute { result_index, .. } => {
                    assert!(result_index.is_none(), "illegal state: two attribute results");
                    *result_index = Some(index);
                }
                AndConvBuilder::Class { fields, .. }
                | AndConvBuilder::PartClass { fields, .. } => {
                    assert!(fields.nested_class.is_none(), "illegal state: field after class");
                    let name = match &grammar.expr(*attr).kind {
                        SyntaxExprKind::Attribute { name, .. } => name.sym,
                        _ => panic!("illegal state: attribute role without an attribute"),
                    };
                    fields.attributes.push((index, name));
                }
                _ => panic!("illegal state: attribute element outside a class role"),
            },
            AndRole::PartClass(tag) => match self {
                AndConvBuilder::Class { fields, .. }
                | AndConvBuilder::PartClass { fields, .. } => {
                    assert!(fields.nested_class.is_none(), "illegal state: field after class");
                    fields.part_classes.push((index, *tag));
                }
                _ => panic!("illegal state: part-class element outside a class role"),
            },
            AndRole::Class => match self {
                AndConvBuilder::Class { fields, .. }
                | AndConvBuilder::PartClass { fields, .. } => {
                    assert!(
                        fields.nested_class.is_none()
                            && fields.attributes.is_empty()
                            && fields.part_classes.is_empty(),
                        "illegal state: class element beside other fields"
                    );
                    fields.nested_class = Some(index);
                }
                _ => panic!("illegal state: class element outside a class role"),
            },
        }
    }

    fn build(self) -> Conversion {
        match self {
            AndConvBuilder::Void => Conversion::VoidAnd,
            AndConvBuilder::This { main, result_index } => Conversion::ThisAnd {
                result_index: result_index.expect("illegal state: this-AND without a result"),
                main,
            },
            AndConvBuilder::Attribute { attr, result_index } => match result_index {
                Some(result_index) => Conversion::AttributeAnd { result_index, attr },
                // The attribute may live in a sibling OR branch while
                // this branch contributes nothing.
                None => Conversion::VoidAnd,
            },
            AndConvBuilder::Class { main, fields } => Conversion::ClassAnd { main, fields },
            AndConvBuilder::PartClass { main, tag, fields } => {
                Conversion::PartClassAnd { main, tag, fields }
            }
        }
    }
}

/// Attribute scopes, stored flat and linked by parent indices so that
/// conflict checks can walk the chain.
#[derive(Default)]
struct ScopeStack {
    scopes: Vec<ScopeData>,
}

#[derive(Default)]
struct ScopeData {
    parent: Option<usize>,
    attributes: Vec<SourceString>,
    result_elements: Vec<ExprId>,
    non_result: Vec<ExprId>,
}

impl ScopeStack {
    fn push(&mut self, parent: Option<usize>) -> usize {
        self.scopes.push(ScopeData {
            parent,
            ..ScopeData::default()
        });
        self.scopes.len() - 1
    }

    /// Moves everything collected in `src` into `dst`.
    fn absorb(&mut self, dst: usize, src: usize) {
        let attributes = std::mem::take(&mut self.scopes[src].attributes);
        let result_elements = std::mem::take(&mut self.scopes[src].result_elements);
        let non_result = std::mem::take(&mut self.scopes[src].non_result);
        let dst = &mut self.scopes[dst];
        dst.attributes.extend(attributes);
        dst.result_elements.extend(result_elements);
        dst.non_result.extend(non_result);
    }

    fn chain_has_attribute(&self, scope: usize, name: SourceString) -> bool {
        let mut current = Some(scope);
        while let Some(index) = current {
            if self.scopes[index].attributes.iter().any(|a| a.sym == name.sym) {
                return true;
            }
            current = self.scopes[index].parent;
        }
        false
    }

    fn chain_has_result(&self, scope: usize) -> bool {
        let mut current = Some(scope);
        while let Some(index) = current {
            if !self.scopes[index].result_elements.is_empty() {
                return true;
            }
            current = self.scopes[index].parent;
        }
        false
    }
}

impl<'a> GrammarBuilder<'a, '_> {
    /// Classifies every AND expression and assigns conversions.
    pub(crate) fn verify_attributes(&mut self) -> Result<()> {
        self.begin_verify_attributes();

        for nt in &self.grammar.nonterminals {
            self.verify_top(nt.expr, nt.name.pos)?;
        }

        self.end_verify_attributes();
        Ok(())
    }

    fn set_conversion(&mut self, expr: &SyntaxExpr<'a>, conversion: Conversion) {
        self.expr_slots[expr.id.index()].conversion = Some(conversion);
    }

    /// Verifies an expression whose value becomes the result of its
    /// context (a nonterminal body, an attribute binding, a loop
    /// element).
    fn verify_top(&mut self, expr: &'a SyntaxExpr<'a>, pos: FilePos) -> Result<()> {
        match &expr.kind {
            SyntaxExprKind::Empty => self.set_conversion(expr, Conversion::Empty),
            SyntaxExprKind::Or { alternatives } => {
                for alternative in *alternatives {
                    self.verify_top(alternative, pos)?;
                }
                self.set_conversion(expr, Conversion::Or(ComplexKind::Top));
            }
            SyntaxExprKind::And { and_id, .. } => {
                self.process_top_and(expr, *and_id, pos)?;
            }
            SyntaxExprKind::Attribute { expr: inner, .. } => {
                self.verify_top(inner, pos)?;
                self.set_conversion(expr, Conversion::TopAttribute);
            }
            SyntaxExprKind::This { expr: inner, .. } => {
                self.verify_top(inner, pos)?;
                self.set_conversion(expr, Conversion::This);
            }
            SyntaxExprKind::NameRef { .. } => {
                self.set_conversion(expr, Conversion::Name { dead: false })
            }
            SyntaxExprKind::StrLiteral { .. } => {
                self.set_conversion(expr, Conversion::Str { dead: false })
            }
            SyntaxExprKind::Cast { expr: inner, .. } => {
                self.verify_top(inner, pos)?;
                self.set_conversion(expr, Conversion::Cast);
            }
            SyntaxExprKind::ZeroOne { expr: inner } => {
                self.verify_top(inner, pos)?;
                self.set_conversion(expr, Conversion::ZeroOne(ComplexKind::Top));
            }
            SyntaxExprKind::ZeroMany { body } => {
                self.verify_top(body.expr, pos)?;
                if let Some(separator) = body.separator {
                    // Separators are always dead.
                    self.verify_dead(separator, pos)?;
                }
                self.set_conversion(expr, Conversion::ZeroMany { dead: false });
            }
            SyntaxExprKind::OneMany { body } => {
                self.verify_top(body.expr, pos)?;
                if let Some(separator) = body.separator {
                    self.verify_dead(separator, pos)?;
                }
                self.set_conversion(expr, Conversion::OneMany { dead: false });
            }
            SyntaxExprKind::Const { .. } => self.set_conversion(expr, Conversion::Const),
        }
        Ok(())
    }

    /// Verifies an expression whose value is discarded. Attributes,
    /// `this`, casts and constants make no sense here.
    fn verify_dead(&mut self, expr: &'a SyntaxExpr<'a>, pos: FilePos) -> Result<()> {
        match &expr.kind {
            SyntaxExprKind::Empty => self.set_conversion(expr, Conversion::Empty),
            SyntaxExprKind::Or { alternatives } => {
                for alternative in *alternatives {
                    self.verify_dead(alternative, pos)?;
                }
                self.set_conversion(expr, Conversion::Or(ComplexKind::Dead));
            }
            SyntaxExprKind::And {
                and_id,
                elements,
                raw_type,
            } => {
                if raw_type.is_some() {
                    return Err(SynError::new(
                        "Dead AND expression cannot have an explicit type",
                        pos,
                    ));
                }
                for element in *elements {
                    self.verify_dead(element, pos)?;
                }
                self.set_conversion(expr, Conversion::VoidAnd);
                // Dead ANDs are never the result of anything; give
                // them a void meaning so later walks stay total.
                self.and_meanings[and_id.index()] =
                    Some(AndMeaning::Void { non_result: Vec::new() });
            }
            SyntaxExprKind::Attribute { name, .. } => {
                return Err(SynError::at(
                    format!(
                        "Attribute '{}' is used in a dead expression",
                        self.name_str(name.sym)
                    ),
                    *name,
                ));
            }
            SyntaxExprKind::This { pos: this_pos, .. } => {
                return Err(SynError::new("'this' is used in a dead expression", *this_pos));
            }
            SyntaxExprKind::NameRef { .. } => {
                self.set_conversion(expr, Conversion::Name { dead: true })
            }
            SyntaxExprKind::StrLiteral { .. } => {
                self.set_conversion(expr, Conversion::Str { dead: true })
            }
            SyntaxExprKind::Cast { .. } => {
                return Err(SynError::new("Cast is used in a dead expression", pos));
            }
            SyntaxExprKind::ZeroOne { expr: inner } => {
                self.verify_dead(inner, pos)?;
                self.set_conversion(expr, Conversion::ZeroOne(ComplexKind::Dead));
            }
            SyntaxExprKind::ZeroMany { body } => {
                self.verify_dead(body.expr, pos)?;
                if let Some(separator) = body.separator {
                    self.verify_dead(separator, pos)?;
                }
                self.set_conversion(expr, Conversion::ZeroMany { dead: true });
            }
            SyntaxExprKind::OneMany { body } => {
                self.verify_dead(body.expr, pos)?;
                if let Some(separator) = body.separator {
                    self.verify_dead(separator, pos)?;
                }
                self.set_conversion(expr, Conversion::OneMany { dead: true });
            }
            SyntaxExprKind::Const { .. } => {
                return Err(SynError::new("Constant is used in a dead expression", pos));
            }
        }
        Ok(())
    }

    /// Handles one top-level AND: collects subtree attributes, decides
    /// the role, processes elements, and fixes the meaning.
    fn process_top_and(
        &mut self,
        expr: &'a SyntaxExpr<'a>,
        and_id: crate::ast::AndId,
        pos: FilePos,
    ) -> Result<()> {
        self.init_subtree_attributes(expr)?;

        let slot = self.expr_slot(expr.id);
        let has_type = slot.and_type.is_some();
        let role = if slot.and_result {
            if has_type {
                return Err(SynError::new(
                    "AND expression has both 'this' and the class type specified",
                    pos,
                ));
            }
            AndRole::This
        } else if !slot.and_attributes.is_empty() || has_type {
            AndRole::Class
        } else {
            AndRole::Void
        };

        let mut scopes = ScopeStack::default();
        let root = scopes.push(None);
        self.process_and_expression(expr.id, &mut scopes, root, &role, expr, pos)?;

        let data = &scopes.scopes[root];
        let meaning = if !data.result_elements.is_empty() {
            AndMeaning::This {
                non_result: data.non_result.clone(),
                result_elements: data.result_elements.clone(),
            }
        } else if has_type || !data.attributes.is_empty() {
            AndMeaning::Class {
                non_result: data.non_result.clone(),
                has_attributes: !data.attributes.is_empty(),
            }
        } else {
            AndMeaning::Void {
                non_result: data.non_result.clone(),
            }
        };
        self.and_meanings[and_id.index()] = Some(meaning);

        self.clear_subtree_attributes(expr);
        Ok(())
    }

    fn process_and_expression(
        &mut self,
        main: ExprId,
        scopes: &mut ScopeStack,
        scope: usize,
        role: &AndRole,
        and_expr: &'a SyntaxExpr<'a>,
        pos: FilePos,
    ) -> Result<()> {
        let elements = match &and_expr.kind {
            SyntaxExprKind::And { elements, .. } => *elements,
            _ => panic!("illegal state: AND processing of a non-AND"),
        };

        let elements_with_attributes = elements
            .iter()
            .filter(|element| !self.expr_slot(element.id).and_attributes.is_empty())
            .count();

        let mut conv_builder = role.builder(main);
        for (index, element) in elements.iter().enumerate() {
            let sub_role =
                self.process_and_sub(main, scopes, scope, role, element, elements_with_attributes, pos)?;
            conv_builder.add(self.grammar, &sub_role, index);
        }

        self.expr_slots[and_expr.id.index()].conversion = Some(conv_builder.build());
        Ok(())
    }

    fn process_and_sub(
        &mut self,
        main: ExprId,
        scopes: &mut ScopeStack,
        scope: usize,
        role: &AndRole,
        sub: &'a SyntaxExpr<'a>,
        elements_with_attributes: usize,
        pos: FilePos,
    ) -> Result<AndRole> {
        let slot = self.expr_slot(sub.id);
        if slot.and_result {
            let sub_role = AndRole::This;
            self.verify_and(main, sub, scopes, scope, &sub_role, pos)?;
            return Ok(sub_role);
        }

        let attributes = slot.and_attributes.clone();
        if attributes.is_empty() {
            self.verify_dead(sub, pos)?;
            return Ok(AndRole::Void);
        }

        let sub_role = if attributes.len() == 1 {
            AndRole::Attribute(attributes[0])
        } else if elements_with_attributes == 1 {
            // The only element with attributes produces the same value
            // as the whole expression.
            assert!(
                matches!(role, AndRole::Class | AndRole::PartClass(_)),
                "illegal state: shared role is not class-like"
            );
            role.clone()
        } else {
            let tag = PartClassTag(self.part_class_count);
            self.part_class_count += 1;
            AndRole::PartClass(tag)
        };

        self.verify_and(main, sub, scopes, scope, &sub_role, pos)?;
        Ok(sub_role)
    }

    /// Verifies an expression living inside an AND, in the given role.
    fn verify_and(
        &mut self,
        main: ExprId,
        expr: &'a SyntaxExpr<'a>,
        scopes: &mut ScopeStack,
        scope: usize,
        role: &AndRole,
        pos: FilePos,
    ) -> Result<()> {
        match &expr.kind {
            SyntaxExprKind::Or { alternatives } => {
                // Parallel branches may bind the same names; collect
                // them in a detached scope first.
                let compound = scopes.push(None);
                for alternative in *alternatives {
                    let slot = self.expr_slot(alternative.id);
                    if slot.and_result || !slot.and_attributes.is_empty() {
                        let sub_scope = scopes.push(Some(scope));
                        self.verify_and(main, alternative, scopes, sub_scope, role, pos)?;
                        scopes.absorb(compound, sub_scope);
                    } else {
                        self.verify_dead(alternative, pos)?;
                    }
                }
                scopes.absorb(scope, compound);
                self.set_conversion(expr, Conversion::Or(role.complex_kind(main)));
            }
            SyntaxExprKind::And { raw_type, .. } => {
                if raw_type.is_some() {
                    return Err(SynError::new(
                        "Nested AND expression cannot have an explicit type",
                        pos,
                    ));
                }
                let sub_scope = scopes.push(Some(scope));
                self.process_and_expression(main, scopes, sub_scope, role, expr, pos)?;
                scopes.absorb(scope, sub_scope);
            }
            SyntaxExprKind::Attribute { name, expr: inner } => {
                self.verify_top(inner, pos)?;

                if scopes.chain_has_attribute(scope, *name) {
                    return Err(SynError::at(
                        format!("Attribute name conflict: '{}'", self.name_str(name.sym)),
                        *name,
                    ));
                }
                scopes.scopes[scope].attributes.push(*name);
                scopes.scopes[scope].non_result.push(expr.id);

                self.set_conversion(expr, role.attribute_conversion(main));
            }
            SyntaxExprKind::This {
                pos: this_pos,
                expr: inner,
            } => {
                self.verify_top(inner, pos)?;

                if scopes.chain_has_result(scope) {
                    return Err(SynError::new("Result element conflict: 'this'", *this_pos));
                }
                scopes.scopes[scope].result_elements.push(expr.id);

                self.set_conversion(expr, Conversion::This);
            }
            SyntaxExprKind::ZeroOne { expr: inner } => {
                self.verify_and(main, inner, scopes, scope, role, pos)?;
                self.set_conversion(expr, Conversion::ZeroOne(role.complex_kind(main)));
            }
            _ => panic!("illegal state: unexpected expression inside an AND scope"),
        }
        Ok(())
    }

    /// Bottom-up collection of attribute elements and `this=` flags
    /// through a top-level AND's subtree, with conflict detection.
    fn init_subtree_attributes(&mut self, top: &'a SyntaxExpr<'a>) -> Result<()> {
        let mut has_attributes = false;
        let mut has_this = false;
        self.find_subtree_attributes(top, &mut has_attributes, &mut has_this)
    }

    fn find_subtree_attributes(
        &mut self,
        expr: &'a SyntaxExpr<'a>,
        has_attributes: &mut bool,
        has_this: &mut bool,
    ) -> Result<()> {
        match &expr.kind {
            SyntaxExprKind::Or { alternatives } => {
                self.find_compound_attributes(expr, alternatives, has_attributes, has_this)?;
            }
            SyntaxExprKind::And { elements, .. } => {
                self.find_compound_attributes(expr, elements, has_attributes, has_this)?;
            }
            SyntaxExprKind::Attribute { name, .. } => {
                if *has_this {
                    return Err(SynError::at(
                        format!(
                            "Attribute and 'this' conflict: '{}'",
                            self.name_str(name.sym)
                        ),
                        *name,
                    ));
                }
                *has_attributes = true;
                let slot = &mut self.expr_slots[expr.id.index()];
                slot.and_attributes = vec![expr.id];
                slot.and_result = false;
            }
            SyntaxExprKind::This { pos, .. } => {
                if *has_attributes {
                    return Err(SynError::new("Attribute and 'this' conflict", *pos));
                }
                *has_this = true;
                self.expr_slots[expr.id.index()].and_result = true;
            }
            SyntaxExprKind::ZeroOne { expr: inner } => {
                self.find_subtree_attributes(inner, has_attributes, has_this)?;
                let attributes = self.expr_slot(inner.id).and_attributes.clone();
                let result = self.expr_slot(inner.id).and_result;
                let slot = &mut self.expr_slots[expr.id.index()];
                slot.and_attributes = attributes;
                slot.and_result = result;
            }
            _ => {
                self.expr_slots[expr.id.index()].and_result = false;
            }
        }
        Ok(())
    }

    fn find_compound_attributes(
        &mut self,
        expr: &'a SyntaxExpr<'a>,
        subs: &'a [&'a SyntaxExpr<'a>],
        has_attributes: &mut bool,
        has_this: &mut bool,
    ) -> Result<()> {
        let mut attributes = Vec::new();
        let mut result = false;
        for sub in subs {
            self.find_subtree_attributes(sub, has_attributes, has_this)?;
            attributes.extend(self.expr_slot(sub.id).and_attributes.iter().copied());
            result = result || self.expr_slot(sub.id).and_result;
        }
        let slot = &mut self.expr_slots[expr.id.index()];
        slot.and_attributes = attributes;
        slot.and_result = result;
        Ok(())
    }

    /// Releases the scratch attribute lists once the AND is classified.
    fn clear_subtree_attributes(&mut self, expr: &'a SyntaxExpr<'a>) {
        match &expr.kind {
            SyntaxExprKind::Or { alternatives } => {
                for alternative in *alternatives {
                    self.clear_subtree_attributes(alternative);
                }
            }
            SyntaxExprKind::And { elements, .. } => {
                for element in *elements {
                    self.clear_subtree_attributes(element);
                }
            }
            SyntaxExprKind::ZeroOne { expr: inner } => self.clear_subtree_attributes(inner),
            _ => {}
        }
        self.expr_slots[expr.id.index()].and_attributes = Vec::new();
    }
}
