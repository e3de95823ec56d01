//! Grammar analysis passes.
//!
//! [`GrammarBuilder`] owns everything the passes compute: the type
//! store, the name registry, and the per-node result slots keyed by
//! the dense ids the loader assigned. The passes run in a fixed order,
//! each a hard prerequisite of the next:
//!
//! 1. `register_names` - declarations into the registry
//! 2. `resolve_name_references` - names in expressions to declarations
//!    and types
//! 3. `verify_attributes` - AND meanings and conversions
//! 4. `calculate_is_void` - void propagation
//! 5. `verify_recursion` - loop recursion check
//! 6. `calculate_general_types` - coarse type categories
//! 7. `calculate_types` - concrete types with expected-type context
//!
//! The pass bodies live in sibling modules, one file per pass, all of
//! them `impl GrammarBuilder` blocks.

mod attributes;
mod concrete;
mod general;
mod names;
mod property;
mod recursion;
mod registry;
mod voidness;

pub use registry::Registry;

use crate::ast::{AndId, ExprId, Grammar, NtId, TrId};
use crate::convert::conversion::Conversion;
use crate::types::{GeneralType, TypeId, TypeStore};
use syntagma_base::{Interner, Result};

/// Which declaration a name reference resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymDeclRef {
    Terminal(TrId),
    Nonterminal(NtId),
}

/// Analysis results for one nonterminal declaration.
#[derive(Debug, Default)]
pub struct NtSlots {
    /// Resolved `{T}` annotation of the declaration.
    pub explicit_type: Option<TypeId>,
    /// Lazily created implicit class type of a class nonterminal.
    pub class_type: Option<TypeId>,
    pub is_void: Option<bool>,
    pub general_type: Option<GeneralType>,
    pub concrete_type: Option<TypeId>,
    /// Cycle-break flag used by the property engine's root phase.
    pub visiting: bool,
}

/// Analysis results for one syntax expression.
#[derive(Debug, Default)]
pub struct ExprSlots {
    /// Resolution of a name reference.
    pub resolved: Option<SymDeclRef>,
    /// Resolved target type of a cast.
    pub cast_type: Option<TypeId>,
    /// Resolved explicit class type of an AND expression.
    pub and_type: Option<TypeId>,
    pub is_void: Option<bool>,
    pub general_type: Option<GeneralType>,
    /// Concrete type; stays `None` when genuinely undefined.
    pub concrete_type: Option<TypeId>,
    /// Type pushed down from the context.
    pub expected_type: Option<TypeId>,
    /// Attribute scope scratch: does the subtree contain `this=`?
    pub and_result: bool,
    /// Attribute scope scratch: unconsumed attribute elements below.
    pub and_attributes: Vec<ExprId>,
    /// How the converter lowers this expression.
    pub conversion: Option<Conversion>,
}

/// Classification of an AND expression.
#[derive(Debug, Clone)]
pub enum AndMeaning {
    /// Produces nothing.
    Void { non_result: Vec<ExprId> },
    /// Produces the value of its `this=` element(s).
    This {
        non_result: Vec<ExprId>,
        result_elements: Vec<ExprId>,
    },
    /// Produces an object of a class built from attribute fields.
    Class {
        non_result: Vec<ExprId>,
        has_attributes: bool,
    },
}

impl AndMeaning {
    /// Sub-expressions that do not feed the AND's own result value
    /// (attribute elements), visited separately by the deep phase of
    /// the property engine.
    pub fn non_result(&self) -> &[ExprId] {
        match self {
            AndMeaning::Void { non_result }
            | AndMeaning::This { non_result, .. }
            | AndMeaning::Class { non_result, .. } => non_result,
        }
    }
}

/// Owner of all analysis state for one generator run.
pub struct GrammarBuilder<'a, 'i> {
    pub grammar: &'a Grammar<'a>,
    pub interner: &'i Interner,
    pub types: TypeStore,
    pub registry: Registry,
    pub nt_slots: Vec<NtSlots>,
    pub expr_slots: Vec<ExprSlots>,
    pub and_meanings: Vec<Option<AndMeaning>>,
    /// Terminal value types by [`TrId`], filled during registration.
    pub tr_types: Vec<Option<TypeId>>,
    /// Primitive types in registration order (synthetic ones first).
    pub primitive_types: Vec<TypeId>,
    /// Number of part-class tags handed out so far.
    pub part_class_count: u32,
    verbose: bool,

    register_names_completed: bool,
    resolve_name_references_completed: bool,
    verify_attributes_completed: bool,
    calculate_is_void_completed: bool,
    verify_recursion_completed: bool,
    calculate_general_types_completed: bool,
    calculate_types_completed: bool,
}

impl<'a, 'i> GrammarBuilder<'a, 'i> {
    /// Creates a builder with empty slots; `types` must come from
    /// [`TypeStore::new`] so the synthetic primitives exist.
    pub fn new(
        grammar: &'a Grammar<'a>,
        interner: &'i Interner,
        types: TypeStore,
        verbose: bool,
    ) -> Self {
        let primitive_types = vec![
            types.const_int_type(),
            types.const_bool_type(),
            types.const_str_type(),
        ];
        let registry = Registry::new(types.void_type());
        GrammarBuilder {
            interner,
            registry,
            nt_slots: (0..grammar.nonterminals.len()).map(|_| NtSlots::default()).collect(),
            expr_slots: (0..grammar.exprs.len()).map(|_| ExprSlots::default()).collect(),
            and_meanings: (0..grammar.and_count).map(|_| None).collect(),
            tr_types: vec![None; grammar.terminals.len()],
            primitive_types,
            part_class_count: 0,
            verbose,
            grammar,
            types,
            register_names_completed: false,
            resolve_name_references_completed: false,
            verify_attributes_completed: false,
            calculate_is_void_completed: false,
            verify_recursion_completed: false,
            calculate_general_types_completed: false,
            calculate_types_completed: false,
        }
    }

    pub fn nt_slot(&self, nt: NtId) -> &NtSlots {
        &self.nt_slots[nt.index()]
    }

    pub fn expr_slot(&self, expr: ExprId) -> &ExprSlots {
        &self.expr_slots[expr.index()]
    }

    pub fn and_meaning(&self, and_id: AndId) -> &AndMeaning {
        self.and_meanings[and_id.index()]
            .as_ref()
            .expect("illegal state: AND expression without a meaning")
    }

    pub(crate) fn name_str(&self, sym: syntagma_base::Symbol) -> &str {
        self.interner.resolve(sym)
    }

    /// Runs all analysis passes in order.
    pub fn build(&mut self) -> Result<()> {
        self.register_names()?;
        self.resolve_name_references()?;
        self.verify_attributes()?;
        self.calculate_is_void()?;
        self.verify_recursion()?;
        self.calculate_general_types()?;
        self.calculate_types()?;
        Ok(())
    }

    pub(crate) fn assert_pass_order(&self, prerequisite_done: bool, this_done: bool) {
        assert!(prerequisite_done, "illegal state: pass run out of order");
        assert!(!this_done, "illegal state: pass run twice");
    }

    // Completion flag plumbing, one pair per pass file.

    pub(crate) fn begin_register_names(&self) {
        self.assert_pass_order(true, self.register_names_completed);
    }

    pub(crate) fn end_register_names(&mut self) {
        self.register_names_completed = true;
    }

    pub(crate) fn begin_resolve_name_references(&self) {
        self.assert_pass_order(
            self.register_names_completed,
            self.resolve_name_references_completed,
        );
    }

    pub(crate) fn end_resolve_name_references(&mut self) {
        self.resolve_name_references_completed = true;
    }

    pub(crate) fn begin_verify_attributes(&self) {
        self.assert_pass_order(
            self.resolve_name_references_completed,
            self.verify_attributes_completed,
        );
    }

    pub(crate) fn end_verify_attributes(&mut self) {
        self.verify_attributes_completed = true;
    }

    pub(crate) fn begin_calculate_is_void(&self) {
        self.assert_pass_order(
            self.verify_attributes_completed,
            self.calculate_is_void_completed,
        );
    }

    pub(crate) fn end_calculate_is_void(&mut self) {
        self.calculate_is_void_completed = true;
        if self.verbose {
            println!("*** VOID ***\n");
            for nt in &self.grammar.nonterminals {
                let is_void = self.nt_slot(nt.index).is_void.unwrap_or(false);
                println!("is_void {} {}", self.name_str(nt.name.sym), is_void);
            }
            println!();
        }
    }

    pub(crate) fn begin_verify_recursion(&self) {
        self.assert_pass_order(
            self.calculate_is_void_completed,
            self.verify_recursion_completed,
        );
    }

    pub(crate) fn end_verify_recursion(&mut self) {
        self.verify_recursion_completed = true;
    }

    pub(crate) fn begin_calculate_general_types(&self) {
        self.assert_pass_order(
            self.verify_recursion_completed,
            self.calculate_general_types_completed,
        );
    }

    pub(crate) fn end_calculate_general_types(&mut self) {
        self.calculate_general_types_completed = true;
        if self.verbose {
            println!("*** GENERAL TYPES ***\n");
            for nt in &self.grammar.nonterminals {
                let general = self.nt_slot(nt.index).general_type.unwrap_or(GeneralType::Void);
                println!(
                    "general_type {} {}",
                    self.name_str(nt.name.sym),
                    general.describe()
                );
            }
            println!();
        }
    }

    pub(crate) fn begin_calculate_types(&self) {
        self.assert_pass_order(
            self.calculate_general_types_completed,
            self.calculate_types_completed,
        );
    }

    pub(crate) fn end_calculate_types(&mut self) {
        self.calculate_types_completed = true;
        if self.verbose {
            println!("*** TYPES ***\n");
            for nt in &self.grammar.nonterminals {
                let described = match self.nt_slot(nt.index).concrete_type {
                    Some(ty) => self.describe_type(ty),
                    None => "?".to_string(),
                };
                println!("type {} {}", self.name_str(nt.name.sym), described);
            }
            println!();
        }
    }

    /// Human-readable type rendering for verbose dumps.
    pub fn describe_type(&self, ty: TypeId) -> String {
        match self.types.kind(ty) {
            crate::types::TypeKind::Void => "void".to_string(),
            crate::types::TypeKind::Primitive { name, .. } => self.name_str(name).to_string(),
            crate::types::TypeKind::NtClass(nt) => {
                format!("class {}", self.name_str(self.grammar.nt(nt).name.sym))
            }
            crate::types::TypeKind::NameClass(name) => {
                format!("class {}", self.name_str(name))
            }
            crate::types::TypeKind::Array(element) => {
                format!("list<{}>", self.describe_type(element))
            }
        }
    }
}
