//! Semantic actions.
//!
//! An action is the program a production executes when it is reduced:
//! how the generated parser reconstructs user data from the elements
//! of the reduced span. Actions are created through [`ActionFactory`],
//! which re-checks the element arity and types the lowering rules
//! guarantee.

use crate::convert::descriptor::{RunTypeId, TypeTable};

/// Field of a class-building action: `(element offset, attribute
/// name)`.
pub type AttributeField = (usize, String);

/// Field taken from a part-class element: `(element offset, part-class
/// type)`.
pub type PartClassField = (usize, RunTypeId);

/// Field layout of a class or part-class action.
#[derive(Debug, Clone, Default)]
pub struct ActionFields {
    pub attributes: Vec<AttributeField>,
    pub part_classes: Vec<PartClassField>,
    /// At most one element contributing a whole nested class object.
    pub nested_class: Option<usize>,
}

/// Rendered constant payload carried by a `Const` action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstPayload {
    Integer(i64),
    Str(String),
    Bool(bool),
    /// Pretty-printed native expression, emitted verbatim.
    Native(String),
}

/// The semantic program of one production.
#[derive(Debug, Clone)]
pub enum Action {
    /// Produce nothing.
    Void,
    /// Return the value of the single element.
    Copy { ty: RunTypeId },
    /// Return the single element upcast to another class.
    Cast { to: RunTypeId, from: RunTypeId },
    /// Allocate an object of `class` and fill its fields.
    Class { class: RunTypeId, fields: ActionFields },
    /// Like `Class`, but producing an intermediate part-class.
    PartClass { part: RunTypeId, fields: ActionFields },
    /// Return the value of the element at `index`.
    ResultAnd { ty: RunTypeId, index: usize },
    /// Start a list from the single element.
    FirstList { list: RunTypeId },
    /// Append the last element to the list in element 0.
    NextList { list: RunTypeId, has_separator: bool },
    /// Return a constant.
    Const { ty: RunTypeId, value: ConstPayload },
}

impl Action {
    pub fn result_type(&self, types: &TypeTable) -> RunTypeId {
        match self {
            Action::Void => types.void_type(),
            Action::Copy { ty } => *ty,
            Action::Cast { to, .. } => *to,
            Action::Class { class, .. } => *class,
            Action::PartClass { part, .. } => *part,
            Action::ResultAnd { ty, .. } => *ty,
            Action::FirstList { list } => *list,
            Action::NextList { list, .. } => *list,
            Action::Const { ty, .. } => *ty,
        }
    }
}

/// Deferred action construction: the converter decides the factory
/// while collecting production elements, and the factory validates the
/// finished element row.
#[derive(Debug)]
pub enum ActionFactory {
    Void,
    Copy,
    Cast { to: RunTypeId },
    Class { class: RunTypeId, fields: ActionFields },
    PartClass { part: RunTypeId, fields: ActionFields },
    ResultAnd { index: usize },
    FirstList { list: RunTypeId },
    NextList { list: RunTypeId, has_separator: bool },
    Const { ty: RunTypeId, value: ConstPayload },
}

impl ActionFactory {
    /// Builds the action, asserting the arity invariants of each
    /// action kind against the element types of the production.
    pub fn create(self, types: &TypeTable, element_types: &[RunTypeId]) -> Action {
        match self {
            ActionFactory::Void => Action::Void,
            ActionFactory::Copy => {
                assert_eq!(element_types.len(), 1, "illegal state: copy arity");
                let ty = element_types[0];
                assert!(!types.is_void(ty), "illegal state: copy of a void value");
                Action::Copy { ty }
            }
            ActionFactory::Cast { to } => {
                assert_eq!(element_types.len(), 1, "illegal state: cast arity");
                let from = element_types[0];
                assert!(!types.is_void(from), "illegal state: cast of a void value");
                Action::Cast { to, from }
            }
            ActionFactory::Class { class, fields } => Action::Class { class, fields },
            ActionFactory::PartClass { part, fields } => Action::PartClass { part, fields },
            ActionFactory::ResultAnd { index } => {
                assert!(index < element_types.len(), "illegal state: result index range");
                let ty = element_types[index];
                assert!(!types.is_void(ty), "illegal state: void result element");
                Action::ResultAnd { ty, index }
            }
            ActionFactory::FirstList { list } => {
                assert_eq!(element_types.len(), 1, "illegal state: first-list arity");
                Action::FirstList { list }
            }
            ActionFactory::NextList { list, has_separator } => {
                let expected = if has_separator { 3 } else { 2 };
                assert_eq!(element_types.len(), expected, "illegal state: next-list arity");
                assert!(
                    types.equal(element_types[0], list),
                    "illegal state: next-list head type"
                );
                Action::NextList { list, has_separator }
            }
            ActionFactory::Const { ty, value } => {
                assert!(element_types.is_empty(), "illegal state: const arity");
                assert!(!types.is_void(ty), "illegal state: void constant");
                Action::Const { ty, value }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::descriptor::RunType;

    fn table_with_int() -> (TypeTable, RunTypeId) {
        let mut types = TypeTable::new();
        let int = types.add(RunType::Primitive {
            name: "int".into(),
            system: false,
        });
        (types, int)
    }

    #[test]
    fn copy_takes_one_nonvoid_element() {
        let (types, int) = table_with_int();
        let action = ActionFactory::Copy.create(&types, &[int]);
        assert!(matches!(action, Action::Copy { .. }));
        assert_eq!(action.result_type(&types), int);
    }

    #[test]
    #[should_panic(expected = "copy arity")]
    fn copy_rejects_two_elements() {
        let (types, int) = table_with_int();
        ActionFactory::Copy.create(&types, &[int, int]);
    }

    #[test]
    fn next_list_arity_depends_on_separator() {
        let (mut types, int) = table_with_int();
        let list = types.add(RunType::List { element: int });
        let void = types.void_type();

        let without = ActionFactory::NextList {
            list,
            has_separator: false,
        }
        .create(&types, &[list, int]);
        assert!(matches!(without, Action::NextList { has_separator: false, .. }));

        let with = ActionFactory::NextList {
            list,
            has_separator: true,
        }
        .create(&types, &[list, void, int]);
        assert!(matches!(with, Action::NextList { has_separator: true, .. }));
    }

    #[test]
    fn result_and_picks_the_indexed_element() {
        let (mut types, int) = table_with_int();
        let void = types.void_type();
        let str_ty = types.add(RunType::Primitive {
            name: "str".into(),
            system: false,
        });
        let action = ActionFactory::ResultAnd { index: 2 }.create(&types, &[void, int, str_ty]);
        assert_eq!(action.result_type(&types), str_ty);
    }

    #[test]
    fn const_requires_an_empty_production() {
        let (types, _) = table_with_int();
        let mut table = types;
        let ty = table.add(RunType::Primitive {
            name: "const_int".into(),
            system: true,
        });
        let action = ActionFactory::Const {
            ty,
            value: ConstPayload::Integer(7),
        }
        .create(&table, &[]);
        assert!(matches!(action, Action::Const { value: ConstPayload::Integer(7), .. }));
    }
}
