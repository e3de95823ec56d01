//! Semantic types of grammar values.
//!
//! A value produced by an expression is void, a primitive, a class, or
//! an array. Primitive types are unique per name (the three synthetic
//! ones `const_int`, `const_bool`, `const_str` are always
//! pre-registered), class types are unique per nonterminal or per bare
//! name, and array types are created per loop expression, so equality
//! falls back to structure only for arrays.

use crate::ast::{Grammar, NtId};
use syntagma_base::{Interner, Symbol};

/// Dense type id into a [`TypeStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(pub u32);

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Coarse category used to validate alternatives and casts before the
/// concrete-type pass runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneralType {
    Void,
    Primitive,
    Array,
    Class,
}

impl GeneralType {
    pub fn describe(self) -> &'static str {
        match self {
            GeneralType::Void => "void",
            GeneralType::Primitive => "primitive",
            GeneralType::Array => "array",
            GeneralType::Class => "class",
        }
    }
}

/// One type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Void,
    Primitive { name: Symbol, system: bool },
    /// Implicit class of a class nonterminal.
    NtClass(NtId),
    /// Class referenced by bare name (`{Name}` with no declaration).
    NameClass(Symbol),
    Array(TypeId),
}

/// Owner of every type created during a build.
pub struct TypeStore {
    types: Vec<TypeKind>,
    void: TypeId,
    const_int: TypeId,
    const_bool: TypeId,
    const_str: TypeId,
}

impl TypeStore {
    pub fn new(interner: &mut Interner) -> Self {
        let mut store = TypeStore {
            types: Vec::new(),
            void: TypeId(0),
            const_int: TypeId(0),
            const_bool: TypeId(0),
            const_str: TypeId(0),
        };
        store.void = store.add(TypeKind::Void);
        store.const_int = store.add(TypeKind::Primitive {
            name: interner.intern("const_int"),
            system: true,
        });
        store.const_bool = store.add(TypeKind::Primitive {
            name: interner.intern("const_bool"),
            system: true,
        });
        store.const_str = store.add(TypeKind::Primitive {
            name: interner.intern("const_str"),
            system: true,
        });
        store
    }

    pub fn add(&mut self, kind: TypeKind) -> TypeId {
        let id = TypeId(self.types.len() as u32);
        self.types.push(kind);
        id
    }

    pub fn kind(&self, id: TypeId) -> TypeKind {
        self.types[id.index()]
    }

    pub fn void_type(&self) -> TypeId {
        self.void
    }

    pub fn const_int_type(&self) -> TypeId {
        self.const_int
    }

    pub fn const_bool_type(&self) -> TypeId {
        self.const_bool
    }

    pub fn const_str_type(&self) -> TypeId {
        self.const_str
    }

    pub fn is_void(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::Void)
    }

    pub fn is_class(&self, id: TypeId) -> bool {
        matches!(self.kind(id), TypeKind::NtClass(_) | TypeKind::NameClass(_))
    }

    /// Structural equality. Everything except arrays is unique by id;
    /// arrays compare element-wise.
    pub fn equal(&self, a: TypeId, b: TypeId) -> bool {
        if a == b {
            return true;
        }
        match (self.kind(a), self.kind(b)) {
            (TypeKind::Array(ea), TypeKind::Array(eb)) => self.equal(ea, eb),
            _ => false,
        }
    }

    /// Name of a class type, for diagnostics and code generation.
    pub fn class_name(&self, id: TypeId, grammar: &Grammar<'_>) -> Symbol {
        match self.kind(id) {
            TypeKind::NtClass(nt) => grammar.nt(nt).name.sym,
            TypeKind::NameClass(name) => name,
            _ => panic!("illegal state: class name of a non-class type"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_primitives_are_preregistered() {
        let mut interner = Interner::new();
        let store = TypeStore::new(&mut interner);
        assert!(matches!(
            store.kind(store.const_int_type()),
            TypeKind::Primitive { system: true, .. }
        ));
        assert!(store.is_void(store.void_type()));
    }

    #[test]
    fn array_equality_is_structural() {
        let mut interner = Interner::new();
        let mut store = TypeStore::new(&mut interner);
        let name = interner.intern("int");
        let int = store.add(TypeKind::Primitive { name, system: false });
        let a = store.add(TypeKind::Array(int));
        let b = store.add(TypeKind::Array(int));
        assert_ne!(a, b);
        assert!(store.equal(a, b));
        assert!(!store.equal(a, int));
    }

    #[test]
    fn distinct_name_classes_are_unequal() {
        let mut interner = Interner::new();
        let mut store = TypeStore::new(&mut interner);
        let a = store.add(TypeKind::NameClass(interner.intern("A")));
        let b = store.add(TypeKind::NameClass(interner.intern("B")));
        assert!(!store.equal(a, b));
        assert!(store.is_class(a));
    }
}
