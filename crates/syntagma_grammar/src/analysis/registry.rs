//! Name and type registry.
//!
//! Three namespaces share one pool of user-visible identifiers:
//! grammar symbols (terminals and nonterminals), types, and type
//! declarations. Registration cross-checks all of them, so a name can
//! never be both a symbol and a type.

use crate::analysis::{GrammarBuilder, SymDeclRef};
use crate::ast::{NonterminalDecl, NtId, TerminalDecl, TypeDecl, CustomTokenTypeDecl};
use crate::types::{TypeId, TypeKind};
use rustc_hash::{FxHashMap, FxHashSet};
use syntagma_base::{Result, SourceString, Symbol, SynError};

/// Maps from identifiers to declarations and types.
pub struct Registry {
    nt_map: FxHashMap<Symbol, NtId>,
    tr_map: FxHashMap<Symbol, crate::ast::TrId>,
    type_map: FxHashMap<Symbol, TypeId>,
    primitive_type_map: FxHashMap<Symbol, TypeId>,
    /// Names of `type` declarations, kept only for duplicate checks.
    type_decl_names: FxHashSet<Symbol>,
    /// Type of string-literal tokens; the void type until a
    /// custom-token-type declaration binds it.
    pub string_literal_type: TypeId,
    string_literal_type_specified: bool,
}

impl Registry {
    pub fn new(void_type: TypeId) -> Self {
        Registry {
            nt_map: FxHashMap::default(),
            tr_map: FxHashMap::default(),
            type_map: FxHashMap::default(),
            primitive_type_map: FxHashMap::default(),
            type_decl_names: FxHashSet::default(),
            string_literal_type: void_type,
            string_literal_type_specified: false,
        }
    }
}

impl GrammarBuilder<'_, '_> {
    fn check_symbol_duplication(&self, name: SourceString) -> Result<()> {
        if self.registry.nt_map.contains_key(&name.sym) {
            return Err(SynError::at(
                format!(
                    "Duplicate name '{}' (a nonterminal with the same name exists)",
                    self.name_str(name.sym)
                ),
                name,
            ));
        }
        if self.registry.tr_map.contains_key(&name.sym) {
            return Err(SynError::at(
                format!(
                    "Duplicate name '{}' (a terminal with the same name exists)",
                    self.name_str(name.sym)
                ),
                name,
            ));
        }
        Ok(())
    }

    fn check_type_duplication(&self, name: SourceString) -> Result<()> {
        if self.registry.type_map.contains_key(&name.sym)
            || self.registry.type_decl_names.contains(&name.sym)
        {
            return Err(SynError::at(
                format!(
                    "Duplicate name '{}' (a type with the same name exists)",
                    self.name_str(name.sym)
                ),
                name,
            ));
        }
        Ok(())
    }

    /// Fetches or creates the user primitive type for a `{T}` token
    /// annotation.
    fn register_implicit_primitive_type(&mut self, name: SourceString) -> Result<TypeId> {
        if let Some(&existing) = self.registry.primitive_type_map.get(&name.sym) {
            return Ok(existing);
        }

        if self.registry.nt_map.contains_key(&name.sym)
            || self.registry.tr_map.contains_key(&name.sym)
        {
            return Err(SynError::at(
                format!(
                    "Name '{}' denotes a grammar symbol and cannot be used as a token type",
                    self.name_str(name.sym)
                ),
                name,
            ));
        }

        let ty = self.types.add(TypeKind::Primitive {
            name: name.sym,
            system: false,
        });
        self.primitive_types.push(ty);
        self.registry.primitive_type_map.insert(name.sym, ty);
        self.registry.type_map.insert(name.sym, ty);
        Ok(ty)
    }

    pub(crate) fn register_nt_declaration(&mut self, nt: &NonterminalDecl<'_>) -> Result<()> {
        self.check_symbol_duplication(nt.name)?;
        self.check_type_duplication(nt.name)?;
        self.registry.nt_map.insert(nt.name.sym, nt.index);
        Ok(())
    }

    pub(crate) fn register_tr_declaration(&mut self, tr: &TerminalDecl) -> Result<()> {
        self.check_symbol_duplication(tr.name)?;
        self.check_type_duplication(tr.name)?;
        self.registry.tr_map.insert(tr.name.sym, tr.index);

        if let Some(raw_type) = tr.raw_type {
            let ty = self.register_implicit_primitive_type(raw_type)?;
            self.tr_types[tr.index.index()] = Some(ty);
        }
        Ok(())
    }

    /// A `type NAME;` declaration reserves the name in the type
    /// namespace. The concrete kind is decided by use: a token
    /// annotation makes it a primitive, a class position makes it an
    /// implicit class.
    pub(crate) fn register_type_declaration(&mut self, decl: &TypeDecl) -> Result<()> {
        self.check_symbol_duplication(decl.name)?;
        if self.registry.type_decl_names.contains(&decl.name.sym)
            || self.registry.type_map.contains_key(&decl.name.sym)
        {
            return Err(SynError::at(
                format!(
                    "Duplicate name '{}' (a type with the same name exists)",
                    self.name_str(decl.name.sym)
                ),
                decl.name,
            ));
        }
        self.registry.type_decl_names.insert(decl.name.sym);
        Ok(())
    }

    pub(crate) fn register_custom_token_type_declaration(
        &mut self,
        decl: &CustomTokenTypeDecl,
    ) -> Result<()> {
        if self.registry.string_literal_type_specified {
            return Err(SynError::at(
                "Custom token type has already been specified",
                decl.raw_type,
            ));
        }
        let ty = self.register_implicit_primitive_type(decl.raw_type)?;
        self.registry.string_literal_type = ty;
        self.registry.string_literal_type_specified = true;
        Ok(())
    }

    /// Resolves a name used as a grammar symbol.
    pub(crate) fn resolve_symbol_name(&self, name: SourceString) -> Result<SymDeclRef> {
        if let Some(&nt) = self.registry.nt_map.get(&name.sym) {
            return Ok(SymDeclRef::Nonterminal(nt));
        }
        if let Some(&tr) = self.registry.tr_map.get(&name.sym) {
            return Ok(SymDeclRef::Terminal(tr));
        }
        if self.registry.type_map.contains_key(&name.sym)
            || self.registry.type_decl_names.contains(&name.sym)
        {
            return Err(SynError::at(
                format!(
                    "Name '{}' denotes a type, not a grammar symbol",
                    self.name_str(name.sym)
                ),
                name,
            ));
        }
        Err(SynError::at(
            format!("Name '{}' is undefined", self.name_str(name.sym)),
            name,
        ))
    }

    /// Fetches or lazily creates the implicit class type of a
    /// nonterminal.
    pub(crate) fn create_nt_class_type(&mut self, nt: NtId) -> TypeId {
        if let Some(existing) = self.nt_slots[nt.index()].class_type {
            return existing;
        }
        let ty = self.types.add(TypeKind::NtClass(nt));
        self.nt_slots[nt.index()].class_type = Some(ty);
        ty
    }

    /// Resolves a name used as a type: an existing type, an implicit
    /// nonterminal class type, or an implicit bare class type.
    pub(crate) fn resolve_type_name(&mut self, name: SourceString) -> Result<TypeId> {
        if let Some(&existing) = self.registry.type_map.get(&name.sym) {
            return Ok(existing);
        }

        if let Some(&nt) = self.registry.nt_map.get(&name.sym) {
            let ty = self.create_nt_class_type(nt);
            self.registry.type_map.insert(name.sym, ty);
            return Ok(ty);
        }

        if self.registry.tr_map.contains_key(&name.sym) {
            return Err(SynError::at(
                format!(
                    "Name '{}' denotes a token and cannot be used as a type",
                    self.name_str(name.sym)
                ),
                name,
            ));
        }

        let ty = self.types.add(TypeKind::NameClass(name.sym));
        self.registry.type_map.insert(name.sym, ty);
        Ok(ty)
    }
}
