//! Symbols and lexical scopes (spec.md §3: `Symbol`, `Scope`, `ModuleInfo`,
//! `World`).

use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::{FunDecl, Program};
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Var,
    Func,
    Module,
    Type,
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub ty: Type,
    /// Node id of the declaring AST node (`0` for synthetic/built-in
    /// symbols that have no source declaration).
    pub declaring_node: u32,
    /// Set only for `SymbolKind::Module` symbols: the FQN it refers to.
    pub module_ref: Option<String>,
    pub is_public: bool,
}

/// Insertion-order name -> symbol mapping with a parent pointer (spec.md
/// §3). `IndexMap` gives us the required insertion-order iteration without
/// hand-rolling it.
#[derive(Debug, Clone)]
pub struct Scope {
    symbols: IndexMap<String, Symbol>,
    parent: Option<Rc<Scope>>,
}

impl Scope {
    pub fn root() -> Self {
        Scope { symbols: IndexMap::new(), parent: None }
    }

    pub fn child(parent: Rc<Scope>) -> Self {
        Scope { symbols: IndexMap::new(), parent: Some(parent) }
    }

    pub fn define(&mut self, symbol: Symbol) {
        self.symbols.insert(symbol.name.clone(), symbol);
    }

    /// Looks up a name in this scope, then walks the parent chain.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        if let Some(sym) = self.symbols.get(name) {
            return Some(sym);
        }
        self.parent.as_ref().and_then(|p| p.lookup(name))
    }

    /// Looks up a name defined directly in this scope (no parent walk).
    pub fn lookup_local(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }
}

/// One module's static facts: its fully-qualified name, its parsed AST, and
/// its top-level scope (populated by the checker's declaration phase).
pub struct ModuleInfo {
    pub fqn: String,
    pub program: Program,
    pub top_level_scope: Scope,
}

impl ModuleInfo {
    pub fn find_function(&self, name: &str) -> Option<&FunDecl> {
        self.program.functions.iter().find(|f| f.name == name)
    }
}

/// The collection of all modules participating in one compilation, plus
/// which one is the entry point.
pub struct World {
    pub modules: IndexMap<String, ModuleInfo>,
    pub entry: String,
}

impl World {
    pub fn new(entry: impl Into<String>) -> Self {
        World { modules: IndexMap::new(), entry: entry.into() }
    }

    pub fn insert(&mut self, module: ModuleInfo) {
        self.modules.insert(module.fqn.clone(), module);
    }

    pub fn get(&self, fqn: &str) -> Option<&ModuleInfo> {
        self.modules.get(fqn)
    }

    pub fn entry_module(&self) -> Option<&ModuleInfo> {
        self.modules.get(&self.entry)
    }
}
