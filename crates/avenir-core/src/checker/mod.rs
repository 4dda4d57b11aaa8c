//! The type checker (spec.md §4.1): a two-phase walk over a [`World`] that
//! produces [`Bindings`] plus a batch of [`Diagnostic`]s.

mod assign;
mod calls;
mod constexpr;
mod decl;
mod expr;
mod interfaces;
mod operators;
mod resolve;
mod stmt;

pub use assign::assignable;
pub use calls::CallCheckResult;

use std::rc::Rc;

use ahash::AHashMap;

use crate::ast::{Position, TypeExpr, TypeExprKind};
use crate::bindings::Bindings;
use crate::diagnostics::{CheckError, Diagnostic};
use crate::environment::BuiltinRegistry;
use crate::symbol::{Scope, World};
use crate::types::{FuncSig, InterfaceType, StructType, Type};

/// Checker-local state threaded through every sub-module. Lives for the
/// duration of one `check_world` call.
pub struct Checker<'a> {
    pub world: &'a World,
    pub builtins: &'a dyn BuiltinRegistry,
    pub structs: AHashMap<String, StructType>,
    pub interfaces: AHashMap<String, InterfaceType>,
    /// Top-level function signatures, keyed by `"{module}/{name}"` - kept
    /// separately from the module scope's `Symbol` table because a `Symbol`
    /// only carries a `Type::Func`, not parameter names/defaults, and call
    /// checking needs the names/defaults to bind named arguments.
    pub funcs: AHashMap<String, FuncSig>,
    pub module_scopes: AHashMap<String, Rc<Scope>>,
    pub bindings: Bindings,
    pub diagnostics: CheckError,
}

/// Per-function-body checking context: the current module (for FQN
/// qualification and interface visibility), the expected return type, and
/// the loop-nesting depth (`break`/`continue` validity - spec.md §7 lists
/// `break` outside a loop as a diagnostic category).
///
/// `scope` is the current (innermost) block scope; its `parent` chain walks
/// out through enclosing blocks to the function's own locals, then to an
/// enclosing closure's locals (for nested `FuncLit`s), and finally to the
/// declaring module's top-level scope. The checker only needs this chain to
/// decide whether a name resolves and what it resolves to - actual upvalue
/// capture is the resolver's job, not the checker's.
pub struct FnCtx {
    pub module: String,
    pub return_type: Type,
    pub loop_depth: u32,
    pub scope: Scope,
}

impl<'a> Checker<'a> {
    pub fn error(&mut self, pos: Position, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::error(pos, message));
    }

    pub fn struct_fqn(&self, module: &str, name: &str) -> String {
        format!("{module}/{name}")
    }

    /// Finds a struct by simple name, preferring the given module, falling
    /// back to a scan of every module's struct table (for unqualified
    /// references resolved through an import alias, which the call site
    /// has already turned into an FQN-qualified lookup when needed).
    pub fn find_struct(&self, fqn_or_name: &str) -> Option<&StructType> {
        if let Some(s) = self.structs.get(fqn_or_name) {
            return Some(s);
        }
        self.structs.values().find(|s| s.name == fqn_or_name)
    }

    pub fn find_interface(&self, fqn_or_name: &str) -> Option<&InterfaceType> {
        if let Some(i) = self.interfaces.get(fqn_or_name) {
            return Some(i);
        }
        self.interfaces.values().find(|i| i.name == fqn_or_name)
    }

    /// Resolves a surface type annotation into a [`Type`], looking up
    /// `Named` references against the declaring module's struct/interface
    /// tables (falling back to any module, then producing `Invalid` plus a
    /// diagnostic for a genuinely unknown name).
    pub fn resolve_type_expr(&mut self, module: &str, te: &TypeExpr) -> Type {
        match &te.kind {
            TypeExprKind::Int => Type::Int,
            TypeExprKind::Float => Type::Float,
            TypeExprKind::String => Type::String,
            TypeExprKind::Bool => Type::Bool,
            TypeExprKind::Void => Type::Void,
            TypeExprKind::Any => Type::Any,
            TypeExprKind::Error => Type::Error,
            TypeExprKind::Bytes => Type::Bytes,
            TypeExprKind::Optional(inner) => {
                Type::optional(self.resolve_type_expr(module, inner))
            }
            TypeExprKind::Dict(v) => Type::dict(self.resolve_type_expr(module, v)),
            TypeExprKind::List(e) => Type::list_of([self.resolve_type_expr(module, e)]),
            TypeExprKind::Union(vs) => {
                Type::union(vs.iter().map(|v| self.resolve_type_expr(module, v)))
            }
            TypeExprKind::Func(params, ret) => {
                let ps = params.iter().map(|p| self.resolve_type_expr(module, p)).collect();
                let r = self.resolve_type_expr(module, ret);
                Type::Func(ps, Box::new(r))
            }
            TypeExprKind::Named(name) => {
                let fqn = self.struct_fqn(module, name);
                if self.structs.contains_key(&fqn) {
                    Type::Struct(fqn)
                } else if self.interfaces.contains_key(&fqn) {
                    Type::Interface(fqn)
                } else if let Some(s) = self.structs.values().find(|s| &s.name == name) {
                    Type::Struct(self.struct_fqn(&s.module, name))
                } else if let Some(i) = self.interfaces.values().find(|i| &i.name == name) {
                    Type::Interface(self.struct_fqn(&i.defining_module, name))
                } else {
                    self.error(te.pos, format!("unknown type `{name}`"));
                    Type::Invalid
                }
            }
        }
    }
}

/// Runs the full two-phase check over `world` and returns the resulting
/// `Bindings` (always returned, even on failure - spec.md: "always attempts
/// maximum coverage") plus any accumulated diagnostics.
pub fn check_world(world: &World, builtins: &dyn BuiltinRegistry) -> (Bindings, CheckError) {
    let mut checker = Checker {
        world,
        builtins,
        structs: AHashMap::new(),
        interfaces: AHashMap::new(),
        funcs: AHashMap::new(),
        module_scopes: AHashMap::new(),
        bindings: Bindings::new(),
        diagnostics: CheckError::default(),
    };
    decl::declare_phase(&mut checker);
    resolve::resolve_phase(&mut checker);
    (checker.bindings, checker.diagnostics)
}
