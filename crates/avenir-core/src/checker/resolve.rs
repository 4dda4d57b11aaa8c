//! Phase 2 - Resolution (spec.md §4.1): imports become `Module` symbols,
//! then every function and method body is type-checked.

use std::rc::Rc;

use crate::ast::FunDecl;
use crate::symbol::{Scope, Symbol, SymbolKind};
use crate::types::Type;

use super::{stmt, Checker, FnCtx};

pub fn resolve_phase(checker: &mut Checker<'_>) {
    let module_names: Vec<String> = checker.world.modules.keys().cloned().collect();

    for fqn in &module_names {
        add_import_symbols(checker, fqn);
    }

    for fqn in &module_names {
        check_module_functions(checker, fqn);
        check_module_methods(checker, fqn);
    }
}

fn add_import_symbols(checker: &mut Checker<'_>, module_fqn: &str) {
    let module = checker.world.get(module_fqn).expect("module must exist");
    let mut scope = (*checker.module_scopes.get(module_fqn).expect("declared in phase 1")).clone();

    for imp in &module.program.imports {
        let target_fqn = imp.fqn();
        if checker.world.get(&target_fqn).is_none() {
            checker.error(imp.pos, format!("unknown module `{target_fqn}`"));
            continue;
        }
        scope.define(Symbol {
            name: imp.bound_name().to_string(),
            kind: SymbolKind::Module,
            // Module symbols are never used as a value type directly; `Invalid`
            // suppresses any accidental downstream type check.
            ty: Type::Invalid,
            declaring_node: 0,
            module_ref: Some(target_fqn),
            is_public: false,
        });
    }

    checker.module_scopes.insert(module_fqn.to_string(), Rc::new(scope));
}

fn check_module_functions(checker: &mut Checker<'_>, module_fqn: &str) {
    let module = checker.world.get(module_fqn).expect("module must exist");
    let functions: Vec<FunDecl> = module.program.functions.clone();
    let module_scope = checker.module_scopes.get(module_fqn).expect("declared in phase 1").clone();

    for fun in &functions {
        let mut ctx = new_fn_ctx(checker, module_fqn, &module_scope, fun, None);
        stmt::check_block(checker, &mut ctx, &fun.body);
    }
}

fn check_module_methods(checker: &mut Checker<'_>, module_fqn: &str) {
    let module = checker.world.get(module_fqn).expect("module must exist");
    let structs = module.program.structs.clone();
    let module_scope = checker.module_scopes.get(module_fqn).expect("declared in phase 1").clone();

    for sd in &structs {
        let struct_fqn = checker.struct_fqn(module_fqn, &sd.name);
        for m in &sd.methods {
            let receiver = if m.is_static { None } else { Some((m.receiver_name.as_str(), struct_fqn.as_str())) };
            let mut ctx = new_fn_ctx(checker, module_fqn, &module_scope, &m.fun, receiver);
            stmt::check_block(checker, &mut ctx, &m.fun.body);
        }
    }
}

fn new_fn_ctx(
    checker: &mut Checker<'_>,
    module_fqn: &str,
    module_scope: &Rc<Scope>,
    fun: &FunDecl,
    receiver: Option<(&str, &str)>,
) -> FnCtx {
    let mut scope = Scope::child(module_scope.clone());

    if let Some((receiver_name, struct_fqn)) = receiver {
        scope.define(Symbol {
            name: receiver_name.to_string(),
            kind: SymbolKind::Var,
            ty: Type::Struct(struct_fqn.to_string()),
            declaring_node: fun.id.0,
            module_ref: None,
            is_public: false,
        });
    }

    for p in &fun.params {
        let ty = checker.resolve_type_expr(module_fqn, &p.type_expr);
        scope.define(Symbol {
            name: p.name.clone(),
            kind: SymbolKind::Var,
            ty,
            declaring_node: fun.id.0,
            module_ref: None,
            is_public: false,
        });
    }

    let return_type = checker.resolve_type_expr(module_fqn, &fun.return_type);
    FnCtx { module: module_fqn.to_string(), return_type, loop_depth: 0, scope }
}
