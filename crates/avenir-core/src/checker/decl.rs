//! Phase 1 - Declaration (spec.md §4.1).

use crate::symbol::{Scope, Symbol, SymbolKind};
use crate::types::{FuncSig, InterfaceMethod, InterfaceType, StructField, StructType, Type};

use super::Checker;

pub fn declare_phase(checker: &mut Checker<'_>) {
    // Struct/interface tables must exist before any module's functions (or
    // another module's structs) reference them by name, so declare every
    // struct/interface across the whole world before registering any
    // top-level function - types before values, even though spec.md folds
    // it into one phase.
    let module_names: Vec<String> = checker.world.modules.keys().cloned().collect();
    for fqn in &module_names {
        declare_structs_and_interfaces(checker, fqn);
    }
    for fqn in &module_names {
        declare_functions(checker, fqn);
    }
}

fn declare_structs_and_interfaces(checker: &mut Checker<'_>, module_fqn: &str) {
    let module = checker.world.get(module_fqn).expect("module must exist");

    for sd in &module.program.structs {
        let fqn = checker.struct_fqn(module_fqn, &sd.name);
        let mut fields = Vec::new();
        for f in &sd.fields {
            if fields.iter().any(|existing: &StructField| existing.name == f.name) {
                checker.error(f.pos, format!("duplicate field `{}` on struct `{}`", f.name, sd.name));
                continue;
            }
            let ty = checker.resolve_type_expr(module_fqn, &f.type_expr);
            if let Some(default) = &f.default {
                super::constexpr::check_constant(checker, module_fqn, default, &ty);
            }
            fields.push(StructField { name: f.name.clone(), ty, is_public: f.is_public, has_default: f.default.is_some() });
        }

        let mut instance_methods = indexmap::IndexMap::new();
        let mut static_methods = indexmap::IndexMap::new();
        for m in &sd.methods {
            let sig = build_func_sig(checker, module_fqn, &m.fun);
            let target = if m.is_static { &mut static_methods } else { &mut instance_methods };
            let other = if m.is_static { &instance_methods } else { &static_methods };
            if other.contains_key(&m.fun.name) {
                checker.error(
                    m.fun.pos,
                    format!(
                        "`{}` is declared as both an instance and a static method on `{}`",
                        m.fun.name, sd.name
                    ),
                );
                continue;
            }
            if target.contains_key(&m.fun.name) {
                checker.error(m.fun.pos, format!("duplicate method `{}` on struct `{}`", m.fun.name, sd.name));
                continue;
            }
            target.insert(m.fun.name.clone(), sig);
        }

        checker.structs.insert(
            fqn.clone(),
            StructType {
                name: sd.name.clone(),
                is_public: sd.is_public,
                is_mutable: sd.is_mutable,
                fields,
                instance_methods,
                static_methods,
                module: module_fqn.to_string(),
            },
        );
    }

    for id in &module.program.interfaces {
        let fqn = checker.struct_fqn(module_fqn, &id.name);
        let mut methods = Vec::new();
        for m in &id.methods {
            let param_types = m.params.iter().map(|p| checker.resolve_type_expr(module_fqn, p)).collect();
            let result = checker.resolve_type_expr(module_fqn, &m.result);
            methods.push(InterfaceMethod { name: m.name.clone(), param_types, result });
        }
        checker.interfaces.insert(
            fqn,
            InterfaceType { name: id.name.clone(), is_public: id.is_public, defining_module: module_fqn.to_string(), methods },
        );
    }
}

fn build_func_sig(checker: &mut Checker<'_>, module_fqn: &str, fun: &crate::ast::FunDecl) -> FuncSig {
    let mut param_names = Vec::new();
    let mut param_types = Vec::new();
    let mut param_defaults = Vec::new();
    for p in &fun.params {
        param_names.push(p.name.clone());
        let ty = checker.resolve_type_expr(module_fqn, &p.type_expr);
        if let Some(default) = &p.default {
            super::constexpr::check_constant(checker, module_fqn, default, &ty);
        }
        param_defaults.push(p.default.is_some());
        param_types.push(ty);
    }
    let result = checker.resolve_type_expr(module_fqn, &fun.return_type);
    FuncSig { param_names, param_types, param_defaults, result, is_public: fun.is_public }
}

fn declare_functions(checker: &mut Checker<'_>, module_fqn: &str) {
    let module = checker.world.get(module_fqn).expect("module must exist");
    let mut scope = Scope::root();

    for builtin in checker.builtins.free_functions() {
        scope.define(Symbol {
            name: builtin.name.clone(),
            kind: SymbolKind::Func,
            ty: Type::Func(builtin.param_types.clone(), Box::new(builtin.result_type.clone())),
            declaring_node: 0,
            module_ref: None,
            is_public: true,
        });
    }

    // Struct/interface type symbols, so `Foo.make()` resolves `Foo` to a
    // Type-kind symbol before `.make` is looked up as a static method.
    for sd in &module.program.structs {
        let fqn = checker.struct_fqn(module_fqn, &sd.name);
        scope.define(Symbol {
            name: sd.name.clone(),
            kind: SymbolKind::Type,
            ty: Type::Struct(fqn),
            declaring_node: 0,
            module_ref: None,
            is_public: sd.is_public,
        });
    }
    for id in &module.program.interfaces {
        let fqn = checker.struct_fqn(module_fqn, &id.name);
        scope.define(Symbol {
            name: id.name.clone(),
            kind: SymbolKind::Type,
            ty: Type::Interface(fqn),
            declaring_node: 0,
            module_ref: None,
            is_public: id.is_public,
        });
    }

    for fun in &module.program.functions {
        if scope.lookup_local(&fun.name).is_some() {
            checker.error(fun.pos, format!("duplicate top-level declaration `{}`", fun.name));
            continue;
        }
        let sig = build_func_sig(checker, module_fqn, fun);
        scope.define(Symbol {
            name: fun.name.clone(),
            kind: SymbolKind::Func,
            ty: Type::Func(sig.param_types.clone(), Box::new(sig.result.clone())),
            declaring_node: fun.id.0,
            module_ref: None,
            is_public: fun.is_public,
        });
        checker.funcs.insert(format!("{module_fqn}/{}", fun.name), sig);
    }

    checker.module_scopes.insert(module_fqn.to_string(), std::rc::Rc::new(scope));
}
