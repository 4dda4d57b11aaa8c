//! Expression type-checking (spec.md §4.1). Every arm records its computed
//! type into `Bindings.expr_types`; identifier and member-access arms also
//! record the resolved `Symbol`/`MemberTarget` the IR compiler re-derives.

use std::rc::Rc;

use crate::ast::{Argument, Expr, FunDecl, InterpPart, NodeId, Position};
use crate::bindings::MemberTarget;
use crate::symbol::{Scope, Symbol, SymbolKind};
use crate::types::Type;

use super::{Checker, FnCtx};

fn arg_expr(arg: &Argument) -> &Expr {
    match arg {
        Argument::Positional(e) => e,
        Argument::Named(n) => &n.value,
    }
}

pub fn check_expr(checker: &mut Checker<'_>, ctx: &mut FnCtx, expr: &Expr) -> Type {
    let ty = match expr {
        Expr::Ident { id, name, pos } => check_ident(checker, ctx, *id, name, *pos),
        Expr::IntLit { .. } => Type::Int,
        Expr::FloatLit { .. } => Type::Float,
        Expr::StringLit { .. } => Type::String,
        Expr::BoolLit { .. } => Type::Bool,
        Expr::NoneLit { .. } => Type::optional(Type::Invalid),
        Expr::SomeLit { inner, .. } => Type::optional(check_expr(checker, ctx, inner)),
        Expr::ListLit { items, .. } => {
            let elems: Vec<Type> = items.iter().map(|i| check_expr(checker, ctx, i)).collect();
            Type::list_of(elems)
        }
        Expr::DictLit { entries, .. } => {
            let values: Vec<Type> = entries.iter().map(|(_, v)| check_expr(checker, ctx, v)).collect();
            Type::dict(Type::union(values))
        }
        Expr::StructLit { id, name, fields, pos } => check_struct_lit(checker, ctx, *id, name, fields, *pos),
        Expr::Binary { op, lhs, rhs, pos, .. } => {
            let l = check_expr(checker, ctx, lhs);
            let r = check_expr(checker, ctx, rhs);
            super::operators::check_binary(checker, *pos, op, &l, &r)
        }
        Expr::Unary { op, operand, pos, .. } => {
            let o = check_expr(checker, ctx, operand);
            super::operators::check_unary(checker, *pos, op, &o)
        }
        Expr::Call { id, callee, args, pos } => check_call_expr(checker, ctx, *id, callee, args, *pos),
        Expr::MemberAccess { id, target, member, pos } => check_member_access(checker, ctx, *id, target, member, *pos),
        Expr::Index { target, key, pos, .. } => check_index(checker, ctx, target, key, *pos),
        Expr::FuncLit { decl, .. } => check_func_lit(checker, ctx, decl),
        Expr::StringInterp { parts, .. } => check_string_interp(checker, ctx, parts),
    };
    checker.bindings.record_type(expr.id(), ty.clone());
    ty
}

fn check_ident(checker: &mut Checker<'_>, ctx: &FnCtx, id: NodeId, name: &str, pos: Position) -> Type {
    match ctx.scope.lookup(name) {
        Some(sym) => {
            let sym = sym.clone();
            let ty = sym.ty.clone();
            checker.bindings.record_ident(id, sym);
            ty
        }
        None => {
            checker.error(pos, format!("unknown identifier `{name}`"));
            Type::Invalid
        }
    }
}

fn check_index(checker: &mut Checker<'_>, ctx: &mut FnCtx, target: &Expr, key: &Expr, pos: Position) -> Type {
    let target_ty = check_expr(checker, ctx, target);
    let key_ty = check_expr(checker, ctx, key);
    match &target_ty {
        Type::Invalid | Type::Any => Type::Invalid,
        Type::List(elems) => {
            if !matches!(key_ty, Type::Int | Type::Invalid) {
                checker.error(pos, format!("list index must be `int`, got `{key_ty}`"));
            }
            if elems.is_empty() {
                Type::Invalid
            } else {
                Type::union(elems.iter().cloned())
            }
        }
        Type::Dict(v) => {
            if !matches!(key_ty, Type::String | Type::Invalid) {
                checker.error(pos, format!("dict index must be `string`, got `{key_ty}`"));
            }
            (**v).clone()
        }
        _ => {
            checker.error(pos, format!("cannot index into `{target_ty}`"));
            Type::Invalid
        }
    }
}

fn check_struct_lit(
    checker: &mut Checker<'_>,
    ctx: &mut FnCtx,
    id: NodeId,
    name: &str,
    fields: &[(String, Expr)],
    pos: Position,
) -> Type {
    let local_fqn = checker.struct_fqn(&ctx.module.clone(), name);
    let st = match checker.structs.get(&local_fqn).cloned() {
        Some(st) => st,
        None => match checker.find_struct(name).cloned() {
            Some(st) => st,
            None => {
                checker.error(pos, format!("unknown struct `{name}`"));
                for (_, v) in fields {
                    check_expr(checker, ctx, v);
                }
                return Type::Invalid;
            }
        },
    };
    let result_fqn = checker.struct_fqn(&st.module.clone(), name);

    let mut seen = ahash::AHashSet::default();
    let mut provided: ahash::AHashMap<String, Type> = ahash::AHashMap::default();
    for (fname, fexpr) in fields {
        let fty = check_expr(checker, ctx, fexpr);
        if !seen.insert(fname.clone()) {
            checker.error(pos, format!("duplicate field `{fname}` in struct literal for `{name}`"));
            continue;
        }
        if st.field_index(fname).is_none() {
            checker.error(pos, format!("struct `{name}` has no field `{fname}`"));
            continue;
        }
        provided.insert(fname.clone(), fty);
    }
    for f in &st.fields {
        match provided.get(&f.name) {
            Some(fty) => {
                if !super::assign::assignable(checker, &f.ty, fty) {
                    checker.error(pos, format!("field `{}` expects `{}`, got `{fty}`", f.name, f.ty));
                }
            }
            None if !f.has_default => {
                checker.error(pos, format!("missing field `{}` in struct literal for `{name}`", f.name));
            }
            None => {}
        }
    }
    Type::Struct(result_fqn)
}

fn check_string_interp(checker: &mut Checker<'_>, ctx: &mut FnCtx, parts: &[InterpPart]) -> Type {
    for part in parts {
        if let InterpPart::Expr(e) = part {
            check_expr(checker, ctx, e);
        }
    }
    Type::String
}

fn check_func_lit(checker: &mut Checker<'_>, ctx: &mut FnCtx, decl: &FunDecl) -> Type {
    let module = ctx.module.clone();
    let param_types: Vec<Type> = decl.params.iter().map(|p| checker.resolve_type_expr(&module, &p.type_expr)).collect();
    let return_type = checker.resolve_type_expr(&module, &decl.return_type);

    let mut nested_scope = Scope::child(Rc::new(ctx.scope.clone()));
    for (p, ty) in decl.params.iter().zip(&param_types) {
        if let Some(default) = &p.default {
            super::constexpr::check_constant(checker, &module, default, ty);
        }
        nested_scope.define(Symbol {
            name: p.name.clone(),
            kind: SymbolKind::Var,
            ty: ty.clone(),
            declaring_node: decl.id.0,
            module_ref: None,
            is_public: false,
        });
    }
    let mut nested_ctx = FnCtx { module, return_type: return_type.clone(), loop_depth: 0, scope: nested_scope };
    super::stmt::check_block(checker, &mut nested_ctx, &decl.body);
    Type::Func(param_types, Box::new(return_type))
}

fn check_member_access(checker: &mut Checker<'_>, ctx: &mut FnCtx, id: NodeId, target: &Expr, member: &str, pos: Position) -> Type {
    if let Expr::Ident { name, id: tid, .. } = target {
        if let Some(sym) = ctx.scope.lookup(name).cloned() {
            match sym.kind {
                SymbolKind::Module => {
                    checker.bindings.record_ident(*tid, sym.clone());
                    let target_module = sym.module_ref.clone().unwrap_or_default();
                    let key = format!("{target_module}/{member}");
                    return match checker.funcs.get(&key).cloned() {
                        Some(sig) => {
                            if !sig.is_public {
                                checker.error(pos, format!("function `{member}` in module `{target_module}` is not public"));
                            }
                            checker.bindings.record_member(id, MemberTarget::ModuleMember { module: target_module, name: member.to_string() });
                            Type::Func(sig.param_types.clone(), Box::new(sig.result.clone()))
                        }
                        None => {
                            checker.error(pos, format!("module `{target_module}` has no function `{member}`"));
                            Type::Invalid
                        }
                    };
                }
                SymbolKind::Type => {
                    checker.bindings.record_ident(*tid, sym.clone());
                    checker.error(pos, "static methods cannot be referenced as a value; call them directly");
                    return Type::Invalid;
                }
                _ => {}
            }
        }
    }

    let target_ty = check_expr(checker, ctx, target);
    match &target_ty {
        Type::Invalid | Type::Any => Type::Invalid,
        Type::Struct(fqn) => match checker.structs.get(fqn).and_then(|st| st.field_index(member)).map(|idx| (fqn.clone(), idx)) {
            Some((struct_name, field_index)) => {
                let field_ty = checker.structs.get(&struct_name).unwrap().fields[field_index].ty.clone();
                checker.bindings.record_member(id, MemberTarget::Field { struct_name, field_index });
                field_ty
            }
            None => {
                checker.error(pos, format!("no field `{member}` on `{target_ty}`"));
                Type::Invalid
            }
        },
        _ => {
            checker.error(pos, "methods cannot be referenced as a value; call them directly");
            Type::Invalid
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn check_call_expr(checker: &mut Checker<'_>, ctx: &mut FnCtx, id: NodeId, callee: &Expr, args: &[Argument], pos: Position) -> Type {
    let arg_types: Vec<Type> = args.iter().map(|a| check_expr(checker, ctx, arg_expr(a))).collect();

    match callee {
        Expr::MemberAccess { id: maccess_id, target, member, pos: mpos } => {
            check_method_call_expr(checker, ctx, *maccess_id, target, member, *mpos, pos, args, &arg_types)
        }
        Expr::Ident { id: ident_id, name, pos: ipos } => check_free_call(checker, ctx, *ident_id, name, *ipos, pos, args, &arg_types),
        other => {
            let callee_ty = check_expr(checker, ctx, other);
            let _ = id;
            check_value_call(checker, pos, &callee_ty, args, &arg_types)
        }
    }
}

fn check_value_call(checker: &mut Checker<'_>, pos: Position, callee_ty: &Type, args: &[Argument], arg_types: &[Type]) -> Type {
    if matches!(callee_ty, Type::Invalid) {
        return Type::Invalid;
    }
    if matches!(callee_ty, Type::Any) {
        return Type::Any;
    }
    let Type::Func(param_types, ret) = callee_ty else {
        checker.error(pos, format!("`{callee_ty}` is not callable"));
        return Type::Invalid;
    };
    for a in args {
        if let Argument::Named(n) = a {
            checker.error(pos, format!("named argument `{}` not supported when calling a function value", n.name));
            return Type::Invalid;
        }
    }
    if args.len() != param_types.len() {
        checker.error(pos, format!("expected {} argument(s), got {}", param_types.len(), args.len()));
        return (**ret).clone();
    }
    for (expected, actual) in param_types.iter().zip(arg_types) {
        if !super::assign::assignable(checker, expected, actual) {
            checker.error(pos, format!("argument expects `{expected}`, got `{actual}`"));
        }
    }
    (**ret).clone()
}

fn check_free_call(
    checker: &mut Checker<'_>,
    ctx: &mut FnCtx,
    ident_id: NodeId,
    name: &str,
    ident_pos: Position,
    call_pos: Position,
    args: &[Argument],
    arg_types: &[Type],
) -> Type {
    let Some(sym) = ctx.scope.lookup(name).cloned() else {
        checker.error(ident_pos, format!("unknown identifier `{name}`"));
        return Type::Invalid;
    };
    checker.bindings.record_ident(ident_id, sym.clone());
    match sym.kind {
        SymbolKind::Func => {
            let key = format!("{}/{name}", ctx.module);
            if let Some(sig) = checker.funcs.get(&key).cloned() {
                super::calls::check_call(checker, call_pos, name, &sig.param_names, &sig.param_types, &sig.param_defaults, &sig.result, args, arg_types).result
            } else if let Some(desc) = checker.builtins.lookup_free(name) {
                let defaults = vec![false; desc.param_names.len()];
                super::calls::check_call(checker, call_pos, name, &desc.param_names, &desc.param_types, &defaults, &desc.result_type, args, arg_types).result
            } else {
                checker.error(ident_pos, format!("unknown function `{name}`"));
                Type::Invalid
            }
        }
        SymbolKind::Var => check_value_call(checker, call_pos, &sym.ty, args, arg_types),
        _ => {
            checker.error(ident_pos, format!("`{name}` is not callable"));
            Type::Invalid
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn check_method_call_expr(
    checker: &mut Checker<'_>,
    ctx: &mut FnCtx,
    maccess_id: NodeId,
    target: &Expr,
    member: &str,
    mpos: Position,
    call_pos: Position,
    args: &[Argument],
    arg_types: &[Type],
) -> Type {
    if let Expr::Ident { name, id: tid, .. } = target {
        if let Some(sym) = ctx.scope.lookup(name).cloned() {
            match sym.kind {
                SymbolKind::Type => {
                    checker.bindings.record_ident(*tid, sym.clone());
                    return check_static_method_call(checker, ctx, maccess_id, name, member, call_pos, args, arg_types);
                }
                SymbolKind::Module => {
                    checker.bindings.record_ident(*tid, sym.clone());
                    let target_module = sym.module_ref.clone().unwrap_or_default();
                    return check_module_function_call(checker, maccess_id, &target_module, member, mpos, call_pos, args, arg_types);
                }
                _ => {}
            }
        }
    }
    let target_ty = check_expr(checker, ctx, target);
    check_receiver_method_call(checker, maccess_id, &target_ty, member, mpos, call_pos, args, arg_types)
}

fn check_static_method_call(
    checker: &mut Checker<'_>,
    ctx: &FnCtx,
    id: NodeId,
    struct_name: &str,
    member: &str,
    call_pos: Position,
    args: &[Argument],
    arg_types: &[Type],
) -> Type {
    let fqn = checker.struct_fqn(&ctx.module.clone(), struct_name);
    let sig = checker.structs.get(&fqn).and_then(|st| st.static_methods.get(member).cloned());
    let Some(sig) = sig else {
        checker.error(call_pos, format!("struct `{struct_name}` has no static method `{member}`"));
        return Type::Invalid;
    };
    checker.bindings.record_member(id, MemberTarget::StaticMethod { struct_name: fqn, method: member.to_string() });
    super::calls::check_call(
        checker,
        call_pos,
        &format!("{struct_name}.{member}"),
        &sig.param_names,
        &sig.param_types,
        &sig.param_defaults,
        &sig.result,
        args,
        arg_types,
    )
    .result
}

#[allow(clippy::too_many_arguments)]
fn check_module_function_call(
    checker: &mut Checker<'_>,
    id: NodeId,
    target_module: &str,
    member: &str,
    mpos: Position,
    call_pos: Position,
    args: &[Argument],
    arg_types: &[Type],
) -> Type {
    let key = format!("{target_module}/{member}");
    let Some(sig) = checker.funcs.get(&key).cloned() else {
        checker.error(mpos, format!("module `{target_module}` has no function `{member}`"));
        return Type::Invalid;
    };
    if !sig.is_public {
        checker.error(mpos, format!("function `{member}` in module `{target_module}` is not public"));
    }
    checker.bindings.record_member(id, MemberTarget::ModuleMember { module: target_module.to_string(), name: member.to_string() });
    super::calls::check_call(
        checker,
        call_pos,
        &format!("{target_module}.{member}"),
        &sig.param_names,
        &sig.param_types,
        &sig.param_defaults,
        &sig.result,
        args,
        arg_types,
    )
    .result
}

#[allow(clippy::too_many_arguments)]
fn check_receiver_method_call(
    checker: &mut Checker<'_>,
    id: NodeId,
    target_ty: &Type,
    member: &str,
    mpos: Position,
    call_pos: Position,
    args: &[Argument],
    arg_types: &[Type],
) -> Type {
    match target_ty {
        Type::Invalid | Type::Any => Type::Invalid,
        Type::Struct(fqn) => {
            let sig = checker.structs.get(fqn).and_then(|st| st.instance_methods.get(member).cloned());
            let Some(sig) = sig else {
                checker.error(mpos, format!("`{target_ty}` has no method `{member}`"));
                return Type::Invalid;
            };
            checker.bindings.record_member(id, MemberTarget::InstanceMethod { struct_name: fqn.clone(), method: member.to_string() });
            super::calls::check_method_call(
                checker,
                call_pos,
                &format!("{target_ty}.{member}"),
                "self",
                target_ty,
                &sig.param_names,
                &sig.param_types,
                &sig.param_defaults,
                &sig.result,
                args,
                arg_types,
            )
            .result
        }
        Type::List(elems) => check_list_builtin_call(checker, id, elems, member, mpos, call_pos, target_ty, args, arg_types),
        Type::Dict(value_ty) => check_dict_builtin_call(checker, id, value_ty, member, mpos, call_pos, target_ty, args, arg_types),
        Type::String => check_string_builtin_call(checker, id, member, mpos, call_pos, args, arg_types),
        _ => match checker.builtins.lookup_method(target_ty, member) {
            Some(desc) => {
                checker.bindings.record_member(id, MemberTarget::Builtin { builtin_id: desc.id });
                let defaults = vec![false; desc.param_names.len()];
                super::calls::check_method_call(
                    checker,
                    call_pos,
                    &format!("{target_ty}.{member}"),
                    "self",
                    target_ty,
                    &desc.param_names,
                    &desc.param_types,
                    &defaults,
                    &desc.result_type,
                    args,
                    arg_types,
                )
                .result
            }
            None => {
                checker.error(mpos, format!("`{target_ty}` has no method `{member}`"));
                Type::Invalid
            }
        },
    }
}

/// spec.md §4.1: dict/list/string built-in methods are "specialized per
/// receiver" - the registry carries a generic descriptor (receiver-type-ref
/// `List(Any)`/`Dict(Any)`/`String`) and the checker substitutes the
/// concrete element/value type at the call site (SPEC_FULL.md §4.1).
#[allow(clippy::too_many_arguments)]
fn check_list_builtin_call(
    checker: &mut Checker<'_>,
    id: NodeId,
    elems: &[Type],
    member: &str,
    mpos: Position,
    call_pos: Position,
    target_ty: &Type,
    args: &[Argument],
    arg_types: &[Type],
) -> Type {
    let Some(desc) = checker.builtins.lookup_method(target_ty, member) else {
        checker.error(mpos, format!("`{target_ty}` has no method `{member}`"));
        return Type::Invalid;
    };
    let elem_ty = Type::union(elems.iter().cloned());
    let (param_names, param_types, result): (Vec<String>, Vec<Type>, Type) = match member {
        "length" => (vec![], vec![], Type::Int),
        "get" => (vec!["index".into()], vec![Type::Int], Type::optional(elem_ty)),
        "push" => (vec!["value".into()], vec![elem_ty], Type::Void),
        "pop" => (vec![], vec![], Type::optional(elem_ty)),
        "contains" => (vec!["value".into()], vec![elem_ty], Type::Bool),
        "map" => {
            let cb_ret = match arg_types.first() {
                Some(Type::Func(_, r)) => (**r).clone(),
                _ => Type::Any,
            };
            (vec!["f".into()], vec![Type::Func(vec![elem_ty], Box::new(cb_ret.clone()))], Type::list_of([cb_ret]))
        }
        "filter" => (vec!["f".into()], vec![Type::Func(vec![elem_ty], Box::new(Type::Bool))], Type::list_of(elems.iter().cloned())),
        _ => {
            checker.error(mpos, format!("list has no method `{member}`"));
            return Type::Invalid;
        }
    };
    checker.bindings.record_member(id, MemberTarget::Builtin { builtin_id: desc.id });
    let defaults = vec![false; param_names.len()];
    super::calls::check_method_call(checker, call_pos, &format!("list.{member}"), "self", target_ty, &param_names, &param_types, &defaults, &result, args, arg_types).result
}

#[allow(clippy::too_many_arguments)]
fn check_dict_builtin_call(
    checker: &mut Checker<'_>,
    id: NodeId,
    value_ty: &Type,
    member: &str,
    mpos: Position,
    call_pos: Position,
    target_ty: &Type,
    args: &[Argument],
    arg_types: &[Type],
) -> Type {
    let Some(desc) = checker.builtins.lookup_method(target_ty, member) else {
        checker.error(mpos, format!("`{target_ty}` has no method `{member}`"));
        return Type::Invalid;
    };
    let vt = value_ty.clone();
    let (param_names, param_types, result): (Vec<String>, Vec<Type>, Type) = match member {
        "length" => (vec![], vec![], Type::Int),
        "keys" => (vec![], vec![], Type::list_of([Type::String])),
        "values" => (vec![], vec![], Type::list_of([vt])),
        "has" => (vec!["key".into()], vec![Type::String], Type::Bool),
        "get" => (vec!["key".into()], vec![Type::String], Type::optional(vt)),
        "set" => (vec!["key".into(), "value".into()], vec![Type::String, vt], Type::Void),
        "remove" => (vec!["key".into()], vec![Type::String], Type::Void),
        _ => {
            checker.error(mpos, format!("dict has no method `{member}`"));
            return Type::Invalid;
        }
    };
    checker.bindings.record_member(id, MemberTarget::Builtin { builtin_id: desc.id });
    let defaults = vec![false; param_names.len()];
    super::calls::check_method_call(checker, call_pos, &format!("dict.{member}"), "self", target_ty, &param_names, &param_types, &defaults, &result, args, arg_types).result
}

fn check_string_builtin_call(checker: &mut Checker<'_>, id: NodeId, member: &str, mpos: Position, call_pos: Position, args: &[Argument], arg_types: &[Type]) -> Type {
    let target_ty = Type::String;
    let Some(desc) = checker.builtins.lookup_method(&target_ty, member) else {
        checker.error(mpos, format!("`string` has no method `{member}`"));
        return Type::Invalid;
    };
    let (param_names, param_types, result): (Vec<String>, Vec<Type>, Type) = match member {
        "length" => (vec![], vec![], Type::Int),
        "toUpper" | "toLower" => (vec![], vec![], Type::String),
        "split" => (vec!["sep".into()], vec![Type::String], Type::list_of([Type::String])),
        "contains" => (vec!["s".into()], vec![Type::String], Type::Bool),
        _ => {
            checker.error(mpos, format!("string has no method `{member}`"));
            return Type::Invalid;
        }
    };
    checker.bindings.record_member(id, MemberTarget::Builtin { builtin_id: desc.id });
    let defaults = vec![false; param_names.len()];
    super::calls::check_method_call(checker, call_pos, &format!("string.{member}"), "self", &target_ty, &param_names, &param_types, &defaults, &result, args, arg_types).result
}
