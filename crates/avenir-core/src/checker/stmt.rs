//! Statement type-checking (spec.md §4.1). Each nested block (`if`/`while`/
//! `for`/`for-each`/`try`/`catch`) gets its own child scope so a variable
//! declared inside does not leak into a sibling block - the resolver (not
//! this checker) is the source of truth for actual local-slot allocation.

use std::rc::Rc;

use crate::ast::{Block, Stmt};
use crate::bindings::MemberTarget;
use crate::symbol::{Scope, Symbol, SymbolKind};
use crate::types::Type;

use super::{assign, expr, Checker, FnCtx};

pub fn check_block(checker: &mut Checker<'_>, ctx: &mut FnCtx, block: &Block) {
    for stmt in &block.stmts {
        check_stmt(checker, ctx, stmt);
    }
}

fn child_ctx(ctx: &FnCtx) -> FnCtx {
    FnCtx {
        module: ctx.module.clone(),
        return_type: ctx.return_type.clone(),
        loop_depth: ctx.loop_depth,
        scope: Scope::child(Rc::new(ctx.scope.clone())),
    }
}

fn check_nested_block(checker: &mut Checker<'_>, ctx: &FnCtx, block: &Block) {
    let mut nested = child_ctx(ctx);
    check_block(checker, &mut nested, block);
}

fn check_loop_body(checker: &mut Checker<'_>, ctx: &FnCtx, body: &Block) {
    let mut nested = child_ctx(ctx);
    nested.loop_depth += 1;
    check_block(checker, &mut nested, body);
}

fn check_stmt(checker: &mut Checker<'_>, ctx: &mut FnCtx, stmt: &Stmt) {
    match stmt {
        Stmt::VarDecl { id, name, init, pos } => {
            let ty = expr::check_expr(checker, ctx, init);
            if ctx.scope.lookup_local(name).is_some() {
                checker.error(*pos, format!("duplicate local variable `{name}`"));
            }
            ctx.scope.define(Symbol { name: name.clone(), kind: SymbolKind::Var, ty, declaring_node: id.0, module_ref: None, is_public: false });
        }
        Stmt::Assign { id, target, value, pos } => {
            let vty = expr::check_expr(checker, ctx, value);
            match ctx.scope.lookup(target).cloned() {
                Some(sym) => {
                    if sym.kind != SymbolKind::Var {
                        checker.error(*pos, format!("`{target}` is not a variable"));
                    } else if !assign::assignable(checker, &sym.ty, &vty) {
                        checker.error(*pos, format!("cannot assign `{vty}` to `{target}` of type `{}`", sym.ty));
                    }
                    checker.bindings.record_ident(*id, sym);
                }
                None => checker.error(*pos, format!("unknown identifier `{target}`")),
            }
        }
        Stmt::FieldAssign { id, target_name, field, value, pos } => {
            let vty = expr::check_expr(checker, ctx, value);
            match ctx.scope.lookup(target_name).cloned() {
                Some(sym) => {
                    checker.bindings.record_ident(*id, sym.clone());
                    match &sym.ty {
                        Type::Struct(fqn) => {
                            let info = checker
                                .structs
                                .get(fqn)
                                .and_then(|st| st.field_index(field).map(|idx| (fqn.clone(), idx, st.is_mutable)));
                            match info {
                                Some((struct_name, field_index, is_mutable)) => {
                                    if !is_mutable {
                                        checker.error(*pos, format!("struct `{target_name}` is not mutable"));
                                    }
                                    let field_ty = checker.structs.get(&struct_name).unwrap().fields[field_index].ty.clone();
                                    if !assign::assignable(checker, &field_ty, &vty) {
                                        checker.error(*pos, format!("field `{field}` expects `{field_ty}`, got `{vty}`"));
                                    }
                                    checker.bindings.record_member(*id, MemberTarget::Field { struct_name, field_index });
                                }
                                None => checker.error(*pos, format!("no field `{field}` on `{}`", sym.ty)),
                            }
                        }
                        Type::Invalid => {}
                        other => checker.error(*pos, format!("`{other}` has no fields")),
                    }
                }
                None => checker.error(*pos, format!("unknown identifier `{target_name}`")),
            }
        }
        Stmt::ExprStmt { expr } => {
            expr::check_expr(checker, ctx, expr);
        }
        Stmt::Return { value, pos } => {
            let ty = match value {
                Some(e) => expr::check_expr(checker, ctx, e),
                None => Type::Void,
            };
            let expected = ctx.return_type.clone();
            if !assign::assignable(checker, &expected, &ty) {
                checker.error(*pos, format!("return type mismatch: expected `{expected}`, got `{ty}`"));
            }
        }
        Stmt::If { cond, then_block, else_block, pos } => {
            let cty = expr::check_expr(checker, ctx, cond);
            if !matches!(cty, Type::Bool | Type::Invalid) {
                checker.error(*pos, format!("`if` condition must be `bool`, got `{cty}`"));
            }
            check_nested_block(checker, ctx, then_block);
            if let Some(eb) = else_block {
                check_nested_block(checker, ctx, eb);
            }
        }
        Stmt::While { cond, body, pos } => {
            let cty = expr::check_expr(checker, ctx, cond);
            if !matches!(cty, Type::Bool | Type::Invalid) {
                checker.error(*pos, format!("`while` condition must be `bool`, got `{cty}`"));
            }
            check_loop_body(checker, ctx, body);
        }
        Stmt::For { init, cond, step, body, pos } => {
            let mut nested = child_ctx(ctx);
            if let Some(s) = init {
                check_stmt(checker, &mut nested, s);
            }
            if let Some(c) = cond {
                let cty = expr::check_expr(checker, &mut nested, c);
                if !matches!(cty, Type::Bool | Type::Invalid) {
                    checker.error(*pos, format!("`for` condition must be `bool`, got `{cty}`"));
                }
            }
            nested.loop_depth += 1;
            check_block(checker, &mut nested, body);
            nested.loop_depth -= 1;
            if let Some(s) = step {
                check_stmt(checker, &mut nested, s);
            }
        }
        Stmt::ForEach { var, iterable, body, pos } => {
            let ity = expr::check_expr(checker, ctx, iterable);
            let elem_ty = match &ity {
                Type::List(elems) => {
                    if elems.is_empty() {
                        Type::Invalid
                    } else {
                        Type::union(elems.iter().cloned())
                    }
                }
                Type::Invalid => Type::Invalid,
                other => {
                    checker.error(*pos, format!("`for-each` requires a list, got `{other}`"));
                    Type::Invalid
                }
            };
            let mut nested = child_ctx(ctx);
            nested.scope.define(Symbol { name: var.clone(), kind: SymbolKind::Var, ty: elem_ty, declaring_node: 0, module_ref: None, is_public: false });
            nested.loop_depth += 1;
            check_block(checker, &mut nested, body);
        }
        Stmt::Break { pos } => {
            if ctx.loop_depth == 0 {
                checker.error(*pos, "`break` outside of a loop");
            }
        }
        Stmt::Continue { pos } => {
            if ctx.loop_depth == 0 {
                checker.error(*pos, "`continue` outside of a loop");
            }
        }
        Stmt::Try { body, catch_var, catch_body, .. } => {
            check_nested_block(checker, ctx, body);
            let mut nested = child_ctx(ctx);
            nested.scope.define(Symbol { name: catch_var.clone(), kind: SymbolKind::Var, ty: Type::Error, declaring_node: 0, module_ref: None, is_public: false });
            check_block(checker, &mut nested, catch_body);
        }
        Stmt::Throw { value, pos } => {
            let ty = expr::check_expr(checker, ctx, value);
            if !matches!(ty, Type::Error | Type::Invalid) {
                checker.error(*pos, format!("`throw` requires an `error` value, got `{ty}`"));
            }
        }
    }
}
