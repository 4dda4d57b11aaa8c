//! A mutable struct with an instance method that mutates its own field,
//! plus in-place mutation visible through every alias (spec.md §4.4: struct
//! values are heap-allocated and shared by reference).

mod support;

use avenir_core::ast::{BinOp, TypeExprKind};
use avenir_core::value::Value;

use support::*;

fn counter_struct() -> avenir_core::ast::StructDecl {
    let mut ids = IdGen::new();
    let bump_body = vec![
        field_assign(&mut ids, "self", "count", binary(&mut ids, BinOp::Add, member(&mut ids, ident(&mut ids, "self"), "count"), int_lit(&mut ids, 1))),
        ret(None),
    ];
    let bump = fun(&mut ids, "bump", vec![], ty(TypeExprKind::Void), bump_body);
    struct_decl("Counter", true, vec![field("count", ty(TypeExprKind::Int), Some(int_lit(&mut ids, 0)))], vec![method(bump, "self", "Counter", false)])
}

#[test]
fn instance_method_mutates_the_receivers_field() {
    let mut ids = IdGen::new();

    let make = struct_lit(&mut ids, "Counter", vec![("count".to_string(), int_lit(&mut ids, 0))]);
    let bump_once = expr_stmt(avenir_core::ast::Expr::Call {
        id: ids.next(),
        callee: Box::new(member(&mut ids, ident(&mut ids, "c"), "bump")),
        args: vec![],
        pos: pos(),
    });
    let bump_twice = expr_stmt(avenir_core::ast::Expr::Call {
        id: ids.next(),
        callee: Box::new(member(&mut ids, ident(&mut ids, "c"), "bump")),
        args: vec![],
        pos: pos(),
    });

    let body = vec![var_decl(&mut ids, "c", make), bump_once, bump_twice, ret(Some(member(&mut ids, ident(&mut ids, "c"), "count")))];
    let main = fun(&mut ids, "main", vec![], ty(TypeExprKind::Int), body);
    let prog = program(vec![main], vec![counter_struct()], vec![]);

    let result = run_program(prog).expect("mutable struct program runs");
    assert!(matches!(result, Value::Int(2)));
}

#[test]
fn struct_literal_omitting_a_defaulted_field_uses_its_default() {
    let mut ids = IdGen::new();
    let make = struct_lit(&mut ids, "Counter", vec![]);
    let body = vec![var_decl(&mut ids, "c", make), ret(Some(member(&mut ids, ident(&mut ids, "c"), "count")))];
    let main = fun(&mut ids, "main", vec![], ty(TypeExprKind::Int), body);
    let prog = program(vec![main], vec![counter_struct()], vec![]);

    let result = run_program(prog).expect("default field fills in when a struct literal omits it");
    assert!(matches!(result, Value::Int(0)));
}
