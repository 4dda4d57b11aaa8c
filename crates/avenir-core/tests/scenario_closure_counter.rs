//! A closure capturing and mutating an enclosing local across repeated
//! calls (spec.md §4.4: upvalue cells stay open and shared while the
//! capturing frame is alive).

mod support;

use avenir_core::ast::{BinOp, TypeExprKind};
use avenir_core::value::Value;

use support::*;

#[test]
fn repeated_calls_see_the_previous_mutation() {
    let mut ids = IdGen::new();

    let counter_body = vec![
        assign(&mut ids, "count", binary(&mut ids, BinOp::Add, ident(&mut ids, "count"), int_lit(&mut ids, 1))),
        ret(Some(ident(&mut ids, "count"))),
    ];
    let counter_fn = fun(&mut ids, "<counter>", vec![], ty(TypeExprKind::Int), counter_body);
    let counter_lit = func_lit(&mut ids, counter_fn);

    let make_counter_body = vec![var_decl(&mut ids, "count", int_lit(&mut ids, 0)), ret(Some(counter_lit))];
    let make_counter_return_type = ty(TypeExprKind::Func(vec![], Box::new(ty(TypeExprKind::Int))));
    let make_counter = fun(&mut ids, "makeCounter", vec![], make_counter_return_type, make_counter_body);

    let make_counter_call = call(&mut ids, ident(&mut ids, "makeCounter"), vec![]);
    let first_call = call(&mut ids, ident(&mut ids, "c"), vec![]);
    let second_call = call(&mut ids, ident(&mut ids, "c"), vec![]);
    let third_call = call(&mut ids, ident(&mut ids, "c"), vec![]);

    let main_body = vec![
        var_decl(&mut ids, "c", make_counter_call),
        var_decl(&mut ids, "a", first_call),
        var_decl(&mut ids, "b", second_call),
        var_decl(&mut ids, "d", third_call),
        ret(Some(binary(
            &mut ids,
            BinOp::Add,
            binary(&mut ids, BinOp::Add, ident(&mut ids, "a"), ident(&mut ids, "b")),
            ident(&mut ids, "d"),
        ))),
    ];
    let main = fun(&mut ids, "main", vec![], ty(TypeExprKind::Int), main_body);

    let prog = program(vec![make_counter, main], vec![], vec![]);
    let result = run_program(prog).expect("closure-counter program runs");
    assert!(matches!(result, Value::Int(6)), "expected 1 + 2 + 3 = 6, got {result:?}");
}

#[test]
fn two_independent_counters_do_not_share_state() {
    let mut ids = IdGen::new();

    let counter_body = vec![
        assign(&mut ids, "count", binary(&mut ids, BinOp::Add, ident(&mut ids, "count"), int_lit(&mut ids, 1))),
        ret(Some(ident(&mut ids, "count"))),
    ];
    let counter_fn = fun(&mut ids, "<counter>", vec![], ty(TypeExprKind::Int), counter_body);
    let counter_lit = func_lit(&mut ids, counter_fn);

    let make_counter_body = vec![var_decl(&mut ids, "count", int_lit(&mut ids, 0)), ret(Some(counter_lit))];
    let make_counter_return_type = ty(TypeExprKind::Func(vec![], Box::new(ty(TypeExprKind::Int))));
    let make_counter = fun(&mut ids, "makeCounter", vec![], make_counter_return_type, make_counter_body);

    let main_body = vec![
        var_decl(&mut ids, "c1", call(&mut ids, ident(&mut ids, "makeCounter"), vec![])),
        var_decl(&mut ids, "c2", call(&mut ids, ident(&mut ids, "makeCounter"), vec![])),
        var_decl(&mut ids, "a", call(&mut ids, ident(&mut ids, "c1"), vec![])),
        var_decl(&mut ids, "b", call(&mut ids, ident(&mut ids, "c1"), vec![])),
        var_decl(&mut ids, "c", call(&mut ids, ident(&mut ids, "c2"), vec![])),
        ret(Some(binary(
            &mut ids,
            BinOp::Add,
            binary(&mut ids, BinOp::Add, ident(&mut ids, "a"), ident(&mut ids, "b")),
            ident(&mut ids, "c"),
        ))),
    ];
    let main = fun(&mut ids, "main", vec![], ty(TypeExprKind::Int), main_body);

    let prog = program(vec![make_counter, main], vec![], vec![]);
    let result = run_program(prog).expect("two independent closures program runs");
    // c1: 1, 2; c2: 1 -> 1 + 2 + 1 = 4
    assert!(matches!(result, Value::Int(4)), "expected 4, got {result:?}");
}
