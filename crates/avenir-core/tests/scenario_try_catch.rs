//! `try`/`catch` around a runtime trap (spec.md §4.4/§7): division by zero
//! unwinds to the nearest enclosing handler rather than escaping the whole
//! program, and the caught value is a plain `error`.

mod support;

use avenir_core::ast::{BinOp, TypeExprKind};
use avenir_core::value::Value;

use support::*;

#[test]
fn catch_recovers_from_division_by_zero() {
    let mut ids = IdGen::new();

    let risky = assign(&mut ids, "result", binary(&mut ids, BinOp::Div, ident(&mut ids, "a"), ident(&mut ids, "b")));
    let recover = assign(&mut ids, "result", int_lit(&mut ids, -1));

    let body = vec![
        var_decl(&mut ids, "a", int_lit(&mut ids, 10)),
        var_decl(&mut ids, "b", int_lit(&mut ids, 0)),
        var_decl(&mut ids, "result", int_lit(&mut ids, 0)),
        try_catch(vec![risky], "e", vec![recover]),
        ret(Some(ident(&mut ids, "result"))),
    ];

    let main = fun(&mut ids, "main", vec![], ty(TypeExprKind::Int), body);
    let prog = program(vec![main], vec![], vec![]);

    let result = run_program(prog).expect("caught division by zero does not escape main");
    assert!(matches!(result, Value::Int(-1)));
}

#[test]
fn catch_binds_a_descriptive_error_value() {
    let mut ids = IdGen::new();

    let risky = assign(&mut ids, "x", binary(&mut ids, BinOp::Div, int_lit(&mut ids, 1), int_lit(&mut ids, 0)));
    let stash = assign(&mut ids, "message", call(&mut ids, ident(&mut ids, "errorMessage"), vec![pos_arg(ident(&mut ids, "e"))]));

    let body = vec![
        var_decl(&mut ids, "x", int_lit(&mut ids, 0)),
        var_decl(&mut ids, "message", string_lit(&mut ids, "")),
        try_catch(vec![risky], "e", vec![stash]),
        ret(Some(ident(&mut ids, "message"))),
    ];

    let main = fun(&mut ids, "main", vec![], ty(TypeExprKind::String), body);
    let prog = program(vec![main], vec![], vec![]);

    let result = run_program(prog).expect("catch binds a usable error value");
    match result {
        Value::String(s) => assert!(s.contains("zero"), "expected a division-by-zero message, got {s:?}"),
        other => panic!("expected a string result, got {other:?}"),
    }
}

#[test]
fn rethrown_error_is_caught_by_the_outer_handler() {
    let mut ids = IdGen::new();

    // Inner try catches the division-by-zero trap into `e`, then rethrows
    // the same `error` value; the outer try is the one that actually
    // recovers, proving a caught value is itself a throwable `error`.
    let inner = try_catch(
        vec![assign(&mut ids, "x", binary(&mut ids, BinOp::Div, int_lit(&mut ids, 1), int_lit(&mut ids, 0)))],
        "e",
        vec![throw(ident(&mut ids, "e"))],
    );
    let outer = try_catch(vec![inner], "e", vec![assign(&mut ids, "result", int_lit(&mut ids, 1))]);

    let body = vec![
        var_decl(&mut ids, "x", int_lit(&mut ids, 0)),
        var_decl(&mut ids, "result", int_lit(&mut ids, 0)),
        outer,
        ret(Some(ident(&mut ids, "result"))),
    ];

    let main = fun(&mut ids, "main", vec![], ty(TypeExprKind::Int), body);
    let prog = program(vec![main], vec![], vec![]);

    let result = run_program(prog).expect("a rethrown error is caught by the outer handler");
    assert!(matches!(result, Value::Int(1)));
}
