//! Arithmetic and control flow end to end (spec.md §4.4: integer arithmetic
//! stays integral unless a `Float` operand is involved or division doesn't
//! come out even).

mod support;

use avenir_core::ast::{Block, BinOp, Stmt, TypeExprKind, UnOp};
use avenir_core::value::Value;

use support::*;

fn while_loop(ids: &mut IdGen) -> Stmt {
    let cond = binary(ids, BinOp::Lte, ident(ids, "i"), int_lit(ids, 5));
    let step_total = assign(ids, "total", binary(ids, BinOp::Add, ident(ids, "total"), ident(ids, "i")));
    let step_i = assign(ids, "i", binary(ids, BinOp::Add, ident(ids, "i"), int_lit(ids, 1)));
    Stmt::While { cond, body: Block { stmts: vec![step_total, step_i] }, pos: pos() }
}

#[test]
fn while_loop_accumulates_an_int_sum() {
    let mut ids = IdGen::new();
    let body = vec![
        var_decl(&mut ids, "total", int_lit(&mut ids, 0)),
        var_decl(&mut ids, "i", int_lit(&mut ids, 1)),
        while_loop(&mut ids),
        ret(Some(ident(&mut ids, "total"))),
    ];

    let main = fun(&mut ids, "main", vec![], ty(TypeExprKind::Int), body);
    let prog = program(vec![main], vec![], vec![]);

    let result = run_program(prog).expect("well-typed arithmetic program runs");
    assert!(matches!(result, Value::Int(15)));
}

#[test]
fn integer_division_promotes_to_float_when_inexact() {
    let mut ids = IdGen::new();
    let body = vec![ret(Some(binary(&mut ids, BinOp::Div, int_lit(&mut ids, 7), int_lit(&mut ids, 2))))];
    let main = fun(&mut ids, "main", vec![], ty(TypeExprKind::Float), body);
    let prog = program(vec![main], vec![], vec![]);

    let result = run_program(prog).expect("division by a nonzero divisor runs");
    match result {
        Value::Float(f) => assert!((f - 3.5).abs() < f64::EPSILON),
        other => panic!("expected a float result, got {other:?}"),
    }
}

#[test]
fn integer_division_stays_integral_when_exact() {
    let mut ids = IdGen::new();
    let body = vec![ret(Some(binary(&mut ids, BinOp::Div, int_lit(&mut ids, 6), int_lit(&mut ids, 2))))];
    let main = fun(&mut ids, "main", vec![], ty(TypeExprKind::Int), body);
    let prog = program(vec![main], vec![], vec![]);

    let result = run_program(prog).expect("exact division runs");
    assert!(matches!(result, Value::Int(3)));
}

#[test]
fn division_by_zero_surfaces_as_a_runtime_error() {
    let mut ids = IdGen::new();
    let body = vec![ret(Some(binary(&mut ids, BinOp::Div, int_lit(&mut ids, 1), int_lit(&mut ids, 0))))];
    let main = fun(&mut ids, "main", vec![], ty(TypeExprKind::Int), body);
    let prog = program(vec![main], vec![], vec![]);

    let (module, _bindings) = compile_ok(prog);
    let err = run_round_tripped(&module).unwrap_err();
    assert!(err.message.contains("zero"));
}

#[test]
fn double_negation_round_trips() {
    let mut ids = IdGen::new();
    let negated_twice = unary(&mut ids, UnOp::Neg, unary(&mut ids, UnOp::Neg, int_lit(&mut ids, 5)));
    let body = vec![ret(Some(negated_twice))];
    let main = fun(&mut ids, "main", vec![], ty(TypeExprKind::Int), body);
    let prog = program(vec![main], vec![], vec![]);

    let result = run_program(prog).expect("double negation runs");
    assert!(matches!(result, Value::Int(5)));
}
