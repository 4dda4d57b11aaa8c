//! The checker keeps going after the first error so one pass surfaces every
//! problem in a program, not just the first (spec.md §4.1).

mod support;

use avenir_core::ast::TypeExprKind;

use support::*;

#[test]
fn two_independent_type_errors_both_surface_in_one_pass() {
    let mut ids = IdGen::new();

    // `"x" + 1` - a string plus an int, a type error, discarded as a statement.
    let bad1 = expr_stmt(binary(&mut ids, avenir_core::ast::BinOp::Add, string_lit(&mut ids, "x"), int_lit(&mut ids, 1)));
    // `5 % 2.0` - modulo requires two ints, a second, unrelated type error.
    let bad2 = expr_stmt(binary(&mut ids, avenir_core::ast::BinOp::Mod, int_lit(&mut ids, 5), float_lit(&mut ids, 2.0)));
    let ret_stmt = ret(Some(int_lit(&mut ids, 0)));

    let main = fun(&mut ids, "main", vec![], ty(TypeExprKind::Int), vec![bad1, bad2, ret_stmt]);
    let prog = program(vec![main], vec![], vec![]);

    let errors = check_only(prog);
    assert!(errors.diagnostics.len() >= 2, "expected at least two diagnostics, got {errors}");
}

#[test]
fn a_well_typed_program_has_no_diagnostics() {
    let mut ids = IdGen::new();
    let main = fun(&mut ids, "main", vec![], ty(TypeExprKind::Int), vec![ret(Some(int_lit(&mut ids, 0)))]);
    let prog = program(vec![main], vec![], vec![]);

    let errors = check_only(prog);
    assert!(errors.is_empty());
}
