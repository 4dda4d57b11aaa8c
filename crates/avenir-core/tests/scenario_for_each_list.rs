//! `for each` over a list (spec.md §4.3: lowers to a counted index loop
//! built on the `length` and index-access built-ins).

mod support;

use avenir_core::ast::TypeExprKind;
use avenir_core::value::Value;

use support::*;

#[test]
fn for_each_accumulates_every_element() {
    let mut ids = IdGen::new();

    let xs = list_lit(&mut ids, vec![int_lit(&mut ids, 1), int_lit(&mut ids, 2), int_lit(&mut ids, 3), int_lit(&mut ids, 4)]);
    let xs_decl = var_decl(&mut ids, "xs", xs);
    let total_decl = var_decl(&mut ids, "total", int_lit(&mut ids, 0));

    let accumulate = assign(
        &mut ids,
        "total",
        avenir_core::ast::Expr::Binary {
            id: ids.next(),
            op: avenir_core::ast::BinOp::Add,
            lhs: Box::new(ident(&mut ids, "total")),
            rhs: Box::new(ident(&mut ids, "x")),
            pos: pos(),
        },
    );
    let loop_stmt = for_each("x", ident(&mut ids, "xs"), vec![accumulate]);
    let body = vec![xs_decl, total_decl, loop_stmt, ret(Some(ident(&mut ids, "total")))];

    let main = fun(&mut ids, "main", vec![], ty(TypeExprKind::Int), body);
    let prog = program(vec![main], vec![], vec![]);

    let result = run_program(prog).expect("for-each program runs");
    assert!(matches!(result, Value::Int(10)));
}

#[test]
fn empty_list_never_enters_the_loop_body() {
    let mut ids = IdGen::new();
    let xs_decl = var_decl(&mut ids, "xs", list_lit(&mut ids, vec![]));
    let total_decl = var_decl(&mut ids, "total", int_lit(&mut ids, 7));
    let bump = assign(&mut ids, "total", int_lit(&mut ids, 99));
    let loop_stmt = for_each("x", ident(&mut ids, "xs"), vec![bump]);
    let body = vec![xs_decl, total_decl, loop_stmt, ret(Some(ident(&mut ids, "total")))];

    let main = fun(&mut ids, "main", vec![], ty(TypeExprKind::Int), body);
    let prog = program(vec![main], vec![], vec![]);

    let result = run_program(prog).expect("empty for-each program runs");
    assert!(matches!(result, Value::Int(7)), "loop body must never run over an empty list");
}
