//! A bare `string` satisfying a user-declared interface through a built-in
//! method (spec.md §8 scenario 6 / assignability rule 9): the checker only
//! ever knows the parameter's static type is `Length`, so the call the IR
//! compiler emits dispatches through the shared `length` built-in id rather
//! than a struct's instance-method table.

mod support;

use avenir_core::ast::TypeExprKind;
use avenir_core::value::Value;

use support::*;

fn length_interface() -> avenir_core::ast::InterfaceDecl {
    interface_decl("Length", vec![interface_method_sig("length", vec![], ty(TypeExprKind::Int))])
}

#[test]
fn a_string_argument_satisfies_an_interface_typed_parameter() {
    let mut ids = IdGen::new();

    let use_length_body = vec![ret(Some(call(&mut ids, member(&mut ids, ident(&mut ids, "x"), "length"), vec![])))];
    let use_length = fun(&mut ids, "useLength", vec![param("x", ty(TypeExprKind::Named("Length".to_string())))], ty(TypeExprKind::Int), use_length_body);

    let main_body = vec![ret(Some(call(&mut ids, ident(&mut ids, "useLength"), vec![pos_arg(string_lit(&mut ids, "hello"))])))];
    let main = fun(&mut ids, "main", vec![], ty(TypeExprKind::Int), main_body);

    let prog = program(vec![use_length, main], vec![], vec![length_interface()]);
    let result = run_program(prog).expect("a string satisfies Length via its built-in length method");
    assert!(matches!(result, Value::Int(5)));
}

#[test]
fn a_list_argument_also_satisfies_the_same_interface() {
    let mut ids = IdGen::new();

    let use_length_body = vec![ret(Some(call(&mut ids, member(&mut ids, ident(&mut ids, "x"), "length"), vec![])))];
    let use_length = fun(&mut ids, "useLength", vec![param("x", ty(TypeExprKind::Named("Length".to_string())))], ty(TypeExprKind::Int), use_length_body);

    let xs = list_lit(&mut ids, vec![int_lit(&mut ids, 1), int_lit(&mut ids, 2), int_lit(&mut ids, 3)]);
    let main_body = vec![ret(Some(call(&mut ids, ident(&mut ids, "useLength"), vec![pos_arg(xs)])))];
    let main = fun(&mut ids, "main", vec![], ty(TypeExprKind::Int), main_body);

    let prog = program(vec![use_length, main], vec![], vec![length_interface()]);
    let result = run_program(prog).expect("a list satisfies Length via its built-in length method too");
    assert!(matches!(result, Value::Int(3)));
}
