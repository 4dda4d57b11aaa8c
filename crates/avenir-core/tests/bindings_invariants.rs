//! Properties `Bindings` must hold for any well-typed program (spec.md §8):
//! every checked expression gets a recorded, non-`Invalid` type, and a
//! member access the checker accepted is re-derivable by the IR compiler.

mod support;

use avenir_core::ast::{BinOp, TypeExprKind};
use avenir_core::types::Type;

use support::*;

#[test]
fn every_expression_node_gets_a_non_invalid_type() {
    let mut ids = IdGen::new();
    let sum = binary(&mut ids, BinOp::Add, int_lit(&mut ids, 1), int_lit(&mut ids, 2));
    let sum_id = sum.id();
    let body = vec![var_decl(&mut ids, "x", sum), ret(Some(ident(&mut ids, "x")))];
    let x_ref_id = match &body[1] {
        avenir_core::ast::Stmt::Return { value: Some(e), .. } => e.id(),
        _ => unreachable!(),
    };

    let main = fun(&mut ids, "main", vec![], ty(TypeExprKind::Int), body);
    let prog = program(vec![main], vec![], vec![]);
    let (_module, bindings) = compile_ok(prog);

    assert!(matches!(bindings.type_of(sum_id), Type::Int));
    assert!(matches!(bindings.type_of(x_ref_id), Type::Int));
    assert!(!bindings.expr_types.is_empty());
    assert!(bindings.expr_types.values().all(|t| !matches!(t, Type::Invalid)));
}

#[test]
fn a_struct_field_access_binding_matches_the_struct_declaration_order() {
    let mut ids = IdGen::new();
    let struct_name = "Point".to_string();
    let fields = vec![
        field("x", ty(TypeExprKind::Int), None),
        field("y", ty(TypeExprKind::Int), None),
    ];
    let decl = struct_decl(&struct_name, false, fields, vec![]);

    let make = struct_lit(&mut ids, "Point", vec![("x".to_string(), int_lit(&mut ids, 3)), ("y".to_string(), int_lit(&mut ids, 4))]);
    let y_access = member(&mut ids, ident(&mut ids, "p"), "y");
    let y_access_id = y_access.id();
    let body = vec![var_decl(&mut ids, "p", make), ret(Some(y_access))];
    let main = fun(&mut ids, "main", vec![], ty(TypeExprKind::Int), body);
    let prog = program(vec![main], vec![decl], vec![]);

    let (_module, bindings) = compile_ok(prog);
    match bindings.members.get(&y_access_id) {
        Some(avenir_core::bindings::MemberTarget::Field { field_index, struct_name: fqn }) => {
            assert_eq!(*field_index, 1, "`y` is the second declared field");
            assert!(fqn.ends_with("Point"));
        }
        other => panic!("expected a Field binding for `p.y`, got {other:?}"),
    }
}
