//! The full pipeline - check, compile, serialize, deserialize, run - for a
//! closure-free, struct-free module, where spec.md §4.5's byte format is a
//! faithful round trip (serialize.rs documents the narrower cases where it
//! isn't).

mod support;

use avenir_core::ast::{BinOp, TypeExprKind};
use avenir_core::serialize;
use avenir_core::value::Value;
use pretty_assertions::assert_eq;

use support::*;

#[test]
fn a_compiled_module_survives_a_byte_round_trip_and_still_runs() {
    let mut ids = IdGen::new();
    let body = vec![ret(Some(binary(&mut ids, BinOp::Add, int_lit(&mut ids, 40), int_lit(&mut ids, 2))))];
    let main = fun(&mut ids, "main", vec![], ty(TypeExprKind::Int), body);
    let prog = program(vec![main], vec![], vec![]);

    let (module, _bindings) = compile_ok(prog);
    let bytes = serialize::serialize(&module);
    assert_eq!(&bytes[..4], b"AVC2");

    let decoded = serialize::deserialize(&bytes).expect("a freshly serialized module decodes");
    assert_eq!(decoded, module);

    let result = run_round_tripped(&module).expect("the round-tripped module still runs to completion");
    assert!(matches!(result, Value::Int(42)));
}

#[test]
fn a_truncated_module_is_rejected_rather_than_mis_executed() {
    let mut ids = IdGen::new();
    let body = vec![ret(Some(int_lit(&mut ids, 1)))];
    let main = fun(&mut ids, "main", vec![], ty(TypeExprKind::Int), body);
    let prog = program(vec![main], vec![], vec![]);

    let (module, _bindings) = compile_ok(prog);
    let mut bytes = serialize::serialize(&module);
    bytes.truncate(bytes.len() / 2);

    assert!(serialize::deserialize(&bytes).is_err());
}
