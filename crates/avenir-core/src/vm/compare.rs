//! Comparison opcodes (spec.md §4.4): `Eq`/`Neq` are deep structural
//! equality (`Value::deep_eq`); the ordered comparisons are numeric-only,
//! with int-to-float promotion.

use std::cmp::Ordering;

use super::{RuntimeError, Step, Vm};
use crate::ir::Opcode;
use crate::value::Value;

pub(super) fn apply(vm: &mut Vm<'_, '_>, op: Opcode) -> Result<Step, RuntimeError> {
    let b = vm.pop()?;
    let a = vm.pop()?;
    let result = match op {
        Opcode::Eq => Value::Bool(Value::deep_eq(&a, &b)),
        Opcode::Neq => Value::Bool(!Value::deep_eq(&a, &b)),
        Opcode::Lt => Value::Bool(numeric_cmp(&a, &b)? == Ordering::Less),
        Opcode::Lte => Value::Bool(numeric_cmp(&a, &b)? != Ordering::Greater),
        Opcode::Gt => Value::Bool(numeric_cmp(&a, &b)? == Ordering::Greater),
        Opcode::Gte => Value::Bool(numeric_cmp(&a, &b)? != Ordering::Less),
        _ => unreachable!("dispatch only routes comparison opcodes here"),
    };
    vm.push(result);
    Ok(Step::Continue)
}

fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Int(x) => Some(*x as f64),
        Value::Float(x) => Some(*x),
        _ => None,
    }
}

fn numeric_cmp(a: &Value, b: &Value) -> Result<Ordering, RuntimeError> {
    let x = as_f64(a).ok_or_else(|| type_error(a))?;
    let y = as_f64(b).ok_or_else(|| type_error(b))?;
    x.partial_cmp(&y).ok_or_else(|| RuntimeError::new("cannot compare NaN"))
}

fn type_error(v: &Value) -> RuntimeError {
    RuntimeError::new(format!("comparison requires numbers, got `{}`", v.type_name()))
}
