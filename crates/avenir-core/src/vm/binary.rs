//! Arithmetic opcodes (spec.md §4.4): `Int op Int -> Int` except where the
//! true result is non-integral (division), anything touching a `Float`
//! promotes to `Float`.

use super::{RuntimeError, Step, Vm};
use crate::ir::Opcode;
use crate::value::Value;

pub(super) fn apply(vm: &mut Vm<'_, '_>, op: Opcode) -> Result<Step, RuntimeError> {
    let b = vm.pop()?;
    let a = vm.pop()?;
    let result = match op {
        Opcode::Add => add(&a, &b)?,
        Opcode::Sub => arith(&a, &b, "-", |x, y| x - y, |x, y| x - y)?,
        Opcode::Mul => arith(&a, &b, "*", |x, y| x * y, |x, y| x * y)?,
        Opcode::Div => div(&a, &b)?,
        Opcode::Mod => modulo(&a, &b)?,
        _ => unreachable!("dispatch only routes arithmetic opcodes here"),
    };
    vm.push(result);
    Ok(Step::Continue)
}

pub(super) fn negate(vm: &mut Vm<'_, '_>) -> Result<Step, RuntimeError> {
    let v = vm.pop()?;
    let result = match v {
        Value::Int(x) => Value::Int(-x),
        Value::Float(x) => Value::Float(-x),
        other => return Err(RuntimeError::new(format!("cannot negate `{}`", other.type_name()))),
    };
    vm.push(result);
    Ok(Step::Continue)
}

pub(super) fn not(vm: &mut Vm<'_, '_>) -> Result<Step, RuntimeError> {
    let v = vm.pop()?;
    let b = v.as_bool().ok_or_else(|| RuntimeError::new(format!("cannot negate `{}`", v.type_name())))?;
    vm.push(Value::Bool(!b));
    Ok(Step::Continue)
}

fn add(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    match (a, b) {
        (Value::String(x), Value::String(y)) => Ok(Value::string(format!("{x}{y}"))),
        _ => arith(a, b, "+", |x, y| x + y, |x, y| x + y),
    }
}

fn arith(a: &Value, b: &Value, op: &str, int_op: fn(i64, i64) -> i64, float_op: fn(f64, f64) -> f64) -> Result<Value, RuntimeError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Ok(Value::Int(int_op(*x, *y))),
        (Value::Float(x), Value::Float(y)) => Ok(Value::Float(float_op(*x, *y))),
        (Value::Int(x), Value::Float(y)) => Ok(Value::Float(float_op(*x as f64, *y))),
        (Value::Float(x), Value::Int(y)) => Ok(Value::Float(float_op(*x, *y as f64))),
        _ => Err(type_error(op, a, b)),
    }
}

fn div(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => {
            if *y == 0 {
                return Err(RuntimeError::new("division by zero"));
            }
            if x % y == 0 { Ok(Value::Int(x / y)) } else { Ok(Value::Float(*x as f64 / *y as f64)) }
        }
        (Value::Float(x), Value::Float(y)) => {
            if *y == 0.0 {
                return Err(RuntimeError::new("division by zero"));
            }
            Ok(Value::Float(x / y))
        }
        (Value::Int(x), Value::Float(y)) => {
            if *y == 0.0 {
                return Err(RuntimeError::new("division by zero"));
            }
            Ok(Value::Float(*x as f64 / y))
        }
        (Value::Float(x), Value::Int(y)) => {
            if *y == 0 {
                return Err(RuntimeError::new("division by zero"));
            }
            Ok(Value::Float(x / *y as f64))
        }
        _ => Err(type_error("/", a, b)),
    }
}

fn modulo(a: &Value, b: &Value) -> Result<Value, RuntimeError> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => {
            if *y == 0 {
                return Err(RuntimeError::new("modulo by zero"));
            }
            Ok(Value::Int(x % y))
        }
        _ => Err(type_error("%", a, b)),
    }
}

fn type_error(op: &str, a: &Value, b: &Value) -> RuntimeError {
    RuntimeError::new(format!("`{op}` not supported between `{}` and `{}`", a.type_name(), b.type_name()))
}
