//! Lists, dicts, structs, and string-interpolation support opcodes
//! (spec.md §4.4).

use std::cell::RefCell;
use std::rc::Rc;

use super::{RuntimeError, Step, Vm};
use crate::ir::Constant;
use crate::value::{StructInstance, Value};

pub(super) fn value_of_constant(c: &Constant) -> Value {
    match c {
        Constant::Int(v) => Value::Int(*v),
        Constant::Float(v) => Value::Float(*v),
        Constant::String(s) => Value::string(s.clone()),
        Constant::Bool(b) => Value::Bool(*b),
        Constant::Bytes(b) => Value::Bytes(Rc::from(b.as_slice())),
        Constant::None => Value::None,
    }
}

/// `OpMakeList(n)`: pops `n` values (pushed left-to-right by the compiler)
/// and collects them back into that order.
pub(super) fn make_list(vm: &mut Vm<'_, '_>, n: usize) -> Result<Step, RuntimeError> {
    let mut items = Vec::with_capacity(n);
    for _ in 0..n {
        items.push(vm.pop()?);
    }
    items.reverse();
    vm.push(Value::list(items));
    Ok(Step::Continue)
}

/// `OpMakeDict(n)`: pops `n` (key, value) pairs, restoring declaration
/// order (`DictLit` lowering pushes `key0, value0, key1, value1, ...`).
pub(super) fn make_dict(vm: &mut Vm<'_, '_>, n: usize) -> Result<Step, RuntimeError> {
    let mut pairs = Vec::with_capacity(n);
    for _ in 0..n {
        let value = vm.pop()?;
        let key = vm.pop()?;
        let Value::String(k) = key else {
            return Err(RuntimeError::new("internal: dict key must be a string"));
        };
        pairs.push((k.to_string(), value));
    }
    pairs.reverse();
    let mut map = indexmap::IndexMap::with_capacity(n);
    for (k, v) in pairs {
        map.insert(k, v);
    }
    vm.push(Value::dict(map));
    Ok(Step::Continue)
}

/// `OpIndex`: `list[int]` or `dict[string]`.
pub(super) fn index(vm: &mut Vm<'_, '_>) -> Result<Step, RuntimeError> {
    let key = vm.pop()?;
    let target = vm.pop()?;
    let result = match (&target, &key) {
        (Value::List(items), Value::Int(i)) => {
            let items = items.borrow();
            let idx = usize::try_from(*i).ok().filter(|i| *i < items.len());
            match idx {
                Some(idx) => items[idx].clone(),
                None => return Err(RuntimeError::new(format!("list index {i} out of range (length {})", items.len()))),
            }
        }
        (Value::Dict(entries), Value::String(k)) => match entries.borrow().get(k.as_ref()) {
            Some(v) => v.clone(),
            None => return Err(RuntimeError::new(format!("key `{k}` not found"))),
        },
        _ => return Err(RuntimeError::new(format!("cannot index into `{}` with `{}`", target.type_name(), key.type_name()))),
    };
    vm.push(result);
    Ok(Step::Continue)
}

pub(super) fn make_some(vm: &mut Vm<'_, '_>) -> Result<Step, RuntimeError> {
    let inner = vm.pop()?;
    vm.push(Value::Some(Box::new(inner)));
    Ok(Step::Continue)
}

/// `OpMakeStruct(typeIndex, fieldCount)`: pops `fieldCount` values (pushed
/// in declaration order) and builds the struct instance.
pub(super) fn make_struct(vm: &mut Vm<'_, '_>, type_index: u32, field_count: usize) -> Result<Step, RuntimeError> {
    let mut fields = Vec::with_capacity(field_count);
    for _ in 0..field_count {
        fields.push(vm.pop()?);
    }
    fields.reverse();
    vm.push(Value::Struct(Rc::new(RefCell::new(StructInstance { type_index, fields }))));
    Ok(Step::Continue)
}

pub(super) fn load_field(vm: &mut Vm<'_, '_>, field_index: usize) -> Result<Step, RuntimeError> {
    let target = vm.pop()?;
    let Value::Struct(s) = &target else {
        return Err(RuntimeError::new(format!("cannot load a field from `{}`", target.type_name())));
    };
    let value = s.borrow().fields[field_index].clone();
    vm.push(value);
    Ok(Step::Continue)
}

/// `OpStoreField(fieldIndex)`: mutates the struct in place and leaves the
/// same struct value on top of the stack (`compiler::stmt::lower_field_assign`
/// relies on this to write the mutated struct back into its variable).
pub(super) fn store_field(vm: &mut Vm<'_, '_>, field_index: usize) -> Result<Step, RuntimeError> {
    let value = vm.pop()?;
    let target = vm.pop()?;
    let Value::Struct(s) = &target else {
        return Err(RuntimeError::new(format!("cannot store a field into `{}`", target.type_name())));
    };
    s.borrow_mut().fields[field_index] = value;
    vm.push(target);
    Ok(Step::Continue)
}

pub(super) fn stringify(vm: &mut Vm<'_, '_>) -> Result<Step, RuntimeError> {
    let v = vm.pop()?;
    vm.push(Value::string(v.to_string()));
    Ok(Step::Continue)
}

pub(super) fn concat_string(vm: &mut Vm<'_, '_>) -> Result<Step, RuntimeError> {
    let b = vm.pop()?;
    let a = vm.pop()?;
    let (Value::String(x), Value::String(y)) = (&a, &b) else {
        return Err(RuntimeError::new("internal: ConcatString operands must be strings"));
    };
    vm.push(Value::string(format!("{x}{y}")));
    Ok(Step::Continue)
}
