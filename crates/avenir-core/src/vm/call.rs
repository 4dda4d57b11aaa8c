//! The call protocol and closures/upvalues (spec.md §4.4).

use std::rc::Rc;

use super::{RuntimeError, Step, Vm};
use crate::environment::ClosureCaller;
use crate::value::{ClosureObj, UpvalueCell, Value};

/// `OpCall(fnIndex, n)`: the callee is known statically; `n` arguments are
/// already on the stack.
pub(super) fn op_call(vm: &mut Vm<'_, '_>, fn_index: usize, num_args: usize) -> Result<Step, RuntimeError> {
    let func = vm.function(fn_index);
    check_arity(&func.name, func.num_params, num_args)?;
    let base = vm.stack.len() - num_args;
    vm.stack.resize(base + func.chunk.num_locals as usize, Value::None);
    let closure = Rc::new(ClosureObj { function_index: fn_index, upvalues: Vec::new() });
    vm.frames.push(super::Frame { closure, ip: 0, base });
    Ok(Step::Continue)
}

/// `OpCallValue(n)`: the callee is a `Value::Closure` sitting just below its
/// `n` arguments on the stack. Removing it in place slides the arguments
/// down by one, leaving exactly the base a fresh frame needs.
pub(super) fn op_call_value(vm: &mut Vm<'_, '_>, num_args: usize) -> Result<Step, RuntimeError> {
    let total = vm.stack.len();
    if total < num_args + 1 {
        return Err(RuntimeError::new("internal: stack underflow calling a value"));
    }
    let args_base = total - num_args;
    let callee = vm.stack.remove(args_base - 1);
    let Value::Closure(closure) = callee else {
        return Err(RuntimeError::new(format!("`{}` is not callable", callee.type_name())));
    };
    let func = vm.function(closure.function_index);
    check_arity(&func.name, func.num_params, num_args)?;
    let base = vm.stack.len() - num_args;
    vm.stack.resize(base + func.chunk.num_locals as usize, Value::None);
    vm.frames.push(super::Frame { closure, ip: 0, base });
    Ok(Step::Continue)
}

/// `OpCallBuiltin(id, n)`: pops `n` arguments in reverse (LIFO pop order, so
/// they're reversed back into the original left-to-right call order) and
/// hands them to the host registry, which may call back into a closure via
/// `caller`.
pub(super) fn op_call_builtin(vm: &mut Vm<'_, '_>, id: u32, num_args: usize) -> Result<Step, RuntimeError> {
    let mut args = Vec::with_capacity(num_args);
    for _ in 0..num_args {
        args.push(vm.pop()?);
    }
    args.reverse();

    let env = vm.env();
    let mut caller = ClosureCallerImpl { vm: &mut *vm };
    let result = env.call_builtin(id, args, &mut caller)?;
    vm.push(result);
    Ok(Step::Continue)
}

/// `OpReturn(hasValue)`: close upvalues captured from this frame's locals,
/// collapse the stack back to the frame's base, then push the result (or an
/// "invalid" `None` placeholder for a value-less return).
pub(super) fn op_return(vm: &mut Vm<'_, '_>, has_value: i32) -> Result<Step, RuntimeError> {
    let result = if has_value == 1 { vm.pop()? } else { Value::None };
    let frame = vm.frames.pop().expect("OpReturn always has an active frame");
    vm.close_upvalues_from(frame.base);
    vm.stack.truncate(frame.base);
    let still_active = vm.frames.len();
    vm.handlers.retain(|h| h.frame_index < still_active);
    vm.push(result);
    Ok(Step::Returned)
}

/// `OpClosure(fnIndex, numUpvalues)`: for each upvalue descriptor of the
/// nested function, either opens (or reuses) a cell aliasing a local of the
/// *currently executing* frame, or clones the currently executing closure's
/// own cell at the same index (chained capture - spec.md §4.4).
pub(super) fn op_closure(vm: &mut Vm<'_, '_>, fn_index: usize, num_upvalues: usize) -> Result<Step, RuntimeError> {
    let descriptors = vm.function(fn_index).upvalues.clone();
    debug_assert_eq!(descriptors.len(), num_upvalues, "resolver and compiler must agree on upvalue count");
    let frame_base = vm.current_frame().base;
    let current_closure = vm.current_frame().closure.clone();

    let mut upvalues = Vec::with_capacity(descriptors.len());
    for desc in &descriptors {
        if desc.is_local {
            upvalues.push(vm.open_upvalue_at(frame_base + desc.index as usize));
        } else {
            // The compiler pushed the parent cell's current value as a
            // placeholder before this opcode, purely to keep the bytecode
            // uniform between local and chained descriptors; the VM
            // discards it and reuses the live cell instead of a snapshot.
            vm.pop()?;
            upvalues.push(current_closure.upvalues[desc.index as usize].clone());
        }
    }
    let closure = Rc::new(ClosureObj { function_index: fn_index, upvalues });
    vm.push(Value::Closure(closure));
    Ok(Step::Continue)
}

pub(super) fn op_load_upvalue(vm: &mut Vm<'_, '_>, index: usize) -> Result<Step, RuntimeError> {
    let cell = vm.current_frame().closure.upvalues[index].clone();
    let value = match &*cell.borrow() {
        UpvalueCell::Open { stack_index } => vm.stack[*stack_index].clone(),
        UpvalueCell::Closed { value } => value.clone(),
    };
    vm.push(value);
    Ok(Step::Continue)
}

/// Does not pop: assignment is an expression in this language, and the
/// statement-level lowering for plain assignment relies on `Store*`
/// opcodes leaving their value on the stack (`compiler::stmt::store_named`).
pub(super) fn op_store_upvalue(vm: &mut Vm<'_, '_>, index: usize) -> Result<Step, RuntimeError> {
    let value = vm.peek(0).clone();
    let cell = vm.current_frame().closure.upvalues[index].clone();
    match &mut *cell.borrow_mut() {
        UpvalueCell::Open { stack_index } => vm.stack[*stack_index] = value,
        UpvalueCell::Closed { value: slot } => *slot = value,
    }
    Ok(Step::Continue)
}

fn check_arity(name: &str, num_params: u32, num_args: usize) -> Result<(), RuntimeError> {
    if num_params as usize != num_args {
        return Err(RuntimeError::new(format!("`{name}` expects {num_params} argument(s), got {num_args}")));
    }
    Ok(())
}

/// The `ClosureCaller` a built-in sees when it wants to invoke a user
/// closure (e.g. `list.map`'s callback) - re-enters `Vm::call_closure`,
/// running its own nested dispatch loop to completion before returning.
pub struct ClosureCallerImpl<'a, 'm, 'e> {
    vm: &'a mut Vm<'m, 'e>,
}

impl ClosureCaller for ClosureCallerImpl<'_, '_, '_> {
    fn call_closure(&mut self, closure: Value, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let Value::Closure(c) = closure else {
            return Err(RuntimeError::new(format!("`{}` is not callable", closure.type_name())));
        };
        self.vm.call_closure(c, args)
    }
}
