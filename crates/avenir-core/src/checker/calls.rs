//! Call-site checking: binds arguments (via [`crate::argbind`]) then checks
//! each bound argument's type against its parameter (spec.md §4.1).

use crate::argbind::{self, ArgSlot};
use crate::ast::{Argument, Position};
use crate::types::Type;

use super::assign::assignable;
use super::Checker;

/// Outcome of checking one call expression. The compiler re-derives its own
/// `ArgSlot` binding independently at lowering time (it needs per-slot
/// source expressions, not just types) - this is kept only so the checker
/// can report the result type and so tests can assert on the binding.
pub struct CallCheckResult {
    pub result: Type,
    pub slots: Vec<ArgSlot>,
}

#[allow(clippy::too_many_arguments)]
pub fn check_call(
    checker: &mut Checker<'_>,
    pos: Position,
    callee_desc: &str,
    param_names: &[String],
    param_types: &[Type],
    param_defaults: &[bool],
    result_ty: &Type,
    args: &[Argument],
    arg_types: &[Type],
) -> CallCheckResult {
    match argbind::bind_call(param_names, param_defaults, args) {
        Ok(slots) => {
            check_bound_args(checker, pos, param_names, param_types, &slots, arg_types);
            CallCheckResult { result: result_ty.clone(), slots }
        }
        Err(e) => {
            checker.error(pos, format!("in call to `{callee_desc}`: {e}"));
            CallCheckResult { result: Type::Invalid, slots: Vec::new() }
        }
    }
}

/// As [`check_call`], but prepends an implicit receiver argument (instance
/// methods and method-like built-ins). `receiver_type` is the already
/// type-checked receiver expression's type, checked against the method's
/// first (synthetic) parameter.
#[allow(clippy::too_many_arguments)]
pub fn check_method_call(
    checker: &mut Checker<'_>,
    pos: Position,
    callee_desc: &str,
    receiver_name: &str,
    receiver_type: &Type,
    param_names: &[String],
    param_types: &[Type],
    param_defaults: &[bool],
    result_ty: &Type,
    args: &[Argument],
    arg_types: &[Type],
) -> CallCheckResult {
    match argbind::bind_method_call(receiver_name, param_names, param_defaults, args) {
        Ok(slots) => {
            let full_names = with_receiver(receiver_name, param_names);
            let full_types = param_types_with_receiver(receiver_type, param_types);
            check_bound_args(checker, pos, &full_names, &full_types, &slots, arg_types);
            CallCheckResult { result: result_ty.clone(), slots }
        }
        Err(e) => {
            checker.error(pos, format!("in call to `{callee_desc}`: {e}"));
            CallCheckResult { result: Type::Invalid, slots: Vec::new() }
        }
    }
}

fn with_receiver(receiver_name: &str, param_names: &[String]) -> Vec<String> {
    let mut v = Vec::with_capacity(param_names.len() + 1);
    v.push(receiver_name.to_string());
    v.extend(param_names.iter().cloned());
    v
}

fn param_types_with_receiver(receiver_type: &Type, param_types: &[Type]) -> Vec<Type> {
    let mut v = Vec::with_capacity(param_types.len() + 1);
    v.push(receiver_type.clone());
    v.extend(param_types.iter().cloned());
    v
}

fn check_bound_args(
    checker: &mut Checker<'_>,
    pos: Position,
    param_names: &[String],
    param_types: &[Type],
    slots: &[ArgSlot],
    arg_types: &[Type],
) {
    for (i, slot) in slots.iter().enumerate() {
        let expected = &param_types[i];
        let actual = match slot {
            ArgSlot::Positional(idx) | ArgSlot::Named(idx) => match arg_types.get(*idx) {
                Some(t) => t,
                None => continue, // receiver sentinel slot, already checked by the caller
            },
            ArgSlot::Default => continue,
        };
        if !assignable(checker, expected, actual) {
            checker.error(pos, format!("argument `{}` expects `{expected}`, got `{actual}`", param_names[i]));
        }
    }
}
