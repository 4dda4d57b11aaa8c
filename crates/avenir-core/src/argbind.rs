//! Call-argument binding: merges positional and named arguments against a
//! parameter list (spec.md §4.1). Shared between the checker (which only
//! needs to validate and compute a result type) and the IR compiler (which
//! needs the same binding to know, per declaration-order parameter slot,
//! which source expression - or default - supplies it).
//!
//! This language has no `*args`/`**kwargs` or positional-only/keyword-only
//! sections, just a flat parameter list with optional per-parameter
//! defaults.

use crate::ast::Argument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArgSlot {
    /// Index into the call's positional-argument list (in source order).
    Positional(usize),
    /// Index into the call's named-argument list (in source order).
    Named(usize),
    /// No argument supplied; the parameter's default expression is used.
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    PositionalAfterNamed,
    DuplicateNamedArgument(String),
    UnknownNamedArgument(String),
    MissingArgument(String),
    TooManyPositionalArguments,
}

impl std::fmt::Display for BindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BindError::PositionalAfterNamed => write!(f, "positional argument follows named argument"),
            BindError::DuplicateNamedArgument(n) => write!(f, "duplicate named argument `{n}`"),
            BindError::UnknownNamedArgument(n) => write!(f, "unknown named argument `{n}`"),
            BindError::MissingArgument(n) => write!(f, "missing argument for parameter `{n}`"),
            BindError::TooManyPositionalArguments => write!(f, "too many positional arguments"),
        }
    }
}

/// Binds `args` (as they appeared at the call site, in source order)
/// against `param_names`/`param_has_default`, returning one [`ArgSlot`]
/// per parameter in declaration order.
///
/// `extra_positional_prefix` supports the "receiver implicitly prepended"
/// rule for instance-method and built-in-method calls: pass the receiver
/// expression's slot as `Some(ArgSlot::Positional(RECEIVER_SENTINEL))`-style
/// by instead calling [`bind_call_with_receiver`].
pub fn bind_call(
    param_names: &[String],
    param_has_default: &[bool],
    args: &[Argument],
) -> Result<Vec<ArgSlot>, BindError> {
    let mut positional_idx = 0usize;
    let mut seen_named = false;
    let mut named_slots: Vec<(String, usize)> = Vec::new();
    let mut positional_slots: Vec<usize> = Vec::new();

    for (i, arg) in args.iter().enumerate() {
        match arg {
            Argument::Positional(_) => {
                if seen_named {
                    return Err(BindError::PositionalAfterNamed);
                }
                positional_slots.push(i);
            }
            Argument::Named(n) => {
                seen_named = true;
                if named_slots.iter().any(|(name, _)| name == &n.name) {
                    return Err(BindError::DuplicateNamedArgument(n.name.clone()));
                }
                named_slots.push((n.name.clone(), i));
            }
        }
    }

    if positional_slots.len() > param_names.len() {
        return Err(BindError::TooManyPositionalArguments);
    }

    let mut out = Vec::with_capacity(param_names.len());
    for (p_idx, p_name) in param_names.iter().enumerate() {
        if positional_idx < positional_slots.len() {
            out.push(ArgSlot::Positional(positional_slots[positional_idx]));
            positional_idx += 1;
            continue;
        }
        if let Some(pos) = named_slots.iter().position(|(name, _)| name == p_name) {
            let (_, arg_idx) = named_slots.remove(pos);
            out.push(ArgSlot::Named(arg_idx));
            continue;
        }
        if param_has_default[p_idx] {
            out.push(ArgSlot::Default);
            continue;
        }
        return Err(BindError::MissingArgument(p_name.clone()));
    }

    if let Some((name, _)) = named_slots.into_iter().next() {
        return Err(BindError::UnknownNamedArgument(name));
    }

    Ok(out)
}

/// As [`bind_call`], but prepends a synthetic receiver parameter/argument
/// pair for instance-method and built-in-method calls (spec.md §4.1: "the
/// receiver is implicitly prepended to the argument list, and to the
/// method's parameter list for name-matching purposes"). The returned slot
/// for the receiver parameter is always `ArgSlot::Positional(usize::MAX)`,
/// a sentinel the caller recognizes to mean "use the receiver expression
/// directly" rather than indexing into `args`.
pub const RECEIVER_SENTINEL: usize = usize::MAX;

pub fn bind_method_call(
    receiver_param_name: &str,
    param_names: &[String],
    param_has_default: &[bool],
    args: &[Argument],
) -> Result<Vec<ArgSlot>, BindError> {
    let mut names = Vec::with_capacity(param_names.len() + 1);
    names.push(receiver_param_name.to_string());
    names.extend(param_names.iter().cloned());
    let mut defaults = Vec::with_capacity(param_has_default.len() + 1);
    defaults.push(false);
    defaults.extend(param_has_default.iter().copied());

    // The receiver always fills the first slot positionally, regardless of
    // what's in `args`; shift the rest of the binding by treating `args` as
    // the remaining arguments only.
    let mut result = vec![ArgSlot::Positional(RECEIVER_SENTINEL)];
    result.extend(bind_call(&names[1..], &defaults[1..], args)?);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Argument, Expr, NamedArg, NodeId, Position};

    fn ident(name: &str) -> Expr {
        Expr::Ident { id: NodeId(0), name: name.to_string(), pos: Position::default() }
    }

    #[test]
    fn positional_fill_left_to_right() {
        let params = vec!["a".to_string(), "b".to_string()];
        let defaults = vec![false, false];
        let args = vec![Argument::Positional(ident("x")), Argument::Positional(ident("y"))];
        let bound = bind_call(&params, &defaults, &args).unwrap();
        assert_eq!(bound, vec![ArgSlot::Positional(0), ArgSlot::Positional(1)]);
    }

    #[test]
    fn named_binds_by_name() {
        let params = vec!["a".to_string(), "b".to_string()];
        let defaults = vec![false, false];
        let args = vec![Argument::Named(NamedArg { name: "b".into(), value: ident("y") }), Argument::Named(NamedArg { name: "a".into(), value: ident("x") })];
        let bound = bind_call(&params, &defaults, &args).unwrap();
        assert_eq!(bound, vec![ArgSlot::Named(1), ArgSlot::Named(0)]);
    }

    #[test]
    fn missing_required_param_is_error() {
        let params = vec!["a".to_string()];
        let defaults = vec![false];
        let err = bind_call(&params, &defaults, &[]).unwrap_err();
        assert_eq!(err, BindError::MissingArgument("a".into()));
    }

    #[test]
    fn default_fills_missing_optional() {
        let params = vec!["a".to_string()];
        let defaults = vec![true];
        let bound = bind_call(&params, &defaults, &[]).unwrap();
        assert_eq!(bound, vec![ArgSlot::Default]);
    }

    #[test]
    fn duplicate_named_is_error() {
        let params = vec!["a".to_string()];
        let defaults = vec![false];
        let args = vec![
            Argument::Named(NamedArg { name: "a".into(), value: ident("x") }),
            Argument::Named(NamedArg { name: "a".into(), value: ident("y") }),
        ];
        assert_eq!(bind_call(&params, &defaults, &args).unwrap_err(), BindError::DuplicateNamedArgument("a".into()));
    }

    #[test]
    fn unknown_named_is_error() {
        let params = vec!["a".to_string()];
        let defaults = vec![false];
        let args = vec![Argument::Named(NamedArg { name: "nope".into(), value: ident("x") })];
        assert_eq!(bind_call(&params, &defaults, &args).unwrap_err(), BindError::UnknownNamedArgument("nope".into()));
    }

    #[test]
    fn positional_after_named_is_error() {
        let params = vec!["a".to_string(), "b".to_string()];
        let defaults = vec![false, false];
        let args = vec![
            Argument::Named(NamedArg { name: "b".into(), value: ident("y") }),
            Argument::Positional(ident("x")),
        ];
        assert_eq!(bind_call(&params, &defaults, &args).unwrap_err(), BindError::PositionalAfterNamed);
    }

    #[test]
    fn receiver_is_prepended() {
        let params = vec!["n".to_string()];
        let defaults = vec![false];
        let args = vec![Argument::Positional(ident("x"))];
        let bound = bind_method_call("self", &params, &defaults, &args).unwrap();
        assert_eq!(bound, vec![ArgSlot::Positional(RECEIVER_SENTINEL), ArgSlot::Positional(0)]);
    }
}
