//! The concrete built-in table the runner wires in (spec.md §6: "the
//! actual built-in implementations... are host-supplied"). `avenir-core`
//! only defines the [`BuiltinRegistry`]/[`Environment`] interfaces; this is
//! one host filling them in.

use avenir_core::environment::{BuiltinDescriptor, BuiltinRegistry, ClosureCaller};
use avenir_core::types::Type;
use avenir_core::value::Value;
use avenir_core::vm::RuntimeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum BuiltinId {
    /// Shared across list/dict/string receivers, and the one built-in method
    /// an `Interface`-typed receiver can resolve to (spec.md §8 scenario 6):
    /// the compiler only ever knows the static receiver type, which can be
    /// `Interface`, so "length" can't have a distinct id per concrete
    /// receiver kind the way the other methods below do. The dispatch in
    /// `call` below resolves the concrete behavior from the runtime value.
    Length = 1,
    ListGet,
    ListPush,
    ListPop,
    ListContains,
    ListMap,
    ListFilter,
    DictKeys,
    DictValues,
    DictHas,
    DictGet,
    DictSet,
    DictRemove,
    StringToUpper,
    StringToLower,
    StringSplit,
    StringContains,
    Print,
    ToInt,
    ToFloat,
    ErrorMessage,
    ReadLine,
}

fn method(id: BuiltinId, name: &str, param_names: &[&str], param_types: Vec<Type>, result: Type, receiver: Type) -> BuiltinDescriptor {
    BuiltinDescriptor {
        id: id as u32,
        name: name.to_string(),
        param_names: param_names.iter().map(|s| s.to_string()).collect(),
        param_types,
        result_type: result,
        receiver_type: Some(receiver),
    }
}

fn free(id: BuiltinId, name: &str, param_names: &[&str], param_types: Vec<Type>, result: Type) -> BuiltinDescriptor {
    BuiltinDescriptor {
        id: id as u32,
        name: name.to_string(),
        param_names: param_names.iter().map(|s| s.to_string()).collect(),
        param_types,
        result_type: result,
        receiver_type: None,
    }
}

/// List/dict/string methods here carry placeholder element/value types
/// (`Type::Any`) - the checker re-derives the call's real signature per
/// receiver (`checker::expr::check_list_builtin_call` and friends), so only
/// `id`, `name`, and "does this name exist for this receiver kind" matter
/// for a lookup through this registry.
pub struct StdBuiltins;

impl BuiltinRegistry for StdBuiltins {
    fn free_functions(&self) -> Vec<BuiltinDescriptor> {
        vec![
            free(BuiltinId::Print, "print", &["value"], vec![Type::Any], Type::Void),
            free(BuiltinId::ToInt, "toInt", &["s"], vec![Type::String], Type::optional(Type::Int)),
            free(BuiltinId::ToFloat, "toFloat", &["s"], vec![Type::String], Type::optional(Type::Float)),
            free(BuiltinId::ErrorMessage, "errorMessage", &["e"], vec![Type::Error], Type::String),
            free(BuiltinId::ReadLine, "readLine", &[], vec![], Type::optional(Type::String)),
        ]
    }

    fn lookup_method(&self, receiver: &Type, name: &str) -> Option<BuiltinDescriptor> {
        match receiver {
            Type::List(_) => list_method(name),
            Type::Dict(_) => dict_method(name),
            Type::String => string_method(name),
            Type::Interface(_) => interface_method(name),
            _ => None,
        }
    }
}

/// The subset of built-in methods an `Interface`-typed receiver can resolve
/// to: just `length`, the only one this corpus needs to dispatch through an
/// interface (spec.md §8 scenario 6). The receiver type recorded here is a
/// placeholder - by the time a call reaches this path the checker has
/// already confirmed some concrete type satisfies the interface.
fn interface_method(name: &str) -> Option<BuiltinDescriptor> {
    match name {
        "length" => Some(method(BuiltinId::Length, "length", &[], vec![], Type::Int, Type::Any)),
        _ => None,
    }
}

fn list_method(name: &str) -> Option<BuiltinDescriptor> {
    let recv = Type::list_of([Type::Any]);
    Some(match name {
        "length" => method(BuiltinId::Length, "length", &[], vec![], Type::Int, recv),
        "get" => method(BuiltinId::ListGet, "get", &["index"], vec![Type::Int], Type::optional(Type::Any), recv),
        "push" => method(BuiltinId::ListPush, "push", &["value"], vec![Type::Any], Type::Void, recv),
        "pop" => method(BuiltinId::ListPop, "pop", &[], vec![], Type::optional(Type::Any), recv),
        "contains" => method(BuiltinId::ListContains, "contains", &["value"], vec![Type::Any], Type::Bool, recv),
        "map" => method(BuiltinId::ListMap, "map", &["f"], vec![Type::Func(vec![Type::Any], Box::new(Type::Any))], Type::list_of([Type::Any]), recv),
        "filter" => method(BuiltinId::ListFilter, "filter", &["f"], vec![Type::Func(vec![Type::Any], Box::new(Type::Bool))], recv.clone(), recv),
        _ => return None,
    })
}

fn dict_method(name: &str) -> Option<BuiltinDescriptor> {
    let recv = Type::dict(Type::Any);
    Some(match name {
        "length" => method(BuiltinId::Length, "length", &[], vec![], Type::Int, recv),
        "keys" => method(BuiltinId::DictKeys, "keys", &[], vec![], Type::list_of([Type::String]), recv),
        "values" => method(BuiltinId::DictValues, "values", &[], vec![], Type::list_of([Type::Any]), recv),
        "has" => method(BuiltinId::DictHas, "has", &["key"], vec![Type::String], Type::Bool, recv),
        "get" => method(BuiltinId::DictGet, "get", &["key"], vec![Type::String], Type::optional(Type::Any), recv),
        "set" => method(BuiltinId::DictSet, "set", &["key", "value"], vec![Type::String, Type::Any], Type::Void, recv.clone()),
        "remove" => method(BuiltinId::DictRemove, "remove", &["key"], vec![Type::String], Type::Void, recv),
        _ => return None,
    })
}

fn string_method(name: &str) -> Option<BuiltinDescriptor> {
    let recv = Type::String;
    Some(match name {
        "length" => method(BuiltinId::Length, "length", &[], vec![], Type::Int, recv),
        "toUpper" => method(BuiltinId::StringToUpper, "toUpper", &[], vec![], Type::String, recv),
        "toLower" => method(BuiltinId::StringToLower, "toLower", &[], vec![], Type::String, recv),
        "split" => method(BuiltinId::StringSplit, "split", &["sep"], vec![Type::String], Type::list_of([Type::String]), recv),
        "contains" => method(BuiltinId::StringContains, "contains", &["s"], vec![Type::String], Type::Bool, recv),
        _ => return None,
    })
}

/// Dispatches a `CallBuiltin` by numeric id. The checker and compiler never
/// see this function - they only ever go through [`StdBuiltins`] above; this
/// is purely the runtime half of the same built-in table.
pub fn call(id: u32, mut args: Vec<Value>, caller: &mut dyn ClosureCaller) -> Result<Value, RuntimeError> {
    let Some(id) = id_from_u32(id) else {
        return Err(RuntimeError::new(format!("unknown built-in id {id}")));
    };
    match id {
        // Shared across List/Dict/String (and anything typed as an
        // Interface that resolved to this id) - the concrete behavior comes
        // from the runtime value, not the static receiver type.
        BuiltinId::Length => match &args[0] {
            Value::List(list) => Ok(Value::Int(list.borrow().len() as i64)),
            Value::Dict(dict) => Ok(Value::Int(dict.borrow().len() as i64)),
            Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
            other => Err(RuntimeError::new(format!("length is not defined for `{}`", other.type_name()))),
        },
        BuiltinId::ListGet => {
            let list = as_list(args.remove(0))?;
            let index = as_int(args.remove(0))?;
            let list = list.borrow();
            Ok(usize::try_from(index).ok().and_then(|i| list.get(i).cloned()).map_or(Value::None, |v| Value::Some(Box::new(v))))
        }
        BuiltinId::ListPush => {
            let list = as_list(args.remove(0))?;
            let value = args.remove(0);
            list.borrow_mut().push(value);
            Ok(Value::None)
        }
        BuiltinId::ListPop => {
            let list = as_list(args.remove(0))?;
            Ok(list.borrow_mut().pop().map_or(Value::None, |v| Value::Some(Box::new(v))))
        }
        BuiltinId::ListContains => {
            let list = as_list(args.remove(0))?;
            let needle = args.remove(0);
            Ok(Value::Bool(list.borrow().iter().any(|v| Value::deep_eq(v, &needle))))
        }
        BuiltinId::ListMap => {
            let list = as_list(args.remove(0))?;
            let f = args.remove(0);
            let items = list.borrow().clone();
            let mut mapped = Vec::with_capacity(items.len());
            for item in items {
                mapped.push(caller.call_closure(f.clone(), vec![item])?);
            }
            Ok(Value::list(mapped))
        }
        BuiltinId::ListFilter => {
            let list = as_list(args.remove(0))?;
            let f = args.remove(0);
            let items = list.borrow().clone();
            let mut kept = Vec::new();
            for item in items {
                if caller.call_closure(f.clone(), vec![item.clone()])?.truthy() {
                    kept.push(item);
                }
            }
            Ok(Value::list(kept))
        }
        BuiltinId::DictKeys => {
            let dict = as_dict(args.remove(0))?;
            Ok(Value::list(dict.borrow().keys().map(|k| Value::string(k.clone())).collect()))
        }
        BuiltinId::DictValues => {
            let dict = as_dict(args.remove(0))?;
            Ok(Value::list(dict.borrow().values().cloned().collect()))
        }
        BuiltinId::DictHas => {
            let dict = as_dict(args.remove(0))?;
            let key = as_string(args.remove(0))?;
            Ok(Value::Bool(dict.borrow().contains_key(key.as_ref())))
        }
        BuiltinId::DictGet => {
            let dict = as_dict(args.remove(0))?;
            let key = as_string(args.remove(0))?;
            Ok(dict.borrow().get(key.as_ref()).cloned().map_or(Value::None, |v| Value::Some(Box::new(v))))
        }
        BuiltinId::DictSet => {
            let dict = as_dict(args.remove(0))?;
            let key = as_string(args.remove(0))?;
            let value = args.remove(0);
            dict.borrow_mut().insert(key.to_string(), value);
            Ok(Value::None)
        }
        BuiltinId::DictRemove => {
            let dict = as_dict(args.remove(0))?;
            let key = as_string(args.remove(0))?;
            dict.borrow_mut().shift_remove(key.as_ref());
            Ok(Value::None)
        }
        BuiltinId::StringToUpper => Ok(Value::string(as_string(args.remove(0))?.to_uppercase())),
        BuiltinId::StringToLower => Ok(Value::string(as_string(args.remove(0))?.to_lowercase())),
        BuiltinId::StringSplit => {
            let s = as_string(args.remove(0))?;
            let sep = as_string(args.remove(0))?;
            let parts = if sep.is_empty() {
                vec![Value::string(s.to_string())]
            } else {
                s.split(sep.as_ref()).map(Value::string).collect()
            };
            Ok(Value::list(parts))
        }
        BuiltinId::StringContains => {
            let s = as_string(args.remove(0))?;
            let needle = as_string(args.remove(0))?;
            Ok(Value::Bool(s.contains(needle.as_ref())))
        }
        BuiltinId::Print => {
            // Hooked up to `Environment::println` by the caller's
            // environment, not here - this dispatch table doesn't own
            // stdout. See `environment::StdEnvironment::call_builtin`.
            Err(RuntimeError::new("internal: print must be intercepted by the environment"))
        }
        BuiltinId::ToInt => {
            let s = as_string(args.remove(0))?;
            Ok(s.trim().parse::<i64>().map_or(Value::None, |v| Value::Some(Box::new(Value::Int(v)))))
        }
        BuiltinId::ToFloat => {
            let s = as_string(args.remove(0))?;
            Ok(s.trim().parse::<f64>().map_or(Value::None, |v| Value::Some(Box::new(Value::Float(v)))))
        }
        BuiltinId::ErrorMessage => match args.remove(0) {
            Value::Error { message } => Ok(Value::String(message)),
            other => Err(RuntimeError::new(format!("errorMessage expects an error, got `{}`", other.type_name()))),
        },
        BuiltinId::ReadLine => {
            // Hooked up to `Environment::readline` by the caller's
            // environment, not here - this dispatch table doesn't own
            // stdin. See `environment::StdEnvironment::call_builtin`.
            Err(RuntimeError::new("internal: readLine must be intercepted by the environment"))
        }
    }
}

fn id_from_u32(id: u32) -> Option<BuiltinId> {
    use BuiltinId::*;
    const ALL: &[BuiltinId] = &[
        Length, ListGet, ListPush, ListPop, ListContains, ListMap, ListFilter, DictKeys, DictValues, DictHas, DictGet, DictSet, DictRemove, StringToUpper, StringToLower, StringSplit,
        StringContains, Print, ToInt, ToFloat, ErrorMessage, ReadLine,
    ];
    ALL.iter().copied().find(|b| *b as u32 == id)
}

fn as_list(v: Value) -> Result<avenir_core::value::ListRef, RuntimeError> {
    match v {
        Value::List(l) => Ok(l),
        other => Err(RuntimeError::new(format!("expected a list, got `{}`", other.type_name()))),
    }
}

fn as_dict(v: Value) -> Result<avenir_core::value::DictRef, RuntimeError> {
    match v {
        Value::Dict(d) => Ok(d),
        other => Err(RuntimeError::new(format!("expected a dict, got `{}`", other.type_name()))),
    }
}

fn as_string(v: Value) -> Result<std::rc::Rc<str>, RuntimeError> {
    match v {
        Value::String(s) => Ok(s),
        other => Err(RuntimeError::new(format!("expected a string, got `{}`", other.type_name()))),
    }
}

fn as_int(v: Value) -> Result<i64, RuntimeError> {
    match v {
        Value::Int(i) => Ok(i),
        other => Err(RuntimeError::new(format!("expected an int, got `{}`", other.type_name()))),
    }
}
