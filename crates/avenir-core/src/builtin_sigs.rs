//! Parameter-name tables for the list/dict/string built-in methods
//! (SPEC_FULL.md §4.1 "Built-in method specialization detail").
//!
//! The checker (`checker::expr::check_list_builtin_call` and friends)
//! derives its own copy of these names to build each call's `FuncSig`
//! inline, since it also needs the per-call-site specialized types. The IR
//! compiler only needs the names (to bind named arguments the same way the
//! checker did); this module is the one place both sides would agree with
//! if they were unified, and is what the compiler consults directly.

/// Parameter names for `list.<member>`, receiver (`self`) not included.
pub fn list_method_param_names(member: &str) -> Vec<String> {
    match member {
        "length" | "pop" => vec![],
        "get" => vec!["index".into()],
        "push" => vec!["value".into()],
        "contains" => vec!["value".into()],
        "map" | "filter" => vec!["f".into()],
        _ => vec![],
    }
}

/// Parameter names for `dict.<member>`, receiver (`self`) not included.
pub fn dict_method_param_names(member: &str) -> Vec<String> {
    match member {
        "length" | "keys" | "values" => vec![],
        "has" => vec!["key".into()],
        "get" => vec!["key".into()],
        "set" => vec!["key".into(), "value".into()],
        "remove" => vec!["key".into()],
        _ => vec![],
    }
}

/// Parameter names for `string.<member>`, receiver (`self`) not included.
pub fn string_method_param_names(member: &str) -> Vec<String> {
    match member {
        "length" | "toUpper" | "toLower" => vec![],
        "split" => vec!["sep".into()],
        "contains" => vec!["s".into()],
        _ => vec![],
    }
}
