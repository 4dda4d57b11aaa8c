//! Structural interface satisfaction (spec.md §4.1, assignability rule 9).

use crate::types::{StructType, Type};

use super::Checker;

/// Whether `ty` - a basic type, list, dict, or anything else that isn't a
/// user struct - structurally satisfies `iface_fqn` through the host's
/// built-in methods (spec.md §8 scenario 6: `string` satisfies `interface
/// Length { fun length()|int }` via its built-in `length`). Interfaces are
/// satisfied by instance methods only (spec.md §4.1); built-in methods are
/// the basic-type equivalent, so they're the only thing consulted here.
pub fn satisfies_builtin(checker: &Checker<'_>, ty: &Type, iface_fqn: &str) -> bool {
    let Some(iface) = checker.interfaces.get(iface_fqn).or_else(|| checker.find_interface(iface_fqn)) else {
        return false;
    };
    iface.methods.iter().all(|im| match checker.builtins.lookup_method(ty, &im.name) {
        Some(desc) => {
            desc.param_types.len() == im.param_types.len()
                && desc.param_types.iter().zip(&im.param_types).all(|(a, b)| Type::equal(a, b))
                && Type::equal(&desc.result_type, &im.result)
        }
        None => false,
    })
}

/// Whether `st` structurally satisfies `iface`: every interface method must
/// have a same-named, same-signature instance method on the struct. The
/// visibility rule only bites when the interface itself is `pub` and the
/// struct lives in a different module - in that case the satisfying method
/// must itself be `pub` (spec.md §4.1 rule 9). A private interface imposes
/// no such restriction, even across modules.
pub fn satisfies(checker: &Checker<'_>, st: &StructType, iface_fqn: &str) -> bool {
    let Some(iface) = checker.interfaces.get(iface_fqn).or_else(|| checker.find_interface(iface_fqn)) else {
        return false;
    };
    iface.methods.iter().all(|im| {
        let Some(method) = st.instance_methods.get(&im.name) else {
            return false;
        };
        if iface.is_public && st.module != iface.defining_module && !method.is_public {
            return false;
        }
        method.param_types.len() == im.param_types.len()
            && method.param_types.iter().zip(&im.param_types).all(|(a, b)| Type::equal(a, b))
            && Type::equal(&method.result, &im.result)
    })
}
