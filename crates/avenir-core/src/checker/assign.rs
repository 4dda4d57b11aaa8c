//! The assignability predicate `dst ← src` (spec.md §4.1). Drives var-decl
//! initializers, assignments, call-argument checking, and return statements.

use crate::types::Type;

use super::interfaces;
use super::Checker;

/// Whether a value of type `src` may be used where `dst` is expected.
/// Deliberately one-directional and asymmetric - `assignable(a, b)` says
/// nothing about `assignable(b, a)`.
pub fn assignable(checker: &Checker<'_>, dst: &Type, src: &Type) -> bool {
    // Rule 1: `Invalid` suppresses further errors in either position.
    if matches!(dst, Type::Invalid) || matches!(src, Type::Invalid) {
        return true;
    }
    // Rule 2: identical types.
    if Type::equal(dst, src) {
        return true;
    }
    // Rule 3: int widens to float, never the reverse.
    if matches!(dst, Type::Float) && matches!(src, Type::Int) {
        return true;
    }
    // Rule 4: `Any` on either side is vacuously compatible - either anything
    // is assignable to `Any`, or an `Any`-typed source may flow anywhere.
    if matches!(dst, Type::Any) || matches!(src, Type::Any) {
        return true;
    }
    // Rule 5: `None` fits any optional; a bare `T` fits `T?`; `T1?` fits
    // `T2?` when `T1` fits `T2`. A bare `None` literal types as
    // `Optional(Invalid)` (see `checker::expr`), so the recursive call below
    // hits rule 1 and accepts it regardless of `inner`.
    if let Type::Optional(inner) = dst {
        if let Type::Optional(src_inner) = src {
            return assignable(checker, inner, src_inner);
        }
        return assignable(checker, inner, src);
    }
    // Rule 6: list element types are covariant - every observed source
    // element variant must fit some destination variant.
    if let (Type::List(dst_elems), Type::List(src_elems)) = (dst, src) {
        return src_elems.iter().all(|se| dst_elems.iter().any(|de| assignable(checker, de, se)));
    }
    // Rule 7: dict values are covariant, keys are always string.
    if let (Type::Dict(dst_v), Type::Dict(src_v)) = (dst, src) {
        return assignable(checker, dst_v, src_v);
    }
    // Rule 8: a union destination accepts anything that fits at least one
    // of its variants; a union source must have every variant accepted.
    if let Type::Union(dst_variants) = dst {
        let src_variants = src.variants();
        return src_variants.iter().all(|sv| dst_variants.iter().any(|dv| assignable(checker, dv, sv)));
    }
    // Rule 9: a struct satisfies an interface structurally; so does any
    // other type whose methods - here, the host's built-in methods - cover
    // the interface's required set (spec.md §8 scenario 6: a bare `string`
    // satisfies an interface via its built-in `length`).
    if let Type::Interface(iface_fqn) = dst {
        return match src {
            Type::Struct(struct_fqn) => match checker.structs.get(struct_fqn) {
                Some(st) => interfaces::satisfies(checker, st, iface_fqn),
                None => false,
            },
            _ => interfaces::satisfies_builtin(checker, src, iface_fqn),
        };
    }
    // Rule 10: function types are invariant in params and result.
    if let (Type::Func(dp, dr), Type::Func(sp, sr)) = (dst, src) {
        return dp.len() == sp.len()
            && dp.iter().zip(sp).all(|(d, s)| Type::equal(d, s))
            && Type::equal(dr, sr);
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{BuiltinDescriptor, BuiltinRegistry};
    use crate::symbol::World;

    struct NoBuiltins;
    impl BuiltinRegistry for NoBuiltins {
        fn free_functions(&self) -> Vec<BuiltinDescriptor> {
            Vec::new()
        }
        fn lookup_method(&self, _receiver: &Type, _name: &str) -> Option<BuiltinDescriptor> {
            None
        }
    }

    fn empty_checker() -> (World, NoBuiltins) {
        (World::new("main"), NoBuiltins)
    }

    fn mk<'a>(world: &'a World, builtins: &'a NoBuiltins) -> Checker<'a> {
        Checker {
            world,
            builtins,
            structs: Default::default(),
            interfaces: Default::default(),
            funcs: Default::default(),
            module_scopes: Default::default(),
            bindings: crate::bindings::Bindings::new(),
            diagnostics: crate::diagnostics::CheckError::default(),
        }
    }

    #[test]
    fn int_widens_to_float() {
        let (world, b) = empty_checker();
        let c = mk(&world, &b);
        assert!(assignable(&c, &Type::Float, &Type::Int));
        assert!(!assignable(&c, &Type::Int, &Type::Float));
    }

    #[test]
    fn none_fits_optional() {
        let (world, b) = empty_checker();
        let c = mk(&world, &b);
        assert!(assignable(&c, &Type::optional(Type::Int), &Type::optional(Type::Invalid)));
        assert!(assignable(&c, &Type::optional(Type::Int), &Type::Int));
    }

    #[test]
    fn union_destination_accepts_any_matching_variant() {
        let (world, b) = empty_checker();
        let c = mk(&world, &b);
        let dst = Type::union([Type::Int, Type::String]);
        assert!(assignable(&c, &dst, &Type::Int));
        assert!(assignable(&c, &dst, &Type::String));
        assert!(!assignable(&c, &dst, &Type::Bool));
    }

    #[test]
    fn anything_fits_any() {
        let (world, b) = empty_checker();
        let c = mk(&world, &b);
        assert!(assignable(&c, &Type::Any, &Type::Struct("Point".into())));
    }

    #[test]
    fn any_fits_anything() {
        let (world, b) = empty_checker();
        let c = mk(&world, &b);
        assert!(assignable(&c, &Type::Int, &Type::Any));
        assert!(assignable(&c, &Type::Struct("Point".into()), &Type::Any));
    }
}
