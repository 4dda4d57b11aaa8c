//! The type lattice: structural tags over a closed variant set, plus the
//! assignability predicate that drives every check in [`crate::checker`].

use std::collections::BTreeSet;
use std::fmt;

/// A struct's instance or static method table, keyed by method name.
pub type MethodTable = indexmap::IndexMap<String, FuncSig>;

/// The signature the checker cares about for a method or free function:
/// parameter types (receiver already dropped for instance methods) and a
/// result type. Used both for interface satisfaction and for call checking.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncSig {
    pub param_names: Vec<String>,
    pub param_types: Vec<Type>,
    pub param_defaults: Vec<bool>,
    pub result: Type,
    pub is_public: bool,
}

/// A struct type: nominal, carries its field layout (declaration order
/// matters for `OpMakeStruct`) and its two method maps.
#[derive(Debug, Clone)]
pub struct StructType {
    pub name: String,
    pub is_public: bool,
    pub is_mutable: bool,
    /// Declaration-order field list; index here is the field index used by
    /// `OpLoadField`/`OpStoreField`.
    pub fields: Vec<StructField>,
    pub instance_methods: MethodTable,
    pub static_methods: MethodTable,
    /// Module that declared this struct; used by the interface visibility
    /// rule (assignability rule 9 in spec.md §4.1).
    pub module: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub name: String,
    pub ty: Type,
    pub is_public: bool,
    /// Whether this field has a default value, so a struct literal may omit
    /// it (spec.md §4.1).
    pub has_default: bool,
}

impl StructType {
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// An interface type: nominal, structural satisfaction (see
/// `crate::checker::interfaces`).
#[derive(Debug, Clone)]
pub struct InterfaceType {
    pub name: String,
    pub is_public: bool,
    pub defining_module: String,
    pub methods: Vec<InterfaceMethod>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterfaceMethod {
    pub name: String,
    pub param_types: Vec<Type>,
    pub result: Type,
}

/// The full type lattice. `Struct`/`Interface` only carry a name for
/// equality/hashing; the actual shape lives in the checker's type tables
/// (`Checker::structs`/`interfaces`) and is looked up by name when needed.
/// Carrying `Rc` here would make `Type` self-referential through the method
/// tables, which isn't needed: equality and assignability only ever need
/// the name plus an occasional lookup the caller already has in scope.
#[derive(Debug, Clone)]
pub enum Type {
    Int,
    Float,
    String,
    Bool,
    Void,
    Any,
    Error,
    Bytes,
    /// Set of observed element types, order-insensitive and de-duplicated.
    List(Vec<Type>),
    Dict(Box<Type>),
    Optional(Box<Type>),
    /// Flattened, >=1 variant, order-insensitive equality.
    Union(Vec<Type>),
    Func(Vec<Type>, Box<Type>),
    Struct(String),
    Interface(String),
    /// Sentinel: any operation touching it succeeds vacuously.
    Invalid,
}

impl Type {
    pub fn optional(inner: Type) -> Type {
        Type::Optional(Box::new(inner))
    }

    pub fn dict(value: Type) -> Type {
        Type::Dict(Box::new(value))
    }

    pub fn list_of(elements: impl IntoIterator<Item = Type>) -> Type {
        Type::List(dedup_variants(elements.into_iter().collect()))
    }

    /// Builds a `Union`, flattening nested unions and de-duplicating.
    pub fn union(variants: impl IntoIterator<Item = Type>) -> Type {
        let mut flat = Vec::new();
        for v in variants {
            match v {
                Type::Union(vs) => flat.extend(vs),
                other => flat.push(other),
            }
        }
        let flat = dedup_variants(flat);
        match flat.len() {
            0 => Type::Invalid,
            1 => flat.into_iter().next().unwrap(),
            _ => Type::Union(flat),
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Int | Type::Float)
    }

    pub fn is_union(&self) -> bool {
        matches!(self, Type::Union(_))
    }

    pub fn variants(&self) -> Vec<&Type> {
        match self {
            Type::Union(vs) => vs.iter().collect(),
            other => vec![other],
        }
    }
}

/// De-duplicates a variant list by structural equality, preserving first
/// occurrence order (order is insignificant per spec.md §3, but stable
/// output keeps diagnostics and serialized fixtures deterministic).
fn dedup_variants(items: Vec<Type>) -> Vec<Type> {
    let mut out: Vec<Type> = Vec::with_capacity(items.len());
    for item in items {
        if !out.iter().any(|existing| Type::equal(existing, &item)) {
            out.push(item);
        }
    }
    out
}

impl Type {
    /// Structural equality: `Struct`/`Interface` compare by name (nominal);
    /// `Union`/`List` compare as sets (order-insensitive).
    pub fn equal(a: &Type, b: &Type) -> bool {
        use Type::*;
        match (a, b) {
            (Int, Int) | (Float, Float) | (String, String) | (Bool, Bool) | (Void, Void)
            | (Any, Any) | (Error, Error) | (Bytes, Bytes) | (Invalid, Invalid) => true,
            (Struct(n1), Struct(n2)) | (Interface(n1), Interface(n2)) => n1 == n2,
            (Optional(i1), Optional(i2)) => Type::equal(i1, i2),
            (Dict(v1), Dict(v2)) => Type::equal(v1, v2),
            (List(e1), List(e2)) => {
                e1.len() == e2.len()
                    && e1.iter().all(|x| e2.iter().any(|y| Type::equal(x, y)))
            }
            (Union(v1), Union(v2)) => {
                v1.len() == v2.len() && v1.iter().all(|x| v2.iter().any(|y| Type::equal(x, y)))
            }
            (Func(p1, r1), Func(p2, r2)) => {
                p1.len() == p2.len()
                    && p1.iter().zip(p2).all(|(x, y)| Type::equal(x, y))
                    && Type::equal(r1, r2)
            }
            _ => false,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::String => write!(f, "string"),
            Type::Bool => write!(f, "bool"),
            Type::Void => write!(f, "void"),
            Type::Any => write!(f, "any"),
            Type::Error => write!(f, "error"),
            Type::Bytes => write!(f, "bytes"),
            Type::Invalid => write!(f, "<invalid>"),
            Type::Struct(n) | Type::Interface(n) => write!(f, "{n}"),
            Type::Optional(inner) => write!(f, "{inner}?"),
            Type::Dict(v) => write!(f, "dict<{v}>"),
            Type::List(elems) => {
                let names: BTreeSet<String> = elems.iter().map(|t| t.to_string()).collect();
                write!(f, "list<{}>", names.into_iter().collect::<Vec<_>>().join("|"))
            }
            Type::Union(vs) => {
                write!(f, "{}", vs.iter().map(ToString::to_string).collect::<Vec<_>>().join("|"))
            }
            Type::Func(params, ret) => {
                write!(f, "fun(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") | {ret}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_flattens_and_dedups() {
        let u = Type::union([Type::Int, Type::union([Type::String, Type::Int])]);
        match u {
            Type::Union(vs) => assert_eq!(vs.len(), 2),
            other => panic!("expected union, got {other:?}"),
        }
    }

    #[test]
    fn list_equality_is_order_insensitive() {
        let a = Type::list_of([Type::Int, Type::String]);
        let b = Type::list_of([Type::String, Type::Int]);
        assert!(Type::equal(&a, &b));
    }

    #[test]
    fn struct_equality_is_nominal() {
        assert!(Type::equal(&Type::Struct("Point".into()), &Type::Struct("Point".into())));
        assert!(!Type::equal(&Type::Struct("Point".into()), &Type::Struct("Vec2".into())));
    }
}
