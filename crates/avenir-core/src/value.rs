//! Runtime values (spec.md §3). Structs, lists, and dicts are
//! heap-allocated and shared by reference (mutating through one alias is
//! visible through all aliases); upvalue cells are reference-shared across
//! every closure that captures the same variable through the same chain
//! step.
//!
//! This core has no GC beyond the host language's (spec.md §1 non-goals),
//! so `Rc<RefCell<_>>` gives the same aliasing semantics a heap-arena
//! design would, with no extra bookkeeping.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A struct instance: its type-table index plus its field slots, in
/// declaration order (matching `StructType::fields`).
#[derive(Debug)]
pub struct StructInstance {
    pub type_index: u32,
    pub fields: Vec<Value>,
}

pub type StructRef = Rc<RefCell<StructInstance>>;
pub type ListRef = Rc<RefCell<Vec<Value>>>;
pub type DictRef = Rc<RefCell<indexmap::IndexMap<String, Value>>>;

/// An upvalue cell. Open cells alias a live stack slot (by frame-relative
/// index); closed cells hold a copied value after the owning frame
/// returned. Multiple closures may share the same `Rc<RefCell<UpvalueCell>>`
/// - that sharing is what makes mutation through a captured variable
/// visible to every closure that captured it via the same hop.
#[derive(Debug)]
pub enum UpvalueCell {
    Open { stack_index: usize },
    Closed { value: Value },
}

pub type UpvalueRef = Rc<RefCell<UpvalueCell>>;

#[derive(Debug)]
pub struct ClosureObj {
    pub function_index: usize,
    pub upvalues: Vec<UpvalueRef>,
}

pub type ClosureRef = Rc<ClosureObj>;

#[derive(Debug, Clone)]
pub enum Value {
    Int(i64),
    Float(f64),
    String(Rc<str>),
    Bool(bool),
    Bytes(Rc<[u8]>),
    None,
    Some(Box<Value>),
    List(ListRef),
    Dict(DictRef),
    Struct(StructRef),
    Error { message: Rc<str> },
    Closure(ClosureRef),
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Value {
        Value::String(s.into())
    }

    pub fn error(message: impl Into<Rc<str>>) -> Value {
        Value::Error { message: message.into() }
    }

    pub fn list(items: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn dict(entries: indexmap::IndexMap<String, Value>) -> Value {
        Value::Dict(Rc::new(RefCell::new(entries)))
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            _ => true,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error { .. })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bool(_) => "bool",
            Value::Bytes(_) => "bytes",
            Value::None => "none",
            Value::Some(_) => "optional",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Struct(_) => "struct",
            Value::Error { .. } => "error",
            Value::Closure(_) => "closure",
        }
    }

    /// Deep structural equality for lists/dicts/bytes, key-value equality
    /// for dicts (order-insensitive), function-identity for closures
    /// (spec.md §4.4).
    pub fn deep_eq(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Int(x), Value::Int(y)) => x == y,
            (Value::Float(x), Value::Float(y)) => x == y,
            (Value::Int(x), Value::Float(y)) | (Value::Float(y), Value::Int(x)) => {
                (*x as f64) == *y
            }
            (Value::String(x), Value::String(y)) => x == y,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::Bytes(x), Value::Bytes(y)) => x == y,
            (Value::None, Value::None) => true,
            (Value::Some(x), Value::Some(y)) => Value::deep_eq(x, y),
            (Value::List(x), Value::List(y)) => {
                if Rc::ptr_eq(x, y) {
                    return true;
                }
                let (xs, ys) = (x.borrow(), y.borrow());
                xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(a, b)| Value::deep_eq(a, b))
            }
            (Value::Dict(x), Value::Dict(y)) => {
                if Rc::ptr_eq(x, y) {
                    return true;
                }
                let (xs, ys) = (x.borrow(), y.borrow());
                xs.len() == ys.len()
                    && xs.iter().all(|(k, v)| ys.get(k).is_some_and(|v2| Value::deep_eq(v, v2)))
            }
            (Value::Struct(x), Value::Struct(y)) => {
                if Rc::ptr_eq(x, y) {
                    return true;
                }
                let (xs, ys) = (x.borrow(), y.borrow());
                xs.type_index == ys.type_index
                    && xs.fields.len() == ys.fields.len()
                    && xs.fields.iter().zip(ys.fields.iter()).all(|(a, b)| Value::deep_eq(a, b))
            }
            (Value::Error { message: x }, Value::Error { message: y }) => x == y,
            (Value::Closure(x), Value::Closure(y)) => x.function_index == y.function_index,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::String(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Bytes(v) => write!(f, "{v:?}"),
            Value::None => write!(f, "none"),
            Value::Some(v) => write!(f, "some({v})"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, v) in items.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
            Value::Dict(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Struct(s) => write!(f, "<struct #{}>", s.borrow().type_index),
            Value::Error { message } => write!(f, "error({message})"),
            Value::Closure(c) => write!(f, "<closure fn#{}>", c.function_index),
        }
    }
}
