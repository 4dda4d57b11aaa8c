//! The compiled artifact (spec.md §3, §6): `Instruction`, `Opcode`,
//! `Chunk`, `Function`, the struct-type table, and the `Module` that ties
//! them together with an entry index.

use strum::{Display, EnumString, FromRepr};

/// The complete instruction set (spec.md §6), one variant per opcode.
/// `#[repr(u8)]` plus `FromRepr` gives us the serializer's `u8` tag for
/// free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, FromRepr)]
#[repr(u8)]
pub enum Opcode {
    Halt = 0,
    Const,
    LoadLocal,
    StoreLocal,
    Pop,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Negate,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Jump,
    JumpIfFalse,
    Call,
    CallValue,
    CallBuiltin,
    Return,
    MakeList,
    MakeDict,
    Index,
    MakeSome,
    MakeStruct,
    LoadField,
    StoreField,
    Stringify,
    ConcatString,
    BeginTry,
    EndTry,
    Throw,
    Closure,
    LoadUpvalue,
    StoreUpvalue,
    Not,
}

/// One bytecode instruction: two signed operands, semantics per opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: Opcode,
    pub a: i32,
    pub b: i32,
}

impl Instruction {
    pub fn new(op: Opcode, a: i32, b: i32) -> Self {
        Instruction { op, a, b }
    }

    pub fn simple(op: Opcode) -> Self {
        Instruction { op, a: 0, b: 0 }
    }

    pub fn one(op: Opcode, a: i32) -> Self {
        Instruction { op, a, b: 0 }
    }
}

/// Tagged constant-pool entry (spec.md §3).
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Bytes(Vec<u8>),
    None,
}

/// Which enclosing frame slot an upvalue refers to (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpvalueDesc {
    pub is_local: bool,
    pub index: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Chunk {
    pub code: Vec<Instruction>,
    pub const_pool: Vec<Constant>,
    pub num_locals: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub num_params: u32,
    pub chunk: Chunk,
    pub upvalues: Vec<UpvalueDesc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructTypeEntry {
    pub name: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Module {
    pub functions: Vec<Function>,
    pub struct_types: Vec<StructTypeEntry>,
    /// Index of the entry function, or `-1` if this module has none
    /// (spec.md §3).
    pub main_index: i32,
}

impl Module {
    pub fn main_function(&self) -> Option<&Function> {
        if self.main_index < 0 {
            return None;
        }
        self.functions.get(self.main_index as usize)
    }
}
