//! On-disk byte format for a compiled [`Module`] (spec.md §4.5).
//!
//! Manual little-endian encoding (`result.extend_from_slice(&v.to_le_bytes())`)
//! rather than a serde-based format - this is a fixed wire layout, not a
//! general-purpose value encoding.
//!
//! Two magic numbers select the format: `AVC1` carries functions and the
//! constant pool only; `AVC2` additionally carries the struct-type table.
//! Neither version serializes upvalue descriptors or struct field names -
//! an inherited limitation of spec.md §4.5's byte layout, recorded in
//! DESIGN.md. A module built with closures or struct values round-trips
//! its *code* faithfully but loses that metadata, so `deserialize(serialize(m))
//! == m` only holds literally for closure-free, struct-free modules.

use std::fmt;

use crate::ir::{Chunk, Constant, Function, Instruction, Module, Opcode, StructTypeEntry};

const MAGIC_V1: &[u8; 4] = b"AVC1";
const MAGIC_V2: &[u8; 4] = b"AVC2";

const TAG_INT: u8 = 0;
const TAG_FLOAT: u8 = 1;
const TAG_STRING: u8 = 2;
const TAG_BOOL: u8 = 3;
const TAG_BYTES: u8 = 4;
const TAG_NONE: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializeError {
    pub message: String,
}

impl SerializeError {
    fn new(message: impl Into<String>) -> Self {
        SerializeError { message: message.into() }
    }
}

impl fmt::Display for SerializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SerializeError {}

/// Serializes `module` to `AVC2` bytes (includes the struct-type table).
pub fn serialize(module: &Module) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(MAGIC_V2);
    write_functions(&mut out, &module.functions);
    write_struct_types(&mut out, &module.struct_types);
    out.extend_from_slice(&module.main_index.to_le_bytes());
    out
}

pub fn deserialize(bytes: &[u8]) -> Result<Module, SerializeError> {
    let mut cursor = Cursor::new(bytes);
    let magic = cursor.take(4)?;
    let has_struct_types = if magic == MAGIC_V1.as_slice() {
        false
    } else if magic == MAGIC_V2.as_slice() {
        true
    } else {
        return Err(SerializeError::new("unrecognized module magic bytes"));
    };

    let functions = read_functions(&mut cursor)?;
    let struct_types = if has_struct_types { read_struct_types(&mut cursor)? } else { Vec::new() };
    let main_index = cursor.read_i32()?;

    Ok(Module { functions, struct_types, main_index })
}

fn write_functions(out: &mut Vec<u8>, functions: &[Function]) {
    out.extend_from_slice(&u32::try_from(functions.len()).unwrap_or(u32::MAX).to_le_bytes());
    for f in functions {
        write_string_u16(out, &f.name);
        out.extend_from_slice(&f.num_params.to_le_bytes());
        out.extend_from_slice(&f.chunk.num_locals.to_le_bytes());
        write_const_pool(out, &f.chunk.const_pool);
        write_code(out, &f.chunk.code);
    }
}

fn write_const_pool(out: &mut Vec<u8>, pool: &[Constant]) {
    out.extend_from_slice(&u32::try_from(pool.len()).unwrap_or(u32::MAX).to_le_bytes());
    for c in pool {
        match c {
            Constant::Int(v) => {
                out.push(TAG_INT);
                out.extend_from_slice(&v.to_le_bytes());
            }
            Constant::Float(v) => {
                out.push(TAG_FLOAT);
                out.extend_from_slice(&v.to_le_bytes());
            }
            Constant::String(s) => {
                out.push(TAG_STRING);
                write_string_u32(out, s);
            }
            Constant::Bool(b) => {
                out.push(TAG_BOOL);
                out.push(u8::from(*b));
            }
            Constant::Bytes(b) => {
                out.push(TAG_BYTES);
                out.extend_from_slice(&u32::try_from(b.len()).unwrap_or(u32::MAX).to_le_bytes());
                out.extend_from_slice(b);
            }
            Constant::None => out.push(TAG_NONE),
        }
    }
}

fn write_code(out: &mut Vec<u8>, code: &[Instruction]) {
    out.extend_from_slice(&u32::try_from(code.len()).unwrap_or(u32::MAX).to_le_bytes());
    for instr in code {
        out.push(instr.op as u8);
        out.extend_from_slice(&instr.a.to_le_bytes());
        out.extend_from_slice(&instr.b.to_le_bytes());
    }
}

fn write_struct_types(out: &mut Vec<u8>, types: &[StructTypeEntry]) {
    out.extend_from_slice(&u32::try_from(types.len()).unwrap_or(u32::MAX).to_le_bytes());
    for t in types {
        write_string_u16(out, &t.name);
    }
}

fn write_string_u16(out: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    out.extend_from_slice(&u16::try_from(bytes.len()).unwrap_or(u16::MAX).to_le_bytes());
    out.extend_from_slice(bytes);
}

fn write_string_u32(out: &mut Vec<u8>, s: &str) {
    let bytes = s.as_bytes();
    out.extend_from_slice(&u32::try_from(bytes.len()).unwrap_or(u32::MAX).to_le_bytes());
    out.extend_from_slice(bytes);
}

fn read_functions(cursor: &mut Cursor<'_>) -> Result<Vec<Function>, SerializeError> {
    let count = cursor.read_u32()?;
    let mut functions = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = cursor.read_string_u16()?;
        let num_params = cursor.read_u32()?;
        let num_locals = cursor.read_u32()?;
        let const_pool = read_const_pool(cursor)?;
        let code = read_code(cursor)?;
        functions.push(Function { name, num_params, chunk: Chunk { code, const_pool, num_locals }, upvalues: Vec::new() });
    }
    Ok(functions)
}

fn read_const_pool(cursor: &mut Cursor<'_>) -> Result<Vec<Constant>, SerializeError> {
    let count = cursor.read_u32()?;
    let mut pool = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let tag = cursor.take(1)?[0];
        let c = match tag {
            TAG_INT => Constant::Int(cursor.read_i64()?),
            TAG_FLOAT => Constant::Float(cursor.read_f64()?),
            TAG_STRING => Constant::String(cursor.read_string_u32()?),
            TAG_BOOL => Constant::Bool(cursor.take(1)?[0] != 0),
            TAG_BYTES => {
                let len = cursor.read_u32()? as usize;
                Constant::Bytes(cursor.take(len)?.to_vec())
            }
            TAG_NONE => Constant::None,
            other => return Err(SerializeError::new(format!("unknown constant tag {other}"))),
        };
        pool.push(c);
    }
    Ok(pool)
}

fn read_code(cursor: &mut Cursor<'_>) -> Result<Vec<Instruction>, SerializeError> {
    let count = cursor.read_u32()?;
    let mut code = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let op_byte = cursor.take(1)?[0];
        let op = Opcode::from_repr(op_byte).ok_or_else(|| SerializeError::new(format!("unknown opcode byte {op_byte}")))?;
        let a = cursor.read_i32()?;
        let b = cursor.read_i32()?;
        code.push(Instruction { op, a, b });
    }
    Ok(code)
}

fn read_struct_types(cursor: &mut Cursor<'_>) -> Result<Vec<StructTypeEntry>, SerializeError> {
    let count = cursor.read_u32()?;
    let mut types = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let name = cursor.read_string_u16()?;
        types.push(StructTypeEntry { name, fields: Vec::new() });
    }
    Ok(types)
}

/// A slice-backed reader tracking its own position; every read checks
/// bounds up front instead of panicking on a truncated buffer.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Cursor { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], SerializeError> {
        let end = self.pos.checked_add(n).ok_or_else(|| SerializeError::new("module bytes truncated"))?;
        let slice = self.bytes.get(self.pos..end).ok_or_else(|| SerializeError::new("module bytes truncated"))?;
        self.pos = end;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32, SerializeError> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().expect("take(4) returns 4 bytes")))
    }

    fn read_i32(&mut self) -> Result<i32, SerializeError> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().expect("take(4) returns 4 bytes")))
    }

    fn read_i64(&mut self) -> Result<i64, SerializeError> {
        Ok(i64::from_le_bytes(self.take(8)?.try_into().expect("take(8) returns 8 bytes")))
    }

    fn read_f64(&mut self) -> Result<f64, SerializeError> {
        Ok(f64::from_le_bytes(self.take(8)?.try_into().expect("take(8) returns 8 bytes")))
    }

    fn read_string_u16(&mut self) -> Result<String, SerializeError> {
        let len = u16::from_le_bytes(self.take(2)?.try_into().expect("take(2) returns 2 bytes"));
        let bytes = self.take(len as usize)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| SerializeError::new("module string is not valid UTF-8"))
    }

    fn read_string_u32(&mut self) -> Result<String, SerializeError> {
        let len = self.read_u32()?;
        let bytes = self.take(len as usize)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| SerializeError::new("module string is not valid UTF-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::UpvalueDesc;

    fn sample_module() -> Module {
        let chunk = Chunk {
            code: vec![Instruction::one(Opcode::Const, 0), Instruction::simple(Opcode::Return)],
            const_pool: vec![Constant::Int(42), Constant::String("hi".to_string())],
            num_locals: 1,
        };
        Module { functions: vec![Function { name: "main".to_string(), num_params: 0, chunk, upvalues: Vec::new() }], struct_types: Vec::new(), main_index: 0 }
    }

    #[test]
    fn round_trip_closure_free_module() {
        let module = sample_module();
        let bytes = serialize(&module);
        assert_eq!(bytes[..4], *MAGIC_V2);
        let decoded = deserialize(&bytes).expect("valid module bytes decode");
        assert_eq!(decoded, module);
    }

    #[test]
    fn rejects_bad_magic() {
        let err = deserialize(b"xxxx").unwrap_err();
        assert!(err.message.contains("magic"));
    }

    #[test]
    fn rejects_truncated_buffer() {
        let module = sample_module();
        let mut bytes = serialize(&module);
        bytes.truncate(bytes.len() - 2);
        assert!(deserialize(&bytes).is_err());
    }

    #[test]
    fn upvalues_and_struct_fields_are_not_preserved() {
        let mut module = sample_module();
        module.functions[0].upvalues.push(UpvalueDesc { is_local: true, index: 0 });
        let bytes = serialize(&module);
        let decoded = deserialize(&bytes).expect("valid module bytes decode");
        assert!(decoded.functions[0].upvalues.is_empty());
        assert_ne!(decoded, module);
    }
}
