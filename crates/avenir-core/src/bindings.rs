//! `Bindings`: the checker's output, consumed by the IR compiler
//! (spec.md §3).

use ahash::AHashMap;

use crate::ast::NodeId;
use crate::symbol::Symbol;
use crate::types::Type;

/// What a resolved member access points at. The IR compiler's member
/// lowering (spec.md §4.3) switches on this to decide which opcode to
/// emit.
#[derive(Debug, Clone)]
pub enum MemberTarget {
    /// `Type.method` - a static method; `struct_name` identifies the
    /// declaring struct.
    StaticMethod { struct_name: String, method: String },
    /// `value.field` on a struct value.
    Field { struct_name: String, field_index: usize },
    /// `value.method()` on a struct value - an instance method.
    InstanceMethod { struct_name: String, method: String },
    /// `module.name` - a public function or exported binding.
    ModuleMember { module: String, name: String },
    /// A method-like built-in dispatched on a basic/list/dict value.
    Builtin { builtin_id: u32 },
}

#[derive(Debug, Default)]
pub struct Bindings {
    pub idents: AHashMap<NodeId, Symbol>,
    pub members: AHashMap<NodeId, MemberTarget>,
    pub expr_types: AHashMap<NodeId, Type>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_type(&mut self, id: NodeId, ty: Type) {
        self.expr_types.insert(id, ty);
    }

    pub fn type_of(&self, id: NodeId) -> &Type {
        self.expr_types.get(&id).unwrap_or(&Type::Invalid)
    }

    pub fn record_ident(&mut self, id: NodeId, symbol: Symbol) {
        self.idents.insert(id, symbol);
    }

    pub fn record_member(&mut self, id: NodeId, target: MemberTarget) {
        self.members.insert(id, target);
    }
}
