//! Host-side interfaces (spec.md §6): the built-in registry and the
//! runtime environment. These are named interfaces only - the actual
//! built-in implementations and I/O live with the host.

use crate::types::Type;
use crate::value::Value;
use crate::vm::RuntimeError;

/// Describes one registered built-in for the checker and compiler.
/// `param_names` drives named-argument binding (spec.md §4.1); `receiver`
/// is `Some` for method-like built-ins (dispatched on a basic/list/dict
/// value) and `None` for free functions.
#[derive(Debug, Clone)]
pub struct BuiltinDescriptor {
    pub id: u32,
    pub name: String,
    pub param_names: Vec<String>,
    pub param_types: Vec<Type>,
    pub result_type: Type,
    pub receiver_type: Option<Type>,
}

/// Host-supplied table of built-ins, queried by the checker's declaration
/// phase (spec.md §4.1, Phase 1) and by the IR compiler's call lowering.
pub trait BuiltinRegistry {
    /// All built-ins with no receiver type - candidates for free-function
    /// registration.
    fn free_functions(&self) -> Vec<BuiltinDescriptor>;

    /// Looks up a method-like built-in by receiver type and name (e.g.
    /// `list.map`, `dict.get`, `string.length`).
    fn lookup_method(&self, receiver: &Type, name: &str) -> Option<BuiltinDescriptor>;

    fn lookup_free(&self, name: &str) -> Option<BuiltinDescriptor> {
        self.free_functions().into_iter().find(|d| d.name == name)
    }
}

/// Lets a built-in's implementation call back into user closures (e.g.
/// `list.map(fn)`), re-entering the VM's call protocol (spec.md §4.4).
pub trait ClosureCaller {
    fn call_closure(&mut self, closure: Value, args: Vec<Value>) -> Result<Value, RuntimeError>;
}

/// The host environment passed to the VM at `run` time (spec.md §6).
pub trait Environment {
    fn println(&mut self, s: &str);
    fn readline(&mut self) -> Option<String>;

    /// Invokes built-in `id` with `args`, in a context where it may call
    /// back into user closures via `caller`.
    fn call_builtin(
        &mut self,
        id: u32,
        args: Vec<Value>,
        caller: &mut dyn ClosureCaller,
    ) -> Result<Value, RuntimeError>;

    /// Struct type names for pretty-printing struct values.
    fn struct_type_name(&self, type_index: u32) -> &str;
}
