//! The IR compiler (spec.md §4.3): lowers a checked, resolved `World` into
//! an [`ir::Module`](crate::ir::Module).
//!
//! Two-phase like the checker: first every top-level function and every
//! struct method is reserved a function-table index (so forward references,
//! mutual recursion, and methods calling each other all resolve regardless
//! of declaration order), then each body is compiled against the already-
//! complete index tables. Nested `FuncLit`s get their index allocated the
//! moment the compiler encounters them, depth-first, during body
//! compilation - they have no forward-reference problem since closures
//! can't be called before they're constructed.

mod builder;
mod expr;
mod stmt;

use ahash::AHashMap;

use crate::ast::{Expr, FieldDecl, FunDecl};
use crate::environment::BuiltinRegistry;
use crate::bindings::Bindings;
use crate::ir;
use crate::resolver::{FunctionInfo, Resolver};
use crate::symbol::World;

use builder::ChunkBuilder;

/// Per-function binding info the compiler needs beyond what the resolver
/// already computed: parameter names (for named-argument binding at call
/// sites) and default expressions (for call lowering's "insert defaults for
/// missing slots" - spec.md §4.3). Keyed by function index, not node id,
/// since every call-lowering site already has the index in hand.
#[derive(Clone)]
struct FnMeta {
    param_names: Vec<String>,
    param_defaults: Vec<Option<Expr>>,
}

/// Declaration-order field layout for one struct, needed by struct-literal
/// lowering (spec.md §4.3 "for each field in the struct's declaration
/// order, emit either the provided expression or its default").
#[derive(Clone)]
struct StructMeta {
    decl_fields: Vec<FieldDecl>,
}

pub struct Compiler<'a> {
    world: &'a World,
    bindings: &'a Bindings,
    builtins: &'a dyn BuiltinRegistry,
    resolvers: AHashMap<String, Resolver>,
    struct_index: AHashMap<String, u32>,
    struct_meta: AHashMap<String, StructMeta>,
    /// Top-level function node id -> function-table index, used to tell a
    /// user-defined function symbol apart from a built-in free function
    /// (spec.md §3: `declaring_node` is `0` for built-ins).
    function_by_node: AHashMap<u32, u32>,
    /// `(module_fqn, function_name) -> index`, for module-member function
    /// references (`MemberTarget::ModuleMember`).
    top_fn_index: AHashMap<(String, String), u32>,
    /// `(struct_fqn, method_name, is_static) -> index`.
    method_index: AHashMap<(String, String, bool), u32>,
    fn_meta: AHashMap<u32, FnMeta>,
    functions: Vec<ir::Function>,
    /// Cached id of the list `length` built-in, used by `for-each` lowering
    /// (spec.md §4.3: "for-each... uses the built-in length").
    length_builtin_id: u32,
}

/// Lowers a fully checked `World` into an `ir::Module` (spec.md §2 stage 2).
pub fn compile_world(world: &World, bindings: &Bindings, builtins: &dyn BuiltinRegistry) -> ir::Module {
    let mut compiler = Compiler {
        world,
        bindings,
        builtins,
        resolvers: AHashMap::new(),
        struct_index: AHashMap::new(),
        struct_meta: AHashMap::new(),
        function_by_node: AHashMap::new(),
        top_fn_index: AHashMap::new(),
        method_index: AHashMap::new(),
        fn_meta: AHashMap::new(),
        functions: Vec::new(),
        length_builtin_id: 0,
    };
    compiler.length_builtin_id = builtins
        .lookup_method(&crate::types::Type::List(vec![]), "length")
        .map(|d| d.id)
        .unwrap_or(0);

    let mut struct_types = Vec::new();
    let mut reserved_methods: Vec<(String, FunDecl)> = Vec::new();

    for (fqn, minfo) in &world.modules {
        compiler.resolvers.insert(fqn.clone(), Resolver::analyze(&minfo.program));

        for f in &minfo.program.functions {
            let idx = compiler.functions.len() as u32;
            compiler.functions.push(ir::Function {
                name: f.name.clone(),
                num_params: f.params.len() as u32,
                chunk: ir::Chunk::default(),
                upvalues: Vec::new(),
            });
            compiler.function_by_node.insert(f.id.0, idx);
            compiler.top_fn_index.insert((fqn.clone(), f.name.clone()), idx);
            compiler.fn_meta.insert(idx, fn_meta_of(f));
        }

        for sd in &minfo.program.structs {
            let struct_fqn = format!("{fqn}/{}", sd.name);
            let struct_type_idx = struct_types.len() as u32;
            struct_types.push(ir::StructTypeEntry {
                name: sd.name.clone(),
                fields: sd.fields.iter().map(|f| f.name.clone()).collect(),
            });
            compiler.struct_index.insert(struct_fqn.clone(), struct_type_idx);
            compiler.struct_meta.insert(struct_fqn.clone(), StructMeta { decl_fields: sd.fields.clone() });

            for m in &sd.methods {
                let idx = compiler.functions.len() as u32;
                let num_params = m.fun.params.len() as u32 + u32::from(!m.is_static);
                compiler.functions.push(ir::Function {
                    name: format!("{}.{}", sd.name, m.fun.name),
                    num_params,
                    chunk: ir::Chunk::default(),
                    upvalues: Vec::new(),
                });
                compiler.function_by_node.insert(m.fun.id.0, idx);
                compiler.method_index.insert((struct_fqn.clone(), m.fun.name.clone(), m.is_static), idx);
                compiler.fn_meta.insert(idx, fn_meta_of(&m.fun));
                reserved_methods.push((fqn.clone(), m.fun.clone()));
            }
        }
    }

    for (fqn, minfo) in &world.modules {
        for f in &minfo.program.functions {
            let idx = compiler.function_by_node[&f.id.0];
            compiler.compile_body(idx, fqn, f);
        }
    }
    for (fqn, m) in &reserved_methods {
        let idx = compiler.function_by_node[&m.id.0];
        compiler.compile_body(idx, fqn, m);
    }

    let main_index = world
        .entry_module()
        .and_then(|m| m.find_function("main"))
        .and_then(|f| compiler.function_by_node.get(&f.id.0).copied())
        .map_or(-1, |i| i as i32);

    ir::Module { functions: compiler.functions, struct_types, main_index }
}

fn fn_meta_of(f: &FunDecl) -> FnMeta {
    FnMeta {
        param_names: f.params.iter().map(|p| p.name.clone()).collect(),
        param_defaults: f.params.iter().map(|p| p.default.clone()).collect(),
    }
}

impl<'a> Compiler<'a> {
    fn compile_body(&mut self, idx: u32, module_fqn: &str, fun: &FunDecl) {
        let info = self.resolvers[module_fqn].function_info(fun.id).clone();
        let num_locals = info.locals.len() as u32;
        let mut fc = FnCompiler { compiler: self, module: module_fqn.to_string(), info, builder: ChunkBuilder::new(num_locals) };
        fc.compile_function_body(fun);
        let (chunk, upvalues) = fc.finish();
        self.functions[idx as usize].chunk = chunk;
        self.functions[idx as usize].upvalues = upvalues;
    }
}

/// Per-function compilation context: the enclosing `Compiler` (for
/// cross-function lookups - struct/function/method indices), the owning
/// module (for FQN qualification and re-deriving a fresh `Resolver` lookup
/// for nested literals), this function's resolved locals/upvalues, and the
/// `ChunkBuilder` assembling its code.
struct FnCompiler<'a, 'b> {
    compiler: &'b mut Compiler<'a>,
    module: String,
    info: FunctionInfo,
    builder: ChunkBuilder,
}

impl<'a, 'b> FnCompiler<'a, 'b> {
    fn bindings(&self) -> &'a Bindings {
        self.compiler.bindings
    }

    fn finish(self) -> (ir::Chunk, Vec<ir::UpvalueDesc>) {
        (self.builder.finish(), self.info.upvalues.clone())
    }

    /// Compiles a nested `FuncLit` depth-first, allocating its function slot
    /// on first encounter (spec.md §4.3: closures are compiled inline).
    fn compile_nested(&mut self, decl: &FunDecl) -> u32 {
        let idx = self.compiler.functions.len() as u32;
        self.compiler.functions.push(ir::Function {
            name: String::from("<closure>"),
            num_params: decl.params.len() as u32,
            chunk: ir::Chunk::default(),
            upvalues: Vec::new(),
        });
        self.compiler.function_by_node.insert(decl.id.0, idx);
        self.compiler.fn_meta.insert(idx, fn_meta_of(decl));

        let info = self.compiler.resolvers[&self.module].function_info(decl.id).clone();
        let num_locals = info.locals.len() as u32;
        let mut nested =
            FnCompiler { compiler: &mut *self.compiler, module: self.module.clone(), info, builder: ChunkBuilder::new(num_locals) };
        nested.compile_function_body(decl);
        let (chunk, upvalues) = nested.finish();
        self.compiler.functions[idx as usize].chunk = chunk;
        self.compiler.functions[idx as usize].upvalues = upvalues;
        idx
    }
}
