//! Thin runner: wires one in-memory [`World`] through the checker, the
//! compiler, a serialize/deserialize round trip, and the VM (spec.md §1
//! treats lexing/parsing as an external collaborator, so this builds its
//! fixture program directly as AST nodes rather than parsing source text).

mod builtins;
mod environment;
mod fixture;

use std::process::ExitCode;

use avenir_core::checker::check_world;
use avenir_core::compiler::compile_world;
use avenir_core::serialize;
use avenir_core::symbol::{ModuleInfo, Scope, World};
use avenir_core::vm::Vm;

use builtins::StdBuiltins;
use environment::StdEnvironment;

fn main() -> ExitCode {
    let program = fixture::sum_of_list_program();
    let mut world = World::new("main");
    world.insert(ModuleInfo { fqn: "main".to_string(), program, top_level_scope: Scope::root() });

    let builtins = StdBuiltins;
    let (bindings, errors) = check_world(&world, &builtins);
    if !errors.is_empty() {
        eprintln!("type checking failed:\n{errors}");
        return ExitCode::FAILURE;
    }
    eprintln!("type checking succeeded");

    let module = compile_world(&world, &bindings, &builtins);
    let struct_names: Vec<String> = module.struct_types.iter().map(|s| s.name.clone()).collect();

    let bytes = serialize::serialize(&module);
    eprintln!("serialized module to {} bytes", bytes.len());
    let module = match serialize::deserialize(&bytes) {
        Ok(m) => m,
        Err(err) => {
            eprintln!("error: failed to deserialize module: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut env = StdEnvironment::new(struct_names);
    match Vm::run_main(&module, &mut env) {
        Ok(result) => {
            println!("{result}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
