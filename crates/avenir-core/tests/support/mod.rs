//! Shared AST-builder helpers and a minimal host (registry + environment)
//! for exercising the full checker -> compiler -> VM pipeline without a
//! parser, the same shape as `avenir-cli`'s fixture/builtins/environment
//! trio but trimmed to what these tests actually call.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use avenir_core::ast::{
    Argument, BinOp, Block, Expr, FieldDecl, FunDecl, InterfaceDecl, InterfaceMethodSig, MethodDecl, NamedArg, NodeId, Param, Position,
    Program, Stmt, StructDecl, TypeExpr, TypeExprKind, UnOp,
};
use avenir_core::environment::{BuiltinDescriptor, BuiltinRegistry, ClosureCaller, Environment};
use avenir_core::symbol::{ModuleInfo, Scope, World};
use avenir_core::types::Type;
use avenir_core::value::Value;
use avenir_core::vm::RuntimeError;
use avenir_core::{check_world, compile_world, serialize, Bindings, CheckError, Module};

pub struct IdGen(u32);

impl IdGen {
    pub fn new() -> Self {
        IdGen(0)
    }

    pub fn next(&mut self) -> NodeId {
        self.0 += 1;
        NodeId(self.0)
    }
}

pub fn pos() -> Position {
    Position::default()
}

pub fn ty(kind: TypeExprKind) -> TypeExpr {
    TypeExpr::new(kind, pos())
}

pub fn ident(ids: &mut IdGen, name: &str) -> Expr {
    Expr::Ident { id: ids.next(), name: name.to_string(), pos: pos() }
}

pub fn int_lit(ids: &mut IdGen, value: i64) -> Expr {
    Expr::IntLit { id: ids.next(), value }
}

pub fn float_lit(ids: &mut IdGen, value: f64) -> Expr {
    Expr::FloatLit { id: ids.next(), value }
}

pub fn string_lit(ids: &mut IdGen, value: &str) -> Expr {
    Expr::StringLit { id: ids.next(), value: value.to_string() }
}

pub fn bool_lit(ids: &mut IdGen, value: bool) -> Expr {
    Expr::BoolLit { id: ids.next(), value }
}

pub fn binary(ids: &mut IdGen, op: BinOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary { id: ids.next(), op, lhs: Box::new(lhs), rhs: Box::new(rhs), pos: pos() }
}

pub fn unary(ids: &mut IdGen, op: UnOp, operand: Expr) -> Expr {
    Expr::Unary { id: ids.next(), op, operand: Box::new(operand), pos: pos() }
}

pub fn call(ids: &mut IdGen, callee: Expr, args: Vec<Argument>) -> Expr {
    Expr::Call { id: ids.next(), callee: Box::new(callee), args, pos: pos() }
}

pub fn pos_arg(e: Expr) -> Argument {
    Argument::Positional(e)
}

pub fn named_arg(name: &str, e: Expr) -> Argument {
    Argument::Named(NamedArg { name: name.to_string(), value: e })
}

pub fn member(ids: &mut IdGen, target: Expr, member: &str) -> Expr {
    Expr::MemberAccess { id: ids.next(), target: Box::new(target), member: member.to_string(), pos: pos() }
}

pub fn list_lit(ids: &mut IdGen, items: Vec<Expr>) -> Expr {
    Expr::ListLit { id: ids.next(), items }
}

pub fn struct_lit(ids: &mut IdGen, name: &str, fields: Vec<(String, Expr)>) -> Expr {
    Expr::StructLit { id: ids.next(), name: name.to_string(), fields, pos: pos() }
}

pub fn func_lit(ids: &mut IdGen, decl: FunDecl) -> Expr {
    Expr::FuncLit { id: ids.next(), decl: Box::new(decl) }
}

pub fn var_decl(ids: &mut IdGen, name: &str, init: Expr) -> Stmt {
    Stmt::VarDecl { id: ids.next(), name: name.to_string(), init, pos: pos() }
}

pub fn assign(ids: &mut IdGen, target: &str, value: Expr) -> Stmt {
    Stmt::Assign { id: ids.next(), target: target.to_string(), value, pos: pos() }
}

pub fn field_assign(ids: &mut IdGen, target_name: &str, field: &str, value: Expr) -> Stmt {
    Stmt::FieldAssign { id: ids.next(), target_name: target_name.to_string(), field: field.to_string(), value, pos: pos() }
}

pub fn ret(value: Option<Expr>) -> Stmt {
    Stmt::Return { value, pos: pos() }
}

pub fn expr_stmt(expr: Expr) -> Stmt {
    Stmt::ExprStmt { expr }
}

pub fn for_each(var: &str, iterable: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::ForEach { var: var.to_string(), iterable, body: Block { stmts: body }, pos: pos() }
}

pub fn try_catch(body: Vec<Stmt>, catch_var: &str, catch_body: Vec<Stmt>) -> Stmt {
    Stmt::Try { body: Block { stmts: body }, catch_var: catch_var.to_string(), catch_body: Block { stmts: catch_body }, pos: pos() }
}

pub fn throw(value: Expr) -> Stmt {
    Stmt::Throw { value, pos: pos() }
}

pub fn param(name: &str, type_expr: TypeExpr) -> Param {
    Param { name: name.to_string(), type_expr, default: None, pos: pos() }
}

pub fn fun(ids: &mut IdGen, name: &str, params: Vec<Param>, return_type: TypeExpr, body: Vec<Stmt>) -> FunDecl {
    FunDecl { id: ids.next(), name: name.to_string(), is_public: false, params, return_type, body: Block { stmts: body }, pos: pos() }
}

pub fn method(fun: FunDecl, receiver_name: &str, receiver_struct: &str, is_static: bool) -> MethodDecl {
    MethodDecl { fun, receiver_name: receiver_name.to_string(), receiver_struct: receiver_struct.to_string(), is_static }
}

pub fn field(name: &str, type_expr: TypeExpr, default: Option<Expr>) -> FieldDecl {
    FieldDecl { name: name.to_string(), type_expr, default, is_public: true, pos: pos() }
}

pub fn struct_decl(name: &str, is_mutable: bool, fields: Vec<FieldDecl>, methods: Vec<MethodDecl>) -> StructDecl {
    StructDecl { name: name.to_string(), is_public: true, is_mutable, fields, methods, pos: pos() }
}

pub fn interface_method_sig(name: &str, params: Vec<TypeExpr>, result: TypeExpr) -> InterfaceMethodSig {
    InterfaceMethodSig { name: name.to_string(), params, result, pos: pos() }
}

pub fn interface_decl(name: &str, methods: Vec<InterfaceMethodSig>) -> InterfaceDecl {
    InterfaceDecl { name: name.to_string(), is_public: true, methods, pos: pos() }
}

pub fn program(functions: Vec<FunDecl>, structs: Vec<StructDecl>, interfaces: Vec<InterfaceDecl>) -> Program {
    Program { module_name: "main".to_string(), imports: vec![], structs, interfaces, functions }
}

pub fn world_of(program: Program) -> World {
    let mut world = World::new("main");
    world.insert(ModuleInfo { fqn: "main".to_string(), program, top_level_scope: Scope::root() });
    world
}

/// Checks and compiles `program`, asserting the check produced no
/// diagnostics, and returns the resulting module alongside the bindings the
/// checker recorded.
pub fn compile_ok(program: Program) -> (Module, Bindings) {
    let world = world_of(program);
    let builtins = TestBuiltins;
    let (bindings, errors) = check_world(&world, &builtins);
    assert!(errors.is_empty(), "expected no diagnostics, got:\n{errors}");
    let module = compile_world(&world, &bindings, &builtins);
    (module, bindings)
}

/// Checks `program` and returns its diagnostics without asserting anything
/// about them - for tests that expect type errors.
pub fn check_only(program: Program) -> CheckError {
    let world = world_of(program);
    let builtins = TestBuiltins;
    let (_bindings, errors) = check_world(&world, &builtins);
    errors
}

/// Runs `module` through a serialize/deserialize round trip (mirroring the
/// runner's own pipeline) before handing it to the VM.
pub fn run_round_tripped(module: &Module) -> Result<Value, RuntimeError> {
    let bytes = serialize::serialize(module);
    let decoded = serialize::deserialize(&bytes).expect("freshly serialized bytes always decode");
    let struct_names: Vec<String> = decoded.struct_types.iter().map(|s| s.name.clone()).collect();
    let mut env = TestEnvironment::new(struct_names);
    avenir_core::Vm::run_main(&decoded, &mut env)
}

/// `compile_ok` followed immediately by a round trip through the VM - the
/// common case for an end-to-end scenario test.
pub fn run_program(program: Program) -> Result<Value, RuntimeError> {
    let (module, _bindings) = compile_ok(program);
    run_round_tripped(&module)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
enum BuiltinId {
    Length = 1,
    ListGet,
    ListPush,
    Print,
    ToInt,
    ErrorMessage,
}

fn id_from_u32(v: u32) -> Option<BuiltinId> {
    Some(match v {
        1 => BuiltinId::Length,
        2 => BuiltinId::ListGet,
        3 => BuiltinId::ListPush,
        4 => BuiltinId::Print,
        5 => BuiltinId::ToInt,
        6 => BuiltinId::ErrorMessage,
        _ => return None,
    })
}

fn method_descriptor(id: BuiltinId, name: &str, param_names: &[&str], param_types: Vec<Type>, result: Type, receiver: Type) -> BuiltinDescriptor {
    BuiltinDescriptor {
        id: id as u32,
        name: name.to_string(),
        param_names: param_names.iter().map(|s| s.to_string()).collect(),
        param_types,
        result_type: result,
        receiver_type: Some(receiver),
    }
}

fn free_descriptor(id: BuiltinId, name: &str, param_names: &[&str], param_types: Vec<Type>, result: Type) -> BuiltinDescriptor {
    BuiltinDescriptor {
        id: id as u32,
        name: name.to_string(),
        param_names: param_names.iter().map(|s| s.to_string()).collect(),
        param_types,
        result_type: result,
        receiver_type: None,
    }
}

/// A built-in table covering just what these tests call: `print`, `toInt`,
/// `errorMessage`, list `get`/`push`, and `length` across list/dict/string
/// and (through the shared id) interface receivers.
pub struct TestBuiltins;

impl BuiltinRegistry for TestBuiltins {
    fn free_functions(&self) -> Vec<BuiltinDescriptor> {
        vec![
            free_descriptor(BuiltinId::Print, "print", &["value"], vec![Type::Any], Type::Void),
            free_descriptor(BuiltinId::ToInt, "toInt", &["s"], vec![Type::String], Type::optional(Type::Int)),
            free_descriptor(BuiltinId::ErrorMessage, "errorMessage", &["e"], vec![Type::Error], Type::String),
        ]
    }

    fn lookup_method(&self, receiver: &Type, name: &str) -> Option<BuiltinDescriptor> {
        match receiver {
            Type::List(_) => match name {
                "length" => Some(method_descriptor(BuiltinId::Length, "length", &[], vec![], Type::Int, receiver.clone())),
                "get" => Some(method_descriptor(BuiltinId::ListGet, "get", &["index"], vec![Type::Int], Type::optional(Type::Any), receiver.clone())),
                "push" => Some(method_descriptor(BuiltinId::ListPush, "push", &["value"], vec![Type::Any], Type::Void, receiver.clone())),
                _ => None,
            },
            Type::String => match name {
                "length" => Some(method_descriptor(BuiltinId::Length, "length", &[], vec![], Type::Int, receiver.clone())),
                _ => None,
            },
            Type::Interface(_) => match name {
                "length" => Some(method_descriptor(BuiltinId::Length, "length", &[], vec![], Type::Int, Type::Any)),
                _ => None,
            },
            _ => None,
        }
    }
}

pub struct TestEnvironment {
    struct_names: Vec<String>,
    pub printed: Rc<RefCell<Vec<String>>>,
}

impl TestEnvironment {
    pub fn new(struct_names: Vec<String>) -> Self {
        TestEnvironment { struct_names, printed: Rc::new(RefCell::new(Vec::new())) }
    }
}

impl Environment for TestEnvironment {
    fn println(&mut self, s: &str) {
        self.printed.borrow_mut().push(s.to_string());
    }

    fn readline(&mut self) -> Option<String> {
        None
    }

    fn call_builtin(&mut self, id: u32, mut args: Vec<Value>, _caller: &mut dyn ClosureCaller) -> Result<Value, RuntimeError> {
        let Some(id) = id_from_u32(id) else {
            return Err(RuntimeError::new(format!("unknown built-in id {id}")));
        };
        match id {
            BuiltinId::Length => match &args[0] {
                Value::List(list) => Ok(Value::Int(list.borrow().len() as i64)),
                Value::Dict(dict) => Ok(Value::Int(dict.borrow().len() as i64)),
                Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
                other => Err(RuntimeError::new(format!("length is not defined for `{}`", other.type_name()))),
            },
            BuiltinId::ListGet => {
                let Value::List(list) = args.remove(0) else {
                    return Err(RuntimeError::new("get called on a non-list"));
                };
                let Value::Int(index) = args.remove(0) else {
                    return Err(RuntimeError::new("list index must be an int"));
                };
                let list = list.borrow();
                Ok(usize::try_from(index).ok().and_then(|i| list.get(i).cloned()).map_or(Value::None, |v| Value::Some(Box::new(v))))
            }
            BuiltinId::ListPush => {
                let Value::List(list) = args.remove(0) else {
                    return Err(RuntimeError::new("push called on a non-list"));
                };
                list.borrow_mut().push(args.remove(0));
                Ok(Value::None)
            }
            BuiltinId::Print => {
                self.println(&args[0].to_string());
                Ok(Value::None)
            }
            BuiltinId::ToInt => {
                let Value::String(s) = &args[0] else {
                    return Err(RuntimeError::new("toInt expects a string"));
                };
                Ok(s.parse::<i64>().map_or(Value::None, |v| Value::Some(Box::new(Value::Int(v)))))
            }
            BuiltinId::ErrorMessage => match &args[0] {
                Value::Error { message } => Ok(Value::string(message.clone())),
                other => Err(RuntimeError::new(format!("errorMessage expects an error, got `{}`", other.type_name()))),
            },
        }
    }

    fn struct_type_name(&self, type_index: u32) -> &str {
        self.struct_names.get(type_index as usize).map_or("<struct>", String::as_str)
    }
}
