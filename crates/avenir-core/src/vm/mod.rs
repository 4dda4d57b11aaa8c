//! The bytecode virtual machine (spec.md §4.4): a single-threaded stack
//! machine with call frames, an exception-handler stack, and in-place
//! struct mutation.
//!
//! `mod.rs` owns the frame cache and the fetch-decode-dispatch loop; each
//! concern (arithmetic, comparisons, the call protocol, collections,
//! exceptions) gets its own file rather than one large match arm.

mod binary;
mod call;
mod collections;
mod compare;
mod exceptions;

use std::fmt;
use std::rc::Rc;

use crate::environment::Environment;
use crate::ir::{Instruction, Module, Opcode};
use crate::value::{ClosureObj, ClosureRef, UpvalueRef, Value};

pub use call::ClosureCallerImpl;
pub(crate) use exceptions::Handler;

/// A VM-raised error: a user `throw`, a wrapped non-error `throw`, or an
/// opcode-level trap (division by zero, a bad index, a stack underflow).
/// Always convertible to a `Value::Error` for the handler stack; surfaces as
/// a host-level error (its `Display`) when it escapes every handler
/// (spec.md §7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    pub message: String,
}

impl RuntimeError {
    pub fn new(message: impl Into<String>) -> Self {
        RuntimeError { message: message.into() }
    }

    pub fn into_value(self) -> Value {
        Value::error(self.message)
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for RuntimeError {}

/// One call frame (spec.md §3): the active closure, its instruction
/// pointer, and `base` - the stack index of local slot 0.
struct Frame {
    closure: ClosureRef,
    ip: usize,
    base: usize,
}

/// What dispatching one instruction did to control flow.
enum Step {
    Continue,
    Returned,
    Halted,
}

/// Grounded on clox's `captureUpvalue`/`closeUpvalues`: rather than scan
/// every frame's closure and every stack slot to find cells that need
/// closing on return (spec.md §4.4's literal wording), the VM keeps its own
/// registry of currently-open cells and closes exactly the ones at or above
/// the returning frame's base. Same observable result, no scan.
pub struct Vm<'m, 'e> {
    module: &'m Module,
    env: *mut (dyn Environment + 'e),
    stack: Vec<Value>,
    frames: Vec<Frame>,
    handlers: Vec<Handler>,
    open_upvalues: Vec<UpvalueRef>,
}

impl<'m, 'e> Vm<'m, 'e> {
    /// Runs `module`'s entry function to completion (spec.md §2 stage 3).
    pub fn run_main(module: &'m Module, env: &'e mut dyn Environment) -> Result<Value, RuntimeError> {
        let Some(_main) = module.main_function() else {
            return Err(RuntimeError::new("module has no entry function"));
        };
        let closure = Rc::new(ClosureObj { function_index: module.main_index as usize, upvalues: Vec::new() });
        let mut vm = Vm {
            module,
            env: env as *mut dyn Environment,
            stack: Vec::new(),
            frames: Vec::new(),
            handlers: Vec::new(),
            open_upvalues: Vec::new(),
        };
        vm.call_closure(closure, Vec::new())
    }

    /// Reborrows the host environment. SAFETY: the pointer was derived from
    /// the `&mut dyn Environment` passed to `run_main`, which outlives this
    /// `Vm` for its entire call (lifetime `'e`). Every reborrow is used and
    /// dropped before the next is taken - built-ins re-enter the VM
    /// synchronously (spec.md §5: single-threaded), so no two reborrows are
    /// ever alive at the same time.
    fn env(&self) -> &'e mut dyn Environment {
        unsafe { &mut *self.env }
    }

    fn function(&self, index: usize) -> &'m crate::ir::Function {
        &self.module.functions[index]
    }

    fn current_frame(&self) -> &Frame {
        self.frames.last().expect("dispatch always has an active frame")
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or_else(|| RuntimeError::new("internal: stack underflow"))
    }

    fn push(&mut self, v: Value) {
        self.stack.push(v);
    }

    fn peek(&self, from_top: usize) -> &Value {
        let len = self.stack.len();
        &self.stack[len - 1 - from_top]
    }

    fn local_slot(&self, index: i32) -> usize {
        self.current_frame().base + index as usize
    }

    fn fetch(&self) -> Instruction {
        let frame = self.current_frame();
        self.function(frame.closure.function_index).chunk.code[frame.ip]
    }

    /// Re-entrant call protocol (spec.md §4.4 `callClosure`): pushes `args`,
    /// reserves the rest of the callee's locals, pushes a frame, and runs
    /// the dispatch loop until that exact frame is gone - either because it
    /// returned, or because an unwind passed through it unhandled.
    fn call_closure(&mut self, closure: ClosureRef, args: Vec<Value>) -> Result<Value, RuntimeError> {
        let func = self.function(closure.function_index);
        if func.num_params as usize != args.len() {
            return Err(RuntimeError::new(format!(
                "`{}` expects {} argument(s), got {}",
                func.name,
                func.num_params,
                args.len()
            )));
        }
        let entry_len = self.stack.len();
        self.stack.extend(args);
        self.stack.resize(entry_len + func.chunk.num_locals as usize, Value::None);
        self.frames.push(Frame { closure, ip: 0, base: entry_len });
        let target_depth = self.frames.len() - 1;

        match self.run_loop(target_depth) {
            Ok(v) => Ok(v),
            Err(e) => {
                self.frames.truncate(target_depth);
                self.stack.truncate(entry_len);
                self.handlers.retain(|h| h.frame_index < target_depth);
                self.open_upvalues.retain(|cell| !matches!(
                    &*cell.borrow(),
                    crate::value::UpvalueCell::Open { stack_index } if *stack_index >= entry_len
                ));
                Err(e)
            }
        }
    }

    /// The fetch-decode-dispatch loop: runs until the frame `call_closure`
    /// just pushed (`target_depth`) is gone.
    fn run_loop(&mut self, target_depth: usize) -> Result<Value, RuntimeError> {
        loop {
            match self.dispatch() {
                Ok(Step::Continue) => {}
                Ok(Step::Returned) => {
                    if self.frames.len() == target_depth {
                        return self.pop();
                    }
                }
                Ok(Step::Halted) => return Ok(Value::None),
                Err(e) => {
                    if self.unwind(target_depth, &e) {
                        continue;
                    }
                    return Err(e);
                }
            }
        }
    }

    /// Looks for the nearest handler established within this `call_closure`
    /// invocation's own scope (`frame_index >= target_depth`) and, if found,
    /// truncates frames/stack and jumps to its catch block (spec.md §4.4).
    /// A handler belonging to an *outer* invocation is left untouched - it
    /// isn't this scope's to consume.
    fn unwind(&mut self, target_depth: usize, err: &RuntimeError) -> bool {
        match self.handlers.last().copied() {
            Some(h) if h.frame_index >= target_depth => {
                self.handlers.pop();
                self.frames.truncate(h.frame_index + 1);
                self.stack.truncate(h.stack_height);
                self.push(err.clone().into_value());
                self.frames.last_mut().expect("handler's frame still exists").ip = h.target_ip;
                true
            }
            _ => false,
        }
    }

    /// Finds (or opens) the shared upvalue cell for frame-relative stack
    /// slot `stack_index`, so repeated captures of the same local from
    /// sibling closures alias one cell (spec.md §4.4).
    fn open_upvalue_at(&mut self, stack_index: usize) -> UpvalueRef {
        if let Some(existing) = self.open_upvalues.iter().find(|cell| {
            matches!(&*cell.borrow(), crate::value::UpvalueCell::Open { stack_index: i } if *i == stack_index)
        }) {
            return existing.clone();
        }
        let cell = Rc::new(std::cell::RefCell::new(crate::value::UpvalueCell::Open { stack_index }));
        self.open_upvalues.push(cell.clone());
        cell
    }

    /// Closes every open upvalue at or above `base`, copying out its current
    /// stack value before the slot disappears (spec.md §4.4 `OpReturn`).
    fn close_upvalues_from(&mut self, base: usize) {
        let stack = &self.stack;
        self.open_upvalues.retain(|cell| {
            let mut cell_mut = cell.borrow_mut();
            match &*cell_mut {
                crate::value::UpvalueCell::Open { stack_index } if *stack_index >= base => {
                    let value = stack[*stack_index].clone();
                    *cell_mut = crate::value::UpvalueCell::Closed { value };
                    false
                }
                _ => true,
            }
        });
    }

    fn dispatch(&mut self) -> Result<Step, RuntimeError> {
        let instr = self.fetch();
        // Advance first; a taken branch overwrites `ip` below. This mirrors
        // a plain program counter increment-then-execute, so jump opcodes
        // don't need a "did we already move ip" flag.
        self.frames.last_mut().expect("dispatch always has an active frame").ip += 1;

        match instr.op {
            Opcode::Halt => Ok(Step::Halted),
            Opcode::Const => {
                let c = self.function(self.current_frame().closure.function_index).chunk.const_pool[instr.a as usize].clone();
                self.push(collections::value_of_constant(&c));
                Ok(Step::Continue)
            }
            Opcode::LoadLocal => {
                let v = self.stack[self.local_slot(instr.a)].clone();
                self.push(v);
                Ok(Step::Continue)
            }
            Opcode::StoreLocal => {
                let v = self.peek(0).clone();
                let slot = self.local_slot(instr.a);
                self.stack[slot] = v;
                Ok(Step::Continue)
            }
            Opcode::Pop => {
                self.pop()?;
                Ok(Step::Continue)
            }
            Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Mod => binary::apply(self, instr.op),
            Opcode::Negate => binary::negate(self),
            Opcode::Not => binary::not(self),
            Opcode::Eq | Opcode::Neq | Opcode::Lt | Opcode::Lte | Opcode::Gt | Opcode::Gte => compare::apply(self, instr.op),
            Opcode::Jump => {
                self.frames.last_mut().expect("active frame").ip = instr.a as usize;
                Ok(Step::Continue)
            }
            Opcode::JumpIfFalse => {
                let cond = self.pop()?;
                let b = cond.as_bool().ok_or_else(|| RuntimeError::new(format!("expected bool, got `{}`", cond.type_name())))?;
                if !b {
                    self.frames.last_mut().expect("active frame").ip = instr.a as usize;
                }
                Ok(Step::Continue)
            }
            Opcode::Call => call::op_call(self, instr.a as usize, instr.b as usize),
            Opcode::CallValue => call::op_call_value(self, instr.a as usize),
            Opcode::CallBuiltin => call::op_call_builtin(self, instr.a as u32, instr.b as usize),
            Opcode::Return => call::op_return(self, instr.a),
            Opcode::MakeList => collections::make_list(self, instr.a as usize),
            Opcode::MakeDict => collections::make_dict(self, instr.a as usize),
            Opcode::Index => collections::index(self),
            Opcode::MakeSome => collections::make_some(self),
            Opcode::MakeStruct => collections::make_struct(self, instr.a as u32, instr.b as usize),
            Opcode::LoadField => collections::load_field(self, instr.a as usize),
            Opcode::StoreField => collections::store_field(self, instr.a as usize),
            Opcode::Stringify => collections::stringify(self),
            Opcode::ConcatString => collections::concat_string(self),
            Opcode::BeginTry => {
                exceptions::begin_try(self, instr.a as usize);
                Ok(Step::Continue)
            }
            Opcode::EndTry => {
                exceptions::end_try(self)?;
                Ok(Step::Continue)
            }
            Opcode::Throw => exceptions::throw(self),
            Opcode::Closure => call::op_closure(self, instr.a as usize, instr.b as usize),
            Opcode::LoadUpvalue => call::op_load_upvalue(self, instr.a as usize),
            Opcode::StoreUpvalue => call::op_store_upvalue(self, instr.a as usize),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Chunk, Constant, Function, Instruction};

    struct NullEnv;
    impl Environment for NullEnv {
        fn println(&mut self, _s: &str) {}
        fn readline(&mut self) -> Option<String> {
            None
        }
        fn call_builtin(
            &mut self,
            _id: u32,
            _args: Vec<Value>,
            _caller: &mut dyn crate::environment::ClosureCaller,
        ) -> Result<Value, RuntimeError> {
            Err(RuntimeError::new("no built-ins registered"))
        }
        fn struct_type_name(&self, _type_index: u32) -> &str {
            "<struct>"
        }
    }

    fn module_with_main(code: Vec<Instruction>, const_pool: Vec<Constant>, num_locals: u32) -> Module {
        Module {
            functions: vec![Function {
                name: "main".into(),
                num_params: 0,
                chunk: Chunk { code, const_pool, num_locals },
                upvalues: Vec::new(),
            }],
            struct_types: Vec::new(),
            main_index: 0,
        }
    }

    #[test]
    fn arithmetic_and_return() {
        // main() { return 2 + 3 * 4; }
        let module = module_with_main(
            vec![
                Instruction::one(Opcode::Const, 0),
                Instruction::one(Opcode::Const, 1),
                Instruction::one(Opcode::Const, 2),
                Instruction::simple(Opcode::Mul),
                Instruction::simple(Opcode::Add),
                Instruction::one(Opcode::Return, 1),
            ],
            vec![Constant::Int(2), Constant::Int(3), Constant::Int(4)],
            0,
        );
        let mut env = NullEnv;
        let result = Vm::run_main(&module, &mut env).unwrap();
        match result {
            Value::Int(14) => {}
            other => panic!("expected Int(14), got {other:?}"),
        }
    }

    #[test]
    fn division_by_zero_is_catchable() {
        // main() {
        //   try { return 1 / 0; } catch e { return 99; }
        // }
        let module = module_with_main(
            vec![
                Instruction::one(Opcode::BeginTry, 5),
                Instruction::one(Opcode::Const, 0),
                Instruction::one(Opcode::Const, 1),
                Instruction::simple(Opcode::Div),
                Instruction::one(Opcode::Return, 1),
                Instruction::one(Opcode::StoreLocal, 0),
                Instruction::simple(Opcode::Pop),
                Instruction::one(Opcode::Const, 2),
                Instruction::one(Opcode::Return, 1),
            ],
            vec![Constant::Int(1), Constant::Int(0), Constant::Int(99)],
            1,
        );
        let mut env = NullEnv;
        let result = Vm::run_main(&module, &mut env).unwrap();
        match result {
            Value::Int(99) => {}
            other => panic!("expected Int(99), got {other:?}"),
        }
    }
}
