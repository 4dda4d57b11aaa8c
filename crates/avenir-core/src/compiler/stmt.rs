//! Statement lowering (spec.md §4.3).

use crate::ast::{Block, FunDecl, Stmt};
use crate::ir::Opcode;

use super::FnCompiler;

impl FnCompiler<'_, '_> {
    /// Lowers a function/method body: the block, then an unconditional
    /// trailing `Return 0,0` (spec.md §4.3 - every chunk falls through to a
    /// return even if every control path already returned explicitly, since
    /// the checker's reachability analysis doesn't guarantee the compiler
    /// can prove a fall-through is dead).
    pub(super) fn compile_function_body(&mut self, fun: &FunDecl) {
        self.lower_block(&fun.body);
        self.builder.emit(Opcode::Return, 0, 0);
    }

    fn lower_block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.lower_stmt(stmt);
        }
    }

    fn lower_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl { name, init, .. } => {
                self.lower_expr(init);
                let slot = self.info.local_slot(name).expect("resolver assigned this declared variable a local slot");
                self.builder.emit_one(Opcode::StoreLocal, slot as i32);
                self.builder.emit_simple(Opcode::Pop);
            }
            Stmt::Assign { target, value, .. } => {
                self.lower_expr(value);
                self.store_named(target);
                self.builder.emit_simple(Opcode::Pop);
            }
            Stmt::FieldAssign { id, target_name, value, .. } => self.lower_field_assign(*id, target_name, value),
            Stmt::ExprStmt { expr } => {
                self.lower_expr(expr);
                self.builder.emit_simple(Opcode::Pop);
            }
            Stmt::Return { value, .. } => self.lower_return(value),
            Stmt::If { cond, then_block, else_block, .. } => self.lower_if(cond, then_block, else_block.as_ref()),
            Stmt::While { cond, body, .. } => self.lower_while(cond, body),
            Stmt::For { init, cond, step, body, .. } => self.lower_for(init.as_deref(), cond.as_ref(), step.as_deref(), body),
            Stmt::ForEach { var, iterable, body, .. } => self.lower_for_each(var, iterable, body),
            Stmt::Break { .. } => {
                let patch = self.builder.emit_jump(Opcode::Jump);
                self.builder.current_loop_mut().expect("break outside a loop is rejected by the checker").break_jumps.push(patch);
            }
            Stmt::Continue { .. } => {
                let patch = self.builder.emit_jump(Opcode::Jump);
                self.builder
                    .current_loop_mut()
                    .expect("continue outside a loop is rejected by the checker")
                    .continue_jumps
                    .push(patch);
            }
            Stmt::Try { body, catch_var, catch_body, .. } => self.lower_try(body, catch_var, catch_body),
            Stmt::Throw { value, .. } => {
                self.lower_expr(value);
                self.builder.emit_simple(Opcode::Throw);
            }
        }
    }

    /// Writes the value on top of the stack into a variable named `name`
    /// (local or upvalue), leaving it on the stack per `StoreLocal`/
    /// `StoreUpvalue`'s no-pop semantics - callers that don't need the value
    /// as an expression result emit their own trailing `Pop`.
    fn store_named(&mut self, name: &str) {
        if let Some(slot) = self.info.local_slot(name) {
            self.builder.emit_one(Opcode::StoreLocal, slot as i32);
            return;
        }
        let uv = self.info.upvalue_slot(name).expect("checker resolved this assignment target to a local or upvalue");
        self.builder.emit_one(Opcode::StoreUpvalue, uv as i32);
    }

    /// `target.field = value` (spec.md §4.3): load the struct, compile the
    /// value, `StoreField` (pops both, mutates, pushes the struct back),
    /// write the mutated struct back into the variable without popping it,
    /// then pop to balance the statement's net stack effect. The checker
    /// records the resolved field index keyed by the statement's own node
    /// id (`checker::stmt::check_stmt`'s `Stmt::FieldAssign` arm).
    fn lower_field_assign(&mut self, id: crate::ast::NodeId, target_name: &str, value: &crate::ast::Expr) {
        self.load_named(target_name);
        self.lower_expr(value);
        let Some(crate::bindings::MemberTarget::Field { field_index, .. }) = self.bindings().members.get(&id).cloned() else {
            unreachable!("checker records a Field target for every FieldAssign it accepts");
        };
        self.builder.emit_one(Opcode::StoreField, field_index as i32);
        self.store_named(target_name);
        self.builder.emit_simple(Opcode::Pop);
    }

    fn load_named(&mut self, name: &str) {
        if let Some(slot) = self.info.local_slot(name) {
            self.builder.emit_one(Opcode::LoadLocal, slot as i32);
            return;
        }
        let uv = self.info.upvalue_slot(name).expect("checker resolved this field-assign target to a local or upvalue");
        self.builder.emit_one(Opcode::LoadUpvalue, uv as i32);
    }

    fn lower_return(&mut self, value: &Option<crate::ast::Expr>) {
        match value {
            Some(e) => {
                self.lower_expr(e);
                self.builder.emit(Opcode::Return, 1, 0);
            }
            None => self.builder.emit(Opcode::Return, 0, 0),
        }
    }

    fn lower_if(&mut self, cond: &crate::ast::Expr, then_block: &Block, else_block: Option<&Block>) {
        self.lower_expr(cond);
        let j_else = self.builder.emit_jump(Opcode::JumpIfFalse);
        self.lower_block(then_block);
        match else_block {
            Some(else_b) => {
                let j_end = self.builder.emit_jump(Opcode::Jump);
                self.builder.patch_jump_here(j_else);
                self.lower_block(else_b);
                self.builder.patch_jump_here(j_end);
            }
            None => self.builder.patch_jump_here(j_else),
        }
    }

    fn lower_while(&mut self, cond: &crate::ast::Expr, body: &Block) {
        self.builder.push_loop();
        let loop_start = self.builder.here();
        self.lower_expr(cond);
        let j_exit = self.builder.emit_jump(Opcode::JumpIfFalse);
        self.lower_block(body);
        self.builder.emit(Opcode::Jump, loop_start as i32, 0);
        self.builder.patch_jump_here(j_exit);
        let ctx = self.builder.pop_loop();
        for p in ctx.break_jumps {
            self.builder.patch_jump_here(p);
        }
        // `continue` in a `while` knows its target up front: the condition
        // re-check at `loop_start`.
        for p in ctx.continue_jumps {
            self.builder.patch_jump_to(p, loop_start);
        }
    }

    fn lower_for(&mut self, init: Option<&Stmt>, cond: Option<&crate::ast::Expr>, step: Option<&Stmt>, body: &Block) {
        if let Some(i) = init {
            self.lower_stmt(i);
        }
        self.builder.push_loop();
        let cond_start = self.builder.here();
        let j_exit = cond.map(|c| {
            self.lower_expr(c);
            self.builder.emit_jump(Opcode::JumpIfFalse)
        });
        self.lower_block(body);
        // `continue` must run the step before re-checking the condition, so
        // its target is only known now.
        let step_start = self.builder.here();
        if let Some(s) = step {
            self.lower_stmt(s);
        }
        self.builder.emit(Opcode::Jump, cond_start as i32, 0);
        if let Some(j) = j_exit {
            self.builder.patch_jump_here(j);
        }
        let ctx = self.builder.pop_loop();
        for p in ctx.break_jumps {
            self.builder.patch_jump_here(p);
        }
        for p in ctx.continue_jumps {
            self.builder.patch_jump_to(p, step_start);
        }
    }

    /// `for x in list { ... }` lowers to a counted index loop over two
    /// compiler-synthesized hidden locals - the iterable and the index
    /// (spec.md §4.3) - since there is no dedicated iterator opcode.
    fn lower_for_each(&mut self, var: &str, iterable: &crate::ast::Expr, body: &Block) {
        let list_slot = self.builder.alloc_hidden_slot();
        let index_slot = self.builder.alloc_hidden_slot();

        self.lower_expr(iterable);
        self.builder.emit_one(Opcode::StoreLocal, list_slot as i32);
        self.builder.emit_simple(Opcode::Pop);

        let zero = self.builder.add_const(crate::ir::Constant::Int(0));
        self.builder.emit_one(Opcode::Const, zero as i32);
        self.builder.emit_one(Opcode::StoreLocal, index_slot as i32);
        self.builder.emit_simple(Opcode::Pop);

        self.builder.push_loop();
        let cond_start = self.builder.here();

        self.builder.emit_one(Opcode::LoadLocal, index_slot as i32);
        self.builder.emit_one(Opcode::LoadLocal, list_slot as i32);
        self.builder.emit(Opcode::CallBuiltin, self.compiler.length_builtin_id as i32, 1);
        self.builder.emit_simple(Opcode::Lt);
        let j_exit = self.builder.emit_jump(Opcode::JumpIfFalse);

        self.builder.emit_one(Opcode::LoadLocal, list_slot as i32);
        self.builder.emit_one(Opcode::LoadLocal, index_slot as i32);
        self.builder.emit_simple(Opcode::Index);
        let var_slot = self.info.local_slot(var).expect("resolver assigned the for-each loop variable a local slot");
        self.builder.emit_one(Opcode::StoreLocal, var_slot as i32);
        self.builder.emit_simple(Opcode::Pop);

        self.lower_block(body);

        let step_start = self.builder.here();
        self.builder.emit_one(Opcode::LoadLocal, index_slot as i32);
        let one = self.builder.add_const(crate::ir::Constant::Int(1));
        self.builder.emit_one(Opcode::Const, one as i32);
        self.builder.emit_simple(Opcode::Add);
        self.builder.emit_one(Opcode::StoreLocal, index_slot as i32);
        self.builder.emit_simple(Opcode::Pop);
        self.builder.emit(Opcode::Jump, cond_start as i32, 0);
        self.builder.patch_jump_here(j_exit);

        let ctx = self.builder.pop_loop();
        for p in ctx.break_jumps {
            self.builder.patch_jump_here(p);
        }
        for p in ctx.continue_jumps {
            self.builder.patch_jump_to(p, step_start);
        }
    }

    /// `try { ... } catch e { ... }` (spec.md §4.3/§4.4): `BeginTry` records
    /// a handler targeting the catch block and the stack height to restore
    /// on unwind; `EndTry` removes it once the body completes normally.
    fn lower_try(&mut self, body: &Block, catch_var: &str, catch_body: &Block) {
        let j_handler = self.builder.emit_jump(Opcode::BeginTry);
        self.lower_block(body);
        self.builder.emit_simple(Opcode::EndTry);
        let j_end = self.builder.emit_jump(Opcode::Jump);
        self.builder.patch_jump_here(j_handler);
        let catch_slot = self.info.local_slot(catch_var).expect("resolver assigned the catch variable a local slot");
        self.builder.emit_one(Opcode::StoreLocal, catch_slot as i32);
        self.builder.emit_simple(Opcode::Pop);
        self.lower_block(catch_body);
        self.builder.patch_jump_here(j_end);
    }
}
