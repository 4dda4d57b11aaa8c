//! Expression lowering (spec.md §4.3).

use crate::argbind::{self, ArgSlot, RECEIVER_SENTINEL};
use crate::ast::{Argument, BinOp, Expr, InterpPart, UnOp};
use crate::bindings::MemberTarget;
use crate::builtin_sigs;
use crate::ir::{Constant, Opcode};
use crate::symbol::SymbolKind;
use crate::types::Type;

use super::FnCompiler;

fn arg_expr(a: &Argument) -> &Expr {
    match a {
        Argument::Positional(e) => e,
        Argument::Named(n) => &n.value,
    }
}

impl FnCompiler<'_, '_> {
    /// Post-order: lowers `expr`, leaving its value on top of the stack.
    pub(super) fn lower_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Ident { id, name, .. } => self.lower_ident_load(*id, name),
            Expr::IntLit { value, .. } => {
                let idx = self.builder.add_const(Constant::Int(*value));
                self.builder.emit_one(Opcode::Const, idx as i32);
            }
            Expr::FloatLit { value, .. } => {
                let idx = self.builder.add_const(Constant::Float(*value));
                self.builder.emit_one(Opcode::Const, idx as i32);
            }
            Expr::StringLit { value, .. } => {
                let idx = self.builder.add_const(Constant::String(value.clone()));
                self.builder.emit_one(Opcode::Const, idx as i32);
            }
            Expr::BoolLit { value, .. } => {
                let idx = self.builder.add_const(Constant::Bool(*value));
                self.builder.emit_one(Opcode::Const, idx as i32);
            }
            Expr::NoneLit { .. } => {
                let idx = self.builder.add_const(Constant::None);
                self.builder.emit_one(Opcode::Const, idx as i32);
            }
            Expr::SomeLit { inner, .. } => {
                self.lower_expr(inner);
                self.builder.emit_simple(Opcode::MakeSome);
            }
            Expr::ListLit { items, .. } => {
                for item in items {
                    self.lower_expr(item);
                }
                self.builder.emit_one(Opcode::MakeList, items.len() as i32);
            }
            Expr::DictLit { entries, .. } => {
                for (key, value) in entries {
                    let key_idx = self.builder.add_const(Constant::String(key.clone()));
                    self.builder.emit_one(Opcode::Const, key_idx as i32);
                    self.lower_expr(value);
                }
                self.builder.emit_one(Opcode::MakeDict, entries.len() as i32);
            }
            Expr::StructLit { id, fields, .. } => self.lower_struct_lit(*id, fields),
            Expr::Binary { op: BinOp::And, lhs, rhs, .. } => self.lower_and(lhs, rhs),
            Expr::Binary { op: BinOp::Or, lhs, rhs, .. } => self.lower_or(lhs, rhs),
            Expr::Binary { op, lhs, rhs, .. } => {
                self.lower_expr(lhs);
                self.lower_expr(rhs);
                self.builder.emit_simple(binop_opcode(op));
            }
            Expr::Unary { op, operand, .. } => {
                self.lower_expr(operand);
                self.builder.emit_simple(match op {
                    UnOp::Not => Opcode::Not,
                    UnOp::Neg => Opcode::Negate,
                });
            }
            Expr::Call { callee, args, .. } => self.lower_call(callee, args),
            Expr::MemberAccess { id, target, .. } => self.lower_member_access(*id, target),
            Expr::Index { target, key, .. } => {
                self.lower_expr(target);
                self.lower_expr(key);
                self.builder.emit_simple(Opcode::Index);
            }
            Expr::FuncLit { decl, .. } => {
                let idx = self.compile_nested(decl);
                self.emit_closure(idx);
            }
            Expr::StringInterp { parts, .. } => self.lower_string_interp(parts),
        }
    }

    fn lower_ident_load(&mut self, id: crate::ast::NodeId, name: &str) {
        if let Some(slot) = self.info.local_slot(name) {
            self.builder.emit_one(Opcode::LoadLocal, slot as i32);
            return;
        }
        if let Some(uv) = self.info.upvalue_slot(name) {
            self.builder.emit_one(Opcode::LoadUpvalue, uv as i32);
            return;
        }
        let sym = self.bindings().idents.get(&id).cloned().expect("checker resolved this identifier");
        match sym.kind {
            SymbolKind::Func => {
                let fn_idx = *self
                    .compiler
                    .function_by_node
                    .get(&sym.declaring_node)
                    .expect("a free identifier of kind Func that isn't local/upvalue must name a user function");
                self.emit_closure(fn_idx);
            }
            _ => unreachable!("a non-local, non-upvalue identifier must resolve to a function symbol"),
        }
    }

    /// `OpClosure fn-index, num-upvalues` - before the opcode, push the
    /// current value of every non-local upvalue descriptor (spec.md §4.3).
    /// A direct reference to a top-level function (no captures) still goes
    /// through here with zero upvalues.
    fn emit_closure(&mut self, fn_idx: u32) {
        let upvalues = self.compiler.functions[fn_idx as usize].upvalues.clone();
        for uv in &upvalues {
            if !uv.is_local {
                self.builder.emit_one(Opcode::LoadUpvalue, uv.index as i32);
            }
        }
        self.builder.emit(Opcode::Closure, fn_idx as i32, upvalues.len() as i32);
    }

    fn lower_and(&mut self, lhs: &Expr, rhs: &Expr) {
        self.lower_expr(lhs);
        let j_false = self.builder.emit_jump(Opcode::JumpIfFalse);
        self.lower_expr(rhs);
        let j_end = self.builder.emit_jump(Opcode::Jump);
        self.builder.patch_jump_here(j_false);
        let idx = self.builder.add_const(Constant::Bool(false));
        self.builder.emit_one(Opcode::Const, idx as i32);
        self.builder.patch_jump_here(j_end);
    }

    fn lower_or(&mut self, lhs: &Expr, rhs: &Expr) {
        self.lower_expr(lhs);
        let j_false = self.builder.emit_jump(Opcode::JumpIfFalse);
        let idx = self.builder.add_const(Constant::Bool(true));
        self.builder.emit_one(Opcode::Const, idx as i32);
        let j_end = self.builder.emit_jump(Opcode::Jump);
        self.builder.patch_jump_here(j_false);
        self.lower_expr(rhs);
        self.builder.patch_jump_here(j_end);
    }

    fn lower_string_interp(&mut self, parts: &[InterpPart]) {
        if parts.is_empty() {
            let idx = self.builder.add_const(Constant::String(String::new()));
            self.builder.emit_one(Opcode::Const, idx as i32);
            return;
        }
        for (i, part) in parts.iter().enumerate() {
            match part {
                InterpPart::Text(s) => {
                    let idx = self.builder.add_const(Constant::String(s.clone()));
                    self.builder.emit_one(Opcode::Const, idx as i32);
                }
                InterpPart::Expr(e) => {
                    self.lower_expr(e);
                    self.builder.emit_simple(Opcode::Stringify);
                }
            }
            if i > 0 {
                self.builder.emit_simple(Opcode::ConcatString);
            }
        }
    }

    fn lower_struct_lit(&mut self, id: crate::ast::NodeId, fields: &[(String, Expr)]) {
        let Type::Struct(fqn) = self.bindings().type_of(id).clone() else {
            unreachable!("the checker only accepts a StructLit whose type is Type::Struct");
        };
        let struct_idx = self.compiler.struct_index[&fqn];
        let meta = self.compiler.struct_meta[&fqn].clone();
        for field_decl in &meta.decl_fields {
            match fields.iter().find(|(name, _)| name == &field_decl.name) {
                Some((_, expr)) => self.lower_expr(expr),
                None => {
                    let default = field_decl.default.as_ref().expect("checker guarantees a default for an omitted field");
                    self.lower_expr(default);
                }
            }
        }
        self.builder.emit(Opcode::MakeStruct, struct_idx as i32, meta.decl_fields.len() as i32);
    }

    fn lower_member_access(&mut self, id: crate::ast::NodeId, target: &Expr) {
        match self.bindings().members.get(&id).cloned() {
            Some(MemberTarget::Field { field_index, .. }) => {
                self.lower_expr(target);
                self.builder.emit_one(Opcode::LoadField, field_index as i32);
            }
            Some(MemberTarget::ModuleMember { module, name }) => {
                let fn_idx = self.compiler.top_fn_index[&(module, name)];
                self.emit_closure(fn_idx);
            }
            other => unreachable!("a non-call member access only ever resolves to a field or module function, got {other:?}"),
        }
    }

    fn lower_call(&mut self, callee: &Expr, args: &[Argument]) {
        match callee {
            Expr::MemberAccess { id, target, member, .. } => self.lower_method_call(*id, target, member, args),
            Expr::Ident { id, name, .. } => self.lower_ident_call(*id, name, args),
            other => {
                self.lower_expr(other);
                self.lower_call_value(args);
            }
        }
    }

    fn lower_call_value(&mut self, args: &[Argument]) {
        for a in args {
            self.lower_expr(arg_expr(a));
        }
        self.builder.emit_one(Opcode::CallValue, args.len() as i32);
    }

    fn lower_ident_call(&mut self, id: crate::ast::NodeId, name: &str, args: &[Argument]) {
        let sym = self.bindings().idents.get(&id).cloned().expect("checker resolved this call's callee");
        match sym.kind {
            SymbolKind::Func => {
                if let Some(&fn_idx) = self.compiler.function_by_node.get(&sym.declaring_node) {
                    self.emit_known_call(fn_idx, args);
                } else {
                    let desc = self
                        .compiler
                        .builtins
                        .lookup_free(name)
                        .expect("a Func symbol with no function-table entry must be a registered free built-in");
                    self.emit_builtin_call(desc.id, &desc.param_names, args, None);
                }
            }
            SymbolKind::Var => {
                self.lower_ident_load(id, name);
                self.lower_call_value(args);
            }
            _ => unreachable!("a callable identifier must be of kind Func or Var"),
        }
    }

    fn lower_method_call(&mut self, id: crate::ast::NodeId, target: &Expr, member: &str, args: &[Argument]) {
        if let Expr::Ident { id: tid, .. } = target {
            if let Some(sym) = self.bindings().idents.get(tid).cloned() {
                match sym.kind {
                    SymbolKind::Type => {
                        let Some(MemberTarget::StaticMethod { struct_name, method }) = self.bindings().members.get(&id).cloned()
                        else {
                            unreachable!("a static method call must have recorded a StaticMethod target");
                        };
                        let fn_idx = self.compiler.method_index[&(struct_name, method, true)];
                        self.emit_known_call(fn_idx, args);
                        return;
                    }
                    SymbolKind::Module => {
                        let Some(MemberTarget::ModuleMember { module, name }) = self.bindings().members.get(&id).cloned() else {
                            unreachable!("a module function call must have recorded a ModuleMember target");
                        };
                        let fn_idx = self.compiler.top_fn_index[&(module, name)];
                        self.emit_known_call(fn_idx, args);
                        return;
                    }
                    _ => {}
                }
            }
        }

        match self.bindings().members.get(&id).cloned() {
            Some(MemberTarget::InstanceMethod { struct_name, method }) => {
                let fn_idx = self.compiler.method_index[&(struct_name, method, false)];
                self.emit_known_method_call(fn_idx, target, args);
            }
            Some(MemberTarget::Builtin { builtin_id }) => {
                let target_ty = self.bindings().type_of(target.id()).clone();
                let param_names = match &target_ty {
                    Type::List(_) => builtin_sigs::list_method_param_names(member),
                    Type::Dict(_) => builtin_sigs::dict_method_param_names(member),
                    Type::String => builtin_sigs::string_method_param_names(member),
                    other => self
                        .compiler
                        .builtins
                        .lookup_method(other, member)
                        .map(|d| d.param_names)
                        .unwrap_or_default(),
                };
                self.emit_builtin_call(builtin_id, &param_names, args, Some(target));
            }
            other => unreachable!("a method call must have recorded an InstanceMethod or Builtin target, got {other:?}"),
        }
    }

    fn emit_known_call(&mut self, fn_idx: u32, args: &[Argument]) {
        let meta = self.compiler.fn_meta[&fn_idx].clone();
        let has_default: Vec<bool> = meta.param_defaults.iter().map(Option::is_some).collect();
        let slots = argbind::bind_call(&meta.param_names, &has_default, args).expect("checker already validated this call");
        for (i, slot) in slots.iter().enumerate() {
            match slot {
                ArgSlot::Positional(idx) | ArgSlot::Named(idx) => self.lower_expr(arg_expr(&args[*idx])),
                ArgSlot::Default => {
                    let default = meta.param_defaults[i].as_ref().expect("bind_call only emits Default when one exists");
                    self.lower_expr(default);
                }
            }
        }
        self.builder.emit(Opcode::Call, fn_idx as i32, slots.len() as i32);
    }

    fn emit_known_method_call(&mut self, fn_idx: u32, receiver: &Expr, args: &[Argument]) {
        let meta = self.compiler.fn_meta[&fn_idx].clone();
        let has_default: Vec<bool> = meta.param_defaults.iter().map(Option::is_some).collect();
        let slots =
            argbind::bind_method_call("self", &meta.param_names, &has_default, args).expect("checker already validated this call");
        for (i, slot) in slots.iter().enumerate() {
            match slot {
                ArgSlot::Positional(idx) if *idx == RECEIVER_SENTINEL => self.lower_expr(receiver),
                ArgSlot::Positional(idx) | ArgSlot::Named(idx) => self.lower_expr(arg_expr(&args[*idx])),
                ArgSlot::Default => {
                    let default = meta.param_defaults[i - 1].as_ref().expect("bind_call only emits Default when one exists");
                    self.lower_expr(default);
                }
            }
        }
        self.builder.emit(Opcode::Call, fn_idx as i32, slots.len() as i32);
    }

    fn emit_builtin_call(&mut self, builtin_id: u32, param_names: &[String], args: &[Argument], receiver: Option<&Expr>) {
        let has_default = vec![false; param_names.len()];
        let slots = match receiver {
            Some(_) => argbind::bind_method_call("self", param_names, &has_default, args),
            None => argbind::bind_call(param_names, &has_default, args),
        }
        .expect("checker already validated this built-in call");
        for slot in &slots {
            match slot {
                ArgSlot::Positional(idx) if *idx == RECEIVER_SENTINEL => {
                    self.lower_expr(receiver.expect("receiver sentinel slot only appears for method-style built-ins"));
                }
                ArgSlot::Positional(idx) | ArgSlot::Named(idx) => self.lower_expr(arg_expr(&args[*idx])),
                ArgSlot::Default => unreachable!("built-ins never declare a parameter default"),
            }
        }
        self.builder.emit(Opcode::CallBuiltin, builtin_id as i32, slots.len() as i32);
    }
}

fn binop_opcode(op: &BinOp) -> Opcode {
    match op {
        BinOp::Add => Opcode::Add,
        BinOp::Sub => Opcode::Sub,
        BinOp::Mul => Opcode::Mul,
        BinOp::Div => Opcode::Div,
        BinOp::Mod => Opcode::Mod,
        BinOp::Lt => Opcode::Lt,
        BinOp::Lte => Opcode::Lte,
        BinOp::Gt => Opcode::Gt,
        BinOp::Gte => Opcode::Gte,
        BinOp::Eq => Opcode::Eq,
        BinOp::Neq => Opcode::Neq,
        BinOp::And | BinOp::Or => unreachable!("short-circuit ops are lowered by lower_and/lower_or"),
    }
}
