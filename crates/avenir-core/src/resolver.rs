//! Upvalue analysis (spec.md §4.2): a two-pass walk that precomputes each
//! function's local-slot layout and its minimal upvalue-capture chain.
//!
//! Pass B is implemented as the classic (Crafting-Interpreters-style)
//! recursive `resolve_upvalue`, which walks outward through the enclosing
//! chain and lazily adds an upvalue descriptor at every level it passes
//! through - that *is* the "collect, then propagate" process spec.md §4.2
//! describes, just expressed as one memoized recursive function instead of
//! two explicit sub-passes.

use ahash::AHashMap;

use crate::ast::{Block, Expr, FunDecl, InterpPart, MethodDecl, NodeId, Program, Stmt};
use crate::ir::UpvalueDesc;

#[derive(Debug, Clone, Default)]
pub struct FunctionInfo {
    /// Ordered local names: for instance methods, slot 0 is the receiver;
    /// then parameters; then declared variables / loop vars / catch vars in
    /// source order, de-duplicated by name.
    pub locals: Vec<String>,
    pub upvalues: Vec<UpvalueDesc>,
    /// Parallel to `upvalues`: the source name each descriptor captures, so
    /// the IR compiler can resolve a free identifier to an upvalue slot
    /// (spec.md §4.3's "local -> upvalue -> function symbol" order).
    pub upvalue_names: Vec<String>,
}

impl FunctionInfo {
    pub fn local_slot(&self, name: &str) -> Option<u32> {
        self.locals.iter().position(|n| n == name).map(|i| i as u32)
    }

    pub fn upvalue_slot(&self, name: &str) -> Option<u32> {
        self.upvalue_names.iter().position(|n| n == name).map(|i| i as u32)
    }

    fn push_local(&mut self, name: &str) {
        if !self.locals.iter().any(|n| n == name) {
            self.locals.push(name.to_string());
        }
    }
}

pub struct Resolver {
    pub infos: AHashMap<NodeId, FunctionInfo>,
    parents: AHashMap<NodeId, NodeId>,
    decls: AHashMap<NodeId, FunDecl>,
}

impl Resolver {
    pub fn function_info(&self, id: NodeId) -> &FunctionInfo {
        self.infos.get(&id).expect("resolver did not visit this function node")
    }

    /// Runs the full two-pass analysis over every function in the program
    /// (top-level functions, methods, and every nested function literal).
    pub fn analyze(program: &Program) -> Resolver {
        let mut r = Resolver { infos: AHashMap::new(), parents: AHashMap::new(), decls: AHashMap::new() };
        for f in &program.functions {
            r.collect(f, None, None);
        }
        for s in &program.structs {
            for m in &s.methods {
                r.collect_method(m);
            }
        }
        // Pass B: for every function, resolve its free identifiers.
        let ids: Vec<NodeId> = r.infos.keys().copied().collect();
        for id in ids {
            r.resolve_free_idents(id);
        }
        r
    }

    fn collect_method(&mut self, m: &MethodDecl) {
        let receiver = if m.is_static { None } else { Some(m.receiver_name.as_str()) };
        self.collect(&m.fun, None, receiver);
    }

    /// Pass A for one function node: builds its locals list and recurses
    /// into nested function literals (recording the parent link).
    fn collect(&mut self, f: &FunDecl, parent: Option<NodeId>, receiver: Option<&str>) {
        let mut info = FunctionInfo::default();
        if let Some(recv) = receiver {
            info.push_local(recv);
        }
        for p in &f.params {
            info.push_local(&p.name);
        }
        let mut nested = Vec::new();
        collect_block_locals(&f.body, &mut info, &mut nested);
        self.infos.insert(f.id, info);
        self.decls.insert(f.id, f.clone());
        if let Some(p) = parent {
            self.parents.insert(f.id, p);
        }
        for nested_decl in nested {
            self.collect(&nested_decl, Some(f.id), None);
        }
    }

    /// Pass B driver for one function: gathers the free identifiers used
    /// directly in its body (not descending into nested literals) and
    /// resolves each one.
    fn resolve_free_idents(&mut self, func_id: NodeId) {
        let Some(decl) = self.find_decl(func_id) else { return };
        let mut used = Vec::new();
        collect_used_idents(&decl.body, &mut used);
        let locals_here: Vec<String> = self.infos[&func_id].locals.clone();
        for name in used {
            if locals_here.iter().any(|l| l == &name) {
                continue;
            }
            self.resolve_upvalue(func_id, &name);
        }
    }

    fn find_decl(&self, func_id: NodeId) -> Option<&FunDecl> {
        self.decls.get(&func_id)
    }

    /// Classic resolve-upvalue: find `name` as a local or upvalue of the
    /// immediately enclosing function (recursing outward as needed),
    /// adding the minimal chain of capture descriptors. Returns the
    /// upvalue index within `func_id`'s own descriptor list, or `None` if
    /// `name` isn't found anywhere in the enclosing chain (i.e. it's a
    /// module/global/function-symbol reference, not a capture).
    fn resolve_upvalue(&mut self, func_id: NodeId, name: &str) -> Option<u32> {
        let parent_id = *self.parents.get(&func_id)?;
        if let Some(local_idx) = self.infos[&parent_id].local_slot(name) {
            return Some(self.add_upvalue(func_id, UpvalueDesc { is_local: true, index: local_idx }, name));
        }
        if let Some(parent_uv_idx) = self.resolve_upvalue(parent_id, name) {
            return Some(self.add_upvalue(func_id, UpvalueDesc { is_local: false, index: parent_uv_idx }, name));
        }
        None
    }

    fn add_upvalue(&mut self, func_id: NodeId, desc: UpvalueDesc, name: &str) -> u32 {
        let info = self.infos.get_mut(&func_id).expect("function must be collected");
        if let Some(i) = info.upvalues.iter().position(|u| *u == desc) {
            return i as u32;
        }
        info.upvalues.push(desc);
        info.upvalue_names.push(name.to_string());
        (info.upvalues.len() - 1) as u32
    }
}

/// Collects locally-declared names (var decls, for-each loop vars, catch
/// vars) in source order, and records nested function literals for
/// separate analysis - without descending into their bodies.
fn collect_block_locals(block: &Block, info: &mut FunctionInfo, nested: &mut Vec<FunDecl>) {
    for stmt in &block.stmts {
        collect_stmt_locals(stmt, info, nested);
    }
}

fn collect_stmt_locals(stmt: &Stmt, info: &mut FunctionInfo, nested: &mut Vec<FunDecl>) {
    match stmt {
        Stmt::VarDecl { name, init, .. } => {
            info.push_local(name);
            collect_expr_nested(init, nested);
        }
        Stmt::Assign { value, .. } => collect_expr_nested(value, nested),
        Stmt::FieldAssign { value, .. } => collect_expr_nested(value, nested),
        Stmt::ExprStmt { expr } => collect_expr_nested(expr, nested),
        Stmt::Return { value, .. } => {
            if let Some(v) = value {
                collect_expr_nested(v, nested);
            }
        }
        Stmt::If { cond, then_block, else_block, .. } => {
            collect_expr_nested(cond, nested);
            collect_block_locals(then_block, info, nested);
            if let Some(e) = else_block {
                collect_block_locals(e, info, nested);
            }
        }
        Stmt::While { cond, body, .. } => {
            collect_expr_nested(cond, nested);
            collect_block_locals(body, info, nested);
        }
        Stmt::For { init, cond, step, body, .. } => {
            if let Some(i) = init {
                collect_stmt_locals(i, info, nested);
            }
            if let Some(c) = cond {
                collect_expr_nested(c, nested);
            }
            if let Some(s) = step {
                collect_stmt_locals(s, info, nested);
            }
            collect_block_locals(body, info, nested);
        }
        Stmt::ForEach { var, iterable, body, .. } => {
            info.push_local(var);
            collect_expr_nested(iterable, nested);
            collect_block_locals(body, info, nested);
        }
        Stmt::Break { .. } | Stmt::Continue { .. } => {}
        Stmt::Try { body, catch_var, catch_body, .. } => {
            collect_block_locals(body, info, nested);
            info.push_local(catch_var);
            collect_block_locals(catch_body, info, nested);
        }
        Stmt::Throw { value, .. } => collect_expr_nested(value, nested),
    }
}

/// Walks an expression only far enough to find nested `FuncLit`s (pass A
/// does not need to know which identifiers are used - that's pass B).
fn collect_expr_nested(expr: &Expr, nested: &mut Vec<FunDecl>) {
    match expr {
        Expr::FuncLit { decl, .. } => nested.push((**decl).clone()),
        Expr::SomeLit { inner, .. } => collect_expr_nested(inner, nested),
        Expr::ListLit { items, .. } => items.iter().for_each(|e| collect_expr_nested(e, nested)),
        Expr::DictLit { entries, .. } => {
            entries.iter().for_each(|(_, e)| collect_expr_nested(e, nested));
        }
        Expr::StructLit { fields, .. } => {
            fields.iter().for_each(|(_, e)| collect_expr_nested(e, nested));
        }
        Expr::Binary { lhs, rhs, .. } => {
            collect_expr_nested(lhs, nested);
            collect_expr_nested(rhs, nested);
        }
        Expr::Unary { operand, .. } => collect_expr_nested(operand, nested),
        Expr::Call { callee, args, .. } => {
            collect_expr_nested(callee, nested);
            for a in args {
                match a {
                    crate::ast::Argument::Positional(e) => collect_expr_nested(e, nested),
                    crate::ast::Argument::Named(n) => collect_expr_nested(&n.value, nested),
                }
            }
        }
        Expr::MemberAccess { target, .. } => collect_expr_nested(target, nested),
        Expr::Index { target, key, .. } => {
            collect_expr_nested(target, nested);
            collect_expr_nested(key, nested);
        }
        Expr::StringInterp { parts, .. } => {
            for p in parts {
                if let InterpPart::Expr(e) = p {
                    collect_expr_nested(e, nested);
                }
            }
        }
        Expr::Ident { .. }
        | Expr::IntLit { .. }
        | Expr::FloatLit { .. }
        | Expr::StringLit { .. }
        | Expr::BoolLit { .. }
        | Expr::NoneLit { .. } => {}
    }
}

/// Collects every free-standing identifier name referenced in this
/// function's body, *not* descending into nested function literals.
fn collect_used_idents(block: &Block, out: &mut Vec<String>) {
    for stmt in &block.stmts {
        used_in_stmt(stmt, out);
    }
}

fn used_in_stmt(stmt: &Stmt, out: &mut Vec<String>) {
    match stmt {
        Stmt::VarDecl { init, .. } => used_in_expr(init, out),
        Stmt::Assign { target, value, .. } => {
            out.push(target.clone());
            used_in_expr(value, out);
        }
        Stmt::FieldAssign { target_name, value, .. } => {
            out.push(target_name.clone());
            used_in_expr(value, out);
        }
        Stmt::ExprStmt { expr } => used_in_expr(expr, out),
        Stmt::Return { value, .. } => {
            if let Some(v) = value {
                used_in_expr(v, out);
            }
        }
        Stmt::If { cond, then_block, else_block, .. } => {
            used_in_expr(cond, out);
            collect_used_idents(then_block, out);
            if let Some(e) = else_block {
                collect_used_idents(e, out);
            }
        }
        Stmt::While { cond, body, .. } => {
            used_in_expr(cond, out);
            collect_used_idents(body, out);
        }
        Stmt::For { init, cond, step, body, .. } => {
            if let Some(i) = init {
                used_in_stmt(i, out);
            }
            if let Some(c) = cond {
                used_in_expr(c, out);
            }
            if let Some(s) = step {
                used_in_stmt(s, out);
            }
            collect_used_idents(body, out);
        }
        Stmt::ForEach { iterable, body, .. } => {
            used_in_expr(iterable, out);
            collect_used_idents(body, out);
        }
        Stmt::Break { .. } | Stmt::Continue { .. } => {}
        Stmt::Try { body, catch_body, .. } => {
            collect_used_idents(body, out);
            collect_used_idents(catch_body, out);
        }
        Stmt::Throw { value, .. } => used_in_expr(value, out),
    }
}

fn used_in_expr(expr: &Expr, out: &mut Vec<String>) {
    match expr {
        Expr::Ident { name, .. } => out.push(name.clone()),
        Expr::FuncLit { .. } => {} // analyzed separately
        Expr::SomeLit { inner, .. } => used_in_expr(inner, out),
        Expr::ListLit { items, .. } => items.iter().for_each(|e| used_in_expr(e, out)),
        Expr::DictLit { entries, .. } => entries.iter().for_each(|(_, e)| used_in_expr(e, out)),
        Expr::StructLit { fields, .. } => fields.iter().for_each(|(_, e)| used_in_expr(e, out)),
        Expr::Binary { lhs, rhs, .. } => {
            used_in_expr(lhs, out);
            used_in_expr(rhs, out);
        }
        Expr::Unary { operand, .. } => used_in_expr(operand, out),
        Expr::Call { callee, args, .. } => {
            used_in_expr(callee, out);
            for a in args {
                match a {
                    crate::ast::Argument::Positional(e) => used_in_expr(e, out),
                    crate::ast::Argument::Named(n) => used_in_expr(&n.value, out),
                }
            }
        }
        Expr::MemberAccess { target, .. } => used_in_expr(target, out),
        Expr::Index { target, key, .. } => {
            used_in_expr(target, out);
            used_in_expr(key, out);
        }
        Expr::StringInterp { parts, .. } => {
            for p in parts {
                if let InterpPart::Expr(e) = p {
                    used_in_expr(e, out);
                }
            }
        }
        Expr::IntLit { .. }
        | Expr::FloatLit { .. }
        | Expr::StringLit { .. }
        | Expr::BoolLit { .. }
        | Expr::NoneLit { .. } => {}
    }
}
