//! A tiny in-memory AST fixture standing in for what a parser would hand
//! the checker (spec.md §1 excludes lexing/parsing from this core's scope).
//!
//! Builds:
//! ```text
//! fun add(a: int, b: int): int {
//!     return a + b;
//! }
//!
//! fun main(): int {
//!     var xs = [1, 2, 3];
//!     var total = 0;
//!     for each x in xs {
//!         total = add(total, x);
//!     }
//!     return total;
//! }
//! ```

use avenir_core::ast::{Argument, BinOp, Block, Expr, FunDecl, NodeId, Param, Position, Program, Stmt, TypeExpr, TypeExprKind};

struct IdGen(u32);

impl IdGen {
    fn next(&mut self) -> NodeId {
        self.0 += 1;
        NodeId(self.0)
    }
}

fn ty(kind: TypeExprKind) -> TypeExpr {
    TypeExpr::new(kind, Position::default())
}

fn ident(ids: &mut IdGen, name: &str) -> Expr {
    Expr::Ident { id: ids.next(), name: name.to_string(), pos: Position::default() }
}

fn int_lit(ids: &mut IdGen, value: i64) -> Expr {
    Expr::IntLit { id: ids.next(), value }
}

pub fn sum_of_list_program() -> Program {
    let mut ids = IdGen(0);

    let add_fn = FunDecl {
        id: ids.next(),
        name: "add".to_string(),
        is_public: false,
        params: vec![
            Param { name: "a".to_string(), type_expr: ty(TypeExprKind::Int), default: None, pos: Position::default() },
            Param { name: "b".to_string(), type_expr: ty(TypeExprKind::Int), default: None, pos: Position::default() },
        ],
        return_type: ty(TypeExprKind::Int),
        body: Block {
            stmts: vec![Stmt::Return {
                value: Some(Expr::Binary {
                    id: ids.next(),
                    op: BinOp::Add,
                    lhs: Box::new(ident(&mut ids, "a")),
                    rhs: Box::new(ident(&mut ids, "b")),
                    pos: Position::default(),
                }),
                pos: Position::default(),
            }],
        },
        pos: Position::default(),
    };

    let xs_init = Expr::ListLit { id: ids.next(), items: vec![int_lit(&mut ids, 1), int_lit(&mut ids, 2), int_lit(&mut ids, 3)] };
    let xs_decl = Stmt::VarDecl { id: ids.next(), name: "xs".to_string(), init: xs_init, pos: Position::default() };

    let total_decl = Stmt::VarDecl { id: ids.next(), name: "total".to_string(), init: int_lit(&mut ids, 0), pos: Position::default() };

    let add_call = Expr::Call {
        id: ids.next(),
        callee: Box::new(ident(&mut ids, "add")),
        args: vec![Argument::Positional(ident(&mut ids, "total")), Argument::Positional(ident(&mut ids, "x"))],
        pos: Position::default(),
    };
    let accumulate = Stmt::Assign { id: ids.next(), target: "total".to_string(), value: add_call, pos: Position::default() };

    let for_each = Stmt::ForEach {
        var: "x".to_string(),
        iterable: ident(&mut ids, "xs"),
        body: Block { stmts: vec![accumulate] },
        pos: Position::default(),
    };

    let return_total = Stmt::Return { value: Some(ident(&mut ids, "total")), pos: Position::default() };

    let main_fn = FunDecl {
        id: ids.next(),
        name: "main".to_string(),
        is_public: false,
        params: vec![],
        return_type: ty(TypeExprKind::Int),
        body: Block { stmts: vec![xs_decl, total_decl, for_each, return_total] },
        pos: Position::default(),
    };

    Program { module_name: "main".to_string(), imports: vec![], structs: vec![], interfaces: vec![], functions: vec![add_fn, main_fn] }
}
