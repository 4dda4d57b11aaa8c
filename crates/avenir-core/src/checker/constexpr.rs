//! Compile-time constant validation for field/parameter defaults
//! (spec.md §4.1: "literals of primitive kinds, `Some(constant)`, `None`,
//! unary/binary operations over constants, and composite literals whose
//! leaves are all constants").
//!
//! Defaults never reference identifiers, calls, or member access, so this
//! walk is independent of any scope - it only needs the struct table, for
//! struct-literal defaults.

use crate::ast::{BinOp, Expr, UnOp};
use crate::types::Type;

use super::Checker;

/// Validates that `expr` is a constant expression and records a type for
/// every node it touches. `expected` is used only to pick a sensible type
/// for `None` (the checker can't otherwise tell what's inside an empty
/// optional).
pub fn check_constant(checker: &mut Checker<'_>, module: &str, expr: &Expr, expected: &Type) -> Type {
    let ty = match expr {
        Expr::IntLit { .. } => Type::Int,
        Expr::FloatLit { .. } => Type::Float,
        Expr::StringLit { .. } => Type::String,
        Expr::BoolLit { .. } => Type::Bool,
        Expr::NoneLit { .. } => expected.clone(),
        Expr::SomeLit { inner, .. } => {
            let inner_ty = check_constant(checker, module, inner, &Type::Any);
            Type::optional(inner_ty)
        }
        Expr::ListLit { items, .. } => {
            let elems: Vec<Type> = items.iter().map(|i| check_constant(checker, module, i, &Type::Any)).collect();
            Type::list_of(elems)
        }
        Expr::DictLit { entries, .. } => {
            let mut value_ty = Type::Invalid;
            for (_, v) in entries {
                value_ty = check_constant(checker, module, v, &Type::Any);
            }
            Type::dict(value_ty)
        }
        Expr::StructLit { name, fields, pos, .. } => {
            for (_, v) in fields {
                check_constant(checker, module, v, &Type::Any);
            }
            let fqn = checker.struct_fqn(module, name);
            if checker.structs.contains_key(&fqn) {
                Type::Struct(fqn)
            } else if let Some(s) = checker.find_struct(name) {
                Type::Struct(checker.struct_fqn(&s.module.clone(), name))
            } else {
                checker.error(*pos, format!("unknown struct `{name}` in constant expression"));
                Type::Invalid
            }
        }
        Expr::Unary { op, operand, pos, .. } => {
            let operand_ty = check_constant(checker, module, operand, &Type::Any);
            match op {
                UnOp::Neg if operand_ty.is_numeric() => operand_ty,
                UnOp::Not if matches!(operand_ty, Type::Bool) => Type::Bool,
                _ if matches!(operand_ty, Type::Invalid) => Type::Invalid,
                _ => {
                    checker.error(*pos, "invalid operand type in constant expression");
                    Type::Invalid
                }
            }
        }
        Expr::Binary { op, lhs, rhs, pos, .. } => {
            let lhs_ty = check_constant(checker, module, lhs, &Type::Any);
            let rhs_ty = check_constant(checker, module, rhs, &Type::Any);
            binary_const_type(checker, *pos, op, &lhs_ty, &rhs_ty)
        }
        Expr::Ident { pos, .. }
        | Expr::Call { pos, .. }
        | Expr::MemberAccess { pos, .. }
        | Expr::Index { pos, .. } => {
            checker.error(*pos, "default value must be a constant expression");
            Type::Invalid
        }
        Expr::FuncLit { .. } | Expr::StringInterp { .. } => {
            checker.error(expr.pos(), "default value must be a constant expression");
            Type::Invalid
        }
    };
    checker.bindings.record_type(expr.id(), ty.clone());
    ty
}

fn binary_const_type(
    checker: &mut Checker<'_>,
    pos: crate::ast::Position,
    op: &BinOp,
    lhs: &Type,
    rhs: &Type,
) -> Type {
    if matches!(lhs, Type::Invalid) || matches!(rhs, Type::Invalid) {
        return Type::Invalid;
    }
    match op {
        BinOp::Add if matches!(lhs, Type::String) && matches!(rhs, Type::String) => Type::String,
        BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div if lhs.is_numeric() && rhs.is_numeric() => {
            if matches!(lhs, Type::Float) || matches!(rhs, Type::Float) {
                Type::Float
            } else {
                Type::Int
            }
        }
        BinOp::Mod if matches!(lhs, Type::Int) && matches!(rhs, Type::Int) => Type::Int,
        BinOp::Lt | BinOp::Lte | BinOp::Gt | BinOp::Gte if lhs.is_numeric() && rhs.is_numeric() => Type::Bool,
        BinOp::Eq | BinOp::Neq => Type::Bool,
        BinOp::And | BinOp::Or if matches!(lhs, Type::Bool) && matches!(rhs, Type::Bool) => Type::Bool,
        _ => {
            checker.error(pos, "invalid operand types in constant expression");
            Type::Invalid
        }
    }
}
