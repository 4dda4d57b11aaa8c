//! Binary/unary operator typing rules (spec.md §4.1).

use crate::ast::{BinOp, Position, UnOp};
use crate::types::Type;

use super::Checker;

/// Types one binary operator application, recording a diagnostic and
/// returning `Type::Invalid` on a rule violation. Union operands are
/// rejected for every operator except `==`/`!=`, which accept equal unions
/// (spec.md §4.1).
pub fn check_binary(checker: &mut Checker<'_>, pos: Position, op: &BinOp, lhs: &Type, rhs: &Type) -> Type {
    if matches!(lhs, Type::Invalid) || matches!(rhs, Type::Invalid) {
        return Type::Invalid;
    }

    match op {
        BinOp::Add => {
            if matches!(lhs, Type::String) && matches!(rhs, Type::String) {
                Type::String
            } else if lhs.is_numeric() && rhs.is_numeric() {
                numeric_result(lhs, rhs)
            } else {
                checker.error(pos, format!("`+` requires two strings or two numbers, got `{lhs}` and `{rhs}`"));
                Type::Invalid
            }
        }
        BinOp::Sub | BinOp::Mul | BinOp::Div => {
            if lhs.is_union() || rhs.is_union() {
                checker.error(pos, format!("operator `{}` cannot be applied to a union type", op_symbol(op)));
                Type::Invalid
            } else if lhs.is_numeric() && rhs.is_numeric() {
                numeric_result(lhs, rhs)
            } else {
                checker.error(pos, format!("`{}` requires two numbers, got `{lhs}` and `{rhs}`", op_symbol(op)));
                Type::Invalid
            }
        }
        BinOp::Mod => {
            if lhs.is_union() || rhs.is_union() {
                checker.error(pos, format!("operator `{}` cannot be applied to a union type", op_symbol(op)));
                Type::Invalid
            } else if matches!(lhs, Type::Int) && matches!(rhs, Type::Int) {
                Type::Int
            } else {
                checker.error(pos, format!("`%` requires two ints, got `{lhs}` and `{rhs}`"));
                Type::Invalid
            }
        }
        BinOp::Lt | BinOp::Lte | BinOp::Gt | BinOp::Gte => {
            if lhs.is_union() || rhs.is_union() {
                checker.error(pos, format!("operator `{}` cannot be applied to a union type", op_symbol(op)));
                Type::Invalid
            } else if lhs.is_numeric() && rhs.is_numeric() {
                Type::Bool
            } else {
                checker.error(pos, format!("`{}` requires two numbers, got `{lhs}` and `{rhs}`", op_symbol(op)));
                Type::Invalid
            }
        }
        BinOp::Eq | BinOp::Neq => {
            if matches!(lhs, Type::Any) || matches!(rhs, Type::Any) || Type::equal(lhs, rhs) {
                Type::Bool
            } else {
                checker.error(pos, format!("cannot compare `{lhs}` and `{rhs}` for equality"));
                Type::Invalid
            }
        }
        BinOp::And | BinOp::Or => {
            if matches!(lhs, Type::Bool) && matches!(rhs, Type::Bool) {
                Type::Bool
            } else {
                checker.error(pos, format!("`{}` requires two bools, got `{lhs}` and `{rhs}`", op_symbol(op)));
                Type::Invalid
            }
        }
    }
}

pub fn check_unary(checker: &mut Checker<'_>, pos: Position, op: &UnOp, operand: &Type) -> Type {
    if matches!(operand, Type::Invalid) {
        return Type::Invalid;
    }
    match op {
        UnOp::Not => {
            if matches!(operand, Type::Bool) {
                Type::Bool
            } else {
                checker.error(pos, format!("`!` requires a bool, got `{operand}`"));
                Type::Invalid
            }
        }
        UnOp::Neg => {
            if operand.is_numeric() {
                operand.clone()
            } else {
                checker.error(pos, format!("unary `-` requires a number, got `{operand}`"));
                Type::Invalid
            }
        }
    }
}

fn numeric_result(lhs: &Type, rhs: &Type) -> Type {
    if matches!(lhs, Type::Float) || matches!(rhs, Type::Float) {
        Type::Float
    } else {
        Type::Int
    }
}

fn op_symbol(op: &BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::Lt => "<",
        BinOp::Lte => "<=",
        BinOp::Gt => ">",
        BinOp::Gte => ">=",
        BinOp::Eq => "==",
        BinOp::Neq => "!=",
        BinOp::And => "&&",
        BinOp::Or => "||",
    }
}
