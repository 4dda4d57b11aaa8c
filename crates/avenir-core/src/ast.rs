//! AST node shapes consumed by the checker/resolver/compiler.
//!
//! spec.md §1 treats lexing and parsing as an external collaborator; this
//! module owns only the node shapes that collaborator is contracted to
//! produce (the "AST shape enumerated in §3"). There is no parser here.

use std::fmt;

/// Stable per-node identity, assigned by whatever produced the AST. Used as
/// the hash key for every `Bindings` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, Clone)]
pub struct Program {
    pub module_name: String,
    pub imports: Vec<Import>,
    pub structs: Vec<StructDecl>,
    pub interfaces: Vec<InterfaceDecl>,
    pub functions: Vec<FunDecl>,
}

#[derive(Debug, Clone)]
pub struct Import {
    pub alias: Option<String>,
    /// FQN path segments, e.g. `["pkg", "util"]` for `pkg/util`.
    pub path: Vec<String>,
    pub pos: Position,
}

impl Import {
    pub fn fqn(&self) -> String {
        self.path.join("/")
    }

    pub fn bound_name(&self) -> &str {
        self.alias.as_deref().unwrap_or_else(|| self.path.last().map(String::as_str).unwrap_or(""))
    }
}

/// A type annotation as written by the user. The checker resolves
/// `Named` references (struct/interface names) against the declaring
/// module's scope; everything else maps directly onto [`crate::types::Type`].
#[derive(Debug, Clone)]
pub enum TypeExprKind {
    Int,
    Float,
    String,
    Bool,
    Void,
    Any,
    Error,
    Bytes,
    Named(String),
    List(Box<TypeExpr>),
    Dict(Box<TypeExpr>),
    Optional(Box<TypeExpr>),
    Union(Vec<TypeExpr>),
    Func(Vec<TypeExpr>, Box<TypeExpr>),
}

#[derive(Debug, Clone)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub pos: Position,
}

impl TypeExpr {
    pub fn new(kind: TypeExprKind, pos: Position) -> Self {
        TypeExpr { kind, pos }
    }
}

#[derive(Debug, Clone)]
pub struct FieldDecl {
    pub name: String,
    pub type_expr: TypeExpr,
    pub default: Option<Expr>,
    pub is_public: bool,
    pub pos: Position,
}

#[derive(Debug, Clone)]
pub struct StructDecl {
    pub name: String,
    pub is_public: bool,
    pub is_mutable: bool,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
    pub pos: Position,
}

#[derive(Debug, Clone)]
pub struct InterfaceMethodSig {
    pub name: String,
    pub params: Vec<TypeExpr>,
    pub result: TypeExpr,
    pub pos: Position,
}

#[derive(Debug, Clone)]
pub struct InterfaceDecl {
    pub name: String,
    pub is_public: bool,
    pub methods: Vec<InterfaceMethodSig>,
    pub pos: Position,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub type_expr: TypeExpr,
    pub default: Option<Expr>,
    pub pos: Position,
}

#[derive(Debug, Clone)]
pub struct FunDecl {
    pub id: NodeId,
    pub name: String,
    pub is_public: bool,
    pub params: Vec<Param>,
    pub return_type: TypeExpr,
    pub body: Block,
    pub pos: Position,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub fun: FunDecl,
    /// Name bound to the receiver inside the body (slot 0 at compile time).
    pub receiver_name: String,
    pub receiver_struct: String,
    pub is_static: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    VarDecl { id: NodeId, name: String, init: Expr, pos: Position },
    Assign { id: NodeId, target: String, value: Expr, pos: Position },
    FieldAssign { id: NodeId, target_name: String, field: String, value: Expr, pos: Position },
    ExprStmt { expr: Expr },
    Return { value: Option<Expr>, pos: Position },
    If { cond: Expr, then_block: Block, else_block: Option<Block>, pos: Position },
    While { cond: Expr, body: Block, pos: Position },
    For { init: Option<Box<Stmt>>, cond: Option<Expr>, step: Option<Box<Stmt>>, body: Block, pos: Position },
    ForEach { var: String, iterable: Expr, body: Block, pos: Position },
    Break { pos: Position },
    Continue { pos: Position },
    Try { body: Block, catch_var: String, catch_body: Block, pos: Position },
    Throw { value: Expr, pos: Position },
}

#[derive(Debug, Clone)]
pub enum InterpPart {
    Text(String),
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub enum BinOp {
    Add, Sub, Mul, Div, Mod,
    Lt, Lte, Gt, Gte, Eq, Neq,
    And, Or,
}

#[derive(Debug, Clone)]
pub enum UnOp {
    Not, Neg,
}

#[derive(Debug, Clone)]
pub struct NamedArg {
    pub name: String,
    pub value: Expr,
}

/// One call-site argument, preserving source order so the checker can
/// detect "positional after named" (spec.md §4.1).
#[derive(Debug, Clone)]
pub enum Argument {
    Positional(Expr),
    Named(NamedArg),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Ident { id: NodeId, name: String, pos: Position },
    IntLit { id: NodeId, value: i64 },
    FloatLit { id: NodeId, value: f64 },
    StringLit { id: NodeId, value: String },
    BoolLit { id: NodeId, value: bool },
    NoneLit { id: NodeId },
    SomeLit { id: NodeId, inner: Box<Expr> },
    ListLit { id: NodeId, items: Vec<Expr> },
    DictLit { id: NodeId, entries: Vec<(String, Expr)> },
    StructLit { id: NodeId, name: String, fields: Vec<(String, Expr)>, pos: Position },
    Binary { id: NodeId, op: BinOp, lhs: Box<Expr>, rhs: Box<Expr>, pos: Position },
    Unary { id: NodeId, op: UnOp, operand: Box<Expr>, pos: Position },
    Call { id: NodeId, callee: Box<Expr>, args: Vec<Argument>, pos: Position },
    MemberAccess { id: NodeId, target: Box<Expr>, member: String, pos: Position },
    Index { id: NodeId, target: Box<Expr>, key: Box<Expr>, pos: Position },
    FuncLit { id: NodeId, decl: Box<FunDecl> },
    StringInterp { id: NodeId, parts: Vec<InterpPart> },
}

impl Expr {
    pub fn id(&self) -> NodeId {
        match self {
            Expr::Ident { id, .. }
            | Expr::IntLit { id, .. }
            | Expr::FloatLit { id, .. }
            | Expr::StringLit { id, .. }
            | Expr::BoolLit { id, .. }
            | Expr::NoneLit { id }
            | Expr::SomeLit { id, .. }
            | Expr::ListLit { id, .. }
            | Expr::DictLit { id, .. }
            | Expr::StructLit { id, .. }
            | Expr::Binary { id, .. }
            | Expr::Unary { id, .. }
            | Expr::Call { id, .. }
            | Expr::MemberAccess { id, .. }
            | Expr::Index { id, .. }
            | Expr::FuncLit { id, .. }
            | Expr::StringInterp { id, .. } => *id,
        }
    }

    pub fn pos(&self) -> Position {
        match self {
            Expr::Ident { pos, .. }
            | Expr::Binary { pos, .. }
            | Expr::Unary { pos, .. }
            | Expr::Call { pos, .. }
            | Expr::MemberAccess { pos, .. }
            | Expr::Index { pos, .. }
            | Expr::StructLit { pos, .. } => *pos,
            _ => Position::default(),
        }
    }
}
