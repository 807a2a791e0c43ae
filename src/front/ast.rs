//! The abstract syntax tree.
//!
//! This is the closed node set (`CompileUnit`, `FuncDef`, ...) a MiniC
//! frontend produces. The AST is produced by an external frontend; this core
//! only consumes it, so every node carries the source line the frontend
//! attached to it for use in diagnostics.

use crate::common::{Id, Line};

/// `CompileUnit`: the root of a translation unit, a sequence of top-level
/// function definitions and global declarations.
#[derive(Debug)]
pub struct CompileUnit {
    pub items: Vec<Item>,
}

#[derive(Debug)]
pub enum Item {
    Func(FuncDef),
    Var(VarDecl),
    Array(ArrayDecl),
}

/// `FuncDef`.
#[derive(Debug)]
pub struct FuncDef {
    pub line: Line,
    pub ret_type: LeafType,
    pub name: Id,
    /// `FuncFormalParams` / `FuncFormalParam`.
    pub params: Vec<FuncFormalParam>,
    pub body: Block,
}

#[derive(Debug)]
pub struct FuncFormalParam {
    pub line: Line,
    pub elem_type: LeafType,
    pub name: Id,
    /// `None` for a scalar parameter. `Some(dims)` for an array parameter
    /// that decays to a pointer; `dims[0]` is always the `EmptyDim` (`[]`)
    /// and any further entries are the parameter's remaining, bound
    /// dimensions (`ArrayDim`).
    pub array_dims: Option<Vec<u32>>,
}

/// `LeafType`: the only scalar element type MiniC has, plus `void` for
/// function return types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafType {
    Int,
    Void,
}

/// `Block`.
#[derive(Debug, Default)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug)]
pub enum Stmt {
    /// `DeclStmt` wrapping a `VarDecl` (with optional `VarInit`).
    VarDecl(VarDecl),
    /// `DeclStmt` wrapping an `ArrayDecl`.
    ArrayDecl(ArrayDecl),
    /// `Assign`.
    Assign {
        line: Line,
        target: LValue,
        value: Expr,
    },
    /// `Return`.
    Return { line: Line, value: Option<Expr> },
    /// `If`.
    If {
        line: Line,
        cond: Expr,
        then_block: Block,
        else_block: Option<Block>,
    },
    /// `While`.
    While { line: Line, cond: Expr, body: Block },
    /// `Break`.
    Break(Line),
    /// `Continue`.
    Continue(Line),
    /// A bare `FuncCall` used as a statement (e.g. `putint(x);`).
    Call(Line, FuncCall),
    /// A nested `Block`.
    Block(Block),
}

/// A scalar `VarDecl`, optionally carrying a `VarInit`.
#[derive(Debug)]
pub struct VarDecl {
    pub line: Line,
    pub elem_type: LeafType,
    pub name: Id,
    pub init: Option<Expr>,
}

/// `ArrayDecl`: dimensions are `ArrayDim` expressions, each required to be a
/// compile-time positive integer constant (checked during lowering).
#[derive(Debug)]
pub struct ArrayDecl {
    pub line: Line,
    pub elem_type: LeafType,
    pub name: Id,
    pub dims: Vec<Expr>,
}

/// The left-hand side of an `Assign`: either a plain variable or an
/// `ArrayRef`.
#[derive(Debug)]
pub enum LValue {
    Var(Line, Id),
    ArrayRef {
        line: Line,
        name: Id,
        indices: Vec<Expr>,
    },
}

#[derive(Debug)]
pub struct FuncCall {
    pub callee: Id,
    /// `FuncRealParams`.
    pub args: Vec<Expr>,
}

#[derive(Debug)]
pub enum Expr {
    /// `LeafLiteralUInt`.
    LiteralUInt(Line, i64),
    /// `LeafVarId`.
    VarId(Line, Id),
    /// `ArrayRef` used as an rvalue.
    ArrayRef {
        line: Line,
        name: Id,
        indices: Vec<Expr>,
    },
    Binary {
        line: Line,
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `Neg`.
    Neg(Line, Box<Expr>),
    LogicalNot(Line, Box<Expr>),
    LogicalAnd(Line, Box<Expr>, Box<Expr>),
    LogicalOr(Line, Box<Expr>, Box<Expr>),
    Call(Line, FuncCall),
}

impl Expr {
    pub fn line(&self) -> Line {
        match self {
            Expr::LiteralUInt(line, _)
            | Expr::VarId(line, _)
            | Expr::ArrayRef { line, .. }
            | Expr::Binary { line, .. }
            | Expr::Neg(line, _)
            | Expr::LogicalNot(line, _)
            | Expr::LogicalAnd(line, _, _)
            | Expr::LogicalOr(line, _, _)
            | Expr::Call(line, _) => *line,
        }
    }
}

/// `Add, Sub, Mul, Div, Mod, LT, LE, GT, GE, EQ, NE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge | BinOp::Eq | BinOp::Ne
        )
    }
}
