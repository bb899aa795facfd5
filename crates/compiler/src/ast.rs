// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! The abstract syntax tree produced by the parser and turned into opcodes by codegen.

use crate::names::Name;
use ember_var::Var;

/// An element of an argument or list-literal list; `@expr` splices a list in place.
#[derive(Debug, PartialEq, Clone)]
pub enum Arg {
    Normal(Expr),
    Splice(Expr),
}

#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum ScatterKind {
    Required,
    Optional,
    Rest,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ScatterItem {
    pub kind: ScatterKind,
    pub id: Name,
    pub expr: Option<Expr>,
}

#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum BinaryOp {
    // Arithmetic; `Add` also concatenates strings and lists.
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Exp,
    // Comparison
    Eq,
    NEq,
    Lt,
    LtE,
    Gt,
    GtE,
    /// 1-based position of the left operand in the right, or 0.
    In,
}

#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// What an `except` arm matches: a list of error values, or `ANY`.
#[derive(Debug, PartialEq, Clone)]
pub enum CatchCodes {
    Codes(Vec<Arg>),
    Any,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expr {
    Assign {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Value(Var),
    Id(Name),
    /// `&&` and `||` are kept apart from `Binary` because they short-circuit.
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    /// `obj.name`, or `obj.(expr)` with a computed name.
    Prop {
        location: Box<Expr>,
        property: Box<Expr>,
    },
    /// A builtin function call.
    Call {
        function: String,
        args: Vec<Arg>,
    },
    /// `obj:name(...)` or `obj:(expr)(...)`.
    Verb {
        location: Box<Expr>,
        verb: Box<Expr>,
        args: Vec<Arg>,
    },
    Range {
        base: Box<Expr>,
        from: Box<Expr>,
        to: Box<Expr>,
    },
    /// `condition ? consequence | alternative`
    Cond {
        condition: Box<Expr>,
        consequence: Box<Expr>,
        alternative: Box<Expr>,
    },
    Index(Box<Expr>, Box<Expr>),
    List(Vec<Arg>),
    Map(Vec<(Expr, Expr)>),
    Scatter(Vec<ScatterItem>, Box<Expr>),
}

#[derive(Debug, PartialEq, Clone)]
pub struct CondArm {
    pub condition: Expr,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, PartialEq, Clone)]
pub struct ExceptArm {
    pub id: Option<Name>,
    pub codes: CatchCodes,
    pub statements: Vec<Stmt>,
}

/// A statement, tagged with the (line, column) it starts at in the source.
#[derive(Debug, PartialEq, Clone)]
pub struct Stmt {
    pub node: StmtNode,
    pub line_col: (usize, usize),
}

impl Stmt {
    pub fn new(node: StmtNode, line_col: (usize, usize)) -> Self {
        Stmt { node, line_col }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum StmtNode {
    Cond {
        arms: Vec<CondArm>,
        otherwise: Option<Vec<Stmt>>,
    },
    ForList {
        id: Name,
        expr: Expr,
        body: Vec<Stmt>,
    },
    ForRange {
        id: Name,
        from: Expr,
        to: Expr,
        body: Vec<Stmt>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    TryExcept {
        body: Vec<Stmt>,
        excepts: Vec<ExceptArm>,
    },
    Break,
    Continue,
    Return(Option<Expr>),
    Expr(Expr),
}
