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

#[macro_use]
extern crate pest_derive;

mod ast;
mod builtins;
mod codegen;
mod labels;
mod names;
mod opcode;
mod parse;
mod program;

#[cfg(test)]
mod codegen_tests;

pub use crate::ast::{
    Arg, BinaryOp, CatchCodes, CondArm, ExceptArm, Expr, ScatterItem, ScatterKind, Stmt,
    StmtNode, UnaryOp,
};
pub use crate::builtins::{
    ArgCount, ArgType, BUILTINS, Builtin, BuiltinId, Builtins, offset_for_builtin,
};
pub use crate::codegen::compile;
pub use crate::labels::{JumpLabel, Label, Offset};
pub use crate::names::{GlobalName, Name, Names};
pub use crate::opcode::{Op, ScatterArgs, ScatterLabel};
pub use crate::parse::{CompileOptions, Parse, parse_program};
pub use crate::program::Program;
