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

pub use crate::model::mutations::ObjectUpdate;
pub use crate::model::objects::{MethodDef, ObjectRecord};
use ember_var::Obj;
use thiserror::Error;

mod mutations;
mod objects;

/// Name of the property on the root object that maps alias names to object references.
pub const ALIASES_PROPERTY: &str = "aliases";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("Failure to parse string: {0}")]
    StringLexError(String),
    #[error("Failure to parse program @ {line}/{column}: {message}")]
    ParseError {
        line: usize,
        column: usize,
        context: String,
        message: String,
    },
    #[error("Unknown built-in function: {0}")]
    UnknownBuiltinFunction(String),
    #[error("`{0}` used outside of a loop")]
    ExitOutsideLoop(String),
    #[error("Duplicate variable in scope: {0}")]
    DuplicateVariable(String),
    #[error("Invalid l-value for assignment")]
    InvalidAssignment,
    #[error("Disabled feature: {0}")]
    DisabledFeature(String),
}

/// Failures of the durable record store. Each one names the object involved where there is one.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store is not connected")]
    NotConnected,
    #[error("Object not found: {0}")]
    ObjectNotFound(Obj),
    #[error("Could not encode {0}: {1}")]
    EncodingError(Obj, String),
    #[error("Could not decode {0}: {1}")]
    DecodingError(Obj, String),
    #[error("Storage backend failure: {0}")]
    BackendError(String),
}
