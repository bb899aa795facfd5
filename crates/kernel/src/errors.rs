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

use ember_common::model::{CompileError, StoreError};
use ember_var::{
    E_INVARG, E_INVIND, E_PERM, E_QUOTA, E_RECMOVE, E_VERBNF, Error, ErrorCode, Obj,
};
use std::fmt::{Display, Formatter};
use thiserror::Error;

/// One activation in the chain of calls an exception passed through, innermost first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceFrame {
    /// The object the method was invoked on.
    pub this: Obj,
    /// The object the method was found on.
    pub definer: Obj,
    pub method: String,
    pub line: usize,
}

impl Display for TraceFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.this, self.method)?;
        if self.definer != self.this {
            write!(f, " (defined on {})", self.definer)?;
        }
        write!(f, ", line {}", self.line)
    }
}

/// An error raised by method code that was not caught before leaving the outermost call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error}")]
pub struct Exception {
    pub error: Error,
    pub trace: Vec<TraceFrame>,
}

impl From<Error> for Exception {
    fn from(error: Error) -> Self {
        Self {
            error,
            trace: vec![],
        }
    }
}

impl From<ErrorCode> for Exception {
    fn from(code: ErrorCode) -> Self {
        Error::from(code).into()
    }
}

impl Exception {
    /// The trace as one line per frame, innermost first.
    pub fn backtrace(&self) -> Vec<String> {
        self.trace.iter().map(|frame| frame.to_string()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionFailure {
    #[error("compile error: {0}")]
    Compile(CompileError),
    #[error("{0}")]
    Exception(Exception),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("Object {0} not found")]
    NotFound(Obj),
    #[error("Method {1:?} not found on {0}")]
    MethodNotFound(Obj, String),
    #[error("Method {obj}:{method} failed: {cause}")]
    MethodFailed {
        obj: Obj,
        method: String,
        #[source]
        cause: ExecutionFailure,
    },
    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),
    #[error("{0:?} is reserved and cannot be assigned")]
    ReservedKey(String),
    #[error("Making {1} the parent of {0} would create a cycle")]
    RecursiveParent(Obj, Obj),
}

impl RuntimeError {
    /// A plain-text description suitable for showing to a player: no traces, no source chains.
    pub fn user_message(&self) -> String {
        match self {
            RuntimeError::NotFound(_) => "That object no longer exists.".to_string(),
            RuntimeError::MethodNotFound(_, method) => format!("There is no {method} here."),
            RuntimeError::MethodFailed { method, cause, .. } => match cause {
                ExecutionFailure::Compile(_) => format!("{method} could not be compiled."),
                ExecutionFailure::Exception(e) => format!("{method} failed: {}", e.error.message()),
            },
            RuntimeError::Persistence(_) => "Something went wrong saving that.".to_string(),
            RuntimeError::ReservedKey(key) => format!("{key} cannot be changed."),
            RuntimeError::RecursiveParent(..) => {
                "That would make an object its own ancestor.".to_string()
            }
        }
    }

    /// The error value method code sees when a host operation fails underneath it.
    pub(crate) fn to_error(&self) -> Error {
        match self {
            RuntimeError::NotFound(obj) => E_INVIND.msg(format!("{obj} does not exist")),
            RuntimeError::MethodNotFound(obj, method) => {
                E_VERBNF.msg(format!("{obj}:{method} not found"))
            }
            RuntimeError::MethodFailed {
                cause: ExecutionFailure::Exception(e),
                ..
            } => e.error.clone(),
            RuntimeError::MethodFailed { .. } => E_INVARG.msg(self),
            RuntimeError::Persistence(e) => E_QUOTA.msg(e),
            RuntimeError::ReservedKey(_) => E_PERM.msg(self),
            RuntimeError::RecursiveParent(..) => E_RECMOVE.msg(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_var::E_TYPE;

    fn failed(method: &str, error: Error) -> RuntimeError {
        RuntimeError::MethodFailed {
            obj: Obj::mk_id(3),
            method: method.to_string(),
            cause: ExecutionFailure::Exception(Exception {
                error,
                trace: vec![TraceFrame {
                    this: Obj::mk_id(3),
                    definer: Obj::mk_id(1),
                    method: method.to_string(),
                    line: 2,
                }],
            }),
        }
    }

    #[test]
    fn test_method_failure_names_object_method_and_cause() {
        let e = failed("bar", E_INVARG.msg("boom"));
        let text = e.to_string();
        assert!(text.contains("#3"));
        assert!(text.contains("bar"));
        assert!(text.contains("boom"));
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn test_user_message_has_no_trace() {
        let e = failed("bar", E_INVARG.msg("boom"));
        assert_eq!(e.user_message(), "bar failed: boom");
        let RuntimeError::MethodFailed {
            cause: ExecutionFailure::Exception(exception),
            ..
        } = e
        else {
            panic!("expected an exception");
        };
        assert_eq!(exception.backtrace(), vec!["#3:bar (defined on #1), line 2"]);
    }

    #[test]
    fn test_bare_codes_raise_without_trace() {
        let exception = Exception::from(E_TYPE);
        assert_eq!(exception.error.err_type, E_TYPE);
        assert!(exception.trace.is_empty());
        assert_eq!(exception.to_string(), Error::from(E_TYPE).to_string());
    }

    #[test]
    fn test_host_failures_become_script_errors() {
        assert_eq!(RuntimeError::NotFound(Obj::mk_id(9)).to_error().err_type, E_INVIND);
        assert_eq!(
            RuntimeError::MethodNotFound(Obj::mk_id(9), "foo".into())
                .to_error()
                .err_type,
            E_VERBNF
        );
        assert_eq!(RuntimeError::ReservedKey("id".into()).to_error().err_type, E_PERM);
        let nested = failed("bar", E_INVARG.msg("boom"));
        assert_eq!(nested.to_error(), E_INVARG.msg("boom"));
    }
}
