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

use ErrorCode::*;
use std::fmt::{Display, Formatter};

/// A script-level error value: the code that `except` clauses match against, plus an optional
/// human readable message.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, thiserror::Error)]
#[error("{err_type}{}", .msg.as_ref().map(|m| format!(" ({m})")).unwrap_or_default())]
pub struct Error {
    pub err_type: ErrorCode,
    pub msg: Option<String>,
}

impl Error {
    pub fn new(err_type: ErrorCode, msg: Option<String>) -> Self {
        Self { err_type, msg }
    }

    /// The message if there is one, otherwise the code's own description.
    pub fn message(&self) -> String {
        match &self.msg {
            Some(msg) => msg.clone(),
            None => self.err_type.description().to_string(),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[allow(non_camel_case_types)]
pub enum ErrorCode {
    E_NONE,
    E_TYPE,
    E_DIV,
    E_PERM,
    E_PROPNF,
    E_VERBNF,
    E_VARNF,
    E_INVIND,
    E_RECMOVE,
    E_MAXREC,
    E_RANGE,
    E_ARGS,
    E_INVARG,
    E_QUOTA,
    E_FLOAT,
    // Anything else spelled E_SOMETHING in source.
    ErrCustom(String),
}

impl ErrorCode {
    pub fn parse_str(s: &str) -> Option<Self> {
        let upper = s.to_uppercase();
        let code = match upper.as_str() {
            "E_NONE" => E_NONE,
            "E_TYPE" => E_TYPE,
            "E_DIV" => E_DIV,
            "E_PERM" => E_PERM,
            "E_PROPNF" => E_PROPNF,
            "E_VERBNF" => E_VERBNF,
            "E_VARNF" => E_VARNF,
            "E_INVIND" => E_INVIND,
            "E_RECMOVE" => E_RECMOVE,
            "E_MAXREC" => E_MAXREC,
            "E_RANGE" => E_RANGE,
            "E_ARGS" => E_ARGS,
            "E_INVARG" => E_INVARG,
            "E_QUOTA" => E_QUOTA,
            "E_FLOAT" => E_FLOAT,
            s if s.starts_with("E_") && s.len() > 2 => ErrCustom(upper.clone()),
            _ => return None,
        };
        Some(code)
    }

    pub fn name(&self) -> &str {
        match self {
            E_NONE => "E_NONE",
            E_TYPE => "E_TYPE",
            E_DIV => "E_DIV",
            E_PERM => "E_PERM",
            E_PROPNF => "E_PROPNF",
            E_VERBNF => "E_VERBNF",
            E_VARNF => "E_VARNF",
            E_INVIND => "E_INVIND",
            E_RECMOVE => "E_RECMOVE",
            E_MAXREC => "E_MAXREC",
            E_RANGE => "E_RANGE",
            E_ARGS => "E_ARGS",
            E_INVARG => "E_INVARG",
            E_QUOTA => "E_QUOTA",
            E_FLOAT => "E_FLOAT",
            ErrCustom(name) => name.as_str(),
        }
    }

    pub fn description(&self) -> &str {
        match self {
            E_NONE => "No error",
            E_TYPE => "Type mismatch",
            E_DIV => "Division by zero",
            E_PERM => "Permission denied",
            E_PROPNF => "Property not found",
            E_VERBNF => "Method not found",
            E_VARNF => "Variable not found",
            E_INVIND => "Invalid indirection",
            E_RECMOVE => "Recursive move",
            E_MAXREC => "Too many nested calls",
            E_RANGE => "Range error",
            E_ARGS => "Incorrect number of arguments",
            E_INVARG => "Invalid argument",
            E_QUOTA => "Resource limit exceeded",
            E_FLOAT => "Floating-point arithmetic error",
            ErrCustom(name) => name.as_str(),
        }
    }

    pub fn msg<S: ToString>(self, s: S) -> Error {
        Error::new(self, Some(s.to_string()))
    }

    pub fn with_msg<F>(self, f: F) -> Error
    where
        F: FnOnce() -> String,
    {
        Error::new(self, Some(f()))
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl From<ErrorCode> for Error {
    fn from(val: ErrorCode) -> Self {
        Error::new(val, None)
    }
}

impl PartialEq<ErrorCode> for Error {
    fn eq(&self, other: &ErrorCode) -> bool {
        self.err_type == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("E_TYPE", Some(E_TYPE); "builtin code")]
    #[test_case("e_div", Some(E_DIV); "case insensitive")]
    #[test_case("E_MISSING_KEY", Some(ErrCustom("E_MISSING_KEY".into())); "custom code")]
    #[test_case("TYPE", None; "no prefix")]
    #[test_case("E_", None; "bare prefix")]
    fn test_parse_str(input: &str, expected: Option<ErrorCode>) {
        assert_eq!(ErrorCode::parse_str(input), expected);
    }

    #[test]
    fn test_display_includes_message() {
        assert_eq!(E_INVARG.msg("boom").to_string(), "E_INVARG (boom)");
        assert_eq!(Error::from(E_PERM).to_string(), "E_PERM");
        assert_eq!(Error::from(E_PERM).message(), "Permission denied");
    }
}
