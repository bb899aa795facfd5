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

use crate::labels::{JumpLabel, Label};
use crate::names::{Name, Names};
use crate::opcode::{Op, ScatterArgs};
use ember_var::Var;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// A compiled method body: the opcode vector plus the tables its operands index into.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub literals: Vec<Var>,
    pub jump_labels: Vec<JumpLabel>,
    pub var_names: Names,
    pub scatter_tables: Vec<ScatterArgs>,
    pub main_vector: Arc<Vec<Op>>,
    /// `(first op offset, source line)` for each statement, in op order.
    pub line_number_spans: Vec<(usize, usize)>,
}

impl Program {
    /// Panics when `name` was never used by the program.
    pub fn find_var(&self, name: &str) -> Name {
        self.var_names
            .find_name(name)
            .unwrap_or_else(|| panic!("no variable named {name}"))
    }

    /// Panics when `value` is not in the literal table.
    pub fn find_literal(&self, value: Var) -> Label {
        let slot = self
            .literals
            .iter()
            .position(|known| *known == value)
            .unwrap_or_else(|| panic!("no literal {value}"));
        Label(slot as u16)
    }

    /// The source line of the statement containing the opcode at `pc`.
    pub fn line_no_for(&self, pc: usize) -> usize {
        self.line_number_spans
            .iter()
            .take_while(|(offset, _)| *offset <= pc)
            .last()
            .map(|(_, line)| *line)
            .unwrap_or(1)
    }
}

/// A listing of the program: literal, label, and variable tables, then one line per op with the
/// source line each statement starts on.
impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for (slot, literal) in self.literals.iter().enumerate() {
            writeln!(f, "literal {slot}: {literal}")?;
        }
        for (slot, label) in self.jump_labels.iter().enumerate() {
            let owner = label.name.as_ref().and_then(|n| self.var_names.name_of(n));
            match owner {
                Some(owner) => writeln!(f, "label {slot}: @{} ({owner})", label.position.0)?,
                None => writeln!(f, "label {slot}: @{}", label.position.0)?,
            }
        }
        for (slot, name) in self.var_names.names().iter().enumerate() {
            writeln!(f, "var {slot}: {name}")?;
        }
        let mut spans = self.line_number_spans.iter().peekable();
        for (pc, op) in self.main_vector.iter().enumerate() {
            let mut line = None;
            while let Some((_, starts)) = spans.next_if(|(offset, _)| *offset <= pc) {
                line = Some(starts);
            }
            if let Some(line) = line {
                writeln!(f, "-- line {line}")?;
            }
            writeln!(f, "{pc:>4}  {op:?}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{CompileOptions, compile};

    #[test]
    fn test_listing_marks_statement_lines() {
        let program = compile("x = 1;\nreturn x;", CompileOptions::default()).unwrap();
        let listing = program.to_string();
        assert!(listing.contains("var "), "{listing}");
        assert!(listing.contains("-- line 1"), "{listing}");
        assert!(listing.contains("-- line 2"), "{listing}");
        assert_eq!(program.line_no_for(0), 1);
        assert_eq!(program.line_no_for(program.main_vector.len() - 1), 2);
    }
}
