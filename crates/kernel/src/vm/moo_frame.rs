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

use ember_compiler::{GlobalName, Label, Name, Program};
use ember_var::{E_VARNF, Error, Var, v_none};
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CatchType {
    Any,
    Errors(Vec<Error>),
}

/// A scope is a record of the current size of the valstack when it was created.
/// On exit, the valstack is eaten back to that size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Scope {
    pub(crate) catches: Vec<(CatchType, Label)>,
    pub(crate) valstack_pos: usize,
}

/// The value stack, local variables, program, program counter, and handler stack of one running
/// method.
#[derive(Debug, Clone)]
pub(crate) struct MooStackFrame {
    /// The program of the method that is currently being executed.
    pub(crate) program: Rc<Program>,
    /// The program counter.
    pub(crate) pc: usize,
    /// The values of the variables currently in scope, by their offset. `None` until assigned.
    pub(crate) environment: Vec<Option<Var>>,
    /// The value stack.
    pub(crate) valstack: Vec<Var>,
    /// The try/except scopes currently open, innermost last.
    pub(crate) scope_stack: Vec<Scope>,
    /// Scratch space for PushTemp and PutTemp opcodes.
    pub(crate) temp: Var,
    /// Scratch space for constructing the catch handlers for a forthcoming try scope.
    pub(crate) catch_stack: Vec<(CatchType, Label)>,
}

impl MooStackFrame {
    pub(crate) fn new(program: Rc<Program>) -> Self {
        let environment = vec![None; program.var_names.width()];
        Self {
            program,
            pc: 0,
            environment,
            valstack: vec![],
            scope_stack: vec![],
            temp: v_none(),
            catch_stack: vec![],
        }
    }

    /// The source line of the opcode most recently executed.
    pub(crate) fn line_no(&self) -> usize {
        self.program.line_no_for(self.pc.saturating_sub(1))
    }

    #[inline]
    pub(crate) fn set_gvar(&mut self, gname: GlobalName, value: Var) {
        self.set_env(&Name::from(gname), value);
    }

    #[inline]
    pub(crate) fn set_env(&mut self, id: &Name, v: Var) {
        self.environment[id.0 as usize] = Some(v);
    }

    /// Return the value of a local variable, or `E_VARNF` if it has never been assigned.
    #[inline]
    pub(crate) fn get_env(&self, id: &Name) -> Result<&Var, Error> {
        match self.environment.get(id.0 as usize) {
            Some(Some(v)) => Ok(v),
            _ => Err(E_VARNF.with_msg(|| {
                let name = self.program.var_names.name_of(id).unwrap_or("?");
                format!("variable {name} is not set")
            })),
        }
    }

    #[inline]
    pub(crate) fn pop(&mut self) -> Var {
        self.valstack
            .pop()
            .unwrap_or_else(|| panic!("stack underflow @ PC: {}", self.pc))
    }

    #[inline]
    pub(crate) fn push(&mut self, v: Var) {
        self.valstack.push(v)
    }

    #[inline]
    pub(crate) fn peek_top(&self) -> &Var {
        self.valstack.last().expect("stack underflow")
    }

    #[inline]
    pub(crate) fn peek_top_mut(&mut self) -> &mut Var {
        self.valstack.last_mut().expect("stack underflow")
    }

    /// The top two values, top first.
    #[inline]
    pub(crate) fn peek2(&self) -> (&Var, &Var) {
        let l = self.valstack.len();
        (&self.valstack[l - 1], &self.valstack[l - 2])
    }

    #[inline]
    pub(crate) fn poke(&mut self, amt: usize, v: Var) {
        let l = self.valstack.len();
        self.valstack[l - amt - 1] = v;
    }

    #[inline]
    pub(crate) fn jump(&mut self, label_id: &Label) {
        let label = &self.program.jump_labels[label_id.0 as usize];
        self.pc = label.position.0 as usize;
    }

    pub(crate) fn enter_scope(&mut self, catches: Vec<(CatchType, Label)>) {
        self.scope_stack.push(Scope {
            catches,
            valstack_pos: self.valstack.len(),
        });
    }

    pub(crate) fn pop_scope(&mut self) -> Option<Scope> {
        let scope = self.scope_stack.pop()?;
        self.valstack.truncate(scope.valstack_pos);
        Some(scope)
    }

    /// Find the innermost open scope with a handler for `error`. Scopes without one are closed
    /// on the way out, and the value stack is cut back to where the matching scope began.
    pub(crate) fn catch(&mut self, error: &Error) -> Option<Label> {
        while let Some(scope) = self.pop_scope() {
            let handler = scope.catches.iter().find(|(catch, _)| match catch {
                CatchType::Any => true,
                CatchType::Errors(codes) => codes.iter().any(|c| c.err_type == error.err_type),
            });
            if let Some((_, label)) = handler {
                return Some(*label);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_compiler::compile;
    use ember_var::{E_DIV, E_RANGE, v_int};

    fn frame(source: &str) -> MooStackFrame {
        MooStackFrame::new(Rc::new(compile(source, Default::default()).unwrap()))
    }

    #[test]
    fn test_unset_variables_are_varnf() {
        let f = frame("x = 1; return x;");
        let x = f.program.var_names.find_name("x").unwrap();
        assert_eq!(f.get_env(&x).unwrap_err().err_type, E_VARNF);
        let mut f = f;
        f.set_env(&x, v_int(1));
        assert_eq!(f.get_env(&x).unwrap(), &v_int(1));
    }

    #[test]
    fn test_catch_skips_non_matching_scopes() {
        let mut f = frame("return 1;");
        f.push(v_int(1));
        f.enter_scope(vec![(CatchType::Any, Label(7))]);
        f.push(v_int(2));
        f.enter_scope(vec![(CatchType::Errors(vec![E_RANGE.into()]), Label(9))]);
        f.push(v_int(3));

        assert_eq!(f.catch(&E_DIV.into()), Some(Label(7)));
        assert!(f.scope_stack.is_empty());
        assert_eq!(f.valstack, vec![v_int(1)]);
        assert_eq!(f.catch(&E_DIV.into()), None);
    }
}
