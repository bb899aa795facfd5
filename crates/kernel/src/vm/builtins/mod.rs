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

use crate::errors::RuntimeError;
use crate::manager::Manager;
use crate::object::ObjectHandle;
use crate::vm::builtins::bf_list_sets::register_bf_list_sets;
use crate::vm::builtins::bf_num::register_bf_num;
use crate::vm::builtins::bf_objects::register_bf_objects;
use crate::vm::builtins::bf_values::register_bf_values;
use ember_compiler::{BUILTINS, BuiltinId};
use ember_var::{E_ARGS, E_INVARG, E_INVIND, E_TYPE, Error, ErrorCode, Obj, Var};
use lazy_static::lazy_static;
use thiserror::Error;

mod bf_list_sets;
mod bf_num;
mod bf_objects;
mod bf_values;

lazy_static! {
    pub(crate) static ref BUILTIN_REGISTRY: BuiltinRegistry = BuiltinRegistry::new();
}

/// The implementations of the builtin functions, indexed by their offset in the compiler's
/// builtin table.
pub(crate) struct BuiltinRegistry {
    builtins: Vec<BuiltinFunction>,
}

impl BuiltinRegistry {
    pub(crate) fn new() -> Self {
        let mut builtins: Vec<BuiltinFunction> = vec![bf_noop as BuiltinFunction; BUILTINS.len()];
        register_bf_objects(&mut builtins);
        register_bf_values(&mut builtins);
        register_bf_num(&mut builtins);
        register_bf_list_sets(&mut builtins);
        BuiltinRegistry { builtins }
    }

    /// Check the arguments against the builtin's declared arity and leading argument types, then
    /// run it.
    pub(crate) fn call(&self, id: BuiltinId, bf_args: &mut BfCallState<'_>) -> Result<Var, Error> {
        let Some(descriptor) = BUILTINS.description_for(id) else {
            return Err(E_INVARG.msg("unknown builtin"));
        };
        if !descriptor.accepts_arg_count(bf_args.args.len()) {
            return Err(E_ARGS.with_msg(|| {
                format!(
                    "{}() does not take {} arguments",
                    descriptor.name,
                    bf_args.args.len()
                )
            }));
        }
        for (position, (expected, arg)) in descriptor.types.iter().zip(&bf_args.args).enumerate() {
            if !expected.accepts(arg) {
                return Err(E_TYPE.with_msg(|| {
                    format!(
                        "{}() argument {} has the wrong type ({})",
                        descriptor.name,
                        position + 1,
                        arg.type_code()
                    )
                }));
            }
        }
        self.builtins[id.0 as usize](bf_args).map_err(Error::from)
    }
}

/// The arguments and other state passed to a built-in function.
pub(crate) struct BfCallState<'a> {
    /// Arguments passed to the function.
    pub(crate) args: Vec<Var>,
    pub(crate) manager: &'a Manager,
    /// `this` of the calling method.
    pub(crate) this: Obj,
    pub(crate) player: Obj,
}

impl BfCallState<'_> {
    /// The object named by argument `n`, which must exist and not be recycled.
    pub(crate) fn object_arg(&self, n: usize) -> Result<ObjectHandle, BfErr> {
        let id = self.obj_arg(n)?;
        self.manager
            .load(id)
            .map_err(runtime_bf_err)?
            .ok_or_else(|| BfErr::ErrValue(E_INVIND.with_msg(|| format!("{id} does not exist"))))
    }

    pub(crate) fn obj_arg(&self, n: usize) -> Result<Obj, BfErr> {
        self.args
            .get(n)
            .and_then(Var::as_object)
            .ok_or(BfErr::Code(E_TYPE))
    }

    pub(crate) fn str_arg(&self, n: usize) -> Result<&str, BfErr> {
        self.args
            .get(n)
            .and_then(Var::as_str)
            .ok_or(BfErr::Code(E_TYPE))
    }
}

pub(crate) type BuiltinFunction = fn(&mut BfCallState<'_>) -> Result<Var, BfErr>;

#[derive(Debug, Clone, PartialEq, Error)]
pub(crate) enum BfErr {
    #[error("Error in built-in function: {0}")]
    ErrValue(Error),
    #[error("Error in built-in function: {0}")]
    Code(ErrorCode),
    #[error("Raised error: {0}")]
    Raise(Error),
}

impl From<BfErr> for Error {
    fn from(e: BfErr) -> Self {
        match e {
            BfErr::ErrValue(e) | BfErr::Raise(e) => e,
            BfErr::Code(code) => code.into(),
        }
    }
}

pub(crate) fn runtime_bf_err(err: RuntimeError) -> BfErr {
    BfErr::ErrValue(err.to_error())
}

fn bf_noop(_bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    Err(BfErr::ErrValue(E_INVARG.msg("builtin has no implementation")))
}
