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

//! Builtin functions for lists and maps.

use crate::vm::builtins::{BfCallState, BfErr, BuiltinFunction};
use ember_compiler::offset_for_builtin;
use ember_var::{E_TYPE, Var, v_int, v_list_iter, v_str};

/// Usage: `int length(str|list|map value)`
fn bf_length(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    let len = bf_args.args[0].len().map_err(BfErr::ErrValue)?;
    Ok(v_int(len as i64))
}

/// Usage: `list keys(map m)`
fn bf_keys(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    let Some(map) = bf_args.args[0].as_map() else {
        return Err(BfErr::Code(E_TYPE));
    };
    Ok(v_list_iter(map.keys().map(|k| v_str(k))))
}

/// Usage: `int is_member(any value, list list)`
/// The 1-based position of the first element equal to `value`, or 0.
fn bf_is_member(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    let Some(list) = bf_args.args[1].as_list() else {
        return Err(BfErr::Code(E_TYPE));
    };
    let position = list
        .iter()
        .position(|v| *v == bf_args.args[0])
        .map_or(0, |p| p as i64 + 1);
    Ok(v_int(position))
}

/// Usage: `list listappend(list list, any value)`
fn bf_listappend(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    bf_args.args[0]
        .push(&bf_args.args[1])
        .map_err(BfErr::ErrValue)
}

/// Usage: `list listdelete(list list, int index)`
/// Raises `E_RANGE` if `index` is not a position in the list.
fn bf_listdelete(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    bf_args.args[0]
        .remove_at(&bf_args.args[1])
        .map_err(BfErr::ErrValue)
}

pub(crate) fn register_bf_list_sets(builtins: &mut [BuiltinFunction]) {
    builtins[offset_for_builtin("length")] = bf_length;
    builtins[offset_for_builtin("keys")] = bf_keys;
    builtins[offset_for_builtin("is_member")] = bf_is_member;
    builtins[offset_for_builtin("listappend")] = bf_listappend;
    builtins[offset_for_builtin("listdelete")] = bf_listdelete;
}
