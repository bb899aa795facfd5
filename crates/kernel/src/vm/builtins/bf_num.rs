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

//! Builtin functions for numeric operations and random number generation.

use crate::vm::builtins::{BfCallState, BfErr, BuiltinFunction};
use ember_compiler::offset_for_builtin;
use ember_var::{E_INVARG, E_TYPE, Var, VarType, Variant, v_float, v_int};
use rand::Rng;
use std::cmp::Ordering;

/// Usage: `num abs(num x)`
/// The argument can be either integer or floating-point; the result is of the same type.
fn bf_abs(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    match bf_args.args[0].variant() {
        Variant::Int(i) => i
            .checked_abs()
            .map(v_int)
            .ok_or(BfErr::Code(E_INVARG)),
        Variant::Float(f) => Ok(v_float(f.abs())),
        _ => Err(BfErr::ErrValue(E_TYPE.msg("abs() takes a number"))),
    }
}

/// The argument that sorts furthest towards `wanted`. All arguments must be numbers.
fn extreme(bf_args: &BfCallState<'_>, name: &str, wanted: Ordering) -> Result<Var, BfErr> {
    let mut best = bf_args.args[0].clone();
    for arg in &bf_args.args {
        if arg.type_code() != VarType::Number {
            return Err(BfErr::ErrValue(E_TYPE.msg(format!("{name}() takes numbers"))));
        }
        let ordering = arg.compare(&best).map_err(BfErr::ErrValue)?;
        if ordering == wanted {
            best = arg.clone();
        }
    }
    Ok(best)
}

/// Usage: `num min(num x, ...)`
fn bf_min(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    extreme(bf_args, "min", Ordering::Less)
}

/// Usage: `num max(num x, ...)`
fn bf_max(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    extreme(bf_args, "max", Ordering::Greater)
}

/// Usage: `int random([int mod])`
/// With no arguments, returns a random integer from 1 to the largest integer. With one argument,
/// returns a random integer from 1 to `mod` inclusive, raising `E_INVARG` if `mod` is below 1.
fn bf_random(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    let mut rng = rand::rng();
    let Some(max) = bf_args.args.first() else {
        return Ok(v_int(rng.random_range(1..=i64::MAX)));
    };
    let Variant::Int(max) = max.variant() else {
        return Err(BfErr::Code(E_TYPE));
    };
    if *max < 1 {
        return Err(BfErr::Code(E_INVARG));
    }
    Ok(v_int(rng.random_range(1..=*max)))
}

pub(crate) fn register_bf_num(builtins: &mut [BuiltinFunction]) {
    builtins[offset_for_builtin("abs")] = bf_abs;
    builtins[offset_for_builtin("min")] = bf_min;
    builtins[offset_for_builtin("max")] = bf_max;
    builtins[offset_for_builtin("random")] = bf_random;
}
