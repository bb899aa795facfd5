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

//! Builtin functions for converting, inspecting, and raising values.

use crate::vm::builtins::{BfCallState, BfErr, BuiltinFunction};
use chrono::Utc;
use ember_compiler::offset_for_builtin;
use ember_var::{E_INVARG, E_TYPE, Error, Var, Variant, v_float, v_int, v_str, v_string};

/// Usage: `none raise(any code [, str message])`
/// Raises `code` if it is an error value. Anything else raises `E_INVARG`, with the value's text
/// as the message, so `raise("boom")` fails with the message "boom".
fn bf_raise(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    let message = bf_args.args.get(1).and_then(Var::as_str).map(str::to_string);
    let error = match bf_args.args[0].as_error() {
        Some(e) => Error::new(e.err_type.clone(), message.or_else(|| e.msg.clone())),
        None => Error::new(
            E_INVARG,
            Some(message.unwrap_or_else(|| bf_args.args[0].to_plain_string())),
        ),
    };
    Err(BfErr::Raise(error))
}

/// Usage: `str typeof(any value)`
/// The type tag the value would be stored with: "number", "string", "objref", and so on.
fn bf_typeof(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    let name: &'static str = bf_args.args[0].type_code().into();
    Ok(v_str(name))
}

/// Usage: `str tostr(any value, ...)`
/// Concatenates its arguments as text. Strings are included as they are; everything else in
/// its literal form.
fn bf_tostr(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    let text: String = bf_args.args.iter().map(Var::to_plain_string).collect();
    Ok(v_string(text))
}

/// Usage: `int toint(any value)`
fn bf_toint(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    match bf_args.args[0].variant() {
        Variant::Int(i) => Ok(v_int(*i)),
        Variant::Float(f) => Ok(v_int(f.trunc() as i64)),
        Variant::Bool(b) => Ok(v_int(*b as i64)),
        Variant::Obj(o) => Ok(v_int(o.id())),
        Variant::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(v_int)
            .map_err(|_| BfErr::ErrValue(E_INVARG.with_msg(|| format!("{s:?} is not a number")))),
        _ => Err(BfErr::Code(E_TYPE)),
    }
}

/// Usage: `float tofloat(any value)`
fn bf_tofloat(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    match bf_args.args[0].variant() {
        Variant::Int(i) => Ok(v_float(*i as f64)),
        Variant::Float(f) => Ok(v_float(*f)),
        Variant::Str(s) => s
            .trim()
            .parse::<f64>()
            .map(v_float)
            .map_err(|_| BfErr::ErrValue(E_INVARG.with_msg(|| format!("{s:?} is not a number")))),
        _ => Err(BfErr::Code(E_TYPE)),
    }
}

/// Usage: `int time()`
/// Seconds since the Unix epoch.
fn bf_time(_bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    Ok(v_int(Utc::now().timestamp()))
}

pub(crate) fn register_bf_values(builtins: &mut [BuiltinFunction]) {
    builtins[offset_for_builtin("raise")] = bf_raise;
    builtins[offset_for_builtin("typeof")] = bf_typeof;
    builtins[offset_for_builtin("tostr")] = bf_tostr;
    builtins[offset_for_builtin("toint")] = bf_toint;
    builtins[offset_for_builtin("tofloat")] = bf_tofloat;
    builtins[offset_for_builtin("time")] = bf_time;
}
