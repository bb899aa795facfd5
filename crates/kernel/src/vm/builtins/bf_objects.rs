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

//! Builtin functions for creating, inspecting, and changing objects.

use crate::vm::builtins::{BfCallState, BfErr, BuiltinFunction, runtime_bf_err};
use ember_common::model::MethodDef;
use ember_compiler::{compile, offset_for_builtin};
use ember_var::{
    E_INVARG, E_INVIND, E_PROPNF, NOTHING, Var, v_bool, v_list_iter, v_none, v_obj, v_str,
};
use std::collections::BTreeMap;

/// Usage: `obj create([obj parent [, map properties]])`
/// Creates a new object, optionally inheriting from `parent` and owning the given properties.
fn bf_create(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    let parent = if bf_args.args.is_empty() {
        NOTHING
    } else {
        bf_args.obj_arg(0)?
    };
    if parent != NOTHING && bf_args.manager.load(parent).map_err(runtime_bf_err)?.is_none() {
        return Err(BfErr::ErrValue(
            E_INVIND.with_msg(|| format!("parent {parent} does not exist")),
        ));
    }
    let properties: BTreeMap<String, Var> = match bf_args.args.get(1).and_then(Var::as_map) {
        Some(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        None => BTreeMap::new(),
    };
    let object = bf_args
        .manager
        .create(parent, properties, BTreeMap::new())
        .map_err(runtime_bf_err)?;
    Ok(v_obj(object.id()))
}

/// Usage: `none recycle(obj object)`
fn bf_recycle(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    let object = bf_args.object_arg(0)?;
    bf_args.manager.recycle(object.id()).map_err(runtime_bf_err)?;
    Ok(v_none())
}

/// Usage: `bool valid(obj object)`
/// True if the object exists and has not been recycled.
fn bf_valid(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    let id = bf_args.obj_arg(0)?;
    let object = bf_args.manager.load(id).map_err(runtime_bf_err)?;
    Ok(v_bool(object.is_some()))
}

fn bf_parent(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    let object = bf_args.object_arg(0)?;
    Ok(v_obj(object.parent()))
}

/// Usage: `none chparent(obj object, obj new_parent)`
/// Raises `E_RECMOVE` if the object would become its own ancestor.
fn bf_chparent(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    let object = bf_args.object_arg(0)?;
    let parent = bf_args.obj_arg(1)?;
    object.set_parent(parent).map_err(runtime_bf_err)?;
    Ok(v_none())
}

/// Usage: `obj alias(str name)`
/// The object registered under `name` in the root object's alias table; the same lookup `$name`
/// performs.
fn bf_alias(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    let name = bf_args.str_arg(0)?;
    match bf_args.manager.alias(name).map_err(runtime_bf_err)? {
        Some(target) => Ok(v_obj(target)),
        None => Err(BfErr::ErrValue(
            E_PROPNF.with_msg(|| format!("no alias ${name}")),
        )),
    }
}

fn bf_set_alias(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    let name = bf_args.str_arg(0)?.to_string();
    let target = bf_args.obj_arg(1)?;
    bf_args
        .manager
        .set_alias(&name, target)
        .map_err(runtime_bf_err)?;
    Ok(v_none())
}

/// Usage: `list properties(obj object)`
/// Names of the properties the object itself owns; inherited ones are not included.
fn bf_properties(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    let object = bf_args.object_arg(0)?;
    Ok(v_list_iter(
        object.own_properties().keys().map(|name| v_str(name)),
    ))
}

/// Usage: `list methods(obj object)`
fn bf_methods(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    let object = bf_args.object_arg(0)?;
    Ok(v_list_iter(object.own_methods().keys().map(|name| v_str(name))))
}

fn bf_has_property(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    let object = bf_args.object_arg(0)?;
    let name = bf_args.str_arg(1)?;
    let found = object.has_property(name).map_err(runtime_bf_err)?;
    Ok(v_bool(found))
}

fn bf_has_method(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    let object = bf_args.object_arg(0)?;
    let name = bf_args.str_arg(1)?;
    let found = object.has_method(name).map_err(runtime_bf_err)?;
    Ok(v_bool(found))
}

/// Usage: `none set_method(obj object, str name, str source)`
/// Defines or replaces a method owned by `object`. The source must compile; otherwise
/// `E_INVARG` is raised carrying the compiler's message and nothing is changed. An existing
/// method keeps its command flags and help text.
fn bf_set_method(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    let object = bf_args.object_arg(0)?;
    let name = bf_args.str_arg(1)?;
    let source = bf_args.str_arg(2)?;
    if let Err(e) = compile(source, bf_args.manager.config().compile_options()) {
        return Err(BfErr::ErrValue(E_INVARG.msg(e)));
    }
    let method = match object.own_method(name) {
        Some(existing) => MethodDef {
            source: source.to_string(),
            ..existing
        },
        None => MethodDef::new(source),
    };
    object.set_method(name, method);
    object.save_detached();
    Ok(v_none())
}

/// Usage: `bool remove_method(obj object, str name)`
fn bf_remove_method(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    let object = bf_args.object_arg(0)?;
    let name = bf_args.str_arg(1)?;
    let removed = object.remove_method(name);
    object.save_detached();
    Ok(v_bool(removed))
}

/// Usage: `list find_by_property(str name [, any value])`
/// Every live object whose (possibly inherited) `name` equals `value`, or which has `name` at
/// all when no value is given.
fn bf_find_by_property(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    let name = bf_args.str_arg(0)?;
    let found = bf_args
        .manager
        .find_by_property(name, bf_args.args.get(1))
        .map_err(runtime_bf_err)?;
    Ok(v_list_iter(found.iter().map(|object| v_obj(object.id()))))
}

/// Usage: `bool save(obj object)`
/// Writes the object's unsaved changes and waits for the write. True if anything was written.
fn bf_save(bf_args: &mut BfCallState<'_>) -> Result<Var, BfErr> {
    let object = bf_args.object_arg(0)?;
    let written = object.save().map_err(runtime_bf_err)?;
    Ok(v_bool(written))
}

pub(crate) fn register_bf_objects(builtins: &mut [BuiltinFunction]) {
    builtins[offset_for_builtin("create")] = bf_create;
    builtins[offset_for_builtin("recycle")] = bf_recycle;
    builtins[offset_for_builtin("valid")] = bf_valid;
    builtins[offset_for_builtin("parent")] = bf_parent;
    builtins[offset_for_builtin("chparent")] = bf_chparent;
    builtins[offset_for_builtin("alias")] = bf_alias;
    builtins[offset_for_builtin("set_alias")] = bf_set_alias;
    builtins[offset_for_builtin("properties")] = bf_properties;
    builtins[offset_for_builtin("methods")] = bf_methods;
    builtins[offset_for_builtin("has_property")] = bf_has_property;
    builtins[offset_for_builtin("has_method")] = bf_has_method;
    builtins[offset_for_builtin("set_method")] = bf_set_method;
    builtins[offset_for_builtin("remove_method")] = bf_remove_method;
    builtins[offset_for_builtin("find_by_property")] = bf_find_by_property;
    builtins[offset_for_builtin("save")] = bf_save;
}
