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

use crate::errors::{Exception, ExecutionFailure, RuntimeError};
use crate::manager::Manager;
use crate::vm::activation::{Activation, CallContext};
use crate::vm::builtins::{BfCallState, BUILTIN_REGISTRY};
use crate::vm::moo_frame::{CatchType, MooStackFrame};
use crate::vm::scatter_assign::scatter_assign;
use ember_compiler::Op;
use ember_var::{
    E_INVARG, E_INVIND, E_MAXREC, E_PROPNF, E_TYPE, E_VERBNF, Error, Obj, Var, Variant, v_bool,
    v_empty_list, v_empty_map, v_error, v_float, v_int, v_list, v_none, v_obj,
};
use std::cmp::Ordering;
use tracing::trace;

/// What one step of execution produced.
enum ExecutionResult {
    More,
    Complete(Var),
}

/// Run `activation` to completion. `depth` is the number of method activations beneath this one.
///
/// Errors raised inside the method, or propagated out of methods it calls, unwind to the
/// innermost matching `except` handler. If there is none the error leaves as an [`Exception`]
/// with this activation added to its trace.
pub(crate) fn execute(
    manager: &Manager,
    mut activation: Activation,
    depth: usize,
) -> Result<Var, Exception> {
    loop {
        match step(manager, &mut activation, depth) {
            Ok(ExecutionResult::More) => continue,
            Ok(ExecutionResult::Complete(v)) => return Ok(v),
            Err(mut exception) => {
                if let Some(label) = activation.frame.catch(&exception.error) {
                    trace!(error = %exception.error, verb = %activation.verb, "caught");
                    activation.frame.push(v_error(exception.error));
                    activation.frame.jump(&label);
                    continue;
                }
                exception.trace.push(activation.trace_frame());
                return Err(exception);
            }
        }
    }
}

fn compare(f: &mut MooStackFrame, test: fn(Ordering) -> bool) -> Result<(), Error> {
    let rhs = f.pop();
    let lhs = f.pop();
    let ordering = lhs.compare(&rhs)?;
    f.push(v_bool(test(ordering)));
    Ok(())
}

fn binary(f: &mut MooStackFrame, op: fn(&Var, &Var) -> Result<Var, Error>) -> Result<(), Error> {
    let rhs = f.pop();
    let lhs = f.pop();
    f.push(op(&lhs, &rhs)?);
    Ok(())
}

fn step(manager: &Manager, a: &mut Activation, depth: usize) -> Result<ExecutionResult, Exception> {
    let f = &mut a.frame;
    let Some(op) = f.program.main_vector.get(f.pc).cloned() else {
        return Ok(ExecutionResult::Complete(v_none()));
    };
    f.pc += 1;

    match op {
        Op::If(label) | Op::IfQues(label) | Op::While(label) => {
            let cond = f.pop();
            if !cond.is_true() {
                f.jump(&label);
            }
        }
        Op::Jump { label } => f.jump(&label),
        Op::ForList { id, end_label } => {
            let (counter, list) = f.peek2();
            let (counter, list) = (counter.as_integer(), list.as_list().cloned());
            let (Some(counter), Some(list)) = (counter, list) else {
                f.pop();
                f.pop();
                return Err(E_TYPE.msg("for loop over a non-list").into());
            };
            let counter = counter as usize;
            if counter >= list.len() {
                f.pop();
                f.pop();
                f.jump(&end_label);
            } else {
                let element = list[counter].clone();
                f.set_env(&id, element);
                f.poke(0, v_int(counter as i64 + 1));
            }
        }
        Op::ForRange { id, end_label } => {
            let (to, from) = f.peek2();
            let (Some(from), Some(to)) = (from.as_integer(), to.as_integer()) else {
                f.pop();
                f.pop();
                return Err(E_TYPE.msg("range bounds must be integers").into());
            };
            if from > to {
                f.pop();
                f.pop();
                f.jump(&end_label);
            } else {
                f.set_env(&id, v_int(from));
                match from.checked_add(1) {
                    Some(next) => f.poke(1, v_int(next)),
                    // The counter is at i64::MAX; pull the bound below it so this is the last pass.
                    None => f.poke(0, v_int(to - 1)),
                }
            }
        }
        Op::Pop => {
            f.pop();
        }
        Op::ImmNone => f.push(v_none()),
        Op::ImmInt(i) => f.push(v_int(i)),
        Op::ImmFloat(fl) => f.push(v_float(fl)),
        Op::ImmObjid(o) => f.push(v_obj(o)),
        Op::ImmEmptyList => f.push(v_empty_list()),
        Op::Imm(slot) => {
            let literal = f.program.literals[slot.0 as usize].clone();
            f.push(literal);
        }
        Op::MakeSingletonList => {
            let v = f.pop();
            f.push(v_list(&[v]));
        }
        Op::ListAddTail => {
            let tail = f.pop();
            let list = f.pop();
            f.push(list.push(&tail)?);
        }
        Op::ListAppend => {
            let tail = f.pop();
            let list = f.pop();
            if tail.as_list().is_none() || list.as_list().is_none() {
                return Err(E_TYPE.into());
            }
            f.push(list.add(&tail)?);
        }
        Op::CheckListForSplice => {
            if f.peek_top().as_list().is_none() {
                f.pop();
                return Err(E_TYPE.msg("only lists can be spliced").into());
            }
        }
        Op::IndexSet => {
            let value = f.pop();
            let index = f.pop();
            let base = f.pop();
            f.push(base.index_set(&index, &value)?);
        }
        Op::MakeMap => f.push(v_empty_map()),
        Op::MapInsert => {
            let value = f.pop();
            let key = f.pop();
            let map = f.pop();
            if key.as_str().is_none() {
                return Err(E_TYPE.msg("map keys must be strings").into());
            }
            f.push(map.index_set(&key, &value)?);
        }
        Op::PutTemp => f.temp = f.peek_top().clone(),
        Op::PushTemp => {
            let temp = std::mem::replace(&mut f.temp, v_none());
            f.push(temp);
        }
        Op::Eq => {
            let rhs = f.pop();
            let lhs = f.pop();
            f.push(v_bool(lhs == rhs));
        }
        Op::Ne => {
            let rhs = f.pop();
            let lhs = f.pop();
            f.push(v_bool(lhs != rhs));
        }
        Op::Gt => compare(f, Ordering::is_gt)?,
        Op::Lt => compare(f, Ordering::is_lt)?,
        Op::Ge => compare(f, Ordering::is_ge)?,
        Op::Le => compare(f, Ordering::is_le)?,
        Op::In => {
            let container = f.pop();
            let needle = f.pop();
            f.push(needle.index_in(&container)?);
        }
        Op::Add => binary(f, Var::add)?,
        Op::Sub => binary(f, Var::sub)?,
        Op::Mul => binary(f, Var::mul)?,
        Op::Div => binary(f, Var::div)?,
        Op::Mod => binary(f, Var::modulus)?,
        Op::Exp => binary(f, Var::pow)?,
        Op::And(label) => {
            if !f.peek_top().is_true() {
                f.jump(&label);
            } else {
                f.pop();
            }
        }
        Op::Or(label) => {
            if f.peek_top().is_true() {
                f.jump(&label);
            } else {
                f.pop();
            }
        }
        Op::Not => {
            let v = f.pop();
            f.push(v_bool(!v.is_true()));
        }
        Op::UnaryMinus => {
            let v = f.pop();
            f.push(v.negative()?);
        }
        Op::Ref => {
            let index = f.pop();
            let base = f.pop();
            f.push(base.index(&index)?);
        }
        Op::PushRef => {
            let (index, base) = f.peek2();
            let value = base.index(index)?;
            f.push(value);
        }
        Op::RangeRef => {
            let to = f.pop();
            let from = f.pop();
            let base = f.pop();
            f.push(base.range(&from, &to)?);
        }
        Op::Push(name) => {
            let v = f.get_env(&name)?.clone();
            f.push(v);
        }
        Op::Put(name) => {
            let v = f.peek_top().clone();
            f.set_env(&name, v);
        }
        Op::GetProp => {
            let property = f.pop();
            let object = f.pop();
            f.push(get_property(manager, &object, &property)?);
        }
        Op::PushGetProp => {
            let (property, object) = f.peek2();
            let value = get_property(manager, object, property)?;
            f.push(value);
        }
        Op::PutProp => {
            let value = f.pop();
            let property = f.pop();
            let object = f.pop();
            put_property(manager, &object, &property, value.clone())?;
            f.push(value);
        }
        Op::CallVerb => {
            let args = a.frame.pop();
            let verb = a.frame.pop();
            let object = a.frame.pop();
            let result = call_verb(manager, a, depth, &object, &verb, &args)?;
            a.frame.push(result);
        }
        Op::FuncCall { id } => {
            let args = f.pop();
            let Some(args) = args.as_list() else {
                return Err(E_TYPE.into());
            };
            let mut bf_args = BfCallState {
                args: args.iter().cloned().collect(),
                manager,
                this: a.this,
                player: a.player,
            };
            let result = BUILTIN_REGISTRY.call(id, &mut bf_args)?;
            a.frame.push(result);
        }
        Op::Scatter(offset) => {
            let table = f.program.scatter_tables[offset.0 as usize].clone();
            let Some(values) = f.peek_top().as_list().cloned() else {
                f.pop();
                return Err(E_TYPE.msg("scatter assignment needs a list").into());
            };
            let values: Vec<Var> = values.into_iter().collect();
            let jump_where = scatter_assign(&table, &values, |name, value| f.set_env(name, value))?;
            match jump_where {
                Some(label) => f.jump(&label),
                None => f.jump(&table.done),
            }
        }
        Op::PushCatchLabel(label) => {
            let codes = f.pop();
            let catch = match codes.variant() {
                Variant::List(codes) => CatchType::Errors(
                    codes
                        .iter()
                        .filter_map(|code| code.as_error().cloned())
                        .collect(),
                ),
                _ => CatchType::Any,
            };
            f.catch_stack.push((catch, label));
        }
        Op::TryExcept { num_excepts, .. } => {
            let split = f.catch_stack.len().saturating_sub(num_excepts as usize);
            let catches = f.catch_stack.split_off(split);
            f.enter_scope(catches);
        }
        Op::EndExcept(label) => {
            f.pop_scope();
            f.jump(&label);
        }
        Op::Exit {
            stack,
            label,
            scope_depth,
        } => {
            while f.scope_stack.len() > scope_depth as usize {
                f.scope_stack.pop();
            }
            f.valstack.truncate(stack.0 as usize);
            f.jump(&label);
        }
        Op::Return => {
            let v = f.pop();
            return Ok(ExecutionResult::Complete(v));
        }
        Op::Return0 | Op::Done => return Ok(ExecutionResult::Complete(v_none())),
    }
    Ok(ExecutionResult::More)
}

fn object_operand(v: &Var) -> Result<Obj, Error> {
    match v.variant() {
        Variant::Obj(o) => Ok(*o),
        _ => Err(E_TYPE.with_msg(|| format!("{v} is not an object"))),
    }
}

fn property_operand(v: &Var) -> Result<&str, Error> {
    v.as_str()
        .ok_or_else(|| E_TYPE.with_msg(|| format!("{v} is not a property name")))
}

fn get_property(manager: &Manager, object: &Var, property: &Var) -> Result<Var, Error> {
    let id = object_operand(object)?;
    let name = property_operand(property)?;
    let Some(object) = manager.load(id).map_err(|e| e.to_error())? else {
        return Err(E_INVIND.with_msg(|| format!("{id} does not exist")));
    };
    object
        .view()
        .get_value(name)
        .map_err(|e| e.to_error())?
        .ok_or_else(|| E_PROPNF.with_msg(|| format!("{id}.{name} not found")))
}

fn put_property(manager: &Manager, object: &Var, property: &Var, value: Var) -> Result<(), Error> {
    let id = object_operand(object)?;
    let name = property_operand(property)?;
    let Some(object) = manager.load(id).map_err(|e| e.to_error())? else {
        return Err(E_INVIND.with_msg(|| format!("{id} does not exist")));
    };
    object.view().set(name, value).map_err(|e| e.to_error())
}

fn call_verb(
    manager: &Manager,
    caller: &Activation,
    depth: usize,
    object: &Var,
    verb: &Var,
    args: &Var,
) -> Result<Var, Exception> {
    let id = object_operand(object)?;
    let Some(verb) = verb.as_str() else {
        return Err(E_TYPE.with_msg(|| format!("{verb} is not a method name")).into());
    };
    let Some(args) = args.as_list() else {
        return Err(E_TYPE.into());
    };
    if depth + 1 >= manager.config().max_stack_depth {
        return Err(E_MAXREC.msg("too many nested method calls").into());
    }
    let target = manager.load(id).map_err(|e| e.to_error())?;
    let Some(target) = target else {
        return Err(E_INVIND.with_msg(|| format!("{id} does not exist")).into());
    };
    let Some((definer, _)) = target.find_method(verb).map_err(|e| e.to_error())? else {
        return Err(E_VERBNF.with_msg(|| format!("{id}:{verb} not found")).into());
    };
    let program = manager
        .compiled_method(definer, verb)
        .map_err(|e| match e {
            RuntimeError::MethodFailed {
                cause: ExecutionFailure::Compile(compile_error),
                ..
            } => E_INVARG.msg(format!("{definer}:{verb} does not compile: {compile_error}")),
            e => e.to_error(),
        })?;
    let activation = Activation::new(
        program,
        id,
        definer,
        verb,
        CallContext::nested(caller),
        args.iter().cloned().collect(),
    );
    execute(manager, activation, depth + 1)
}
