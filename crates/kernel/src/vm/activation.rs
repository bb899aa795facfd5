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

use crate::errors::TraceFrame;
use crate::object::CommandContext;
use crate::vm::moo_frame::MooStackFrame;
use ember_compiler::{GlobalName, Program};
use ember_var::{NOTHING, Obj, Var, v_list, v_obj, v_str, v_string};
use std::rc::Rc;

/// Who is calling, and how. Becomes the `player`, `caller` and `argstr` of the new activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CallContext {
    pub(crate) player: Obj,
    pub(crate) caller: Obj,
    pub(crate) argstr: String,
    /// Resolve the method as a player command: callable methods only, aliases allowed.
    pub(crate) command: bool,
}

impl CallContext {
    /// A call made by host code on behalf of `caller`, with no player involved.
    pub(crate) fn direct(caller: Obj) -> Self {
        Self {
            player: NOTHING,
            caller,
            argstr: String::new(),
            command: false,
        }
    }

    pub(crate) fn command(caller: Obj, context: &CommandContext) -> Self {
        Self {
            player: context.player,
            caller,
            argstr: context.argstr.clone(),
            command: true,
        }
    }

    /// A method calling another method; the player carries through.
    pub(crate) fn nested(caller: &Activation) -> Self {
        Self {
            player: caller.player,
            caller: caller.this,
            argstr: String::new(),
            command: false,
        }
    }
}

/// One method invocation in progress.
#[derive(Debug, Clone)]
pub(crate) struct Activation {
    pub(crate) frame: MooStackFrame,
    /// The object the method was invoked on.
    pub(crate) this: Obj,
    /// The object the method was found on.
    pub(crate) definer: Obj,
    pub(crate) verb: String,
    pub(crate) player: Obj,
}

impl Activation {
    pub(crate) fn new(
        program: Rc<Program>,
        this: Obj,
        definer: Obj,
        verb: &str,
        context: CallContext,
        args: Vec<Var>,
    ) -> Self {
        let mut frame = MooStackFrame::new(program);
        frame.set_gvar(GlobalName::This, v_obj(this));
        frame.set_gvar(GlobalName::Player, v_obj(context.player));
        frame.set_gvar(GlobalName::Caller, v_obj(context.caller));
        frame.set_gvar(GlobalName::Verb, v_str(verb));
        frame.set_gvar(GlobalName::Args, v_list(&args));
        frame.set_gvar(GlobalName::Argstr, v_string(context.argstr));
        Self {
            frame,
            this,
            definer,
            verb: verb.to_string(),
            player: context.player,
        }
    }

    pub(crate) fn trace_frame(&self) -> TraceFrame {
        TraceFrame {
            this: self.this,
            definer: self.definer,
            method: self.verb.clone(),
            line: self.frame.line_no(),
        }
    }
}
