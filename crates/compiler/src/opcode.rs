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

use crate::builtins::BuiltinId;
use crate::labels::{Label, Offset};
use crate::names::Name;
use ember_var::Obj;

#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    If(Label),
    IfQues(Label),
    While(Label),
    Jump { label: Label },
    ForList { id: Name, end_label: Label },
    ForRange { id: Name, end_label: Label },
    Pop,
    ImmNone,
    ImmInt(i64),
    ImmFloat(f64),
    ImmObjid(Obj),
    ImmEmptyList,
    Imm(Label),
    ListAddTail,
    ListAppend,
    IndexSet,
    MakeSingletonList,
    CheckListForSplice,
    MakeMap,
    MapInsert,
    PutTemp,
    PushTemp,
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    In,
    Mul,
    Sub,
    Div,
    Mod,
    Add,
    Exp,
    And(Label),
    Or(Label),
    Not,
    UnaryMinus,
    Ref,
    Push(Name),
    PushRef,
    Put(Name),
    RangeRef,
    GetProp,
    PushGetProp,
    PutProp,
    CallVerb,
    Return,
    Return0,
    Done,
    FuncCall { id: BuiltinId },
    Scatter(Offset),
    PushCatchLabel(Label),
    TryExcept { num_excepts: u16, end_label: Label },
    EndExcept(Label),
    /// Leave a loop: drop any try scopes opened inside it, cut the value stack back to `stack`
    /// and jump.
    Exit {
        stack: Offset,
        label: Label,
        scope_depth: u16,
    },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScatterLabel {
    Required(Name),
    Rest(Name),
    /// An optional target, with the label of its default-value code if it has one.
    Optional(Name, Option<Label>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScatterArgs {
    pub labels: Vec<ScatterLabel>,
    pub done: Label,
}

impl ScatterArgs {
    pub fn nreq(&self) -> usize {
        self.labels
            .iter()
            .filter(|l| matches!(l, ScatterLabel::Required(_)))
            .count()
    }

    pub fn nopt(&self) -> usize {
        self.labels
            .iter()
            .filter(|l| matches!(l, ScatterLabel::Optional(..)))
            .count()
    }

    pub fn has_rest(&self) -> bool {
        self.labels
            .iter()
            .any(|l| matches!(l, ScatterLabel::Rest(_)))
    }
}

#[cfg(test)]
mod tests {
    use crate::labels::{Label, Offset};
    use crate::names::Name;

    /// Verify we don't go over our 16 byte budget for opcodes.
    #[test]
    fn size_opcode() {
        use crate::opcode::Op;
        use std::mem::size_of;
        assert_eq!(size_of::<Op>(), 16);
        assert_eq!(size_of::<Name>(), 2);
        assert_eq!(size_of::<Offset>(), 2);
        assert_eq!(size_of::<Label>(), 2);
    }
}
