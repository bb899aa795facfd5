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

//! Registry of the built-in functions callable from method source. Calls are resolved against
//! this table at compile time and dispatched by offset at run time.

use ember_var::{Var, VarType};
use lazy_static::lazy_static;
use std::collections::HashMap;
use ArgCount::{Q, U};
use ArgType::{Any, ObjRef, Typed};

lazy_static! {
    pub static ref BUILTINS: Builtins = Builtins::new();
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgCount {
    Q(usize),
    U,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgType {
    Typed(VarType),
    /// An object reference, or an integer standing in for one.
    ObjRef,
    Any,
}

impl ArgType {
    pub fn accepts(&self, v: &Var) -> bool {
        match self {
            Typed(t) => v.type_code() == *t,
            ObjRef => v.as_object().is_some(),
            Any => true,
        }
    }
}

pub struct Builtin {
    pub name: &'static str,
    pub min_args: ArgCount,
    pub max_args: ArgCount,
    /// Expected types of the leading arguments; arguments past the end are unchecked.
    pub types: Vec<ArgType>,
}

impl Builtin {
    pub fn accepts_arg_count(&self, n: usize) -> bool {
        let above_min = match self.min_args {
            Q(min) => n >= min,
            U => true,
        };
        let below_max = match self.max_args {
            Q(max) => n <= max,
            U => true,
        };
        above_min && below_max
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BuiltinId(pub u16);

pub struct Builtins {
    descriptors: Vec<Builtin>,
    offsets: HashMap<&'static str, BuiltinId>,
}

impl Builtins {
    fn new() -> Self {
        let descriptors = mk_builtin_table();
        let offsets = descriptors
            .iter()
            .enumerate()
            .map(|(i, b)| (b.name, BuiltinId(i as u16)))
            .collect();
        Self {
            descriptors,
            offsets,
        }
    }

    pub fn find_builtin(&self, name: &str) -> Option<BuiltinId> {
        self.offsets.get(name.to_lowercase().as_str()).copied()
    }

    pub fn description_for(&self, id: BuiltinId) -> Option<&Builtin> {
        self.descriptors.get(id.0 as usize)
    }

    pub fn name_of(&self, id: BuiltinId) -> Option<&'static str> {
        self.description_for(id).map(|b| b.name)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.descriptors.iter().map(|b| b.name)
    }
}

/// The registry offset of a builtin that is known to exist. Only for wiring up implementations,
/// where an unknown name is a programming error.
pub fn offset_for_builtin(bf_name: &str) -> usize {
    BUILTINS
        .find_builtin(bf_name)
        .map(|id| id.0 as usize)
        .unwrap_or_else(|| panic!("no builtin named {bf_name}"))
}

fn mk_builtin_table() -> Vec<Builtin> {
    vec![
        Builtin {
            name: "create",
            min_args: Q(0),
            max_args: Q(2),
            types: vec![ObjRef, Typed(VarType::Object)],
        },
        Builtin {
            name: "recycle",
            min_args: Q(1),
            max_args: Q(1),
            types: vec![ObjRef],
        },
        Builtin {
            name: "valid",
            min_args: Q(1),
            max_args: Q(1),
            types: vec![ObjRef],
        },
        Builtin {
            name: "parent",
            min_args: Q(1),
            max_args: Q(1),
            types: vec![ObjRef],
        },
        Builtin {
            name: "chparent",
            min_args: Q(2),
            max_args: Q(2),
            types: vec![ObjRef, ObjRef],
        },
        Builtin {
            name: "alias",
            min_args: Q(1),
            max_args: Q(1),
            types: vec![Typed(VarType::String)],
        },
        Builtin {
            name: "set_alias",
            min_args: Q(2),
            max_args: Q(2),
            types: vec![Typed(VarType::String), ObjRef],
        },
        Builtin {
            name: "properties",
            min_args: Q(1),
            max_args: Q(1),
            types: vec![ObjRef],
        },
        Builtin {
            name: "methods",
            min_args: Q(1),
            max_args: Q(1),
            types: vec![ObjRef],
        },
        Builtin {
            name: "has_property",
            min_args: Q(2),
            max_args: Q(2),
            types: vec![ObjRef, Typed(VarType::String)],
        },
        Builtin {
            name: "has_method",
            min_args: Q(2),
            max_args: Q(2),
            types: vec![ObjRef, Typed(VarType::String)],
        },
        Builtin {
            name: "set_method",
            min_args: Q(3),
            max_args: Q(3),
            types: vec![ObjRef, Typed(VarType::String), Typed(VarType::String)],
        },
        Builtin {
            name: "remove_method",
            min_args: Q(2),
            max_args: Q(2),
            types: vec![ObjRef, Typed(VarType::String)],
        },
        Builtin {
            name: "find_by_property",
            min_args: Q(1),
            max_args: Q(2),
            types: vec![Typed(VarType::String), Any],
        },
        Builtin {
            name: "save",
            min_args: Q(1),
            max_args: Q(1),
            types: vec![ObjRef],
        },
        Builtin {
            name: "raise",
            min_args: Q(1),
            max_args: Q(2),
            types: vec![Any, Typed(VarType::String)],
        },
        Builtin {
            name: "typeof",
            min_args: Q(1),
            max_args: Q(1),
            types: vec![Any],
        },
        Builtin {
            name: "tostr",
            min_args: Q(0),
            max_args: U,
            types: vec![],
        },
        Builtin {
            name: "toint",
            min_args: Q(1),
            max_args: Q(1),
            types: vec![Any],
        },
        Builtin {
            name: "tofloat",
            min_args: Q(1),
            max_args: Q(1),
            types: vec![Any],
        },
        Builtin {
            name: "length",
            min_args: Q(1),
            max_args: Q(1),
            types: vec![Any],
        },
        Builtin {
            name: "keys",
            min_args: Q(1),
            max_args: Q(1),
            types: vec![Typed(VarType::Object)],
        },
        Builtin {
            name: "is_member",
            min_args: Q(2),
            max_args: Q(2),
            types: vec![Any, Typed(VarType::Array)],
        },
        Builtin {
            name: "listappend",
            min_args: Q(2),
            max_args: Q(2),
            types: vec![Typed(VarType::Array), Any],
        },
        Builtin {
            name: "listdelete",
            min_args: Q(2),
            max_args: Q(2),
            types: vec![Typed(VarType::Array), Typed(VarType::Number)],
        },
        Builtin {
            name: "time",
            min_args: Q(0),
            max_args: Q(0),
            types: vec![],
        },
        Builtin {
            name: "random",
            min_args: Q(0),
            max_args: Q(1),
            types: vec![Typed(VarType::Number)],
        },
        Builtin {
            name: "min",
            min_args: Q(1),
            max_args: U,
            types: vec![],
        },
        Builtin {
            name: "max",
            min_args: Q(1),
            max_args: U,
            types: vec![],
        },
        Builtin {
            name: "abs",
            min_args: Q(1),
            max_args: Q(1),
            types: vec![Typed(VarType::Number)],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_var::{v_int, v_objid, v_str};

    #[test]
    fn test_lookup_round_trips_through_offset() {
        let id = BUILTINS.find_builtin("tostr").unwrap();
        assert_eq!(BUILTINS.name_of(id), Some("tostr"));
        assert_eq!(BUILTINS.find_builtin("TOSTR"), Some(id));
        assert!(BUILTINS.find_builtin("no_such_function").is_none());
    }

    #[test]
    fn test_arg_counts() {
        let create = BUILTINS
            .description_for(BUILTINS.find_builtin("create").unwrap())
            .unwrap();
        assert!(create.accepts_arg_count(0));
        assert!(create.accepts_arg_count(2));
        assert!(!create.accepts_arg_count(3));

        let tostr = BUILTINS
            .description_for(BUILTINS.find_builtin("tostr").unwrap())
            .unwrap();
        assert!(tostr.accepts_arg_count(12));
    }

    #[test]
    fn test_objref_accepts_bare_integers() {
        assert!(ObjRef.accepts(&v_objid(3)));
        assert!(ObjRef.accepts(&v_int(3)));
        assert!(!ObjRef.accepts(&v_str("#3")));
    }
}
