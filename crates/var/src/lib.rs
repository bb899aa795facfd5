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

mod error;
mod obj;
mod scalar;
mod typed;
#[allow(clippy::module_inception)]
mod var;
mod variant;

pub use error::{Error, ErrorCode, ErrorCode::*};
pub use obj::{NOTHING, Obj, SYSTEM_OBJECT};
pub use typed::TypedValue;
pub use var::{
    List, Map, Var, v_bool, v_empty_list, v_empty_map, v_err, v_error, v_float, v_int, v_list,
    v_list_iter, v_map, v_map_iter, v_none, v_obj, v_objid, v_str, v_string,
};
pub use variant::Variant;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

/// The type tag recorded alongside every stored property value, and returned by `typeof()`.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    Ord,
    PartialOrd,
    Hash,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum VarType {
    Null,
    Boolean,
    Number,
    String,
    Objref,
    Array,
    Object,
    Error,
}

#[cfg(test)]
mod tests {
    use crate::VarType;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn var_type_names_round_trip() {
        for t in VarType::iter() {
            let name: &'static str = t.into();
            assert_eq!(VarType::from_str(name).unwrap(), t);
        }
        assert_eq!(VarType::Objref.to_string(), "objref");
    }
}
