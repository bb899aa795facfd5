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

//! The persisted form of a value: `{"type": <tag>, "value": <json>}`, nested for arrays and
//! objects.

use crate::variant::Variant;
use crate::{Error, ErrorCode, Obj, Var};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum TypedValue {
    Null,
    Boolean(bool),
    Number(Number),
    String(String),
    Objref(Obj),
    Array(Vec<Var>),
    Object(BTreeMap<String, Var>),
    Error(ErrorValue),
}

/// Integers and floats share the `number` tag; the JSON literal tells them apart.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ErrorValue {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl From<Var> for TypedValue {
    fn from(v: Var) -> Self {
        match v.variant() {
            Variant::None => TypedValue::Null,
            Variant::Bool(b) => TypedValue::Boolean(*b),
            Variant::Int(i) => TypedValue::Number(Number::Int(*i)),
            Variant::Float(f) => TypedValue::Number(Number::Float(*f)),
            Variant::Str(s) => TypedValue::String(s.clone()),
            Variant::Obj(o) => TypedValue::Objref(*o),
            Variant::List(l) => TypedValue::Array(l.iter().cloned().collect()),
            Variant::Map(m) => TypedValue::Object(
                m.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            ),
            Variant::Err(e) => TypedValue::Error(ErrorValue {
                code: e.err_type.name().to_string(),
                msg: e.msg.clone(),
            }),
        }
    }
}

impl From<TypedValue> for Var {
    fn from(t: TypedValue) -> Self {
        let variant = match t {
            TypedValue::Null => Variant::None,
            TypedValue::Boolean(b) => Variant::Bool(b),
            TypedValue::Number(Number::Int(i)) => Variant::Int(i),
            TypedValue::Number(Number::Float(f)) => Variant::Float(f),
            TypedValue::String(s) => Variant::Str(s),
            TypedValue::Objref(o) => Variant::Obj(o),
            TypedValue::Array(l) => Variant::List(l.into_iter().collect()),
            TypedValue::Object(m) => Variant::Map(m.into_iter().collect()),
            TypedValue::Error(e) => {
                // Unknown codes survive as custom codes rather than failing the whole record.
                let code = ErrorCode::parse_str(&e.code).unwrap_or(ErrorCode::ErrCustom(e.code));
                Variant::Err(Arc::new(Error::new(code, e.msg)))
            }
        };
        Var::from_variant(variant)
    }
}

#[cfg(test)]
mod tests {
    use crate::{E_PROPNF, v_bool, v_err, v_float, v_int, v_list, v_map, v_none, v_objid, v_str};
    use crate::Var;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_scalar_shapes() {
        assert_eq!(
            serde_json::to_value(v_int(100)).unwrap(),
            json!({"type": "number", "value": 100})
        );
        assert_eq!(
            serde_json::to_value(v_str("north")).unwrap(),
            json!({"type": "string", "value": "north"})
        );
        assert_eq!(
            serde_json::to_value(v_objid(4)).unwrap(),
            json!({"type": "objref", "value": 4})
        );
        assert_eq!(
            serde_json::to_value(v_none()).unwrap(),
            json!({"type": "null"})
        );
    }

    #[test]
    fn test_nested_shape() {
        let v = v_map(&[("exits", v_list(&[v_objid(1), v_bool(true)]))]);
        assert_eq!(
            serde_json::to_value(&v).unwrap(),
            json!({"type": "object", "value": {
                "exits": {"type": "array", "value": [
                    {"type": "objref", "value": 1},
                    {"type": "boolean", "value": true},
                ]}
            }})
        );
    }

    #[test]
    fn test_read_back_keeps_int_float_distinction() {
        let int: Var = serde_json::from_value(json!({"type": "number", "value": 110})).unwrap();
        let float: Var = serde_json::from_value(json!({"type": "number", "value": 1.5})).unwrap();
        assert_eq!(int, v_int(110));
        assert_eq!(float, v_float(1.5));
        let whole_float = serde_json::to_string(&v_float(2.0)).unwrap();
        assert_eq!(serde_json::from_str::<Var>(&whole_float).unwrap(), v_float(2.0));
    }

    #[test]
    fn test_null_with_explicit_value() {
        let v: Var = serde_json::from_value(json!({"type": "null", "value": null})).unwrap();
        assert_eq!(v, v_none());
    }

    #[test]
    fn test_error_values() {
        let s = serde_json::to_string(&v_err(E_PROPNF)).unwrap();
        assert_eq!(serde_json::from_str::<Var>(&s).unwrap(), v_err(E_PROPNF));
    }
}
