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

use crate::typed::TypedValue;
use crate::variant::Variant;
use crate::{E_RANGE, E_TYPE, Error, ErrorCode, Obj, VarType};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

pub type List = imbl::Vector<Var>;
pub type Map = imbl::OrdMap<String, Var>;

/// A value as seen by scripts and stored in object properties.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "TypedValue", from = "TypedValue")]
pub struct Var(Variant);

impl Var {
    pub fn from_variant(variant: Variant) -> Self {
        Var(variant)
    }

    pub fn variant(&self) -> &Variant {
        &self.0
    }

    pub fn type_code(&self) -> VarType {
        match &self.0 {
            Variant::None => VarType::Null,
            Variant::Bool(_) => VarType::Boolean,
            Variant::Int(_) | Variant::Float(_) => VarType::Number,
            Variant::Str(_) => VarType::String,
            Variant::Obj(_) => VarType::Objref,
            Variant::List(_) => VarType::Array,
            Variant::Map(_) => VarType::Object,
            Variant::Err(_) => VarType::Error,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self.0, Variant::None)
    }

    pub fn is_true(&self) -> bool {
        match &self.0 {
            Variant::None => false,
            Variant::Bool(b) => *b,
            Variant::Int(i) => *i != 0,
            Variant::Float(f) => *f != 0.0,
            Variant::Str(s) => !s.is_empty(),
            Variant::Obj(o) => !o.is_nothing(),
            Variant::List(l) => !l.is_empty(),
            Variant::Map(m) => !m.is_empty(),
            Variant::Err(_) => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.0 {
            Variant::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match &self.0 {
            Variant::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Object references may also be written as bare integers by convention.
    pub fn as_object(&self) -> Option<Obj> {
        match &self.0 {
            Variant::Obj(o) => Some(*o),
            Variant::Int(i) => Some(Obj::mk_id(*i)),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&List> {
        match &self.0 {
            Variant::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match &self.0 {
            Variant::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_error(&self) -> Option<&Error> {
        match &self.0 {
            Variant::Err(e) => Some(e),
            _ => None,
        }
    }

    /// The text `tostr()` produces: strings unquoted, everything else in literal form.
    pub fn to_plain_string(&self) -> String {
        match &self.0 {
            Variant::Str(s) => s.clone(),
            _ => self.to_string(),
        }
    }

    pub fn len(&self) -> Result<usize, Error> {
        match &self.0 {
            Variant::Str(s) => Ok(s.chars().count()),
            Variant::List(l) => Ok(l.len()),
            Variant::Map(m) => Ok(m.len()),
            _ => Err(E_TYPE.into()),
        }
    }

    pub fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len()? == 0)
    }

    /// 1-based positional index into lists and strings, or key lookup in maps.
    pub fn index(&self, index: &Var) -> Result<Var, Error> {
        match (&self.0, &index.0) {
            (Variant::List(l), Variant::Int(i)) => {
                let pos = one_based(*i, l.len())?;
                Ok(l[pos].clone())
            }
            (Variant::Str(s), Variant::Int(i)) => {
                let pos = one_based(*i, s.chars().count())?;
                let c = s.chars().nth(pos).ok_or(E_RANGE)?;
                Ok(v_string(c.to_string()))
            }
            (Variant::Map(m), Variant::Str(k)) => m
                .get(k)
                .cloned()
                .ok_or_else(|| E_RANGE.with_msg(|| format!("key {k:?} not present"))),
            _ => Err(E_TYPE.into()),
        }
    }

    /// Returns a copy with the element at `index` replaced (or, for maps, inserted).
    pub fn index_set(&self, index: &Var, value: &Var) -> Result<Var, Error> {
        match (&self.0, &index.0) {
            (Variant::List(l), Variant::Int(i)) => {
                let pos = one_based(*i, l.len())?;
                Ok(Var(Variant::List(l.update(pos, value.clone()))))
            }
            (Variant::Str(s), Variant::Int(i)) => {
                let Some(replacement) = value.as_str() else {
                    return Err(E_TYPE.into());
                };
                let mut chars: Vec<char> = s.chars().collect();
                let pos = one_based(*i, chars.len())?;
                let mut replacement = replacement.chars();
                match (replacement.next(), replacement.next()) {
                    (Some(c), None) => chars[pos] = c,
                    _ => return Err(ErrorCode::E_INVARG.into()),
                }
                Ok(v_string(chars.into_iter().collect()))
            }
            (Variant::Map(m), Variant::Str(k)) => {
                Ok(Var(Variant::Map(m.update(k.clone(), value.clone()))))
            }
            _ => Err(E_TYPE.into()),
        }
    }

    /// Inclusive 1-based sub-range. `to < from` yields an empty value of the same kind.
    pub fn range(&self, from: &Var, to: &Var) -> Result<Var, Error> {
        let (Some(from), Some(to)) = (from.as_integer(), to.as_integer()) else {
            return Err(E_TYPE.into());
        };
        let len = self.len()? as i64;
        if to < from {
            return match &self.0 {
                Variant::List(_) => Ok(v_empty_list()),
                Variant::Str(_) => Ok(v_str("")),
                _ => Err(E_TYPE.into()),
            };
        }
        if from < 1 || to > len {
            return Err(E_RANGE.into());
        }
        let (start, end) = ((from - 1) as usize, to as usize);
        match &self.0 {
            Variant::List(l) => Ok(Var(Variant::List(l.clone().slice(start..end)))),
            Variant::Str(s) => Ok(v_string(s.chars().skip(start).take(end - start).collect())),
            _ => Err(E_TYPE.into()),
        }
    }

    /// The `in` operator: 1-based position in a list, character position of a substring,
    /// or whether a map has the key. 0 when absent.
    pub fn index_in(&self, container: &Var) -> Result<Var, Error> {
        match (&container.0, &self.0) {
            (Variant::List(l), _) => Ok(v_int(
                l.iter().position(|v| v == self).map_or(0, |p| p as i64 + 1),
            )),
            (Variant::Str(haystack), Variant::Str(needle)) => {
                let pos = haystack
                    .find(needle.as_str())
                    .map_or(0, |byte_pos| haystack[..byte_pos].chars().count() as i64 + 1);
                Ok(v_int(pos))
            }
            (Variant::Map(m), Variant::Str(k)) => Ok(v_bool(m.contains_key(k))),
            _ => Err(E_TYPE.into()),
        }
    }

    pub fn push(&self, value: &Var) -> Result<Var, Error> {
        match &self.0 {
            Variant::List(l) => {
                let mut l = l.clone();
                l.push_back(value.clone());
                Ok(Var(Variant::List(l)))
            }
            _ => Err(E_TYPE.into()),
        }
    }

    pub fn remove_at(&self, index: &Var) -> Result<Var, Error> {
        match (&self.0, &index.0) {
            (Variant::List(l), Variant::Int(i)) => {
                let pos = one_based(*i, l.len())?;
                let mut l = l.clone();
                l.remove(pos);
                Ok(Var(Variant::List(l)))
            }
            (Variant::Map(m), Variant::Str(k)) => Ok(Var(Variant::Map(m.without(k)))),
            _ => Err(E_TYPE.into()),
        }
    }
}

fn one_based(i: i64, len: usize) -> Result<usize, Error> {
    if i < 1 || i as usize > len {
        return Err(E_RANGE.with_msg(|| format!("index {i} out of range 1..{len}")));
    }
    Ok((i - 1) as usize)
}

fn write_quoted(f: &mut Formatter<'_>, s: &str) -> std::fmt::Result {
    f.write_str("\"")?;
    for c in s.chars() {
        match c {
            '"' => f.write_str("\\\"")?,
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            c => write!(f, "{c}")?,
        }
    }
    f.write_str("\"")
}

/// Literal form, as it would be written in method source.
impl Display for Var {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.0 {
            Variant::None => f.write_str("null"),
            Variant::Bool(b) => write!(f, "{b}"),
            Variant::Int(i) => write!(f, "{i}"),
            Variant::Float(fl) => write!(f, "{fl:?}"),
            Variant::Str(s) => write_quoted(f, s),
            Variant::Obj(o) => write!(f, "{o}"),
            Variant::List(l) => {
                f.write_str("{")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("}")
            }
            Variant::Map(m) => {
                f.write_str("[")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write_quoted(f, k)?;
                    write!(f, " -> {v}")?;
                }
                f.write_str("]")
            }
            Variant::Err(e) => write!(f, "{}", e.err_type),
        }
    }
}

impl Debug for Var {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl From<i64> for Var {
    fn from(i: i64) -> Self {
        v_int(i)
    }
}

impl From<&str> for Var {
    fn from(s: &str) -> Self {
        v_str(s)
    }
}

impl From<String> for Var {
    fn from(s: String) -> Self {
        v_string(s)
    }
}

impl From<bool> for Var {
    fn from(b: bool) -> Self {
        v_bool(b)
    }
}

impl From<Obj> for Var {
    fn from(o: Obj) -> Self {
        v_obj(o)
    }
}

impl From<f64> for Var {
    fn from(f: f64) -> Self {
        v_float(f)
    }
}

pub fn v_int(i: i64) -> Var {
    Var(Variant::Int(i))
}

pub fn v_bool(b: bool) -> Var {
    Var(Variant::Bool(b))
}

pub fn v_none() -> Var {
    Var(Variant::None)
}

pub fn v_str(s: &str) -> Var {
    Var(Variant::Str(s.to_string()))
}

pub fn v_string(s: String) -> Var {
    Var(Variant::Str(s))
}

pub fn v_float(f: f64) -> Var {
    Var(Variant::Float(f))
}

pub fn v_obj(o: Obj) -> Var {
    Var(Variant::Obj(o))
}

pub fn v_objid(id: i64) -> Var {
    v_obj(Obj::mk_id(id))
}

pub fn v_err(code: ErrorCode) -> Var {
    Var(Variant::Err(Arc::new(code.into())))
}

pub fn v_error(e: Error) -> Var {
    Var(Variant::Err(Arc::new(e)))
}

pub fn v_list(values: &[Var]) -> Var {
    Var(Variant::List(values.iter().cloned().collect()))
}

pub fn v_list_iter<IT: IntoIterator<Item = Var>>(values: IT) -> Var {
    Var(Variant::List(values.into_iter().collect()))
}

pub fn v_empty_list() -> Var {
    Var(Variant::List(List::new()))
}

pub fn v_map(pairs: &[(&str, Var)]) -> Var {
    Var(Variant::Map(
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect(),
    ))
}

pub fn v_map_iter<IT: IntoIterator<Item = (String, Var)>>(pairs: IT) -> Var {
    Var(Variant::Map(pairs.into_iter().collect()))
}

pub fn v_empty_map() -> Var {
    Var(Variant::Map(Map::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::E_INVARG;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_index_is_one_based() {
        let l = v_list(&[v_int(10), v_int(20), v_int(30)]);
        assert_eq!(l.index(&v_int(1)).unwrap(), v_int(10));
        assert_eq!(l.index(&v_int(3)).unwrap(), v_int(30));
        assert_eq!(l.index(&v_int(0)).unwrap_err(), E_RANGE);
        assert_eq!(l.index(&v_int(4)).unwrap_err(), E_RANGE);
        assert_eq!(l.index(&v_str("x")).unwrap_err(), E_TYPE);
        assert_eq!(v_str("héllo").index(&v_int(2)).unwrap(), v_str("é"));
    }

    #[test]
    fn test_map_index_and_set() {
        let m = v_map(&[("hp", v_int(100))]);
        assert_eq!(m.index(&v_str("hp")).unwrap(), v_int(100));
        assert_eq!(m.index(&v_str("mp")).unwrap_err(), E_RANGE);
        let m = m.index_set(&v_str("mp"), &v_int(5)).unwrap();
        assert_eq!(m.len().unwrap(), 2);
        assert_eq!(v_str("mp").index_in(&m).unwrap(), v_bool(true));
    }

    #[test]
    fn test_index_set_does_not_alias() {
        let l = v_list(&[v_int(1), v_int(2)]);
        let l2 = l.index_set(&v_int(2), &v_str("two")).unwrap();
        assert_eq!(l, v_list(&[v_int(1), v_int(2)]));
        assert_eq!(l2, v_list(&[v_int(1), v_str("two")]));
        assert_eq!(
            v_str("abc").index_set(&v_int(1), &v_str("xy")).unwrap_err(),
            E_INVARG
        );
    }

    #[test]
    fn test_range() {
        let l = v_list(&[v_int(1), v_int(2), v_int(3), v_int(4)]);
        assert_eq!(
            l.range(&v_int(2), &v_int(3)).unwrap(),
            v_list(&[v_int(2), v_int(3)])
        );
        assert_eq!(l.range(&v_int(3), &v_int(2)).unwrap(), v_empty_list());
        assert_eq!(l.range(&v_int(0), &v_int(2)).unwrap_err(), E_RANGE);
        assert_eq!(
            v_str("hello").range(&v_int(2), &v_int(4)).unwrap(),
            v_str("ell")
        );
    }

    #[test]
    fn test_in() {
        let l = v_list(&[v_str("a"), v_str("b")]);
        assert_eq!(v_str("b").index_in(&l).unwrap(), v_int(2));
        assert_eq!(v_str("z").index_in(&l).unwrap(), v_int(0));
        assert_eq!(v_str("lo").index_in(&v_str("hello")).unwrap(), v_int(4));
        assert_eq!(v_int(1).index_in(&v_int(1)).unwrap_err(), E_TYPE);
    }

    #[test]
    fn test_literal_display() {
        let v = v_list(&[
            v_int(1),
            v_float(2.0),
            v_str("a\"b"),
            v_objid(3),
            v_map(&[("k", v_none())]),
            v_err(E_TYPE),
        ]);
        assert_eq!(v.to_string(), r#"{1, 2.0, "a\"b", #3, ["k" -> null], E_TYPE}"#);
        assert_eq!(v_str("plain").to_plain_string(), "plain");
    }

    #[test]
    fn test_truthiness() {
        assert!(!v_none().is_true());
        assert!(!v_int(0).is_true());
        assert!(v_int(2).is_true());
        assert!(!v_str("").is_true());
        assert!(v_objid(0).is_true());
        assert!(!v_objid(-1).is_true());
        assert!(!v_empty_list().is_true());
    }
}
