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

use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;

/// The root object. Holds the `aliases` table from which `$name` style references are resolved.
pub const SYSTEM_OBJECT: Obj = Obj::mk_id(0);

/// Used throughout to refer to a missing object value, and as the parent of parentless objects.
pub const NOTHING: Obj = Obj::mk_id(-1);

/// A reference to an object, by its database id.
/// References are not checked for existence; an id may point at nothing at all.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Obj(i64);

impl Obj {
    pub const fn mk_id(id: i64) -> Self {
        Self(id)
    }

    pub const fn id(&self) -> i64 {
        self.0
    }

    #[must_use]
    pub fn to_literal(&self) -> String {
        format!("#{}", self.0)
    }

    #[must_use]
    pub fn is_sysobj(&self) -> bool {
        self.0 == 0
    }

    pub fn is_nothing(&self) -> bool {
        self.0 == -1
    }

    pub fn is_positive(&self) -> bool {
        self.0 >= 0
    }

    /// Big-endian so that byte-ordered keyspaces iterate in id order.
    pub fn as_bytes(&self) -> [u8; 8] {
        self.0.to_be_bytes()
    }

    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        Self(i64::from_be_bytes(bytes))
    }
}

impl Display for Obj {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl Debug for Obj {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl FromStr for Obj {
    type Err = std::num::ParseIntError;

    /// Accepts both `#12` and `12`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let digits = s.strip_prefix('#').unwrap_or(s);
        digits.parse::<i64>().map(Obj)
    }
}

impl From<i64> for Obj {
    fn from(id: i64) -> Self {
        Obj(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_forms() {
        assert_eq!(Obj::mk_id(12).to_string(), "#12");
        assert_eq!(NOTHING.to_literal(), "#-1");
        assert_eq!("#12".parse::<Obj>().unwrap(), Obj::mk_id(12));
        assert_eq!("7".parse::<Obj>().unwrap(), Obj::mk_id(7));
        assert!("#x".parse::<Obj>().is_err());
    }

    #[test]
    fn test_key_bytes_sort_in_id_order() {
        let a = Obj::mk_id(2).as_bytes();
        let b = Obj::mk_id(300).as_bytes();
        assert!(a < b);
        assert_eq!(Obj::from_bytes(b), Obj::mk_id(300));
    }
}
