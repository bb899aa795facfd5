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

use crate::var::{List, Map};
use crate::{Error, Obj};
use std::cmp::Ordering;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Our series of types
#[derive(Clone)]
pub enum Variant {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Obj(Obj),
    List(List),
    Map(Map),
    Err(Arc<Error>),
}

impl Variant {
    /// Orders values of different types against each other, so that lists and maps of mixed
    /// content still have a total order.
    fn rank(&self) -> u8 {
        match self {
            Variant::None => 0,
            Variant::Bool(_) => 1,
            Variant::Int(_) => 2,
            Variant::Float(_) => 3,
            Variant::Str(_) => 4,
            Variant::Obj(_) => 5,
            Variant::List(_) => 6,
            Variant::Map(_) => 7,
            Variant::Err(_) => 8,
        }
    }
}

impl Ord for Variant {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Variant::None, Variant::None) => Ordering::Equal,
            (Variant::Bool(l), Variant::Bool(r)) => l.cmp(r),
            (Variant::Int(l), Variant::Int(r)) => l.cmp(r),
            (Variant::Float(l), Variant::Float(r)) => l.total_cmp(r),
            (Variant::Str(l), Variant::Str(r)) => l.cmp(r),
            (Variant::Obj(l), Variant::Obj(r)) => l.cmp(r),
            (Variant::List(l), Variant::List(r)) => l.cmp(r),
            (Variant::Map(l), Variant::Map(r)) => l.cmp(r),
            (Variant::Err(l), Variant::Err(r)) => l.err_type.cmp(&r.err_type),
            (l, r) => l.rank().cmp(&r.rank()),
        }
    }
}

impl PartialOrd for Variant {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Variant {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Variant {}

impl Debug for Variant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Variant::None => write!(f, "None"),
            Variant::Bool(b) => write!(f, "{b}"),
            Variant::Int(i) => write!(f, "{i}"),
            Variant::Float(fl) => write!(f, "{fl:?}"),
            Variant::Str(s) => write!(f, "{s:?}"),
            Variant::Obj(o) => write!(f, "{o}"),
            Variant::List(l) => f.debug_list().entries(l.iter()).finish(),
            Variant::Map(m) => f.debug_map().entries(m.iter()).finish(),
            Variant::Err(e) => write!(f, "{e}"),
        }
    }
}
