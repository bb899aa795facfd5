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

use crate::model::objects::{MethodDef, ObjectRecord};
use chrono::{DateTime, Utc};
use ember_var::{Obj, Var};
use std::collections::BTreeMap;

/// A partial write against one object record. Only the paths named here are touched; for the
/// property and method maps `Some` writes the entry and `None` removes it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectUpdate {
    pub parent: Option<Obj>,
    pub recycled: Option<bool>,
    pub modified: Option<DateTime<Utc>>,
    pub properties: BTreeMap<String, Option<Var>>,
    pub methods: BTreeMap<String, Option<MethodDef>>,
}

impl ObjectUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_parent(mut self, parent: Obj) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn set_recycled(mut self, recycled: bool) -> Self {
        self.recycled = Some(recycled);
        self
    }

    pub fn touch(mut self, at: DateTime<Utc>) -> Self {
        self.modified = Some(at);
        self
    }

    pub fn set_property(mut self, name: &str, value: Var) -> Self {
        self.properties.insert(name.to_string(), Some(value));
        self
    }

    pub fn remove_property(mut self, name: &str) -> Self {
        self.properties.insert(name.to_string(), None);
        self
    }

    pub fn set_method(mut self, name: &str, method: MethodDef) -> Self {
        self.methods.insert(name.to_string(), Some(method));
        self
    }

    pub fn remove_method(mut self, name: &str) -> Self {
        self.methods.insert(name.to_string(), None);
        self
    }

    /// True when nothing other than (possibly) the modification time would be written.
    pub fn is_empty(&self) -> bool {
        self.parent.is_none()
            && self.recycled.is_none()
            && self.properties.is_empty()
            && self.methods.is_empty()
    }

    /// Whether the header (parent, flags, timestamps) portion of the record is touched.
    pub fn touches_header(&self) -> bool {
        self.parent.is_some() || self.recycled.is_some() || self.modified.is_some()
    }

    /// Merge this update into a full record in place.
    pub fn apply_to(&self, record: &mut ObjectRecord) {
        if let Some(parent) = self.parent {
            record.parent = parent;
        }
        if let Some(recycled) = self.recycled {
            record.recycled = recycled;
        }
        if let Some(modified) = self.modified {
            record.modified = modified;
        }
        for (name, value) in &self.properties {
            match value {
                Some(v) => {
                    record.properties.insert(name.clone(), v.clone());
                }
                None => {
                    record.properties.remove(name);
                }
            }
        }
        for (name, method) in &self.methods {
            match method {
                Some(m) => {
                    record.methods.insert(name.clone(), m.clone());
                }
                None => {
                    record.methods.remove(name);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_var::{NOTHING, v_int, v_str};

    #[test]
    fn test_apply_only_touches_named_paths() {
        let mut record = ObjectRecord::new(Obj::mk_id(1), NOTHING);
        record.properties.insert("hp".into(), v_int(100));
        record.properties.insert("name".into(), v_str("orc"));
        record.methods.insert("heal".into(), MethodDef::new("return 1;"));

        let update = ObjectUpdate::new()
            .set_property("hp", v_int(110))
            .remove_property("name")
            .remove_method("missing");
        assert!(!update.is_empty());
        assert!(!update.touches_header());
        update.apply_to(&mut record);

        assert_eq!(record.properties.get("hp"), Some(&v_int(110)));
        assert!(!record.properties.contains_key("name"));
        assert!(record.methods.contains_key("heal"));
        assert_eq!(record.parent, NOTHING);
    }

    #[test]
    fn test_header_updates() {
        let mut record = ObjectRecord::new(Obj::mk_id(2), NOTHING);
        ObjectUpdate::new()
            .set_parent(Obj::mk_id(1))
            .set_recycled(true)
            .apply_to(&mut record);
        assert_eq!(record.parent, Obj::mk_id(1));
        assert!(record.recycled);
    }
}
