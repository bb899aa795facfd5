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

use chrono::{DateTime, Utc};
use ember_var::{NOTHING, Obj, Var};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A method as stored on its owning object: the source text plus dispatch metadata.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "MethodRepr")]
pub struct MethodDef {
    pub source: String,
    /// Whether players may invoke this method directly as a command.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub callable: bool,
    /// Alternative command words that dispatch to this method.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
}

impl MethodDef {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn callable(mut self) -> Self {
        self.callable = true;
        self
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

/// Older records hold some methods as a bare source string rather than the wrapped form. Both are
/// accepted on read; writes always produce the wrapped form.
#[derive(Deserialize)]
#[serde(untagged)]
enum MethodRepr {
    Bare(String),
    Wrapped {
        source: String,
        #[serde(default)]
        callable: bool,
        #[serde(default)]
        aliases: Vec<String>,
        #[serde(default)]
        help: Option<String>,
    },
}

impl From<MethodRepr> for MethodDef {
    fn from(repr: MethodRepr) -> Self {
        match repr {
            MethodRepr::Bare(source) => MethodDef::new(source),
            MethodRepr::Wrapped {
                source,
                callable,
                aliases,
                help,
            } => MethodDef {
                source,
                callable,
                aliases,
                help,
            },
        }
    }
}

/// The durable record for one object. `properties` and `methods` hold only what this object owns;
/// nothing resolved through the parent chain is ever stored here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub id: Obj,
    pub parent: Obj,
    #[serde(default)]
    pub properties: BTreeMap<String, Var>,
    #[serde(default)]
    pub methods: BTreeMap<String, MethodDef>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub recycled: bool,
}

impl ObjectRecord {
    pub fn new(id: Obj, parent: Obj) -> Self {
        let now = Utc::now();
        Self {
            id,
            parent,
            properties: BTreeMap::new(),
            methods: BTreeMap::new(),
            created: now,
            modified: now,
            recycled: false,
        }
    }

    pub fn has_parent(&self) -> bool {
        self.parent != NOTHING
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_var::{v_int, v_objid};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_bare_method_source_is_wrapped_on_read() {
        let bare: MethodDef = serde_json::from_value(json!("return 1;")).unwrap();
        assert_eq!(bare, MethodDef::new("return 1;"));

        let wrapped: MethodDef = serde_json::from_value(json!({
            "source": "return 2;",
            "callable": true,
            "aliases": ["h"],
        }))
        .unwrap();
        assert_eq!(wrapped, MethodDef::new("return 2;").callable().with_aliases(["h"]));
    }

    #[test]
    fn test_methods_always_written_wrapped() {
        let v = serde_json::to_value(MethodDef::new("return 1;")).unwrap();
        assert_eq!(v, json!({"source": "return 1;"}));
    }

    #[test]
    fn test_record_shape() {
        let mut record = ObjectRecord::new(Obj::mk_id(3), Obj::mk_id(1));
        record.properties.insert("hp".into(), v_int(100));
        record.properties.insert("home".into(), v_objid(2));
        let v = serde_json::to_value(&record).unwrap();
        assert_eq!(v["id"], json!(3));
        assert_eq!(v["parent"], json!(1));
        assert_eq!(v["properties"]["hp"], json!({"type": "number", "value": 100}));
        assert_eq!(v["properties"]["home"], json!({"type": "objref", "value": 2}));
        assert!(v.get("recycled").is_none());

        let back: ObjectRecord = serde_json::from_value(v).unwrap();
        assert_eq!(back, record);
        assert!(back.has_parent());
    }
}
