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

//! Attribute-style access to an object, for callers that address properties and methods by a
//! runtime string key. Reads resolve through the parent chain; writes persist in the background.

use crate::errors::RuntimeError;
use crate::object::ObjectHandle;
use ember_var::{Var, v_bool, v_obj};

/// Keys answered by the view itself rather than by a property of the same name.
pub const RESERVED_KEYS: [&str; 3] = ["id", "parent", "recycled"];

/// A method resolved for a particular object, ready to be called with arguments.
#[derive(Debug, Clone)]
pub struct BoundMethod {
    object: ObjectHandle,
    name: String,
}

impl BoundMethod {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn object(&self) -> &ObjectHandle {
        &self.object
    }

    pub fn call(&self, args: Vec<Var>) -> Result<Var, RuntimeError> {
        self.object.call(&self.name, args)
    }
}

#[derive(Debug, Clone)]
pub enum ViewValue {
    Value(Var),
    Method(BoundMethod),
}

#[derive(Debug, Clone)]
pub struct ObjectView {
    object: ObjectHandle,
}

impl ObjectView {
    pub(crate) fn new(object: ObjectHandle) -> Self {
        Self { object }
    }

    pub fn object(&self) -> &ObjectHandle {
        &self.object
    }

    /// A reserved key or a (possibly inherited) property value.
    pub fn get_value(&self, key: &str) -> Result<Option<Var>, RuntimeError> {
        match key {
            "id" => Ok(Some(v_obj(self.object.id()))),
            "parent" => Ok(Some(v_obj(self.object.parent()))),
            "recycled" => Ok(Some(v_bool(self.object.is_recycled()))),
            _ => self.object.get(key),
        }
    }

    /// Reserved keys first, then properties, then methods.
    pub fn get(&self, key: &str) -> Result<Option<ViewValue>, RuntimeError> {
        if let Some(value) = self.get_value(key)? {
            return Ok(Some(ViewValue::Value(value)));
        }
        if self.object.has_method(key)? {
            return Ok(Some(ViewValue::Method(BoundMethod {
                object: self.object.clone(),
                name: key.to_string(),
            })));
        }
        Ok(None)
    }

    /// Set an owned property and queue it to be saved.
    pub fn set(&self, key: &str, value: Var) -> Result<(), RuntimeError> {
        if RESERVED_KEYS.contains(&key) {
            return Err(RuntimeError::ReservedKey(key.to_string()));
        }
        self.object.set(key, value);
        self.object.save_detached();
        Ok(())
    }
}
