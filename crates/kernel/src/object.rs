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

use crate::errors::RuntimeError;
use crate::manager::{LoadOptions, Manager};
use crate::view::ObjectView;
use crate::vm::CallContext;
use chrono::Utc;
use ember_common::model::{MethodDef, ObjectRecord, ObjectUpdate};
use ember_var::{NOTHING, Obj, Var};
use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::rc::Rc;
use tracing::debug;

/// The paths of a record changed locally since it was last written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Dirty {
    /// Parent or recycled flag.
    header: bool,
    properties: BTreeSet<String>,
    methods: BTreeSet<String>,
}

impl Dirty {
    fn is_clean(&self) -> bool {
        !self.header && self.properties.is_empty() && self.methods.is_empty()
    }

    fn merge(&mut self, other: Dirty) {
        self.header |= other.header;
        self.properties.extend(other.properties);
        self.methods.extend(other.methods);
    }
}

/// The resident copy of one object: its record plus what has changed since the last write.
pub(crate) struct ObjectState {
    pub(crate) record: ObjectRecord,
    dirty: Dirty,
}

impl ObjectState {
    pub(crate) fn new(record: ObjectRecord) -> Self {
        Self {
            record,
            dirty: Dirty::default(),
        }
    }

    /// Build the partial write for the dirty paths and mark the state clean. Returns the paths
    /// taken so they can be put back should the write fail.
    fn take_update(&mut self) -> Option<(ObjectUpdate, Dirty)> {
        if self.dirty.is_clean() {
            return None;
        }
        let dirty = std::mem::take(&mut self.dirty);
        let now = Utc::now();
        self.record.modified = now;

        let mut update = ObjectUpdate::new().touch(now);
        if dirty.header {
            update = update
                .set_parent(self.record.parent)
                .set_recycled(self.record.recycled);
        }
        for name in &dirty.properties {
            update = match self.record.properties.get(name) {
                Some(value) => update.set_property(name, value.clone()),
                None => update.remove_property(name),
            };
        }
        for name in &dirty.methods {
            update = match self.record.methods.get(name) {
                Some(method) => update.set_method(name, method.clone()),
                None => update.remove_method(name),
            };
        }
        Some((update, dirty))
    }
}

/// The context a command dispatcher supplies when a player invokes a method directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandContext {
    pub player: Obj,
    /// The unparsed argument text, exactly as typed.
    pub argstr: String,
}

impl CommandContext {
    pub fn new(player: Obj, argstr: impl Into<String>) -> Self {
        Self {
            player,
            argstr: argstr.into(),
        }
    }
}

/// A handle on a resident object. Cloning the handle is cheap, and every clone for the same id
/// obtained from one [`Manager`] shares the same state.
#[derive(Clone)]
pub struct ObjectHandle {
    manager: Manager,
    state: Rc<RefCell<ObjectState>>,
}

impl std::fmt::Debug for ObjectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectHandle")
            .field("id", &self.id())
            .field("parent", &self.parent())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

impl PartialEq for ObjectHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.state, &other.state)
    }
}

impl ObjectHandle {
    pub(crate) fn new(manager: Manager, state: Rc<RefCell<ObjectState>>) -> Self {
        Self { manager, state }
    }

    pub(crate) fn state(&self) -> &Rc<RefCell<ObjectState>> {
        &self.state
    }

    pub fn id(&self) -> Obj {
        self.state.borrow().record.id
    }

    pub fn parent(&self) -> Obj {
        self.state.borrow().record.parent
    }

    pub fn is_recycled(&self) -> bool {
        self.state.borrow().record.recycled
    }

    pub fn is_dirty(&self) -> bool {
        !self.state.borrow().dirty.is_clean()
    }

    /// A copy of the resident record, including unsaved changes.
    pub fn record(&self) -> ObjectRecord {
        self.state.borrow().record.clone()
    }

    pub fn view(&self) -> ObjectView {
        ObjectView::new(self.clone())
    }

    /// Walk from this object up through its ancestors until `probe` finds something. Ancestors
    /// are loaded as needed; each id is visited at most once, so a cyclic chain just ends.
    fn resolve<T>(
        &self,
        mut probe: impl FnMut(&ObjectRecord) -> Option<T>,
    ) -> Result<Option<T>, RuntimeError> {
        let mut visited = HashSet::new();
        let mut current = self.clone();
        loop {
            if !visited.insert(current.id()) {
                return Ok(None);
            }
            if let Some(found) = probe(&current.state.borrow().record) {
                return Ok(Some(found));
            }
            let parent = current.parent();
            if parent == NOTHING {
                return Ok(None);
            }
            let ancestor = self.manager.load_with(
                parent,
                LoadOptions {
                    include_recycled: true,
                },
            )?;
            match ancestor {
                Some(ancestor) => current = ancestor,
                None => return Ok(None),
            }
        }
    }

    /// The value of `name` on this object, or on the nearest ancestor that owns it.
    pub fn get(&self, name: &str) -> Result<Option<Var>, RuntimeError> {
        self.resolve(|record| record.properties.get(name).cloned())
    }

    pub fn get_own(&self, name: &str) -> Option<Var> {
        self.state.borrow().record.properties.get(name).cloned()
    }

    pub fn has_property(&self, name: &str) -> Result<bool, RuntimeError> {
        Ok(self.get(name)?.is_some())
    }

    /// Set an owned property. Ancestors are never written through, so this shadows any inherited
    /// value of the same name.
    pub fn set(&self, name: &str, value: Var) {
        let mut state = self.state.borrow_mut();
        state.record.properties.insert(name.to_string(), value);
        state.dirty.properties.insert(name.to_string());
    }

    /// Remove an owned property, exposing any inherited value again.
    pub fn remove_property(&self, name: &str) -> bool {
        let mut state = self.state.borrow_mut();
        let removed = state.record.properties.remove(name).is_some();
        if removed {
            state.dirty.properties.insert(name.to_string());
        }
        removed
    }

    /// Whether `name` resolves through the ancestors that are already resident. Never touches
    /// the store, so it may report false for a method defined on an unloaded ancestor.
    pub fn has_method_cached(&self, name: &str) -> bool {
        let mut visited = HashSet::new();
        let mut current = Some(self.clone());
        while let Some(object) = current {
            if !visited.insert(object.id()) {
                return false;
            }
            if object.state.borrow().record.methods.contains_key(name) {
                return true;
            }
            current = self.manager.cached(object.parent());
        }
        false
    }

    pub fn has_method(&self, name: &str) -> Result<bool, RuntimeError> {
        Ok(self.find_method(name)?.is_some())
    }

    /// The nearest object in the chain owning a method called `name`, and its definition.
    pub fn find_method(&self, name: &str) -> Result<Option<(Obj, MethodDef)>, RuntimeError> {
        self.resolve(|record| {
            record
                .methods
                .get(name)
                .map(|method| (record.id, method.clone()))
        })
    }

    /// Like `find_method`, but for command dispatch: matches command aliases as well as names,
    /// and only methods flagged as callable. Returns the definer and the method's real name.
    pub fn find_command(&self, word: &str) -> Result<Option<(Obj, String)>, RuntimeError> {
        self.resolve(|record| {
            record
                .methods
                .iter()
                .find(|(name, method)| {
                    method.callable
                        && (name.as_str() == word || method.aliases.iter().any(|a| a == word))
                })
                .map(|(name, _)| (record.id, name.clone()))
        })
    }

    pub fn own_method(&self, name: &str) -> Option<MethodDef> {
        self.state.borrow().record.methods.get(name).cloned()
    }

    /// Define or replace an owned method. The compiled form cached for this object and name is
    /// discarded; compiled forms of same-named methods on other objects are unaffected.
    pub fn set_method(&self, name: &str, method: MethodDef) {
        {
            let mut state = self.state.borrow_mut();
            state.record.methods.insert(name.to_string(), method);
            state.dirty.methods.insert(name.to_string());
        }
        self.manager.forget_compiled(self.id(), name);
    }

    pub fn remove_method(&self, name: &str) -> bool {
        let removed = {
            let mut state = self.state.borrow_mut();
            let removed = state.record.methods.remove(name).is_some();
            if removed {
                state.dirty.methods.insert(name.to_string());
            }
            removed
        };
        if removed {
            self.manager.forget_compiled(self.id(), name);
        }
        removed
    }

    pub fn own_properties(&self) -> BTreeMap<String, Var> {
        self.state.borrow().record.properties.clone()
    }

    pub fn own_methods(&self) -> BTreeMap<String, MethodDef> {
        self.state.borrow().record.methods.clone()
    }

    /// Re-parent this object and write the change immediately.
    pub fn set_parent(&self, parent: Obj) -> Result<(), RuntimeError> {
        let id = self.id();
        if parent == id {
            return Err(RuntimeError::RecursiveParent(id, parent));
        }
        if parent != NOTHING {
            if let Some(new_parent) = self.manager.load_with(
                parent,
                LoadOptions {
                    include_recycled: true,
                },
            )? {
                let loops = new_parent.resolve(|record| (record.id == id).then_some(()))?;
                if loops.is_some() {
                    return Err(RuntimeError::RecursiveParent(id, parent));
                }
            }
        }
        {
            let mut state = self.state.borrow_mut();
            state.record.parent = parent;
            state.dirty.header = true;
        }
        self.save()?;
        Ok(())
    }

    pub(crate) fn mark_recycled(&self) {
        let mut state = self.state.borrow_mut();
        state.record.recycled = true;
        state.dirty.header = true;
    }

    pub fn call(&self, name: &str, args: Vec<Var>) -> Result<Var, RuntimeError> {
        self.manager
            .invoke(self, name, args, CallContext::direct(self.id()))
    }

    /// Invoke a callable method as a player command. `word` may be the method's name or one of
    /// its command aliases.
    pub fn call_command(
        &self,
        word: &str,
        args: Vec<Var>,
        context: &CommandContext,
    ) -> Result<Var, RuntimeError> {
        self.manager
            .invoke(self, word, args, CallContext::command(self.id(), context))
    }

    /// Write the dirty paths, if there are any, and wait for the write. Returns whether anything
    /// was written. On failure the object stays dirty.
    pub fn save(&self) -> Result<bool, RuntimeError> {
        let id = self.id();
        let Some((update, dirty)) = self.state.borrow_mut().take_update() else {
            return Ok(false);
        };
        if let Err(e) = self.manager.writer().write(id, update) {
            self.state.borrow_mut().dirty.merge(dirty);
            return Err(e.into());
        }
        debug!(?id, "saved object");
        Ok(true)
    }

    /// Queue a write of the dirty paths and return at once. Failures are logged, not reported.
    pub fn save_detached(&self) {
        let id = self.id();
        let Some((update, _)) = self.state.borrow_mut().take_update() else {
            return;
        };
        self.manager.writer().write_detached(id, update);
    }

    /// Discard the resident state, including unsaved changes and compiled methods, in favour of
    /// what is stored.
    pub fn refresh(&self) -> Result<(), RuntimeError> {
        let id = self.id();
        self.manager.invalidate(id);
        let Some(record) = self.manager.fetch(id)? else {
            return Err(RuntimeError::NotFound(id));
        };
        *self.state.borrow_mut() = ObjectState::new(record);
        self.manager.recache(self);
        debug!(?id, "refreshed object");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_var::{v_int, v_str};

    #[test]
    fn test_update_covers_only_dirty_paths() {
        let mut record = ObjectRecord::new(Obj::mk_id(1), NOTHING);
        record.properties.insert("hp".into(), v_int(100));
        record.properties.insert("name".into(), v_str("orc"));
        let mut state = ObjectState::new(record);
        assert!(state.take_update().is_none());

        state.record.properties.insert("hp".into(), v_int(110));
        state.dirty.properties.insert("hp".into());
        state.record.properties.remove("name");
        state.dirty.properties.insert("name".into());

        let (update, dirty) = state.take_update().unwrap();
        assert_eq!(update.properties.get("hp"), Some(&Some(v_int(110))));
        assert_eq!(update.properties.get("name"), Some(&None));
        assert!(update.parent.is_none());
        assert!(update.modified.is_some());
        assert_eq!(dirty.properties.len(), 2);
        assert!(state.take_update().is_none());
    }

    #[test]
    fn test_header_changes_write_parent_and_flag() {
        let mut state = ObjectState::new(ObjectRecord::new(Obj::mk_id(2), NOTHING));
        state.record.parent = Obj::mk_id(1);
        state.dirty.header = true;
        let (update, _) = state.take_update().unwrap();
        assert_eq!(update.parent, Some(Obj::mk_id(1)));
        assert_eq!(update.recycled, Some(false));
    }
}
