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

//! Shared fixtures for the kernel test suites.
#![allow(dead_code)]

use ember_common::model::MethodDef;
use ember_db::MemoryStore;
use ember_kernel::{Manager, ObjectHandle, RuntimeConfig};
use ember_var::{Obj, SYSTEM_OBJECT, Var};
use std::collections::BTreeMap;
use std::sync::Arc;
use unindent::unindent;

/// A fresh in-memory world holding only the root object. The store is returned as well so
/// tests can inspect what actually reached it.
pub fn world() -> (Arc<MemoryStore>, Manager) {
    let store = Arc::new(MemoryStore::new());
    let manager = reopen(&store);
    (store, manager)
}

/// A second manager over an existing store, as after a restart.
pub fn reopen(store: &Arc<MemoryStore>) -> Manager {
    let manager = Manager::new(store.clone(), RuntimeConfig::default()).unwrap();
    manager.ensure_root().unwrap();
    manager
}

pub fn props(entries: &[(&str, Var)]) -> BTreeMap<String, Var> {
    entries
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

pub fn methods(entries: &[(&str, &str)]) -> BTreeMap<String, MethodDef> {
    entries
        .iter()
        .map(|(name, source)| (name.to_string(), MethodDef::new(unindent(source))))
        .collect()
}

/// root -> a -> b -> c, where `a` owns a `greeting` property and a `hello` method.
pub fn chain(manager: &Manager) -> [ObjectHandle; 3] {
    let a = manager
        .create(
            SYSTEM_OBJECT,
            props(&[("greeting", ember_var::v_str("hi"))]),
            methods(&[("hello", "return this.greeting;")]),
        )
        .unwrap();
    let b = child_of(manager, a.id());
    let c = child_of(manager, b.id());
    [a, b, c]
}

pub fn child_of(manager: &Manager, parent: Obj) -> ObjectHandle {
    manager
        .create(parent, BTreeMap::new(), BTreeMap::new())
        .unwrap()
}
