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

//! Inheritance, persistence, and cache behaviour of objects, driven through the public API.

mod common;

use common::{chain, child_of, methods, props, reopen, world};
use ember_db::{DatabaseConfig, FjallStore, Store};
use ember_kernel::{LoadOptions, Manager, RuntimeConfig, RuntimeError, ViewValue};
use ember_var::{NOTHING, Obj, SYSTEM_OBJECT, v_bool, v_int, v_obj, v_str};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::sync::Arc;

#[test]
fn test_chain_resolves_through_ancestors() {
    let (_, manager) = world();
    let [a, _, c] = chain(&manager);

    assert_eq!(c.get("greeting").unwrap(), Some(v_str("hi")));
    assert!(c.own_properties().is_empty());
    let (definer, _) = c.find_method("hello").unwrap().unwrap();
    assert_eq!(definer, a.id());
    assert_eq!(c.call("hello", vec![]).unwrap(), v_str("hi"));
    assert!(c.get("nonexistent").unwrap().is_none());
}

#[test]
fn test_reparenting_changes_resolution_only() {
    let (_, manager) = world();
    let [_, b, c] = chain(&manager);
    let other = manager
        .create(
            SYSTEM_OBJECT,
            props(&[("greeting", v_str("hello there"))]),
            BTreeMap::new(),
        )
        .unwrap();

    c.set_parent(other.id()).unwrap();
    assert_eq!(c.parent(), other.id());
    assert_eq!(c.get("greeting").unwrap(), Some(v_str("hello there")));
    assert!(c.own_properties().is_empty());
    assert!(!c.has_method("hello").unwrap());
    assert_eq!(b.get("greeting").unwrap(), Some(v_str("hi")));
}

#[test]
fn test_parent_cycles_are_rejected() {
    let (_, manager) = world();
    let [a, _, c] = chain(&manager);
    assert!(matches!(
        a.set_parent(c.id()),
        Err(RuntimeError::RecursiveParent(_, _))
    ));
    assert!(matches!(
        a.set_parent(a.id()),
        Err(RuntimeError::RecursiveParent(_, _))
    ));
    assert_eq!(a.parent(), SYSTEM_OBJECT);
}

#[test]
fn test_stored_parent_cycle_ends_the_walk() {
    let (store, manager) = world();
    let [a, b, _] = chain(&manager);

    // b's parent is a; point a back at b behind the manager's back.
    let mut record = store.get(a.id()).unwrap().unwrap();
    record.parent = b.id();
    store.put(record).unwrap();
    manager.invalidate(a.id());
    manager.invalidate(b.id());

    let b = manager.object(b.id()).unwrap();
    assert_eq!(b.get("greeting").unwrap(), Some(v_str("hi")));
    assert_eq!(b.get("nope").unwrap(), None);
    assert!(b.has_method("hello").unwrap());
    assert!(!b.has_method("nope").unwrap());
    assert!(!b.has_method_cached("nope"));
}

#[test]
fn test_ensure_root_refuses_a_populated_store_without_root() {
    let (store, manager) = world();
    let object = child_of(&manager, SYSTEM_OBJECT);
    object.view().set("hp", v_int(3)).unwrap();
    assert!(store.delete(SYSTEM_OBJECT).unwrap());
    manager.invalidate(SYSTEM_OBJECT);

    assert!(matches!(
        manager.ensure_root(),
        Err(RuntimeError::NotFound(id)) if id == SYSTEM_OBJECT
    ));
    let stored = store.get(object.id()).unwrap().unwrap();
    assert_eq!(stored.properties.get("hp"), Some(&v_int(3)));
}

#[test]
fn test_has_method_cached_only_sees_resident_objects() {
    let (store, manager) = world();
    let [a, _, c] = chain(&manager);
    manager.shutdown().unwrap();

    let manager = reopen(&store);
    let c = manager.object(c.id()).unwrap();
    assert!(manager.cached(a.id()).is_none());
    assert!(!c.has_method_cached("hello"));

    assert!(c.has_method("hello").unwrap());
    assert!(manager.cached(a.id()).is_some());
    assert!(c.has_method_cached("hello"));
    assert!(!c.has_method_cached("nope"));
}

#[test]
fn test_failed_background_save_is_not_raised() {
    let (store, manager) = world();
    let doomed = child_of(&manager, SYSTEM_OBJECT);
    let other = child_of(&manager, SYSTEM_OBJECT);
    assert!(store.delete(doomed.id()).unwrap());

    doomed.view().set("hp", v_int(1)).unwrap();
    manager.flush();
    assert!(store.get(doomed.id()).unwrap().is_none());
    assert!(!doomed.is_dirty());
    assert_eq!(doomed.get_own("hp"), Some(v_int(1)));

    // The writer keeps going after the failure.
    other.view().set("hp", v_int(2)).unwrap();
    manager.flush();
    let stored = store.get(other.id()).unwrap().unwrap();
    assert_eq!(stored.properties.get("hp"), Some(&v_int(2)));
}

#[test]
fn test_shadowing_leaves_ancestors_alone() {
    let (_, manager) = world();
    let [a, b, c] = chain(&manager);
    let sibling = child_of(&manager, b.id());

    c.set("greeting", v_str("mine"));
    assert_eq!(c.get("greeting").unwrap(), Some(v_str("mine")));
    assert_eq!(a.get_own("greeting"), Some(v_str("hi")));
    assert_eq!(sibling.get("greeting").unwrap(), Some(v_str("hi")));

    // The inherited method sees the shadowed value through `this`.
    assert_eq!(c.call("hello", vec![]).unwrap(), v_str("mine"));
    assert_eq!(sibling.call("hello", vec![]).unwrap(), v_str("hi"));

    assert!(c.remove_property("greeting"));
    assert_eq!(c.get("greeting").unwrap(), Some(v_str("hi")));
}

#[test]
fn test_method_shadowing() {
    let (_, manager) = world();
    let [a, b, c] = chain(&manager);
    c.set_method("hello", ember_common::model::MethodDef::new(r#"return "overridden";"#));

    assert_eq!(c.call("hello", vec![]).unwrap(), v_str("overridden"));
    assert_eq!(b.call("hello", vec![]).unwrap(), v_str("hi"));
    assert_eq!(a.own_methods().len(), 1);
    assert!(c.remove_method("hello"));
    assert_eq!(c.call("hello", vec![]).unwrap(), v_str("hi"));
}

#[test]
fn test_own_accessors_are_snapshots() {
    let (_, manager) = world();
    let [_, b, c] = chain(&manager);
    b.set("level", v_int(2));
    c.set("mood", v_str("grumpy"));

    let mut own = c.own_properties();
    assert_eq!(own.keys().collect::<Vec<_>>(), vec!["mood"]);
    own.insert("mood".into(), v_str("cheerful"));
    assert_eq!(c.get_own("mood"), Some(v_str("grumpy")));
    assert!(c.own_methods().is_empty());
    assert_eq!(c.get("level").unwrap(), Some(v_int(2)));
    assert!(c.get_own("level").is_none());
}

#[test]
fn test_save_writes_only_when_dirty() {
    let (store, manager) = world();
    let object = manager
        .create(SYSTEM_OBJECT, props(&[("hp", v_int(1))]), BTreeMap::new())
        .unwrap();
    let before = store.stats().writes;

    assert!(!object.save().unwrap());
    assert_eq!(store.stats().writes, before);

    object.set("hp", v_int(2));
    assert!(object.is_dirty());
    assert!(object.save().unwrap());
    assert_eq!(store.stats().writes, before + 1);
    assert!(!object.save().unwrap());
    assert_eq!(store.stats().writes, before + 1);

    object.set_method("poke", ember_common::model::MethodDef::new("return 1;"));
    assert!(object.save().unwrap());
    assert_eq!(store.stats().writes, before + 2);
}

#[test]
fn test_saves_write_only_dirty_paths() {
    let (store, manager) = world();
    let object = manager
        .create(
            SYSTEM_OBJECT,
            props(&[("hp", v_int(1)), ("name", v_str("orc"))]),
            BTreeMap::new(),
        )
        .unwrap();

    // Someone else edits `name` directly in storage; our save of `hp` must not clobber it.
    let mut record = store.get(object.id()).unwrap().unwrap();
    record.properties.insert("name".into(), v_str("goblin"));
    store.put(record).unwrap();

    object.set("hp", v_int(5));
    object.save().unwrap();
    let stored = store.get(object.id()).unwrap().unwrap();
    assert_eq!(stored.properties.get("hp"), Some(&v_int(5)));
    assert_eq!(stored.properties.get("name"), Some(&v_str("goblin")));
}

#[test]
fn test_refresh_discards_local_changes() {
    let (_, manager) = world();
    let object = manager
        .create(SYSTEM_OBJECT, props(&[("hp", v_int(10))]), BTreeMap::new())
        .unwrap();
    object.set("hp", v_int(99));
    object.refresh().unwrap();
    assert_eq!(object.get_own("hp"), Some(v_int(10)));
    assert!(!object.is_dirty());
}

#[test]
fn test_invalidate_picks_up_out_of_band_changes() {
    let (store, manager) = world();
    let object = manager
        .create(SYSTEM_OBJECT, props(&[("hp", v_int(10))]), BTreeMap::new())
        .unwrap();
    let id = object.id();

    let mut record = store.get(id).unwrap().unwrap();
    record.properties.insert("hp".into(), v_int(500));
    store.put(record).unwrap();

    // Still the resident copy until told otherwise.
    assert_eq!(manager.object(id).unwrap().get_own("hp"), Some(v_int(10)));

    manager.invalidate(id);
    assert!(manager.cached(id).is_none());
    assert_eq!(manager.object(id).unwrap().get_own("hp"), Some(v_int(500)));
}

#[test]
fn test_handles_share_resident_state() {
    let (_, manager) = world();
    let object = child_of(&manager, SYSTEM_OBJECT);
    let again = manager.object(object.id()).unwrap();
    assert_eq!(object, again);

    again.set("seen", v_bool(true));
    assert_eq!(object.get_own("seen"), Some(v_bool(true)));
    assert_eq!(manager.cache_len(), 2);
}

#[test]
fn test_recycled_objects_are_hidden() {
    let (_, manager) = world();
    let keep = manager
        .create(SYSTEM_OBJECT, props(&[("kind", v_str("orc"))]), BTreeMap::new())
        .unwrap();
    let gone = manager
        .create(SYSTEM_OBJECT, props(&[("kind", v_str("orc"))]), BTreeMap::new())
        .unwrap();
    manager.recycle(gone.id()).unwrap();

    let listed: Vec<Obj> = manager
        .list_all(false)
        .unwrap()
        .iter()
        .map(|o| o.id())
        .collect();
    assert_eq!(listed, vec![SYSTEM_OBJECT, keep.id()]);
    assert_eq!(manager.list_all(true).unwrap().len(), 3);

    let found: Vec<Obj> = manager
        .find_by_property("kind", Some(&v_str("orc")))
        .unwrap()
        .iter()
        .map(|o| o.id())
        .collect();
    assert_eq!(found, vec![keep.id()]);

    assert!(manager.load(gone.id()).unwrap().is_none());
    let recycled = manager
        .load_with(
            gone.id(),
            LoadOptions {
                include_recycled: true,
            },
        )
        .unwrap()
        .unwrap();
    assert!(recycled.is_recycled());
    assert_eq!(recycled.get_own("kind"), Some(v_str("orc")));
}

#[test]
fn test_find_by_property_without_value() {
    let (_, manager) = world();
    let [a, b, c] = chain(&manager);
    let found: Vec<Obj> = manager
        .find_by_property("greeting", None)
        .unwrap()
        .iter()
        .map(|o| o.id())
        .collect();
    assert_eq!(found, vec![a.id(), b.id(), c.id()]);
}

#[test]
fn test_view_accessors() {
    let (store, manager) = world();
    let [a, _, c] = chain(&manager);
    let view = c.view();

    assert_eq!(view.get_value("id").unwrap(), Some(v_obj(c.id())));
    assert_eq!(view.get_value("recycled").unwrap(), Some(v_bool(false)));
    assert_eq!(view.get_value("greeting").unwrap(), Some(v_str("hi")));
    match view.get("hello").unwrap() {
        Some(ViewValue::Method(bound)) => {
            assert_eq!(bound.name(), "hello");
            assert_eq!(bound.call(vec![]).unwrap(), v_str("hi"));
        }
        other => panic!("expected a bound method, got {other:?}"),
    }
    assert!(view.get("missing").unwrap().is_none());

    assert!(matches!(
        view.set("parent", v_obj(NOTHING)),
        Err(RuntimeError::ReservedKey(_))
    ));
    view.set("greeting", v_str("yo")).unwrap();
    manager.flush();
    let stored = store.get(c.id()).unwrap().unwrap();
    assert_eq!(stored.properties.get("greeting"), Some(&v_str("yo")));
    assert_eq!(a.get_own("greeting"), Some(v_str("hi")));
}

#[test]
fn test_aliases() {
    let (store, manager) = world();
    let object = child_of(&manager, SYSTEM_OBJECT);
    assert_eq!(manager.alias("thing").unwrap(), None);
    manager.set_alias("thing", object.id()).unwrap();
    assert_eq!(manager.alias("thing").unwrap(), Some(object.id()));

    let restarted = reopen(&store);
    assert_eq!(restarted.alias("thing").unwrap(), Some(object.id()));
}

#[test]
fn test_state_survives_restart() {
    let (store, manager) = world();
    let [a, _, c] = chain(&manager);
    c.set("hp", v_int(7));
    c.save().unwrap();
    manager.shutdown().unwrap();

    let restarted = reopen(&store);
    let c = restarted.object(c.id()).unwrap();
    assert_eq!(c.get_own("hp"), Some(v_int(7)));
    assert_eq!(c.get("greeting").unwrap(), Some(v_str("hi")));
    assert!(restarted.cached(a.id()).is_some());
}

#[test]
fn test_fjall_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let open = || -> Manager {
        let store: Arc<dyn Store> =
            Arc::new(FjallStore::new(dir.path(), DatabaseConfig::default()));
        let manager = Manager::new(store, RuntimeConfig::default()).unwrap();
        manager.ensure_root().unwrap();
        manager
    };

    let id = {
        let manager = open();
        let object = manager
            .create(
                SYSTEM_OBJECT,
                props(&[("hp", v_int(100))]),
                methods(&[("heal", "this.hp = this.hp + 10; return this.hp;")]),
            )
            .unwrap();
        assert_eq!(object.call("heal", vec![]).unwrap(), v_int(110));
        manager.shutdown().unwrap();
        object.id()
    };

    let manager = open();
    let object = manager.object(id).unwrap();
    assert_eq!(object.get_own("hp"), Some(v_int(110)));
    assert_eq!(object.call("heal", vec![]).unwrap(), v_int(120));
    manager.shutdown().unwrap();
}
