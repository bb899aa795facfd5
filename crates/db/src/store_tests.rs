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

//! Behaviour every `Store` implementation must share, run against each backend.

mod tests {
    use crate::{DatabaseConfig, FjallStore, MemoryStore, Store};
    use ember_common::model::{MethodDef, ObjectRecord, ObjectUpdate, StoreError};
    use ember_var::{NOTHING, Obj, v_int, v_list, v_map, v_objid, v_str};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn backends() -> Vec<(Arc<dyn Store>, Option<TempDir>)> {
        let tmpdir = TempDir::new().unwrap();
        let fjall: Arc<dyn Store> =
            Arc::new(FjallStore::new(tmpdir.path(), DatabaseConfig::default()));
        let memory: Arc<dyn Store> = Arc::new(MemoryStore::new());
        vec![(memory, None), (fjall, Some(tmpdir))]
    }

    fn sample_record() -> ObjectRecord {
        let mut record = ObjectRecord::new(NOTHING, NOTHING);
        record.properties.insert("hp".into(), v_int(100));
        record.properties.insert("name".into(), v_str("orc"));
        record
            .properties
            .insert("loot".into(), v_list(&[v_objid(4), v_str("gold")]));
        record
            .properties
            .insert("stats".into(), v_map(&[("str", v_int(7))]));
        record
            .methods
            .insert("heal".into(), MethodDef::new("this.hp = this.hp + 10;"));
        record
    }

    #[test]
    fn test_disconnected_store_refuses_work() {
        for (store, _dir) in backends() {
            assert_eq!(store.get(Obj::mk_id(0)), Err(StoreError::NotConnected));
            store.connect().unwrap();
            assert_eq!(store.get(Obj::mk_id(0)), Ok(None));
            store.disconnect().unwrap();
            assert_eq!(store.list_all(true), Err(StoreError::NotConnected));
        }
    }

    #[test]
    fn test_create_allocates_sequential_ids_from_zero() {
        for (store, _dir) in backends() {
            store.connect().unwrap();
            let a = store.create(sample_record()).unwrap();
            let b = store.create(ObjectRecord::new(NOTHING, a)).unwrap();
            assert_eq!(a, Obj::mk_id(0));
            assert_eq!(b, Obj::mk_id(1));

            let record = store.get(a).unwrap().unwrap();
            assert_eq!(record.id, a);
            assert_eq!(record.properties, sample_record().properties);
            assert_eq!(record.methods, sample_record().methods);
            assert_eq!(store.get(b).unwrap().unwrap().parent, a);
        }
    }

    #[test]
    fn test_update_touches_only_named_paths() {
        for (store, _dir) in backends() {
            store.connect().unwrap();
            let id = store.create(sample_record()).unwrap();
            let update = ObjectUpdate::new()
                .set_property("hp", v_int(110))
                .remove_property("name")
                .set_method("greet", MethodDef::new("return \"hi\";").callable());
            store.update(id, &update).unwrap();

            let record = store.get(id).unwrap().unwrap();
            assert_eq!(record.properties.get("hp"), Some(&v_int(110)));
            assert!(!record.properties.contains_key("name"));
            assert!(record.properties.contains_key("loot"));
            assert!(record.methods.contains_key("heal"));
            assert!(record.methods["greet"].callable);
            assert_eq!(record.parent, NOTHING);
        }
    }

    #[test]
    fn test_update_of_missing_object_fails() {
        for (store, _dir) in backends() {
            store.connect().unwrap();
            let update = ObjectUpdate::new().set_property("hp", v_int(1));
            assert_eq!(
                store.update(Obj::mk_id(42), &update),
                Err(StoreError::ObjectNotFound(Obj::mk_id(42)))
            );
        }
    }

    #[test]
    fn test_list_all_skips_recycled_unless_asked() {
        for (store, _dir) in backends() {
            store.connect().unwrap();
            let a = store.create(ObjectRecord::new(NOTHING, NOTHING)).unwrap();
            let b = store.create(ObjectRecord::new(NOTHING, a)).unwrap();
            store
                .update(b, &ObjectUpdate::new().set_recycled(true))
                .unwrap();

            let live: Vec<Obj> = store.list_all(false).unwrap().iter().map(|r| r.id).collect();
            assert_eq!(live, vec![a]);
            let all: Vec<Obj> = store.list_all(true).unwrap().iter().map(|r| r.id).collect();
            assert_eq!(all, vec![a, b]);
            assert!(store.get(b).unwrap().unwrap().recycled);
        }
    }

    #[test]
    fn test_delete() {
        for (store, _dir) in backends() {
            store.connect().unwrap();
            let id = store.create(sample_record()).unwrap();
            assert!(store.delete(id).unwrap());
            assert!(!store.delete(id).unwrap());
            assert_eq!(store.get(id).unwrap(), None);

            // Deleted ids are not handed out again.
            let next = store.create(ObjectRecord::new(NOTHING, NOTHING)).unwrap();
            assert_eq!(next, Obj::mk_id(1));
        }
    }

    #[test]
    fn test_fjall_contents_survive_reopen() {
        let tmpdir = TempDir::new().unwrap();
        let id = {
            let store = FjallStore::new(tmpdir.path(), DatabaseConfig::default());
            store.connect().unwrap();
            let id = store.create(sample_record()).unwrap();
            store
                .update(id, &ObjectUpdate::new().set_property("hp", v_int(110)))
                .unwrap();
            store.disconnect().unwrap();
            id
        };

        let store = FjallStore::new(tmpdir.path(), DatabaseConfig::default());
        store.connect().unwrap();
        let record = store.get(id).unwrap().unwrap();
        assert_eq!(record.properties.get("hp"), Some(&v_int(110)));
        assert_eq!(record.methods, sample_record().methods);
        assert_eq!(store.create(ObjectRecord::new(NOTHING, NOTHING)).unwrap(), Obj::mk_id(1));
    }

    #[test]
    fn test_memory_store_counts_operations() {
        let store = MemoryStore::new();
        store.connect().unwrap();
        let id = store.create(sample_record()).unwrap();
        store.get(id).unwrap();
        store.update(id, &ObjectUpdate::new()).unwrap();
        let stats = store.stats();
        assert_eq!(stats.reads, 1);
        assert_eq!(stats.writes, 2);
    }
}
