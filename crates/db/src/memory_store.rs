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

use crate::Store;
use ember_common::model::{ObjectRecord, ObjectUpdate, StoreError};
use ember_var::Obj;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Counts of operations that reached the store, for verifying write-avoidance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub reads: usize,
    pub writes: usize,
}

#[derive(Default)]
struct Objects {
    records: BTreeMap<Obj, ObjectRecord>,
    next_id: i64,
}

/// A store that keeps every record in a map. Contents survive `disconnect`/`connect` cycles for
/// the life of the value, but not the process.
#[derive(Default)]
pub struct MemoryStore {
    connected: AtomicBool,
    objects: Mutex<Objects>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            reads: self.reads.load(Ordering::SeqCst),
            writes: self.writes.load(Ordering::SeqCst),
        }
    }

    /// Replace a record wholesale, bypassing id allocation. Used to simulate an out-of-band
    /// editor writing straight to storage.
    pub fn put(&self, record: ObjectRecord) -> Result<(), StoreError> {
        let mut objects = self.objects()?;
        objects.next_id = objects.next_id.max(record.id.id() + 1);
        objects.records.insert(record.id, record);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn objects(&self) -> Result<MutexGuard<'_, Objects>, StoreError> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(StoreError::NotConnected);
        }
        self.objects
            .lock()
            .map_err(|e| StoreError::BackendError(e.to_string()))
    }
}

impl Store for MemoryStore {
    fn connect(&self) -> Result<(), StoreError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disconnect(&self) -> Result<(), StoreError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn get(&self, id: Obj) -> Result<Option<ObjectRecord>, StoreError> {
        let objects = self.objects()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(objects.records.get(&id).cloned())
    }

    fn create(&self, mut record: ObjectRecord) -> Result<Obj, StoreError> {
        let mut objects = self.objects()?;
        let id = Obj::mk_id(objects.next_id);
        objects.next_id += 1;
        record.id = id;
        objects.records.insert(id, record);
        self.writes.fetch_add(1, Ordering::SeqCst);
        debug!(?id, "created object");
        Ok(id)
    }

    fn update(&self, id: Obj, update: &ObjectUpdate) -> Result<(), StoreError> {
        let mut objects = self.objects()?;
        let Some(record) = objects.records.get_mut(&id) else {
            return Err(StoreError::ObjectNotFound(id));
        };
        update.apply_to(record);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn delete(&self, id: Obj) -> Result<bool, StoreError> {
        let mut objects = self.objects()?;
        let removed = objects.records.remove(&id).is_some();
        if removed {
            self.writes.fetch_add(1, Ordering::SeqCst);
        }
        Ok(removed)
    }

    fn list_all(&self, include_recycled: bool) -> Result<Vec<ObjectRecord>, StoreError> {
        let objects = self.objects()?;
        self.reads.fetch_add(1, Ordering::SeqCst);
        Ok(objects
            .records
            .values()
            .filter(|r| include_recycled || !r.recycled)
            .cloned()
            .collect())
    }
}
