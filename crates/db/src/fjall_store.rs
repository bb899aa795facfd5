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

//! Fjall-backed record store.
//!
//! Each object is spread over three partitions so that a change to one property or method touches
//! exactly one key:
//!
//! - `objects`: the record header (parent, timestamps, recycled flag), keyed by the big-endian id.
//! - `properties` and `methods`: one entry per owned name, keyed by the id followed by the name.
//!
//! A fourth partition, `sequences`, holds the next id to hand out.

use crate::Store;
use crate::config::{DatabaseConfig, partition_options};
use chrono::{DateTime, Utc};
use ember_common::model::{MethodDef, ObjectRecord, ObjectUpdate, StoreError};
use ember_var::{Obj, Var};
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle, PersistMode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};
use tracing::{debug, info};

const NEXT_ID_KEY: &[u8] = b"next_id";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ObjectHeader {
    id: Obj,
    parent: Obj,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    recycled: bool,
}

impl From<&ObjectRecord> for ObjectHeader {
    fn from(record: &ObjectRecord) -> Self {
        Self {
            id: record.id,
            parent: record.parent,
            created: record.created,
            modified: record.modified,
            recycled: record.recycled,
        }
    }
}

struct Partitions {
    keyspace: Keyspace,
    objects: PartitionHandle,
    properties: PartitionHandle,
    methods: PartitionHandle,
    sequences: PartitionHandle,
}

impl Partitions {
    fn open(path: &Path, config: &DatabaseConfig) -> Result<Self, StoreError> {
        let keyspace = Config::new(path).open().map_err(backend)?;
        let objects = keyspace
            .open_partition("objects", partition_options(&config.objects))
            .map_err(backend)?;
        let properties = keyspace
            .open_partition("properties", partition_options(&config.properties))
            .map_err(backend)?;
        let methods = keyspace
            .open_partition("methods", partition_options(&config.methods))
            .map_err(backend)?;
        let sequences = keyspace
            .open_partition("sequences", PartitionCreateOptions::default())
            .map_err(backend)?;
        Ok(Self {
            keyspace,
            objects,
            properties,
            methods,
            sequences,
        })
    }

    fn header(&self, id: Obj) -> Result<Option<ObjectHeader>, StoreError> {
        let Some(bytes) = self.objects.get(id.as_bytes()).map_err(backend)? else {
            return Ok(None);
        };
        decode(id, &bytes).map(Some)
    }

    /// Collect every `name -> value` entry stored under `id` in `partition`.
    fn owned<T: DeserializeOwned>(
        &self,
        partition: &PartitionHandle,
        id: Obj,
    ) -> Result<BTreeMap<String, T>, StoreError> {
        let mut entries = BTreeMap::new();
        for entry in partition.prefix(id.as_bytes()) {
            let (key, value) = entry.map_err(backend)?;
            let name = std::str::from_utf8(&key[8..])
                .map_err(|e| StoreError::DecodingError(id, e.to_string()))?;
            entries.insert(name.to_string(), decode(id, &value)?);
        }
        Ok(entries)
    }

    fn record(&self, header: ObjectHeader) -> Result<ObjectRecord, StoreError> {
        let properties: BTreeMap<String, Var> = self.owned(&self.properties, header.id)?;
        let methods: BTreeMap<String, MethodDef> = self.owned(&self.methods, header.id)?;
        Ok(ObjectRecord {
            id: header.id,
            parent: header.parent,
            properties,
            methods,
            created: header.created,
            modified: header.modified,
            recycled: header.recycled,
        })
    }

    fn next_id(&self) -> Result<i64, StoreError> {
        let Some(bytes) = self.sequences.get(NEXT_ID_KEY).map_err(backend)? else {
            return Ok(0);
        };
        let bytes: [u8; 8] = bytes.as_ref().try_into().map_err(|_| {
            StoreError::BackendError(format!("corrupt id sequence ({} bytes)", bytes.len()))
        })?;
        Ok(i64::from_le_bytes(bytes))
    }
}

/// A [`Store`] persisting records in a fjall keyspace at a fixed path.
pub struct FjallStore {
    path: PathBuf,
    config: DatabaseConfig,
    partitions: RwLock<Option<Partitions>>,
    /// Serializes id allocation.
    sequence_lock: Mutex<()>,
}

impl FjallStore {
    pub fn new(path: &Path, config: DatabaseConfig) -> Self {
        Self {
            path: path.to_path_buf(),
            config,
            partitions: RwLock::new(None),
            sequence_lock: Mutex::new(()),
        }
    }

    fn with_partitions<R>(
        &self,
        f: impl FnOnce(&Partitions) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let guard = self
            .partitions
            .read()
            .map_err(|e| StoreError::BackendError(e.to_string()))?;
        let Some(partitions) = guard.as_ref() else {
            return Err(StoreError::NotConnected);
        };
        f(partitions)
    }
}

fn backend(e: fjall::Error) -> StoreError {
    StoreError::BackendError(e.to_string())
}

fn encode<T: Serialize>(id: Obj, value: &T) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(value).map_err(|e| StoreError::EncodingError(id, e.to_string()))
}

fn decode<T: DeserializeOwned>(id: Obj, bytes: &[u8]) -> Result<T, StoreError> {
    serde_json::from_slice(bytes).map_err(|e| StoreError::DecodingError(id, e.to_string()))
}

fn entry_key(id: Obj, name: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(8 + name.len());
    key.extend_from_slice(&id.as_bytes());
    key.extend_from_slice(name.as_bytes());
    key
}

impl Store for FjallStore {
    fn connect(&self) -> Result<(), StoreError> {
        let mut guard = self
            .partitions
            .write()
            .map_err(|e| StoreError::BackendError(e.to_string()))?;
        if guard.is_none() {
            info!(path = ?self.path, "opening object store");
            *guard = Some(Partitions::open(&self.path, &self.config)?);
        }
        Ok(())
    }

    fn disconnect(&self) -> Result<(), StoreError> {
        let mut guard = self
            .partitions
            .write()
            .map_err(|e| StoreError::BackendError(e.to_string()))?;
        if let Some(partitions) = guard.take() {
            partitions
                .keyspace
                .persist(PersistMode::SyncAll)
                .map_err(backend)?;
            info!(path = ?self.path, "closed object store");
        }
        Ok(())
    }

    fn get(&self, id: Obj) -> Result<Option<ObjectRecord>, StoreError> {
        self.with_partitions(|p| match p.header(id)? {
            None => Ok(None),
            Some(header) => p.record(header).map(Some),
        })
    }

    fn create(&self, mut record: ObjectRecord) -> Result<Obj, StoreError> {
        self.with_partitions(|p| {
            let _allocating = self
                .sequence_lock
                .lock()
                .map_err(|e| StoreError::BackendError(e.to_string()))?;
            let id = Obj::mk_id(p.next_id()?);
            record.id = id;

            let mut batch = p.keyspace.batch();
            batch.insert(&p.sequences, NEXT_ID_KEY, (id.id() + 1).to_le_bytes().to_vec());
            batch.insert(
                &p.objects,
                id.as_bytes().to_vec(),
                encode(id, &ObjectHeader::from(&record))?,
            );
            for (name, value) in &record.properties {
                batch.insert(&p.properties, entry_key(id, name), encode(id, value)?);
            }
            for (name, method) in &record.methods {
                batch.insert(&p.methods, entry_key(id, name), encode(id, method)?);
            }
            batch.commit().map_err(backend)?;
            debug!(?id, "created object");
            Ok(id)
        })
    }

    fn update(&self, id: Obj, update: &ObjectUpdate) -> Result<(), StoreError> {
        self.with_partitions(|p| {
            let Some(mut header) = p.header(id)? else {
                return Err(StoreError::ObjectNotFound(id));
            };
            let mut batch = p.keyspace.batch();
            if update.touches_header() {
                if let Some(parent) = update.parent {
                    header.parent = parent;
                }
                if let Some(recycled) = update.recycled {
                    header.recycled = recycled;
                }
                if let Some(modified) = update.modified {
                    header.modified = modified;
                }
                batch.insert(&p.objects, id.as_bytes().to_vec(), encode(id, &header)?);
            }
            for (name, value) in &update.properties {
                let key = entry_key(id, name);
                match value {
                    Some(value) => batch.insert(&p.properties, key, encode(id, value)?),
                    None => batch.remove(&p.properties, key),
                }
            }
            for (name, method) in &update.methods {
                let key = entry_key(id, name);
                match method {
                    Some(method) => batch.insert(&p.methods, key, encode(id, method)?),
                    None => batch.remove(&p.methods, key),
                }
            }
            batch.commit().map_err(backend)
        })
    }

    fn delete(&self, id: Obj) -> Result<bool, StoreError> {
        self.with_partitions(|p| {
            if p.header(id)?.is_none() {
                return Ok(false);
            }
            let mut batch = p.keyspace.batch();
            batch.remove(&p.objects, id.as_bytes().to_vec());
            for partition in [&p.properties, &p.methods] {
                for entry in partition.prefix(id.as_bytes()) {
                    let (key, _) = entry.map_err(backend)?;
                    batch.remove(partition, key);
                }
            }
            batch.commit().map_err(backend)?;
            Ok(true)
        })
    }

    fn list_all(&self, include_recycled: bool) -> Result<Vec<ObjectRecord>, StoreError> {
        self.with_partitions(|p| {
            let mut records = vec![];
            for entry in p.objects.iter() {
                let (key, value) = entry.map_err(backend)?;
                let id = key
                    .as_ref()
                    .try_into()
                    .map(Obj::from_bytes)
                    .map_err(|_| StoreError::BackendError("malformed object key".to_string()))?;
                let header: ObjectHeader = decode(id, &value)?;
                if header.recycled && !include_recycled {
                    continue;
                }
                records.push(p.record(header)?);
            }
            Ok(records)
        })
    }
}
