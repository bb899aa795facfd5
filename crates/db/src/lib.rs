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

//! Durable storage for object records.
//!
//! A [`Store`] holds one [`ObjectRecord`] per object id and knows nothing about inheritance,
//! caching, or methods beyond their stored definitions. Two implementations are provided: an
//! in-memory map used by tests and ephemeral runtimes, and a fjall keyspace for durable use.

use ember_common::model::{ObjectRecord, ObjectUpdate, StoreError};
use ember_var::Obj;
use std::sync::Arc;

pub use config::{DatabaseConfig, TableConfig};
pub use fjall_store::FjallStore;
pub use memory_store::{MemoryStore, StoreStats};

mod config;
mod fjall_store;
mod memory_store;
#[cfg(test)]
mod store_tests;

/// The durable record store.
///
/// Every write is atomic for a single object; there are no cross-object transactions. Ids are
/// handed out from a persistent sequence starting at 0 and are never reused by the store itself.
pub trait Store: Send + Sync {
    /// Acquire whatever resources the backend needs. Idempotent.
    fn connect(&self) -> Result<(), StoreError>;

    /// Release backend resources, making sure everything written so far is durable.
    fn disconnect(&self) -> Result<(), StoreError>;

    fn get(&self, id: Obj) -> Result<Option<ObjectRecord>, StoreError>;

    /// Allocate the next id, and write `record` under it. The id in `record` is ignored.
    fn create(&self, record: ObjectRecord) -> Result<Obj, StoreError>;

    /// Merge `update` into the stored record for `id`, touching only the paths it names.
    fn update(&self, id: Obj, update: &ObjectUpdate) -> Result<(), StoreError>;

    /// Remove the record entirely. Returns false if there was nothing to remove.
    fn delete(&self, id: Obj) -> Result<bool, StoreError>;

    /// Every stored record, in id order.
    fn list_all(&self, include_recycled: bool) -> Result<Vec<ObjectRecord>, StoreError>;
}

/// Open the store described by `config`: fjall when a path is configured, memory otherwise.
pub fn open_store(config: &DatabaseConfig) -> Result<Arc<dyn Store>, StoreError> {
    let store: Arc<dyn Store> = match &config.path {
        Some(path) => Arc::new(FjallStore::new(path, config.clone())),
        None => Arc::new(MemoryStore::new()),
    };
    store.connect()?;
    Ok(store)
}
