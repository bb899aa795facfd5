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

use crate::config::RuntimeConfig;
use crate::errors::{ExecutionFailure, RuntimeError};
use crate::object::{ObjectHandle, ObjectState};
use crate::vm::{Activation, CallContext, execute};
use crate::writer::WriteBehind;
use ahash::AHashMap;
use ember_common::model::{ALIASES_PROPERTY, MethodDef, ObjectRecord};
use ember_compiler::{Program, compile};
use ember_db::Store;
use ember_var::{NOTHING, Obj, SYSTEM_OBJECT, Var, Variant, v_empty_map, v_obj};
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Return recycled objects rather than treating them as absent.
    pub include_recycled: bool,
}

struct Inner {
    store: Arc<dyn Store>,
    config: RuntimeConfig,
    writer: WriteBehind,
    objects: RefCell<AHashMap<Obj, Rc<RefCell<ObjectState>>>>,
    /// Compiled programs, keyed by the object that owns the method and the method's name.
    compiled: RefCell<AHashMap<(Obj, String), Rc<Program>>>,
    compilations: Cell<usize>,
}

/// The single owner of resident objects and compiled methods.
///
/// The manager is confined to the thread that created it; clones share the same caches. All
/// reads of the store first wait for queued background writes, so a manager always sees its own
/// writes.
#[derive(Clone)]
pub struct Manager {
    inner: Rc<Inner>,
}

impl Manager {
    /// Connects `store` and starts the background writer.
    pub fn new(store: Arc<dyn Store>, config: RuntimeConfig) -> Result<Self, RuntimeError> {
        store.connect()?;
        let writer = WriteBehind::start(store.clone())?;
        Ok(Self {
            inner: Rc::new(Inner {
                store,
                config,
                writer,
                objects: RefCell::new(AHashMap::new()),
                compiled: RefCell::new(AHashMap::new()),
                compilations: Cell::new(0),
            }),
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    pub(crate) fn writer(&self) -> &WriteBehind {
        &self.inner.writer
    }

    fn handle(&self, state: Rc<RefCell<ObjectState>>) -> ObjectHandle {
        ObjectHandle::new(self.clone(), state)
    }

    /// Read a record straight from the store, after any queued writes have landed.
    pub(crate) fn fetch(&self, id: Obj) -> Result<Option<ObjectRecord>, RuntimeError> {
        self.inner.writer.barrier();
        Ok(self.inner.store.get(id)?)
    }

    /// The resident handle for `id`, if there is one. Never touches the store.
    pub fn cached(&self, id: Obj) -> Option<ObjectHandle> {
        let state = self.inner.objects.borrow().get(&id).cloned()?;
        Some(self.handle(state))
    }

    /// Put a freshly read record in the cache, unless a resident copy already exists, in which
    /// case that copy wins.
    fn adopt(&self, record: ObjectRecord) -> ObjectHandle {
        let state = self
            .inner
            .objects
            .borrow_mut()
            .entry(record.id)
            .or_insert_with(|| Rc::new(RefCell::new(ObjectState::new(record))))
            .clone();
        self.handle(state)
    }

    pub(crate) fn recache(&self, object: &ObjectHandle) {
        self.inner
            .objects
            .borrow_mut()
            .insert(object.id(), object.state().clone());
    }

    pub fn load(&self, id: Obj) -> Result<Option<ObjectHandle>, RuntimeError> {
        self.load_with(id, LoadOptions::default())
    }

    pub fn load_with(
        &self,
        id: Obj,
        options: LoadOptions,
    ) -> Result<Option<ObjectHandle>, RuntimeError> {
        let object = match self.cached(id) {
            Some(object) => object,
            None => {
                let Some(record) = self.fetch(id)? else {
                    return Ok(None);
                };
                if record.recycled && !options.include_recycled {
                    return Ok(None);
                }
                debug!(?id, "loaded object");
                self.adopt(record)
            }
        };
        if object.is_recycled() && !options.include_recycled {
            return Ok(None);
        }
        Ok(Some(object))
    }

    /// Like `load`, but absence is an error.
    pub fn object(&self, id: Obj) -> Result<ObjectHandle, RuntimeError> {
        self.load(id)?.ok_or(RuntimeError::NotFound(id))
    }

    /// Create, persist, and cache a new object.
    pub fn create(
        &self,
        parent: Obj,
        properties: BTreeMap<String, Var>,
        methods: BTreeMap<String, MethodDef>,
    ) -> Result<ObjectHandle, RuntimeError> {
        let mut record = ObjectRecord::new(NOTHING, parent);
        record.properties = properties;
        record.methods = methods;
        self.inner.writer.barrier();
        record.id = self.inner.store.create(record.clone())?;
        debug!(id = ?record.id, ?parent, "created object");
        Ok(self.adopt(record))
    }

    /// Drop the resident copy of `id`, along with its compiled methods. The next load reads the
    /// store again.
    pub fn invalidate(&self, id: Obj) {
        self.inner.objects.borrow_mut().remove(&id);
        self.inner
            .compiled
            .borrow_mut()
            .retain(|(definer, _), _| *definer != id);
    }

    /// Soft-delete: flag the object as recycled, write it, and evict it.
    pub fn recycle(&self, id: Obj) -> Result<(), RuntimeError> {
        let object = self.object(id)?;
        object.mark_recycled();
        object.save()?;
        self.invalidate(id);
        info!(?id, "recycled object");
        Ok(())
    }

    /// Every live object, or every object at all when `include_recycled` is set, in id order.
    pub fn list_all(&self, include_recycled: bool) -> Result<Vec<ObjectHandle>, RuntimeError> {
        self.inner.writer.barrier();
        let records = self.inner.store.list_all(include_recycled)?;
        Ok(records
            .into_iter()
            .map(|record| self.adopt(record))
            .filter(|object| include_recycled || !object.is_recycled())
            .collect())
    }

    /// Objects whose resolved value for `name` equals `value`, or which resolve `name` at all when
    /// no value is given. Recycled objects are never included.
    pub fn find_by_property(
        &self,
        name: &str,
        value: Option<&Var>,
    ) -> Result<Vec<ObjectHandle>, RuntimeError> {
        let mut found = vec![];
        for object in self.list_all(false)? {
            let matches = match (object.get(name)?, value) {
                (Some(_), None) => true,
                (Some(resolved), Some(wanted)) => resolved == *wanted,
                (None, _) => false,
            };
            if matches {
                found.push(object);
            }
        }
        Ok(found)
    }

    /// Make sure the root object exists, creating it in an empty database.
    pub fn ensure_root(&self) -> Result<ObjectHandle, RuntimeError> {
        if let Some(root) = self.load(SYSTEM_OBJECT)? {
            return Ok(root);
        }
        self.inner.writer.barrier();
        if !self.inner.store.list_all(true)?.is_empty() {
            return Err(RuntimeError::NotFound(SYSTEM_OBJECT));
        }
        let root = self.create(
            NOTHING,
            BTreeMap::from([(ALIASES_PROPERTY.to_string(), v_empty_map())]),
            BTreeMap::new(),
        )?;
        if root.id() != SYSTEM_OBJECT {
            return Err(RuntimeError::NotFound(SYSTEM_OBJECT));
        }
        info!("created root object");
        Ok(root)
    }

    /// Look up a `$name` alias in the root object's alias table.
    pub fn alias(&self, name: &str) -> Result<Option<Obj>, RuntimeError> {
        let Some(root) = self.load(SYSTEM_OBJECT)? else {
            return Ok(None);
        };
        let Some(aliases) = root.get_own(ALIASES_PROPERTY) else {
            return Ok(None);
        };
        Ok(aliases
            .as_map()
            .and_then(|aliases| aliases.get(name))
            .and_then(Var::as_object))
    }

    pub fn set_alias(&self, name: &str, target: Obj) -> Result<(), RuntimeError> {
        let root = self.object(SYSTEM_OBJECT)?;
        let mut aliases = root
            .get_own(ALIASES_PROPERTY)
            .and_then(|aliases| aliases.as_map().cloned())
            .unwrap_or_default();
        aliases.insert(name.to_string(), v_obj(target));
        root.set(ALIASES_PROPERTY, Var::from_variant(Variant::Map(aliases)));
        root.save()?;
        Ok(())
    }

    /// The compiled program for the method `name` owned by `definer`, compiling it on first use.
    pub fn compiled_method(&self, definer: Obj, name: &str) -> Result<Rc<Program>, RuntimeError> {
        let key = (definer, name.to_string());
        if let Some(program) = self.inner.compiled.borrow().get(&key) {
            return Ok(program.clone());
        }
        let object = self.load_with(
            definer,
            LoadOptions {
                include_recycled: true,
            },
        )?;
        let Some(method) = object.and_then(|object| object.own_method(name)) else {
            return Err(RuntimeError::MethodNotFound(definer, name.to_string()));
        };
        let program = compile(&method.source, self.inner.config.compile_options()).map_err(
            |e| RuntimeError::MethodFailed {
                obj: definer,
                method: name.to_string(),
                cause: ExecutionFailure::Compile(e),
            },
        )?;
        let program = Rc::new(program);
        self.inner.compilations.set(self.inner.compilations.get() + 1);
        debug!(?definer, name, "compiled method");
        self.inner.compiled.borrow_mut().insert(key, program.clone());
        Ok(program)
    }

    pub(crate) fn forget_compiled(&self, definer: Obj, name: &str) {
        self.inner
            .compiled
            .borrow_mut()
            .remove(&(definer, name.to_string()));
    }

    /// Resolve and run a method on `this`, wrapping any failure as `MethodFailed`.
    pub(crate) fn invoke(
        &self,
        this: &ObjectHandle,
        name: &str,
        args: Vec<Var>,
        context: CallContext,
    ) -> Result<Var, RuntimeError> {
        let id = this.id();
        let found = if context.command {
            this.find_command(name)?
        } else {
            this.find_method(name)?.map(|(definer, _)| (definer, name.to_string()))
        };
        let Some((definer, method)) = found else {
            return Err(RuntimeError::MethodNotFound(id, name.to_string()));
        };
        let program = self.compiled_method(definer, &method).map_err(|e| match e {
            RuntimeError::MethodFailed { cause, .. } => RuntimeError::MethodFailed {
                obj: id,
                method: method.clone(),
                cause,
            },
            e => e,
        })?;
        let activation = Activation::new(program, id, definer, &method, context, args);
        execute(self, activation, 0).map_err(|exception| {
            warn!(
                obj = ?id,
                method,
                error = %exception.error,
                trace = ?exception.backtrace(),
                "method call failed"
            );
            RuntimeError::MethodFailed {
                obj: id,
                method: method.clone(),
                cause: ExecutionFailure::Exception(exception),
            }
        })
    }

    /// Compile and run `source` once, with `this` bound to the given object. Nothing is cached.
    pub fn eval(&self, this: Obj, source: &str) -> Result<Var, RuntimeError> {
        let program = compile(source, self.inner.config.compile_options()).map_err(|e| {
            RuntimeError::MethodFailed {
                obj: this,
                method: "eval".to_string(),
                cause: ExecutionFailure::Compile(e),
            }
        })?;
        let activation = Activation::new(
            Rc::new(program),
            this,
            this,
            "eval",
            CallContext::direct(this),
            vec![],
        );
        execute(self, activation, 0).map_err(|exception| RuntimeError::MethodFailed {
            obj: this,
            method: "eval".to_string(),
            cause: ExecutionFailure::Exception(exception),
        })
    }

    /// Wait for every queued background write to reach the store.
    pub fn flush(&self) {
        self.inner.writer.barrier();
    }

    /// Flush, stop the writer, and disconnect the store.
    pub fn shutdown(&self) -> Result<(), RuntimeError> {
        self.flush();
        self.inner.writer.stop();
        self.inner.store.disconnect()?;
        info!("object manager shut down");
        Ok(())
    }

    pub fn cache_len(&self) -> usize {
        self.inner.objects.borrow().len()
    }

    pub fn compiled_len(&self) -> usize {
        self.inner.compiled.borrow().len()
    }

    /// How many times method source has been compiled since startup.
    pub fn compilations(&self) -> usize {
        self.inner.compilations.get()
    }
}
