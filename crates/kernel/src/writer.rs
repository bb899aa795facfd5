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

//! Write-behind persistence. Object updates are handed to a dedicated thread which applies them
//! to the store in submission order. Callers either wait for the result of their write, or hand it
//! off and move on, in which case failures can only be logged.

use ember_common::model::{ObjectUpdate, StoreError};
use ember_db::Store;
use ember_var::Obj;
use flume::Sender;
use std::cell::RefCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::JoinHandle;
use tracing::{debug, error};

enum WriteOp {
    Update {
        id: Obj,
        update: ObjectUpdate,
        /// Absent for detached writes.
        reply: Option<oneshot::Sender<Result<(), StoreError>>>,
    },
    /// Reply once every write queued before this one has been applied.
    Barrier(oneshot::Sender<()>),
    Shutdown,
}

pub(crate) struct WriteBehind {
    ops: Sender<WriteOp>,
    /// Detached writes submitted but not yet applied.
    pending: Arc<AtomicUsize>,
    jh: RefCell<Option<JoinHandle<()>>>,
}

impl WriteBehind {
    pub(crate) fn start(store: Arc<dyn Store>) -> Result<Self, StoreError> {
        let (ops_tx, ops_rx) = flume::unbounded::<WriteOp>();
        let pending = Arc::new(AtomicUsize::new(0));
        let pending_bg = pending.clone();
        let jh = std::thread::Builder::new()
            .name("ember-writer".to_string())
            .spawn(move || {
                while let Ok(op) = ops_rx.recv() {
                    match op {
                        WriteOp::Update { id, update, reply } => {
                            let result = store.update(id, &update);
                            match reply {
                                Some(reply) => {
                                    reply.send(result).ok();
                                }
                                None => {
                                    pending_bg.fetch_sub(1, Ordering::SeqCst);
                                    if let Err(e) = result {
                                        error!(?id, error = %e, "background save failed");
                                    }
                                }
                            }
                        }
                        WriteOp::Barrier(reply) => {
                            reply.send(()).ok();
                        }
                        WriteOp::Shutdown => break,
                    }
                }
                debug!("writer thread exiting");
            })
            .map_err(|e| StoreError::BackendError(e.to_string()))?;
        Ok(Self {
            ops: ops_tx,
            pending,
            jh: RefCell::new(Some(jh)),
        })
    }

    /// Apply `update` and wait for the outcome.
    pub(crate) fn write(&self, id: Obj, update: ObjectUpdate) -> Result<(), StoreError> {
        let (reply, result) = oneshot::channel();
        self.ops
            .send(WriteOp::Update {
                id,
                update,
                reply: Some(reply),
            })
            .map_err(|_| StoreError::NotConnected)?;
        result.recv().map_err(|_| StoreError::NotConnected)?
    }

    /// Queue `update` without waiting. A failure is logged by the writer thread.
    pub(crate) fn write_detached(&self, id: Obj, update: ObjectUpdate) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        if self
            .ops
            .send(WriteOp::Update {
                id,
                update,
                reply: None,
            })
            .is_err()
        {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            error!(?id, "background save dropped: writer has stopped");
        }
    }

    /// Block until all detached writes queued so far have been applied.
    pub(crate) fn barrier(&self) {
        if self.pending.load(Ordering::SeqCst) == 0 {
            return;
        }
        let (reply, done) = oneshot::channel();
        if self.ops.send(WriteOp::Barrier(reply)).is_ok() {
            done.recv().ok();
        }
    }

    pub(crate) fn stop(&self) {
        let Some(jh) = self.jh.borrow_mut().take() else {
            return;
        };
        self.ops.send(WriteOp::Shutdown).ok();
        if jh.join().is_err() {
            error!("writer thread panicked");
        }
    }
}

impl Drop for WriteBehind {
    fn drop(&mut self) {
        self.stop();
    }
}
