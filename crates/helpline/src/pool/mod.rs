/*
 *  Copyright 2025-2026 Helpline Maintainers
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Manager availability pool.
//!
//! A FIFO set of managers who declared themselves free to take the next
//! problem. The pool is process-local and deliberately not persisted:
//! managers re-declare availability after a restart. One mutex guards the
//! whole structure. This is a small, cold path, so simplicity wins over
//! lock-free cleverness.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::error::PoolError;

/// Bounded FIFO set of managers available to take work.
#[derive(Debug, Default)]
pub struct ManagerPool {
    queue: Mutex<VecDeque<Uuid>>,
}

impl ManagerPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a manager to the queue. Idempotent: re-adding a manager who
    /// is already waiting is a no-op.
    pub fn put(&self, manager_id: Uuid) {
        let mut queue = self.queue.lock();
        if queue.contains(&manager_id) {
            return;
        }
        queue.push_back(manager_id);
        debug!(manager = %manager_id, waiting = queue.len(), "manager joined the pool");
    }

    /// Pops the manager at the front of the queue.
    ///
    /// Fails with [`PoolError::NoAvailableManagers`] when empty.
    pub fn get(&self) -> Result<Uuid, PoolError> {
        let mut queue = self.queue.lock();
        let manager_id = queue.pop_front().ok_or(PoolError::NoAvailableManagers)?;
        debug!(manager = %manager_id, waiting = queue.len(), "manager taken from the pool");
        Ok(manager_id)
    }

    /// Whether the manager is currently waiting in the queue.
    pub fn contains(&self, manager_id: Uuid) -> bool {
        self.queue.lock().contains(&manager_id)
    }

    /// Number of waiting managers.
    pub fn size(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}
