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

//! Job registry: name → handler mapping, populated once at startup.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::OutboxError;

use super::Job;

/// Mapping from job name to handler instance.
///
/// Populated at startup through the outbox's `register_job(s)` methods;
/// lookups at execution time are the only other operation.
#[derive(Default)]
pub struct JobRegistry {
    jobs: HashMap<String, Arc<dyn Job>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler under its name.
    ///
    /// Fails with [`OutboxError::JobAlreadyRegistered`] on a duplicate name
    /// and [`OutboxError::InvalidJob`] on an empty one.
    pub fn register(&mut self, job: Arc<dyn Job>) -> Result<(), OutboxError> {
        let name = job.name().to_string();
        if name.is_empty() {
            return Err(OutboxError::InvalidJob("job name is empty".to_string()));
        }
        if self.jobs.contains_key(&name) {
            return Err(OutboxError::JobAlreadyRegistered(name));
        }

        debug!(job = %name, "registered job handler");
        self.jobs.insert(name, job);
        Ok(())
    }

    /// Looks up a handler by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Job>> {
        self.jobs.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRegistry")
            .field("jobs", &self.jobs.keys().collect::<Vec<_>>())
            .finish()
    }
}
