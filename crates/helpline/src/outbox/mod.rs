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

//! Transactional outbox engine.
//!
//! The outbox turns side effects into durable, retryable units of work.
//! Producers enqueue named jobs with [`Outbox::put`]; a dispatcher loop
//! reserves eligible jobs one at a time and hands them to a fixed pool of
//! workers, which execute the registered handler under its own timeout.
//! Successful jobs are deleted; failing jobs stay reserved and retry once
//! their reservation lapses (the reservation window is the backoff; there
//! is deliberately no exponential backoff here); jobs that exhaust
//! `max_attempts` or reference an unregistered handler are dead-lettered
//! into the `failed_jobs` store.

mod config;
mod engine;
mod job;
mod registry;

pub use config::{OutboxConfig, OutboxConfigBuilder};
pub use engine::Outbox;
pub use job::Job;
pub use registry::JobRegistry;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models;

/// Persistence port consumed by the outbox engine.
///
/// Implementations must guarantee that `find_and_reserve_job` is atomic:
/// at most one caller (across processes sharing the backing store) receives
/// any given job per reservation window, and `fail_job` must insert the
/// dead letter and delete the live row in one transaction.
#[async_trait]
pub trait JobsRepository: Send + Sync {
    /// Persists a new job, eligible for pickup at `available_at`.
    async fn create_job(
        &self,
        name: &str,
        payload: &str,
        available_at: DateTime<Utc>,
    ) -> Result<Uuid, RepositoryError>;

    /// Atomically reserves one eligible job until `reserve_until`,
    /// incrementing its attempt counter. Returns
    /// [`RepositoryError::NoJobs`] when nothing is eligible.
    async fn find_and_reserve_job(
        &self,
        reserve_until: DateTime<Utc>,
    ) -> Result<models::Job, RepositoryError>;

    /// Deletes a job after successful execution.
    async fn delete_job(&self, id: Uuid) -> Result<(), RepositoryError>;

    /// Dead-letters a job with the given abandonment reason.
    async fn fail_job(&self, id: Uuid, reason: &str) -> Result<(), RepositoryError>;
}
