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

//! Error types for the orchestration core.
//!
//! Each component surfaces a small `thiserror` enum. Sentinel variants that
//! callers pattern-match on (`RepositoryError::NoJobs`,
//! `PoolError::NoAvailableManagers`, `OutboxError::JobAlreadyRegistered`)
//! are documented as such; everything else is wrapped with context and
//! treated as an opaque failure at the boundary.

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the persistence layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Sentinel: no job is currently eligible for reservation. The outbox
    /// dispatcher sleeps on this instead of treating it as a failure.
    #[error("no jobs ready for execution")]
    NoJobs,

    /// Sentinel: a row the caller referenced does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("connection pool error: {0}")]
    ConnectionPool(String),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("migration failed: {0}")]
    Migration(String),
}

/// Errors surfaced by the outbox engine and its job registry.
#[derive(Debug, Error)]
pub enum OutboxError {
    /// Sentinel: a job with this name is already registered.
    #[error("job \"{0}\" is already registered")]
    JobAlreadyRegistered(String),

    #[error("invalid job: {0}")]
    InvalidJob(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("worker terminated abnormally: {0}")]
    WorkerPanic(String),
}

/// Errors returned by job handlers.
///
/// The engine does not inspect these beyond logging: any handler error
/// counts as a failed attempt and either leaves the job reserved (retry
/// path) or dead-letters it (attempts exhausted).
#[derive(Debug, Error)]
pub enum JobError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Producer(#[from] ProducerError),

    #[error(transparent)]
    EventStream(#[from] EventStreamError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors surfaced by the in-process event stream.
#[derive(Debug, Error)]
pub enum EventStreamError {
    /// A required event field is nil/empty. Publication is rejected before
    /// any subscriber sees the event.
    #[error("event {event} is missing required field {field}")]
    MissingField {
        event: &'static str,
        field: &'static str,
    },

    #[error("stream is closed")]
    Closed,
}

/// Errors surfaced by the manager pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// Sentinel: the pool is empty.
    #[error("no available managers")]
    NoAvailableManagers,
}

/// Errors surfaced by the manager scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A pool pop failed while the scheduler believed the pool non-empty.
    /// This is an invariant violation and stops the run loop.
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("failed to encode job payload: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Errors surfaced by the message producer chain.
#[derive(Debug, Error)]
pub enum ProducerError {
    #[error("invalid encryption key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("delivery failed: {0}")]
    Delivery(String),
}
