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

//! Job queue models.
//!
//! A job row is the durable record of an intent to act. The reservation is
//! not a separate row: `available_at` is the earliest eligible pickup time
//! and `reserved_until` is the lock expiry. A job is eligible when
//! `reserved_until` is null or past **and** `available_at` has passed.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::database::types::StoredUuid;

/// A live job in the durable queue.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::database::schema::jobs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Job {
    /// Unique identifier for the job
    pub id: StoredUuid,
    /// Registry key of the handler that executes this job
    pub name: String,
    /// Opaque serialized payload, interpreted by the handler
    pub payload: String,
    /// Number of execution tries so far (incremented on reservation)
    pub attempts: i32,
    /// Earliest time the job is eligible for pickup
    pub available_at: NaiveDateTime,
    /// Reservation lock expiry; null when unreserved
    pub reserved_until: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// A new job to be inserted into the queue.
#[derive(Debug, Insertable)]
#[diesel(table_name = crate::database::schema::jobs)]
pub struct NewJob {
    pub id: StoredUuid,
    pub name: String,
    pub payload: String,
    pub attempts: i32,
    pub available_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Immutable dead-letter record of an abandoned job.
///
/// Written once when a job exhausts its attempts or references an unknown
/// handler; read for operational inspection, never retried automatically.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::database::schema::failed_jobs)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct FailedJob {
    pub id: StoredUuid,
    pub name: String,
    pub payload: String,
    /// Text of the last error that caused abandonment
    pub reason: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::database::schema::failed_jobs)]
pub struct NewFailedJob {
    pub id: StoredUuid,
    pub name: String,
    pub payload: String,
    pub reason: String,
    pub created_at: NaiveDateTime,
}
