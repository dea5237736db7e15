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

//! Job queue persistence: enqueue, reserve, complete, dead-letter.
//!
//! Reservation uses an immediate transaction so that concurrent workers
//! (including other process instances sharing the same database file) cannot
//! reserve the same row: the select and the lock update happen under
//! SQLite's write lock. The reservation window doubles as the retry backoff:
//! a failed job simply stays reserved until `reserved_until` lapses.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::database::schema::{failed_jobs, jobs};
use crate::database::types::StoredUuid;
use crate::database::Database;
use crate::error::RepositoryError;
use crate::models::job::{FailedJob, Job, NewFailedJob, NewJob};
use crate::outbox::JobsRepository;

/// Data access for the `jobs` and `failed_jobs` tables.
#[derive(Clone, Debug)]
pub struct JobsDAL {
    database: Database,
}

impl JobsDAL {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Persists a new job, eligible for pickup at `available_at`.
    ///
    /// No side effect beyond the durable write: callers that need the job to
    /// become visible only with a larger state change use the transactional
    /// composition on the owning DAL (see `ProblemsDAL::assign_manager`).
    pub async fn create(
        &self,
        name: &str,
        payload: &str,
        available_at: NaiveDateTime,
    ) -> Result<Job, RepositoryError> {
        let conn = self.database.conn().await?;

        let now = Utc::now().naive_utc();
        let new_job = NewJob {
            id: StoredUuid::new_v4(),
            name: name.to_string(),
            payload: payload.to_string(),
            attempts: 0,
            available_at,
            created_at: now,
            updated_at: now,
        };

        let job: Job = conn
            .interact(move |conn| {
                diesel::insert_into(jobs::table)
                    .values(&new_job)
                    .returning(Job::as_returning())
                    .get_result(conn)
            })
            .await
            .map_err(|e| RepositoryError::ConnectionPool(e.to_string()))??;

        Ok(job)
    }

    /// Atomically finds one eligible job and reserves it until
    /// `reserve_until`, incrementing its attempt counter.
    ///
    /// A job is eligible when its `available_at` has passed and it carries no
    /// live reservation. Returns [`RepositoryError::NoJobs`] when nothing is
    /// eligible.
    pub async fn find_and_reserve(
        &self,
        reserve_until: NaiveDateTime,
    ) -> Result<Job, RepositoryError> {
        let conn = self.database.conn().await?;

        let reserved: Option<Job> = conn
            .interact(move |conn| {
                conn.immediate_transaction::<_, diesel::result::Error, _>(|conn| {
                    let now = Utc::now().naive_utc();

                    let candidate: Option<Job> = jobs::table
                        .filter(jobs::available_at.le(now))
                        .filter(
                            jobs::reserved_until
                                .is_null()
                                .or(jobs::reserved_until.le(now)),
                        )
                        .order(jobs::available_at.asc())
                        .select(Job::as_select())
                        .first(conn)
                        .optional()?;

                    let Some(candidate) = candidate else {
                        return Ok(None);
                    };

                    let reserved: Job = diesel::update(jobs::table.find(candidate.id))
                        .set((
                            jobs::attempts.eq(candidate.attempts + 1),
                            jobs::reserved_until.eq(Some(reserve_until)),
                            jobs::updated_at.eq(now),
                        ))
                        .returning(Job::as_returning())
                        .get_result(conn)?;

                    Ok(Some(reserved))
                })
            })
            .await
            .map_err(|e| RepositoryError::ConnectionPool(e.to_string()))??;

        reserved.ok_or(RepositoryError::NoJobs)
    }

    /// Deletes a job after successful execution.
    pub async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let conn = self.database.conn().await?;

        conn.interact(move |conn| {
            diesel::delete(jobs::table.find(StoredUuid(id))).execute(conn)
        })
        .await
        .map_err(|e| RepositoryError::ConnectionPool(e.to_string()))??;

        Ok(())
    }

    /// Dead-letters a job: inserts a `FailedJob` carrying the abandonment
    /// reason and deletes the live row, atomically.
    pub async fn fail(&self, id: Uuid, reason: &str) -> Result<(), RepositoryError> {
        let conn = self.database.conn().await?;
        let reason = reason.to_string();

        conn.interact(move |conn| {
            conn.immediate_transaction::<_, diesel::result::Error, _>(|conn| {
                let job: Job = jobs::table
                    .find(StoredUuid(id))
                    .select(Job::as_select())
                    .first(conn)?;

                let dead_letter = NewFailedJob {
                    id: StoredUuid::new_v4(),
                    name: job.name,
                    payload: job.payload,
                    reason,
                    created_at: Utc::now().naive_utc(),
                };
                diesel::insert_into(failed_jobs::table)
                    .values(&dead_letter)
                    .execute(conn)?;

                diesel::delete(jobs::table.find(StoredUuid(id))).execute(conn)?;

                Ok(())
            })
        })
        .await
        .map_err(|e| RepositoryError::ConnectionPool(e.to_string()))??;

        Ok(())
    }

    /// Fetches a job by id.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Job, RepositoryError> {
        let conn = self.database.conn().await?;

        let job: Option<Job> = conn
            .interact(move |conn| {
                jobs::table
                    .find(StoredUuid(id))
                    .select(Job::as_select())
                    .first(conn)
                    .optional()
            })
            .await
            .map_err(|e| RepositoryError::ConnectionPool(e.to_string()))??;

        job.ok_or(RepositoryError::NotFound { entity: "job", id })
    }

    /// Number of live jobs in the queue.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let conn = self.database.conn().await?;

        let count: i64 = conn
            .interact(|conn| jobs::table.count().get_result(conn))
            .await
            .map_err(|e| RepositoryError::ConnectionPool(e.to_string()))??;

        Ok(count)
    }

    /// Number of dead-lettered jobs.
    pub async fn count_failed(&self) -> Result<i64, RepositoryError> {
        let conn = self.database.conn().await?;

        let count: i64 = conn
            .interact(|conn| failed_jobs::table.count().get_result(conn))
            .await
            .map_err(|e| RepositoryError::ConnectionPool(e.to_string()))??;

        Ok(count)
    }

    /// Lists dead-lettered jobs, newest first, for operational inspection.
    pub async fn list_failed(&self, limit: i64) -> Result<Vec<FailedJob>, RepositoryError> {
        let conn = self.database.conn().await?;

        let failed: Vec<FailedJob> = conn
            .interact(move |conn| {
                failed_jobs::table
                    .order(failed_jobs::created_at.desc())
                    .limit(limit)
                    .select(FailedJob::as_select())
                    .load(conn)
            })
            .await
            .map_err(|e| RepositoryError::ConnectionPool(e.to_string()))??;

        Ok(failed)
    }
}

#[async_trait]
impl JobsRepository for JobsDAL {
    async fn create_job(
        &self,
        name: &str,
        payload: &str,
        available_at: DateTime<Utc>,
    ) -> Result<Uuid, RepositoryError> {
        let job = self.create(name, payload, available_at.naive_utc()).await?;
        Ok(job.id.into())
    }

    async fn find_and_reserve_job(
        &self,
        reserve_until: DateTime<Utc>,
    ) -> Result<Job, RepositoryError> {
        self.find_and_reserve(reserve_until.naive_utc()).await
    }

    async fn delete_job(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.delete(id).await
    }

    async fn fail_job(&self, id: Uuid, reason: &str) -> Result<(), RepositoryError> {
        self.fail(id, reason).await
    }
}
