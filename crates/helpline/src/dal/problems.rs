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

//! Problem persistence, including the scheduler's transactional assignment.
//!
//! `assign_manager` is the one place where a state change and its outbox job
//! must commit or roll back together: the manager update and the job insert
//! share a single immediate transaction, so a failed assignment never leaves
//! an orphaned job behind.

use async_trait::async_trait;
use chrono::Utc;
use diesel::dsl::exists;
use diesel::prelude::*;
use uuid::Uuid;

use crate::database::schema::{jobs, messages, problems};
use crate::database::types::StoredUuid;
use crate::database::Database;
use crate::error::RepositoryError;
use crate::jobs::ProblemsReader;
use crate::models::job::NewJob;
use crate::models::problem::Problem;
use crate::scheduler::{AssignmentRepository, ManagerLoadChecker};

/// Open problems a manager may hold at once before the load checker stops
/// routing new ones to them.
const MAX_ACTIVE_PROBLEMS: i64 = 5;

/// Data access for the `problems` table.
#[derive(Clone, Debug)]
pub struct ProblemsDAL {
    database: Database,
    max_active_problems: i64,
}

impl ProblemsDAL {
    pub fn new(database: Database) -> Self {
        Self {
            database,
            max_active_problems: MAX_ACTIVE_PROBLEMS,
        }
    }

    /// Overrides the per-manager open-problem cap.
    pub fn with_max_active_problems(mut self, cap: i64) -> Self {
        self.max_active_problems = cap;
        self
    }

    /// Fetches up to `limit` unresolved problems with no assigned manager
    /// that already carry at least one manager-visible message, oldest
    /// created first.
    pub async fn get_problems_without_manager(
        &self,
        limit: i64,
    ) -> Result<Vec<Problem>, RepositoryError> {
        let conn = self.database.conn().await?;

        let rows: Vec<Problem> = conn
            .interact(move |conn| {
                problems::table
                    .filter(problems::manager_id.is_null())
                    .filter(problems::resolved_at.is_null())
                    .filter(exists(
                        messages::table
                            .filter(messages::problem_id.eq(problems::id.nullable()))
                            .filter(messages::is_visible_for_manager.eq(true)),
                    ))
                    .order(problems::created_at.asc())
                    .limit(limit)
                    .select(Problem::as_select())
                    .load(conn)
            })
            .await
            .map_err(|e| RepositoryError::ConnectionPool(e.to_string()))??;

        Ok(rows)
    }

    /// Atomically assigns `manager_id` to an unassigned problem and enqueues
    /// the follow-up outbox job in the same transaction.
    ///
    /// Fails with [`RepositoryError::NotFound`] if the problem no longer
    /// exists or already has a manager; in that case nothing is written.
    pub async fn assign_manager(
        &self,
        problem_id: Uuid,
        manager_id: Uuid,
        job_name: &str,
        job_payload: &str,
    ) -> Result<(), RepositoryError> {
        let conn = self.database.conn().await?;
        let job_name = job_name.to_string();
        let job_payload = job_payload.to_string();

        let assigned: bool = conn
            .interact(move |conn| {
                conn.immediate_transaction::<_, diesel::result::Error, _>(|conn| {
                    let now = Utc::now().naive_utc();

                    let updated = diesel::update(
                        problems::table
                            .find(StoredUuid(problem_id))
                            .filter(problems::manager_id.is_null()),
                    )
                    .set(problems::manager_id.eq(Some(StoredUuid(manager_id))))
                    .execute(conn)?;

                    if updated == 0 {
                        return Ok(false);
                    }

                    let new_job = NewJob {
                        id: StoredUuid::new_v4(),
                        name: job_name,
                        payload: job_payload,
                        attempts: 0,
                        available_at: now,
                        created_at: now,
                        updated_at: now,
                    };
                    diesel::insert_into(jobs::table)
                        .values(&new_job)
                        .execute(conn)?;

                    Ok(true)
                })
            })
            .await
            .map_err(|e| RepositoryError::ConnectionPool(e.to_string()))??;

        if !assigned {
            return Err(RepositoryError::NotFound {
                entity: "unassigned problem",
                id: problem_id,
            });
        }

        Ok(())
    }

    /// Whether the manager is below the open-problem cap.
    pub async fn can_manager_take_problem(
        &self,
        manager_id: Uuid,
    ) -> Result<bool, RepositoryError> {
        let conn = self.database.conn().await?;

        let open: i64 = conn
            .interact(move |conn| {
                problems::table
                    .filter(problems::manager_id.eq(Some(StoredUuid(manager_id))))
                    .filter(problems::resolved_at.is_null())
                    .count()
                    .get_result(conn)
            })
            .await
            .map_err(|e| RepositoryError::ConnectionPool(e.to_string()))??;

        Ok(open < self.max_active_problems)
    }

    /// Fetches a problem by id.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Problem, RepositoryError> {
        let conn = self.database.conn().await?;

        let problem: Option<Problem> = conn
            .interact(move |conn| {
                problems::table
                    .find(StoredUuid(id))
                    .select(Problem::as_select())
                    .first(conn)
                    .optional()
            })
            .await
            .map_err(|e| RepositoryError::ConnectionPool(e.to_string()))??;

        problem.ok_or(RepositoryError::NotFound {
            entity: "problem",
            id,
        })
    }

    /// Creates an open, unassigned problem in the given chat.
    pub async fn create(&self, chat_id: Uuid) -> Result<Problem, RepositoryError> {
        let conn = self.database.conn().await?;

        let problem: Problem = conn
            .interact(move |conn| {
                diesel::insert_into(problems::table)
                    .values((
                        problems::id.eq(StoredUuid::new_v4()),
                        problems::chat_id.eq(StoredUuid(chat_id)),
                        problems::created_at.eq(Utc::now().naive_utc()),
                    ))
                    .returning(Problem::as_returning())
                    .get_result(conn)
            })
            .await
            .map_err(|e| RepositoryError::ConnectionPool(e.to_string()))??;

        Ok(problem)
    }

    /// Marks a problem resolved.
    pub async fn resolve(&self, id: Uuid) -> Result<(), RepositoryError> {
        let conn = self.database.conn().await?;

        conn.interact(move |conn| {
            diesel::update(problems::table.find(StoredUuid(id)))
                .set(problems::resolved_at.eq(Some(Utc::now().naive_utc())))
                .execute(conn)
        })
        .await
        .map_err(|e| RepositoryError::ConnectionPool(e.to_string()))??;

        Ok(())
    }
}

#[async_trait]
impl AssignmentRepository for ProblemsDAL {
    async fn get_problems_without_manager(
        &self,
        limit: usize,
    ) -> Result<Vec<Problem>, RepositoryError> {
        ProblemsDAL::get_problems_without_manager(self, limit as i64).await
    }

    async fn assign_manager(
        &self,
        problem_id: Uuid,
        manager_id: Uuid,
        job_name: &str,
        job_payload: &str,
    ) -> Result<(), RepositoryError> {
        ProblemsDAL::assign_manager(self, problem_id, manager_id, job_name, job_payload).await
    }
}

#[async_trait]
impl ManagerLoadChecker for ProblemsDAL {
    async fn can_manager_take_problem(&self, manager_id: Uuid) -> Result<bool, RepositoryError> {
        ProblemsDAL::can_manager_take_problem(self, manager_id).await
    }
}

#[async_trait]
impl ProblemsReader for ProblemsDAL {
    async fn get_problem_by_id(&self, id: Uuid) -> Result<Problem, RepositoryError> {
        self.get_by_id(id).await
    }
}
