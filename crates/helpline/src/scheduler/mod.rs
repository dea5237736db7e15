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

//! Manager scheduler.
//!
//! A fixed-period loop that closes the gap between "a problem has no
//! manager" and "a manager is idle". Each tick drains up to `pool.size()`
//! waiting problems, oldest first, and pairs each with the longest-waiting
//! manager. The assignment and its follow-up outbox job commit in one
//! transaction through [`AssignmentRepository::assign_manager`]; on failure
//! the manager is returned to the pool so no availability is stranded.
//!
//! A pool pop that fails mid-tick is an invariant violation (the tick is
//! sized by `pool.size()` and nothing else removes managers concurrently
//! except assignment failures, which put them back) and stops the run loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{RepositoryError, SchedulerError};
use crate::jobs::manager_assigned_to_problem;
use crate::models::Problem;
use crate::pool::ManagerPool;

/// Default scheduling period.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(2);

/// Persistence port consumed by the scheduler.
#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// Fetches up to `limit` unresolved problems without a manager that
    /// already carry at least one manager-visible message, oldest first.
    async fn get_problems_without_manager(
        &self,
        limit: usize,
    ) -> Result<Vec<Problem>, RepositoryError>;

    /// Atomically assigns the manager to the problem and enqueues the
    /// follow-up outbox job; both commit or roll back together.
    async fn assign_manager(
        &self,
        problem_id: Uuid,
        manager_id: Uuid,
        job_name: &str,
        job_payload: &str,
    ) -> Result<(), RepositoryError>;
}

/// Capacity port: enforces the per-manager open-problem cap.
#[async_trait]
pub trait ManagerLoadChecker: Send + Sync {
    async fn can_manager_take_problem(&self, manager_id: Uuid) -> Result<bool, RepositoryError>;
}

/// Periodic matcher of idle managers to unassigned problems.
pub struct ManagerScheduler {
    pool: Arc<ManagerPool>,
    problems: Arc<dyn AssignmentRepository>,
    load_checker: Arc<dyn ManagerLoadChecker>,
    period: Duration,
    shutdown: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
}

impl ManagerScheduler {
    pub fn new(
        pool: Arc<ManagerPool>,
        problems: Arc<dyn AssignmentRepository>,
        load_checker: Arc<dyn ManagerLoadChecker>,
        period: Duration,
    ) -> Self {
        Self {
            pool,
            problems,
            load_checker,
            period,
            shutdown: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
        }
    }

    /// Runs the scheduling loop until [`ManagerScheduler::shutdown`] is
    /// called or an invariant violation stops it.
    ///
    /// Repository errors while fetching problems are transient: logged, the
    /// tick is skipped. A failed pool pop propagates as fatal.
    pub async fn run(&self) -> Result<(), SchedulerError> {
        info!(period = ?self.period, "starting manager scheduler");
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {}
                _ = self.shutdown_notify.notified() => {
                    info!("manager scheduler stopped");
                    return Ok(());
                }
            }
            if self.shutdown.load(Ordering::SeqCst) {
                info!("manager scheduler stopped");
                return Ok(());
            }

            match self.tick().await {
                Ok(()) => {}
                Err(SchedulerError::Repository(e)) => {
                    warn!(error = %e, "scheduling pass failed, will retry next tick");
                }
                Err(e) => {
                    error!(error = %e, "manager scheduler stopping");
                    return Err(e);
                }
            }
        }
    }

    /// Signals the run loop to stop after the current tick.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.shutdown_notify.notify_waiters();
    }

    /// Runs one scheduling pass.
    pub async fn tick(&self) -> Result<(), SchedulerError> {
        let available = self.pool.size();
        if available == 0 {
            // Nothing to hand out; skip the repository round-trip.
            return Ok(());
        }

        let problems = self
            .problems
            .get_problems_without_manager(available)
            .await?;
        if problems.is_empty() {
            debug!("no problems awaiting a manager");
            return Ok(());
        }

        for problem in problems {
            self.assign(problem).await?;
        }

        Ok(())
    }

    async fn assign(&self, problem: Problem) -> Result<(), SchedulerError> {
        let problem_id: Uuid = problem.id.into();

        // A failed pop here means the pool shrank under us: fatal.
        let manager_id = self.pool.get()?;

        let can_take_more = match self.load_checker.can_manager_take_problem(manager_id).await {
            Ok(can_take_more) => can_take_more,
            Err(e) => {
                warn!(manager = %manager_id, error = %e, "load check failed, returning manager");
                self.pool.put(manager_id);
                return Ok(());
            }
        };

        let payload = manager_assigned_to_problem::Payload {
            manager_id,
            problem_id,
            can_take_more_problems: can_take_more,
        };
        let payload = match serde_json::to_string(&payload) {
            Ok(payload) => payload,
            Err(e) => {
                self.pool.put(manager_id);
                return Err(SchedulerError::Payload(e));
            }
        };

        match self
            .problems
            .assign_manager(
                problem_id,
                manager_id,
                manager_assigned_to_problem::NAME,
                &payload,
            )
            .await
        {
            Ok(()) => {
                info!(problem = %problem_id, manager = %manager_id, "assigned manager to problem");
            }
            Err(e) => {
                // The manager did no work; put them back in line.
                warn!(problem = %problem_id, manager = %manager_id, error = %e, "assignment failed, returning manager");
                self.pool.put(manager_id);
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for ManagerScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagerScheduler")
            .field("period", &self.period)
            .field("pool", &self.pool)
            .finish()
    }
}
