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

//! The outbox engine: dispatcher and worker loops.
//!
//! One dispatcher reserves eligible jobs and hands them to `workers` worker
//! loops over a bounded channel, so the dispatcher blocks while every worker
//! is busy instead of hoarding reservations. Shutdown is cooperative: the
//! dispatcher stops reserving, the channel drains, and in-flight executions
//! finish under their own timeouts before `run` returns.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{OutboxError, RepositoryError};
use crate::models::Job as JobRecord;

use super::{Job, JobRegistry, JobsRepository, OutboxConfig};

/// Durable queue of asynchronous jobs.
///
/// `put` is safe to call from any producer; `run` drives execution until
/// [`Outbox::shutdown`] is called or a worker hits a fatal repository error.
pub struct Outbox {
    repository: Arc<dyn JobsRepository>,
    registry: Arc<RwLock<JobRegistry>>,
    config: OutboxConfig,
    shutdown: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
}

impl Outbox {
    pub fn new(repository: Arc<dyn JobsRepository>, config: OutboxConfig) -> Self {
        Self {
            repository,
            registry: Arc::new(RwLock::new(JobRegistry::new())),
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
            shutdown_notify: Arc::new(Notify::new()),
        }
    }

    /// Registers a job handler.
    ///
    /// Fails with [`OutboxError::JobAlreadyRegistered`] on a duplicate name.
    pub fn register_job(&self, job: Arc<dyn Job>) -> Result<(), OutboxError> {
        self.registry.write().register(job)
    }

    /// Registers several job handlers, stopping at the first failure.
    pub fn register_jobs(&self, jobs: Vec<Arc<dyn Job>>) -> Result<(), OutboxError> {
        for job in jobs {
            self.register_job(job)?;
        }
        Ok(())
    }

    /// Registers a job handler, panicking on failure.
    ///
    /// Intended for process startup where a duplicate registration is a
    /// programming error that should abort boot.
    pub fn must_register_job(&self, job: Arc<dyn Job>) {
        if let Err(e) = self.register_job(job) {
            panic!("job registration failed: {e}");
        }
    }

    /// Persists a new job.
    ///
    /// No side effect beyond the durable write, which makes `put` safe to
    /// call alongside the state change the job reacts to (use the DAL's
    /// transactional composition when both must commit together).
    pub async fn put(
        &self,
        name: &str,
        payload: &str,
        available_at: chrono::DateTime<Utc>,
    ) -> Result<Uuid, OutboxError> {
        if name.is_empty() {
            return Err(OutboxError::InvalidJob("job name is empty".to_string()));
        }
        if payload.is_empty() {
            return Err(OutboxError::InvalidJob("job payload is empty".to_string()));
        }

        let id = self
            .repository
            .create_job(name, payload, available_at)
            .await?;

        debug!(job = %name, id = %id, "enqueued job");
        Ok(id)
    }

    /// Runs the dispatcher and worker loops until shutdown or a fatal
    /// worker error.
    pub async fn run(&self) -> Result<(), OutboxError> {
        let reserve_for = chrono::Duration::from_std(self.config.reserve_for())
            .map_err(|e| OutboxError::InvalidConfig(format!("reserve_for out of range: {e}")))?;

        info!(
            workers = self.config.workers(),
            reserve_for = ?self.config.reserve_for(),
            "starting outbox"
        );

        let (tx, rx) = mpsc::channel::<JobRecord>(1);
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let mut handles = Vec::with_capacity(self.config.workers());
        for worker_id in 0..self.config.workers() {
            let worker = Worker {
                id: worker_id,
                repository: Arc::clone(&self.repository),
                registry: Arc::clone(&self.registry),
                shutdown: Arc::clone(&self.shutdown),
                shutdown_notify: Arc::clone(&self.shutdown_notify),
            };
            let rx = Arc::clone(&rx);
            handles.push(tokio::spawn(async move { worker.run(rx).await }));
        }

        self.dispatch(tx, reserve_for).await;

        // The sender is dropped; workers drain the channel and exit.
        let mut result = Ok(());
        for handle in handles {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
                Err(e) => {
                    if result.is_ok() {
                        result = Err(OutboxError::WorkerPanic(e.to_string()));
                    }
                }
            }
        }

        info!("outbox stopped");
        result
    }

    /// Signals the engine to stop. In-flight jobs are allowed to finish.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.shutdown_notify.notify_waiters();
    }

    async fn dispatch(&self, tx: mpsc::Sender<JobRecord>, reserve_for: chrono::Duration) {
        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                return;
            }

            match self
                .repository
                .find_and_reserve_job(Utc::now() + reserve_for)
                .await
            {
                Ok(job) => {
                    debug!(job = %job.name, id = %job.id, attempt = job.attempts, "reserved job");
                    if tx.send(job).await.is_err() {
                        // All workers are gone; nothing left to hand work to.
                        return;
                    }
                }
                Err(RepositoryError::NoJobs) => self.idle().await,
                Err(e) => {
                    error!(error = %e, "failed to reserve a job");
                    self.idle().await;
                }
            }
        }
    }

    async fn idle(&self) {
        tokio::select! {
            _ = tokio::time::sleep(self.config.idle_time()) => {}
            _ = self.shutdown_notify.notified() => {}
        }
    }
}

impl std::fmt::Debug for Outbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Outbox")
            .field("config", &self.config)
            .field("registry", &*self.registry.read())
            .finish()
    }
}

/// One worker loop: receives reserved jobs and executes them.
struct Worker {
    id: usize,
    repository: Arc<dyn JobsRepository>,
    registry: Arc<RwLock<JobRegistry>>,
    shutdown: Arc<AtomicBool>,
    shutdown_notify: Arc<Notify>,
}

impl Worker {
    async fn run(
        &self,
        rx: Arc<tokio::sync::Mutex<mpsc::Receiver<JobRecord>>>,
    ) -> Result<(), OutboxError> {
        loop {
            let job = { rx.lock().await.recv().await };
            let Some(job) = job else {
                debug!(worker = self.id, "worker channel closed, exiting");
                return Ok(());
            };

            if let Err(e) = self.execute(job).await {
                error!(worker = self.id, error = %e, "worker stopping on repository failure");
                // Wake the dispatcher so the whole run group winds down.
                self.shutdown.store(true, Ordering::SeqCst);
                self.shutdown_notify.notify_waiters();
                return Err(e);
            }
        }
    }

    async fn execute(&self, record: JobRecord) -> Result<(), OutboxError> {
        let handler = self.registry.read().get(&record.name);
        let Some(handler) = handler else {
            // Unknown names can never succeed; dead-letter immediately.
            warn!(job = %record.name, id = %record.id, "job is not registered, dead-lettering");
            self.repository
                .fail_job(record.id.into(), "job is not registered")
                .await?;
            return Ok(());
        };

        let outcome =
            tokio::time::timeout(handler.execution_timeout(), handler.handle(&record.payload))
                .await;

        match outcome {
            Ok(Ok(())) => {
                self.repository.delete_job(record.id.into()).await?;
                debug!(job = %record.name, id = %record.id, "job completed");
                Ok(())
            }
            Ok(Err(e)) => self.handle_failure(&record, &handler, e.to_string()).await,
            Err(_) => {
                let reason = format!(
                    "execution timed out after {:?}",
                    handler.execution_timeout()
                );
                self.handle_failure(&record, &handler, reason).await
            }
        }
    }

    async fn handle_failure(
        &self,
        record: &JobRecord,
        handler: &Arc<dyn Job>,
        reason: String,
    ) -> Result<(), OutboxError> {
        if record.attempts >= handler.max_attempts() {
            error!(
                job = %record.name,
                id = %record.id,
                attempts = record.attempts,
                reason = %reason,
                "job exhausted its attempts, dead-lettering"
            );
            self.repository.fail_job(record.id.into(), &reason).await?;
        } else {
            warn!(
                job = %record.name,
                id = %record.id,
                attempt = record.attempts,
                max_attempts = handler.max_attempts(),
                reason = %reason,
                "job failed, will retry after its reservation lapses"
            );
        }
        Ok(())
    }
}
