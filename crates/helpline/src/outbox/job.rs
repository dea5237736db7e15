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

//! The unit of asynchronous work.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::JobError;

/// Default per-execution timeout for jobs that do not override it.
pub const DEFAULT_EXECUTION_TIMEOUT: Duration = Duration::from_secs(30);

/// Default attempt budget for jobs that do not override it.
pub const DEFAULT_MAX_ATTEMPTS: i32 = 10;

/// A named, retryable unit of asynchronous work.
///
/// Each implementation encodes its own payload format (typically a validated
/// JSON envelope) and is constructed with the narrow collaborator ports it
/// needs, which keeps every job independently testable. Handlers must
/// tolerate re-invocation: the engine guarantees at-least-once execution,
/// so a handler may observe the effects of its own failed earlier attempts.
#[async_trait]
pub trait Job: Send + Sync {
    /// Registry key. Must be unique across all registered jobs.
    fn name(&self) -> &str;

    /// Executes the job. Any error counts as a failed attempt.
    async fn handle(&self, payload: &str) -> Result<(), JobError>;

    /// Upper bound on a single execution; the engine cancels the handler
    /// future when it elapses and counts the attempt as failed.
    fn execution_timeout(&self) -> Duration {
        DEFAULT_EXECUTION_TIMEOUT
    }

    /// Attempt budget before the job is dead-lettered.
    fn max_attempts(&self) -> i32 {
        DEFAULT_MAX_ATTEMPTS
    }
}
