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

//! Configuration for the outbox engine.

use std::time::Duration;

use crate::error::OutboxError;

const DEFAULT_WORKERS: usize = 4;
const DEFAULT_IDLE_TIME: Duration = Duration::from_secs(2);
const DEFAULT_RESERVE_FOR: Duration = Duration::from_secs(60);

/// Configuration parameters for [`super::Outbox`].
///
/// # Construction
///
/// ```rust,ignore
/// let config = OutboxConfig::builder()
///     .workers(8)
///     .idle_time(Duration::from_millis(500))
///     .reserve_for(Duration::from_secs(30))
///     .build()?;
/// ```
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct OutboxConfig {
    workers: usize,
    idle_time: Duration,
    reserve_for: Duration,
}

impl OutboxConfig {
    pub fn builder() -> OutboxConfigBuilder {
        OutboxConfigBuilder::default()
    }

    /// Number of concurrent worker loops.
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// How long the dispatcher sleeps when no job is eligible.
    pub fn idle_time(&self) -> Duration {
        self.idle_time
    }

    /// Reservation window length. Doubles as the retry delay: a failed job
    /// becomes eligible again only once its reservation lapses.
    pub fn reserve_for(&self) -> Duration {
        self.reserve_for
    }
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            idle_time: DEFAULT_IDLE_TIME,
            reserve_for: DEFAULT_RESERVE_FOR,
        }
    }
}

/// Builder for [`OutboxConfig`].
#[derive(Debug, Default)]
pub struct OutboxConfigBuilder {
    workers: Option<usize>,
    idle_time: Option<Duration>,
    reserve_for: Option<Duration>,
}

impl OutboxConfigBuilder {
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn idle_time(mut self, idle_time: Duration) -> Self {
        self.idle_time = Some(idle_time);
        self
    }

    pub fn reserve_for(mut self, reserve_for: Duration) -> Self {
        self.reserve_for = Some(reserve_for);
        self
    }

    /// Validates and builds the configuration.
    pub fn build(self) -> Result<OutboxConfig, OutboxError> {
        let config = OutboxConfig {
            workers: self.workers.unwrap_or(DEFAULT_WORKERS),
            idle_time: self.idle_time.unwrap_or(DEFAULT_IDLE_TIME),
            reserve_for: self.reserve_for.unwrap_or(DEFAULT_RESERVE_FOR),
        };

        if config.workers == 0 {
            return Err(OutboxError::InvalidConfig(
                "workers must be at least 1".to_string(),
            ));
        }
        if config.reserve_for.is_zero() {
            return Err(OutboxError::InvalidConfig(
                "reserve_for must be non-zero".to_string(),
            ));
        }

        Ok(config)
    }
}
