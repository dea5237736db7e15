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

//! Logging setup.
//!
//! Components log through the `tracing` facade; this module installs the
//! subscriber once at startup. Runtime level control goes through the
//! returned [`LogHandle`] instead of global mutable state; the embedding
//! process keeps the handle on its observability/config object.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

/// Handle for adjusting the log filter at runtime.
pub struct LogHandle {
    handle: reload::Handle<EnvFilter, Registry>,
}

impl LogHandle {
    /// Replaces the active filter with new directives, e.g. `"debug"` or
    /// `"helpline=debug,info"`.
    pub fn set_filter(&self, directives: &str) -> anyhow::Result<()> {
        let filter: EnvFilter = directives.parse()?;
        self.handle.reload(filter)?;
        Ok(())
    }
}

/// Installs the global tracing subscriber and returns the level-control
/// handle.
///
/// `RUST_LOG` wins when set; otherwise `default_directives` (or `"info"`)
/// applies. Safe to call more than once: later calls keep the existing
/// subscriber and return a handle wired to their own (inert) filter, which
/// keeps test setups simple.
pub fn init_logging(default_directives: Option<&str>) -> LogHandle {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives.unwrap_or("info")));
    let (filter, handle) = reload::Layer::new(filter);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();

    LogHandle { handle }
}
