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

//! Async SQLite connection pooling built on `deadpool-diesel`.
//!
//! The pool hands out connections that are driven on a blocking thread via
//! `interact`, keeping Diesel's synchronous API off the async executor.
//! Accepted URLs: a file path, `:memory:`, or a `file:` URI (use
//! `file:name?mode=memory&cache=shared` to share an in-memory database
//! across pooled connections, e.g. in tests).

use deadpool_diesel::sqlite::{Connection, Manager, Pool, Runtime};
use tracing::info;

use crate::error::RepositoryError;

/// Shared handle to the SQLite connection pool.
///
/// Cloning is cheap: all clones share the same underlying pool.
#[derive(Clone)]
pub struct Database {
    pool: Pool,
    url: String,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("url", &self.url).finish()
    }
}

impl Database {
    /// Creates a new pool against the given database URL.
    ///
    /// # Arguments
    ///
    /// * `database_url` - file path, `:memory:`, or `file:` URI
    /// * `pool_size` - maximum number of pooled connections
    pub fn new(database_url: &str, pool_size: usize) -> Self {
        let manager = Manager::new(database_url, Runtime::Tokio1);
        let pool = Pool::builder(manager)
            .max_size(pool_size)
            .build()
            .expect("failed to build connection pool");

        info!(url = %database_url, pool_size, "created sqlite connection pool");

        Self {
            pool,
            url: database_url.to_string(),
        }
    }

    /// Checks out a pooled connection.
    pub async fn conn(&self) -> Result<Connection, RepositoryError> {
        self.pool
            .get()
            .await
            .map_err(|e| RepositoryError::ConnectionPool(e.to_string()))
    }

    /// The URL this pool was created from.
    pub fn url(&self) -> &str {
        &self.url
    }
}
