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

//! Database layer: connection pooling, schema, stored-type wrappers and
//! embedded migrations.

pub mod connection;
pub mod schema;
pub mod types;

pub use connection::Database;
pub use types::StoredUuid;

use diesel::sqlite::SqliteConnection;
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use crate::error::RepositoryError;

/// Migrations compiled into the binary; applied with [`run_migrations`].
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Applies all pending migrations on the given connection.
pub fn run_migrations(conn: &mut SqliteConnection) -> Result<(), RepositoryError> {
    conn.run_pending_migrations(MIGRATIONS)
        .map(|_| ())
        .map_err(|e| RepositoryError::Migration(e.to_string()))
}
