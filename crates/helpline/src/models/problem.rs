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

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::database::types::StoredUuid;

/// A client's open question within a chat.
///
/// The scheduler only reads and writes the `manager_id` assignment; the rest
/// of the problem lifecycle (creation, resolution) is owned by the API layer.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::database::schema::problems)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Problem {
    pub id: StoredUuid,
    pub chat_id: StoredUuid,
    /// Assigned manager; null until the scheduler pairs one
    pub manager_id: Option<StoredUuid>,
    /// Resolution time; null while the problem is open
    pub resolved_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}
