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

/// A chat between one client and the support staff.
///
/// The core only reads chats to resolve the client a problem or message
/// belongs to; the chat lifecycle is owned by the API layer.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::database::schema::chats)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Chat {
    pub id: StoredUuid,
    pub client_id: StoredUuid,
    pub created_at: NaiveDateTime,
}
