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

//! Message model: the subset of the message row the jobs read and write.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::database::types::StoredUuid;

/// A chat message.
#[derive(Debug, Clone, Queryable, Selectable, Serialize, Deserialize)]
#[diesel(table_name = crate::database::schema::messages)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct Message {
    pub id: StoredUuid,
    pub chat_id: StoredUuid,
    /// Author; null for service messages generated by the system
    pub author_id: Option<StoredUuid>,
    /// Problem the message belongs to, when one is open
    pub problem_id: Option<StoredUuid>,
    /// Correlation id of the request that created the message; carried into
    /// the events derived from it
    pub initial_request_id: StoredUuid,
    pub body: String,
    pub is_visible_for_client: bool,
    pub is_visible_for_manager: bool,
    /// Set for system-generated service messages
    pub is_service: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = crate::database::schema::messages)]
pub struct NewMessage {
    pub id: StoredUuid,
    pub chat_id: StoredUuid,
    pub author_id: Option<StoredUuid>,
    pub problem_id: Option<StoredUuid>,
    pub initial_request_id: StoredUuid,
    pub body: String,
    pub is_visible_for_client: bool,
    pub is_visible_for_manager: bool,
    pub is_service: bool,
    pub created_at: NaiveDateTime,
}
