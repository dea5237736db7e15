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

//! Chat persistence. The core only resolves chats to route events to the
//! right client.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::database::schema::chats;
use crate::database::types::StoredUuid;
use crate::database::Database;
use crate::error::RepositoryError;
use crate::jobs::ChatsRepository;
use crate::models::chat::Chat;

/// Data access for the `chats` table.
#[derive(Clone, Debug)]
pub struct ChatsDAL {
    database: Database,
}

impl ChatsDAL {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Fetches a chat by id.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Chat, RepositoryError> {
        let conn = self.database.conn().await?;

        let chat: Option<Chat> = conn
            .interact(move |conn| {
                chats::table
                    .find(StoredUuid(id))
                    .select(Chat::as_select())
                    .first(conn)
                    .optional()
            })
            .await
            .map_err(|e| RepositoryError::ConnectionPool(e.to_string()))??;

        chat.ok_or(RepositoryError::NotFound { entity: "chat", id })
    }

    /// Creates a chat for the given client.
    pub async fn create(&self, client_id: Uuid) -> Result<Chat, RepositoryError> {
        let conn = self.database.conn().await?;

        let chat: Chat = conn
            .interact(move |conn| {
                diesel::insert_into(chats::table)
                    .values((
                        chats::id.eq(StoredUuid::new_v4()),
                        chats::client_id.eq(StoredUuid(client_id)),
                        chats::created_at.eq(Utc::now().naive_utc()),
                    ))
                    .returning(Chat::as_returning())
                    .get_result(conn)
            })
            .await
            .map_err(|e| RepositoryError::ConnectionPool(e.to_string()))??;

        Ok(chat)
    }
}

#[async_trait]
impl ChatsRepository for ChatsDAL {
    async fn get_chat_by_id(&self, id: Uuid) -> Result<Chat, RepositoryError> {
        self.get_by_id(id).await
    }
}
