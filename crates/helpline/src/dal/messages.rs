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

//! Message persistence for the job handlers.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use uuid::Uuid;

use crate::database::schema::messages;
use crate::database::types::StoredUuid;
use crate::database::Database;
use crate::error::RepositoryError;
use crate::jobs::MessagesRepository;
use crate::models::message::{Message, NewMessage};

/// Data access for the `messages` table.
#[derive(Clone, Debug)]
pub struct MessagesDAL {
    database: Database,
}

impl MessagesDAL {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Fetches a message by id.
    pub async fn get_by_id(&self, id: Uuid) -> Result<Message, RepositoryError> {
        let conn = self.database.conn().await?;

        let message: Option<Message> = conn
            .interact(move |conn| {
                messages::table
                    .find(StoredUuid(id))
                    .select(Message::as_select())
                    .first(conn)
                    .optional()
            })
            .await
            .map_err(|e| RepositoryError::ConnectionPool(e.to_string()))??;

        message.ok_or(RepositoryError::NotFound {
            entity: "message",
            id,
        })
    }

    /// Creates a system-authored service message, visible to the client.
    pub async fn create_service_message(
        &self,
        chat_id: Uuid,
        problem_id: Uuid,
        body: &str,
    ) -> Result<Message, RepositoryError> {
        let new_message = NewMessage {
            id: StoredUuid::new_v4(),
            chat_id: StoredUuid(chat_id),
            author_id: None,
            problem_id: Some(StoredUuid(problem_id)),
            initial_request_id: StoredUuid::new_v4(),
            body: body.to_string(),
            is_visible_for_client: true,
            is_visible_for_manager: false,
            is_service: true,
            created_at: Utc::now().naive_utc(),
        };

        self.insert(new_message).await
    }

    /// Creates a client-authored message within a problem.
    ///
    /// The message starts manager-visible; callers modeling the moderation
    /// flow flip visibility themselves before use.
    pub async fn create_client_message(
        &self,
        chat_id: Uuid,
        problem_id: Uuid,
        author_id: Uuid,
        request_id: Uuid,
        body: &str,
    ) -> Result<Message, RepositoryError> {
        let new_message = NewMessage {
            id: StoredUuid::new_v4(),
            chat_id: StoredUuid(chat_id),
            author_id: Some(StoredUuid(author_id)),
            problem_id: Some(StoredUuid(problem_id)),
            initial_request_id: StoredUuid(request_id),
            body: body.to_string(),
            is_visible_for_client: true,
            is_visible_for_manager: true,
            is_service: false,
            created_at: Utc::now().naive_utc(),
        };

        self.insert(new_message).await
    }

    async fn insert(&self, new_message: NewMessage) -> Result<Message, RepositoryError> {
        let conn = self.database.conn().await?;

        let message: Message = conn
            .interact(move |conn| {
                diesel::insert_into(messages::table)
                    .values(&new_message)
                    .returning(Message::as_returning())
                    .get_result(conn)
            })
            .await
            .map_err(|e| RepositoryError::ConnectionPool(e.to_string()))??;

        Ok(message)
    }
}

#[async_trait]
impl MessagesRepository for MessagesDAL {
    async fn get_message_by_id(&self, id: Uuid) -> Result<Message, RepositoryError> {
        self.get_by_id(id).await
    }

    async fn create_service_message(
        &self,
        chat_id: Uuid,
        problem_id: Uuid,
        body: &str,
    ) -> Result<Message, RepositoryError> {
        MessagesDAL::create_service_message(self, chat_id, problem_id, body).await
    }
}
