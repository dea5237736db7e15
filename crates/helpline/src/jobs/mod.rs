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

//! Concrete outbox jobs.
//!
//! Each job is a small struct constructed with the narrow ports it needs and
//! registered with the outbox under its `NAME`. Payloads are camelCase JSON
//! envelopes validated before any side effect. Handlers are idempotent with
//! respect to event publication: republishing to the stream on a retry is
//! harmless because events carry dedup ids.

pub mod client_message_blocked;
pub mod client_message_sent;
pub mod close_chat;
pub mod manager_assigned_to_problem;
pub mod send_client_message;
pub mod send_manager_message;

pub use client_message_blocked::ClientMessageBlockedJob;
pub use client_message_sent::ClientMessageSentJob;
pub use close_chat::CloseChatJob;
pub use manager_assigned_to_problem::ManagerAssignedToProblemJob;
pub use send_client_message::SendClientMessageJob;
pub use send_manager_message::SendManagerMessageJob;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{JobError, RepositoryError};
use crate::models::{Chat, Message, Problem};

/// Message persistence port consumed by jobs.
#[async_trait]
pub trait MessagesRepository: Send + Sync {
    async fn get_message_by_id(&self, id: Uuid) -> Result<Message, RepositoryError>;

    /// Creates a system-authored service message, visible to the client.
    async fn create_service_message(
        &self,
        chat_id: Uuid,
        problem_id: Uuid,
        body: &str,
    ) -> Result<Message, RepositoryError>;
}

/// Chat lookup port consumed by jobs to route events to the client.
#[async_trait]
pub trait ChatsRepository: Send + Sync {
    async fn get_chat_by_id(&self, id: Uuid) -> Result<Chat, RepositoryError>;
}

/// Problem lookup port consumed by jobs.
#[async_trait]
pub trait ProblemsReader: Send + Sync {
    async fn get_problem_by_id(&self, id: Uuid) -> Result<Problem, RepositoryError>;
}

/// Payload of the message-reference jobs: `{"id": "<uuid>"}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRefPayload {
    pub id: Uuid,
}

impl MessageRefPayload {
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }

    /// Parses and validates the envelope.
    pub fn parse(payload: &str) -> Result<Self, JobError> {
        let parsed: Self = serde_json::from_str(payload)
            .map_err(|e| JobError::InvalidPayload(e.to_string()))?;
        if parsed.id.is_nil() {
            return Err(JobError::InvalidPayload("id must not be nil".to_string()));
        }
        Ok(parsed)
    }

    pub fn to_json(&self) -> Result<String, JobError> {
        serde_json::to_string(self).map_err(|e| JobError::InvalidPayload(e.to_string()))
    }
}
