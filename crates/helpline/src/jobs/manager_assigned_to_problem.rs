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

//! Fan-out of a scheduler assignment: announces the new chat to the manager
//! and drops a service message into the chat for the client.
//!
//! Enqueued by the scheduler inside the same transaction that writes the
//! assignment, so the job exists if and only if the assignment committed.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::JobError;
use crate::events::{Event, EventStream, NewChatEvent, NewMessageEvent};
use crate::outbox::Job;

use super::{ChatsRepository, MessagesRepository, ProblemsReader};

pub const NAME: &str = "manager-assigned-to-problem";

/// Service message shown to the client when a manager joins.
const SERVICE_BODY: &str = "A support manager has joined the chat and will answer you shortly.";

/// Payload: `{"managerId","problemId","canTakeMoreProblems"}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub manager_id: Uuid,
    pub problem_id: Uuid,
    pub can_take_more_problems: bool,
}

impl Payload {
    /// Parses and validates the envelope.
    pub fn parse(payload: &str) -> Result<Self, JobError> {
        let parsed: Self = serde_json::from_str(payload)
            .map_err(|e| JobError::InvalidPayload(e.to_string()))?;
        if parsed.manager_id.is_nil() {
            return Err(JobError::InvalidPayload(
                "managerId must not be nil".to_string(),
            ));
        }
        if parsed.problem_id.is_nil() {
            return Err(JobError::InvalidPayload(
                "problemId must not be nil".to_string(),
            ));
        }
        Ok(parsed)
    }
}

pub struct ManagerAssignedToProblemJob {
    messages: Arc<dyn MessagesRepository>,
    chats: Arc<dyn ChatsRepository>,
    problems: Arc<dyn ProblemsReader>,
    event_stream: EventStream,
}

impl ManagerAssignedToProblemJob {
    pub fn new(
        messages: Arc<dyn MessagesRepository>,
        chats: Arc<dyn ChatsRepository>,
        problems: Arc<dyn ProblemsReader>,
        event_stream: EventStream,
    ) -> Self {
        Self {
            messages,
            chats,
            problems,
            event_stream,
        }
    }
}

#[async_trait]
impl Job for ManagerAssignedToProblemJob {
    fn name(&self) -> &str {
        NAME
    }

    async fn handle(&self, payload: &str) -> Result<(), JobError> {
        let payload = Payload::parse(payload)?;

        let problem = self
            .problems
            .get_problem_by_id(payload.problem_id)
            .await?;
        let chat = self.chats.get_chat_by_id(problem.chat_id.into()).await?;

        // Re-invocation after a failed attempt writes a second service
        // message; tolerable, the client just sees the banner twice.
        let service = self
            .messages
            .create_service_message(chat.id.into(), payload.problem_id, SERVICE_BODY)
            .await?;
        let request_id: Uuid = service.initial_request_id.into();

        let new_chat = Event::NewChat(NewChatEvent {
            event_id: Uuid::new_v4(),
            request_id,
            chat_id: chat.id.into(),
            client_id: chat.client_id.into(),
            can_take_more_problems: payload.can_take_more_problems,
        });
        self.event_stream.publish(payload.manager_id, new_chat)?;

        let new_message = Event::NewMessage(NewMessageEvent {
            event_id: Uuid::new_v4(),
            request_id,
            chat_id: chat.id.into(),
            message_id: service.id.into(),
            author_id: None,
            body: service.body.clone(),
            created_at: service.created_at.and_utc(),
            is_service: true,
        });
        self.event_stream.publish(chat.client_id.into(), new_message)?;

        Ok(())
    }
}
