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

//! Reacts to a client message passing moderation: confirms delivery to the
//! author and surfaces the message to the assigned manager, if any.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::JobError;
use crate::events::{Event, EventStream, MessageSentEvent, NewMessageEvent};
use crate::outbox::Job;

use super::{ChatsRepository, MessageRefPayload, MessagesRepository, ProblemsReader};

pub const NAME: &str = "client-message-sent";

pub struct ClientMessageSentJob {
    messages: Arc<dyn MessagesRepository>,
    chats: Arc<dyn ChatsRepository>,
    problems: Arc<dyn ProblemsReader>,
    event_stream: EventStream,
}

impl ClientMessageSentJob {
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
impl Job for ClientMessageSentJob {
    fn name(&self) -> &str {
        NAME
    }

    async fn handle(&self, payload: &str) -> Result<(), JobError> {
        let payload = MessageRefPayload::parse(payload)?;

        let message = self.messages.get_message_by_id(payload.id).await?;
        let chat = self.chats.get_chat_by_id(message.chat_id.into()).await?;

        let sent = Event::MessageSent(MessageSentEvent {
            event_id: Uuid::new_v4(),
            request_id: message.initial_request_id.into(),
            message_id: message.id.into(),
        });
        self.event_stream.publish(chat.client_id.into(), sent)?;

        // The manager only sees the message once their problem has one
        // assigned; an unassigned problem surfaces it via the scheduler path.
        let Some(problem_id) = message.problem_id else {
            return Ok(());
        };
        let problem = self.problems.get_problem_by_id(problem_id.into()).await?;
        let Some(manager_id) = problem.manager_id else {
            return Ok(());
        };

        let new_message = Event::NewMessage(NewMessageEvent {
            event_id: Uuid::new_v4(),
            request_id: message.initial_request_id.into(),
            chat_id: message.chat_id.into(),
            message_id: message.id.into(),
            author_id: message.author_id.map(Into::into),
            body: message.body.clone(),
            created_at: message.created_at.and_utc(),
            is_service: message.is_service,
        });
        self.event_stream.publish(manager_id.into(), new_message)?;

        Ok(())
    }
}
