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

//! Notifies a client that moderation blocked their message.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::JobError;
use crate::events::{Event, EventStream, MessageBlockedEvent};
use crate::outbox::Job;

use super::{ChatsRepository, MessageRefPayload, MessagesRepository};

pub const NAME: &str = "client-message-blocked";

pub struct ClientMessageBlockedJob {
    messages: Arc<dyn MessagesRepository>,
    chats: Arc<dyn ChatsRepository>,
    event_stream: EventStream,
}

impl ClientMessageBlockedJob {
    pub fn new(
        messages: Arc<dyn MessagesRepository>,
        chats: Arc<dyn ChatsRepository>,
        event_stream: EventStream,
    ) -> Self {
        Self {
            messages,
            chats,
            event_stream,
        }
    }
}

#[async_trait]
impl Job for ClientMessageBlockedJob {
    fn name(&self) -> &str {
        NAME
    }

    async fn handle(&self, payload: &str) -> Result<(), JobError> {
        let payload = MessageRefPayload::parse(payload)?;

        let message = self.messages.get_message_by_id(payload.id).await?;
        let chat = self.chats.get_chat_by_id(message.chat_id.into()).await?;

        let event = Event::MessageBlocked(MessageBlockedEvent {
            event_id: Uuid::new_v4(),
            request_id: message.initial_request_id.into(),
            message_id: message.id.into(),
        });
        self.event_stream.publish(chat.client_id.into(), event)?;

        Ok(())
    }
}
