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

//! Forwards a freshly written client message downstream and echoes it back
//! to the client's other live connections.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::JobError;
use crate::events::{Event, EventStream, NewMessageEvent};
use crate::outbox::Job;
use crate::producer::{MessageProducer, OutboundMessage};

use super::{ChatsRepository, MessageRefPayload, MessagesRepository};

pub const NAME: &str = "send-client-message";

pub struct SendClientMessageJob {
    messages: Arc<dyn MessagesRepository>,
    chats: Arc<dyn ChatsRepository>,
    producer: Arc<dyn MessageProducer>,
    event_stream: EventStream,
}

impl SendClientMessageJob {
    pub fn new(
        messages: Arc<dyn MessagesRepository>,
        chats: Arc<dyn ChatsRepository>,
        producer: Arc<dyn MessageProducer>,
        event_stream: EventStream,
    ) -> Self {
        Self {
            messages,
            chats,
            producer,
            event_stream,
        }
    }
}

#[async_trait]
impl Job for SendClientMessageJob {
    fn name(&self) -> &str {
        NAME
    }

    async fn handle(&self, payload: &str) -> Result<(), JobError> {
        let payload = MessageRefPayload::parse(payload)?;

        let message = self.messages.get_message_by_id(payload.id).await?;
        let chat = self.chats.get_chat_by_id(message.chat_id.into()).await?;

        self.producer
            .produce(OutboundMessage {
                id: message.id.into(),
                chat_id: message.chat_id.into(),
                body: message.body.clone(),
            })
            .await?;

        let event = Event::NewMessage(NewMessageEvent {
            event_id: Uuid::new_v4(),
            request_id: message.initial_request_id.into(),
            chat_id: message.chat_id.into(),
            message_id: message.id.into(),
            author_id: message.author_id.map(Into::into),
            body: message.body.clone(),
            created_at: message.created_at.and_utc(),
            is_service: message.is_service,
        });
        self.event_stream.publish(chat.client_id.into(), event)?;

        Ok(())
    }
}
