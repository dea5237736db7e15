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

//! Forwards a manager's message downstream, delivers it to the client and
//! confirms delivery to the manager.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::JobError;
use crate::events::{Event, EventStream, MessageSentEvent, NewManagerMessageEvent};
use crate::outbox::Job;
use crate::producer::{MessageProducer, OutboundMessage};

use super::{ChatsRepository, MessageRefPayload, MessagesRepository};

pub const NAME: &str = "send-manager-message";

pub struct SendManagerMessageJob {
    messages: Arc<dyn MessagesRepository>,
    chats: Arc<dyn ChatsRepository>,
    producer: Arc<dyn MessageProducer>,
    event_stream: EventStream,
}

impl SendManagerMessageJob {
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
impl Job for SendManagerMessageJob {
    fn name(&self) -> &str {
        NAME
    }

    async fn handle(&self, payload: &str) -> Result<(), JobError> {
        let payload = MessageRefPayload::parse(payload)?;

        let message = self.messages.get_message_by_id(payload.id).await?;
        let Some(author_id) = message.author_id else {
            return Err(JobError::InvalidPayload(format!(
                "message {} has no author",
                message.id
            )));
        };
        let chat = self.chats.get_chat_by_id(message.chat_id.into()).await?;

        self.producer
            .produce(OutboundMessage {
                id: message.id.into(),
                chat_id: message.chat_id.into(),
                body: message.body.clone(),
            })
            .await?;

        let to_client = Event::NewManagerMessage(NewManagerMessageEvent {
            event_id: Uuid::new_v4(),
            request_id: message.initial_request_id.into(),
            chat_id: message.chat_id.into(),
            message_id: message.id.into(),
            author_id: author_id.into(),
            body: message.body.clone(),
            created_at: message.created_at.and_utc(),
        });
        self.event_stream.publish(chat.client_id.into(), to_client)?;

        let to_manager = Event::MessageSent(MessageSentEvent {
            event_id: Uuid::new_v4(),
            request_id: message.initial_request_id.into(),
            message_id: message.id.into(),
        });
        self.event_stream.publish(author_id.into(), to_manager)?;

        Ok(())
    }
}
