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

//! Domain event types.
//!
//! Every event carries an `event_id` (for idempotent client-side dedup) and
//! a `request_id` correlating it to the request that triggered it. Events
//! are validated before publication; a malformed event is rejected before
//! any subscriber sees it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EventStreamError;

/// A new chat message became visible to the recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessageEvent {
    pub event_id: Uuid,
    pub request_id: Uuid,
    pub chat_id: Uuid,
    pub message_id: Uuid,
    /// Absent for system-generated service messages.
    pub author_id: Option<Uuid>,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub is_service: bool,
}

/// The recipient's own message passed moderation and was delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSentEvent {
    pub event_id: Uuid,
    pub request_id: Uuid,
    pub message_id: Uuid,
}

/// The recipient's own message was blocked by moderation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageBlockedEvent {
    pub event_id: Uuid,
    pub request_id: Uuid,
    pub message_id: Uuid,
}

/// A chat was assigned to the recipient (a manager).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChatEvent {
    pub event_id: Uuid,
    pub request_id: Uuid,
    pub chat_id: Uuid,
    pub client_id: Uuid,
    /// Whether the manager still has capacity for further problems.
    pub can_take_more_problems: bool,
}

/// A manager's message was delivered to the recipient (a client).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewManagerMessageEvent {
    pub event_id: Uuid,
    pub request_id: Uuid,
    pub chat_id: Uuid,
    pub message_id: Uuid,
    pub author_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// The recipient's chat was closed (problem resolved).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatClosedEvent {
    pub event_id: Uuid,
    pub request_id: Uuid,
    pub chat_id: Uuid,
    /// Whether the recipient (when a manager) regained capacity.
    pub can_take_more_problems: bool,
}

/// Tagged union of the events the stream delivers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "eventType")]
pub enum Event {
    NewMessage(NewMessageEvent),
    MessageSent(MessageSentEvent),
    MessageBlocked(MessageBlockedEvent),
    NewChat(NewChatEvent),
    NewManagerMessage(NewManagerMessageEvent),
    ChatClosed(ChatClosedEvent),
}

impl Event {
    /// Validates required fields. Publication rejects invalid events before
    /// any side effect.
    pub fn validate(&self) -> Result<(), EventStreamError> {
        fn required(
            event: &'static str,
            field: &'static str,
            id: Uuid,
        ) -> Result<(), EventStreamError> {
            if id.is_nil() {
                return Err(EventStreamError::MissingField { event, field });
            }
            Ok(())
        }

        match self {
            Event::NewMessage(e) => {
                required("NewMessageEvent", "event_id", e.event_id)?;
                required("NewMessageEvent", "request_id", e.request_id)?;
                required("NewMessageEvent", "chat_id", e.chat_id)?;
                required("NewMessageEvent", "message_id", e.message_id)?;
                if e.body.is_empty() {
                    return Err(EventStreamError::MissingField {
                        event: "NewMessageEvent",
                        field: "body",
                    });
                }
                Ok(())
            }
            Event::MessageSent(e) => {
                required("MessageSentEvent", "event_id", e.event_id)?;
                required("MessageSentEvent", "request_id", e.request_id)?;
                required("MessageSentEvent", "message_id", e.message_id)
            }
            Event::MessageBlocked(e) => {
                required("MessageBlockedEvent", "event_id", e.event_id)?;
                required("MessageBlockedEvent", "request_id", e.request_id)?;
                required("MessageBlockedEvent", "message_id", e.message_id)
            }
            Event::NewChat(e) => {
                required("NewChatEvent", "event_id", e.event_id)?;
                required("NewChatEvent", "request_id", e.request_id)?;
                required("NewChatEvent", "chat_id", e.chat_id)?;
                required("NewChatEvent", "client_id", e.client_id)
            }
            Event::NewManagerMessage(e) => {
                required("NewManagerMessageEvent", "event_id", e.event_id)?;
                required("NewManagerMessageEvent", "request_id", e.request_id)?;
                required("NewManagerMessageEvent", "chat_id", e.chat_id)?;
                required("NewManagerMessageEvent", "message_id", e.message_id)?;
                required("NewManagerMessageEvent", "author_id", e.author_id)?;
                if e.body.is_empty() {
                    return Err(EventStreamError::MissingField {
                        event: "NewManagerMessageEvent",
                        field: "body",
                    });
                }
                Ok(())
            }
            Event::ChatClosed(e) => {
                required("ChatClosedEvent", "event_id", e.event_id)?;
                required("ChatClosedEvent", "request_id", e.request_id)?;
                required("ChatClosedEvent", "chat_id", e.chat_id)
            }
        }
    }
}
