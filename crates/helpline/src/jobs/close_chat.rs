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

//! Fan-out of a resolved problem: tells the client their chat is closed and
//! tells the manager, with a freshly computed capacity flag.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::JobError;
use crate::events::{ChatClosedEvent, Event, EventStream};
use crate::outbox::Job;
use crate::scheduler::ManagerLoadChecker;

use super::{ChatsRepository, ProblemsReader};

pub const NAME: &str = "close-chat";

/// Payload: `{"managerId","problemId","requestId"}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload {
    pub manager_id: Uuid,
    pub problem_id: Uuid,
    pub request_id: Uuid,
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
        if parsed.request_id.is_nil() {
            return Err(JobError::InvalidPayload(
                "requestId must not be nil".to_string(),
            ));
        }
        Ok(parsed)
    }
}

pub struct CloseChatJob {
    chats: Arc<dyn ChatsRepository>,
    problems: Arc<dyn ProblemsReader>,
    load_checker: Arc<dyn ManagerLoadChecker>,
    event_stream: EventStream,
}

impl CloseChatJob {
    pub fn new(
        chats: Arc<dyn ChatsRepository>,
        problems: Arc<dyn ProblemsReader>,
        load_checker: Arc<dyn ManagerLoadChecker>,
        event_stream: EventStream,
    ) -> Self {
        Self {
            chats,
            problems,
            load_checker,
            event_stream,
        }
    }
}

#[async_trait]
impl Job for CloseChatJob {
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

        let to_client = Event::ChatClosed(ChatClosedEvent {
            event_id: Uuid::new_v4(),
            request_id: payload.request_id,
            chat_id: chat.id.into(),
            can_take_more_problems: false,
        });
        self.event_stream.publish(chat.client_id.into(), to_client)?;

        // Resolution freed one slot; recompute rather than guess.
        let can_take_more = self
            .load_checker
            .can_manager_take_problem(payload.manager_id)
            .await?;

        let to_manager = Event::ChatClosed(ChatClosedEvent {
            event_id: Uuid::new_v4(),
            request_id: payload.request_id,
            chat_id: chat.id.into(),
            can_take_more_problems: can_take_more,
        });
        self.event_stream.publish(payload.manager_id, to_manager)?;

        Ok(())
    }
}
