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

//! Job handler tests against the real DAL and event stream, including the
//! scheduler → outbox → events end-to-end path.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serial_test::serial;
use uuid::Uuid;

use helpline::dal::DAL;
use helpline::error::{JobError, ProducerError};
use helpline::events::Event;
use helpline::jobs::{
    self, ClientMessageBlockedJob, ClientMessageSentJob, CloseChatJob,
    ManagerAssignedToProblemJob, MessageRefPayload, SendClientMessageJob, SendManagerMessageJob,
};
use helpline::models::{Chat, Message, Problem};
use helpline::outbox::{Job, Outbox, OutboxConfig};
use helpline::producer::{MessageProducer, OutboundMessage};
use helpline::{EventStream, ManagerPool, ManagerScheduler};

use crate::fixtures::get_or_init_fixture;

#[derive(Clone, Default)]
struct RecordingProducer {
    produced: Arc<Mutex<Vec<OutboundMessage>>>,
}

#[async_trait]
impl MessageProducer for RecordingProducer {
    async fn produce(&self, message: OutboundMessage) -> Result<(), ProducerError> {
        self.produced.lock().push(message);
        Ok(())
    }
}

struct Scenario {
    chat: Chat,
    problem: Problem,
    client_id: Uuid,
}

async fn scenario(dal: &DAL) -> Scenario {
    let client_id = Uuid::new_v4();
    let chat = dal.chats().create(client_id).await.unwrap();
    let problem = dal.problems().create(chat.id.into()).await.unwrap();
    Scenario {
        chat,
        problem,
        client_id,
    }
}

async fn client_message(dal: &DAL, s: &Scenario, body: &str) -> Message {
    dal.messages()
        .create_client_message(
            s.chat.id.into(),
            s.problem.id.into(),
            s.client_id,
            Uuid::new_v4(),
            body,
        )
        .await
        .unwrap()
}

fn reset_dal() -> DAL {
    let fixture = get_or_init_fixture();
    let mut guard = fixture.lock().unwrap_or_else(|e| e.into_inner());
    guard.reset();
    guard.dal()
}

#[tokio::test]
#[serial]
async fn send_client_message_produces_and_echoes_to_client() {
    let dal = reset_dal();
    let s = scenario(&dal).await;
    let message = client_message(&dal, &s, "hello, is anyone there?").await;

    let producer = RecordingProducer::default();
    let stream = EventStream::new();
    let mut client_sub = stream.subscribe(s.client_id).unwrap();

    let job = SendClientMessageJob::new(
        Arc::new(dal.messages()),
        Arc::new(dal.chats()),
        Arc::new(producer.clone()),
        stream.clone(),
    );
    let payload = MessageRefPayload::new(message.id.into()).to_json().unwrap();
    job.handle(&payload).await.unwrap();

    let produced = producer.produced.lock();
    assert_eq!(produced.len(), 1);
    assert_eq!(produced[0].id, Uuid::from(message.id));
    assert_eq!(produced[0].body, "hello, is anyone there?");

    match client_sub.try_recv().expect("client must receive an event") {
        Event::NewMessage(e) => {
            assert_eq!(e.message_id, Uuid::from(message.id));
            assert_eq!(e.request_id, Uuid::from(message.initial_request_id));
            assert_eq!(e.author_id, Some(s.client_id));
            assert!(!e.is_service);
        }
        other => panic!("expected NewMessage, got {other:?}"),
    }
}

#[tokio::test]
#[serial]
async fn client_message_sent_notifies_client_and_assigned_manager() {
    let dal = reset_dal();
    let s = scenario(&dal).await;
    let message = client_message(&dal, &s, "any update?").await;

    let manager_id = Uuid::new_v4();
    dal.problems()
        .assign_manager(s.problem.id.into(), manager_id, "noop", "{}")
        .await
        .unwrap();

    let stream = EventStream::new();
    let mut client_sub = stream.subscribe(s.client_id).unwrap();
    let mut manager_sub = stream.subscribe(manager_id).unwrap();

    let job = ClientMessageSentJob::new(
        Arc::new(dal.messages()),
        Arc::new(dal.chats()),
        Arc::new(dal.problems()),
        stream.clone(),
    );
    let payload = MessageRefPayload::new(message.id.into()).to_json().unwrap();
    job.handle(&payload).await.unwrap();

    assert!(matches!(
        client_sub.try_recv().unwrap(),
        Event::MessageSent(e) if e.message_id == Uuid::from(message.id)
    ));
    assert!(matches!(
        manager_sub.try_recv().unwrap(),
        Event::NewMessage(e) if e.message_id == Uuid::from(message.id)
    ));
}

#[tokio::test]
#[serial]
async fn client_message_sent_without_manager_only_notifies_client() {
    let dal = reset_dal();
    let s = scenario(&dal).await;
    let message = client_message(&dal, &s, "hello?").await;

    let stream = EventStream::new();
    let mut client_sub = stream.subscribe(s.client_id).unwrap();

    let job = ClientMessageSentJob::new(
        Arc::new(dal.messages()),
        Arc::new(dal.chats()),
        Arc::new(dal.problems()),
        stream.clone(),
    );
    let payload = MessageRefPayload::new(message.id.into()).to_json().unwrap();
    job.handle(&payload).await.unwrap();

    assert!(matches!(
        client_sub.try_recv().unwrap(),
        Event::MessageSent(_)
    ));
    assert!(client_sub.try_recv().is_none());
}

#[tokio::test]
#[serial]
async fn client_message_blocked_notifies_author() {
    let dal = reset_dal();
    let s = scenario(&dal).await;
    let message = client_message(&dal, &s, "buy cheap pills").await;

    let stream = EventStream::new();
    let mut client_sub = stream.subscribe(s.client_id).unwrap();

    let job = ClientMessageBlockedJob::new(
        Arc::new(dal.messages()),
        Arc::new(dal.chats()),
        stream.clone(),
    );
    let payload = MessageRefPayload::new(message.id.into()).to_json().unwrap();
    job.handle(&payload).await.unwrap();

    assert!(matches!(
        client_sub.try_recv().unwrap(),
        Event::MessageBlocked(e) if e.message_id == Uuid::from(message.id)
    ));
}

#[tokio::test]
#[serial]
async fn manager_assigned_creates_service_message_and_fans_out() {
    let dal = reset_dal();
    let s = scenario(&dal).await;
    let manager_id = Uuid::new_v4();

    let stream = EventStream::new();
    let mut client_sub = stream.subscribe(s.client_id).unwrap();
    let mut manager_sub = stream.subscribe(manager_id).unwrap();

    let job = ManagerAssignedToProblemJob::new(
        Arc::new(dal.messages()),
        Arc::new(dal.chats()),
        Arc::new(dal.problems()),
        stream.clone(),
    );
    let payload = serde_json::to_string(&jobs::manager_assigned_to_problem::Payload {
        manager_id,
        problem_id: s.problem.id.into(),
        can_take_more_problems: true,
    })
    .unwrap();
    job.handle(&payload).await.unwrap();

    match manager_sub.try_recv().unwrap() {
        Event::NewChat(e) => {
            assert_eq!(e.chat_id, Uuid::from(s.chat.id));
            assert_eq!(e.client_id, s.client_id);
            assert!(e.can_take_more_problems);
        }
        other => panic!("expected NewChat, got {other:?}"),
    }

    match client_sub.try_recv().unwrap() {
        Event::NewMessage(e) => {
            assert!(e.is_service);
            assert_eq!(e.author_id, None);
            assert!(e.body.contains("support manager"));
        }
        other => panic!("expected NewMessage, got {other:?}"),
    }
}

#[tokio::test]
#[serial]
async fn send_manager_message_reaches_client_and_confirms_to_manager() {
    let dal = reset_dal();
    let s = scenario(&dal).await;
    let manager_id = Uuid::new_v4();
    let message = dal
        .messages()
        .create_client_message(
            s.chat.id.into(),
            s.problem.id.into(),
            manager_id,
            Uuid::new_v4(),
            "have you tried turning it off and on again?",
        )
        .await
        .unwrap();

    let producer = RecordingProducer::default();
    let stream = EventStream::new();
    let mut client_sub = stream.subscribe(s.client_id).unwrap();
    let mut manager_sub = stream.subscribe(manager_id).unwrap();

    let job = SendManagerMessageJob::new(
        Arc::new(dal.messages()),
        Arc::new(dal.chats()),
        Arc::new(producer.clone()),
        stream.clone(),
    );
    let payload = MessageRefPayload::new(message.id.into()).to_json().unwrap();
    job.handle(&payload).await.unwrap();

    assert_eq!(producer.produced.lock().len(), 1);
    assert!(matches!(
        client_sub.try_recv().unwrap(),
        Event::NewManagerMessage(e) if e.author_id == manager_id
    ));
    assert!(matches!(
        manager_sub.try_recv().unwrap(),
        Event::MessageSent(e) if e.message_id == Uuid::from(message.id)
    ));
}

#[tokio::test]
#[serial]
async fn send_manager_message_rejects_authorless_message() {
    let dal = reset_dal();
    let s = scenario(&dal).await;
    let service = dal
        .messages()
        .create_service_message(s.chat.id.into(), s.problem.id.into(), "system note")
        .await
        .unwrap();

    let job = SendManagerMessageJob::new(
        Arc::new(dal.messages()),
        Arc::new(dal.chats()),
        Arc::new(RecordingProducer::default()),
        EventStream::new(),
    );
    let payload = MessageRefPayload::new(service.id.into()).to_json().unwrap();

    assert!(matches!(
        job.handle(&payload).await,
        Err(JobError::InvalidPayload(_))
    ));
}

#[tokio::test]
#[serial]
async fn close_chat_notifies_both_sides_with_capacity() {
    let dal = reset_dal();
    let s = scenario(&dal).await;
    let manager_id = Uuid::new_v4();
    dal.problems()
        .assign_manager(s.problem.id.into(), manager_id, "noop", "{}")
        .await
        .unwrap();
    dal.problems().resolve(s.problem.id.into()).await.unwrap();

    let stream = EventStream::new();
    let mut client_sub = stream.subscribe(s.client_id).unwrap();
    let mut manager_sub = stream.subscribe(manager_id).unwrap();

    let job = CloseChatJob::new(
        Arc::new(dal.chats()),
        Arc::new(dal.problems()),
        Arc::new(dal.problems()),
        stream.clone(),
    );
    let request_id = Uuid::new_v4();
    let payload = serde_json::to_string(&jobs::close_chat::Payload {
        manager_id,
        problem_id: s.problem.id.into(),
        request_id,
    })
    .unwrap();
    job.handle(&payload).await.unwrap();

    assert!(matches!(
        client_sub.try_recv().unwrap(),
        Event::ChatClosed(e) if e.chat_id == Uuid::from(s.chat.id) && e.request_id == request_id
    ));
    match manager_sub.try_recv().unwrap() {
        Event::ChatClosed(e) => {
            assert!(e.can_take_more_problems, "resolving freed the slot");
        }
        other => panic!("expected ChatClosed, got {other:?}"),
    }
}

/// The full path: the scheduler assigns a manager and enqueues the job in
/// one transaction; the outbox executes it; both parties get their events.
#[tokio::test]
#[serial]
async fn scheduler_assignment_flows_through_outbox_to_events() {
    let dal = reset_dal();
    let s = scenario(&dal).await;
    client_message(&dal, &s, "I need a human").await;

    let stream = EventStream::new();
    let manager_id = Uuid::new_v4();
    let mut client_sub = stream.subscribe(s.client_id).unwrap();
    let mut manager_sub = stream.subscribe(manager_id).unwrap();

    let pool = Arc::new(ManagerPool::new());
    pool.put(manager_id);
    let scheduler = ManagerScheduler::new(
        pool,
        Arc::new(dal.problems()),
        Arc::new(dal.problems()),
        Duration::from_millis(50),
    );
    scheduler.tick().await.unwrap();

    let config = OutboxConfig::builder()
        .workers(2)
        .idle_time(Duration::from_millis(20))
        .reserve_for(Duration::from_millis(200))
        .build()
        .unwrap();
    let outbox = Arc::new(Outbox::new(Arc::new(dal.jobs()), config));
    outbox.must_register_job(Arc::new(ManagerAssignedToProblemJob::new(
        Arc::new(dal.messages()),
        Arc::new(dal.chats()),
        Arc::new(dal.problems()),
        stream.clone(),
    )));

    let runner = outbox.clone();
    let run = tokio::spawn(async move { runner.run().await });

    let new_chat = tokio::time::timeout(Duration::from_secs(5), manager_sub.recv())
        .await
        .expect("manager event did not arrive")
        .unwrap();
    assert!(matches!(new_chat, Event::NewChat(ref e) if e.client_id == s.client_id));

    let service = tokio::time::timeout(Duration::from_secs(5), client_sub.recv())
        .await
        .expect("client event did not arrive")
        .unwrap();
    assert!(matches!(service, Event::NewMessage(ref e) if e.is_service));

    outbox.shutdown();
    run.await.unwrap().unwrap();

    assert_eq!(dal.jobs().count().await.unwrap(), 0, "job was completed");
}
