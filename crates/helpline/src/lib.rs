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

//! # Helpline
//!
//! Asynchronous orchestration core for a customer-support chat backend.
//!
//! The crate provides the three tightly coupled pieces that carry the
//! service's concurrency and delivery semantics:
//!
//! - **Outbox engine** ([`outbox`]): a durable, at-least-once job queue.
//!   Producers persist an intent to act alongside their state change; a
//!   dispatcher/worker pool executes the registered handler later, retrying
//!   via reservation expiry and dead-lettering jobs that exhaust their
//!   attempt budget.
//! - **Event stream** ([`events`]): in-process pub/sub keyed by recipient,
//!   fanning domain events out to live per-user subscribers (websocket
//!   connections). Online-only, no persistence.
//! - **Manager pool & scheduler** ([`pool`], [`scheduler`]): a FIFO set of
//!   idle support managers and a periodic loop pairing them with the
//!   oldest waiting problems, writing each assignment and its follow-up
//!   outbox job in one transaction.
//!
//! The concrete jobs connecting these pieces live in [`jobs`]; persistence
//! is SQLite via Diesel behind narrow repository ports ([`dal`]).
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use helpline::{Database, DAL, EventStream, ManagerPool, ManagerScheduler, Outbox, OutboxConfig};
//!
//! let _log = helpline::init_logging(None);
//!
//! let database = Database::new("helpline.db", 10);
//! let dal = DAL::new(database.clone());
//! let event_stream = EventStream::new();
//!
//! let outbox = Arc::new(Outbox::new(Arc::new(dal.jobs()), OutboxConfig::default()));
//! outbox.must_register_job(Arc::new(helpline::jobs::SendClientMessageJob::new(
//!     Arc::new(dal.messages()),
//!     Arc::new(dal.chats()),
//!     producer,
//!     event_stream.clone(),
//! )));
//!
//! let pool = Arc::new(ManagerPool::new());
//! let scheduler = ManagerScheduler::new(
//!     pool.clone(),
//!     Arc::new(dal.problems()),
//!     Arc::new(dal.problems()),
//!     std::time::Duration::from_secs(2),
//! );
//!
//! tokio::try_join!(outbox.run(), scheduler.run())?;
//! ```

pub mod dal;
pub mod database;
pub mod error;
pub mod events;
pub mod jobs;
pub mod logging;
pub mod models;
pub mod outbox;
pub mod pool;
pub mod producer;
pub mod scheduler;

pub use dal::DAL;
pub use database::{Database, StoredUuid};
pub use error::{
    EventStreamError, JobError, OutboxError, PoolError, ProducerError, RepositoryError,
    SchedulerError,
};
pub use events::{Event, EventStream, Subscription};
pub use logging::{init_logging, LogHandle};
pub use outbox::{Job, JobRegistry, JobsRepository, Outbox, OutboxConfig};
pub use pool::ManagerPool;
pub use producer::{EncryptingProducer, MessageProducer, OutboundMessage};
pub use scheduler::{AssignmentRepository, ManagerLoadChecker, ManagerScheduler};
