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

//! The in-process event stream.
//!
//! A single read/write lock protects the subscriber map; `publish` takes the
//! write lock to iterate and send, which is acceptable because sends are
//! non-blocking (`try_send`). A subscriber whose reader lags behind its
//! channel capacity loses events rather than stalling the publisher;
//! delivery degrades to "attempted", it never fails or blocks the caller.
//!
//! Subscription teardown is RAII: dropping a [`Subscription`] removes its
//! channel from the map, which is how a closing websocket connection
//! unsubscribes. Subscriptions are detached from the stream's lifetime and
//! can be moved into per-connection tasks.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::EventStreamError;

use super::Event;

/// Buffered events per subscriber channel before sends start dropping.
const SUBSCRIBER_BUFFER: usize = 64;

struct Slot {
    id: Uuid,
    tx: mpsc::Sender<Event>,
}

#[derive(Default)]
struct StreamState {
    subscribers: HashMap<Uuid, Vec<Slot>>,
    closed: bool,
}

/// In-memory pub/sub keyed by recipient identity.
///
/// Multiple concurrent subscriptions per recipient are allowed (several open
/// tabs); each receives its own copy of every published event, in publish
/// order. Recipients with no subscribers silently miss events; delivery is
/// online-only by design. Cloning is cheap and clones share the subscriber
/// map.
#[derive(Clone, Default)]
pub struct EventStream {
    state: Arc<RwLock<StreamState>>,
}

impl EventStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new subscriber channel for `recipient_id`.
    ///
    /// The subscription deregisters itself when dropped. Fails with
    /// [`EventStreamError::Closed`] after [`EventStream::close`].
    pub fn subscribe(&self, recipient_id: Uuid) -> Result<Subscription, EventStreamError> {
        let mut state = self.state.write();
        if state.closed {
            return Err(EventStreamError::Closed);
        }

        let (tx, rx) = mpsc::channel(SUBSCRIBER_BUFFER);
        let slot_id = Uuid::new_v4();
        state
            .subscribers
            .entry(recipient_id)
            .or_default()
            .push(Slot { id: slot_id, tx });

        debug!(recipient = %recipient_id, "subscribed to event stream");

        Ok(Subscription {
            state: Arc::downgrade(&self.state),
            recipient_id,
            slot_id,
            rx,
        })
    }

    /// Validates `event` and delivers a copy to every live subscriber of
    /// `recipient_id`.
    ///
    /// Zero subscribers is not an error: the event is dropped. A full or
    /// torn-down subscriber channel is skipped with a warning instead of
    /// blocking or failing the caller.
    pub fn publish(&self, recipient_id: Uuid, event: Event) -> Result<(), EventStreamError> {
        event.validate()?;

        let state = self.state.write();
        if state.closed {
            return Err(EventStreamError::Closed);
        }

        let Some(slots) = state.subscribers.get(&recipient_id) else {
            debug!(recipient = %recipient_id, "no subscribers, dropping event");
            return Ok(());
        };

        for slot in slots {
            if let Err(e) = slot.tx.try_send(event.clone()) {
                warn!(
                    recipient = %recipient_id,
                    subscriber = %slot.id,
                    error = %e,
                    "dropping event for unreachable subscriber"
                );
            }
        }

        Ok(())
    }

    /// Number of live subscriber channels for `recipient_id`.
    pub fn subscriber_count(&self, recipient_id: Uuid) -> usize {
        self.state
            .read()
            .subscribers
            .get(&recipient_id)
            .map_or(0, Vec::len)
    }

    /// Closes the stream: rejects further subscriptions and publications and
    /// drops every subscriber sender, so readers drain what was already
    /// delivered and then observe end-of-stream.
    pub fn close(&self) {
        let mut state = self.state.write();
        state.closed = true;
        state.subscribers.clear();
    }
}

impl std::fmt::Debug for EventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("EventStream")
            .field("recipients", &state.subscribers.len())
            .field("closed", &state.closed)
            .finish()
    }
}

/// One subscriber's receiving end. Deregisters itself on drop.
pub struct Subscription {
    state: Weak<RwLock<StreamState>>,
    recipient_id: Uuid,
    slot_id: Uuid,
    rx: mpsc::Receiver<Event>,
}

impl Subscription {
    /// Receives the next event; `None` once the stream is closed and the
    /// channel is drained.
    pub async fn recv(&mut self) -> Option<Event> {
        self.rx.recv().await
    }

    /// Non-blocking receive.
    pub fn try_recv(&mut self) -> Option<Event> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };

        let mut state = state.write();
        if let Some(slots) = state.subscribers.get_mut(&self.recipient_id) {
            slots.retain(|slot| slot.id != self.slot_id);
            if slots.is_empty() {
                state.subscribers.remove(&self.recipient_id);
            }
        }
    }
}
