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

//! In-process publish/subscribe event stream.
//!
//! Delivers domain events to live per-user subscribers (typically one per
//! open websocket connection). Delivery is online-only: events published to
//! a recipient with no subscribers are dropped, never queued. Events are
//! transient: constructed, validated, published, discarded.

mod event;
mod stream;

pub use event::{
    ChatClosedEvent, Event, MessageBlockedEvent, MessageSentEvent, NewChatEvent,
    NewManagerMessageEvent, NewMessageEvent,
};
pub use stream::{EventStream, Subscription};
