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

//! Row models for the tables the core touches.

pub mod chat;
pub mod job;
pub mod message;
pub mod problem;

pub use chat::Chat;
pub use job::{FailedJob, Job, NewFailedJob, NewJob};
pub use message::{Message, NewMessage};
pub use problem::Problem;
