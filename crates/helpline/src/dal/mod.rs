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

//! Data Access Layer.
//!
//! Each sub-DAL owns the queries for one table family and implements the
//! narrow port(s) the core components consume. Operations that must be
//! atomic (reservation, dead-lettering, assignment-plus-enqueue) run inside
//! `immediate_transaction` blocks, which acquire SQLite's write lock up
//! front and serialize concurrent writers.

mod chats;
mod jobs;
mod messages;
mod problems;

pub use chats::ChatsDAL;
pub use jobs::JobsDAL;
pub use messages::MessagesDAL;
pub use problems::ProblemsDAL;

use crate::database::Database;

/// Entry point to the data access layer.
#[derive(Clone, Debug)]
pub struct DAL {
    database: Database,
}

impl DAL {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    pub fn jobs(&self) -> JobsDAL {
        JobsDAL::new(self.database.clone())
    }

    pub fn problems(&self) -> ProblemsDAL {
        ProblemsDAL::new(self.database.clone())
    }

    pub fn messages(&self) -> MessagesDAL {
        MessagesDAL::new(self.database.clone())
    }

    pub fn chats(&self) -> ChatsDAL {
        ChatsDAL::new(self.database.clone())
    }
}
