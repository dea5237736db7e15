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

//! Diesel schema for the tables the orchestration core touches.

diesel::table! {
    jobs (id) {
        id -> Text,
        name -> Text,
        payload -> Text,
        attempts -> Integer,
        available_at -> Timestamp,
        reserved_until -> Nullable<Timestamp>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    failed_jobs (id) {
        id -> Text,
        name -> Text,
        payload -> Text,
        reason -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    chats (id) {
        id -> Text,
        client_id -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    problems (id) {
        id -> Text,
        chat_id -> Text,
        manager_id -> Nullable<Text>,
        resolved_at -> Nullable<Timestamp>,
        created_at -> Timestamp,
    }
}

diesel::table! {
    messages (id) {
        id -> Text,
        chat_id -> Text,
        author_id -> Nullable<Text>,
        problem_id -> Nullable<Text>,
        initial_request_id -> Text,
        body -> Text,
        is_visible_for_client -> Bool,
        is_visible_for_manager -> Bool,
        is_service -> Bool,
        created_at -> Timestamp,
    }
}

diesel::joinable!(problems -> chats (chat_id));
diesel::joinable!(messages -> chats (chat_id));
diesel::joinable!(messages -> problems (problem_id));

diesel::allow_tables_to_appear_in_same_query!(jobs, failed_jobs, chats, problems, messages);
