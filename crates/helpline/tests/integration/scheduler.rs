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

//! Manager scheduler tests: fairness, capacity payloads, failure handling.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serial_test::serial;
use uuid::Uuid;

use helpline::dal::DAL;
use helpline::error::RepositoryError;
use helpline::jobs::manager_assigned_to_problem;
use helpline::models::Problem;
use helpline::scheduler::{AssignmentRepository, ManagerLoadChecker, ManagerScheduler};
use helpline::{ManagerPool, StoredUuid};

use crate::fixtures::get_or_init_fixture;

/// Creates a chat with one open problem that already has a manager-visible
/// client message, making it eligible for scheduling.
async fn create_awaiting_manager_problem(dal: &DAL) -> (Uuid, Uuid) {
    let client_id = Uuid::new_v4();
    let chat = dal.chats().create(client_id).await.unwrap();
    let problem = dal.problems().create(chat.id.into()).await.unwrap();
    dal.messages()
        .create_client_message(
            chat.id.into(),
            problem.id.into(),
            client_id,
            Uuid::new_v4(),
            "my card was declined",
        )
        .await
        .unwrap();
    (chat.id.into(), problem.id.into())
}

fn scheduler_over(
    dal: &DAL,
    pool: Arc<ManagerPool>,
) -> ManagerScheduler {
    ManagerScheduler::new(
        pool,
        Arc::new(dal.problems()),
        Arc::new(dal.problems()),
        Duration::from_millis(50),
    )
}

#[tokio::test]
#[serial]
async fn oldest_problem_is_assigned_first() {
    let fixture = get_or_init_fixture();
    let dal = {
        let mut guard = fixture.lock().unwrap_or_else(|e| e.into_inner());
        guard.reset();
        guard.dal()
    };

    let (_, older_problem) = create_awaiting_manager_problem(&dal).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    let (_, newer_problem) = create_awaiting_manager_problem(&dal).await;

    let pool = Arc::new(ManagerPool::new());
    let manager = Uuid::new_v4();
    pool.put(manager);

    let scheduler = scheduler_over(&dal, pool.clone());
    scheduler.tick().await.unwrap();

    let older = dal.problems().get_by_id(older_problem).await.unwrap();
    let newer = dal.problems().get_by_id(newer_problem).await.unwrap();
    assert_eq!(older.manager_id, Some(StoredUuid(manager)));
    assert_eq!(newer.manager_id, None, "only one manager was available");
    assert_eq!(pool.size(), 0);
}

#[tokio::test]
#[serial]
async fn first_declared_manager_is_assigned_first() {
    let fixture = get_or_init_fixture();
    let dal = {
        let mut guard = fixture.lock().unwrap_or_else(|e| e.into_inner());
        guard.reset();
        guard.dal()
    };

    let (_, problem_id) = create_awaiting_manager_problem(&dal).await;

    let pool = Arc::new(ManagerPool::new());
    let m1 = Uuid::new_v4();
    let m2 = Uuid::new_v4();
    let m3 = Uuid::new_v4();
    pool.put(m1);
    pool.put(m2);
    pool.put(m3);

    let scheduler = scheduler_over(&dal, pool.clone());
    // Two passes: fairness must hold from the very first.
    scheduler.tick().await.unwrap();
    scheduler.tick().await.unwrap();

    let problem = dal.problems().get_by_id(problem_id).await.unwrap();
    assert_eq!(problem.manager_id, Some(StoredUuid(m1)));
    assert_eq!(pool.size(), 2);
    assert_eq!(pool.get().unwrap(), m2, "pool order survives the assignment");
}

#[tokio::test]
#[serial]
async fn assignment_enqueues_job_in_same_transaction() {
    let fixture = get_or_init_fixture();
    let dal = {
        let mut guard = fixture.lock().unwrap_or_else(|e| e.into_inner());
        guard.reset();
        guard.dal()
    };

    let (_, problem_id) = create_awaiting_manager_problem(&dal).await;

    let pool = Arc::new(ManagerPool::new());
    let manager = Uuid::new_v4();
    pool.put(manager);

    let scheduler = scheduler_over(&dal, pool);
    scheduler.tick().await.unwrap();

    assert_eq!(dal.jobs().count().await.unwrap(), 1);

    let until = Utc::now().naive_utc() + chrono::Duration::seconds(60);
    let job = dal.jobs().find_and_reserve(until).await.unwrap();
    assert_eq!(job.name, manager_assigned_to_problem::NAME);

    let payload = manager_assigned_to_problem::Payload::parse(&job.payload).unwrap();
    assert_eq!(payload.manager_id, manager);
    assert_eq!(payload.problem_id, problem_id);
    assert!(payload.can_take_more_problems, "fresh manager has capacity");
}

#[tokio::test]
#[serial]
async fn capacity_flag_reflects_manager_load() {
    let fixture = get_or_init_fixture();
    let dal = {
        let mut guard = fixture.lock().unwrap_or_else(|e| e.into_inner());
        guard.reset();
        guard.dal()
    };

    // The cap is lowered to 1: after this assignment the manager is full.
    let problems = dal.problems().with_max_active_problems(1);
    let (_, _) = create_awaiting_manager_problem(&dal).await;

    let pool = Arc::new(ManagerPool::new());
    let manager = Uuid::new_v4();
    pool.put(manager);

    let scheduler = ManagerScheduler::new(
        pool,
        Arc::new(problems.clone()),
        Arc::new(problems),
        Duration::from_millis(50),
    );
    scheduler.tick().await.unwrap();

    let until = Utc::now().naive_utc() + chrono::Duration::seconds(60);
    let job = dal.jobs().find_and_reserve(until).await.unwrap();
    let payload = manager_assigned_to_problem::Payload::parse(&job.payload).unwrap();
    // Capacity was checked before the write; one free slot remained then.
    assert!(payload.can_take_more_problems);

    assert!(!dal
        .problems()
        .with_max_active_problems(1)
        .can_manager_take_problem(manager)
        .await
        .unwrap());
}

#[tokio::test]
#[serial]
async fn empty_pool_skips_the_repository_entirely() {
    let fetches = Arc::new(Mutex::new(0usize));
    let repo = Arc::new(CountingRepo {
        fetches: fetches.clone(),
    });

    let scheduler = ManagerScheduler::new(
        Arc::new(ManagerPool::new()),
        repo.clone(),
        Arc::new(AlwaysHasCapacity),
        Duration::from_millis(10),
    );

    scheduler.tick().await.unwrap();
    assert_eq!(*fetches.lock(), 0);
}

#[tokio::test]
#[serial]
async fn failed_assignment_returns_manager_to_pool() {
    let repo = Arc::new(FailingAssignmentRepo);
    let pool = Arc::new(ManagerPool::new());
    let manager = Uuid::new_v4();
    pool.put(manager);

    let scheduler = ManagerScheduler::new(
        pool.clone(),
        repo,
        Arc::new(AlwaysHasCapacity),
        Duration::from_millis(10),
    );

    scheduler.tick().await.unwrap();

    assert_eq!(pool.size(), 1, "manager must not be stranded");
    assert!(pool.contains(manager));
}

#[tokio::test]
#[serial]
async fn run_loop_assigns_within_a_few_ticks() {
    let fixture = get_or_init_fixture();
    let dal = {
        let mut guard = fixture.lock().unwrap_or_else(|e| e.into_inner());
        guard.reset();
        guard.dal()
    };

    let (_, problem_id) = create_awaiting_manager_problem(&dal).await;

    let pool = Arc::new(ManagerPool::new());
    let manager = Uuid::new_v4();
    pool.put(manager);

    let scheduler = Arc::new(scheduler_over(&dal, pool));
    let runner = scheduler.clone();
    let run = tokio::spawn(async move { runner.run().await });

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let problem = dal.problems().get_by_id(problem_id).await.unwrap();
        if problem.manager_id == Some(StoredUuid(manager)) {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "assignment did not happen in time"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    scheduler.shutdown();
    run.await.unwrap().unwrap();
}

struct CountingRepo {
    fetches: Arc<Mutex<usize>>,
}

#[async_trait]
impl AssignmentRepository for CountingRepo {
    async fn get_problems_without_manager(
        &self,
        _limit: usize,
    ) -> Result<Vec<Problem>, RepositoryError> {
        *self.fetches.lock() += 1;
        Ok(Vec::new())
    }

    async fn assign_manager(
        &self,
        _problem_id: Uuid,
        _manager_id: Uuid,
        _job_name: &str,
        _job_payload: &str,
    ) -> Result<(), RepositoryError> {
        Ok(())
    }
}

struct FailingAssignmentRepo;

#[async_trait]
impl AssignmentRepository for FailingAssignmentRepo {
    async fn get_problems_without_manager(
        &self,
        _limit: usize,
    ) -> Result<Vec<Problem>, RepositoryError> {
        Ok(vec![Problem {
            id: StoredUuid::new_v4(),
            chat_id: StoredUuid::new_v4(),
            manager_id: None,
            resolved_at: None,
            created_at: Utc::now().naive_utc(),
        }])
    }

    async fn assign_manager(
        &self,
        problem_id: Uuid,
        _manager_id: Uuid,
        _job_name: &str,
        _job_payload: &str,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::NotFound {
            entity: "unassigned problem",
            id: problem_id,
        })
    }
}

struct AlwaysHasCapacity;

#[async_trait]
impl ManagerLoadChecker for AlwaysHasCapacity {
    async fn can_manager_take_problem(&self, _manager_id: Uuid) -> Result<bool, RepositoryError> {
        Ok(true)
    }
}
