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

//! Concurrency tests for job reservation.
//!
//! These verify the core reservation invariant: at most one worker holds a
//! live reservation on a job at a time, even when many workers race on the
//! same backing store.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serial_test::serial;
use tokio::sync::Barrier;
use uuid::Uuid;

use helpline::RepositoryError;

use crate::fixtures::get_or_init_fixture;

#[tokio::test]
#[serial]
async fn concurrent_reservation_produces_no_duplicates() {
    let fixture = get_or_init_fixture();
    let database = {
        let mut guard = fixture.lock().unwrap_or_else(|e| e.into_inner());
        guard.reset();
        guard.database()
    };

    let jobs = helpline::dal::JobsDAL::new(database.clone());

    const NUM_JOBS: usize = 20;
    let now = Utc::now().naive_utc();
    for i in 0..NUM_JOBS {
        jobs.create("concurrency-probe", &format!("{{\"seq\":{i}}}"), now)
            .await
            .expect("failed to create job");
    }

    const NUM_WORKERS: usize = 10;
    let barrier = Arc::new(Barrier::new(NUM_WORKERS));
    let mut handles = Vec::new();

    for _ in 0..NUM_WORKERS {
        let database = database.clone();
        let barrier = barrier.clone();

        handles.push(tokio::spawn(async move {
            let jobs = helpline::dal::JobsDAL::new(database);
            barrier.wait().await;

            let mut reserved = Vec::new();
            for _ in 0..8 {
                // A long window so nothing lapses back mid-test.
                let until = Utc::now().naive_utc() + chrono::Duration::seconds(60);
                match jobs.find_and_reserve(until).await {
                    Ok(job) => reserved.push(job.id),
                    Err(RepositoryError::NoJobs) => {}
                    Err(e) => {
                        // Lock contention is expected under this much racing.
                        tracing::debug!(error = %e, "reservation attempt failed");
                    }
                }
            }
            reserved
        }));
    }

    let mut all_reserved = Vec::new();
    for handle in handles {
        all_reserved.extend(handle.await.expect("worker task panicked"));
    }

    let unique: HashSet<_> = all_reserved.iter().collect();
    assert_eq!(
        all_reserved.len(),
        unique.len(),
        "some jobs were reserved by more than one worker"
    );
    assert!(
        unique.len() >= NUM_JOBS - 2,
        "expected to reserve most jobs, got {} of {}",
        unique.len(),
        NUM_JOBS
    );
}

#[tokio::test]
#[serial]
async fn reserved_job_is_not_eligible_again() {
    let fixture = get_or_init_fixture();
    let database = {
        let mut guard = fixture.lock().unwrap_or_else(|e| e.into_inner());
        guard.reset();
        guard.database()
    };
    let jobs = helpline::dal::JobsDAL::new(database);

    jobs.create("solo", "{}", Utc::now().naive_utc())
        .await
        .unwrap();

    let until = Utc::now().naive_utc() + chrono::Duration::seconds(60);
    let first = jobs.find_and_reserve(until).await.unwrap();
    assert_eq!(first.attempts, 1);

    assert!(matches!(
        jobs.find_and_reserve(until).await,
        Err(RepositoryError::NoJobs)
    ));
}

#[tokio::test]
#[serial]
async fn job_becomes_eligible_after_reservation_lapses() {
    let fixture = get_or_init_fixture();
    let database = {
        let mut guard = fixture.lock().unwrap_or_else(|e| e.into_inner());
        guard.reset();
        guard.database()
    };
    let jobs = helpline::dal::JobsDAL::new(database);

    let created = jobs
        .create("short-lease", "{}", Utc::now().naive_utc())
        .await
        .unwrap();

    let until = Utc::now().naive_utc() + chrono::Duration::milliseconds(50);
    let first = jobs.find_and_reserve(until).await.unwrap();
    assert_eq!(first.id, created.id);

    tokio::time::sleep(Duration::from_millis(120)).await;

    let second = jobs
        .find_and_reserve(Utc::now().naive_utc() + chrono::Duration::seconds(60))
        .await
        .unwrap();
    assert_eq!(second.id, created.id);
    assert_eq!(second.attempts, 2, "each reservation counts one attempt");
}

#[tokio::test]
#[serial]
async fn future_available_at_is_respected() {
    let fixture = get_or_init_fixture();
    let database = {
        let mut guard = fixture.lock().unwrap_or_else(|e| e.into_inner());
        guard.reset();
        guard.database()
    };
    let jobs = helpline::dal::JobsDAL::new(database);

    jobs.create(
        "deferred",
        "{}",
        Utc::now().naive_utc() + chrono::Duration::seconds(60),
    )
    .await
    .unwrap();

    assert!(matches!(
        jobs.find_and_reserve(Utc::now().naive_utc() + chrono::Duration::seconds(60))
            .await,
        Err(RepositoryError::NoJobs)
    ));
}

#[tokio::test]
#[serial]
async fn fail_moves_job_to_dead_letters_atomically() {
    let fixture = get_or_init_fixture();
    let database = {
        let mut guard = fixture.lock().unwrap_or_else(|e| e.into_inner());
        guard.reset();
        guard.database()
    };
    let jobs = helpline::dal::JobsDAL::new(database);

    let created = jobs
        .create("doomed", "{\"id\":\"x\"}", Utc::now().naive_utc())
        .await
        .unwrap();

    jobs.fail(created.id.into(), "downstream exploded")
        .await
        .unwrap();

    assert_eq!(jobs.count().await.unwrap(), 0);

    let failed = jobs.list_failed(10).await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].name, "doomed");
    assert_eq!(failed[0].payload, "{\"id\":\"x\"}");
    assert_eq!(failed[0].reason, "downstream exploded");
}

#[tokio::test]
#[serial]
async fn failing_missing_job_errors() {
    let fixture = get_or_init_fixture();
    let database = {
        let mut guard = fixture.lock().unwrap_or_else(|e| e.into_inner());
        guard.reset();
        guard.database()
    };
    let jobs = helpline::dal::JobsDAL::new(database);

    assert!(jobs.fail(Uuid::new_v4(), "gone").await.is_err());
}
