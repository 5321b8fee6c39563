//! High concurrency stress tests for join/leave/call
//!
//! These tests validate that waiting positions stay dense and that no
//! participant ends up with two active entries when many tasks mutate the
//! line at once.

use court_queue::{CourtQueueError, CourtService};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::fixtures::{
    assert_dense_positions, file_sqlite_service, match_request, memory_service, organizer, player,
    result_request, sqlite_service,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_100_concurrent_joins() {
    let (service, store) = memory_service();
    let service = Arc::new(service);
    let start_time = Instant::now();

    let tasks: Vec<_> = (1..=100)
        .map(|id| {
            let service = service.clone();
            tokio::spawn(async move { service.join(&player(id)).await })
        })
        .collect();

    let mut positions = HashSet::new();
    for outcome in join_all(tasks).await {
        let entry = outcome.unwrap().unwrap();
        assert!(positions.insert(entry.position), "position {} handed out twice", entry.position);
    }

    let total_time = start_time.elapsed();
    println!("100 concurrent joins completed in {:?}", total_time);

    assert_eq!(positions.len(), 100);
    assert_eq!(assert_dense_positions(&store).await, 100);
    assert!(total_time < Duration::from_secs(5));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_duplicate_concurrent_joins_admit_one() {
    let (service, store) = memory_service();
    let service = Arc::new(service);

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.join(&player(7)).await })
        })
        .collect();

    let outcomes: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|outcome| outcome.unwrap())
        .collect();
    let admitted = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(admitted, 1);
    assert!(outcomes.iter().filter_map(|o| o.as_ref().err()).all(|e| {
        *e == CourtQueueError::AlreadyQueued { participant_id: 7 }
    }));
    assert_eq!(assert_dense_positions(&store).await, 1);
}

async fn churn(service: Arc<CourtService>, participants: i64, rounds: usize) -> usize {
    let players = (1..=participants).map(|id| {
        let service = service.clone();
        tokio::spawn(async move {
            let principal = player(id);
            for _ in 0..rounds {
                let _ = service.join(&principal).await;
                tokio::task::yield_now().await;
                let _ = service.leave(&principal).await;
            }
            let _ = service.join(&principal).await;
        })
    });

    let callers = (0..3).map(|_| {
        let service = service.clone();
        tokio::spawn(async move {
            let mut called = 0;
            for _ in 0..rounds {
                match service.call_next(&organizer(), Some(2)).await {
                    Ok(entries) => called += entries.len(),
                    Err(CourtQueueError::QueueEmpty) => {}
                    Err(e) => panic!("unexpected call failure: {}", e),
                }
                tokio::task::yield_now().await;
            }
            called
        })
    });

    let callers: Vec<_> = callers.collect();
    for outcome in join_all(players.collect::<Vec<_>>()).await {
        outcome.unwrap();
    }
    join_all(callers)
        .await
        .into_iter()
        .map(|outcome| outcome.unwrap())
        .sum()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mixed_churn_keeps_positions_dense() {
    let (service, store) = memory_service();
    let service = Arc::new(service);

    let called = churn(service.clone(), 50, 5).await;
    let waiting = assert_dense_positions(&store).await;

    // everyone ends either waiting or called, never both
    assert_eq!(waiting + called, 50);
    let info = service.status(None).await.unwrap();
    assert_eq!(info.total_in_queue, waiting);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mixed_churn_on_sqlite() {
    let (service, store) = sqlite_service().await;
    let service = Arc::new(service);

    let called = churn(service, 20, 3).await;
    let waiting = assert_dense_positions(&store).await;
    assert_eq!(waiting + called, 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_mixed_workload_on_file_database() {
    let (service, store, _dir) = file_sqlite_service().await;
    let service = Arc::new(service);

    // pending matches between participants who never queue
    let mut pending = Vec::new();
    for n in 0..6 {
        let created = service
            .create_match(&organizer(), &match_request("", &[500 + n * 2], &[501 + n * 2]))
            .await
            .unwrap();
        pending.push(created.id);
    }

    let mut tasks = Vec::new();
    for id in 1..=30 {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            let principal = player(id);
            let mut outcomes = Vec::new();
            for _ in 0..3 {
                outcomes.push(service.join(&principal).await.map(|_| ()));
                tokio::task::yield_now().await;
                outcomes.push(service.leave(&principal).await);
            }
            outcomes.push(service.join(&principal).await.map(|_| ()));
            outcomes
        }));
    }
    for id in 1_100..1_130 {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            let principal = player(id);
            vec![
                service.ensure_stats(&principal).await.map(|_| ()),
                service.stats(&principal, None).await.map(|_| ()),
            ]
        }));
    }
    for _ in 0..2 {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            let mut outcomes = Vec::new();
            for _ in 0..4 {
                outcomes.push(service.call_next(&organizer(), Some(2)).await.map(|_| ()));
                tokio::task::yield_now().await;
            }
            outcomes
        }));
    }
    for match_id in pending {
        let service = service.clone();
        tasks.push(tokio::spawn(async move {
            vec![service
                .record_result(&organizer(), &result_request(match_id, &[(21, 17), (21, 19)]))
                .await
                .map(|_| ())]
        }));
    }

    let failures: Vec<CourtQueueError> = join_all(tasks)
        .await
        .into_iter()
        .flat_map(|outcome| outcome.unwrap())
        .filter_map(|outcome| outcome.err())
        .filter(|e| !e.is_domain_error())
        .collect();
    assert!(failures.is_empty(), "store failures: {:?}", failures);

    assert_dense_positions(&store).await;
    assert!(service.active_matches(&organizer()).await.unwrap().is_empty());
    let winner = service.stats(&player(500), None).await.unwrap();
    assert_eq!((winner.total_matches, winner.wins), (1, 1));
    let fresh = service.stats(&player(1_100), None).await.unwrap();
    assert_eq!(fresh.total_matches, 0);
}

#[tokio::test]
async fn test_rapid_fire_join_leave() {
    let (service, store) = memory_service();
    let principal = player(1);

    for _ in 0..200 {
        service.join(&principal).await.unwrap();
        service.leave(&principal).await.unwrap();
    }

    assert_eq!(assert_dense_positions(&store).await, 0);
    assert_eq!(service.metrics().queue().joins_total.get(), 200);
}
