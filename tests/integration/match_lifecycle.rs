//! Match lifecycle tests: queue hand-off, result recording and listings

use court_queue::{CourtQueueError, MatchResult, QueueStatus};
use std::time::Duration;

use crate::fixtures::{
    assert_dense_positions, match_request, memory_service, organizer, player, result_request,
    sqlite_service,
};

#[tokio::test]
async fn test_called_players_move_to_playing_and_are_released() {
    let (service, store) = memory_service();
    for id in 1..=6 {
        service.join(&player(id)).await.unwrap();
    }

    let called = service.call_next(&organizer(), None).await.unwrap();
    assert_eq!(called.len(), 4);

    // 5 is still waiting but joins the match directly
    let created = service
        .create_match(&organizer(), &match_request("", &[1, 2], &[3, 5]))
        .await
        .unwrap();
    assert_eq!(created.court, "Court 1");

    let info = service.status(Some(&player(6))).await.unwrap();
    assert_eq!(info.total_in_queue, 1);
    assert_eq!(info.your_position, Some(1));
    assert_eq!(info.currently_playing.len(), 4);
    assert!(info
        .currently_playing
        .iter()
        .all(|entry| entry.status == QueueStatus::Playing && entry.called_at.is_some()));
    assert_dense_positions(&store).await;

    // 4 was called but not put in a match; they still hold an active entry
    assert!(matches!(
        service.join(&player(4)).await.unwrap_err(),
        CourtQueueError::AlreadyQueued { .. }
    ));

    service
        .record_result(&organizer(), &result_request(created.id, &[(21, 12), (21, 17)]))
        .await
        .unwrap();

    let info = service.status(None).await.unwrap();
    assert!(info.currently_playing.is_empty());
    for id in [1, 2, 3, 5] {
        service.join(&player(id)).await.unwrap();
    }
    assert_eq!(assert_dense_positions(&store).await, 5);
}

#[tokio::test]
async fn test_doubles_result_updates_all_four_players() {
    let (service, _store) = memory_service();
    let created = service
        .create_match(&organizer(), &match_request("Court 3", &[10, 11], &[12, 13]))
        .await
        .unwrap();
    service
        .record_result(&organizer(), &result_request(created.id, &[(15, 21), (21, 23)]))
        .await
        .unwrap();

    for id in [10, 11] {
        let stats = service.stats(&player(id), None).await.unwrap();
        assert_eq!((stats.wins, stats.losses, stats.current_streak), (0, 1, -1));
    }
    for id in [12, 13] {
        let stats = service.stats(&player(id), None).await.unwrap();
        assert_eq!((stats.wins, stats.losses, stats.current_streak), (1, 0, 1));
    }
}

#[tokio::test]
async fn test_blank_courts_rotate_until_all_busy() {
    let (service, _store) = memory_service();
    let mut courts = Vec::new();
    for n in 0..5 {
        let created = service
            .create_match(
                &organizer(),
                &match_request("", &[n * 2 + 1], &[n * 2 + 2]),
            )
            .await
            .unwrap();
        courts.push(created.court);
    }
    assert_eq!(
        courts,
        vec!["Court 1", "Court 2", "Court 3", "Court 4", "Court 1"]
    );
}

#[tokio::test]
async fn test_invalid_requests() {
    let (service, _store) = memory_service();

    for (team1, team2) in [
        (vec![], vec![1]),
        (vec![1, 2, 3], vec![4]),
        (vec![1, 2], vec![2, 3]),
        (vec![1, 1], vec![2]),
    ] {
        let err = service
            .create_match(&organizer(), &match_request("Court 1", &team1, &team2))
            .await
            .unwrap_err();
        assert!(matches!(err, CourtQueueError::InvalidTeam { .. }));
    }

    let created = service
        .create_match(&organizer(), &match_request("Court 1", &[1], &[2]))
        .await
        .unwrap();
    let err = service
        .record_result(&organizer(), &result_request(created.id, &[(21, -3)]))
        .await
        .unwrap_err();
    assert!(matches!(err, CourtQueueError::InvalidScore { game: 1, .. }));

    // the refused result left the match pending
    let active = service.active_matches(&player(1)).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].result, MatchResult::Pending);

    assert_eq!(
        service
            .record_result(&organizer(), &result_request(9_999, &[(21, 3)]))
            .await
            .unwrap_err(),
        CourtQueueError::MatchNotFound { match_id: 9_999 }
    );
}

#[tokio::test]
async fn test_history_is_newest_first_and_limited() {
    let (service, _store) = memory_service();
    let mut ids = Vec::new();
    for opponent in 2..=6 {
        let created = service
            .create_match(&organizer(), &match_request("Court 1", &[1], &[opponent]))
            .await
            .unwrap();
        ids.push(created.id);
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    service
        .record_result(&organizer(), &result_request(ids[0], &[(21, 3), (21, 4)]))
        .await
        .unwrap();

    let history = service.history(&player(1), 3).await.unwrap();
    let listed: Vec<_> = history.iter().map(|entry| entry.game.id).collect();
    assert_eq!(listed, vec![ids[4], ids[3], ids[2]]);
    // pending matches are never won
    assert!(history.iter().all(|entry| !entry.won));

    let full = service.history(&player(1), 0).await.unwrap();
    assert_eq!(full.len(), 5);
    assert!(full.last().unwrap().won);

    let active = service.active_matches(&player(1)).await.unwrap();
    assert_eq!(active.len(), 4);
    assert_eq!(active[0].id, ids[4]);

    let completed = service.completed_matches(&organizer(), 0).await.unwrap();
    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].scores.len(), 2);
}

#[tokio::test]
async fn test_match_scenario_on_sqlite() {
    let (service, store) = sqlite_service().await;
    service.join(&player(1)).await.unwrap();
    service.join(&player(2)).await.unwrap();
    service.call_next(&organizer(), Some(2)).await.unwrap();

    let created = service
        .create_match(&organizer(), &match_request("Court 1", &[1], &[2]))
        .await
        .unwrap();
    let resolved = service
        .record_result(
            &organizer(),
            &result_request(created.id, &[(21, 15), (19, 21), (21, 18)]),
        )
        .await
        .unwrap();
    assert_eq!(resolved.result, MatchResult::Team1);

    let stored = service.history(&player(2), 0).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].game.scores, resolved.scores);
    assert!(!stored[0].won);

    assert!(service.stats(&player(1), None).await.unwrap().current_streak >= 1);
    assert!(service.stats(&player(2), None).await.unwrap().current_streak <= -1);
    assert!(service.status(None).await.unwrap().currently_playing.is_empty());
    assert_eq!(assert_dense_positions(&store).await, 0);

    assert!(matches!(
        service
            .record_result(&organizer(), &result_request(created.id, &[(0, 21)]))
            .await
            .unwrap_err(),
        CourtQueueError::MatchAlreadyResolved { .. }
    ));
}
