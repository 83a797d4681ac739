// Admission limits: rejoin cooldown, window caps, fail-open degradation

mod common;

use common::harness_with_config;
use waitline_core::application::RateLimitConfig;
use waitline_core::domain::TicketStatus;
use waitline_core::error::AppError;

#[tokio::test]
async fn rejoin_within_cooldown_is_rejected_with_remaining_wait() {
    let h = harness_with_config("sqlite::memory:", RateLimitConfig::default()).await;
    let queue = h
        .service
        .create_queue("Cafeteria", "Building A", None)
        .await
        .unwrap();
    let user = "user-1".to_string();

    let ticket = h.service.issue_ticket(&queue.id, &user).await.unwrap();
    h.service
        .update_status(&ticket.id, TicketStatus::Cancelled)
        .await
        .unwrap();

    // 10s into the 30s cooldown
    h.clock.advance_secs(10);
    let err = h.service.issue_ticket(&queue.id, &user).await.unwrap_err();
    match err {
        AppError::RateLimited {
            retry_after_seconds,
            ref message,
        } => {
            assert_eq!(retry_after_seconds, 20);
            assert!(message.contains("20 seconds"), "got {message:?}");
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }

    // Past the cooldown the retry succeeds
    h.clock.advance_secs(21);
    h.service.issue_ticket(&queue.id, &user).await.unwrap();
}

#[tokio::test]
async fn sixth_rapid_join_hits_the_minute_cap() {
    let h = harness_with_config("sqlite::memory:", RateLimitConfig::default()).await;
    let user = "user-1".to_string();

    // Different queues each time, leaving between joins, so only the
    // per-minute counter is in play.
    for i in 0..5 {
        let queue = h
            .service
            .create_queue(format!("Queue {i}").as_str(), "Building A", None)
            .await
            .unwrap();
        let ticket = h.service.issue_ticket(&queue.id, &user).await.unwrap();
        h.service
            .update_status(&ticket.id, TicketStatus::Cancelled)
            .await
            .unwrap();
    }

    let sixth = h
        .service
        .create_queue("Queue 5", "Building A", None)
        .await
        .unwrap();
    let err = h.service.issue_ticket(&sixth.id, &user).await.unwrap_err();
    match err {
        AppError::RateLimited {
            retry_after_seconds,
            ..
        } => {
            assert!(retry_after_seconds > 0 && retry_after_seconds <= 60);
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn minute_window_keeps_its_original_expiry_across_joins() {
    let config = RateLimitConfig {
        max_joins_per_minute: 2,
        ..RateLimitConfig::default()
    };
    let h = harness_with_config("sqlite::memory:", config).await;
    let user = "user-1".to_string();

    let q1 = h.service.create_queue("Q1", "A", None).await.unwrap();
    let q2 = h.service.create_queue("Q2", "A", None).await.unwrap();
    let q3 = h.service.create_queue("Q3", "A", None).await.unwrap();

    let t1 = h.service.issue_ticket(&q1.id, &user).await.unwrap();
    h.service
        .update_status(&t1.id, TicketStatus::Cancelled)
        .await
        .unwrap();

    h.clock.advance_secs(20);
    let t2 = h.service.issue_ticket(&q2.id, &user).await.unwrap();
    h.service
        .update_status(&t2.id, TicketStatus::Cancelled)
        .await
        .unwrap();

    // The second join must not have refreshed the 60s window that started
    // with the first join: 40s of it remain.
    let err = h.service.issue_ticket(&q3.id, &user).await.unwrap_err();
    match err {
        AppError::RateLimited {
            retry_after_seconds,
            ..
        } => assert_eq!(retry_after_seconds, 40),
        other => panic!("expected RateLimited, got {other:?}"),
    }

    // Once the original window lapses, joins flow again
    h.clock.advance_secs(41);
    h.service.issue_ticket(&q3.id, &user).await.unwrap();
}

#[tokio::test]
async fn hourly_cap_reports_retry_in_minutes() {
    let config = RateLimitConfig {
        max_joins_per_minute: 100,
        max_joins_per_hour: 2,
        ..RateLimitConfig::default()
    };
    let h = harness_with_config("sqlite::memory:", config).await;
    let user = "user-1".to_string();

    for i in 0..2 {
        let queue = h
            .service
            .create_queue(format!("Queue {i}").as_str(), "A", None)
            .await
            .unwrap();
        let ticket = h.service.issue_ticket(&queue.id, &user).await.unwrap();
        h.service
            .update_status(&ticket.id, TicketStatus::Cancelled)
            .await
            .unwrap();
        h.clock.advance_secs(61);
    }

    let queue = h.service.create_queue("Queue 9", "A", None).await.unwrap();
    let err = h.service.issue_ticket(&queue.id, &user).await.unwrap_err();
    match err {
        AppError::RateLimited {
            retry_after_seconds,
            ref message,
        } => {
            // Hour window opened at the first join, 122s ago
            assert_eq!(retry_after_seconds, 3600 - 122);
            assert!(message.contains("minutes"), "got {message:?}");
        }
        other => panic!("expected RateLimited, got {other:?}"),
    }
}

#[tokio::test]
async fn cache_outage_fails_open_and_recovers() {
    let h = harness_with_config("sqlite::memory:", RateLimitConfig::default()).await;
    let queue = h
        .service
        .create_queue("Cafeteria", "Building A", None)
        .await
        .unwrap();
    let user = "user-1".to_string();

    // Seed a cooldown marker, then leave the queue
    let ticket = h.service.issue_ticket(&queue.id, &user).await.unwrap();
    h.service
        .update_status(&ticket.id, TicketStatus::Cancelled)
        .await
        .unwrap();

    // With the cache down, the cooldown cannot be consulted: fail open
    h.cache.set_available(false);
    let ticket = h.service.issue_ticket(&queue.id, &user).await.unwrap();
    h.service
        .update_status(&ticket.id, TicketStatus::Cancelled)
        .await
        .unwrap();

    // After recovery the surviving marker enforces the cooldown again
    h.cache.set_available(true);
    let err = h.service.issue_ticket(&queue.id, &user).await.unwrap_err();
    assert!(matches!(err, AppError::RateLimited { .. }), "got {err:?}");

    // And it drains normally
    h.clock.advance_secs(31);
    h.service.issue_ticket(&queue.id, &user).await.unwrap();
}
