mod common;

use common::{harness, slow_harness};
use optimistic_cache::application::settlement::PollOutcome;
use optimistic_cache::domain::cache::{CacheEntry, CacheKey};
use optimistic_cache::domain::pledge::{PledgeState, PledgeStatus};
use optimistic_cache::domain::ports::CacheStore;
use optimistic_cache::error::CacheError;
use serde_json::json;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

fn pending() -> serde_json::Value {
    json!({"success": true, "data": {"state": "pending"}})
}

#[tokio::test(start_paused = true)]
async fn test_watch_stops_when_settled() {
    let h = harness();
    h.transport.push_ok(pending()).await;
    h.transport.push_ok(json!({"state": "pending"})).await;
    h.transport
        .push_ok(json!({"success": true, "data": {"state": "settled", "settledAt": "2024-05-01T10:00:06Z"}}))
        .await;

    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let started = Instant::now();
    let outcome = h.poller.watch("pl-1", cancel_rx).await.unwrap();

    let PollOutcome::Terminal(status) = outcome else {
        panic!("expected a terminal outcome, got {outcome:?}");
    };
    assert_eq!(status.state, PledgeState::Settled);
    assert!(status.settled_at.is_some());
    assert_eq!(started.elapsed(), Duration::from_secs(6));

    let requests = h.transport.requests().await;
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|r| r.path == "/pledges/pl-1/status"));

    assert_eq!(
        h.store
            .get(&CacheKey::PledgeStatus("pl-1".into()))
            .await
            .unwrap(),
        Some(CacheEntry::PledgeStatus(status))
    );
    assert_eq!(h.notifier.successes(), vec!["Pledge settled"]);
}

#[tokio::test(start_paused = true)]
async fn test_watch_gives_up_at_ceiling() {
    let h = harness();
    // Every poll fails; the schedule alone bounds the loop.
    let (_cancel_tx, cancel_rx) = watch::channel(false);
    let started = Instant::now();
    let outcome = h.poller.watch("pl-1", cancel_rx).await.unwrap();

    assert_eq!(outcome, PollOutcome::GaveUp(None));
    // 40 polls in the first two minutes, 61 more up to and including 12:00.
    assert_eq!(h.transport.requests().await.len(), 101);
    assert_eq!(started.elapsed(), Duration::from_secs(720));
    assert!(h.notifier.errors().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_gave_up_keeps_last_pending_status() {
    let h = harness();
    for _ in 0..101 {
        h.transport.push_ok(pending()).await;
    }
    let (_cancel_tx, cancel_rx) = watch::channel(false);

    let outcome = h.poller.watch("pl-1", cancel_rx).await.unwrap();

    assert_eq!(outcome, PollOutcome::GaveUp(Some(PledgeStatus::pending())));
    assert_eq!(
        h.store
            .get(&CacheKey::PledgeStatus("pl-1".into()))
            .await
            .unwrap(),
        Some(CacheEntry::PledgeStatus(PledgeStatus::pending()))
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_handle_issues_no_more_polls() {
    let h = harness();
    let handle = h.poller.spawn("pl-1");

    tokio::time::sleep(Duration::from_secs(7)).await;
    assert_eq!(h.transport.requests().await.len(), 3);

    handle.cancel();
    assert_eq!(handle.join().await.unwrap(), PollOutcome::Cancelled(None));

    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.transport.requests().await.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_dropped_owner_stops_watch() {
    let h = harness();
    h.transport.push_ok(pending()).await;
    let (cancel_tx, cancel_rx) = watch::channel(false);
    drop(cancel_tx);

    let outcome = h.poller.watch("pl-1", cancel_rx).await.unwrap();

    assert_eq!(outcome, PollOutcome::Cancelled(None));
    assert!(h.transport.requests().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_owner_dropped_between_polls_stops_watch() {
    let h = harness();
    h.transport.push_ok(pending()).await;
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let poller = h.poller.clone();
    let task = tokio::spawn(async move { poller.watch("pl-1", cancel_rx).await });

    tokio::time::sleep(Duration::from_secs(1)).await;
    drop(cancel_tx);

    assert_eq!(
        task.await.unwrap().unwrap(),
        PollOutcome::Cancelled(Some(PledgeStatus::pending()))
    );
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(h.transport.requests().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_result_arriving_after_cancel_is_dropped() {
    let h = slow_harness(Duration::from_secs(2));
    h.transport
        .push_ok(json!({"state": "settled", "settledAt": "2024-05-01T10:00:02Z"}))
        .await;
    let handle = h.poller.spawn("pl-1");

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.transport.requests().await.len(), 1);
    handle.cancel();

    assert_eq!(handle.join().await.unwrap(), PollOutcome::Cancelled(None));
    assert!(
        h.store
            .get(&CacheKey::PledgeStatus("pl-1".into()))
            .await
            .unwrap()
            .is_none()
    );
    assert!(h.notifier.successes().is_empty());
}

#[tokio::test]
async fn test_fetch_status_malformed_messages() {
    let h = harness();

    h.transport.push_ok(json!(["settled"])).await;
    let err = h.poller.fetch_status("pl-1").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid response format");

    h.transport
        .push_ok(json!({"success": true, "data": {"state": "unknown"}}))
        .await;
    let err = h.poller.fetch_status("pl-1").await.unwrap_err();
    assert!(err.to_string().starts_with("Invalid response structure"));
}

#[tokio::test(start_paused = true)]
async fn test_already_cancelled_watch_makes_no_request() {
    let h = harness();
    let (_cancel_tx, cancel_rx) = watch::channel(true);

    let outcome = h.poller.watch("pl-1", cancel_rx).await.unwrap();

    assert_eq!(outcome, PollOutcome::Cancelled(None));
    assert!(h.transport.requests().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_poll_errors_do_not_stop_watch() {
    let h = harness();
    h.transport.push_error(Some(502), "bad gateway").await;
    // settledAt on a pending pledge is rejected and skipped like a failed poll.
    h.transport
        .push_ok(json!({"state": "pending", "settledAt": "2024-05-01T10:00:00Z"}))
        .await;
    h.transport.push_ok(json!({"state": "expired"})).await;
    let (_cancel_tx, cancel_rx) = watch::channel(false);

    let outcome = h.poller.watch("pl-1", cancel_rx).await.unwrap();

    assert_eq!(
        outcome,
        PollOutcome::Terminal(PledgeStatus {
            state: PledgeState::Expired,
            settled_at: None
        })
    );
    assert_eq!(h.transport.requests().await.len(), 3);
    assert_eq!(h.notifier.errors(), vec!["Pledge expired before payment"]);
}

#[tokio::test]
async fn test_submit_pledge_seeds_pending_status() {
    let h = harness();
    h.transport
        .push_ok(json!({
            "success": true,
            "data": {
                "id": "pl-7",
                "amountMinorUnits": 2500,
                "invoiceRef": "lnbc25u1p...",
                "expiresAt": "2024-05-01T10:10:00Z"
            }
        }))
        .await;

    let intent = h.poller.submit_pledge(2500).await.unwrap();

    assert_eq!(intent.id, "pl-7");
    assert_eq!(intent.amount_minor_units, 2500);
    assert_eq!(
        h.store
            .get(&CacheKey::PledgeStatus("pl-7".into()))
            .await
            .unwrap(),
        Some(CacheEntry::PledgeStatus(PledgeStatus::pending()))
    );
    let requests = h.transport.requests().await;
    assert_eq!(requests[0].path, "/pledges");
    assert_eq!(requests[0].body, Some(json!({"amountMinorUnits": 2500})));
}

#[tokio::test]
async fn test_submit_pledge_errors() {
    let h = harness();

    let err = h.poller.submit_pledge(0).await.unwrap_err();
    assert!(matches!(err, CacheError::ValidationError(_)));
    assert!(h.transport.requests().await.is_empty());

    h.transport.push_ok(json!(["pl-1"])).await;
    let err = h.poller.submit_pledge(100).await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid response format");

    h.transport
        .push_ok(json!({"success": true, "data": {"id": "pl-1"}}))
        .await;
    let err = h.poller.submit_pledge(100).await.unwrap_err();
    assert!(err.to_string().starts_with("Invalid response structure"));

    h.transport.push_error(Some(402), "payment required").await;
    let err = h.poller.submit_pledge(100).await.unwrap_err();
    assert_eq!(err.transport().unwrap().status(), Some(402));
}
