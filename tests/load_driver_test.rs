//! Integration tests for the incremental load driver.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{search_result, FakePage, RESULT_CONTAINER};
use saved_post_extractor::loader::{GrowthSignal, LoadConfig, LoadDriver, ScrollStop};
use saved_post_extractor::normalize::layout::POST_CONTAINERS;
use saved_post_extractor::ExtractError;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

fn driver(timeout: Duration) -> LoadDriver {
    LoadDriver::new(LoadConfig {
        first_content_timeout: timeout,
        settle_delay: Duration::from_millis(10),
        max_steps: 50,
        growth_signal: GrowthSignal::ScrollHeight,
    })
}

#[tokio::test]
async fn test_content_already_present_resolves_immediately() {
    let page = FakePage::with_posts(&[search_result(1, "Ada", "Hello")]);
    let started = Instant::now();

    driver(Duration::from_secs(5))
        .wait_for_first_content(&page, POST_CONTAINERS, &CancellationToken::new())
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(page.stop_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_content_detected_on_mutation() {
    let page = Arc::new(FakePage::new());
    let background = Arc::clone(&page);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        // Unrelated mutation first; the driver must keep waiting.
        background.mutate();
        tokio::time::sleep(Duration::from_millis(50)).await;
        background.show_posts(&[search_result(1, "Ada", "Hello")]);
        background.mutate();
    });

    let started = Instant::now();
    driver(Duration::from_secs(5))
        .wait_for_first_content(page.as_ref(), POST_CONTAINERS, &CancellationToken::new())
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(page.stop_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_polls_when_observer_unavailable() {
    let page = Arc::new(FakePage::without_observer());
    let background = Arc::clone(&page);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        background.set_count(RESULT_CONTAINER, 1);
    });

    driver(Duration::from_secs(5))
        .wait_for_first_content(page.as_ref(), POST_CONTAINERS, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(page.stop_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_timeout_reports_no_content() {
    let page = FakePage::new();

    let err = driver(Duration::from_millis(200))
        .wait_for_first_content(&page, POST_CONTAINERS, &CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        ExtractError::NoContentAppeared { waited } => {
            assert_eq!(waited, Duration::from_millis(200));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(page.stop_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancellation_ends_wait_like_timeout() {
    let page = FakePage::new();
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let err = driver(Duration::from_secs(30))
        .wait_for_first_content(&page, POST_CONTAINERS, &cancel)
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractError::NoContentAppeared { .. }));
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(page.stop_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_scroll_stops_when_height_stops_growing() {
    let page = FakePage::with_posts(&[search_result(1, "Ada", "Hello")]);
    page.set_heights(&[100, 250, 250]);

    let report = driver(Duration::from_secs(1))
        .scroll_to_end(&page, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.steps, 2);
    assert_eq!(report.stop, ScrollStop::NoGrowth);
    assert_eq!(report.measure, 250);
    assert_eq!(page.scroll_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_scroll_respects_step_cap() {
    let page = FakePage::new();
    page.set_heights(&(1..=100).collect::<Vec<u64>>());

    let driver = LoadDriver::new(LoadConfig {
        max_steps: 3,
        settle_delay: Duration::from_millis(1),
        ..LoadConfig::default()
    });
    let report = driver
        .scroll_to_end(&page, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.steps, 3);
    assert_eq!(report.stop, ScrollStop::StepCap);
    assert_eq!(page.scroll_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_scroll_by_post_count() {
    let page = FakePage::with_posts(&[search_result(1, "Ada", "Hello"), search_result(2, "Bo", "Hi")]);

    let driver = LoadDriver::new(LoadConfig {
        settle_delay: Duration::from_millis(1),
        growth_signal: GrowthSignal::PostCount,
        ..LoadConfig::default()
    });
    let report = driver
        .scroll_to_end(&page, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.steps, 1);
    assert_eq!(report.stop, ScrollStop::NoGrowth);
    assert_eq!(report.measure, 2);
}

#[tokio::test]
async fn test_scroll_cancelled_during_settle() {
    let page = FakePage::new();
    page.set_heights(&(1..=100).collect::<Vec<u64>>());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let driver = LoadDriver::new(LoadConfig {
        settle_delay: Duration::from_secs(30),
        ..LoadConfig::default()
    });
    let report = driver.scroll_to_end(&page, &cancel).await.unwrap();

    assert_eq!(report.stop, ScrollStop::Cancelled);
    assert_eq!(report.steps, 1);
}
