//! Tests for the background session sweeper.

use std::{sync::Arc, time::Duration};

use segments::{BytesDecoder, Reassembler, spawn_sweeper};
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

fn engine() -> Arc<Reassembler<BytesDecoder>> {
    Arc::new(Reassembler::builder(BytesDecoder).build())
}

#[tokio::test(start_paused = true)]
async fn sweeper_evicts_sessions_once_idle_beyond_timeout() {
    let engine = engine();
    engine
        .admit_at("idle", 1, 2, "a", Instant::now().into_std())
        .expect("open session");
    let shutdown = CancellationToken::new();
    let handle = spawn_sweeper(
        Arc::clone(&engine),
        Duration::from_secs(1),
        Duration::from_secs(5),
        shutdown.clone(),
    );

    sleep(Duration::from_millis(5_500)).await;
    assert!(engine.contains_session("idle"));

    sleep(Duration::from_secs(1)).await;
    assert!(!engine.contains_session("idle"));

    shutdown.cancel();
    handle.await.expect("sweeper task joins");
}

#[tokio::test(start_paused = true)]
async fn sweeper_keeps_sessions_that_stay_active() {
    let engine = engine();
    let shutdown = CancellationToken::new();
    let handle = spawn_sweeper(
        Arc::clone(&engine),
        Duration::from_secs(1),
        Duration::from_secs(3),
        shutdown.clone(),
    );

    for seq in 1..=4 {
        engine
            .admit_at("busy", seq, 5, "x", Instant::now().into_std())
            .expect("admit fragment");
        sleep(Duration::from_millis(2_500)).await;
    }
    assert_eq!(engine.received_count("busy"), 4);

    shutdown.cancel();
    handle.await.expect("sweeper task joins");
}

#[tokio::test(start_paused = true)]
async fn cancelled_sweeper_stops_evicting() {
    let engine = engine();
    let shutdown = CancellationToken::new();
    let handle = spawn_sweeper(
        Arc::clone(&engine),
        Duration::from_secs(1),
        Duration::from_secs(1),
        shutdown.clone(),
    );
    shutdown.cancel();
    handle.await.expect("sweeper task joins");

    engine
        .admit_at("after", 1, 2, "a", Instant::now().into_std())
        .expect("open session");
    sleep(Duration::from_secs(10)).await;

    assert!(engine.contains_session("after"));
}
