//! Integration tests for the startup handshake.
//!
//! Each test hands `ScannerClient::connect_with` a fake driver and scripts
//! what the driver prints before (or instead of) its first `ready` block.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use plustek_client::{ClientError, ConnectionObserver, ConnectionState, ScannerClient};

use super::test_helpers::{fake_driver, RecordingObserver};

/// Banner text outside any block is ignored until the `ready` block.
#[tokio::test]
async fn banner_lines_are_ignored_until_ready() {
    let (mut driver, process) = fake_driver();
    driver
        .append("Plustek SDK 2.1 loaded\ndevice: /dev/usb/001\n\n")
        .await;
    driver.ready().await;

    let observer = Arc::new(RecordingObserver::default());
    let client = ScannerClient::connect_with(
        move || Ok(process),
        Arc::clone(&observer) as Arc<dyn ConnectionObserver>,
    )
    .await
    .expect("connect");

    assert!(client.is_connected());
    assert_eq!(client.state(), ConnectionState::Connected);
    assert_eq!(client.pid(), Some(4242));
    assert_eq!(
        observer.events(),
        vec!["connecting", "waiting_for_handshake", "connected"]
    );
}

/// A bare `ready` line outside a block is banner text, not a handshake.
#[tokio::test]
async fn ready_outside_a_block_does_not_complete_handshake() {
    let (mut driver, process) = fake_driver();
    driver.append("ready\n").await;
    driver.exit(0);

    let err = ScannerClient::connect_with(move || Ok(process), Arc::new(RecordingObserver::default()))
        .await
        .expect_err("handshake must not complete");

    assert!(err.is_disconnected());
}

/// Nothing is written to the driver before it reports ready.
#[tokio::test]
async fn connect_waits_for_ready_block() {
    let (mut driver, process) = fake_driver();
    let observer = Arc::new(RecordingObserver::default());
    let pending = tokio::spawn(ScannerClient::connect_with(
        move || Ok(process),
        Arc::clone(&observer) as Arc<dyn ConnectionObserver>,
    ));

    driver.append("warming up\n").await;
    driver.expect_no_command(Duration::from_millis(100)).await;
    assert!(!pending.is_finished(), "connect must wait for the ready block");
    assert_eq!(observer.count("connected"), 0);

    driver.ready().await;
    let client = pending.await.expect("join").expect("connect");
    assert!(client.is_connected());
    assert_eq!(observer.count("connected"), 1);
}

/// A spawn failure surfaces as a connection error carrying the OS error.
#[tokio::test]
async fn spawn_failure_is_a_connection_error() {
    let observer = Arc::new(RecordingObserver::default());
    let err = ScannerClient::connect_with(
        || Err(io::Error::new(io::ErrorKind::OutOfMemory, "spawn plustekctl ENOMEM")),
        Arc::clone(&observer) as Arc<dyn ConnectionObserver>,
    )
    .await
    .expect_err("spawn must fail");

    assert_eq!(
        err,
        ClientError::Connection("spawn plustekctl ENOMEM".to_owned())
    );
    assert_eq!(err.to_string(), "connection error: spawn plustekctl ENOMEM");
    assert_eq!(observer.events(), vec!["connecting", "disconnected:none"]);
}

/// The driver exiting before ready fails connect with its exit details.
#[tokio::test]
async fn exit_before_ready_fails_connect() {
    let (mut driver, process) = fake_driver();
    driver.append("opening device\n").await;
    driver.exit(0);

    let observer = Arc::new(RecordingObserver::default());
    let err = ScannerClient::connect_with(
        move || Ok(process),
        Arc::clone(&observer) as Arc<dyn ConnectionObserver>,
    )
    .await
    .expect_err("driver exited");

    assert_eq!(
        err.to_string(),
        "connection error: plustekctl exited unexpectedly (pid=4242, code=0, signal=none)"
    );
    assert!(err.is_disconnected());
    assert_eq!(
        observer.events(),
        vec![
            "connecting",
            "waiting_for_handshake",
            "disconnected:pid=4242, code=0, signal=none",
        ]
    );
}

/// The driver exiting while stdout stays open still fails connect.
#[tokio::test]
async fn exit_with_open_stdout_fails_connect() {
    let (mut driver, process) = fake_driver();
    driver.exit_keeping_stdout(2);

    let err = ScannerClient::connect_with(move || Ok(process), Arc::new(RecordingObserver::default()))
        .await
        .expect_err("driver exited");

    assert!(err.to_string().contains("code=2"), "got: {err}");
}
