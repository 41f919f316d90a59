//! Integration tests for driver exit, `close`, and `kill`.

use std::time::Duration;

use plustek_client::{ClientError, ConnectionState};

use super::test_helpers::{connected_client, FAKE_PID, SIGTERM};

/// Every operation fails fast once the driver has exited.
#[tokio::test]
async fn operations_fail_fast_after_exit() {
    let (mut driver, client, _observer) = connected_client().await;

    driver.exit(0);
    client.wait_for_disconnect().await;

    assert!(!client.is_connected());
    assert_eq!(client.state(), ConnectionState::Disconnected);

    let disconnected = ClientError::disconnected();
    assert_eq!(client.get_paper_status().await, Err(disconnected.clone()));
    assert_eq!(client.scan().await, Err(disconnected.clone()));
    assert_eq!(client.close().await, Err(disconnected.clone()));
    assert_eq!(client.accept().await, Err(disconnected.clone()));
    assert_eq!(client.reject(true).await, Err(disconnected.clone()));
    assert_eq!(client.calibrate().await, Err(disconnected));
    assert_eq!(
        client.scan().await.expect_err("disconnected").to_string(),
        "client is disconnected"
    );

    driver.expect_no_command(Duration::from_millis(50)).await;
}

/// The active command and queued commands resolve when the driver exits.
#[tokio::test]
async fn pending_commands_resolve_on_exit() {
    let (mut driver, client, observer) = connected_client().await;

    let scan = client.scan();
    let accept = client.accept();
    let status = client.get_paper_status();
    assert_eq!(driver.expect_command().await, "scan");

    driver.exit(1);

    assert!(scan.await.expect_err("active").is_disconnected());
    assert!(accept.await.expect_err("queued").is_disconnected());
    assert!(status.await.expect_err("queued").is_disconnected());

    let exit = client.wait_for_disconnect().await;
    assert_eq!(exit.code, Some(1));
    assert_eq!(observer.count("disconnected"), 1);
    driver.expect_no_command(Duration::from_millis(50)).await;
}

/// `close` sends `quit`; the later exit fires `on_disconnected` once.
#[tokio::test]
async fn close_quits_driver() {
    let (mut driver, client, observer) = connected_client().await;

    let close = client.close();
    assert_eq!(driver.expect_command().await, "quit");
    driver.append("<<<>>>\nquit: ok\n<<<>>>\n").await;
    close.await.expect("close");
    assert!(client.is_connected());

    driver.exit(0);
    let exit = client.wait_for_disconnect().await;

    assert_eq!(exit.pid, Some(FAKE_PID));
    assert_eq!(exit.code, Some(0));
    assert!(!client.is_connected());
    assert_eq!(
        observer.events().last().map(String::as_str),
        Some("disconnected:pid=4242, code=0, signal=none")
    );
    assert_eq!(observer.count("disconnected"), 1);
}

/// A response written right before the exit is still delivered.
#[tokio::test]
async fn response_before_exit_is_delivered() {
    let (mut driver, client, _observer) = connected_client().await;

    let close = client.close();
    assert_eq!(driver.expect_command().await, "quit");
    driver.append("<<<>>>\nquit: ok\n<<<>>>\n").await;
    driver.exit(0);

    close.await.expect("quit acknowledged before exit");
}

/// An exit with stdout left open still resolves pending commands.
#[tokio::test]
async fn exit_with_open_stdout_resolves_pending() {
    let (mut driver, client, _observer) = connected_client().await;

    let status = client.get_paper_status();
    assert_eq!(driver.expect_command().await, "get-paper-status");
    driver.exit_keeping_stdout(0);

    let result = tokio::time::timeout(Duration::from_secs(2), status)
        .await
        .expect("resolved after the drain timeout");
    assert!(result.expect_err("exited").is_disconnected());
}

/// `kill` terminates the driver and pending commands resolve.
#[tokio::test]
async fn kill_terminates_driver() {
    let (mut driver, client, observer) = connected_client().await;

    let status = client.get_paper_status();
    assert_eq!(driver.expect_command().await, "get-paper-status");

    client.kill().expect("kill");
    assert_eq!(driver.terminator.calls(), 1);

    assert!(status.await.expect_err("killed").is_disconnected());
    let exit = client.wait_for_disconnect().await;
    assert_eq!(exit.signal, Some(SIGTERM));
    assert_eq!(exit.code, None);
    assert_eq!(observer.count("disconnected"), 1);
}

/// An OS failure to deliver the signal is reported as an I/O error.
#[tokio::test]
async fn kill_failure_is_reported() {
    let (driver, client, _observer) = connected_client().await;
    driver.terminator.fail_with("EPERM: operation not permitted");

    let err = client.kill().expect_err("kill fails");
    assert_eq!(err.to_string(), "io: EPERM: operation not permitted");
    assert!(client.is_connected());
}

/// Dropping every client handle stops the connection.
#[tokio::test]
async fn dropping_client_closes_stdin() {
    let (mut driver, client, _observer) = connected_client().await;
    let clone = client.clone();

    drop(client);
    let status = clone.get_paper_status();
    assert_eq!(driver.expect_command().await, "get-paper-status");
    driver
        .respond(&["get-paper-status: PAPER_STATUS_NO_PAPER"])
        .await;
    status.await.expect("clone still usable");

    drop(clone);
    driver.expect_stdin_closed().await;
}

/// Dropping the last handle terminates the driver and reports the disconnect.
#[tokio::test]
async fn dropping_last_handle_reports_disconnect() {
    let (driver, client, observer) = connected_client().await;

    drop(client);
    tokio::time::timeout(Duration::from_secs(3), async {
        while observer.count("disconnected") == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("on_disconnected fired");

    assert_eq!(driver.terminator.calls(), 1);
    assert_eq!(
        observer.events().last().map(String::as_str),
        Some("disconnected:pid=4242, code=none, signal=15")
    );
    assert_eq!(observer.count("disconnected"), 1);
}

/// A stdin write failure disconnects the client and fails queued work.
#[tokio::test]
async fn broken_stdin_disconnects() {
    let (mut driver, client, observer) = connected_client().await;
    driver.close_stdin();

    let status = client.get_paper_status();
    let accept = client.accept();

    assert!(status.await.expect_err("write fails").is_disconnected());
    assert!(!client.is_connected());
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(accept.await.expect_err("queued").is_disconnected());
    assert!(client.scan().await.expect_err("fail fast").is_disconnected());

    let exit = client.wait_for_disconnect().await;
    assert_eq!(exit.signal, Some(SIGTERM));
    assert_eq!(driver.terminator.calls(), 1);
    assert_eq!(observer.count("disconnected"), 1);
}
