//! Scanner client.
//!
//! [`ScannerClient`] is the public face of a driver connection. Every
//! single-round-trip operation enqueues its command at call time and returns
//! a `'static` future, so the order in which operations are *called* is the
//! order in which the driver sees them, no matter when the futures are polled.

use std::fmt::{Debug, Formatter};
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::connection::{handshake, CommandQueue, ConnectionObserver, ConnectionState};
use crate::models::paper_status::PaperStatus;
use crate::models::scan::{format_file_list, ScannedSheet};
use crate::process::spawner::{find_binary_path, spawn_driver};
use crate::process::{drain_stderr, DriverProcess, ExitInfo, Terminate};
use crate::protocol::codec::DriverCodec;
use crate::protocol::{BlockParser, DriverCommand, DriverEvent};
use crate::{ClientError, Result};

/// Decides whether a failed scan is attempted again.
///
/// Attempts are numbered from zero. After attempt `i` fails,
/// [`should_retry`](Self::should_retry) is asked about attempt `i + 1`; any
/// delay between attempts belongs in that future.
pub trait ScanRetryPolicy: Send {
    /// Called before attempt `attempt` is sent.
    fn on_scan_attempt_start(&mut self, _attempt: u32) {}

    /// Called with the outcome of attempt `attempt`.
    fn on_scan_attempt_end(&mut self, _attempt: u32, _result: &Result<ScannedSheet>) {}

    /// Whether attempt `attempt` should be made.
    fn should_retry(&mut self, attempt: u32) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;
}

/// Retries a failed scan up to a fixed number of times.
///
/// `RetryLimit::new(5)` allows six attempts in total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryLimit {
    remaining: u32,
    delay: Duration,
}

impl RetryLimit {
    /// Allow `times` retries with no delay between attempts.
    #[must_use]
    pub fn new(times: u32) -> Self {
        Self {
            remaining: times,
            delay: Duration::ZERO,
        }
    }

    /// Sleep for `delay` before each retry.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Retries not yet used.
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }
}

impl ScanRetryPolicy for RetryLimit {
    fn should_retry(&mut self, attempt: u32) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        let allowed = self.remaining > 0;
        if allowed {
            self.remaining -= 1;
        }
        let delay = self.delay;
        Box::pin(async move {
            if allowed && !delay.is_zero() {
                debug!(attempt, delay_ms = delay.as_millis(), "waiting before scan retry");
                tokio::time::sleep(delay).await;
            }
            allowed
        })
    }
}

/// A connected `plustekctl` driver.
///
/// Clones share the same connection. The driver is killed once every clone
/// has been dropped.
#[derive(Clone)]
pub struct ScannerClient {
    queue: CommandQueue,
    terminator: Arc<dyn Terminate>,
    pid: Option<u32>,
}

impl Debug for ScannerClient {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScannerClient")
            .field("pid", &self.pid)
            .field("state", &self.queue.state())
            .finish_non_exhaustive()
    }
}

impl ScannerClient {
    /// Resolve `config`, spawn `plustekctl`, and wait for its handshake.
    ///
    /// # Errors
    ///
    /// - `ClientError::Config` if the binary cannot be found.
    /// - `ClientError::Io` if the save directory cannot be created.
    /// - `ClientError::Connection` if the process cannot be spawned.
    /// - `ClientError::Disconnected` if the driver exits before it is ready.
    pub async fn connect(config: &ClientConfig, observer: Arc<dyn ConnectionObserver>) -> Result<Self> {
        let binary = find_binary_path(config.driver_path.as_deref())?;
        let resolved = config.scanner.clone().resolve()?;
        observer.on_config_resolved(&resolved);

        let args = resolved.to_args();
        debug!(binary = %binary.display(), ?args, "resolved plustekctl invocation");

        let connected = Self::connect_with(move || spawn_driver(&binary, &args), observer).await;
        if connected.is_err() {
            resolved.discard();
        }
        connected
    }

    /// Connect to a driver produced by `spawn`.
    ///
    /// `spawn` is called exactly once, after `on_connecting`.
    ///
    /// # Errors
    ///
    /// - `ClientError::Connection` carrying the spawn error.
    /// - `ClientError::Disconnected` if the driver exits before it is ready.
    pub async fn connect_with<F>(spawn: F, observer: Arc<dyn ConnectionObserver>) -> Result<Self>
    where
        F: FnOnce() -> io::Result<DriverProcess>,
    {
        observer.on_connecting();

        let process = match spawn() {
            Ok(process) => process,
            Err(err) => {
                warn!(%err, "failed to spawn plustekctl");
                observer.on_disconnected(None);
                return Err(ClientError::Connection(err.to_string()));
            }
        };

        let DriverProcess {
            pid,
            stdin,
            stdout,
            stderr,
            mut exit,
            terminator,
        } = process;

        if let Some(stderr) = stderr {
            tokio::spawn(drain_stderr(pid, stderr));
        }

        observer.on_waiting_for_handshake(pid);
        let mut lines = FramedRead::new(stdout, DriverCodec::new());
        let mut parser = BlockParser::new();

        if let Err(exit_info) = handshake::wait_for_ready(pid, &mut lines, &mut parser, &mut exit).await {
            warn!(%exit_info, "plustekctl exited before handshake");
            observer.on_disconnected(Some(&exit_info));
            return Err(ClientError::Disconnected(format!(
                "connection error: plustekctl exited unexpectedly ({exit_info})"
            )));
        }

        observer.on_connected(pid);
        let queue = CommandQueue::start(pid, stdin, lines, parser, exit, Arc::clone(&terminator), observer);
        info!(pid, "scanner client connected");

        Ok(Self {
            queue,
            terminator,
            pid,
        })
    }

    fn request(&self, command: DriverCommand) -> impl Future<Output = Result<Vec<DriverEvent>>> + Send + 'static {
        let pending = self.queue.enqueue(command);
        async move { pending?.recv().await }
    }

    /// Query the sensor state of the paper path.
    ///
    /// # Errors
    ///
    /// Returns the classified driver error, `ClientError::Generic` for an
    /// unknown status value, or a disconnection/invalid-response error.
    pub fn get_paper_status(&self) -> impl Future<Output = Result<PaperStatus>> + Send + 'static {
        let response = self.request(DriverCommand::GetPaperStatus);
        async move {
            match single_event(response.await?)? {
                DriverEvent::Value { value, .. } => value.parse().map_err(ClientError::Generic),
                DriverEvent::Err { code, .. } => Err(code.into()),
                other => Err(ClientError::InvalidResponse(other.raw())),
            }
        }
    }

    /// Scan the sheet in the feeder once.
    ///
    /// Succeeds only when the driver reports exactly two files (front and
    /// back) followed by `ok`.
    ///
    /// # Errors
    ///
    /// - `ClientError::Generic("expected two files, got: [ … ]")` on any other
    ///   file count.
    /// - `ClientError::Generic("unexpected response data: …")` if the driver
    ///   answers with a value.
    /// - The classified driver error on `err=`.
    pub fn scan(&self) -> impl Future<Output = Result<ScannedSheet>> + Send + 'static {
        let response = self.request(DriverCommand::Scan);
        async move { scanned_sheet(response.await?) }
    }

    /// Scan, retrying failed attempts as `policy` allows.
    ///
    /// Disconnection always ends the loop. Unlike the single-shot operations
    /// each attempt is enqueued only when the previous one has finished.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt.
    pub async fn scan_with<P>(&self, policy: &mut P) -> Result<ScannedSheet>
    where
        P: ScanRetryPolicy + ?Sized,
    {
        let mut attempt = 0;
        loop {
            policy.on_scan_attempt_start(attempt);
            let result = self.scan().await;
            policy.on_scan_attempt_end(attempt, &result);

            match result {
                Ok(sheet) => return Ok(sheet),
                Err(err) if err.is_disconnected() => return Err(err),
                Err(err) => {
                    debug!(attempt, %err, "scan attempt failed");
                    attempt += 1;
                    if !policy.should_retry(attempt).await {
                        return Err(err);
                    }
                }
            }
        }
    }

    /// Run the feeder calibration routine.
    ///
    /// # Errors
    ///
    /// Returns the classified driver error, or a disconnection/invalid-response
    /// error.
    pub fn calibrate(&self) -> impl Future<Output = Result<()>> + Send + 'static {
        self.acknowledged(DriverCommand::Calibrate)
    }

    /// Eject the scanned sheet into the output tray.
    ///
    /// # Errors
    ///
    /// Returns the classified driver error, or a disconnection/invalid-response
    /// error.
    pub fn accept(&self) -> impl Future<Output = Result<()>> + Send + 'static {
        self.acknowledged(DriverCommand::Accept)
    }

    /// Return the scanned sheet to the user.
    ///
    /// With `hold` the driver keeps the sheet gripped in the feeder
    /// (`reject-hold`).
    ///
    /// # Errors
    ///
    /// Returns the classified driver error, or a disconnection/invalid-response
    /// error.
    pub fn reject(&self, hold: bool) -> impl Future<Output = Result<()>> + Send + 'static {
        self.acknowledged(if hold {
            DriverCommand::RejectHold
        } else {
            DriverCommand::Reject
        })
    }

    /// Ask the driver to quit.
    ///
    /// The driver exits afterwards and the connection becomes disconnected.
    ///
    /// # Errors
    ///
    /// Returns the classified driver error, or a disconnection/invalid-response
    /// error.
    pub fn close(&self) -> impl Future<Output = Result<()>> + Send + 'static {
        self.acknowledged(DriverCommand::Quit)
    }

    fn acknowledged(&self, command: DriverCommand) -> impl Future<Output = Result<()>> + Send + 'static {
        let response = self.request(command);
        async move {
            match single_event(response.await?)? {
                DriverEvent::Ok { .. } => Ok(()),
                DriverEvent::Err { code, .. } => Err(code.into()),
                other => Err(ClientError::InvalidResponse(other.raw())),
            }
        }
    }

    /// Terminate the driver process without going through the protocol.
    ///
    /// Pending operations resolve with a disconnection error once the exit is
    /// observed.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Io` if the signal cannot be delivered.
    pub fn kill(&self) -> Result<()> {
        info!(pid = self.pid, "killing plustekctl");
        self.terminator.terminate()
    }

    /// Whether the driver is connected and accepting commands.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.queue.state()
    }

    /// OS process id of the driver.
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Resolve once the driver has exited and every pending operation has
    /// been resolved.
    pub async fn wait_for_disconnect(&self) -> ExitInfo {
        self.queue.wait_for_disconnect().await
    }
}

/// The terminating event of a response that must not carry file lines.
fn single_event(mut events: Vec<DriverEvent>) -> Result<DriverEvent> {
    let last = events
        .pop()
        .ok_or_else(|| ClientError::InvalidResponse(String::new()))?;
    match events.first() {
        Some(stray) => Err(ClientError::InvalidResponse(stray.raw())),
        None => Ok(last),
    }
}

fn scanned_sheet(events: Vec<DriverEvent>) -> Result<ScannedSheet> {
    let mut files = Vec::new();
    for event in events {
        match event {
            DriverEvent::File { path, .. } => files.push(path),
            DriverEvent::Ok { .. } => {
                return ScannedSheet::from_files(files).map_err(|files| {
                    ClientError::Generic(format!("expected two files, got: {}", format_file_list(&files)))
                });
            }
            DriverEvent::Value { value, .. } => {
                return Err(ClientError::Generic(format!("unexpected response data: {value}")));
            }
            DriverEvent::Err { code, .. } => return Err(code.into()),
            other => return Err(ClientError::InvalidResponse(other.raw())),
        }
    }
    Err(ClientError::InvalidResponse(format!(
        "{}: response ended without a result",
        DriverCommand::Scan
    )))
}
