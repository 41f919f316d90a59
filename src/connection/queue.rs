//! Command queue and connection worker.
//!
//! The driver answers one command at a time and its responses carry no
//! correlation id beyond the command name, so every command goes through a
//! single worker task:
//!
//! 1. [`CommandQueue::enqueue`] places the command on an unbounded channel
//!    synchronously, fixing its position at call time.
//! 2. The worker writes one command, then parses stdout until that command's
//!    terminating event arrives, and only then writes the next.
//! 3. When the driver exits, the active command and everything still queued
//!    resolve with [`ClientError::Disconnected`]; nothing more is written.
//! 4. A failed stdin write, or the last handle going away, ends the
//!    connection the same way: the driver is terminated and its exit awaited.
//!
//! The worker multiplexes the exit future, stdout and the command channel in
//! one `select!` loop, so exit handling and dispatch can never interleave.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use super::{ConnectionObserver, ConnectionState, DriverLines};
use crate::process::{BoxWriter, ExitFuture, ExitInfo, Terminate};
use crate::protocol::{BlockParser, DriverCommand, DriverEvent};
use crate::{ClientError, Result};

/// How long stdout is still read after the driver exits.
///
/// Responses the driver wrote just before exiting (e.g. `quit: ok`) are
/// still delivered.
const EXIT_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// How long a terminated driver is given to exit before its handle is
/// dropped (and `kill_on_drop` takes over).
const TERMINATE_TIMEOUT: Duration = Duration::from_secs(2);

type Reply = oneshot::Sender<Result<Vec<DriverEvent>>>;

/// A command waiting for its turn on the wire.
#[derive(Debug)]
struct PendingCommand {
    command: DriverCommand,
    reply: Reply,
}

/// The command currently written to the driver.
#[derive(Debug)]
struct ActiveCommand {
    command: DriverCommand,
    events: Vec<DriverEvent>,
    reply: Reply,
}

impl ActiveCommand {
    fn resolve(self, result: Result<Vec<DriverEvent>>) {
        // The caller may have dropped its future; nothing to deliver then.
        let _ = self.reply.send(result);
    }
}

/// Response of an enqueued command.
///
/// Resolves with every event of the response, the terminating event last.
#[derive(Debug)]
pub struct PendingResponse(oneshot::Receiver<Result<Vec<DriverEvent>>>);

impl PendingResponse {
    /// Wait for the response.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Disconnected`] if the driver exited first, or
    /// [`ClientError::InvalidResponse`] if the driver answered out of turn.
    pub async fn recv(self) -> Result<Vec<DriverEvent>> {
        self.0.await.unwrap_or_else(|_| Err(ClientError::disconnected()))
    }
}

/// Handle for submitting commands to a connection's worker.
///
/// Cloning shares the same worker; the worker stops once every clone is
/// dropped.
#[derive(Debug, Clone)]
pub struct CommandQueue {
    tx: mpsc::UnboundedSender<PendingCommand>,
    state: watch::Receiver<ConnectionState>,
    exit: watch::Receiver<Option<ExitInfo>>,
}

impl CommandQueue {
    /// Spawn the worker for a connection that has completed its handshake.
    pub(crate) fn start(
        pid: Option<u32>,
        stdin: BoxWriter,
        lines: DriverLines,
        parser: BlockParser,
        exit: ExitFuture,
        terminator: Arc<dyn Terminate>,
        observer: Arc<dyn ConnectionObserver>,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ConnectionState::Connected);
        let (exit_tx, exit_rx) = watch::channel(None);

        let worker = Worker {
            pid,
            rx,
            stdin: Some(stdin),
            lines,
            stdout_open: true,
            resume_after_error: false,
            parser,
            active: None,
            state_tx,
            exit_tx,
            terminator,
            observer,
        };
        tokio::spawn(worker.run(exit));

        Self {
            tx,
            state,
            exit: exit_rx,
        }
    }

    /// Queue `command` behind every command enqueued before it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Disconnected`] immediately if the connection is
    /// already gone.
    pub fn enqueue(&self, command: DriverCommand) -> Result<PendingResponse> {
        if *self.state.borrow() == ConnectionState::Disconnected {
            return Err(ClientError::disconnected());
        }

        let (reply, rx) = oneshot::channel();
        self.tx
            .send(PendingCommand { command, reply })
            .map_err(|_| ClientError::disconnected())?;
        Ok(PendingResponse(rx))
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Wait until the driver has exited and every pending command resolved.
    pub async fn wait_for_disconnect(&self) -> ExitInfo {
        let mut exit = self.exit.clone();
        let result = exit.wait_for(Option::is_some).await;
        result.ok().and_then(|info| *info).unwrap_or_default()
    }
}

/// Owns the driver's stdio for the lifetime of a connection.
struct Worker {
    pid: Option<u32>,
    rx: mpsc::UnboundedReceiver<PendingCommand>,
    stdin: Option<BoxWriter>,
    lines: DriverLines,
    stdout_open: bool,
    resume_after_error: bool,
    parser: BlockParser,
    active: Option<ActiveCommand>,
    state_tx: watch::Sender<ConnectionState>,
    exit_tx: watch::Sender<Option<ExitInfo>>,
    terminator: Arc<dyn Terminate>,
    observer: Arc<dyn ConnectionObserver>,
}

impl Worker {
    async fn run(mut self, mut exit: ExitFuture) {
        let info = loop {
            tokio::select! {
                biased;

                info = &mut exit => break info,

                item = self.lines.next(), if self.stdout_open => self.on_item(item),

                pending = self.rx.recv(), if self.active.is_none() => match pending {
                    Some(pending) => {
                        if !self.dispatch(pending).await {
                            break self.terminate(&mut exit).await;
                        }
                    }
                    None => {
                        debug!(pid = self.pid, "all client handles dropped, stopping plustekctl");
                        break self.terminate(&mut exit).await;
                    }
                },
            }
        };

        self.shut_down(info).await;
    }

    /// Write one command. Returns `false` if stdin is broken.
    async fn dispatch(&mut self, pending: PendingCommand) -> bool {
        let PendingCommand { command, reply } = pending;
        let Some(stdin) = self.stdin.as_mut() else {
            let _ = reply.send(Err(ClientError::disconnected()));
            return false;
        };

        debug!(pid = self.pid, command = command.as_str(), "sending command");
        let line = command.to_line();
        let written = match stdin.write_all(line.as_bytes()).await {
            Ok(()) => stdin.flush().await,
            Err(err) => Err(err),
        };

        if let Err(err) = written {
            warn!(
                pid = self.pid,
                command = command.as_str(),
                %err,
                "write to plustekctl failed"
            );
            self.stdin = None;
            self.state_tx.send_replace(ConnectionState::Disconnected);
            let _ = reply.send(Err(ClientError::disconnected()));
            return false;
        }

        self.active = Some(ActiveCommand {
            command,
            events: Vec::new(),
            reply,
        });
        true
    }

    /// End a connection whose driver has not exited on its own.
    async fn terminate(&mut self, exit: &mut ExitFuture) -> ExitInfo {
        self.state_tx.send_replace(ConnectionState::Disconnected);
        self.rx.close();
        self.stdin = None;

        if let Err(err) = self.terminator.terminate() {
            warn!(pid = self.pid, %err, "failed to terminate plustekctl");
        }
        match tokio::time::timeout(TERMINATE_TIMEOUT, exit).await {
            Ok(info) => info,
            Err(_) => {
                warn!(pid = self.pid, "plustekctl did not exit after terminate");
                ExitInfo {
                    pid: self.pid,
                    ..ExitInfo::default()
                }
            }
        }
    }

    fn on_item(&mut self, item: Option<Result<String>>) {
        match item {
            Some(Ok(line)) => {
                for event in self.parser.push_line(&line) {
                    self.on_event(event);
                }
            }
            Some(Err(err @ ClientError::InvalidResponse(_))) => {
                warn!(pid = self.pid, %err, "unframeable driver output");
                self.resume_after_error = true;
                if let Some(active) = self.active.take() {
                    active.resolve(Err(err));
                }
            }
            Some(Err(err)) => {
                warn!(pid = self.pid, %err, "plustekctl stdout failed");
                self.stdout_open = false;
            }
            // FramedRead yields a single `None` after a decoder error, then resumes.
            None if self.resume_after_error => self.resume_after_error = false,
            None => {
                debug!(pid = self.pid, "plustekctl stdout closed");
                self.stdout_open = false;
            }
        }
    }

    fn on_event(&mut self, event: DriverEvent) {
        match event {
            DriverEvent::Banner(text) => {
                debug!(pid = self.pid, text = text.as_str(), "plustekctl output");
            }
            DriverEvent::Ready => {}
            event => {
                let Some(mut active) = self.active.take() else {
                    warn!(
                        pid = self.pid,
                        raw = %event.raw(),
                        "response with no command in flight, dropping"
                    );
                    return;
                };

                let expected = active.command.as_str();
                match event {
                    DriverEvent::Malformed(raw) => {
                        warn!(pid = self.pid, command = expected, raw = raw.as_str(), "malformed response");
                        active.resolve(Err(ClientError::InvalidResponse(raw)));
                    }
                    event if event.command() != Some(expected) => {
                        let raw = event.raw();
                        warn!(
                            pid = self.pid,
                            command = expected,
                            raw = raw.as_str(),
                            "response for a different command"
                        );
                        active.resolve(Err(ClientError::InvalidResponse(raw)));
                    }
                    event if event.is_terminal() => {
                        active.events.push(event);
                        let events = std::mem::take(&mut active.events);
                        active.resolve(Ok(events));
                    }
                    event => {
                        active.events.push(event);
                        self.active = Some(active);
                    }
                }
            }
        }
    }

    async fn shut_down(mut self, info: ExitInfo) {
        info!(pid = info.pid, code = info.code, signal = info.signal, "plustekctl exited");
        self.state_tx.send_replace(ConnectionState::Disconnected);
        self.rx.close();
        self.stdin = None;

        if self.stdout_open {
            let drain = async {
                while self.stdout_open {
                    let item = self.lines.next().await;
                    self.on_item(item);
                }
            };
            if tokio::time::timeout(EXIT_DRAIN_TIMEOUT, drain).await.is_err() {
                debug!(pid = info.pid, "plustekctl stdout still open after exit");
            }
        }

        if let Some(active) = self.active.take() {
            active.resolve(Err(ClientError::disconnected()));
        }
        while let Ok(pending) = self.rx.try_recv() {
            let _ = pending.reply.send(Err(ClientError::disconnected()));
        }

        self.observer.on_disconnected(Some(&info));
        self.exit_tx.send_replace(Some(info));
    }
}
