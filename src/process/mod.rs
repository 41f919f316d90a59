//! Driver process handles.
//!
//! A [`DriverProcess`] bundles everything the connection needs from a running
//! driver: its stdio pipes, a future that resolves when the process exits, and
//! a [`Terminate`] handle for `kill`. The real implementation comes from
//! [`spawner::spawn_driver`]; tests build one over in-memory pipes.

pub mod spawner;

use std::fmt::{Debug, Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tracing::{debug, warn};

use crate::{ClientError, Result};

/// Boxed read half of a driver pipe.
pub type BoxReader = Box<dyn AsyncRead + Send + Unpin>;

/// Boxed write half of a driver pipe.
pub type BoxWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Future resolving once the driver process has exited.
pub type ExitFuture = Pin<Box<dyn Future<Output = ExitInfo> + Send>>;

/// How a driver process ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExitInfo {
    /// OS process id, if it was known.
    pub pid: Option<u32>,
    /// Exit code; absent when the process was killed by a signal.
    pub code: Option<i32>,
    /// Terminating signal number (unix only).
    pub signal: Option<i32>,
}

impl ExitInfo {
    /// Build from a collected [`std::process::ExitStatus`].
    #[must_use]
    pub fn from_status(pid: Option<u32>, status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            pid,
            code: status.code(),
            signal,
        }
    }
}

impl Display for ExitInfo {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fn field<T: Display>(value: Option<T>) -> String {
            value.map_or_else(|| "none".to_owned(), |v| v.to_string())
        }
        write!(
            f,
            "pid={}, code={}, signal={}",
            field(self.pid),
            field(self.code),
            field(self.signal)
        )
    }
}

/// Forcibly ends a driver process, bypassing the protocol.
pub trait Terminate: Send + Sync {
    /// Send the terminate signal.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Io` if the OS call fails or the process is gone.
    fn terminate(&self) -> Result<()>;
}

/// [`Terminate`] implementation that signals a real OS process.
#[derive(Debug)]
pub struct SignalTerminator {
    pid: Option<u32>,
    exited: Arc<AtomicBool>,
}

impl SignalTerminator {
    /// Create a terminator for `pid`; `exited` is set once the process is reaped.
    #[must_use]
    pub fn new(pid: Option<u32>, exited: Arc<AtomicBool>) -> Self {
        Self { pid, exited }
    }
}

impl Terminate for SignalTerminator {
    #[cfg(unix)]
    fn terminate(&self) -> Result<()> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let pid = self
            .pid
            .ok_or_else(|| ClientError::Io("driver process has no pid".into()))?;
        // The pid may have been recycled once the child was reaped.
        if self.exited.load(Ordering::SeqCst) {
            return Err(ClientError::Io(format!(
                "plustekctl (pid={pid}) has already exited"
            )));
        }
        let raw = i32::try_from(pid)
            .map_err(|_| ClientError::Io(format!("pid {pid} out of range")))?;

        kill(Pid::from_raw(raw), Signal::SIGTERM)
            .map_err(|err| ClientError::Io(format!("failed to kill plustekctl (pid={pid}): {err}")))
    }

    #[cfg(not(unix))]
    fn terminate(&self) -> Result<()> {
        Err(ClientError::Io(
            "terminating plustekctl is only supported on unix".into(),
        ))
    }
}

/// A running driver and its stdio.
pub struct DriverProcess {
    /// OS process id, if known.
    pub pid: Option<u32>,
    /// Driver stdin; written only by the command queue.
    pub stdin: BoxWriter,
    /// Driver stdout; carries the line protocol.
    pub stdout: BoxReader,
    /// Driver stderr; logged, never parsed.
    pub stderr: Option<BoxReader>,
    /// Resolves when the process exits.
    pub exit: ExitFuture,
    /// Out-of-band kill handle.
    pub terminator: Arc<dyn Terminate>,
}

impl Debug for DriverProcess {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverProcess")
            .field("pid", &self.pid)
            .field("has_stderr", &self.stderr.is_some())
            .finish_non_exhaustive()
    }
}

/// Log every stderr line of the driver until the pipe closes.
///
/// stderr has no protocol significance.
pub async fn drain_stderr(pid: Option<u32>, stderr: BoxReader) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if !line.trim().is_empty() {
                    warn!(pid, line = line.as_str(), "plustekctl stderr");
                }
            }
            Ok(None) => {
                debug!(pid, "plustekctl stderr closed");
                break;
            }
            Err(err) => {
                debug!(pid, %err, "plustekctl stderr read failed, stopping");
                break;
            }
        }
    }
}
