//! Driver connection lifecycle.
//!
//! A connection moves through [`ConnectionState`]s:
//!
//! ```text
//! Connecting ──spawn ok──▶ WaitingForHandshake ──ready──▶ Connected
//!     │                          │                           │
//!     └──────────────────────────┴─────────exit──────────────┴──▶ Disconnected
//! ```
//!
//! `Disconnected` is terminal. Each transition is reported to a
//! [`ConnectionObserver`].

pub mod handshake;
pub mod queue;

use tokio_util::codec::FramedRead;
use tracing::{info, warn};

use crate::config::ResolvedConfig;
use crate::process::{BoxReader, ExitInfo};
use crate::protocol::codec::DriverCodec;

pub use queue::{CommandQueue, PendingResponse};

/// Framed line stream over the driver's stdout.
pub type DriverLines = FramedRead<BoxReader, DriverCodec>;

/// Lifecycle state of a driver connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// The driver process is being spawned.
    Connecting,
    /// Spawned; waiting for the first `ready` block.
    WaitingForHandshake,
    /// Ready to accept commands.
    Connected,
    /// The driver has exited or could not be started.
    Disconnected,
}

impl ConnectionState {
    /// Lower-case label used in logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::WaitingForHandshake => "waiting_for_handshake",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
        }
    }
}

/// Receives lifecycle notifications for one connection.
///
/// Every method defaults to a no-op. Each fires at most once per connection.
/// Implementations must not block; they are called from the connection task.
pub trait ConnectionObserver: Send + Sync {
    /// The scanner configuration has been resolved (save path fixed).
    fn on_config_resolved(&self, _config: &ResolvedConfig) {}

    /// The driver process is about to be spawned.
    fn on_connecting(&self) {}

    /// The driver was spawned and its `ready` block is awaited.
    fn on_waiting_for_handshake(&self, _pid: Option<u32>) {}

    /// The handshake completed.
    fn on_connected(&self, _pid: Option<u32>) {}

    /// The connection ended. `exit` is `None` when the spawn itself failed.
    fn on_disconnected(&self, _exit: Option<&ExitInfo>) {}
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ConnectionObserver for NoopObserver {}

/// Observer that logs every transition through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl ConnectionObserver for LoggingObserver {
    fn on_config_resolved(&self, config: &ResolvedConfig) {
        info!(savepath = %config.savepath.display(), "scanner config resolved");
    }

    fn on_connecting(&self) {
        info!(state = ConnectionState::Connecting.as_str(), "plustekctl connecting");
    }

    fn on_waiting_for_handshake(&self, pid: Option<u32>) {
        info!(
            pid,
            state = ConnectionState::WaitingForHandshake.as_str(),
            "waiting for plustekctl handshake"
        );
    }

    fn on_connected(&self, pid: Option<u32>) {
        info!(pid, state = ConnectionState::Connected.as_str(), "plustekctl connected");
    }

    fn on_disconnected(&self, exit: Option<&ExitInfo>) {
        match exit {
            Some(exit) => warn!(
                pid = exit.pid,
                code = exit.code,
                signal = exit.signal,
                state = ConnectionState::Disconnected.as_str(),
                "plustekctl disconnected"
            ),
            None => warn!(
                state = ConnectionState::Disconnected.as_str(),
                "plustekctl could not be started"
            ),
        }
    }
}
