//! `plustekctl` process spawner.
//!
//! The driver runs with piped stdin/stdout/stderr and `kill_on_drop(true)`,
//! so it dies with its connection. It inherits the caller's environment;
//! the Plustek SDK and SANE backends read library paths and debug switches
//! from there.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::process::Command;
use tracing::{info, warn};

use super::{DriverProcess, ExitInfo, SignalTerminator};
use crate::{ClientError, Result};

/// File name of the driver executable.
pub const DRIVER_BINARY: &str = "plustekctl";

/// Locate the driver binary.
///
/// An explicit path is returned as given; spawn reports it if it is missing.
/// Otherwise every `PATH` entry is searched for [`DRIVER_BINARY`].
///
/// # Errors
///
/// Returns `ClientError::Config("unable to find plustekctl")` when the search
/// comes up empty.
pub fn find_binary_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let search = std::env::var_os("PATH").unwrap_or_default();
    std::env::split_paths(&search)
        .map(|dir| dir.join(DRIVER_BINARY))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| ClientError::Config(format!("unable to find {DRIVER_BINARY}")))
}

/// Spawn `binary` with `args` and capture its stdio.
///
/// The returned process's exit future reaps the child; dropping it kills the
/// driver.
///
/// # Errors
///
/// Returns the raw OS error when the process cannot be created or a pipe
/// cannot be captured.
pub fn spawn_driver(binary: &Path, args: &[String]) -> io::Result<DriverProcess> {
    let mut cmd = Command::new(binary);
    cmd.args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd.spawn()?;
    let pid = child.id();

    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| io::Error::other("failed to capture plustekctl stdin"))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("failed to capture plustekctl stdout"))?;
    let stderr = child.stderr.take();

    info!(pid, binary = %binary.display(), "plustekctl spawned");

    let exited = Arc::new(AtomicBool::new(false));
    let exit_flag = Arc::clone(&exited);
    let exit = Box::pin(async move {
        let info = match child.wait().await {
            Ok(status) => ExitInfo::from_status(pid, status),
            Err(err) => {
                warn!(pid, %err, "error waiting for plustekctl");
                ExitInfo {
                    pid,
                    ..ExitInfo::default()
                }
            }
        };
        exit_flag.store(true, Ordering::SeqCst);
        info
    });

    Ok(DriverProcess {
        pid,
        stdin: Box::new(stdin),
        stdout: Box::new(stdout),
        stderr: stderr.map(|s| Box::new(s) as super::BoxReader),
        exit,
        terminator: Arc::new(SignalTerminator::new(pid, exited)),
    })
}
