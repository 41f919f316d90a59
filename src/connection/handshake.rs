//! Startup handshake.
//!
//! After spawn the driver prints banner text, then a `ready` block once it has
//! opened the device. No command may be written before that block arrives.

use futures_util::StreamExt;
use tracing::{debug, info, warn};

use super::DriverLines;
use crate::process::{ExitFuture, ExitInfo};
use crate::protocol::{BlockParser, DriverEvent};
use crate::ClientError;

/// Read driver output until the first `ready` block.
///
/// Banner lines and any other pre-handshake output are logged and dropped.
/// If stdout closes first the process is assumed to be exiting and its exit
/// is awaited.
///
/// # Errors
///
/// Returns the [`ExitInfo`] of the driver if it exits before becoming ready.
pub async fn wait_for_ready(
    pid: Option<u32>,
    lines: &mut DriverLines,
    parser: &mut BlockParser,
    exit: &mut ExitFuture,
) -> std::result::Result<(), ExitInfo> {
    let mut stdout_open = true;
    let mut resume_after_error = false;

    loop {
        tokio::select! {
            biased;

            item = lines.next(), if stdout_open => match item {
                Some(Ok(line)) => {
                    for event in parser.push_line(&line) {
                        match event {
                            DriverEvent::Ready => {
                                info!(pid, "plustekctl ready");
                                return Ok(());
                            }
                            DriverEvent::Banner(text) => {
                                debug!(pid, text = text.as_str(), "plustekctl banner");
                            }
                            other => {
                                debug!(pid, raw = %other.raw(), "ignoring output before handshake");
                            }
                        }
                    }
                }
                Some(Err(ClientError::InvalidResponse(msg))) => {
                    warn!(pid, error = msg.as_str(), "skipping unframeable line before handshake");
                    resume_after_error = true;
                }
                Some(Err(err)) => {
                    warn!(pid, %err, "plustekctl stdout failed before handshake");
                    stdout_open = false;
                }
                // FramedRead yields a single `None` after a decoder error.
                None if resume_after_error => resume_after_error = false,
                None => {
                    debug!(pid, "plustekctl stdout closed before handshake, waiting for exit");
                    stdout_open = false;
                }
            },

            info = &mut *exit => return Err(info),
        }
    }
}
