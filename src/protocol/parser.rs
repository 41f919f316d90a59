//! Block framing and response-line parsing.
//!
//! The driver wraps every piece of output it wants the client to act on in a
//! pair of `<<<>>>` marker lines:
//!
//! ```text
//! plustek firmware banner         <- outside a block: Banner
//! <<<>>>
//! ready                           <- sole line of a block: Ready
//! <<<>>>
//! <<<>>>
//! scan: file=/tmp/scan/01.jpg     <- result line: File
//! <<<>>>
//! ```
//!
//! Result lines have the shape `<command>: <rest>`:
//!
//! | `<rest>`        | Event                    |
//! |-----------------|--------------------------|
//! | `ok`            | [`DriverEvent::Ok`]      |
//! | `err=<CODE>`    | [`DriverEvent::Err`]     |
//! | `file=<PATH>`   | [`DriverEvent::File`]    |
//! | anything else   | [`DriverEvent::Value`]   |
//!
//! A line inside a block that is not of that shape is
//! [`DriverEvent::Malformed`].

use crate::models::scanner_error::ErrorCode;

/// Literal line that opens and closes a response block.
pub const BLOCK_MARKER: &str = "<<<>>>";

/// Sole content of the block the driver emits when it is idle.
pub const READY: &str = "ready";

/// A typed event decoded from driver output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverEvent {
    /// Informational text outside any block.
    Banner(String),
    /// The driver is idle and accepts the next command.
    Ready,
    /// `<command>: <value>`
    Value {
        /// Command the line answers.
        command: String,
        /// Everything after `": "`.
        value: String,
    },
    /// `<command>: file=<path>`
    File {
        /// Command the line answers.
        command: String,
        /// Path of a file written by the driver.
        path: String,
    },
    /// `<command>: ok`
    Ok {
        /// Command the line answers.
        command: String,
    },
    /// `<command>: err=<code>`
    Err {
        /// Command the line answers.
        command: String,
        /// Classified error code.
        code: ErrorCode,
    },
    /// A line inside a block that is not a result line.
    Malformed(String),
}

impl DriverEvent {
    /// Command name carried by a result event.
    #[must_use]
    pub fn command(&self) -> Option<&str> {
        match self {
            Self::Value { command, .. }
            | Self::File { command, .. }
            | Self::Ok { command }
            | Self::Err { command, .. } => Some(command),
            Self::Banner(_) | Self::Ready | Self::Malformed(_) => None,
        }
    }

    /// Whether this event completes the response to a command.
    ///
    /// `File` lines accumulate until the command's `ok` arrives.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Value { .. } | Self::Ok { .. } | Self::Err { .. } | Self::Malformed(_)
        )
    }

    /// Reconstruct the wire text of this event for diagnostics.
    #[must_use]
    pub fn raw(&self) -> String {
        match self {
            Self::Banner(text) | Self::Malformed(text) => text.clone(),
            Self::Ready => READY.to_owned(),
            Self::Value { command, value } => format!("{command}: {value}"),
            Self::File { command, path } => format!("{command}: file={path}"),
            Self::Ok { command } => format!("{command}: ok"),
            Self::Err { command, code } => format!("{command}: err={code}"),
        }
    }
}

/// Parse a single line found inside a response block.
#[must_use]
pub fn parse_result_line(line: &str) -> DriverEvent {
    let Some((command, rest)) = line.split_once(": ") else {
        return DriverEvent::Malformed(line.to_owned());
    };

    if command.is_empty() || command.chars().any(char::is_whitespace) {
        return DriverEvent::Malformed(line.to_owned());
    }

    let command = command.to_owned();
    if rest == "ok" {
        DriverEvent::Ok { command }
    } else if let Some(code) = rest.strip_prefix("err=") {
        DriverEvent::Err {
            command,
            code: ErrorCode::classify(code),
        }
    } else if let Some(path) = rest.strip_prefix("file=") {
        DriverEvent::File {
            command,
            path: path.to_owned(),
        }
    } else {
        DriverEvent::Value {
            command,
            value: rest.to_owned(),
        }
    }
}

/// Stateful `<<<>>>` block framer.
///
/// Feed it decoded lines in order; it yields events as each block closes.
#[derive(Debug, Default)]
pub struct BlockParser {
    in_block: bool,
    lines: Vec<String>,
}

impl BlockParser {
    /// Create a parser positioned outside any block.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a block has been opened and not yet closed.
    #[must_use]
    pub fn in_block(&self) -> bool {
        self.in_block
    }

    /// Consume one line of output, returning any completed events.
    pub fn push_line(&mut self, line: &str) -> Vec<DriverEvent> {
        let line = line.trim_end_matches('\r');

        if line == BLOCK_MARKER {
            if self.in_block {
                self.in_block = false;
                return self.close_block();
            }
            self.in_block = true;
            return Vec::new();
        }

        if self.in_block {
            if !line.trim().is_empty() {
                self.lines.push(line.to_owned());
            }
            return Vec::new();
        }

        if line.trim().is_empty() {
            Vec::new()
        } else {
            vec![DriverEvent::Banner(line.to_owned())]
        }
    }

    fn close_block(&mut self) -> Vec<DriverEvent> {
        let lines = std::mem::take(&mut self.lines);
        if lines.len() == 1 && lines[0] == READY {
            return vec![DriverEvent::Ready];
        }
        lines
            .iter()
            .map(String::as_str)
            .map(parse_result_line)
            .collect()
    }
}
