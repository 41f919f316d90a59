//! `plustekctl` line protocol.
//!
//! - `codec`: [`LinesCodec`](tokio_util::codec::LinesCodec)-based line framing
//!   of the driver's stdout.
//! - `parser`: `<<<>>>` block framing and result-line parsing into
//!   [`DriverEvent`](parser::DriverEvent)s.
//! - `command`: the bare keywords written to stdin.

pub mod codec;
pub mod command;
pub mod parser;

pub use command::DriverCommand;
pub use parser::{BlockParser, DriverEvent};
