#![forbid(unsafe_code)]

//! Client for the `plustekctl` document-feed scanner driver.
//!
//! The driver runs as a child process and speaks a line protocol over its
//! stdio. [`ScannerClient`] spawns it, waits for its handshake, and exposes
//! the scanner operations as typed, ordered, `Result`-returning futures.

pub mod client;
pub mod config;
pub mod connection;
pub mod errors;
pub mod models;
pub mod process;
pub mod protocol;

pub use client::{RetryLimit, ScanRetryPolicy, ScannerClient};
pub use config::ClientConfig;
pub use connection::{ConnectionObserver, ConnectionState, LoggingObserver, NoopObserver};
pub use errors::{ClientError, Result};
pub use models::paper_status::PaperStatus;
pub use models::scan::ScannedSheet;
pub use models::scanner_error::{ErrorCode, ScannerError};
