#![forbid(unsafe_code)]

//! `plustek-ctl`: run one scanner operation through `plustekctl`.
//!
//! Connects to the driver, performs the requested operation, prints the
//! result as JSON on stdout, and asks the driver to quit. Logs go to stderr.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use plustek_client::{ClientConfig, ClientError, LoggingObserver, Result, RetryLimit, ScannerClient};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "plustek-ctl", about = "Drive a Plustek document scanner", version, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file; built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the `plustekctl` binary, overriding the config file.
    #[arg(long)]
    driver: Option<PathBuf>,

    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Report the paper sensor state.
    PaperStatus,
    /// Scan the sheet in the feeder.
    Scan {
        /// Retry a failed scan up to this many times.
        #[arg(long, default_value_t = 0)]
        retries: u32,
        /// Delay between scan attempts, in milliseconds.
        #[arg(long, default_value_t = 0)]
        retry_delay_ms: u64,
    },
    /// Calibrate the feeder.
    Calibrate,
    /// Eject the sheet into the output tray.
    Accept,
    /// Return the sheet to the user.
    Reject {
        /// Keep the sheet gripped in the feeder.
        #[arg(long)]
        hold: bool,
    },
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_tracing(args.log_format)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| ClientError::Io(format!("failed to build tokio runtime: {err}")))?
        .block_on(run(args))
}

async fn run(args: Cli) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => ClientConfig::load_from_path(path)?,
        None => ClientConfig::default(),
    };
    if let Some(driver) = args.driver {
        config.driver_path = Some(driver);
    }

    let client = ScannerClient::connect(&config, Arc::new(LoggingObserver)).await?;

    let outcome = tokio::select! {
        result = execute(&client, args.command) => Some(result),
        () = shutdown_signal() => None,
    };

    let Some(outcome) = outcome else {
        warn!("shutdown signal received, killing plustekctl");
        client.kill()?;
        client.wait_for_disconnect().await;
        return Ok(());
    };

    if client.is_connected() {
        if let Err(err) = client.close().await {
            warn!(%err, "plustekctl did not quit cleanly");
        }
    }
    let exit = client.wait_for_disconnect().await;
    info!(%exit, "plustekctl stopped");

    let value = outcome?;
    println!("{value}");
    Ok(())
}

async fn execute(client: &ScannerClient, command: Command) -> Result<Value> {
    match command {
        Command::PaperStatus => {
            let status = client.get_paper_status().await?;
            Ok(json!({
                "status": status.as_str(),
                "ready_to_scan": status.is_ready_to_scan(),
                "ready_to_eject": status.is_ready_to_eject(),
            }))
        }
        Command::Scan {
            retries,
            retry_delay_ms,
        } => {
            let mut policy = RetryLimit::new(retries).with_delay(Duration::from_millis(retry_delay_ms));
            let sheet = client.scan_with(&mut policy).await?;
            serde_json::to_value(&sheet)
                .map_err(|err| ClientError::Io(format!("failed to encode scan result: {err}")))
        }
        Command::Calibrate => {
            client.calibrate().await?;
            Ok(json!({ "calibrated": true }))
        }
        Command::Accept => {
            client.accept().await?;
            Ok(json!({ "accepted": true }))
        }
        Command::Reject { hold } => {
            client.reject(hold).await?;
            Ok(json!({ "rejected": true, "hold": hold }))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                warn!(%err, "failed to register SIGTERM handler, using ctrl-c only");
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            tracing::error!(%err, "ctrl-c signal handler failed");
        }
    }
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| ClientError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| ClientError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
