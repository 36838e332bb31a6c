//! statusboard - rotate service status values on a 16x2 character display.
//!
//! Loads the configuration, opens the display and sensors, starts the board
//! schedulers and serves the HTTP API until Ctrl+C, SIGTERM or a display
//! failure. A display failure exits with a non-zero status.
//!
//! See `statusboard --help` for usage information.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::sync::oneshot;
use tracing::Level;

use statusboard::board::StatusBoard;
use statusboard::config::BoardConfig;
use statusboard::logging::{LogConfig, LogFormat, init_logging};
use statusboard::{device, http, telemetry};

const AFTER_HELP: &str = "\
EXAMPLES:
  statusboard                         Console display, 127.0.0.1:8485
  statusboard board.toml              Settings from a TOML file
  statusboard legacy.json             Flat {host, port, rs, e, data} file
  statusboard --host 0.0.0.0 -v       Listen everywhere, debug logging

  curl -X PUT localhost:8485/v1/status/backup \\
       -H 'content-type: application/json' \\
       -d '{\"value\": \"OK\", \"expire\": 60000}'";

#[derive(Parser)]
#[command(name = "statusboard")]
#[command(version)]
#[command(about = "Rotate service status values on a 16x2 character display")]
#[command(after_help = AFTER_HELP)]
struct Cli {
    /// Configuration file (TOML, or the flat JSON format for *.json)
    config: Option<PathBuf>,

    /// Override the listen host
    #[arg(long)]
    host: Option<String>,

    /// Override the listen port
    #[arg(long)]
    port: Option<u16>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Override the log format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

/// Why the main loop stopped.
enum Stop {
    Signal,
    Board(statusboard::Result<()>),
    Server(Result<()>),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config =
        BoardConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        config.logging.level()?
    };
    init_logging(
        &LogConfig::default()
            .format(cli.log_format.unwrap_or(config.logging.format))
            .level(level),
    );

    run(config).await
}

async fn run(config: BoardConfig) -> Result<()> {
    let addr = resolve(&config.server.host, config.server.port).await?;

    telemetry::init_metrics().context("Failed to install Prometheus recorder")?;
    tracing::debug!("Prometheus metrics initialized");

    let display = device::open_display(&config.display).context("Failed to open display")?;
    let (temperature, usage) = device::open_sensors(&config.sensors);

    let board = StatusBoard::new(display, config.board.clone());
    let mut tasks = match board.start(temperature, usage).await {
        Ok(tasks) => tasks,
        Err(e) => {
            release(&board).await;
            return Err(e).context("Failed to start board");
        },
    };

    let (stop_server, server_stopped) = oneshot::channel::<()>();
    let mut server = tokio::spawn(http::serve(addr, board.registry().clone(), async move {
        let _ = server_stopped.await;
    }));

    let stop = tokio::select! {
        () = http::shutdown_signal() => Stop::Signal,
        exit = tasks.next_exit() => Stop::Board(exit),
        joined = &mut server => Stop::Server(joined.context("HTTP server task failed").and_then(|r| r)),
    };

    let _ = stop_server.send(());
    let (board_exit, server_outcome) = match stop {
        Stop::Signal => (None, join_server(server).await),
        Stop::Board(exit) => (Some(exit), join_server(server).await),
        Stop::Server(outcome) => (None, outcome),
    };

    tasks.shutdown().await;
    release(&board).await;

    match board_exit {
        Some(Err(e)) => {
            tracing::error!(error = %e, "Display failure, exiting");
            return Err(e).context("Board halted");
        },
        Some(Ok(())) => bail!("A board scheduler stopped unexpectedly"),
        None => {},
    }
    server_outcome?;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn join_server(server: tokio::task::JoinHandle<Result<()>>) -> Result<()> {
    server.await.context("HTTP server task failed")?
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("Failed to resolve {host}:{port}"))?
        .next()
        .with_context(|| format!("No address found for {host}:{port}"))
}

async fn release(board: &StatusBoard) {
    if let Err(e) = board.close().await {
        tracing::warn!(error = %e, "Failed to release display");
    }
}
