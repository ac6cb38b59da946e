// src/main.rs - Printer control host
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serial2_tokio::SerialPort;
use tokio::sync::mpsc;

use printer_control::channel::{self, QueuedChannel};
use printer_control::config::{self, Config};
use printer_control::preheat::MonotonicClock;
use printer_control::request::{self, ControlRequest};
use printer_control::service::{ControlService, ControlStatus};

/// Reads JSON control requests from stdin, one per line, and drives the printer.
#[derive(Parser, Debug)]
#[command(
    name = "printer-control",
    about = "Job, manual and pre-heat control for a connected printer."
)]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log device commands instead of writing them to the serial port
    #[arg(long)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries status replies.
    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting printer-control {}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            config::load_config(&path.to_string_lossy()).map_err(|e| {
                tracing::error!("Failed to load config from '{}': {}", path.display(), e);
                Box::new(e) as Box<dyn std::error::Error + Send + Sync + 'static>
            })?
        }
        None => Config::default(),
    };
    tracing::info!(
        "Printer: {} ({} extruders)",
        config.printer.name,
        config.printer.extruders
    );

    let (queued, outgoing) = QueuedChannel::new();
    let writer = match (&config.device.serial, cli.dry_run) {
        (Some(port_name), false) => {
            tracing::info!("Opening {} at {} baud", port_name, config.device.baud);
            let port = SerialPort::open(port_name, config.device.baud).map_err(|e| {
                tracing::error!("Failed to open serial port '{}': {}", port_name, e);
                e
            })?;
            channel::spawn_serial_writer(port, outgoing)
        }
        _ => {
            tracing::info!("No serial device in use, logging commands only");
            channel::spawn_log_writer(outgoing)
        }
    };

    let service = ControlService::new(&config, Arc::new(queued), Arc::new(MonotonicClock::new()));

    let (request_tx, request_rx) = mpsc::channel::<ControlRequest>(16);
    let (status_tx, mut status_rx) = mpsc::unbounded_channel::<ControlStatus>();

    // Stdin is read on its own thread; shutdown after ctrl-c must not wait
    // on a pending read.
    request::spawn_request_reader(std::io::BufReader::new(std::io::stdin()), request_tx);

    tokio::spawn(async move {
        while let Some(status) = status_rx.recv().await {
            match serde_json::to_string(&status) {
                Ok(json) => println!("{}", json),
                Err(e) => tracing::error!("Failed to encode status: {}", e),
            }
        }
    });

    tokio::select! {
        _ = service.run(request_rx, status_tx) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
        }
    }

    // The service held the last channel handles; the writer drains and exits.
    if let Err(e) = writer.await {
        tracing::error!("Command writer failed: {}", e);
    }
    Ok(())
}
