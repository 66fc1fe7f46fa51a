//! PID Telemetry Visualizer - Main Entry Point
//!
//! Headless front end: lists ports, or connects to a port (or the simulator),
//! drives a plot session and logs the live viewport and link statistics.

use anyhow::{bail, Context};
use clap::Parser;
use pidvis_rs::{
    backend::{list_all_ports, SIMULATED_PORT},
    config::{AppConfig, AppState},
    ConnectionStatus, PlotSession, SerialBackend,
};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// How often the viewport and stats are reported
const REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Sleep between message drains
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

#[derive(Parser)]
#[command(name = "pidvis")]
#[command(about = "Plot PID controller telemetry from a serial link")]
#[command(version)]
struct Args {
    /// Print detected ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Serial port to open (overrides the config file)
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate (overrides the config file)
    #[arg(short, long)]
    baud: Option<u32>,

    /// Use the simulated PID loop instead of a serial port
    #[arg(long)]
    simulate: bool,

    /// Config file path (default: platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Stop after this many seconds (0 = until the link drops)
    #[arg(short, long, default_value = "0")]
    duration: u64,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

/// Install the global subscriber; the returned guard flushes the file writer on drop
fn init_logging(log_file: Option<&Path>) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .map(|n| n.to_os_string())
                .unwrap_or_else(|| "pidvis.log".into());
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,pidvis_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    guard
}

fn print_ports() {
    let ports = list_all_ports();
    for port in &ports {
        println!("{}", port.display_name());
    }
}

/// Pick the port: simulator flag, then CLI, then config, then last used
fn resolve_port(args: &Args, config: &AppConfig, state: &AppState) -> Option<String> {
    if args.simulate {
        return Some(SIMULATED_PORT.to_string());
    }
    args.port
        .clone()
        .or_else(|| Some(config.serial.port.clone()).filter(|p| !p.is_empty()))
        .or_else(|| state.last_port.clone())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(args.log_file.as_deref());

    if args.list_ports {
        print_ports();
        return Ok(());
    }

    tracing::info!("Starting PID telemetry visualizer");

    let config = AppConfig::load(args.config.as_deref()).context("Failed to load config")?;
    let mut app_state = AppState::load_or_default();

    let Some(port) = resolve_port(&args, &config, &app_state) else {
        bail!("No port given; use --port, --simulate, or set serial.port in the config");
    };
    let baud_rate = args.baud.unwrap_or(config.serial.baud_rate);

    // Spawn the reader thread
    let (backend, frontend) = SerialBackend::new(config.serial.clone());
    let backend_handle = backend.spawn().context("Failed to spawn reader thread")?;

    let mut session = PlotSession::new(&config, frontend).context("Invalid plot config")?;
    session.connect(&port, baud_rate);

    let deadline = (args.duration > 0).then(|| Instant::now() + Duration::from_secs(args.duration));
    let mut last_report = Instant::now();
    let mut was_connected = false;
    let mut failure = None;

    loop {
        session.process_backend_messages();

        match session.connection_status() {
            ConnectionStatus::Connected if !was_connected => {
                was_connected = true;
                app_state.record_connection(&port, baud_rate);
                if let Err(e) = app_state.save() {
                    tracing::warn!("Failed to save app state: {}", e);
                }
            }
            ConnectionStatus::Error => {
                failure = Some(
                    session
                        .last_error()
                        .unwrap_or("connection error")
                        .to_string(),
                );
                break;
            }
            _ => {}
        }

        if last_report.elapsed() >= REPORT_INTERVAL {
            last_report = Instant::now();
            session.frontend().request_stats();

            let view = session.viewport();
            let stats = session.stats();
            tracing::info!(
                "t={:.2}s x=[{:.2}, {:.2}] y=[{:.3}, {:.3}] frames={} errors={} dropped={} rate={:.1} Hz",
                session.store().elapsed(),
                view.x.min,
                view.x.max,
                view.y.min,
                view.y.max,
                stats.frames_decoded,
                stats.frame_errors(),
                stats.dropped_samples,
                stats.frame_rate_hz,
            );
        }

        if deadline.is_some_and(|d| Instant::now() >= d) {
            break;
        }

        std::thread::sleep(FRAME_INTERVAL);
    }

    // Signal backend to stop and wait for it
    tracing::info!("Shutting down...");
    session.shutdown();
    if backend_handle.join().is_err() {
        tracing::error!("Reader thread panicked");
    }

    if let Some(reason) = failure {
        bail!(reason);
    }
    Ok(())
}
