//! # PidVis-RS: Serial Telemetry Visualizer for PID Tuning
//!
//! A real-time plotting backend for PID controller telemetry streamed over a
//! serial link. The architecture separates the link-reading backend from the
//! consumer that owns the plot data.
//!
//! ## Architecture
//!
//! - **Protocol**: Byte-at-a-time COBS frame decoder with CRC-16/XMODEM validation
//! - **Backend**: Reads the serial port (or a simulator) in a separate thread
//! - **Series**: Time-windowed per-channel buffers and live viewport ranges
//! - **Communication**: Crossbeam channels for thread-safe data transfer
//!
//! Data flows transport bytes → [`FrameDecoder`] → [`TelemetrySample`] →
//! channel → [`PlotSession`] → [`WindowedSeriesStore`] → viewport.
//!
//! ## Configuration
//!
//! The config file (`config.toml`) lives in the platform config directory
//! and app state (`app_state.json`) in the platform data directory, both under
//! `dev.pidvis.pidvis-rs`.
//!
//! ## Example
//!
//! ```ignore
//! use pidvis_rs::{AppConfig, PlotSession, SerialBackend};
//!
//! let config = AppConfig::load_or_default(None);
//! let (backend, frontend) = SerialBackend::new(config.serial.clone());
//! let handle = backend.spawn()?;
//!
//! let mut session = PlotSession::new(&config, frontend)?;
//! session.connect("/dev/ttyACM0", config.serial.baud_rate);
//!
//! loop {
//!     session.process_backend_messages();
//!     let view = session.viewport();
//!     for (channel, points) in session.store().iter_series() {
//!         // draw points.as_plot_points() within view
//!     }
//! }
//! ```

pub mod app;
pub mod backend;
pub mod config;
pub mod error;
pub mod protocol;
pub mod series;
pub mod types;

// Re-export commonly used types
pub use app::PlotSession;
pub use backend::{BackendCommand, BackendMessage, FrontendReceiver, SerialBackend};
pub use config::{AppConfig, AppState};
pub use error::{PidVisError, Result};
pub use protocol::{FrameDecoder, FrameError};
pub use series::{Channel, Viewport, WindowSpec, WindowedSeriesStore, YRangeMode};
pub use types::{CollectionStats, ConnectionStatus, SampleField, TelemetrySample};
