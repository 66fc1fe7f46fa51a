//! Consumer-side session
//!
//! [`PlotSession`] is the single consumer context of the pipeline. It drains
//! the backend's messages, maps each sample's fields onto named channels,
//! feeds them to a [`WindowedSeriesStore`] and keeps the latest link status
//! and statistics for display.
//!
//! ```ignore
//! let config = AppConfig::load_or_default(None);
//! let (backend, frontend) = SerialBackend::new(config.serial.clone());
//! let _worker = backend.spawn()?;
//!
//! let mut session = PlotSession::new(&config, frontend)?;
//! session.connect(SIMULATED_PORT, 115_200);
//! loop {
//!     session.process_backend_messages();
//!     let view = session.viewport();
//!     // render view and session.store().iter_series()
//! }
//! ```

use crate::backend::{BackendMessage, DetectedPort, FrontendReceiver};
use crate::config::AppConfig;
use crate::error::Result;
use crate::series::{Viewport, WindowedSeriesStore};
use crate::types::{CollectionStats, ConnectionStatus, TelemetrySample};
use std::collections::HashMap;
use std::time::Duration;

/// Consumer of backend messages driving a series store
pub struct PlotSession {
    frontend: FrontendReceiver,
    store: WindowedSeriesStore,
    connection_status: ConnectionStatus,
    last_error: Option<String>,
    stats: CollectionStats,
    available_ports: Vec<DetectedPort>,
    samples_received: u64,
    /// Backend timestamp of the newest sample
    last_sample_time: Option<Duration>,
    /// Start plotting when the link comes up
    auto_start: bool,
}

impl PlotSession {
    /// Create a session with the config's window and channels
    pub fn new(config: &AppConfig, frontend: FrontendReceiver) -> Result<Self> {
        let store = config.build_store()?;
        Ok(Self::with_store(store, frontend))
    }

    /// Create a session around an existing store
    pub fn with_store(store: WindowedSeriesStore, frontend: FrontendReceiver) -> Self {
        Self {
            frontend,
            store,
            connection_status: ConnectionStatus::Disconnected,
            last_error: None,
            stats: CollectionStats::default(),
            available_ports: Vec::new(),
            samples_received: 0,
            last_sample_time: None,
            auto_start: true,
        }
    }

    /// Whether plotting starts automatically on connect
    pub fn with_auto_start(mut self, auto_start: bool) -> Self {
        self.auto_start = auto_start;
        self
    }

    /// Handle every pending backend message. Returns `true` if there were any.
    pub fn process_backend_messages(&mut self) -> bool {
        let messages = self.frontend.drain();
        let had_messages = !messages.is_empty();

        for msg in messages {
            self.handle_message(msg);
        }

        had_messages
    }

    /// Handle a single backend message
    pub fn handle_message(&mut self, msg: BackendMessage) {
        match msg {
            BackendMessage::ConnectionStatus(status) => {
                self.connection_status = status;
                if status == ConnectionStatus::Connected {
                    self.last_error = None;
                    if self.auto_start && !self.store.is_running() {
                        self.store.start();
                    }
                }
            }
            BackendMessage::ConnectionError(err) => {
                self.last_error = Some(err);
                self.connection_status = ConnectionStatus::Error;
            }
            BackendMessage::Sample { timestamp, sample } => {
                self.ingest_sample(&sample);
                self.last_sample_time = Some(timestamp);
            }
            BackendMessage::PortList(ports) => {
                tracing::info!("Received {} ports", ports.len());
                self.available_ports = ports;
            }
            BackendMessage::Stats(stats) => {
                self.stats = stats;
            }
            BackendMessage::Shutdown => {
                tracing::info!("Backend shutdown received");
            }
        }
    }

    /// Map a sample's fields onto the store's field-bound channels and ingest them
    pub fn ingest_sample(&mut self, sample: &TelemetrySample) {
        self.samples_received += 1;
        let values: HashMap<String, f64> = self
            .store
            .channels()
            .filter_map(|c| c.field.map(|f| (c.name.clone(), sample.get(f) as f64)))
            .collect();
        self.store.ingest(&values);
    }

    // ==================== Commands ====================

    /// Ask the backend to open a port
    pub fn connect(&self, port: &str, baud_rate: u32) {
        self.frontend.connect(port, baud_rate);
    }

    /// Ask the backend to close the port
    pub fn disconnect(&self) {
        self.frontend.disconnect();
    }

    /// Ask the backend for a port list
    pub fn refresh_ports(&self) {
        self.frontend.refresh_ports();
    }

    /// Ask the backend to stop
    pub fn shutdown(&self) {
        self.frontend.shutdown();
    }

    /// Begin plotting
    pub fn start_plotting(&mut self) {
        self.store.start();
    }

    /// Stop plotting and clear the plot
    pub fn stop_plotting(&mut self) {
        self.store.stop();
    }

    // ==================== Accessors ====================

    /// Current axis ranges
    pub fn viewport(&self) -> Viewport {
        self.store.query_view()
    }

    pub fn store(&self) -> &WindowedSeriesStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut WindowedSeriesStore {
        &mut self.store
    }

    pub fn frontend(&self) -> &FrontendReceiver {
        &self.frontend
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection_status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Latest statistics published by the backend
    pub fn stats(&self) -> &CollectionStats {
        &self.stats
    }

    pub fn available_ports(&self) -> &[DetectedPort] {
        &self.available_ports
    }

    /// Samples received since the session was created
    pub fn samples_received(&self) -> u64 {
        self.samples_received
    }

    /// Backend timestamp of the newest sample
    pub fn last_sample_time(&self) -> Option<Duration> {
        self.last_sample_time
    }
}
