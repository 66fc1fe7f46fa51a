//! Backend module for reading the serial telemetry link
//!
//! This module handles all link I/O and frame decoding in a separate thread so
//! the consumer never blocks. It uses crossbeam channels for thread-safe
//! communication with the consumer.
//!
//! # Architecture
//!
//! The backend runs in a separate thread from the consumer, communicating via channels:
//!
//! - [`BackendCommand`] - Messages sent from the consumer to the backend (connect, disconnect, etc.)
//! - [`BackendMessage`] - Messages sent from the backend to the consumer (samples, status, errors)
//! - [`FrontendReceiver`] - Consumer-side handle for sending commands and receiving messages
//! - [`SerialBackend`] - Main backend entry point that owns the worker
//!
//! # Components
//!
//! - [`Transport`] - Trait over byte links
//! - [`SerialTransport`] - Real serial port via the serialport crate
//! - [`SimulatedTransport`] - Synthetic PID loop for running without hardware
//! - [`ReaderWorker`] - Main worker loop that reads, decodes and forwards samples
//!
//! # Example
//!
//! ```ignore
//! use pidvis_rs::backend::{BackendMessage, SerialBackend};
//! use pidvis_rs::config::SerialConfig;
//!
//! let (backend, frontend) = SerialBackend::new(SerialConfig::default());
//! let handle = backend.spawn()?;
//!
//! frontend.connect("/dev/ttyACM0", 115_200);
//!
//! for msg in frontend.drain() {
//!     if let BackendMessage::Sample { timestamp, sample } = msg {
//!         // Handle new sample
//!     }
//! }
//!
//! frontend.shutdown();
//! handle.join().ok();
//! ```

pub mod serial;
pub mod simulated;
pub mod transport;
pub mod worker;

pub use serial::SerialTransport;
pub use simulated::{is_simulated_port, SimulatedTransport, SimulationConfig, SIMULATED_PORT};
pub use transport::{DetectedPort, PortKind, Transport, TransportStats};
pub use worker::ReaderWorker;

use crate::config::SerialConfig;
use crate::types::{CollectionStats, ConnectionStatus, TelemetrySample};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Capacity of the consumer → backend command queue
const COMMAND_QUEUE_SIZE: usize = 256;

/// Message sent from the consumer to the backend
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCommand {
    /// Open a port
    Connect {
        /// Port name; `sim://...` selects the simulator
        port: String,
        /// Baud rate
        baud_rate: u32,
    },
    /// Close the current port
    Disconnect,
    /// Use the simulated transport instead of real hardware
    UseSimulated(bool),
    /// Request port list refresh
    RefreshPorts,
    /// Request current statistics
    RequestStats,
    /// Drop any partial frame in the decoder
    ResetDecoder,
    /// Shutdown the backend
    Shutdown,
}

/// Message sent from the backend to the consumer
#[derive(Debug, Clone)]
pub enum BackendMessage {
    /// Connection status changed
    ConnectionStatus(ConnectionStatus),
    /// Connection error occurred
    ConnectionError(String),
    /// A frame passed validation
    Sample {
        /// Time since the connection was opened
        timestamp: Duration,
        sample: TelemetrySample,
    },
    /// Port list update (response to RefreshPorts)
    PortList(Vec<DetectedPort>),
    /// Statistics update
    Stats(CollectionStats),
    /// Backend is shutting down
    Shutdown,
}

/// List all available ports (real + simulated)
///
/// Enumeration can be slow on some systems; call it from the worker thread.
pub fn list_all_ports() -> Vec<DetectedPort> {
    let mut ports = SerialTransport::available_ports().unwrap_or_else(|e| {
        tracing::warn!("Port enumeration failed: {}", e);
        Vec::new()
    });
    ports.push(simulated::simulated_port());
    ports
}

/// Frontend receiver for backend messages
pub struct FrontendReceiver {
    /// Receiver for backend messages
    pub receiver: Receiver<BackendMessage>,
    /// Sender for commands to the backend
    pub command_sender: Sender<BackendCommand>,
}

impl FrontendReceiver {
    /// Try to receive a message without blocking
    pub fn try_recv(&self) -> Option<BackendMessage> {
        self.receiver.try_recv().ok()
    }

    /// Wait up to `timeout` for a message
    ///
    /// Returns `None` on timeout or once the backend is gone.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<BackendMessage> {
        match self.receiver.recv_timeout(timeout) {
            Ok(msg) => Some(msg),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Receive all pending messages
    pub fn drain(&self) -> Vec<BackendMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.receiver.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Send a command to the backend
    pub fn send_command(&self, cmd: BackendCommand) -> bool {
        self.command_sender.send(cmd).is_ok()
    }

    /// Request connection to a port
    pub fn connect(&self, port: impl Into<String>, baud_rate: u32) {
        let _ = self.command_sender.send(BackendCommand::Connect {
            port: port.into(),
            baud_rate,
        });
    }

    /// Request disconnection
    pub fn disconnect(&self) {
        let _ = self.command_sender.send(BackendCommand::Disconnect);
    }

    /// Set whether to use the simulated transport
    pub fn use_simulated(&self, use_simulated: bool) {
        let _ = self
            .command_sender
            .send(BackendCommand::UseSimulated(use_simulated));
    }

    /// Request a port list
    pub fn refresh_ports(&self) {
        let _ = self.command_sender.send(BackendCommand::RefreshPorts);
    }

    /// Request a statistics snapshot
    pub fn request_stats(&self) {
        let _ = self.command_sender.send(BackendCommand::RequestStats);
    }

    /// Request shutdown
    pub fn shutdown(&self) {
        let _ = self.command_sender.send(BackendCommand::Shutdown);
    }
}

/// The serial backend that runs in a separate thread
pub struct SerialBackend {
    /// Configuration
    config: SerialConfig,
    /// Receiver for commands from the consumer
    command_receiver: Receiver<BackendCommand>,
    /// Sender for messages to the consumer
    message_sender: Sender<BackendMessage>,
    /// Running flag
    running: Arc<AtomicBool>,
    /// Transport to use instead of the default serial port
    transport: Option<Box<dyn Transport>>,
}

impl SerialBackend {
    /// Create a new serial backend with communication channels
    pub fn new(config: SerialConfig) -> (Self, FrontendReceiver) {
        let (cmd_tx, cmd_rx) = bounded(COMMAND_QUEUE_SIZE);
        // Bounded for backpressure: samples are dropped, not buffered, if the consumer stalls
        let (msg_tx, msg_rx) = bounded(config.channel_buffer_size.max(1));

        let backend = Self {
            config,
            command_receiver: cmd_rx,
            message_sender: msg_tx,
            running: Arc::new(AtomicBool::new(true)),
            transport: None,
        };

        let frontend = FrontendReceiver {
            receiver: msg_rx,
            command_sender: cmd_tx,
        };

        (backend, frontend)
    }

    /// Use a specific transport (e.g. a scripted simulator)
    pub fn with_transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Run the backend loop on the current thread
    pub fn run(self) {
        let mut worker = ReaderWorker::new(
            self.config,
            self.command_receiver,
            self.message_sender,
            self.running,
        );
        if let Some(transport) = self.transport {
            worker = worker.with_transport(transport);
        }
        worker.run();
    }

    /// Run the backend loop on a new named thread
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("pidvis-reader".to_string())
            .spawn(move || self.run())
    }

    /// Get a handle to stop the backend
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }
}
