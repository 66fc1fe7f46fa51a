//! Reader Worker Thread Implementation
//!
//! This module contains the main worker loop that runs in a separate thread
//! and owns the telemetry link. It communicates with the consumer through
//! crossbeam channels.
//!
//! # Responsibilities
//!
//! - **Command processing**: Responds to consumer commands (connect, disconnect, etc.)
//! - **Reading**: Pulls whatever bytes the transport has in one non-blocking batch
//! - **Decoding**: Feeds every byte to the connection's [`FrameDecoder`]
//! - **Hand-off**: Sends each decoded sample to the consumer, dropping it if the queue is full
//! - **Statistics tracking**: Publishes byte/frame/error counters every 500 ms
//!
//! # Cancellation
//!
//! The shared running flag is checked once per batch. It is cleared by the
//! owner, by a `Shutdown` command, or when the command channel disconnects.
//! When a batch read returns nothing the worker sleeps `poll_interval_ms`.

use super::serial::SerialTransport;
use super::simulated::{is_simulated_port, SimulatedTransport};
use super::transport::{Transport, TransportStats};
use super::{list_all_ports, BackendCommand, BackendMessage};
use crate::config::SerialConfig;
use crate::protocol::FrameDecoder;
use crate::types::{CollectionStats, ConnectionStatus};
use crossbeam_channel::{Receiver, Sender, TryRecvError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Interval between statistics updates
const STATS_INTERVAL: Duration = Duration::from_millis(500);

/// The reader worker that runs the read/decode loop
pub struct ReaderWorker {
    /// Serial link configuration
    config: SerialConfig,
    /// Command receiver from the consumer
    command_rx: Receiver<BackendCommand>,
    /// Message sender to the consumer
    message_tx: Sender<BackendMessage>,
    /// Running flag
    running: Arc<AtomicBool>,
    /// Link the bytes come from (real or simulated)
    transport: Box<dyn Transport>,
    /// Whether currently using the simulated transport
    is_simulated: bool,
    /// Decoder for the current connection
    decoder: FrameDecoder,
    /// Scratch buffer for batch reads
    read_buf: Vec<u8>,
    /// Current connection status
    connection_status: ConnectionStatus,
    /// Port of the current connection
    port: Option<String>,
    /// Connection start, the zero of sample timestamps
    start_time: Instant,
    /// Counters not kept by the decoder
    stats: CollectionStats,
    /// Last time stats were sent to the consumer
    last_stats_time: Instant,
    /// Frames decoded at the last stats update
    last_stats_frames: u64,
}

impl ReaderWorker {
    /// Create a new reader worker using the real serial transport
    pub fn new(
        config: SerialConfig,
        command_rx: Receiver<BackendCommand>,
        message_tx: Sender<BackendMessage>,
        running: Arc<AtomicBool>,
    ) -> Self {
        let transport: Box<dyn Transport> = Box::new(SerialTransport::new(
            Duration::from_millis(config.open_timeout_ms),
        ));
        let read_buf = vec![0u8; config.read_buffer_size.max(1)];

        Self {
            config,
            command_rx,
            message_tx,
            running,
            transport,
            is_simulated: false,
            decoder: FrameDecoder::new(),
            read_buf,
            connection_status: ConnectionStatus::Disconnected,
            port: None,
            start_time: Instant::now(),
            stats: CollectionStats::default(),
            last_stats_time: Instant::now(),
            last_stats_frames: 0,
        }
    }

    /// Replace the transport (e.g. with a scripted or mocked link)
    pub fn with_transport(mut self, transport: Box<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Run the main worker loop
    pub fn run(&mut self) {
        tracing::info!("Reader worker started");
        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        while self.running.load(Ordering::SeqCst) {
            // Process pending commands
            self.process_commands();

            let mut received = 0;
            if self.connection_status == ConnectionStatus::Connected {
                received = self.poll_transport();

                if self.last_stats_time.elapsed() >= STATS_INTERVAL {
                    self.update_frame_rate();
                    self.send_stats();
                }
            }

            if received == 0 {
                std::thread::sleep(poll_interval);
            }
        }

        // Cleanup
        self.transport.close();

        // The consumer may have stopped draining; never block on the way out
        if self.message_tx.try_send(BackendMessage::Shutdown).is_err() {
            tracing::warn!("Consumer queue full, shutdown notice dropped");
        }
        tracing::info!("Reader worker stopped");
    }

    /// Process pending commands from the consumer
    fn process_commands(&mut self) {
        loop {
            match self.command_rx.try_recv() {
                Ok(cmd) => self.handle_command(cmd),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.running.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }
    }

    /// Handle a single command
    fn handle_command(&mut self, cmd: BackendCommand) {
        match cmd {
            BackendCommand::Connect { port, baud_rate } => {
                self.handle_connect(port, baud_rate);
            }
            BackendCommand::Disconnect => {
                self.handle_disconnect();
            }
            BackendCommand::UseSimulated(use_simulated) => {
                self.use_simulated(use_simulated);
            }
            BackendCommand::RefreshPorts => {
                self.refresh_ports();
            }
            BackendCommand::RequestStats => {
                self.send_stats();
            }
            BackendCommand::ResetDecoder => {
                self.decoder.reset();
                tracing::debug!("Decoder reset on request");
            }
            BackendCommand::Shutdown => {
                self.running.store(false, Ordering::SeqCst);
            }
        }
    }

    /// Swap between the real and the simulated transport
    fn use_simulated(&mut self, use_simulated: bool) {
        if use_simulated == self.is_simulated {
            return;
        }

        // Disconnect current link if connected
        if self.connection_status != ConnectionStatus::Disconnected {
            self.handle_disconnect();
        }

        if use_simulated {
            self.transport = Box::new(SimulatedTransport::default());
            tracing::info!("Switched to simulated transport");
        } else {
            self.transport = Box::new(SerialTransport::new(Duration::from_millis(
                self.config.open_timeout_ms,
            )));
            tracing::info!("Switched to serial transport");
        }
        self.is_simulated = use_simulated;
    }

    /// Refresh the port list and send it to the consumer
    fn refresh_ports(&self) {
        let ports = list_all_ports();
        let _ = self.message_tx.send(BackendMessage::PortList(ports));
    }

    /// Handle connect command
    fn handle_connect(&mut self, port: String, baud_rate: u32) {
        if self.connection_status == ConnectionStatus::Connected {
            self.handle_disconnect();
        }
        if is_simulated_port(&port) && !self.is_simulated {
            self.use_simulated(true);
        }

        self.update_connection_status(ConnectionStatus::Connecting);

        match self.transport.open(&port, baud_rate) {
            Ok(()) => {
                // One decoder per connection
                self.decoder = FrameDecoder::new();
                self.stats = CollectionStats::default();
                self.start_time = Instant::now();
                self.last_stats_time = self.start_time;
                self.last_stats_frames = 0;
                self.port = Some(port.clone());

                self.update_connection_status(ConnectionStatus::Connected);
                tracing::info!("Connected to {} @ {} baud", port, baud_rate);
            }
            Err(e) => {
                self.update_connection_status(ConnectionStatus::Error);
                let error_msg = format!("Failed to connect: {}", e);
                tracing::error!("{}", error_msg);
                let _ = self
                    .message_tx
                    .send(BackendMessage::ConnectionError(error_msg));
            }
        }
    }

    /// Handle disconnect command
    fn handle_disconnect(&mut self) {
        self.transport.close();
        self.port = None;
        self.update_connection_status(ConnectionStatus::Disconnected);
        tracing::info!("Disconnected");
    }

    /// Read one batch and decode it. Returns the number of bytes read.
    fn poll_transport(&mut self) -> usize {
        let n = match self.transport.read(&mut self.read_buf) {
            Ok(n) => n,
            Err(e) => {
                self.stats.read_errors += 1;
                self.handle_link_lost(e.to_string());
                return 0;
            }
        };

        for i in 0..n {
            if let Some(sample) = self.decoder.feed(self.read_buf[i]) {
                let timestamp = self.start_time.elapsed();
                self.send_sample(BackendMessage::Sample { timestamp, sample });
            }
        }

        if n > 0 {
            tracing::trace!("Read {} bytes", n);
        }
        n
    }

    /// The transport failed mid-session
    fn handle_link_lost(&mut self, reason: String) {
        let port = self.port.take().unwrap_or_default();
        tracing::error!("Lost link on {}: {}", port, reason);
        self.transport.close();
        self.update_connection_status(ConnectionStatus::Error);
        let _ = self
            .message_tx
            .send(BackendMessage::ConnectionError(format!("Link lost: {}", reason)));
    }

    /// Recompute the frame rate over the last stats interval
    fn update_frame_rate(&mut self) {
        let now = Instant::now();
        let dt = now.duration_since(self.last_stats_time).as_secs_f64();
        let frames = self.decoder.stats().frames_decoded;
        if dt > 0.0 {
            self.stats.frame_rate_hz = frames.saturating_sub(self.last_stats_frames) as f64 / dt;
        }
        self.last_stats_frames = frames;
        self.last_stats_time = now;
    }

    /// Current counters, merged from the worker and the decoder
    fn collection_stats(&self) -> CollectionStats {
        let decoder = self.decoder.stats();
        let link = if self.port.is_some() {
            self.transport.stats()
        } else {
            TransportStats::default()
        };
        CollectionStats {
            reads: link.reads,
            empty_reads: link.empty_reads,
            bytes_received: decoder.bytes_processed,
            frames_decoded: decoder.frames_decoded,
            sync_errors: decoder.sync_errors,
            length_errors: decoder.length_errors,
            checksum_errors: decoder.checksum_errors,
            ..self.stats
        }
    }

    /// Update connection status and notify the consumer
    fn update_connection_status(&mut self, status: ConnectionStatus) {
        self.connection_status = status;
        let _ = self
            .message_tx
            .send(BackendMessage::ConnectionStatus(status));
    }

    /// Send statistics to the consumer (using try_send for backpressure)
    fn send_stats(&mut self) {
        let stats = self.collection_stats();
        if self.message_tx.try_send(BackendMessage::Stats(stats)).is_err() {
            tracing::trace!("Consumer queue full, stats update skipped");
        }
    }

    /// Hand a sample to the consumer without blocking
    ///
    /// If the queue is full the sample is dropped and counted in
    /// `dropped_samples`.
    fn send_sample(&mut self, msg: BackendMessage) {
        if self.message_tx.try_send(msg).is_err() {
            self.stats.dropped_samples += 1;
        }
    }
}
