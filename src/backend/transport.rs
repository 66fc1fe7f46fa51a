//! Transport trait for a unified byte-link interface
//!
//! This module provides a common trait for everything the reader worker can
//! pull telemetry bytes from: a real serial port (via the serialport crate)
//! and the simulated PID loop used for demos and tests.

use crate::error::Result;

/// Counters kept by a transport since it was last opened
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Number of successful `read` calls that returned data
    pub reads: u64,
    /// Number of `read` calls that returned no data
    pub empty_reads: u64,
    /// Number of failed `read` calls
    pub read_errors: u64,
    /// Total bytes returned by `read`
    pub bytes_read: u64,
}

impl TransportStats {
    /// Record the outcome of one read
    pub fn record_read(&mut self, bytes: usize) {
        if bytes == 0 {
            self.empty_reads += 1;
        } else {
            self.reads += 1;
            self.bytes_read += bytes as u64;
        }
    }

    /// Record a failed read
    pub fn record_failure(&mut self) {
        self.read_errors += 1;
    }
}

/// Unified interface for telemetry byte links
///
/// Implementations must be `Send` so the reader worker can own them on its
/// own thread. `read` must never block for longer than the link's configured
/// timeout.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send {
    /// Open the link
    ///
    /// Fails with [`PidVisError::Connection`](crate::error::PidVisError::Connection)
    /// if the port is busy or absent.
    fn open(&mut self, port: &str, baud_rate: u32) -> Result<()>;

    /// Copy whatever bytes are available into `buf` without blocking.
    ///
    /// Returns the number of bytes written, which may be zero. An error means
    /// the link is gone.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Close the link; closing a closed link is a no-op
    fn close(&mut self);

    /// Check if the link is open
    fn is_open(&self) -> bool;

    /// Counters since the last successful `open`
    fn stats(&self) -> TransportStats;
}

/// Kind of a detected port
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortKind {
    /// USB serial adapter or native USB CDC device
    Usb {
        /// Vendor ID
        vendor_id: u16,
        /// Product ID
        product_id: u16,
        /// Serial number (if available)
        serial_number: Option<String>,
        /// Manufacturer string (if available)
        manufacturer: Option<String>,
        /// Product string (if available)
        product: Option<String>,
    },
    Bluetooth,
    Pci,
    Unknown,
    /// In-process simulated link
    Simulated,
}

/// Information about a detected port (for listing)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedPort {
    /// Name to pass to [`Transport::open`]
    pub name: String,
    pub kind: PortKind,
}

impl DetectedPort {
    /// Get a display-friendly name for this port
    pub fn display_name(&self) -> String {
        match &self.kind {
            PortKind::Usb {
                vendor_id,
                product_id,
                product,
                ..
            } => match product {
                Some(product) => format!(
                    "{} - {} ({:04x}:{:04x})",
                    self.name, product, vendor_id, product_id
                ),
                None => format!("{} ({:04x}:{:04x})", self.name, vendor_id, product_id),
            },
            PortKind::Bluetooth => format!("{} (Bluetooth)", self.name),
            PortKind::Pci => format!("{} (PCI)", self.name),
            PortKind::Unknown => self.name.clone(),
            PortKind::Simulated => format!("{} (Simulated)", self.name),
        }
    }

    /// Check if this is the simulated port
    pub fn is_simulated(&self) -> bool {
        matches!(self.kind, PortKind::Simulated)
    }
}

impl std::fmt::Display for DetectedPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
