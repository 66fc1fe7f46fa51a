//! Serial port transport backed by the serialport crate

use super::transport::{DetectedPort, PortKind, Transport, TransportStats};
use crate::error::{PidVisError, Result};
use serialport::{SerialPort, SerialPortType};
use std::io::{ErrorKind, Read};
use std::time::Duration;

/// A real serial port
pub struct SerialTransport {
    /// Open port handle, `None` while closed
    port: Option<Box<dyn SerialPort>>,
    /// Name of the open port (for error messages)
    port_name: String,
    /// Timeout for opening and reading
    timeout: Duration,
    stats: TransportStats,
}

impl SerialTransport {
    /// Create a closed transport
    pub fn new(timeout: Duration) -> Self {
        Self {
            port: None,
            port_name: String::new(),
            timeout,
            stats: TransportStats::default(),
        }
    }

    /// List serial ports reported by the OS, in OS order
    pub fn available_ports() -> Result<Vec<DetectedPort>> {
        let ports = serialport::available_ports()?;
        Ok(ports
            .into_iter()
            .map(|p| DetectedPort {
                name: p.port_name,
                kind: match p.port_type {
                    SerialPortType::UsbPort(info) => PortKind::Usb {
                        vendor_id: info.vid,
                        product_id: info.pid,
                        serial_number: info.serial_number,
                        manufacturer: info.manufacturer,
                        product: info.product,
                    },
                    SerialPortType::BluetoothPort => PortKind::Bluetooth,
                    SerialPortType::PciPort => PortKind::Pci,
                    SerialPortType::Unknown => PortKind::Unknown,
                },
            })
            .collect())
    }

    fn link_lost(&mut self, message: impl ToString) -> PidVisError {
        self.stats.record_failure();
        PidVisError::connection(self.port_name.clone(), message)
    }
}

impl Transport for SerialTransport {
    fn open(&mut self, port: &str, baud_rate: u32) -> Result<()> {
        self.close();

        let handle = serialport::new(port, baud_rate)
            .timeout(self.timeout)
            .open()
            .map_err(|e| PidVisError::connection(port, e))?;

        tracing::info!("Opened {} @ {} baud", port, baud_rate);
        self.port = Some(handle);
        self.port_name = port.to_string();
        self.stats = TransportStats::default();
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let Some(port) = self.port.as_mut() else {
            return Err(PidVisError::connection(&self.port_name, "port is not open"));
        };

        let available = match port.bytes_to_read() {
            Ok(n) => n as usize,
            Err(e) => return Err(self.link_lost(e)),
        };
        if available == 0 || buf.is_empty() {
            self.stats.record_read(0);
            return Ok(0);
        }

        let wanted = available.min(buf.len());
        match port.read(&mut buf[..wanted]) {
            Ok(n) => {
                self.stats.record_read(n);
                Ok(n)
            }
            Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                self.stats.record_read(0);
                Ok(0)
            }
            Err(e) => Err(self.link_lost(e)),
        }
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            tracing::info!("Closed {}", self.port_name);
        }
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn stats(&self) -> TransportStats {
        self.stats
    }
}
