//! Core data types for PidVis-RS
//!
//! This module contains the fundamental data structures shared by the
//! decoder, the reader backend and the series store.
//!
//! # Main Types
//!
//! - [`TelemetrySample`] - One decoded record of PID controller state
//! - [`SampleField`] - Field descriptor with its byte offset in the wire payload
//! - [`ConnectionStatus`] - State of the telemetry link
//! - [`CollectionStats`] - Reader-side counters published to the consumer
//!
//! # Payload Layout
//!
//! A sample travels as 28 bytes, seven little-endian IEEE-754 `f32` values:
//!
//! | Offset | Field      |
//! |--------|------------|
//! | 0      | `input`    |
//! | 4      | `setpoint` |
//! | 8      | `error`    |
//! | 12     | `gain`     |
//! | 16     | `p_term`   |
//! | 20     | `i_term`   |
//! | 24     | `d_term`   |

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Size of the sample payload on the wire, in bytes
pub const PAYLOAD_LEN: usize = SampleField::ALL.len() * FIELD_LEN;

/// Size of one encoded field
const FIELD_LEN: usize = 4;

/// A field of [`TelemetrySample`], in wire order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleField {
    /// Process variable fed back to the controller
    Input,
    /// Target value
    Setpoint,
    /// `setpoint - input`
    Error,
    /// Controller output
    Gain,
    /// Proportional contribution
    PTerm,
    /// Integral contribution
    ITerm,
    /// Derivative contribution
    DTerm,
}

impl SampleField {
    /// All fields in wire order
    pub const ALL: [SampleField; 7] = [
        SampleField::Input,
        SampleField::Setpoint,
        SampleField::Error,
        SampleField::Gain,
        SampleField::PTerm,
        SampleField::ITerm,
        SampleField::DTerm,
    ];

    /// Byte offset of this field inside the 28-byte payload
    pub const fn offset(self) -> usize {
        let index = match self {
            SampleField::Input => 0,
            SampleField::Setpoint => 1,
            SampleField::Error => 2,
            SampleField::Gain => 3,
            SampleField::PTerm => 4,
            SampleField::ITerm => 5,
            SampleField::DTerm => 6,
        };
        index * FIELD_LEN
    }

    /// Canonical channel name for this field
    pub const fn name(self) -> &'static str {
        match self {
            SampleField::Input => "input",
            SampleField::Setpoint => "setpoint",
            SampleField::Error => "error",
            SampleField::Gain => "gain",
            SampleField::PTerm => "p_term",
            SampleField::ITerm => "i_term",
            SampleField::DTerm => "d_term",
        }
    }

    /// Look a field up by its channel name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }
}

impl std::fmt::Display for SampleField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One decoded telemetry record
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub input: f32,
    pub setpoint: f32,
    pub error: f32,
    pub gain: f32,
    pub p_term: f32,
    pub i_term: f32,
    pub d_term: f32,
}

impl TelemetrySample {
    /// Decode a sample from its 28-byte little-endian payload
    pub fn from_payload(payload: &[u8; PAYLOAD_LEN]) -> Self {
        let read = |field: SampleField| {
            let at = field.offset();
            f32::from_le_bytes([
                payload[at],
                payload[at + 1],
                payload[at + 2],
                payload[at + 3],
            ])
        };

        Self {
            input: read(SampleField::Input),
            setpoint: read(SampleField::Setpoint),
            error: read(SampleField::Error),
            gain: read(SampleField::Gain),
            p_term: read(SampleField::PTerm),
            i_term: read(SampleField::ITerm),
            d_term: read(SampleField::DTerm),
        }
    }

    /// Encode the sample into its 28-byte little-endian payload
    pub fn to_payload(&self) -> [u8; PAYLOAD_LEN] {
        let mut payload = [0u8; PAYLOAD_LEN];
        for field in SampleField::ALL {
            let at = field.offset();
            payload[at..at + FIELD_LEN].copy_from_slice(&self.get(field).to_le_bytes());
        }
        payload
    }

    /// Read a single field
    pub fn get(&self, field: SampleField) -> f32 {
        match field {
            SampleField::Input => self.input,
            SampleField::Setpoint => self.setpoint,
            SampleField::Error => self.error,
            SampleField::Gain => self.gain,
            SampleField::PTerm => self.p_term,
            SampleField::ITerm => self.i_term,
            SampleField::DTerm => self.d_term,
        }
    }

    /// All fields keyed by their canonical channel name
    pub fn channel_values(&self) -> HashMap<&'static str, f64> {
        SampleField::ALL
            .into_iter()
            .map(|f| (f.name(), self.get(f) as f64))
            .collect()
    }

    /// Bitwise equality, treating NaN payloads as equal to themselves
    pub fn bit_eq(&self, other: &Self) -> bool {
        self.to_payload() == other.to_payload()
    }
}

/// Represents the connection status of the telemetry link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// No port open
    #[default]
    Disconnected,
    /// Attempting to open the port
    Connecting,
    /// Port open, reader running
    Connected,
    /// Connection error occurred
    Error,
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionStatus::Disconnected => write!(f, "Not connected"),
            ConnectionStatus::Connecting => write!(f, "Connecting..."),
            ConnectionStatus::Connected => write!(f, "Connected"),
            ConnectionStatus::Error => write!(f, "Error"),
        }
    }
}

/// Statistics about the running telemetry link
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CollectionStats {
    /// Bytes pulled from the transport
    pub bytes_received: u64,
    /// Frames that passed validation
    pub frames_decoded: u64,
    /// Terminator seen before a run boundary
    pub sync_errors: u64,
    /// Structurally complete frames of the wrong size (including overflow)
    pub length_errors: u64,
    /// Frames failing CRC verification
    pub checksum_errors: u64,
    /// Transport reads that returned data
    pub reads: u64,
    /// Transport reads that found nothing waiting
    pub empty_reads: u64,
    /// Transport read failures
    pub read_errors: u64,
    /// Samples dropped because the consumer queue was full
    pub dropped_samples: u64,
    /// Decoded frames per second since the link came up
    pub frame_rate_hz: f64,
}

impl CollectionStats {
    /// Total frame-level errors
    pub fn frame_errors(&self) -> u64 {
        self.sync_errors + self.length_errors + self.checksum_errors
    }

    /// Share of frames that decoded successfully, as a percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.frames_decoded + self.frame_errors();
        if total == 0 {
            100.0
        } else {
            (self.frames_decoded as f64 / total as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_offsets_are_contiguous() {
        for (i, field) in SampleField::ALL.iter().enumerate() {
            assert_eq!(field.offset(), i * 4);
        }
        assert_eq!(PAYLOAD_LEN, 28);
    }

    #[test]
    fn test_field_names_round_trip() {
        for field in SampleField::ALL {
            assert_eq!(SampleField::from_name(field.name()), Some(field));
        }
        assert_eq!(SampleField::from_name("kp"), None);
    }

    #[test]
    fn test_payload_layout() {
        let sample = TelemetrySample {
            input: 1.0,
            d_term: -2.5,
            ..Default::default()
        };
        let payload = sample.to_payload();

        assert_eq!(&payload[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&payload[24..28], &(-2.5f32).to_le_bytes());
        assert_eq!(TelemetrySample::from_payload(&payload), sample);
    }

    #[test]
    fn test_channel_values() {
        let sample = TelemetrySample {
            setpoint: 2.0,
            gain: 0.5,
            ..Default::default()
        };
        let values = sample.channel_values();

        assert_eq!(values.len(), 7);
        assert_eq!(values["setpoint"], 2.0);
        assert_eq!(values["gain"], 0.5);
    }

    #[test]
    fn test_collection_stats_success_rate() {
        let mut stats = CollectionStats::default();
        assert_eq!(stats.success_rate(), 100.0);

        stats.frames_decoded = 3;
        stats.checksum_errors = 1;
        assert_eq!(stats.frame_errors(), 1);
        assert!((stats.success_rate() - 75.0).abs() < 1e-9);
    }
}
