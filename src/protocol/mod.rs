//! Telemetry wire protocol
//!
//! Frames are COBS-encoded and terminated by a single `0x00` byte. Before
//! stuffing, a frame holds the 28-byte sample payload followed by its
//! CRC-16/XMODEM, stored little-endian:
//!
//! ```text
//! [overhead][COBS(payload ++ crc16_le)][0x00]
//! ```
//!
//! # Components
//!
//! - [`FrameDecoder`] - Byte-at-a-time, self-synchronizing decoder
//! - [`encode_sample`] / [`encode_payload`] - The inverse, used by the simulator and tests
//! - [`crc16_xmodem`] - Integrity check shared by both directions
//!
//! Decoding faults ([`FrameError`]) are recovered from inside the decoder and
//! only surface through [`DecoderStats`] and the log.

pub mod crc;
pub mod decoder;
pub mod encoder;
pub mod error;

pub use crc::crc16_xmodem;
pub use decoder::{decode_frame, DecoderState, DecoderStats, FrameDecoder};
pub use encoder::{encode_payload, encode_sample};
pub use error::FrameError;

use crate::types::PAYLOAD_LEN;

/// Frame delimiter; the only literal zero on the wire
pub const TERMINATOR: u8 = 0x00;

/// Size of the trailing checksum
pub const CHECKSUM_LEN: usize = 2;

/// De-stuffed size of a valid frame (payload + checksum)
pub const FRAME_LEN: usize = PAYLOAD_LEN + CHECKSUM_LEN;
