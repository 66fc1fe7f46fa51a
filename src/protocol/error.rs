//! Frame-level decoding errors.

use thiserror::Error;

/// Recoverable faults detected while decoding a frame.
///
/// None of these ever reaches the caller of [`super::FrameDecoder::feed`];
/// they are counted in [`super::DecoderStats`] and logged.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Terminator observed before the current run ended
    #[error("Frame sync error: terminator inside a run after {position} decoded bytes")]
    Sync { position: usize },

    /// Structurally complete frame (or overflowing buffer) of the wrong size
    #[error("Frame length error: expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },

    /// CRC mismatch
    #[error("Checksum error: received 0x{received:04X}, computed 0x{computed:04X}")]
    Checksum { received: u16, computed: u16 },
}
