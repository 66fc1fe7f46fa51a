//! Self-synchronizing frame decoder
//!
//! [`FrameDecoder`] consumes the raw link one byte at a time and undoes the
//! COBS stuffing on the fly. A run-length code announces how many literal
//! bytes follow before the next (implied) zero; the literal `0x00` terminator
//! closes the frame. Any terminator that arrives in the middle of a run means
//! the stream was damaged, and the decoder simply starts over on the next byte,
//! so it never needs an external resync.
//!
//! # States
//!
//! ```text
//!                 code == 1
//!   AwaitingOverhead ───────────────────────────┐
//!        │ code > 1                              ▼
//!        └──────────► Copying ──(counter == 1)──► PendingZero
//!                       ▲                         │   │
//!                       └──── next code (> 1) ────┘   │ 0x00
//!                                                     ▼
//!                                            validate + reset
//! ```
//!
//! The de-stuffed buffer is capped at [`FRAME_LEN`] bytes; a run that would
//! grow it further is dropped as a length error.

use super::{crc16_xmodem, FrameError, CHECKSUM_LEN, FRAME_LEN, TERMINATOR};
use crate::types::{TelemetrySample, PAYLOAD_LEN};

/// Code byte of a maximal COBS run; such a run carries no implied zero
const FULL_RUN_CODE: u8 = 0xFF;

/// Decoder state machine position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DecoderState {
    /// Next byte is a run-length code (start of frame, or after a reset)
    #[default]
    AwaitingOverhead,
    /// Copying literal bytes of the current run
    Copying,
    /// Current run is exhausted; next byte is either the terminator or a new code
    PendingZero,
}

/// Diagnostics side channel of a [`FrameDecoder`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecoderStats {
    /// Every byte passed to `feed`
    pub bytes_processed: u64,
    /// Frames that passed validation
    pub frames_decoded: u64,
    pub sync_errors: u64,
    pub length_errors: u64,
    pub checksum_errors: u64,
    /// Terminators seen between frames (empty frames)
    pub idle_delimiters: u64,
    /// Most recent fault
    pub last_error: Option<FrameError>,
}

impl DecoderStats {
    /// Total number of dropped frames
    pub fn total_errors(&self) -> u64 {
        self.sync_errors + self.length_errors + self.checksum_errors
    }

    fn record(&mut self, error: FrameError) {
        match error {
            FrameError::Sync { .. } => self.sync_errors += 1,
            FrameError::Length { .. } => self.length_errors += 1,
            FrameError::Checksum { .. } => self.checksum_errors += 1,
        }
        self.last_error = Some(error);
    }
}

/// Stateful byte-at-a-time telemetry frame decoder.
///
/// One instance per transport stream. `feed` is cheap and never fails; see the
/// module docs for the framing rules.
#[derive(Debug)]
pub struct FrameDecoder {
    state: DecoderState,
    /// De-stuffed bytes of the in-flight frame
    buffer: Vec<u8>,
    /// Bytes left until the current run boundary (RunCounter)
    run_remaining: u8,
    /// Whether the current run was opened by a 0xFF code
    full_run: bool,
    stats: DecoderStats,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameDecoder {
    /// Create a decoder waiting for the first overhead byte
    pub fn new() -> Self {
        Self {
            state: DecoderState::AwaitingOverhead,
            buffer: Vec::with_capacity(FRAME_LEN),
            run_remaining: 0,
            full_run: false,
            stats: DecoderStats::default(),
        }
    }

    /// Process one byte.
    ///
    /// Returns a sample only on the terminator that completes a valid frame.
    pub fn feed(&mut self, byte: u8) -> Option<TelemetrySample> {
        self.stats.bytes_processed += 1;

        match self.state {
            DecoderState::AwaitingOverhead => {
                if byte == TERMINATOR {
                    self.stats.idle_delimiters += 1;
                } else {
                    self.start_run(byte);
                }
                None
            }
            DecoderState::Copying => {
                if byte == TERMINATOR {
                    self.fail(FrameError::Sync {
                        position: self.buffer.len(),
                    });
                    return None;
                }
                self.run_remaining -= 1;
                if self.push(byte) && self.run_remaining == 1 {
                    self.state = DecoderState::PendingZero;
                }
                None
            }
            DecoderState::PendingZero => {
                if byte == TERMINATOR {
                    return self.finish_frame();
                }
                // The run boundary stands in for a zero of the source data
                if !self.full_run && !self.push(0) {
                    return None;
                }
                self.start_run(byte);
                None
            }
        }
    }

    /// Feed a batch of bytes, collecting every sample it completes
    pub fn feed_slice(&mut self, bytes: &[u8]) -> Vec<TelemetrySample> {
        bytes.iter().filter_map(|&b| self.feed(b)).collect()
    }

    /// Drop any partial frame and wait for a new overhead byte
    pub fn reset(&mut self) {
        self.state = DecoderState::AwaitingOverhead;
        self.buffer.clear();
        self.run_remaining = 0;
        self.full_run = false;
    }

    /// Current state machine position
    pub fn state(&self) -> DecoderState {
        self.state
    }

    /// Number of de-stuffed bytes held for the in-flight frame
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Diagnostics counters
    pub fn stats(&self) -> &DecoderStats {
        &self.stats
    }

    /// Clear the diagnostics counters
    pub fn reset_stats(&mut self) {
        self.stats = DecoderStats::default();
    }

    /// Load the run counter from a code byte
    fn start_run(&mut self, code: u8) {
        self.run_remaining = code;
        self.full_run = code == FULL_RUN_CODE;
        self.state = if code == 1 {
            DecoderState::PendingZero
        } else {
            DecoderState::Copying
        };
    }

    /// Append a de-stuffed byte; on overflow the frame is dropped and `false` returned
    fn push(&mut self, byte: u8) -> bool {
        if self.buffer.len() >= FRAME_LEN {
            self.fail(FrameError::Length {
                expected: FRAME_LEN,
                actual: self.buffer.len() + 1,
            });
            return false;
        }
        self.buffer.push(byte);
        true
    }

    fn finish_frame(&mut self) -> Option<TelemetrySample> {
        let result = decode_frame(&self.buffer);
        self.reset();

        match result {
            Ok(sample) => {
                self.stats.frames_decoded += 1;
                Some(sample)
            }
            Err(e) => {
                tracing::debug!("Dropping frame: {}", e);
                self.stats.record(e);
                None
            }
        }
    }

    fn fail(&mut self, error: FrameError) {
        tracing::debug!("Dropping frame: {}", error);
        self.stats.record(error);
        self.reset();
    }
}

/// Validate a de-stuffed frame and decode its payload
pub fn decode_frame(frame: &[u8]) -> Result<TelemetrySample, FrameError> {
    let length_error = FrameError::Length {
        expected: FRAME_LEN,
        actual: frame.len(),
    };
    if frame.len() != FRAME_LEN {
        return Err(length_error);
    }

    let (payload, checksum) = frame.split_at(PAYLOAD_LEN);
    debug_assert_eq!(checksum.len(), CHECKSUM_LEN);

    let received = u16::from_le_bytes([checksum[0], checksum[1]]);
    let computed = crc16_xmodem(payload);
    if received != computed {
        return Err(FrameError::Checksum { received, computed });
    }

    let payload: &[u8; PAYLOAD_LEN] = payload.try_into().map_err(|_| length_error)?;
    Ok(TelemetrySample::from_payload(payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::encode_sample;

    fn reference_sample() -> TelemetrySample {
        TelemetrySample {
            input: 1.0,
            setpoint: 2.0,
            error: 1.0,
            gain: 0.5,
            p_term: 0.5,
            i_term: 0.1,
            d_term: 0.05,
        }
    }

    /// COBS encoding of the reference sample, terminator included
    const REFERENCE_WIRE: [u8; 32] = [
        0x01, 0x01, 0x03, 0x80, 0x3F, 0x01, 0x01, 0x02, 0x40, 0x01, 0x03, 0x80, 0x3F, 0x01, 0x01,
        0x02, 0x3F, 0x01, 0x01, 0x0C, 0x3F, 0xCD, 0xCC, 0xCC, 0x3D, 0xCD, 0xCC, 0x4C, 0x3D, 0xDB,
        0xC9, 0x00,
    ];

    #[test]
    fn test_decodes_reference_wire_bytes() {
        let mut decoder = FrameDecoder::new();
        let (last, head) = REFERENCE_WIRE.split_last().unwrap();

        for &b in head {
            assert!(decoder.feed(b).is_none());
        }
        let sample = decoder.feed(*last).expect("terminator completes the frame");

        assert!(sample.bit_eq(&reference_sample()));
        assert_eq!(decoder.stats().frames_decoded, 1);
        assert_eq!(decoder.state(), DecoderState::AwaitingOverhead);
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn test_encoder_matches_reference_wire_bytes() {
        assert_eq!(encode_sample(&reference_sample()), REFERENCE_WIRE.to_vec());
    }

    #[test]
    fn test_state_transitions() {
        let mut decoder = FrameDecoder::new();
        assert_eq!(decoder.state(), DecoderState::AwaitingOverhead);

        decoder.feed(0x03);
        assert_eq!(decoder.state(), DecoderState::Copying);
        decoder.feed(0xAA);
        assert_eq!(decoder.state(), DecoderState::Copying);
        decoder.feed(0xBB);
        assert_eq!(decoder.state(), DecoderState::PendingZero);
        assert_eq!(decoder.buffered_len(), 2);

        // Next code: implied zero appended, new run opened
        decoder.feed(0x02);
        assert_eq!(decoder.state(), DecoderState::Copying);
        assert_eq!(decoder.buffered_len(), 3);
    }

    #[test]
    fn test_code_one_is_an_empty_run() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(0x01);
        assert_eq!(decoder.state(), DecoderState::PendingZero);
        assert_eq!(decoder.buffered_len(), 0);

        decoder.feed(0x01);
        assert_eq!(decoder.state(), DecoderState::PendingZero);
        assert_eq!(decoder.buffered_len(), 1);
    }

    #[test]
    fn test_terminator_inside_run_is_sync_error() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(0x05);
        decoder.feed(0x11);
        assert!(decoder.feed(TERMINATOR).is_none());

        assert_eq!(decoder.stats().sync_errors, 1);
        assert_eq!(
            decoder.stats().last_error,
            Some(FrameError::Sync { position: 1 })
        );
        assert_eq!(decoder.state(), DecoderState::AwaitingOverhead);
        assert_eq!(decoder.buffered_len(), 0);
    }

    #[test]
    fn test_idle_delimiters_are_ignored() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(TERMINATOR);
        decoder.feed(TERMINATOR);

        assert_eq!(decoder.stats().idle_delimiters, 2);
        assert_eq!(decoder.stats().total_errors(), 0);

        let samples = decoder.feed_slice(&REFERENCE_WIRE);
        assert_eq!(samples.len(), 1);
    }

    #[test]
    fn test_short_frame_is_length_error() {
        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed_slice(&[0x03, 0x01, 0x02, TERMINATOR]).is_empty());

        assert_eq!(decoder.stats().length_errors, 1);
        assert_eq!(
            decoder.stats().last_error,
            Some(FrameError::Length {
                expected: FRAME_LEN,
                actual: 2
            })
        );
    }

    #[test]
    fn test_unterminated_run_is_bounded() {
        let mut decoder = FrameDecoder::new();
        decoder.feed(FULL_RUN_CODE);
        for _ in 0..200 {
            decoder.feed(0x55);
            assert!(decoder.buffered_len() <= FRAME_LEN);
        }
        assert!(decoder.stats().length_errors >= 1);

        // Garbage ends at the next terminator; the stream recovers
        decoder.feed(TERMINATOR);
        assert_eq!(decoder.feed_slice(&REFERENCE_WIRE).len(), 1);
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut wire = REFERENCE_WIRE;
        // Low byte of the stored CRC
        wire[29] ^= 0x01;

        let mut decoder = FrameDecoder::new();
        assert!(decoder.feed_slice(&wire).is_empty());
        assert_eq!(decoder.stats().checksum_errors, 1);
        assert_eq!(
            decoder.stats().last_error,
            Some(FrameError::Checksum {
                received: 0xC9DA,
                computed: 0xC9DB
            })
        );
    }

    #[test]
    fn test_decode_frame_directly() {
        let sample = reference_sample();
        let mut frame = sample.to_payload().to_vec();
        frame.extend_from_slice(&crc16_xmodem(&frame).to_le_bytes());

        assert!(decode_frame(&frame).unwrap().bit_eq(&sample));
        assert!(matches!(
            decode_frame(&frame[..FRAME_LEN - 1]),
            Err(FrameError::Length { .. })
        ));
    }

    #[test]
    fn test_reset_stats() {
        let mut decoder = FrameDecoder::new();
        decoder.feed_slice(&REFERENCE_WIRE);
        decoder.reset_stats();
        assert_eq!(decoder.stats(), &DecoderStats::default());
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_round_trip_any_sample(bits in prop::array::uniform7(any::<u32>())) {
            let sample = TelemetrySample {
                input: f32::from_bits(bits[0]),
                setpoint: f32::from_bits(bits[1]),
                error: f32::from_bits(bits[2]),
                gain: f32::from_bits(bits[3]),
                p_term: f32::from_bits(bits[4]),
                i_term: f32::from_bits(bits[5]),
                d_term: f32::from_bits(bits[6]),
            };
            let wire = encode_sample(&sample);

            let mut decoder = FrameDecoder::new();
            let (last, head) = wire.split_last().unwrap();
            for &b in head {
                prop_assert!(decoder.feed(b).is_none());
            }
            let decoded = decoder.feed(*last);
            prop_assert!(decoded.is_some());
            prop_assert!(decoded.unwrap().bit_eq(&sample));
        }

        #[test]
        fn test_arbitrary_bytes_never_overflow(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
            let mut decoder = FrameDecoder::new();
            for b in bytes {
                let _ = decoder.feed(b);
                prop_assert!(decoder.buffered_len() <= FRAME_LEN);
            }
        }

        #[test]
        fn test_recovers_after_arbitrary_garbage(bytes in prop::collection::vec(any::<u8>(), 0..128)) {
            let mut decoder = FrameDecoder::new();
            decoder.feed_slice(&bytes);
            // A lone terminator closes whatever the garbage left open
            decoder.feed(TERMINATOR);
            let samples = decoder.feed_slice(&REFERENCE_WIRE);
            prop_assert_eq!(samples.len(), 1);
        }
    }
}
