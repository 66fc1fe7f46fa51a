//! Frame encoding (payload → CRC → COBS → terminator).
//!
//! The firmware side of the link does the same thing; this copy drives the
//! simulated transport, tests and benchmarks.

use super::{crc16_xmodem, CHECKSUM_LEN, TERMINATOR};
use crate::types::TelemetrySample;

/// Encode a sample into wire bytes, terminator included
pub fn encode_sample(sample: &TelemetrySample) -> Vec<u8> {
    encode_payload(&sample.to_payload())
}

/// Encode an arbitrary payload into wire bytes, terminator included.
///
/// Payloads other than 28 bytes produce frames the decoder will reject.
pub fn encode_payload(payload: &[u8]) -> Vec<u8> {
    let mut raw = Vec::with_capacity(payload.len() + CHECKSUM_LEN);
    raw.extend_from_slice(payload);
    raw.extend_from_slice(&crc16_xmodem(payload).to_le_bytes());

    let mut wire = vec![0u8; cobs::max_encoding_length(raw.len())];
    let encoded_len = cobs::encode(&raw, &mut wire);
    wire.truncate(encoded_len);
    wire.push(TERMINATOR);
    wire
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_zero_is_the_terminator() {
        let sample = TelemetrySample::default();
        let wire = encode_sample(&sample);

        // All-zero payload: every byte becomes a code byte
        let (last, head) = wire.split_last().unwrap();
        assert_eq!(*last, TERMINATOR);
        assert!(head.iter().all(|&b| b != TERMINATOR));
        assert_eq!(head.len(), 31);
    }

    #[test]
    fn test_empty_payload() {
        // CRC of nothing is 0x0000, so the frame is two stuffed zeros
        assert_eq!(encode_payload(&[]), vec![0x01, 0x01, 0x01, TERMINATOR]);
    }
}
