//! CRC-16/XMODEM
//!
//! Polynomial `0x1021`, initial value `0x0000`, no reflection, no final xor.

use crc::{Crc, CRC_16_XMODEM};

const XMODEM: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Compute the CRC-16/XMODEM of `bytes`
#[inline]
pub fn crc16_xmodem(bytes: &[u8]) -> u16 {
    XMODEM.checksum(bytes)
}
