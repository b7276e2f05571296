//! CRC-8 used by FNIRSI reports.
//!
//! Parameters: width 8, poly 0x39, init 0x42, no input or output reflection, xorout 0x00
//! (check value 0x4B over `"123456789"`). The checksum covers everything from the packet
//! type byte up to, but not including, the trailing checksum byte.

use crate::constants::{CHECKSUM_OFFSET, FRAME_LEN};
use crc::{Algorithm, Crc};

const POLY: u8 = 0x39;
const INIT: u8 = 0x42;

const FNIRSI_CRC: Crc<u8> = Crc::<u8>::new(&Algorithm {
    width: 8,
    poly: POLY,
    init: INIT,
    refin: false,
    refout: false,
    xorout: 0x00,
    check: 0x4B,
    residue: 0x00,
});

/// Compute the vendor CRC-8 over `bytes`.
pub fn checksum(bytes: &[u8]) -> u8 {
    FNIRSI_CRC.checksum(bytes)
}

/// Checksum of a full report: bytes `1..63`, skipping the vendor marker and the checksum slot.
pub fn frame_checksum(frame: &[u8; FRAME_LEN]) -> u8 {
    checksum(&frame[1..CHECKSUM_OFFSET])
}

/// Returns `(expected, actual)` on mismatch.
pub fn verify(frame: &[u8; FRAME_LEN]) -> Result<(), (u8, u8)> {
    let expected = frame_checksum(frame);
    let actual = frame[CHECKSUM_OFFSET];
    if expected == actual { Ok(()) } else { Err((expected, actual)) }
}
