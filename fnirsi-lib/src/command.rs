//! Host-to-device command reports.
//!
//! Commands carry no payload: marker, command code, 61 zero bytes and the CRC-8.

use crate::constants::{FRAME_LEN, VENDOR_MARKER};
use crate::crc;
use bytes::{BufMut, BytesMut};
use num_enum::IntoPrimitive;
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive)]
#[repr(u8)]
pub enum Command {
    /// First handshake command.
    #[strum(to_string = "handshake-1")]
    Handshake1 = 0x81,
    /// Second handshake command; FNB58-class meters also use it to start streaming.
    #[strum(to_string = "handshake-2")]
    Handshake2 = 0x82,
    /// Starts or sustains streaming. Sent as keep-alive by every model.
    #[strum(to_string = "refresh")]
    Refresh = 0x83,
}

impl Command {
    pub fn code(self) -> u8 {
        self.into()
    }

    /// Encode into a full 64-byte report with its checksum.
    pub fn to_frame(self) -> [u8; FRAME_LEN] {
        let mut buf = BytesMut::with_capacity(FRAME_LEN);
        buf.put_u8(VENDOR_MARKER);
        buf.put_u8(self.code());
        buf.put_bytes(0, FRAME_LEN - 3);
        buf.put_u8(crc::checksum(&buf[1..]));

        let mut frame = [0u8; FRAME_LEN];
        frame.copy_from_slice(&buf);
        frame
    }
}

/// The command sent on the variant's keep-alive cadence while streaming.
pub const KEEPALIVE: Command = Command::Refresh;

#[cfg(test)]
mod tests {
    use super::*;

    fn expected(code: u8, checksum: u8) -> [u8; FRAME_LEN] {
        let mut frame = [0u8; FRAME_LEN];
        frame[0] = 0xAA;
        frame[1] = code;
        frame[63] = checksum;
        frame
    }

    #[test]
    fn test_handshake_bytes_match_vendor_traffic() {
        assert_eq!(Command::Handshake1.to_frame(), expected(0x81, 0x8E));
        assert_eq!(Command::Handshake2.to_frame(), expected(0x82, 0x96));
        assert_eq!(Command::Refresh.to_frame(), expected(0x83, 0x9E));
    }

    #[test]
    fn test_keepalive_is_refresh() {
        assert_eq!(KEEPALIVE.to_frame(), expected(0x83, 0x9E));
    }

    #[test]
    fn test_display() {
        assert_eq!(Command::Handshake2.to_string(), "handshake-2");
    }
}
