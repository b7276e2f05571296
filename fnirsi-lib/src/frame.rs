//! Zero-copy layout of the 64-byte report streamed by the meter.
//!
//! ```text
//! offset  0      vendor marker (0xAA)
//! offset  1      packet type (0x04 = telemetry)
//! offset  2..62  four 15-byte sample slots
//! offset 62      reserved, semantics unknown
//! offset 63      CRC-8 over bytes 1..63
//! ```

use crate::constants::{
    DATA_LINE_SCALE, FRAME_LEN, SAMPLE_SLOT_LEN, SAMPLES_PER_FRAME, TEMPERATURE_SCALE, VBUS_IBUS_SCALE,
};
use crate::crc;
use crate::error::FrameError;
use num_enum::{FromPrimitive, IntoPrimitive};
use std::fmt;
use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Packet type tag at offset 1 of an inbound report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum PacketType {
    /// Four telemetry samples.
    Data = 0x04,

    // 0x03 and others are status/replies we don't interpret
    #[num_enum(catch_all)]
    Other(u8),
}

/// One of the four sample slots in a data report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct SampleSlotRaw {
    pub vbus: U32,        // 10 µV
    pub ibus: U32,        // 10 µA
    pub dp_mv: U16,       // millivolts
    pub dn_mv: U16,       // millivolts
    pub reserved: u8,     // observed constant 1, meaning unknown
    pub temp_deci_c: U16, // 0.1 °C
}

impl SampleSlotRaw {
    pub fn voltage_v(&self) -> f64 {
        self.vbus.get() as f64 / VBUS_IBUS_SCALE
    }

    pub fn current_a(&self) -> f64 {
        self.ibus.get() as f64 / VBUS_IBUS_SCALE
    }

    pub fn dp_v(&self) -> f64 {
        self.dp_mv.get() as f64 / DATA_LINE_SCALE
    }

    pub fn dn_v(&self) -> f64 {
        self.dn_mv.get() as f64 / DATA_LINE_SCALE
    }

    pub fn temperature_c(&self) -> f64 {
        self.temp_deci_c.get() as f64 / TEMPERATURE_SCALE
    }
}

/// A full 64-byte report as received from the meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct RawFrame {
    pub marker: u8,
    pub packet_type: u8,
    pub slots: [SampleSlotRaw; SAMPLES_PER_FRAME],
    pub reserved: u8,
    pub checksum: u8,
}

const _: () = assert!(size_of::<SampleSlotRaw>() == SAMPLE_SLOT_LEN);
const _: () = assert!(size_of::<RawFrame>() == FRAME_LEN);

impl RawFrame {
    pub fn from_array(bytes: [u8; FRAME_LEN]) -> Self {
        zerocopy::transmute!(bytes)
    }

    pub fn to_array(&self) -> [u8; FRAME_LEN] {
        zerocopy::transmute!(*self)
    }

    pub fn packet_type(&self) -> PacketType {
        PacketType::from_primitive(self.packet_type)
    }

    pub fn is_data(&self) -> bool {
        self.packet_type() == PacketType::Data
    }

    /// Checksum computed over the report contents.
    pub fn computed_checksum(&self) -> u8 {
        crc::frame_checksum(&self.to_array())
    }

    /// Recompute and store the trailing checksum.
    pub fn seal(&mut self) {
        self.checksum = self.computed_checksum();
    }

    pub fn verify_checksum(&self) -> Result<(), FrameError> {
        crc::verify(&self.to_array()).map_err(|(expected, actual)| FrameError::ChecksumMismatch {
            len: FRAME_LEN,
            expected,
            actual,
        })
    }
}

impl TryFrom<&[u8]> for RawFrame {
    type Error = FrameError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        RawFrame::read_from_bytes(bytes).map_err(|_| FrameError::Length {
            expected: FRAME_LEN,
            actual: bytes.len(),
        })
    }
}

impl fmt::Display for RawFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.as_bytes()))
    }
}
