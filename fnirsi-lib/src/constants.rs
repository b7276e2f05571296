// Wire-level and timing constants for FNIRSI power meters

use std::time::Duration;

/// Every HID report, inbound or outbound, is exactly this long.
pub const FRAME_LEN: usize = 64;

/// First byte of every report in both directions.
pub const VENDOR_MARKER: u8 = 0xAA;

/// Number of samples bundled in one data report.
pub const SAMPLES_PER_FRAME: usize = 4;

/// Size of one sample slot inside a data report.
pub const SAMPLE_SLOT_LEN: usize = 15;

/// Offset of the first sample slot (after marker and packet type).
pub const FIRST_SLOT_OFFSET: usize = 2;

/// Index of the reserved byte following the sample slots.
pub const RESERVED_OFFSET: usize = FIRST_SLOT_OFFSET + SAMPLES_PER_FRAME * SAMPLE_SLOT_LEN;

/// Index of the trailing checksum byte.
pub const CHECKSUM_OFFSET: usize = FRAME_LEN - 1;

/// The meters only stream at this rate.
pub const SAMPLES_PER_SECOND: u32 = 100;

/// Seconds between two consecutive samples.
pub const SAMPLE_INTERVAL_S: f64 = 1.0 / SAMPLES_PER_SECOND as f64;

/// Voltage and current fields are in units of 10 µV / 10 µA.
pub const VBUS_IBUS_SCALE: f64 = 100_000.0;

/// D+ / D- fields are in millivolts.
pub const DATA_LINE_SCALE: f64 = 1_000.0;

/// Temperature field is in tenths of a degree Celsius.
pub const TEMPERATURE_SCALE: f64 = 10.0;

/// Default smoothing factor for the temperature EMA.
pub const DEFAULT_TEMPERATURE_ALPHA: f64 = 0.9;

/// USB interface class code for HID.
pub const HID_INTERFACE_CLASS: u8 = 0x03;

pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(1000);
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_millis(1000);
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(1000);
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Pause after a USB port reset before the device is usable again.
pub const RESET_SETTLE_DELAY: Duration = Duration::from_millis(50);
