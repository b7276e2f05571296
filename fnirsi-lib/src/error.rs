use crate::device::DeviceIdentity;
use crate::session::SessionPhase;
use nusb::transfer::TransferError;
use std::io;
use thiserror::Error;

/// The primary error type for the `fnirsi-lib` crate.
#[derive(Error, Debug)]
pub enum FnirsiError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("Failed to {context}: {source}")]
    Interface {
        context: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Device has no HID interface in its active configuration")]
    NoHidInterface,

    #[error("HID interface {interface} is missing an interrupt {direction} endpoint")]
    MissingEndpoint { interface: u8, direction: &'static str },

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Failed to write samples: {0}")]
    Sink(#[source] io::Error),

    #[error("Invalid session phase: expected {expected}, currently {actual}")]
    InvalidPhase { expected: SessionPhase, actual: SessionPhase },
}

/// Failures before a session can start. Always fatal.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("No supported FNIRSI power meter found. Is it connected?")]
    DeviceNotFound,

    #[error("Unsupported device {0}")]
    UnsupportedDevice(DeviceIdentity),

    #[error("Failed to enumerate USB devices: {0}")]
    Enumeration(#[source] io::Error),
}

/// Errors raised by a [`Transport`](crate::transport::Transport).
#[derive(Error, Debug)]
pub enum TransportError {
    /// No report arrived within the requested timeout. Not a failure while streaming.
    #[error("Timed out waiting for the device")]
    Timeout,

    #[error("USB transfer failed: {0}")]
    Usb(#[from] TransferError),

    #[error("Received {len} bytes, expected a full report")]
    ShortFrame { len: usize },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout)
    }

    /// A malformed report can be dropped without ending the session.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, TransportError::Timeout | TransportError::ShortFrame { .. })
    }
}

impl From<tokio::time::error::Elapsed> for TransportError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        TransportError::Timeout
    }
}

/// Reasons a received report is dropped by the decoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("Checksum mismatch in report of length {len}: expected {expected:#04x}, actual {actual:#04x}")]
    ChecksumMismatch { len: usize, expected: u8, actual: u8 },

    #[error("Invalid report length: expected {expected} bytes, got {actual}")]
    Length { expected: usize, actual: usize },
}
