//! Protocol engine for the FNIRSI family of USB power meters (FNB48, C1, FNB58, FNB48S).
//!
//! The meters stream 64-byte HID reports at 100 samples per second once the host has sent
//! the vendor handshake, and stop streaming unless a keep-alive command keeps arriving.
//! Each data report carries four samples and a CRC-8 over everything but the vendor marker.
//!
//! The crate is layered bottom-up:
//!
//! - [`crc`] and [`frame`] describe the wire format.
//! - [`decoder`] turns a [`frame::RawFrame`] into up to four [`decoder::DecodedSample`]s,
//!   carrying the temperature filter and the [`integrator::TelemetryIntegrator`] in a
//!   [`state::SessionState`].
//! - [`device`] maps a USB vendor/product pair to a [`device::DeviceVariant`] which holds the
//!   handshake sequence and keep-alive cadence.
//! - [`session`] drives the handshake, streaming and drain phases over any
//!   [`transport::Transport`]; [`usb::UsbTransport`] is the nusb-backed implementation.

pub mod command;
pub mod config;
pub mod constants;
pub mod crc;
pub mod decoder;
pub mod device;
pub mod error;
pub mod frame;
pub mod integrator;
pub mod session;
pub mod sink;
pub mod state;
pub mod transport;
pub mod usb;

pub use config::SessionConfig;
pub use decoder::{DecodedSample, FrameDecoder};
pub use device::{DeviceIdentity, DeviceModel, DeviceVariant, SupportedDevice};
pub use error::{DiscoveryError, FnirsiError, FrameError, TransportError};
pub use frame::RawFrame;
pub use session::{Session, SessionPhase, SessionSummary, StopRequest, StopSignal};
pub use sink::{JsonLinesSink, SampleSink, TextSink};
pub use transport::Transport;
pub use usb::UsbTransport;
