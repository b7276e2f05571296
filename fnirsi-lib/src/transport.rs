use crate::constants::FRAME_LEN;
use crate::error::TransportError;
use crate::frame::RawFrame;
use std::future::Future;
use std::time::Duration;

/// Byte-oriented duplex channel to a claimed meter interface.
///
/// Reads block for at most `timeout` and report [`TransportError::Timeout`] when nothing
/// arrived; a timed-out read must not lose a report that arrives later.
pub trait Transport {
    fn write(&mut self, frame: &[u8; FRAME_LEN]) -> impl Future<Output = Result<(), TransportError>>;

    fn read(&mut self, timeout: Duration) -> impl Future<Output = Result<RawFrame, TransportError>>;
}
