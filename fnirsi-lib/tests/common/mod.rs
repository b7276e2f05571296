//! Shared fixtures: report builders and a scripted transport.

#![allow(dead_code)]

use fnirsi_lib::TransportError;
use fnirsi_lib::constants::FRAME_LEN;
use fnirsi_lib::frame::{RawFrame, SampleSlotRaw};
use fnirsi_lib::transport::Transport;
use std::collections::VecDeque;
use std::io;
use std::time::Duration;
use tokio::time::Instant;
use zerocopy::byteorder::little_endian::{U16, U32};

/// One slot reading 5.00000 V, 1.00000 A, D+ 0.600 V, D- 0.000 V, 25.0 °C.
pub fn slot_5v_1a() -> SampleSlotRaw {
    slot(500_000, 100_000, 250)
}

pub fn slot(vbus: u32, ibus: u32, temp_deci_c: u16) -> SampleSlotRaw {
    SampleSlotRaw {
        vbus: U32::new(vbus),
        ibus: U32::new(ibus),
        dp_mv: U16::new(600),
        dn_mv: U16::new(0),
        reserved: 1,
        temp_deci_c: U16::new(temp_deci_c),
    }
}

/// A data report with a valid checksum.
pub fn data_frame(slots: [SampleSlotRaw; 4]) -> RawFrame {
    let mut frame = RawFrame {
        marker: 0xAA,
        packet_type: 0x04,
        slots,
        reserved: 0x00,
        checksum: 0,
    };
    frame.seal();
    frame
}

pub fn constant_frame() -> RawFrame {
    data_frame([slot_5v_1a(); 4])
}

pub fn corrupted_frame() -> RawFrame {
    let mut frame = constant_frame();
    frame.checksum = frame.checksum.wrapping_add(1);
    frame
}

pub fn non_data_frame(packet_type: u8) -> RawFrame {
    let mut frame = constant_frame();
    frame.packet_type = packet_type;
    frame.seal();
    frame
}

/// What the next read returns.
#[derive(Debug, Clone)]
pub enum Step {
    Frame(RawFrame),
    Timeout,
    Short(usize),
    Fail,
}

/// Replays a fixed script of reads and records every write with its (virtual) time.
///
/// Once the script runs out every read times out.
pub struct MockTransport {
    pub script: VecDeque<Step>,
    pub writes: Vec<(Instant, [u8; FRAME_LEN])>,
    pub reads: usize,
    /// Virtual time spent delivering each report.
    pub frame_period: Duration,
}

impl MockTransport {
    pub fn new(script: impl IntoIterator<Item = Step>) -> Self {
        Self {
            script: script.into_iter().collect(),
            writes: Vec::new(),
            reads: 0,
            frame_period: Duration::from_millis(40),
        }
    }

    pub fn frames(frames: impl IntoIterator<Item = RawFrame>) -> Self {
        Self::new(frames.into_iter().map(Step::Frame))
    }

    pub fn written_codes(&self) -> Vec<u8> {
        self.writes.iter().map(|(_, frame)| frame[1]).collect()
    }
}

impl Transport for MockTransport {
    async fn write(&mut self, frame: &[u8; FRAME_LEN]) -> Result<(), TransportError> {
        self.writes.push((Instant::now(), *frame));
        Ok(())
    }

    async fn read(&mut self, timeout: Duration) -> Result<RawFrame, TransportError> {
        self.reads += 1;
        match self.script.pop_front() {
            Some(Step::Frame(frame)) => {
                tokio::time::sleep(self.frame_period).await;
                Ok(frame)
            }
            Some(Step::Timeout) | None => {
                tokio::time::sleep(timeout).await;
                Err(TransportError::Timeout)
            }
            Some(Step::Short(len)) => Err(TransportError::ShortFrame { len }),
            Some(Step::Fail) => Err(TransportError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "device disconnected",
            ))),
        }
    }
}

/// Stops after `n` checks have returned `false`.
pub fn stop_after(n: usize) -> impl FnMut() -> bool {
    let mut checks = 0;
    move || {
        checks += 1;
        checks > n
    }
}
