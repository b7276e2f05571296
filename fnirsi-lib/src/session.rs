//! Session lifecycle: handshake, streaming with keep-alives, and drain.
//!
//! ```text
//! Discovering -> InterfaceReady -> HandshakeSent -> Streaming -> Draining -> Closed
//! ```
//!
//! Everything runs on one task. The only suspension points are the bounded transport read
//! and command writes; the stop signal and keep-alive deadline are checked once per loop
//! iteration whether or not the read produced a report.

use crate::command::KEEPALIVE;
use crate::config::SessionConfig;
use crate::decoder::FrameDecoder;
use crate::device::DeviceVariant;
use crate::error::{FnirsiError, FrameError, TransportError};
use crate::frame::RawFrame;
use crate::sink::SampleSink;
use crate::state::{SessionState, SessionStats};
use crate::transport::Transport;
use crate::usb::UsbTransport;
use chrono::Utc;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use strum_macros::Display;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SessionPhase {
    Discovering,
    InterfaceReady,
    HandshakeSent,
    Streaming,
    Draining,
    Closed,
}

/// Polled once per streaming iteration; returning `true` moves the session to draining.
pub trait StopSignal {
    fn should_stop(&mut self) -> bool;
}

impl<F: FnMut() -> bool> StopSignal for F {
    fn should_stop(&mut self) -> bool {
        self()
    }
}

/// Stop condition fed by an interrupt handler and, optionally, a sentinel file.
///
/// Clones share the interrupt flag, so one clone can be moved into a Ctrl+C handler
/// while the session polls another.
#[derive(Debug, Clone, Default)]
pub struct StopRequest {
    interrupted: Arc<AtomicBool>,
    sentinel: Option<PathBuf>,
}

impl StopRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also stop once `path` exists.
    pub fn with_sentinel(mut self, path: impl Into<PathBuf>) -> Self {
        self.sentinel = Some(path.into());
        self
    }

    pub fn request(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}

impl StopSignal for StopRequest {
    fn should_stop(&mut self) -> bool {
        if self.is_requested() {
            info!("Terminating due to interrupt, please wait until draining is complete...");
            return true;
        }
        if let Some(path) = &self.sentinel {
            if path.exists() {
                info!(path = %path.display(), "Stop file found, draining...");
                return true;
            }
        }
        false
    }
}

/// Totals reported when a session closes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSummary {
    pub stats: SessionStats,
    pub energy_ws: f64,
    pub charge_as: f64,
}

impl SessionSummary {
    pub fn energy_wh(&self) -> f64 {
        self.energy_ws / 3600.0
    }

    pub fn charge_mah(&self) -> f64 {
        self.charge_as / 3.6
    }
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = &self.stats;
        write!(
            f,
            "{} samples from {} data reports ({} non-data, {} bad checksum, {} short), \
             {} keep-alives, {} drained; {:.6} Ws, {:.6} As",
            s.samples_emitted,
            s.data_frames,
            s.non_data_frames,
            s.checksum_failures,
            s.short_frames,
            s.keepalives_sent,
            s.frames_drained,
            self.energy_ws,
            self.charge_as
        )
    }
}

/// Owns the transport, decoder and session state for one logging run.
pub struct Session<T: Transport> {
    transport: T,
    variant: DeviceVariant,
    config: SessionConfig,
    decoder: FrameDecoder,
    state: SessionState,
    phase: SessionPhase,
}

impl Session<UsbTransport> {
    /// Discover a meter over USB and claim its HID interface.
    pub async fn connect(config: SessionConfig) -> Result<Self, FnirsiError> {
        debug!(phase = %SessionPhase::Discovering, "Session phase");
        let (transport, device) = UsbTransport::open(&config).await?;
        info!(model = %device.model, "Meter ready");
        Ok(Session::new(transport, device.variant, config))
    }
}

impl<T: Transport> Session<T> {
    /// Start a session over an already-claimed interface.
    pub fn new(transport: T, variant: DeviceVariant, config: SessionConfig) -> Self {
        let decoder = FrameDecoder::from_config(&config);
        debug!(phase = %SessionPhase::InterfaceReady, %variant, "Session phase");
        Self {
            transport,
            variant,
            config,
            decoder,
            state: SessionState::new(),
            phase: SessionPhase::InterfaceReady,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn variant(&self) -> DeviceVariant {
        self.variant
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            stats: self.state.stats,
            energy_ws: self.state.energy_ws(),
            charge_as: self.state.charge_as(),
        }
    }

    /// Handshake, stream until `stop` fires, then drain.
    pub async fn run<S, C>(&mut self, sink: &mut S, stop: &mut C) -> Result<SessionSummary, FnirsiError>
    where
        S: SampleSink,
        C: StopSignal,
    {
        self.handshake().await?;
        self.stream(sink, stop).await?;
        self.drain().await?;

        let summary = self.summary();
        info!("Session closed: {summary}");
        Ok(summary)
    }

    /// Write the variant's handshake commands.
    pub async fn handshake(&mut self) -> Result<(), FnirsiError> {
        self.expect_phase(SessionPhase::InterfaceReady)?;
        info!(variant = %self.variant, "--- Starting Handshake ---");

        for command in self.variant.handshake() {
            debug!(%command, "Sending handshake command");
            if let Err(e) = self.transport.write(&command.to_frame()).await {
                return Err(self.fail(e));
            }
        }
        self.transition(SessionPhase::HandshakeSent);
        Ok(())
    }

    /// Read and decode reports until `stop` fires. Ends in [`SessionPhase::Draining`].
    pub async fn stream<S, C>(&mut self, sink: &mut S, stop: &mut C) -> Result<(), FnirsiError>
    where
        S: SampleSink,
        C: StopSignal,
    {
        self.expect_phase(SessionPhase::HandshakeSent)?;
        if let Err(e) = sink.begin() {
            return Err(self.fail(FnirsiError::Sink(e)));
        }

        if !self.config.settle_delay.is_zero() {
            tokio::time::sleep(self.config.settle_delay).await;
        }
        self.state.next_keepalive_deadline = Some(Instant::now() + self.variant.keepalive_interval());
        self.transition(SessionPhase::Streaming);
        info!(
            crc = self.decoder.crc_enabled(),
            alpha = self.decoder.alpha(),
            keepalive = ?self.variant.keepalive_interval(),
            "--- Streaming ---"
        );

        loop {
            if stop.should_stop() {
                self.transition(SessionPhase::Draining);
                return Ok(());
            }

            match self.transport.read(self.config.read_timeout).await {
                Ok(frame) => self.handle_frame(&frame, sink)?,
                Err(e) if !e.is_recoverable() => return Err(self.fail(e)),
                Err(TransportError::ShortFrame { len }) => {
                    self.state.stats.short_frames += 1;
                    warn!(len, "Ignoring short report");
                }
                Err(_) => trace!("No report within read timeout"),
            }

            self.keepalive_if_due().await?;
        }
    }

    /// Discard inbound reports until one read times out, then close.
    pub async fn drain(&mut self) -> Result<u64, FnirsiError> {
        self.expect_phase(SessionPhase::Draining)?;
        info!("Draining...");

        loop {
            match self.transport.read(self.config.drain_timeout).await {
                Ok(_) | Err(TransportError::ShortFrame { .. }) => {
                    self.state.stats.frames_drained += 1;
                    trace!("Drained report");
                }
                Err(e) if e.is_timeout() => break,
                Err(e) => return Err(self.fail(e)),
            }
        }

        debug!(frames = self.state.stats.frames_drained, "Drain complete");
        self.transition(SessionPhase::Closed);
        Ok(self.state.stats.frames_drained)
    }

    fn handle_frame<S: SampleSink>(&mut self, frame: &RawFrame, sink: &mut S) -> Result<(), FnirsiError> {
        let stats = &mut self.state.stats;
        stats.frames_received += 1;
        if frame.is_data() {
            stats.data_frames += 1;
        } else {
            stats.non_data_frames += 1;
            trace!(packet_type = frame.packet_type, "Ignoring non-data report");
        }

        match self.decoder.decode(frame, &mut self.state, Utc::now()) {
            Ok(samples) if samples.is_empty() => Ok(()),
            Ok(samples) => {
                let written = samples
                    .iter()
                    .try_for_each(|sample| sink.emit(sample))
                    .and_then(|()| sink.flush());
                if let Err(e) = written {
                    return Err(self.fail(FnirsiError::Sink(e)));
                }
                self.state.stats.samples_emitted += samples.len() as u64;
                Ok(())
            }
            Err(e) => {
                if matches!(e, FrameError::ChecksumMismatch { .. }) {
                    self.state.stats.checksum_failures += 1;
                }
                warn!("Ignoring report: {e}");
                debug!(bytes = %frame, "Rejected report");
                Ok(())
            }
        }
    }

    async fn keepalive_if_due(&mut self) -> Result<(), FnirsiError> {
        match self.state.next_keepalive_deadline {
            Some(deadline) if Instant::now() >= deadline => {}
            _ => return Ok(()),
        }

        if let Err(e) = self.transport.write(&KEEPALIVE.to_frame()).await {
            return Err(self.fail(e));
        }
        self.state.stats.keepalives_sent += 1;
        self.state.next_keepalive_deadline = Some(Instant::now() + self.variant.keepalive_interval());
        trace!("Keep-alive sent");
        Ok(())
    }

    fn expect_phase(&self, expected: SessionPhase) -> Result<(), FnirsiError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(FnirsiError::InvalidPhase {
                expected,
                actual: self.phase,
            })
        }
    }

    fn transition(&mut self, next: SessionPhase) {
        debug!(from = %self.phase, to = %next, "Session phase");
        self.phase = next;
    }

    /// Close the session on a fatal error.
    fn fail(&mut self, error: impl Into<FnirsiError>) -> FnirsiError {
        let error = error.into();
        warn!("Session terminated: {error}");
        self.transition(SessionPhase::Closed);
        error
    }
}
