//! Report decoding, temperature smoothing and energy/charge integration.

use crate::config::SessionConfig;
use crate::constants::{DEFAULT_TEMPERATURE_ALPHA, SAMPLES_PER_FRAME};
use crate::error::FrameError;
use crate::frame::RawFrame;
use crate::state::SessionState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// One decoded sample, with the session totals as of this sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DecodedSample {
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    /// Position of the sample within its report (0..4).
    #[serde(rename = "sample_in_packet")]
    pub index: u8,
    pub voltage_v: f64,
    pub current_a: f64,
    pub dp_v: f64,
    pub dn_v: f64,
    /// Smoothed temperature in °C.
    #[serde(rename = "temp_c_ema")]
    pub temperature_c: f64,
    pub energy_ws: f64,
    #[serde(rename = "capacity_as")]
    pub charge_as: f64,
}

impl DecodedSample {
    pub fn power_w(&self) -> f64 {
        self.voltage_v * self.current_a
    }
}

impl fmt::Display for DecodedSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.3} {} {:7.5} {:7.5} {:5.3} {:5.3} {:6.3} {:.6} {:.6}",
            self.timestamp,
            self.index,
            self.voltage_v,
            self.current_a,
            self.dp_v,
            self.dn_v,
            self.temperature_c,
            self.energy_ws,
            self.charge_as
        )
    }
}

/// Turns reports into samples. Holds only configuration; all running state lives in
/// [`SessionState`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameDecoder {
    crc_enabled: bool,
    alpha: f64,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(true, DEFAULT_TEMPERATURE_ALPHA)
    }
}

impl FrameDecoder {
    pub fn new(crc_enabled: bool, alpha: f64) -> Self {
        Self { crc_enabled, alpha }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(config.crc_enabled, config.alpha)
    }

    pub fn crc_enabled(&self) -> bool {
        self.crc_enabled
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Decode one report received at `capture_time`.
    ///
    /// Non-data reports yield no samples. A checksum mismatch (when enabled) leaves `state`
    /// untouched and returns [`FrameError::ChecksumMismatch`]. Otherwise four samples are
    /// produced, back-dated from `capture_time` by one sample interval per position, with
    /// the integrator advanced once per sample.
    pub fn decode(
        &self,
        frame: &RawFrame,
        state: &mut SessionState,
        capture_time: DateTime<Utc>,
    ) -> Result<Vec<DecodedSample>, FrameError> {
        if !frame.is_data() {
            return Ok(Vec::new());
        }
        if self.crc_enabled {
            frame.verify_checksum()?;
        }

        let dt = state.sample_interval;
        let end = capture_time.timestamp_micros() as f64 / 1_000_000.0;
        let start = end - SAMPLES_PER_FRAME as f64 * dt;

        let mut samples = Vec::with_capacity(SAMPLES_PER_FRAME);
        for (i, slot) in frame.slots.iter().enumerate() {
            let voltage_v = slot.voltage_v();
            let current_a = slot.current_a();

            let raw_temp = slot.temperature_c();
            let temperature_c = match state.temperature_ema {
                Some(prev) => raw_temp * (1.0 - self.alpha) + prev * self.alpha,
                None => raw_temp,
            };
            state.temperature_ema = Some(temperature_c);

            state.integrator.accumulate(voltage_v, current_a, dt);

            samples.push(DecodedSample {
                timestamp: start + i as f64 * dt,
                index: i as u8,
                voltage_v,
                current_a,
                dp_v: slot.dp_v(),
                dn_v: slot.dn_v(),
                temperature_c,
                energy_ws: state.energy_ws(),
                charge_as: state.charge_as(),
            });
        }
        Ok(samples)
    }
}
