use crate::constants::SAMPLE_INTERVAL_S;
use crate::integrator::TelemetryIntegrator;
use tokio::time::Instant;

/// Mutable per-session state, owned by the session and handed to the decoder by `&mut`.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Smoothed temperature; `None` until the first valid sample.
    pub temperature_ema: Option<f64>,
    pub integrator: TelemetryIntegrator,
    /// Seconds between samples, fixed by the device at 1/100 s.
    pub sample_interval: f64,
    /// When the next keep-alive is due. Set once streaming starts.
    pub next_keepalive_deadline: Option<Instant>,
    pub stats: SessionStats,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            temperature_ema: None,
            integrator: TelemetryIntegrator::new(),
            sample_interval: SAMPLE_INTERVAL_S,
            next_keepalive_deadline: None,
            stats: SessionStats::default(),
        }
    }

    pub fn energy_ws(&self) -> f64 {
        self.integrator.energy_ws()
    }

    pub fn charge_as(&self) -> f64 {
        self.integrator.charge_as()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters kept for the end-of-session summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames_received: u64,
    pub data_frames: u64,
    pub non_data_frames: u64,
    pub checksum_failures: u64,
    pub short_frames: u64,
    pub samples_emitted: u64,
    pub keepalives_sent: u64,
    pub frames_drained: u64,
}
