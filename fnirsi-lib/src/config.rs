use crate::constants::{
    DEFAULT_DRAIN_TIMEOUT, DEFAULT_READ_TIMEOUT, DEFAULT_SETTLE_DELAY, DEFAULT_TEMPERATURE_ALPHA,
    DEFAULT_WRITE_TIMEOUT,
};
use std::time::Duration;
use tracing::warn;

/// Tunables for a logging session.
///
/// ```
/// use fnirsi_lib::SessionConfig;
/// use std::time::Duration;
///
/// let config = SessionConfig::default()
///     .with_alpha(0.8)
///     .with_read_timeout(Duration::from_secs(2))
///     .skip_reset();
/// assert!(!config.reset_device);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Drop data reports whose CRC-8 does not match.
    pub crc_enabled: bool,
    /// Temperature EMA factor in `[0, 1]`; closer to 1 is smoother.
    pub alpha: f64,
    /// How long a streaming read waits for a report.
    pub read_timeout: Duration,
    /// How long a draining read waits before the session closes.
    pub drain_timeout: Duration,
    /// Timeout for each command write.
    pub write_timeout: Duration,
    /// Pause between the handshake and the first read.
    pub settle_delay: Duration,
    /// Reset the USB port before claiming the interface.
    pub reset_device: bool,
    /// Log every configuration, interface and endpoint before claiming.
    pub describe_device: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            crc_enabled: true,
            alpha: DEFAULT_TEMPERATURE_ALPHA,
            read_timeout: DEFAULT_READ_TIMEOUT,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            reset_device: true,
            describe_device: false,
        }
    }
}

impl SessionConfig {
    pub fn with_crc(mut self, enabled: bool) -> Self {
        self.crc_enabled = enabled;
        self
    }

    /// Out-of-range or non-finite factors are clamped into `[0, 1]`.
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        let clamped = if alpha.is_finite() { alpha.clamp(0.0, 1.0) } else { DEFAULT_TEMPERATURE_ALPHA };
        if clamped != alpha {
            warn!(requested = alpha, used = clamped, "Temperature smoothing factor out of range");
        }
        self.alpha = clamped;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Skip the USB port reset (needed on macOS).
    pub fn skip_reset(mut self) -> Self {
        self.reset_device = false;
        self
    }

    pub fn describe(mut self, enabled: bool) -> Self {
        self.describe_device = enabled;
        self
    }
}
