/// Running energy and charge totals for a session.
///
/// Voltage and current are unsigned on the wire, so both totals only grow.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TelemetryIntegrator {
    energy_ws: f64,
    charge_as: f64,
}

impl TelemetryIntegrator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one sample held for `dt_s` seconds into the totals.
    pub fn accumulate(&mut self, voltage_v: f64, current_a: f64, dt_s: f64) {
        let power_w = voltage_v * current_a;
        self.energy_ws += power_w * dt_s;
        self.charge_as += current_a * dt_s;
    }

    /// Cumulative energy in watt-seconds.
    pub fn energy_ws(&self) -> f64 {
        self.energy_ws
    }

    /// Cumulative charge in ampere-seconds.
    pub fn charge_as(&self) -> f64 {
        self.charge_as
    }
}
