//! ---
//! lvp_section: "02-network-calculation"
//! lvp_subsection: "module"
//! lvp_type: "source"
//! lvp_scope: "code"
//! lvp_description: "EQUI8-class neutral-current compensator model."
//! lvp_version: "v0.0.0-prealpha"
//! lvp_owner: "tbd"
//! ---
use nalgebra::Complex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn default_max_power_kva() -> f64 {
    60.0
}

fn default_tolerance_a() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompensatorConfig {
    pub enabled: bool,
    pub node: Uuid,
    /// Rated compensating power, spread over the three phase legs.
    #[serde(default = "default_max_power_kva")]
    pub max_power_kva: f64,
    /// Residual neutral current below which the device stays idle.
    #[serde(default = "default_tolerance_a")]
    pub tolerance_a: f64,
}

impl CompensatorConfig {
    pub fn new(node: Uuid) -> Self {
        Self {
            enabled: true,
            node,
            max_power_kva: default_max_power_kva(),
            tolerance_a: default_tolerance_a(),
        }
    }

    /// Maximum symmetrizing current injectable into the neutral point.
    pub fn capacity_a(&self) -> f64 {
        if self.max_power_kva <= 0.0 {
            return 0.0;
        }
        self.max_power_kva * 1000.0 / (3.0 * 230.0)
    }

    /// Evaluate the device against the per-phase currents flowing into
    /// its node and the per-phase voltages observed there.
    pub fn evaluate(
        &self,
        phase_currents: [Complex<f64>; 3],
        phase_voltages_v: [f64; 3],
    ) -> CompensatorOutput {
        let neutral_before_a =
            (phase_currents[0] + phase_currents[1] + phase_currents[2]).norm();
        let spread_before_v = voltage_spread(phase_voltages_v);

        if neutral_before_a <= self.tolerance_a {
            return CompensatorOutput {
                node: self.node,
                neutral_before_a,
                neutral_after_a: neutral_before_a,
                applied_a: 0.0,
                is_limited: false,
                voltage_spread_before_v: spread_before_v,
                voltage_spread_after_v: spread_before_v,
            };
        }

        let capacity_a = self.capacity_a();
        let applied_a = neutral_before_a.min(capacity_a);
        let is_limited = neutral_before_a > capacity_a;
        let neutral_after_a = neutral_before_a - applied_a;
        // The residual share of the neutral current scales the remaining
        // asymmetry between the phase voltages.
        let residual_ratio = neutral_after_a / neutral_before_a;
        CompensatorOutput {
            node: self.node,
            neutral_before_a,
            neutral_after_a,
            applied_a,
            is_limited,
            voltage_spread_before_v: spread_before_v,
            voltage_spread_after_v: spread_before_v * residual_ratio,
        }
    }
}

fn voltage_spread(voltages: [f64; 3]) -> f64 {
    let max = voltages[0].max(voltages[1]).max(voltages[2]);
    let min = voltages[0].min(voltages[1]).min(voltages[2]);
    max - min
}

/// Compensation outcome echoed into the simulation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompensatorOutput {
    pub node: Uuid,
    pub neutral_before_a: f64,
    pub neutral_after_a: f64,
    pub applied_a: f64,
    pub is_limited: bool,
    pub voltage_spread_before_v: f64,
    pub voltage_spread_after_v: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_phase_currents(amps: f64) -> [Complex<f64>; 3] {
        [
            Complex::new(amps, 0.0),
            Complex::new(0.0, 0.0),
            Complex::new(0.0, 0.0),
        ]
    }

    #[test]
    fn idle_below_tolerance() {
        let device = CompensatorConfig::new(Uuid::new_v4());
        let output = device.evaluate(single_phase_currents(0.5), [230.0, 230.0, 230.0]);
        assert_eq!(output.applied_a, 0.0);
        assert!(!output.is_limited);
        assert_eq!(output.neutral_after_a, output.neutral_before_a);
    }

    #[test]
    fn full_compensation_within_capacity() {
        let device = CompensatorConfig::new(Uuid::new_v4());
        let output = device.evaluate(single_phase_currents(40.0), [225.0, 231.0, 232.0]);
        assert!((output.neutral_before_a - 40.0).abs() < 1e-9);
        assert_eq!(output.neutral_after_a, 0.0);
        assert!(!output.is_limited);
        assert_eq!(output.voltage_spread_after_v, 0.0);
    }

    #[test]
    fn saturates_at_capacity() {
        let mut device = CompensatorConfig::new(Uuid::new_v4());
        device.max_power_kva = 20.0; // capacity ≈ 29 A
        let output = device.evaluate(single_phase_currents(80.0), [220.0, 232.0, 233.0]);
        assert!(output.is_limited);
        assert!((output.applied_a - device.capacity_a()).abs() < 1e-9);
        assert!(output.neutral_after_a > 0.0);
        assert!(output.voltage_spread_after_v < output.voltage_spread_before_v);
        assert!(output.voltage_spread_after_v > 0.0);
    }
}
