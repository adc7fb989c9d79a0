//! ---
//! lvp_section: "02-network-calculation"
//! lvp_subsection: "module"
//! lvp_type: "source"
//! lvp_scope: "code"
//! lvp_description: "SRG2-class discrete-tap voltage regulator model."
//! lvp_version: "v0.0.0-prealpha"
//! lvp_owner: "tbd"
//! ---
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Strictly ordered 5-position tap of an SRG2-class regulator. `Lo*`
/// positions buck the voltage, `Bo*` positions boost it, `Byp` is the
/// neutral pass-through.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub enum Srg2Tap {
    Lo2,
    Lo1,
    Byp,
    Bo1,
    Bo2,
}

impl Srg2Tap {
    /// Saturate a buck/boost position to its extreme on the same side,
    /// used when the power limit is reached.
    pub fn saturated(self) -> Srg2Tap {
        match self {
            Srg2Tap::Lo1 | Srg2Tap::Lo2 => Srg2Tap::Lo2,
            Srg2Tap::Byp => Srg2Tap::Byp,
            Srg2Tap::Bo1 | Srg2Tap::Bo2 => Srg2Tap::Bo2,
        }
    }
}

/// Hardware variant: the 400 V network device regulates phase-neutral
/// voltages, the 230 V device regulates phase-phase voltages.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Srg2Kind {
    PhaseNeutral400,
    PhasePhase230,
}

/// Operating mode; `Fixed` pins the tap regardless of measurements.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Srg2Mode {
    Auto,
    Fixed { tap: Srg2Tap },
}

/// The four switching thresholds, strictly ordered
/// `lo2_v > lo1_v > bo1_v > bo2_v`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Srg2Thresholds {
    pub lo2_v: f64,
    pub lo1_v: f64,
    pub bo1_v: f64,
    pub bo2_v: f64,
}

/// Correction coefficients in percent for the four active positions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Srg2Coefficients {
    pub lo2_percent: f64,
    pub lo1_percent: f64,
    pub bo1_percent: f64,
    pub bo2_percent: f64,
}

fn default_hysteresis_v() -> f64 {
    2.0
}

fn default_dwell_s() -> f64 {
    7.0
}

fn default_injection_limit_kva() -> f64 {
    85.0
}

fn default_consumption_limit_kva() -> f64 {
    110.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Srg2Config {
    pub enabled: bool,
    /// Installation node; ignored when it is the source node.
    pub node: Uuid,
    pub kind: Srg2Kind,
    pub mode: Srg2Mode,
    pub thresholds: Srg2Thresholds,
    pub coefficients: Srg2Coefficients,
    #[serde(default = "default_hysteresis_v")]
    pub hysteresis_v: f64,
    /// Settling delay of the physical switch; reporting attribute only,
    /// the steady-state solver treats the tap as already settled.
    #[serde(default = "default_dwell_s")]
    pub dwell_s: f64,
    #[serde(default = "default_injection_limit_kva")]
    pub injection_limit_kva: f64,
    #[serde(default = "default_consumption_limit_kva")]
    pub consumption_limit_kva: f64,
}

impl Srg2Config {
    /// Factory defaults for a hardware variant at `node`.
    pub fn for_kind(node: Uuid, kind: Srg2Kind) -> Self {
        let (thresholds, coefficients) = match kind {
            Srg2Kind::PhaseNeutral400 => (
                Srg2Thresholds {
                    lo2_v: 244.0,
                    lo1_v: 237.0,
                    bo1_v: 223.0,
                    bo2_v: 216.0,
                },
                Srg2Coefficients {
                    lo2_percent: -7.0,
                    lo1_percent: -3.5,
                    bo1_percent: 3.5,
                    bo2_percent: 7.0,
                },
            ),
            Srg2Kind::PhasePhase230 => (
                Srg2Thresholds {
                    lo2_v: 242.0,
                    lo1_v: 236.0,
                    bo1_v: 224.0,
                    bo2_v: 218.0,
                },
                Srg2Coefficients {
                    lo2_percent: -6.0,
                    lo1_percent: -3.0,
                    bo1_percent: 3.0,
                    bo2_percent: 6.0,
                },
            ),
        };
        Self {
            enabled: true,
            node,
            kind,
            mode: Srg2Mode::Auto,
            thresholds,
            coefficients,
            hysteresis_v: default_hysteresis_v(),
            dwell_s: default_dwell_s(),
            injection_limit_kva: default_injection_limit_kva(),
            consumption_limit_kva: default_consumption_limit_kva(),
        }
    }

    pub fn coefficient_percent(&self, tap: Srg2Tap) -> f64 {
        match tap {
            Srg2Tap::Lo2 => self.coefficients.lo2_percent,
            Srg2Tap::Lo1 => self.coefficients.lo1_percent,
            Srg2Tap::Byp => 0.0,
            Srg2Tap::Bo1 => self.coefficients.bo1_percent,
            Srg2Tap::Bo2 => self.coefficients.bo2_percent,
        }
    }

    fn classify(&self, voltage_v: f64) -> Srg2Tap {
        let t = &self.thresholds;
        if voltage_v > t.lo2_v {
            Srg2Tap::Lo2
        } else if voltage_v > t.lo1_v {
            Srg2Tap::Lo1
        } else if voltage_v > t.bo1_v {
            Srg2Tap::Byp
        } else if voltage_v > t.bo2_v {
            Srg2Tap::Bo1
        } else {
            Srg2Tap::Bo2
        }
    }

    /// Voltage band of a tap as (lower, upper) bounds, unbounded ends as
    /// infinities.
    fn band(&self, tap: Srg2Tap) -> (f64, f64) {
        let t = &self.thresholds;
        match tap {
            Srg2Tap::Lo2 => (t.lo2_v, f64::INFINITY),
            Srg2Tap::Lo1 => (t.lo1_v, t.lo2_v),
            Srg2Tap::Byp => (t.bo1_v, t.lo1_v),
            Srg2Tap::Bo1 => (t.bo2_v, t.bo1_v),
            Srg2Tap::Bo2 => (f64::NEG_INFINITY, t.bo2_v),
        }
    }

    /// Equilibrium tap for a measured entry voltage. With a prior tap the
    /// hysteresis band applies: the device holds its position until the
    /// voltage leaves the prior band by more than `hysteresis_v`.
    pub fn select_tap(&self, entry_v: f64, prior: Option<Srg2Tap>) -> Srg2Tap {
        if let Some(prior_tap) = prior {
            let (lower, upper) = self.band(prior_tap);
            if entry_v > lower - self.hysteresis_v && entry_v <= upper + self.hysteresis_v {
                return prior_tap;
            }
        }
        self.classify(entry_v)
    }

    /// Resolve the tap for one phase and apply its correction.
    pub fn regulate_phase(&self, entry_v: f64, prior: Option<Srg2Tap>) -> Srg2PhaseDecision {
        let tap = match self.mode {
            Srg2Mode::Auto => self.select_tap(entry_v, prior),
            Srg2Mode::Fixed { tap } => tap,
        };
        let coefficient_percent = self.coefficient_percent(tap);
        Srg2PhaseDecision {
            tap,
            entry_voltage_v: entry_v,
            output_voltage_v: entry_v * (1.0 + coefficient_percent / 100.0),
            coefficient_percent,
        }
    }
}

/// Outcome of the tap selection for one phase.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Srg2PhaseDecision {
    pub tap: Srg2Tap,
    pub entry_voltage_v: f64,
    pub output_voltage_v: f64,
    pub coefficient_percent: f64,
}

/// Aggregated regulator outcome echoed into the simulation result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegulatorOutput {
    pub node: Uuid,
    pub kind: Srg2Kind,
    pub phases: Vec<Srg2PhaseDecision>,
    /// Net power downstream of the device, all phases combined.
    pub downstream_net_kva: f64,
    pub power_limited: bool,
    pub dwell_s: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> Srg2Config {
        Srg2Config::for_kind(Uuid::new_v4(), Srg2Kind::PhaseNeutral400)
    }

    #[test]
    fn classification_covers_all_bands() {
        let device = device();
        assert_eq!(device.select_tap(250.0, None), Srg2Tap::Lo2);
        assert_eq!(device.select_tap(240.0, None), Srg2Tap::Lo1);
        assert_eq!(device.select_tap(230.0, None), Srg2Tap::Byp);
        assert_eq!(device.select_tap(220.0, None), Srg2Tap::Bo1);
        assert_eq!(device.select_tap(210.0, None), Srg2Tap::Bo2);
    }

    #[test]
    fn overvoltage_engages_full_buck() {
        let device = device();
        let decision = device.regulate_phase(250.0, None);
        assert_eq!(decision.tap, Srg2Tap::Lo2);
        assert!((decision.output_voltage_v - 250.0 * 0.93).abs() < 1e-9);
    }

    #[test]
    fn hysteresis_holds_the_prior_tap_near_a_boundary() {
        let device = device();
        // 238 V is just above the Byp/Lo1 boundary (237 V) but inside the
        // hysteresis margin, so a device sitting in Byp stays there.
        assert_eq!(device.select_tap(238.0, Some(Srg2Tap::Byp)), Srg2Tap::Byp);
        // Beyond the margin it commits to Lo1.
        assert_eq!(device.select_tap(240.0, Some(Srg2Tap::Byp)), Srg2Tap::Lo1);
        // Without a prior tap the raw classification applies.
        assert_eq!(device.select_tap(238.0, None), Srg2Tap::Lo1);
    }

    #[test]
    fn fixed_mode_pins_the_tap() {
        let mut device = device();
        device.mode = Srg2Mode::Fixed { tap: Srg2Tap::Bo2 };
        let decision = device.regulate_phase(250.0, None);
        assert_eq!(decision.tap, Srg2Tap::Bo2);
        assert!((decision.output_voltage_v - 250.0 * 1.07).abs() < 1e-9);
    }

    #[test]
    fn saturation_moves_to_the_extreme_of_the_same_side() {
        assert_eq!(Srg2Tap::Lo1.saturated(), Srg2Tap::Lo2);
        assert_eq!(Srg2Tap::Bo1.saturated(), Srg2Tap::Bo2);
        assert_eq!(Srg2Tap::Byp.saturated(), Srg2Tap::Byp);
    }

    #[test]
    fn phase_phase_variant_uses_smaller_steps() {
        let device = Srg2Config::for_kind(Uuid::new_v4(), Srg2Kind::PhasePhase230);
        let decision = device.regulate_phase(250.0, None);
        assert_eq!(decision.tap, Srg2Tap::Lo2);
        assert!((decision.output_voltage_v - 250.0 * 0.94).abs() < 1e-9);
    }
}
