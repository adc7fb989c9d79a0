//! ---
//! lvp_section: "02-network-calculation"
//! lvp_subsection: "module"
//! lvp_type: "source"
//! lvp_scope: "code"
//! lvp_description: "Transformer/busbar coupling model for the source node."
//! lvp_version: "v0.0.0-prealpha"
//! lvp_owner: "tbd"
//! ---
use tracing::debug;
use uuid::Uuid;

use crate::{
    model::{Transformer, SQRT3},
    results::{CircuitContribution, VirtualBusbarResult},
};

/// Computes the common voltage offset at the transformer secondary from
/// the aggregate net power of all departing circuits.
///
/// Sign convention: net consumption across the circuits pulls the busbar
/// below nominal (negative offset); net injection lifts it. The offset is
/// a single scalar; the per-circuit breakdown is apportioned by share of
/// total net apparent power and is for display only.
pub fn compute_busbar_effect(
    transformer: &Transformer,
    circuit_net_kva: &[(Uuid, f64)],
    cos_phi: f64,
) -> VirtualBusbarResult {
    let nominal_v = if transformer.rated_voltage > 0.0 {
        transformer.rated_voltage
    } else {
        400.0
    };
    let net_kva: f64 = circuit_net_kva.iter().map(|(_, kva)| kva).sum();

    let impedance = transformer.impedance();
    let current_a = if net_kva.abs() > f64::EPSILON {
        net_kva.abs() * 1000.0 / (SQRT3 * nominal_v)
    } else {
        0.0
    };
    let drop_v = SQRT3 * current_a * impedance.in_phase_drop(cos_phi);
    let offset_v = -net_kva.signum() * drop_v;

    let total_magnitude: f64 = circuit_net_kva.iter().map(|(_, kva)| kva.abs()).sum();
    let circuits = circuit_net_kva
        .iter()
        .map(|(cable_id, kva)| {
            let share_percent = if total_magnitude > f64::EPSILON {
                kva.abs() / total_magnitude * 100.0
            } else {
                0.0
            };
            CircuitContribution {
                cable_id: *cable_id,
                net_kva: *kva,
                share_percent,
                offset_v: offset_v * share_percent / 100.0,
            }
        })
        .collect();

    debug!(
        net_kva,
        offset_v, current_a, "busbar coupling evaluated"
    );

    VirtualBusbarResult {
        voltage_v: nominal_v + offset_v,
        offset_v,
        net_kva,
        current_a,
        circuits,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transformer_100kva() -> Transformer {
        Transformer {
            rated_kva: 100.0,
            rated_voltage: 400.0,
            ucc_percent: 4.0,
            cos_phi: 0.9,
            xr_ratio: None,
        }
    }

    #[test]
    fn consumption_pulls_busbar_down() {
        // 30 kVA three-phase load behind a 100 kVA / 4% Ucc transformer.
        let result = compute_busbar_effect(
            &transformer_100kva(),
            &[(Uuid::new_v4(), 30.0)],
            0.9,
        );
        assert!(result.current_a > 40.0 && result.current_a < 60.0);
        assert!(result.offset_v < 0.0);
        assert!(result.offset_v.abs() > 1.0);
        assert!(result.voltage_v < 400.0);
    }

    #[test]
    fn injection_lifts_busbar() {
        let result = compute_busbar_effect(
            &transformer_100kva(),
            &[(Uuid::new_v4(), -25.0)],
            0.9,
        );
        assert!(result.offset_v > 0.0);
        assert!(result.voltage_v > 400.0);
    }

    #[test]
    fn circuit_shares_sum_to_offset() {
        let result = compute_busbar_effect(
            &transformer_100kva(),
            &[(Uuid::new_v4(), 20.0), (Uuid::new_v4(), 10.0)],
            0.9,
        );
        let apportioned: f64 = result.circuits.iter().map(|c| c.offset_v).sum();
        assert!((apportioned - result.offset_v).abs() < 1e-9);
        assert!((result.circuits[0].share_percent - 66.666_666_666_666_7).abs() < 1e-6);
    }

    #[test]
    fn zero_power_is_a_clean_noop() {
        let result = compute_busbar_effect(&transformer_100kva(), &[], 0.9);
        assert_eq!(result.offset_v, 0.0);
        assert_eq!(result.current_a, 0.0);
        assert_eq!(result.voltage_v, 400.0);
    }
}
