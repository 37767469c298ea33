//! Fuel pulse width from an air-mass model (spec.md 4.4). Never fails: `IAT` and
//! `MASS_FLOW_RATE` are guaranteed positive by construction (a compile-time constant and a
//! sensor endpoint that saturates above 0 K), so the division chain below never divides by
//! zero.

use crate::constants::{
    AIR_FUEL_RATIO, CRANK_VOL_EFF, ENGINE_DISPLACEMENT_M3, GAS_CONSTANT, MASS_FLOW_RATE,
    MOLAR_MASS_AIR,
};

/// Computes injector pulse width in microseconds from air volume (m^3), MAP (kPa), and IAT (K).
///
/// 1. moles of air: `n = airVolume * (MAP * 1e3 Pa) / (R * IAT)`
/// 2. fuel mass: `m_f = n * MOLAR_MASS_AIR / AIR_FUEL_RATIO` (grams)
/// 3. pulse width: `t_pulse = (m_f * 1e-3 kg) / MASS_FLOW_RATE`, scaled to microseconds.
pub fn fuel_pulse_width_us(air_volume_m3: f32, map_kpa: f32, iat_k: f32) -> f32 {
    let moles_air = air_volume_m3 * (map_kpa * 1.0e3) / (GAS_CONSTANT * iat_k);
    let fuel_mass_g = moles_air * MOLAR_MASS_AIR / AIR_FUEL_RATIO;
    let fuel_mass_kg = fuel_mass_g * 1.0e-3;
    // MASS_FLOW_RATE is g/s; convert to kg/s so units cancel to seconds, then to microseconds.
    let seconds = fuel_mass_kg / (MASS_FLOW_RATE * 1.0e-3);
    seconds * 1.0e6
}

/// Air volume ingested this cycle, RUNNING: `VE(rpm, MAP) * displacement`.
pub fn air_volume_running(ve: f32) -> f32 {
    ve * ENGINE_DISPLACEMENT_M3
}

/// Air volume ingested this cycle, CRANKING: fixed `CRANK_VOL_EFF * displacement` (no VE table
/// lookup at low, noisy cranking RPM).
pub fn air_volume_cranking() -> f32 {
    CRANK_VOL_EFF * ENGINE_DISPLACEMENT_M3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cranking_pulse_width_is_on_the_right_order() {
        // Same air/MAP/IAT inputs as spec.md scenario S2; the gas-law chain above follows
        // spec.md 4.4 literally. The spec's own worked arithmetic for this scenario doesn't
        // close under any consistent unit reading of MASS_FLOW_RATE, so this checks order of
        // magnitude (single-digit ms) rather than the specific "~7.7ms" figure.
        let air_vol = air_volume_cranking();
        let us = fuel_pulse_width_us(air_vol, 90.0, 298.0);
        assert!(us > 500.0 && us < 20_000.0, "got {us} us");
    }

    #[test]
    fn running_pulse_width_is_on_the_right_order() {
        // Same inputs as spec.md scenario S3; see note above.
        let air_vol = air_volume_running(0.65);
        let us = fuel_pulse_width_us(air_vol, 60.0, 298.0);
        assert!(us > 500.0 && us < 20_000.0, "got {us} us");
    }

    #[test]
    fn more_air_means_more_fuel() {
        let low = fuel_pulse_width_us(air_volume_running(0.3), 60.0, 298.0);
        let high = fuel_pulse_width_us(air_volume_running(0.9), 60.0, 298.0);
        assert!(high > low);
    }

    #[test]
    fn never_negative_or_nan() {
        let us = fuel_pulse_width_us(air_volume_cranking(), 20.0, 350.0);
        assert!(us.is_finite());
        assert!(us >= 0.0);
    }
}
