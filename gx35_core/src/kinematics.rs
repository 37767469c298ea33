//! Crankshaft kinematic state, updated only from the tach edge ISR (spec.md 3, 4.3).
//!
//! The crankshaft is single-toothed (spec.md 1, non-goal: cam-phase detection): one tach
//! pulse is one full revolution, so `fuelCycle` is the only way this firmware distinguishes
//! intake-stroke revolutions from power-stroke ones, and it does so arbitrarily (design note
//! in spec.md 9) — this is a documented limitation, not a silent choice.

use crate::constants::{CALIB_ANGLE, SERIAL_PRINT_PERIOD, SPEED_FILTER_ALPHA, TDC};

/// Kinematic state. The tach ISR is its sole writer; the main loop reads it (under a brief
/// critical section on platforms where multi-word reads can tear — see the firmware binary's
/// RTIC resource lock around this struct).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct KinematicState {
    /// Timestamp (us) of the most recent tach edge.
    pub calib_angle_time: u32,
    /// Timestamp (us) of the tach edge before that.
    pub last_calib_angle_time: u32,
    /// Filtered angular speed, degrees/us. Positive whenever the engine is turning.
    pub angular_speed: f32,
    /// Parity bit for the 4-stroke fueling cycle; toggles on every tach edge.
    pub fuel_cycle: bool,
    /// Diagnostic print counter, advanced mod `SERIAL_PRINT_PERIOD` on every tach edge.
    pub serial_print_count: u8,
}

impl KinematicState {
    /// Called from the tach edge ISR with the current free-running microsecond timestamp.
    /// Updates speed, toggles `fuel_cycle`, advances the print counter. Does not itself force
    /// the mode transition to CALIBRATION — the firmware binary's ISR does that immediately
    /// after this call, as the authoritative synchronization point for the main loop
    /// (spec.md 9, "Forced state override from ISR").
    pub fn on_tach_edge(&mut self, now_us: u32) {
        self.last_calib_angle_time = self.calib_angle_time;
        self.calib_angle_time = now_us;

        // Wrapping subtraction: `now_us` and `calib_angle_time` are free-running hardware
        // timer ticks, and the hardware timer itself wraps; this matches that arithmetic.
        let dt_us = now_us.wrapping_sub(self.last_calib_angle_time);
        if dt_us > 0 {
            let instant_speed = TDC / dt_us as f32;
            self.angular_speed =
                SPEED_FILTER_ALPHA * instant_speed + (1.0 - SPEED_FILTER_ALPHA) * self.angular_speed;
        }

        self.fuel_cycle = !self.fuel_cycle;
        self.serial_print_count = (self.serial_print_count + 1) % SERIAL_PRINT_PERIOD;
    }

    /// Current engine angle at wall-clock time `now_us`, wrapped into `[0, 360)`. Exact
    /// relationship from spec.md 3/4.3: `(now - calibAngleTime) * angularSpeed + CALIB_ANGLE`.
    pub fn current_angle(&self, now_us: u32) -> f32 {
        let elapsed = now_us.wrapping_sub(self.calib_angle_time) as f32;
        let mut angle = elapsed * self.angular_speed + CALIB_ANGLE;
        while angle >= TDC {
            angle -= TDC;
        }
        while angle < 0.0 {
            angle += TDC;
        }
        angle
    }

    /// Instantaneous RPM implied by the filtered angular speed (degrees/us -> RPM).
    pub fn rpm(&self) -> f32 {
        convert_from_angular_speed(self.angular_speed)
    }
}

/// degrees/us -> RPM: one revolution is 360 degrees; `speed` deg/us * 1e6 us/s * 60 s/min / 360
/// deg/rev.
pub fn convert_from_angular_speed(speed_deg_per_us: f32) -> f32 {
    speed_deg_per_us * 1.0e6 * 60.0 / TDC
}

/// RPM -> degrees/us, the inverse of `convert_from_angular_speed` (spec.md 8, invariant 9).
pub fn convert_to_angular_speed(rpm: f32) -> f32 {
    rpm * TDC / (1.0e6 * 60.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn angle_at_edge_is_calib_angle() {
        let mut k = KinematicState::default();
        k.on_tach_edge(1_000);
        // At t0 exactly, elapsed = 0, so current_angle == CALIB_ANGLE.
        assert!((k.current_angle(1_000) - CALIB_ANGLE).abs() < 1e-4);
    }

    #[test]
    fn angle_is_monotonic_while_turning() {
        let mut k = KinematicState::default();
        k.on_tach_edge(0);
        k.on_tach_edge(20_000); // 20ms between edges -> plausible RPM
        assert!(k.angular_speed > 0.0);

        let mut prev = k.current_angle(20_000);
        for t in (20_000u32..60_000).step_by(500) {
            let a = k.current_angle(t);
            // mod-360 monotonic: either continues increasing, or wraps down by crossing 360.
            assert!(a >= prev - 1e-3 || (prev > 300.0 && a < 60.0));
            prev = a;
        }
    }

    #[test]
    fn fuel_cycle_toggles_every_edge() {
        let mut k = KinematicState::default();
        let start = k.fuel_cycle;
        k.on_tach_edge(1_000);
        assert_eq!(k.fuel_cycle, !start);
        k.on_tach_edge(2_000);
        assert_eq!(k.fuel_cycle, start);
    }

    #[test]
    fn rpm_round_trips() {
        for rpm in [300.0_f32, 3_000.0, 6_000.0] {
            let speed = convert_to_angular_speed(rpm);
            let back = convert_from_angular_speed(speed);
            assert!((back - rpm).abs() < 1e-2, "{rpm} -> {back}");
        }
    }

    proptest::proptest! {
        // Invariant 9 (spec.md 8): RPM survives a round trip through the angular-speed
        // conversions, for any plausible engine speed.
        #[test]
        fn rpm_round_trips_for_any_plausible_speed(rpm in 0.0f32..20_000.0) {
            let speed = convert_to_angular_speed(rpm);
            let back = convert_from_angular_speed(speed);
            proptest::prop_assert!((back - rpm).abs() < 1e-1);
        }

        // Invariant 3 (spec.md 8): currentAngle only ever advances forward mod 360 while the
        // engine is turning, for any tach interval and any forward-advancing sample times.
        // Checked as a bounded forward modular distance rather than a raw a >= prev comparison,
        // since a >= prev breaks exactly at a wrap boundary.
        #[test]
        fn current_angle_is_monotonic_mod_360(
            dt_us in 1_000u32..200_000,
            sample_offsets in proptest::collection::vec(0u32..1_000, 10),
        ) {
            let mut k = KinematicState::default();
            k.on_tach_edge(0);
            k.on_tach_edge(dt_us);
            proptest::prop_assume!(k.angular_speed > 0.0);

            // Worst-case advance per sample: largest offset times the fastest possible filtered
            // speed (alpha applied once against a zero previous speed, from the fastest dt_us).
            let max_step_deg = 1_000.0 * 0.7 * (360.0 / 1_000.0) + 1.0;

            let mut t = dt_us;
            let mut prev = k.current_angle(t);
            for offset in sample_offsets {
                t += offset;
                let a = k.current_angle(t);
                let forward_delta = (a - prev).rem_euclid(360.0);
                proptest::prop_assert!(forward_delta <= max_step_deg);
                prev = a;
            }
        }
    }

    #[test]
    fn ema_filter_blends_with_previous() {
        let mut k = KinematicState::default();
        k.on_tach_edge(0);
        k.on_tach_edge(10_000);
        let first = k.angular_speed;
        // First real interval blends with the zero-initialized previous speed, per spec.
        assert!((first - SPEED_FILTER_ALPHA * (TDC / 10_000.0)).abs() < 1e-6);

        k.on_tach_edge(20_000);
        let expected = SPEED_FILTER_ALPHA * (TDC / 10_000.0) + (1.0 - SPEED_FILTER_ALPHA) * first;
        assert!((k.angular_speed - expected).abs() < 1e-6);
    }
}
