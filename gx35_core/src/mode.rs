//! Mode state machine (spec.md 4.7): `READ_SENSORS -> CALIBRATION -> {CRANKING, RUNNING,
//! REV_LIMITER} -> SERIAL_OUT`. All transitions are driven by the main loop except
//! `CALIBRATION` entry, which the tach ISR forces unconditionally (spec.md 9, "Forced state
//! override from ISR") — that override lives in `kinematics`/the firmware binary, not here;
//! this module only implements the *decision* the main loop makes once it observes
//! `CALIBRATION`.

use crate::constants::{CRANKING_SPEED_RPM, ENGAGE_SPEED_RPM, LOWER_REV_LIMIT_RPM, UPPER_REV_LIMIT_RPM};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Mode {
    #[default]
    ReadSensors,
    Calibration,
    Cranking,
    Running,
    RevLimiter,
    SerialOut,
}

/// The CALIBRATION decision (spec.md 4.7): partitions by killswitch, then rev-limit hysteresis,
/// then RPM band. `rev_limit_active` is read from the safety supervisor and is itself updated
/// there, not here — this function only decides the next `Mode` given the current readings.
pub fn decide_after_calibration(killswitch_closed: bool, rev_limit_active: bool, rpm: f32) -> Mode {
    if !killswitch_closed {
        return Mode::ReadSensors;
    }
    if rev_limit_active {
        // Stays in the limiter until RPM drops below the lower hysteresis threshold.
        return if rpm < LOWER_REV_LIMIT_RPM { Mode::Running } else { Mode::RevLimiter };
    }
    if rpm < ENGAGE_SPEED_RPM {
        Mode::ReadSensors
    } else if rpm < CRANKING_SPEED_RPM {
        Mode::Cranking
    } else if rpm < UPPER_REV_LIMIT_RPM {
        Mode::Running
    } else {
        Mode::RevLimiter
    }
}

/// Whether the print counter reaching zero should route this cycle through `SERIAL_OUT` before
/// returning to `READ_SENSORS` (spec.md 4.7 mode table).
pub fn should_print(serial_print_count: u8) -> bool {
    serial_print_count == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn killswitch_open_always_wins() {
        assert_eq!(decide_after_calibration(false, true, 6_500.0), Mode::ReadSensors);
        assert_eq!(decide_after_calibration(false, false, 3_000.0), Mode::ReadSensors);
    }

    #[test]
    fn rev_limiter_holds_until_lower_threshold() {
        assert_eq!(decide_after_calibration(true, true, 5_900.0), Mode::RevLimiter);
        assert_eq!(decide_after_calibration(true, true, 5_700.0), Mode::Running);
    }

    #[test]
    fn rpm_bands_partition_correctly() {
        assert_eq!(decide_after_calibration(true, false, 50.0), Mode::ReadSensors);
        assert_eq!(decide_after_calibration(true, false, 300.0), Mode::Cranking);
        assert_eq!(decide_after_calibration(true, false, 3_000.0), Mode::Running);
        assert_eq!(decide_after_calibration(true, false, 6_100.0), Mode::RevLimiter);
    }

    #[test]
    fn band_boundaries_are_exact() {
        assert_eq!(decide_after_calibration(true, false, ENGAGE_SPEED_RPM), Mode::Cranking);
        assert_eq!(decide_after_calibration(true, false, CRANKING_SPEED_RPM), Mode::Running);
        assert_eq!(decide_after_calibration(true, false, UPPER_REV_LIMIT_RPM), Mode::RevLimiter);
    }

    #[test]
    fn scenario_s4_rev_limit_ramp() {
        // spec.md S4: 5500 -> 6100 -> 5700 -> 5900, starting outside the limiter.
        let mut rev_limit_active = false;
        for (rpm, expect_active_after) in
            [(5_500.0, false), (6_100.0, true), (5_700.0, false), (5_900.0, false)]
        {
            let mode = decide_after_calibration(true, rev_limit_active, rpm);
            rev_limit_active = mode == Mode::RevLimiter;
            assert_eq!(rev_limit_active, expect_active_after, "at rpm={rpm}");
        }
    }

    #[test]
    fn print_counter_only_fires_at_zero() {
        assert!(should_print(0));
        assert!(!should_print(1));
        assert!(!should_print(9));
    }
}
