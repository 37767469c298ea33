//! Event scheduler (spec.md 4.5): translates angular targets into timer arming values.
//!
//! Each arming computation samples the engine angle fresh, right before arming, so the
//! resulting `Δt` is as accurate as the main loop's timing allows. This module is pure — it
//! returns the angles and durations to arm, and a [`Skip`] outcome when an event would be
//! armed too late to be useful; it never touches a timer directly (see `hal_traits`).

use crate::constants::{DWELL_TIME_US, FUEL_END_ANGLE, MIN_LATCH_TIME_US, TDC};

/// Result of an arming attempt: either a `Δt` in microseconds to arm a one-shot timer for, or
/// a documented skip. Past-due and too-soon targets are collapsed into one outcome — both mean
/// "don't fire this cycle" (spec.md 4.5, 7, 8 invariant 6/S6).
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Arming {
    /// Arm the timer for this many microseconds from now.
    Fire(f32),
    /// The target angle is already past, or close enough that arming could not land before
    /// `MIN_LATCH_TIME_US`; skip this cycle's event entirely.
    Skip,
}

/// `Δt = (theta_target - theta_now) / omega`, skipped if negative or below the timer's minimum
/// latch time (spec.md 4.5). `omega` is in degrees/us, as produced by `KinematicState`.
pub fn arm(theta_target: f32, theta_now: f32, omega: f32) -> Arming {
    let dt_us = (theta_target - theta_now) / omega;
    if dt_us < MIN_LATCH_TIME_US {
        Arming::Skip
    } else {
        Arming::Fire(dt_us)
    }
}

/// Angle at which to start the fuel pulse, so that it ends at `FUEL_END_ANGLE` (spec.md 4.5
/// step 1): `fuelStartAngle = FUEL_END_ANGLE - t_pulse * omega`.
pub fn fuel_start_angle(fuel_pulse_us: f32, omega: f32) -> f32 {
    FUEL_END_ANGLE - fuel_pulse_us * omega
}

/// Angle at which to begin charging the coil, `DWELL_TIME_US` before discharge (spec.md 4.5
/// step 3): `sparkChargeAngle = sparkDischargeAngle - DWELL_TIME_US * omega`.
pub fn spark_charge_angle(spark_discharge_angle: f32, omega: f32) -> f32 {
    spark_discharge_angle - DWELL_TIME_US * omega
}

/// Spark discharge angle in RUNNING: `TDC - SA(rpm, MAP)`.
pub fn spark_discharge_angle_running(spark_advance_deg: f32) -> f32 {
    TDC - spark_advance_deg
}

/// Spark discharge angle in CRANKING: `TDC - CRANK_SPARK_ADV`.
pub fn spark_discharge_angle_cranking(crank_spark_adv_deg: f32) -> f32 {
    TDC - crank_spark_adv_deg
}
