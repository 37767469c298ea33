//! Two-phase ignition/injection pipelines (spec.md 4.6). Each pipeline is a small state
//! machine driven by one timer's one-shot completion; the transition logic is pulled out of
//! the ISR bodies here so it is host-testable, while the firmware binary's ISRs do nothing but
//! call `on_fire` and act on the returned [`PinState`]/re-arm request.
//!
//! Neither pipeline ever touches the mode state machine — only the tach ISR does (spec.md 4.6,
//! "The ISRs never touch the mode state machine").

use crate::constants::DWELL_TIME_US;

/// Output pin level an ISR should drive after a transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PinState {
    High,
    Low,
}

/// Spark pipeline: CHARGE -> (dwell) -> DISCHARGE. `Idle` between cycles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SparkPhase {
    #[default]
    Idle,
    Charging,
}

/// What the spark charge-timer ISR should do: stop itself, drive the pin, and re-arm the
/// discharge timer for `DWELL_TIME_US`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SparkChargeAction {
    pub pin: PinState,
    pub rearm_discharge_us: f32,
}

/// What the spark discharge-timer ISR should do: stop itself and drive the pin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SparkDischargeAction {
    pub pin: PinState,
}

impl SparkPhase {
    /// SPARK_CHARGE fires: stop the charge timer (caller's job), drive the pin HIGH, and arm
    /// discharge for exactly `DWELL_TIME_US` (spec.md 4.6).
    pub fn on_charge_fire(&mut self) -> SparkChargeAction {
        *self = SparkPhase::Charging;
        SparkChargeAction { pin: PinState::High, rearm_discharge_us: DWELL_TIME_US }
    }

    /// SPARK_DISCHARGE fires: drive the pin LOW, stop the discharge timer (caller's job).
    pub fn on_discharge_fire(&mut self) -> SparkDischargeAction {
        *self = SparkPhase::Idle;
        SparkDischargeAction { pin: PinState::Low }
    }
}

/// Fuel pipeline: START -> (fuelDuration) -> STOP. `Idle` between cycles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FuelPhase {
    #[default]
    Idle,
    Injecting,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FuelStartAction {
    pub pin: PinState,
    pub rearm_stop_us: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FuelStopAction {
    pub pin: PinState,
}

impl FuelPhase {
    /// FUEL_START fires: stop the start timer, drive the pin HIGH, arm FUEL_STOP for
    /// `fuel_duration_us` (spec.md 4.6). `fuel_duration_us` is the pulse width computed this
    /// cycle by the fueling model (C4).
    pub fn on_start_fire(&mut self, fuel_duration_us: f32) -> FuelStartAction {
        *self = FuelPhase::Injecting;
        FuelStartAction { pin: PinState::High, rearm_stop_us: fuel_duration_us }
    }

    /// FUEL_STOP fires: drive the pin LOW, stop the stop timer.
    pub fn on_stop_fire(&mut self) -> FuelStopAction {
        *self = FuelPhase::Idle;
        FuelStopAction { pin: PinState::Low }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spark_charge_then_discharge_toggles_pin_high_then_low() {
        let mut spark = SparkPhase::default();
        let charge = spark.on_charge_fire();
        assert_eq!(charge.pin, PinState::High);
        assert_eq!(charge.rearm_discharge_us, DWELL_TIME_US);
        assert_eq!(spark, SparkPhase::Charging);

        let discharge = spark.on_discharge_fire();
        assert_eq!(discharge.pin, PinState::Low);
        assert_eq!(spark, SparkPhase::Idle);
    }

    #[test]
    fn fuel_start_then_stop_toggles_pin_high_then_low() {
        let mut fuel = FuelPhase::default();
        let start = fuel.on_start_fire(7_700.0);
        assert_eq!(start.pin, PinState::High);
        assert_eq!(start.rearm_stop_us, 7_700.0);
        assert_eq!(fuel, FuelPhase::Injecting);

        let stop = fuel.on_stop_fire();
        assert_eq!(stop.pin, PinState::Low);
        assert_eq!(fuel, FuelPhase::Idle);
    }

    #[test]
    fn dwell_is_constant_regardless_of_rpm() {
        // spec.md invariant 6: spark HIGH interval is DWELL_TIME_US for every event.
        let mut low_rpm = SparkPhase::default();
        let mut high_rpm = SparkPhase::default();
        assert_eq!(low_rpm.on_charge_fire().rearm_discharge_us, high_rpm.on_charge_fire().rearm_discharge_us);
    }
}
