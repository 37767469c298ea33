//! Compile-time tunables, gathered in one place per the design note that flagged ad-hoc
//! magic numbers (127, 128 us) scattered through the original firmware.

/// Engine angle at TDC. All scheduling angles are degrees in `[0, 360)`, measured from the
/// tach sensor's mechanical zero; `TDC` is the wrap point.
pub const TDC: f32 = 360.0;

/// Angle (during the intake stroke) at which fueling must be complete.
pub const FUEL_END_ANGLE: f32 = 120.0;

/// Coil charge time before a spark discharge, in microseconds.
pub const DWELL_TIME_US: f32 = 3_000.0;

/// Minimum time a one-shot timer needs between being armed and firing, in microseconds.
/// Below this, an event is late enough that arming it would be unreliable, so the event is
/// skipped for that cycle instead (see `scheduler::ArmOutcome`).
pub const MIN_LATCH_TIME_US: f32 = 128.0;

/// Mechanical offset of the tach sensor from TDC, in the direction of rotation, in degrees.
pub const CALIB_ANGLE: f32 = 10.0;

/// EMA weight given to the freshest angular-speed sample. 0.7 favors recency over smoothing
/// single-tooth jitter; a tuned design parameter, not a physical constant.
pub const SPEED_FILTER_ALPHA: f32 = 0.7;

/// Engine displacement, in cubic meters (35.8 cc).
pub const ENGINE_DISPLACEMENT_M3: f32 = 35.8e-6;

/// Universal gas constant, J/(mol*K).
pub const GAS_CONSTANT: f32 = 8.314;

/// Molar mass of air, g/mol.
pub const MOLAR_MASS_AIR: f32 = 28.97;

/// Stoichiometric air-fuel ratio by mass for gasoline.
pub const AIR_FUEL_RATIO: f32 = 14.7;

/// Nominal injector mass flow rate, g/s.
pub const MASS_FLOW_RATE: f32 = 0.6;

/// Fixed volumetric efficiency used in CRANKING (no VE table lookup at low, noisy RPM).
pub const CRANK_VOL_EFF: f32 = 0.30;

/// Fixed spark advance (degrees BTDC) used in CRANKING.
pub const CRANK_SPARK_ADV: f32 = 10.0;

/// RPM below which the engine is considered stopped; no events are armed.
pub const ENGAGE_SPEED_RPM: f32 = 100.0;

/// RPM below which the engine is in CRANKING, above which it is RUNNING.
pub const CRANKING_SPEED_RPM: f32 = 500.0;

/// RPM at or above which the rev limiter engages.
pub const UPPER_REV_LIMIT_RPM: f32 = 6_000.0;

/// RPM below which the rev limiter releases (hysteresis).
pub const LOWER_REV_LIMIT_RPM: f32 = 5_800.0;

/// Diagnostic print counter period: one SERIAL_OUT line every this many tach edges.
pub const SERIAL_PRINT_PERIOD: u8 = 10;
