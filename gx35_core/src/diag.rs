//! Diagnostic serial encoder (spec.md 6, SPEC_FULL.md 4.10). Pure formatting, never called
//! from ISR context — only from the `SERIAL_OUT` mode in the main loop (spec.md 9: "diagnostic
//! prints in ISRs ... must be disabled in production builds").

use core::fmt::Write as _;
use heapless::String;

/// Max length of one encoded diagnostic line, including the trailing newline.
pub const DIAG_LINE_CAPACITY: usize = 96;

/// Encodes one ASCII diagnostic line: RPM, MAP (kPa), VE (fraction), spark discharge angle
/// (degrees), and fuel pulse width (us), comma-separated (spec.md 6).
pub fn encode_diag_line(
    rpm: f32,
    map_kpa: f32,
    ve: f32,
    spark_discharge_angle: f32,
    fuel_pulse_us: f32,
) -> String<DIAG_LINE_CAPACITY> {
    let mut line = String::new();
    // `heapless::String`'s `write!` returns `Err` only on capacity overflow; these five
    // fixed-width floats fit comfortably within `DIAG_LINE_CAPACITY`, so this never fails.
    let _ = writeln!(
        line,
        "{:.0},{:.1},{:.3},{:.1},{:.0}",
        rpm, map_kpa, ve, spark_discharge_angle, fuel_pulse_us
    );
    line
}
