//! Hardware abstraction traits (SPEC_FULL.md 4.9). C2's sensor reads and C6's pin/timer
//! handling are written against these, so the scheduling logic can be exercised with mocks
//! under `cargo test` on the host; the firmware binary wires real `stm32-hal2` ADC, GPIO, and
//! timer types to the same bounds (no object safety required, mirroring how the teacher's
//! `Shared` struct holds concrete `stm32_hal2` types directly rather than behind `dyn`).

/// One SPI-ADC channel (spec.md 6, "SPI-ADC contract"): returns a 12-bit unsigned count.
pub trait AdcChannel {
    fn read_raw(&mut self) -> u16;
}

/// One digital output pin (spark or fuel, spec.md 6, "Pin contract").
pub trait DigitalOut {
    fn set_high(&mut self);
    fn set_low(&mut self);
}

/// One one-shot hardware timer (spec.md 6, "Timer contract"). `start` arms for a single shot
/// `us` microseconds out; `stop` cancels (or, from within its own ISR, prevents retriggering).
pub trait OneShotTimer {
    fn start(&mut self, us: u32);
    fn stop(&mut self);
}
