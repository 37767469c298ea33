//! Adapters wiring real `stm32-hal2` peripherals to the `gx35_core` hardware-abstraction traits
//! (`gx35_core::hal_traits`), mirroring how the teacher firmware uses `stm32_hal2` types
//! directly inside its `Shared` struct rather than behind an abstraction layer — the
//! abstraction here exists purely so `gx35_core`'s scheduling logic can also run against the
//! mock types in `hal_traits::mock` under `cargo test` on the host.

use gx35_core::hal_traits::{AdcChannel, DigitalOut, OneShotTimer};
use hal::{gpio::Pin, spi::Spi, timer::Timer};

/// One-shot hardware timer, ticking at 1 MHz (so `read_count`/`set_auto_reload` are in
/// microseconds directly). `start` re-arms for a single shot `us` microseconds out; `stop`
/// disables the timer, matching the "each timer ISR stops its own timer on entry" cancellation
/// rule (spec.md 5).
pub struct OneShotHwTimer<TIM> {
    timer: Timer<TIM>,
}

impl<TIM> OneShotHwTimer<TIM> {
    pub fn new(timer: Timer<TIM>) -> Self {
        Self { timer }
    }

    pub fn inner_mut(&mut self) -> &mut Timer<TIM> {
        &mut self.timer
    }
}

impl<TIM> OneShotTimer for OneShotHwTimer<TIM> {
    fn start(&mut self, us: u32) {
        self.timer.set_auto_reload(us);
        self.timer.reset_count();
        self.timer.enable();
    }

    fn stop(&mut self) {
        self.timer.disable();
    }
}

/// Newtype around `hal::gpio::Pin` so `DigitalOut` can be implemented for it here — `Pin` and
/// `DigitalOut` are both foreign to this crate, so the orphan rule forbids implementing the
/// trait directly on `hal::gpio::Pin`.
pub struct DigitalPin(pub Pin);

impl DigitalOut for DigitalPin {
    fn set_high(&mut self) {
        self.0.set_high();
    }

    fn set_low(&mut self) {
        self.0.set_low();
    }
}

/// One MCP3304-class SPI-ADC channel (spec.md 6, "SPI-ADC contract"): 13-bit chip, single-ended
/// mode, sign bit ignored, bus at 2 MHz / SPI mode 0 / MSB first. `channel` selects which of the
/// chip's 8 input channels this reading comes from.
pub struct SpiAdcChannel<'a, SPI, CS> {
    pub spi: &'a mut Spi<SPI>,
    pub cs: &'a mut CS,
    pub channel: u8,
}

impl<SPI, CS> AdcChannel for SpiAdcChannel<'_, SPI, CS>
where
    CS: DigitalOut,
{
    fn read_raw(&mut self) -> u16 {
        // MCP3304 single-ended command word: start bit, SGL/DIFF=1, D2..D0 = channel.
        let cmd = 0b0110_0000 | (self.channel << 2);
        let mut tx = [cmd, 0x00, 0x00];
        self.cs.set_low();
        let _ = self.spi.transfer(&mut tx);
        self.cs.set_high();
        // 12 data bits span the low 4 bits of byte 1 and all 8 bits of byte 2; the sign bit
        // returned by the chip is ignored per the SPI-ADC contract.
        (((tx[1] as u16) & 0x0f) << 8) | tx[2] as u16
    }
}
