#![no_main]
#![no_std]

use cortex_m::asm;

use hal::{
    clocks::Clocks,
    flash::Flash,
    gpio::{Edge, Pin, PinMode, Port, Pull},
    pac,
    spi::{BaudRate, Spi, SpiConfig},
    timer::{Timer, TimerConfig},
    usart::Usart,
};

use defmt_rtt as _;
use panic_probe as _;

mod cfg_storage;
mod hal_impl;

use gx35_core::{
    config::TuningConfig,
    constants::CRANK_SPARK_ADV,
    diag::encode_diag_line,
    fueling::{air_volume_cranking, air_volume_running, fuel_pulse_width_us},
    ignition::{FuelPhase, PinState, SparkPhase},
    kinematics::KinematicState,
    mode::{decide_after_calibration, should_print, Mode},
    safety::Supervisor,
    scheduler::{
        arm, fuel_start_angle, spark_charge_angle, spark_discharge_angle_cranking,
        spark_discharge_angle_running, Arming,
    },
    sensors::map_kpa,
};

use hal_impl::{DigitalPin, OneShotHwTimer};

/// Scheduling state (spec.md 3, "Scheduling state"): written only by the main loop, read by the
/// timer ISRs that arm off these angles.
#[derive(Clone, Copy, Debug, Default)]
pub struct SchedulingState {
    pub fuel_start_angle: f32,
    pub spark_discharge_angle: f32,
    pub spark_charge_angle: f32,
    pub fuel_duration_us: f32,
}

#[rtic::app(device = pac, peripherals = false)]
mod app {
    use super::*;

    #[shared]
    struct Shared {
        kinematic: KinematicState,
        mode: Mode,
        supervisor: Supervisor,
        sched: SchedulingState,
        spark_phase: SparkPhase,
        fuel_phase: FuelPhase,
        tuning: TuningConfig,

        timestamp_timer: Timer<pac::TIM2>,
        spi_adc: Spi<pac::SPI1>,
        cs_adc: DigitalPin,
        spark_pin: Pin,
        fuel_pin: Pin,
        killswitch_pin: Pin,
        diag_usart: Usart<pac::USART1>,

        fuel_start_timer: OneShotHwTimer<pac::TIM3>,
        fuel_stop_timer: OneShotHwTimer<pac::TIM4>,
        spark_charge_timer: OneShotHwTimer<pac::TIM5>,
        spark_discharge_timer: OneShotHwTimer<pac::TIM8>,
    }

    #[local]
    struct Local {}

    #[init]
    fn init(_cx: init::Context) -> (Shared, Local, init::Monotonics) {
        let dp = pac::Peripherals::take().unwrap();

        let clock_cfg = Clocks::default();
        clock_cfg.setup().unwrap();
        defmt::println!("Clocks setup successfully");

        // Safety invariant (spec.md 4.8): spark and fuel outputs are driven LOW before
        // interrupts are enabled.
        let mut spark_pin = Pin::new(Port::A, 0, PinMode::Output);
        let mut fuel_pin = Pin::new(Port::A, 1, PinMode::Output);
        spark_pin.set_low();
        fuel_pin.set_low();

        let mut tach_pin = Pin::new(Port::B, 0, PinMode::Input);
        tach_pin.pull(Pull::Up);
        tach_pin.enable_interrupt(Edge::Falling);

        let mut killswitch_pin = Pin::new(Port::B, 1, PinMode::Input);
        killswitch_pin.pull(Pull::Up);
        killswitch_pin.enable_interrupt(Edge::Both);

        let cs_adc = DigitalPin(Pin::new(Port::A, 4, PinMode::Output));
        let spi_adc = Spi::new(dp.SPI1, SpiConfig::default(), BaudRate::Div32);

        let diag_usart = Usart::new(dp.USART1, 115_200, Default::default(), &clock_cfg);

        // Free-running 1MHz timer; its count is the `now_us` timestamp the tach ISR and the
        // main loop's theta_now sampling read (spec.md 4.3, 4.5).
        let mut timestamp_timer =
            Timer::new_tim2(dp.TIM2, 1_000_000.0, Default::default(), &clock_cfg);
        timestamp_timer.enable();

        let one_shot_cfg = TimerConfig { one_pulse_mode: true, ..Default::default() };
        let fuel_start_timer = OneShotHwTimer::new(Timer::new_tim3(
            dp.TIM3,
            1_000_000.0,
            one_shot_cfg.clone(),
            &clock_cfg,
        ));
        let fuel_stop_timer = OneShotHwTimer::new(Timer::new_tim4(
            dp.TIM4,
            1_000_000.0,
            one_shot_cfg.clone(),
            &clock_cfg,
        ));
        let spark_charge_timer = OneShotHwTimer::new(Timer::new_tim5(
            dp.TIM5,
            1_000_000.0,
            one_shot_cfg.clone(),
            &clock_cfg,
        ));
        let spark_discharge_timer = OneShotHwTimer::new(Timer::new_tim8(
            dp.TIM8,
            1_000_000.0,
            one_shot_cfg,
            &clock_cfg,
        ));

        let mut flash = Flash::new(dp.FLASH);
        let tuning = cfg_storage::load_tuning_from_flash(&mut flash);

        (
            Shared {
                kinematic: KinematicState::default(),
                mode: Mode::default(),
                supervisor: Supervisor::default(),
                sched: SchedulingState::default(),
                spark_phase: SparkPhase::default(),
                fuel_phase: FuelPhase::default(),
                tuning,
                timestamp_timer,
                spi_adc,
                cs_adc,
                spark_pin,
                fuel_pin,
                killswitch_pin,
                diag_usart,
                fuel_start_timer,
                fuel_stop_timer,
                spark_charge_timer,
                spark_discharge_timer,
            },
            Local {},
            init::Monotonics(),
        )
    }

    /// Runs the mode state machine (spec.md 4.7) cooperatively at the lowest priority, preempted
    /// by every ISR below. The main loop never blocks; its only suspension is implicit
    /// preemption between instructions (spec.md 5).
    #[idle(shared = [
        mode, kinematic, supervisor, sched, tuning, timestamp_timer, spi_adc, cs_adc,
        fuel_start_timer, spark_charge_timer, diag_usart,
    ])]
    fn idle(mut cx: idle::Context) -> ! {
        loop {
            let mode = cx.shared.mode.lock(|m| *m);

            match mode {
                Mode::ReadSensors | Mode::SerialOut => {
                    // No scheduling work; the tach ISR is the only thing that advances us out
                    // of READ_SENSORS, by forcing CALIBRATION.
                }
                Mode::Calibration => {
                    let killswitch_closed = cx.shared.supervisor.lock(|s| s.killswitch_closed);
                    let rpm = cx.shared.kinematic.lock(|k| k.rpm());
                    cx.shared.supervisor.lock(|s| s.update_rev_limit(rpm));
                    let rev_limit_active = cx.shared.supervisor.lock(|s| s.rev_limit);
                    let next = decide_after_calibration(killswitch_closed, rev_limit_active, rpm);
                    cx.shared.mode.lock(|m| *m = next);
                }
                Mode::Cranking | Mode::Running => {
                    run_scheduling_cycle(&mut cx, mode == Mode::Running);
                    let print_count = cx.shared.kinematic.lock(|k| k.serial_print_count);
                    cx.shared.mode.lock(|m| {
                        *m = if should_print(print_count) { Mode::SerialOut } else { Mode::ReadSensors };
                    });
                }
                Mode::RevLimiter => {
                    cx.shared.mode.lock(|m| *m = Mode::ReadSensors);
                }
            }

            if mode == Mode::SerialOut {
                emit_diagnostic_line(&mut cx);
            }

            asm::nop();
        }
    }

    /// One CRANKING/RUNNING computation cycle (spec.md 4.5's computation order): fuel (if
    /// `fuelCycle`), then spark discharge/charge, each refreshing theta_now immediately before
    /// arming.
    fn run_scheduling_cycle(cx: &mut idle::Context, running: bool) {
        let fuel_cycle = cx.shared.kinematic.lock(|k| k.fuel_cycle);
        let omega = cx.shared.kinematic.lock(|k| k.angular_speed);
        let rpm = cx.shared.kinematic.lock(|k| k.rpm());

        let map_raw = read_map_count(cx);
        let map_kpa_value = map_kpa(map_raw);
        // IAT channel wiring and its calibration curve are a board concern (spec.md 1, "Out of
        // scope"); a fixed standard-temperature reading stands in for it here.
        let iat_k = 298.0;

        if fuel_cycle {
            let air_volume = if running {
                let ve = cx.shared.tuning.lock(|t| t.ve_table.lookup(rpm, map_kpa_value));
                air_volume_running(ve)
            } else {
                air_volume_cranking()
            };
            let pulse_us = fuel_pulse_width_us(air_volume, map_kpa_value, iat_k);

            cx.shared.sched.lock(|sched| {
                sched.fuel_duration_us = pulse_us;
                sched.fuel_start_angle = fuel_start_angle(pulse_us, omega);
            });

            let theta_now = current_angle(cx);
            let target = cx.shared.sched.lock(|sched| sched.fuel_start_angle);
            if let Arming::Fire(dt) = arm(target, theta_now, omega) {
                cx.shared.fuel_start_timer.lock(|t| t.start(dt as u32));
            }
        }

        let spark_discharge = if running {
            let sa = cx.shared.tuning.lock(|t| t.sa_table.lookup(rpm, map_kpa_value));
            spark_discharge_angle_running(sa)
        } else {
            spark_discharge_angle_cranking(CRANK_SPARK_ADV)
        };
        let spark_charge = spark_charge_angle(spark_discharge, omega);

        cx.shared.sched.lock(|sched| {
            sched.spark_discharge_angle = spark_discharge;
            sched.spark_charge_angle = spark_charge;
        });

        let theta_now = current_angle(cx);
        if let Arming::Fire(dt) = arm(spark_charge, theta_now, omega) {
            cx.shared.spark_charge_timer.lock(|t| t.start(dt as u32));
        }
    }

    fn now_us(cx: &mut idle::Context) -> u32 {
        cx.shared.timestamp_timer.lock(|t| t.inner_mut().read_count())
    }

    fn current_angle(cx: &mut idle::Context) -> f32 {
        let now = now_us(cx);
        cx.shared.kinematic.lock(|k| k.current_angle(now))
    }

    fn read_map_count(cx: &mut idle::Context) -> u16 {
        use gx35_core::hal_traits::AdcChannel;
        (cx.shared.spi_adc, cx.shared.cs_adc).lock(|spi, cs| {
            let mut channel = hal_impl::SpiAdcChannel { spi, cs, channel: 0 };
            channel.read_raw()
        })
    }

    fn emit_diagnostic_line(cx: &mut idle::Context) {
        let rpm = cx.shared.kinematic.lock(|k| k.rpm());
        let map_raw = read_map_count(cx);
        let map_kpa_value = map_kpa(map_raw);
        let ve = cx.shared.tuning.lock(|t| t.ve_table.lookup(rpm, map_kpa_value));
        let spark_discharge = cx.shared.sched.lock(|s| s.spark_discharge_angle);
        let pulse_us = cx.shared.sched.lock(|s| s.fuel_duration_us);

        let line = encode_diag_line(rpm, map_kpa_value, ve, spark_discharge, pulse_us);
        cx.shared.diag_usart.lock(|usart| {
            let _ = usart.write(line.as_bytes());
        });
    }

    /// Tach edge: the sole writer of kinematic state (spec.md 5). Unconditionally forces
    /// CALIBRATION, preempting whatever the main loop was doing (spec.md 9, "Forced state
    /// override from ISR").
    #[task(binds = EXTI0, shared = [kinematic, mode, timestamp_timer], priority = 3)]
    fn tach_isr(cx: tach_isr::Context) {
        (cx.shared.kinematic, cx.shared.mode, cx.shared.timestamp_timer).lock(|kin, mode, timer| {
            let now_us = timer.inner_mut().read_count();
            kin.on_tach_edge(now_us);
            *mode = Mode::Calibration;
        });
    }

    /// Killswitch edge: latches the pin level. Never arms or cancels timers directly — pending
    /// pulses are allowed to finish (spec.md 4.8).
    #[task(binds = EXTI1, shared = [supervisor, killswitch_pin], priority = 3)]
    fn killswitch_isr(cx: killswitch_isr::Context) {
        (cx.shared.supervisor, cx.shared.killswitch_pin).lock(|sup, pin| {
            sup.on_killswitch_edge(pin.is_high());
        });
    }

    #[task(
        binds = TIM3,
        shared = [fuel_phase, fuel_pin, fuel_start_timer, fuel_stop_timer, sched],
        priority = 2
    )]
    fn fuel_start_isr(cx: fuel_start_isr::Context) {
        (
            cx.shared.fuel_phase,
            cx.shared.fuel_pin,
            cx.shared.fuel_start_timer,
            cx.shared.fuel_stop_timer,
            cx.shared.sched,
        )
            .lock(|phase, pin, start_timer, stop_timer, sched| {
                start_timer.stop();
                let action = phase.on_start_fire(sched.fuel_duration_us);
                set_pin(pin, action.pin);
                stop_timer.start(action.rearm_stop_us as u32);
            });
    }

    #[task(binds = TIM4, shared = [fuel_phase, fuel_pin, fuel_stop_timer], priority = 2)]
    fn fuel_stop_isr(cx: fuel_stop_isr::Context) {
        (cx.shared.fuel_phase, cx.shared.fuel_pin, cx.shared.fuel_stop_timer).lock(|phase, pin, timer| {
            let action = phase.on_stop_fire();
            set_pin(pin, action.pin);
            timer.stop();
        });
    }

    #[task(
        binds = TIM5,
        shared = [spark_phase, spark_pin, spark_charge_timer, spark_discharge_timer],
        priority = 2
    )]
    fn spark_charge_isr(cx: spark_charge_isr::Context) {
        (
            cx.shared.spark_phase,
            cx.shared.spark_pin,
            cx.shared.spark_charge_timer,
            cx.shared.spark_discharge_timer,
        )
            .lock(|phase, pin, charge_timer, discharge_timer| {
                charge_timer.stop();
                let action = phase.on_charge_fire();
                set_pin(pin, action.pin);
                discharge_timer.start(action.rearm_discharge_us as u32);
            });
    }

    #[task(binds = TIM8_UP, shared = [spark_phase, spark_pin, spark_discharge_timer], priority = 2)]
    fn spark_discharge_isr(cx: spark_discharge_isr::Context) {
        (cx.shared.spark_phase, cx.shared.spark_pin, cx.shared.spark_discharge_timer).lock(
            |phase, pin, timer| {
                let action = phase.on_discharge_fire();
                set_pin(pin, action.pin);
                timer.stop();
            },
        );
    }

    fn set_pin(pin: &mut Pin, state: PinState) {
        match state {
            PinState::High => pin.set_high(),
            PinState::Low => pin.set_low(),
        }
    }
}
