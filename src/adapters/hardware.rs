//! Hardware adapter: bridges real peripherals to the domain port traits.
//!
//! [`HardwareAdapter`] bundles one implementation of every port into a
//! [`NodePorts`]. [`EspAnalog`] and [`EspPower`] go through
//! [`hw_init`](crate::drivers::hw_init) and are the only types here that
//! touch registers; on non-espidf targets those helpers are simulation
//! stubs.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::{debug, warn};

use crate::app::ports::{AnalogPort, NodePorts, PowerPort, RadioLink, WakeReason};
use crate::drivers::bus::TwoWireMaster;
use crate::drivers::hw_init::{self, ADC_DB0_FULL_SCALE_MV, ADC1_CH_BATTERY, ADC1_CH_TEMP};
use crate::drivers::status_led::StatusLed;
use crate::error::SensorError;
use crate::pins;
use crate::sensors::analog::ADC_MAX;
use crate::telemetry::checksum::{Checksum, Crc16Modbus};

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<B, A, R, L, W, D, C = Crc16Modbus> {
    bus: B,
    analog: A,
    radio: R,
    led: StatusLed<L>,
    power: W,
    delay: D,
    checksum: C,
}

impl<B, A, R, L, W, D> HardwareAdapter<B, A, R, L, W, D>
where
    L: OutputPin,
{
    pub fn new(bus: B, analog: A, radio: R, led: L, power: W, delay: D) -> Self {
        Self::with_checksum(bus, analog, radio, led, power, delay, Crc16Modbus)
    }
}

impl<B, A, R, L, W, D, C> HardwareAdapter<B, A, R, L, W, D, C>
where
    L: OutputPin,
{
    #[allow(clippy::too_many_arguments)]
    pub fn with_checksum(
        bus: B,
        analog: A,
        radio: R,
        led: L,
        power: W,
        delay: D,
        checksum: C,
    ) -> Self {
        Self {
            bus,
            analog,
            radio,
            led: StatusLed::new(led),
            power,
            delay,
            checksum,
        }
    }
}

impl<B, A, R, L, W, D, C> NodePorts for HardwareAdapter<B, A, R, L, W, D, C>
where
    B: TwoWireMaster,
    A: AnalogPort,
    R: RadioLink,
    L: OutputPin,
    W: PowerPort,
    D: DelayNs,
    C: Checksum,
{
    type Bus = B;
    type Analog = A;
    type Radio = R;
    type Led = L;
    type Power = W;
    type Delay = D;
    type Checksum = C;

    fn bus(&mut self) -> &mut B {
        &mut self.bus
    }

    fn analog(&mut self) -> &mut A {
        &mut self.analog
    }

    fn radio(&mut self) -> &mut R {
        &mut self.radio
    }

    fn led(&mut self) -> &mut StatusLed<L> {
        &mut self.led
    }

    fn power(&mut self) -> &mut W {
        &mut self.power
    }

    fn delay(&mut self) -> &mut D {
        &mut self.delay
    }

    fn checksum(&self) -> &C {
        &self.checksum
    }
}

// ── AnalogPort over ADC1 ──────────────────────────────────────

/// Battery and NTC channels on ADC1, rescaled to the 10-bit counts the
/// frame carries.
#[derive(Debug, Default)]
pub struct EspAnalog;

impl EspAnalog {
    /// Battery count in pin millivolts: with the 1:4 divider one count is
    /// 4 mV of battery, matching a 10-bit read against 1.024 V.
    pub fn battery_from_raw12(raw12: u16) -> u16 {
        let pin_mv = u32::from(raw12) * ADC_DB0_FULL_SCALE_MV / 4095;
        pin_mv.min(u32::from(ADC_MAX)) as u16
    }

    /// Ratiometric 12-bit reading reduced to 10 bits.
    pub fn temperature_from_raw12(raw12: u16) -> u16 {
        raw12.min(4095) >> 2
    }
}

impl AnalogPort for EspAnalog {
    fn read_battery(&mut self) -> Result<u16, SensorError> {
        hw_init::adc1_read(ADC1_CH_BATTERY)
            .map(Self::battery_from_raw12)
            .ok_or(SensorError::AdcReadFailed)
    }

    fn read_temperature(&mut self) -> Result<u16, SensorError> {
        hw_init::adc1_read(ADC1_CH_TEMP)
            .map(Self::temperature_from_raw12)
            .ok_or(SensorError::AdcReadFailed)
    }
}

// ── PowerPort over the supply switch and light sleep ──────────

#[derive(Debug, Default)]
pub struct EspPower;

impl PowerPort for EspPower {
    fn enable_peripherals(&mut self) {
        hw_init::restore_pins();
        hw_init::gpio_write(pins::PERIPH_ENABLE_GPIO, false);
        // A failed ADC bring-up surfaces as failed analog reads.
        if let Err(e) = hw_init::adc1_power_up() {
            warn!("power: {}", e);
        }
        debug!("power: peripherals on");
    }

    /// Cuts the external supply and releases ADC1.
    fn disable_peripherals(&mut self) {
        hw_init::adc1_power_down();
        hw_init::gpio_write(pins::PERIPH_ENABLE_GPIO, true);
        debug!("power: peripherals off");
    }

    fn park_pins(&mut self) {
        hw_init::park_pins();
    }

    fn sleep(&mut self, duration_ms: u32) -> WakeReason {
        if hw_init::light_sleep(duration_ms) {
            WakeReason::Timer
        } else {
            WakeReason::Other
        }
    }
}
