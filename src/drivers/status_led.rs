//! Red status LED driver.
//!
//! A single active-high GPIO. Lit briefly around each radio transmission and
//! pulsed to signal an undervoltage lockout.
//!
//! Pin errors are ignored: the LED is advisory and must never hold up the
//! duty cycle.

use embedded_hal::digital::OutputPin;

pub struct StatusLed<P> {
    pin: P,
    lit: bool,
    pulses: u32,
}

impl<P: OutputPin> StatusLed<P> {
    pub fn new(pin: P) -> Self {
        Self {
            pin,
            lit: false,
            pulses: 0,
        }
    }

    pub fn on(&mut self) {
        let _ = self.pin.set_high();
        self.lit = true;
    }

    pub fn off(&mut self) {
        let _ = self.pin.set_low();
        if self.lit {
            self.pulses = self.pulses.wrapping_add(1);
        }
        self.lit = false;
    }

    pub fn is_lit(&self) -> bool {
        self.lit
    }

    /// Completed on→off pulses since construction.
    pub fn pulses(&self) -> u32 {
        self.pulses
    }

    pub fn pin_mut(&mut self) -> &mut P {
        &mut self.pin
    }
}
