//! Software two-wire controller on two open-drain GPIO lines.
//!
//! Implements [`BusController`] for any pair of embedded-hal 1.0 pins, so
//! the polled transport runs on chips whose hardware peripheral is busy or
//! absent. Every primitive completes synchronously: `is_busy` is always
//! false and `transfer_done` is true as soon as the byte has been clocked.
//!
//! Lines are open-drain: `set_high` releases the line to the pull-up,
//! `set_low` drives it. A pin write or read that fails latches a fault that
//! surfaces as a not-acknowledged transfer.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use super::bus_controller::BusController;

pub struct BitBangController<SDA, SCL, D> {
    sda: SDA,
    scl: SCL,
    delay: D,
    half_period_ns: u32,
    nack: bool,
    rx: u8,
    pin_fault: bool,
}

impl<SDA, SCL, D> BitBangController<SDA, SCL, D>
where
    SDA: InputPin + OutputPin,
    SCL: OutputPin,
    D: DelayNs,
{
    pub fn new(sda: SDA, scl: SCL, delay: D) -> Self {
        Self {
            sda,
            scl,
            delay,
            half_period_ns: 5_000, // 100 kHz until configured
            nack: false,
            rx: 0,
            pin_fault: false,
        }
    }

    pub fn release(self) -> (SDA, SCL, D) {
        (self.sda, self.scl, self.delay)
    }

    fn sda(&mut self, high: bool) {
        let r = if high { self.sda.set_high() } else { self.sda.set_low() };
        self.pin_fault |= r.is_err();
    }

    fn scl(&mut self, high: bool) {
        let r = if high { self.scl.set_high() } else { self.scl.set_low() };
        self.pin_fault |= r.is_err();
    }

    fn sda_is_high(&mut self) -> bool {
        match self.sda.is_high() {
            Ok(level) => level,
            Err(_) => {
                self.pin_fault = true;
                true
            }
        }
    }

    fn half(&mut self) {
        self.delay.delay_ns(self.half_period_ns);
    }

    /// One clock pulse with the data line already set up; returns the level
    /// sampled while the clock is high.
    fn pulse(&mut self) -> bool {
        self.half();
        self.scl(true);
        self.half();
        let level = self.sda_is_high();
        self.scl(false);
        level
    }
}

impl<SDA, SCL, D> BusController for BitBangController<SDA, SCL, D>
where
    SDA: InputPin + OutputPin,
    SCL: OutputPin,
    D: DelayNs,
{
    fn configure(&mut self, clock_hz: u32) {
        self.half_period_ns = 500_000_000 / clock_hz.max(1);
        self.sda(true);
        self.scl(true);
    }

    fn is_busy(&mut self) -> bool {
        false
    }

    fn signal_start(&mut self) {
        self.sda(true);
        self.scl(true);
        self.half();
        self.sda(false);
        self.half();
        self.scl(false);
    }

    fn signal_repeated_start(&mut self) {
        self.sda(true);
        self.half();
        self.scl(true);
        self.half();
        self.sda(false);
        self.half();
        self.scl(false);
    }

    fn signal_stop(&mut self) {
        self.sda(false);
        self.half();
        self.scl(true);
        self.half();
        self.sda(true);
        self.half();
    }

    fn clear_transfer_flag(&mut self) {
        self.pin_fault = false;
    }

    fn load_byte(&mut self, byte: u8) {
        for bit in (0..8).rev() {
            self.sda(byte & (1 << bit) != 0);
            self.pulse();
        }
        // Release data for the slave's acknowledge slot.
        self.sda(true);
        let released = self.pulse();
        self.nack = released || self.pin_fault;
    }

    fn transfer_done(&mut self) -> bool {
        true
    }

    fn nack_received(&mut self) -> bool {
        self.nack
    }

    fn enable_receive(&mut self) {
        self.sda(true);
        let mut byte = 0u8;
        for _ in 0..8 {
            byte = (byte << 1) | u8::from(self.pulse());
        }
        self.rx = byte;
    }

    fn received_byte(&mut self) -> u8 {
        self.rx
    }

    fn send_acknowledge(&mut self, ack: bool) {
        self.sda(!ack);
        self.pulse();
        self.sda(true);
    }

    fn data_line_low(&mut self) -> bool {
        !self.sda_is_high()
    }

    fn seize_clock(&mut self) {
        self.sda(true);
    }

    fn drive_clock(&mut self, high: bool) {
        self.scl(high);
    }

    fn release_clock(&mut self) {
        self.scl(true);
    }
}
