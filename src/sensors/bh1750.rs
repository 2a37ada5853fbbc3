//! BH1750 ambient-light sensor adapter.
//!
//! Command-only device: every operation is a single opcode byte written to
//! the device address, and a measurement is a bare two-byte read with the
//! most-significant byte first.
//!
//! Addresses are stored pre-shifted with the read/write bit clear; the
//! read address is `address + 1`. Opcodes are not checked against the
//! device state.

use crate::drivers::bus::{TwoWireMaster, transaction};
use crate::error::BusError;

/// ADDR strap pulled high.
pub const ADDRESS_HIGH: u8 = 0xB8;
/// ADDR strap pulled low (default).
pub const ADDRESS_LOW: u8 = 0x46;

pub const CMD_POWER_DOWN: u8 = 0x00;
pub const CMD_POWER_ON: u8 = 0x01;
pub const CMD_RESET: u8 = 0x07;
/// Measurement-time high bits: `0b01000_xxx`.
pub const CMD_MEAS_TIME_HIGH: u8 = 0x40;
/// Measurement-time low bits: `0b011_xxxxx`.
pub const CMD_MEAS_TIME_LOW: u8 = 0x60;

/// Measurement-time register value after power-on.
pub const DEFAULT_MEAS_TIME: u8 = 69;

/// Acquisition mode; the discriminant is the opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Mode {
    ContinuousHigh = 0x10,
    ContinuousHigh2 = 0x11,
    ContinuousLow = 0x13,
    OneTimeHigh = 0x20,
    OneTimeHigh2 = 0x21,
    OneTimeLow = 0x23,
}

impl Mode {
    pub const ALL: [Self; 6] = [
        Self::ContinuousHigh,
        Self::ContinuousHigh2,
        Self::ContinuousLow,
        Self::OneTimeHigh,
        Self::OneTimeHigh2,
        Self::OneTimeLow,
    ];

    pub const fn opcode(self) -> u8 {
        self as u8
    }

    /// Count-to-lux divisor beyond the 1.2 datasheet factor.
    const fn resolution_divisor(self) -> f32 {
        match self {
            Self::ContinuousHigh2 | Self::OneTimeHigh2 => 2.0,
            _ => 1.0,
        }
    }
}

/// Split a measurement-time value into its two opcodes.
///
/// Bits 7..5 ride on [`CMD_MEAS_TIME_HIGH`], bits 4..0 on
/// [`CMD_MEAS_TIME_LOW`].
pub const fn measurement_time_commands(mtreg: u8) -> [u8; 2] {
    [
        CMD_MEAS_TIME_HIGH | ((mtreg & 0b1110_0000) >> 5),
        CMD_MEAS_TIME_LOW | (mtreg & 0b0001_1111),
    ]
}

/// Convert a raw count to lux for the given mode and measurement time.
pub fn lux(raw: u16, mode: Mode, mtreg: u8) -> f32 {
    let mt = if mtreg == 0 { DEFAULT_MEAS_TIME } else { mtreg };
    (f32::from(raw) / 1.2) * (f32::from(DEFAULT_MEAS_TIME) / f32::from(mt))
        / mode.resolution_divisor()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bh1750 {
    address: u8,
}

impl Bh1750 {
    /// `addr_pin_high` is the ADDR strap level sampled once at startup.
    pub fn new(addr_pin_high: bool) -> Self {
        let mut sensor = Self { address: ADDRESS_LOW };
        sensor.set_address(addr_pin_high);
        sensor
    }

    pub fn set_address(&mut self, high_variant: bool) {
        self.address = if high_variant { ADDRESS_HIGH } else { ADDRESS_LOW };
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn set_mode<B: TwoWireMaster + ?Sized>(
        &self,
        bus: &mut B,
        mode: Mode,
    ) -> Result<(), BusError> {
        self.write_command(bus, mode.opcode())
    }

    pub fn power_on<B: TwoWireMaster + ?Sized>(&self, bus: &mut B) -> Result<(), BusError> {
        self.write_command(bus, CMD_POWER_ON)
    }

    pub fn power_down<B: TwoWireMaster + ?Sized>(&self, bus: &mut B) -> Result<(), BusError> {
        self.write_command(bus, CMD_POWER_DOWN)
    }

    /// Clear the data register. Only valid while powered on.
    pub fn reset<B: TwoWireMaster + ?Sized>(&self, bus: &mut B) -> Result<(), BusError> {
        self.write_command(bus, CMD_RESET)
    }

    /// Change the measurement-time register (sensitivity).
    ///
    /// Both halves are sent even if the first is refused.
    pub fn set_measurement_time<B: TwoWireMaster + ?Sized>(
        &self,
        bus: &mut B,
        mtreg: u8,
    ) -> Result<(), BusError> {
        let [high, low] = measurement_time_commands(mtreg);
        let first = self.write_command(bus, high);
        let second = self.write_command(bus, low);
        first.and(second)
    }

    /// Read the latest conversion result.
    pub fn read_value<B: TwoWireMaster + ?Sized>(&self, bus: &mut B) -> Result<u16, BusError> {
        transaction(bus, |bus| {
            bus.write_address(self.address + 1)?;
            let msb = bus.read_byte(true)?;
            let lsb = bus.read_byte(false)?;
            Ok(u16::from_be_bytes([msb, lsb]))
        })
    }

    fn write_command<B: TwoWireMaster + ?Sized>(
        &self,
        bus: &mut B,
        command: u8,
    ) -> Result<(), BusError> {
        transaction(bus, |bus| {
            bus.write_address(self.address)?;
            bus.write_byte(command)
        })
    }
}
