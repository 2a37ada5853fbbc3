//! VEML6075 UVA/UVB sensor adapter.
//!
//! Register-addressed: a write sets the register pointer and is followed by
//! the data word; a read sets the pointer and, after a repeated start with
//! no intervening stop, clocks the word back. Data words are
//! least-significant byte first on the wire.

use heapless::Vec;
use log::{debug, warn};

use crate::drivers::bus::{Recovery, TwoWireMaster, transaction};
use crate::error::{BusError, ConfigError};

/// Fixed bus address, pre-shifted.
pub const ADDRESS: u8 = 0x20;

pub const REG_CONF: u8 = 0x00;
pub const REG_UVA: u8 = 0x07;
pub const REG_UVB: u8 = 0x09;
pub const REG_COMP1: u8 = 0x0A;
pub const REG_COMP2: u8 = 0x0B;
pub const REG_ID: u8 = 0x0C;

/// Value of the ID register low byte on a genuine part.
pub const DEVICE_ID: u16 = 0x0026;

const CONF_HIGH_DYNAMIC: u8 = 0b0000_1000;
const CONF_SHUTDOWN: u8 = 0b0000_0001;
/// The configuration high byte is reserved and always written as zero.
const CONF_MSB: u8 = 0x00;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationTime {
    Ms100,
    Ms200,
    Ms400,
    Ms800,
}

impl IntegrationTime {
    pub fn from_ms(ms: u16) -> Result<Self, ConfigError> {
        match ms {
            100 => Ok(Self::Ms100),
            200 => Ok(Self::Ms200),
            400 => Ok(Self::Ms400),
            800 => Ok(Self::Ms800),
            _ => Err(ConfigError::ValidationFailed(
                "uv_integration_ms must be 100, 200, 400 or 800",
            )),
        }
    }

    /// UV_IT field, bits 6..4 of the configuration byte.
    const fn field(self) -> u8 {
        match self {
            Self::Ms100 => 0b0001_0000,
            Self::Ms200 => 0b0010_0000,
            Self::Ms400 => 0b0011_0000,
            Self::Ms800 => 0b0100_0000,
        }
    }
}

/// Build the configuration low byte.
pub const fn config_byte(it: IntegrationTime, high_dynamic: bool) -> u8 {
    let mut conf = it.field();
    if high_dynamic {
        conf |= CONF_HIGH_DYNAMIC;
    }
    conf
}

/// One channel of the four-register UV read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UvChannel {
    Uva,
    Uvb,
    Comp1,
    Comp2,
}

impl UvChannel {
    pub const ALL: [Self; 4] = [Self::Uva, Self::Uvb, Self::Comp1, Self::Comp2];

    pub const fn register(self) -> u8 {
        match self {
            Self::Uva => REG_UVA,
            Self::Uvb => REG_UVB,
            Self::Comp1 => REG_COMP1,
            Self::Comp2 => REG_COMP2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UvReading {
    pub uva: u16,
    pub uvb: u16,
    pub comp1: u16,
    pub comp2: u16,
}

impl UvReading {
    fn set(&mut self, channel: UvChannel, value: u16) {
        match channel {
            UvChannel::Uva => self.uva = value,
            UvChannel::Uvb => self.uvb = value,
            UvChannel::Comp1 => self.comp1 = value,
            UvChannel::Comp2 => self.comp2 = value,
        }
    }
}

/// Result of [`Veml6075::read`]. Channels that failed read as zero and are
/// listed in `faults`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UvReadout {
    pub reading: UvReading,
    pub recovery: Recovery,
    pub faults: Vec<(UvChannel, BusError), 4>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Veml6075 {
    integration: IntegrationTime,
    high_dynamic: bool,
}

impl Veml6075 {
    pub fn new(integration: IntegrationTime, high_dynamic: bool) -> Self {
        Self {
            integration,
            high_dynamic,
        }
    }

    pub fn config_byte(&self) -> u8 {
        config_byte(self.integration, self.high_dynamic)
    }

    /// Four-byte write: address, register, data low, data high.
    pub fn write_config<B: TwoWireMaster + ?Sized>(
        &self,
        bus: &mut B,
        register: u8,
        low: u8,
        high: u8,
    ) -> Result<(), BusError> {
        transaction(bus, |bus| {
            bus.write_address(ADDRESS)?;
            bus.write_byte(register)?;
            bus.write_byte(low)?;
            bus.write_byte(high)
        })
    }

    /// Set the register pointer, then read the word back in the same
    /// transaction.
    pub fn read_register<B: TwoWireMaster + ?Sized>(
        &self,
        bus: &mut B,
        register: u8,
    ) -> Result<u16, BusError> {
        transaction(bus, |bus| {
            bus.write_address(ADDRESS)?;
            bus.write_byte(register)?;
            bus.repeated_start();
            bus.write_address(ADDRESS + 1)?;
            let lsb = bus.read_byte(true)?;
            let msb = bus.read_byte(false)?;
            Ok(u16::from_le_bytes([lsb, msb]))
        })
    }

    /// Program integration time and dynamic range; leaves the part running.
    pub fn start<B: TwoWireMaster + ?Sized>(&self, bus: &mut B) -> Result<(), BusError> {
        let conf = self.config_byte();
        debug!("uv: config 0x{:02X}", conf);
        self.write_config(bus, REG_CONF, conf, CONF_MSB)
    }

    /// Set the shutdown bit, keeping the rest of the configuration.
    pub fn shutdown<B: TwoWireMaster + ?Sized>(&self, bus: &mut B) -> Result<(), BusError> {
        self.write_config(bus, REG_CONF, self.config_byte() | CONF_SHUTDOWN, CONF_MSB)
    }

    /// Low byte of the ID register.
    pub fn read_id<B: TwoWireMaster + ?Sized>(&self, bus: &mut B) -> Result<u16, BusError> {
        self.read_register(bus, REG_ID).map(|id| id & 0x00FF)
    }

    /// Stuck-bus check, then the four channels in order. A failed channel
    /// does not stop the others.
    pub fn read<B: TwoWireMaster + ?Sized>(&self, bus: &mut B) -> UvReadout {
        let recovery = bus.recover();
        let mut reading = UvReading::default();
        let mut faults = Vec::new();
        for channel in UvChannel::ALL {
            match self.read_register(bus, channel.register()) {
                Ok(value) => reading.set(channel, value),
                Err(e) => {
                    warn!("uv: {:?} read failed: {}", channel, e);
                    // Capacity equals the channel count.
                    let _ = faults.push((channel, e));
                }
            }
        }
        UvReadout {
            reading,
            recovery,
            faults,
        }
    }
}
