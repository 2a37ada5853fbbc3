//! Frame checksum collaborator.
//!
//! The frame layer only relies on the contract: a pure function from a byte
//! sequence to a 16-bit value. The default implementation is CRC-16/MODBUS.

use crc::{CRC_16_MODBUS, Crc};

pub trait Checksum {
    fn checksum(&self, data: &[u8]) -> u16;
}

const MODBUS: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// CRC-16/MODBUS (poly 0x8005 reflected, init 0xFFFF).
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc16Modbus;

impl Checksum for Crc16Modbus {
    fn checksum(&self, data: &[u8]) -> u16 {
        MODBUS.checksum(data)
    }
}
