//! SX1276/77/78 LoRa transceiver, transmit path only.
//!
//! Implements [`RadioLink`] over an embedded-hal [`SpiDevice`] plus the
//! module's active-low reset line. Modulation parameters (bandwidth,
//! spreading factor, coding rate, output power) stay at chip defaults;
//! only carrier frequency and sync word are programmed.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::spi::{Operation, SpiDevice};
use log::{debug, info};

use crate::app::ports::RadioLink;
use crate::error::RadioError;

const REG_FIFO: u8 = 0x00;
const REG_OP_MODE: u8 = 0x01;
const REG_FRF_MSB: u8 = 0x06;
const REG_FRF_MID: u8 = 0x07;
const REG_FRF_LSB: u8 = 0x08;
const REG_FIFO_ADDR_PTR: u8 = 0x0D;
const REG_FIFO_TX_BASE: u8 = 0x0E;
const REG_IRQ_FLAGS: u8 = 0x12;
const REG_PAYLOAD_LENGTH: u8 = 0x22;
const REG_SYNC_WORD: u8 = 0x39;
const REG_VERSION: u8 = 0x42;

const SPI_WRITE: u8 = 0x80;

const MODE_LONG_RANGE: u8 = 0x80;
const MODE_SLEEP: u8 = 0x00;
const MODE_STDBY: u8 = 0x01;
const MODE_TX: u8 = 0x03;

/// Silicon revision reported by every SX1276/77/78.
pub const EXPECTED_VERSION: u8 = 0x12;
pub const IRQ_TX_DONE: u8 = 0x08;
const FXOSC_HZ: u64 = 32_000_000;

const RESET_LOW_MS: u32 = 1;
const RESET_READY_MS: u32 = 10;

/// Frequency register value: `f * 2^19 / 32 MHz`.
pub fn frf_for(frequency_hz: u32) -> u32 {
    ((u64::from(frequency_hz) << 19) / FXOSC_HZ) as u32
}

pub struct Sx127x<SPI, RST, D> {
    spi: SPI,
    reset: RST,
    delay: D,
}

impl<SPI, RST, D> Sx127x<SPI, RST, D>
where
    SPI: SpiDevice,
    RST: OutputPin,
    D: DelayNs,
{
    pub fn new(spi: SPI, reset: RST, delay: D) -> Self {
        Self { spi, reset, delay }
    }

    pub fn release(self) -> (SPI, RST, D) {
        (self.spi, self.reset, self.delay)
    }

    /// Pulse the reset line and wait for the oscillator.
    pub fn reset(&mut self) -> Result<(), RadioError> {
        self.reset.set_low().map_err(|_| RadioError::Pin)?;
        self.delay.delay_ms(RESET_LOW_MS);
        self.reset.set_high().map_err(|_| RadioError::Pin)?;
        self.delay.delay_ms(RESET_READY_MS);
        Ok(())
    }

    pub fn version(&mut self) -> Result<u8, RadioError> {
        self.read_register(REG_VERSION)
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, RadioError> {
        let mut buf = [reg & !SPI_WRITE, 0];
        self.spi
            .transfer_in_place(&mut buf)
            .map_err(|_| RadioError::Spi)?;
        Ok(buf[1])
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), RadioError> {
        self.spi
            .write(&[reg | SPI_WRITE, value])
            .map_err(|_| RadioError::Spi)
    }

    fn set_mode(&mut self, mode: u8) -> Result<(), RadioError> {
        self.write_register(REG_OP_MODE, MODE_LONG_RANGE | mode)
    }
}

impl<SPI, RST, D> RadioLink for Sx127x<SPI, RST, D>
where
    SPI: SpiDevice,
    RST: OutputPin,
    D: DelayNs,
{
    fn configure(&mut self, frequency_hz: u32, sync_word: u8) -> Result<(), RadioError> {
        self.reset()?;
        let version = self.version()?;
        if version != EXPECTED_VERSION {
            return Err(RadioError::NotDetected(version));
        }

        // LoRa mode can only be selected from sleep.
        self.set_mode(MODE_SLEEP)?;
        let [_, msb, mid, lsb] = frf_for(frequency_hz).to_be_bytes();
        self.write_register(REG_FRF_MSB, msb)?;
        self.write_register(REG_FRF_MID, mid)?;
        self.write_register(REG_FRF_LSB, lsb)?;
        self.write_register(REG_SYNC_WORD, sync_word)?;
        self.write_register(REG_FIFO_TX_BASE, 0)?;
        self.set_mode(MODE_STDBY)?;
        info!("radio: {} Hz, sync 0x{:02X}", frequency_hz, sync_word);
        Ok(())
    }

    fn clear_flags(&mut self) -> Result<(), RadioError> {
        self.write_register(REG_IRQ_FLAGS, 0xFF)
    }

    fn transmit(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        let len = u8::try_from(payload.len()).map_err(|_| RadioError::PayloadTooLong)?;
        self.set_mode(MODE_STDBY)?;
        self.write_register(REG_FIFO_ADDR_PTR, 0)?;
        self.spi
            .transaction(&mut [
                Operation::Write(&[REG_FIFO | SPI_WRITE]),
                Operation::Write(payload),
            ])
            .map_err(|_| RadioError::Spi)?;
        self.write_register(REG_PAYLOAD_LENGTH, len)?;
        self.set_mode(MODE_TX)?;
        debug!("radio: {} bytes queued", len);
        Ok(())
    }

    fn poll_flags(&mut self) -> Result<u8, RadioError> {
        self.read_register(REG_IRQ_FLAGS)
    }

    fn sleep(&mut self) -> Result<(), RadioError> {
        self.set_mode(MODE_SLEEP)
    }
}
