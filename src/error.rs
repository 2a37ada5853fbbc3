//! Unified error types for the UVNode firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! duty-cycle sequencer's degrade policy uniform. All variants are `Copy` so
//! they can be recorded in fixed-capacity fault logs without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A two-wire bus transfer failed.
    Bus(BusError),
    /// The radio-link collaborator rejected a command.
    Radio(RadioError),
    /// An analog channel could not be sampled.
    Sensor(SensorError),
    /// Configuration is invalid or could not be parsed.
    Config(ConfigError),
    /// A received telemetry frame is malformed.
    Frame(FrameError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "bus: {e}"),
            Self::Radio(e) => write!(f, "radio: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
            Self::Frame(e) => write!(f, "frame: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Bus errors
// ---------------------------------------------------------------------------

/// Which wait of a byte operation ran out of time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusPhase {
    /// Waiting for a transmitted byte (and its acknowledge bit) to complete.
    Transmit,
    /// Waiting for the controller to clock in a received byte.
    Receive,
}

/// Which byte of a transaction the device refused to acknowledge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NackStage {
    /// The address byte (device absent or busy).
    Address,
    /// A command, register or data byte.
    Data,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// The deadline expired before the controller finished.
    Timeout(BusPhase),
    /// The addressed device answered with not-acknowledge.
    Nack(NackStage),
    /// The data line is still held low after clock-pulse recovery.
    Stuck,
}

impl fmt::Display for BusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout(BusPhase::Transmit) => write!(f, "transmit timeout"),
            Self::Timeout(BusPhase::Receive) => write!(f, "receive timeout"),
            Self::Nack(NackStage::Address) => write!(f, "address not acknowledged"),
            Self::Nack(NackStage::Data) => write!(f, "data not acknowledged"),
            Self::Stuck => write!(f, "data line stuck low"),
        }
    }
}

impl From<BusError> for Error {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

// ---------------------------------------------------------------------------
// Radio errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// SPI transfer to the radio module failed.
    Spi,
    /// Reset or chip-select line could not be driven.
    Pin,
    /// The module did not report the expected silicon version.
    NotDetected(u8),
    /// Payload does not fit the module FIFO.
    PayloadTooLong,
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spi => write!(f, "SPI transfer failed"),
            Self::Pin => write!(f, "control pin write failed"),
            Self::NotDetected(v) => write!(f, "radio not detected (version 0x{v:02X})"),
            Self::PayloadTooLong => write!(f, "payload too long"),
        }
    }
}

impl From<RadioError> for Error {
    fn from(e: RadioError) -> Self {
        Self::Radio(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// ADC read returned an error or timed out.
    AdcReadFailed,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcReadFailed => write!(f, "ADC read failed"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The override document could not be deserialised.
    Malformed,
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed config document"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Frame errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Buffer is not exactly one frame long.
    Size(usize),
    /// The leading length byte disagrees with the fixed frame size.
    LengthByte(u8),
    /// Trailing checksum does not match the payload.
    Checksum { expected: u16, found: u16 },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Size(n) => write!(f, "wrong frame size {n}"),
            Self::LengthByte(b) => write!(f, "length byte {b} does not match frame size"),
            Self::Checksum { expected, found } => {
                write!(f, "checksum 0x{found:04X}, expected 0x{expected:04X}")
            }
        }
    }
}

impl From<FrameError> for Error {
    fn from(e: FrameError) -> Self {
        Self::Frame(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
