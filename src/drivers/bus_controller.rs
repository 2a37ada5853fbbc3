//! Register-level view of a two-wire master peripheral.
//!
//! The transport in [`super::bus`] only ever polls and pokes these
//! primitives, mirroring a classic MSSP-style controller: request a
//! condition, load a byte, spin on a flag. Every method is non-blocking.

pub trait BusController {
    /// Program master mode at `clock_hz`.
    fn configure(&mut self, clock_hz: u32);

    /// A condition, transfer or acknowledge sequence is still in flight.
    fn is_busy(&mut self) -> bool;

    /// Request a start condition.
    fn signal_start(&mut self);

    /// Request a repeated-start condition.
    fn signal_repeated_start(&mut self);

    /// Request a stop condition.
    fn signal_stop(&mut self);

    /// Clear the transfer-complete flag before loading a byte.
    fn clear_transfer_flag(&mut self);

    /// Place `byte` in the shift register; transmission begins at once.
    fn load_byte(&mut self, byte: u8);

    /// The last transmitted byte and its acknowledge slot have completed.
    fn transfer_done(&mut self) -> bool;

    /// Latched acknowledge status of the last transmitted byte.
    fn nack_received(&mut self) -> bool;

    /// Start clocking in one byte.
    fn enable_receive(&mut self);

    /// The byte clocked in by the last receive.
    fn received_byte(&mut self) -> u8;

    /// Run the acknowledge sequence: `true` = acknowledge, `false` = not.
    fn send_acknowledge(&mut self, ack: bool);

    /// Sample the data line directly.
    fn data_line_low(&mut self) -> bool;

    /// Take the clock line away from the peripheral for manual driving.
    fn seize_clock(&mut self);

    /// Drive the seized clock line.
    fn drive_clock(&mut self, high: bool);

    /// Hand the clock line back to the peripheral.
    fn release_clock(&mut self);
}
