//! Port traits: the hexagonal boundary between the duty-cycle logic and
//! the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ DutyCycleService (domain)
//! ```
//!
//! Driven adapters (bus, analog channels, radio, power switch, clock,
//! event sinks) implement these traits. The [`DutyCycleService`] consumes
//! them through the [`NodePorts`] bundle, so the sequencer never touches
//! registers directly.
//!
//! [`DutyCycleService`]: super::service::DutyCycleService

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::drivers::bus::TwoWireMaster;
use crate::drivers::status_led::StatusLed;
use crate::error::{RadioError, SensorError};
use crate::telemetry::checksum::Checksum;

// ───────────────────────────────────────────────────────────────
// Monotonic clock
// ───────────────────────────────────────────────────────────────

/// Free-running microsecond counter used for bus deadlines.
pub trait Clock {
    /// Microseconds since an arbitrary epoch. Must never go backwards.
    fn now_us(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Analog channels
// ───────────────────────────────────────────────────────────────

/// Single-shot conversions of the two analog inputs.
///
/// Both return a 10-bit result packed into the low bits of a `u16`.
pub trait AnalogPort {
    /// Battery divider, converted against the internal 1.024 V reference.
    fn read_battery(&mut self) -> Result<u16, SensorError>;

    /// Local NTC divider, converted against the supply rail.
    fn read_temperature(&mut self) -> Result<u16, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Radio link
// ───────────────────────────────────────────────────────────────

/// The transmit-only slice of the radio module the sequencer relies on.
pub trait RadioLink {
    /// Wake the module and program carrier frequency and sync word.
    fn configure(&mut self, frequency_hz: u32, sync_word: u8) -> Result<(), RadioError>;

    /// Clear every pending interrupt flag.
    fn clear_flags(&mut self) -> Result<(), RadioError>;

    /// Load `payload` and start transmitting it.
    fn transmit(&mut self, payload: &[u8]) -> Result<(), RadioError>;

    /// Current interrupt flags; non-zero means the transmission finished.
    fn poll_flags(&mut self) -> Result<u8, RadioError>;

    /// Drop the module into its lowest-power mode.
    fn sleep(&mut self) -> Result<(), RadioError>;
}

// ───────────────────────────────────────────────────────────────
// Peripheral power and sleep
// ───────────────────────────────────────────────────────────────

/// Why execution resumed after [`PowerPort::sleep`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeReason {
    /// The hardware wake timer expired.
    Timer,
    /// Anything else (reset, debugger, spurious wake).
    Other,
}

/// Owns the peripheral supply switch and the chip's sleep primitive.
pub trait PowerPort {
    /// Switch on sensor supply, analog reference and converter.
    fn enable_peripherals(&mut self);

    /// Switch off converter, reference and sensor supply.
    fn disable_peripherals(&mut self);

    /// Drive every general-purpose pin to its low-power state.
    fn park_pins(&mut self);

    /// Block in the low-power state until the wake timer fires.
    fn sleep(&mut self, duration_ms: u32) -> WakeReason;
}

// ───────────────────────────────────────────────────────────────
// Event sink (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`NodeEvent`](super::events::NodeEvent)s
/// through this port. Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::NodeEvent);
}

// ───────────────────────────────────────────────────────────────
// Port bundle
// ───────────────────────────────────────────────────────────────

/// Everything one duty cycle touches, bundled so the state table can be a
/// plain array of `fn` pointers generic over a single type.
pub trait NodePorts {
    type Bus: TwoWireMaster;
    type Analog: AnalogPort;
    type Radio: RadioLink;
    type Led: OutputPin;
    type Power: PowerPort;
    type Delay: DelayNs;
    type Checksum: Checksum;

    fn bus(&mut self) -> &mut Self::Bus;
    fn analog(&mut self) -> &mut Self::Analog;
    fn radio(&mut self) -> &mut Self::Radio;
    fn led(&mut self) -> &mut StatusLed<Self::Led>;
    fn power(&mut self) -> &mut Self::Power;
    fn delay(&mut self) -> &mut Self::Delay;
    fn checksum(&self) -> &Self::Checksum;
}
