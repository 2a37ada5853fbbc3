//! Polled two-wire bus master with deadline-bounded waits and stuck-bus
//! recovery.
//!
//! [`BusTransport`] layers framing (start / repeated-start / stop), byte
//! transfers and recovery on top of a [`BusController`]. Every busy-wait is
//! bounded by a [`Deadline`] taken from a monotonic [`Clock`], never by an
//! iteration count.
//!
//! Failure policy:
//! - An idle wait that expires before a framing condition is counted and
//!   logged, then the condition is emitted anyway.
//! - A transfer that never completes returns [`BusError::Timeout`]; a
//!   refused byte returns [`BusError::Nack`]. Both are counted and latched
//!   in [`BusTransport::last_fault`].

use embedded_hal::delay::DelayNs;
use log::{error, info, warn};

use super::bus_controller::BusController;
use crate::app::ports::Clock;
use crate::error::{BusError, BusPhase, NackStage};

/// Clock pulses issued to coax a wedged slave into releasing the data line.
pub const RECOVERY_PULSES: u8 = 8;
/// Half-period of each recovery pulse.
pub const RECOVERY_HALF_PERIOD_MS: u32 = 1;

// ---------------------------------------------------------------------------
// Deadline
// ---------------------------------------------------------------------------

/// A point in time after which a busy-wait gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at_us: u64,
}

impl Deadline {
    pub fn after<K: Clock + ?Sized>(clock: &K, timeout_us: u32) -> Self {
        Self {
            at_us: clock.now_us().saturating_add(u64::from(timeout_us)),
        }
    }

    pub fn expired<K: Clock + ?Sized>(&self, clock: &K) -> bool {
        clock.now_us() >= self.at_us
    }
}

// ---------------------------------------------------------------------------
// Counters and outcomes
// ---------------------------------------------------------------------------

/// Running totals of every degraded bus outcome since boot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Idle waits before a framing condition that expired.
    pub idle_timeouts: u32,
    /// Byte transfers that never completed.
    pub transfer_timeouts: u32,
    /// Bytes refused by the addressed device.
    pub nacks: u32,
    /// Stuck-bus recoveries performed.
    pub recoveries: u32,
    /// Recoveries after which the data line was still low.
    pub stuck_after_recovery: u32,
}

impl BusStats {
    pub fn total_faults(&self) -> u32 {
        self.idle_timeouts + self.transfer_timeouts + self.nacks + self.stuck_after_recovery
    }
}

/// Result of a stuck-bus check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Data line was high at rest; nothing done.
    Clear,
    /// Data line was low and clock pulsing released it.
    Released,
    /// Data line is still low after the full pulse train.
    StillStuck,
}

// ---------------------------------------------------------------------------
// Transport contract
// ---------------------------------------------------------------------------

/// Byte-level two-wire master operations the sensor adapters are written
/// against.
pub trait TwoWireMaster {
    /// Configure master mode at `clock_hz`. Call before anything else.
    fn initialize(&mut self, clock_hz: u32);

    fn start(&mut self);
    fn repeated_start(&mut self);
    fn stop(&mut self);

    /// Transmit one byte and check its acknowledge bit.
    fn write_byte(&mut self, byte: u8) -> Result<(), BusError>;

    /// Receive one byte, then acknowledge it (`ack = true`) or end the
    /// read with not-acknowledge (`ack = false`, required on the last byte).
    fn read_byte(&mut self, ack: bool) -> Result<u8, BusError>;

    /// Check the data line at rest and pulse the clock if it is held low.
    fn recover(&mut self) -> Recovery;

    /// Running fault counters.
    fn stats(&self) -> BusStats;

    /// Transmit an address byte; a refusal is reported as
    /// [`NackStage::Address`].
    fn write_address(&mut self, address: u8) -> Result<(), BusError> {
        self.write_byte(address).map_err(|e| match e {
            BusError::Nack(_) => BusError::Nack(NackStage::Address),
            other => other,
        })
    }
}

/// Run `body` between a start and a stop condition.
///
/// The stop is issued whatever `body` returns so a failed byte never leaves
/// the bus claimed.
pub fn transaction<B, T, F>(bus: &mut B, body: F) -> Result<T, BusError>
where
    B: TwoWireMaster + ?Sized,
    F: FnOnce(&mut B) -> Result<T, BusError>,
{
    bus.start();
    let result = body(bus);
    bus.stop();
    result
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

pub struct BusTransport<C, K, D> {
    controller: C,
    clock: K,
    delay: D,
    timeout_us: u32,
    stats: BusStats,
    last_fault: Option<BusError>,
}

impl<C, K, D> BusTransport<C, K, D>
where
    C: BusController,
    K: Clock,
    D: DelayNs,
{
    pub fn new(controller: C, clock: K, delay: D, timeout_us: u32) -> Self {
        Self {
            controller,
            clock,
            delay,
            timeout_us,
            stats: BusStats::default(),
            last_fault: None,
        }
    }

    /// Outcome of the most recent byte operation or recovery.
    pub fn last_fault(&self) -> Option<BusError> {
        self.last_fault
    }

    pub fn controller(&self) -> &C {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut C {
        &mut self.controller
    }

    /// Spin until the controller reports idle or the deadline passes.
    fn poll_idle(&mut self) -> bool {
        let deadline = Deadline::after(&self.clock, self.timeout_us);
        while self.controller.is_busy() {
            if deadline.expired(&self.clock) {
                return false;
            }
        }
        true
    }

    /// Idle wait ahead of a condition or transfer; expiry only degrades.
    fn settle(&mut self, before: &'static str) {
        if !self.poll_idle() {
            self.stats.idle_timeouts += 1;
            warn!("bus: idle wait expired before {}, proceeding", before);
        }
    }

    fn record<T>(&mut self, result: Result<T, BusError>) -> Result<T, BusError> {
        match &result {
            Ok(_) => self.last_fault = None,
            Err(e) => {
                match e {
                    BusError::Timeout(_) => self.stats.transfer_timeouts += 1,
                    BusError::Nack(_) => self.stats.nacks += 1,
                    BusError::Stuck => {}
                }
                warn!("bus: {}", e);
                self.last_fault = Some(*e);
            }
        }
        result
    }
}

impl<C, K, D> TwoWireMaster for BusTransport<C, K, D>
where
    C: BusController,
    K: Clock,
    D: DelayNs,
{
    fn initialize(&mut self, clock_hz: u32) {
        self.controller.configure(clock_hz);
        info!("bus: master mode at {} Hz", clock_hz);
    }

    fn start(&mut self) {
        self.settle("start");
        self.controller.signal_start();
    }

    fn repeated_start(&mut self) {
        self.settle("repeated start");
        self.controller.signal_repeated_start();
    }

    fn stop(&mut self) {
        self.settle("stop");
        self.controller.signal_stop();
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), BusError> {
        self.settle("write");
        // Clear first, the flag may still be set from the previous byte.
        self.controller.clear_transfer_flag();
        self.controller.load_byte(byte);

        let deadline = Deadline::after(&self.clock, self.timeout_us);
        while !self.controller.transfer_done() {
            if deadline.expired(&self.clock) {
                return self.record(Err(BusError::Timeout(BusPhase::Transmit)));
            }
        }

        let outcome = if self.controller.nack_received() {
            Err(BusError::Nack(NackStage::Data))
        } else {
            Ok(())
        };
        self.record(outcome)
    }

    fn read_byte(&mut self, ack: bool) -> Result<u8, BusError> {
        self.settle("receive");
        self.controller.enable_receive();
        if !self.poll_idle() {
            return self.record(Err(BusError::Timeout(BusPhase::Receive)));
        }
        let byte = self.controller.received_byte();
        self.settle("acknowledge");
        self.controller.send_acknowledge(ack);
        self.record(Ok(byte))
    }

    fn recover(&mut self) -> Recovery {
        if !self.controller.data_line_low() {
            return Recovery::Clear;
        }

        warn!("bus: data line held low, pulsing clock");
        self.stats.recoveries += 1;
        self.controller.seize_clock();
        for _ in 0..RECOVERY_PULSES {
            self.controller.drive_clock(false);
            self.delay.delay_ms(RECOVERY_HALF_PERIOD_MS);
            self.controller.drive_clock(true);
            self.delay.delay_ms(RECOVERY_HALF_PERIOD_MS);
        }
        self.controller.release_clock();

        if self.controller.data_line_low() {
            self.stats.stuck_after_recovery += 1;
            self.last_fault = Some(BusError::Stuck);
            error!("bus: data line still low after {} clock pulses", RECOVERY_PULSES);
            Recovery::StillStuck
        } else {
            info!("bus: data line released");
            Recovery::Released
        }
    }

    fn stats(&self) -> BusStats {
        self.stats
    }
}
