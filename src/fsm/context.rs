//! Shared mutable context threaded through every FSM handler.
//!
//! `CycleContext` is what survives between wakes: the configuration, the
//! message counter and the frame buffer. Everything else in it describes
//! the cycle in progress and is reset when `Configuring` begins.

use heapless::Vec;
use log::warn;

use crate::app::events::{CycleSummary, NodeEvent};
use crate::config::NodeConfig;
use crate::drivers::bus::{BusStats, Recovery};
use crate::error::{BusError, ConfigError, Error, RadioError};
use crate::sensors::SensorSet;
use crate::sensors::veml6075::{UvChannel, UvReading};
use crate::telemetry::TelemetryFrame;

/// Events a single tick can queue before the service drains them.
pub const EVENT_QUEUE_LEN: usize = 16;
/// Faults remembered per cycle. The worst case records 13: three while
/// configuring, eight acquiring (with a good battery) and two from the radio.
pub const MAX_FAULTS: usize = 16;

// ---------------------------------------------------------------------------
// Readings
// ---------------------------------------------------------------------------

/// Raw values gathered by one acquisition, exactly as framed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Readings {
    pub battery: u16,
    pub temperature: u16,
    pub uv: UvReading,
    pub visible: u16,
}

// ---------------------------------------------------------------------------
// Faults and outcomes
// ---------------------------------------------------------------------------

/// Which step of the cycle a fault came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultSource {
    BusRecovery,
    LightMode,
    UvConfig,
    Light,
    Uv(UvChannel),
    Battery,
    Temperature,
    Radio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaultRecord {
    pub source: FaultSource,
    pub error: Error,
}

/// How the transmit step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxOutcome {
    /// Completion flag seen after `polls` polls.
    Completed { polls: u8 },
    /// Poll budget spent without a completion flag.
    TimedOut,
    /// The radio refused a command; the frame may not have gone out.
    Failed(RadioError),
    /// Undervoltage lockout; the radio was never touched.
    Suppressed,
}

/// Everything that happened in one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    /// Message counter carried by this cycle's frame.
    pub counter: u32,
    pub readings: Readings,
    pub faults: Vec<FaultRecord, MAX_FAULTS>,
    /// `None` until the cycle reaches the transmit/lockout branch.
    pub tx: Option<TxOutcome>,
    pub recovery: Recovery,
    /// Bus counters at the end of the cycle.
    pub bus: BusStats,
}

impl CycleReport {
    pub fn new(counter: u32) -> Self {
        Self {
            counter,
            readings: Readings::default(),
            faults: Vec::new(),
            tx: None,
            recovery: Recovery::Clear,
            bus: BusStats::default(),
        }
    }

    pub fn summary(&self) -> CycleSummary {
        CycleSummary {
            counter: self.counter,
            battery_raw: self.readings.battery,
            faults: self.faults.len() as u8,
            tx: self.tx.unwrap_or(TxOutcome::Suppressed),
            bus: self.bus,
        }
    }
}

// ---------------------------------------------------------------------------
// CycleContext
// ---------------------------------------------------------------------------

/// The shared context passed to every state handler function.
pub struct CycleContext {
    pub config: NodeConfig,
    pub sensors: SensorSet,

    // -- Retained across sleep --
    /// Messages completed since power-on; wraps at `u32::MAX`.
    pub counter: u32,
    pub frame: TelemetryFrame,

    // -- Current cycle --
    pub report: CycleReport,
    /// Drained to the event sink after every tick.
    pub events: Vec<NodeEvent, EVENT_QUEUE_LEN>,
}

impl CycleContext {
    pub fn new(config: NodeConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let sensors = SensorSet::from_config(&config)?;
        Ok(Self {
            config,
            sensors,
            counter: 0,
            frame: TelemetryFrame::new(),
            report: CycleReport::new(0),
            events: Vec::new(),
        })
    }

    /// Queue an event; the oldest unread events win if the queue is full.
    pub fn emit(&mut self, event: NodeEvent) {
        if self.events.push(event).is_err() {
            warn!("event queue full, dropping event");
        }
    }

    /// Note a failed step. The cycle carries on regardless.
    pub fn record_fault(&mut self, source: FaultSource, error: impl Into<Error>) {
        let record = FaultRecord {
            source,
            error: error.into(),
        };
        warn!("{:?}: {}", source, record.error);
        if self.report.faults.push(record).is_err() {
            warn!("fault list full, dropping {:?}", source);
        }
        self.emit(NodeEvent::Fault(record));
    }

    /// Note the outcome of a stuck-bus check. A bus that stays stuck is
    /// also a fault.
    pub fn note_recovery(&mut self, recovery: Recovery) {
        if recovery == Recovery::Clear {
            return;
        }
        if self.report.recovery != Recovery::StillStuck {
            self.report.recovery = recovery;
        }
        self.emit(NodeEvent::BusRecovery(recovery));
        if recovery == Recovery::StillStuck {
            self.record_fault(FaultSource::BusRecovery, BusError::Stuck);
        }
    }

    /// Start a fresh report for the cycle that is about to run.
    pub fn begin_cycle(&mut self) {
        self.report = CycleReport::new(self.counter);
    }

    /// Close the report and advance the counter. Runs once per cycle,
    /// whether or not the frame was transmitted.
    pub fn complete_cycle(&mut self, bus: BusStats) {
        self.report.bus = bus;
        self.emit(NodeEvent::CycleCompleted(self.report.summary()));
        self.counter = self.counter.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> CycleContext {
        CycleContext::new(NodeConfig::default()).unwrap()
    }

    #[test]
    fn invalid_config_is_refused() {
        let config = NodeConfig {
            tx_poll_attempts: 0,
            ..NodeConfig::default()
        };
        assert!(CycleContext::new(config).is_err());
    }

    #[test]
    fn counter_advances_once_per_completed_cycle() {
        let mut c = ctx();
        c.begin_cycle();
        assert_eq!(c.report.counter, 0);
        c.complete_cycle(BusStats::default());
        c.begin_cycle();
        assert_eq!(c.report.counter, 1);
        assert_eq!(c.counter, 1);
    }

    #[test]
    fn counter_wraps() {
        let mut c = ctx();
        c.counter = u32::MAX;
        c.complete_cycle(BusStats::default());
        assert_eq!(c.counter, 0);
    }

    #[test]
    fn faults_are_recorded_and_queued() {
        let mut c = ctx();
        c.record_fault(FaultSource::Light, BusError::Stuck);
        assert_eq!(c.report.faults.len(), 1);
        assert!(matches!(c.events[0], NodeEvent::Fault(r) if r.source == FaultSource::Light));
    }

    #[test]
    fn fault_list_is_bounded() {
        let mut c = ctx();
        for _ in 0..MAX_FAULTS + 3 {
            c.record_fault(FaultSource::Battery, BusError::Stuck);
            c.events.clear();
        }
        assert_eq!(c.report.faults.len(), MAX_FAULTS);
    }

    #[test]
    fn stuck_bus_is_a_fault_released_bus_is_not() {
        let mut c = ctx();
        c.note_recovery(Recovery::Clear);
        assert!(c.events.is_empty());
        c.note_recovery(Recovery::Released);
        assert!(c.report.faults.is_empty());
        assert_eq!(c.report.recovery, Recovery::Released);
        c.note_recovery(Recovery::StillStuck);
        c.note_recovery(Recovery::Released);
        assert_eq!(c.report.recovery, Recovery::StillStuck);
        assert_eq!(c.report.faults.len(), 1);
    }

    #[test]
    fn begin_cycle_clears_previous_report() {
        let mut c = ctx();
        c.record_fault(FaultSource::Temperature, BusError::Stuck);
        c.report.tx = Some(TxOutcome::TimedOut);
        c.begin_cycle();
        assert!(c.report.faults.is_empty());
        assert_eq!(c.report.tx, None);
    }
}
