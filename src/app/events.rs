//! Outbound application events.
//!
//! State handlers queue these in the cycle context; the
//! [`DutyCycleService`](super::service::DutyCycleService) drains them
//! through the [`EventSink`](super::ports::EventSink) port after every
//! tick. Adapters on the other side decide what to do with them.

use crate::drivers::bus::{BusStats, Recovery};
use crate::fsm::PowerState;
use crate::fsm::context::{FaultRecord, TxOutcome};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeEvent {
    /// The service has started (carries initial state).
    Started(PowerState),

    /// The FSM transitioned between states.
    StateChanged { from: PowerState, to: PowerState },

    /// The data line was found held low at rest.
    BusRecovery(Recovery),

    /// A cycle step failed; its value was framed as zero.
    Fault(FaultRecord),

    /// Battery below the lockout threshold; transmission skipped.
    Undervoltage { battery_raw: u16, threshold: u16 },

    /// The transmit step finished.
    Transmit(TxOutcome),

    /// A cycle reached power-down.
    CycleCompleted(CycleSummary),
}

/// Compact per-cycle digest for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    pub counter: u32,
    pub battery_raw: u16,
    pub faults: u8,
    pub tx: TxOutcome,
    pub bus: BusStats,
}
