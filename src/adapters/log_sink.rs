//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured node events to the
//! ESP-IDF logger (UART / USB-CDC in production).

use log::{info, warn};

use crate::app::events::NodeEvent;
use crate::app::ports::EventSink;
use crate::drivers::bus::Recovery;
use crate::fsm::context::TxOutcome;
use crate::sensors::analog;

/// Adapter that logs every [`NodeEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &NodeEvent) {
        match event {
            NodeEvent::Started(state) => {
                info!("START | initial_state={:?}", state);
            }
            NodeEvent::StateChanged { from, to } => {
                info!("STATE | {:?} -> {:?}", from, to);
            }
            NodeEvent::BusRecovery(Recovery::StillStuck) => {
                warn!("BUS   | data line still held low after recovery");
            }
            NodeEvent::BusRecovery(r) => {
                info!("BUS   | recovery {:?}", r);
            }
            NodeEvent::Fault(record) => {
                warn!("FAULT | {:?}: {}", record.source, record.error);
            }
            NodeEvent::Undervoltage {
                battery_raw,
                threshold,
            } => {
                warn!(
                    "UVLO  | battery {} ({} mV) < {} ({} mV), transmit suppressed",
                    battery_raw,
                    analog::battery_millivolts(*battery_raw),
                    threshold,
                    analog::battery_millivolts(*threshold),
                );
            }
            NodeEvent::Transmit(TxOutcome::Completed { polls }) => {
                info!("TX    | done after {} polls", polls);
            }
            NodeEvent::Transmit(outcome) => {
                info!("TX    | {:?}", outcome);
            }
            NodeEvent::CycleCompleted(s) => {
                info!(
                    "CYCLE | #{} | batt={} ({} mV) | faults={} | tx={:?} | \
                     bus idle_to={} xfer_to={} nack={} recov={} stuck={}",
                    s.counter,
                    s.battery_raw,
                    analog::battery_millivolts(s.battery_raw),
                    s.faults,
                    s.tx,
                    s.bus.idle_timeouts,
                    s.bus.transfer_timeouts,
                    s.bus.nacks,
                    s.bus.recoveries,
                    s.bus.stuck_after_recovery,
                );
            }
        }
    }
}
