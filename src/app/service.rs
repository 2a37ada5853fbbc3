//! Application service, the hexagonal core.
//!
//! [`DutyCycleService`] owns the FSM and the shared cycle context. Ports
//! are injected at call sites, so the whole duty cycle runs on the host
//! against mock adapters.
//!
//! ```text
//!   NodePorts ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!  (bus, analog,  │    DutyCycleService      │
//!   radio, power) │  FSM · CycleContext      │
//!                 └──────────────────────────┘
//! ```

use log::info;

use crate::config::NodeConfig;
use crate::error::ConfigError;
use crate::fsm::context::{CycleContext, CycleReport};
use crate::fsm::states::build_state_table;
use crate::fsm::{Fsm, PowerState};

use super::events::{CycleSummary, NodeEvent};
use super::ports::{EventSink, NodePorts};

/// Safety net on ticks per cycle; a healthy cycle takes one per state.
const MAX_TICKS_PER_CYCLE: usize = PowerState::COUNT * 2;

pub struct DutyCycleService<P> {
    fsm: Fsm<P>,
    ctx: CycleContext,
    cycles: u64,
}

impl<P: NodePorts> DutyCycleService<P> {
    /// Validate `config` and build the state table.
    ///
    /// Does **not** start the FSM; call [`start`](Self::start) next.
    pub fn new(config: NodeConfig) -> Result<Self, ConfigError> {
        let ctx = CycleContext::new(config)?;
        Ok(Self {
            fsm: Fsm::new(build_state_table(), PowerState::Configuring),
            ctx,
            cycles: 0,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, ports: &mut P, sink: &mut impl EventSink) {
        self.fsm.start(&mut self.ctx, ports);
        self.drain(sink);
        sink.emit(&NodeEvent::Started(self.fsm.current_state()));
        info!(
            "node {:02X?} type 0x{:04X} v{} starting",
            self.ctx.config.node_address,
            self.ctx.config.node_type,
            self.ctx.config.software_version
        );
    }

    /// Advance one state and forward everything it queued.
    pub fn tick(&mut self, ports: &mut P, sink: &mut impl EventSink) -> PowerState {
        let from = self.fsm.current_state();
        let to = self.fsm.tick(&mut self.ctx, ports);
        self.drain(sink);
        if to != from {
            sink.emit(&NodeEvent::StateChanged { from, to });
        }
        to
    }

    /// Run from the current state until the FSM is back at `Configuring`,
    /// i.e. one full wake-acquire-sleep loop when started there.
    pub fn run_cycle(&mut self, ports: &mut P, sink: &mut impl EventSink) -> CycleSummary {
        for _ in 0..MAX_TICKS_PER_CYCLE {
            if self.tick(ports, sink) == PowerState::Configuring {
                break;
            }
        }
        self.cycles += 1;
        self.ctx.report.summary()
    }

    pub fn run_forever(&mut self, ports: &mut P, sink: &mut impl EventSink) -> ! {
        loop {
            self.run_cycle(ports, sink);
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> PowerState {
        self.fsm.current_state()
    }

    /// Counter the next frame will carry.
    pub fn message_counter(&self) -> u32 {
        self.ctx.counter
    }

    /// Report of the cycle in progress, or of the last one if the FSM is
    /// parked at `Configuring`.
    pub fn last_report(&self) -> &CycleReport {
        &self.ctx.report
    }

    /// The most recently assembled frame.
    pub fn frame(&self) -> &[u8] {
        self.ctx.frame.as_bytes()
    }

    pub fn config(&self) -> &NodeConfig {
        &self.ctx.config
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    fn drain(&mut self, sink: &mut impl EventSink) {
        for event in self.ctx.events.iter() {
            sink.emit(event);
        }
        self.ctx.events.clear();
    }
}
