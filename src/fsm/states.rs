//! Concrete state handler functions and table builder.
//!
//! Each state does its work in `on_update` and always names its
//! successor, so one tick is one phase of the duty cycle.
//!
//! ```text
//!  CONFIGURING ──▶ ACQUIRING ──[battery ≥ threshold]──▶ TRANSMITTING ──┐
//!       ▲               │                                             │
//!       │               └──[battery < threshold]──▶ FAULT_INDICATING ─┤
//!       │                                                             ▼
//!       └────────[wake timer]──────── ASLEEP ◀──────────── POWERING_DOWN
//! ```

use embedded_hal::delay::DelayNs;
use log::{debug, info, warn};

use super::context::{CycleContext, FaultSource, TxOutcome};
use super::{PowerState, StateDescriptor};
use crate::acquisition;
use crate::app::events::NodeEvent;
use crate::app::ports::{NodePorts, PowerPort, RadioLink, WakeReason};
use crate::drivers::bus::TwoWireMaster;
use crate::error::RadioError;
use crate::sensors::bh1750::Mode;

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

pub fn build_state_table<P: NodePorts>() -> [StateDescriptor<P>; PowerState::COUNT] {
    [
        StateDescriptor {
            id: PowerState::Configuring,
            name: "Configuring",
            on_enter: None,
            on_exit: None,
            on_update: configuring_update,
        },
        StateDescriptor {
            id: PowerState::Acquiring,
            name: "Acquiring",
            on_enter: None,
            on_exit: None,
            on_update: acquiring_update,
        },
        StateDescriptor {
            id: PowerState::Transmitting,
            name: "Transmitting",
            on_enter: None,
            on_exit: Some(led_off),
            on_update: transmitting_update,
        },
        StateDescriptor {
            id: PowerState::FaultIndicating,
            name: "FaultIndicating",
            on_enter: Some(fault_indicating_enter),
            on_exit: Some(led_off),
            on_update: fault_indicating_update,
        },
        StateDescriptor {
            id: PowerState::PoweringDown,
            name: "PoweringDown",
            on_enter: None,
            on_exit: None,
            on_update: powering_down_update,
        },
        StateDescriptor {
            id: PowerState::Asleep,
            name: "Asleep",
            on_enter: None,
            on_exit: None,
            on_update: asleep_update,
        },
    ]
}

/// Never leave a state with the LED lit.
fn led_off<P: NodePorts>(_ctx: &mut CycleContext, ports: &mut P) {
    if ports.led().is_lit() {
        ports.led().off();
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  CONFIGURING: power up, bring the bus and both sensors to a known state
// ═══════════════════════════════════════════════════════════════════════════

fn configuring_update<P: NodePorts>(ctx: &mut CycleContext, ports: &mut P) -> Option<PowerState> {
    ctx.begin_cycle();
    ports.power().enable_peripherals();

    let bus = ports.bus();
    bus.initialize(ctx.config.bus_clock_hz);
    let recovery = bus.recover();
    ctx.note_recovery(recovery);

    let sensors = ctx.sensors;
    if let Err(e) = sensors.uv.start(ports.bus()) {
        ctx.record_fault(FaultSource::UvConfig, e);
    }
    if let Err(e) = sensors.light.set_mode(ports.bus(), Mode::ContinuousHigh) {
        ctx.record_fault(FaultSource::LightMode, e);
    }

    debug!("CONFIGURING: cycle {} ready", ctx.counter);
    Some(PowerState::Acquiring)
}

// ═══════════════════════════════════════════════════════════════════════════
//  ACQUIRING: read, frame, then the undervoltage gate
// ═══════════════════════════════════════════════════════════════════════════

fn acquiring_update<P: NodePorts>(ctx: &mut CycleContext, ports: &mut P) -> Option<PowerState> {
    let readings = acquisition::acquire(ctx, ports);
    let threshold = ctx.config.uvlo_threshold_raw;

    if readings.battery >= threshold {
        Some(PowerState::Transmitting)
    } else {
        warn!(
            "ACQUIRING: battery {} below lockout {}, not transmitting",
            readings.battery, threshold
        );
        ctx.emit(NodeEvent::Undervoltage {
            battery_raw: readings.battery,
            threshold,
        });
        Some(PowerState::FaultIndicating)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
//  TRANSMITTING: hand the frame to the radio, poll for completion, sleep it
// ═══════════════════════════════════════════════════════════════════════════

fn transmitting_update<P: NodePorts>(ctx: &mut CycleContext, ports: &mut P) -> Option<PowerState> {
    let outcome = match send_frame(ctx, ports) {
        Ok(outcome) => outcome,
        Err(e) => {
            ctx.record_fault(FaultSource::Radio, e);
            TxOutcome::Failed(e)
        }
    };

    if let Err(e) = ports.radio().sleep() {
        ctx.record_fault(FaultSource::Radio, e);
    }
    ports.delay().delay_ms(ctx.config.radio_settle_ms);

    match outcome {
        TxOutcome::Completed { polls } => {
            info!("TRANSMITTING: frame {} sent after {} polls", ctx.counter, polls)
        }
        TxOutcome::TimedOut => warn!(
            "TRANSMITTING: no completion after {} polls, giving up",
            ctx.config.tx_poll_attempts
        ),
        _ => {}
    }
    ctx.report.tx = Some(outcome);
    ctx.emit(NodeEvent::Transmit(outcome));
    Some(PowerState::PoweringDown)
}

fn send_frame<P: NodePorts>(ctx: &CycleContext, ports: &mut P) -> Result<TxOutcome, RadioError> {
    let config = &ctx.config;
    let radio = ports.radio();
    radio.configure(config.radio_frequency_hz, config.radio_sync_word)?;
    radio.clear_flags()?;

    ports.led().on();
    let sent = ports.radio().transmit(ctx.frame.as_bytes());
    ports.led().off();
    sent?;

    for poll in 1..=config.tx_poll_attempts {
        if ports.radio().poll_flags()? != 0 {
            return Ok(TxOutcome::Completed { polls: poll });
        }
        ports.delay().delay_ms(config.tx_poll_interval_ms);
    }
    Ok(TxOutcome::TimedOut)
}

// ═══════════════════════════════════════════════════════════════════════════
//  FAULT_INDICATING: flat battery, pulse the LED instead of transmitting
// ═══════════════════════════════════════════════════════════════════════════

fn fault_indicating_enter<P: NodePorts>(ctx: &mut CycleContext, _ports: &mut P) {
    ctx.report.tx = Some(TxOutcome::Suppressed);
}

fn fault_indicating_update<P: NodePorts>(
    ctx: &mut CycleContext,
    ports: &mut P,
) -> Option<PowerState> {
    let config = &ctx.config;
    for _ in 0..config.fault_pulse_count {
        ports.led().on();
        ports.delay().delay_ms(config.fault_pulse_on_ms);
        ports.led().off();
        ports.delay().delay_ms(config.fault_pulse_off_ms);
    }
    ctx.emit(NodeEvent::Transmit(TxOutcome::Suppressed));
    Some(PowerState::PoweringDown)
}

// ═══════════════════════════════════════════════════════════════════════════
//  POWERING_DOWN: nothing may be left drawing current while asleep
// ═══════════════════════════════════════════════════════════════════════════

fn powering_down_update<P: NodePorts>(ctx: &mut CycleContext, ports: &mut P) -> Option<PowerState> {
    let power = ports.power();
    power.disable_peripherals();
    power.park_pins();

    let stats = ports.bus().stats();
    ctx.complete_cycle(stats);
    Some(PowerState::Asleep)
}

// ═══════════════════════════════════════════════════════════════════════════
//  ASLEEP: wait for the hardware wake timer
// ═══════════════════════════════════════════════════════════════════════════

fn asleep_update<P: NodePorts>(ctx: &mut CycleContext, ports: &mut P) -> Option<PowerState> {
    match ports.power().sleep(ctx.config.wake_interval_ms) {
        WakeReason::Timer => debug!("ASLEEP: woke on timer"),
        WakeReason::Other => warn!("ASLEEP: woke early, starting next cycle"),
    }
    Some(PowerState::Configuring)
}
