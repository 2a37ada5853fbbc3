//! Integration tests: DutyCycleService → FSM → ports, one full wake cycle
//! at a time against the shared-timeline mocks.

use uvnode::app::events::NodeEvent;
use uvnode::app::service::DutyCycleService;
use uvnode::app::ports::WakeReason;
use uvnode::config::NodeConfig;
use uvnode::drivers::bus::Recovery;
use uvnode::error::{BusError, Error, RadioError, SensorError};
use uvnode::fsm::PowerState;
use uvnode::fsm::context::{FaultSource, TxOutcome};
use uvnode::sensors::{bh1750, veml6075};
use uvnode::telemetry::{Crc16Modbus, FRAME_LEN, TelemetryFrame};

use crate::mock_hw::{MockPorts, RecordingSink, Shared, Step, World, ports};

// ── Helpers ───────────────────────────────────────────────────

struct Rig {
    world: Shared,
    ports: MockPorts,
    service: DutyCycleService<MockPorts>,
    sink: RecordingSink,
}

fn rig_with(config: NodeConfig, setup: impl FnOnce(&mut World)) -> Rig {
    let world = World::new();
    setup(&mut *world.borrow_mut());
    let mut ports = ports(&world);
    let mut service = DutyCycleService::new(config).expect("valid config");
    let mut sink = RecordingSink::default();
    service.start(&mut ports, &mut sink);
    Rig {
        world,
        ports,
        service,
        sink,
    }
}

fn rig(setup: impl FnOnce(&mut World)) -> Rig {
    rig_with(NodeConfig::default(), setup)
}

impl Rig {
    fn cycle(&mut self) -> uvnode::app::events::CycleSummary {
        self.service.run_cycle(&mut self.ports, &mut self.sink)
    }

    fn faults_from(&self, source: FaultSource) -> usize {
        self.service
            .last_report()
            .faults
            .iter()
            .filter(|f| f.source == source)
            .count()
    }
}

fn is_radio(step: &Step) -> bool {
    matches!(
        step,
        Step::RadioConfigure { .. }
            | Step::RadioClearFlags
            | Step::RadioTransmit(_)
            | Step::RadioPoll
            | Step::RadioSleep
    )
}

// ── Nominal cycle ─────────────────────────────────────────────

#[test]
fn nominal_cycle_transmits_one_checksummed_frame() {
    let mut r = rig(|_| {});
    let summary = r.cycle();

    let frames = r.world.borrow().transmitted();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].len(), FRAME_LEN);

    let fields = TelemetryFrame::parse(&frames[0], &Crc16Modbus).expect("frame verifies");
    let defaults = NodeConfig::default();
    assert_eq!(fields.node_type, defaults.node_type);
    assert_eq!(fields.address, defaults.node_address);
    assert_eq!(fields.version, defaults.software_version);
    assert_eq!(fields.counter, 0);
    assert_eq!(fields.battery, 600);
    assert_eq!(fields.temperature, 512);
    assert_eq!(
        (fields.uva, fields.uvb, fields.comp1, fields.comp2),
        (0x0102, 0x0304, 0x0506, 0x0708)
    );
    assert_eq!(fields.visible, 0x1234);

    assert_eq!(summary.counter, 0);
    assert_eq!(summary.faults, 0);
    assert_eq!(summary.tx, TxOutcome::Completed { polls: 1 });
    assert_eq!(r.service.state(), PowerState::Configuring);
}

#[test]
fn phases_run_in_order() {
    let mut r = rig(|_| {});
    r.cycle();
    let w = r.world.borrow();

    let order = [
        w.position(|s| *s == Step::PeripheralsOn),
        w.position(|s| matches!(s, Step::BusInit(100_000))),
        w.position(|s| *s == Step::BusRecover),
        w.position(|s| *s == Step::Delay(180)),
        w.position(|s| *s == Step::Battery),
        w.position(|s| *s == Step::Temperature),
        w.position(|s| matches!(s, Step::RadioConfigure { .. })),
        w.position(|s| matches!(s, Step::RadioTransmit(_))),
        w.position(|s| *s == Step::RadioSleep),
        w.position(|s| *s == Step::PeripheralsOff),
        w.position(|s| *s == Step::ParkPins),
        w.position(|s| *s == Step::Sleep(131_072)),
    ];
    let positions: Vec<usize> = order.iter().map(|p| p.expect("step present")).collect();
    assert!(
        positions.windows(2).all(|pair| pair[0] < pair[1]),
        "out of order: {positions:?}"
    );
    assert_eq!(w.steps.last(), Some(&Step::Sleep(131_072)));
}

#[test]
fn radio_is_configured_with_carrier_and_sync_word() {
    let mut r = rig(|_| {});
    r.cycle();
    let w = r.world.borrow();
    assert!(w.steps.contains(&Step::RadioConfigure {
        frequency_hz: 866_500_000,
        sync_word: 0x55,
    }));
    let clear = w.position(|s| *s == Step::RadioClearFlags).unwrap();
    let tx = w.position(|s| matches!(s, Step::RadioTransmit(_))).unwrap();
    assert!(clear < tx);
}

#[test]
fn led_brackets_the_transmit_call() {
    let mut r = rig(|_| {});
    r.cycle();
    let w = r.world.borrow();
    let tx = w.position(|s| matches!(s, Step::RadioTransmit(_))).unwrap();
    assert_eq!(w.steps[tx - 1], Step::Led(true));
    assert_eq!(w.steps[tx + 1], Step::Led(false));
    assert_eq!(w.count(|s| *s == Step::Led(true)), 1);
}

#[test]
fn light_value_is_read_only_after_the_conversion_wait() {
    let mut r = rig(|_| {});
    r.cycle();
    let w = r.world.borrow();
    let wait = w.position(|s| *s == Step::Delay(180)).unwrap();
    let trigger = w.steps[..wait]
        .iter()
        .rposition(|s| *s == Step::BusWrite(bh1750::Mode::ContinuousHigh.opcode()))
        .expect("mode set before the wait");
    let read = w
        .position(|s| *s == Step::BusWrite(bh1750::ADDRESS_LOW + 1))
        .unwrap();
    assert!(trigger < wait && wait < read);
}

#[test]
fn uv_channels_read_in_register_order() {
    let mut r = rig(|_| {});
    r.cycle();
    let w = r.world.borrow();
    let pointers: Vec<u8> = w
        .steps
        .windows(3)
        .filter_map(|win| match win {
            [Step::BusWrite(a), Step::BusWrite(reg), Step::BusRestart]
                if *a == veml6075::ADDRESS =>
            {
                Some(*reg)
            }
            _ => None,
        })
        .collect();
    assert_eq!(
        pointers,
        vec![
            veml6075::REG_UVA,
            veml6075::REG_UVB,
            veml6075::REG_COMP1,
            veml6075::REG_COMP2
        ]
    );
}

#[test]
fn every_read_ends_with_not_acknowledge() {
    let mut r = rig(|_| {});
    r.cycle();
    let w = r.world.borrow();
    let reads: Vec<bool> = w
        .steps
        .iter()
        .filter_map(|s| match s {
            Step::BusRead { ack } => Some(*ack),
            _ => None,
        })
        .collect();
    // Four UV words plus the light value, two bytes each.
    assert_eq!(reads.len(), 10);
    for pair in reads.chunks(2) {
        assert_eq!(pair, [true, false]);
    }
}

// ── Message counter ───────────────────────────────────────────

#[test]
fn counter_advances_by_one_per_cycle() {
    let mut r = rig(|_| {});
    for _ in 0..3 {
        r.cycle();
    }
    let counters: Vec<u32> = r
        .world
        .borrow()
        .transmitted()
        .iter()
        .map(|f| TelemetryFrame::parse(f, &Crc16Modbus).unwrap().counter)
        .collect();
    assert_eq!(counters, vec![0, 1, 2]);
    assert_eq!(r.service.message_counter(), 3);
    assert_eq!(r.service.cycles(), 3);
}

#[test]
fn stored_frame_matches_the_transmitted_one() {
    let mut r = rig(|_| {});
    r.cycle();
    let sent = r.world.borrow().transmitted().remove(0);
    assert_eq!(r.service.frame(), &sent[..]);
}

// ── Undervoltage lockout ──────────────────────────────────────

#[test]
fn low_battery_never_touches_the_radio() {
    let mut r = rig(|w| w.battery = Ok(525));
    let summary = r.cycle();
    let w = r.world.borrow();

    assert_eq!(w.count(is_radio), 0);
    assert_eq!(summary.tx, TxOutcome::Suppressed);
    assert!(w.steps.contains(&Step::PeripheralsOff));
    assert!(w.steps.contains(&Step::Sleep(131_072)));
    assert!(r.sink.events.contains(&NodeEvent::Undervoltage {
        battery_raw: 525,
        threshold: 526,
    }));
}

#[test]
fn low_battery_pulses_the_led_three_times() {
    let mut r = rig(|w| w.battery = Ok(100));
    r.cycle();
    let w = r.world.borrow();

    let pattern: Vec<Step> = w
        .steps
        .iter()
        .filter(|s| matches!(s, Step::Led(_) | Step::Delay(300)))
        .cloned()
        .collect();
    let pulse = [Step::Led(true), Step::Delay(300), Step::Led(false), Step::Delay(300)];
    assert_eq!(pattern, [&pulse[..], &pulse[..], &pulse[..]].concat());
}

#[test]
fn threshold_value_itself_transmits() {
    let mut r = rig(|w| w.battery = Ok(526));
    let summary = r.cycle();
    assert_eq!(r.world.borrow().transmitted().len(), 1);
    assert_eq!(summary.tx, TxOutcome::Completed { polls: 1 });
}

#[test]
fn lockout_cycle_still_consumes_a_counter_value() {
    let mut r = rig(|w| w.battery = Ok(400));
    r.cycle();
    r.world.borrow_mut().battery = Ok(700);
    r.cycle();
    let frames = r.world.borrow().transmitted();
    assert_eq!(frames.len(), 1);
    assert_eq!(TelemetryFrame::parse(&frames[0], &Crc16Modbus).unwrap().counter, 1);
}

#[test]
fn failed_battery_read_is_framed_as_zero_and_locks_out() {
    let mut r = rig(|w| w.battery = Err(SensorError::AdcReadFailed));
    let summary = r.cycle();
    assert_eq!(r.service.last_report().readings.battery, 0);
    assert_eq!(r.faults_from(FaultSource::Battery), 1);
    assert_eq!(summary.tx, TxOutcome::Suppressed);
    assert_eq!(r.world.borrow().count(is_radio), 0);
}

// ── Transmit completion ───────────────────────────────────────

#[test]
fn transmit_gives_up_after_fifty_polls() {
    let mut r = rig(|w| w.complete_on_poll = None);
    let summary = r.cycle();
    let w = r.world.borrow();

    assert_eq!(summary.tx, TxOutcome::TimedOut);
    assert_eq!(w.count(|s| *s == Step::RadioPoll), 50);
    // Fifty poll intervals plus the settle after sleep.
    assert_eq!(w.count(|s| *s == Step::Delay(10)), 51);
    let last_poll = w.steps.iter().rposition(|s| *s == Step::RadioPoll).unwrap();
    let sleep = w.position(|s| *s == Step::RadioSleep).unwrap();
    assert!(last_poll < sleep);
}

#[test]
fn completion_reports_the_poll_that_saw_it() {
    let mut r = rig(|w| w.complete_on_poll = Some(5));
    let summary = r.cycle();
    assert_eq!(summary.tx, TxOutcome::Completed { polls: 5 });
    assert_eq!(r.world.borrow().count(|s| *s == Step::RadioPoll), 5);
}

#[test]
fn radio_failure_still_puts_the_radio_to_sleep() {
    let mut r = rig(|w| w.radio_configure_error = Some(RadioError::NotDetected(0x00)));
    let summary = r.cycle();
    let w = r.world.borrow();

    assert!(w.transmitted().is_empty());
    assert_eq!(w.count(|s| *s == Step::RadioSleep), 1);
    assert_eq!(summary.tx, TxOutcome::Failed(RadioError::NotDetected(0x00)));
    assert_eq!(r.faults_from(FaultSource::Radio), 1);
    assert!(w.steps.contains(&Step::Sleep(131_072)));
}

// ── Degraded sensors ──────────────────────────────────────────

#[test]
fn missing_light_sensor_frames_zero_and_still_transmits() {
    let mut r = rig(|w| w.light_present = false);
    r.cycle();

    let frames = r.world.borrow().transmitted();
    assert_eq!(frames.len(), 1);
    let fields = TelemetryFrame::parse(&frames[0], &Crc16Modbus).unwrap();
    assert_eq!(fields.visible, 0);
    assert_eq!(fields.uva, 0x0102);
    assert_eq!(r.faults_from(FaultSource::Light), 1);
    assert!(r.faults_from(FaultSource::LightMode) >= 1);
}

#[test]
fn missing_uv_sensor_zeroes_all_four_channels() {
    let mut r = rig(|w| w.uv_present = false);
    r.cycle();

    let frames = r.world.borrow().transmitted();
    let fields = TelemetryFrame::parse(&frames[0], &Crc16Modbus).unwrap();
    assert_eq!((fields.uva, fields.uvb, fields.comp1, fields.comp2), (0, 0, 0, 0));
    assert_eq!(fields.visible, 0x1234);
    assert_eq!(r.faults_from(FaultSource::UvConfig), 1);
    for channel in veml6075::UvChannel::ALL {
        assert_eq!(r.faults_from(FaultSource::Uv(channel)), 1);
    }
}

#[test]
fn stuck_bus_is_reported_and_the_cycle_carries_on() {
    let mut r = rig(|w| w.recovery = Recovery::StillStuck);
    r.cycle();

    assert!(r.sink.events.contains(&NodeEvent::BusRecovery(Recovery::StillStuck)));
    assert_eq!(r.service.last_report().recovery, Recovery::StillStuck);
    let report = r.service.last_report();
    assert!(report.faults.iter().any(|f| {
        f.source == FaultSource::BusRecovery && f.error == Error::Bus(BusError::Stuck)
    }));
    assert_eq!(r.world.borrow().transmitted().len(), 1);
}

#[test]
fn worst_case_cycle_keeps_every_fault() {
    let mut r = rig(|w| {
        w.light_present = false;
        w.uv_present = false;
        w.recovery = Recovery::StillStuck;
        w.temperature = Err(SensorError::AdcReadFailed);
        w.radio_configure_error = Some(RadioError::Spi);
        w.radio_sleep_error = Some(RadioError::Spi);
    });
    r.cycle();

    assert_eq!(r.faults_from(FaultSource::BusRecovery), 2);
    assert_eq!(r.faults_from(FaultSource::UvConfig), 1);
    assert_eq!(r.faults_from(FaultSource::LightMode), 2);
    for channel in veml6075::UvChannel::ALL {
        assert_eq!(r.faults_from(FaultSource::Uv(channel)), 1);
    }
    assert_eq!(r.faults_from(FaultSource::Light), 1);
    assert_eq!(r.faults_from(FaultSource::Temperature), 1);
    assert_eq!(r.faults_from(FaultSource::Radio), 2);
    assert_eq!(r.service.last_report().faults.len(), 13);
}

// ── Events and sleep ──────────────────────────────────────────

#[test]
fn events_trace_the_whole_cycle() {
    let mut r = rig(|_| {});
    r.cycle();

    assert_eq!(r.sink.events[0], NodeEvent::Started(PowerState::Configuring));
    let transitions: Vec<(PowerState, PowerState)> = r
        .sink
        .events
        .iter()
        .filter_map(|e| match e {
            NodeEvent::StateChanged { from, to } => Some((*from, *to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        transitions,
        vec![
            (PowerState::Configuring, PowerState::Acquiring),
            (PowerState::Acquiring, PowerState::Transmitting),
            (PowerState::Transmitting, PowerState::PoweringDown),
            (PowerState::PoweringDown, PowerState::Asleep),
            (PowerState::Asleep, PowerState::Configuring),
        ]
    );
    assert!(r.sink.events.iter().any(|e| matches!(
        e,
        NodeEvent::CycleCompleted(s) if s.counter == 0 && s.tx == TxOutcome::Completed { polls: 1 }
    )));
}

#[test]
fn lockout_path_goes_through_fault_indication() {
    let mut r = rig(|w| w.battery = Ok(0));
    r.cycle();
    assert!(r.sink.events.contains(&NodeEvent::StateChanged {
        from: PowerState::Acquiring,
        to: PowerState::FaultIndicating,
    }));
    assert!(r.sink.events.contains(&NodeEvent::StateChanged {
        from: PowerState::FaultIndicating,
        to: PowerState::PoweringDown,
    }));
}

#[test]
fn early_wake_still_starts_the_next_cycle() {
    let mut r = rig(|w| w.wake = WakeReason::Other);
    r.cycle();
    assert_eq!(r.service.state(), PowerState::Configuring);
    r.cycle();
    assert_eq!(r.world.borrow().transmitted().len(), 2);
}

#[test]
fn configured_wake_interval_reaches_the_sleep_call() {
    let config = NodeConfig {
        wake_interval_ms: 60_000,
        ..NodeConfig::default()
    };
    let mut r = rig_with(config, |_| {});
    r.cycle();
    assert!(r.world.borrow().steps.contains(&Step::Sleep(60_000)));
}

// ── Lockout gate ──────────────────────────────────────────────

proptest::proptest! {
    #![proptest_config(proptest::prelude::ProptestConfig::with_cases(64))]

    /// The radio is used if and only if the battery reaches the threshold.
    #[test]
    fn transmits_iff_battery_reaches_threshold(battery in 0u16..=1023) {
        let mut r = rig(|w| w.battery = Ok(battery));
        let summary = r.cycle();
        let radio_steps = r.world.borrow().count(is_radio);
        if battery >= 526 {
            proptest::prop_assert_eq!(r.world.borrow().transmitted().len(), 1);
            proptest::prop_assert_eq!(summary.tx, TxOutcome::Completed { polls: 1 });
        } else {
            proptest::prop_assert_eq!(radio_steps, 0);
            proptest::prop_assert_eq!(summary.tx, TxOutcome::Suppressed);
        }
    }
}
