//! Mock hardware for integration tests.
//!
//! Every mock shares one [`World`], which simulates both sensors on the bus
//! and records every call in a single ordered timeline, so tests can assert
//! on cross-peripheral ordering without touching real registers.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin};

use uvnode::adapters::hardware::HardwareAdapter;
use uvnode::app::events::NodeEvent;
use uvnode::app::ports::{AnalogPort, EventSink, PowerPort, RadioLink, WakeReason};
use uvnode::drivers::bus::{BusStats, Recovery, TwoWireMaster};
use uvnode::error::{BusError, NackStage, RadioError, SensorError};
use uvnode::sensors::{bh1750, veml6075};

// ── Timeline ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    BusInit(u32),
    BusRecover,
    BusStart,
    BusRestart,
    BusStop,
    BusWrite(u8),
    BusRead { ack: bool },
    Battery,
    Temperature,
    Delay(u32),
    RadioConfigure { frequency_hz: u32, sync_word: u8 },
    RadioClearFlags,
    RadioTransmit(Vec<u8>),
    RadioPoll,
    RadioSleep,
    Led(bool),
    PeripheralsOn,
    PeripheralsOff,
    ParkPins,
    Sleep(u32),
}

/// Simulated devices plus the shared record.
pub struct World {
    pub steps: Vec<Step>,

    // -- Bus devices --
    pub visible: u16,
    /// UVA, UVB, COMP1, COMP2.
    pub uv: [u16; 4],
    pub light_present: bool,
    pub uv_present: bool,
    pub recovery: Recovery,
    addressed: Option<u8>,
    awaiting_address: bool,
    uv_pointer: u8,
    rx: VecDeque<u8>,

    // -- Analog --
    pub battery: Result<u16, SensorError>,
    pub temperature: Result<u16, SensorError>,

    // -- Radio --
    /// Poll on which the completion flag appears; `None` never completes.
    pub complete_on_poll: Option<u8>,
    pub radio_configure_error: Option<RadioError>,
    pub radio_sleep_error: Option<RadioError>,
    polls: u8,

    pub wake: WakeReason,
}

pub type Shared = Rc<RefCell<World>>;

#[allow(dead_code)]
impl World {
    pub fn new() -> Shared {
        Rc::new(RefCell::new(Self {
            steps: Vec::new(),
            visible: 0x1234,
            uv: [0x0102, 0x0304, 0x0506, 0x0708],
            light_present: true,
            uv_present: true,
            recovery: Recovery::Clear,
            addressed: None,
            awaiting_address: false,
            uv_pointer: 0,
            rx: VecDeque::new(),
            battery: Ok(600),
            temperature: Ok(512),
            complete_on_poll: Some(1),
            radio_configure_error: None,
            radio_sleep_error: None,
            polls: 0,
            wake: WakeReason::Timer,
        }))
    }

    fn record(&mut self, step: Step) {
        self.steps.push(step);
    }

    fn uv_register(&self, register: u8) -> u16 {
        match register {
            veml6075::REG_UVA => self.uv[0],
            veml6075::REG_UVB => self.uv[1],
            veml6075::REG_COMP1 => self.uv[2],
            veml6075::REG_COMP2 => self.uv[3],
            veml6075::REG_ID => veml6075::DEVICE_ID,
            _ => 0,
        }
    }

    fn on_address(&mut self, address: u8) -> Result<(), BusError> {
        let device = address & !1;
        let present = (device == bh1750::ADDRESS_LOW && self.light_present)
            || (device == veml6075::ADDRESS && self.uv_present);
        if !present {
            self.addressed = None;
            return Err(BusError::Nack(NackStage::Data));
        }
        self.addressed = Some(address);
        self.rx.clear();
        if address == bh1750::ADDRESS_LOW + 1 {
            self.rx.extend(self.visible.to_be_bytes());
        } else if address == veml6075::ADDRESS + 1 {
            let value = self.uv_register(self.uv_pointer);
            self.rx.extend(value.to_le_bytes());
        }
        Ok(())
    }

    pub fn count(&self, pred: impl Fn(&Step) -> bool) -> usize {
        self.steps.iter().filter(|s| pred(s)).count()
    }

    pub fn position(&self, pred: impl Fn(&Step) -> bool) -> Option<usize> {
        self.steps.iter().position(|s| pred(s))
    }

    pub fn transmitted(&self) -> Vec<Vec<u8>> {
        self.steps
            .iter()
            .filter_map(|s| match s {
                Step::RadioTransmit(payload) => Some(payload.clone()),
                _ => None,
            })
            .collect()
    }
}

// ── Bus ───────────────────────────────────────────────────────

pub struct MockBus(pub Shared);

impl TwoWireMaster for MockBus {
    fn initialize(&mut self, clock_hz: u32) {
        self.0.borrow_mut().record(Step::BusInit(clock_hz));
    }

    fn start(&mut self) {
        let mut w = self.0.borrow_mut();
        w.record(Step::BusStart);
        w.awaiting_address = true;
    }

    fn repeated_start(&mut self) {
        let mut w = self.0.borrow_mut();
        w.record(Step::BusRestart);
        w.awaiting_address = true;
    }

    fn stop(&mut self) {
        let mut w = self.0.borrow_mut();
        w.record(Step::BusStop);
        w.addressed = None;
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), BusError> {
        let mut w = self.0.borrow_mut();
        w.record(Step::BusWrite(byte));
        if w.awaiting_address {
            w.awaiting_address = false;
            return w.on_address(byte);
        }
        // First data byte after the UV write address is the register pointer.
        if w.addressed == Some(veml6075::ADDRESS) {
            w.uv_pointer = byte;
            w.addressed = Some(0);
        }
        Ok(())
    }

    fn read_byte(&mut self, ack: bool) -> Result<u8, BusError> {
        let mut w = self.0.borrow_mut();
        w.record(Step::BusRead { ack });
        Ok(w.rx.pop_front().unwrap_or(0xFF))
    }

    fn recover(&mut self) -> Recovery {
        let mut w = self.0.borrow_mut();
        w.record(Step::BusRecover);
        w.recovery
    }

    fn stats(&self) -> BusStats {
        BusStats::default()
    }
}

// ── Analog ────────────────────────────────────────────────────

pub struct MockAnalog(pub Shared);

impl AnalogPort for MockAnalog {
    fn read_battery(&mut self) -> Result<u16, SensorError> {
        let mut w = self.0.borrow_mut();
        w.record(Step::Battery);
        w.battery
    }

    fn read_temperature(&mut self) -> Result<u16, SensorError> {
        let mut w = self.0.borrow_mut();
        w.record(Step::Temperature);
        w.temperature
    }
}

// ── Radio ─────────────────────────────────────────────────────

pub struct MockRadio(pub Shared);

impl RadioLink for MockRadio {
    fn configure(&mut self, frequency_hz: u32, sync_word: u8) -> Result<(), RadioError> {
        let mut w = self.0.borrow_mut();
        w.record(Step::RadioConfigure {
            frequency_hz,
            sync_word,
        });
        w.polls = 0;
        match w.radio_configure_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn clear_flags(&mut self) -> Result<(), RadioError> {
        self.0.borrow_mut().record(Step::RadioClearFlags);
        Ok(())
    }

    fn transmit(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        self.0.borrow_mut().record(Step::RadioTransmit(payload.to_vec()));
        Ok(())
    }

    fn poll_flags(&mut self) -> Result<u8, RadioError> {
        let mut w = self.0.borrow_mut();
        w.record(Step::RadioPoll);
        w.polls += 1;
        Ok(match w.complete_on_poll {
            Some(n) if w.polls >= n => 0x08,
            _ => 0,
        })
    }

    fn sleep(&mut self) -> Result<(), RadioError> {
        let mut w = self.0.borrow_mut();
        w.record(Step::RadioSleep);
        match w.radio_sleep_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

// ── LED pin ───────────────────────────────────────────────────

pub struct MockLed(pub Shared);

impl ErrorType for MockLed {
    type Error = Infallible;
}

impl OutputPin for MockLed {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.borrow_mut().record(Step::Led(false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.borrow_mut().record(Step::Led(true));
        Ok(())
    }
}

// ── Power ─────────────────────────────────────────────────────

pub struct MockPower(pub Shared);

impl PowerPort for MockPower {
    fn enable_peripherals(&mut self) {
        self.0.borrow_mut().record(Step::PeripheralsOn);
    }

    fn disable_peripherals(&mut self) {
        self.0.borrow_mut().record(Step::PeripheralsOff);
    }

    fn park_pins(&mut self) {
        self.0.borrow_mut().record(Step::ParkPins);
    }

    fn sleep(&mut self, duration_ms: u32) -> WakeReason {
        let mut w = self.0.borrow_mut();
        w.record(Step::Sleep(duration_ms));
        w.wake
    }
}

// ── Delay ─────────────────────────────────────────────────────

pub struct MockDelay(pub Shared);

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, _ns: u32) {}

    fn delay_ms(&mut self, ms: u32) {
        self.0.borrow_mut().record(Step::Delay(ms));
    }
}

// ── Assembly ──────────────────────────────────────────────────

pub type MockPorts =
    HardwareAdapter<MockBus, MockAnalog, MockRadio, MockLed, MockPower, MockDelay>;

pub fn ports(world: &Shared) -> MockPorts {
    HardwareAdapter::new(
        MockBus(world.clone()),
        MockAnalog(world.clone()),
        MockRadio(world.clone()),
        MockLed(world.clone()),
        MockPower(world.clone()),
        MockDelay(world.clone()),
    )
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<NodeEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &NodeEvent) {
        self.events.push(*event);
    }
}
