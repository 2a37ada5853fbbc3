//! UVNode firmware entry point.
//!
//! Wires the concrete drivers behind the port traits and hands control to
//! the duty-cycle service, which never returns.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  BusTransport      EspAnalog      Sx127x        EspPower       │
//! │  (TwoWireMaster)   (AnalogPort)   (RadioLink)   (PowerPort)    │
//! │  MonotonicClock    StatusLed      LogEventSink                 │
//! │  (Clock)           (LED)          (EventSink)                  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │           DutyCycleService (pure logic)                │    │
//! │  │  FSM · Acquisition · Telemetry frame · UVLO gate       │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_hal::delay::{Ets, FreeRtos};
use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::spi::{SpiDeviceDriver, SpiDriverConfig, config::Config as SpiConfig};
use esp_idf_hal::units::FromValueType;
use log::{info, warn};

use uvnode::adapters::hardware::{EspAnalog, EspPower, HardwareAdapter};
use uvnode::adapters::log_sink::LogEventSink;
use uvnode::adapters::time::MonotonicClock;
use uvnode::app::service::DutyCycleService;
use uvnode::config::NodeConfig;
use uvnode::drivers::bitbang::BitBangController;
use uvnode::drivers::bus::BusTransport;
use uvnode::drivers::hw_init;
use uvnode::drivers::sx127x::Sx127x;
use uvnode::error::Error;

/// Radio SPI clock.
const RADIO_SPI_HZ: u32 = 1_000_000;

/// Build-time override, e.g. `UVNODE_CONFIG_JSON='{"node_type":4}'`.
fn load_config() -> NodeConfig {
    let Some(doc) = option_env!("UVNODE_CONFIG_JSON") else {
        info!("Config: built-in defaults");
        return NodeConfig::default();
    };
    match NodeConfig::from_json(doc) {
        Ok(cfg) => {
            info!("Config: build-time override applied");
            cfg
        }
        Err(e) => {
            warn!("Config override rejected ({}), using defaults", e);
            NodeConfig::default()
        }
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  UVNode v{}                          ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Analog inputs + peripheral power switch ────────────
    if let Err(e) = hw_init::init_peripherals() {
        // Without the ADC the undervoltage gate cannot run.
        log::error!("HAL init failed: {}, halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }

    let config = load_config();
    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;

    // ── 3. Two-wire bus (bit-banged, open drain) ──────────────
    let sda = PinDriver::input_output_od(pins.gpio14)?; // pins::I2C_SDA_GPIO
    let scl = PinDriver::input_output_od(pins.gpio15)?; // pins::I2C_SCL_GPIO
    let bus = BusTransport::new(
        BitBangController::new(sda, scl, Ets),
        MonotonicClock::new(),
        FreeRtos,
        config.bus_timeout_us,
    );

    // ── 4. Radio ──────────────────────────────────────────────
    let spi = SpiDeviceDriver::new_single(
        peripherals.spi2,
        pins.gpio4,       // pins::RADIO_SCK_GPIO
        pins.gpio6,       // pins::RADIO_MOSI_GPIO
        Some(pins.gpio7), // pins::RADIO_MISO_GPIO
        Some(pins.gpio8), // pins::RADIO_NSS_GPIO
        &SpiDriverConfig::new(),
        &SpiConfig::new().baudrate(RADIO_SPI_HZ.Hz()),
    )?;
    let radio_reset = PinDriver::output(pins.gpio3)?; // pins::RADIO_RESET_GPIO
    let radio = Sx127x::new(spi, radio_reset, FreeRtos);

    // ── 5. Ports + service ────────────────────────────────────
    let led = PinDriver::output(pins.gpio2)?; // pins::STATUS_LED_GPIO
    let mut ports = HardwareAdapter::new(bus, EspAnalog, radio, led, EspPower, FreeRtos);
    let mut log_sink = LogEventSink::new();

    let mut service = DutyCycleService::new(config).map_err(Error::from)?;
    service.start(&mut ports, &mut log_sink);

    info!("Node ready. Entering duty cycle.");
    service.run_forever(&mut ports, &mut log_sink)
}
