//! Node configuration parameters
//!
//! All tunable parameters for the sensor node. Defaults match the field
//! deployment; a JSON override can be baked in at build time
//! (see `main.rs`). Nothing here is persisted across power loss.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Shortest wait the light sensor needs for a high-resolution conversion.
pub const MIN_LIGHT_CONVERSION_MS: u32 = 180;

/// Core node configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    // --- Two-wire bus ---
    /// Bus clock (Hz)
    pub bus_clock_hz: u32,
    /// Deadline for every bus busy-wait (microseconds)
    pub bus_timeout_us: u32,

    // --- Sensors ---
    /// Light-sensor ADDR strap sampled at startup (true = high address)
    pub light_addr_pin_high: bool,
    /// Wait between triggering the light sensor and reading it (ms)
    pub light_conversion_ms: u32,
    /// UV sensor integration time (ms): 100, 200, 400 or 800
    pub uv_integration_ms: u16,
    /// UV sensor high-dynamic-range bit
    pub uv_high_dynamic: bool,

    // --- Undervoltage lockout ---
    /// Raw battery reading at or above which transmission is allowed
    pub uvlo_threshold_raw: u16,
    /// Number of status-LED pulses signalling a flat battery
    pub fault_pulse_count: u8,
    /// Pulse on-time (ms)
    pub fault_pulse_on_ms: u32,
    /// Pulse off-time (ms)
    pub fault_pulse_off_ms: u32,

    // --- Radio ---
    /// Carrier frequency (Hz)
    pub radio_frequency_hz: u32,
    /// LoRa sync word
    pub radio_sync_word: u8,
    /// Completion-flag polls before giving up
    pub tx_poll_attempts: u8,
    /// Interval between completion-flag polls (ms)
    pub tx_poll_interval_ms: u32,
    /// Settle time after commanding the radio to sleep (ms)
    pub radio_settle_ms: u32,

    // --- Identity ---
    /// Node-type identifier carried in every frame
    pub node_type: u16,
    /// Unique 8-byte node address
    pub node_address: [u8; 8],
    /// Firmware version byte carried in every frame
    pub software_version: u8,

    // --- Duty cycle ---
    /// Hardware wake-timer period (ms)
    pub wake_interval_ms: u32,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // Bus
            bus_clock_hz: 100_000,
            bus_timeout_us: 100, // ~150 polls on a 16 MIPS core

            // Sensors
            light_addr_pin_high: false,
            light_conversion_ms: MIN_LIGHT_CONVERSION_MS,
            uv_integration_ms: 100,
            uv_high_dynamic: false,

            // UVLO: 2100 mV / 4 mV per count, transmit strictly above
            uvlo_threshold_raw: 526,
            fault_pulse_count: 3,
            fault_pulse_on_ms: 300,
            fault_pulse_off_ms: 300,

            // Radio
            radio_frequency_hz: 866_500_000,
            radio_sync_word: 0x55,
            tx_poll_attempts: 50,
            tx_poll_interval_ms: 10,
            radio_settle_ms: 10,

            // Identity
            node_type: 0x0002, // UV / visible light
            node_address: [0x6E, 0xDA, 0x82, 0x33, 0x33, 0x66, 0xF5, 0xE6],
            software_version: 0x05,

            // Duty cycle
            wake_interval_ms: 131_072,
        }
    }
}

impl NodeConfig {
    /// Parse a JSON override. Missing fields keep their defaults.
    pub fn from_json(doc: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(doc).map_err(|_| ConfigError::Malformed)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would break the duty cycle or the sensors.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(10_000..=400_000).contains(&self.bus_clock_hz) {
            return Err(ConfigError::ValidationFailed(
                "bus_clock_hz must be within 10 kHz..=400 kHz",
            ));
        }
        if self.bus_timeout_us == 0 {
            return Err(ConfigError::ValidationFailed("bus_timeout_us must be non-zero"));
        }
        if self.light_conversion_ms < MIN_LIGHT_CONVERSION_MS {
            return Err(ConfigError::ValidationFailed(
                "light_conversion_ms below sensor conversion latency",
            ));
        }
        if !matches!(self.uv_integration_ms, 100 | 200 | 400 | 800) {
            return Err(ConfigError::ValidationFailed(
                "uv_integration_ms must be 100, 200, 400 or 800",
            ));
        }
        if self.tx_poll_attempts == 0 {
            return Err(ConfigError::ValidationFailed("tx_poll_attempts must be non-zero"));
        }
        if self.fault_pulse_count == 0 {
            return Err(ConfigError::ValidationFailed("fault_pulse_count must be non-zero"));
        }
        Ok(())
    }
}
