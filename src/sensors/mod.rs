//! Sensor adapters and the [`SensorSet`] the duty cycle drives.
//!
//! The two bus sensors are plain protocol objects: they hold their address
//! and configuration and borrow the bus for each transaction. Analog
//! channels come in through [`AnalogPort`](crate::app::ports::AnalogPort);
//! [`analog`] only holds their unit conversions.

pub mod analog;
pub mod bh1750;
pub mod veml6075;

use crate::config::NodeConfig;
use crate::error::ConfigError;
use bh1750::Bh1750;
use veml6075::{IntegrationTime, Veml6075};

/// Both bus sensors, built once from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorSet {
    pub light: Bh1750,
    pub uv: Veml6075,
}

impl SensorSet {
    pub fn from_config(config: &NodeConfig) -> Result<Self, ConfigError> {
        let it = IntegrationTime::from_ms(config.uv_integration_ms)?;
        Ok(Self {
            light: Bh1750::new(config.light_addr_pin_high),
            uv: Veml6075::new(it, config.uv_high_dynamic),
        })
    }
}
