//! Application core: pure domain logic, zero I/O.
//!
//! This module contains the duty-cycle rules for the sensor node. All
//! interaction with hardware happens through **port traits** defined in
//! [`ports`], keeping this layer fully testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
