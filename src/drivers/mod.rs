//! Bus, radio and indicator drivers, plus hardware initialisation.

pub mod bitbang;
pub mod bus;
pub mod bus_controller;
pub mod hw_init;
pub mod status_led;
pub mod sx127x;
