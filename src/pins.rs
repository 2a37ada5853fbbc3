//! GPIO / peripheral pin assignments for the sensor node board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers. `main` has to name HAL pins by number
//! (`pins.gpioN`); each of those carries the constant it stands for, and
//! `board_wiring_matches_main` below fails if one moves without the other.

// ---------------------------------------------------------------------------
// Two-wire sensor bus (BH1750 + VEML6075), open-drain with external pull-ups
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 14;
pub const I2C_SCL_GPIO: i32 = 15;

// ---------------------------------------------------------------------------
// Analog (ADC1)
// ---------------------------------------------------------------------------

/// Battery through a 1:4 divider. ADC1 channel 4 (GPIO 5 on ESP32-S3).
pub const BATTERY_ADC_GPIO: i32 = 5;
/// 10 kOhm NTC divider from the switched supply. ADC1 channel 8 (GPIO 9).
pub const TEMP_ADC_GPIO: i32 = 9;

// ---------------------------------------------------------------------------
// Radio module (SX127x on SPI2)
// ---------------------------------------------------------------------------

pub const RADIO_SCK_GPIO: i32 = 4;
pub const RADIO_MOSI_GPIO: i32 = 6;
pub const RADIO_MISO_GPIO: i32 = 7;
/// Chip select, active low.
pub const RADIO_NSS_GPIO: i32 = 8;
/// Module reset, active low. Left floating while asleep.
pub const RADIO_RESET_GPIO: i32 = 3;

// ---------------------------------------------------------------------------
// Power and indication
// ---------------------------------------------------------------------------

/// P-channel switch feeding sensors and the NTC divider. LOW = on.
pub const PERIPH_ENABLE_GPIO: i32 = 1;
/// Red status LED, active high.
pub const STATUS_LED_GPIO: i32 = 2;

// ---------------------------------------------------------------------------
// Sleep parking
// ---------------------------------------------------------------------------

/// Outputs driven low before sleep. The SPI lines stay with the SPI
/// driver, which idles them with chip select high.
pub const PARK_LOW: [i32; 1] = [STATUS_LED_GPIO];
/// Outputs held high before sleep (inactive level).
pub const PARK_HIGH: [i32; 1] = [PERIPH_ENABLE_GPIO];
/// Lines released to high impedance before sleep: the bus lines (pulled up
/// by a rail that is about to go dark) and the radio reset.
pub const PARK_FLOATING: [i32; 3] = [I2C_SDA_GPIO, I2C_SCL_GPIO, RADIO_RESET_GPIO];
