//! Conversions for the two analog channels.
//!
//! Both channels are 10-bit. The battery is read through a 1:4 divider
//! against the internal 1.024 V reference, so one count is 4 mV. The
//! temperature channel is a 10 kOhm / B3950 NTC on the low side of a
//! divider from the supply rail and is converted ratiometrically.

pub const ADC_MAX: u16 = 1023;
/// Millivolts of battery per count.
pub const BATTERY_MV_PER_COUNT: u16 = 4;

const R25: f32 = 10_000.0;
const BETA: f32 = 3950.0;
const T25_K: f32 = 298.15;
const R_DIVIDER: f32 = 10_000.0;
/// Reported for a shorted or open thermistor.
pub const NTC_FAULT_C: f32 = -40.0;

pub fn battery_millivolts(raw: u16) -> u16 {
    raw.min(ADC_MAX) * BATTERY_MV_PER_COUNT
}

/// Raw battery count corresponding to `millivolts` (rounded down).
pub fn battery_raw_for_millivolts(millivolts: u16) -> u16 {
    (millivolts / BATTERY_MV_PER_COUNT).min(ADC_MAX)
}

pub fn temperature_celsius(raw: u16) -> f32 {
    let raw = raw.min(ADC_MAX);
    if raw == 0 || raw == ADC_MAX {
        return NTC_FAULT_C;
    }
    let ratio = f32::from(raw) / f32::from(ADC_MAX);
    let r_ntc = R_DIVIDER * ratio / (1.0 - ratio);
    let inv_t = (1.0 / T25_K) + (1.0 / BETA) * (r_ntc / R25).ln();
    if inv_t <= 0.0 {
        return NTC_FAULT_C;
    }
    (1.0 / inv_t) - 273.15
}
