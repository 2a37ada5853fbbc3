//! One-shot hardware peripheral initialization and the raw register-level
//! helpers the hardware adapters call.
//!
//! Configures ADC channels and GPIO directions using raw ESP-IDF sys calls,
//! and wraps light sleep. Off-target, every helper is a simulation stub:
//! analog values come from atomics that tests can inject.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicBool, AtomicU16, AtomicU32, Ordering};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;

// ── Error type ────────────────────────────────────────────────

/// Errors during one-shot peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

pub const ADC1_CH_BATTERY: u32 = 4;
pub const ADC1_CH_TEMP: u32 = 8;

/// Nominal full scale of the 0 dB attenuation range.
pub const ADC_DB0_FULL_SCALE_MV: u32 = 950;

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before the duty cycle starts; single-threaded.
    unsafe {
        init_adc()?;
        init_gpio_outputs()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: Must be called only from the single-threaded init path or the
/// duty-cycle read path.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 { return Err(HwInitError::AdcInitFailed(ret)); }

    // Battery divider sits below 1 V: use the narrow range.
    let battery_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_0,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), ADC1_CH_BATTERY, &battery_cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::AdcInitFailed(ret)); }

    let temp_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), ADC1_CH_TEMP, &temp_cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::AdcInitFailed(ret)); }

    info!("hw_init: ADC1 configured (CH4=battery, CH8=NTC)");
    Ok(())
}

/// One 12-bit conversion; `None` if the driver reports an error.
#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> Option<u16> {
    let mut raw: i32 = 0;
    // SAFETY: adc1_handle() contract, single-threaded duty-cycle access only.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return None;
    }
    Some(raw.clamp(0, 4095) as u16)
}

/// Release the ADC1 oneshot unit so it draws nothing while asleep.
#[cfg(target_os = "espidf")]
pub fn adc1_power_down() {
    // SAFETY: adc1_handle() contract; the handle is cleared before reuse.
    unsafe {
        let handle = adc1_handle();
        if handle.is_null() {
            return;
        }
        let ret = adc_oneshot_del_unit(handle);
        if ret != ESP_OK as i32 {
            log::warn!("hw_init: ADC1 release failed (rc={})", ret);
        }
        ADC1_HANDLE = core::ptr::null_mut();
    }
}

/// Bring ADC1 back after [`adc1_power_down`]. No-op if it is already up.
#[cfg(target_os = "espidf")]
pub fn adc1_power_up() -> Result<(), HwInitError> {
    // SAFETY: adc1_handle() contract, single-threaded duty-cycle access only.
    unsafe {
        if !adc1_handle().is_null() {
            return Ok(());
        }
        init_adc()
    }
}

#[cfg(not(target_os = "espidf"))]
static SIM_BATTERY_RAW: AtomicU16 = AtomicU16::new(2048);
#[cfg(not(target_os = "espidf"))]
static SIM_TEMP_RAW: AtomicU16 = AtomicU16::new(2048);
#[cfg(not(target_os = "espidf"))]
static SIM_ADC_FAIL: AtomicBool = AtomicBool::new(false);

#[cfg(not(target_os = "espidf"))]
static SIM_ADC_POWERED: AtomicBool = AtomicBool::new(true);

#[cfg(not(target_os = "espidf"))]
pub fn adc1_power_down() {
    SIM_ADC_POWERED.store(false, Ordering::Relaxed);
}

#[cfg(not(target_os = "espidf"))]
pub fn adc1_power_up() -> Result<(), HwInitError> {
    SIM_ADC_POWERED.store(true, Ordering::Relaxed);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_adc_powered() -> bool {
    SIM_ADC_POWERED.load(Ordering::Relaxed)
}

/// Inject 12-bit conversion results for the simulated ADC.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_adc(battery_raw12: u16, temp_raw12: u16) {
    SIM_BATTERY_RAW.store(battery_raw12, Ordering::Relaxed);
    SIM_TEMP_RAW.store(temp_raw12, Ordering::Relaxed);
}

#[cfg(not(target_os = "espidf"))]
pub fn sim_set_adc_failure(fail: bool) {
    SIM_ADC_FAIL.store(fail, Ordering::Relaxed);
}

#[cfg(not(target_os = "espidf"))]
pub fn adc1_read(channel: u32) -> Option<u16> {
    if SIM_ADC_FAIL.load(Ordering::Relaxed) {
        return None;
    }
    match channel {
        ADC1_CH_BATTERY => Some(SIM_BATTERY_RAW.load(Ordering::Relaxed)),
        ADC1_CH_TEMP => Some(SIM_TEMP_RAW.load(Ordering::Relaxed)),
        _ => None,
    }
}

// ── GPIO ──────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::PERIPH_ENABLE_GPIO,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 { return Err(HwInitError::GpioConfigFailed(ret)); }
    // Supply off until the first cycle asks for it.
    unsafe { gpio_set_level(pins::PERIPH_ENABLE_GPIO, 1) };

    info!("hw_init: GPIO outputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin.
    unsafe { gpio_set_level(pin, u32::from(high)); }
}

#[cfg(not(target_os = "espidf"))]
static SIM_GPIO_LEVELS: AtomicU32 = AtomicU32::new(0);

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(pin: i32, high: bool) {
    let bit = 1u32 << (pin as u32 & 31);
    if high {
        SIM_GPIO_LEVELS.fetch_or(bit, Ordering::Relaxed);
    } else {
        SIM_GPIO_LEVELS.fetch_and(!bit, Ordering::Relaxed);
    }
}

/// Last level written to `pin` in simulation.
#[cfg(not(target_os = "espidf"))]
pub fn sim_gpio_level(pin: i32) -> bool {
    SIM_GPIO_LEVELS.load(Ordering::Relaxed) & (1u32 << (pin as u32 & 31)) != 0
}

/// Drive every pin to its sleep state: outputs low or high as listed in
/// [`pins`], bus lines and radio reset floating with pulls disabled.
#[cfg(target_os = "espidf")]
pub fn park_pins() {
    // SAFETY: plain register writes on pins this firmware owns; the duty
    // cycle is the only caller and runs single-threaded.
    unsafe {
        for &pin in &pins::PARK_LOW {
            gpio_set_direction(pin, gpio_mode_t_GPIO_MODE_OUTPUT);
            gpio_set_level(pin, 0);
        }
        for &pin in &pins::PARK_HIGH {
            gpio_set_direction(pin, gpio_mode_t_GPIO_MODE_OUTPUT);
            gpio_set_level(pin, 1);
        }
        for &pin in &pins::PARK_FLOATING {
            gpio_set_direction(pin, gpio_mode_t_GPIO_MODE_INPUT);
            gpio_set_pull_mode(pin, gpio_pull_mode_t_GPIO_FLOATING);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn park_pins() {
    for &pin in &crate::pins::PARK_LOW {
        gpio_write(pin, false);
    }
    for &pin in &crate::pins::PARK_HIGH {
        gpio_write(pin, true);
    }
}

/// Undo [`park_pins`] for the lines the duty cycle drives as plain GPIO:
/// bus lines back to open-drain released high, radio reset deasserted.
#[cfg(target_os = "espidf")]
pub fn restore_pins() {
    // SAFETY: see park_pins.
    unsafe {
        for &pin in &[pins::I2C_SDA_GPIO, pins::I2C_SCL_GPIO] {
            gpio_set_direction(pin, gpio_mode_t_GPIO_MODE_INPUT_OUTPUT_OD);
            gpio_set_level(pin, 1);
        }
        gpio_set_direction(pins::RADIO_RESET_GPIO, gpio_mode_t_GPIO_MODE_OUTPUT);
        gpio_set_level(pins::RADIO_RESET_GPIO, 1);
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn restore_pins() {
    gpio_write(crate::pins::RADIO_RESET_GPIO, true);
}

// ── Sleep ─────────────────────────────────────────────────────

/// Light sleep on the RTC timer. Returns `true` if the timer woke us.
/// RAM is retained, so the message counter and frame buffer survive.
#[cfg(target_os = "espidf")]
pub fn light_sleep(duration_ms: u32) -> bool {
    // SAFETY: plain ESP-IDF sleep API calls from the single duty-cycle task.
    unsafe {
        esp_sleep_enable_timer_wakeup(u64::from(duration_ms) * 1_000);
        if esp_light_sleep_start() != ESP_OK as i32 {
            return false;
        }
        esp_sleep_get_wakeup_cause() == esp_sleep_source_t_ESP_SLEEP_WAKEUP_TIMER
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn light_sleep(duration_ms: u32) -> bool {
    log::debug!("hw_init(sim): sleep {} ms skipped", duration_ms);
    true
}
