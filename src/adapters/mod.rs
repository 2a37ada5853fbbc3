//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to               |
//! |----------------|--------------------|---------------------------|
//! | `hardware`     | NodePorts          | Port bundle for one board |
//! |                | AnalogPort         | ESP32 ADC1 oneshot        |
//! |                | PowerPort          | Supply switch, light sleep|
//! | `log_sink`     | EventSink          | Serial log output         |
//! | `time`         | Clock              | ESP32 high-res timer      |
//!
//! The bus transport and radio drivers live in [`crate::drivers`] and
//! implement their ports directly.

pub mod hardware;
pub mod log_sink;
pub mod time;
