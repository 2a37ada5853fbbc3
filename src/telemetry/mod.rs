//! Telemetry frame layout and its checksum collaborator.

pub mod checksum;
pub mod frame;

pub use checksum::{Checksum, Crc16Modbus};
pub use frame::{CHECKSUM_SPAN, FRAME_LEN, FrameFields, TelemetryFrame};
