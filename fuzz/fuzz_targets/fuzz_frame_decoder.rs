//! Fuzz target: `TelemetryFrame::parse`
//!
//! Drives arbitrary byte sequences into the frame parser and asserts that
//! it never panics and that anything it accepts re-encodes to a frame that
//! verifies and decodes to the same fields.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use uvnode::telemetry::{Crc16Modbus, FRAME_LEN, TelemetryFrame};

fuzz_target!(|data: &[u8]| {
    let Ok(fields) = TelemetryFrame::parse(data, &Crc16Modbus) else {
        return;
    };
    assert_eq!(data.len(), FRAME_LEN, "parser accepted a short or long frame");

    let mut frame = TelemetryFrame::new();
    frame.encode(&fields, &Crc16Modbus);
    assert!(frame.verify(&Crc16Modbus).is_ok());

    // Reserved bytes are not decoded, so only the populated fields must match.
    assert_eq!(TelemetryFrame::parse(frame.as_bytes(), &Crc16Modbus), Ok(fields));
});
