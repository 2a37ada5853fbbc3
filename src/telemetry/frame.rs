//! Fixed 50-byte telemetry frame.
//!
//! ```text
//!  0      1..2      3..10     11   12..15   16..17 18..19 20..23
//! ┌────┬─────────┬─────────┬────┬────────┬──────┬──────┬──────┐
//! │ 50 │ nodeType│ address │ ver│ counter│ batt │ temp │ 0000 │
//! └────┴─────────┴─────────┴────┴────────┴──────┴──────┴──────┘
//!  24..25 26..27 28..29 30..31 32..33  34..47   48    49
//! ┌──────┬──────┬──────┬──────┬───────┬───────┬─────┬─────┐
//! │ uva  │ uvb  │ comp1│ comp2│visible│  0…0  │ crcL│ crcH│
//! └──────┴──────┴──────┴──────┴───────┴───────┴─────┴─────┘
//! ```
//!
//! Every multi-byte field is big-endian except the checksum, which is
//! stored low byte first. The checksum covers bytes `[0, 48)`.

use super::checksum::Checksum;
use crate::error::FrameError;

pub const FRAME_LEN: usize = 50;
/// Bytes covered by the checksum.
pub const CHECKSUM_SPAN: usize = 48;

const NODE_TYPE: usize = 1;
const ADDRESS: usize = 3;
const VERSION: usize = 11;
const COUNTER: usize = 12;
const BATTERY: usize = 16;
const TEMPERATURE: usize = 18;
const UVA: usize = 24;
const UVB: usize = 26;
const COMP1: usize = 28;
const COMP2: usize = 30;
const VISIBLE: usize = 32;

/// Decoded content of one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameFields {
    pub node_type: u16,
    pub address: [u8; 8],
    pub version: u8,
    pub counter: u32,
    pub battery: u16,
    pub temperature: u16,
    pub uva: u16,
    pub uvb: u16,
    pub comp1: u16,
    pub comp2: u16,
    pub visible: u16,
}

/// One frame buffer, overwritten in place every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryFrame {
    bytes: [u8; FRAME_LEN],
}

impl Default for TelemetryFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryFrame {
    pub const fn new() -> Self {
        Self {
            bytes: [0; FRAME_LEN],
        }
    }

    /// Serialize `fields` over the whole buffer and append the checksum.
    /// Reserved bytes are zeroed on every call.
    pub fn encode<C: Checksum + ?Sized>(&mut self, fields: &FrameFields, checksum: &C) {
        self.bytes = [0; FRAME_LEN];
        self.bytes[0] = FRAME_LEN as u8;
        self.put_u16(NODE_TYPE, fields.node_type);
        self.bytes[ADDRESS..ADDRESS + 8].copy_from_slice(&fields.address);
        self.bytes[VERSION] = fields.version;
        self.bytes[COUNTER..COUNTER + 4].copy_from_slice(&fields.counter.to_be_bytes());
        self.put_u16(BATTERY, fields.battery);
        self.put_u16(TEMPERATURE, fields.temperature);
        self.put_u16(UVA, fields.uva);
        self.put_u16(UVB, fields.uvb);
        self.put_u16(COMP1, fields.comp1);
        self.put_u16(COMP2, fields.comp2);
        self.put_u16(VISIBLE, fields.visible);

        let sum = checksum.checksum(&self.bytes[..CHECKSUM_SPAN]);
        self.bytes[CHECKSUM_SPAN..].copy_from_slice(&sum.to_le_bytes());
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.bytes
    }

    /// Checksum as stored in the last two bytes.
    pub fn stored_checksum(&self) -> u16 {
        u16::from_le_bytes([self.bytes[CHECKSUM_SPAN], self.bytes[CHECKSUM_SPAN + 1]])
    }

    /// Recompute the checksum and compare it with the stored one.
    pub fn verify<C: Checksum + ?Sized>(&self, checksum: &C) -> Result<(), FrameError> {
        check(&self.bytes, checksum)
    }

    /// Validate a received frame and decode its fields.
    pub fn parse<C: Checksum + ?Sized>(
        bytes: &[u8],
        checksum: &C,
    ) -> Result<FrameFields, FrameError> {
        let bytes: &[u8; FRAME_LEN] = bytes
            .try_into()
            .map_err(|_| FrameError::Size(bytes.len()))?;
        if usize::from(bytes[0]) != FRAME_LEN {
            return Err(FrameError::LengthByte(bytes[0]));
        }
        check(bytes, checksum)?;

        let u16_at = |i: usize| u16::from_be_bytes([bytes[i], bytes[i + 1]]);
        let mut address = [0u8; 8];
        address.copy_from_slice(&bytes[ADDRESS..ADDRESS + 8]);
        Ok(FrameFields {
            node_type: u16_at(NODE_TYPE),
            address,
            version: bytes[VERSION],
            counter: u32::from_be_bytes([
                bytes[COUNTER],
                bytes[COUNTER + 1],
                bytes[COUNTER + 2],
                bytes[COUNTER + 3],
            ]),
            battery: u16_at(BATTERY),
            temperature: u16_at(TEMPERATURE),
            uva: u16_at(UVA),
            uvb: u16_at(UVB),
            comp1: u16_at(COMP1),
            comp2: u16_at(COMP2),
            visible: u16_at(VISIBLE),
        })
    }

    fn put_u16(&mut self, offset: usize, value: u16) {
        self.bytes[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
    }
}

fn check<C: Checksum + ?Sized>(bytes: &[u8; FRAME_LEN], checksum: &C) -> Result<(), FrameError> {
    let expected = checksum.checksum(&bytes[..CHECKSUM_SPAN]);
    let found = u16::from_le_bytes([bytes[CHECKSUM_SPAN], bytes[CHECKSUM_SPAN + 1]]);
    if expected == found {
        Ok(())
    } else {
        Err(FrameError::Checksum { expected, found })
    }
}
