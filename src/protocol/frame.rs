//! Structural validation of sensor reports.
//!
//! A report is eight bytes. After deobfuscation the first five carry the
//! payload: `[code, high, low, checksum, 0x0d, ..]`. The trailing three bytes
//! are padding and are never inspected.

/// Length of one report as delivered by the device.
pub const FRAME_LEN: usize = 8;

/// Fixed sentinel expected at byte 4 of every well-formed frame.
pub const FRAME_TERMINATOR: u8 = 0x0d;

/// One raw report read from the device.
pub type RawFrame = [u8; FRAME_LEN];

/// Decoded structural view of a valid frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFields {
    /// Identifies the measurement kind.
    pub code: u8,
    /// Big-endian 16-bit payload word built from bytes 1 and 2.
    pub value: u16,
}

/// Reasons a frame is rejected before decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum FrameError {
    #[display("truncated frame ({len} bytes, expected 8)")]
    Truncated { len: usize },
    #[display("unexpected data from device (data[4] = {found:02x}, await 0d)")]
    BadTerminator { found: u8 },
    #[display("checksum error ({expected:02x}, await {found:02x})")]
    ChecksumMismatch { expected: u8, found: u8 },
}

/// Validate a report and extract its `(code, value)` pair.
///
/// The terminator is checked before the checksum, so a frame failing both
/// reports `BadTerminator`.
pub fn validate(raw: &[u8]) -> Result<FrameFields, FrameError> {
    if raw.len() < FRAME_LEN {
        return Err(FrameError::Truncated { len: raw.len() });
    }

    if raw[4] != FRAME_TERMINATOR {
        return Err(FrameError::BadTerminator { found: raw[4] });
    }

    let expected = checksum(raw[0], raw[1], raw[2]);
    if expected != raw[3] {
        return Err(FrameError::ChecksumMismatch {
            expected,
            found: raw[3],
        });
    }

    Ok(FrameFields {
        code: raw[0],
        value: u16::from_be_bytes([raw[1], raw[2]]),
    })
}

/// Sum of the three payload bytes modulo 256.
pub fn checksum(code: u8, high: u8, low: u8) -> u8 {
    code.wrapping_add(high).wrapping_add(low)
}
