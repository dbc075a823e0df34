//! Report deobfuscation used by older sensor firmware.
//!
//! The device scrambles each report with the magic table sent during the
//! handshake. Newer firmware sends plaintext; the `-n` flag skips this step.

use super::{frame::RawFrame, handshake::MagicTable};

const KEY_WORD: &[u8; 8] = b"Htemp99e";

/// Recover the plaintext frame from a scrambled report.
pub fn deobfuscate(report: &RawFrame, table: &MagicTable) -> RawFrame {
    let mut buf = *report;
    buf.swap(0, 2);
    buf.swap(1, 4);
    buf.swap(3, 7);
    buf.swap(5, 6);

    for (byte, key) in buf.iter_mut().zip(table.as_bytes()) {
        *byte ^= key;
    }

    let rotated = u64::from_be_bytes(buf).rotate_right(3).to_be_bytes();

    let mut out = [0u8; 8];
    for (i, byte) in out.iter_mut().enumerate() {
        let c = KEY_WORD[i];
        *byte = rotated[i].wrapping_sub((c << 4) | (c >> 4));
    }
    out
}

/// Inverse of [`deobfuscate`]; used to build scrambled fixtures.
pub fn obfuscate(frame: &RawFrame, table: &MagicTable) -> RawFrame {
    let mut rotated = [0u8; 8];
    for (i, byte) in rotated.iter_mut().enumerate() {
        let c = KEY_WORD[i];
        *byte = frame[i].wrapping_add((c << 4) | (c >> 4));
    }

    let mut buf = u64::from_be_bytes(rotated).rotate_left(3).to_be_bytes();

    for (byte, key) in buf.iter_mut().zip(table.as_bytes()) {
        *byte ^= key;
    }

    buf.swap(5, 6);
    buf.swap(3, 7);
    buf.swap(1, 4);
    buf.swap(0, 2);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrambled_report_recovers_plaintext() {
        let table = MagicTable::default();
        let plain = [0x42, 0x12, 0x84, 0xd8, 0x0d, 0x00, 0x00, 0x00];
        let scrambled = obfuscate(&plain, &table);
        assert_ne!(scrambled, plain);
        assert_eq!(deobfuscate(&scrambled, &table), plain);
    }

    #[test]
    fn test_magic_table_participates() {
        let plain = [0x50, 0x01, 0x90, 0xe1, 0x0d, 0x00, 0x00, 0x00];
        let zero = MagicTable::default();
        let keyed = MagicTable::from_bytes([1, 2, 3, 4, 5, 6, 7, 8]);
        let scrambled = obfuscate(&plain, &keyed);
        assert_eq!(deobfuscate(&scrambled, &keyed), plain);
        assert_ne!(deobfuscate(&scrambled, &zero), plain);
    }

    #[test]
    fn test_zero_report_leaves_only_key_word() {
        let table = MagicTable::default();
        let out = deobfuscate(&[0u8; 8], &table);
        let expected: Vec<u8> = KEY_WORD
            .iter()
            .map(|c| 0u8.wrapping_sub((c << 4) | (c >> 4)))
            .collect();
        assert_eq!(out.to_vec(), expected);
    }
}
