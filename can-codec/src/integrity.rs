//! Checksum and rolling-counter arithmetic
//!
//! Checksum formulas vary by manufacturer convention, so the algorithm is a
//! per-message parameter ([`ChecksumKind`]) selected in the DBC via the
//! `BA_ "ChecksumKind"` attribute. All algorithms run over every frame byte
//! except the byte holding the checksum signal itself.

use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Checksum algorithm applied to a message's frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChecksumKind {
    /// XOR-fold of all covered bytes.
    Xor,
    /// Additive sum (mod 256) of all covered bytes.
    Sum,
    /// CRC-8H2F (AUTOSAR): poly 0x2F, init 0xFF, final XOR 0xFF.
    Crc8Autosar,
}

impl ChecksumKind {
    /// Map a `BA_ "ChecksumKind"` attribute value to an algorithm.
    pub fn from_attribute(value: &str) -> Option<Self> {
        match value {
            "xor" => Some(ChecksumKind::Xor),
            "sum" => Some(ChecksumKind::Sum),
            "crc8_h2f" => Some(ChecksumKind::Crc8Autosar),
            _ => None,
        }
    }
}

/// Compute the checksum of `data` with the byte at `checksum_byte` excluded.
pub fn compute_checksum(kind: ChecksumKind, data: &[u8], checksum_byte: usize) -> u8 {
    let covered = data
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != checksum_byte)
        .map(|(_, b)| *b);

    match kind {
        ChecksumKind::Xor => covered.fold(0u8, |acc, b| acc ^ b),
        ChecksumKind::Sum => covered.fold(0u8, |acc, b| acc.wrapping_add(b)),
        ChecksumKind::Crc8Autosar => {
            let table = crc8_h2f_table();
            let mut crc = 0xFFu8;
            for b in covered {
                crc ^= b;
                crc = table[crc as usize];
            }
            crc ^ 0xFF
        }
    }
}

/// Advance a rolling counter of `length` bits by one, wrapping at its width.
pub fn next_counter(prev: u64, length: u16) -> u64 {
    debug_assert!(length >= 1 && length <= 8);
    (prev + 1) & ((1u64 << length) - 1)
}

/// Lookup table for CRC-8H2F, built on first use.
fn crc8_h2f_table() -> &'static [u8; 256] {
    static TABLE: OnceLock<[u8; 256]> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = [0u8; 256];
        for (i, entry) in table.iter_mut().enumerate() {
            let mut crc = i as u8;
            for _ in 0..8 {
                crc = if crc & 0x80 != 0 {
                    (crc << 1) ^ 0x2F
                } else {
                    crc << 1
                };
            }
            *entry = crc;
        }
        table
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xor_skips_checksum_byte() {
        let data = [0xAA, 0x01, 0x02, 0x03];
        // byte 0 excluded: 0x01 ^ 0x02 ^ 0x03 = 0x00
        assert_eq!(compute_checksum(ChecksumKind::Xor, &data, 0), 0x00);
        // byte 3 excluded: 0xAA ^ 0x01 ^ 0x02 = 0xA9
        assert_eq!(compute_checksum(ChecksumKind::Xor, &data, 3), 0xA9);
    }

    #[test]
    fn test_sum_wraps() {
        let data = [0x00, 0xFF, 0xFF, 0x04];
        assert_eq!(compute_checksum(ChecksumKind::Sum, &data, 0), 0x02);
    }

    #[test]
    fn test_crc8_h2f_known_vector() {
        // CRC-8H2F check value for "123456789" is 0xDF
        let data: Vec<u8> = std::iter::once(0u8)
            .chain(b"123456789".iter().copied())
            .collect();
        assert_eq!(compute_checksum(ChecksumKind::Crc8Autosar, &data, 0), 0xDF);
    }

    #[test]
    fn test_crc8_detects_single_byte_corruption() {
        let mut data = [0xAA, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77];
        let good = compute_checksum(ChecksumKind::Crc8Autosar, &data, 0);
        data[4] ^= 0x01;
        let bad = compute_checksum(ChecksumKind::Crc8Autosar, &data, 0);
        assert_ne!(good, bad);
    }

    #[test]
    fn test_counter_wraps_at_width() {
        assert_eq!(next_counter(0, 4), 1);
        assert_eq!(next_counter(14, 4), 15);
        assert_eq!(next_counter(15, 4), 0);
        assert_eq!(next_counter(255, 8), 0);
        assert_eq!(next_counter(1, 2), 2);
        assert_eq!(next_counter(3, 2), 0);
    }

    #[test]
    fn test_attribute_names() {
        assert_eq!(ChecksumKind::from_attribute("xor"), Some(ChecksumKind::Xor));
        assert_eq!(ChecksumKind::from_attribute("sum"), Some(ChecksumKind::Sum));
        assert_eq!(
            ChecksumKind::from_attribute("crc8_h2f"),
            Some(ChecksumKind::Crc8Autosar)
        );
        assert_eq!(ChecksumKind::from_attribute("crc16"), None);
    }
}
