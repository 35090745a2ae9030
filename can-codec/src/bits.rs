//! Bit-level frame access
//!
//! Reads and writes arbitrary bit ranges within a fixed-size frame buffer,
//! honoring the two DBC byte-order conventions:
//!
//! - Little-endian (Intel): `start_bit` is the LSB position in lsb0
//!   numbering; the signal grows toward higher bit positions and ascending
//!   byte indices.
//! - Big-endian (Motorola): `start_bit` is the MSB position in lsb0
//!   numbering; the signal walks down within a byte, then continues at the
//!   next byte's bit 7 (the DBC sawtooth).
//!
//! Writes clear exactly the target bit range and preserve every other bit,
//! since multiple signals share one buffer within a message.

use crate::schema::ByteOrder;
use crate::types::{CodecError, Result};

/// Read a raw unsigned integer from a bit range of `data`.
pub fn read_bits(data: &[u8], start_bit: u16, length: u16, byte_order: ByteOrder) -> Result<u64> {
    check_range(data.len(), start_bit, length, byte_order)?;

    let mut result: u64 = 0;
    match byte_order {
        ByteOrder::LittleEndian => {
            for i in 0..length as usize {
                let bit_pos = start_bit as usize + i;
                let bit = (data[bit_pos / 8] >> (bit_pos % 8)) & 0x01;
                result |= (bit as u64) << i;
            }
        }
        ByteOrder::BigEndian => {
            let mut byte_idx = start_bit as usize / 8;
            let mut bit_in_byte = start_bit as usize % 8;
            for _ in 0..length {
                let bit = (data[byte_idx] >> bit_in_byte) & 0x01;
                result = (result << 1) | bit as u64;
                if bit_in_byte == 0 {
                    bit_in_byte = 7;
                    byte_idx += 1;
                } else {
                    bit_in_byte -= 1;
                }
            }
        }
    }
    Ok(result)
}

/// Write the low `length` bits of `raw` into a bit range of `data`.
///
/// Bits outside the target range are preserved.
pub fn write_bits(
    data: &mut [u8],
    start_bit: u16,
    length: u16,
    byte_order: ByteOrder,
    raw: u64,
) -> Result<()> {
    check_range(data.len(), start_bit, length, byte_order)?;

    match byte_order {
        ByteOrder::LittleEndian => {
            for i in 0..length as usize {
                let bit_pos = start_bit as usize + i;
                let byte_idx = bit_pos / 8;
                let bit_in_byte = bit_pos % 8;
                let bit = ((raw >> i) & 0x01) as u8;
                data[byte_idx] = (data[byte_idx] & !(1 << bit_in_byte)) | (bit << bit_in_byte);
            }
        }
        ByteOrder::BigEndian => {
            let mut byte_idx = start_bit as usize / 8;
            let mut bit_in_byte = start_bit as usize % 8;
            for i in 0..length as usize {
                // MSB of the raw value lands on start_bit
                let bit = ((raw >> (length as usize - 1 - i)) & 0x01) as u8;
                data[byte_idx] = (data[byte_idx] & !(1 << bit_in_byte)) | (bit << bit_in_byte);
                if bit_in_byte == 0 {
                    bit_in_byte = 7;
                    byte_idx += 1;
                } else {
                    bit_in_byte -= 1;
                }
            }
        }
    }
    Ok(())
}

/// Sign-extend a raw `length`-bit value to a full i64.
pub fn sign_extend(raw: u64, length: u16) -> i64 {
    if length == 0 || length >= 64 {
        return raw as i64;
    }
    let sign_bit = 1u64 << (length - 1);
    if raw & sign_bit != 0 {
        (raw | (!0u64 << length)) as i64
    } else {
        raw as i64
    }
}

/// Validate that a bit range fits the buffer under the given convention.
fn check_range(data_len: usize, start_bit: u16, length: u16, byte_order: ByteOrder) -> Result<()> {
    let capacity_bits = data_len * 8;
    let out_of_range = CodecError::BitRange {
        start_bit,
        length,
        capacity_bits,
    };

    if length == 0 || length > 64 {
        return Err(out_of_range);
    }

    let fits = match byte_order {
        ByteOrder::LittleEndian => start_bit as usize + length as usize <= capacity_bits,
        ByteOrder::BigEndian => {
            // start_bit is the MSB; the sawtooth consumes bit_in_byte + 1
            // bits from the first byte, then whole bytes downward.
            let start_byte = start_bit as usize / 8;
            let available = if start_byte < data_len {
                (start_bit as usize % 8) + 1 + (data_len - start_byte - 1) * 8
            } else {
                0
            };
            length as usize <= available
        }
    };

    if fits {
        Ok(())
    } else {
        Err(out_of_range)
    }
}
