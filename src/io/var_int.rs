//! Variable-length integer encoding
//!
//! LEB128 (little endian base 128): space-efficient for small values while
//! still covering the full 64-bit range. Length prefixes in the persisted
//! container layouts use this encoding.

use crate::error::{CofferError, Result};
use crate::io::data_input::DataInput;

/// Utility struct for variable-length integer encoding/decoding
pub struct VarInt;

impl VarInt {
    /// Maximum number of bytes needed to encode a u64 as a varint
    pub const MAX_ENCODED_LEN: usize = 10;

    /// Append a u64 value as a variable-length integer to a byte buffer,
    /// returning the number of bytes written
    pub fn write_to_vec(buffer: &mut Vec<u8>, mut value: u64) -> usize {
        let mut bytes_written = 0;
        loop {
            let mut byte = (value & 0x7F) as u8;
            value >>= 7;
            if value != 0 {
                byte |= 0x80; // continuation bit
            }
            buffer.push(byte);
            bytes_written += 1;
            if value == 0 {
                break;
            }
        }
        bytes_written
    }

    /// Encode a u64 value and return the bytes
    pub fn encode(value: u64) -> Vec<u8> {
        let mut buffer = Vec::with_capacity(Self::MAX_ENCODED_LEN);
        Self::write_to_vec(&mut buffer, value);
        buffer
    }

    /// Read a variable-length integer from a DataInput implementation
    pub fn read_from<R: DataInput + ?Sized>(reader: &mut R) -> Result<u64> {
        let mut result = 0u64;
        let mut shift = 0;

        for _ in 0..Self::MAX_ENCODED_LEN {
            let byte = reader.read_u8()?;

            if shift >= 64 {
                return Err(CofferError::invalid_data("varint too long"));
            }
            if shift == 63 && (byte & 0x7E) != 0 {
                return Err(CofferError::invalid_data("varint overflows u64"));
            }

            result |= ((byte & 0x7F) as u64) << shift;

            if (byte & 0x80) == 0 {
                return Ok(result);
            }
            shift += 7;
        }

        Err(CofferError::invalid_data("varint too long"))
    }

    /// Decode a variable-length integer from a byte slice, returning the
    /// value and the number of bytes consumed
    pub fn decode(data: &[u8]) -> Result<(u64, usize)> {
        let mut input = crate::io::data_input::SliceDataInput::new(data);
        let value = Self::read_from(&mut input)?;
        Ok((value, input.pos()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::data_input::SliceDataInput;

    #[test]
    fn test_encode_small_values() {
        assert_eq!(VarInt::encode(0), vec![0]);
        assert_eq!(VarInt::encode(1), vec![1]);
        assert_eq!(VarInt::encode(127), vec![0x7F]);
        assert_eq!(VarInt::encode(128), vec![0x80, 0x01]);
        assert_eq!(VarInt::encode(300), vec![0xAC, 0x02]);
    }

    #[test]
    fn test_round_trip() {
        let values = [
            0u64,
            1,
            127,
            128,
            16_383,
            16_384,
            u32::MAX as u64,
            u64::MAX,
        ];
        for &value in &values {
            let encoded = VarInt::encode(value);
            let (decoded, consumed) = VarInt::decode(&encoded).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(consumed, encoded.len());
        }
    }

    #[test]
    fn test_max_value_length() {
        assert_eq!(VarInt::encode(u64::MAX).len(), VarInt::MAX_ENCODED_LEN);
    }

    #[test]
    fn test_truncated_input() {
        let mut input = SliceDataInput::new(&[0x80]); // continuation with no next byte
        assert!(VarInt::read_from(&mut input).is_err());
    }

    #[test]
    fn test_overlong_input() {
        let bytes = [0xFFu8; 11];
        let mut input = SliceDataInput::new(&bytes);
        assert!(VarInt::read_from(&mut input).is_err());
    }
}
