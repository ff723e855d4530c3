//! Data input abstractions and implementations
//!
//! Traits and implementations for reading structured data from byte slices
//! and `std::io::Read` sources. The persisted container layouts (see the
//! `dump`/`restore` methods on each container) are read through these.

use std::io::Read;

use crate::error::{CofferError, Result};
use crate::io::var_int::VarInt;

/// Chunk size for reading length-prefixed data from sources of unknown size
const READ_CHUNK: usize = 64 * 1024;

/// Trait for reading structured data from various sources
pub trait DataInput {
    /// Read a single byte
    fn read_u8(&mut self) -> Result<u8>;

    /// Read a 16-bit unsigned integer in little-endian format
    fn read_u16(&mut self) -> Result<u16>;

    /// Read a 32-bit unsigned integer in little-endian format
    fn read_u32(&mut self) -> Result<u32>;

    /// Read a 64-bit unsigned integer in little-endian format
    fn read_u64(&mut self) -> Result<u64>;

    /// Read a variable-length encoded integer
    fn read_var_int(&mut self) -> Result<u64>
    where
        Self: Sized,
    {
        VarInt::read_from(self)
    }

    /// Read exact number of bytes into the provided buffer
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()>;

    /// Read a vector of bytes with the specified length
    fn read_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.read_bytes(&mut buf)?;
        Ok(buf)
    }

    /// Read a length-prefixed byte vector (length as varint).
    ///
    /// The decoded length is validated against the remaining input before
    /// any allocation, so a corrupt prefix fails with an invalid-data error
    /// instead of an oversized allocation. Sources of unknown size are read
    /// in bounded chunks.
    fn read_length_prefixed_bytes(&mut self) -> Result<Vec<u8>>
    where
        Self: Sized,
    {
        let len = self.read_var_int()?;
        if len > usize::MAX as u64 {
            return Err(CofferError::invalid_data(format!(
                "length prefix {} exceeds addressable size",
                len
            )));
        }
        let len = len as usize;
        match self.remaining() {
            Some(remaining) if len > remaining => Err(CofferError::invalid_data(format!(
                "length prefix {} exceeds remaining input {}",
                len, remaining
            ))),
            Some(_) => self.read_vec(len),
            None => {
                let mut buf = Vec::new();
                let mut left = len;
                while left > 0 {
                    let chunk = left.min(READ_CHUNK);
                    let start = buf.len();
                    buf.resize(start + chunk, 0);
                    self.read_bytes(&mut buf[start..])?;
                    left -= chunk;
                }
                Ok(buf)
            }
        }
    }

    /// Read a length-prefixed string (length as varint, UTF-8 encoded)
    fn read_length_prefixed_string(&mut self) -> Result<String>
    where
        Self: Sized,
    {
        let bytes = self.read_length_prefixed_bytes()?;
        String::from_utf8(bytes)
            .map_err(|e| CofferError::invalid_data(format!("invalid UTF-8 string: {}", e)))
    }

    /// Skip the specified number of bytes
    fn skip(&mut self, n: usize) -> Result<()>;

    /// Number of bytes left to read, if the source knows
    fn remaining(&self) -> Option<usize> {
        None
    }
}

/// DataInput implementation for byte slices
pub struct SliceDataInput<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> SliceDataInput<'a> {
    /// Create a new SliceDataInput from a byte slice
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Get the current position
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Check if there are more bytes to read
    pub fn has_more(&self) -> bool {
        self.position < self.data.len()
    }
}

impl<'a> DataInput for SliceDataInput<'a> {
    fn read_u8(&mut self) -> Result<u8> {
        if self.position >= self.data.len() {
            return Err(CofferError::invalid_data("unexpected end of data"));
        }
        let value = self.data[self.position];
        self.position += 1;
        Ok(value)
    }

    fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_bytes(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_bytes(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_bytes(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        let end = self
            .position
            .checked_add(buf.len())
            .ok_or_else(|| CofferError::invalid_data("length overflow"))?;
        if end > self.data.len() {
            return Err(CofferError::invalid_data("unexpected end of data"));
        }
        buf.copy_from_slice(&self.data[self.position..end]);
        self.position = end;
        Ok(())
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        let end = self
            .position
            .checked_add(n)
            .ok_or_else(|| CofferError::invalid_data("length overflow"))?;
        if end > self.data.len() {
            return Err(CofferError::invalid_data("cannot skip past end of data"));
        }
        self.position = end;
        Ok(())
    }

    fn remaining(&self) -> Option<usize> {
        Some(self.data.len().saturating_sub(self.position))
    }
}

/// DataInput implementation for `std::io::Read` types
pub struct ReaderDataInput<R> {
    reader: R,
}

impl<R: Read> ReaderDataInput<R> {
    /// Create a new ReaderDataInput from a Read type
    pub fn new(reader: R) -> Self {
        Self { reader }
    }

    /// Consume the input and return the underlying reader
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> DataInput for ReaderDataInput<R> {
    fn read_u8(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.reader.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.reader.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.reader.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.reader.read_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        self.reader.read_exact(buf)?;
        Ok(())
    }

    fn skip(&mut self, n: usize) -> Result<()> {
        let mut remaining = n as u64;
        let mut scratch = [0u8; 256];
        while remaining > 0 {
            let chunk = remaining.min(scratch.len() as u64) as usize;
            self.reader.read_exact(&mut scratch[..chunk])?;
            remaining -= chunk as u64;
        }
        Ok(())
    }
}

/// Convenience function to create a DataInput from a byte slice
pub fn from_slice(data: &[u8]) -> SliceDataInput<'_> {
    SliceDataInput::new(data)
}

/// Convenience function to create a DataInput from a Read type
pub fn from_reader<R: Read>(reader: R) -> ReaderDataInput<R> {
    ReaderDataInput::new(reader)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_input_primitives() {
        let data = [0x42, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12];
        let mut input = SliceDataInput::new(&data);

        assert_eq!(input.read_u8().unwrap(), 0x42);
        assert_eq!(input.read_u16().unwrap(), 0x1234);
        assert_eq!(input.read_u32().unwrap(), 0x12345678);
        assert!(input.read_u8().is_err());
    }

    #[test]
    fn test_slice_input_bytes_and_skip() {
        let data = [1, 2, 3, 4, 5];
        let mut input = SliceDataInput::new(&data);

        input.skip(2).unwrap();
        let mut buf = [0u8; 2];
        input.read_bytes(&mut buf).unwrap();
        assert_eq!(buf, [3, 4]);
        assert_eq!(input.remaining(), Some(1));
        assert!(input.skip(2).is_err());
    }

    #[test]
    fn test_length_prefixed_string() {
        let mut data = VarInt::encode(5);
        data.extend_from_slice(b"hello");
        let mut input = SliceDataInput::new(&data);
        assert_eq!(input.read_length_prefixed_string().unwrap(), "hello");
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let mut data = VarInt::encode(2);
        data.extend_from_slice(&[0xFF, 0xFE]);
        let mut input = SliceDataInput::new(&data);
        assert!(input.read_length_prefixed_string().is_err());
    }

    #[test]
    fn test_corrupt_length_prefix_rejected_before_allocation() {
        // prefix claims 2^45 bytes but only two follow
        let mut data = VarInt::encode(1u64 << 45);
        data.extend_from_slice(&[1, 2]);
        let mut input = SliceDataInput::new(&data);
        match input.read_length_prefixed_bytes() {
            Err(CofferError::InvalidData { .. }) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_reader_corrupt_length_prefix_fails_incrementally() {
        // the reader does not know its size, so the read proceeds in
        // bounded chunks and fails on the first short chunk
        let mut data = VarInt::encode(1u64 << 45);
        data.extend_from_slice(&[1, 2, 3]);
        let mut input = ReaderDataInput::new(std::io::Cursor::new(data));
        assert!(input.read_length_prefixed_bytes().is_err());
    }

    #[test]
    fn test_reader_input() {
        let data = vec![7u8, 0, 0, 0, 0, 0, 0, 0];
        let mut input = ReaderDataInput::new(std::io::Cursor::new(data));
        assert_eq!(input.read_u64().unwrap(), 7);
        assert!(input.read_u8().is_err());
    }
}
