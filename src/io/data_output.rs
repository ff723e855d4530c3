//! Data output abstractions and implementations
//!
//! Traits and implementations for writing structured data to byte vectors
//! and `std::io::Write` destinations.

use std::io::Write;

use crate::error::Result;
use crate::io::var_int::VarInt;

/// Trait for writing structured data to various destinations
pub trait DataOutput {
    /// Write a single byte
    fn write_u8(&mut self, value: u8) -> Result<()>;

    /// Write a 16-bit unsigned integer in little-endian format
    fn write_u16(&mut self, value: u16) -> Result<()>;

    /// Write a 32-bit unsigned integer in little-endian format
    fn write_u32(&mut self, value: u32) -> Result<()>;

    /// Write a 64-bit unsigned integer in little-endian format
    fn write_u64(&mut self, value: u64) -> Result<()>;

    /// Write a variable-length encoded integer
    fn write_var_int(&mut self, value: u64) -> Result<()>;

    /// Write bytes from the provided buffer
    fn write_bytes(&mut self, data: &[u8]) -> Result<()>;

    /// Write a length-prefixed byte slice (length as varint)
    fn write_length_prefixed_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.write_var_int(data.len() as u64)?;
        self.write_bytes(data)
    }

    /// Write a length-prefixed string (length as varint, UTF-8 encoded)
    fn write_length_prefixed_string(&mut self, s: &str) -> Result<()> {
        self.write_length_prefixed_bytes(s.as_bytes())
    }

    /// Flush any buffered data to the underlying destination
    fn flush(&mut self) -> Result<()>;
}

/// DataOutput implementation for Vec<u8>
pub struct VecDataOutput {
    data: Vec<u8>,
}

impl VecDataOutput {
    /// Create a new VecDataOutput
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Create a new VecDataOutput with the specified initial capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    /// Get the number of bytes written
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if no bytes have been written
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get a reference to the underlying data
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Convert into the underlying Vec<u8>
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl Default for VecDataOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl DataOutput for VecDataOutput {
    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.data.push(value);
        Ok(())
    }

    fn write_u16(&mut self, value: u16) -> Result<()> {
        self.data.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn write_u32(&mut self, value: u32) -> Result<()> {
        self.data.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn write_u64(&mut self, value: u64) -> Result<()> {
        self.data.extend_from_slice(&value.to_le_bytes());
        Ok(())
    }

    fn write_var_int(&mut self, value: u64) -> Result<()> {
        VarInt::write_to_vec(&mut self.data, value);
        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.data.extend_from_slice(data);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// DataOutput implementation for `std::io::Write` types
pub struct WriterDataOutput<W> {
    writer: W,
}

impl<W: Write> WriterDataOutput<W> {
    /// Create a new WriterDataOutput from a Write type
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Consume the output and return the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> DataOutput for WriterDataOutput<W> {
    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.writer.write_all(&[value])?;
        Ok(())
    }

    fn write_u16(&mut self, value: u16) -> Result<()> {
        self.writer.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    fn write_u32(&mut self, value: u32) -> Result<()> {
        self.writer.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    fn write_u64(&mut self, value: u64) -> Result<()> {
        self.writer.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    fn write_var_int(&mut self, value: u64) -> Result<()> {
        let encoded = VarInt::encode(value);
        self.writer.write_all(&encoded)?;
        Ok(())
    }

    fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Convenience function to create a Vec-backed DataOutput
pub fn to_vec() -> VecDataOutput {
    VecDataOutput::new()
}

/// Convenience function to wrap a Write type as a DataOutput
pub fn to_writer<W: Write>(writer: W) -> WriterDataOutput<W> {
    WriterDataOutput::new(writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::data_input::{DataInput, SliceDataInput};

    #[test]
    fn test_vec_output_primitives() {
        let mut out = VecDataOutput::new();
        out.write_u8(0x42).unwrap();
        out.write_u16(0x1234).unwrap();
        out.write_u32(0xDEADBEEF).unwrap();
        out.write_u64(42).unwrap();

        let mut input = SliceDataInput::new(out.as_slice());
        assert_eq!(input.read_u8().unwrap(), 0x42);
        assert_eq!(input.read_u16().unwrap(), 0x1234);
        assert_eq!(input.read_u32().unwrap(), 0xDEADBEEF);
        assert_eq!(input.read_u64().unwrap(), 42);
    }

    #[test]
    fn test_length_prefixed_round_trip() {
        let mut out = VecDataOutput::new();
        out.write_length_prefixed_string("coffer").unwrap();

        let mut input = SliceDataInput::new(out.as_slice());
        assert_eq!(input.read_length_prefixed_string().unwrap(), "coffer");
    }

    #[test]
    fn test_writer_output() {
        let mut out = WriterDataOutput::new(Vec::new());
        out.write_var_int(300).unwrap();
        out.write_bytes(b"xy").unwrap();
        out.flush().unwrap();

        let buf = out.into_inner();
        let mut input = SliceDataInput::new(&buf);
        assert_eq!(input.read_var_int().unwrap(), 300);
        assert_eq!(input.read_vec(2).unwrap(), b"xy");
    }
}
