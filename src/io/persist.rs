//! Element-level persistence
//!
//! [`Persist`] is the element contract behind every container's
//! `dump`/`restore` pair. A container's canonical dump is
//! `[varint length][element bytes...]` in the container's canonical order
//! (index order for sequences, front-to-back for the deque, backing-array
//! order for the heap, unordered pairs after a capacity hint for the map).
//!
//! Restore never trusts the byte layout: every structural invariant is
//! re-established by re-inserting (or re-heapifying) the decoded elements.

use crate::error::Result;
use crate::io::data_input::DataInput;
use crate::io::data_output::DataOutput;

/// Types that can be written to and read back from a data stream
pub trait Persist: Sized {
    /// Write this value to the output
    fn write_to<O: DataOutput + ?Sized>(&self, out: &mut O) -> Result<()>;

    /// Read one value from the input
    fn read_from<I: DataInput>(input: &mut I) -> Result<Self>;
}

impl Persist for u8 {
    fn write_to<O: DataOutput + ?Sized>(&self, out: &mut O) -> Result<()> {
        out.write_u8(*self)
    }

    fn read_from<I: DataInput>(input: &mut I) -> Result<Self> {
        input.read_u8()
    }
}

impl Persist for u16 {
    fn write_to<O: DataOutput + ?Sized>(&self, out: &mut O) -> Result<()> {
        out.write_u16(*self)
    }

    fn read_from<I: DataInput>(input: &mut I) -> Result<Self> {
        input.read_u16()
    }
}

impl Persist for u32 {
    fn write_to<O: DataOutput + ?Sized>(&self, out: &mut O) -> Result<()> {
        out.write_u32(*self)
    }

    fn read_from<I: DataInput>(input: &mut I) -> Result<Self> {
        input.read_u32()
    }
}

impl Persist for u64 {
    fn write_to<O: DataOutput + ?Sized>(&self, out: &mut O) -> Result<()> {
        out.write_u64(*self)
    }

    fn read_from<I: DataInput>(input: &mut I) -> Result<Self> {
        input.read_u64()
    }
}

impl Persist for i32 {
    fn write_to<O: DataOutput + ?Sized>(&self, out: &mut O) -> Result<()> {
        out.write_u32(*self as u32)
    }

    fn read_from<I: DataInput>(input: &mut I) -> Result<Self> {
        Ok(input.read_u32()? as i32)
    }
}

impl Persist for i64 {
    fn write_to<O: DataOutput + ?Sized>(&self, out: &mut O) -> Result<()> {
        out.write_u64(*self as u64)
    }

    fn read_from<I: DataInput>(input: &mut I) -> Result<Self> {
        Ok(input.read_u64()? as i64)
    }
}

impl Persist for String {
    fn write_to<O: DataOutput + ?Sized>(&self, out: &mut O) -> Result<()> {
        out.write_length_prefixed_string(self)
    }

    fn read_from<I: DataInput>(input: &mut I) -> Result<Self> {
        input.read_length_prefixed_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::data_input::SliceDataInput;
    use crate::io::data_output::VecDataOutput;

    fn round_trip<T: Persist + PartialEq + std::fmt::Debug>(value: T) {
        let mut out = VecDataOutput::new();
        value.write_to(&mut out).unwrap();
        let mut input = SliceDataInput::new(out.as_slice());
        assert_eq!(T::read_from(&mut input).unwrap(), value);
        assert!(!input.has_more());
    }

    #[test]
    fn test_primitive_round_trips() {
        round_trip(0xABu8);
        round_trip(0x1234u16);
        round_trip(0xDEADBEEFu32);
        round_trip(u64::MAX);
        round_trip(-42i32);
        round_trip(i64::MIN);
        round_trip("hello coffer".to_string());
        round_trip(String::new());
    }

    #[test]
    fn test_truncated_string_rejected() {
        let mut out = VecDataOutput::new();
        "hello".to_string().write_to(&mut out).unwrap();
        let bytes = out.into_vec();
        let mut input = SliceDataInput::new(&bytes[..bytes.len() - 1]);
        assert!(String::read_from(&mut input).is_err());
    }
}
