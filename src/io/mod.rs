//! Byte-stream I/O and the persisted-state contract
//!
//! This module provides the input/output traits the container dumps are
//! written through, slice/vec/reader/writer implementations, LEB128 varints,
//! and the [`Persist`] element trait.

pub mod data_input;
pub mod data_output;
pub mod persist;
pub mod var_int;

// Re-export core types
pub use data_input::{DataInput, ReaderDataInput, SliceDataInput};
pub use data_output::{DataOutput, VecDataOutput, WriterDataOutput};
pub use persist::Persist;
pub use var_int::VarInt;

// Convenience functions
pub use data_input::{from_reader, from_slice};
pub use data_output::{to_vec, to_writer};
