//! # Coffer: Core Collection Engines
//!
//! This crate provides the fundamental sequence, queue, map and heap engines
//! used as building blocks by higher-level code, with explicit error
//! handling and a shared persistence format.
//!
//! ## Key Features
//!
//! - **Dynamic Array**: [`DynVec`] over raw allocation with 1.5x amortized
//!   growth and mutable sub-range [`VecView`] windows
//! - **Circular Deque**: [`RingDeque`] on a power-of-2 ring buffer with
//!   mask-based wraparound
//! - **Linked Sequence**: [`LinkedSeq`] over a slab arena with `u32` links
//!   and stable [`NodeId`] handles
//! - **Hash Table**: [`BinHashMap`] with per-bucket escalation from linear
//!   chains to red-black tree bins
//! - **Binary Heap**: [`PriorityHeap`] with pluggable [`Compare`] ordering
//! - **Fail-Fast Cursors**: every container carries a structural
//!   [`Revision`]; detached cursors detect mid-iteration mutation instead
//!   of silently corrupting a traversal
//! - **Persistence**: one canonical `dump`/`restore` byte format across all
//!   containers, built on LEB128 varints and the [`Persist`] element trait
//!
//! ## Quick Start
//!
//! ```rust
//! use coffer::{BinHashMap, DynVec, LinkedSeq, PriorityHeap, RingDeque};
//!
//! // growable array
//! let mut vec = DynVec::new();
//! vec.push(42)?;
//! assert_eq!(vec[0], 42);
//!
//! // double-ended queue
//! let mut deque = RingDeque::new();
//! deque.push_back(1)?;
//! deque.push_front(0)?;
//! assert_eq!(deque.pop_front(), Some(0));
//!
//! // linked sequence with node handles
//! let mut seq = LinkedSeq::new();
//! let id = seq.push_back("node")?;
//! assert_eq!(seq.value(id)?, &"node");
//!
//! // hash map with tree bins
//! let mut map = BinHashMap::new();
//! map.put("key", "value");
//! assert_eq!(map.get(&"key"), Some(&"value"));
//!
//! // priority heap
//! let mut heap: PriorityHeap<i32> = PriorityHeap::new();
//! heap.offer(3)?;
//! heap.offer(1)?;
//! assert_eq!(heap.poll(), Some(1));
//! # Ok::<(), coffer::CofferError>(())
//! ```

#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod containers;
pub mod cursor;
pub mod error;
pub mod hash_map;
pub mod io;

// Re-export core types
pub use containers::{
    Compare, DynVec, LinkedSeq, ListCursor, NaturalOrder, NodeId, PriorityHeap, RingDeque,
    VecView,
};
pub use cursor::{CursorTarget, Revision, SeqCursor};
pub use error::{CofferError, Result};
pub use hash_map::{BinHashMap, BinHashMapConfig, MapCursor};
pub use io::{
    DataInput, DataOutput, Persist, ReaderDataInput, SliceDataInput, VarInt, VecDataOutput,
    WriterDataOutput,
};
