//! Sequence and queue containers
//!
//! - [`DynVec`]: growable array over raw allocation, with [`VecView`] windows
//! - [`RingDeque`]: double-ended queue on a power-of-2 circular buffer
//! - [`LinkedSeq`]: doubly linked sequence over a slab arena
//! - [`PriorityHeap`]: array-backed binary heap with pluggable ordering
//!
//! All sequences share the fail-fast cursor protocol from [`crate::cursor`]
//! and the dump/restore byte format from [`crate::io`].

pub mod dyn_vec;
pub mod linked_seq;
pub mod priority_heap;
pub mod ring_deque;

pub use dyn_vec::{DynVec, VecView};
pub use linked_seq::{LinkedSeq, ListCursor, NodeId};
pub use priority_heap::{Compare, NaturalOrder, PriorityHeap};
pub use ring_deque::RingDeque;

use crate::error::{CofferError, Result};
use crate::io::DataInput;
use std::hash::{Hash, Hasher};

/// Order-sensitive hash of a sequence: `h = 31*h + element_hash`.
///
/// Every element is hashed with its own fresh hasher so the combination is
/// position sensitive and two sequences with equal elements in equal order
/// hash the same across container kinds.
pub(crate) fn sequence_hash<'a, T, I>(items: I) -> u64
where
    T: Hash + 'a,
    I: Iterator<Item = &'a T>,
{
    let mut h: u64 = 0;
    for item in items {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        item.hash(&mut hasher);
        h = h.wrapping_mul(31).wrapping_add(hasher.finish());
    }
    h
}

/// Decode a length prefix and sanity-check it against the bytes left.
///
/// Each element needs at least one byte, so a count larger than the
/// remaining input is corrupt regardless of element type. Bounded inputs
/// get that check; readers (`remaining() == None`) fail element by element.
pub(crate) fn read_checked_len<I: DataInput>(input: &mut I) -> Result<usize> {
    let len = input.read_var_int()?;
    if len > usize::MAX as u64 {
        return Err(CofferError::invalid_data("length prefix exceeds usize"));
    }
    let len = len as usize;
    if let Some(remaining) = input.remaining() {
        if len > remaining {
            return Err(CofferError::invalid_data(format!(
                "length prefix {} exceeds {} remaining bytes",
                len, remaining
            )));
        }
    }
    Ok(len)
}

// Sequence equality is defined by element order, not by representation, so
// the three sequence kinds compare against each other.

impl<T: PartialEq> PartialEq<LinkedSeq<T>> for DynVec<T> {
    fn eq(&self, other: &LinkedSeq<T>) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: PartialEq> PartialEq<DynVec<T>> for LinkedSeq<T> {
    fn eq(&self, other: &DynVec<T>) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: PartialEq> PartialEq<RingDeque<T>> for DynVec<T> {
    fn eq(&self, other: &RingDeque<T>) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: PartialEq> PartialEq<DynVec<T>> for RingDeque<T> {
    fn eq(&self, other: &DynVec<T>) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: PartialEq> PartialEq<RingDeque<T>> for LinkedSeq<T> {
    fn eq(&self, other: &RingDeque<T>) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: PartialEq> PartialEq<LinkedSeq<T>> for RingDeque<T> {
    fn eq(&self, other: &LinkedSeq<T>) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::SliceDataInput;

    #[test]
    fn test_sequence_hash_is_order_sensitive() {
        let a = sequence_hash([1, 2, 3].iter());
        let b = sequence_hash([3, 2, 1].iter());
        assert_ne!(a, b);
        assert_eq!(a, sequence_hash([1, 2, 3].iter()));
    }

    #[test]
    fn test_cross_container_equality_and_hash() {
        let mut vec = DynVec::new();
        let mut seq = LinkedSeq::new();
        let mut deque = RingDeque::new();
        for i in 0..5 {
            vec.push(i).unwrap();
            seq.push_back(i).unwrap();
            deque.push_back(i).unwrap();
        }
        assert_eq!(vec, seq);
        assert_eq!(seq, deque);
        assert_eq!(vec, deque);
        assert_eq!(vec.content_hash(), seq.content_hash());
        assert_eq!(seq.content_hash(), deque.content_hash());

        seq.push_back(5).unwrap();
        assert_ne!(vec, seq);
    }

    #[test]
    fn test_oversized_length_prefix_rejected() {
        // claims 200 elements but only a handful of bytes follow
        let bytes = [200u8, 1, 1, 1];
        let mut input = SliceDataInput::new(&bytes);
        assert!(matches!(
            read_checked_len(&mut input),
            Err(CofferError::InvalidData { .. })
        ));
    }
}
