//! LinkedSeq: doubly linked sequence over a slab arena
//!
//! Nodes live in a slab with `u32` index links instead of owning pointers:
//! the sequence owns the arena, `prev`/`next` are non-owning indices, and a
//! freed slot goes on a free list for reuse. This gives O(1) end access and
//! O(1) unlink without cyclic ownership.
//!
//! Indexed access is O(n) but scans from whichever end is closer to the
//! requested index.

use crate::cursor::Revision;
use crate::error::{check_bounds, check_insert_bounds, CofferError, Result};
use crate::io::{DataInput, DataOutput, Persist};
use std::fmt;
use std::hash::Hash;
use std::mem;

const NIL: u32 = u32::MAX;

/// Opaque handle to a node in a [`LinkedSeq`].
///
/// A handle is invalidated when its node is unlinked. A stale handle is
/// detected while its slot stays free; once the slot is reused the handle
/// aliases the new occupant, so callers must not retain handles across the
/// removal of their node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

struct Node<T> {
    value: T,
    prev: u32,
    next: u32,
}

enum Slot<T> {
    Occupied(Node<T>),
    Free { next_free: u32 },
}

/// Doubly linked sequence with O(1) ends and arena-backed nodes.
///
/// # Examples
///
/// ```rust
/// use coffer::LinkedSeq;
///
/// let mut seq = LinkedSeq::new();
/// seq.push_back("b")?;
/// seq.push_front("a")?;
/// let c = seq.push_back("c")?;
///
/// assert_eq!(seq.len(), 3);
/// assert_eq!(seq.unlink(c)?, "c");
/// assert_eq!(seq.front(), Some(&"a"));
/// # Ok::<(), coffer::CofferError>(())
/// ```
pub struct LinkedSeq<T> {
    slots: Vec<Slot<T>>,
    head: u32,
    tail: u32,
    free: u32,
    len: usize,
    rev: Revision,
}

impl<T> LinkedSeq<T> {
    /// Create an empty sequence
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            head: NIL,
            tail: NIL,
            free: NIL,
            len: 0,
            rev: Revision::new(),
        }
    }

    /// Create an empty sequence with slab space for `capacity` nodes
    pub fn with_capacity(capacity: usize) -> Self {
        let mut seq = Self::new();
        seq.slots.reserve(capacity);
        seq
    }

    /// Number of live nodes
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the sequence is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Live structural revision
    #[inline]
    pub fn revision(&self) -> u64 {
        self.rev.get()
    }

    fn node(&self, idx: u32) -> Option<&Node<T>> {
        match self.slots.get(idx as usize) {
            Some(Slot::Occupied(node)) => Some(node),
            _ => None,
        }
    }

    fn node_mut(&mut self, idx: u32) -> Option<&mut Node<T>> {
        match self.slots.get_mut(idx as usize) {
            Some(Slot::Occupied(node)) => Some(node),
            _ => None,
        }
    }

    fn require(&self, id: NodeId) -> Result<&Node<T>> {
        self.node(id.0)
            .ok_or_else(|| CofferError::invalid_argument("stale or foreign node handle"))
    }

    fn alloc(&mut self, value: T, prev: u32, next: u32) -> Result<u32> {
        let node = Node { value, prev, next };
        if self.free != NIL {
            let idx = self.free;
            match mem::replace(&mut self.slots[idx as usize], Slot::Occupied(node)) {
                Slot::Free { next_free } => self.free = next_free,
                Slot::Occupied(_) => unreachable!("free list points at an occupied slot"),
            }
            Ok(idx)
        } else {
            if self.slots.len() >= NIL as usize {
                return Err(CofferError::invalid_argument("linked sequence slab is full"));
            }
            self.slots.push(Slot::Occupied(node));
            Ok((self.slots.len() - 1) as u32)
        }
    }

    fn release(&mut self, idx: u32) -> T {
        let slot = mem::replace(
            &mut self.slots[idx as usize],
            Slot::Free { next_free: self.free },
        );
        self.free = idx;
        match slot {
            Slot::Occupied(node) => node.value,
            Slot::Free { .. } => unreachable!("release of a free slot"),
        }
    }

    /// Add an element at the front, returning its handle
    pub fn push_front(&mut self, value: T) -> Result<NodeId> {
        let old_head = self.head;
        let idx = self.alloc(value, NIL, old_head)?;
        if old_head == NIL {
            self.tail = idx;
        } else {
            self.node_mut(old_head).expect("head is live").prev = idx;
        }
        self.head = idx;
        self.len += 1;
        self.rev.bump();
        Ok(NodeId(idx))
    }

    /// Add an element at the back, returning its handle
    pub fn push_back(&mut self, value: T) -> Result<NodeId> {
        let old_tail = self.tail;
        let idx = self.alloc(value, old_tail, NIL)?;
        if old_tail == NIL {
            self.head = idx;
        } else {
            self.node_mut(old_tail).expect("tail is live").next = idx;
        }
        self.tail = idx;
        self.len += 1;
        self.rev.bump();
        Ok(NodeId(idx))
    }

    /// Insert a new element before the node `at`, returning the new handle
    pub fn insert_before(&mut self, at: NodeId, value: T) -> Result<NodeId> {
        let prev = self.require(at)?.prev;
        if prev == NIL {
            return self.push_front(value);
        }
        let idx = self.alloc(value, prev, at.0)?;
        self.node_mut(prev).expect("prev is live").next = idx;
        self.node_mut(at.0).expect("checked above").prev = idx;
        self.len += 1;
        self.rev.bump();
        Ok(NodeId(idx))
    }

    /// Unlink a node, returning its value.
    ///
    /// Correctly handles the sole node, the head, the tail, and interior
    /// nodes; surviving nodes never keep a link into the removed slot.
    pub fn unlink(&mut self, id: NodeId) -> Result<T> {
        let (prev, next) = {
            let node = self.require(id)?;
            (node.prev, node.next)
        };

        if prev == NIL {
            self.head = next;
        } else {
            self.node_mut(prev).expect("prev is live").next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.node_mut(next).expect("next is live").prev = prev;
        }

        self.len -= 1;
        self.rev.bump();
        Ok(self.release(id.0))
    }

    /// Remove and return the front element, or `None` when empty
    pub fn pop_front(&mut self) -> Option<T> {
        if self.head == NIL {
            return None;
        }
        self.unlink(NodeId(self.head)).ok()
    }

    /// Remove and return the back element, or `None` when empty
    pub fn pop_back(&mut self) -> Option<T> {
        if self.tail == NIL {
            return None;
        }
        self.unlink(NodeId(self.tail)).ok()
    }

    /// Front element, or `None` when empty
    pub fn front(&self) -> Option<&T> {
        self.node(self.head).map(|n| &n.value)
    }

    /// Back element, or `None` when empty
    pub fn back(&self) -> Option<&T> {
        self.node(self.tail).map(|n| &n.value)
    }

    /// Front element, failing on an empty sequence
    pub fn first(&self) -> Result<&T> {
        self.front().ok_or(CofferError::empty("first"))
    }

    /// Back element, failing on an empty sequence
    pub fn last(&self) -> Result<&T> {
        self.back().ok_or(CofferError::empty("last"))
    }

    /// Remove the front element, failing on an empty sequence
    pub fn remove_first(&mut self) -> Result<T> {
        self.pop_front().ok_or(CofferError::empty("remove_first"))
    }

    /// Remove the back element, failing on an empty sequence
    pub fn remove_last(&mut self) -> Result<T> {
        self.pop_back().ok_or(CofferError::empty("remove_last"))
    }

    /// Value of the node behind a handle
    pub fn value(&self, id: NodeId) -> Result<&T> {
        Ok(&self.require(id)?.value)
    }

    /// Handle of the node at `index`
    pub fn node_at(&self, index: usize) -> Result<NodeId> {
        check_bounds(index, self.len)?;
        Ok(NodeId(self.locate(index)))
    }

    /// Walk to `index` from whichever end is closer
    fn locate(&self, index: usize) -> u32 {
        debug_assert!(index < self.len);
        if index < self.len / 2 {
            let mut idx = self.head;
            for _ in 0..index {
                idx = self.node(idx).expect("chain is consistent").next;
            }
            idx
        } else {
            let mut idx = self.tail;
            for _ in 0..(self.len - 1 - index) {
                idx = self.node(idx).expect("chain is consistent").prev;
            }
            idx
        }
    }

    /// Element at `index` (O(n), nearer-end scan)
    pub fn get(&self, index: usize) -> Result<&T> {
        check_bounds(index, self.len)?;
        Ok(&self.node(self.locate(index)).expect("located node is live").value)
    }

    /// Mutable element at `index`
    pub fn get_mut(&mut self, index: usize) -> Result<&mut T> {
        check_bounds(index, self.len)?;
        let idx = self.locate(index);
        Ok(&mut self.node_mut(idx).expect("located node is live").value)
    }

    /// Overwrite the element at `index`, returning the old value.
    /// Not structural: no revision bump.
    pub fn set(&mut self, index: usize, value: T) -> Result<T> {
        let slot = self.get_mut(index)?;
        Ok(mem::replace(slot, value))
    }

    /// Overwrite the value of the node behind a handle, returning the old
    /// value. Not structural.
    pub fn set_node(&mut self, id: NodeId, value: T) -> Result<T> {
        self.require(id)?;
        let node = self.node_mut(id.0).expect("checked above");
        Ok(mem::replace(&mut node.value, value))
    }

    /// Insert at `index` (`index == len` appends)
    pub fn insert(&mut self, index: usize, value: T) -> Result<NodeId> {
        check_insert_bounds(index, self.len)?;
        if index == self.len {
            self.push_back(value)
        } else {
            self.insert_before(NodeId(self.locate(index)), value)
        }
    }

    /// Remove and return the element at `index`
    pub fn remove_at(&mut self, index: usize) -> Result<T> {
        check_bounds(index, self.len)?;
        self.unlink(NodeId(self.locate(index)))
    }

    /// Drop all elements
    pub fn clear(&mut self) {
        if self.len == 0 {
            return;
        }
        self.slots.clear();
        self.head = NIL;
        self.tail = NIL;
        self.free = NIL;
        self.len = 0;
        self.rev.bump();
    }

    /// True if the sequence contains an element equal to `x`
    pub fn contains(&self, x: &T) -> bool
    where
        T: PartialEq,
    {
        self.iter().any(|e| e == x)
    }

    /// Iterate front-to-back
    pub fn iter(&self) -> LinkedIter<'_, T> {
        LinkedIter {
            seq: self,
            at: self.head,
        }
    }

    /// Detached fail-fast cursor positioned before the first node
    pub fn cursor(&self) -> ListCursor {
        ListCursor {
            next: self.head,
            last: NIL,
            rev: self.rev.get(),
        }
    }

    /// Order-sensitive content hash: `h = 31*h + element_hash`
    pub fn content_hash(&self) -> u64
    where
        T: Hash,
    {
        super::sequence_hash(self.iter())
    }
}

impl<T: Persist> LinkedSeq<T> {
    /// Canonical dump: `[varint len][elements in index order]`
    pub fn dump<O: DataOutput + ?Sized>(&self, out: &mut O) -> Result<()> {
        out.write_var_int(self.len as u64)?;
        for item in self.iter() {
            item.write_to(out)?;
        }
        Ok(())
    }

    /// Restore from a canonical dump
    pub fn restore<I: DataInput>(input: &mut I) -> Result<Self> {
        let len = super::read_checked_len(input)?;
        let mut seq = Self::with_capacity(len);
        for _ in 0..len {
            seq.push_back(T::read_from(input)?)?;
        }
        Ok(seq)
    }
}

impl<T> Default for LinkedSeq<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for LinkedSeq<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for LinkedSeq<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for LinkedSeq<T> {}

impl<T: Clone> Clone for LinkedSeq<T> {
    fn clone(&self) -> Self {
        let mut cloned = Self::with_capacity(self.len);
        for item in self.iter() {
            cloned
                .push_back(item.clone())
                .expect("slab capacity reserved above");
        }
        cloned
    }
}

impl<'a, T> IntoIterator for &'a LinkedSeq<T> {
    type Item = &'a T;
    type IntoIter = LinkedIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Borrowing front-to-back iterator over a [`LinkedSeq`]
pub struct LinkedIter<'a, T> {
    seq: &'a LinkedSeq<T>,
    at: u32,
}

impl<'a, T> Iterator for LinkedIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let node = self.seq.node(self.at)?;
        self.at = node.next;
        Some(&node.value)
    }
}

/// Detached fail-fast cursor over a [`LinkedSeq`].
///
/// Node-based rather than index-based: steps are O(1) regardless of
/// position. Same protocol as [`crate::SeqCursor`]: every operation
/// validates the captured revision, and mutations through the cursor
/// refresh it.
#[derive(Debug, Clone)]
pub struct ListCursor {
    /// Node returned by the next `advance` (NIL = past the end)
    next: u32,
    /// Node last returned (NIL = none)
    last: u32,
    rev: u64,
}

impl ListCursor {
    fn check<T>(&self, seq: &LinkedSeq<T>) -> Result<()> {
        let live = seq.rev.get();
        if live != self.rev {
            return Err(CofferError::concurrent_modification(self.rev, live));
        }
        Ok(())
    }

    /// Step forward, returning the next element or `None` at the end
    pub fn advance<'a, T>(&mut self, seq: &'a LinkedSeq<T>) -> Result<Option<&'a T>> {
        self.check(seq)?;
        match seq.node(self.next) {
            None => Ok(None),
            Some(node) => {
                self.last = self.next;
                self.next = node.next;
                Ok(Some(&node.value))
            }
        }
    }

    /// Step backward, returning the previous element or `None` at the front
    pub fn step_back<'a, T>(&mut self, seq: &'a LinkedSeq<T>) -> Result<Option<&'a T>> {
        self.check(seq)?;
        let prev = match seq.node(self.next) {
            Some(node) => node.prev,
            None => seq.tail, // cursor past the end
        };
        match seq.node(prev) {
            None => Ok(None),
            Some(node) => {
                self.next = prev;
                self.last = prev;
                Ok(Some(&node.value))
            }
        }
    }

    /// Remove the node last returned, refreshing the captured revision
    pub fn remove_current<T>(&mut self, seq: &mut LinkedSeq<T>) -> Result<T> {
        self.check(seq)?;
        if self.last == NIL {
            return Err(CofferError::invalid_argument(
                "remove_current without a current element",
            ));
        }
        let id = NodeId(self.last);
        if self.next == self.last {
            // cursor sits on the node being removed (after step_back)
            self.next = seq.require(id)?.next;
        }
        self.last = NIL;
        let value = seq.unlink(id)?;
        self.rev = seq.rev.get();
        Ok(value)
    }

    /// Overwrite the node last returned, returning the old value
    pub fn set_current<T>(&mut self, seq: &mut LinkedSeq<T>, value: T) -> Result<T> {
        self.check(seq)?;
        if self.last == NIL {
            return Err(CofferError::invalid_argument(
                "set_current without a current element",
            ));
        }
        seq.set_node(NodeId(self.last), value)
    }

    /// Insert before the cursor position; the new node is not returned by a
    /// subsequent `advance`
    pub fn insert_at_cursor<T>(&mut self, seq: &mut LinkedSeq<T>, value: T) -> Result<()> {
        self.check(seq)?;
        if self.next == NIL {
            seq.push_back(value)?;
        } else {
            seq.insert_before(NodeId(self.next), value)?;
        }
        self.last = NIL;
        self.rev = seq.rev.get();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{SliceDataInput, VecDataOutput};

    fn filled(n: i32) -> LinkedSeq<i32> {
        let mut seq = LinkedSeq::new();
        for i in 0..n {
            seq.push_back(i).unwrap();
        }
        seq
    }

    #[test]
    fn test_push_both_ends() {
        let mut seq = LinkedSeq::new();
        seq.push_back(1).unwrap();
        seq.push_front(0).unwrap();
        seq.push_back(2).unwrap();
        let items: Vec<i32> = seq.iter().copied().collect();
        assert_eq!(items, vec![0, 1, 2]);
        assert_eq!(seq.front(), Some(&0));
        assert_eq!(seq.back(), Some(&2));
    }

    #[test]
    fn test_unlink_sole_head_tail_interior() {
        // sole node
        let mut seq = LinkedSeq::new();
        let only = seq.push_back(7).unwrap();
        assert_eq!(seq.unlink(only).unwrap(), 7);
        assert!(seq.is_empty());
        assert_eq!(seq.front(), None);
        assert_eq!(seq.back(), None);

        // head, tail, interior
        let mut seq = filled(4); // [0, 1, 2, 3]
        let head = seq.node_at(0).unwrap();
        assert_eq!(seq.unlink(head).unwrap(), 0);
        let tail = seq.node_at(seq.len() - 1).unwrap();
        assert_eq!(seq.unlink(tail).unwrap(), 3);
        let mid = seq.node_at(0).unwrap();
        let _keep = seq.node_at(1).unwrap();
        assert_eq!(seq.unlink(mid).unwrap(), 1);
        let items: Vec<i32> = seq.iter().copied().collect();
        assert_eq!(items, vec![2]);
        assert_eq!(seq.front(), seq.back());
    }

    #[test]
    fn test_stale_handle_rejected() {
        let mut seq = filled(2);
        let id = seq.node_at(1).unwrap();
        seq.unlink(id).unwrap();
        assert!(seq.unlink(id).is_err());
        assert!(seq.value(id).is_err());
    }

    #[test]
    fn test_slab_reuse() {
        let mut seq = filled(3);
        seq.pop_front().unwrap();
        seq.pop_back().unwrap();
        seq.push_back(10).unwrap();
        seq.push_back(11).unwrap();
        // slab should not have grown past its high-water mark
        assert_eq!(seq.slots.len(), 3);
        let items: Vec<i32> = seq.iter().copied().collect();
        assert_eq!(items, vec![1, 10, 11]);
    }

    #[test]
    fn test_indexed_access_scans_from_nearer_end() {
        let seq = filled(10);
        for i in 0..10 {
            assert_eq!(*seq.get(i).unwrap(), i as i32);
        }
        assert!(seq.get(10).is_err());
    }

    #[test]
    fn test_indexed_insert_remove() {
        let mut seq = filled(3); // [0, 1, 2]
        seq.insert(1, 10).unwrap();
        seq.insert(4, 20).unwrap(); // == len, appends
        assert!(seq.insert(6, 30).is_err());
        let items: Vec<i32> = seq.iter().copied().collect();
        assert_eq!(items, vec![0, 10, 1, 2, 20]);

        assert_eq!(seq.remove_at(1).unwrap(), 10);
        assert_eq!(seq.remove_at(3).unwrap(), 20);
        let items: Vec<i32> = seq.iter().copied().collect();
        assert_eq!(items, vec![0, 1, 2]);
    }

    #[test]
    fn test_rejected_remove_keeps_revision() {
        let mut seq = filled(2);
        let rev = seq.revision();
        assert!(seq.remove_at(5).is_err());
        assert_eq!(seq.revision(), rev);
        let id = seq.node_at(1).unwrap();
        seq.unlink(id).unwrap();
        // a second unlink through the stale handle is a no-op failure
        let rev = seq.revision();
        assert!(seq.unlink(id).is_err());
        assert_eq!(seq.revision(), rev);
    }

    #[test]
    fn test_set_is_not_structural() {
        let mut seq = filled(3);
        let rev = seq.revision();
        assert_eq!(seq.set(1, 99).unwrap(), 1);
        assert_eq!(seq.revision(), rev);
    }

    #[test]
    fn test_empty_failures() {
        let mut seq: LinkedSeq<i32> = LinkedSeq::new();
        assert!(matches!(seq.first(), Err(CofferError::Empty { .. })));
        assert!(matches!(seq.last(), Err(CofferError::Empty { .. })));
        assert!(matches!(seq.remove_first(), Err(CofferError::Empty { .. })));
        assert!(matches!(seq.remove_last(), Err(CofferError::Empty { .. })));
    }

    #[test]
    fn test_insert_before() {
        let mut seq = filled(2); // [0, 1]
        let head = seq.node_at(0).unwrap();
        seq.insert_before(head, -1).unwrap();
        let second = seq.node_at(2).unwrap();
        seq.insert_before(second, 5).unwrap();
        let items: Vec<i32> = seq.iter().copied().collect();
        assert_eq!(items, vec![-1, 0, 5, 1]);
    }

    #[test]
    fn test_cursor_walk_and_fail_fast() {
        let mut seq = filled(3);
        let mut cur = seq.cursor();
        assert_eq!(cur.advance(&seq).unwrap(), Some(&0));
        assert_eq!(cur.advance(&seq).unwrap(), Some(&1));
        assert_eq!(cur.step_back(&seq).unwrap(), Some(&1));
        assert_eq!(cur.step_back(&seq).unwrap(), Some(&0));
        assert_eq!(cur.step_back(&seq).unwrap(), None);

        seq.push_back(3).unwrap();
        assert!(matches!(
            cur.advance(&seq),
            Err(CofferError::ConcurrentModification { .. })
        ));
    }

    #[test]
    fn test_cursor_remove_and_insert() {
        let mut seq = filled(4); // [0, 1, 2, 3]
        let mut cur = seq.cursor();
        cur.advance(&seq).unwrap(); // 0
        cur.advance(&seq).unwrap(); // 1
        assert_eq!(cur.remove_current(&mut seq).unwrap(), 1);
        assert_eq!(cur.advance(&seq).unwrap(), Some(&2));

        cur.insert_at_cursor(&mut seq, 9).unwrap();
        assert_eq!(cur.advance(&seq).unwrap(), Some(&3));
        let items: Vec<i32> = seq.iter().copied().collect();
        assert_eq!(items, vec![0, 2, 9, 3]);
    }

    #[test]
    fn test_cursor_remove_after_step_back() {
        let mut seq = filled(3);
        let mut cur = seq.cursor();
        cur.advance(&seq).unwrap();
        cur.advance(&seq).unwrap();
        cur.step_back(&seq).unwrap(); // back on 1
        assert_eq!(cur.remove_current(&mut seq).unwrap(), 1);
        assert_eq!(cur.advance(&seq).unwrap(), Some(&2));
    }

    #[test]
    fn test_cursor_set_current() {
        let mut seq = filled(2);
        let mut cur = seq.cursor();
        cur.advance(&seq).unwrap();
        assert_eq!(cur.set_current(&mut seq, 42).unwrap(), 0);
        // overwrite is not structural: the same cursor continues
        assert_eq!(cur.advance(&seq).unwrap(), Some(&1));
        assert_eq!(*seq.get(0).unwrap(), 42);
    }

    #[test]
    fn test_dump_restore_round_trip() {
        let mut seq = LinkedSeq::new();
        for s in ["alpha", "beta", "gamma"] {
            seq.push_back(s.to_string()).unwrap();
        }
        let mut out = VecDataOutput::new();
        seq.dump(&mut out).unwrap();
        let mut input = SliceDataInput::new(out.as_slice());
        let restored = LinkedSeq::<String>::restore(&mut input).unwrap();
        assert_eq!(seq, restored);
    }
}
