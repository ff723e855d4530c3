//! PriorityHeap: array-backed binary heap with pluggable ordering
//!
//! Storage is a [`DynVec`] holding the implicit tree in the usual layout
//! (children of `i` at `2i+1` and `2i+2`). The smallest element under the
//! comparator sits at the root. Ordering between equal elements is not
//! stable.

use crate::containers::DynVec;
use crate::io::{DataInput, DataOutput, Persist};
use crate::Result;
use std::cmp::Ordering;
use std::fmt;

/// Element ordering for a [`PriorityHeap`]
pub trait Compare<T> {
    /// Total order between two elements
    fn compare(&self, a: &T, b: &T) -> Ordering;
}

/// Orders by the element's own [`Ord`]
#[derive(Debug, Clone, Copy, Default)]
pub struct NaturalOrder;

impl<T: Ord> Compare<T> for NaturalOrder {
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

impl<T, F: Fn(&T, &T) -> Ordering> Compare<T> for F {
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        self(a, b)
    }
}

/// Binary min-heap under a pluggable comparator.
///
/// # Examples
///
/// ```rust
/// use coffer::PriorityHeap;
///
/// let mut heap: PriorityHeap<i32> = PriorityHeap::new();
/// heap.offer(3)?;
/// heap.offer(1)?;
/// heap.offer(2)?;
///
/// assert_eq!(heap.peek(), Some(&1));
/// assert_eq!(heap.poll(), Some(1));
/// assert_eq!(heap.poll(), Some(2));
/// # Ok::<(), coffer::CofferError>(())
/// ```
pub struct PriorityHeap<T, C = NaturalOrder> {
    items: DynVec<T>,
    cmp: C,
}

impl<T, C: Compare<T> + Default> PriorityHeap<T, C> {
    /// Create an empty heap under the default comparator
    pub fn new() -> Self {
        Self::with_comparator(C::default())
    }

    /// Create an empty heap with preallocated storage
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Ok(Self {
            items: DynVec::with_capacity(capacity)?,
            cmp: C::default(),
        })
    }
}

impl<T, C: Compare<T>> PriorityHeap<T, C> {
    /// Create an empty heap under `cmp`
    pub fn with_comparator(cmp: C) -> Self {
        Self {
            items: DynVec::new(),
            cmp,
        }
    }

    /// Number of elements
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the heap is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.len() == 0
    }

    /// Backing array in heap layout, not sorted order
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.items.as_slice()
    }

    /// Add an element
    pub fn offer(&mut self, value: T) -> Result<()> {
        self.items.push(value)?;
        self.sift_up(self.items.len() - 1);
        Ok(())
    }

    /// Smallest element under the comparator, or `None` when empty
    pub fn peek(&self) -> Option<&T> {
        self.items.as_slice().first()
    }

    /// Remove and return the smallest element, or `None` when empty
    pub fn poll(&mut self) -> Option<T> {
        let len = self.items.len();
        if len == 0 {
            return None;
        }
        self.items.as_mut_slice().swap(0, len - 1);
        let root = self.items.pop();
        if !self.is_empty() {
            self.sift_down(0);
        }
        root
    }

    /// Remove the first element equal to `x`; false if absent
    pub fn remove_item(&mut self, x: &T) -> bool
    where
        T: PartialEq,
    {
        match self.items.iter().position(|e| e == x) {
            None => false,
            Some(at) => {
                self.remove_at(at);
                true
            }
        }
    }

    /// True if the heap contains an element equal to `x`
    pub fn contains(&self, x: &T) -> bool
    where
        T: PartialEq,
    {
        self.items.contains(x)
    }

    /// Drop all elements
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Iterate the backing array, not sorted order
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.as_slice().iter()
    }

    /// Remove the element at array index `at`.
    ///
    /// The last element fills the hole and is sifted down; if it did not
    /// move downward it may still violate the heap property toward the
    /// root, so it is sifted up from the hole (two-phase).
    fn remove_at(&mut self, at: usize) {
        let last = self.items.len() - 1;
        if at == last {
            self.items.pop();
            return;
        }
        self.items.as_mut_slice().swap(at, last);
        self.items.pop();
        let settled = self.sift_down(at);
        if settled == at {
            self.sift_up(at);
        }
    }

    fn sift_up(&mut self, mut at: usize) {
        let items = self.items.as_mut_slice();
        while at > 0 {
            let parent = (at - 1) / 2;
            if self.cmp.compare(&items[at], &items[parent]) == Ordering::Less {
                items.swap(at, parent);
                at = parent;
            } else {
                break;
            }
        }
    }

    /// Sift the element at `at` down, returning its final index.
    /// Ties between children keep the left child.
    fn sift_down(&mut self, mut at: usize) -> usize {
        let items = self.items.as_mut_slice();
        let len = items.len();
        loop {
            let left = 2 * at + 1;
            if left >= len {
                return at;
            }
            let right = left + 1;
            let mut child = left;
            if right < len && self.cmp.compare(&items[right], &items[left]) == Ordering::Less {
                child = right;
            }
            if self.cmp.compare(&items[child], &items[at]) == Ordering::Less {
                items.swap(child, at);
                at = child;
            } else {
                return at;
            }
        }
    }

    /// Re-establish the heap property over arbitrary contents
    fn heapify(&mut self) {
        let len = self.items.len();
        for i in (0..len / 2).rev() {
            self.sift_down(i);
        }
    }
}

impl<T: Persist, C: Compare<T>> PriorityHeap<T, C> {
    /// Canonical dump: `[varint len][elements in array order]`, not sorted
    pub fn dump<O: DataOutput + ?Sized>(&self, out: &mut O) -> Result<()> {
        self.items.dump(out)
    }

    /// Restore from a canonical dump under `cmp`, re-heapifying rather than
    /// trusting the stored order
    pub fn restore_with<I: DataInput>(input: &mut I, cmp: C) -> Result<Self> {
        let items = DynVec::restore(input)?;
        let mut heap = Self { items, cmp };
        heap.heapify();
        Ok(heap)
    }
}

impl<T: Persist, C: Compare<T> + Default> PriorityHeap<T, C> {
    /// Restore from a canonical dump under the default comparator
    pub fn restore<I: DataInput>(input: &mut I) -> Result<Self> {
        Self::restore_with(input, C::default())
    }
}

impl<T: Ord> Default for PriorityHeap<T, NaturalOrder> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug, C> fmt::Debug for PriorityHeap<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PriorityHeap")
            .field("items", &self.items.as_slice())
            .finish()
    }
}

impl<T: Clone, C: Clone> Clone for PriorityHeap<T, C> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            cmp: self.cmp.clone(),
        }
    }
}

impl<'a, T, C> IntoIterator for &'a PriorityHeap<T, C> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.as_slice().iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::{SliceDataInput, VecDataOutput};

    fn assert_heap_property<T: Ord + std::fmt::Debug>(heap: &PriorityHeap<T>) {
        let items = heap.as_slice();
        for i in 1..items.len() {
            let parent = (i - 1) / 2;
            assert!(
                items[parent] <= items[i],
                "heap violated at {}: {:?} > {:?}",
                i,
                items[parent],
                items[i]
            );
        }
    }

    #[test]
    fn test_offer_poll_sorted() {
        let mut heap: PriorityHeap<i32> = PriorityHeap::new();
        for x in [5, 3, 8, 1, 9, 2, 7, 4, 6, 0] {
            heap.offer(x).unwrap();
            assert_heap_property(&heap);
        }
        assert_eq!(heap.peek(), Some(&0));
        let mut drained = Vec::new();
        while let Some(x) = heap.poll() {
            drained.push(x);
            assert_heap_property(&heap);
        }
        assert_eq!(drained, (0..10).collect::<Vec<i32>>());
        assert_eq!(heap.poll(), None);
        assert_eq!(heap.peek(), None);
    }

    #[test]
    fn test_remove_item_two_phase() {
        // layout [1, 5, 2, 6, 7, 3]: removing 6 moves 3 into index 3,
        // which cannot sink (no children) but must rise above 5
        let mut heap: PriorityHeap<i32> = PriorityHeap::new();
        for x in [1, 5, 2, 6, 7, 3] {
            heap.offer(x).unwrap();
        }
        assert_eq!(heap.as_slice(), &[1, 5, 2, 6, 7, 3]);

        assert!(heap.remove_item(&6));
        assert_heap_property(&heap);
        assert!(!heap.contains(&6));

        assert!(!heap.remove_item(&42));

        let mut drained = Vec::new();
        while let Some(x) = heap.poll() {
            drained.push(x);
        }
        assert_eq!(drained, vec![1, 2, 3, 5, 7]);
    }

    #[test]
    fn test_remove_last_element() {
        let mut heap: PriorityHeap<i32> = PriorityHeap::new();
        heap.offer(1).unwrap();
        heap.offer(2).unwrap();
        assert!(heap.remove_item(&2));
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.poll(), Some(1));
    }

    #[test]
    fn test_closure_comparator_max_heap() {
        let mut heap = PriorityHeap::with_comparator(|a: &i32, b: &i32| b.cmp(a));
        for x in [3, 9, 1, 7] {
            heap.offer(x).unwrap();
        }
        assert_eq!(heap.peek(), Some(&9));
        assert_eq!(heap.poll(), Some(9));
        assert_eq!(heap.poll(), Some(7));
        assert_eq!(heap.poll(), Some(3));
        assert_eq!(heap.poll(), Some(1));
    }

    #[test]
    fn test_interleaved_operations() {
        let mut heap: PriorityHeap<i32> = PriorityHeap::new();
        for x in 0..100 {
            heap.offer((x * 37) % 100).unwrap();
        }
        for _ in 0..50 {
            heap.poll();
        }
        for x in 0..25 {
            heap.offer(x).unwrap();
        }
        assert_heap_property(&heap);
        let mut prev = i32::MIN;
        while let Some(x) = heap.poll() {
            assert!(x >= prev);
            prev = x;
        }
    }

    #[test]
    fn test_dump_restore_reheapifies() {
        let mut heap: PriorityHeap<u32> = PriorityHeap::new();
        for x in [4u32, 1, 3, 2] {
            heap.offer(x).unwrap();
        }
        let mut out = VecDataOutput::new();
        heap.dump(&mut out).unwrap();

        let mut input = SliceDataInput::new(out.as_slice());
        let mut restored: PriorityHeap<u32> = PriorityHeap::restore(&mut input).unwrap();
        assert_eq!(restored.len(), 4);
        let mut drained = Vec::new();
        while let Some(x) = restored.poll() {
            drained.push(x);
        }
        assert_eq!(drained, vec![1, 2, 3, 4]);
    }
}
