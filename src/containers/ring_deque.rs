//! RingDeque: power-of-two circular buffer with O(1) double-ended access
//!
//! Index arithmetic wraps with a bitmask, so capacity is always a power of
//! two. The buffer is never allowed to become completely full: a push that
//! would make `head == tail` doubles the capacity and re-linearizes the
//! content to start at physical index 0, keeping `head == tail` an
//! unambiguous empty condition.

use crate::cursor::{CursorTarget, Revision, SeqCursor};
use crate::error::{check_bounds, CofferError, Result};
use crate::io::{DataInput, DataOutput, Persist};
use std::alloc::{self, Layout};
use std::fmt;
use std::hash::Hash;
use std::ptr;

/// Growable circular double-ended queue.
///
/// Absence is modeled with `Option` at the type level; there is no sentinel
/// value and therefore nothing to reject on insertion. Pop/peek operations
/// come in two flavors: `pop_front`/`front` signal absence with `None`
/// (poll-style), while `remove_front`/`first` fail with an empty-container
/// error.
///
/// # Examples
///
/// ```rust
/// use coffer::RingDeque;
///
/// let mut deque = RingDeque::new();
/// deque.push_back(1)?;
/// deque.push_back(2)?;
/// deque.push_front(0)?;
///
/// assert_eq!(deque.pop_front(), Some(0));
/// assert_eq!(deque.pop_back(), Some(2));
/// # Ok::<(), coffer::CofferError>(())
/// ```
pub struct RingDeque<T> {
    buffer: *mut T,
    /// Capacity, always a power of two
    cap: usize,
    /// `cap - 1`, for wrap-around masking
    mask: usize,
    /// Physical index of the first live element
    head: usize,
    /// Physical index one past the last live element; always an empty slot
    tail: usize,
    rev: Revision,
}

impl<T> RingDeque<T> {
    const INITIAL_CAPACITY: usize = 8;

    /// Create an empty deque with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(Self::INITIAL_CAPACITY)
    }

    /// Create an empty deque able to hold at least `capacity` elements
    /// before growing. Rounded up to the next power of two.
    pub fn with_capacity(capacity: usize) -> Self {
        // one slot always stays empty, so size for capacity + 1
        let cap = capacity
            .saturating_add(1)
            .next_power_of_two()
            .max(Self::INITIAL_CAPACITY);
        Self {
            buffer: Self::allocate(cap),
            cap,
            mask: cap - 1,
            head: 0,
            tail: 0,
            rev: Revision::new(),
        }
    }

    fn allocate(cap: usize) -> *mut T {
        if std::mem::size_of::<T>() == 0 {
            return ptr::NonNull::dangling().as_ptr();
        }
        let layout = Layout::array::<T>(cap).expect("ring capacity overflows layout");
        let ptr = unsafe { alloc::alloc(layout) as *mut T };
        if ptr.is_null() {
            alloc::handle_alloc_error(layout);
        }
        ptr
    }

    /// Number of live elements
    #[inline]
    pub fn len(&self) -> usize {
        (self.tail.wrapping_sub(self.head)) & self.mask
    }

    /// Check if the deque is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head == self.tail
    }

    /// Current capacity (one slot is always kept empty)
    #[inline]
    pub fn capacity(&self) -> usize {
        self.cap
    }

    /// Live structural revision
    #[inline]
    pub fn revision(&self) -> u64 {
        self.rev.get()
    }

    #[inline]
    fn physical(&self, logical: usize) -> usize {
        (self.head + logical) & self.mask
    }

    #[inline]
    unsafe fn slot_read(&self, physical: usize) -> T {
        unsafe { ptr::read(self.buffer.add(physical)) }
    }

    #[inline]
    unsafe fn slot_write(&mut self, physical: usize, value: T) {
        unsafe { ptr::write(self.buffer.add(physical), value) }
    }

    /// Double the capacity, re-linearizing content so `head == 0`
    fn grow(&mut self) -> Result<()> {
        debug_assert_eq!(self.head, self.tail); // called only when full
        let old_cap = self.cap;
        let new_cap = old_cap
            .checked_mul(2)
            .ok_or_else(|| CofferError::invalid_argument("deque capacity overflow"))?;

        let new_buffer = Self::allocate(new_cap);
        let head_run = old_cap - self.head;
        unsafe {
            // [head, old_cap) then [0, head) land contiguously at 0
            ptr::copy_nonoverlapping(self.buffer.add(self.head), new_buffer, head_run);
            ptr::copy_nonoverlapping(self.buffer, new_buffer.add(head_run), self.head);
        }
        self.dealloc_buffer();

        self.buffer = new_buffer;
        self.cap = new_cap;
        self.mask = new_cap - 1;
        self.head = 0;
        self.tail = old_cap;
        Ok(())
    }

    fn dealloc_buffer(&mut self) {
        if std::mem::size_of::<T>() == 0 {
            return;
        }
        unsafe {
            let layout = Layout::array::<T>(self.cap).unwrap();
            alloc::dealloc(self.buffer as *mut u8, layout);
        }
    }

    /// Add an element at the front. O(1) amortized.
    pub fn push_front(&mut self, value: T) -> Result<()> {
        self.head = (self.head.wrapping_sub(1)) & self.mask;
        let head = self.head;
        unsafe {
            self.slot_write(head, value);
        }
        self.rev.bump();
        if self.head == self.tail {
            self.grow()?;
        }
        Ok(())
    }

    /// Add an element at the back. O(1) amortized.
    pub fn push_back(&mut self, value: T) -> Result<()> {
        let tail = self.tail;
        unsafe {
            self.slot_write(tail, value);
        }
        self.tail = (self.tail + 1) & self.mask;
        self.rev.bump();
        if self.head == self.tail {
            self.grow()?;
        }
        Ok(())
    }

    /// Remove and return the front element, or `None` when empty
    pub fn pop_front(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        let value = unsafe { self.slot_read(self.head) };
        self.head = (self.head + 1) & self.mask;
        self.rev.bump();
        Some(value)
    }

    /// Remove and return the back element, or `None` when empty
    pub fn pop_back(&mut self) -> Option<T> {
        if self.is_empty() {
            return None;
        }
        self.tail = (self.tail.wrapping_sub(1)) & self.mask;
        let value = unsafe { self.slot_read(self.tail) };
        self.rev.bump();
        Some(value)
    }

    /// Front element, or `None` when empty
    pub fn front(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        Some(unsafe { &*self.buffer.add(self.head) })
    }

    /// Back element, or `None` when empty
    pub fn back(&self) -> Option<&T> {
        if self.is_empty() {
            return None;
        }
        let last = (self.tail.wrapping_sub(1)) & self.mask;
        Some(unsafe { &*self.buffer.add(last) })
    }

    /// Remove the front element, failing on an empty deque
    pub fn remove_front(&mut self) -> Result<T> {
        self.pop_front().ok_or(CofferError::empty("remove_front"))
    }

    /// Remove the back element, failing on an empty deque
    pub fn remove_back(&mut self) -> Result<T> {
        self.pop_back().ok_or(CofferError::empty("remove_back"))
    }

    /// Front element, failing on an empty deque
    pub fn first(&self) -> Result<&T> {
        self.front().ok_or(CofferError::empty("first"))
    }

    /// Back element, failing on an empty deque
    pub fn last(&self) -> Result<&T> {
        self.back().ok_or(CofferError::empty("last"))
    }

    /// Element at logical index `i` (0 = front)
    pub fn get(&self, i: usize) -> Result<&T> {
        check_bounds(i, self.len())?;
        Ok(unsafe { &*self.buffer.add(self.physical(i)) })
    }

    /// Mutable element at logical index `i`
    pub fn get_mut(&mut self, i: usize) -> Result<&mut T> {
        check_bounds(i, self.len())?;
        let p = self.physical(i);
        Ok(unsafe { &mut *self.buffer.add(p) })
    }

    /// Remove the element at logical index `i`, preserving the circular
    /// layout by shifting whichever side has fewer elements.
    ///
    /// Returns the removed value and `true` if the tail side shifted
    /// (elements after `i` moved toward the front). A physical cursor
    /// tracking slots must compensate by one on a front-side shift; the
    /// logical-index cursors in this crate are unaffected.
    pub fn remove_at(&mut self, i: usize) -> Result<(T, bool)> {
        let len = self.len();
        check_bounds(i, len)?;

        let at = self.physical(i);
        let value = unsafe { self.slot_read(at) };
        let front_count = i;
        let back_count = len - 1 - i;

        let tail_shifted = if front_count < back_count {
            // shift [head, at) one slot toward the removal point
            let mut j = at;
            while j != self.head {
                let p = (j.wrapping_sub(1)) & self.mask;
                unsafe {
                    let moved = self.slot_read(p);
                    self.slot_write(j, moved);
                }
                j = p;
            }
            self.head = (self.head + 1) & self.mask;
            false
        } else {
            // shift (at, tail) one slot toward the removal point
            let mut j = at;
            loop {
                let n = (j + 1) & self.mask;
                if n == self.tail {
                    break;
                }
                unsafe {
                    let moved = self.slot_read(n);
                    self.slot_write(j, moved);
                }
                j = n;
            }
            self.tail = j;
            true
        };

        self.rev.bump();
        Ok((value, tail_shifted))
    }

    /// Remove the first element (from the front) matching `pred`
    pub fn remove_first_where<F: FnMut(&T) -> bool>(&mut self, mut pred: F) -> Option<T> {
        for i in 0..self.len() {
            let hit = pred(unsafe { &*self.buffer.add(self.physical(i)) });
            if hit {
                return self.remove_at(i).ok().map(|(v, _)| v);
            }
        }
        None
    }

    /// Remove the last element (searching from the back) matching `pred`
    pub fn remove_last_where<F: FnMut(&T) -> bool>(&mut self, mut pred: F) -> Option<T> {
        for i in (0..self.len()).rev() {
            let hit = pred(unsafe { &*self.buffer.add(self.physical(i)) });
            if hit {
                return self.remove_at(i).ok().map(|(v, _)| v);
            }
        }
        None
    }

    /// Drop all elements. Capacity is retained.
    pub fn clear(&mut self) {
        if self.is_empty() {
            return;
        }
        while self.pop_front().is_some() {}
        self.head = 0;
        self.tail = 0;
    }

    /// True if the deque contains an element equal to `x`
    pub fn contains(&self, x: &T) -> bool
    where
        T: PartialEq,
    {
        self.iter().any(|e| e == x)
    }

    /// Iterate front-to-back
    pub fn iter(&self) -> RingIter<'_, T> {
        RingIter { deque: self, pos: 0 }
    }

    /// Detached fail-fast cursor positioned before the front element.
    ///
    /// The deque cursor supports `advance`, `step_back`, and
    /// `remove_current`; positional `set_current`/`insert_at_cursor` are
    /// unsupported on a circular layout and fail accordingly.
    pub fn cursor(&self) -> SeqCursor {
        SeqCursor::new(self.rev.get())
    }

    /// Order-sensitive content hash: `h = 31*h + element_hash`
    pub fn content_hash(&self) -> u64
    where
        T: Hash,
    {
        super::sequence_hash(self.iter())
    }
}

impl<T: Persist> RingDeque<T> {
    /// Canonical dump: `[varint len][elements front-to-back]`
    pub fn dump<O: DataOutput + ?Sized>(&self, out: &mut O) -> Result<()> {
        out.write_var_int(self.len() as u64)?;
        for item in self.iter() {
            item.write_to(out)?;
        }
        Ok(())
    }

    /// Restore from a canonical dump
    pub fn restore<I: DataInput>(input: &mut I) -> Result<Self> {
        let len = super::read_checked_len(input)?;
        let mut deque = Self::with_capacity(len);
        for _ in 0..len {
            deque.push_back(T::read_from(input)?)?;
        }
        Ok(deque)
    }
}

impl<T> CursorTarget for RingDeque<T> {
    type Item = T;

    fn seq_len(&self) -> usize {
        self.len()
    }

    fn seq_revision(&self) -> u64 {
        self.rev.get()
    }

    fn seq_get(&self, i: usize) -> &T {
        debug_assert!(i < self.len());
        unsafe { &*self.buffer.add(self.physical(i)) }
    }

    fn seq_remove(&mut self, i: usize) -> Result<T> {
        self.remove_at(i).map(|(v, _)| v)
    }

    fn seq_insert(&mut self, _i: usize, _value: T) -> Result<()> {
        Err(CofferError::unsupported("insert through a deque cursor"))
    }

    fn seq_set(&mut self, _i: usize, _value: T) -> Result<T> {
        Err(CofferError::unsupported("overwrite through a deque cursor"))
    }
}

impl<T> Default for RingDeque<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for RingDeque<T> {
    fn drop(&mut self) {
        while self.pop_front().is_some() {}
        self.dealloc_buffer();
    }
}

impl<T: fmt::Debug> fmt::Debug for RingDeque<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl<T: PartialEq> PartialEq for RingDeque<T> {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<T: Eq> Eq for RingDeque<T> {}

impl<T: Clone> Clone for RingDeque<T> {
    fn clone(&self) -> Self {
        let mut cloned = Self::with_capacity(self.len());
        for item in self.iter() {
            cloned
                .push_back(item.clone())
                .expect("capacity reserved above");
        }
        cloned
    }
}

impl<'a, T> IntoIterator for &'a RingDeque<T> {
    type Item = &'a T;
    type IntoIter = RingIter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// Safety: RingDeque<T> exclusively owns its buffer
unsafe impl<T: Send> Send for RingDeque<T> {}
unsafe impl<T: Sync> Sync for RingDeque<T> {}

/// Borrowing front-to-back iterator over a [`RingDeque`]
pub struct RingIter<'a, T> {
    deque: &'a RingDeque<T>,
    pos: usize,
}

impl<'a, T> Iterator for RingIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.pos >= self.deque.len() {
            return None;
        }
        let item = unsafe { &*self.deque.buffer.add(self.deque.physical(self.pos)) };
        self.pos += 1;
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.deque.len() - self.pos;
        (remaining, Some(remaining))
    }
}

impl<'a, T> ExactSizeIterator for RingIter<'a, T> {}
