//! DynVec: growable contiguous array with fail-fast revision tracking
//!
//! The storage engine underneath the crate: a raw-buffer vector with
//! amortized O(1) append, O(n) positional insert/remove via bulk moves, and
//! a structural revision counter consumed by detached cursors and sub-range
//! views.

use crate::cursor::{CursorTarget, Revision, SeqCursor};
use crate::error::{check_bounds, check_insert_bounds, check_range, CofferError, Result};
use crate::io::{DataInput, DataOutput, Persist};
use std::alloc::{self, Layout};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::mem;
use std::ops::{Deref, DerefMut, Index, IndexMut};
use std::ptr::{self, NonNull};
use std::slice;

/// Growable contiguous array.
///
/// Elements `[0, len)` are live; `[len, capacity)` is unspecified storage.
/// Capacity never shrinks automatically. Growth targets 1.5x the current
/// capacity (with a small floor), except [`DynVec::reserve_exact`] which
/// grows to exactly the requested amount.
///
/// Structural mutations (anything that changes `len` or shifts positions)
/// bump the revision counter exactly once; overwriting a value in place via
/// [`DynVec::set`] does not.
///
/// # Examples
///
/// ```rust
/// use coffer::DynVec;
///
/// let mut vec = DynVec::new();
/// vec.push(42)?;
/// vec.push(84)?;
/// assert_eq!(vec.len(), 2);
/// assert_eq!(vec[0], 42);
/// # Ok::<(), coffer::CofferError>(())
/// ```
pub struct DynVec<T> {
    ptr: Option<NonNull<T>>,
    len: usize,
    cap: usize,
    rev: Revision,
}

impl<T> DynVec<T> {
    const MIN_GROWTH: usize = 4;

    /// Create a new empty DynVec
    #[inline]
    pub fn new() -> Self {
        Self {
            ptr: None,
            len: 0,
            cap: 0,
            rev: Revision::new(),
        }
    }

    /// Create a DynVec with the specified capacity
    pub fn with_capacity(cap: usize) -> Result<Self> {
        let mut vec = Self::new();
        if cap > 0 {
            vec.realloc_exact(cap)?;
        }
        Ok(vec)
    }

    /// Number of live elements
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the vector is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated capacity
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
    fn as_ptr(&self) -> *const T {
        match self.ptr {
            Some(ptr) => ptr.as_ptr(),
            None => ptr::null(),
        }
    }

    #[inline]
    fn as_mut_ptr(&mut self) -> *mut T {
        match self.ptr {
            Some(ptr) => ptr.as_ptr(),
            None => ptr::null_mut(),
        }
    }

    /// View the live elements as a slice
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        if self.len == 0 {
            &[]
        } else {
            unsafe { slice::from_raw_parts(self.as_ptr(), self.len) }
        }
    }

    /// View the live elements as a mutable slice
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        if self.len == 0 {
            &mut []
        } else {
            unsafe { slice::from_raw_parts_mut(self.as_mut_ptr(), self.len) }
        }
    }

    /// Reallocate to exactly `new_cap` (caller guarantees `new_cap >= len`)
    fn realloc_exact(&mut self, new_cap: usize) -> Result<()> {
        debug_assert!(new_cap >= self.len);
        if mem::size_of::<T>() == 0 {
            // zero-sized elements occupy no storage
            self.ptr = Some(NonNull::dangling());
            self.cap = new_cap;
            return Ok(());
        }
        let new_layout = Layout::array::<T>(new_cap).map_err(|_| {
            CofferError::invalid_argument(format!("capacity {} overflows layout", new_cap))
        })?;

        let new_ptr = match self.ptr {
            Some(ptr) if self.cap > 0 => {
                let old_layout = Layout::array::<T>(self.cap).unwrap();
                unsafe {
                    alloc::realloc(ptr.as_ptr() as *mut u8, old_layout, new_layout.size()) as *mut T
                }
            }
            _ => unsafe { alloc::alloc(new_layout) as *mut T },
        };

        if new_ptr.is_null() {
            return Err(CofferError::out_of_memory(new_layout.size()));
        }

        self.ptr = Some(unsafe { NonNull::new_unchecked(new_ptr) });
        self.cap = new_cap;
        Ok(())
    }

    /// Grow to exactly `max(min_cap, capacity)`.
    ///
    /// This is the direct capacity hint: it never over-allocates beyond the
    /// request.
    pub fn reserve_exact(&mut self, min_cap: usize) -> Result<()> {
        if min_cap <= self.cap {
            return Ok(());
        }
        self.realloc_exact(min_cap)
    }

    /// Ensure room for at least `required` elements, growing amortized
    fn grow_for(&mut self, required: usize) -> Result<()> {
        if required <= self.cap {
            return Ok(());
        }
        let amortized = self.cap.saturating_add(self.cap / 2).max(Self::MIN_GROWTH);
        self.realloc_exact(required.max(amortized))
    }

    /// Append an element. Amortized O(1); one structural revision bump.
    pub fn push(&mut self, value: T) -> Result<()> {
        if self.len == self.cap {
            let required = self
                .len
                .checked_add(1)
                .ok_or_else(|| CofferError::invalid_argument("length overflow"))?;
            self.grow_for(required)?;
        }
        unsafe {
            ptr::write(self.as_mut_ptr().add(self.len), value);
        }
        self.len += 1;
        self.rev.bump();
        Ok(())
    }

    /// Remove and return the last element
    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        self.rev.bump();
        Some(unsafe { ptr::read(self.as_ptr().add(self.len)) })
    }

    /// Reference to the element at `index`
    #[inline]
    pub fn get(&self, index: usize) -> Result<&T> {
        check_bounds(index, self.len)?;
        Ok(unsafe { &*self.as_ptr().add(index) })
    }

    /// Mutable reference to the element at `index`
    #[inline]
    pub fn get_mut(&mut self, index: usize) -> Result<&mut T> {
        check_bounds(index, self.len)?;
        Ok(unsafe { &mut *self.as_mut_ptr().add(index) })
    }

    /// Overwrite the element at `index`, returning the old value.
    ///
    /// A pure value overwrite is not structural: no revision bump, live
    /// cursors stay valid.
    pub fn set(&mut self, index: usize, value: T) -> Result<T> {
        check_bounds(index, self.len)?;
        Ok(mem::replace(
            unsafe { &mut *self.as_mut_ptr().add(index) },
            value,
        ))
    }

    /// Insert `value` at `index`, shifting `[index, len)` one slot right.
    ///
    /// Accepts `index == len` (append position). One bulk move, one revision
    /// bump regardless of how many elements shifted.
    pub fn insert(&mut self, index: usize, value: T) -> Result<()> {
        check_insert_bounds(index, self.len)?;
        if self.len == self.cap {
            let required = self
                .len
                .checked_add(1)
                .ok_or_else(|| CofferError::invalid_argument("length overflow"))?;
            self.grow_for(required)?;
        }
        unsafe {
            let p = self.as_mut_ptr().add(index);
            ptr::copy(p, p.add(1), self.len - index);
            ptr::write(p, value);
        }
        self.len += 1;
        self.rev.bump();
        Ok(())
    }

    /// Remove and return the element at `index`, shifting `[index+1, len)`
    /// one slot left. One revision bump.
    pub fn remove(&mut self, index: usize) -> Result<T> {
        check_bounds(index, self.len)?;
        let value = unsafe {
            let p = self.as_mut_ptr().add(index);
            let value = ptr::read(p);
            ptr::copy(p.add(1), p, self.len - index - 1);
            value
        };
        self.len -= 1;
        self.rev.bump();
        Ok(value)
    }

    /// Drop all elements. Capacity is retained.
    pub fn clear(&mut self) {
        if self.len == 0 {
            return;
        }
        for i in 0..self.len {
            unsafe {
                ptr::drop_in_place(self.as_mut_ptr().add(i));
            }
        }
        self.len = 0;
        self.rev.bump();
    }

    /// True if the vector contains an element equal to `x`
    pub fn contains(&self, x: &T) -> bool
    where
        T: PartialEq,
    {
        self.as_slice().contains(x)
    }

    /// Iterate over the live elements
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Append every element from an iterator with a known length.
    ///
    /// Appending nothing is a no-op: the revision only bumps when at least
    /// one element landed.
    pub fn extend<I>(&mut self, iter: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        let iter = iter.into_iter();
        if iter.len() == 0 {
            return Ok(());
        }
        let required = self
            .len
            .checked_add(iter.len())
            .ok_or_else(|| CofferError::invalid_argument("length overflow"))?;
        self.grow_for(required)?;
        for item in iter {
            unsafe {
                ptr::write(self.as_mut_ptr().add(self.len), item);
            }
            self.len += 1;
        }
        self.rev.bump();
        Ok(())
    }

    /// Sub-range view over `[from, to)`.
    ///
    /// The view borrows the vector mutably for its whole lifetime, so no
    /// other handle can structurally change the backing while it lives;
    /// every view operation delegates to the backing at `offset + local`.
    /// `view(i, i)` is a valid empty view.
    pub fn view(&mut self, from: usize, to: usize) -> Result<VecView<'_, T>> {
        check_range(from, to, self.len)?;
        Ok(VecView {
            backing: self,
            offset: from,
            len: to - from,
        })
    }

    /// Detached fail-fast cursor positioned before the first element
    pub fn cursor(&self) -> SeqCursor {
        SeqCursor::new(self.rev.get())
    }

    /// Order-sensitive content hash: `h = 31*h + element_hash`.
    ///
    /// Structurally equal sequences of any of this crate's sequence types
    /// produce identical hashes.
    pub fn content_hash(&self) -> u64
    where
        T: Hash,
    {
        super::sequence_hash(self.iter())
    }
}

impl<T: Persist> DynVec<T> {
    /// Canonical dump: `[varint len][elements in index order]`
    pub fn dump<O: DataOutput + ?Sized>(&self, out: &mut O) -> Result<()> {
        out.write_var_int(self.len as u64)?;
        for item in self.iter() {
            item.write_to(out)?;
        }
        Ok(())
    }

    /// Restore from a canonical dump, re-validating the element count
    pub fn restore<I: DataInput>(input: &mut I) -> Result<Self> {
        let len = super::read_checked_len(input)?;
        let mut vec = Self::with_capacity(len)?;
        for _ in 0..len {
            vec.push(T::read_from(input)?)?;
        }
        Ok(vec)
    }
}

impl<T> CursorTarget for DynVec<T> {
    type Item = T;

    fn seq_len(&self) -> usize {
        self.len
    }

    fn seq_revision(&self) -> u64 {
        self.rev.get()
    }

    fn seq_get(&self, i: usize) -> &T {
        debug_assert!(i < self.len);
        unsafe { &*self.as_ptr().add(i) }
    }

    fn seq_remove(&mut self, i: usize) -> Result<T> {
        self.remove(i)
    }

    fn seq_insert(&mut self, i: usize, value: T) -> Result<()> {
        self.insert(i, value)
    }

    fn seq_set(&mut self, i: usize, value: T) -> Result<T> {
        self.set(i, value)
    }
}

impl<T> Default for DynVec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for DynVec<T> {
    fn drop(&mut self) {
        for i in 0..self.len {
            unsafe {
                ptr::drop_in_place(self.as_mut_ptr().add(i));
            }
        }
        if let Some(ptr) = self.ptr {
            if self.cap > 0 && mem::size_of::<T>() != 0 {
                unsafe {
                    let layout = Layout::array::<T>(self.cap).unwrap();
                    alloc::dealloc(ptr.as_ptr() as *mut u8, layout);
                }
            }
        }
    }
}

impl<T> Deref for DynVec<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<T> DerefMut for DynVec<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}

impl<T> Index<usize> for DynVec<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.as_slice()[index]
    }
}

impl<T> IndexMut<usize> for DynVec<T> {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.as_mut_slice()[index]
    }
}

impl<T: fmt::Debug> fmt::Debug for DynVec<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<T: PartialEq> PartialEq for DynVec<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: Eq> Eq for DynVec<T> {}

impl<T: Hash> Hash for DynVec<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_slice().hash(state)
    }
}

impl<T: Clone> Clone for DynVec<T> {
    fn clone(&self) -> Self {
        let mut new_vec = Self::with_capacity(self.len).expect("allocation failed in clone");
        for item in self.as_slice() {
            new_vec.push(item.clone()).expect("capacity reserved above");
        }
        new_vec
    }
}

impl<'a, T> IntoIterator for &'a DynVec<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

// Safety: DynVec<T> exclusively owns its buffer
unsafe impl<T: Send> Send for DynVec<T> {}
unsafe impl<T: Sync> Sync for DynVec<T> {}

/// Mutable sub-range view over a backing [`DynVec`].
///
/// Owns no storage: every positional operation translates
/// `local -> offset + local` and delegates to the backing vector, so
/// structural changes made through the view bump the backing revision.
/// The exclusive borrow guarantees no other handle can invalidate the view
/// while it lives.
pub struct VecView<'a, T> {
    backing: &'a mut DynVec<T>,
    offset: usize,
    len: usize,
}

impl<'a, T> VecView<'a, T> {
    /// Number of elements in the view
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the view is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Offset of this view into the backing vector
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// The viewed elements as a slice
    pub fn as_slice(&self) -> &[T] {
        &self.backing.as_slice()[self.offset..self.offset + self.len]
    }

    /// Reference to the element at view-local `index`
    pub fn get(&self, index: usize) -> Result<&T> {
        check_bounds(index, self.len)?;
        self.backing.get(self.offset + index)
    }

    /// Overwrite at view-local `index`, returning the old value
    pub fn set(&mut self, index: usize, value: T) -> Result<T> {
        check_bounds(index, self.len)?;
        self.backing.set(self.offset + index, value)
    }

    /// Insert at view-local `index`; the backing vector shifts and its
    /// revision bumps
    pub fn insert(&mut self, index: usize, value: T) -> Result<()> {
        check_insert_bounds(index, self.len)?;
        self.backing.insert(self.offset + index, value)?;
        self.len += 1;
        Ok(())
    }

    /// Remove at view-local `index`
    pub fn remove(&mut self, index: usize) -> Result<T> {
        check_bounds(index, self.len)?;
        let value = self.backing.remove(self.offset + index)?;
        self.len -= 1;
        Ok(value)
    }

    /// Append at the end of the view (elements after the view shift right)
    pub fn push(&mut self, value: T) -> Result<()> {
        self.insert(self.len, value)
    }

    /// Iterate over the viewed elements
    pub fn iter(&self) -> slice::Iter<'_, T> {
        self.as_slice().iter()
    }

    /// Narrow to a sub-view of this view
    pub fn view(&mut self, from: usize, to: usize) -> Result<VecView<'_, T>> {
        check_range(from, to, self.len)?;
        Ok(VecView {
            backing: &mut *self.backing,
            offset: self.offset + from,
            len: to - from,
        })
    }
}

impl<'a, T: fmt::Debug> fmt::Debug for VecView<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}
