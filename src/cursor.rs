//! Fail-fast revision counting and detached cursors
//!
//! Every container in this crate carries a [`Revision`]: a plain counter
//! bumped once per structural mutation (a size change or a positional
//! reshuffle; overwriting a value in place is not structural). A detached
//! cursor captures the revision at creation and re-validates it before every
//! step and before every cursor-driven mutation. On mismatch it fails with
//! [`CofferError::ConcurrentModification`] instead of producing a result.
//!
//! Mutations performed *through* the cursor refresh its captured revision,
//! so the same cursor keeps iterating afterwards.
//!
//! This protocol is a best-effort diagnostic for single-threaded logic
//! errors (a structural change bypassing an active cursor). It is not a
//! thread-safety mechanism: containers here take `&mut self` for mutation,
//! so cross-thread races are ruled out by the borrow rules, not by this
//! counter.

use crate::error::{CofferError, Result};

/// Per-container structural revision counter.
///
/// Wraps silently on overflow; a wrap that lands exactly on a live cursor's
/// captured value is an accepted, documented false-negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Revision(u64);

impl Revision {
    /// A fresh counter at zero
    #[inline]
    pub fn new() -> Self {
        Revision(0)
    }

    /// Current value
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }

    /// Record one structural mutation
    #[inline]
    pub fn bump(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}

/// Seam between indexed sequence engines and [`SeqCursor`].
///
/// Implemented by the contiguous engines (`DynVec`, `RingDeque`) in terms
/// of their logical index space. Engines that
/// cannot honor positional insert/overwrite through a cursor return
/// [`CofferError::Unsupported`] from those hooks.
pub trait CursorTarget {
    /// Element type
    type Item;

    /// Logical element count
    fn seq_len(&self) -> usize;

    /// Live structural revision
    fn seq_revision(&self) -> u64;

    /// Element at logical index `i` (caller guarantees `i < seq_len()`)
    fn seq_get(&self, i: usize) -> &Self::Item;

    /// Remove and return the element at logical index `i`
    fn seq_remove(&mut self, i: usize) -> Result<Self::Item>;

    /// Insert `value` at logical index `i`
    fn seq_insert(&mut self, i: usize, value: Self::Item) -> Result<()>;

    /// Replace the element at logical index `i`, returning the old value
    fn seq_set(&mut self, i: usize, value: Self::Item) -> Result<Self::Item>;
}

/// Detached fail-fast cursor over an indexed sequence.
///
/// The cursor holds no borrow of its container; each operation takes the
/// container explicitly. This is what makes the revision check meaningful:
/// the container can be freely mutated through other calls between steps,
/// and the next step detects it.
///
/// ```
/// use coffer::{DynVec, SeqCursor};
///
/// let mut v: DynVec<i32> = DynVec::new();
/// for i in 0..3 {
///     v.push(i)?;
/// }
/// let mut cur = v.cursor();
/// assert_eq!(cur.advance(&v)?, Some(&0));
/// v.push(99)?; // structural change through another handle
/// assert!(cur.advance(&v).is_err()); // fail-fast
/// # Ok::<(), coffer::CofferError>(())
/// ```
#[derive(Debug, Clone)]
pub struct SeqCursor {
    /// Logical index of the element the next `advance` returns
    next: usize,
    /// Logical index of the element last returned, if still present
    last: Option<usize>,
    /// Captured revision
    rev: u64,
}

impl SeqCursor {
    /// Create a cursor positioned before the first element
    pub fn new(rev: u64) -> Self {
        Self { next: 0, last: None, rev }
    }

    fn check<C: CursorTarget>(&self, target: &C) -> Result<()> {
        let live = target.seq_revision();
        if live != self.rev {
            return Err(CofferError::concurrent_modification(self.rev, live));
        }
        Ok(())
    }

    /// True if `advance` would return another element
    pub fn has_next<C: CursorTarget>(&self, target: &C) -> bool {
        self.next < target.seq_len()
    }

    /// Step forward, returning the next element or `None` at the end
    pub fn advance<'a, C: CursorTarget>(&mut self, target: &'a C) -> Result<Option<&'a C::Item>> {
        self.check(target)?;
        if self.next >= target.seq_len() {
            return Ok(None);
        }
        let item = target.seq_get(self.next);
        self.last = Some(self.next);
        self.next += 1;
        Ok(Some(item))
    }

    /// Step backward, returning the previous element or `None` at the front
    pub fn step_back<'a, C: CursorTarget>(&mut self, target: &'a C) -> Result<Option<&'a C::Item>> {
        self.check(target)?;
        if self.next == 0 {
            return Ok(None);
        }
        self.next -= 1;
        self.last = Some(self.next);
        Ok(Some(target.seq_get(self.next)))
    }

    /// Remove the element last returned by `advance`/`step_back`.
    ///
    /// Refreshes the captured revision, so iteration can continue with this
    /// cursor. Fails with `InvalidArgument` if no element was returned yet
    /// or the current element was already removed.
    pub fn remove_current<C: CursorTarget>(&mut self, target: &mut C) -> Result<C::Item> {
        self.check(target)?;
        let at = self
            .last
            .take()
            .ok_or_else(|| CofferError::invalid_argument("remove_current without a current element"))?;
        let value = target.seq_remove(at)?;
        if at < self.next {
            self.next -= 1;
        }
        self.rev = target.seq_revision();
        Ok(value)
    }

    /// Replace the element last returned, returning the old value.
    ///
    /// Not a structural change; the revision is unchanged (but is refreshed
    /// anyway in case the engine counts it).
    pub fn set_current<C: CursorTarget>(&mut self, target: &mut C, value: C::Item) -> Result<C::Item> {
        self.check(target)?;
        let at = self
            .last
            .ok_or_else(|| CofferError::invalid_argument("set_current without a current element"))?;
        let old = target.seq_set(at, value)?;
        self.rev = target.seq_revision();
        Ok(old)
    }

    /// Insert `value` at the cursor position.
    ///
    /// The new element lands before the implicit cursor and is not returned
    /// by a subsequent `advance`. Clears the current element.
    pub fn insert_at_cursor<C: CursorTarget>(&mut self, target: &mut C, value: C::Item) -> Result<()> {
        self.check(target)?;
        target.seq_insert(self.next, value)?;
        self.next += 1;
        self.last = None;
        self.rev = target.seq_revision();
        Ok(())
    }
}
