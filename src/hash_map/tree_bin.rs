//! Red-black tree bin for collision-heavy buckets
//!
//! Nodes live in a slab arena and link by `u32` index (NIL = `u32::MAX`),
//! so the tree needs no owning pointers and no unsafe. Besides the tree
//! links every node sits on a prev/next thread preserving arrival order,
//! which is what iteration, untreeify and resize splitting walk.
//!
//! Keys are not required to be `Ord`: the search key is the spread hash,
//! with a per-bin insertion sequence number as a stable tie-break. Lookups
//! for a hash that collides therefore probe both subtrees and decide by
//! key equality alone.

use super::Entry;
use std::borrow::Borrow;

pub(crate) const NIL: u32 = u32::MAX;

#[derive(Clone)]
struct TreeNode<K, V> {
    hash: u64,
    seq: u64,
    key: K,
    value: V,
    parent: u32,
    left: u32,
    right: u32,
    prev: u32,
    next: u32,
    red: bool,
}

#[derive(Clone)]
pub(crate) struct TreeBin<K, V> {
    slots: Vec<Option<TreeNode<K, V>>>,
    free: Vec<u32>,
    root: u32,
    head: u32,
    tail: u32,
    len: usize,
    next_seq: u64,
}

impl<K, V> TreeBin<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            root: NIL,
            head: NIL,
            tail: NIL,
            len: 0,
            next_seq: 0,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.len
    }

    /// First node in arrival order
    pub(crate) fn head(&self) -> u32 {
        self.head
    }

    /// Arrival-order successor
    pub(crate) fn next_of(&self, idx: u32) -> u32 {
        self.node(idx).next
    }

    pub(crate) fn key_value(&self, idx: u32) -> (&K, &V) {
        let node = self.node(idx);
        (&node.key, &node.value)
    }

    pub(crate) fn value_mut(&mut self, idx: u32) -> &mut V {
        &mut self.node_mut(idx).value
    }

    fn node(&self, idx: u32) -> &TreeNode<K, V> {
        self.slots[idx as usize].as_ref().expect("live tree node")
    }

    fn node_mut(&mut self, idx: u32) -> &mut TreeNode<K, V> {
        self.slots[idx as usize].as_mut().expect("live tree node")
    }

    fn left(&self, idx: u32) -> u32 {
        if idx == NIL {
            NIL
        } else {
            self.node(idx).left
        }
    }

    fn right(&self, idx: u32) -> u32 {
        if idx == NIL {
            NIL
        } else {
            self.node(idx).right
        }
    }

    fn parent(&self, idx: u32) -> u32 {
        if idx == NIL {
            NIL
        } else {
            self.node(idx).parent
        }
    }

    /// NIL counts as black
    fn is_red(&self, idx: u32) -> bool {
        idx != NIL && self.node(idx).red
    }

    fn set_red(&mut self, idx: u32, red: bool) {
        if idx != NIL {
            self.node_mut(idx).red = red;
        }
    }

    fn alloc(&mut self, node: TreeNode<K, V>) -> u32 {
        if let Some(idx) = self.free.pop() {
            self.slots[idx as usize] = Some(node);
            idx
        } else {
            self.slots.push(Some(node));
            (self.slots.len() - 1) as u32
        }
    }

    /// Locate a key, probing both subtrees on hash ties
    pub(crate) fn find<Q>(&self, hash: u64, key: &Q) -> Option<u32>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        self.find_from(self.root, hash, key)
    }

    fn find_from<Q>(&self, at: u32, hash: u64, key: &Q) -> Option<u32>
    where
        K: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        if at == NIL {
            return None;
        }
        let node = self.node(at);
        if hash < node.hash {
            self.find_from(node.left, hash, key)
        } else if hash > node.hash {
            self.find_from(node.right, hash, key)
        } else if node.key.borrow() == key {
            Some(at)
        } else {
            // equal hashes straddle the seq tie-break, so check both sides
            self.find_from(node.left, hash, key)
                .or_else(|| self.find_from(node.right, hash, key))
        }
    }

    /// Insert or overwrite; returns the old value when the key was present
    pub(crate) fn insert(&mut self, hash: u64, key: K, value: V) -> Option<V>
    where
        K: Eq,
    {
        if let Some(idx) = self.find(hash, &key) {
            return Some(std::mem::replace(&mut self.node_mut(idx).value, value));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        let idx = self.alloc(TreeNode {
            hash,
            seq,
            key,
            value,
            parent: NIL,
            left: NIL,
            right: NIL,
            prev: self.tail,
            next: NIL,
            red: true,
        });

        // arrival thread
        if self.tail == NIL {
            self.head = idx;
        } else {
            self.node_mut(self.tail).next = idx;
        }
        self.tail = idx;

        // BST descent on (hash, seq)
        if self.root == NIL {
            self.root = idx;
        } else {
            let mut at = self.root;
            loop {
                let n = self.node(at);
                let go_left = hash < n.hash || (hash == n.hash && seq < n.seq);
                let child = if go_left { n.left } else { n.right };
                if child == NIL {
                    if go_left {
                        self.node_mut(at).left = idx;
                    } else {
                        self.node_mut(at).right = idx;
                    }
                    self.node_mut(idx).parent = at;
                    break;
                }
                at = child;
            }
        }

        self.len += 1;
        self.insert_fixup(idx);
        None
    }

    /// Remove a node, returning its pair
    pub(crate) fn remove_at(&mut self, z: u32) -> (K, V) {
        // unlink from the arrival thread
        let (prev, next) = {
            let n = self.node(z);
            (n.prev, n.next)
        };
        if prev == NIL {
            self.head = next;
        } else {
            self.node_mut(prev).next = next;
        }
        if next == NIL {
            self.tail = prev;
        } else {
            self.node_mut(next).prev = prev;
        }

        // standard red-black deletion over arena indices
        let (x, xp, removed_black);
        let zl = self.left(z);
        let zr = self.right(z);
        if zl == NIL {
            x = zr;
            xp = self.parent(z);
            removed_black = !self.node(z).red;
            self.transplant(z, zr);
        } else if zr == NIL {
            x = zl;
            xp = self.parent(z);
            removed_black = !self.node(z).red;
            self.transplant(z, zl);
        } else {
            let y = self.minimum(zr);
            removed_black = !self.node(y).red;
            x = self.right(y);
            if self.parent(y) == z {
                xp = y;
            } else {
                xp = self.parent(y);
                self.transplant(y, x);
                let zr = self.right(z);
                self.node_mut(y).right = zr;
                self.node_mut(zr).parent = y;
            }
            self.transplant(z, y);
            let zl = self.left(z);
            self.node_mut(y).left = zl;
            self.node_mut(zl).parent = y;
            let z_red = self.node(z).red;
            self.node_mut(y).red = z_red;
        }
        if removed_black {
            self.delete_fixup(x, xp);
        }

        self.len -= 1;
        let node = self.slots[z as usize].take().expect("live tree node");
        self.free.push(z);
        (node.key, node.value)
    }

    /// Move everything out in arrival order
    pub(crate) fn into_entries(mut self) -> Vec<Entry<K, V>> {
        let mut order = Vec::with_capacity(self.len);
        let mut at = self.head;
        while at != NIL {
            order.push(at);
            at = self.node(at).next;
        }
        order
            .into_iter()
            .map(|idx| {
                let node = self.slots[idx as usize].take().expect("live tree node");
                Entry {
                    hash: node.hash,
                    key: node.key,
                    value: node.value,
                }
            })
            .collect()
    }

    fn minimum(&self, mut at: u32) -> u32 {
        while self.left(at) != NIL {
            at = self.left(at);
        }
        at
    }

    /// Replace the subtree rooted at `u` with the one rooted at `v`
    fn transplant(&mut self, u: u32, v: u32) {
        let up = self.parent(u);
        if up == NIL {
            self.root = v;
        } else if self.left(up) == u {
            self.node_mut(up).left = v;
        } else {
            self.node_mut(up).right = v;
        }
        if v != NIL {
            self.node_mut(v).parent = up;
        }
    }

    fn rotate_left(&mut self, x: u32) {
        let y = self.right(x);
        debug_assert_ne!(y, NIL);
        let yl = self.left(y);
        self.node_mut(x).right = yl;
        if yl != NIL {
            self.node_mut(yl).parent = x;
        }
        let xp = self.parent(x);
        self.node_mut(y).parent = xp;
        if xp == NIL {
            self.root = y;
        } else if self.left(xp) == x {
            self.node_mut(xp).left = y;
        } else {
            self.node_mut(xp).right = y;
        }
        self.node_mut(y).left = x;
        self.node_mut(x).parent = y;
    }

    fn rotate_right(&mut self, x: u32) {
        let y = self.left(x);
        debug_assert_ne!(y, NIL);
        let yr = self.right(y);
        self.node_mut(x).left = yr;
        if yr != NIL {
            self.node_mut(yr).parent = x;
        }
        let xp = self.parent(x);
        self.node_mut(y).parent = xp;
        if xp == NIL {
            self.root = y;
        } else if self.right(xp) == x {
            self.node_mut(xp).right = y;
        } else {
            self.node_mut(xp).left = y;
        }
        self.node_mut(y).right = x;
        self.node_mut(x).parent = y;
    }

    fn insert_fixup(&mut self, mut z: u32) {
        while self.is_red(self.parent(z)) {
            let zp = self.parent(z);
            let zpp = self.parent(zp);
            if zp == self.left(zpp) {
                let uncle = self.right(zpp);
                if self.is_red(uncle) {
                    self.set_red(zp, false);
                    self.set_red(uncle, false);
                    self.set_red(zpp, true);
                    z = zpp;
                } else {
                    if z == self.right(zp) {
                        z = zp;
                        self.rotate_left(z);
                    }
                    let zp = self.parent(z);
                    let zpp = self.parent(zp);
                    self.set_red(zp, false);
                    self.set_red(zpp, true);
                    self.rotate_right(zpp);
                }
            } else {
                let uncle = self.left(zpp);
                if self.is_red(uncle) {
                    self.set_red(zp, false);
                    self.set_red(uncle, false);
                    self.set_red(zpp, true);
                    z = zpp;
                } else {
                    if z == self.left(zp) {
                        z = zp;
                        self.rotate_right(z);
                    }
                    let zp = self.parent(z);
                    let zpp = self.parent(zp);
                    self.set_red(zp, false);
                    self.set_red(zpp, true);
                    self.rotate_left(zpp);
                }
            }
        }
        let root = self.root;
        self.set_red(root, false);
    }

    /// `x` may be NIL; `xp` is its parent after the transplant
    fn delete_fixup(&mut self, mut x: u32, mut xp: u32) {
        while x != self.root && !self.is_red(x) {
            if xp == NIL {
                break;
            }
            if x == self.left(xp) {
                let mut w = self.right(xp);
                if self.is_red(w) {
                    self.set_red(w, false);
                    self.set_red(xp, true);
                    self.rotate_left(xp);
                    w = self.right(xp);
                }
                if !self.is_red(self.left(w)) && !self.is_red(self.right(w)) {
                    self.set_red(w, true);
                    x = xp;
                    xp = self.parent(x);
                } else {
                    if !self.is_red(self.right(w)) {
                        let wl = self.left(w);
                        self.set_red(wl, false);
                        self.set_red(w, true);
                        self.rotate_right(w);
                        w = self.right(xp);
                    }
                    let xp_red = self.is_red(xp);
                    self.set_red(w, xp_red);
                    self.set_red(xp, false);
                    let wr = self.right(w);
                    self.set_red(wr, false);
                    self.rotate_left(xp);
                    x = self.root;
                    xp = NIL;
                }
            } else {
                let mut w = self.left(xp);
                if self.is_red(w) {
                    self.set_red(w, false);
                    self.set_red(xp, true);
                    self.rotate_right(xp);
                    w = self.left(xp);
                }
                if !self.is_red(self.left(w)) && !self.is_red(self.right(w)) {
                    self.set_red(w, true);
                    x = xp;
                    xp = self.parent(x);
                } else {
                    if !self.is_red(self.left(w)) {
                        let wr = self.right(w);
                        self.set_red(wr, false);
                        self.set_red(w, true);
                        self.rotate_left(w);
                        w = self.left(xp);
                    }
                    let xp_red = self.is_red(xp);
                    self.set_red(w, xp_red);
                    self.set_red(xp, false);
                    let wl = self.left(w);
                    self.set_red(wl, false);
                    self.rotate_right(xp);
                    x = self.root;
                    xp = NIL;
                }
            }
        }
        self.set_red(x, false);
    }

    /// Red-black invariant check used by tests
    #[cfg(test)]
    pub(crate) fn check_invariants(&self) {
        assert!(!self.is_red(self.root), "root must be black");
        self.black_height(self.root);
        // thread covers exactly the live nodes
        let mut seen = 0;
        let mut at = self.head;
        while at != NIL {
            seen += 1;
            at = self.node(at).next;
        }
        assert_eq!(seen, self.len);
    }

    #[cfg(test)]
    fn black_height(&self, at: u32) -> usize {
        if at == NIL {
            return 1;
        }
        let node = self.node(at);
        if node.red {
            assert!(!self.is_red(node.left), "red node with red left child");
            assert!(!self.is_red(node.right), "red node with red right child");
        }
        if node.left != NIL {
            assert_eq!(self.node(node.left).parent, at);
        }
        if node.right != NIL {
            assert_eq!(self.node(node.right).parent, at);
        }
        let lh = self.black_height(node.left);
        let rh = self.black_height(node.right);
        assert_eq!(lh, rh, "unequal black heights");
        lh + if node.red { 0 } else { 1 }
    }
}
