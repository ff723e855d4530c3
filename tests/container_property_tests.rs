//! Property-based testing for the collection engines
//!
//! Validates each engine against its std counterpart as a model under
//! randomized operation sequences, plus the structural invariants the
//! engines promise: amortized growth bounds, the heap property, and
//! dump/restore round-trips.

use coffer::{
    BinHashMap, DynVec, LinkedSeq, PriorityHeap, RingDeque, SliceDataInput, VecDataOutput,
};
use proptest::prelude::*;
use std::collections::{BinaryHeap, HashMap, VecDeque};

// =============================================================================
// OPERATION GENERATORS
// =============================================================================

#[derive(Debug, Clone)]
enum SeqOp {
    Push(i32),
    Pop,
    Insert(usize, i32),
    Remove(usize),
    Set(usize, i32),
}

fn seq_ops() -> impl Strategy<Value = Vec<SeqOp>> {
    prop::collection::vec(
        prop_oneof![
            any::<i32>().prop_map(SeqOp::Push),
            Just(SeqOp::Pop),
            (0usize..64, any::<i32>()).prop_map(|(i, x)| SeqOp::Insert(i, x)),
            (0usize..64).prop_map(SeqOp::Remove),
            (0usize..64, any::<i32>()).prop_map(|(i, x)| SeqOp::Set(i, x)),
        ],
        0..300,
    )
}

#[derive(Debug, Clone)]
enum DequeOp {
    PushFront(i32),
    PushBack(i32),
    PopFront,
    PopBack,
}

fn deque_ops() -> impl Strategy<Value = Vec<DequeOp>> {
    prop::collection::vec(
        prop_oneof![
            any::<i32>().prop_map(DequeOp::PushFront),
            any::<i32>().prop_map(DequeOp::PushBack),
            Just(DequeOp::PopFront),
            Just(DequeOp::PopBack),
        ],
        0..500,
    )
}

#[derive(Debug, Clone)]
enum MapOp {
    Put(u16, i32),
    Remove(u16),
    Clear,
}

fn map_ops() -> impl Strategy<Value = Vec<MapOp>> {
    prop::collection::vec(
        prop_oneof![
            8 => (any::<u16>(), any::<i32>()).prop_map(|(k, v)| MapOp::Put(k, v)),
            4 => any::<u16>().prop_map(MapOp::Remove),
            1 => Just(MapOp::Clear),
        ],
        0..400,
    )
}

// =============================================================================
// MODEL-BASED EQUIVALENCE
// =============================================================================

proptest! {
    #[test]
    fn prop_dynvec_matches_vec(ops in seq_ops()) {
        let mut dv: DynVec<i32> = DynVec::new();
        let mut model: Vec<i32> = Vec::new();
        for op in ops {
            match op {
                SeqOp::Push(x) => {
                    dv.push(x).unwrap();
                    model.push(x);
                }
                SeqOp::Pop => {
                    prop_assert_eq!(dv.pop(), model.pop());
                }
                SeqOp::Insert(i, x) => {
                    let ok = dv.insert(i, x).is_ok();
                    prop_assert_eq!(ok, i <= model.len());
                    if ok {
                        model.insert(i, x);
                    }
                }
                SeqOp::Remove(i) => {
                    if i < model.len() {
                        prop_assert_eq!(dv.remove(i).unwrap(), model.remove(i));
                    } else {
                        prop_assert!(dv.remove(i).is_err());
                    }
                }
                SeqOp::Set(i, x) => {
                    if i < model.len() {
                        prop_assert_eq!(dv.set(i, x).unwrap(), model[i]);
                        model[i] = x;
                    } else {
                        prop_assert!(dv.set(i, x).is_err());
                    }
                }
            }
            prop_assert_eq!(dv.len(), model.len());
        }
        prop_assert_eq!(dv.as_slice(), model.as_slice());
    }

    #[test]
    fn prop_linked_seq_matches_vec(ops in seq_ops()) {
        let mut ls: LinkedSeq<i32> = LinkedSeq::new();
        let mut model: Vec<i32> = Vec::new();
        for op in ops {
            match op {
                SeqOp::Push(x) => {
                    ls.push_back(x).unwrap();
                    model.push(x);
                }
                SeqOp::Pop => {
                    prop_assert_eq!(ls.pop_back(), model.pop());
                }
                SeqOp::Insert(i, x) => {
                    let ok = ls.insert(i, x).is_ok();
                    prop_assert_eq!(ok, i <= model.len());
                    if ok {
                        model.insert(i, x);
                    }
                }
                SeqOp::Remove(i) => {
                    if i < model.len() {
                        prop_assert_eq!(ls.remove_at(i).unwrap(), model.remove(i));
                    } else {
                        prop_assert!(ls.remove_at(i).is_err());
                    }
                }
                SeqOp::Set(i, x) => {
                    if i < model.len() {
                        prop_assert_eq!(ls.set(i, x).unwrap(), model[i]);
                        model[i] = x;
                    } else {
                        prop_assert!(ls.set(i, x).is_err());
                    }
                }
            }
        }
        let collected: Vec<i32> = ls.iter().copied().collect();
        prop_assert_eq!(collected, model);
    }

    #[test]
    fn prop_ring_deque_matches_vecdeque(ops in deque_ops()) {
        let mut rd: RingDeque<i32> = RingDeque::new();
        let mut model: VecDeque<i32> = VecDeque::new();
        for op in ops {
            match op {
                DequeOp::PushFront(x) => {
                    rd.push_front(x).unwrap();
                    model.push_front(x);
                }
                DequeOp::PushBack(x) => {
                    rd.push_back(x).unwrap();
                    model.push_back(x);
                }
                DequeOp::PopFront => {
                    prop_assert_eq!(rd.pop_front(), model.pop_front());
                }
                DequeOp::PopBack => {
                    prop_assert_eq!(rd.pop_back(), model.pop_back());
                }
            }
            prop_assert_eq!(rd.len(), model.len());
            prop_assert_eq!(rd.front(), model.front());
            prop_assert_eq!(rd.back(), model.back());
        }
        let collected: Vec<i32> = rd.iter().copied().collect();
        let expected: Vec<i32> = model.iter().copied().collect();
        prop_assert_eq!(collected, expected);
    }

    #[test]
    fn prop_map_matches_hashmap(ops in map_ops()) {
        let mut bm: BinHashMap<u16, i32> = BinHashMap::new();
        let mut model: HashMap<u16, i32> = HashMap::new();
        for op in ops {
            match op {
                MapOp::Put(k, v) => {
                    prop_assert_eq!(bm.put(k, v), model.insert(k, v));
                }
                MapOp::Remove(k) => {
                    prop_assert_eq!(bm.remove(&k), model.remove(&k));
                }
                MapOp::Clear => {
                    bm.clear();
                    model.clear();
                }
            }
            prop_assert_eq!(bm.len(), model.len());
        }
        for (k, v) in &model {
            prop_assert_eq!(bm.get(k), Some(v));
        }
        prop_assert_eq!(bm.iter().count(), model.len());
    }

    #[test]
    fn prop_heap_drains_sorted(elements in prop::collection::vec(any::<i32>(), 0..500)) {
        let mut heap: PriorityHeap<i32> = PriorityHeap::new();
        let mut model = BinaryHeap::new();
        for &x in &elements {
            heap.offer(x).unwrap();
            model.push(std::cmp::Reverse(x));
        }
        prop_assert_eq!(heap.peek(), model.peek().map(|r| &r.0));
        while let Some(x) = heap.poll() {
            prop_assert_eq!(Some(x), model.pop().map(|r| r.0));
        }
        prop_assert!(model.is_empty());
    }
}

// =============================================================================
// STRUCTURAL INVARIANTS
// =============================================================================

proptest! {
    #[test]
    fn prop_dynvec_growth_is_amortized(n in 1usize..5000) {
        let mut dv = DynVec::new();
        for i in 0..n {
            dv.push(i).unwrap();
        }
        prop_assert!(dv.capacity() >= dv.len());
        // 1.5x growth never leaves more than half the length as slack
        // (plus the minimum allocation)
        prop_assert!(dv.capacity() <= dv.len() + dv.len() / 2 + 4);
    }

    #[test]
    fn prop_ring_capacity_is_power_of_two(ops in deque_ops()) {
        let mut rd: RingDeque<i32> = RingDeque::new();
        for op in ops {
            match op {
                DequeOp::PushFront(x) => rd.push_front(x).unwrap(),
                DequeOp::PushBack(x) => rd.push_back(x).unwrap(),
                DequeOp::PopFront => {
                    rd.pop_front();
                }
                DequeOp::PopBack => {
                    rd.pop_back();
                }
            }
            prop_assert!(rd.capacity().is_power_of_two());
            prop_assert!(rd.len() <= rd.capacity());
        }
    }

    #[test]
    fn prop_heap_property_holds_under_removal(
        elements in prop::collection::vec(0i32..100, 1..200),
        victims in prop::collection::vec(0i32..100, 0..50),
    ) {
        let mut heap: PriorityHeap<i32> = PriorityHeap::new();
        for &x in &elements {
            heap.offer(x).unwrap();
        }
        for v in &victims {
            heap.remove_item(v);
            let items = heap.as_slice();
            for i in 1..items.len() {
                prop_assert!(items[(i - 1) / 2] <= items[i]);
            }
        }
    }

    #[test]
    fn prop_map_split_preserves_residency(keys in prop::collection::hash_set(any::<u32>(), 0..2000)) {
        // force several resizes from a small table
        let mut map = BinHashMap::with_capacity(1).unwrap();
        for &k in &keys {
            map.put(k, u64::from(k) * 3);
        }
        prop_assert_eq!(map.len(), keys.len());
        for &k in &keys {
            prop_assert_eq!(map.get(&k), Some(&(u64::from(k) * 3)));
        }
    }
}

// =============================================================================
// DUMP / RESTORE ROUND-TRIPS
// =============================================================================

proptest! {
    #[test]
    fn prop_sequence_dumps_round_trip(elements in prop::collection::vec(any::<u32>(), 0..300)) {
        let mut vec = DynVec::new();
        let mut seq = LinkedSeq::new();
        let mut deque = RingDeque::new();
        for &x in &elements {
            vec.push(x).unwrap();
            seq.push_back(x).unwrap();
            deque.push_back(x).unwrap();
        }

        let mut out = VecDataOutput::new();
        vec.dump(&mut out).unwrap();
        seq.dump(&mut out).unwrap();
        deque.dump(&mut out).unwrap();

        let bytes = out.into_vec();
        let mut input = SliceDataInput::new(&bytes);
        prop_assert_eq!(DynVec::<u32>::restore(&mut input).unwrap(), vec);
        prop_assert_eq!(LinkedSeq::<u32>::restore(&mut input).unwrap(), seq);
        prop_assert_eq!(RingDeque::<u32>::restore(&mut input).unwrap(), deque);
        prop_assert!(!input.has_more());
    }

    #[test]
    fn prop_map_dump_round_trips(pairs in prop::collection::hash_map(any::<u32>(), any::<i64>(), 0..300)) {
        let mut map = BinHashMap::new();
        for (&k, &v) in &pairs {
            map.put(k, v);
        }
        let mut out = VecDataOutput::new();
        map.dump(&mut out).unwrap();
        let bytes = out.into_vec();
        let mut input = SliceDataInput::new(&bytes);
        let restored: BinHashMap<u32, i64> = BinHashMap::restore(&mut input).unwrap();
        prop_assert_eq!(&map, &restored);
        prop_assert_eq!(map.capacity(), restored.capacity());
    }

    #[test]
    fn prop_heap_dump_preserves_drain_order(elements in prop::collection::vec(any::<i32>(), 0..300)) {
        let mut heap: PriorityHeap<i32> = PriorityHeap::new();
        for &x in &elements {
            heap.offer(x).unwrap();
        }
        let mut out = VecDataOutput::new();
        heap.dump(&mut out).unwrap();
        let bytes = out.into_vec();
        let mut input = SliceDataInput::new(&bytes);
        let mut restored: PriorityHeap<i32> = PriorityHeap::restore(&mut input).unwrap();

        while let Some(expected) = heap.poll() {
            prop_assert_eq!(restored.poll(), Some(expected));
        }
        prop_assert_eq!(restored.poll(), None);
    }
}
