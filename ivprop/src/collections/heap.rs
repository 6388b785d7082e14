use crate::collections::ref_store::Ref;
use std::cmp::Ordering;
use std::marker::PhantomData;

#[derive(Copy, Clone, Debug)]
struct HeapEntry<K> {
    key: K,
    cost: f64,
}

impl<K> HeapEntry<K> {
    fn new(key: K, cost: f64) -> Self {
        HeapEntry { key, cost }
    }

    /// Total order on costs: lower cost first, NaN last.
    fn cmp_cost(&self, other: &Self) -> Ordering {
        self.cost.total_cmp(&other.cost)
    }
}

/// A binary min-heap of keys ordered by a cached `f64` cost.
///
/// The heap keeps track of the place of each key, which allows removing an arbitrary key
/// in `O(log n)`. This is what allows the same element to live in several heaps at once:
/// removing it from one ordering only requires its key to remove it from the others.
#[derive(Clone, Debug)]
pub struct IdxHeap<K> {
    heap: Vec<HeapEntry<K>>,
    /// Place in `heap` of each key, `None` if the key is not enqueued.
    index: Vec<Option<PlaceInHeap>>,
    phantom: PhantomData<K>,
}

type PlaceInHeap = usize;
fn above(i: usize) -> usize {
    debug_assert!(i > 0);
    (i - 1) >> 1
}
#[inline]
fn below_left(i: usize) -> usize {
    (i << 1) + 1
}
#[inline]
fn below_right(i: usize) -> usize {
    (i << 1) + 2
}

impl<K: Ref> Default for IdxHeap<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Ref> IdxHeap<K> {
    pub fn new() -> Self {
        IdxHeap {
            heap: Vec::new(),
            index: Vec::new(),
            phantom: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn contains(&self, key: K) -> bool {
        self.place(key).is_some()
    }

    /// Cost with which `key` was enqueued.
    pub fn cost(&self, key: K) -> Option<f64> {
        self.place(key).map(|p| self.heap[p].cost)
    }

    /// All enqueued keys with their costs, in no particular order.
    pub fn entries(&self) -> impl Iterator<Item = (K, f64)> + '_ {
        self.heap.iter().map(|e| (e.key, e.cost))
    }

    /// Returns the key with the lowest cost.
    pub fn peek(&self) -> Option<(K, f64)> {
        self.heap.first().map(|e| (e.key, e.cost))
    }

    pub fn push(&mut self, key: K, cost: f64) {
        debug_assert!(!self.contains(key), "Key already enqueued");
        let place = self.heap.len();
        self.heap.push(HeapEntry::new(key, cost));
        self.set_place(key, Some(place));
        self.sift_up(place);
    }

    pub fn pop(&mut self) -> Option<(K, f64)> {
        let (first, _) = self.peek()?;
        let cost = self.remove(first)?;
        Some((first, cost))
    }

    /// Removes `key` from the heap, returning the cost it was enqueued with.
    pub fn remove(&mut self, key: K) -> Option<f64> {
        let place = self.place(key)?;
        let last = self.heap.len() - 1;
        self.swap(place, last);
        let removed = self.heap.pop()?;
        debug_assert!(removed.key == key);
        self.set_place(key, None);
        if place < self.heap.len() {
            self.sift_after_cost_change(place);
        }
        Some(removed.cost)
    }

    pub fn clear(&mut self) {
        self.heap.clear();
        self.index.clear();
    }

    /// Replaces the content of the heap with the given entries, in `O(n)`.
    pub fn rebuild(&mut self, entries: impl IntoIterator<Item = (K, f64)>) {
        self.clear();
        for (key, cost) in entries {
            let place = self.heap.len();
            self.heap.push(HeapEntry::new(key, cost));
            self.set_place(key, Some(place));
        }
        for place in (0..self.heap.len() / 2).rev() {
            self.sift_down(place);
        }
    }

    fn place(&self, key: K) -> Option<PlaceInHeap> {
        self.index.get(key.into()).copied().flatten()
    }

    fn set_place(&mut self, key: K, place: Option<PlaceInHeap>) {
        let i: usize = key.into();
        if self.index.len() <= i {
            self.index.resize(i + 1, None);
        }
        self.index[i] = place;
    }

    fn swap(&mut self, a: PlaceInHeap, b: PlaceInHeap) {
        if a != b {
            self.heap.swap(a, b);
            let (ka, kb) = (self.heap[a].key, self.heap[b].key);
            self.set_place(ka, Some(a));
            self.set_place(kb, Some(b));
        }
    }

    fn less(&self, a: PlaceInHeap, b: PlaceInHeap) -> bool {
        self.heap[a].cmp_cost(&self.heap[b]) == Ordering::Less
    }

    fn sift_after_cost_change(&mut self, place: PlaceInHeap) {
        self.sift_down(place);
        self.sift_up(place);
    }

    fn sift_up(&mut self, mut pos: PlaceInHeap) {
        while pos > 0 {
            let parent = above(pos);
            if self.less(pos, parent) {
                self.swap(pos, parent);
                pos = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut pos: PlaceInHeap) {
        let len = self.heap.len();
        loop {
            let left = below_left(pos);
            if left >= len {
                return;
            }
            let right = below_right(pos);
            // select as child the one with the lowest cost
            let child = if right < len && self.less(right, left) { right } else { left };
            if !self.less(child, pos) {
                // we are in order, exit
                return;
            }
            self.swap(pos, child);
            pos = child;
        }
    }

    #[cfg(test)]
    fn check_invariants(&self) {
        for place in 1..self.heap.len() {
            assert!(!self.less(place, above(place)), "heap order violated at {place}");
        }
        for (place, e) in self.heap.iter().enumerate() {
            assert_eq!(self.place(e.key), Some(place));
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::prelude::StdRng;
    use rand::{Rng, SeedableRng};

    const N: usize = 100;

    #[test]
    fn test_heap_insertion_removal() {
        let mut rng = StdRng::seed_from_u64(79837224973);
        let mut heap: IdxHeap<usize> = IdxHeap::new();

        let costs: Vec<f64> = (0..N).map(|_| rng.random_range(-100..100) as f64).collect();
        for (i, &c) in costs.iter().enumerate() {
            heap.push(i, c);
            heap.check_invariants();
        }
        assert_eq!(heap.len(), N);

        // remove a random third of the keys from the middle of the heap
        let mut removed = Vec::new();
        for i in 0..N {
            if rng.random_bool(0.3) {
                assert_eq!(heap.remove(i), Some(costs[i]));
                heap.check_invariants();
                removed.push(i);
            }
        }
        assert_eq!(heap.len(), N - removed.len());
        for &i in &removed {
            assert!(!heap.contains(i));
            assert_eq!(heap.remove(i), None);
        }

        let mut previous = f64::NEG_INFINITY;
        while let Some((key, cost)) = heap.pop() {
            assert_eq!(cost, costs[key]);
            assert!(cost >= previous, "cost: {cost}   prev: {previous}");
            previous = cost;
            heap.check_invariants();
        }
        assert!(heap.is_empty());
    }

    #[test]
    fn test_rebuild() {
        let mut heap: IdxHeap<usize> = IdxHeap::new();
        heap.push(7, 1.0);
        heap.rebuild([(0, 5.0), (1, 3.0), (2, 4.0), (3, -1.0), (4, 3.5)]);
        heap.check_invariants();
        assert!(!heap.contains(7));
        assert_eq!(heap.peek(), Some((3, -1.0)));
        let order: Vec<usize> = std::iter::from_fn(|| heap.pop().map(|(k, _)| k)).collect();
        assert_eq!(order, vec![3, 1, 4, 2, 0]);
    }
}
