use crate::collections::heap::IdxHeap;
use crate::params::{self, check_balance, ConfigError};
use crate::search::CostFunction;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

/// Raised when accessing the elements of an empty heap.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[error("access to an empty heap")]
pub struct EmptyHeap;

crate::create_ref_type!(SlotId);

/// A queue whose elements are ordered by two cost functions at once.
///
/// Every element is present in two heaps, one for each ordering, so that the minimum of either
/// ordering can be extracted. Removing an element from one ordering removes it from the other.
/// The queue owns its elements.
///
/// Costs are computed when an element is pushed and cached. The costs of a volatile cost function
/// are recomputed by [`DoubleHeap::contract`] and [`DoubleHeap::refresh`].
pub struct DoubleHeap<T, C1, C2> {
    slots: Vec<Option<T>>,
    free_slots: Vec<SlotId>,
    heap1: IdxHeap<SlotId>,
    heap2: IdxHeap<SlotId>,
    cost1: C1,
    cost2: C2,
    /// Percentage of the elements returned by [`DoubleHeap::pop`] that are taken from the second ordering.
    balance: f64,
    rng: SmallRng,
}

impl<T, C1: CostFunction<T>, C2: CostFunction<T>> DoubleHeap<T, C1, C2> {
    /// Creates an empty queue. `balance` (in `[0, 100]`) is the percentage of the elements popped by
    /// [`DoubleHeap::pop`] that are the minimum of the second ordering.
    pub fn new(cost1: C1, cost2: C2, balance: f64) -> Result<Self, ConfigError> {
        Ok(DoubleHeap {
            slots: Vec::new(),
            free_slots: Vec::new(),
            heap1: IdxHeap::new(),
            heap2: IdxHeap::new(),
            cost1,
            cost2,
            balance: check_balance(balance)?,
            rng: SmallRng::seed_from_u64(params::HEAP_SEED.get()),
        })
    }

    /// Creates an empty queue whose balance is read from `IVPROP_HEAP_BALANCE`.
    pub fn with_default_balance(cost1: C1, cost2: C2) -> Result<Self, ConfigError> {
        Self::new(cost1, cost2, params::HEAP_BALANCE.get())
    }

    /// Reseeds the random generator used by [`DoubleHeap::pop`].
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    pub fn len(&self) -> usize {
        debug_assert_eq!(self.heap1.len(), self.heap2.len());
        self.heap1.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All elements of the queue, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.slots.iter().filter_map(|s| s.as_ref())
    }

    pub fn push(&mut self, item: T) {
        let c1 = self.cost1.cost(&item);
        let c2 = self.cost2.cost(&item);
        let slot = match self.free_slots.pop() {
            Some(slot) => {
                self.slots[usize::from(slot)] = Some(item);
                slot
            }
            None => {
                self.slots.push(Some(item));
                SlotId::from(self.slots.len() - 1)
            }
        };
        self.heap1.push(slot, c1);
        self.heap2.push(slot, c2);
    }

    fn release(&mut self, slot: SlotId) -> Option<T> {
        let item = self.slots[usize::from(slot)].take();
        self.free_slots.push(slot);
        item
    }

    fn item(&self, slot: SlotId) -> Result<&T, EmptyHeap> {
        self.slots[usize::from(slot)].as_ref().ok_or(EmptyHeap)
    }

    /// Removes and returns the element with the lowest first cost.
    pub fn pop1(&mut self) -> Result<T, EmptyHeap> {
        let (slot, _) = self.heap1.pop().ok_or(EmptyHeap)?;
        self.heap2.remove(slot);
        self.release(slot).ok_or(EmptyHeap)
    }

    /// Removes and returns the element with the lowest second cost.
    pub fn pop2(&mut self) -> Result<T, EmptyHeap> {
        let (slot, _) = self.heap2.pop().ok_or(EmptyHeap)?;
        self.heap1.remove(slot);
        self.release(slot).ok_or(EmptyHeap)
    }

    /// Removes and returns the minimum of the second ordering with probability `balance`%, and the
    /// minimum of the first one otherwise.
    pub fn pop(&mut self) -> Result<T, EmptyHeap> {
        if self.is_empty() {
            return Err(EmptyHeap);
        }
        if self.rng.random_bool(self.balance / 100.0) {
            self.pop2()
        } else {
            self.pop1()
        }
    }

    /// Lowest first cost.
    pub fn minimum1(&self) -> Result<f64, EmptyHeap> {
        self.heap1.peek().map(|(_, cost)| cost).ok_or(EmptyHeap)
    }

    /// Lowest second cost.
    pub fn minimum2(&self) -> Result<f64, EmptyHeap> {
        self.heap2.peek().map(|(_, cost)| cost).ok_or(EmptyHeap)
    }

    /// Element with the lowest first cost.
    pub fn top1(&self) -> Result<&T, EmptyHeap> {
        let (slot, _) = self.heap1.peek().ok_or(EmptyHeap)?;
        self.item(slot)
    }

    /// Element with the lowest second cost.
    pub fn top2(&self) -> Result<&T, EmptyHeap> {
        let (slot, _) = self.heap2.peek().ok_or(EmptyHeap)?;
        self.item(slot)
    }

    /// Removes (and drops) all elements whose first cost is strictly greater than `bound`.
    ///
    /// The first cost is recomputed beforehand if it is volatile. Afterwards, all volatile costs of
    /// the remaining elements are up to date.
    pub fn contract(&mut self, bound: f64) {
        let mut kept: Vec<(SlotId, f64)> = Vec::with_capacity(self.len());
        let mut pruned: Vec<SlotId> = Vec::new();
        for (slot, cached) in self.heap1.entries() {
            let cost = match self.slots[usize::from(slot)].as_ref() {
                Some(item) if self.cost1.is_volatile() => self.cost1.cost(item),
                _ => cached,
            };
            if cost > bound {
                pruned.push(slot);
            } else {
                kept.push((slot, cost));
            }
        }
        let num_pruned = pruned.len();
        for slot in pruned {
            self.release(slot);
        }
        let kept2: Vec<(SlotId, f64)> = kept
            .iter()
            .map(|&(slot, _)| {
                let cost = match self.slots[usize::from(slot)].as_ref() {
                    Some(item) if self.cost2.is_volatile() => self.cost2.cost(item),
                    _ => self.heap2.cost(slot).unwrap_or(f64::INFINITY),
                };
                (slot, cost)
            })
            .collect();
        self.heap1.rebuild(kept);
        self.heap2.rebuild(kept2);
        trace!("contract({bound}): {num_pruned} element(s) pruned, {} left", self.len());
    }

    /// Recomputes the volatile costs of all elements, typically after an update of the loup.
    pub fn refresh(&mut self) {
        if self.cost1.is_volatile() {
            let entries: Vec<(SlotId, f64)> = self
                .heap1
                .entries()
                .map(|(slot, cached)| match self.slots[usize::from(slot)].as_ref() {
                    Some(item) => (slot, self.cost1.cost(item)),
                    None => (slot, cached),
                })
                .collect();
            self.heap1.rebuild(entries);
        }
        if self.cost2.is_volatile() {
            let entries: Vec<(SlotId, f64)> = self
                .heap2
                .entries()
                .map(|(slot, cached)| match self.slots[usize::from(slot)].as_ref() {
                    Some(item) => (slot, self.cost2.cost(item)),
                    None => (slot, cached),
                })
                .collect();
            self.heap2.rebuild(entries);
        }
    }

    /// Removes (and drops) all elements.
    pub fn flush(&mut self) {
        self.slots.clear();
        self.free_slots.clear();
        self.heap1.clear();
        self.heap2.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Interval;
    use crate::search::{Loup, Volatile};

    fn diam(i: &Interval) -> f64 {
        i.diam()
    }

    fn lb(i: &Interval) -> f64 {
        i.lb()
    }

    #[test]
    fn test_balance() {
        assert!(DoubleHeap::<Interval, _, _>::new(diam, lb, 101.0).is_err());
        assert!(DoubleHeap::<Interval, _, _>::new(diam, lb, -0.5).is_err());
        assert!(DoubleHeap::<Interval, _, _>::with_default_balance(diam, lb).is_ok());

        // all from the first ordering
        let mut h = DoubleHeap::new(diam, lb, 0.0).unwrap();
        h.push(Interval::new(0.0, 10.0));
        h.push(Interval::new(5.0, 6.0));
        assert_eq!(h.pop(), Ok(Interval::new(5.0, 6.0)));

        // all from the second ordering
        let mut h = DoubleHeap::new(diam, lb, 100.0).unwrap();
        h.push(Interval::new(0.0, 10.0));
        h.push(Interval::new(5.0, 6.0));
        assert_eq!(h.pop(), Ok(Interval::new(0.0, 10.0)));
        assert_eq!(h.pop(), Ok(Interval::new(5.0, 6.0)));
        assert_eq!(h.pop(), Err(EmptyHeap));
    }

    #[test]
    fn test_slots_are_reused() {
        let mut h = DoubleHeap::new(diam, lb, 50.0).unwrap().with_seed(7);
        for i in 0..10 {
            h.push(Interval::new(i as f64, 2.0 * i as f64));
        }
        for _ in 0..5 {
            h.pop().unwrap();
        }
        for i in 0..5 {
            h.push(Interval::new(i as f64, i as f64 + 1.0));
        }
        assert_eq!(h.len(), 10);
        assert_eq!(h.slots.len(), 10);
        assert_eq!(h.iter().count(), 10);
    }

    #[test]
    fn test_refresh() {
        let loup = Loup::new(1.0);
        let shared = loup.clone();
        let mut h = DoubleHeap::new(lb, Volatile(move |i: &Interval| (i.ub() - shared.get()).abs()), 50.0).unwrap();
        h.push(Interval::new(0.0, 1.0));
        h.push(Interval::new(0.0, 5.0));
        assert_eq!(h.top2(), Ok(&Interval::new(0.0, 1.0)));
        loup.set(5.0);
        // cached costs are only updated on demand
        assert_eq!(h.top2(), Ok(&Interval::new(0.0, 1.0)));
        h.refresh();
        assert_eq!(h.top2(), Ok(&Interval::new(0.0, 5.0)));
        assert_eq!(h.minimum2(), Ok(0.0));
    }
}
