//! Cost functions ordering the cells of a search.

use crate::core::VarId;
use crate::search::Cell;
use std::fmt::{Debug, Formatter};
use std::rc::Rc;

/// A cost to minimize over the elements of a queue.
///
/// A cost function is *volatile* if the cost of an element may change over time, typically because
/// it depends on the current upper bound of the objective ([`Loup`]). Cached volatile costs are
/// recomputed by the queue when asked to.
pub trait CostFunction<T> {
    fn cost(&self, item: &T) -> f64;

    fn is_volatile(&self) -> bool {
        false
    }
}

impl<T, F: Fn(&T) -> f64> CostFunction<T> for F {
    fn cost(&self, item: &T) -> f64 {
        self(item)
    }
}

/// Marks a cost closure as volatile.
pub struct Volatile<F>(pub F);

impl<T, F: Fn(&T) -> f64> CostFunction<T> for Volatile<F> {
    fn cost(&self, item: &T) -> f64 {
        (self.0)(item)
    }

    fn is_volatile(&self) -> bool {
        true
    }
}

/// Lowest known upper bound of the objective, shared between the search and the cost functions depending on it.
#[derive(Clone)]
pub struct Loup(Rc<std::cell::Cell<f64>>);

impl Loup {
    pub fn new(value: f64) -> Self {
        Loup(Rc::new(std::cell::Cell::new(value)))
    }

    pub fn get(&self) -> f64 {
        self.0.get()
    }

    pub fn set(&self, value: f64) {
        self.0.set(value)
    }

    /// Records `value` if it improves on the current loup. Returns true if the loup was updated.
    pub fn improve(&self, value: f64) -> bool {
        if value < self.get() {
            self.set(value);
            true
        } else {
            false
        }
    }
}

impl Default for Loup {
    fn default() -> Self {
        Loup::new(f64::INFINITY)
    }
}

impl Debug for Loup {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Loup({})", self.get())
    }
}

/// Cells with the lowest lower bound on a variable (typically the objective) first.
#[derive(Copy, Clone, Debug)]
pub struct MinLb(pub VarId);

impl CostFunction<Cell> for MinLb {
    fn cost(&self, cell: &Cell) -> f64 {
        cell.domains.lb(self.0)
    }
}

/// Cells with the lowest upper bound on a variable first.
#[derive(Copy, Clone, Debug)]
pub struct MinUb(pub VarId);

impl CostFunction<Cell> for MinUb {
    fn cost(&self, cell: &Cell) -> f64 {
        cell.domains.ub(self.0)
    }
}

/// Largest cells first.
#[derive(Copy, Clone, Debug)]
pub struct MaxDiam;

impl CostFunction<Cell> for MaxDiam {
    fn cost(&self, cell: &Cell) -> f64 {
        -cell.domains.max_diam()
    }
}

/// Deepest cells first.
#[derive(Copy, Clone, Debug)]
pub struct Depth;

impl CostFunction<Cell> for Depth {
    fn cost(&self, cell: &Cell) -> f64 {
        -(cell.depth as f64)
    }
}

/// Cells whose objective enclosure `[lb, ub]` lies mostly below the loup first: the cost is
/// `-(loup - lb) / (ub - lb)`.
///
/// A degenerate enclosure costs `-inf` if it is below the loup and `+inf` otherwise.
/// Volatile: it must be recomputed whenever the loup changes.
#[derive(Clone, Debug)]
pub struct C3 {
    objective: VarId,
    loup: Loup,
}

impl C3 {
    pub fn new(objective: VarId, loup: Loup) -> Self {
        C3 { objective, loup }
    }
}

impl CostFunction<Cell> for C3 {
    fn cost(&self, cell: &Cell) -> f64 {
        let y = cell.domains[self.objective];
        let loup = self.loup.get();
        let diam = y.diam();
        if diam == 0.0 || !diam.is_finite() || !loup.is_finite() {
            if y.lb() <= loup {
                f64::NEG_INFINITY
            } else {
                f64::INFINITY
            }
        } else {
            -(loup - y.lb()) / diam
        }
    }

    fn is_volatile(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::IntervalBox;

    #[test]
    fn test_cell_costs() {
        let y = VarId::from(1usize);
        let mut cell = Cell::root(IntervalBox::from_bounds(&[(0.0, 4.0), (1.0, 3.0)]));
        cell.depth = 3;
        assert_eq!(MinLb(y).cost(&cell), 1.0);
        assert_eq!(MinUb(y).cost(&cell), 3.0);
        assert_eq!(MaxDiam.cost(&cell), -4.0);
        assert_eq!(Depth.cost(&cell), -3.0);
        assert!(!MinLb(y).is_volatile());

        let loup = Loup::default();
        let c3 = C3::new(y, loup.clone());
        assert!(c3.is_volatile());
        assert_eq!(c3.cost(&cell), f64::NEG_INFINITY);
        assert!(loup.improve(2.0));
        assert!(!loup.improve(2.5));
        assert_eq!(c3.cost(&cell), -0.5);
        loup.set(0.5);
        assert_eq!(c3.cost(&cell), 0.25);
    }

    #[test]
    fn test_closures() {
        let loup = Loup::new(10.0);
        let shared = loup.clone();
        let plain = |x: &f64| 2.0 * x;
        let volatile = Volatile(move |x: &f64| x * shared.get());
        assert_eq!(plain.cost(&3.0), 6.0);
        assert!(!plain.is_volatile());
        assert_eq!(volatile.cost(&3.0), 30.0);
        assert!(volatile.is_volatile());
        loup.set(100.0);
        assert_eq!(volatile.cost(&3.0), 300.0);
    }
}
