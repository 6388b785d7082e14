use crate::core::{relative_contraction, EmptyDomain, Interval, VarId};
use itertools::Itertools;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Index;

/// A box: one interval per variable of the problem, indexed by [`VarId`].
///
/// A box is either non-empty (all its components are non-empty) or empty (all its components are
/// empty). Emptying a single component through [`IntervalBox::set`] or [`IntervalBox::intersect`]
/// eagerly empties the whole box.
#[derive(Clone, PartialEq)]
pub struct IntervalBox {
    domains: Vec<Interval>,
}

impl IntervalBox {
    /// A box of dimension `dim` with every component set to `init`.
    pub fn new(dim: usize, init: Interval) -> IntervalBox {
        let mut b = IntervalBox {
            domains: vec![init; dim],
        };
        if init.is_empty() {
            b.set_empty();
        }
        b
    }

    /// Builds a box from `(lb, ub)` pairs.
    pub fn from_bounds(bounds: &[(f64, f64)]) -> IntervalBox {
        bounds.iter().map(|&b| Interval::from(b)).collect()
    }

    pub fn dim(&self) -> usize {
        self.domains.len()
    }

    /// True if the box contains no point.
    pub fn is_empty(&self) -> bool {
        self.domains.first().is_some_and(|d| d.is_empty())
    }

    pub fn set_empty(&mut self) {
        for d in &mut self.domains {
            *d = Interval::EMPTY;
        }
    }

    /// Overwrites `self` with `other`, reusing the allocation.
    pub fn copy_from(&mut self, other: &IntervalBox) {
        self.domains.clone_from(&other.domains);
    }

    pub fn vars(&self) -> impl Iterator<Item = VarId> {
        (0..self.dim()).map(VarId::from)
    }

    pub fn iter(&self) -> impl Iterator<Item = (VarId, Interval)> + '_ {
        self.domains.iter().enumerate().map(|(i, &d)| (VarId::from(i), d))
    }

    pub fn as_slice(&self) -> &[Interval] {
        &self.domains
    }

    pub fn get(&self, var: VarId) -> Interval {
        self.domains[usize::from(var)]
    }

    pub fn lb(&self, var: VarId) -> f64 {
        self.get(var).lb()
    }

    pub fn ub(&self, var: VarId) -> f64 {
        self.get(var).ub()
    }

    /// Replaces the domain of `var`, which may enlarge it.
    /// Setting an empty domain empties the box and returns an error.
    pub fn set(&mut self, var: VarId, value: Interval) -> Result<(), EmptyDomain> {
        if value.is_empty() {
            self.set_empty();
            return Err(EmptyDomain(var));
        }
        self.domains[usize::from(var)] = value;
        Ok(())
    }

    /// Intersects the domain of `var` with `value`.
    ///
    /// Returns `Ok(true)` if the domain was narrowed, `Ok(false)` if it was left unchanged, and an error
    /// (with the whole box emptied) if the intersection is empty.
    pub fn intersect(&mut self, var: VarId, value: Interval) -> Result<bool, EmptyDomain> {
        let previous = self.get(var);
        let new = previous & value;
        if new.is_empty() {
            self.set_empty();
            Err(EmptyDomain(var))
        } else if new != previous {
            self.domains[usize::from(var)] = new;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Largest diameter of the box's components (0 for a box of dimension 0 or an empty box).
    pub fn max_diam(&self) -> f64 {
        self.domains.iter().map(|d| d.diam()).fold(0.0, f64::max)
    }

    /// Largest diameter among the given variables.
    pub fn max_diam_of(&self, vars: &[VarId]) -> f64 {
        vars.iter().map(|&v| self.get(v).diam()).fold(0.0, f64::max)
    }

    /// Variable with the largest domain among those wider than `prec` that can be bisected, the
    /// first one in case of ties.
    pub fn widest_var(&self, prec: f64) -> Option<VarId> {
        self.iter()
            .filter(|(_, d)| d.diam() > prec && d.is_bisectable())
            .max_by(|(v1, d1), (v2, d2)| d1.diam().total_cmp(&d2.diam()).then(v2.cmp(v1)))
            .map(|(v, _)| v)
    }

    /// Midpoint of every component.
    pub fn mid(&self) -> Vec<f64> {
        self.domains.iter().map(|d| d.mid()).collect()
    }

    pub fn is_bounded(&self) -> bool {
        self.domains.iter().all(|d| d.is_bounded())
    }

    /// True if every component of `self` is included in the corresponding component of `other`.
    pub fn is_subset(&self, other: &IntervalBox) -> bool {
        debug_assert_eq!(self.dim(), other.dim());
        self.is_empty() || self.domains.iter().zip(&other.domains).all(|(a, b)| a.is_subset(*b))
    }

    pub fn is_interior_subset(&self, other: &IntervalBox) -> bool {
        debug_assert_eq!(self.dim(), other.dim());
        self.is_empty() || self.domains.iter().zip(&other.domains).all(|(a, b)| a.is_interior_subset(*b))
    }

    pub fn contains_point(&self, point: &[f64]) -> bool {
        point.len() == self.dim() && self.domains.iter().zip(point).all(|(d, &x)| d.contains(x))
    }

    /// Smallest box containing both `self` and `other`.
    pub fn hull(&self, other: &IntervalBox) -> IntervalBox {
        debug_assert_eq!(self.dim(), other.dim());
        self.domains.iter().zip(&other.domains).map(|(a, b)| a.hull(*b)).collect()
    }

    /// Splits the box in two along `var`, see [`Interval::bisect`].
    pub fn bisect(&self, var: VarId, ratio: f64) -> (IntervalBox, IntervalBox) {
        let (left, right) = self.get(var).bisect(ratio);
        let mut l = self.clone();
        let mut r = self.clone();
        l.domains[usize::from(var)] = left;
        r.domains[usize::from(var)] = right;
        (l, r)
    }

    /// Largest relative contraction of a component between `previous` and `self`.
    pub fn contraction_from(&self, previous: &IntervalBox) -> f64 {
        debug_assert_eq!(self.dim(), previous.dim());
        previous
            .domains
            .iter()
            .zip(&self.domains)
            .map(|(&old, &new)| relative_contraction(old, new))
            .fold(0.0, f64::max)
    }
}

impl FromIterator<Interval> for IntervalBox {
    fn from_iter<T: IntoIterator<Item = Interval>>(iter: T) -> Self {
        let mut b = IntervalBox {
            domains: iter.into_iter().collect(),
        };
        if b.domains.iter().any(|d| d.is_empty()) {
            b.set_empty();
        }
        b
    }
}

impl From<Vec<Interval>> for IntervalBox {
    fn from(domains: Vec<Interval>) -> Self {
        domains.into_iter().collect()
    }
}

impl Index<VarId> for IntervalBox {
    type Output = Interval;

    fn index(&self, var: VarId) -> &Interval {
        &self.domains[usize::from(var)]
    }
}

impl Display for IntervalBox {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "(empty)")
        } else {
            write!(f, "({})", self.domains.iter().format(" ; "))
        }
    }
}

impl Debug for IntervalBox {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}
