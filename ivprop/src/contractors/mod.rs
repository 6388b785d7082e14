//! Narrowing operators on boxes.
//!
//! A contractor removes from a box some parts that are guaranteed to contain no solution of the
//! constraint it represents. It never enlarges a domain: after a call, every component of the box is
//! included in its previous value, or the whole box is empty.

mod box_narrow;
mod compose;
mod linear;
mod newton;
mod propagation;

pub use box_narrow::BoxNarrow;
pub use compose::{FixPoint, Sequence};
pub use linear::{Linear, LinearTerm};
pub use newton::{Newton, NewtonStatus};
pub use propagation::{box_consistency, CtcId, Propagation, PropagationConfig, PropagationStats};

use crate::core::{EmptyDomain, IntervalBox, VarId};
use std::ops::{Deref, DerefMut};

/// Raised when a contractor proves that a box contains no solution. The box is left empty.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Contradiction {
    #[error(transparent)]
    EmptyDomain(#[from] EmptyDomain),
    #[error("the constraint can not be satisfied in the box")]
    Infeasible,
}

/// Outcome of a contraction that did not fail.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Narrowing {
    Unchanged,
    Narrowed,
}

impl Narrowing {
    pub fn is_narrowed(self) -> bool {
        self == Narrowing::Narrowed
    }
}

pub trait Contractor {
    /// Variables that the contractor reads and may narrow.
    fn scope(&self) -> &[VarId];

    /// Narrows `domains` in place.
    ///
    /// Returns a [`Contradiction`] if the box was proven to contain no solution, in which case `domains` must be empty.
    fn contract(&mut self, domains: &mut IntervalBox) -> Result<(), Contradiction>;

    /// Narrows `domains`, focusing on the domain of `target`.
    ///
    /// Contractors that are projections (see [`Contractor::is_projection`]) only narrow `target`.
    /// The default implementation ignores the target and narrows the whole scope.
    fn contract_var(&mut self, domains: &mut IntervalBox, target: VarId) -> Result<(), Contradiction> {
        let _ = target;
        self.contract(domains)
    }

    /// True if a call to [`Contractor::contract_var`] only narrows its target variable.
    fn is_projection(&self) -> bool {
        false
    }
}

/// A simple wrapper around a contractor for dynamic dispatch.
pub struct DynContractor {
    contractor: Box<dyn Contractor>,
}

impl<T: Contractor + 'static> From<T> for DynContractor {
    fn from(contractor: T) -> Self {
        DynContractor {
            contractor: Box::new(contractor),
        }
    }
}

impl Deref for DynContractor {
    type Target = dyn Contractor;

    fn deref(&self) -> &Self::Target {
        self.contractor.as_ref()
    }
}

impl DerefMut for DynContractor {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.contractor.as_mut()
    }
}

/// Applies `contractor` on `domains` and reports whether any domain was narrowed.
pub fn narrow(contractor: &mut dyn Contractor, domains: &mut IntervalBox) -> Result<Narrowing, Contradiction> {
    if domains.is_empty() {
        return Err(Contradiction::Infeasible);
    }
    let before = domains.clone();
    contractor.contract(domains)?;
    if domains.is_empty() {
        return Err(Contradiction::Infeasible);
    }
    debug_assert!(domains.is_subset(&before), "contractor enlarged the box");
    if *domains == before {
        Ok(Narrowing::Unchanged)
    } else {
        Ok(Narrowing::Narrowed)
    }
}

/// Fails with [`Contradiction::Infeasible`] if the box is empty.
pub(crate) fn check_not_empty(domains: &IntervalBox) -> Result<(), Contradiction> {
    if domains.is_empty() {
        Err(Contradiction::Infeasible)
    } else {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_utils {
    use crate::core::IntervalBox;
    use rand::rngs::StdRng;
    use rand::Rng;

    /// A random point of a bounded box.
    pub fn random_point(domains: &IntervalBox, rng: &mut StdRng) -> Vec<f64> {
        domains
            .as_slice()
            .iter()
            .map(|d| {
                if d.is_degenerated() {
                    d.lb()
                } else {
                    rng.random_range(d.lb()..=d.ub())
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Interval;

    #[test]
    fn test_narrow() {
        let x = VarId::from(0usize);
        let y = VarId::from(1usize);
        // x <= y
        let mut ctc = DynContractor::from(Linear::leq([LinearTerm::new(1.0, x), LinearTerm::new(-1.0, y)], 0.0));
        let mut d = IntervalBox::from_bounds(&[(0.0, 10.0), (0.0, 4.0)]);
        assert!(narrow(&mut *ctc, &mut d).unwrap().is_narrowed());
        assert_eq!(d[x], Interval::new(0.0, 4.0));
        assert_eq!(narrow(&mut *ctc, &mut d), Ok(Narrowing::Unchanged));
        assert!(!Narrowing::Unchanged.is_narrowed());

        let mut d = IntervalBox::from_bounds(&[(5.0, 10.0), (0.0, 4.0)]);
        assert!(narrow(&mut *ctc, &mut d).is_err());
        assert!(d.is_empty());
    }
}
