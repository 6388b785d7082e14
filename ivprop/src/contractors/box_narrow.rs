use crate::contractors::{check_not_empty, Contractor, Contradiction};
use crate::core::{Interval, IntervalBox, VarId};
use crate::params::{check_ratio, ConfigError};
use crate::system::NumConstraint;
use tracing::trace;

/// Box-consistency narrowing of a single constraint.
///
/// The domain of a target variable is shrunk to its leftmost and rightmost quasi-zeros: the
/// extreme slices of width at most `ratio * diam` on which the constraint can not be refuted by
/// evaluating its function over the box.
pub struct BoxNarrow {
    constraint: NumConstraint,
    ratio: f64,
    /// Stack of slices still to examine, reused between calls.
    slices: Vec<Interval>,
    /// Box used to evaluate the function on a slice.
    probe: Option<IntervalBox>,
}

impl BoxNarrow {
    pub fn new(constraint: NumConstraint, ratio: f64) -> Result<Self, ConfigError> {
        Ok(BoxNarrow {
            constraint,
            ratio: check_ratio("narrow_ratio", ratio)?,
            slices: Vec::new(),
            probe: None,
        })
    }

    /// True if the constraint can not be refuted when `target` is restricted to `slice`.
    fn is_possible(&mut self, domains: &IntervalBox, target: VarId, slice: Interval) -> bool {
        let probe = self.probe.get_or_insert_with(|| domains.clone());
        probe.copy_from(domains);
        if probe.set(target, slice).is_err() {
            return false;
        }
        self.constraint.is_possibly_satisfied(probe)
    }

    /// Lower bound of the leftmost (or upper bound of the rightmost) quasi-zero in `domain`.
    fn extreme_quasi_zero(
        &mut self,
        domains: &IntervalBox,
        target: VarId,
        domain: Interval,
        eps: f64,
        from_left: bool,
    ) -> Option<f64> {
        self.slices.clear();
        self.slices.push(domain);
        while let Some(slice) = self.slices.pop() {
            if !self.is_possible(domains, target, slice) {
                continue;
            }
            if slice.diam() <= eps || slice.is_degenerated() {
                return Some(if from_left { slice.lb() } else { slice.ub() });
            }
            let (left, right) = slice.bisect(0.5);
            if left == slice || right == slice {
                // no floating-point number strictly inside the slice
                return Some(if from_left { slice.lb() } else { slice.ub() });
            }
            // the slice examined next is pushed last
            if from_left {
                self.slices.push(right);
                self.slices.push(left);
            } else {
                self.slices.push(left);
                self.slices.push(right);
            }
        }
        None
    }
}

impl Contractor for BoxNarrow {
    fn scope(&self) -> &[VarId] {
        self.constraint.scope()
    }

    fn contract(&mut self, domains: &mut IntervalBox) -> Result<(), Contradiction> {
        check_not_empty(domains)?;
        for i in 0..self.constraint.scope().len() {
            let var = self.constraint.scope()[i];
            self.contract_var(domains, var)?;
        }
        Ok(())
    }

    fn contract_var(&mut self, domains: &mut IntervalBox, target: VarId) -> Result<(), Contradiction> {
        check_not_empty(domains)?;
        if !self.constraint.is_possibly_satisfied(domains) {
            trace!("box narrow on {target}: constraint refuted on {domains}");
            domains.set_empty();
            return Err(Contradiction::Infeasible);
        }
        let domain = domains[target];
        if !domain.is_bounded() || domain.is_degenerated() {
            return Ok(());
        }
        let eps = self.ratio * domain.diam();
        let Some(lb) = self.extreme_quasi_zero(domains, target, domain, eps, true) else {
            domains.set_empty();
            return Err(Contradiction::Infeasible);
        };
        let remaining = Interval::new(lb, domain.ub());
        let ub = self
            .extreme_quasi_zero(domains, target, remaining, eps, false)
            .unwrap_or(remaining.ub());
        let narrowed = domains.intersect(target, Interval::new(lb, ub))?;
        if narrowed {
            trace!("box narrow on {target}: {domain} -> {}", domains[target]);
        }
        Ok(())
    }

    fn is_projection(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FnFunction;
    use crate::system::CmpOp;
    use std::rc::Rc;

    fn var(i: usize) -> VarId {
        VarId::from(i)
    }

    fn circle() -> NumConstraint {
        // x^2 + y^2 - 1 = 0
        let f = FnFunction::scalar(2, |d| d[var(0)].sqr() + d[var(1)].sqr() - 1.0);
        NumConstraint::new(Rc::new(f), CmpOp::Eq)
    }

    #[test]
    fn test_narrow_to_quasi_zeros() {
        let mut c = BoxNarrow::new(circle(), 0.01).unwrap();
        // y = 0.5 forces x in {-0.866, 0.866}
        let mut d = IntervalBox::from_bounds(&[(0.0, 4.0), (0.5, 0.5)]);
        c.contract_var(&mut d, var(0)).unwrap();
        let x = d[var(0)];
        let root = 0.75f64.sqrt();
        assert!(x.contains(root));
        assert!(x.diam() <= 2.0 * 0.04, "{x}");
        assert_eq!(d[var(1)], Interval::point(0.5));
    }

    #[test]
    fn test_refuted_box() {
        let mut c = BoxNarrow::new(circle(), 0.1).unwrap();
        let mut d = IntervalBox::from_bounds(&[(2.0, 3.0), (0.0, 1.0)]);
        assert_eq!(c.contract(&mut d), Err(Contradiction::Infeasible));
        assert!(d.is_empty());
    }

    #[test]
    fn test_inequality_keeps_feasible_side() {
        // x - 1 <= 0
        let f = FnFunction::scalar(1, |d| d[var(0)] - 1.0);
        let mut c = BoxNarrow::new(NumConstraint::new(Rc::new(f), CmpOp::Leq), 0.05).unwrap();
        let mut d = IntervalBox::from_bounds(&[(-3.0, 5.0)]);
        c.contract(&mut d).unwrap();
        assert_eq!(d[var(0)].lb(), -3.0);
        assert!(d[var(0)].ub() >= 1.0 && d[var(0)].ub() <= 1.0 + 0.4);
    }

    #[test]
    fn test_invalid_ratio() {
        assert!(BoxNarrow::new(circle(), 0.0).is_err());
    }
}
