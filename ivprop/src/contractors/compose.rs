use crate::contractors::{check_not_empty, Contractor, Contradiction, DynContractor};
use crate::core::{IntervalBox, VarId};
use crate::params::{check_ratio, ConfigError};
use smallvec::SmallVec;
use tracing::trace;

/// Applies a list of contractors, one after the other.
pub struct Sequence {
    contractors: Vec<DynContractor>,
    scope: SmallVec<[VarId; 8]>,
}

impl Sequence {
    pub fn new(contractors: impl IntoIterator<Item = DynContractor>) -> Self {
        let contractors: Vec<DynContractor> = contractors.into_iter().collect();
        let mut scope: SmallVec<[VarId; 8]> = contractors.iter().flat_map(|c| c.scope().iter().copied()).collect();
        scope.sort();
        scope.dedup();
        Sequence { contractors, scope }
    }

    pub fn len(&self) -> usize {
        self.contractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contractors.is_empty()
    }
}

impl Contractor for Sequence {
    fn scope(&self) -> &[VarId] {
        &self.scope
    }

    fn contract(&mut self, domains: &mut IntervalBox) -> Result<(), Contradiction> {
        check_not_empty(domains)?;
        for c in &mut self.contractors {
            c.contract(domains)?;
        }
        Ok(())
    }
}

/// Applies a contractor repeatedly, until a call contracts the box by less than `ratio`.
pub struct FixPoint {
    contractor: DynContractor,
    ratio: f64,
    /// Box before the last call, reused between calls.
    previous: Option<IntervalBox>,
}

impl FixPoint {
    pub fn new(contractor: impl Into<DynContractor>, ratio: f64) -> Result<Self, ConfigError> {
        Ok(FixPoint {
            contractor: contractor.into(),
            ratio: check_ratio("fixpoint_ratio", ratio)?,
            previous: None,
        })
    }
}

impl Contractor for FixPoint {
    fn scope(&self) -> &[VarId] {
        self.contractor.scope()
    }

    fn contract(&mut self, domains: &mut IntervalBox) -> Result<(), Contradiction> {
        check_not_empty(domains)?;
        let previous = self.previous.get_or_insert_with(|| domains.clone());
        let mut iterations = 0;
        loop {
            previous.copy_from(domains);
            self.contractor.contract(domains)?;
            iterations += 1;
            if domains.contraction_from(previous) < self.ratio {
                break;
            }
        }
        trace!("fixpoint reached after {iterations} iterations");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contractors::{Linear, LinearTerm};
    use crate::core::Interval;

    fn var(i: usize) -> VarId {
        VarId::from(i)
    }

    /// x = y and x = y / 2 + 1, whose only solution is x = y = 2.
    fn contractors() -> [DynContractor; 2] {
        [
            Linear::eq([LinearTerm::new(1.0, var(0)), LinearTerm::new(-1.0, var(1))], 0.0).into(),
            Linear::eq([LinearTerm::new(1.0, var(0)), LinearTerm::new(-0.5, var(1))], 1.0).into(),
        ]
    }

    #[test]
    fn test_sequence() {
        let mut seq = Sequence::new(contractors());
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.scope(), &[var(0), var(1)]);
        let mut d = IntervalBox::from_bounds(&[(0.0, 10.0), (0.0, 4.0)]);
        seq.contract(&mut d).unwrap();
        // first: x in [0, 4]; second: x in [1, 3], y in [0, 4]
        assert_eq!(d[var(0)], Interval::new(1.0, 3.0));
        assert_eq!(d[var(1)], Interval::new(0.0, 4.0));
    }

    #[test]
    fn test_fixpoint_converges() {
        let mut fix = FixPoint::new(Sequence::new(contractors()), 0.001).unwrap();
        let mut d = IntervalBox::from_bounds(&[(0.0, 10.0), (0.0, 4.0)]);
        fix.contract(&mut d).unwrap();
        assert!(d.contains_point(&[2.0, 2.0]));
        assert!(d.max_diam() < 0.01, "{d}");

        // calling again on a fixpoint only brings a marginal contraction
        let before = d.clone();
        fix.contract(&mut d).unwrap();
        assert!(d.contraction_from(&before) < 0.01);
    }
}
