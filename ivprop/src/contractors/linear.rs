use crate::contractors::{check_not_empty, Contractor, Contradiction};
use crate::core::{Interval, IntervalBox, VarId};
use itertools::Itertools;
use smallvec::SmallVec;
use std::fmt::{Display, Formatter};
use tracing::trace;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearTerm {
    pub factor: f64,
    pub var: VarId,
}

impl LinearTerm {
    pub fn new(factor: f64, var: VarId) -> Self {
        LinearTerm { factor, var }
    }
}

impl Display for LinearTerm {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.factor != 1.0 {
            if self.factor < 0.0 {
                write!(f, "({})*", self.factor)?;
            } else {
                write!(f, "{}*", self.factor)?;
            }
        }
        write!(f, "{}", self.var)
    }
}

/// The linear constraint `lb <= sum(a_i * x_i) <= ub`.
///
/// Each variable is narrowed by projecting the constraint on it: `a_j * x_j` must lie in
/// `[lb, ub] - sum(a_i * x_i, i != j)`.
#[derive(Clone, Debug)]
pub struct Linear {
    terms: SmallVec<[LinearTerm; 4]>,
    scope: SmallVec<[VarId; 4]>,
    bounds: Interval,
}

impl Linear {
    /// Builds the constraint `lb <= sum(terms) <= ub`.
    /// Terms on the same variable are merged and null terms are dropped.
    pub fn new(terms: impl IntoIterator<Item = LinearTerm>, lb: f64, ub: f64) -> Self {
        let mut terms: SmallVec<[LinearTerm; 4]> = terms.into_iter().collect();
        terms.sort_by_key(|t| t.var);
        let terms: SmallVec<[LinearTerm; 4]> = terms
            .into_iter()
            .coalesce(|a, b| {
                if a.var == b.var {
                    Ok(LinearTerm::new(a.factor + b.factor, a.var))
                } else {
                    Err((a, b))
                }
            })
            .filter(|t| t.factor != 0.0)
            .collect();
        let scope = terms.iter().map(|t| t.var).collect();
        Linear {
            terms,
            scope,
            bounds: Interval::new(lb, ub),
        }
    }

    /// `sum(terms) <= ub`
    pub fn leq(terms: impl IntoIterator<Item = LinearTerm>, ub: f64) -> Self {
        Self::new(terms, f64::NEG_INFINITY, ub)
    }

    /// `sum(terms) = value`
    pub fn eq(terms: impl IntoIterator<Item = LinearTerm>, value: f64) -> Self {
        Self::new(terms, value, value)
    }

    fn term_image(t: &LinearTerm, domains: &IntervalBox) -> Interval {
        t.factor * domains[t.var]
    }

    /// Narrows the variable of the `j`-th term.
    fn project(&self, j: usize, domains: &mut IntervalBox) -> Result<bool, Contradiction> {
        let others = self
            .terms
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != j)
            .fold(Interval::ZERO, |acc, (_, t)| acc + Self::term_image(t, domains));
        let target = self.terms[j];
        let projection = (self.bounds - others) / target.factor;
        Ok(domains.intersect(target.var, projection)?)
    }
}

impl Contractor for Linear {
    fn scope(&self) -> &[VarId] {
        &self.scope
    }

    fn contract(&mut self, domains: &mut IntervalBox) -> Result<(), Contradiction> {
        check_not_empty(domains)?;
        if self.bounds.is_empty() {
            domains.set_empty();
            return Err(Contradiction::Infeasible);
        }
        let sum = self
            .terms
            .iter()
            .fold(Interval::ZERO, |acc, t| acc + Self::term_image(t, domains));
        if (sum & self.bounds).is_empty() {
            trace!("linear constraint violated: {self}");
            domains.set_empty();
            return Err(Contradiction::Infeasible);
        }
        for j in 0..self.terms.len() {
            self.project(j, domains)?;
        }
        Ok(())
    }

    fn contract_var(&mut self, domains: &mut IntervalBox, target: VarId) -> Result<(), Contradiction> {
        check_not_empty(domains)?;
        if let Ok(j) = self.terms.binary_search_by_key(&target, |t| t.var) {
            self.project(j, domains)?;
        }
        Ok(())
    }

    fn is_projection(&self) -> bool {
        true
    }
}

impl Display for Linear {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <= {} <= {}", self.bounds.lb(), self.terms.iter().format(" + "), self.bounds.ub())
    }
}
