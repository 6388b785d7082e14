use crate::collections::ref_store::RefVec;
use crate::core::{Interval, IntervalBox, VarId};
use crate::function::Function;
use crate::params::ConfigError;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

/// Comparison of the image of a function with zero.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CmpOp {
    /// `f(x) = 0`
    Eq,
    /// `f(x) <= 0`
    Leq,
    /// `f(x) >= 0`
    Geq,
}

impl CmpOp {
    /// The set of images allowed by the comparison.
    pub fn feasible_image(self) -> Interval {
        match self {
            CmpOp::Eq => Interval::ZERO,
            CmpOp::Leq => Interval::new(f64::NEG_INFINITY, 0.0),
            CmpOp::Geq => Interval::new(0.0, f64::INFINITY),
        }
    }
}

impl Display for CmpOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CmpOp::Eq => write!(f, "="),
            CmpOp::Leq => write!(f, "<="),
            CmpOp::Geq => write!(f, ">="),
        }
    }
}

/// The numerical constraint `function op 0` on a scalar function.
#[derive(Clone)]
pub struct NumConstraint {
    pub function: Rc<dyn Function>,
    pub op: CmpOp,
}

impl NumConstraint {
    pub fn new(function: Rc<dyn Function>, op: CmpOp) -> Self {
        NumConstraint { function, op }
    }

    pub fn scope(&self) -> &[VarId] {
        self.function.scope()
    }

    /// Whether the constraint may be satisfied by a point of `domains`.
    pub fn is_possibly_satisfied(&self, domains: &IntervalBox) -> bool {
        !(self.function.eval(domains) & self.op.feasible_image()).is_empty()
    }
}

/// A system of numerical constraints over bounded (or not) real variables.
#[derive(Clone, Default)]
pub struct System {
    names: RefVec<VarId, String>,
    domains: Vec<Interval>,
    constraints: Vec<NumConstraint>,
}

impl System {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a new variable with the given initial domain.
    pub fn add_var(&mut self, name: impl Into<String>, domain: impl Into<Interval>) -> VarId {
        self.domains.push(domain.into());
        self.names.push(name.into())
    }

    pub fn nb_var(&self) -> usize {
        self.names.len()
    }

    pub fn vars(&self) -> impl Iterator<Item = VarId> {
        self.names.keys()
    }

    pub fn var_name(&self, var: VarId) -> &str {
        &self.names[var]
    }

    /// Adds the constraint `function op 0`. The function must be scalar and defined on all variables of the system.
    pub fn add_constraint(&mut self, function: impl Function + 'static, op: CmpOp) -> Result<(), ConfigError> {
        self.add_shared_constraint(Rc::new(function), op)
    }

    pub fn add_shared_constraint(&mut self, function: Rc<dyn Function>, op: CmpOp) -> Result<(), ConfigError> {
        if function.nb_var() != self.nb_var() {
            return Err(ConfigError::DimensionMismatch {
                expected: self.nb_var(),
                got: function.nb_var(),
            });
        }
        if function.image_dim() != 1 {
            return Err(ConfigError::DimensionMismatch {
                expected: 1,
                got: function.image_dim(),
            });
        }
        self.constraints.push(NumConstraint::new(function, op));
        Ok(())
    }

    pub fn constraints(&self) -> &[NumConstraint] {
        &self.constraints
    }

    /// Box made of the initial domains of all variables.
    pub fn initial_box(&self) -> IntervalBox {
        IntervalBox::from(self.domains.clone())
    }

    /// Whether no constraint is proven violated on `domains`.
    pub fn is_possibly_feasible(&self, domains: &IntervalBox) -> bool {
        !domains.is_empty() && self.constraints.iter().all(|c| c.is_possibly_satisfied(domains))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FnFunction;

    #[test]
    fn build_system() {
        let mut sys = System::new();
        let x = sys.add_var("x", (-1.0, 1.0));
        let y = sys.add_var("y", 2.0);
        assert_eq!(sys.nb_var(), 2);
        assert_eq!(sys.var_name(y), "y");

        sys.add_constraint(FnFunction::scalar(2, move |d| d[x] - d[y]), CmpOp::Leq)
            .unwrap();
        assert_eq!(
            sys.add_constraint(FnFunction::scalar(3, move |d| d[x]), CmpOp::Eq),
            Err(ConfigError::DimensionMismatch { expected: 2, got: 3 })
        );
        assert_eq!(sys.constraints().len(), 1);

        let b = sys.initial_box();
        assert_eq!(b[y], Interval::point(2.0));
        assert!(sys.is_possibly_feasible(&b));
        let far = IntervalBox::from_bounds(&[(5.0, 6.0), (2.0, 2.0)]);
        assert!(!sys.is_possibly_feasible(&far));
    }
}
