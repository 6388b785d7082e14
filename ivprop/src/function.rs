//! Functions whose enclosures drive the contractors.
//!
//! Expressions and their derivatives are built elsewhere: a function is seen here only through its
//! capability to compute sound enclosures of its image and of its Jacobian over a box.

use crate::core::{Interval, IntervalBox, IntervalMatrix, VarId};
use smallvec::SmallVec;

/// A function `f: R^n -> R^m` over the variables of a problem.
///
/// All evaluations must be sound: the returned intervals contain the image of every point of the box.
pub trait Function {
    /// Dimension `n` of the boxes the function is evaluated on.
    fn nb_var(&self) -> usize;

    /// Dimension `m` of the image.
    fn image_dim(&self) -> usize;

    /// Variables the function actually depends on, in increasing order.
    fn scope(&self) -> &[VarId];

    /// Enclosure of the image of `domains`, one interval per component.
    fn eval_vector(&self, domains: &IntervalBox) -> Vec<Interval>;

    /// Enclosure of the image of a scalar function.
    fn eval(&self, domains: &IntervalBox) -> Interval {
        debug_assert_eq!(self.image_dim(), 1);
        self.eval_vector(domains)[0]
    }

    /// Enclosure of the Jacobian over `domains`, an `m x n` matrix.
    fn jacobian(&self, domains: &IntervalBox) -> IntervalMatrix;
}

type EvalFn = dyn Fn(&IntervalBox) -> Vec<Interval>;
type JacobianFn = dyn Fn(&IntervalBox) -> IntervalMatrix;

/// A function defined by closures.
///
/// When no Jacobian is provided, the Jacobian is the (sound but useless) matrix of unbounded intervals.
pub struct FnFunction {
    nb_var: usize,
    image_dim: usize,
    scope: SmallVec<[VarId; 4]>,
    eval: Box<EvalFn>,
    jacobian: Option<Box<JacobianFn>>,
}

impl FnFunction {
    /// A vector-valued function of dimension `image_dim` over `nb_var` variables.
    pub fn vector(nb_var: usize, image_dim: usize, eval: impl Fn(&IntervalBox) -> Vec<Interval> + 'static) -> Self {
        FnFunction {
            nb_var,
            image_dim,
            scope: (0..nb_var).map(VarId::from).collect(),
            eval: Box::new(eval),
            jacobian: None,
        }
    }

    /// A scalar function over `nb_var` variables.
    pub fn scalar(nb_var: usize, eval: impl Fn(&IntervalBox) -> Interval + 'static) -> Self {
        Self::vector(nb_var, 1, move |d| vec![eval(d)])
    }

    /// Restricts the scope of the function to the given variables.
    pub fn with_scope(mut self, scope: impl IntoIterator<Item = VarId>) -> Self {
        let mut scope: SmallVec<[VarId; 4]> = scope.into_iter().collect();
        scope.sort();
        scope.dedup();
        debug_assert!(scope.iter().all(|&v| usize::from(v) < self.nb_var));
        self.scope = scope;
        self
    }

    pub fn with_jacobian(mut self, jacobian: impl Fn(&IntervalBox) -> IntervalMatrix + 'static) -> Self {
        self.jacobian = Some(Box::new(jacobian));
        self
    }

    /// Jacobian of a scalar function given as its gradient.
    pub fn with_gradient(self, gradient: impl Fn(&IntervalBox) -> Vec<Interval> + 'static) -> Self {
        debug_assert_eq!(self.image_dim, 1);
        self.with_jacobian(move |d| IntervalMatrix::from_rows(vec![gradient(d)]))
    }
}

impl Function for FnFunction {
    fn nb_var(&self) -> usize {
        self.nb_var
    }

    fn image_dim(&self) -> usize {
        self.image_dim
    }

    fn scope(&self) -> &[VarId] {
        &self.scope
    }

    fn eval_vector(&self, domains: &IntervalBox) -> Vec<Interval> {
        debug_assert_eq!(domains.dim(), self.nb_var);
        if domains.is_empty() {
            return vec![Interval::EMPTY; self.image_dim];
        }
        let image = (self.eval)(domains);
        debug_assert_eq!(image.len(), self.image_dim);
        image
    }

    fn jacobian(&self, domains: &IntervalBox) -> IntervalMatrix {
        match &self.jacobian {
            Some(j) => j(domains),
            None => IntervalMatrix::new(self.image_dim, self.nb_var, Interval::ENTIRE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_functions() {
        let x = VarId::from(0usize);
        let y = VarId::from(1usize);
        let f = FnFunction::scalar(3, move |d| d[x].sqr() + d[y])
            .with_scope([y, x])
            .with_gradient(move |d| vec![2.0 * d[x], Interval::ONE, Interval::ZERO]);
        assert_eq!(f.scope(), &[x, y]);
        let b = IntervalBox::from_bounds(&[(1.0, 2.0), (0.0, 1.0), (5.0, 6.0)]);
        assert_eq!(f.eval(&b), Interval::new(1.0, 5.0));
        let j = f.jacobian(&b);
        assert_eq!(j.nb_rows(), 1);
        assert_eq!(j[(0, 0)], Interval::new(2.0, 4.0));

        let g = FnFunction::vector(2, 2, |d| d.as_slice().to_vec());
        assert_eq!(g.scope().len(), 2);
        assert_eq!(g.jacobian(&IntervalBox::new(2, Interval::ZERO))[(1, 1)], Interval::ENTIRE);
    }
}
