use crate::contractors::{check_not_empty, Contractor, Contradiction};
use crate::core::{relative_contraction, Interval, IntervalBox, IntervalMatrix, VarId};
use crate::function::Function;
use crate::params::{self, check_positive, ConfigError};
use smallvec::SmallVec;
use std::rc::Rc;
use tracing::{instrument, trace};

/// Result of an application of the interval Newton operator.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NewtonStatus {
    /// The box was too wide for the operator to be applied.
    Skipped,
    /// The iterations reached a point where they no longer bring a significant gain.
    /// `unique` is true if the box was proven to contain exactly one root.
    Converged { unique: bool },
    /// A numerical degeneracy (singular preconditioner or no usable pivot) interrupted the iterations.
    /// The box is left as narrowed so far.
    Abandoned,
}

/// Interval Newton contractor for a square system `f(x) = 0`, preconditioned by the inverse of the
/// midpoint of the Jacobian and solved with interval Gauss-Seidel.
pub struct Newton {
    f: Rc<dyn Function>,
    scope: SmallVec<[VarId; 4]>,
    /// The operator only applies to boxes whose diameter (over the scope) is at most `ceil`.
    ceil: f64,
    /// Iterations stop when their relative gain is below `prec`.
    prec: f64,
    /// Gauss-Seidel sweeps are repeated while their relative contraction is at least this ratio.
    gauss_seidel_ratio: f64,
}

impl Newton {
    /// Builds a Newton contractor on `f`, with default parameters.
    /// The function must have as many components as variables in its scope.
    pub fn new(f: Rc<dyn Function>) -> Result<Self, ConfigError> {
        let scope: SmallVec<[VarId; 4]> = f.scope().iter().copied().collect();
        if f.image_dim() != scope.len() {
            return Err(ConfigError::NonSquareSystem {
                equations: f.image_dim(),
                variables: scope.len(),
            });
        }
        Ok(Newton {
            f,
            scope,
            ceil: check_positive("newton_ceil", params::NEWTON_CEIL.get())?,
            prec: check_positive("newton_prec", params::NEWTON_PREC.get())?,
            gauss_seidel_ratio: check_positive("gauss_seidel_ratio", params::GAUSS_SEIDEL_RATIO.get())?,
        })
    }

    pub fn with_ceil(mut self, ceil: f64) -> Result<Self, ConfigError> {
        self.ceil = check_positive("newton_ceil", ceil)?;
        Ok(self)
    }

    pub fn with_prec(mut self, prec: f64) -> Result<Self, ConfigError> {
        self.prec = check_positive("newton_prec", prec)?;
        Ok(self)
    }

    pub fn with_gauss_seidel_ratio(mut self, ratio: f64) -> Result<Self, ConfigError> {
        self.gauss_seidel_ratio = check_positive("gauss_seidel_ratio", ratio)?;
        Ok(self)
    }

    pub fn ceil(&self) -> f64 {
        self.ceil
    }

    pub fn prec(&self) -> f64 {
        self.prec
    }

    /// Applies the interval Newton iteration on `domains`.
    #[instrument(level = "trace", skip_all)]
    pub fn newton(&self, domains: &mut IntervalBox) -> Result<NewtonStatus, Contradiction> {
        check_not_empty(domains)?;
        if self.scope.is_empty() || domains.max_diam_of(&self.scope) > self.ceil {
            return Ok(NewtonStatus::Skipped);
        }
        let columns: SmallVec<[usize; 4]> = self.scope.iter().map(|&v| usize::from(v)).collect();
        let mut unique = false;
        let mut iterations = 0;
        loop {
            iterations += 1;
            let before = domains.clone();

            // midpoint of the scope, other variables are kept as they are
            let mut mid = domains.clone();
            let mut y: SmallVec<[Interval; 4]> = SmallVec::with_capacity(self.scope.len());
            for &v in &self.scope {
                let m = domains[v].mid();
                mid.set(v, Interval::point(m))?;
                y.push(domains[v] - m);
            }
            let fm = self.f.eval_vector(&mid);
            if fm.iter().any(|x| x.is_empty() || !x.is_bounded()) {
                trace!("undefined at midpoint, abandon");
                return Ok(NewtonStatus::Abandoned);
            }
            let jac = self.f.jacobian(domains).select_columns(&columns);

            let Ok(precond) = jac.mid().inverse() else {
                trace!("singular preconditioner, abandon");
                return Ok(NewtonStatus::Abandoned);
            };
            let a = precond.mul_matrix(&jac);
            let b: SmallVec<[Interval; 4]> = precond.mul_vector(&fm).into_iter().map(|x| -x).collect();

            match gauss_seidel(&a, &b, &mut y, self.gauss_seidel_ratio) {
                Err(contradiction) => {
                    domains.set_empty();
                    return Err(contradiction);
                }
                Ok(Sweeps::Degenerate) => {
                    trace!("no usable pivot, abandon");
                    return Ok(NewtonStatus::Abandoned);
                }
                Ok(Sweeps::Done { first_sweep_interior }) => {
                    unique |= first_sweep_interior;
                }
            }
            for (i, &v) in self.scope.iter().enumerate() {
                let m = mid[v].lb();
                domains.intersect(v, y[i] + m)?;
            }

            let gain = domains.contraction_from(&before);
            if gain < self.prec {
                trace!("converged after {iterations} iterations (unique root: {unique})");
                return Ok(NewtonStatus::Converged { unique });
            }
        }
    }
}

impl Contractor for Newton {
    fn scope(&self) -> &[VarId] {
        &self.scope
    }

    fn contract(&mut self, domains: &mut IntervalBox) -> Result<(), Contradiction> {
        self.newton(domains).map(|_| ())
    }
}

enum Sweeps {
    /// No row has a diagonal coefficient that excludes zero.
    Degenerate,
    /// `first_sweep_interior` is true if the first sweep mapped `y` into its interior.
    Done { first_sweep_interior: bool },
}

/// Interval Gauss-Seidel on `a * y = b`, narrowing `y` in place.
///
/// Row `i` is solved for `y[i]` and the result is used immediately in the following rows.
/// Rows whose diagonal coefficient contains zero are skipped.
fn gauss_seidel(a: &IntervalMatrix, b: &[Interval], y: &mut [Interval], ratio: f64) -> Result<Sweeps, Contradiction> {
    let n = y.len();
    debug_assert!(a.nb_rows() == n && a.nb_cols() == n && b.len() == n);
    let mut first_sweep = true;
    let mut first_sweep_interior = true;
    loop {
        let mut any_pivot = false;
        let mut max_contraction: f64 = 0.0;
        for i in 0..n {
            let diag = a[(i, i)];
            if diag.contains_zero() {
                first_sweep_interior = false;
                continue;
            }
            any_pivot = true;
            let rest = (0..n)
                .filter(|&j| j != i)
                .fold(Interval::ZERO, |acc, j| acc + a[(i, j)] * y[j]);
            let candidate = (b[i] - rest) / diag;
            if first_sweep && !candidate.is_interior_subset(y[i]) {
                first_sweep_interior = false;
            }
            let new = candidate & y[i];
            if new.is_empty() {
                return Err(Contradiction::Infeasible);
            }
            max_contraction = max_contraction.max(relative_contraction(y[i], new));
            y[i] = new;
        }
        if !any_pivot {
            return Ok(Sweeps::Degenerate);
        }
        first_sweep = false;
        if max_contraction < ratio {
            return Ok(Sweeps::Done { first_sweep_interior });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::FnFunction;

    fn var(i: usize) -> VarId {
        VarId::from(i)
    }

    /// x^2 - 2
    fn sqrt2() -> Rc<dyn Function> {
        Rc::new(FnFunction::scalar(1, |d| d[var(0)].sqr() - 2.0).with_gradient(|d| vec![2.0 * d[var(0)]]))
    }

    #[test]
    fn test_converges_on_simple_root() {
        let newton = Newton::new(sqrt2()).unwrap().with_prec(1e-7).unwrap();
        let mut d = IntervalBox::from_bounds(&[(1.414, 1.415)]);
        let status = newton.newton(&mut d).unwrap();
        assert_eq!(status, NewtonStatus::Converged { unique: true });
        assert!(d[var(0)].contains(std::f64::consts::SQRT_2));
        assert!(d.max_diam() < 1e-7, "{d}");
    }

    #[test]
    fn test_skips_wide_boxes() {
        let mut newton = Newton::new(sqrt2()).unwrap().with_ceil(0.01).unwrap();
        let mut d = IntervalBox::from_bounds(&[(1.0, 2.0)]);
        assert_eq!(newton.newton(&mut d), Ok(NewtonStatus::Skipped));
        assert_eq!(d, IntervalBox::from_bounds(&[(1.0, 2.0)]));
        newton.contract(&mut d).unwrap();
        assert_eq!(d, IntervalBox::from_bounds(&[(1.0, 2.0)]));
    }

    #[test]
    fn test_proves_absence_of_roots() {
        let newton = Newton::new(sqrt2()).unwrap();
        let mut d = IntervalBox::from_bounds(&[(1.5, 1.505)]);
        assert!(d.max_diam() <= newton.ceil());
        assert_eq!(newton.newton(&mut d), Err(Contradiction::Infeasible));
        assert!(d.is_empty());
    }

    #[test]
    fn test_square_system() {
        // x^2 + y^2 = 1, x - y = 0
        let f = FnFunction::vector(2, 2, |d| {
            let (x, y) = (d[var(0)], d[var(1)]);
            vec![x.sqr() + y.sqr() - 1.0, x - y]
        })
        .with_jacobian(|d| {
            IntervalMatrix::from_rows(vec![
                vec![2.0 * d[var(0)], 2.0 * d[var(1)]],
                vec![Interval::ONE, -Interval::ONE],
            ])
        });
        let newton = Newton::new(Rc::new(f)).unwrap();
        let mut d = IntervalBox::from_bounds(&[(0.705, 0.71), (0.702, 0.709)]);
        let status = newton.newton(&mut d).unwrap();
        assert_eq!(status, NewtonStatus::Converged { unique: true });
        let root = std::f64::consts::FRAC_1_SQRT_2;
        assert!(d.contains_point(&[root, root]));
        assert!(d.max_diam() < 1e-7);
    }

    #[test]
    fn test_degenerate_cases_are_abandoned() {
        // singular preconditioner: the derivative of x^2 is centered on zero
        let f = Rc::new(FnFunction::scalar(1, |d| d[var(0)].sqr()).with_gradient(|d| vec![2.0 * d[var(0)]]));
        let newton = Newton::new(f).unwrap();
        let mut d = IntervalBox::from_bounds(&[(-0.001, 0.001)]);
        assert_eq!(newton.newton(&mut d), Ok(NewtonStatus::Abandoned));
        assert_eq!(d, IntervalBox::from_bounds(&[(-0.001, 0.001)]));

        // the derivative of x^3 - x vanishes in the box
        let f = Rc::new(
            FnFunction::scalar(1, |d| d[var(0)] * d[var(0)] * d[var(0)] - d[var(0)])
                .with_gradient(|d| vec![3.0 * d[var(0)].sqr() - 1.0]),
        );
        let newton = Newton::new(f).unwrap();
        let mut d = IntervalBox::from_bounds(&[(0.574, 0.579)]);
        assert!(d.max_diam() <= newton.ceil());
        assert_eq!(newton.newton(&mut d), Ok(NewtonStatus::Abandoned));
        assert_eq!(d, IntervalBox::from_bounds(&[(0.574, 0.579)]));
    }

    #[test]
    fn test_configuration() {
        let f = Rc::new(FnFunction::vector(2, 1, |d| vec![d[var(0)] + d[var(1)]]));
        assert_eq!(
            Newton::new(f).err(),
            Some(ConfigError::NonSquareSystem {
                equations: 1,
                variables: 2
            })
        );
        assert!(Newton::new(sqrt2()).unwrap().with_ceil(-1.0).is_err());
        assert!(Newton::new(sqrt2()).unwrap().with_prec(0.0).is_err());
    }
}
