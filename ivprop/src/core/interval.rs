use crate::core::rounding::*;
use std::fmt::{Debug, Display, Formatter};
use std::ops::{Add, BitAnd, BitOr, Div, Mul, Neg, Sub};

/// A closed interval `[lb, ub]` of the extended reals, or the empty set.
///
/// All arithmetic operations are outward-rounded: the result is guaranteed to contain every
/// value obtained by applying the operation to points of the operands. Emptiness is
/// contagious: any operation involving an empty interval yields an empty interval.
#[derive(Copy, Clone, PartialEq)]
pub struct Interval {
    lb: f64,
    ub: f64,
}

impl Interval {
    pub const EMPTY: Interval = Interval {
        lb: f64::INFINITY,
        ub: f64::NEG_INFINITY,
    };
    pub const ENTIRE: Interval = Interval {
        lb: f64::NEG_INFINITY,
        ub: f64::INFINITY,
    };
    pub const ZERO: Interval = Interval { lb: 0.0, ub: 0.0 };
    pub const ONE: Interval = Interval { lb: 1.0, ub: 1.0 };

    /// Creates the interval `[lb, ub]`. Returns the empty interval if `lb > ub`, if a bound is NaN
    /// or if the interval would only contain an infinity.
    pub fn new(lb: f64, ub: f64) -> Interval {
        if lb.is_nan() || ub.is_nan() || lb > ub || lb == f64::INFINITY || ub == f64::NEG_INFINITY {
            Interval::EMPTY
        } else {
            Interval { lb, ub }
        }
    }

    /// The degenerate interval `[x, x]`.
    pub fn point(x: f64) -> Interval {
        Interval::new(x, x)
    }

    pub fn lb(self) -> f64 {
        self.lb
    }

    pub fn ub(self) -> f64 {
        self.ub
    }

    pub fn is_empty(self) -> bool {
        self.lb > self.ub
    }

    pub fn is_bounded(self) -> bool {
        !self.is_empty() && self.lb.is_finite() && self.ub.is_finite()
    }

    /// True if the interval is reduced to a single point.
    pub fn is_degenerated(self) -> bool {
        self.lb == self.ub
    }

    /// Width of the interval, rounded upward. The empty interval has a zero diameter.
    pub fn diam(self) -> f64 {
        if self.is_empty() {
            0.0
        } else {
            sub_up(self.ub, self.lb)
        }
    }

    /// Midpoint of the interval, always a member of the interval. Unbounded intervals have their
    /// midpoint at zero (entire line) or at the largest finite float in the unbounded direction.
    /// Panics in debug mode if the interval is empty.
    pub fn mid(self) -> f64 {
        debug_assert!(!self.is_empty(), "midpoint of an empty interval");
        match (self.lb.is_finite(), self.ub.is_finite()) {
            (false, false) => 0.0,
            (false, true) => -f64::MAX,
            (true, false) => f64::MAX,
            (true, true) => (0.5 * self.lb + 0.5 * self.ub).clamp(self.lb, self.ub),
        }
    }

    /// Largest absolute value of the interval.
    pub fn mag(self) -> f64 {
        self.lb.abs().max(self.ub.abs())
    }

    /// True if a float lies strictly between the bounds, so that splitting at the midpoint gives two
    /// halves that are both strictly smaller than the interval.
    pub fn is_bisectable(self) -> bool {
        if self.is_empty() {
            return false;
        }
        let mid = self.mid();
        self.lb < mid && mid < self.ub
    }

    pub fn contains(self, x: f64) -> bool {
        self.lb <= x && x <= self.ub
    }

    pub fn contains_zero(self) -> bool {
        self.contains(0.0)
    }

    /// True if `self ⊆ other`. The empty interval is a subset of every interval.
    pub fn is_subset(self, other: Interval) -> bool {
        self.is_empty() || (other.lb <= self.lb && self.ub <= other.ub)
    }

    /// True if `self` is included in the interior of `other`.
    pub fn is_interior_subset(self, other: Interval) -> bool {
        self.is_empty()
            || ((other.lb < self.lb || other.lb == f64::NEG_INFINITY)
                && (self.ub < other.ub || other.ub == f64::INFINITY))
    }

    pub fn intersect(self, other: Interval) -> Interval {
        Interval::new(self.lb.max(other.lb), self.ub.min(other.ub))
    }

    /// Smallest interval containing both `self` and `other`.
    pub fn hull(self, other: Interval) -> Interval {
        if self.is_empty() {
            other
        } else if other.is_empty() {
            self
        } else {
            Interval::new(self.lb.min(other.lb), self.ub.max(other.ub))
        }
    }

    /// Splits the interval at `lb + ratio * diam` (at the midpoint for unbounded intervals or when the
    /// split point would not be strictly inside). Both halves share the split point.
    pub fn bisect(self, ratio: f64) -> (Interval, Interval) {
        debug_assert!(!self.is_empty());
        debug_assert!(ratio > 0.0 && ratio < 1.0);
        let mid = self.mid();
        let split = if !self.is_bounded() || ratio == 0.5 {
            mid
        } else {
            let p = self.lb + ratio * (self.ub - self.lb);
            if self.lb < p && p < self.ub {
                p
            } else {
                mid
            }
        };
        (Interval::new(self.lb, split), Interval::new(split, self.ub))
    }

    pub fn abs(self) -> Interval {
        if self.is_empty() {
            self
        } else if self.lb >= 0.0 {
            self
        } else if self.ub <= 0.0 {
            -self
        } else {
            Interval::new(0.0, self.mag())
        }
    }

    pub fn sqr(self) -> Interval {
        if self.is_empty() {
            return self;
        }
        let a = self.abs();
        Interval::new(mul_down(a.lb, a.lb), mul_up(a.ub, a.ub))
    }

    /// Square root of the non-negative part of the interval.
    pub fn sqrt(self) -> Interval {
        let x = self.intersect(Interval::new(0.0, f64::INFINITY));
        if x.is_empty() {
            return Interval::EMPTY;
        }
        Interval::new(sqrt_down(x.lb), sqrt_up(x.ub))
    }

    /// Division by an interval that does not contain zero in its interior.
    fn div_zero_free(self, d: Interval) -> Interval {
        if self.lb == 0.0 && self.ub == 0.0 {
            return Interval::ZERO;
        }
        // x / d = (-x) / (-d): only consider positive divisors, possibly with lb = 0
        let (x, d) = if d.lb >= 0.0 { (self, d) } else { (-self, -d) };
        if d.lb == 0.0 {
            if x.lb >= 0.0 {
                if x.lb == 0.0 {
                    Interval::new(0.0, f64::INFINITY)
                } else {
                    Interval::new(div_down(x.lb, d.ub), f64::INFINITY)
                }
            } else if x.ub <= 0.0 {
                if x.ub == 0.0 {
                    Interval::new(f64::NEG_INFINITY, 0.0)
                } else {
                    Interval::new(f64::NEG_INFINITY, div_up(x.ub, d.ub))
                }
            } else {
                Interval::ENTIRE
            }
        } else if x.lb >= 0.0 {
            Interval::new(div_down(x.lb, d.ub), div_up(x.ub, d.lb))
        } else if x.ub <= 0.0 {
            Interval::new(div_down(x.lb, d.lb), div_up(x.ub, d.ub))
        } else {
            Interval::new(div_down(x.lb, d.lb), div_up(x.ub, d.lb))
        }
    }
}

/// Relative contraction from `old` to `new`, in `[0, 1]`, where `new ⊆ old`.
///
/// `(diam(old) - diam(new)) / diam(old)`, where `0/0` counts as no contraction, an empty result as
/// a full contraction, and on unbounded intervals a bound becoming finite as a full contraction.
pub fn relative_contraction(old: Interval, new: Interval) -> f64 {
    if new.is_empty() {
        return if old.is_empty() { 0.0 } else { 1.0 };
    }
    let old_diam = old.diam();
    if old_diam == 0.0 {
        return 0.0;
    }
    if old_diam.is_infinite() {
        let bounded_lb = old.lb.is_infinite() && new.lb.is_finite();
        let bounded_ub = old.ub.is_infinite() && new.ub.is_finite();
        return if bounded_lb || bounded_ub { 1.0 } else { 0.0 };
    }
    ((old_diam - new.diam()) / old_diam).clamp(0.0, 1.0)
}

impl From<f64> for Interval {
    fn from(x: f64) -> Self {
        Interval::point(x)
    }
}

impl From<(f64, f64)> for Interval {
    fn from((lb, ub): (f64, f64)) -> Self {
        Interval::new(lb, ub)
    }
}

impl Neg for Interval {
    type Output = Interval;

    fn neg(self) -> Interval {
        if self.is_empty() {
            self
        } else {
            Interval { lb: -self.ub, ub: -self.lb }
        }
    }
}

impl Add for Interval {
    type Output = Interval;

    fn add(self, rhs: Interval) -> Interval {
        if self.is_empty() || rhs.is_empty() {
            return Interval::EMPTY;
        }
        Interval::new(add_down(self.lb, rhs.lb), add_up(self.ub, rhs.ub))
    }
}

impl Sub for Interval {
    type Output = Interval;

    fn sub(self, rhs: Interval) -> Interval {
        if self.is_empty() || rhs.is_empty() {
            return Interval::EMPTY;
        }
        Interval::new(sub_down(self.lb, rhs.ub), sub_up(self.ub, rhs.lb))
    }
}

impl Mul for Interval {
    type Output = Interval;

    fn mul(self, rhs: Interval) -> Interval {
        if self.is_empty() || rhs.is_empty() {
            return Interval::EMPTY;
        }
        let (a, b) = (self, rhs);
        let lb = mul_down(a.lb, b.lb)
            .min(mul_down(a.lb, b.ub))
            .min(mul_down(a.ub, b.lb))
            .min(mul_down(a.ub, b.ub));
        let ub = mul_up(a.lb, b.lb)
            .max(mul_up(a.lb, b.ub))
            .max(mul_up(a.ub, b.lb))
            .max(mul_up(a.ub, b.ub));
        Interval::new(lb, ub)
    }
}

impl Div for Interval {
    type Output = Interval;

    /// Interval division. Dividing by `[0, 0]` yields the empty interval, dividing by an interval
    /// with zero in its interior yields the hull of the two-piece result (usually the entire line).
    fn div(self, rhs: Interval) -> Interval {
        if self.is_empty() || rhs.is_empty() || (rhs.lb == 0.0 && rhs.ub == 0.0) {
            return Interval::EMPTY;
        }
        if rhs.lb < 0.0 && rhs.ub > 0.0 {
            if self.lb == 0.0 && self.ub == 0.0 {
                return Interval::ZERO;
            }
            return Interval::ENTIRE;
        }
        self.div_zero_free(rhs)
    }
}

macro_rules! scalar_ops {
    ($($tr:ident $f:ident),*) => {
        $(
            impl $tr<f64> for Interval {
                type Output = Interval;

                fn $f(self, rhs: f64) -> Interval {
                    $tr::$f(self, Interval::point(rhs))
                }
            }
            impl $tr<Interval> for f64 {
                type Output = Interval;

                fn $f(self, rhs: Interval) -> Interval {
                    $tr::$f(Interval::point(self), rhs)
                }
            }
        )*
    };
}
scalar_ops!(Add add, Sub sub, Mul mul, Div div);

/// Intersection.
impl BitAnd for Interval {
    type Output = Interval;

    fn bitand(self, rhs: Interval) -> Interval {
        self.intersect(rhs)
    }
}

/// Hull.
impl BitOr for Interval {
    type Output = Interval;

    fn bitor(self, rhs: Interval) -> Interval {
        self.hull(rhs)
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            write!(f, "[empty]")
        } else {
            write!(f, "[{}, {}]", self.lb, self.ub)
        }
    }
}

impl Debug for Interval {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::StdRng;
    use rand::{Rng, SeedableRng};

    fn itv(lb: f64, ub: f64) -> Interval {
        Interval::new(lb, ub)
    }

    #[test]
    fn construction() {
        assert!(itv(2.0, 1.0).is_empty());
        assert!(itv(f64::NAN, 1.0).is_empty());
        assert!(itv(f64::INFINITY, f64::INFINITY).is_empty());
        assert_eq!(itv(1.0, 2.0).diam(), 1.0);
        assert_eq!(itv(1.0, 2.0).mid(), 1.5);
        assert_eq!(Interval::ENTIRE.mid(), 0.0);
        assert_eq!(Interval::EMPTY.diam(), 0.0);
        assert_eq!(Interval::EMPTY, itv(3.0, -3.0));
        assert!(Interval::point(4.0).is_degenerated());
    }

    #[test]
    fn set_operations() {
        let a = itv(0.0, 2.0);
        let b = itv(1.0, 3.0);
        assert_eq!(a & b, itv(1.0, 2.0));
        assert_eq!(a | b, itv(0.0, 3.0));
        assert!((a & itv(5.0, 6.0)).is_empty());
        assert!(itv(0.5, 1.0).is_subset(a));
        assert!(itv(0.5, 1.0).is_interior_subset(a));
        assert!(!itv(0.0, 1.0).is_interior_subset(a));
        assert!(Interval::EMPTY.is_subset(a));
    }

    #[test]
    fn arithmetic() {
        assert_eq!(itv(1.0, 2.0) + itv(3.0, 4.0), itv(4.0, 6.0));
        assert_eq!(itv(1.0, 2.0) - itv(3.0, 4.0), itv(-3.0, -1.0));
        assert_eq!(itv(-1.0, 2.0) * itv(3.0, 4.0), itv(-4.0, 8.0));
        assert_eq!(itv(2.0, 4.0) / itv(1.0, 2.0), itv(1.0, 4.0));
        assert_eq!(itv(-2.0, 3.0).sqr(), itv(0.0, 9.0));
        assert_eq!(itv(4.0, 9.0).sqrt(), itv(2.0, 3.0));
        assert_eq!(itv(-2.0, 3.0).abs(), itv(0.0, 3.0));
        assert_eq!(-itv(1.0, 2.0), itv(-2.0, -1.0));
        assert_eq!(itv(1.0, 2.0) * 2.0, itv(2.0, 4.0));
        assert!((itv(1.0, 2.0) + Interval::EMPTY).is_empty());
    }

    #[test]
    fn division_by_zero_containing_intervals() {
        assert!((itv(1.0, 2.0) / Interval::ZERO).is_empty());
        assert_eq!(itv(1.0, 2.0) / itv(-1.0, 1.0), Interval::ENTIRE);
        assert_eq!(itv(1.0, 2.0) / itv(0.0, 2.0), itv(0.5, f64::INFINITY));
        assert_eq!(itv(-2.0, -1.0) / itv(0.0, 2.0), itv(f64::NEG_INFINITY, -0.5));
        assert_eq!(itv(1.0, 2.0) / itv(-2.0, 0.0), itv(f64::NEG_INFINITY, -0.5));
    }

    #[test]
    fn operations_contain_point_results() {
        let mut rng = StdRng::seed_from_u64(2_718_281);
        for _ in 0..1000 {
            let mut draw = || {
                let a: f64 = rng.random_range(-10.0..10.0);
                let b: f64 = rng.random_range(-10.0..10.0);
                itv(a.min(b), a.max(b))
            };
            let x = draw();
            let y = draw();
            let px = x.lb() + 0.3 * (x.ub() - x.lb());
            let py = y.lb() + 0.7 * (y.ub() - y.lb());
            assert!((x + y).contains(px + py));
            assert!((x - y).contains(px - py));
            assert!((x * y).contains(px * py));
            if !y.contains_zero() {
                assert!((x / y).contains(px / py), "{x} / {y} misses {px} / {py}");
            }
            assert!(x.sqr().contains(px * px));
        }
    }

    #[test]
    fn bisection() {
        let (l, r) = itv(0.0, 4.0).bisect(0.5);
        assert_eq!(l, itv(0.0, 2.0));
        assert_eq!(r, itv(2.0, 4.0));
        let (l, r) = itv(0.0, 4.0).bisect(0.25);
        assert_eq!(l, itv(0.0, 1.0));
        assert_eq!(r, itv(1.0, 4.0));
        let (l, r) = Interval::ENTIRE.bisect(0.5);
        assert_eq!(l.ub(), 0.0);
        assert_eq!(r.lb(), 0.0);

        assert!(itv(0.0, 4.0).is_bisectable());
        assert!(Interval::ENTIRE.is_bisectable());
        assert!(itv(0.0, f64::INFINITY).is_bisectable());
        assert!(!itv(1.0, crate::core::rounding::next_up(1.0)).is_bisectable());
        assert!(!itv(f64::MAX, f64::INFINITY).is_bisectable());
        assert!(!itv(f64::NEG_INFINITY, -f64::MAX).is_bisectable());
        assert!(!Interval::EMPTY.is_bisectable());
    }

    #[test]
    fn contraction_measure() {
        assert_eq!(relative_contraction(itv(0.0, 4.0), itv(1.0, 3.0)), 0.5);
        assert_eq!(relative_contraction(itv(1.0, 1.0), itv(1.0, 1.0)), 0.0);
        assert_eq!(relative_contraction(itv(0.0, 4.0), Interval::EMPTY), 1.0);
        assert_eq!(relative_contraction(Interval::ENTIRE, itv(0.0, f64::INFINITY)), 1.0);
        assert_eq!(relative_contraction(Interval::ENTIRE, Interval::ENTIRE), 0.0);
    }
}
