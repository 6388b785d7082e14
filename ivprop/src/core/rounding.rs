//! Directed rounding of the elementary floating-point operations.
//!
//! The hardware rounds every operation to nearest. The exact error of that rounding is
//! recovered with an error-free transformation (TwoSum for additions, a fused multiply-add
//! residual for products, quotients and square roots) and its sign tells on which side of
//! the computed value the true result lies. Exact results are therefore left untouched and
//! inexact ones are moved by one ulp in the requested direction.

/// Below this magnitude the residual of a product may underflow and can not be trusted.
const UNDERFLOW_GUARD: f64 = 1e-290;

/// Smallest float strictly greater than `x`.
pub fn next_up(x: f64) -> f64 {
    if x.is_nan() || x == f64::INFINITY {
        return x;
    }
    if x == 0.0 {
        return f64::from_bits(1);
    }
    let bits = x.to_bits();
    if x > 0.0 {
        f64::from_bits(bits + 1)
    } else {
        f64::from_bits(bits - 1)
    }
}

/// Largest float strictly lower than `x`.
pub fn next_down(x: f64) -> f64 {
    -next_up(-x)
}

/// Rounds `r`, the nearest rounding of an operation on finite operands that overflowed, downward.
fn overflow_down(r: f64) -> f64 {
    if r == f64::INFINITY {
        f64::MAX
    } else {
        r
    }
}

/// Rounds `r`, the nearest rounding of an operation on finite operands that overflowed, upward.
fn overflow_up(r: f64) -> f64 {
    if r == f64::NEG_INFINITY {
        -f64::MAX
    } else {
        r
    }
}

/// Exact value of `a + b - s` where `s` is the rounded sum (Knuth's TwoSum).
fn sum_residual(a: f64, b: f64, s: f64) -> f64 {
    let bb = s - a;
    (a - (s - bb)) + (b - bb)
}

pub fn add_down(a: f64, b: f64) -> f64 {
    let s = a + b;
    if !s.is_finite() {
        return if a.is_finite() && b.is_finite() { overflow_down(s) } else { s };
    }
    if sum_residual(a, b, s) < 0.0 {
        next_down(s)
    } else {
        s
    }
}

pub fn add_up(a: f64, b: f64) -> f64 {
    let s = a + b;
    if !s.is_finite() {
        return if a.is_finite() && b.is_finite() { overflow_up(s) } else { s };
    }
    if sum_residual(a, b, s) > 0.0 {
        next_up(s)
    } else {
        s
    }
}

pub fn sub_down(a: f64, b: f64) -> f64 {
    add_down(a, -b)
}

pub fn sub_up(a: f64, b: f64) -> f64 {
    add_up(a, -b)
}

/// Sign of the exact residual `a * b - p`, `None` if it can not be computed reliably.
fn mul_residual(a: f64, b: f64, p: f64) -> Option<f64> {
    if p.abs() < UNDERFLOW_GUARD {
        None
    } else {
        Some(a.mul_add(b, -p))
    }
}

pub fn mul_down(a: f64, b: f64) -> f64 {
    if a == 0.0 || b == 0.0 {
        return 0.0;
    }
    let p = a * b;
    if !p.is_finite() {
        return if a.is_finite() && b.is_finite() { overflow_down(p) } else { p };
    }
    match mul_residual(a, b, p) {
        Some(r) if r >= 0.0 => p,
        _ => next_down(p),
    }
}

pub fn mul_up(a: f64, b: f64) -> f64 {
    if a == 0.0 || b == 0.0 {
        return 0.0;
    }
    let p = a * b;
    if !p.is_finite() {
        return if a.is_finite() && b.is_finite() { overflow_up(p) } else { p };
    }
    match mul_residual(a, b, p) {
        Some(r) if r <= 0.0 => p,
        _ => next_up(p),
    }
}

/// Sign of the exact error of the quotient `q = a / b`: positive when `a / b > q`.
fn div_error_sign(a: f64, b: f64, q: f64) -> Option<f64> {
    if q.abs() < UNDERFLOW_GUARD {
        return None;
    }
    // r = a - q * b is exact, and a / b - q = r / b
    let r = (-q).mul_add(b, a);
    Some(if b > 0.0 { r } else { -r })
}

/// Quotient rounded downward. `b` must not be zero.
pub fn div_down(a: f64, b: f64) -> f64 {
    debug_assert!(b != 0.0);
    if a == 0.0 {
        return 0.0;
    }
    let q = a / b;
    if !a.is_finite() || !b.is_finite() {
        return q;
    }
    if !q.is_finite() {
        return overflow_down(q);
    }
    match div_error_sign(a, b, q) {
        Some(e) if e >= 0.0 => q,
        _ => next_down(q),
    }
}

/// Quotient rounded upward. `b` must not be zero.
pub fn div_up(a: f64, b: f64) -> f64 {
    debug_assert!(b != 0.0);
    if a == 0.0 {
        return 0.0;
    }
    let q = a / b;
    if !a.is_finite() || !b.is_finite() {
        return q;
    }
    if !q.is_finite() {
        return overflow_up(q);
    }
    match div_error_sign(a, b, q) {
        Some(e) if e <= 0.0 => q,
        _ => next_up(q),
    }
}

/// Square root rounded downward, `a >= 0`.
pub fn sqrt_down(a: f64) -> f64 {
    let s = a.sqrt();
    if a == 0.0 || !s.is_finite() {
        return s;
    }
    // a - s*s is exact, positive when the true root is above `s`
    if (-s).mul_add(s, a) < 0.0 {
        next_down(s)
    } else {
        s
    }
}

/// Square root rounded upward, `a >= 0`.
pub fn sqrt_up(a: f64) -> f64 {
    let s = a.sqrt();
    if a == 0.0 || !s.is_finite() {
        return s;
    }
    if (-s).mul_add(s, a) > 0.0 {
        next_up(s)
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_operations_are_not_widened() {
        assert_eq!(add_down(1.0, 2.0), 3.0);
        assert_eq!(add_up(1.0, 2.0), 3.0);
        assert_eq!(sub_up(2.0, 1.0), 1.0);
        assert_eq!(mul_down(3.0, 0.5), 1.5);
        assert_eq!(mul_up(-3.0, 0.5), -1.5);
        assert_eq!(div_down(3.0, 3.0), 1.0);
        assert_eq!(div_up(1.0, 4.0), 0.25);
        assert_eq!(sqrt_down(4.0), 2.0);
        assert_eq!(sqrt_up(4.0), 2.0);
    }

    #[test]
    fn inexact_operations_bracket_the_true_result() {
        // 0.1 + 0.2 is not representable
        let lo = add_down(0.1, 0.2);
        let hi = add_up(0.1, 0.2);
        assert!(lo < hi);
        assert_eq!(next_up(lo), hi);

        let lo = div_down(1.0, 3.0);
        let hi = div_up(1.0, 3.0);
        assert!(lo < hi);
        assert!(mul_down(lo, 3.0) <= 1.0 && mul_up(hi, 3.0) >= 1.0);

        let lo = sqrt_down(2.0);
        let hi = sqrt_up(2.0);
        assert!(lo < hi);
        assert!(mul_down(lo, lo) <= 2.0);
        assert!(mul_up(hi, hi) >= 2.0);
    }

    #[test]
    fn infinities_and_zeros() {
        assert_eq!(mul_down(0.0, f64::INFINITY), 0.0);
        assert_eq!(mul_up(f64::NEG_INFINITY, 0.0), 0.0);
        assert_eq!(add_down(f64::MAX, f64::MAX), f64::MAX);
        assert_eq!(add_up(f64::MAX, f64::MAX), f64::INFINITY);
        assert_eq!(add_up(-f64::MAX, -f64::MAX), -f64::MAX);
        assert_eq!(div_down(1.0, f64::INFINITY), 0.0);
        assert_eq!(next_up(0.0), f64::from_bits(1));
        assert_eq!(next_down(0.0), -f64::from_bits(1));
        assert_eq!(next_up(f64::NEG_INFINITY), -f64::MAX);
    }
}
