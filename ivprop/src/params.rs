//! Tunable parameters and their validation.
//!
//! Every tunable has a default that can be overridden through an environment variable, read once on
//! first access. Constructors taking tunables validate them and report a [`ConfigError`].

use env_param::EnvParam;

/// Maximal diameter of a box (over the scope) for the Newton contractor to be applied.
pub static NEWTON_CEIL: EnvParam<f64> = EnvParam::new("IVPROP_NEWTON_CEIL", "0.01");

/// Newton iterations stop when their relative gain falls below this value.
pub static NEWTON_PREC: EnvParam<f64> = EnvParam::new("IVPROP_NEWTON_PREC", "1e-7");

/// Gauss-Seidel sweeps are repeated while they contract the box by at least this ratio.
pub static GAUSS_SEIDEL_RATIO: EnvParam<f64> = EnvParam::new("IVPROP_GAUSS_SEIDEL_RATIO", "1e-4");

/// Propagation stops as soon as a round contracts the box by less than this ratio.
pub static PROPAG_RATIO: EnvParam<f64> = EnvParam::new("IVPROP_PROPAG_RATIO", "0.01");

/// A single contractor call must contract a variable by at least this ratio for the change to be propagated.
pub static NARROW_RATIO: EnvParam<f64> = EnvParam::new("IVPROP_NARROW_RATIO", "0.1");

/// Whether propagation only re-triggers the contractors depending on a narrowed variable.
pub static INCREMENTAL: EnvParam<bool> = EnvParam::new("IVPROP_INCREMENTAL", "true");

/// Percentage of the cells taken from the second ordering of a double heap.
pub static HEAP_BALANCE: EnvParam<f64> = EnvParam::new("IVPROP_HEAP_BALANCE", "50");

/// Seed of the random generator selecting the ordering to pop from in a double heap.
pub static HEAP_SEED: EnvParam<u64> = EnvParam::new("IVPROP_HEAP_SEED", "0");

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("parameter `{name}` must be strictly positive (got {value})")]
    NotPositive { name: &'static str, value: f64 },
    #[error("parameter `{name}` must be in the range (0, 1] (got {value})")]
    RatioOutOfRange { name: &'static str, value: f64 },
    #[error("the balance of a double heap must be a percentage in [0, 100] (got {0})")]
    BalanceOutOfRange(f64),
    #[error("expected a square system but got {equations} equation(s) over {variables} variable(s)")]
    NonSquareSystem { equations: usize, variables: usize },
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Checks that `value > 0`.
pub(crate) fn check_positive(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::NotPositive { name, value })
    }
}

/// Checks that `value` is in `(0, 1]`.
pub(crate) fn check_ratio(name: &'static str, value: f64) -> Result<f64, ConfigError> {
    if value > 0.0 && value <= 1.0 {
        Ok(value)
    } else {
        Err(ConfigError::RatioOutOfRange { name, value })
    }
}

pub(crate) fn check_balance(value: f64) -> Result<f64, ConfigError> {
    if (0.0..=100.0).contains(&value) {
        Ok(value)
    } else {
        Err(ConfigError::BalanceOutOfRange(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation() {
        assert_eq!(check_positive("ceil", 0.01), Ok(0.01));
        assert!(check_positive("ceil", 0.0).is_err());
        assert!(check_positive("ceil", f64::NAN).is_err());
        assert_eq!(check_ratio("r", 1.0), Ok(1.0));
        assert!(check_ratio("r", 0.0).is_err());
        assert!(check_ratio("r", 1.5).is_err());
        assert_eq!(check_balance(0.0), Ok(0.0));
        assert_eq!(check_balance(100.0), Ok(100.0));
        assert!(check_balance(100.5).is_err());
        assert!(check_balance(-1.0).is_err());
    }

    #[test]
    fn defaults_are_valid() {
        assert!(check_positive("ceil", NEWTON_CEIL.get()).is_ok());
        assert!(check_positive("prec", NEWTON_PREC.get()).is_ok());
        assert!(check_positive("gauss_seidel_ratio", GAUSS_SEIDEL_RATIO.get()).is_ok());
        assert!(check_ratio("propag_ratio", PROPAG_RATIO.get()).is_ok());
        assert!(check_ratio("narrow_ratio", NARROW_RATIO.get()).is_ok());
        assert!(check_balance(HEAP_BALANCE.get()).is_ok());
    }
}
