use crate::core::{IntervalBox, VarId};
use crate::params::{check_positive, ConfigError};
use crate::search::Cell;

/// Selects how a cell is split in two.
pub trait Bisector {
    /// Variable along which `cell` should be split, `None` if no variable is worth splitting.
    fn choose_var(&self, cell: &Cell) -> Option<VarId>;

    /// Position of the split point in the domain of the chosen variable, in `(0, 1)`.
    fn ratio(&self) -> f64;

    /// Splits the box of `cell` along the chosen variable.
    fn bisect(&self, cell: &Cell) -> Option<(VarId, IntervalBox, IntervalBox)> {
        let var = self.choose_var(cell)?;
        let (left, right) = cell.domains.bisect(var, self.ratio());
        Some((var, left, right))
    }
}

fn check_split_ratio(ratio: f64) -> Result<f64, ConfigError> {
    if ratio > 0.0 && ratio < 1.0 {
        Ok(ratio)
    } else {
        Err(ConfigError::RatioOutOfRange {
            name: "split_ratio",
            value: ratio,
        })
    }
}

/// Splits the widest domain that is wider than `prec`.
///
/// Domains that can not be split in two strictly smaller halves (such as `[MAX, +inf]`) are ignored.
#[derive(Copy, Clone, Debug)]
pub struct LargestFirst {
    prec: f64,
    ratio: f64,
}

impl LargestFirst {
    pub fn new(prec: f64, ratio: f64) -> Result<Self, ConfigError> {
        Ok(LargestFirst {
            prec: check_positive("bisection_prec", prec)?,
            ratio: check_split_ratio(ratio)?,
        })
    }
}

impl Bisector for LargestFirst {
    fn choose_var(&self, cell: &Cell) -> Option<VarId> {
        cell.domains.widest_var(self.prec)
    }

    fn ratio(&self) -> f64 {
        self.ratio
    }
}

/// Splits the variables in turn, starting after the one that was split last, and skipping the
/// domains that are not wider than `prec` or that can not be bisected.
#[derive(Copy, Clone, Debug)]
pub struct RoundRobin {
    prec: f64,
    ratio: f64,
}

impl RoundRobin {
    pub fn new(prec: f64, ratio: f64) -> Result<Self, ConfigError> {
        Ok(RoundRobin {
            prec: check_positive("bisection_prec", prec)?,
            ratio: check_split_ratio(ratio)?,
        })
    }
}

impl Bisector for RoundRobin {
    fn choose_var(&self, cell: &Cell) -> Option<VarId> {
        let n = cell.domains.dim();
        let start = cell.last_split.map_or(0, |v| usize::from(v) + 1);
        (0..n)
            .map(|i| VarId::from((start + i) % n))
            .find(|&v| cell.domains[v].diam() > self.prec && cell.domains[v].is_bisectable())
    }

    fn ratio(&self) -> f64 {
        self.ratio
    }
}
