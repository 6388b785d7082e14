use crate::core::{IntervalBox, VarId};
use std::fmt::{Display, Formatter};

/// A node of the search tree: a box together with some bookkeeping.
#[derive(Clone, Debug)]
pub struct Cell {
    pub domains: IntervalBox,
    /// Number of bisections that led from the root cell to this one.
    pub depth: u32,
    /// Unique identifier of the cell in its search.
    pub id: u64,
    /// Variable along which the parent cell was split, `None` for the root.
    pub last_split: Option<VarId>,
}

impl Cell {
    pub fn root(domains: IntervalBox) -> Cell {
        Cell {
            domains,
            depth: 0,
            id: 0,
            last_split: None,
        }
    }

    /// Builds the child of this cell holding `domains`, obtained by splitting along `var`.
    pub fn child(&self, domains: IntervalBox, var: VarId, id: u64) -> Cell {
        Cell {
            domains,
            depth: self.depth + 1,
            id,
            last_split: Some(var),
        }
    }
}

impl Display for Cell {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} (depth {}) {}", self.id, self.depth, self.domains)
    }
}
