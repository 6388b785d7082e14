//! Branch-and-prune search over boxes.
//!
//! The search space is split into [`Cell`]s that are stored in a [`CellBuffer`]. The order in which
//! cells are explored is entirely decided by the buffer: a [`CellStack`] gives a depth-first
//! exploration while a [`DoubleHeap`] interleaves two best-first orderings.

mod bisector;
mod buffer;
mod cell;
mod cost;
mod double_heap;
mod solver;

pub use bisector::{Bisector, LargestFirst, RoundRobin};
pub use buffer::{CellBuffer, CellStack};
pub use cell::Cell;
pub use cost::{CostFunction, Depth, Loup, MaxDiam, MinLb, MinUb, Volatile, C3};
pub use double_heap::{DoubleHeap, EmptyHeap};
pub use solver::{Solver, SolverConfig, SolverStats, SolverStatus};
