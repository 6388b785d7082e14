//! Interval constraint propagation.
//!
//! This crate provides the building blocks of an interval branch-and-prune solver:
//!
//!  - outward-rounded [intervals](core::Interval), [boxes](core::IntervalBox) and interval matrices,
//!  - [contractors](contractors::Contractor) narrowing boxes with respect to numerical constraints,
//!    among which the interval [Newton](contractors::Newton) operator and the
//!    [box consistency](contractors::BoxNarrow) operator,
//!  - a [propagation](contractors::Propagation) scheduler computing the fixpoint of a set of contractors,
//!  - a [double heap](search::DoubleHeap) ordering the cells of a search by two costs at once,
//!    and a simple [search driver](search::Solver).
//!
//! Tuning parameters can be overridden through environment variables, see [`params`].

pub mod collections;
pub mod contractors;
pub mod core;
pub mod function;
pub mod params;
pub mod search;
pub mod system;
