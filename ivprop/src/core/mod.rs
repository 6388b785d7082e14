//! Interval primitives: intervals, boxes and interval matrices.

mod interval;
mod ivbox;
mod matrix;
pub mod rounding;

pub use interval::{relative_contraction, Interval};
pub use ivbox::IntervalBox;
pub use matrix::{IntervalMatrix, Matrix, SingularMatrix};

crate::create_ref_type!(VarId);

/// Signals that an update emptied the domain of a variable (and thus the whole box).
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[error("the domain of {0} became empty")]
pub struct EmptyDomain(pub VarId);
