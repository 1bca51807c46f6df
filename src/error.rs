//! Errors reported at the dispatch boundary.
//!
//! The update rules themselves never fail; everything here is raised before a
//! rule runs, while checking the buffers and names a caller supplied.

use thiserror::Error;

/// Why an update could not be launched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    #[error("`{name}` has shape {actual:?}, expected {expected:?} to match `var`")]
    ShapeMismatch {
        name: &'static str,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("`{name}` must hold exactly one element, got {len}")]
    NotScalar { name: &'static str, len: usize },

    #[error("`var` must be a matrix, got shape {shape:?}")]
    NotMatrix { shape: Vec<usize> },

    #[error("{op} takes {expected_slots} slot(s) and {expected_scalars} scalar(s), got {slots} and {scalars}")]
    Arity {
        op: &'static str,
        expected_slots: usize,
        expected_scalars: usize,
        slots: usize,
        scalars: usize,
    },

    #[error("{0} needs a gradient")]
    MissingGradient(&'static str),

    #[error("unknown update operation `{0}`")]
    UnknownOp(String),

    #[error("unknown optimizer `{0}`; expected one of gd, momentum, adagrad, adadelta, adam, rmsprop, max_weight_col_norm")]
    UnknownOptimizer(String),
}
