//! Error types for RMI construction and model fitting

use thiserror::Error;

/// Errors returned by [`crate::Rmi::build`].
///
/// All of these are detected before the first node is fitted, so a failed
/// build never leaves a partial tree behind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RmiError {
    /// Keys must be in non-decreasing order; `position` is the first index
    /// `i` with `keys[i] > keys[i + 1]`.
    #[error("keys must be sorted in non-decreasing order (keys[{position}] > keys[{}])", .position + 1)]
    Unsorted { position: usize },

    #[error("cannot build an index over an empty key set")]
    EmptyInput,

    #[error("invalid tree shape: width={width}, depth={depth} (both must be >= 1)")]
    InvalidShape { width: usize, depth: usize },

    #[error("tree shape width={width}, depth={depth} exceeds the node slot limit of {limit}")]
    ShapeTooLarge {
        width: usize,
        depth: usize,
        limit: usize,
    },
}

/// Reasons a node's samples cannot be fitted by least squares.
///
/// Construction recovers from every variant locally by falling back to an
/// offset model, so these never reach the caller of `build`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegressionError {
    #[error("key and rank sequences differ in length ({keys} keys, {ranks} ranks)")]
    LengthMismatch { keys: usize, ranks: usize },

    #[error("need at least 2 samples to fit a line, got {0}")]
    TooFewSamples(usize),

    #[error("all keys are identical, variance is zero")]
    ZeroVariance,
}
