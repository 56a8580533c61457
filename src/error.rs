//! Error types of the spatial pooler.
//!
//! Every failure in this crate is a configuration or programming error, never a transient
//! condition. Errors are raised synchronously before any state is mutated.

use thiserror::Error;

/// Errors raised while configuring, initializing or running the Spatial Pooler.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HtmError {
    /// Neither a valid `num_active_columns_per_inh_area` nor a valid `local_area_density` was given.
    #[error(
        "inhibition parameters are invalid: num_active_columns_per_inh_area = {num_active}, local_area_density = {density}"
    )]
    InvalidInhibitionParameters {
        /// Configured number of active columns per inhibition area.
        num_active: f64,
        /// Configured local area density.
        density: f64,
    },

    /// Input or column dimensions are unusable (empty, zero-sized or mismatched in rank).
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// A single configuration value is out of its valid range.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        /// Name of the offending parameter.
        name: &'static str,
        /// Why the value was rejected.
        message: String,
    },

    /// The input vector handed to `compute` does not have `num_inputs` elements.
    #[error("input array must have {expected} elements, got {actual}")]
    InputSizeMismatch {
        /// Number of inputs the pooler was configured with.
        expected: usize,
        /// Length of the given input vector.
        actual: usize,
    },

    /// The output array handed to `compute` does not have `num_columns` elements.
    #[error("output array must have {expected} elements, got {actual}")]
    OutputSizeMismatch {
        /// Number of columns the pooler was configured with.
        expected: usize,
        /// Length of the given output array.
        actual: usize,
    },

    /// A column's potential pool can never reach the stimulus threshold.
    #[error(
        "potential pool of column {column} has {pool_size} synapses, fewer than the stimulus threshold {stimulus_threshold}; \
         the stimulus threshold is likely too large relative to the input size"
    )]
    PotentialPoolTooSmall {
        /// Index of the column.
        column: usize,
        /// Size of its potential pool.
        pool_size: usize,
        /// Configured stimulus threshold.
        stimulus_threshold: f64,
    },

    /// A column index outside of the column space was addressed.
    #[error("column {index} does not exist (number of columns: {num_columns})")]
    UnknownColumn {
        /// The requested column.
        index: usize,
        /// Number of columns in the column space.
        num_columns: usize,
    },

    /// `compute` was called on memory that was never passed through `SpatialPooler::init`.
    #[error("connections are not initialized, call SpatialPooler::init first")]
    NotInitialized,

    /// Encoding or decoding a model snapshot failed.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

/// Result type alias using [`HtmError`].
pub type Result<T> = std::result::Result<T, HtmError>;
