use thiserror::Error;

/// Errors produced by the reduction pipeline.
///
/// Every failure is detected at the point of occurrence and propagates
/// immediately to the caller; none of these conditions is transient, so
/// there is nothing to retry.
#[derive(Debug, Error)]
pub enum PcaError {
    /// Empty matrix, zero rows, or ragged row lengths.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Inner dimensions disagree during matrix multiplication.
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// Division by zero arising from degenerate input, e.g. zero total
    /// variance, a constant matrix during normalization, or a
    /// single-sample covariance.
    #[error("numeric error: {0}")]
    NumericError(String),
}
