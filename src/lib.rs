// Threshold-driven principal component reduction.

#![doc = include_str!("../README.md")]

mod error;
mod pca;

pub use error::PcaError;
pub use pca::{
    covariance, from_rows, normalized, project, zero_centered, Pca, DEFAULT_THRESHOLD,
};
