//! Error types for the drift core.
//!
//! The simulation itself cannot fail. These errors come from the surfaces
//! around it: validating a [`Seed`](crate::Seed) and its parameters,
//! decoding a formation mask, and writing snapshots.

use thiserror::Error;

/// Errors produced outside the per-tick simulation path.
#[derive(Debug, Error)]
pub enum EngineError {
    /// World or frame dimensions were zero, non-finite, or overflowed.
    #[error("invalid dimensions: width and height must be non-zero and finite")]
    InvalidDimensions,

    /// A formation bitmap could not be turned into a target list.
    #[error("invalid formation mask: {0}")]
    InvalidMask(String),

    /// A simulation parameter fell outside its published range.
    #[error("invalid parameter: {0}")]
    InvalidParams(String),

    /// A reproducible run description failed validation.
    #[error("invalid seed: {0}")]
    Seed(String),

    /// Reading or writing a file failed.
    #[error("i/o error: {0}")]
    Io(String),
}
