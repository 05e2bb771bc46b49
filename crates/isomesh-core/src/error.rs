//! Error types for the engine.

use glam::IVec3;
use thiserror::Error;

/// Engine-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    /// A padded cache or density grid was indexed outside the range it was built for.
    #[error("out of bounds: {pos} is outside [{min}, {max})")]
    OutOfBounds {
        /// The offending coordinate.
        pos: IVec3,
        /// Inclusive lower corner of the covered range.
        min: IVec3,
        /// Exclusive upper corner of the covered range.
        max: IVec3,
    },

    /// A pool was used in a way its contract forbids.
    #[error("pool misuse: {0}")]
    PoolMisuse(String),

    /// The world, texture, or light provider failed to answer a query.
    #[error("external accessor failed: {0}")]
    ExternalAccessor(String),

    /// Invalid or unparsable configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Build an [`Error::OutOfBounds`] for `pos` against the half-open range `[min, max)`.
    pub fn out_of_bounds(pos: IVec3, min: IVec3, max: IVec3) -> Self {
        Self::OutOfBounds { pos, min, max }
    }

    /// Wrap an error reported by an external provider.
    pub fn external(source: impl std::fmt::Display) -> Self {
        Self::ExternalAccessor(source.to_string())
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
