//! Module containing the Sylva universal error type
use thiserror::Error;

/// Universal error type for Sylva
#[derive(Error, Debug)]
pub enum Error {
    /// The scene contains no shapes
    #[error("scene contains no shapes")]
    EmptyScene,

    /// A visitor had no rule for the given node kind
    #[error("no rule for node kind `{0}`")]
    Unsupported(&'static str),

    /// Discretization produced no geometry
    #[error("could not discretize node kind `{0}`")]
    DiscretizationFailed(&'static str),

    /// The serialization traversal failed; see logs for the failing node
    #[error("scene serialization failed")]
    SerializationFailed,

    /// Speed is outside the 0-10 range
    #[error("speed {0} is outside the 0-10 range")]
    BadSpeed(i32),

    /// Encoded buffer does not start with the codec magic
    #[error("encoded buffer does not start with the codec magic")]
    BadMagic,

    /// Encoded buffer has an unsupported version
    #[error("unsupported codec version {0}")]
    BadVersion(u8),

    /// Encoded buffer ended before the expected payload
    #[error("encoded buffer is truncated")]
    TruncatedBuffer,

    /// Attribute table in the encoded buffer is malformed
    #[error("malformed attribute table in encoded buffer")]
    BadAttribute,

    /// IO error; see inner code for details
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}
