//! Crate-wide error type.
//!
//! Mirrors the taxonomy of malformed-file / invalid-argument / I/O / ordering
//! failures; lookup misses and minimization-hash overflow are not modeled
//! here because the spec requires they never surface as errors.

use std::fmt;
use std::io;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced at the public boundaries: `open`, `add`, `compile`, `get`.
#[derive(Debug)]
pub enum Error {
    /// Missing magic, unsupported version, truncated region, or invalid JSON header.
    Malformed { reason: String },
    /// Unknown compression name, unknown value-store type, or a dimension mismatch on merge.
    InvalidArgument { reason: String },
    /// Chunk creation, resize, or write failure.
    Io(io::Error),
    /// `add` called on a compiler that has already finalized.
    AlreadyCompiled,
    /// Header JSON (de)serialization failure.
    Json(serde_json::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed { reason } => write!(f, "malformed keyvi file: {reason}"),
            Self::InvalidArgument { reason } => write!(f, "invalid argument: {reason}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::AlreadyCompiled => write!(f, "add() called after compile()"),
            Self::Json(e) => write!(f, "header JSON error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }
}
