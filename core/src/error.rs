//! Core error types for dayfeed.
//!
//! Incomplete input is never an error here: a scan that runs off the end of
//! the buffer simply reports "need more". The variants below are the
//! conditions that end a session.

use alloc::string::String;
use core::fmt;

/// Failure reported by an upstream generation source.
///
/// Carries a human-readable message; the session forwards it to the
/// consumer in its terminal `error` event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    message: String,
}

impl SourceError {
    /// Create a source error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The upstream message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<String> for SourceError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for SourceError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SourceError {}

/// Core dayfeed error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The session buffer would grow past its configured limit.
    BufferLimitExceeded {
        /// Buffer length the rejected delta would have produced.
        len: usize,
        /// Maximum allowed buffer length.
        limit: usize,
    },

    /// The upstream generation source failed.
    Source(SourceError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BufferLimitExceeded { len, limit } => {
                write!(f, "buffer size {} exceeds maximum {}", len, limit)
            }
            Error::Source(err) => write!(f, "generation failed: {}", err),
        }
    }
}

impl From<SourceError> for Error {
    fn from(err: SourceError) -> Self {
        Error::Source(err)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Source(err) => Some(err),
            Error::BufferLimitExceeded { .. } => None,
        }
    }
}
