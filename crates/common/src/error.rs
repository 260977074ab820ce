//! Error taxonomy shared by every envelope crate.

use std::io;

use thiserror::Error;

/// Coarse failure category of an [`EnvelopeError`].
///
/// Callers match on this instead of on message payloads. Every category is
/// fatal to the Encrypt/Decrypt call that produced it; none are retryable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A required input is missing or malformed.
    ArgumentInvalid,
    /// The requested cipher configuration is not in the supported set.
    AlgorithmUnavailable,
    /// Key transport unwrap or symmetric padding validation failed.
    KeyMaterialInvalid,
    /// A length prefix is missing, incomplete, negative, or over the bound.
    FramingViolation,
    /// The stream ended before the declared or required number of bytes.
    StreamTruncated,
    /// The key provider could not supply a usable key handle.
    KeyAccessError,
    /// The underlying stream failed to read or write.
    Io,
}

/// Top-level error type for envelope encryption.
///
/// Variants map to process exit codes used by the CLI:
/// - [`ErrorKind::ArgumentInvalid`] / [`ErrorKind::AlgorithmUnavailable`] → 2
/// - [`ErrorKind::KeyMaterialInvalid`] → 3
/// - [`ErrorKind::FramingViolation`] / [`ErrorKind::StreamTruncated`] → 4
/// - [`ErrorKind::KeyAccessError`] → 5
/// - [`ErrorKind::Io`] → 74
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// A required argument was missing or malformed.
    #[error("invalid argument: {0}")]
    ArgumentInvalid(String),

    /// The cipher configuration is not supported.
    #[error("algorithm unavailable: {0}")]
    AlgorithmUnavailable(String),

    /// Key transport failed: wrong key, corrupted blob, or a key of the wrong size.
    #[error("invalid key material: {0}")]
    KeyMaterialInvalid(String),

    /// The final ciphertext block did not carry valid padding.
    #[error("invalid key material: ciphertext padding did not validate")]
    PaddingInvalid,

    /// A length prefix could not be decoded or exceeded the allowed bound.
    #[error("framing violation: {0}")]
    FramingViolation(String),

    /// Fewer bytes were available than required.
    #[error("stream truncated: expected {expected} bytes, got {actual}")]
    StreamTruncated {
        /// Number of bytes the framing or the block cipher required.
        expected: u64,
        /// Number of bytes actually available.
        actual: u64,
    },

    /// The key provider could not produce a key handle.
    #[error("key access error for certificate {id}: {reason}")]
    KeyAccess {
        /// Identifier of the certificate that was requested.
        id: String,
        /// Human-readable cause.
        reason: String,
    },

    /// An I/O error from the caller's stream.
    #[error("i/o failure: {0}")]
    Io(#[source] io::Error),
}

impl EnvelopeError {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            EnvelopeError::ArgumentInvalid(_) => ErrorKind::ArgumentInvalid,
            EnvelopeError::AlgorithmUnavailable(_) => ErrorKind::AlgorithmUnavailable,
            EnvelopeError::KeyMaterialInvalid(_) | EnvelopeError::PaddingInvalid => {
                ErrorKind::KeyMaterialInvalid
            }
            EnvelopeError::FramingViolation(_) => ErrorKind::FramingViolation,
            EnvelopeError::StreamTruncated { .. } => ErrorKind::StreamTruncated,
            EnvelopeError::KeyAccess { .. } => ErrorKind::KeyAccessError,
            EnvelopeError::Io(_) => ErrorKind::Io,
        }
    }

    /// Returns the process exit code that should be used for this error.
    pub fn exit_code(&self) -> u8 {
        match self.kind() {
            ErrorKind::ArgumentInvalid | ErrorKind::AlgorithmUnavailable => 2,
            ErrorKind::KeyMaterialInvalid => 3,
            ErrorKind::FramingViolation | ErrorKind::StreamTruncated => 4,
            ErrorKind::KeyAccessError => 5,
            ErrorKind::Io => 74,
        }
    }

    /// Wrap this error so it can travel through `std::io::Read`/`Write`.
    ///
    /// The inverse conversion (`From<io::Error>`) recovers the original error.
    pub fn into_io(self) -> io::Error {
        match self {
            EnvelopeError::Io(err) => err,
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}

impl From<io::Error> for EnvelopeError {
    fn from(err: io::Error) -> Self {
        if err
            .get_ref()
            .is_some_and(|inner| inner.is::<EnvelopeError>())
        {
            if let Some(Ok(inner)) = err.into_inner().map(|e| e.downcast::<EnvelopeError>()) {
                return *inner;
            }
            return EnvelopeError::Io(io::Error::other("envelope error lost in transit"));
        }
        EnvelopeError::Io(err)
    }
}
