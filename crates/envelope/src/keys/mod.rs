//! Key providers: resolve a certificate identifier to RSA key handles.
//!
//! The envelope layer never looks at certificate storage. It asks a
//! [`KeyProvider`] for a public key (Encrypt) or a private key (Decrypt) and
//! borrows the returned handle for one call.
//!
//! - [`DirectoryKeyProvider`] reads PEM certificates and keys from a directory.
//! - [`CachingKeyProvider`] memoises any provider; the caller owns its lifetime.

pub mod cache;
pub mod directory;

use std::{fmt, str::FromStr, sync::Arc};

use common::EnvelopeError;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use sha2::{Digest, Sha256};

pub use cache::CachingKeyProvider;
pub use directory::DirectoryKeyProvider;

/// Length of a SHA-256 thumbprint in bytes.
pub const THUMBPRINT_LEN: usize = 32;

/// Length of a legacy SHA-1 thumbprint in bytes, as shown by most certificate tooling.
pub const SHA1_THUMBPRINT_LEN: usize = 20;

/// A certificate thumbprint in upper-case hex: SHA-256 of the DER
/// certificate, or SHA-1 when parsed from a 20-byte thumbprint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CertificateId(String);

impl CertificateId {
    /// Parse a thumbprint as typed or pasted by a user.
    ///
    /// Spaces, colons and invisible left-to-right marks are ignored and hex
    /// digits may be in either case. Both SHA-256 and SHA-1 thumbprints are
    /// accepted; the length decides which digest is matched.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::ArgumentInvalid`] if the remaining text is not
    /// exactly [`THUMBPRINT_LEN`] or [`SHA1_THUMBPRINT_LEN`] bytes of hex.
    pub fn parse(thumbprint: &str) -> Result<Self, EnvelopeError> {
        let cleaned: String = thumbprint
            .chars()
            .filter(|c| !matches!(c, ' ' | ':' | '\u{200e}'))
            .collect();
        if cleaned.is_empty() {
            return Err(EnvelopeError::ArgumentInvalid(
                "certificate thumbprint must not be empty".into(),
            ));
        }
        let bytes = hex::decode(&cleaned).map_err(|e| {
            EnvelopeError::ArgumentInvalid(format!("thumbprint {thumbprint:?} is not hex: {e}"))
        })?;
        if bytes.len() != THUMBPRINT_LEN && bytes.len() != SHA1_THUMBPRINT_LEN {
            return Err(EnvelopeError::ArgumentInvalid(format!(
                "thumbprint must be {THUMBPRINT_LEN} (SHA-256) or {SHA1_THUMBPRINT_LEN} (SHA-1) bytes, got {}",
                bytes.len()
            )));
        }
        Ok(Self(hex::encode_upper(bytes)))
    }

    /// Compute the SHA-256 identifier of a DER-encoded certificate.
    pub fn of_der(certificate_der: &[u8]) -> Self {
        Self(hex::encode_upper(Sha256::digest(certificate_der)))
    }

    /// Compute the SHA-1 identifier of a DER-encoded certificate.
    pub fn sha1_of_der(certificate_der: &[u8]) -> Self {
        Self(hex::encode_upper(Sha1::digest(certificate_der)))
    }

    /// Returns `true` if this thumbprint identifies `certificate_der`, using
    /// whichever digest the thumbprint's length implies.
    pub fn matches_der(&self, certificate_der: &[u8]) -> bool {
        let computed = if self.is_sha1() {
            Self::sha1_of_der(certificate_der)
        } else {
            Self::of_der(certificate_der)
        };
        computed == *self
    }

    /// Returns `true` for a legacy SHA-1 thumbprint.
    pub fn is_sha1(&self) -> bool {
        self.0.len() == SHA1_THUMBPRINT_LEN * 2
    }

    /// The canonical upper-case hex form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CertificateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CertificateId {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Source of RSA key handles for certificates.
///
/// Implementations must be safe to share between threads; the returned
/// handles are read-only and may be used by many concurrent calls.
#[cfg_attr(test, mockall::automock)]
pub trait KeyProvider: Send + Sync {
    /// The RSA public key of the certificate `id`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::KeyAccess`] if the certificate is unknown or
    /// does not carry an RSA key.
    fn public_key(&self, id: &CertificateId) -> Result<Arc<RsaPublicKey>, EnvelopeError>;

    /// The RSA private key belonging to the certificate `id`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::KeyAccess`] if no matching private key is available.
    fn private_key(&self, id: &CertificateId) -> Result<Arc<RsaPrivateKey>, EnvelopeError>;
}

impl<P: KeyProvider + ?Sized> KeyProvider for Arc<P> {
    fn public_key(&self, id: &CertificateId) -> Result<Arc<RsaPublicKey>, EnvelopeError> {
        (**self).public_key(id)
    }

    fn private_key(&self, id: &CertificateId) -> Result<Arc<RsaPrivateKey>, EnvelopeError> {
        (**self).private_key(id)
    }
}

pub(crate) fn key_access(id: &CertificateId, reason: impl Into<String>) -> EnvelopeError {
    EnvelopeError::KeyAccess {
        id: id.to_string(),
        reason: reason.into(),
    }
}
