//! RSA key transport for the DEK and IV.
//!
//! Uses PKCS#1 v1.5 encryption padding so envelopes stay byte-compatible with
//! existing producers and consumers. PKCS#1 v1.5 is open to padding-oracle
//! attacks when decryption failures are observable; every unwrap failure is
//! therefore reported as the same [`EnvelopeError::KeyMaterialInvalid`].
//!
//! **Do NOT switch to OAEP here without versioning the wire format.** An OAEP
//! blob has the same length as a v1.5 blob and older readers would fail on it
//! with a bare key-material error.

use common::EnvelopeError;
use rand::rngs::OsRng;
use rsa::{traits::PublicKeyParts, Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

/// Bytes of PKCS#1 v1.5 padding overhead per wrapped message.
pub const PKCS1_V15_OVERHEAD: usize = 11;

/// Largest plaintext `kek` can wrap.
pub fn max_wrap_len(kek: &RsaPublicKey) -> usize {
    kek.size().saturating_sub(PKCS1_V15_OVERHEAD)
}

/// Encrypt `plaintext` under the recipient's public key.
///
/// The result is always exactly `kek.size()` bytes long.
///
/// # Errors
///
/// Returns [`EnvelopeError::KeyMaterialInvalid`] if `plaintext` is longer than
/// [`max_wrap_len`] or the RSA operation fails.
pub fn wrap(kek: &RsaPublicKey, plaintext: &[u8]) -> Result<Vec<u8>, EnvelopeError> {
    let max = max_wrap_len(kek);
    if plaintext.len() > max {
        return Err(EnvelopeError::KeyMaterialInvalid(format!(
            "{}-bit key transport can wrap at most {max} bytes, got {}",
            kek.size() * 8,
            plaintext.len()
        )));
    }
    kek.encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext)
        .map_err(|e| EnvelopeError::KeyMaterialInvalid(format!("key transport wrap failed: {e}")))
}

/// Decrypt a wrapped blob with the recipient's private key.
///
/// # Errors
///
/// Returns [`EnvelopeError::KeyMaterialInvalid`] if `ciphertext` is not
/// exactly one modulus long, or if padding validation fails (wrong key or
/// tampered blob). The two padding-failure causes are indistinguishable.
pub fn unwrap(kek: &RsaPrivateKey, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>, EnvelopeError> {
    if ciphertext.len() != kek.size() {
        return Err(EnvelopeError::KeyMaterialInvalid(format!(
            "wrapped blob is {} bytes, {}-bit key transport expects {}",
            ciphertext.len(),
            kek.size() * 8,
            kek.size()
        )));
    }
    kek.decrypt(Pkcs1v15Encrypt, ciphertext)
        .map(Zeroizing::new)
        .map_err(|_| EnvelopeError::KeyMaterialInvalid("key transport unwrap failed".into()))
}
