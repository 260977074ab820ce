//! [`DataKey`]: the per-message symmetric key and IV.

use std::fmt;

use common::EnvelopeError;
use rand::{rngs::OsRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::CipherConfig;

/// Data encryption key plus initialisation vector for exactly one envelope.
///
/// Both buffers are overwritten with zeroes when the value is dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DataKey {
    key: Vec<u8>,
    iv: Vec<u8>,
    #[zeroize(skip)]
    config: CipherConfig,
}

impl DataKey {
    /// Generate a fresh random key and IV sized for `config`.
    ///
    /// Key and IV are drawn independently from the OS CSPRNG.
    pub fn generate(config: CipherConfig) -> Self {
        let mut key = vec![0u8; config.key_len()];
        let mut iv = vec![0u8; config.block_len()];
        OsRng.fill_bytes(&mut key);
        OsRng.fill_bytes(&mut iv);
        Self { key, iv, config }
    }

    /// Rebuild a key from unwrapped bytes, checking both lengths against `config`.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::KeyMaterialInvalid`] if `key` or `iv` has the
    /// wrong length for `config`.
    pub fn from_parts(config: CipherConfig, key: &[u8], iv: &[u8]) -> Result<Self, EnvelopeError> {
        if key.len() != config.key_len() {
            return Err(EnvelopeError::KeyMaterialInvalid(format!(
                "{config} needs a {}-byte key, unwrapped {} bytes",
                config.key_len(),
                key.len()
            )));
        }
        if iv.len() != config.block_len() {
            return Err(EnvelopeError::KeyMaterialInvalid(format!(
                "{config} needs a {}-byte IV, unwrapped {} bytes",
                config.block_len(),
                iv.len()
            )));
        }
        Ok(Self {
            key: key.to_vec(),
            iv: iv.to_vec(),
            config,
        })
    }

    /// Raw key bytes.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Raw IV bytes.
    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    /// The configuration this key was sized for.
    pub fn config(&self) -> CipherConfig {
        self.config
    }
}

impl fmt::Debug for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material.
        f.debug_struct("DataKey")
            .field("config", &self.config)
            .field("key", &"[REDACTED]")
            .field("iv", &"[REDACTED]")
            .finish()
    }
}
