//! The closed set of symmetric cipher configurations.
//!
//! Only AES in CBC mode with PKCS#7 block padding is supported, at the three
//! standard key sizes. Anything else is rejected when the [`CipherConfig`] is
//! built, before any key material exists.

use std::{fmt, str::FromStr};

use common::EnvelopeError;

/// Block length shared by every supported cipher (128 bits).
pub const BLOCK_LEN: usize = 16;

/// A supported block cipher + chaining mode combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SymmetricAlgorithm {
    /// AES with a 128-bit key, CBC chaining.
    Aes128Cbc,
    /// AES with a 192-bit key, CBC chaining.
    Aes192Cbc,
    /// AES with a 256-bit key, CBC chaining.
    #[default]
    Aes256Cbc,
}

impl SymmetricAlgorithm {
    /// Key length in bytes.
    pub const fn key_len(self) -> usize {
        match self {
            SymmetricAlgorithm::Aes128Cbc => 16,
            SymmetricAlgorithm::Aes192Cbc => 24,
            SymmetricAlgorithm::Aes256Cbc => 32,
        }
    }

    /// Block (and IV) length in bytes.
    pub const fn block_len(self) -> usize {
        BLOCK_LEN
    }

    /// Canonical lower-case name, e.g. `aes-256-cbc`.
    pub const fn name(self) -> &'static str {
        match self {
            SymmetricAlgorithm::Aes128Cbc => "aes-128-cbc",
            SymmetricAlgorithm::Aes192Cbc => "aes-192-cbc",
            SymmetricAlgorithm::Aes256Cbc => "aes-256-cbc",
        }
    }
}

/// Validated symmetric configuration for one Encrypt/Decrypt call.
///
/// The default is AES-256-CBC (256-bit key, 128-bit block).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CipherConfig {
    algorithm: SymmetricAlgorithm,
}

impl CipherConfig {
    /// Build a configuration for a known algorithm.
    pub const fn new(algorithm: SymmetricAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Build a configuration from a family name plus key and block sizes in bits.
    ///
    /// The family name is matched case-insensitively; only `"aes"` is known.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::ArgumentInvalid`] if `family` is blank and
    /// [`EnvelopeError::AlgorithmUnavailable`] for any unsupported combination.
    pub fn from_parts(family: &str, key_bits: u32, block_bits: u32) -> Result<Self, EnvelopeError> {
        let family = family.trim();
        if family.is_empty() {
            return Err(EnvelopeError::ArgumentInvalid(
                "algorithm name must not be empty".into(),
            ));
        }
        if !family.eq_ignore_ascii_case("aes") {
            return Err(EnvelopeError::AlgorithmUnavailable(format!(
                "unknown cipher family {family:?}"
            )));
        }
        if block_bits as usize != BLOCK_LEN * 8 {
            return Err(EnvelopeError::AlgorithmUnavailable(format!(
                "AES requires a 128-bit block, not {block_bits}"
            )));
        }
        let algorithm = match key_bits {
            128 => SymmetricAlgorithm::Aes128Cbc,
            192 => SymmetricAlgorithm::Aes192Cbc,
            256 => SymmetricAlgorithm::Aes256Cbc,
            other => {
                return Err(EnvelopeError::AlgorithmUnavailable(format!(
                    "AES does not support a {other}-bit key"
                )))
            }
        };
        Ok(Self::new(algorithm))
    }

    /// The configuration of the same family whose key is `key_len` bytes long.
    ///
    /// Decrypt sizes the cipher from the unwrapped DEK, so an envelope sealed
    /// with any AES key size opens under any AES configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::KeyMaterialInvalid`] if no member of the family
    /// takes a `key_len`-byte key.
    pub fn with_key_len(&self, key_len: usize) -> Result<Self, EnvelopeError> {
        let algorithm = match key_len {
            16 => SymmetricAlgorithm::Aes128Cbc,
            24 => SymmetricAlgorithm::Aes192Cbc,
            32 => SymmetricAlgorithm::Aes256Cbc,
            other => {
                return Err(EnvelopeError::KeyMaterialInvalid(format!(
                    "unwrapped a {other}-byte key, AES takes 16, 24 or 32"
                )))
            }
        };
        Ok(Self::new(algorithm))
    }

    /// The selected algorithm.
    pub const fn algorithm(&self) -> SymmetricAlgorithm {
        self.algorithm
    }

    /// Data encryption key length in bytes.
    pub const fn key_len(&self) -> usize {
        self.algorithm.key_len()
    }

    /// Block and IV length in bytes.
    pub const fn block_len(&self) -> usize {
        self.algorithm.block_len()
    }

    /// Buffer size used when pumping a payload through the cipher.
    ///
    /// Four times the block size in bits, i.e. 512 bytes for AES.
    pub const fn copy_buffer_len(&self) -> usize {
        self.block_len() * 8 * 4
    }

    /// Ciphertext length for a payload of `plaintext_len` bytes.
    ///
    /// PKCS#7 always appends between 1 and `block_len` bytes.
    pub const fn ciphertext_len(&self, plaintext_len: u64) -> u64 {
        let block = self.block_len() as u64;
        (plaintext_len / block + 1) * block
    }
}

impl fmt::Display for CipherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.algorithm.name())
    }
}

impl FromStr for CipherConfig {
    type Err = EnvelopeError;

    /// Parses `aes-128-cbc`, `aes-192-cbc`, `aes-256-cbc`, or a bare `aes`
    /// (which selects the 256-bit default).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_ascii_lowercase();
        match name.as_str() {
            "" => Err(EnvelopeError::ArgumentInvalid(
                "algorithm name must not be empty".into(),
            )),
            "aes" => Ok(Self::default()),
            "aes-128-cbc" => Ok(Self::new(SymmetricAlgorithm::Aes128Cbc)),
            "aes-192-cbc" => Ok(Self::new(SymmetricAlgorithm::Aes192Cbc)),
            "aes-256-cbc" => Ok(Self::new(SymmetricAlgorithm::Aes256Cbc)),
            _ => Err(EnvelopeError::AlgorithmUnavailable(format!(
                "unsupported cipher {s:?}"
            ))),
        }
    }
}
