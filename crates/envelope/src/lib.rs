//! `x509-envelope`: streaming hybrid encryption for X.509 certificate holders.
//!
//! A fresh AES key and IV protect the payload (AES-CBC, PKCS#7); both are
//! wrapped under the recipient certificate's RSA public key (PKCS#1 v1.5) and
//! written ahead of the ciphertext as length-prefixed blobs.
//!
//! ```no_run
//! use x509_envelope::{encrypt_for, CachingKeyProvider, CertificateId, CipherConfig, DirectoryKeyProvider};
//!
//! # fn main() -> Result<(), x509_envelope::EnvelopeError> {
//! let keys = CachingKeyProvider::new(DirectoryKeyProvider::open("/etc/envelope/certs")?);
//! let id: CertificateId = "96C765A4F90D9E59B5224099676CCD126BDBEB518E73B7B2C77C48FF9B2F653B".parse()?;
//! let input = std::fs::File::open("report.csv")?;
//! let output = std::fs::File::create("report.csv.env")?;
//! encrypt_for(&keys, &id, input, output, CipherConfig::default())?;
//! # Ok(())
//! # }
//! ```

pub mod crypto;
pub mod dek;
pub mod envelope;
pub mod keys;

#[cfg(test)]
pub(crate) mod testing;

pub use common::{EnvelopeError, ErrorKind};
pub use crypto::{CipherConfig, DecryptReader, EncryptWriter, SymmetricAlgorithm};
pub use dek::DataKey;
pub use envelope::{
    decrypt, decrypt_for, decrypt_from_slice, encrypt, encrypt_for, encrypt_to_vec, envelope_len,
};
pub use keys::{CachingKeyProvider, CertificateId, DirectoryKeyProvider, KeyProvider};
pub use rsa::{RsaPrivateKey, RsaPublicKey};
