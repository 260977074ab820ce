//! Cryptographic primitives: RSA key transport and streaming AES-CBC.
//!
//! This module is free of certificate and file-system concerns. It provides
//! the low-level operations the envelope layer composes.
//!
//! # Envelope wire format
//!
//! ```text
//! len(i32 LE) | RSA-PKCS1v15(DEK) | len(i32 LE) | RSA-PKCS1v15(IV) | AES-CBC-PKCS7(payload)
//! ```

pub mod algorithm;
pub mod cipher;
pub mod kek;

pub use algorithm::{CipherConfig, SymmetricAlgorithm, BLOCK_LEN};
pub use cipher::{DecryptReader, EncryptWriter};
