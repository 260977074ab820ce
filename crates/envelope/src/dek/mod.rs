//! DEK (Data Encryption Key) generation for a single envelope.
//!
//! # Lifecycle
//!
//! 1. Encrypt calls [`DataKey::generate`], which draws a fresh key and IV from
//!    the OS CSPRNG.
//! 2. Both are wrapped under the recipient's public key and written to the
//!    envelope header, then seed the CBC encryptor.
//! 3. Decrypt rebuilds the pair with [`DataKey::from_parts`] after unwrapping.
//! 4. The [`DataKey`] is dropped (and zeroed) when the call returns.
//!
//! # Security invariants
//!
//! - A `DataKey` is never reused across two envelopes.
//! - Key material is never written anywhere except in wrapped form, and never logged.

pub mod key;

pub use key::DataKey;
