//! Error taxonomy and wire framing shared across `x509-envelope` crates.

pub mod error;
pub mod protocol;

pub use error::{EnvelopeError, ErrorKind};
pub use protocol::{EnvelopeHeader, MAX_BLOB_LEN};
