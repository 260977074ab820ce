//! Envelope wire framing.
//!
//! An envelope is laid out as:
//!
//! ```text
//! i32-LE length | wrapped DEK | i32-LE length | wrapped IV | CBC ciphertext ...
//! ```
//!
//! Framing only counts bytes. The contents of each blob are validated by the
//! key transport layer, never here.

use std::io::{self, Read, Write};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::EnvelopeError;

/// Size of every length prefix on the wire.
pub const LENGTH_PREFIX_LEN: usize = 4;

/// Upper bound on a single length-prefixed blob.
///
/// A 2048-bit RSA key transport blob is 256 bytes; the bound leaves room for
/// moduli up to 16384 bits.
pub const MAX_BLOB_LEN: usize = 2048;

/// Write a little-endian `i32` length prefix followed by `blob`.
///
/// # Errors
///
/// Returns [`EnvelopeError::FramingViolation`] if `blob` is longer than
/// `i32::MAX`, or [`EnvelopeError::Io`] if the writer fails.
pub fn write_blob<W: Write + ?Sized>(output: &mut W, blob: &[u8]) -> Result<(), EnvelopeError> {
    let len = i32::try_from(blob.len()).map_err(|_| {
        EnvelopeError::FramingViolation(format!(
            "blob of {} bytes does not fit an i32 length prefix",
            blob.len()
        ))
    })?;
    output.write_all(&len.to_le_bytes())?;
    output.write_all(blob)?;
    Ok(())
}

/// Read one length-prefixed blob of at most `max_bytes` bytes.
///
/// The declared length is checked against `max_bytes` before anything is
/// allocated for it.
///
/// # Errors
///
/// - [`EnvelopeError::FramingViolation`] if fewer than four prefix bytes are
///   available, or the declared length is negative or above `max_bytes`.
/// - [`EnvelopeError::StreamTruncated`] if the stream ends before the
///   declared number of bytes.
pub fn read_blob<R: Read + ?Sized>(input: &mut R, max_bytes: usize) -> Result<Bytes, EnvelopeError> {
    let mut prefix = [0u8; LENGTH_PREFIX_LEN];
    let got = read_full(input, &mut prefix)?;
    if got != LENGTH_PREFIX_LEN {
        return Err(EnvelopeError::FramingViolation(format!(
            "expected a {LENGTH_PREFIX_LEN}-byte length prefix, stream ended after {got}"
        )));
    }

    let declared = i32::from_le_bytes(prefix);
    let len = usize::try_from(declared).map_err(|_| {
        EnvelopeError::FramingViolation(format!("negative blob length {declared}"))
    })?;
    if len > max_bytes {
        return Err(EnvelopeError::FramingViolation(format!(
            "declared blob length {len} exceeds the {max_bytes}-byte limit"
        )));
    }

    let mut blob = vec![0u8; len];
    let got = read_full(input, &mut blob)?;
    if got != len {
        return Err(EnvelopeError::StreamTruncated {
            expected: len as u64,
            actual: got as u64,
        });
    }
    Ok(Bytes::from(blob))
}

/// Fill `buf` from `input`, stopping early only at end of stream.
///
/// Returns the number of bytes read; anything short of `buf.len()` means the
/// stream ended.
pub fn read_full<R: Read + ?Sized>(input: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// The two encapsulated blobs that precede the ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeHeader {
    /// The data encryption key, wrapped under the recipient's public key.
    pub wrapped_key: Bytes,
    /// The initialisation vector, wrapped under the recipient's public key.
    pub wrapped_iv: Bytes,
}

impl EnvelopeHeader {
    /// Number of bytes this header occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        2 * LENGTH_PREFIX_LEN + self.wrapped_key.len() + self.wrapped_iv.len()
    }

    /// Encode both blobs with their length prefixes into one buffer.
    ///
    /// # Errors
    ///
    /// Returns [`EnvelopeError::FramingViolation`] if either blob is larger
    /// than [`MAX_BLOB_LEN`]; such a header could never be read back.
    pub fn encode(&self) -> Result<Bytes, EnvelopeError> {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        for blob in [&self.wrapped_key, &self.wrapped_iv] {
            if blob.len() > MAX_BLOB_LEN {
                return Err(EnvelopeError::FramingViolation(format!(
                    "blob of {} bytes exceeds the {MAX_BLOB_LEN}-byte limit",
                    blob.len()
                )));
            }
            // Bounded by MAX_BLOB_LEN above.
            buf.put_i32_le(blob.len() as i32);
            buf.put_slice(blob);
        }
        Ok(buf.freeze())
    }

    /// Write the encoded header to `output`.
    pub fn write_to<W: Write + ?Sized>(&self, output: &mut W) -> Result<(), EnvelopeError> {
        output.write_all(&self.encode()?)?;
        Ok(())
    }

    /// Read a header from `input`, leaving the stream positioned at the first
    /// ciphertext byte.
    pub fn read_from<R: Read + ?Sized>(input: &mut R) -> Result<Self, EnvelopeError> {
        let wrapped_key = read_blob(input, MAX_BLOB_LEN)?;
        let wrapped_iv = read_blob(input, MAX_BLOB_LEN)?;
        Ok(Self {
            wrapped_key,
            wrapped_iv,
        })
    }
}
