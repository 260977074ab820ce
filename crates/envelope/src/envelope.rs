//! Encrypt and decrypt whole envelopes over streams.
//!
//! Encrypt order: generate DEK + IV, wrap both under the public key, write the
//! two length-prefixed blobs, then stream the payload through AES-CBC.
//! Decrypt mirrors it: read both blobs, unwrap them, stream-decrypt the rest.
//!
//! # Streams
//!
//! Streams are taken by value. Pass `&mut file` to keep using the file after
//! the call; pass `file` to have it dropped (closed) when the call returns.
//!
//! # Failure state
//!
//! On error the output holds an unspecified prefix of the envelope (Encrypt)
//! or of the plaintext (Decrypt). Callers must discard it.

use std::io::{Read, Write};

use common::{protocol::LENGTH_PREFIX_LEN, EnvelopeError, EnvelopeHeader};
use rsa::{traits::PublicKeyParts, RsaPrivateKey, RsaPublicKey};
use tracing::debug;

use crate::crypto::{kek, CipherConfig, DecryptReader, EncryptWriter};
use crate::dek::DataKey;
use crate::keys::{CertificateId, KeyProvider};

/// Encrypt `input` into `output` for the holder of `kek`'s private key.
///
/// Returns the number of plaintext bytes read from `input`.
///
/// # Errors
///
/// - [`EnvelopeError::KeyMaterialInvalid`] if `kek` is too small to wrap a key
///   for `config`.
/// - [`EnvelopeError::Io`] if either stream fails.
pub fn encrypt<R: Read, W: Write>(
    mut input: R,
    mut output: W,
    kek: &RsaPublicKey,
    config: CipherConfig,
) -> Result<u64, EnvelopeError> {
    let capacity = kek::max_wrap_len(kek);
    if capacity < config.key_len() {
        return Err(EnvelopeError::KeyMaterialInvalid(format!(
            "{}-bit RSA key cannot transport a {}-byte {config} key",
            kek.size() * 8,
            config.key_len()
        )));
    }

    let data_key = DataKey::generate(config);
    let header = EnvelopeHeader {
        wrapped_key: kek::wrap(kek, data_key.key())?.into(),
        wrapped_iv: kek::wrap(kek, data_key.iv())?.into(),
    };
    header.write_to(&mut output)?;

    let mut writer = EncryptWriter::new(&mut output, &data_key)?;
    let copied = pump(&mut input, &mut writer, config)?;
    writer.finish()?;

    debug!(
        algorithm = %config,
        kek_bits = kek.size() * 8,
        plaintext_bytes = copied,
        envelope_bytes = envelope_len(kek.size(), copied, config),
        "envelope sealed"
    );
    Ok(copied)
}

/// Decrypt the envelope in `input` into `output` using the recipient's private key.
///
/// `config` selects the cipher family; the key size is taken from the
/// unwrapped DEK, so the sender's key size need not be known.
/// Returns the number of plaintext bytes written to `output`.
///
/// # Errors
///
/// - [`EnvelopeError::FramingViolation`] / [`EnvelopeError::StreamTruncated`]
///   if the header is malformed or cut short.
/// - [`EnvelopeError::KeyMaterialInvalid`] for a wrong key, a tampered blob,
///   a key/IV no member of `config`'s family accepts, or bad final-block padding.
/// - [`EnvelopeError::StreamTruncated`] if the ciphertext is empty or not a
///   whole number of blocks.
/// - [`EnvelopeError::Io`] if either stream fails.
pub fn decrypt<R: Read, W: Write>(
    mut input: R,
    mut output: W,
    kek: &RsaPrivateKey,
    config: CipherConfig,
) -> Result<u64, EnvelopeError> {
    let header = EnvelopeHeader::read_from(&mut input)?;
    let key = kek::unwrap(kek, &header.wrapped_key)?;
    let iv = kek::unwrap(kek, &header.wrapped_iv)?;
    let data_key = DataKey::from_parts(config.with_key_len(key.len())?, &key, &iv)?;

    let mut reader = DecryptReader::new(&mut input, &data_key)?;
    let copied = pump(&mut reader, &mut output, config)?;
    output.flush()?;

    debug!(
        algorithm = %data_key.config(),
        kek_bits = kek.size() * 8,
        ciphertext_bytes = reader.ciphertext_len(),
        plaintext_bytes = copied,
        "envelope opened"
    );
    Ok(copied)
}

/// Resolve the public key of certificate `id` through `provider`, then [`encrypt`].
pub fn encrypt_for<P, R, W>(
    provider: &P,
    id: &CertificateId,
    input: R,
    output: W,
    config: CipherConfig,
) -> Result<u64, EnvelopeError>
where
    P: KeyProvider + ?Sized,
    R: Read,
    W: Write,
{
    let kek = provider.public_key(id)?;
    encrypt(input, output, &kek, config)
}

/// Resolve the private key of certificate `id` through `provider`, then [`decrypt`].
pub fn decrypt_for<P, R, W>(
    provider: &P,
    id: &CertificateId,
    input: R,
    output: W,
    config: CipherConfig,
) -> Result<u64, EnvelopeError>
where
    P: KeyProvider + ?Sized,
    R: Read,
    W: Write,
{
    let kek = provider.private_key(id)?;
    decrypt(input, output, &kek, config)
}

/// Encrypt an in-memory payload and return the whole envelope.
pub fn encrypt_to_vec(
    plaintext: &[u8],
    kek: &RsaPublicKey,
    config: CipherConfig,
) -> Result<Vec<u8>, EnvelopeError> {
    let expected = envelope_len(kek.size(), plaintext.len() as u64, config);
    let mut out = Vec::with_capacity(usize::try_from(expected).unwrap_or(0));
    encrypt(plaintext, &mut out, kek, config)?;
    Ok(out)
}

/// Decrypt an in-memory envelope and return the payload.
pub fn decrypt_from_slice(
    envelope: &[u8],
    kek: &RsaPrivateKey,
    config: CipherConfig,
) -> Result<Vec<u8>, EnvelopeError> {
    let mut out = Vec::new();
    decrypt(envelope, &mut out, kek, config)?;
    Ok(out)
}

/// Exact size of the envelope produced for `plaintext_len` bytes.
///
/// `modulus_len` is the RSA modulus size in bytes (256 for RSA-2048), which is
/// also the size of each wrapped blob.
pub const fn envelope_len(modulus_len: usize, plaintext_len: u64, config: CipherConfig) -> u64 {
    (2 * (LENGTH_PREFIX_LEN + modulus_len)) as u64 + config.ciphertext_len(plaintext_len)
}

/// Copy `reader` into `writer` using the configuration's buffer size.
fn pump<R: Read + ?Sized, W: Write + ?Sized>(
    reader: &mut R,
    writer: &mut W,
    config: CipherConfig,
) -> Result<u64, EnvelopeError> {
    let mut buf = vec![0u8; config.copy_buffer_len()];
    let mut total = 0u64;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => return Ok(total),
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        writer.write_all(&buf[..n])?;
        total += n as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use common::ErrorKind;
    use std::io;

    /// A writer that fails after accepting `budget` bytes.
    struct Leaky {
        written: Vec<u8>,
        budget: usize,
    }

    impl Write for Leaky {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.written.len() + buf.len() > self.budget {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer closed"));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn round_trip_reports_byte_counts() {
        let public = testing::recipient_public();
        let private = testing::recipient_private();
        let mut sealed = Vec::new();
        let n = encrypt(&b"hello envelope"[..], &mut sealed, &public, CipherConfig::default())
            .unwrap();
        assert_eq!(n, 14);
        assert_eq!(sealed.len() as u64, envelope_len(256, 14, CipherConfig::default()));

        let mut opened = Vec::new();
        let n = decrypt(sealed.as_slice(), &mut opened, &private, CipherConfig::default()).unwrap();
        assert_eq!(n, 14);
        assert_eq!(opened, b"hello envelope");
    }

    #[test]
    fn header_blobs_are_modulus_sized() {
        let sealed = encrypt_to_vec(b"x", &testing::recipient_public(), CipherConfig::default())
            .unwrap();
        assert_eq!(&sealed[..4], &256i32.to_le_bytes());
        assert_eq!(&sealed[260..264], &256i32.to_le_bytes());
    }

    #[test]
    fn key_size_follows_the_unwrapped_dek() {
        let public = testing::recipient_public();
        let private = testing::recipient_private();
        for sealed_with in ["aes-128-cbc", "aes-192-cbc", "aes-256-cbc"] {
            let cfg: CipherConfig = sealed_with.parse().unwrap();
            let sealed = encrypt_to_vec(b"hello", &public, cfg).unwrap();
            for opened_with in ["aes-128-cbc", "aes-192-cbc", "aes-256-cbc"] {
                let opened =
                    decrypt_from_slice(&sealed, &private, opened_with.parse().unwrap()).unwrap();
                assert_eq!(opened, b"hello", "{sealed_with} opened as {opened_with}");
            }
        }
    }

    #[test]
    fn dek_outside_the_family_is_key_material_error() {
        let public = testing::recipient_public();
        let header = EnvelopeHeader {
            wrapped_key: kek::wrap(&public, &[7u8; 20]).unwrap().into(),
            wrapped_iv: kek::wrap(&public, &[9u8; 16]).unwrap().into(),
        };
        let mut sealed = header.encode().unwrap().to_vec();
        sealed.extend_from_slice(&[0u8; 16]);
        let err = decrypt_from_slice(&sealed, &testing::recipient_private(), CipherConfig::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyMaterialInvalid);
    }

    #[test]
    fn short_iv_is_key_material_error() {
        let public = testing::recipient_public();
        let header = EnvelopeHeader {
            wrapped_key: kek::wrap(&public, &[7u8; 32]).unwrap().into(),
            wrapped_iv: kek::wrap(&public, &[9u8; 8]).unwrap().into(),
        };
        let mut sealed = header.encode().unwrap().to_vec();
        sealed.extend_from_slice(&[0u8; 16]);
        let err = decrypt_from_slice(&sealed, &testing::recipient_private(), CipherConfig::default())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::KeyMaterialInvalid);
    }

    #[test]
    fn writer_failure_surfaces_as_io() {
        let mut sink = Leaky {
            written: Vec::new(),
            budget: 600,
        };
        let err = encrypt(
            &[0u8; 4096][..],
            &mut sink,
            &testing::recipient_public(),
            CipherConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        // Partial output stays behind for the caller to discard.
        assert_eq!(sink.written.len(), 520);
    }

    #[test]
    fn envelope_len_formula() {
        let cfg = CipherConfig::default();
        assert_eq!(envelope_len(256, 0, cfg), 536);
        assert_eq!(envelope_len(256, 1, cfg), 536);
        assert_eq!(envelope_len(256, 19, cfg), 552);
        assert_eq!(envelope_len(256, 8192, cfg), 8728);
        assert_eq!(envelope_len(512, 1, cfg), 1048);
    }
}
