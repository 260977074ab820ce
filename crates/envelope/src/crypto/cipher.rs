//! Streaming AES-CBC with PKCS#7 padding.
//!
//! [`EncryptWriter`] wraps any [`Write`] and emits ciphertext one whole block
//! at a time; the padded final block is only written by
//! [`EncryptWriter::finish`]. [`DecryptReader`] wraps any [`Read`] and always
//! holds back the last ciphertext block until end of stream so the padding can
//! be checked before those bytes are released.
//!
//! Both adapters own their inner stream. Hand them `&mut stream` to keep using
//! the stream afterwards, or the stream itself to have it closed with the
//! adapter.

use std::io::{self, Read, Write};

use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::{
    block_padding::{Padding, Pkcs7},
    generic_array::GenericArray,
    BlockDecryptMut, BlockEncryptMut, KeyIvInit,
};
use common::EnvelopeError;

use super::algorithm::{SymmetricAlgorithm, BLOCK_LEN};
use crate::dek::DataKey;

type Block = aes::Block;

#[derive(Clone)]
enum CbcEncryptor {
    Aes128(cbc::Encryptor<Aes128>),
    Aes192(cbc::Encryptor<Aes192>),
    Aes256(cbc::Encryptor<Aes256>),
}

impl CbcEncryptor {
    fn new(data_key: &DataKey) -> Result<Self, EnvelopeError> {
        let (key, iv) = (data_key.key(), data_key.iv());
        let cipher = match data_key.config().algorithm() {
            SymmetricAlgorithm::Aes128Cbc => {
                cbc::Encryptor::new_from_slices(key, iv).map(Self::Aes128)
            }
            SymmetricAlgorithm::Aes192Cbc => {
                cbc::Encryptor::new_from_slices(key, iv).map(Self::Aes192)
            }
            SymmetricAlgorithm::Aes256Cbc => {
                cbc::Encryptor::new_from_slices(key, iv).map(Self::Aes256)
            }
        };
        cipher.map_err(|_| invalid_length(data_key))
    }

    /// Encrypt `blocks` in place. `blocks.len()` must be a multiple of [`BLOCK_LEN`].
    fn encrypt_blocks(&mut self, blocks: &mut [u8]) {
        for chunk in blocks.chunks_exact_mut(BLOCK_LEN) {
            let block = GenericArray::from_mut_slice(chunk);
            match self {
                CbcEncryptor::Aes128(c) => c.encrypt_block_mut(block),
                CbcEncryptor::Aes192(c) => c.encrypt_block_mut(block),
                CbcEncryptor::Aes256(c) => c.encrypt_block_mut(block),
            }
        }
    }
}

enum CbcDecryptor {
    Aes128(cbc::Decryptor<Aes128>),
    Aes192(cbc::Decryptor<Aes192>),
    Aes256(cbc::Decryptor<Aes256>),
}

impl CbcDecryptor {
    fn new(data_key: &DataKey) -> Result<Self, EnvelopeError> {
        let (key, iv) = (data_key.key(), data_key.iv());
        let cipher = match data_key.config().algorithm() {
            SymmetricAlgorithm::Aes128Cbc => {
                cbc::Decryptor::new_from_slices(key, iv).map(Self::Aes128)
            }
            SymmetricAlgorithm::Aes192Cbc => {
                cbc::Decryptor::new_from_slices(key, iv).map(Self::Aes192)
            }
            SymmetricAlgorithm::Aes256Cbc => {
                cbc::Decryptor::new_from_slices(key, iv).map(Self::Aes256)
            }
        };
        cipher.map_err(|_| invalid_length(data_key))
    }

    /// Decrypt `blocks` in place. `blocks.len()` must be a multiple of [`BLOCK_LEN`].
    fn decrypt_blocks(&mut self, blocks: &mut [u8]) {
        for chunk in blocks.chunks_exact_mut(BLOCK_LEN) {
            let block = GenericArray::from_mut_slice(chunk);
            match self {
                CbcDecryptor::Aes128(c) => c.decrypt_block_mut(block),
                CbcDecryptor::Aes192(c) => c.decrypt_block_mut(block),
                CbcDecryptor::Aes256(c) => c.decrypt_block_mut(block),
            }
        }
    }
}

fn invalid_length(data_key: &DataKey) -> EnvelopeError {
    EnvelopeError::KeyMaterialInvalid(format!(
        "key/IV lengths do not fit {}",
        data_key.config()
    ))
}

/// A [`Write`] adapter that CBC-encrypts everything written to it.
///
/// Dropping the writer without calling [`finish`](Self::finish) leaves the
/// inner stream with an unpadded, undecryptable ciphertext.
pub struct EncryptWriter<W: Write> {
    inner: W,
    cipher: CbcEncryptor,
    pending: [u8; BLOCK_LEN],
    pending_len: usize,
    scratch: Vec<u8>,
    plaintext_len: u64,
}

impl<W: Write> EncryptWriter<W> {
    /// Start encrypting into `inner` with `data_key`.
    pub fn new(inner: W, data_key: &DataKey) -> Result<Self, EnvelopeError> {
        Ok(Self {
            inner,
            cipher: CbcEncryptor::new(data_key)?,
            pending: [0u8; BLOCK_LEN],
            pending_len: 0,
            scratch: Vec::new(),
            plaintext_len: 0,
        })
    }

    /// Number of plaintext bytes accepted so far.
    pub fn plaintext_len(&self) -> u64 {
        self.plaintext_len
    }

    /// Pad and encrypt the final block, flush, and hand back the inner stream.
    pub fn finish(mut self) -> io::Result<W> {
        let mut block = Block::default();
        block[..self.pending_len].copy_from_slice(&self.pending[..self.pending_len]);
        Pkcs7::pad(&mut block, self.pending_len);
        self.cipher.encrypt_blocks(&mut block);
        self.inner.write_all(&block)?;
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> Write for EncryptWriter<W> {
    /// Encrypts every whole block now available and keeps the remainder
    /// pending. If the inner stream fails, no byte of `buf` counts as
    /// consumed and the chaining state is left as it was, so the same `buf`
    /// may be written again.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let available = self.pending_len + buf.len();
        if available < BLOCK_LEN {
            self.pending[self.pending_len..available].copy_from_slice(buf);
            self.pending_len = available;
            self.plaintext_len += buf.len() as u64;
            return Ok(buf.len());
        }

        let from_buf = available - available % BLOCK_LEN - self.pending_len;
        self.scratch.clear();
        self.scratch.extend_from_slice(&self.pending[..self.pending_len]);
        self.scratch.extend_from_slice(&buf[..from_buf]);

        let mut cipher = self.cipher.clone();
        cipher.encrypt_blocks(&mut self.scratch);
        self.inner.write_all(&self.scratch)?;

        self.cipher = cipher;
        let rest = &buf[from_buf..];
        self.pending[..rest.len()].copy_from_slice(rest);
        self.pending_len = rest.len();
        self.plaintext_len += buf.len() as u64;
        Ok(buf.len())
    }

    /// Flushes the inner stream. Buffered bytes short of a whole block stay
    /// pending until more input arrives or [`EncryptWriter::finish`] runs.
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// A [`Read`] adapter that CBC-decrypts the stream it wraps.
///
/// The final read that reaches end of stream fails with
/// [`EnvelopeError::PaddingInvalid`] (as an [`io::Error`] payload) if the last
/// block's padding does not validate, and with
/// [`EnvelopeError::StreamTruncated`] if the ciphertext is empty or not a whole
/// number of blocks.
pub struct DecryptReader<R: Read> {
    inner: R,
    cipher: CbcDecryptor,
    carry: Vec<u8>,
    out: Vec<u8>,
    out_pos: usize,
    read_chunk: usize,
    ciphertext_len: u64,
    done: bool,
}

impl<R: Read> DecryptReader<R> {
    /// Start decrypting `inner` with `data_key`.
    pub fn new(inner: R, data_key: &DataKey) -> Result<Self, EnvelopeError> {
        Ok(Self {
            inner,
            cipher: CbcDecryptor::new(data_key)?,
            carry: Vec::new(),
            out: Vec::new(),
            out_pos: 0,
            read_chunk: data_key.config().copy_buffer_len(),
            ciphertext_len: 0,
            done: false,
        })
    }

    /// Number of ciphertext bytes consumed from the inner stream so far.
    pub fn ciphertext_len(&self) -> u64 {
        self.ciphertext_len
    }

    /// Hand back the inner stream.
    pub fn into_inner(self) -> R {
        self.inner
    }

    fn fill(&mut self) -> Result<(), EnvelopeError> {
        self.out.clear();
        self.out_pos = 0;

        let start = self.carry.len();
        self.carry.resize(start + self.read_chunk, 0);
        let read = loop {
            match self.inner.read(&mut self.carry[start..]) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.carry.truncate(start);
                    return Err(e.into());
                }
            }
        };
        self.carry.truncate(start + read);
        self.ciphertext_len += read as u64;

        if read == 0 {
            return self.finish_stream();
        }

        // Keep the last whole block back unless more bytes already follow it.
        let whole = self.carry.len() - self.carry.len() % BLOCK_LEN;
        let ready = if whole == self.carry.len() {
            whole - BLOCK_LEN
        } else {
            whole
        };
        self.out.extend(self.carry.drain(..ready));
        self.cipher.decrypt_blocks(&mut self.out);
        Ok(())
    }

    fn finish_stream(&mut self) -> Result<(), EnvelopeError> {
        self.done = true;
        if self.carry.is_empty() || self.carry.len() % BLOCK_LEN != 0 {
            let block = BLOCK_LEN as u64;
            return Err(EnvelopeError::StreamTruncated {
                expected: (self.ciphertext_len / block + 1) * block,
                actual: self.ciphertext_len,
            });
        }

        self.out.append(&mut self.carry);
        self.cipher.decrypt_blocks(&mut self.out);

        let last = self.out.len() - BLOCK_LEN;
        let kept = Pkcs7::unpad(Block::from_slice(&self.out[last..]))
            .map_err(|_| EnvelopeError::PaddingInvalid)?
            .len();
        self.out.truncate(last + kept);
        Ok(())
    }
}

impl<R: Read> Read for DecryptReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        while self.out_pos == self.out.len() {
            if self.done {
                return Ok(0);
            }
            self.fill().map_err(EnvelopeError::into_io)?;
        }
        let n = buf.len().min(self.out.len() - self.out_pos);
        buf[..n].copy_from_slice(&self.out[self.out_pos..self.out_pos + n]);
        self.out_pos += n;
        Ok(n)
    }
}
