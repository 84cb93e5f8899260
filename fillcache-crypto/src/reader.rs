//! Decrypting reader.

use std::io::{self, Read};

use fillcache_core::error::{FillcacheError, Result};
use fillcache_sync::AtomicFlag;

use crate::iv::read_iv;
use crate::stream::{check_key, Decryptor};

/// Decrypts everything read through it with AES-CFB.
#[derive(Debug)]
pub struct CipherReader<R> {
    inner: R,
    decryptor: Decryptor,
    closed: AtomicFlag,
}

impl<R: Read> CipherReader<R> {
    /// Creates a reader for a stream that starts with its IV.
    pub fn new(mut input: R, key: &[u8]) -> Result<Self> {
        check_key(key)?;
        let iv = read_iv(&mut input)?;
        Self::with_iv(input, key, &iv)
    }

    /// Creates a reader with a caller-supplied IV.
    pub fn with_iv(input: R, key: &[u8], iv: &[u8]) -> Result<Self> {
        Ok(Self {
            inner: input,
            decryptor: Decryptor::new(key, iv)?,
            closed: AtomicFlag::new(false),
        })
    }

    /// Marks the reader closed. Fails if it was already closed.
    pub fn close(&self) -> Result<()> {
        if self.closed.set_true() {
            Ok(())
        } else {
            Err(FillcacheError::Closed)
        }
    }

    /// Returns true once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.get()
    }

    /// Unwraps the inner reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for CipherReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if self.is_closed() {
            return Err(FillcacheError::Closed.into());
        }

        let n = self.inner.read(out)?;
        self.decryptor.apply(&mut out[..n]);
        Ok(n)
    }
}
