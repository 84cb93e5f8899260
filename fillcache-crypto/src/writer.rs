//! Encrypting writer.

use std::io::{self, Write};

use fillcache_core::error::{FillcacheError, Result};
use fillcache_sync::AtomicFlag;

use crate::iv::generate_iv;
use crate::stream::{check_key, Encryptor};

/// Encrypts everything written through it with AES-CFB.
///
/// Each `write` encrypts the whole input and hands it to the inner writer with
/// `write_all`, so the cipher state never runs ahead of what was written. After
/// an I/O error the stream position is unknown and the writer should be
/// discarded.
#[derive(Debug)]
pub struct CipherWriter<W> {
    inner: W,
    encryptor: Encryptor,
    scratch: Vec<u8>,
    closed: AtomicFlag,
}

impl<W: Write> CipherWriter<W> {
    /// Creates a writer with a fresh random IV, written to `out` first.
    pub fn new(mut out: W, key: &[u8]) -> Result<Self> {
        check_key(key)?;
        let iv = generate_iv();
        out.write_all(&iv)?;
        Self::with_iv(out, key, &iv)
    }

    /// Creates a writer with a caller-supplied IV. Nothing is written up front.
    pub fn with_iv(out: W, key: &[u8], iv: &[u8]) -> Result<Self> {
        Ok(Self {
            inner: out,
            encryptor: Encryptor::new(key, iv)?,
            scratch: Vec::new(),
            closed: AtomicFlag::new(false),
        })
    }

    /// Marks the writer closed. Fails if it was already closed.
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

    /// Returns a reference to the inner writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Unwraps the inner writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> Write for CipherWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.is_closed() {
            return Err(FillcacheError::Closed.into());
        }

        self.scratch.clear();
        self.scratch.extend_from_slice(buf);
        self.encryptor.apply(&mut self.scratch);
        self.inner.write_all(&self.scratch)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
