//! AES-CFB stream state selected by key length.

use std::fmt;

use aes::cipher::{InvalidLength, KeyIvInit};
use aes::{Aes128, Aes192, Aes256};
use cfb_mode::{BufDecryptor, BufEncryptor};

use fillcache_core::constants::IV_SIZE;
use fillcache_core::error::{FillcacheError, Result};

/// Full-block CFB encryptor. Keeps partial-block state between calls, so
/// input may arrive in chunks of any size.
pub(crate) enum Encryptor {
    Aes128(BufEncryptor<Aes128>),
    Aes192(BufEncryptor<Aes192>),
    Aes256(BufEncryptor<Aes256>),
}

/// Full-block CFB decryptor, the counterpart of [`Encryptor`].
pub(crate) enum Decryptor {
    Aes128(BufDecryptor<Aes128>),
    Aes192(BufDecryptor<Aes192>),
    Aes256(BufDecryptor<Aes256>),
}

impl Encryptor {
    pub(crate) fn new(key: &[u8], iv: &[u8]) -> Result<Self> {
        check_params(key, iv)?;
        let invalid = |_: InvalidLength| FillcacheError::InvalidKeyLength { actual: key.len() };
        Ok(match key.len() {
            16 => Self::Aes128(BufEncryptor::new_from_slices(key, iv).map_err(invalid)?),
            24 => Self::Aes192(BufEncryptor::new_from_slices(key, iv).map_err(invalid)?),
            _ => Self::Aes256(BufEncryptor::new_from_slices(key, iv).map_err(invalid)?),
        })
    }

    /// Encrypts `buf` in place, continuing from the previous call.
    pub(crate) fn apply(&mut self, buf: &mut [u8]) {
        match self {
            Self::Aes128(cipher) => cipher.encrypt(buf),
            Self::Aes192(cipher) => cipher.encrypt(buf),
            Self::Aes256(cipher) => cipher.encrypt(buf),
        }
    }

    pub(crate) fn key_bits(&self) -> u16 {
        match self {
            Self::Aes128(_) => 128,
            Self::Aes192(_) => 192,
            Self::Aes256(_) => 256,
        }
    }
}

impl Decryptor {
    pub(crate) fn new(key: &[u8], iv: &[u8]) -> Result<Self> {
        check_params(key, iv)?;
        let invalid = |_: InvalidLength| FillcacheError::InvalidKeyLength { actual: key.len() };
        Ok(match key.len() {
            16 => Self::Aes128(BufDecryptor::new_from_slices(key, iv).map_err(invalid)?),
            24 => Self::Aes192(BufDecryptor::new_from_slices(key, iv).map_err(invalid)?),
            _ => Self::Aes256(BufDecryptor::new_from_slices(key, iv).map_err(invalid)?),
        })
    }

    /// Decrypts `buf` in place, continuing from the previous call.
    pub(crate) fn apply(&mut self, buf: &mut [u8]) {
        match self {
            Self::Aes128(cipher) => cipher.decrypt(buf),
            Self::Aes192(cipher) => cipher.decrypt(buf),
            Self::Aes256(cipher) => cipher.decrypt(buf),
        }
    }

    pub(crate) fn key_bits(&self) -> u16 {
        match self {
            Self::Aes128(_) => 128,
            Self::Aes192(_) => 192,
            Self::Aes256(_) => 256,
        }
    }
}

impl fmt::Debug for Encryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Encryptor(AES-{}-CFB)", self.key_bits())
    }
}

impl fmt::Debug for Decryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Decryptor(AES-{}-CFB)", self.key_bits())
    }
}

/// Rejects keys that are not a valid AES key size.
pub(crate) fn check_key(key: &[u8]) -> Result<()> {
    match key.len() {
        16 | 24 | 32 => Ok(()),
        actual => Err(FillcacheError::InvalidKeyLength { actual }),
    }
}

fn check_params(key: &[u8], iv: &[u8]) -> Result<()> {
    check_key(key)?;
    if iv.len() != IV_SIZE {
        return Err(FillcacheError::InvalidIvLength {
            expected: IV_SIZE,
            actual: iv.len(),
        });
    }
    Ok(())
}
