//! # fillcache Crypto
//!
//! Streaming encryption for byte streams, built on AES in CFB mode.
//!
//! This crate provides:
//!
//! - **Writer**: [`CipherWriter`] encrypts everything written through it
//! - **Reader**: [`CipherReader`] decrypts everything read through it
//! - **IV helpers**: [`generate_iv`] and [`read_iv`]
//!
//! The key length picks the cipher: 16, 24 or 32 bytes for AES-128, AES-192
//! or AES-256. Streams created with `new` carry their IV as a one-block
//! prefix; the `with_iv` constructors leave IV transport to the caller.
//!
//! No authentication is performed. Tampered ciphertext decrypts to garbage
//! rather than failing.
//!
//! ## Example
//!
//! ```rust
//! use std::io::{Read, Write};
//! use fillcache_crypto::{CipherReader, CipherWriter};
//!
//! let key = [7u8; 32];
//! let mut writer = CipherWriter::new(Vec::new(), &key)?;
//! writer.write_all(b"attack at dawn")?;
//! let sealed = writer.into_inner();
//!
//! let mut reader = CipherReader::new(sealed.as_slice(), &key)?;
//! let mut plain = String::new();
//! reader.read_to_string(&mut plain)?;
//! assert_eq!(plain, "attack at dawn");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod iv;
mod stream;
pub mod reader;
pub mod writer;

// Re-export main types at crate root
pub use iv::{generate_iv, read_iv};
pub use reader::CipherReader;
pub use writer::CipherWriter;
