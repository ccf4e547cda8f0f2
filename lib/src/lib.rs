//! This crate provides a streaming zstd [`Encoder`] that is safe to feed with tiny writes.
//!
//! Input is collected into blocks of a fixed size before it reaches the codec. The codec therefore
//! sees the same sequence of blocks regardless of how the caller splits its writes, and writing a
//! stream one byte at a time produces exactly the same output as writing it in a single call.
//!
//! The output is a single standard zstd frame that any compliant zstd decoder can read.
//!
//! Zbatch uses the bindings from the [zstd_safe] crate.
//!
//! # Compression
//!
//! An [`Encoder`] hands input to the codec in blocks of 128KiB by default. See [`EncodeOptions`]
//! to change this and other compression parameters.
//!
//! ```no_run
//! use std::{fs::File, io};
//! use zbatch::Encoder;
//!
//! let mut input = File::open("foo")?;
//! let output = File::create("foo.zst")?;
//! let mut encoder = Encoder::new(output)?;
//! io::copy(&mut input, &mut encoder)?;
//! // End the frame, further writes are rejected
//! encoder.close()?;
//! # Ok::<(), zbatch::Error>(())
//! ```
//!
//! A [`RawEncoder`] performs the same compression on in-memory buffers. Both are built on the
//! [`BlockCodec`] trait, which can be implemented to put another codec behind an [`Encoder`].
//!
//! [zstd_safe]: https://docs.rs/zstd-safe/latest/zstd_safe/

mod encode;
mod error;
mod options;
mod raw;

pub use encode::Encoder;
pub use error::{Error, Result};
pub use options::{BEST_LEVEL, DEFAULT_LEVEL, EncodeOptions, FASTEST_LEVEL, Level};
pub use raw::{BlockCodec, CompressionProgress, EpilogueProgress, RawEncoder};
// Re-export as it's part of the API.
pub use zstd_safe::CompressionLevel;

/// The maximum number of uncompressed bytes collected before they are handed to the codec.
pub const MAX_BLOCK_SIZE: usize = 0x4000_0000;

#[doc = include_str!("../../README.md")]
#[cfg(doctest)]
pub struct ReadmeDoctests;
