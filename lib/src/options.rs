use zstd_safe::{CCtx, CompressionLevel};

use crate::{
    MAX_BLOCK_SIZE,
    encode::Encoder,
    error::{Error, Result},
    raw::RawEncoder,
};

/// The zstd level used by [`Level::Fastest`].
pub const FASTEST_LEVEL: CompressionLevel = 1;
/// The zstd level used by [`Level::Default`].
pub const DEFAULT_LEVEL: CompressionLevel = 5;
/// The zstd level used by [`Level::Best`].
pub const BEST_LEVEL: CompressionLevel = 20;

/// The compression effort.
///
/// Higher levels trade speed for smaller output. Every level produces a valid zstd frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Favors speed over compression ratio.
    Fastest,
    /// A balance between speed and compression ratio.
    #[default]
    Default,
    /// Favors compression ratio over speed.
    Best,
    /// An exact zstd compression level.
    ///
    /// Must lie within `zstd_safe::min_c_level()..=zstd_safe::max_c_level()`.
    Precise(CompressionLevel),
}

impl Level {
    /// Returns the zstd compression level for this level.
    ///
    /// # Errors
    ///
    /// Fails if a [`Level::Precise`] value is out of the range supported by zstd.
    ///
    /// # Examples
    ///
    /// ```
    /// use zbatch::Level;
    ///
    /// assert_eq!(Level::Fastest.compression_level()?, 1);
    /// assert!(Level::Precise(1_000).compression_level().is_err());
    /// # Ok::<(), zbatch::Error>(())
    /// ```
    pub fn compression_level(self) -> Result<CompressionLevel> {
        match self {
            Self::Fastest => Ok(FASTEST_LEVEL),
            Self::Default => Ok(DEFAULT_LEVEL),
            Self::Best => Ok(BEST_LEVEL),
            Self::Precise(level) => {
                if (zstd_safe::min_c_level()..=zstd_safe::max_c_level()).contains(&level) {
                    Ok(level)
                } else {
                    Err(Error::invalid_level(level))
                }
            }
        }
    }
}

/// Options that configure how data is compressed.
///
/// # Examples
///
/// Supports builder like chaining.
///
/// ```
/// use zbatch::{EncodeOptions, Level};
///
/// let encoder = EncodeOptions::new()
///     .checksum_flag(true)
///     .level(Level::Best)
///     .block_size(8192)
///     .into_encoder(Vec::<u8>::new())?;
/// # Ok::<(), zbatch::Error>(())
/// ```
pub struct EncodeOptions<'a> {
    pub(crate) cctx: CCtx<'a>,
    pub(crate) level: Level,
    pub(crate) block_size: usize,
    pub(crate) checksum_flag: bool,
}

impl Default for EncodeOptions<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> EncodeOptions<'a> {
    /// Creates a set of options with default values.
    ///
    /// # Panics
    ///
    /// If allocation of [`CCtx`] fails.
    pub fn new() -> Self {
        Self::with_cctx(CCtx::create())
    }

    /// Tries to create new options with default values.
    ///
    /// Returns `None` if allocation of [`CCtx`] fails.
    pub fn try_new() -> Option<Self> {
        let cctx = CCtx::try_create()?;
        Some(Self::with_cctx(cctx))
    }

    /// Create options with the given compression context.
    ///
    /// Parameters already set on `cctx` are kept unless overridden by these options.
    pub fn with_cctx(cctx: CCtx<'a>) -> Self {
        Self {
            cctx,
            level: Level::default(),
            block_size: CCtx::in_size(),
            checksum_flag: false,
        }
    }

    /// Sets a [`CCtx`].
    pub fn cctx(mut self, cctx: CCtx<'a>) -> Self {
        self.cctx = cctx;
        self
    }

    /// Sets the compression [`Level`].
    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Sets the number of uncompressed bytes that are collected before they are handed to the
    /// codec.
    ///
    /// Defaults to [`CCtx::in_size()`]. Must be between 1 and [`MAX_BLOCK_SIZE`].
    pub fn block_size(mut self, size: usize) -> Self {
        self.block_size = size;
        self
    }

    /// Whether to write a 32 bit content checksum at the end of the frame.
    pub fn checksum_flag(mut self, flag: bool) -> Self {
        self.checksum_flag = flag;
        self
    }

    /// Creates a [`RawEncoder`] with the configuration.
    ///
    /// The block size only applies to an [`Encoder`] and is ignored here.
    ///
    /// # Errors
    ///
    /// Fails if the level is out of range or the raw encoder cannot be created.
    pub fn into_raw_encoder(self) -> Result<RawEncoder<'a>> {
        RawEncoder::with_opts(self)
    }

    /// Creates an [`Encoder`] that writes compressed data to `writer`.
    ///
    /// # Errors
    ///
    /// Fails if the level or block size is invalid or the encoder cannot be created.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::fs::File;
    /// use zbatch::{EncodeOptions, Level};
    ///
    /// let output = File::create("data.zst").unwrap();
    /// let encoder = EncodeOptions::new()
    ///     .level(Level::Fastest)
    ///     .into_encoder(output)
    ///     .unwrap();
    /// ```
    pub fn into_encoder<W>(self, writer: W) -> Result<Encoder<W, RawEncoder<'a>>> {
        Encoder::with_opts(writer, self)
    }

    pub(crate) fn check_block_size(size: usize) -> Result<usize> {
        if (1..=MAX_BLOCK_SIZE).contains(&size) {
            Ok(size)
        } else {
            Err(Error::invalid_block_size(size))
        }
    }
}
