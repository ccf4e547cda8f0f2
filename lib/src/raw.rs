use zstd_safe::{
    CCtx, CParameter, InBuffer, OutBuffer, ResetDirective, zstd_sys::ZSTD_EndDirective,
};

use crate::{
    error::{Error, Result},
    options::EncodeOptions,
};

/// The progress of a compression step.
#[derive(Debug)]
pub struct CompressionProgress {
    in_progress: usize,
    out_progress: usize,
}

impl CompressionProgress {
    /// Creates a new progress report.
    pub fn new(in_progress: usize, out_progress: usize) -> Self {
        Self {
            in_progress,
            out_progress,
        }
    }

    /// The input progress, i.e. the number of bytes that were consumed from the input buffer.
    pub fn in_progress(&self) -> usize {
        self.in_progress
    }

    /// The output progress, i.e. the number of bytes that were written to the output buffer.
    pub fn out_progress(&self) -> usize {
        self.out_progress
    }
}

/// The progress of a flush or of writing the frame epilogue.
#[derive(Debug)]
pub struct EpilogueProgress {
    out_progress: usize,
    data_left: usize,
}

impl EpilogueProgress {
    /// Creates a new progress report.
    pub fn new(out_progress: usize, data_left: usize) -> Self {
        Self {
            out_progress,
            data_left,
        }
    }

    /// The output progress, i.e. the number of bytes that were written to the output buffer.
    pub fn out_progress(&self) -> usize {
        self.out_progress
    }

    /// A minimal estimation of the bytes left to flush. The step is complete if this value is
    /// zero.
    pub fn data_left(&self) -> usize {
        self.data_left
    }
}

/// A block oriented compression codec.
///
/// An [`Encoder`](crate::Encoder) owns exactly one codec and only ever hands it complete blocks,
/// except for the last block before a flush or the end of the frame.
pub trait BlockCodec {
    /// Starts a new frame, discarding any progress of the current one.
    ///
    /// # Errors
    ///
    /// Fails if the codec cannot be reset.
    fn begin_frame(&mut self) -> Result<()>;

    /// Performs a compression step from `input` to `output`.
    ///
    /// # Errors
    ///
    /// If compression fails.
    fn compress(&mut self, input: &[u8], output: &mut [u8]) -> Result<CompressionProgress>;

    /// Writes all data buffered by the codec to `output` without ending the frame.
    ///
    /// # Errors
    ///
    /// If compression fails.
    fn flush(&mut self, output: &mut [u8]) -> Result<EpilogueProgress>;

    /// Ends the frame, writing the last block and the frame footer to `output`.
    ///
    /// # Errors
    ///
    /// If compression fails.
    fn end_frame(&mut self, output: &mut [u8]) -> Result<EpilogueProgress>;
}

/// A low level, in-memory zstd encoder.
///
/// Wraps a single [`CCtx`] that is released when the `RawEncoder` is dropped.
///
/// # Examples
///
/// ```
/// use zbatch::RawEncoder;
///
/// let mut encoder = RawEncoder::new()?;
/// // We just assume that all data fits into `buf`. Real-world applications should allocate more
/// // memory when needed.
/// let mut buf = [0u8; 64];
/// let mut in_progress = 0;
/// let mut out_progress = 0;
/// let input = b"Hello, World!";
///
/// while in_progress < input.len() {
///     let prog = encoder.compress(&input[in_progress..], &mut buf[out_progress..])?;
///     in_progress += prog.in_progress();
///     out_progress += prog.out_progress();
/// }
///
/// loop {
///     let prog = encoder.end_frame(&mut buf[out_progress..])?;
///     out_progress += prog.out_progress();
///     if prog.data_left() == 0 {
///         break;
///     }
/// }
///
/// # let output = zstd::decode_all(&buf[..out_progress]).unwrap();
/// # assert_eq!(input, output.as_slice());
/// # Ok::<(), zbatch::Error>(())
/// ```
pub struct RawEncoder<'a> {
    cctx: CCtx<'a>,
    written_in: u64,
    written_out: u64,
}

impl<'a> RawEncoder<'a> {
    /// Creates a new `RawEncoder` with the given [`EncodeOptions`].
    ///
    /// The context in `opts` is used as is. Call [`begin_frame`](Self::begin_frame) first if it
    /// was used for compression before.
    ///
    /// # Errors
    ///
    /// Fails if the compression level is invalid or cannot be applied.
    pub fn with_opts(mut opts: EncodeOptions<'a>) -> Result<Self> {
        let level = opts.level.compression_level()?;
        opts.cctx.set_parameter(CParameter::CompressionLevel(level))?;
        opts.cctx
            .set_parameter(CParameter::ChecksumFlag(opts.checksum_flag))?;

        Ok(Self {
            cctx: opts.cctx,
            written_in: 0,
            written_out: 0,
        })
    }

    /// Creates a new `RawEncoder` with default parameters.
    ///
    /// # Errors
    ///
    /// Fails if the compression context cannot be allocated.
    pub fn new() -> Result<Self> {
        let opts = EncodeOptions::try_new()
            .ok_or_else(|| Error::zstd_create("compression context"))?;
        Self::with_opts(opts)
    }

    /// Starts a new frame.
    ///
    /// Discards the progress of the current frame while keeping all parameters.
    ///
    /// # Errors
    ///
    /// Fails if the compression session cannot be reset.
    pub fn begin_frame(&mut self) -> Result<()> {
        self.cctx.reset(ResetDirective::SessionOnly)?;
        self.written_in = 0;
        self.written_out = 0;

        Ok(())
    }

    /// Performs a streaming compression step from `input` to `output`.
    ///
    /// The returned [`CompressionProgress`] indicates how many bytes were consumed from `input`
    /// and written to `output`. If `input` was not entirely consumed, the caller must make some
    /// room to receive more compressed data and present the remaining input again.
    ///
    /// # Errors
    ///
    /// If compression fails.
    pub fn compress(&mut self, input: &[u8], output: &mut [u8]) -> Result<CompressionProgress> {
        let mut in_buf = InBuffer::around(input);
        let mut out_buf = OutBuffer::around(output);

        while in_buf.pos() < input.len() && out_buf.pos() < out_buf.capacity() {
            self.cctx.compress_stream2(
                &mut out_buf,
                &mut in_buf,
                ZSTD_EndDirective::ZSTD_e_continue,
            )?;
        }

        self.written_in += in_buf.pos() as u64;
        self.written_out += out_buf.pos() as u64;

        Ok(CompressionProgress::new(in_buf.pos(), out_buf.pos()))
    }

    /// Flushes the data buffered inside the compression context to `output`.
    ///
    /// Buffered data is emitted as complete blocks, the frame stays open. Call this repetitively
    /// until [`EpilogueProgress::data_left`] is zero.
    ///
    /// # Errors
    ///
    /// If compression fails.
    pub fn flush(&mut self, output: &mut [u8]) -> Result<EpilogueProgress> {
        self.drain(output, ZSTD_EndDirective::ZSTD_e_flush)
    }

    /// Ends the current frame.
    ///
    /// Call this repetitively to write the last block and the frame epilogue to `output`, until
    /// [`EpilogueProgress::data_left`] is zero. A frame without any input still produces a
    /// complete, empty frame.
    ///
    /// # Errors
    ///
    /// If compression fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use zbatch::RawEncoder;
    ///
    /// let mut encoder = RawEncoder::new()?;
    /// let mut buf = [0u8; 32];
    /// let prog = encoder.end_frame(&mut buf)?;
    ///
    /// assert_eq!(prog.data_left(), 0);
    /// assert!(prog.out_progress() > 0);
    /// # Ok::<(), zbatch::Error>(())
    /// ```
    pub fn end_frame(&mut self, output: &mut [u8]) -> Result<EpilogueProgress> {
        self.drain(output, ZSTD_EndDirective::ZSTD_e_end)
    }

    /// The number of uncompressed bytes consumed in the current frame.
    pub fn written_in(&self) -> u64 {
        self.written_in
    }

    /// The number of compressed bytes produced in the current frame.
    pub fn written_out(&self) -> u64 {
        self.written_out
    }

    fn drain(
        &mut self,
        output: &mut [u8],
        directive: ZSTD_EndDirective,
    ) -> Result<EpilogueProgress> {
        let mut empty_buf = InBuffer::around(&[]);
        let mut out_buf = OutBuffer::around(output);

        loop {
            let n = self
                .cctx
                .compress_stream2(&mut out_buf, &mut empty_buf, directive)?;

            // Check for completion before checking for a full buffer, an epilogue that fits
            // exactly into the buffer is complete.
            if n == 0 {
                break;
            }

            if out_buf.pos() == out_buf.capacity() {
                self.written_out += out_buf.pos() as u64;
                return Ok(EpilogueProgress::new(out_buf.pos(), n));
            }
        }

        self.written_out += out_buf.pos() as u64;
        Ok(EpilogueProgress::new(out_buf.pos(), 0))
    }
}

impl BlockCodec for RawEncoder<'_> {
    fn begin_frame(&mut self) -> Result<()> {
        RawEncoder::begin_frame(self)
    }

    fn compress(&mut self, input: &[u8], output: &mut [u8]) -> Result<CompressionProgress> {
        RawEncoder::compress(self, input, output)
    }

    fn flush(&mut self, output: &mut [u8]) -> Result<EpilogueProgress> {
        RawEncoder::flush(self, output)
    }

    fn end_frame(&mut self, output: &mut [u8]) -> Result<EpilogueProgress> {
        RawEncoder::end_frame(self, output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Level, tests::INPUT};

    fn compress_all(encoder: &mut RawEncoder<'_>, input: &[u8]) -> Vec<u8> {
        let mut out = vec![];
        let mut buf = vec![0; 256];
        let mut in_progress = 0;

        while in_progress < input.len() {
            let prog = encoder.compress(&input[in_progress..], &mut buf).unwrap();
            out.extend(&buf[..prog.out_progress()]);
            in_progress += prog.in_progress();
        }

        loop {
            let prog = encoder.end_frame(&mut buf).unwrap();
            out.extend(&buf[..prog.out_progress()]);
            if prog.data_left() == 0 {
                break;
            }
        }

        out
    }

    #[test]
    fn cycle_with_small_output_buffer() {
        let mut encoder = RawEncoder::new().unwrap();
        let compressed = compress_all(&mut encoder, INPUT.as_bytes());

        assert_eq!(encoder.written_in(), INPUT.len() as u64);
        assert_eq!(encoder.written_out(), compressed.len() as u64);
        assert_eq!(zstd::decode_all(compressed.as_slice()).unwrap(), INPUT.as_bytes());
    }

    #[test]
    fn begin_frame_discards_progress() {
        let mut encoder = RawEncoder::new().unwrap();
        let expected = compress_all(&mut encoder, b"Hello");

        encoder.begin_frame().unwrap();
        encoder.compress(b"Bye", &mut [0; 128]).unwrap();
        encoder.begin_frame().unwrap();
        assert_eq!(encoder.written_in(), 0);
        assert_eq!(encoder.written_out(), 0);

        assert_eq!(compress_all(&mut encoder, b"Hello"), expected);
    }

    #[test]
    fn flush_keeps_frame_open() {
        let mut encoder = RawEncoder::new().unwrap();
        let mut out = vec![];
        let mut buf = vec![0; 1024];

        let prog = encoder.compress(b"Hello, ", &mut buf).unwrap();
        assert_eq!(prog.in_progress(), 7);
        let prog = encoder.flush(&mut buf).unwrap();
        assert_eq!(prog.data_left(), 0);
        out.extend(&buf[..prog.out_progress()]);
        // The flushed blocks are decodable, but the frame is not complete yet
        assert!(zstd_safe::find_frame_compressed_size(&out).is_err());

        encoder.compress(b"World!", &mut buf).unwrap();
        let prog = encoder.end_frame(&mut buf).unwrap();
        out.extend(&buf[..prog.out_progress()]);

        assert_eq!(zstd::decode_all(out.as_slice()).unwrap(), b"Hello, World!");
    }

    #[test]
    fn checksum() {
        let mut encoder = EncodeOptions::new()
            .checksum_flag(true)
            .level(Level::Fastest)
            .into_raw_encoder()
            .unwrap();
        let compressed = compress_all(&mut encoder, INPUT.as_bytes());

        // Get the Frame_Header_Descriptor field and check that the Content_Checksum_flag is set
        let descriptor = compressed[4];
        assert!(descriptor & 0x4 > 0);
    }
}
