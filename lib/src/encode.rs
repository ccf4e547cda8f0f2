use std::io::Write;

use zstd_safe::CCtx;

use crate::{
    error::{Error, Result},
    options::EncodeOptions,
    raw::{BlockCodec, EpilogueProgress, RawEncoder},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Open,
    Failed,
    Closed,
}

impl Status {
    fn check(self) -> Result<()> {
        match self {
            Self::Open => Ok(()),
            Self::Failed => Err(Error::failed()),
            Self::Closed => Err(Error::already_closed()),
        }
    }
}

/// Staging area for compressed data on its way to the writer.
struct OutBuf {
    buf: Vec<u8>,
    pos: usize,
    written: u64,
}

impl OutBuf {
    fn new(size: usize) -> Self {
        Self {
            buf: vec![0; size],
            pos: 0,
            written: 0,
        }
    }

    fn spare(&mut self) -> &mut [u8] {
        &mut self.buf[self.pos..]
    }

    fn is_full(&self) -> bool {
        self.pos == self.buf.len()
    }

    /// Writes all staged bytes to `writer`.
    fn drain<W: Write>(&mut self, writer: &mut W) -> Result<()> {
        if self.pos > 0 {
            writer.write_all(&self.buf[..self.pos])?;
            self.written += self.pos as u64;
            self.pos = 0;
        }

        Ok(())
    }
}

/// A streaming zstd encoder that batches writes into full blocks.
///
/// Input is collected in a buffer of `block_size` bytes and only handed to the codec once the
/// buffer is full, so the codec sees the same sequence of blocks no matter how the input was
/// split across calls. Writing data one byte at a time produces the same compressed output as
/// writing it all at once.
///
/// The encoder is not synchronized, share it between threads only with external locking. It
/// never closes the underlying writer; [`Encoder::finish`] hands it back instead.
///
/// # Examples
///
/// ```
/// use std::io::Write;
/// use zbatch::{EncodeOptions, Level};
///
/// let mut encoder = EncodeOptions::new()
///     .level(Level::Fastest)
///     .into_encoder(Vec::<u8>::new())?;
///
/// for _ in 0..5000 {
///     encoder.write_all(b"Hello World! ")?;
/// }
///
/// // End the frame and get the compressed data back
/// let compressed = encoder.finish()?;
/// # assert_eq!(zstd::decode_all(compressed.as_slice())?, b"Hello World! ".repeat(5000));
/// # Ok::<(), zbatch::Error>(())
/// ```
pub struct Encoder<W, C = RawEncoder<'static>> {
    codec: Option<C>,
    status: Status,
    pending: Vec<u8>,
    block_size: usize,
    out: OutBuf,
    writer: W,
    written_uncompressed: u64,
}

impl<'a, W> Encoder<W, RawEncoder<'a>> {
    /// Creates a new `Encoder` with default parameters.
    ///
    /// This is equivalent to calling `EncodeOptions::new().into_encoder(writer)`, except that
    /// allocation failures are reported as errors.
    ///
    /// # Errors
    ///
    /// Fails if the encoder could not be created.
    pub fn new(writer: W) -> Result<Self> {
        let opts = EncodeOptions::try_new()
            .ok_or_else(|| Error::zstd_create("compression context"))?;
        Self::with_opts(writer, opts)
    }

    /// Creates a new `Encoder` with the given [`EncodeOptions`].
    ///
    /// # Errors
    ///
    /// Fails if the options are invalid or the encoder could not be created.
    pub fn with_opts(writer: W, opts: EncodeOptions<'a>) -> Result<Self> {
        let block_size = opts.block_size;
        Self::with_codec(writer, opts.into_raw_encoder()?, block_size)
    }
}

impl<W, C: BlockCodec> Encoder<W, C> {
    /// Creates a new `Encoder` around an arbitrary [`BlockCodec`].
    ///
    /// This is the only place a frame is started: `codec` is told to begin a frame exactly once,
    /// discarding whatever state it carried. Nothing is written to `writer`.
    ///
    /// # Errors
    ///
    /// Fails if `block_size` is out of range or the codec cannot begin a frame.
    pub fn with_codec(writer: W, mut codec: C, block_size: usize) -> Result<Self> {
        let block_size = EncodeOptions::check_block_size(block_size)?;
        codec.begin_frame()?;
        log::debug!("starting zstd session with block size {block_size}");

        Ok(Self {
            codec: Some(codec),
            status: Status::Open,
            pending: Vec::with_capacity(block_size),
            block_size,
            out: OutBuf::new(CCtx::out_size()),
            writer,
            written_uncompressed: 0,
        })
    }
}

impl<W, C> Encoder<W, C> {
    /// Returns a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Returns a mutable reference to the underlying writer.
    ///
    /// Writing to it directly interleaves with the compressed stream.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consumes this encoder and returns the underlying writer.
    ///
    /// Unless [`Encoder::close`] completed before, the writer holds an incomplete frame.
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// The number of input bytes at which a block is handed to the codec.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// The total number of compressed bytes that have been written to the underlying writer.
    pub fn written_compressed(&self) -> u64 {
        self.out.written
    }

    /// The total number of uncompressed bytes accepted by this encoder.
    pub fn written_uncompressed(&self) -> u64 {
        self.written_uncompressed
    }

    /// Whether [`Encoder::close`] completed.
    pub fn is_closed(&self) -> bool {
        self.status == Status::Closed
    }

    /// Releases the codec if `res` failed, every later operation is rejected.
    fn settle<T>(&mut self, res: Result<T>) -> Result<T> {
        if res.is_err() && self.status == Status::Open {
            log::debug!("zstd session failed, releasing the compression context");
            self.codec = None;
            self.status = Status::Failed;
        }

        res
    }
}

impl<W: Write, C: BlockCodec> Encoder<W, C> {
    /// Consumes and compresses input data from `buf`.
    ///
    /// Input is buffered until a full block is available. Full blocks are compressed and the
    /// compressed data is written to the underlying writer right away, so a single call may
    /// cause any number of writes. Returns the number of bytes consumed, which is always
    /// `buf.len()`.
    ///
    /// # Examples
    ///
    /// ```
    /// use zbatch::Encoder;
    ///
    /// let mut encoder = Encoder::new(Vec::<u8>::new())?;
    /// let n = encoder.compress(b"Hello, World!")?;
    ///
    /// assert_eq!(n, 13);
    /// # Ok::<(), zbatch::Error>(())
    /// ```
    ///
    /// # Errors
    ///
    /// Fails if the encoder is closed or failed before, if compression fails or if writing to the
    /// underlying writer fails. In the latter two cases the encoder is failed afterwards.
    pub fn compress(&mut self, buf: &[u8]) -> Result<usize> {
        self.status.check()?;
        if buf.is_empty() {
            return Ok(0);
        }

        let mut input = buf;

        // Complete a pending block first, full blocks are taken directly from `buf`
        if !self.pending.is_empty() || input.len() < self.block_size {
            let take = input.len().min(self.block_size - self.pending.len());
            self.pending.extend_from_slice(&input[..take]);
            input = &input[take..];
            if self.pending.len() == self.block_size {
                self.submit_pending()?;
            }
        }

        while input.len() >= self.block_size {
            let (block, rest) = input.split_at(self.block_size);
            self.submit(block)?;
            input = rest;
        }

        self.pending.extend_from_slice(input);
        self.written_uncompressed += buf.len() as u64;

        Ok(buf.len())
    }

    /// Compresses all pending input and writes it to the underlying writer, without ending the
    /// frame.
    ///
    /// The encoder stays usable. Flushing emits a partial block, so the output depends on where
    /// flushes happen.
    ///
    /// # Errors
    ///
    /// Fails if the encoder is closed or failed before, if compression fails or if writing to the
    /// underlying writer fails. In the latter two cases the encoder is failed afterwards.
    pub fn flush(&mut self) -> Result<()> {
        self.status.check()?;
        self.submit_pending()?;

        let res = match self.codec.as_mut() {
            Some(codec) => drive(codec, &mut self.out, &mut self.writer, C::flush)
                .and_then(|()| Ok(self.writer.flush()?)),
            None => Err(Error::failed()),
        };
        self.settle(res)?;
        log::debug!("flushed, {} compressed bytes written", self.out.written);

        Ok(())
    }

    /// Ends the frame and releases the codec.
    ///
    /// Compresses all pending input, writes the frame epilogue and flushes the underlying
    /// writer. Returns the total number of compressed bytes written by this `Encoder`. Calling
    /// this on an encoder that never received input still writes a complete, empty frame.
    ///
    /// # Errors
    ///
    /// Fails with an "already closed" error if called a second time. If compression or writing
    /// fails, the underlying writer may hold an incomplete frame.
    pub fn close(&mut self) -> Result<u64> {
        self.status.check()?;
        self.submit_pending()?;

        let res = match self.codec.as_mut() {
            Some(codec) => drive(codec, &mut self.out, &mut self.writer, C::end_frame)
                .and_then(|()| Ok(self.writer.flush()?)),
            None => Err(Error::failed()),
        };
        self.settle(res)?;

        self.codec = None;
        self.status = Status::Closed;
        log::debug!(
            "closed zstd session, {} bytes compressed to {}",
            self.written_uncompressed,
            self.out.written
        );

        Ok(self.out.written)
    }

    /// Closes the encoder and returns the underlying writer.
    ///
    /// # Errors
    ///
    /// Fails if [`Encoder::close`] fails.
    pub fn finish(mut self) -> Result<W> {
        self.close()?;
        Ok(self.writer)
    }

    fn submit_pending(&mut self) -> Result<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let res = match self.codec.as_mut() {
            Some(codec) => feed(codec, &mut self.out, &mut self.writer, &self.pending),
            None => Err(Error::failed()),
        };
        self.pending.clear();
        self.settle(res)
    }

    fn submit(&mut self, block: &[u8]) -> Result<()> {
        let res = match self.codec.as_mut() {
            Some(codec) => feed(codec, &mut self.out, &mut self.writer, block),
            None => Err(Error::failed()),
        };
        self.settle(res)
    }
}

/// Hands `block` to the codec and writes everything it produced.
fn feed<C: BlockCodec, W: Write>(
    codec: &mut C,
    out: &mut OutBuf,
    writer: &mut W,
    mut block: &[u8],
) -> Result<()> {
    log::trace!("compressing block of {} bytes", block.len());

    while !block.is_empty() {
        let prog = codec.compress(block, out.spare())?;
        if prog.in_progress() == 0 && prog.out_progress() == 0 {
            return Err(Error::stalled());
        }

        out.pos += prog.out_progress();
        block = &block[prog.in_progress()..];
        if out.is_full() {
            out.drain(writer)?;
        }
    }

    out.drain(writer)
}

/// Runs a flush or end-of-frame step until the codec has nothing left.
fn drive<C, W, F>(codec: &mut C, out: &mut OutBuf, writer: &mut W, mut step: F) -> Result<()>
where
    W: Write,
    F: FnMut(&mut C, &mut [u8]) -> Result<EpilogueProgress>,
{
    loop {
        let prog = step(&mut *codec, out.spare())?;
        out.pos += prog.out_progress();
        if prog.data_left() == 0 {
            break;
        }

        if out.is_full() {
            out.drain(writer)?;
        } else if prog.out_progress() == 0 {
            return Err(Error::stalled());
        }
    }

    out.drain(writer)
}

impl<W: Write, C: BlockCodec> Write for Encoder<W, C> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        Ok(self.compress(buf)?)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(Encoder::flush(self)?)
    }
}
