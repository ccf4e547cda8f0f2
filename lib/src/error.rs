use std::fmt::Display;

use zstd_safe::{CompressionLevel, ErrorCode, get_error_name};

/// A `Result` alias where the `Err` case is `zbatch::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// The errors that may occur when working with this crate.
#[derive(Debug)]
pub struct Error {
    kind: Kind,
}

impl Error {
    pub(crate) fn invalid_level(level: CompressionLevel) -> Self {
        Self {
            kind: Kind::InvalidLevel(level),
        }
    }

    pub(crate) fn invalid_block_size(size: usize) -> Self {
        Self {
            kind: Kind::InvalidBlockSize(size),
        }
    }

    pub(crate) fn zstd_create(msg: &'static str) -> Self {
        Self {
            kind: Kind::Create(msg),
        }
    }

    pub(crate) fn stalled() -> Self {
        Self {
            kind: Kind::Stalled,
        }
    }

    pub(crate) fn already_closed() -> Self {
        Self {
            kind: Kind::AlreadyClosed,
        }
    }

    pub(crate) fn failed() -> Self {
        Self { kind: Kind::Failed }
    }

    /// Whether this error was caused by an invalid configuration, e.g. a compression level out of
    /// range.
    pub fn is_configuration(&self) -> bool {
        matches!(self.kind, Kind::InvalidLevel(_) | Kind::InvalidBlockSize(_))
    }

    /// Whether this error originates from the underlying writer.
    pub fn is_io(&self) -> bool {
        matches!(self.kind, Kind::IO(_))
    }

    /// Whether this error was reported by the codec.
    pub fn is_codec(&self) -> bool {
        matches!(self.kind, Kind::Zstd(_) | Kind::Create(_) | Kind::Stalled)
    }

    /// Whether the operation was rejected because the encoder is already closed.
    pub fn is_already_closed(&self) -> bool {
        matches!(self.kind, Kind::AlreadyClosed)
    }

    /// Whether the operation was rejected because an earlier operation failed the encoder.
    pub fn is_failed(&self) -> bool {
        matches!(self.kind, Kind::Failed)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            Kind::InvalidLevel(level) => write!(f, "invalid compression level {level}"),
            Kind::InvalidBlockSize(size) => write!(f, "invalid block size {size}"),
            Kind::IO(err) => write!(f, "io error: {err}"),
            Kind::Create(t) => write!(f, "failed to create {t:?}"),
            Kind::Zstd(code) => f.write_str(get_error_name(*code)),
            Kind::Stalled => f.write_str("codec made no progress"),
            Kind::AlreadyClosed => f.write_str("encoder is already closed"),
            Kind::Failed => f.write_str("encoder failed previously"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            Kind::IO(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self {
            kind: Kind::IO(value),
        }
    }
}

impl From<ErrorCode> for Error {
    fn from(value: ErrorCode) -> Self {
        Self {
            kind: Kind::Zstd(value),
        }
    }
}

impl From<Error> for std::io::Error {
    fn from(value: Error) -> Self {
        match value.kind {
            Kind::IO(err) => err,
            _ => std::io::Error::other(value),
        }
    }
}

#[derive(Debug)]
enum Kind {
    /// The compression level is out of range.
    InvalidLevel(CompressionLevel),
    /// The block size is zero or too large.
    InvalidBlockSize(usize),
    /// IO error.
    IO(std::io::Error),
    /// Failed to create zstd type.
    Create(&'static str),
    /// An error from the zstd library.
    Zstd(ErrorCode),
    /// The codec neither consumed input nor produced output.
    Stalled,
    /// The encoder was closed before.
    AlreadyClosed,
    /// A previous operation failed and released the codec.
    Failed,
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn classification() {
        assert!(Error::invalid_level(99).is_configuration());
        assert!(Error::invalid_block_size(0).is_configuration());
        assert!(Error::from(io::Error::other("boom")).is_io());
        assert!(Error::stalled().is_codec());
        assert!(Error::already_closed().is_already_closed());
        assert!(Error::failed().is_failed());
        assert!(!Error::failed().is_already_closed());
    }

    #[test]
    fn io_errors_pass_through() {
        let err = Error::from(io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        let io_err = io::Error::from(err);
        assert_eq!(io_err.kind(), io::ErrorKind::BrokenPipe);

        let io_err = io::Error::from(Error::already_closed());
        assert_eq!(io_err.kind(), io::ErrorKind::Other);
        assert_eq!(io_err.to_string(), "encoder is already closed");
    }
}
