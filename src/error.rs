//! Error types for archive lookups, entry streams and ZIP parsing.
//!
//! Every fallible library operation returns [`Result<T>`]. The HTTP adapter
//! maps [`Error::NotFound`] and [`Error::Closed`] to their own statuses and
//! everything else to a server error.

use std::io;

/// Errors produced while opening, reading or seeking within an archive.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// No catalog entry matched the path, including index fallbacks.
    #[error("{0}: file not found in archive")]
    NotFound(String),

    /// The archive was closed before the operation.
    #[error("archive is closed")]
    Closed,

    /// A raw seek origin outside `0..=2`.
    #[error("invalid seek origin: {0}")]
    InvalidSeekOrigin(i32),

    /// A seek resolved to a position before the start of the entry.
    #[error("negative seek position: {0}")]
    NegativeSeekPosition(i64),

    /// Failure of the backing storage or of the decompressor.
    #[error(transparent)]
    Io(io::Error),

    /// The backing resource is not a readable ZIP archive.
    #[error("invalid ZIP archive: {0}")]
    InvalidArchive(String),

    /// Entry uses a compression method other than store or deflate.
    #[error("unsupported compression method: {0}")]
    UnsupportedCompression(u16),

    /// Decompressed content does not match the central directory CRC-32.
    #[error("checksum mismatch for {path}: expected {expected:#010x}, got {actual:#010x}")]
    ChecksumMismatch {
        path: String,
        expected: u32,
        actual: u32,
    },
}

impl Error {
    pub(crate) fn invalid_archive(msg: impl Into<String>) -> Self {
        Error::InvalidArchive(msg.into())
    }

    /// True for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Recover a typed error that travelled through an [`io::Error`],
    /// e.g. one returned by `Read::read` or `Seek::seek` on an entry stream.
    pub fn from_io_ref(err: &io::Error) -> Option<&Error> {
        err.get_ref().and_then(|inner| inner.downcast_ref::<Error>())
    }
}

impl From<io::Error> for Error {
    /// Unwraps typed errors that were tunnelled through `io::Error`
    /// by the `Read`/`Seek` implementations.
    fn from(err: io::Error) -> Self {
        if !err.get_ref().is_some_and(|inner| inner.is::<Error>()) {
            return Error::Io(err);
        }
        let kind = err.kind();
        match err.into_inner().map(|inner| inner.downcast::<Error>()) {
            Some(Ok(typed)) => *typed,
            Some(Err(inner)) => Error::Io(io::Error::new(kind, inner)),
            None => Error::Io(io::Error::from(kind)),
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Io(e) => e,
            Error::NotFound(_) => io::Error::new(io::ErrorKind::NotFound, err),
            Error::InvalidSeekOrigin(_) | Error::NegativeSeekPosition(_) => {
                io::Error::new(io::ErrorKind::InvalidInput, err)
            }
            Error::UnsupportedCompression(_) => io::Error::new(io::ErrorKind::Unsupported, err),
            _ => io::Error::new(io::ErrorKind::InvalidData, err),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
