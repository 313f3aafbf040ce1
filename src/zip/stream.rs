//! Seekable reader over one entry's decompressed content.
//!
//! A decompression pipe only moves forward. [`EntryStream`] turns it into a
//! `Read + Seek` by discarding bytes to move forward and by throwing the pipe
//! away and starting a fresh one to move backward. A backward seek therefore
//! decompresses the whole prefix again.

use flate2::read::DeflateDecoder;
use std::io::{self, Read, Seek, SeekFrom};
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::{Error, Result};
use crate::io::{ReadAt, SectionReader};

use super::catalog::Entry;
use super::parser::data_offset;
use super::structures::CompressionMethod;

/// Raw numeric seek origin, as used by C-style `lseek` callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    Start,
    Current,
    End,
}

impl Whence {
    /// Pair the origin with a signed offset.
    pub fn with_offset(self, delta: i64) -> Result<SeekFrom> {
        match self {
            Whence::Start => u64::try_from(delta)
                .map(SeekFrom::Start)
                .map_err(|_| Error::NegativeSeekPosition(delta)),
            Whence::Current => Ok(SeekFrom::Current(delta)),
            Whence::End => Ok(SeekFrom::End(delta)),
        }
    }
}

impl TryFrom<i32> for Whence {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            0 => Ok(Whence::Start),
            1 => Ok(Whence::Current),
            2 => Ok(Whence::End),
            other => Err(Error::InvalidSeekOrigin(other)),
        }
    }
}

enum Decoder<R: ReadAt> {
    Stored(SectionReader<R>),
    Deflate(DeflateDecoder<SectionReader<R>>),
}

/// One pass of decompression over an entry, with CRC-32 and size checks.
struct Pipe<R: ReadAt> {
    decoder: Decoder<R>,
    hasher: crc32fast::Hasher,
    produced: u64,
    entry: Arc<Entry>,
}

impl<R: ReadAt> Pipe<R> {
    fn open(source: &Arc<R>, entry: &Arc<Entry>) -> Result<Self> {
        let offset = data_offset(source.as_ref(), entry.record())?;
        let raw = SectionReader::new(Arc::clone(source), offset, entry.compressed_size());
        let decoder = match entry.compression_method() {
            CompressionMethod::Stored => Decoder::Stored(raw),
            CompressionMethod::Deflate => Decoder::Deflate(DeflateDecoder::new(raw)),
            CompressionMethod::Unknown(method) => {
                return Err(Error::UnsupportedCompression(method));
            }
        };
        Ok(Self {
            decoder,
            hasher: crc32fast::Hasher::new(),
            produced: 0,
            entry: Arc::clone(entry),
        })
    }

    fn finish(&self) -> io::Result<()> {
        if self.produced < self.entry.size() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("{}: entry data ends early", self.entry.path()),
            ));
        }
        let actual = self.hasher.clone().finalize();
        if actual != self.entry.crc32() {
            return Err(Error::ChecksumMismatch {
                path: self.entry.path().to_string(),
                expected: self.entry.crc32(),
                actual,
            }
            .into());
        }
        Ok(())
    }
}

impl<R: ReadAt> Read for Pipe<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = match &mut self.decoder {
            Decoder::Stored(r) => r.read(buf)?,
            Decoder::Deflate(r) => r.read(buf)?,
        };
        if n == 0 && !buf.is_empty() {
            self.finish()?;
            return Ok(0);
        }
        self.hasher.update(&buf[..n]);
        self.produced += n as u64;
        if self.produced > self.entry.size() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{}: entry larger than declared size", self.entry.path()),
            ));
        }
        Ok(n)
    }
}

/// A readable, seekable view of one archive entry.
///
/// Created by [`Archive::open_file`](super::Archive::open_file). A stream is
/// owned by a single reader: `read` and `seek` take `&mut self`, and a stream
/// must not be shared between threads behind a lock and driven concurrently.
/// Independent streams over the same entry do not interact.
///
/// After a failed seek the position is wherever the discard read stopped;
/// seek to a known position before reading again.
pub struct EntryStream<R: ReadAt> {
    entry: Arc<Entry>,
    source: Arc<R>,
    modified: SystemTime,
    pipe: Pipe<R>,
    offset: u64,
}

impl<R: ReadAt> std::fmt::Debug for EntryStream<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryStream")
            .field("entry", &self.entry)
            .field("modified", &self.modified)
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

impl<R: ReadAt> EntryStream<R> {
    pub(crate) fn open(entry: Arc<Entry>, source: Arc<R>, modified: SystemTime) -> Result<Self> {
        let pipe = Pipe::open(&source, &entry)?;
        Ok(Self {
            entry,
            source,
            modified,
            pipe,
            offset: 0,
        })
    }

    /// Uncompressed size of the entry.
    pub fn size(&self) -> u64 {
        self.entry.size()
    }

    /// Modification time of the whole archive; per-entry DOS times are not used.
    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    /// Quoted entity tag derived from the entry's CRC-32.
    pub fn etag(&self) -> String {
        self.entry.etag()
    }

    /// Resolved path of the entry, after any index fallback.
    pub fn path(&self) -> &str {
        self.entry.path()
    }

    /// Catalog entry the stream reads.
    pub fn entry(&self) -> &Arc<Entry> {
        &self.entry
    }

    /// Directory listings are never exposed.
    pub fn read_dir(&self) -> Vec<Arc<Entry>> {
        Vec::new()
    }

    /// Current logical position.
    pub fn position(&self) -> u64 {
        self.offset
    }

    /// Seek with a raw numeric origin: 0 = start, 1 = current, 2 = end.
    pub fn seek_whence(&mut self, delta: i64, whence: i32) -> Result<u64> {
        let pos = Whence::try_from(whence)?.with_offset(delta)?;
        self.seek_from(pos)
    }

    /// Release the decompression pipe. The stream is consumed, so it can
    /// only be closed once; dropping it has the same effect.
    pub fn close(self) -> Result<()> {
        drop(self);
        Ok(())
    }

    fn seek_from(&mut self, pos: SeekFrom) -> Result<u64> {
        let target = match pos {
            SeekFrom::Start(n) => i128::from(n),
            SeekFrom::Current(delta) => i128::from(self.offset) + i128::from(delta),
            SeekFrom::End(delta) => i128::from(self.size()) + i128::from(delta),
        };
        if target < 0 {
            // Never below i64::MIN: both operands are at least that.
            return Err(Error::NegativeSeekPosition(target as i64));
        }
        let target = u64::try_from(target).map_err(|_| {
            Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek position overflows",
            ))
        })?;

        if target < self.offset {
            self.pipe = Pipe::open(&self.source, &self.entry)?;
            self.offset = 0;
        }
        if target > self.offset {
            self.discard(target - self.offset)?;
        }
        Ok(self.offset)
    }

    fn discard(&mut self, n: u64) -> Result<()> {
        let skipped = io::copy(&mut self.by_ref().take(n), &mut io::sink())?;
        if skipped < n {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "{}: seek to {} past end of entry ({} bytes)",
                    self.entry.path(),
                    self.offset + (n - skipped),
                    self.size()
                ),
            )));
        }
        Ok(())
    }
}

impl<R: ReadAt> Read for EntryStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.pipe.read(buf)?;
        self.offset += n as u64;
        Ok(n)
    }
}

impl<R: ReadAt> Seek for EntryStream<R> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        Ok(self.seek_from(pos)?)
    }

    fn stream_position(&mut self) -> io::Result<u64> {
        Ok(self.offset)
    }
}
