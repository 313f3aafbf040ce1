use std::io::Read;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use crate::error::{Error, Result};
use crate::io::{LocalFileReader, ReadAt};

use super::catalog::{Catalog, Entry, clean_path};
use super::parser::ZipParser;
use super::stream::EntryStream;

/// Largest up-front allocation made from an entry's declared size.
const READ_HINT_LIMIT: u64 = 64 * 1024;

/// A ZIP archive opened as a read-only tree of files.
///
/// The catalog is built once in the constructor and never changes, so
/// lookups need no locking. Only the backing source is guarded: `close`
/// and the closed-check in `open_file` take the same lock.
///
/// Streams keep their own handle on the source. Streams opened before
/// `close` stay readable until dropped, and the source is released when
/// the last of them goes away.
pub struct Archive<R: ReadAt> {
    catalog: Catalog,
    modified: SystemTime,
    declared_content_type: String,
    source: Mutex<Option<Arc<R>>>,
}

impl Archive<LocalFileReader> {
    /// Open a ZIP file on disk. Its modification time becomes the
    /// `Last-Modified` time of every entry.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let reader = LocalFileReader::new(path.as_ref())?;
        let modified = reader.modified();
        Self::from_reader(reader, modified)
    }
}

impl<R: ReadAt> Archive<R> {
    /// Build an archive over any random-access source.
    pub fn from_reader(reader: R, modified: SystemTime) -> Result<Self> {
        let source = Arc::new(reader);
        let records = ZipParser::new(Arc::clone(&source)).list_files()?;
        let catalog = Catalog::new(records);

        let declared_content_type = catalog
            .reserved()
            .and_then(|entry| read_entry(entry, &source, modified).ok())
            .map(|data| String::from_utf8_lossy(&data).into_owned())
            .unwrap_or_default();

        Ok(Self {
            catalog,
            modified,
            declared_content_type,
            source: Mutex::new(Some(source)),
        })
    }

    /// Open the entry at `name`, falling back to `name/index.html` and
    /// `name/index.htm`.
    ///
    /// Fails with [`Error::Closed`] after [`close`](Self::close), with
    /// [`Error::NotFound`] when nothing matches.
    pub fn open_file(&self, name: &str) -> Result<EntryStream<R>> {
        let source = self
            .source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::Closed)?;

        let entry = self
            .catalog
            .lookup(name)
            .ok_or_else(|| Error::NotFound(clean_path(name)))?;

        EntryStream::open(Arc::clone(entry), source, self.modified)
    }

    /// Read an entry to the end.
    ///
    /// The declared size is only a capacity hint, capped at 64 KiB; the
    /// buffer grows with the data actually decompressed.
    pub fn read_all(&self, name: &str) -> Result<Vec<u8>> {
        let mut stream = self.open_file(name)?;
        let mut data = Vec::with_capacity(stream.size().min(READ_HINT_LIMIT) as usize);
        stream.read_to_end(&mut data)?;
        stream.close()?;
        Ok(data)
    }

    /// Content of the reserved leading `mimetype` entry, or `""`.
    pub fn declared_content_type(&self) -> &str {
        &self.declared_content_type
    }

    /// True when the archive starts with a stored `mimetype` entry whose
    /// content is exactly `expected` (the EPUB-style container check).
    pub fn has_content_type(&self, expected: &str) -> bool {
        self.catalog.reserved().is_some() && self.declared_content_type == expected
    }

    /// Modification time of the backing resource.
    pub fn modified(&self) -> SystemTime {
        self.modified
    }

    /// Number of catalogued files.
    pub fn len(&self) -> usize {
        self.catalog.len()
    }

    pub fn is_empty(&self) -> bool {
        self.catalog.is_empty()
    }

    /// Catalogued files sorted by path.
    pub fn entries(&self) -> Vec<Arc<Entry>> {
        self.catalog.entries()
    }

    pub fn is_closed(&self) -> bool {
        self.source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Mark the archive closed and drop its handle on the source.
    ///
    /// Later `open_file` calls fail with [`Error::Closed`]; so does a second `close`.
    pub fn close(&self) -> Result<()> {
        self.source
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map(drop)
            .ok_or(Error::Closed)
    }
}

fn read_entry<R: ReadAt>(entry: &Arc<Entry>, source: &Arc<R>, modified: SystemTime) -> Result<Vec<u8>> {
    let mut stream = EntryStream::open(Arc::clone(entry), Arc::clone(source), modified)?;
    let mut data = Vec::new();
    stream.read_to_end(&mut data)?;
    Ok(data)
}
