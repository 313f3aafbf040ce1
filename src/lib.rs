//! # zipserve
//!
//! Serve the contents of a ZIP archive as a read-only file tree, over HTTP
//! or directly, without unpacking it.
//!
//! Opening an archive reads only its central directory. Each opened file is
//! an [`EntryStream`]: a `Read + Seek` view that decompresses on demand.
//! Seeking forward discards decompressed bytes; seeking backward restarts
//! decompression from the beginning of the entry.
//!
//! ## Features
//!
//! - STORED and DEFLATE entries, ZIP64 archives
//! - Directory-style paths resolve to `index.html` / `index.htm`
//! - Archive-wide `Last-Modified` and CRC-derived `ETag` for HTTP caching
//! - Optional leading `mimetype` entry exposed as the declared content type
//! - An axum router with conditional GET ([`http::router`])
//!
//! ## Example
//!
//! ```no_run
//! use std::io::{Read, Seek, SeekFrom};
//! use zipserve::Archive;
//!
//! fn main() -> zipserve::Result<()> {
//!     let archive = Archive::open("site.zip")?;
//!
//!     // "docs" resolves to docs/index.html when there is no docs entry
//!     let mut page = archive.open_file("docs")?;
//!     page.seek(SeekFrom::Start(15))?;
//!     let mut rest = String::new();
//!     page.read_to_string(&mut rest)?;
//!
//!     let readme = archive.read_all("readme.txt")?;
//!     println!("{} bytes, etag {}", readme.len(), page.etag());
//!
//!     archive.close()
//! }
//! ```

pub mod cli;
pub mod error;
pub mod http;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use error::{Error, Result};
pub use io::{LocalFileReader, MemoryReader, ReadAt};
pub use crate::zip::{Archive, Entry, EntryStream, Whence};
