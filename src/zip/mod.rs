//! ZIP archive reading and the archive-backed file tree.
//!
//! ## Architecture
//!
//! - [`structures`]: Data structures representing ZIP format elements (EOCD, file headers, etc.)
//! - [`parser`]: Low-level parsing of the central directory from raw bytes
//! - [`catalog`]: Path normalization and the immutable path → entry table
//! - [`stream`]: Seekable reader over one entry's decompressed bytes
//! - [`archive`]: The archive handle tying the above together
//!
//! ## ZIP Format Overview
//!
//! A ZIP file consists of:
//! 1. Local file headers and compressed data for each file
//! 2. Central Directory with metadata for all files
//! 3. End of Central Directory (EOCD) record at the end
//!
//! Opening an archive reads only the EOCD and the Central Directory.
//! Entry data is decompressed lazily, one stream at a time.
//!
//! ## Supported Features
//!
//! - Standard ZIP format (PKZIP APPNOTE 6.3.x compatible)
//! - ZIP64 extensions for files > 4GB
//! - STORED (no compression) and DEFLATE methods
//! - CRC-32 verification of every fully read entry
//!
//! ## Limitations
//!
//! - No encryption support
//! - No multi-disk archive support
//! - No BZIP2, LZMA, or other compression methods

mod archive;
mod catalog;
mod parser;
mod stream;
mod structures;

pub use archive::Archive;
pub use catalog::{Catalog, Entry, MIMETYPE_ENTRY, clean_path};
pub use parser::ZipParser;
pub use stream::{EntryStream, Whence};
pub use structures::*;
