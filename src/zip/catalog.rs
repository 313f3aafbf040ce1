//! Path → entry lookup table, built once when an archive is opened.

use std::collections::HashMap;
use std::sync::Arc;

use super::structures::{CentralRecord, CompressionMethod};

/// Name of the optional reserved first entry carrying the archive's content type.
pub const MIMETYPE_ENTRY: &str = "mimetype";

/// Index documents tried, in order, when a path has no entry of its own.
const INDEX_FILES: [&str; 2] = ["index.html", "index.htm"];

/// One file inside the archive.
#[derive(Debug)]
pub struct Entry {
    path: String,
    record: CentralRecord,
}

impl Entry {
    fn new(path: String, record: CentralRecord) -> Self {
        Self { path, record }
    }

    /// Normalized path, always starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Uncompressed size in bytes.
    pub fn size(&self) -> u64 {
        self.record.uncompressed_size
    }

    pub fn compressed_size(&self) -> u64 {
        self.record.compressed_size
    }

    pub fn crc32(&self) -> u32 {
        self.record.crc32
    }

    pub fn compression_method(&self) -> CompressionMethod {
        self.record.compression_method
    }

    /// Strong entity tag derived from the CRC-32: base 36, double-quoted.
    pub fn etag(&self) -> String {
        format!("\"{}\"", to_base36(self.record.crc32))
    }

    /// The raw central directory record.
    pub fn record(&self) -> &CentralRecord {
        &self.record
    }
}

/// Immutable lookup table from normalized path to [`Entry`].
#[derive(Debug, Default)]
pub struct Catalog {
    entries: HashMap<String, Arc<Entry>>,
    reserved: Option<Arc<Entry>>,
}

impl Catalog {
    /// Build the catalog from central directory records in physical order.
    ///
    /// A stored `mimetype` record in first position is set aside instead of
    /// being catalogued. Directory records are skipped. When two records
    /// normalize to the same path the first one wins.
    pub fn new(records: Vec<CentralRecord>) -> Self {
        let mut catalog = Catalog::default();

        for (i, record) in records.into_iter().enumerate() {
            if i == 0
                && record.file_name == MIMETYPE_ENTRY
                && record.compression_method == CompressionMethod::Stored
            {
                catalog.reserved = Some(Arc::new(Entry::new(
                    format!("/{MIMETYPE_ENTRY}"),
                    record,
                )));
                continue;
            }
            if record.is_directory() {
                continue;
            }
            let path = clean_path(&record.file_name);
            catalog
                .entries
                .entry(path.clone())
                .or_insert_with(|| Arc::new(Entry::new(path, record)));
        }

        catalog
    }

    /// Resolve a requested path: the exact path first, then
    /// `path/index.html`, then `path/index.htm`.
    pub fn lookup(&self, name: &str) -> Option<&Arc<Entry>> {
        let path = clean_path(name);
        if let Some(entry) = self.entries.get(&path) {
            return Some(entry);
        }
        INDEX_FILES
            .iter()
            .find_map(|index| self.entries.get(&join(&path, index)))
    }

    /// The reserved `mimetype` entry, if the archive starts with one.
    pub fn reserved(&self) -> Option<&Arc<Entry>> {
        self.reserved.as_ref()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All catalogued entries, sorted by path.
    pub fn entries(&self) -> Vec<Arc<Entry>> {
        let mut entries: Vec<_> = self.entries.values().cloned().collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }
}

/// Normalize a path to rooted, forward-slash form.
///
/// Backslashes become `/`, empty and `.` segments are dropped, and `..`
/// removes the previous segment but never climbs above the root.
pub fn clean_path(name: &str) -> String {
    let name = name.replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();
    for segment in name.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    format!("/{}", parts.join("/"))
}

fn join(dir: &str, file: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{file}")
    } else {
        format!("{dir}/{file}")
    }
}

fn to_base36(mut n: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}
