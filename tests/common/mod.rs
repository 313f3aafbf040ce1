//! Shared fixtures: archives written with the `zip` crate.

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use zip::CompressionMethod;
use zip::write::SimpleFileOptions;
use zipserve::{Archive, MemoryReader};

pub const MIMETYPE: &str = "application/x-zipserve-test";

pub const README: &[u8] = b"This archive contains some text files.";
pub const GOPHER: &[u8] = b"Gopher names:\nGeorge\nGeoffrey\nGonzo";
pub const TODO: &[u8] = b"Get animal handling licence.\nWrite more examples.";
pub const INDEX: &[u8] = b"<html><h1>Index</h1></html>";
pub const DOCS_INDEX: &[u8] = b"<html><h1>Docs</h1></html>";
pub const LEGACY_INDEX: &[u8] = b"<html><h1>Legacy</h1></html>";
pub const STORED: &[u8] = b"stored, not deflated";

/// Fixed archive time: Sun, 06 Nov 1994 08:49:37 GMT.
pub fn archive_time() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(784111777)
}

/// Deterministic text large enough to span many deflate buffers.
pub fn large_text() -> Vec<u8> {
    let mut out = Vec::new();
    let mut state = 0x2545F491u32;
    for line in 0..4000u32 {
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        writeln!(out, "line {line:05} {state:08x} {}", "lorem ipsum ".repeat((state % 7) as usize))
            .unwrap();
    }
    out
}

pub struct Fixture<'a> {
    pub name: &'a str,
    pub data: &'a [u8],
    pub method: CompressionMethod,
}

pub fn deflated<'a>(name: &'a str, data: &'a [u8]) -> Fixture<'a> {
    Fixture {
        name,
        data,
        method: CompressionMethod::Deflated,
    }
}

pub fn stored<'a>(name: &'a str, data: &'a [u8]) -> Fixture<'a> {
    Fixture {
        name,
        data,
        method: CompressionMethod::Stored,
    }
}

/// Write a ZIP, optionally led by a stored `mimetype` entry.
pub fn build_zip(mimetype: Option<&str>, files: &[Fixture<'_>]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    if let Some(mimetype) = mimetype {
        writer
            .start_file(
                "mimetype",
                SimpleFileOptions::default().compression_method(CompressionMethod::Stored),
            )
            .unwrap();
        writer.write_all(mimetype.as_bytes()).unwrap();
    }
    for file in files {
        writer
            .start_file(
                file.name,
                SimpleFileOptions::default().compression_method(file.method),
            )
            .unwrap();
        writer.write_all(file.data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// The standard test archive.
pub fn sample_zip() -> Vec<u8> {
    let large = large_text();
    build_zip(
        Some(MIMETYPE),
        &[
            deflated("readme.txt", README),
            deflated("gopher.txt", GOPHER),
            deflated("todo.txt", TODO),
            deflated("index.html", INDEX),
            deflated("docs/index.html", DOCS_INDEX),
            deflated("legacy/index.htm", LEGACY_INDEX),
            stored("data/stored.bin", STORED),
            deflated("big/large.txt", &large),
        ],
    )
}

pub fn sample_archive() -> Archive<MemoryReader> {
    Archive::from_reader(MemoryReader::new(sample_zip()), archive_time()).unwrap()
}

/// Position of the first occurrence of `needle` in `haystack`.
pub fn find(haystack: &[u8], needle: &[u8]) -> usize {
    haystack
        .windows(needle.len())
        .position(|w| w == needle)
        .expect("needle present")
}

/// A one-entry stored archive whose central directory declares
/// `declared_size` uncompressed bytes through a ZIP64 extra field.
pub fn zip64_declaring(name: &str, data: &[u8], declared_size: u64) -> Vec<u8> {
    let crc = crc32fast::hash(data);
    let name_len = name.len() as u16;

    let mut out = Vec::new();
    out.extend_from_slice(b"PK\x03\x04");
    out.extend_from_slice(&45u16.to_le_bytes()); // version needed
    out.extend_from_slice(&0u16.to_le_bytes()); // flags
    out.extend_from_slice(&0u16.to_le_bytes()); // stored
    out.extend_from_slice(&0u16.to_le_bytes()); // time
    out.extend_from_slice(&0x21u16.to_le_bytes()); // 1980-01-01
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(&name_len.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(data);

    let cd_offset = out.len() as u32;
    out.extend_from_slice(b"PK\x01\x02");
    out.extend_from_slice(&45u16.to_le_bytes()); // version made by
    out.extend_from_slice(&45u16.to_le_bytes()); // version needed
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0x21u16.to_le_bytes());
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(&u32::MAX.to_le_bytes()); // size lives in the extra field
    out.extend_from_slice(&name_len.to_le_bytes());
    out.extend_from_slice(&12u16.to_le_bytes()); // extra length
    out.extend_from_slice(&0u16.to_le_bytes()); // comment length
    out.extend_from_slice(&0u16.to_le_bytes()); // disk
    out.extend_from_slice(&0u16.to_le_bytes()); // internal attrs
    out.extend_from_slice(&0u32.to_le_bytes()); // external attrs
    out.extend_from_slice(&0u32.to_le_bytes()); // local header offset
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&8u16.to_le_bytes());
    out.extend_from_slice(&declared_size.to_le_bytes());
    let cd_size = out.len() as u32 - cd_offset;

    out.extend_from_slice(b"PK\x05\x06");
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&cd_size.to_le_bytes());
    out.extend_from_slice(&cd_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}
