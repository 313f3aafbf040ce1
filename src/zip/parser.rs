//! Low-level ZIP archive parser.
//!
//! This module handles the binary parsing of ZIP file structures,
//! reading from any source that implements the [`ReadAt`] trait.
//!
//! ## Parsing Strategy
//!
//! ZIP files are designed to be read from the end:
//! 1. Find the End of Central Directory (EOCD) at the file's end
//! 2. If ZIP64, read the ZIP64 EOCD for large file support
//! 3. Read the Central Directory to get metadata for all files
//! 4. When an entry is opened, read its Local File Header to find the data
//!
//! Only the tail of the archive is touched at open time; entry data is
//! never read until a stream asks for it.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Cursor, Read};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::io::ReadAt;

use super::structures::*;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// This limits the search area when looking for EOCD with a comment.
const MAX_COMMENT_SIZE: u64 = 65535;

/// Low-level ZIP file parser.
///
/// Generic over the reader type so the same code serves files on disk
/// and archives held in memory.
pub struct ZipParser<R: ReadAt> {
    /// The underlying data source
    reader: Arc<R>,
    /// Total size of the archive in bytes
    size: u64,
}

impl<R: ReadAt> ZipParser<R> {
    pub fn new(reader: Arc<R>) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Returns the record and its offset in the file. Archives with a
    /// trailing comment are handled by scanning backwards for the signature.
    pub fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        if self.size < EndOfCentralDirectory::SIZE as u64 {
            return Err(Error::invalid_archive("file too small"));
        }

        // Common case: no comment, EOCD is the last 22 bytes.
        let offset = self.size - EndOfCentralDirectory::SIZE as u64;
        let mut buf = vec![0u8; EndOfCentralDirectory::SIZE];
        self.reader.read_exact_at(offset, &mut buf)?;
        if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && &buf[20..22] == b"\x00\x00" {
            let eocd = EndOfCentralDirectory::from_bytes(&buf)?;
            return Ok((eocd, offset));
        }

        let search_size = (MAX_COMMENT_SIZE + EndOfCentralDirectory::SIZE as u64).min(self.size);
        let search_start = self.size - search_size;

        let mut buf = vec![0u8; search_size as usize];
        self.reader.read_exact_at(search_start, &mut buf)?;

        for i in (0..=buf.len() - EndOfCentralDirectory::SIZE).rev() {
            if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
                // A real EOCD's comment length runs exactly to end of file.
                let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;

                if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                    let eocd = EndOfCentralDirectory::from_bytes(
                        &buf[i..i + EndOfCentralDirectory::SIZE],
                    )?;
                    return Ok((eocd, search_start + i as u64));
                }
            }
        }

        Err(Error::invalid_archive("end of central directory not found"))
    }

    /// Read the ZIP64 End of Central Directory record.
    ///
    /// Called when the regular EOCD has fields saturated to 0xFFFF/0xFFFFFFFF.
    pub fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Zip64EOCD> {
        // The locator sits immediately before the regular EOCD
        let locator_offset = eocd_offset
            .checked_sub(Zip64EOCDLocator::SIZE as u64)
            .ok_or_else(|| Error::invalid_archive("missing ZIP64 locator"))?;
        let mut locator_buf = vec![0u8; Zip64EOCDLocator::SIZE];
        self.reader.read_exact_at(locator_offset, &mut locator_buf)?;

        let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;

        let mut eocd64_buf = vec![0u8; Zip64EOCD::MIN_SIZE];
        self.reader
            .read_exact_at(locator.eocd64_offset, &mut eocd64_buf)?;

        Zip64EOCD::from_bytes(&eocd64_buf)
    }

    /// Read every Central Directory record, in physical order.
    pub fn list_files(&self) -> Result<Vec<CentralRecord>> {
        let (eocd, eocd_offset) = self.find_eocd()?;

        let (cd_offset, cd_size, total_entries) = if eocd.is_zip64() {
            let eocd64 = self.read_zip64_eocd(eocd_offset)?;
            (eocd64.cd_offset, eocd64.cd_size, eocd64.total_entries)
        } else {
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
            )
        };

        // Bound the allocation by what the file can actually hold
        if cd_offset.checked_add(cd_size).is_none_or(|end| end > self.size) {
            return Err(Error::invalid_archive("central directory out of bounds"));
        }
        if total_entries > cd_size / CDFH_MIN_SIZE as u64 {
            return Err(Error::invalid_archive("entry count exceeds central directory"));
        }

        let mut cd_data = vec![0u8; cd_size as usize];
        self.reader.read_exact_at(cd_offset, &mut cd_data)?;

        let mut entries = Vec::with_capacity(total_entries as usize);
        let mut cursor = Cursor::new(cd_data.as_slice());

        for _ in 0..total_entries {
            let record = parse_cdfh(&mut cursor)?;
            let data_end = record
                .lfh_offset
                .checked_add(LFH_SIZE as u64)
                .and_then(|end| end.checked_add(record.compressed_size));
            if data_end.is_none_or(|end| end > self.size) {
                return Err(Error::invalid_archive(format!(
                    "{}: entry data out of bounds",
                    record.file_name
                )));
            }
            entries.push(record);
        }

        Ok(entries)
    }
}

/// Offset of the first byte of an entry's (compressed) data.
///
/// The local header's name and extra field lengths may differ from the
/// central directory copy, so the local header is read each time.
pub fn data_offset<R: ReadAt + ?Sized>(reader: &R, entry: &CentralRecord) -> Result<u64> {
    let mut lfh_buf = vec![0u8; LFH_SIZE];
    reader.read_exact_at(entry.lfh_offset, &mut lfh_buf)?;

    if &lfh_buf[0..4] != LFH_SIGNATURE {
        return Err(Error::invalid_archive(format!(
            "bad local file header for {}",
            entry.file_name
        )));
    }

    let mut cursor = Cursor::new(&lfh_buf[26..]);
    let file_name_length = cursor.read_u16::<LittleEndian>()? as u64;
    let extra_field_length = cursor.read_u16::<LittleEndian>()? as u64;

    Ok(entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length)
}

/// Parse one Central Directory File Header.
///
/// A record whose fields run past the end of the central directory is an
/// invalid archive, not an I/O failure.
fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<CentralRecord> {
    let record = read_cdfh(cursor).map_err(|err| match err {
        Error::Io(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            Error::invalid_archive("truncated central directory")
        }
        other => other,
    })?;
    if cursor.position() > cursor.get_ref().len() as u64 {
        return Err(Error::invalid_archive("truncated central directory"));
    }
    Ok(record)
}

fn read_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<CentralRecord> {
    let mut sig = [0u8; 4];
    cursor.read_exact(&mut sig)?;
    if sig != CDFH_SIGNATURE {
        return Err(Error::invalid_archive("bad central directory header"));
    }

    let _version_made_by = cursor.read_u16::<LittleEndian>()?;
    let _version_needed = cursor.read_u16::<LittleEndian>()?;
    let _flags = cursor.read_u16::<LittleEndian>()?;
    let compression_method = cursor.read_u16::<LittleEndian>()?;
    let last_mod_time = cursor.read_u16::<LittleEndian>()?;
    let last_mod_date = cursor.read_u16::<LittleEndian>()?;
    let crc32 = cursor.read_u32::<LittleEndian>()?;
    let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let file_name_length = cursor.read_u16::<LittleEndian>()?;
    let extra_field_length = cursor.read_u16::<LittleEndian>()?;
    let file_comment_length = cursor.read_u16::<LittleEndian>()?;
    let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
    let _external_attrs = cursor.read_u32::<LittleEndian>()?;
    let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

    let mut file_name_bytes = vec![0u8; file_name_length as usize];
    cursor.read_exact(&mut file_name_bytes)?;
    let file_name = String::from_utf8_lossy(&file_name_bytes).into_owned();

    // ZIP64 extended information lives in extra field 0x0001; each value is
    // present only when the matching header field is saturated.
    let extra_field_end = cursor.position() + extra_field_length as u64;

    while cursor.position() + 4 <= extra_field_end {
        let header_id = cursor.read_u16::<LittleEndian>()?;
        let field_size = cursor.read_u16::<LittleEndian>()?;
        let field_end = cursor.position() + field_size as u64;

        if header_id == 0x0001 {
            if uncompressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                uncompressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if compressed_size == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                compressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if lfh_offset == 0xFFFFFFFF && cursor.position() + 8 <= field_end {
                lfh_offset = cursor.read_u64::<LittleEndian>()?;
            }
        }
        cursor.set_position(field_end);
    }

    cursor.set_position(extra_field_end + file_comment_length as u64);

    Ok(CentralRecord {
        file_name,
        compression_method: CompressionMethod::from_u16(compression_method),
        compressed_size,
        uncompressed_size,
        crc32,
        lfh_offset,
        last_mod_time,
        last_mod_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemoryReader;

    #[test]
    fn empty_archive_has_no_entries() {
        let mut data = EndOfCentralDirectory::SIGNATURE.to_vec();
        data.extend_from_slice(&[0u8; 18]);
        let parser = ZipParser::new(Arc::new(MemoryReader::new(data)));
        assert!(parser.list_files().unwrap().is_empty());
    }

    #[test]
    fn finds_eocd_behind_comment() {
        let mut data = EndOfCentralDirectory::SIGNATURE.to_vec();
        data.extend_from_slice(&[0u8; 16]);
        data.extend_from_slice(&5u16.to_le_bytes());
        data.extend_from_slice(b"hello");
        let parser = ZipParser::new(Arc::new(MemoryReader::new(data)));
        let (eocd, offset) = parser.find_eocd().unwrap();
        assert_eq!(offset, 0);
        assert_eq!(eocd.comment_len, 5);
    }

    #[test]
    fn rejects_garbage() {
        let parser = ZipParser::new(Arc::new(MemoryReader::new(vec![0x42u8; 100])));
        assert!(matches!(
            parser.list_files(),
            Err(Error::InvalidArchive(_))
        ));
    }

    fn central_header(name: &[u8], claimed_name_len: u16, extra: &[u8]) -> Vec<u8> {
        let mut data = CDFH_SIGNATURE.to_vec();
        data.extend_from_slice(&[0u8; 24]);
        data.extend_from_slice(&claimed_name_len.to_le_bytes());
        data.extend_from_slice(&(extra.len() as u16).to_le_bytes());
        data.extend_from_slice(&[0u8; 12]);
        data.extend_from_slice(name);
        data.extend_from_slice(extra);
        data
    }

    #[test]
    fn parses_well_formed_central_header() {
        let data = central_header(b"a.txt", 5, &[]);
        let record = parse_cdfh(&mut Cursor::new(data.as_slice())).unwrap();
        assert_eq!(record.file_name, "a.txt");
    }

    #[test]
    fn overlong_name_is_invalid_archive() {
        let data = central_header(b"a.txt", 100, &[]);
        assert!(matches!(
            parse_cdfh(&mut Cursor::new(data.as_slice())),
            Err(Error::InvalidArchive(_))
        ));
    }

    #[test]
    fn truncated_zip64_extra_is_invalid_archive() {
        // Extra field header claims 0x0001 but the record ends mid-field.
        let mut data = central_header(b"a.txt", 5, &[0x01, 0x00]);
        data[30..32].copy_from_slice(&12u16.to_le_bytes());
        assert!(matches!(
            parse_cdfh(&mut Cursor::new(data.as_slice())),
            Err(Error::InvalidArchive(_))
        ));
    }

    #[test]
    fn rejects_tiny_file() {
        let parser = ZipParser::new(Arc::new(MemoryReader::new(b"PK".to_vec())));
        assert!(matches!(parser.find_eocd(), Err(Error::InvalidArchive(_))));
    }
}
