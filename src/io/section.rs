use super::ReadAt;
use std::io::{Read, Result};
use std::sync::Arc;

/// Sequential `Read` over a fixed window of a [`ReadAt`] source.
///
/// Each entry stream owns one of these as the bottom of its decompression
/// pipe; several sections over the same source never share a cursor.
pub struct SectionReader<R: ReadAt> {
    source: Arc<R>,
    pos: u64,
    end: u64,
}

impl<R: ReadAt> SectionReader<R> {
    pub fn new(source: Arc<R>, offset: u64, len: u64) -> Self {
        Self {
            source,
            pos: offset,
            end: offset.saturating_add(len),
        }
    }

    /// Bytes left in the window
    pub fn remaining(&self) -> u64 {
        self.end - self.pos
    }
}

impl<R: ReadAt> Read for SectionReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let want = (buf.len() as u64).min(self.remaining()) as usize;
        if want == 0 {
            return Ok(0);
        }
        let n = self.source.read_at(self.pos, &mut buf[..want])?;
        self.pos += n as u64;
        Ok(n)
    }
}
