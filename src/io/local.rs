use super::ReadAt;
use std::io::Result;
use std::path::Path;
use std::time::SystemTime;

/// Local file reader with random access support
pub struct LocalFileReader {
    file: std::fs::File,
    size: u64,
    modified: SystemTime,
}

impl LocalFileReader {
    pub fn new(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let metadata = file.metadata()?;
        Ok(Self {
            size: metadata.len(),
            modified: metadata.modified()?,
            file,
        })
    }

    /// Modification time of the file when it was opened
    pub fn modified(&self) -> SystemTime {
        self.modified
    }
}

impl ReadAt for LocalFileReader {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            self.file.read_at(buf, offset)
        }

        #[cfg(windows)]
        {
            // seek_read moves the file cursor, but every caller goes through
            // this method with an explicit offset, so the cursor is never relied on
            use std::os::windows::fs::FileExt;
            self.file.seek_read(buf, offset)
        }

        #[cfg(not(any(unix, windows)))]
        {
            compile_error!("LocalFileReader needs positional reads (unix or windows)");
        }
    }

    fn size(&self) -> u64 {
        self.size
    }
}
