use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Byte source for a data file or split volume set.
///
/// Sector reads name their own byte position, so one data file can serve
/// several tracks from several threads at once.
pub trait Image: Send + Sync {
    /// Copies bytes starting at `offset` into `buf`, returning how many were
    /// copied. Zero means `offset` is at or past the end.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Fills `buf` from `offset`, failing with
    /// [`io::ErrorKind::UnexpectedEof`] when the data file is too short.
    fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        let mut filled = 0;

        while filled < buf.len() {
            match self.read_at(offset + filled as u64, &mut buf[filled..])? {
                0 => {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("data file ends before byte {}", offset + buf.len() as u64),
                    ));
                }
                n => filled += n,
            }
        }

        Ok(())
    }

    /// Size in bytes.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Image backed by a file on disk.
///
/// The handle sits behind a mutex; seek and read happen under one lock.
pub struct FileImage {
    file: Mutex<File>,
    len: u64,
}

impl FileImage {
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();

        Ok(Self {
            file: Mutex::new(file),
            len,
        })
    }
}

impl std::fmt::Debug for FileImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileImage")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}

impl Image for FileImage {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        if offset >= self.len || buf.is_empty() {
            return Ok(0);
        }

        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("file lock poisoned"))?;

        file.seek(SeekFrom::Start(offset))?;
        file.read(buf)
    }

    fn len(&self) -> u64 {
        self.len
    }
}

/// Image backed by an owned buffer.
#[derive(Debug, Clone)]
pub struct MemoryImage {
    data: Vec<u8>,
}

impl MemoryImage {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self { data: data.into() }
    }
}

impl Image for MemoryImage {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let tail = usize::try_from(offset)
            .ok()
            .and_then(|start| self.data.get(start..))
            .unwrap_or_default();
        let n = tail.len().min(buf.len());

        buf[..n].copy_from_slice(&tail[..n]);
        Ok(n)
    }

    fn len(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Several images joined end to end into one logical stream.
///
/// Used for data files that the capture tool split into numbered volumes.
pub struct SplitImage {
    segments: Vec<Arc<dyn Image>>,
    /// Logical offset where each segment begins.
    starts: Vec<u64>,
    len: u64,
}

impl SplitImage {
    pub fn new(segments: Vec<Arc<dyn Image>>) -> Self {
        let mut starts = Vec::with_capacity(segments.len());
        let mut len = 0;

        for segment in &segments {
            starts.push(len);
            len += segment.len();
        }

        Self {
            segments,
            starts,
            len,
        }
    }

    /// Returns the number of joined segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

impl std::fmt::Debug for SplitImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SplitImage")
            .field("segments", &self.segments.len())
            .field("len", &self.len)
            .finish()
    }
}

impl Image for SplitImage {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        if offset >= self.len || buf.is_empty() {
            return Ok(0);
        }

        // Last segment starting at or before the offset.
        let mut index = self.starts.partition_point(|&s| s <= offset) - 1;
        let mut pos = offset;
        let mut copied = 0;

        while copied < buf.len() && index < self.segments.len() {
            let segment = &self.segments[index];
            let local = pos - self.starts[index];

            if local >= segment.len() {
                index += 1;
                continue;
            }

            let n = segment.read_at(local, &mut buf[copied..])?;

            if n == 0 {
                break;
            }

            copied += n;
            pos += n as u64;
        }

        Ok(copied)
    }

    fn len(&self) -> u64 {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(fill: u8, len: usize) -> Arc<dyn Image> {
        Arc::new(MemoryImage::new(vec![fill; len]))
    }

    #[test]
    fn split_reads_cross_segment_boundaries() {
        let image = SplitImage::new(vec![segment(1, 4), segment(2, 4), segment(3, 4)]);
        let mut buf = [0u8; 6];

        image.read_exact_at(3, &mut buf).unwrap();

        assert_eq!(image.len(), 12);
        assert_eq!(buf, [1, 2, 2, 2, 2, 3]);
    }

    #[test]
    fn split_skips_empty_segments() {
        let image = SplitImage::new(vec![segment(1, 2), segment(9, 0), segment(3, 2)]);
        let mut buf = [0u8; 4];

        image.read_exact_at(0, &mut buf).unwrap();

        assert_eq!(buf, [1, 1, 3, 3]);
    }

    #[test]
    fn memory_reads_stop_at_end() {
        let image = MemoryImage::new([1, 2, 3]);
        let mut buf = [0u8; 4];

        assert_eq!(image.read_at(1, &mut buf).unwrap(), 2);
        assert_eq!(buf[..2], [2, 3]);
        assert_eq!(image.read_at(u64::MAX, &mut buf).unwrap(), 0);
    }

    #[test]
    fn read_past_end_is_eof() {
        let image = SplitImage::new(vec![segment(1, 4)]);
        let mut buf = [0u8; 8];
        let err = image.read_exact_at(0, &mut buf).unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(image.read_at(4, &mut buf).unwrap(), 0);
    }
}
