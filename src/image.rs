//! Positioned record and region I/O on one image handle. Staged records
//! are visible to later reads and only reach the file on `commit`.

use std::io::{self, Read, Seek, SeekFrom, Write};

use log::debug;

use crate::header::{HeaderRecord, HEADER_OFFSET, HEADER_READ_SIZE};

/// A record waiting for [`ImageFile::commit`].
#[derive(Debug, Clone)]
struct StagedWrite {
    offset: u64,
    bytes: [u8; HEADER_READ_SIZE],
}

impl StagedWrite {
    fn end(&self) -> u64 {
        self.offset + HEADER_READ_SIZE as u64
    }
}

pub struct ImageFile<F> {
    inner: F,
    len: u64,
    staged: Vec<StagedWrite>,
}

impl<F: Seek> ImageFile<F> {
    pub fn new(mut inner: F) -> io::Result<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        Ok(Self { inner, len, staged: Vec::new() })
    }

    pub fn into_inner(self) -> F {
        self.inner
    }
}

impl<F: Read + Seek> ImageFile<F> {
    /// Read the 112-byte record at `offset`.  A short file is an error
    /// before any header field is looked at.
    pub fn read_record(&mut self, offset: u64) -> io::Result<HeaderRecord> {
        let mut b = [0u8; HEADER_READ_SIZE];
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.read_exact(&mut b)?;
        debug!("read record at {}", offset);
        self.overlay(offset, &mut b);
        Ok(HeaderRecord::from_bytes(&b))
    }

    /// Read exactly `len` bytes at `offset`, with staged records overlaid.
    /// Images are often cut at `total_size` rather than `16 + total_size`,
    /// so up to `HEADER_OFFSET` bytes past the end of file read as zero.
    pub fn read_region(&mut self, offset: u64, len: u32) -> io::Result<Vec<u8>> {
        let len = len as u64;
        let end = offset.checked_add(len).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "region end overflows u64")
        })?;
        if end > self.len + HEADER_OFFSET as u64 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("region {}..{} runs past end of file ({} bytes)", offset, end, self.len),
            ));
        }

        let mut buf = vec![0u8; len as usize];
        let physical = end.min(self.len).saturating_sub(offset) as usize;
        if physical > 0 {
            self.inner.seek(SeekFrom::Start(offset))?;
            self.inner.read_exact(&mut buf[..physical])?;
        }
        debug!("read {} bytes at {} ({} zero-filled)", len, offset, len as usize - physical);
        self.overlay(offset, &mut buf);
        Ok(buf)
    }

    fn overlay(&self, offset: u64, buf: &mut [u8]) {
        let end = offset + buf.len() as u64;
        for w in &self.staged {
            let lo = w.offset.max(offset);
            let hi = w.end().min(end);
            if lo >= hi {
                continue;
            }
            let dst = (lo - offset) as usize..(hi - offset) as usize;
            let src = (lo - w.offset) as usize..(hi - w.offset) as usize;
            buf[dst].copy_from_slice(&w.bytes[src]);
        }
    }
}

impl<F: Write + Seek> ImageFile<F> {
    /// Seek to `offset`, write the whole record, flush.
    pub fn write_header(&mut self, offset: u64, bytes: &[u8; HEADER_READ_SIZE]) -> io::Result<()> {
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.write_all(bytes)?;
        self.inner.flush()?;
        debug!("wrote record at {}", offset);
        Ok(())
    }

    /// Queue a record for [`commit`](Self::commit).  Reads issued from now
    /// on see it.
    pub fn stage(&mut self, offset: u64, record: &HeaderRecord) {
        debug!("staged record at {}", offset);
        self.staged.push(StagedWrite { offset, bytes: record.to_bytes() });
    }

    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }

    /// Write every staged record in staging order.
    pub fn commit(&mut self) -> io::Result<()> {
        for w in std::mem::take(&mut self.staged) {
            self.write_header(w.offset, &w.bytes)?;
            self.len = self.len.max(w.end());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::BlockHeader;
    use std::io::Cursor;

    fn image(len: usize) -> ImageFile<Cursor<Vec<u8>>> {
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        ImageFile::new(Cursor::new(data)).unwrap()
    }

    fn record(fill: u8) -> HeaderRecord {
        HeaderRecord {
            preamble: [fill; HEADER_OFFSET],
            header: BlockHeader::new(),
            digest: [fill; 32],
        }
    }

    #[test]
    fn short_file_fails_record_read() {
        let mut img = image(HEADER_READ_SIZE - 1);
        let err = img.read_record(0).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn region_tail_is_zero_filled_up_to_preamble() {
        let mut img = image(100);
        let buf = img.read_region(90, 26).unwrap();
        let expected: Vec<u8> = (90..100).collect();
        assert_eq!(&buf[..10], &expected[..]);
        assert!(buf[10..].iter().all(|&b| b == 0));

        let err = img.read_region(90, 27).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn staged_records_are_visible_before_commit() {
        let mut img = image(1024);
        img.stage(512, &record(0xAB));
        let buf = img.read_region(500, 28).unwrap();
        let expected: Vec<u8> = (500..512).map(|i| (i % 251) as u8).collect();
        assert_eq!(&buf[..12], &expected[..]);
        assert!(buf[12..].iter().all(|&b| b == 0xAB));

        // Nothing on disk yet.
        let inner = img.into_inner().into_inner();
        assert_eq!(inner[512], (512 % 251) as u8);
    }

    #[test]
    fn commit_writes_in_order() {
        let mut img = image(1024);
        img.stage(0, &record(0x11));
        img.stage(56, &record(0x22));
        assert_eq!(img.staged_count(), 2);
        img.commit().unwrap();
        assert_eq!(img.staged_count(), 0);

        let inner = img.into_inner().into_inner();
        assert!(inner[..16].iter().all(|&b| b == 0x11));
        assert!(inner[56..72].iter().all(|&b| b == 0x22));
        assert_eq!(&inner[72..76], b"@AML");
        assert!(inner[136..168].iter().all(|&b| b == 0x22));
    }

    #[test]
    fn write_header_roundtrip() {
        let mut img = image(1024);
        let rec = record(0x7F);
        img.write_header(512, &rec.to_bytes()).unwrap();
        assert_eq!(img.read_record(512).unwrap(), rec);
    }
}
