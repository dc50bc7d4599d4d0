//! SHA-256 over a header followed by its checksum region.

use std::io::{Read, Seek};

use log::debug;
use sha2::{Digest as _, Sha256};

use crate::header::{BlockHeader, CHECKSUM_SIZE, HEADER_OFFSET, HEADER_SIZE};
use crate::image::ImageFile;

pub type Digest = [u8; CHECKSUM_SIZE];

/// `SHA-256(header || data)`.
pub fn digest_of(header: &[u8; HEADER_SIZE], data: &[u8]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(header);
    hasher.update(data);
    hasher.finalize().into()
}

/// Absolute file offset where `header`'s checksum region begins, for a
/// record stored at `record_offset`.
pub fn region_offset(record_offset: u64, header: &BlockHeader) -> u64 {
    record_offset + HEADER_OFFSET as u64 + header.chk_start as u64
}

/// Read the checksum region of the record at `record_offset` fresh from the
/// image and digest it together with `header`.
pub fn checksum_header<F: Read + Seek>(
    image: &mut ImageFile<F>,
    record_offset: u64,
    header: &BlockHeader,
) -> std::io::Result<Digest> {
    let offset = region_offset(record_offset, header);
    let data = image.read_region(offset, header.chk_size)?;
    debug!(
        "hashing header at {} + {} bytes at {}",
        record_offset + HEADER_OFFSET as u64, header.chk_size, offset
    );
    Ok(digest_of(&header.to_bytes(), &data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn zero_block_known_answer() {
        // SHA-256 of 64 zero bytes.
        let d = digest_of(&[0u8; HEADER_SIZE], &[]);
        assert_eq!(
            hex::encode(d),
            "f5a5fd42d16a20302798ef6ed309979b43003d2320d9f0e8ea9831a92759fb4b"
        );
    }

    #[test]
    fn digest_is_over_concatenation() {
        let header = [0x42u8; HEADER_SIZE];
        let data = b"abc".repeat(100);
        let mut whole = header.to_vec();
        whole.extend_from_slice(&data);
        let expected: Digest = Sha256::digest(&whole).into();
        assert_eq!(digest_of(&header, &data), expected);
        assert_eq!(digest_of(&header, &data), digest_of(&header, &data));
    }

    #[test]
    fn region_is_relative_to_record() {
        let header = BlockHeader { chk_start: 96, chk_size: 8, ..BlockHeader::new() };
        assert_eq!(region_offset(512, &header), 624);
        assert_eq!(region_offset(0, &header), 112);
    }

    #[test]
    fn checksum_reads_the_declared_region() {
        let data: Vec<u8> = (0..2048u32).map(|i| (i % 256) as u8).collect();
        let mut image = ImageFile::new(Cursor::new(data.clone())).unwrap();
        let header = BlockHeader { chk_start: 96, chk_size: 100, ..BlockHeader::new() };

        let got = checksum_header(&mut image, 512, &header).unwrap();
        assert_eq!(got, digest_of(&header.to_bytes(), &data[624..724]));
    }

    #[test]
    fn checksum_fails_on_truncated_region() {
        let mut image = ImageFile::new(Cursor::new(vec![0u8; 256])).unwrap();
        let header = BlockHeader { chk_start: 16, chk_size: 4096, ..BlockHeader::new() };
        let err = checksum_header(&mut image, 0, &header).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }
}
