//! Amlogic `@AML` block header and the 112-byte record (16-byte preamble,
//! header, SHA-256 digest) that holds it on disk.

use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

/// `"@AML"` read as a little-endian u32.
pub const BLK_MAGIC: u32 = 0x4C4D_4140;
pub const BLK_VER_MAJOR: u8 = 1;
pub const BLK_VER_MINOR: u8 = 0;

/// Preamble preceding every header instance.
pub const HEADER_OFFSET: usize = 16;
pub const HEADER_SIZE: usize = 64;
pub const CHECKSUM_SIZE: usize = 32;
/// Size of one on-disk record: preamble + header + digest.
pub const HEADER_READ_SIZE: usize = HEADER_OFFSET + HEADER_SIZE + CHECKSUM_SIZE;

/// File offset of the SD-boot record.
pub const SD_OFFSET: u32 = 512;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("Invalid magic number: {0:#010x}")]
    BadMagic(u32),
    #[error("Unsupported header version: {major}.{minor}")]
    BadVersion { major: u8, minor: u8 },
    #[error("Unexpected header size: {0} (expected {HEADER_SIZE})")]
    BadHeaderSize(u8),
    #[error("Signed images are not supported (sig_type={0})")]
    Signed(u32),
    #[error("Images with a public key are not supported (puk_type={0})")]
    Keyed(u32),
    #[error("Checksum region {start}+{size} exceeds total size {total}")]
    RegionOutOfBounds { start: u32, size: u32, total: u32 },
    #[error("Deriving {field} underflows: {value} - {sub}")]
    Underflow { field: &'static str, value: u32, sub: u32 },
}

// ── BlockHeader ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
    pub magic: u32,
    pub total_size: u32,
    pub header_size: u8,
    pub root_key_index: u8,
    pub version_major: u8,
    pub version_minor: u8,
    pub padding: [u8; 4],
    pub sig_type: u32,
    pub sig_offset: u32,
    pub sig_len: u32,
    pub chk_start: u32,
    pub puk_type: u32,
    pub puk_offset: u32,
    pub puk_data_len: u32,
    pub chk_size: u32,
    pub data_type: u32,
    pub data_offset: u32,
    pub data_len: u32,
    pub reserved: [u8; 4],
}

impl BlockHeader {
    /// An unsigned, keyless v1.0 header with every size field zeroed.
    pub fn new() -> Self {
        Self {
            magic: BLK_MAGIC,
            total_size: 0,
            header_size: HEADER_SIZE as u8,
            root_key_index: 0,
            version_major: BLK_VER_MAJOR,
            version_minor: BLK_VER_MINOR,
            padding: [0; 4],
            sig_type: 0,
            sig_offset: 0,
            sig_len: 0,
            chk_start: 0,
            puk_type: 0,
            puk_offset: 0,
            puk_data_len: 0,
            chk_size: 0,
            data_type: 0,
            data_offset: 0,
            data_len: 0,
            reserved: [0; 4],
        }
    }

    pub fn from_bytes(b: &[u8; HEADER_SIZE]) -> Self {
        let mut padding = [0u8; 4];
        let mut reserved = [0u8; 4];
        padding.copy_from_slice(&b[12..16]);
        reserved.copy_from_slice(&b[60..64]);
        Self {
            magic: LittleEndian::read_u32(&b[0..4]),
            total_size: LittleEndian::read_u32(&b[4..8]),
            header_size: b[8],
            root_key_index: b[9],
            version_major: b[10],
            version_minor: b[11],
            padding,
            sig_type: LittleEndian::read_u32(&b[16..20]),
            sig_offset: LittleEndian::read_u32(&b[20..24]),
            sig_len: LittleEndian::read_u32(&b[24..28]),
            chk_start: LittleEndian::read_u32(&b[28..32]),
            puk_type: LittleEndian::read_u32(&b[32..36]),
            puk_offset: LittleEndian::read_u32(&b[36..40]),
            puk_data_len: LittleEndian::read_u32(&b[40..44]),
            chk_size: LittleEndian::read_u32(&b[44..48]),
            data_type: LittleEndian::read_u32(&b[48..52]),
            data_offset: LittleEndian::read_u32(&b[52..56]),
            data_len: LittleEndian::read_u32(&b[56..60]),
            reserved,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut b = [0u8; HEADER_SIZE];
        LittleEndian::write_u32(&mut b[0..4], self.magic);
        LittleEndian::write_u32(&mut b[4..8], self.total_size);
        b[8] = self.header_size;
        b[9] = self.root_key_index;
        b[10] = self.version_major;
        b[11] = self.version_minor;
        b[12..16].copy_from_slice(&self.padding);
        LittleEndian::write_u32(&mut b[16..20], self.sig_type);
        LittleEndian::write_u32(&mut b[20..24], self.sig_offset);
        LittleEndian::write_u32(&mut b[24..28], self.sig_len);
        LittleEndian::write_u32(&mut b[28..32], self.chk_start);
        LittleEndian::write_u32(&mut b[32..36], self.puk_type);
        LittleEndian::write_u32(&mut b[36..40], self.puk_offset);
        LittleEndian::write_u32(&mut b[40..44], self.puk_data_len);
        LittleEndian::write_u32(&mut b[44..48], self.chk_size);
        LittleEndian::write_u32(&mut b[48..52], self.data_type);
        LittleEndian::write_u32(&mut b[52..56], self.data_offset);
        LittleEndian::write_u32(&mut b[56..60], self.data_len);
        b[60..64].copy_from_slice(&self.reserved);
        b
    }

    /// Reject anything this tool cannot re-checksum: foreign magic or
    /// version, a header size other than 64, signed or keyed images, and a
    /// checksum region reaching past `total_size`.
    pub fn validate(&self) -> Result<(), FormatError> {
        if self.magic != BLK_MAGIC {
            return Err(FormatError::BadMagic(self.magic));
        }
        if self.version_major != BLK_VER_MAJOR || self.version_minor != BLK_VER_MINOR {
            return Err(FormatError::BadVersion {
                major: self.version_major,
                minor: self.version_minor,
            });
        }
        if self.header_size as usize != HEADER_SIZE {
            return Err(FormatError::BadHeaderSize(self.header_size));
        }
        if self.sig_type != 0 {
            return Err(FormatError::Signed(self.sig_type));
        }
        if self.puk_type != 0 {
            return Err(FormatError::Keyed(self.puk_type));
        }
        self.check_region()
    }

    /// `chk_start + chk_size <= total_size`, without wrapping.
    pub fn check_region(&self) -> Result<(), FormatError> {
        match self.chk_start.checked_add(self.chk_size) {
            Some(end) if end <= self.total_size => Ok(()),
            _ => Err(FormatError::RegionOutOfBounds {
                start: self.chk_start,
                size: self.chk_size,
                total: self.total_size,
            }),
        }
    }
}

// ── HeaderRecord ─────────────────────────────────────────────────────────────

/// One 112-byte record as it sits on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRecord {
    pub preamble: [u8; HEADER_OFFSET],
    pub header: BlockHeader,
    pub digest: [u8; CHECKSUM_SIZE],
}

impl HeaderRecord {
    pub fn from_bytes(b: &[u8; HEADER_READ_SIZE]) -> Self {
        let mut preamble = [0u8; HEADER_OFFSET];
        let mut header = [0u8; HEADER_SIZE];
        let mut digest = [0u8; CHECKSUM_SIZE];
        preamble.copy_from_slice(&b[..HEADER_OFFSET]);
        header.copy_from_slice(&b[HEADER_OFFSET..HEADER_OFFSET + HEADER_SIZE]);
        digest.copy_from_slice(&b[HEADER_OFFSET + HEADER_SIZE..]);
        Self {
            preamble,
            header: BlockHeader::from_bytes(&header),
            digest,
        }
    }

    pub fn to_bytes(&self) -> [u8; HEADER_READ_SIZE] {
        let mut b = [0u8; HEADER_READ_SIZE];
        b[..HEADER_OFFSET].copy_from_slice(&self.preamble);
        b[HEADER_OFFSET..HEADER_OFFSET + HEADER_SIZE].copy_from_slice(&self.header.to_bytes());
        b[HEADER_OFFSET + HEADER_SIZE..].copy_from_slice(&self.digest);
        b
    }

    /// Same preamble, new header and digest.
    pub fn with(&self, header: BlockHeader, digest: [u8; CHECKSUM_SIZE]) -> Self {
        Self { preamble: self.preamble, header, digest }
    }
}
