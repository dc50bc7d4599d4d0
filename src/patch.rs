//! Rewrite one boot image: validate, derive and checksum both records, then
//! write them only once everything has succeeded.
//!
//! ```no_run
//! use amlsum::patch::{patch_file, PatchOptions};
//!
//! let report = patch_file("u-boot.bin", &PatchOptions::default())?;
//! println!("{}", report);
//! # Ok::<(), amlsum::Error>(())
//! ```

use std::fs::OpenOptions;
use std::io::{Read, Seek, Write};
use std::path::Path;

use log::{info, warn};

use crate::checksum::checksum_header;
use crate::error::Result;
use crate::header::SD_OFFSET;
use crate::image::ImageFile;
use crate::report::{HeaderSummary, PatchReport};
use crate::transform::{derive_primary, derive_sd};

/// File offset of the primary record.
pub const PRIMARY_OFFSET: u64 = 0;
/// File offset of the SD record.
pub const SD_RECORD_OFFSET: u64 = SD_OFFSET as u64;

#[derive(Debug, Clone, Default)]
pub struct PatchOptions {
    /// Compute and report everything, write nothing.
    pub dry_run: bool,
}

/// Open `path` (read-write unless dry-running) and [`patch`] it.
pub fn patch_file<P: AsRef<Path>>(path: P, opts: &PatchOptions) -> Result<PatchReport> {
    let file = OpenOptions::new()
        .read(true)
        .write(!opts.dry_run)
        .open(path.as_ref())?;
    info!("patching {}", path.as_ref().display());
    patch(file, opts)
}

pub fn patch<F: Read + Write + Seek>(file: F, opts: &PatchOptions) -> Result<PatchReport> {
    let mut image = ImageFile::new(file)?;

    let original = image.read_record(PRIMARY_OFFSET)?;
    original.header.validate()?;
    let original_sum = checksum_header(&mut image, PRIMARY_OFFSET, &original.header)?;
    let stored_matches = original_sum == original.digest;
    if !stored_matches {
        warn!("stored digest does not match the header as read");
    }
    info!("original header validated ({} bytes)", original.header.total_size);

    let sd_header = derive_sd(&original.header)?;
    let sd_sum = checksum_header(&mut image, SD_RECORD_OFFSET, &sd_header)?;
    let sd = original.with(sd_header, sd_sum);
    image.stage(SD_RECORD_OFFSET, &sd);

    let primary_header = derive_primary(&original.header)?;
    let primary_sum = checksum_header(&mut image, PRIMARY_OFFSET, &primary_header)?;
    let primary = original.with(primary_header, primary_sum);
    image.stage(PRIMARY_OFFSET, &primary);

    if opts.dry_run {
        info!("dry run: {} record(s) not written", image.staged_count());
    } else {
        image.commit()?;
        info!("wrote SD record at {} and primary record at {}", SD_RECORD_OFFSET, PRIMARY_OFFSET);
    }

    Ok(PatchReport {
        original: HeaderSummary::new(&original.header, &original_sum),
        stored_sum: hex::encode(original.digest),
        stored_matches,
        sd: HeaderSummary::new(&sd.header, &sd.digest),
        primary: HeaderSummary::new(&primary.header, &primary.digest),
        committed: !opts.dry_run,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::digest_of;
    use crate::error::Error;
    use crate::header::{BlockHeader, FormatError, HeaderRecord};
    use std::io::Cursor;

    fn image_bytes(total_size: u32, file_len: usize) -> Vec<u8> {
        let mut data: Vec<u8> = (0..file_len).map(|i| (i * 7 % 256) as u8).collect();
        let header = BlockHeader {
            total_size,
            chk_start: 16,
            chk_size: total_size - 32,
            data_offset: 64,
            data_len: total_size - 64,
            ..BlockHeader::new()
        };
        data[16..80].copy_from_slice(&header.to_bytes());
        data
    }

    #[test]
    fn staged_sd_record_is_covered_by_primary_sum() {
        let mut cursor = Cursor::new(image_bytes(8192, 8192));
        let report = patch(&mut cursor, &PatchOptions::default()).unwrap();
        let out = cursor.into_inner();

        let primary = HeaderRecord::from_bytes(out[..112].try_into().unwrap());
        let mut region = out[512..].to_vec();
        region.resize(7696, 0);
        assert_eq!(primary.digest, digest_of(&primary.header.to_bytes(), &region));
        assert_eq!(report.primary.sum, hex::encode(primary.digest));
        assert!(report.committed);
    }

    #[test]
    fn dry_run_leaves_image_untouched() {
        let before = image_bytes(8192, 8208);
        let mut cursor = Cursor::new(before.clone());
        let opts = PatchOptions { dry_run: true };
        let report = patch(&mut cursor, &opts).unwrap();
        assert_eq!(cursor.into_inner(), before);
        assert!(!report.committed);
        assert_eq!(report.sd.total_size, 7680);
    }

    #[test]
    fn late_failure_writes_nothing() {
        // Valid header whose image is too small for the primary rewrite.
        let before = image_bytes(1000, 1024);
        let mut cursor = Cursor::new(before.clone());
        let err = patch(&mut cursor, &PatchOptions::default()).unwrap_err();
        assert!(matches!(err, Error::Format(FormatError::Underflow { field: "data_len", .. })));
        assert_eq!(cursor.into_inner(), before);
    }
}
