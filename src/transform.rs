//! Pure derivation of the SD-boot header (re-based by 512, checksum after
//! header + digest) and the rewritten primary header (checksum from 496).

use crate::header::{BlockHeader, FormatError, CHECKSUM_SIZE, HEADER_OFFSET, HEADER_SIZE, SD_OFFSET};

/// `chk_start` of the SD header: skip header and digest.
pub const SD_CHK_START: u32 = (HEADER_SIZE + CHECKSUM_SIZE) as u32;
/// `chk_start` of the rewritten primary header.
pub const PRIMARY_CHK_START: u32 = SD_OFFSET - HEADER_OFFSET as u32;
/// `data_offset` of the rewritten primary header.
pub const PRIMARY_DATA_OFFSET: u32 = 1024 - HEADER_OFFSET as u32;

fn sub(field: &'static str, value: u32, sub: u32) -> Result<u32, FormatError> {
    value
        .checked_sub(sub)
        .ok_or(FormatError::Underflow { field, value, sub })
}

/// The header BL1 sees when booting from SD.
pub fn derive_sd(src: &BlockHeader) -> Result<BlockHeader, FormatError> {
    let total_size = sub("total_size", src.total_size, SD_OFFSET)?;
    let chk_size = sub("chk_size", total_size, SD_CHK_START)?;
    let data_len = sub("data_len", src.data_len, SD_OFFSET)?;

    Ok(BlockHeader {
        total_size,
        data_len,
        chk_start: SD_CHK_START,
        chk_size,
        ..src.clone()
    })
}

/// The header written back at offset 0. `data_offset` points at the stub
/// at 1024 that copies BL2 from 4608 to 4096; `total_size` is kept.
pub fn derive_primary(src: &BlockHeader) -> Result<BlockHeader, FormatError> {
    let chk_size = sub("chk_size", src.total_size, PRIMARY_CHK_START)?;
    let data_len = sub("data_len", src.total_size, PRIMARY_DATA_OFFSET)?;

    Ok(BlockHeader {
        chk_start: PRIMARY_CHK_START,
        chk_size,
        data_offset: PRIMARY_DATA_OFFSET,
        data_len,
        ..src.clone()
    })
}
