//! `label.field=value` report lines (digests in lowercase hex), or JSON.

use serde::Serialize;
use std::fmt;

use crate::checksum::Digest;
use crate::header::BlockHeader;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderSummary {
    pub total_size: u32,
    pub chk_start: u32,
    pub chk_size: u32,
    pub data_offset: u32,
    pub data_len: u32,
    pub sum: String,
}

impl HeaderSummary {
    pub fn new(header: &BlockHeader, sum: &Digest) -> Self {
        Self {
            total_size: header.total_size,
            chk_start: header.chk_start,
            chk_size: header.chk_size,
            data_offset: header.data_offset,
            data_len: header.data_len,
            sum: hex::encode(sum),
        }
    }

    fn write_lines(&self, f: &mut fmt::Formatter<'_>, label: &str) -> fmt::Result {
        writeln!(f, "{}.total_size={}", label, self.total_size)?;
        writeln!(f, "{}.chk_start={}", label, self.chk_start)?;
        writeln!(f, "{}.chk_size={}", label, self.chk_size)?;
        writeln!(f, "{}.data_offset={}", label, self.data_offset)?;
        writeln!(f, "{}.data_len={}", label, self.data_len)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchReport {
    pub original: HeaderSummary,
    /// Digest found at offset 80 before the run.
    pub stored_sum: String,
    /// Whether the stored digest matched the as-read header.
    pub stored_matches: bool,
    pub sd: HeaderSummary,
    pub primary: HeaderSummary,
    /// False for dry runs.
    pub committed: bool,
}

impl PatchReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for PatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.original.write_lines(f, "original")?;
        writeln!(f, "original.stored_sum={}", self.stored_sum)?;
        writeln!(f, "original.sum={}", self.original.sum)?;
        self.sd.write_lines(f, "sd")?;
        writeln!(f, "sd.sum={}", self.sd.sum)?;
        self.primary.write_lines(f, "primary")?;
        write!(f, "primary.sum={}", self.primary.sum)
    }
}
